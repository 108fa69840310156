mod commands;
mod error;
mod state_file;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use prodata_api::DiskType;
use prodata_infra::{Provisioner, cancellation};
use tracing_subscriber::EnvFilter;

use crate::state_file::StateFile;

#[derive(Parser)]
#[command(name = "prodatactl")]
#[command(about = "Manage ProData cloud VMs, volumes, and addresses", long_about = None)]
struct Cli {
    /// JSON file holding the managed resource's state
    #[arg(short, long, global = true, default_value = "prodata-state.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Per-call scope overrides; empty means the configured default.
#[derive(Args, Clone, Default)]
struct ScopeArgs {
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    project_tag: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Virtual machines
    #[command(subcommand)]
    Vm(VmCommand),
    /// Block volumes and their attachment to VMs
    #[command(subcommand)]
    Volume(VolumeCommand),
    /// Public IP addresses and their attachment to VMs
    #[command(subcommand)]
    PublicIp(PublicIpCommand),
    /// Private networks
    #[command(subcommand)]
    Network(NetworkCommand),
    /// List available OS images
    Images {
        #[command(flatten)]
        scope: ScopeArgs,
    },
}

#[derive(Subcommand)]
enum VmCommand {
    /// Create a VM and wait until it is running or stopped
    Create(VmCreateArgs),
    /// Refresh the stored VM from the API
    Read,
    /// Rename the stored VM
    Rename { name: String },
    /// Delete the stored VM
    Delete,
}

#[derive(Args)]
struct VmCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    image_id: i64,
    /// CPU cores
    #[arg(long, default_value_t = 1)]
    cpu: i64,
    /// RAM in GB
    #[arg(long, default_value_t = 1)]
    ram: i64,
    /// Disk size in GB
    #[arg(long, default_value_t = 10)]
    disk_size: i64,
    /// HDD, SSD or NVME
    #[arg(long, default_value = "SSD")]
    disk_type: DiskType,
    #[arg(long)]
    network_id: i64,
    #[arg(long)]
    private_ip: Option<String>,
    #[arg(long)]
    public_ip_id: Option<i64>,
    /// Root password
    #[arg(long, env = "PRODATA_VM_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long)]
    ssh_key: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[command(flatten)]
    scope: ScopeArgs,
}

#[derive(Subcommand)]
enum VolumeCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "SSD")]
        disk_type: DiskType,
        /// Size in GB
        #[arg(long)]
        size: i64,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    Read,
    /// Rename and/or grow the stored volume
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        size: Option<i64>,
    },
    Delete,
    /// Attach a volume to a VM
    Attach {
        #[arg(long)]
        vm_id: i64,
        #[arg(long)]
        volume_id: i64,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Detach the stored attachment, power-cycling the VM if needed
    Detach,
}

#[derive(Subcommand)]
enum PublicIpCommand {
    Create {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    Read,
    Rename { name: String },
    Delete,
    /// Bind a public IP to a VM
    Attach {
        #[arg(long)]
        vm_id: i64,
        #[arg(long)]
        public_ip_id: i64,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Unbind the stored public IP attachment
    Detach,
}

#[derive(Subcommand)]
enum NetworkCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        cidr: String,
        #[arg(long)]
        gateway: Option<String>,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    Read,
    Rename { name: String },
    Delete,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let provisioner = Provisioner::from_env()?;
    let file = StateFile::new(cli.state);

    let (handle, cancel) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            handle.cancel();
        }
    });

    commands::run(&provisioner, &file, cli.command, &cancel).await?;
    Ok(())
}
