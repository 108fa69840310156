use prodata_api::RequestOpts;
use prodata_infra::{
    CancelSignal, LocalNetworkPlan, Provisioner, PublicIpAttachmentPlan,
    PublicIpPlan, ResourceState, VmPlan, VolumeAttachmentPlan, VolumePlan,
};
use tracing::{info, warn};

use crate::error::Result;
use crate::state_file::StateFile;
use crate::{Commands, NetworkCommand, PublicIpCommand, ScopeArgs, VmCommand, VmCreateArgs, VolumeCommand};

fn print(state: &ResourceState) {
    match serde_json::to_string_pretty(state) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!(error = %e, "could not render state"),
    }
}

fn save_and_print(file: &StateFile, state: ResourceState) -> Result<()> {
    file.save(&state)?;
    print(&state);
    Ok(())
}

/// Store a fresh read, or forget the resource if the API no longer has it.
fn refreshed(file: &StateFile, fresh: Option<ResourceState>) -> Result<()> {
    match fresh {
        Some(state) => save_and_print(file, state),
        None => {
            info!(path = %file.path().display(), "resource is gone, clearing state");
            file.clear()
        }
    }
}

pub async fn run(p: &Provisioner, file: &StateFile, command: Commands, cancel: &CancelSignal) -> Result<()> {
    match command {
        Commands::Vm(cmd) => vm(p, file, cmd, cancel).await,
        Commands::Volume(cmd) => volume(p, file, cmd, cancel).await,
        Commands::PublicIp(cmd) => public_ip(p, file, cmd).await,
        Commands::Network(cmd) => network(p, file, cmd).await,
        Commands::Images { scope } => images(p, scope).await,
    }
}

// ── VMs ──────────────────────────────────────────────────────────────

fn vm_plan(args: VmCreateArgs) -> VmPlan {
    VmPlan {
        region: args.scope.region,
        project_tag: args.scope.project_tag,
        name: args.name,
        image_id: args.image_id,
        cpu_cores: args.cpu,
        ram: args.ram,
        disk_size: args.disk_size,
        disk_type: args.disk_type,
        local_network_id: args.network_id,
        private_ip: args.private_ip,
        public_ip_id: args.public_ip_id,
        password: args.password,
        ssh_public_key: args.ssh_key,
        description: args.description,
    }
}

async fn vm(p: &Provisioner, file: &StateFile, cmd: VmCommand, cancel: &CancelSignal) -> Result<()> {
    let load = || {
        file.require("vm", |s| match s {
            ResourceState::Vm(vm) => Ok(vm),
            other => Err(other),
        })
    };

    match cmd {
        VmCommand::Create(args) => {
            let plan = vm_plan(args);
            let mut state = None;
            let res = p.create_vm(&plan, &mut state, cancel).await;
            // A failed create may still have produced a VM; keep its id.
            if let Some(vm) = state {
                save_and_print(file, ResourceState::Vm(vm))?;
            }
            Ok(res?)
        }
        VmCommand::Read => {
            let fresh = p.read_vm(&load()?).await?;
            refreshed(file, fresh.map(ResourceState::Vm))
        }
        VmCommand::Rename { name } => {
            let renamed = p.rename_vm(&load()?, &name).await?;
            save_and_print(file, ResourceState::Vm(renamed))
        }
        VmCommand::Delete => {
            p.delete_vm(&load()?).await?;
            file.clear()
        }
    }
}

// ── Volumes ──────────────────────────────────────────────────────────

async fn volume(p: &Provisioner, file: &StateFile, cmd: VolumeCommand, cancel: &CancelSignal) -> Result<()> {
    let load = || {
        file.require("volume", |s| match s {
            ResourceState::Volume(v) => Ok(v),
            other => Err(other),
        })
    };
    let load_attachment = || {
        file.require("volume attachment", |s| match s {
            ResourceState::VolumeAttachment(a) => Ok(a),
            other => Err(other),
        })
    };

    match cmd {
        VolumeCommand::Create {
            name,
            disk_type,
            size,
            scope,
        } => {
            let plan = VolumePlan {
                region: scope.region,
                project_tag: scope.project_tag,
                name,
                disk_type,
                size,
            };
            let state = p.create_volume(&plan).await?;
            save_and_print(file, ResourceState::Volume(state))
        }
        // An attachment file is read the same way as a volume file.
        VolumeCommand::Read => match file.load()? {
            Some(ResourceState::VolumeAttachment(a)) => {
                let fresh = p.read_volume_attachment(&a).await?;
                refreshed(file, fresh.map(ResourceState::VolumeAttachment))
            }
            _ => {
                let fresh = p.read_volume(&load()?).await?;
                refreshed(file, fresh.map(ResourceState::Volume))
            }
        },
        VolumeCommand::Update { name, size } => {
            let state = p.update_volume(&load()?, name.as_deref(), size).await?;
            save_and_print(file, ResourceState::Volume(state))
        }
        VolumeCommand::Delete => {
            p.delete_volume(&load()?).await?;
            file.clear()
        }
        VolumeCommand::Attach {
            vm_id,
            volume_id,
            scope,
        } => {
            let plan = VolumeAttachmentPlan {
                region: scope.region,
                project_tag: scope.project_tag,
                vm_id,
                volume_id,
            };
            let state = p.attach_volume(&plan).await?;
            save_and_print(file, ResourceState::VolumeAttachment(state))
        }
        VolumeCommand::Detach => {
            let outcome = p.detach_volume(&load_attachment()?, cancel).await?;
            file.clear()?;
            if let Some(warning) = outcome.warning {
                eprintln!("warning: {warning}");
            }
            Ok(())
        }
    }
}

// ── Public IPs ───────────────────────────────────────────────────────

async fn public_ip(p: &Provisioner, file: &StateFile, cmd: PublicIpCommand) -> Result<()> {
    let load = || {
        file.require("public ip", |s| match s {
            ResourceState::PublicIp(ip) => Ok(ip),
            other => Err(other),
        })
    };

    match cmd {
        PublicIpCommand::Create { name, scope } => {
            let plan = PublicIpPlan {
                region: scope.region,
                project_tag: scope.project_tag,
                name,
            };
            let state = p.create_public_ip(&plan).await?;
            save_and_print(file, ResourceState::PublicIp(state))
        }
        PublicIpCommand::Read => match file.load()? {
            Some(ResourceState::PublicIpAttachment(a)) => {
                let fresh = p.read_public_ip_attachment(&a).await?;
                refreshed(file, fresh.map(ResourceState::PublicIpAttachment))
            }
            _ => {
                let fresh = p.read_public_ip(&load()?).await?;
                refreshed(file, fresh.map(ResourceState::PublicIp))
            }
        },
        PublicIpCommand::Rename { name } => {
            let state = p.rename_public_ip(&load()?, &name).await?;
            save_and_print(file, ResourceState::PublicIp(state))
        }
        PublicIpCommand::Delete => {
            p.delete_public_ip(&load()?).await?;
            file.clear()
        }
        PublicIpCommand::Attach {
            vm_id,
            public_ip_id,
            scope,
        } => {
            let plan = PublicIpAttachmentPlan {
                region: scope.region,
                project_tag: scope.project_tag,
                vm_id,
                public_ip_id,
            };
            let state = p.attach_public_ip(&plan).await?;
            save_and_print(file, ResourceState::PublicIpAttachment(state))
        }
        PublicIpCommand::Detach => {
            let state = file.require("public ip attachment", |s| match s {
                ResourceState::PublicIpAttachment(a) => Ok(a),
                other => Err(other),
            })?;
            p.detach_public_ip(&state).await?;
            file.clear()
        }
    }
}

// ── Local networks ───────────────────────────────────────────────────

async fn network(p: &Provisioner, file: &StateFile, cmd: NetworkCommand) -> Result<()> {
    let load = || {
        file.require("local network", |s| match s {
            ResourceState::LocalNetwork(net) => Ok(net),
            other => Err(other),
        })
    };

    match cmd {
        NetworkCommand::Create {
            name,
            cidr,
            gateway,
            scope,
        } => {
            let plan = LocalNetworkPlan {
                region: scope.region,
                project_tag: scope.project_tag,
                name,
                cidr,
                gateway,
            };
            let state = p.create_local_network(&plan).await?;
            save_and_print(file, ResourceState::LocalNetwork(state))
        }
        NetworkCommand::Read => {
            let fresh = p.read_local_network(&load()?).await?;
            refreshed(file, fresh.map(ResourceState::LocalNetwork))
        }
        NetworkCommand::Rename { name } => {
            let state = p.rename_local_network(&load()?, &name).await?;
            save_and_print(file, ResourceState::LocalNetwork(state))
        }
        NetworkCommand::Delete => {
            p.delete_local_network(&load()?).await?;
            file.clear()
        }
    }
}

// ── Images ───────────────────────────────────────────────────────────

async fn images(p: &Provisioner, scope: ScopeArgs) -> Result<()> {
    let opts = RequestOpts::new(scope.region, scope.project_tag);
    let images = p.client().list_images(&opts).await?;
    for image in images {
        let custom = if image.is_custom { " (custom)" } else { "" };
        println!("{}\t{}\t{}{custom}", image.id, image.slug, image.name);
    }
    Ok(())
}
