pub mod attachment;
pub mod config;
pub mod resources;
pub mod state;
pub mod vm;
pub mod wait;

use std::time::Duration;

use prodata_api::{ProdataClient, Scope};

pub use attachment::{DetachOutcome, PublicIpAttachmentPlan, VolumeAttachmentPlan};
pub use resources::{LocalNetworkPlan, PublicIpPlan, VolumePlan};
pub use state::{
    LocalNetworkState, PublicIpAttachmentState, PublicIpState, ResourceState, VmState,
    VolumeAttachmentState, VolumeState,
};
pub use vm::{REPLACING_SUFFIX, VmPlan, validate_vm_name};
pub use wait::{CancelHandle, CancelSignal, PollSettings, cancellation};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] prodata_api::Error),

    /// The create collided on `name` and renaming the holder failed.
    #[error("name {name:?} is taken by vm {vm_id} and renaming it failed: {source}")]
    NameConflict {
        name: String,
        vm_id: i64,
        #[source]
        source: prodata_api::Error,
    },

    #[error(
        "name {name:?} is reported as taken but no vm with that name exists in region {} / project {}",
        .scope.region,
        .scope.project_tag
    )]
    ConflictUnresolved { name: String, scope: Scope },

    #[error("vm {vm_id} entered ERROR state during provisioning")]
    ProvisioningFailed { vm_id: i64 },

    #[error("timed out after {waited:?} waiting for vm {vm_id} to reach {target} (last status: {last_status})")]
    Timeout {
        vm_id: i64,
        target: String,
        waited: Duration,
        last_status: String,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing env var: {0}")]
    MissingEnv(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// `Ok(None)` for a 404, the value otherwise. Other errors propagate.
pub(crate) fn gone_on_404<T>(res: prodata_api::Result<T>) -> Result<Option<T>> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Reconciles desired resources against the ProData API.
#[derive(Clone)]
pub struct Provisioner {
    client: ProdataClient,
    poll: PollSettings,
}

impl Provisioner {
    pub fn new(client: ProdataClient) -> Self {
        Self {
            client,
            poll: PollSettings::default(),
        }
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    /// Build from `PRODATA_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let cfg = config::client_config_from_env()?;
        let poll = config::poll_settings_from_env()?;
        let client = ProdataClient::new(cfg)?;
        tracing::info!(
            region = %client.defaults().region,
            project_tag = %client.defaults().project_tag,
            "prodata provisioner configured"
        );
        Ok(Self::new(client).with_poll_settings(poll))
    }

    pub fn client(&self) -> &ProdataClient {
        &self.client
    }

    pub fn poll_settings(&self) -> PollSettings {
        self.poll
    }
}
