//! Volume and public-IP bindings to a VM.

use prodata_api::{AttachPublicIpRequest, AttachVolumeRequest, RequestOpts, VmStatus};
use tracing::{info, warn};

use crate::state::{PublicIpAttachmentState, VolumeAttachmentState, non_empty};
use crate::wait::CancelSignal;
use crate::{Provisioner, Result, gone_on_404};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeAttachmentPlan {
    pub region: Option<String>,
    pub project_tag: Option<String>,
    pub vm_id: i64,
    pub volume_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicIpAttachmentPlan {
    pub region: Option<String>,
    pub project_tag: Option<String>,
    pub vm_id: i64,
    pub public_ip_id: i64,
}

/// Result of a successful volume detach.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetachOutcome {
    /// The VM was stopped for the detach and started again.
    pub restarted: bool,
    /// Set when the detach succeeded but the VM could not be restarted.
    pub warning: Option<String>,
}

impl Provisioner {
    // ── Volumes ──────────────────────────────────────────────────────

    pub async fn attach_volume(&self, plan: &VolumeAttachmentPlan) -> Result<VolumeAttachmentState> {
        let opts = RequestOpts::new(plan.region.clone(), plan.project_tag.clone());
        let scope = self.client.resolve_scope(&opts);

        let attached = self
            .client
            .attach_volume(plan.vm_id, &AttachVolumeRequest { volume_id: plan.volume_id }, &opts)
            .await?;

        info!(vm_id = plan.vm_id, volume_id = plan.volume_id, attached_volume_id = attached.id, "volume attached");
        Ok(VolumeAttachmentState {
            vm_id: plan.vm_id,
            volume_id: plan.volume_id,
            attached_volume_id: attached.id,
            scope,
            overrides: opts,
        })
    }

    /// `None` once the volume is gone or no longer bound to this VM.
    pub async fn read_volume_attachment(
        &self,
        state: &VolumeAttachmentState,
    ) -> Result<Option<VolumeAttachmentState>> {
        let opts = &state.overrides;
        let Some(volume) = gone_on_404(self.client.get_volume(state.volume_id, opts).await)? else {
            info!(volume_id = state.volume_id, "volume gone, attachment dropped");
            return Ok(None);
        };

        if !volume.is_attached_to(state.vm_id) {
            info!(
                vm_id = state.vm_id,
                volume_id = state.volume_id,
                attached_to = ?volume.attached_id,
                "volume no longer attached to vm"
            );
            return Ok(None);
        }
        Ok(Some(state.clone()))
    }

    /// Detach a volume, stopping the VM around the call if it is running.
    ///
    /// A VM stopped here is always started again, even when the detach
    /// itself fails. A failed restart after a successful detach is reported
    /// through [`DetachOutcome::warning`], not as an error.
    pub async fn detach_volume(
        &self,
        state: &VolumeAttachmentState,
        cancel: &CancelSignal,
    ) -> Result<DetachOutcome> {
        let opts = &state.overrides;
        let vm_id = state.vm_id;

        let Some(vm) = gone_on_404(self.client.get_vm_status(vm_id, opts).await)? else {
            warn!(vm_id, volume_id = state.volume_id, "vm already gone, nothing to detach");
            return Ok(DetachOutcome::default());
        };

        let was_running = vm.status == VmStatus::Running;
        if was_running {
            info!(vm_id, "stopping vm for volume detach");
            self.client.stop_vm(vm_id, opts).await?;
            self.wait_for_vm_status(vm_id, VmStatus::Stopped, opts, cancel)
                .await?;
        }

        let detached = self
            .client
            .detach_volume(vm_id, state.attached_volume_id, opts)
            .await;
        if detached.is_ok() {
            info!(vm_id, volume_id = state.volume_id, "volume detached");
        }

        if !was_running {
            detached?;
            return Ok(DetachOutcome::default());
        }

        info!(vm_id, "restarting vm after volume detach");
        let restarted = self.client.start_vm(vm_id, opts).await;

        match (detached, restarted) {
            (Ok(()), Ok(())) => Ok(DetachOutcome {
                restarted: true,
                warning: None,
            }),
            (Ok(()), Err(e)) => {
                let warning = format!(
                    "volume {} detached but vm {vm_id} failed to restart: {e}; start it manually",
                    state.volume_id
                );
                warn!(vm_id, error = %e, "vm restart failed after volume detach");
                Ok(DetachOutcome {
                    restarted: false,
                    warning: Some(warning),
                })
            }
            (Err(e), restarted) => {
                if let Err(start_err) = restarted {
                    warn!(vm_id, error = %start_err, "vm restart failed after unsuccessful detach");
                }
                Err(e.into())
            }
        }
    }

    // ── Public IPs ───────────────────────────────────────────────────

    pub async fn attach_public_ip(&self, plan: &PublicIpAttachmentPlan) -> Result<PublicIpAttachmentState> {
        let opts = RequestOpts::new(plan.region.clone(), plan.project_tag.clone());
        let scope = self.client.resolve_scope(&opts);

        let vm = self
            .client
            .attach_public_ip(
                plan.vm_id,
                &AttachPublicIpRequest {
                    public_ip_id: plan.public_ip_id,
                },
                &opts,
            )
            .await?;

        let public_ip = match non_empty(&vm.public_ip) {
            Some(ip) => ip,
            None => self.client.get_public_ip(plan.public_ip_id, &opts).await?.ip,
        };

        info!(vm_id = plan.vm_id, public_ip_id = plan.public_ip_id, %public_ip, "public ip attached");
        Ok(PublicIpAttachmentState {
            vm_id: plan.vm_id,
            public_ip_id: plan.public_ip_id,
            public_ip,
            scope,
            overrides: opts,
        })
    }

    /// `None` once the VM is gone or carries no public address.
    pub async fn read_public_ip_attachment(
        &self,
        state: &PublicIpAttachmentState,
    ) -> Result<Option<PublicIpAttachmentState>> {
        let opts = &state.overrides;
        let Some(vm) = gone_on_404(self.client.get_vm(state.vm_id, opts).await)? else {
            info!(vm_id = state.vm_id, "vm gone, public ip attachment dropped");
            return Ok(None);
        };

        Ok(non_empty(&vm.public_ip).map(|public_ip| PublicIpAttachmentState {
            public_ip,
            ..state.clone()
        }))
    }

    pub async fn detach_public_ip(&self, state: &PublicIpAttachmentState) -> Result<()> {
        let opts = &state.overrides;
        self.client.detach_public_ip(state.vm_id, opts).await?;
        info!(vm_id = state.vm_id, public_ip_id = state.public_ip_id, "public ip detached");
        Ok(())
    }
}
