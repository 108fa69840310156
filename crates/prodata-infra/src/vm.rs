//! VM lifecycle: create with name-collision recovery, poll to a terminal
//! state, refresh, rename and delete.

use std::fmt;
use std::time::Duration;

use prodata_api::{CreateVmRequest, DiskType, RenameVmRequest, RequestOpts, Scope, Vm, VmStatus};
use tracing::{debug, info, warn};

use crate::state::VmState;
use crate::wait::{CancelSignal, PollEnd, poll_until};
use crate::{Error, Provisioner, Result, gone_on_404};

/// Appended to an existing VM's name to free it for a replacement.
pub const REPLACING_SUFFIX: &str = "-replacing";

/// Caller-desired VM. Everything except the name is immutable once created.
#[derive(Clone)]
pub struct VmPlan {
    pub region: Option<String>,
    pub project_tag: Option<String>,
    pub name: String,
    pub image_id: i64,
    pub cpu_cores: i64,
    pub ram: i64,
    pub disk_size: i64,
    pub disk_type: DiskType,
    pub local_network_id: i64,
    pub private_ip: Option<String>,
    pub public_ip_id: Option<i64>,
    pub password: String,
    pub ssh_public_key: Option<String>,
    pub description: Option<String>,
}

impl fmt::Debug for VmPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VmPlan")
            .field("region", &self.region)
            .field("project_tag", &self.project_tag)
            .field("name", &self.name)
            .field("image_id", &self.image_id)
            .field("cpu_cores", &self.cpu_cores)
            .field("ram", &self.ram)
            .field("disk_size", &self.disk_size)
            .field("disk_type", &self.disk_type)
            .field("local_network_id", &self.local_network_id)
            .field("private_ip", &self.private_ip)
            .field("public_ip_id", &self.public_ip_id)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl VmPlan {
    pub fn overrides(&self) -> RequestOpts {
        RequestOpts::new(self.region.clone(), self.project_tag.clone())
    }

    pub fn validate(&self) -> Result<()> {
        validate_vm_name(&self.name)?;
        if self.cpu_cores < 1 {
            return Err(invalid("cpu_cores", "must be at least 1"));
        }
        if self.ram < 1 {
            return Err(invalid("ram", "must be at least 1 GB"));
        }
        if self.disk_size < 10 {
            return Err(invalid("disk_size", "must be at least 10 GB"));
        }
        if self.password.is_empty() {
            return Err(invalid("password", "must not be empty"));
        }
        Ok(())
    }

    fn create_request(&self, scope: &Scope) -> CreateVmRequest {
        CreateVmRequest {
            region: scope.region.clone(),
            project_tag: scope.project_tag.clone(),
            name: self.name.clone(),
            image_id: self.image_id,
            cpu_cores: self.cpu_cores,
            ram: self.ram,
            disk_size: self.disk_size,
            disk_type: self.disk_type,
            local_network_id: self.local_network_id,
            password: self.password.clone(),
            private_ip: self.private_ip.clone().filter(|s| !s.is_empty()),
            public_ip_id: self.public_ip_id,
            ssh_public_key: self.ssh_public_key.clone().filter(|s| !s.is_empty()),
            description: self.description.clone().filter(|s| !s.is_empty()),
        }
    }
}

fn invalid(field: &str, reason: &str) -> Error {
    Error::Invalid {
        field: field.into(),
        reason: reason.into(),
    }
}

/// 3-63 characters of ASCII letters, digits and hyphens, at least one letter.
pub fn validate_vm_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if !(3..=63).contains(&len) {
        return Err(invalid("name", "must be 3-63 characters"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(invalid("name", "may only contain letters, numbers, and hyphens"));
    }
    if !name.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(invalid("name", "must contain at least one letter"));
    }
    Ok(())
}

impl Provisioner {
    /// Create a VM and wait for it to settle.
    ///
    /// `state` is written with the last server-reported view before any
    /// error other than cancellation is returned, so a retry never creates
    /// a second VM. On cancellation `state` is left untouched.
    pub async fn create_vm(
        &self,
        plan: &VmPlan,
        state: &mut Option<VmState>,
        cancel: &CancelSignal,
    ) -> Result<()> {
        plan.validate()?;

        let scope = self.client.resolve_scope(&plan.overrides());
        let req = plan.create_request(&scope);

        debug!(
            name = %req.name,
            region = %scope.region,
            project_tag = %scope.project_tag,
            image_id = req.image_id,
            cpu_cores = req.cpu_cores,
            ram = req.ram,
            disk_size = req.disk_size,
            disk_type = %req.disk_type,
            local_network_id = req.local_network_id,
            "vm: creating"
        );

        let created = self.submit_create(&req, &scope).await?;
        let vm_id = created.id;

        info!(vm_id, name = %created.name, status = %created.status, "vm: creation initiated, waiting for it to become ready");

        let opts = RequestOpts::from(&scope);
        let mut last = Some(created);
        let polled = self.poll_vm(vm_id, &opts, cancel, &mut last, VmStatus::is_terminal).await;

        if matches!(polled, Err(Error::Cancelled)) {
            return Err(Error::Cancelled);
        }
        let Some(vm) = last else {
            return polled.map(|_| ());
        };
        *state = Some(VmState::from_created(plan, &scope, &vm));

        match polled? {
            PollEnd::Reached if vm.status == VmStatus::Error => Err(Error::ProvisioningFailed { vm_id }),
            PollEnd::Reached => {
                info!(vm_id, status = %vm.status, "vm: ready");
                Ok(())
            }
            PollEnd::TimedOut { waited } => Err(Error::Timeout {
                vm_id,
                target: "RUNNING or STOPPED".into(),
                waited,
                last_status: vm.status.to_string(),
            }),
        }
    }

    /// Submit a create; on a name collision free the name once and retry.
    async fn submit_create(&self, req: &CreateVmRequest, scope: &Scope) -> Result<Vm> {
        match self.client.create_vm(req).await {
            Ok(vm) => Ok(vm),
            Err(e) if e.is_name_conflict() => {
                info!(name = %req.name, "vm: name conflict detected, renaming existing VM");
                self.free_vm_name(&req.name, scope, e).await?;
                Ok(self.client.create_vm(req).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Rename the VM currently holding `name` out of the way.
    ///
    /// If the holder cannot be looked up, `conflict` is returned unchanged.
    async fn free_vm_name(&self, name: &str, scope: &Scope, conflict: prodata_api::Error) -> Result<i64> {
        let opts = RequestOpts::from(scope);
        let vms = match self.client.list_vms(&opts).await {
            Ok(vms) => vms,
            Err(e) => {
                warn!(name, error = %e, "vm: listing vms to resolve name conflict failed");
                return Err(conflict.into());
            }
        };
        let existing = vms
            .into_iter()
            .find(|vm| vm.name == name)
            .ok_or_else(|| Error::ConflictUnresolved {
                name: name.into(),
                scope: scope.clone(),
            })?;

        let new_name = format!("{name}{REPLACING_SUFFIX}");
        info!(vm_id = existing.id, old_name = %existing.name, new_name = %new_name, "vm: renaming existing VM");

        self.client
            .rename_vm(existing.id, &RenameVmRequest { name: new_name }, &opts)
            .await
            .map_err(|source| Error::NameConflict {
                name: name.into(),
                vm_id: existing.id,
                source,
            })?;

        Ok(existing.id)
    }

    pub(crate) async fn poll_vm(
        &self,
        vm_id: i64,
        opts: &RequestOpts,
        cancel: &CancelSignal,
        last: &mut Option<Vm>,
        done: impl Fn(&VmStatus) -> bool,
    ) -> Result<PollEnd> {
        let client = &self.client;
        poll_until(
            self.poll,
            cancel,
            last,
            move || async move {
                let vm = client.get_vm_status(vm_id, opts).await?;
                debug!(vm_id, status = %vm.status, "vm: polled status");
                Ok::<_, Error>(vm)
            },
            |vm: &Vm| done(&vm.status),
        )
        .await
    }

    /// Wait until the VM reports `target`.
    pub async fn wait_for_vm_status(
        &self,
        vm_id: i64,
        target: VmStatus,
        opts: &RequestOpts,
        cancel: &CancelSignal,
    ) -> Result<Vm> {
        let mut last = None;
        let end = self
            .poll_vm(vm_id, opts, cancel, &mut last, |status| *status == target)
            .await?;

        match (end, last) {
            (PollEnd::Reached, Some(vm)) => Ok(vm),
            (end, last) => Err(Error::Timeout {
                vm_id,
                target: target.to_string(),
                waited: match end {
                    PollEnd::TimedOut { waited } => waited,
                    PollEnd::Reached => Duration::ZERO,
                },
                last_status: last.map(|vm| vm.status.to_string()).unwrap_or_default(),
            }),
        }
    }

    /// Fresh server view of a managed VM, or `None` if it no longer exists.
    pub async fn read_vm(&self, state: &VmState) -> Result<Option<VmState>> {
        let Some(vm) = gone_on_404(self.client.get_vm(state.id, &state.overrides).await)? else {
            info!(vm_id = state.id, "vm: gone");
            return Ok(None);
        };

        let mut refreshed = state.clone();
        refreshed.refresh(&vm);
        debug!(vm_id = vm.id, name = %vm.name, status = %vm.status, "vm: read");
        Ok(Some(refreshed))
    }

    /// The only in-place VM update.
    pub async fn rename_vm(&self, state: &VmState, new_name: &str) -> Result<VmState> {
        validate_vm_name(new_name)?;
        self.client
            .rename_vm(state.id, &RenameVmRequest { name: new_name.into() }, &state.overrides)
            .await?;

        info!(vm_id = state.id, old_name = %state.name, new_name, "vm: renamed");
        Ok(VmState {
            name: new_name.into(),
            ..state.clone()
        })
    }

    /// Idempotent: a VM that is already gone counts as deleted.
    pub async fn delete_vm(&self, state: &VmState) -> Result<()> {
        self.client.delete_vm(state.id, &state.overrides).await?;
        info!(vm_id = state.id, "vm: deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        for name in ["web", "web-1", "a12", "WEB-prod-01"] {
            validate_vm_name(name).unwrap();
        }
    }

    #[test]
    fn rejects_bad_names() {
        let long = "a".repeat(64);
        for name in ["ab", "123", "web_1", "web 1", "---", long.as_str()] {
            assert!(
                matches!(validate_vm_name(name), Err(Error::Invalid { .. })),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn plan_debug_hides_password() {
        let plan = VmPlan {
            region: None,
            project_tag: None,
            name: "web-1".into(),
            image_id: 3,
            cpu_cores: 1,
            ram: 1,
            disk_size: 10,
            disk_type: DiskType::Ssd,
            local_network_id: 9,
            private_ip: None,
            public_ip_id: None,
            password: "correct-horse".into(),
            ssh_public_key: None,
            description: None,
        };

        assert!(!format!("{plan:?}").contains("correct-horse"));
        plan.validate().unwrap();
        assert!(matches!(
            VmPlan { disk_size: 5, ..plan }.validate(),
            Err(Error::Invalid { .. })
        ));
    }
}
