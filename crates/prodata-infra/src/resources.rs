//! Standalone resources: public IPs, local networks and volumes.
//!
//! Each follows the same shape: create with a defaulted scope, read (gone on
//! 404), update in place, idempotent delete.

use prodata_api::{
    CreateLocalNetworkRequest, CreatePublicIpRequest, CreateVolumeRequest, DiskType, RequestOpts,
    Scope, UpdateLocalNetworkRequest, UpdatePublicIpRequest, UpdateVolumeRequest,
};
use tracing::info;

use crate::state::{LocalNetworkState, PublicIpState, VolumeState};
use crate::{Error, Provisioner, Result, gone_on_404};

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Invalid {
            field: "name".into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicIpPlan {
    pub region: Option<String>,
    pub project_tag: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNetworkPlan {
    pub region: Option<String>,
    pub project_tag: Option<String>,
    pub name: String,
    pub cidr: String,
    pub gateway: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumePlan {
    pub region: Option<String>,
    pub project_tag: Option<String>,
    pub name: String,
    pub disk_type: DiskType,
    pub size: i64,
}

impl Provisioner {
    /// Explicit overrides plus the scope they resolve to.
    fn scope_for(&self, region: &Option<String>, project_tag: &Option<String>) -> (RequestOpts, Scope) {
        let overrides = RequestOpts::new(region.clone(), project_tag.clone());
        let scope = self.client.resolve_scope(&overrides);
        (overrides, scope)
    }

    // ── Public IPs ───────────────────────────────────────────────────

    pub async fn create_public_ip(&self, plan: &PublicIpPlan) -> Result<PublicIpState> {
        require_name(&plan.name)?;
        let (overrides, scope) = self.scope_for(&plan.region, &plan.project_tag);
        let ip = self
            .client
            .create_public_ip(&CreatePublicIpRequest {
                region: scope.region.clone(),
                project_tag: scope.project_tag.clone(),
                name: plan.name.clone(),
            })
            .await?;

        info!(public_ip_id = ip.id, ip = %ip.ip, "public ip created");
        Ok(PublicIpState::from_server(&scope, &overrides, &ip))
    }

    pub async fn read_public_ip(&self, state: &PublicIpState) -> Result<Option<PublicIpState>> {
        Ok(gone_on_404(self.client.get_public_ip(state.id, &state.overrides).await)?
            .map(|ip| PublicIpState::from_server(&state.scope, &state.overrides, &ip)))
    }

    pub async fn rename_public_ip(&self, state: &PublicIpState, name: &str) -> Result<PublicIpState> {
        require_name(name)?;
        let ip = self
            .client
            .update_public_ip(state.id, &UpdatePublicIpRequest { name: name.into() }, &state.overrides)
            .await?;
        Ok(PublicIpState::from_server(&state.scope, &state.overrides, &ip))
    }

    pub async fn delete_public_ip(&self, state: &PublicIpState) -> Result<()> {
        self.client.delete_public_ip(state.id, &state.overrides).await?;
        info!(public_ip_id = state.id, "public ip deleted");
        Ok(())
    }

    // ── Local networks ───────────────────────────────────────────────

    pub async fn create_local_network(&self, plan: &LocalNetworkPlan) -> Result<LocalNetworkState> {
        require_name(&plan.name)?;
        if plan.cidr.trim().is_empty() {
            return Err(Error::Invalid {
                field: "cidr".into(),
                reason: "must not be empty".into(),
            });
        }

        let (overrides, scope) = self.scope_for(&plan.region, &plan.project_tag);
        let net = self
            .client
            .create_local_network(&CreateLocalNetworkRequest {
                region: scope.region.clone(),
                project_tag: scope.project_tag.clone(),
                name: plan.name.clone(),
                cidr: plan.cidr.clone(),
                gateway: plan.gateway.clone().filter(|g| !g.is_empty()),
            })
            .await?;

        info!(network_id = net.id, cidr = %net.cidr, "local network created");
        Ok(LocalNetworkState::from_server(&scope, &overrides, &net))
    }

    pub async fn read_local_network(&self, state: &LocalNetworkState) -> Result<Option<LocalNetworkState>> {
        Ok(gone_on_404(self.client.get_local_network(state.id, &state.overrides).await)?
            .map(|net| LocalNetworkState::from_server(&state.scope, &state.overrides, &net)))
    }

    pub async fn rename_local_network(&self, state: &LocalNetworkState, name: &str) -> Result<LocalNetworkState> {
        require_name(name)?;
        let net = self
            .client
            .update_local_network(state.id, &UpdateLocalNetworkRequest { name: name.into() }, &state.overrides)
            .await?;
        Ok(LocalNetworkState::from_server(&state.scope, &state.overrides, &net))
    }

    pub async fn delete_local_network(&self, state: &LocalNetworkState) -> Result<()> {
        self.client.delete_local_network(state.id, &state.overrides).await?;
        info!(network_id = state.id, "local network deleted");
        Ok(())
    }

    // ── Volumes ──────────────────────────────────────────────────────

    pub async fn create_volume(&self, plan: &VolumePlan) -> Result<VolumeState> {
        require_name(&plan.name)?;
        if plan.size < 1 {
            return Err(Error::Invalid {
                field: "size".into(),
                reason: "must be at least 1 GB".into(),
            });
        }

        let (overrides, scope) = self.scope_for(&plan.region, &plan.project_tag);
        let volume = self
            .client
            .create_volume(&CreateVolumeRequest {
                region: scope.region.clone(),
                project_tag: scope.project_tag.clone(),
                name: plan.name.clone(),
                kind: plan.disk_type.as_str().into(),
                size: plan.size,
            })
            .await?;

        info!(volume_id = volume.id, size = volume.size, "volume created");
        Ok(VolumeState::from_server(&scope, &overrides, &volume))
    }

    pub async fn read_volume(&self, state: &VolumeState) -> Result<Option<VolumeState>> {
        Ok(gone_on_404(self.client.get_volume(state.id, &state.overrides).await)?
            .map(|volume| VolumeState::from_server(&state.scope, &state.overrides, &volume)))
    }

    /// Rename and/or grow a volume. Shrinking is rejected locally.
    pub async fn update_volume(
        &self,
        state: &VolumeState,
        name: Option<&str>,
        size: Option<i64>,
    ) -> Result<VolumeState> {
        if let Some(name) = name {
            require_name(name)?;
        }
        if let Some(size) = size.filter(|s| *s < state.size) {
            return Err(Error::Invalid {
                field: "size".into(),
                reason: format!("cannot shrink volume from {} to {size} GB", state.size),
            });
        }

        let req = UpdateVolumeRequest {
            name: name.map(str::to_string),
            size,
        };
        let volume = self.client.update_volume(state.id, &req, &state.overrides).await?;
        Ok(VolumeState::from_server(&state.scope, &state.overrides, &volume))
    }

    pub async fn delete_volume(&self, state: &VolumeState) -> Result<()> {
        self.client.delete_volume(state.id, &state.overrides).await?;
        info!(volume_id = state.id, "volume deleted");
        Ok(())
    }
}
