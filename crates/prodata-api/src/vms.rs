use reqwest::Method;

use crate::{
    AttachPublicIpRequest, AttachVolumeRequest, AttachedVolume, CreateVmRequest, ProdataClient,
    RenameVmRequest, RequestOpts, Result, Vm,
};

// ── Virtual machines ─────────────────────────────────────────────────

impl ProdataClient {
    /// Submit a create. Region and project tag travel in the body and are
    /// expected to be resolved by the caller.
    pub async fn create_vm(&self, req: &CreateVmRequest) -> Result<Vm> {
        let opts = RequestOpts::new(Some(req.region.clone()), Some(req.project_tag.clone()));
        self.send(Method::POST, "/api/v2/vms", req, &opts).await
    }

    pub async fn list_vms(&self, opts: &RequestOpts) -> Result<Vec<Vm>> {
        self.get("/api/v2/vms", opts).await
    }

    pub async fn get_vm(&self, vm_id: i64, opts: &RequestOpts) -> Result<Vm> {
        self.get(&format!("/api/v2/vms/{vm_id}"), opts).await
    }

    /// Lightweight status read used while polling.
    pub async fn get_vm_status(&self, vm_id: i64, opts: &RequestOpts) -> Result<Vm> {
        self.get(&format!("/api/v2/vms/{vm_id}/status"), opts).await
    }

    pub async fn rename_vm(&self, vm_id: i64, req: &RenameVmRequest, opts: &RequestOpts) -> Result<()> {
        self.send::<_, serde::de::IgnoredAny>(
            Method::PATCH,
            &format!("/api/v2/vms/{vm_id}/name"),
            req,
            opts,
        )
        .await?;
        Ok(())
    }

    pub async fn delete_vm(&self, vm_id: i64, opts: &RequestOpts) -> Result<()> {
        self.call_allow_404(Method::DELETE, &format!("/api/v2/vms/{vm_id}"), opts, "vm")
            .await
    }

    pub async fn start_vm(&self, vm_id: i64, opts: &RequestOpts) -> Result<()> {
        self.call(Method::POST, &format!("/api/v2/vms/{vm_id}/start"), opts)
            .await
    }

    pub async fn stop_vm(&self, vm_id: i64, opts: &RequestOpts) -> Result<()> {
        self.call(Method::POST, &format!("/api/v2/vms/{vm_id}/stop"), opts)
            .await
    }

    // ── Attachments ──────────────────────────────────────────────────

    /// Bind a public IP; the returned VM carries the resolved address.
    pub async fn attach_public_ip(
        &self,
        vm_id: i64,
        req: &AttachPublicIpRequest,
        opts: &RequestOpts,
    ) -> Result<Vm> {
        self.send(Method::POST, &format!("/api/v2/vms/{vm_id}/public-ip"), req, opts)
            .await
    }

    pub async fn detach_public_ip(&self, vm_id: i64, opts: &RequestOpts) -> Result<()> {
        self.call_allow_404(
            Method::DELETE,
            &format!("/api/v2/vms/{vm_id}/public-ip"),
            opts,
            "public ip attachment",
        )
        .await
    }

    pub async fn attach_volume(
        &self,
        vm_id: i64,
        req: &AttachVolumeRequest,
        opts: &RequestOpts,
    ) -> Result<AttachedVolume> {
        self.send(Method::POST, &format!("/api/v2/vms/{vm_id}/volumes"), req, opts)
            .await
    }

    pub async fn detach_volume(&self, vm_id: i64, attached_volume_id: i64, opts: &RequestOpts) -> Result<()> {
        self.call_allow_404(
            Method::DELETE,
            &format!("/api/v2/vms/{vm_id}/volumes/{attached_volume_id}"),
            opts,
            "volume attachment",
        )
        .await
    }
}
