use reqwest::Method;

use crate::{CreateVolumeRequest, ProdataClient, RequestOpts, Result, UpdateVolumeRequest, Volume};

// ── Volumes ──────────────────────────────────────────────────────────

impl ProdataClient {
    pub async fn create_volume(&self, req: &CreateVolumeRequest) -> Result<Volume> {
        let opts = RequestOpts::new(Some(req.region.clone()), Some(req.project_tag.clone()));
        self.send(Method::POST, "/api/v2/volumes", req, &opts).await
    }

    pub async fn list_volumes(&self, opts: &RequestOpts) -> Result<Vec<Volume>> {
        self.get("/api/v2/volumes", opts).await
    }

    pub async fn get_volume(&self, volume_id: i64, opts: &RequestOpts) -> Result<Volume> {
        self.get(&format!("/api/v2/volumes/{volume_id}"), opts).await
    }

    pub async fn update_volume(
        &self,
        volume_id: i64,
        req: &UpdateVolumeRequest,
        opts: &RequestOpts,
    ) -> Result<Volume> {
        self.send(Method::PATCH, &format!("/api/v2/volumes/{volume_id}"), req, opts)
            .await
    }

    pub async fn delete_volume(&self, volume_id: i64, opts: &RequestOpts) -> Result<()> {
        self.call_allow_404(
            Method::DELETE,
            &format!("/api/v2/volumes/{volume_id}"),
            opts,
            "volume",
        )
        .await
    }
}
