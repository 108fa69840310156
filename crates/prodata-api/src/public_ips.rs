use reqwest::Method;

use crate::{CreatePublicIpRequest, ProdataClient, PublicIp, RequestOpts, Result, UpdatePublicIpRequest};

// ── Public IPs ───────────────────────────────────────────────────────

impl ProdataClient {
    pub async fn create_public_ip(&self, req: &CreatePublicIpRequest) -> Result<PublicIp> {
        let opts = RequestOpts::new(Some(req.region.clone()), Some(req.project_tag.clone()));
        self.send(Method::POST, "/api/v2/public-ips", req, &opts).await
    }

    pub async fn list_public_ips(&self, opts: &RequestOpts) -> Result<Vec<PublicIp>> {
        self.get("/api/v2/public-ips", opts).await
    }

    pub async fn get_public_ip(&self, ip_id: i64, opts: &RequestOpts) -> Result<PublicIp> {
        self.get(&format!("/api/v2/public-ips/{ip_id}"), opts).await
    }

    /// Only the name can change in place.
    pub async fn update_public_ip(
        &self,
        ip_id: i64,
        req: &UpdatePublicIpRequest,
        opts: &RequestOpts,
    ) -> Result<PublicIp> {
        self.send(Method::PATCH, &format!("/api/v2/public-ips/{ip_id}"), req, opts)
            .await
    }

    pub async fn delete_public_ip(&self, ip_id: i64, opts: &RequestOpts) -> Result<()> {
        self.call_allow_404(
            Method::DELETE,
            &format!("/api/v2/public-ips/{ip_id}"),
            opts,
            "public ip",
        )
        .await
    }
}
