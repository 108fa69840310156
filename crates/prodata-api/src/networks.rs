use reqwest::Method;

use crate::{
    CreateLocalNetworkRequest, LocalNetwork, ProdataClient, RequestOpts, Result,
    UpdateLocalNetworkRequest,
};

// ── Local networks ───────────────────────────────────────────────────

impl ProdataClient {
    pub async fn create_local_network(&self, req: &CreateLocalNetworkRequest) -> Result<LocalNetwork> {
        let opts = RequestOpts::new(Some(req.region.clone()), Some(req.project_tag.clone()));
        self.send(Method::POST, "/api/v2/local-networks", req, &opts)
            .await
    }

    pub async fn list_local_networks(&self, opts: &RequestOpts) -> Result<Vec<LocalNetwork>> {
        self.get("/api/v2/local-networks", opts).await
    }

    pub async fn get_local_network(&self, network_id: i64, opts: &RequestOpts) -> Result<LocalNetwork> {
        self.get(&format!("/api/v2/local-networks/{network_id}"), opts)
            .await
    }

    pub async fn update_local_network(
        &self,
        network_id: i64,
        req: &UpdateLocalNetworkRequest,
        opts: &RequestOpts,
    ) -> Result<LocalNetwork> {
        self.send(
            Method::PATCH,
            &format!("/api/v2/local-networks/{network_id}"),
            req,
            opts,
        )
        .await
    }

    pub async fn delete_local_network(&self, network_id: i64, opts: &RequestOpts) -> Result<()> {
        self.call_allow_404(
            Method::DELETE,
            &format!("/api/v2/local-networks/{network_id}"),
            opts,
            "local network",
        )
        .await
    }
}
