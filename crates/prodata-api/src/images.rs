use crate::{Image, ImageSelector, ProdataClient, RequestOpts, Result};

// ── Images ───────────────────────────────────────────────────────────

impl ProdataClient {
    /// Look an image up by slug or name. Unlike other reads, the effective
    /// scope is always sent as query parameters.
    pub async fn get_image(&self, selector: &ImageSelector, opts: &RequestOpts) -> Result<Image> {
        let scope = self.resolve_scope(opts);
        let mut query = vec![
            ("region", scope.region),
            ("projectTag", scope.project_tag),
        ];
        match selector {
            ImageSelector::Slug(slug) => query.push(("slug", slug.clone())),
            ImageSelector::Name(name) => query.push(("name", name.clone())),
        }

        self.execute(reqwest::Method::GET, "/api/v2/image", &query, None, opts)
            .await
    }

    pub async fn list_images(&self, opts: &RequestOpts) -> Result<Vec<Image>> {
        self.get("/api/v2/images", opts).await
    }
}
