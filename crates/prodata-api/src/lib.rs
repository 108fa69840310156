//! Typed Rust client for the ProData panel API.
//!
//! Covers the subset needed to manage compute resources:
//! VMs (lifecycle, rename, public IP and volume attachment), volumes,
//! public IPs, local networks and images.
//!
//! Every response is wrapped in a `{success, data, errors}` envelope; this
//! crate unwraps it and maps each failure mode to a distinct [`Error`]
//! variant. Nothing here retries.

mod images;
mod networks;
mod public_ips;
mod scope;
mod transport;
mod types;
mod vms;
mod volumes;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, warn};

pub use scope::{RequestOpts, Scope, resolve};
pub use transport::{BoxError, HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use types::*;

const API_PREFIX: &str = "/panel-main";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("prodata {method} {url} failed: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("prodata {method} {url} returned {status}: {body}")]
    Http {
        method: Method,
        url: String,
        status: u16,
        body: String,
        errors: Vec<ApiErrorDetail>,
    },

    #[error("prodata {method} {url} returned a malformed envelope (status {status}): {source}; body: {body}")]
    Protocol {
        method: Method,
        url: String,
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("prodata {} {}: api error: {}", .method, .url, format_api_errors(.errors))]
    Api {
        method: Method,
        url: String,
        errors: Vec<ApiErrorDetail>,
    },

    #[error("prodata {method} {url}: unexpected data shape: {source}")]
    Decode {
        method: Method,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("client config: {0}")]
    Config(String),
}

impl Error {
    /// Error codes reported by the API, from either a failed envelope or a
    /// non-2xx body that happened to carry one.
    pub fn api_errors(&self) -> &[ApiErrorDetail] {
        match self {
            Self::Api { errors, .. } | Self::Http { errors, .. } => errors,
            _ => &[],
        }
    }

    /// The API refused a create because the name is already taken.
    pub fn is_name_conflict(&self) -> bool {
        self.api_errors().iter().any(|e| e.code == NAME_IN_USE_CODE)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status: 404, .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn format_api_errors(errors: &[ApiErrorDetail]) -> String {
    if errors.is_empty() {
        return "unknown error".into();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// `abcd****wxyz` for long secrets, `****` otherwise.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".into();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}

/// Connection settings and default scope for a [`ProdataClient`].
#[derive(Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub api_key_id: String,
    pub api_secret_key: String,
    pub region: String,
    pub project_tag: String,
    pub timeout: Duration,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_key_id", &self.api_key_id)
            .field("api_secret_key", &mask_secret(&self.api_secret_key))
            .field("region", &self.region)
            .field("project_tag", &self.project_tag)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Client for the ProData panel REST API.
///
/// Cheap to clone; the transport is shared and holds no per-call state.
#[derive(Clone)]
pub struct ProdataClient {
    base_url: String,
    api_key_id: String,
    api_secret_key: String,
    defaults: Scope,
    transport: Arc<dyn Transport>,
}

impl ProdataClient {
    pub fn new(cfg: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(cfg.timeout)
            .map_err(|e| Error::Config(format!("build http client: {e}")))?;
        Self::with_transport(cfg, Arc::new(transport))
    }

    pub fn with_transport(cfg: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        if cfg.api_base_url.is_empty() || cfg.api_key_id.is_empty() || cfg.api_secret_key.is_empty() {
            return Err(Error::Config(
                "api_base_url, api_key_id, and api_secret_key are required".into(),
            ));
        }

        Ok(Self {
            base_url: format!("{}{API_PREFIX}", cfg.api_base_url.trim_end_matches('/')),
            api_key_id: cfg.api_key_id,
            api_secret_key: cfg.api_secret_key,
            defaults: Scope::new(cfg.region, cfg.project_tag),
            transport,
        })
    }

    /// Client-level scope used when a call supplies no override.
    pub fn defaults(&self) -> &Scope {
        &self.defaults
    }

    pub fn resolve_scope(&self, opts: &RequestOpts) -> Scope {
        Scope::resolve(&self.defaults, opts)
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let raw = format!("{}{path}", self.base_url);
        let mut url = Url::parse(&raw).map_err(|e| Error::Config(format!("invalid url {raw}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url.into())
    }

    pub(crate) fn json_body<B: Serialize + ?Sized>(body: &B) -> Result<String> {
        serde_json::to_string(body).map_err(Error::Encode)
    }

    /// Issue one request and unwrap the envelope into `T`.
    ///
    /// Headers always carry the effective scope; `query` is appended as given.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<String>,
        opts: &RequestOpts,
    ) -> Result<T> {
        let scope = self.resolve_scope(opts);
        let url = self.url(path, query)?;

        debug!(
            method = %method,
            url = %url,
            region = %scope.region,
            project_tag = %scope.project_tag,
            "prodata: request"
        );

        let req = HttpRequest {
            method: method.clone(),
            url: url.clone(),
            headers: vec![
                ("Content-Type", "application/json".into()),
                ("X-Api-Key-Id", self.api_key_id.clone()),
                ("X-Api-Secret-Key", self.api_secret_key.clone()),
                ("X-Region", scope.region),
                ("X-Project-Tag", scope.project_tag),
            ],
            body,
        };

        let resp = match self.transport.send(req).await {
            Ok(resp) => resp,
            Err(source) => return Err(Error::Transport { method, url, source }),
        };

        if !(200..300).contains(&resp.status) {
            let errors = serde_json::from_str::<Envelope>(&resp.body)
                .map(|env| env.errors)
                .unwrap_or_default();
            return Err(Error::Http {
                method,
                url,
                status: resp.status,
                body: resp.body,
                errors,
            });
        }

        let envelope: Envelope = match serde_json::from_str(&resp.body) {
            Ok(env) => env,
            Err(source) => {
                return Err(Error::Protocol {
                    method,
                    url,
                    status: resp.status,
                    body: resp.body,
                    source,
                });
            }
        };

        if !envelope.success {
            return Err(Error::Api {
                method,
                url,
                errors: envelope.errors,
            });
        }

        serde_json::from_value(envelope.data).map_err(|source| Error::Decode { method, url, source })
    }

    /// GET with explicit overrides sent as query parameters.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str, opts: &RequestOpts) -> Result<T> {
        self.execute(Method::GET, path, &opts.query(), None, opts).await
    }

    /// Body-carrying call; overrides go in headers only.
    pub(crate) async fn send<B, T>(&self, method: Method, path: &str, body: &B, opts: &RequestOpts) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = Self::json_body(body)?;
        self.execute(method, path, &[], Some(body), opts).await
    }

    /// Bodiless call whose `data` is ignored.
    pub(crate) async fn call(&self, method: Method, path: &str, opts: &RequestOpts) -> Result<()> {
        self.execute::<IgnoredAny>(method, path, &opts.query(), None, opts)
            .await?;
        Ok(())
    }

    /// Like `call` but treats 404 as success (for delete idempotency).
    pub(crate) async fn call_allow_404(
        &self,
        method: Method,
        path: &str,
        opts: &RequestOpts,
        what: &'static str,
    ) -> Result<()> {
        match self.call(method, path, opts).await {
            Err(e) if e.is_not_found() => {
                warn!(path, "prodata: {what} already gone");
                Ok(())
            }
            other => other,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replies in order; the last reply repeats once the queue drains.
    pub struct Scripted {
        replies: Mutex<VecDeque<std::result::Result<HttpResponse, String>>>,
        pub seen: Mutex<Vec<HttpRequest>>,
    }

    impl Scripted {
        pub fn new(replies: Vec<std::result::Result<HttpResponse, String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        pub fn ok(data: serde_json::Value) -> std::result::Result<HttpResponse, String> {
            Ok(HttpResponse {
                status: 200,
                body: serde_json::json!({ "success": true, "data": data, "errors": [] }).to_string(),
            })
        }

        pub fn raw(status: u16, body: &str) -> std::result::Result<HttpResponse, String> {
            Ok(HttpResponse {
                status,
                body: body.into(),
            })
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Transport for Scripted {
        async fn send(&self, req: HttpRequest) -> std::result::Result<HttpResponse, BoxError> {
            self.seen.lock().unwrap().push(req);
            let mut replies = self.replies.lock().unwrap();
            let reply = if replies.len() > 1 {
                replies.pop_front()
            } else {
                replies.front().cloned()
            };
            match reply {
                Some(Ok(resp)) => Ok(resp),
                Some(Err(msg)) => Err(msg.into()),
                None => Err("no scripted reply".into()),
            }
        }
    }

    pub fn config() -> ClientConfig {
        ClientConfig {
            api_base_url: "https://api.prodata.test/".into(),
            api_key_id: "key-1".into(),
            api_secret_key: "s3cr3t-value-1234".into(),
            region: "uz-tas".into(),
            project_tag: "default".into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn client(transport: Arc<Scripted>) -> ProdataClient {
        ProdataClient::with_transport(config(), transport).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::test_support::{Scripted, client, config};
    use super::*;

    #[tokio::test]
    async fn unwraps_successful_envelope() {
        let t = Scripted::new(vec![Scripted::ok(json!({"id": 7, "name": "web-1", "ip": "1.2.3.4"}))]);
        let c = client(t.clone());

        let ip: PublicIp = c.get("/api/v2/public-ips/7", &RequestOpts::default()).await.unwrap();

        assert_eq!(ip.id, 7);
        assert_eq!(ip.mask, "");
        let req = &t.requests()[0];
        assert_eq!(req.url, "https://api.prodata.test/panel-main/api/v2/public-ips/7");
    }

    #[tokio::test]
    async fn joins_api_error_messages() {
        let t = Scripted::new(vec![Scripted::raw(
            200,
            r#"{"success":false,"data":null,"errors":[{"code":12,"message":"bad cpu"},{"code":13,"message":"bad ram"}]}"#,
        )]);
        let err = client(t)
            .get::<Vm>("/api/v2/vms/1", &RequestOpts::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Api { .. }));
        assert!(err.to_string().contains("[12] bad cpu; [13] bad ram"));
        assert!(!err.is_name_conflict());
    }

    #[tokio::test]
    async fn empty_error_list_gets_generic_message() {
        let t = Scripted::new(vec![Scripted::raw(200, r#"{"success":false}"#)]);
        let err = client(t)
            .get::<Vm>("/api/v2/vms/1", &RequestOpts::default())
            .await
            .unwrap_err();

        assert!(err.to_string().ends_with("api error: unknown error"));
    }

    #[tokio::test]
    async fn name_conflict_is_a_typed_condition() {
        let t = Scripted::new(vec![Scripted::raw(
            200,
            r#"{"success":false,"errors":[{"code":666,"message":"name taken"}]}"#,
        )]);
        let err = client(t)
            .get::<Vm>("/api/v2/vms", &RequestOpts::default())
            .await
            .unwrap_err();

        assert!(err.is_name_conflict());
    }

    #[tokio::test]
    async fn non_2xx_keeps_status_body_and_codes() {
        let body = r#"{"success":false,"errors":[{"code":666,"message":"name taken"}]}"#;
        let t = Scripted::new(vec![Scripted::raw(409, body)]);
        let err = client(t)
            .get::<Vm>("/api/v2/vms", &RequestOpts::default())
            .await
            .unwrap_err();

        match &err {
            Error::Http { status, body: raw, .. } => {
                assert_eq!(*status, 409);
                assert_eq!(raw, body);
            }
            other => panic!("expected Http, got {other:?}"),
        }
        assert!(err.is_name_conflict());
    }

    #[tokio::test]
    async fn malformed_envelope_is_protocol_error() {
        let t = Scripted::new(vec![Scripted::raw(200, "<html>gateway</html>")]);
        let err = client(t)
            .get::<Vm>("/api/v2/vms/1", &RequestOpts::default())
            .await
            .unwrap_err();

        match err {
            Error::Protocol { body, status, .. } => {
                assert_eq!(status, 200);
                assert_eq!(body, "<html>gateway</html>");
            }
            other => panic!("expected Protocol, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn shape_mismatch_is_decode_error() {
        let t = Scripted::new(vec![Scripted::ok(json!({"id": "not-a-number"}))]);
        let err = client(t)
            .get::<Vm>("/api/v2/vms/1", &RequestOpts::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Decode { .. }));
    }

    #[tokio::test]
    async fn transport_failure_carries_method_and_url() {
        let t = Scripted::new(vec![Err("connection refused".into())]);
        let err = client(t)
            .get::<Vm>("/api/v2/vms/1", &RequestOpts::default())
            .await
            .unwrap_err();

        match &err {
            Error::Transport { method, url, .. } => {
                assert_eq!(*method, Method::GET);
                assert!(url.ends_with("/api/v2/vms/1"));
            }
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn headers_use_override_only_for_that_call() {
        let t = Scripted::new(vec![Scripted::ok(json!([]))]);
        let c = client(t.clone());

        let _: Vec<Vm> = c
            .get("/api/v2/vms", &RequestOpts::new(Some("kz-ala".into()), None))
            .await
            .unwrap();
        let _: Vec<Vm> = c.get("/api/v2/vms", &RequestOpts::default()).await.unwrap();

        let reqs = t.requests();
        assert_eq!(reqs[0].header("X-Region"), Some("kz-ala"));
        assert_eq!(reqs[0].header("X-Project-Tag"), Some("default"));
        assert_eq!(reqs[1].header("X-Region"), Some("uz-tas"));
        assert_eq!(reqs[0].header("Content-Type"), Some("application/json"));
        assert_eq!(reqs[0].header("X-Api-Key-Id"), Some("key-1"));
        assert_eq!(reqs[0].header("X-Api-Secret-Key"), Some("s3cr3t-value-1234"));
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let mut cfg = config();
        cfg.api_secret_key.clear();

        let err = ProdataClient::with_transport(cfg, Scripted::new(vec![])).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn secrets_are_masked_in_debug_output() {
        assert_eq!(mask_secret("s3cr3t-value-1234"), "s3cr****1234");
        assert_eq!(mask_secret("short"), "****");
        assert!(!format!("{:?}", config()).contains("s3cr3t-value-1234"));
    }
}
