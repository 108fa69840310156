//! In-memory ProData API for reconciler tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use prodata_api::{BoxError, ClientConfig, HttpRequest, HttpResponse, ProdataClient, Transport};
use prodata_infra::Provisioner;
use reqwest::Method;
use serde_json::{Value, json};

const BASE: &str = "http://prodata.test/panel-main";

/// One observed request, e.g. `POST /api/v2/vms/41/stop`.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub body: Option<Value>,
}

impl Call {
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Routes keyed by `METHOD /path`. Each route replays its replies in order
/// and keeps returning the last one. Unrouted calls get a 500.
#[derive(Default)]
pub struct FakeApi {
    routes: Mutex<HashMap<String, VecDeque<HttpResponse>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, route: &str, replies: Vec<HttpResponse>) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .insert(route.to_string(), replies.into());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.calls().iter().map(Call::key).collect()
    }

    pub fn count(&self, route: &str) -> usize {
        self.calls().iter().filter(|c| c.key() == route).count()
    }
}

#[async_trait]
impl Transport for FakeApi {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, BoxError> {
        let rest = req.url.strip_prefix(BASE).unwrap_or(&req.url);
        let (path, query) = match rest.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (rest.to_string(), None),
        };
        let call = Call {
            method: req.method.clone(),
            path,
            query,
            body: req.body.as_deref().map(|b| serde_json::from_str(b).unwrap()),
        };
        let key = call.key();
        self.calls.lock().unwrap().push(call);

        let mut routes = self.routes.lock().unwrap();
        let reply = routes.get_mut(&key).and_then(|replies| {
            if replies.len() > 1 {
                replies.pop_front()
            } else {
                replies.front().cloned()
            }
        });
        Ok(reply.unwrap_or_else(|| status(500, &format!("no route for {key}"))))
    }
}

pub fn ok(data: Value) -> HttpResponse {
    status(200, &json!({ "success": true, "data": data, "errors": [] }).to_string())
}

/// A 200 carrying `success: false`.
pub fn api_error(code: i64, message: &str) -> HttpResponse {
    status(
        200,
        &json!({ "success": false, "data": null, "errors": [{ "code": code, "message": message }] })
            .to_string(),
    )
}

pub fn status(code: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status: code,
        body: body.into(),
    }
}

pub fn vm(id: i64, name: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "status": status,
        "cpuCores": 1,
        "ram": 1,
        "diskSize": 10,
        "diskType": "HDD",
        "privateIp": "10.0.0.5",
        "publicIp": "",
        "localNetworkId": 9,
        "description": ""
    })
}

pub fn config() -> ClientConfig {
    ClientConfig {
        api_base_url: "http://prodata.test".into(),
        api_key_id: "key-1".into(),
        api_secret_key: "s3cr3t-value-1234".into(),
        region: "uz-tas".into(),
        project_tag: "default".into(),
        timeout: prodata_api::DEFAULT_TIMEOUT,
    }
}

pub fn provisioner(api: Arc<FakeApi>) -> Provisioner {
    Provisioner::new(ProdataClient::with_transport(config(), api).unwrap())
}
