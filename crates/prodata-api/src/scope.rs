use serde::{Deserialize, Serialize};

/// The (region, project tag) pair that partitions every remote resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub region: String,
    pub project_tag: String,
}

impl Scope {
    pub fn new(region: impl Into<String>, project_tag: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            project_tag: project_tag.into(),
        }
    }

    /// Effective scope for one call: explicit overrides win, empty means default.
    pub fn resolve(defaults: &Scope, opts: &RequestOpts) -> Scope {
        Scope {
            region: resolve(opts.region(), &defaults.region),
            project_tag: resolve(opts.project_tag(), &defaults.project_tag),
        }
    }
}

/// Pick the per-call value when it is present and non-empty, else the default.
pub fn resolve(call_override: Option<&str>, client_default: &str) -> String {
    match call_override {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => client_default.to_string(),
    }
}

/// Per-call scope overrides.
///
/// Only overrides that were explicitly supplied are sent as query parameters;
/// an empty string is treated the same as an absent override. Persisted with
/// a resource so later calls carry the same overrides and nothing more.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOpts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    project_tag: Option<String>,
}

impl RequestOpts {
    pub fn new(region: Option<String>, project_tag: Option<String>) -> Self {
        Self {
            region: region.filter(|s| !s.is_empty()),
            project_tag: project_tag.filter(|s| !s.is_empty()),
        }
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn project_tag(&self) -> Option<&str> {
        self.project_tag.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_none() && self.project_tag.is_none()
    }

    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(region) = self.region().filter(|s| !s.is_empty()) {
            query.push(("region", region.to_string()));
        }
        if let Some(tag) = self.project_tag().filter(|s| !s.is_empty()) {
            query.push(("projectTag", tag.to_string()));
        }
        query
    }
}

impl From<&Scope> for RequestOpts {
    fn from(scope: &Scope) -> Self {
        Self::new(Some(scope.region.clone()), Some(scope.project_tag.clone()))
    }
}
