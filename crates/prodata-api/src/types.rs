use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

// ── Envelope ─────────────────────────────────────────────────────────

/// Error code the API uses for "name already in use".
pub const NAME_IN_USE_CODE: i64 = 666;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for ApiErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

// ── Virtual machines ─────────────────────────────────────────────────

/// Server-reported VM status. Anything other than the three terminal
/// statuses is a transient provisioning state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VmStatus {
    Running,
    Stopped,
    Error,
    Other(String),
}

impl VmStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "RUNNING",
            Self::Stopped => "STOPPED",
            Self::Error => "ERROR",
            Self::Other(s) => s,
        }
    }

    /// `RUNNING`, `STOPPED` and `ERROR` admit no further automatic transition.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// A response without a status is treated as still provisioning.
impl Default for VmStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for VmStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "RUNNING" => Self::Running,
            "STOPPED" => Self::Stopped,
            "ERROR" => Self::Error,
            _ => Self::Other(s),
        }
    }
}

impl From<VmStatus> for String {
    fn from(status: VmStatus) -> Self {
        match status {
            VmStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for VmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiskType {
    Hdd,
    Ssd,
    Nvme,
}

impl DiskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hdd => "HDD",
            Self::Ssd => "SSD",
            Self::Nvme => "NVME",
        }
    }
}

impl fmt::Display for DiskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiskType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_uppercase().as_str() {
            "HDD" => Ok(Self::Hdd),
            "SSD" => Ok(Self::Ssd),
            "NVME" => Ok(Self::Nvme),
            other => Err(Error::InvalidInput(format!(
                "disk type must be HDD, SSD or NVME, got {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vm {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: VmStatus,
    #[serde(default)]
    pub cpu_cores: i64,
    #[serde(default)]
    pub ram: i64,
    #[serde(default)]
    pub disk_size: i64,
    #[serde(default)]
    pub disk_type: String,
    #[serde(default)]
    pub private_ip: String,
    #[serde(default)]
    pub public_ip: String,
    #[serde(default)]
    pub local_network_id: i64,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVmRequest {
    pub region: String,
    pub project_tag: String,
    pub name: String,
    pub image_id: i64,
    pub cpu_cores: i64,
    pub ram: i64,
    pub disk_size: i64,
    pub disk_type: DiskType,
    pub local_network_id: i64,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// Password stays out of logs.
impl fmt::Debug for CreateVmRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateVmRequest")
            .field("region", &self.region)
            .field("project_tag", &self.project_tag)
            .field("name", &self.name)
            .field("image_id", &self.image_id)
            .field("cpu_cores", &self.cpu_cores)
            .field("ram", &self.ram)
            .field("disk_size", &self.disk_size)
            .field("disk_type", &self.disk_type)
            .field("local_network_id", &self.local_network_id)
            .field("password", &"<redacted>")
            .field("private_ip", &self.private_ip)
            .field("public_ip_id", &self.public_ip_id)
            .field("ssh_public_key", &self.ssh_public_key.as_ref().map(|_| "<set>"))
            .field("description", &self.description)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameVmRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachPublicIpRequest {
    pub public_ip_id: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachVolumeRequest {
    pub volume_id: i64,
}

/// The VM-side disk record created by an attach call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttachedVolume {
    pub id: i64,
}

// ── Volumes ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: i64,
    #[serde(default)]
    pub in_use: bool,
    #[serde(default)]
    pub attached_id: Option<i64>,
}

impl Volume {
    pub fn is_attached_to(&self, vm_id: i64) -> bool {
        self.in_use && self.attached_id == Some(vm_id)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVolumeRequest {
    pub region: String,
    pub project_tag: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVolumeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

// ── Public IPs ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIp {
    pub id: i64,
    pub name: String,
    pub ip: String,
    #[serde(default)]
    pub mask: String,
    #[serde(default)]
    pub gateway: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePublicIpRequest {
    pub region: String,
    pub project_tag: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdatePublicIpRequest {
    pub name: String,
}

// ── Local networks ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalNetwork {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub cidr: String,
    #[serde(default)]
    pub gateway: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocalNetworkRequest {
    pub region: String,
    pub project_tag: String,
    pub name: String,
    pub cidr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateLocalNetworkRequest {
    pub name: String,
}

// ── Images ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub is_custom: bool,
}

/// Image lookup selector; the API accepts exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSelector {
    Slug(String),
    Name(String),
}
