//! Durable representation of managed resources and the rules for merging
//! server responses into it.
//!
//! Two policies apply throughout:
//! - empty strings from the server become `None` for optional display fields;
//! - nothing is inferred that the server (or the caller's plan) did not supply.
//!
//! Every record keeps the resolved `scope` for display and the caller's
//! explicit `overrides`, which are the only scope sent on later calls.

use prodata_api::{DiskType, LocalNetwork, PublicIp, RequestOpts, Scope, Vm, VmStatus, Volume};
use serde::{Deserialize, Serialize};

use crate::vm::VmPlan;

/// `None` for an empty string, the owned value otherwise.
pub fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// One persisted resource of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceState {
    Vm(VmState),
    Volume(VolumeState),
    PublicIp(PublicIpState),
    LocalNetwork(LocalNetworkState),
    VolumeAttachment(VolumeAttachmentState),
    PublicIpAttachment(PublicIpAttachmentState),
}

impl ResourceState {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Vm(_) => "vm",
            Self::Volume(_) => "volume",
            Self::PublicIp(_) => "public_ip",
            Self::LocalNetwork(_) => "local_network",
            Self::VolumeAttachment(_) => "volume_attachment",
            Self::PublicIpAttachment(_) => "public_ip_attachment",
        }
    }
}

// ── VM ───────────────────────────────────────────────────────────────

/// The password is write-only and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmState {
    pub id: i64,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "RequestOpts::is_empty")]
    pub overrides: RequestOpts,
    pub name: String,
    pub image_id: i64,
    pub cpu_cores: i64,
    pub ram: i64,
    pub disk_size: i64,
    pub disk_type: DiskType,
    pub local_network_id: i64,
    pub status: VmStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl VmState {
    /// State right after a create, from whatever the server last reported.
    ///
    /// Immutable attributes come from the plan: during provisioning the
    /// server may still echo template defaults for them. Identity, status
    /// and network addresses come from the server.
    pub fn from_created(plan: &VmPlan, scope: &Scope, vm: &Vm) -> Self {
        Self {
            id: vm.id,
            scope: scope.clone(),
            overrides: plan.overrides(),
            name: plan.name.clone(),
            image_id: plan.image_id,
            cpu_cores: plan.cpu_cores,
            ram: plan.ram,
            disk_size: plan.disk_size,
            disk_type: plan.disk_type,
            local_network_id: plan.local_network_id,
            status: vm.status.clone(),
            private_ip: non_empty(&vm.private_ip).or_else(|| plan.private_ip.clone()),
            public_ip_id: plan.public_ip_id,
            public_ip: non_empty(&vm.public_ip),
            ssh_public_key: plan.ssh_public_key.clone().filter(|s| !s.is_empty()),
            description: plan.description.clone().filter(|s| !s.is_empty()),
        }
    }

    /// Merge a fresh read. Everything the server reports wins; fields it
    /// never reports (image, SSH key, public IP id) are kept.
    pub fn refresh(&mut self, vm: &Vm) {
        self.name = vm.name.clone();
        self.status = vm.status.clone();
        self.cpu_cores = vm.cpu_cores;
        self.ram = vm.ram;
        self.disk_size = vm.disk_size;
        if let Ok(disk_type) = vm.disk_type.parse() {
            self.disk_type = disk_type;
        }
        self.local_network_id = vm.local_network_id;
        self.private_ip = non_empty(&vm.private_ip);
        self.public_ip = non_empty(&vm.public_ip);
        self.description = non_empty(&vm.description);
    }
}

// ── Volume ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeState {
    pub id: i64,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "RequestOpts::is_empty")]
    pub overrides: RequestOpts,
    pub name: String,
    /// Server-reported disk type, e.g. `SSD`.
    pub disk_type: String,
    pub size: i64,
    pub in_use: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_vm_id: Option<i64>,
}

impl VolumeState {
    pub fn from_server(scope: &Scope, overrides: &RequestOpts, volume: &Volume) -> Self {
        Self {
            id: volume.id,
            scope: scope.clone(),
            overrides: overrides.clone(),
            name: volume.name.clone(),
            disk_type: volume.kind.clone(),
            size: volume.size,
            in_use: volume.in_use,
            attached_vm_id: volume.attached_id,
        }
    }
}

// ── Public IP ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIpState {
    pub id: i64,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "RequestOpts::is_empty")]
    pub overrides: RequestOpts,
    pub name: String,
    pub ip: String,
    pub mask: String,
    pub gateway: String,
}

impl PublicIpState {
    pub fn from_server(scope: &Scope, overrides: &RequestOpts, ip: &PublicIp) -> Self {
        Self {
            id: ip.id,
            scope: scope.clone(),
            overrides: overrides.clone(),
            name: ip.name.clone(),
            ip: ip.ip.clone(),
            mask: ip.mask.clone(),
            gateway: ip.gateway.clone(),
        }
    }
}

// ── Local network ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalNetworkState {
    pub id: i64,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "RequestOpts::is_empty")]
    pub overrides: RequestOpts,
    pub name: String,
    pub cidr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
}

impl LocalNetworkState {
    pub fn from_server(scope: &Scope, overrides: &RequestOpts, net: &LocalNetwork) -> Self {
        Self {
            id: net.id,
            scope: scope.clone(),
            overrides: overrides.clone(),
            name: net.name.clone(),
            cidr: net.cidr.clone(),
            gateway: non_empty(&net.gateway),
        }
    }
}

// ── Attachments ──────────────────────────────────────────────────────

/// Binding of a volume to a VM. Lives exactly as long as the binding; the
/// volume and the VM outlive it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeAttachmentState {
    pub vm_id: i64,
    pub volume_id: i64,
    pub attached_volume_id: i64,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "RequestOpts::is_empty")]
    pub overrides: RequestOpts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIpAttachmentState {
    pub vm_id: i64,
    pub public_ip_id: i64,
    pub public_ip: String,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "RequestOpts::is_empty")]
    pub overrides: RequestOpts,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> VmPlan {
        VmPlan {
            region: None,
            project_tag: None,
            name: "web-1".into(),
            image_id: 3,
            cpu_cores: 2,
            ram: 4,
            disk_size: 20,
            disk_type: DiskType::Nvme,
            local_network_id: 9,
            private_ip: None,
            public_ip_id: None,
            password: "correct-horse".into(),
            ssh_public_key: None,
            description: Some(String::new()),
        }
    }

    fn server_vm() -> Vm {
        Vm {
            id: 41,
            name: "template-7".into(),
            status: VmStatus::Running,
            cpu_cores: 1,
            ram: 1,
            disk_size: 10,
            disk_type: "HDD".into(),
            private_ip: "10.0.0.5".into(),
            public_ip: String::new(),
            local_network_id: 9,
            description: String::new(),
        }
    }

    #[test]
    fn created_state_keeps_plan_values_for_immutable_fields() {
        let state = VmState::from_created(&plan(), &Scope::new("uz-tas", "default"), &server_vm());

        assert_eq!(state.id, 41);
        assert_eq!(state.name, "web-1");
        assert_eq!(state.cpu_cores, 2);
        assert_eq!(state.disk_type, DiskType::Nvme);
        assert_eq!(state.private_ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(state.status, VmStatus::Running);
    }

    #[test]
    fn empty_description_serializes_as_absent() {
        let state = VmState::from_created(&plan(), &Scope::new("uz-tas", "default"), &server_vm());
        assert_eq!(state.description, None);
        assert_eq!(state.public_ip, None);

        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("description").is_none());
        assert!(json.get("public_ip").is_none());

        let back: VmState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn refresh_takes_server_values_and_nulls_empty_strings() {
        let mut state = VmState::from_created(&plan(), &Scope::new("uz-tas", "default"), &server_vm());
        state.description = Some("old".into());
        state.public_ip = Some("203.0.113.10".into());

        let mut vm = server_vm();
        vm.name = "web-1-renamed".into();
        vm.status = VmStatus::Stopped;
        state.refresh(&vm);

        assert_eq!(state.name, "web-1-renamed");
        assert_eq!(state.status, VmStatus::Stopped);
        assert_eq!(state.disk_type, DiskType::Hdd);
        assert_eq!(state.description, None);
        assert_eq!(state.public_ip, None);
        assert_eq!(state.image_id, 3);
    }

    #[test]
    fn volume_without_target_projects_to_null_reference() {
        let vol = Volume {
            id: 5,
            name: "data".into(),
            kind: "SSD".into(),
            size: 50,
            in_use: false,
            attached_id: None,
        };
        let state = VolumeState::from_server(&Scope::new("uz-tas", "default"), &RequestOpts::default(), &vol);

        assert_eq!(state.attached_vm_id, None);
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("attached_vm_id").is_none());
    }

    #[test]
    fn tagged_volume_state_reads_back() {
        let vol = Volume {
            id: 5,
            name: "data".into(),
            kind: "SSD".into(),
            size: 50,
            in_use: true,
            attached_id: Some(41),
        };
        let overrides = RequestOpts::new(Some("kz-ala".into()), None);
        let state = ResourceState::Volume(VolumeState::from_server(
            &Scope::new("kz-ala", "default"),
            &overrides,
            &vol,
        ));

        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json.matches("\"kind\"").count(), 1);
        assert_eq!(serde_json::from_str::<ResourceState>(&json).unwrap(), state);
    }

    #[test]
    fn created_state_records_only_explicit_overrides() {
        let defaults = VmState::from_created(&plan(), &Scope::new("uz-tas", "default"), &server_vm());
        assert!(defaults.overrides.is_empty());
        assert!(serde_json::to_value(&defaults).unwrap().get("overrides").is_none());

        let plan = VmPlan {
            project_tag: Some("billing".into()),
            ..plan()
        };
        let scoped = VmState::from_created(&plan, &Scope::new("uz-tas", "billing"), &server_vm());
        assert_eq!(scoped.overrides, RequestOpts::new(None, Some("billing".into())));
    }

    #[test]
    fn resource_state_is_tagged_by_kind() {
        let state = ResourceState::PublicIpAttachment(PublicIpAttachmentState {
            vm_id: 41,
            public_ip_id: 12,
            public_ip: "203.0.113.10".into(),
            scope: Scope::new("uz-tas", "default"),
            overrides: RequestOpts::default(),
        });

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["kind"], state.kind());
        assert_eq!(serde_json::from_value::<ResourceState>(json).unwrap(), state);
    }
}
