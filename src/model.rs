use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    #[default]
    Deployments,
    StatefulSets,
    DaemonSets,
    Jobs,
    CronJobs,
    Pods,
}

impl ResourceType {
    pub const ALL: [ResourceType; 6] = [
        ResourceType::Deployments,
        ResourceType::StatefulSets,
        ResourceType::DaemonSets,
        ResourceType::Jobs,
        ResourceType::CronJobs,
        ResourceType::Pods,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ResourceType::Deployments => "Deployments",
            ResourceType::StatefulSets => "StatefulSets",
            ResourceType::DaemonSets => "DaemonSets",
            ResourceType::Jobs => "Jobs",
            ResourceType::CronJobs => "CronJobs",
            ResourceType::Pods => "Pods",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ResourceType::Deployments => "Stateless replicated workloads with rolling updates",
            ResourceType::StatefulSets => "Ordered workloads with stable identity and storage",
            ResourceType::DaemonSets => "One pod per matching node",
            ResourceType::Jobs => "Run-to-completion batch work",
            ResourceType::CronJobs => "Jobs created on a schedule",
            ResourceType::Pods => "Individual pods in the namespace",
        }
    }

    /// Singular kind as it appears in owner references.
    pub fn kind(self) -> &'static str {
        match self {
            ResourceType::Deployments => "Deployment",
            ResourceType::StatefulSets => "StatefulSet",
            ResourceType::DaemonSets => "DaemonSet",
            ResourceType::Jobs => "Job",
            ResourceType::CronJobs => "CronJob",
            ResourceType::Pods => "Pod",
        }
    }

    pub fn kubectl_name(self) -> &'static str {
        match self {
            ResourceType::Deployments => "deployment",
            ResourceType::StatefulSets => "statefulset",
            ResourceType::DaemonSets => "daemonset",
            ResourceType::Jobs => "job",
            ResourceType::CronJobs => "cronjob",
            ResourceType::Pods => "pod",
        }
    }

    pub fn from_kind(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|value| value.kind() == kind)
    }

    pub fn is_scalable(self) -> bool {
        matches!(self, ResourceType::Deployments | ResourceType::StatefulSets)
    }

    pub fn is_restartable(self) -> bool {
        matches!(
            self,
            ResourceType::Deployments | ResourceType::StatefulSets | ResourceType::DaemonSets
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkloadRef {
    pub namespace: String,
    pub name: String,
    pub kind: ResourceType,
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind.kind(), self.namespace, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for PodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamespaceInfo {
    pub name: String,
    pub phase: String,
    pub created: Option<DateTime<Utc>>,
}

impl NamespaceInfo {
    pub fn is_active(&self) -> bool {
        self.phase == "Active"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadInfo {
    pub namespace: String,
    pub name: String,
    pub kind: ResourceType,
    pub ready: String,
    pub status: String,
    pub replicas: Option<i32>,
    pub ready_replicas: i32,
    pub selector: BTreeMap<String, String>,
    pub created: Option<DateTime<Utc>>,
}

impl WorkloadInfo {
    pub fn reference(&self) -> WorkloadRef {
        WorkloadRef {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            kind: self.kind,
        }
    }

    pub fn matches_filter(&self, query: &str) -> bool {
        contains_ignore_case(&self.name, query) || contains_ignore_case(&self.status, query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OwnerRef {
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceAmounts {
    pub cpu_millicores: Option<u64>,
    pub memory_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerInfo {
    pub name: String,
    pub image: String,
    pub ready: bool,
    pub state: String,
    pub state_message: Option<String>,
    pub restarts: i32,
    pub last_termination_reason: Option<String>,
    pub last_exit_code: Option<i32>,
    pub requests: ResourceAmounts,
    pub limits: ResourceAmounts,
    pub ports: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PodInfo {
    pub namespace: String,
    pub name: String,
    pub phase: String,
    pub status: String,
    pub ready_containers: usize,
    pub total_containers: usize,
    pub restarts: i32,
    pub node: Option<String>,
    pub pod_ip: Option<String>,
    pub host_ip: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub labels: BTreeMap<String, String>,
    pub owners: Vec<OwnerRef>,
    pub containers: Vec<ContainerInfo>,
    pub conditions: Vec<(String, String)>,
    pub config_map_refs: Vec<String>,
    pub secret_refs: Vec<String>,
    pub manifest: String,
}

impl PodInfo {
    pub fn reference(&self) -> PodRef {
        PodRef {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }

    pub fn ready_label(&self) -> String {
        format!("{}/{}", self.ready_containers, self.total_containers)
    }

    pub fn first_port(&self) -> Option<u16> {
        self.containers
            .iter()
            .flat_map(|container| container.ports.iter().copied())
            .next()
    }

    pub fn matches_filter(&self, query: &str) -> bool {
        contains_ignore_case(&self.name, query) || contains_ignore_case(&self.status, query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigMapInfo {
    pub namespace: String,
    pub name: String,
    pub keys: usize,
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigMapData {
    pub namespace: String,
    pub name: String,
    pub data: BTreeMap<String, String>,
}

pub const DOCKER_CONFIG_JSON: &str = "kubernetes.io/dockerconfigjson";
pub const DOCKER_CFG: &str = "kubernetes.io/dockercfg";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecretInfo {
    pub namespace: String,
    pub name: String,
    pub type_: String,
    pub keys: usize,
    pub created: Option<DateTime<Utc>>,
}

impl SecretInfo {
    pub fn is_docker_registry(&self) -> bool {
        is_docker_registry_type(&self.type_)
    }
}

pub fn is_docker_registry_type(type_: &str) -> bool {
    type_ == DOCKER_CONFIG_JSON || type_ == DOCKER_CFG
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecretData {
    pub namespace: String,
    pub name: String,
    pub type_: String,
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeCondition {
    pub type_: String,
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Usage {
    pub cpu_millicores: u64,
    pub memory_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeInfo {
    pub name: String,
    pub ready: bool,
    pub unschedulable: bool,
    pub roles: String,
    pub version: String,
    pub os_image: String,
    pub kernel: String,
    pub runtime: String,
    pub created: Option<DateTime<Utc>>,
    pub cpu_capacity: Option<u64>,
    pub cpu_allocatable: Option<u64>,
    pub memory_capacity: Option<u64>,
    pub memory_allocatable: Option<u64>,
    pub pods_capacity: Option<u64>,
    pub conditions: Vec<NodeCondition>,
    pub taints: Vec<String>,
    pub usage: Option<Usage>,
}

impl NodeInfo {
    pub fn status_label(&self) -> &'static str {
        match (self.ready, self.unschedulable) {
            (true, false) => "Ready",
            (true, true) => "Ready,SchedulingDisabled",
            (false, _) => "NotReady",
        }
    }

    pub fn matches_filter(&self, query: &str) -> bool {
        contains_ignore_case(&self.name, query) || contains_ignore_case(&self.roles, query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventInfo {
    pub type_: String,
    pub reason: String,
    pub message: String,
    pub count: i32,
    pub last_seen: Option<DateTime<Utc>>,
    pub source: String,
}

impl EventInfo {
    pub fn is_warning(&self) -> bool {
        self.type_ == "Warning"
    }

    pub fn matches_filter(&self, query: &str) -> bool {
        contains_ignore_case(&self.type_, query)
            || contains_ignore_case(&self.reason, query)
            || contains_ignore_case(&self.message, query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerUsage {
    pub name: String,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PodMetrics {
    pub containers: Vec<ContainerUsage>,
}

impl PodMetrics {
    pub fn usage_for(&self, container: &str) -> Option<Usage> {
        self.containers
            .iter()
            .find(|entry| entry.name == container)
            .map(|entry| entry.usage)
    }

    pub fn total(&self) -> Usage {
        self.containers
            .iter()
            .fold(Usage::default(), |total, entry| Usage {
                cpu_millicores: total.cpu_millicores.saturating_add(entry.usage.cpu_millicores),
                memory_bytes: total.memory_bytes.saturating_add(entry.usage.memory_bytes),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceInfo {
    pub name: String,
    pub type_: String,
    pub cluster_ip: String,
    pub ports: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IngressRule {
    pub host: String,
    pub path: String,
    pub backend: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IngressInfo {
    pub name: String,
    pub class: Option<String>,
    pub tls_hosts: Vec<String>,
    pub rules: Vec<IngressRule>,
    pub debug_annotations: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VirtualServiceInfo {
    pub name: String,
    pub hosts: Vec<String>,
    pub gateways: Vec<String>,
    pub destinations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GatewayInfo {
    pub namespace: String,
    pub name: String,
    pub servers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OwnerLink {
    pub kind: String,
    pub name: String,
    pub replicas: Option<i32>,
    pub ready_replicas: Option<i32>,
}

impl OwnerLink {
    /// The owning workload that accepts scale requests, if this link is one.
    pub fn scalable_workload(&self, namespace: &str) -> Option<WorkloadRef> {
        let kind = ResourceType::from_kind(&self.kind)?;
        kind.is_scalable().then(|| WorkloadRef {
            namespace: namespace.to_string(),
            name: self.name.clone(),
            kind,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelatedResources {
    pub services: Vec<ServiceInfo>,
    pub ingresses: Vec<IngressInfo>,
    pub virtual_services: Vec<VirtualServiceInfo>,
    pub gateways: Vec<GatewayInfo>,
    pub config_maps: Vec<String>,
    pub secrets: Vec<String>,
    pub owners: Vec<OwnerLink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warn",
            Severity::Critical => "crit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugHelper {
    pub severity: Severity,
    pub title: String,
    pub detail: String,
    pub commands: Vec<String>,
}

pub const DEFAULT_TAIL_LINES: i64 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub container: Option<String>,
    pub tail_lines: i64,
    pub previous: bool,
    pub timestamps: bool,
}

impl LogQuery {
    pub fn current(container: Option<String>) -> Self {
        Self {
            container,
            tail_lines: DEFAULT_TAIL_LINES,
            previous: false,
            timestamps: true,
        }
    }
}

pub fn contains_ignore_case(haystack: &str, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    haystack.to_lowercase().contains(&query.to_lowercase())
}

pub fn format_age(created: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(created) = created else {
        return "-".to_string();
    };
    format_elapsed_seconds((now - created).num_seconds().max(0))
}

pub fn format_elapsed_seconds(seconds: i64) -> String {
    if seconds >= 86_400 {
        return format!("{}d", seconds / 86_400);
    }

    if seconds >= 3_600 {
        return format!("{}h", seconds / 3_600);
    }

    if seconds >= 60 {
        return format!("{}m", seconds / 60);
    }

    format!("{seconds}s")
}

pub fn format_cpu_millicores(value: u64) -> String {
    if value >= 1_000 {
        let cores = value as f64 / 1_000.0;
        format!("{cores:.2}c")
    } else {
        format!("{value}m")
    }
}

pub fn format_bytes(value: u64) -> String {
    const UNITS: [(&str, f64); 4] = [
        ("Ti", 1_099_511_627_776.0),
        ("Gi", 1_073_741_824.0),
        ("Mi", 1_048_576.0),
        ("Ki", 1_024.0),
    ];
    if value == 0 {
        return "0B".to_string();
    }

    let value_f64 = value as f64;
    for (suffix, unit_size) in UNITS {
        if value_f64 >= unit_size {
            return format!("{:.1}{suffix}", value_f64 / unit_size);
        }
    }
    format!("{value}B")
}

pub fn format_optional_cpu(value: Option<u64>) -> String {
    value
        .map(format_cpu_millicores)
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_optional_bytes(value: Option<u64>) -> String {
    value.map(format_bytes).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn resource_types_keep_display_order() {
        let titles = ResourceType::ALL
            .iter()
            .map(|value| value.title())
            .collect::<Vec<_>>();
        assert_eq!(
            titles,
            vec![
                "Deployments",
                "StatefulSets",
                "DaemonSets",
                "Jobs",
                "CronJobs",
                "Pods"
            ]
        );
    }

    #[test]
    fn only_deployments_and_statefulsets_scale() {
        assert!(ResourceType::Deployments.is_scalable());
        assert!(ResourceType::StatefulSets.is_scalable());
        assert!(!ResourceType::DaemonSets.is_scalable());
        assert!(ResourceType::DaemonSets.is_restartable());
        assert!(!ResourceType::Jobs.is_restartable());
    }

    #[test]
    fn owner_link_resolves_scalable_workload() {
        let owner = OwnerLink {
            kind: "Deployment".to_string(),
            name: "api".to_string(),
            replicas: Some(3),
            ready_replicas: Some(3),
        };
        assert_eq!(
            owner.scalable_workload("prod"),
            Some(WorkloadRef {
                namespace: "prod".to_string(),
                name: "api".to_string(),
                kind: ResourceType::Deployments,
            })
        );

        let replica_set = OwnerLink {
            kind: "ReplicaSet".to_string(),
            ..owner
        };
        assert_eq!(replica_set.scalable_workload("prod"), None);
    }

    #[test]
    fn age_formats_largest_unit() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_age(Some(created), now), "1d");
        assert_eq!(format_age(None, now), "-");
        assert_eq!(format_elapsed_seconds(90), "1m");
        assert_eq!(format_elapsed_seconds(7_200), "2h");
    }

    #[test]
    fn quantities_format_compactly() {
        assert_eq!(format_cpu_millicores(250), "250m");
        assert_eq!(format_cpu_millicores(1_500), "1.50c");
        assert_eq!(format_bytes(0), "0B");
        assert_eq!(format_bytes(128 * 1_048_576), "128.0Mi");
    }

    #[test]
    fn docker_registry_secrets_are_detected_by_type() {
        let secret = SecretInfo {
            type_: DOCKER_CONFIG_JSON.to_string(),
            ..SecretInfo::default()
        };
        assert!(secret.is_docker_registry());
        assert!(!is_docker_registry_type("Opaque"));
    }

    #[test]
    fn event_filter_matches_type_reason_or_message() {
        let event = EventInfo {
            type_: "Warning".to_string(),
            reason: "BackOff".to_string(),
            message: "Back-off restarting failed container".to_string(),
            ..EventInfo::default()
        };
        assert!(event.matches_filter("backoff"));
        assert!(event.matches_filter("RESTARTING"));
        assert!(event.matches_filter("warn"));
        assert!(!event.matches_filter("pulled"));
    }
}
