use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, ContainerStatus, Event, Namespace, Node, Pod, Secret, Service,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, Time};
use kube::ResourceExt;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{
    ConfigMapData, ConfigMapInfo, ContainerInfo, ContainerUsage, EventInfo, GatewayInfo,
    IngressInfo, IngressRule, NamespaceInfo, NodeCondition, NodeInfo, OwnerRef, PodInfo,
    PodMetrics, ResourceAmounts, ResourceType, SecretData, SecretInfo, ServiceInfo, Usage,
    VirtualServiceInfo, WorkloadInfo,
};

pub fn time_to_utc(time: &Time) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(time.0.as_second(), 0)
}

fn created(meta: &ObjectMeta) -> Option<DateTime<Utc>> {
    meta.creation_timestamp.as_ref().and_then(time_to_utc)
}

pub fn namespace_info(namespace: &Namespace) -> NamespaceInfo {
    let phase = namespace
        .status
        .as_ref()
        .and_then(|status| status.phase.clone())
        .unwrap_or_else(|| "Active".to_string());
    let phase = if namespace.metadata.deletion_timestamp.is_some() {
        "Terminating".to_string()
    } else {
        phase
    };

    NamespaceInfo {
        name: namespace.name_any(),
        phase,
        created: created(&namespace.metadata),
    }
}

pub fn pod_info(pod: &Pod) -> PodInfo {
    let status = pod.status.as_ref();
    let statuses = status
        .and_then(|status| status.container_statuses.as_deref())
        .unwrap_or(&[]);
    let spec_containers = pod
        .spec
        .as_ref()
        .map(|spec| spec.containers.as_slice())
        .unwrap_or(&[]);

    let containers = spec_containers
        .iter()
        .map(|container| {
            let status = statuses.iter().find(|status| status.name == container.name);
            let requests = amounts(
                container
                    .resources
                    .as_ref()
                    .and_then(|resources| resources.requests.as_ref()),
            );
            let limits = amounts(
                container
                    .resources
                    .as_ref()
                    .and_then(|resources| resources.limits.as_ref()),
            );
            let ports = container
                .ports
                .as_deref()
                .unwrap_or(&[])
                .iter()
                .filter_map(|port| u16::try_from(port.container_port).ok())
                .collect();
            let (state, state_message) = status
                .map(container_state)
                .unwrap_or_else(|| ("Waiting".to_string(), None));
            let (last_termination_reason, last_exit_code) = status
                .and_then(|status| status.last_state.as_ref())
                .and_then(|state| state.terminated.as_ref())
                .map(|terminated| (terminated.reason.clone(), Some(terminated.exit_code)))
                .unwrap_or((None, None));

            ContainerInfo {
                name: container.name.clone(),
                image: container.image.clone().unwrap_or_else(|| "-".to_string()),
                ready: status.map(|status| status.ready).unwrap_or(false),
                state,
                state_message,
                restarts: status.map(|status| status.restart_count).unwrap_or(0),
                last_termination_reason,
                last_exit_code,
                requests,
                limits,
                ports,
            }
        })
        .collect::<Vec<_>>();

    let ready_containers = containers.iter().filter(|container| container.ready).count();
    let restarts = containers.iter().map(|container| container.restarts).sum();
    let phase = status
        .and_then(|status| status.phase.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    let conditions = status
        .and_then(|status| status.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .map(|condition| (condition.type_.clone(), condition.status.clone()))
                .collect()
        })
        .unwrap_or_default();
    let (config_map_refs, secret_refs) = pod
        .spec
        .as_ref()
        .and_then(|spec| serde_json::to_value(spec).ok())
        .map(|spec| pod_references(&spec))
        .unwrap_or_default();

    PodInfo {
        namespace: pod.namespace().unwrap_or_default(),
        name: pod.name_any(),
        status: pod_display_status(pod, &containers, &phase),
        phase,
        ready_containers,
        total_containers: containers.len(),
        restarts,
        node: pod.spec.as_ref().and_then(|spec| spec.node_name.clone()),
        pod_ip: status.and_then(|status| status.pod_ip.clone()),
        host_ip: status.and_then(|status| status.host_ip.clone()),
        created: created(&pod.metadata),
        labels: pod.labels().clone(),
        owners: pod
            .owner_references()
            .iter()
            .map(|owner| OwnerRef {
                kind: owner.kind.clone(),
                name: owner.name.clone(),
            })
            .collect(),
        containers,
        conditions,
        config_map_refs,
        secret_refs,
        manifest: String::new(),
    }
}

/// Mirrors the STATUS column of `kubectl get pods`.
fn pod_display_status(pod: &Pod, containers: &[ContainerInfo], phase: &str) -> String {
    if pod.metadata.deletion_timestamp.is_some() {
        return "Terminating".to_string();
    }
    if let Some(reason) = pod.status.as_ref().and_then(|status| status.reason.clone()) {
        return reason;
    }
    containers
        .iter()
        .find(|container| !container.ready && container.state != "Running")
        .filter(|container| container.state != "Completed" || phase != "Succeeded")
        .map(|container| container.state.clone())
        .unwrap_or_else(|| phase.to_string())
}

fn container_state(status: &ContainerStatus) -> (String, Option<String>) {
    if let Some(state) = status.state.as_ref() {
        if state.running.is_some() {
            return ("Running".to_string(), None);
        }
        if let Some(waiting) = state.waiting.as_ref() {
            let label = waiting
                .reason
                .clone()
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| "Waiting".to_string());
            return (label, waiting.message.clone());
        }
        if let Some(terminated) = state.terminated.as_ref() {
            let label = terminated
                .reason
                .clone()
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| format!("Exit({})", terminated.exit_code));
            return (label, terminated.message.clone());
        }
    }

    ("Unknown".to_string(), None)
}

/// ConfigMap and Secret names a pod spec refers to through volumes, env and pull secrets.
pub fn pod_references(spec: &Value) -> (Vec<String>, Vec<String>) {
    let mut config_maps = BTreeSet::new();
    let mut secrets = BTreeSet::new();

    for volume in array(spec, "volumes") {
        if let Some(name) = volume.pointer("/configMap/name").and_then(Value::as_str) {
            config_maps.insert(name.to_string());
        }
        if let Some(name) = volume.pointer("/secret/secretName").and_then(Value::as_str) {
            secrets.insert(name.to_string());
        }
        for source in volume
            .pointer("/projected/sources")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            if let Some(name) = source.pointer("/configMap/name").and_then(Value::as_str) {
                config_maps.insert(name.to_string());
            }
            if let Some(name) = source.pointer("/secret/name").and_then(Value::as_str) {
                secrets.insert(name.to_string());
            }
        }
    }

    let containers = array(spec, "containers").chain(array(spec, "initContainers"));
    for container in containers {
        for env_from in array(container, "envFrom") {
            if let Some(name) = env_from.pointer("/configMapRef/name").and_then(Value::as_str) {
                config_maps.insert(name.to_string());
            }
            if let Some(name) = env_from.pointer("/secretRef/name").and_then(Value::as_str) {
                secrets.insert(name.to_string());
            }
        }
        for env in array(container, "env") {
            if let Some(name) = env
                .pointer("/valueFrom/configMapKeyRef/name")
                .and_then(Value::as_str)
            {
                config_maps.insert(name.to_string());
            }
            if let Some(name) = env
                .pointer("/valueFrom/secretKeyRef/name")
                .and_then(Value::as_str)
            {
                secrets.insert(name.to_string());
            }
        }
    }

    for pull_secret in array(spec, "imagePullSecrets") {
        if let Some(name) = pull_secret.get("name").and_then(Value::as_str) {
            secrets.insert(name.to_string());
        }
    }

    (
        config_maps.into_iter().collect(),
        secrets.into_iter().collect(),
    )
}

fn array<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn match_labels(selector: Option<&LabelSelector>) -> BTreeMap<String, String> {
    selector
        .and_then(|selector| selector.match_labels.clone())
        .unwrap_or_default()
}

fn replica_status(desired: i32, ready: i32) -> String {
    if desired == 0 {
        "Scaled to 0".to_string()
    } else if ready >= desired {
        "Running".to_string()
    } else if ready == 0 {
        "Unavailable".to_string()
    } else {
        "Progressing".to_string()
    }
}

pub fn deployment_workload(deployment: &Deployment) -> WorkloadInfo {
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);
    let ready = deployment
        .status
        .as_ref()
        .and_then(|status| status.ready_replicas)
        .unwrap_or(0);

    WorkloadInfo {
        namespace: deployment.namespace().unwrap_or_default(),
        name: deployment.name_any(),
        kind: ResourceType::Deployments,
        ready: format!("{ready}/{desired}"),
        status: replica_status(desired, ready),
        replicas: Some(desired),
        ready_replicas: ready,
        selector: match_labels(deployment.spec.as_ref().map(|spec| &spec.selector)),
        created: created(&deployment.metadata),
    }
}

pub fn statefulset_workload(statefulset: &StatefulSet) -> WorkloadInfo {
    let desired = statefulset
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);
    let ready = statefulset
        .status
        .as_ref()
        .and_then(|status| status.ready_replicas)
        .unwrap_or(0);

    WorkloadInfo {
        namespace: statefulset.namespace().unwrap_or_default(),
        name: statefulset.name_any(),
        kind: ResourceType::StatefulSets,
        ready: format!("{ready}/{desired}"),
        status: replica_status(desired, ready),
        replicas: Some(desired),
        ready_replicas: ready,
        selector: match_labels(statefulset.spec.as_ref().map(|spec| &spec.selector)),
        created: created(&statefulset.metadata),
    }
}

pub fn daemonset_workload(daemonset: &DaemonSet) -> WorkloadInfo {
    let (desired, ready) = daemonset
        .status
        .as_ref()
        .map(|status| (status.desired_number_scheduled, status.number_ready))
        .unwrap_or((0, 0));

    WorkloadInfo {
        namespace: daemonset.namespace().unwrap_or_default(),
        name: daemonset.name_any(),
        kind: ResourceType::DaemonSets,
        ready: format!("{ready}/{desired}"),
        status: if desired == 0 {
            "No nodes".to_string()
        } else {
            replica_status(desired, ready)
        },
        replicas: None,
        ready_replicas: ready,
        selector: match_labels(daemonset.spec.as_ref().map(|spec| &spec.selector)),
        created: created(&daemonset.metadata),
    }
}

pub fn job_workload(job: &Job) -> WorkloadInfo {
    let status = job.status.as_ref();
    let succeeded = status.and_then(|status| status.succeeded).unwrap_or(0);
    let failed = status.and_then(|status| status.failed).unwrap_or(0);
    let active = status.and_then(|status| status.active).unwrap_or(0);
    let completions = job
        .spec
        .as_ref()
        .and_then(|spec| spec.completions)
        .unwrap_or(1);
    let complete = status
        .and_then(|status| status.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|condition| condition.type_ == "Complete" && condition.status == "True")
        });
    let label = if complete || succeeded >= completions {
        "Complete"
    } else if failed > 0 && active == 0 {
        "Failed"
    } else if active > 0 {
        "Running"
    } else {
        "Pending"
    };

    WorkloadInfo {
        namespace: job.namespace().unwrap_or_default(),
        name: job.name_any(),
        kind: ResourceType::Jobs,
        ready: format!("{succeeded}/{completions}"),
        status: label.to_string(),
        replicas: None,
        ready_replicas: succeeded,
        selector: match_labels(job.spec.as_ref().and_then(|spec| spec.selector.as_ref())),
        created: created(&job.metadata),
    }
}

pub fn cronjob_workload(cronjob: &CronJob) -> WorkloadInfo {
    let suspended = cronjob
        .spec
        .as_ref()
        .and_then(|spec| spec.suspend)
        .unwrap_or(false);
    let active = cronjob
        .status
        .as_ref()
        .and_then(|status| status.active.as_ref())
        .map(Vec::len)
        .unwrap_or(0);
    let schedule = cronjob
        .spec
        .as_ref()
        .map(|spec| spec.schedule.clone())
        .unwrap_or_default();
    let label = if suspended {
        "Suspended".to_string()
    } else if active > 0 {
        format!("Active ({active})")
    } else {
        format!("Scheduled {schedule}")
    };

    WorkloadInfo {
        namespace: cronjob.namespace().unwrap_or_default(),
        name: cronjob.name_any(),
        kind: ResourceType::CronJobs,
        ready: format!("{active} active"),
        status: label,
        replicas: None,
        ready_replicas: active as i32,
        selector: BTreeMap::new(),
        created: created(&cronjob.metadata),
    }
}

pub fn pod_workload(pod: &PodInfo) -> WorkloadInfo {
    WorkloadInfo {
        namespace: pod.namespace.clone(),
        name: pod.name.clone(),
        kind: ResourceType::Pods,
        ready: pod.ready_label(),
        status: pod.status.clone(),
        replicas: None,
        ready_replicas: pod.ready_containers as i32,
        selector: BTreeMap::new(),
        created: pod.created,
    }
}

pub fn config_map_info(config_map: &ConfigMap) -> ConfigMapInfo {
    let keys = config_map.data.as_ref().map(BTreeMap::len).unwrap_or(0)
        + config_map.binary_data.as_ref().map(BTreeMap::len).unwrap_or(0);
    ConfigMapInfo {
        namespace: config_map.namespace().unwrap_or_default(),
        name: config_map.name_any(),
        keys,
        created: created(&config_map.metadata),
    }
}

pub fn config_map_data(config_map: &ConfigMap) -> ConfigMapData {
    let mut data = config_map.data.clone().unwrap_or_default();
    for (key, value) in config_map.binary_data.iter().flatten() {
        data.insert(key.clone(), format!("<binary, {} bytes>", value.0.len()));
    }
    ConfigMapData {
        namespace: config_map.namespace().unwrap_or_default(),
        name: config_map.name_any(),
        data,
    }
}

pub fn secret_info(secret: &Secret) -> SecretInfo {
    SecretInfo {
        namespace: secret.namespace().unwrap_or_default(),
        name: secret.name_any(),
        type_: secret.type_.clone().unwrap_or_else(|| "Opaque".to_string()),
        keys: secret.data.as_ref().map(BTreeMap::len).unwrap_or(0),
        created: created(&secret.metadata),
    }
}

/// Values are already base64-decoded by the client; non-UTF-8 payloads are summarized.
pub fn secret_data(secret: &Secret) -> SecretData {
    let mut data = BTreeMap::new();
    for (key, value) in secret.data.iter().flatten() {
        let decoded = match String::from_utf8(value.0.clone()) {
            Ok(text) => text,
            Err(_) => format!("<binary, {} bytes>", value.0.len()),
        };
        data.insert(key.clone(), decoded);
    }
    for (key, value) in secret.string_data.iter().flatten() {
        data.insert(key.clone(), value.clone());
    }

    SecretData {
        namespace: secret.namespace().unwrap_or_default(),
        name: secret.name_any(),
        type_: secret.type_.clone().unwrap_or_else(|| "Opaque".to_string()),
        data,
    }
}

pub fn node_info(node: &Node) -> NodeInfo {
    let status = node.status.as_ref();
    let conditions = status
        .and_then(|status| status.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .map(|condition| NodeCondition {
                    type_: condition.type_.clone(),
                    status: condition.status.clone(),
                    reason: condition.reason.clone(),
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let ready = conditions
        .iter()
        .any(|condition| condition.type_ == "Ready" && condition.status == "True");
    let capacity = status.and_then(|status| status.capacity.as_ref());
    let allocatable = status.and_then(|status| status.allocatable.as_ref());
    let info = status.and_then(|status| status.node_info.as_ref());
    let taints = node
        .spec
        .as_ref()
        .and_then(|spec| spec.taints.as_ref())
        .map(|taints| {
            taints
                .iter()
                .map(|taint| match taint.value.as_deref() {
                    Some(value) if !value.is_empty() => {
                        format!("{}={}:{}", taint.key, value, taint.effect)
                    }
                    _ => format!("{}:{}", taint.key, taint.effect),
                })
                .collect()
        })
        .unwrap_or_default();

    NodeInfo {
        name: node.name_any(),
        ready,
        unschedulable: node
            .spec
            .as_ref()
            .and_then(|spec| spec.unschedulable)
            .unwrap_or(false),
        roles: node_roles(node.labels()),
        version: info
            .map(|info| info.kubelet_version.clone())
            .unwrap_or_default(),
        os_image: info.map(|info| info.os_image.clone()).unwrap_or_default(),
        kernel: info
            .map(|info| info.kernel_version.clone())
            .unwrap_or_default(),
        runtime: info
            .map(|info| info.container_runtime_version.clone())
            .unwrap_or_default(),
        created: created(&node.metadata),
        cpu_capacity: quantity(capacity, "cpu", parse_cpu_millicores),
        cpu_allocatable: quantity(allocatable, "cpu", parse_cpu_millicores),
        memory_capacity: quantity(capacity, "memory", parse_memory_bytes),
        memory_allocatable: quantity(allocatable, "memory", parse_memory_bytes),
        pods_capacity: capacity
            .and_then(|map| map.get("pods"))
            .and_then(|value| value.0.parse::<u64>().ok()),
        conditions,
        taints,
        usage: None,
    }
}

fn node_roles(labels: &BTreeMap<String, String>) -> String {
    let mut roles = labels
        .keys()
        .filter_map(|key| key.strip_prefix("node-role.kubernetes.io/"))
        .map(|role| {
            if role.is_empty() {
                "worker".to_string()
            } else {
                role.to_string()
            }
        })
        .collect::<Vec<_>>();

    if roles.is_empty()
        && let Some(role) = labels.get("kubernetes.io/role")
    {
        roles.push(role.clone());
    }

    if roles.is_empty() {
        "-".to_string()
    } else {
        roles.sort();
        roles.dedup();
        roles.join(",")
    }
}

pub fn event_info(event: &Event) -> EventInfo {
    let last_seen = event
        .event_time
        .as_ref()
        .and_then(|time| DateTime::<Utc>::from_timestamp(time.0.as_second(), 0))
        .or_else(|| event.last_timestamp.as_ref().and_then(time_to_utc))
        .or_else(|| event.first_timestamp.as_ref().and_then(time_to_utc))
        .or_else(|| created(&event.metadata));
    let source = event
        .source
        .as_ref()
        .and_then(|source| source.component.clone())
        .or_else(|| event.reporting_component.clone())
        .unwrap_or_default();

    EventInfo {
        type_: event.type_.clone().unwrap_or_else(|| "Normal".to_string()),
        reason: event.reason.clone().unwrap_or_default(),
        message: event
            .message
            .clone()
            .unwrap_or_default()
            .trim()
            .to_string(),
        count: event.count.unwrap_or(1),
        last_seen,
        source,
    }
}

pub fn parse_pod_metrics(data: &Value) -> PodMetrics {
    let containers = array(data, "containers")
        .map(|container| ContainerUsage {
            name: container
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            usage: container.get("usage").map(parse_usage).unwrap_or_default(),
        })
        .collect();
    PodMetrics { containers }
}

pub fn parse_usage(value: &Value) -> Usage {
    Usage {
        cpu_millicores: value
            .get("cpu")
            .and_then(Value::as_str)
            .and_then(parse_cpu_millicores)
            .unwrap_or(0),
        memory_bytes: value
            .get("memory")
            .and_then(Value::as_str)
            .and_then(parse_memory_bytes)
            .unwrap_or(0),
    }
}

pub fn service_info(service: &Service) -> ServiceInfo {
    let spec = service.spec.as_ref();
    let ports = spec
        .and_then(|spec| spec.ports.as_ref())
        .map(|ports| {
            ports
                .iter()
                .map(|port| {
                    let protocol = port.protocol.clone().unwrap_or_else(|| "TCP".to_string());
                    format!("{}/{}", port.port, protocol)
                })
                .collect::<Vec<_>>()
                .join(",")
        })
        .filter(|ports| !ports.is_empty())
        .unwrap_or_else(|| "-".to_string());

    ServiceInfo {
        name: service.name_any(),
        type_: spec
            .and_then(|spec| spec.type_.clone())
            .unwrap_or_else(|| "ClusterIP".to_string()),
        cluster_ip: spec
            .and_then(|spec| spec.cluster_ip.clone())
            .unwrap_or_else(|| "-".to_string()),
        ports,
    }
}

pub fn service_selects(service: &Service, labels: &BTreeMap<String, String>) -> bool {
    let Some(selector) = service
        .spec
        .as_ref()
        .and_then(|spec| spec.selector.as_ref())
    else {
        return false;
    };
    if selector.is_empty() || labels.is_empty() {
        return false;
    }
    selector
        .iter()
        .all(|(key, value)| labels.get(key) == Some(value))
}

const INGRESS_DEBUG_PREFIXES: [&str; 4] = [
    "nginx.ingress.kubernetes.io/",
    "traefik.ingress.kubernetes.io/",
    "alb.ingress.kubernetes.io/",
    "cert-manager.io/",
];

/// Builds an ingress summary from its JSON form, keeping only rules that route to `services`.
pub fn ingress_info(ingress: &Value, services: &[String]) -> Option<IngressInfo> {
    let name = ingress
        .pointer("/metadata/name")
        .and_then(Value::as_str)?
        .to_string();
    let spec = ingress.get("spec")?;
    let mut rules = Vec::new();

    for rule in array(spec, "rules") {
        let host = rule
            .get("host")
            .and_then(Value::as_str)
            .unwrap_or("*")
            .to_string();
        for path in rule
            .pointer("/http/paths")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let Some(service) = path
                .pointer("/backend/service/name")
                .and_then(Value::as_str)
            else {
                continue;
            };
            if !services.iter().any(|name| name == service) {
                continue;
            }
            let port = path
                .pointer("/backend/service/port/number")
                .map(|number| number.to_string())
                .or_else(|| {
                    path.pointer("/backend/service/port/name")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "-".to_string());
            rules.push(IngressRule {
                host: host.clone(),
                path: path
                    .get("path")
                    .and_then(Value::as_str)
                    .unwrap_or("/")
                    .to_string(),
                backend: format!("{service}:{port}"),
            });
        }
    }

    if let Some(service) = spec
        .pointer("/defaultBackend/service/name")
        .and_then(Value::as_str)
        && services.iter().any(|name| name == service)
    {
        rules.push(IngressRule {
            host: "*".to_string(),
            path: "(default)".to_string(),
            backend: service.to_string(),
        });
    }

    if rules.is_empty() {
        return None;
    }

    let class = spec
        .get("ingressClassName")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            ingress
                .pointer("/metadata/annotations/kubernetes.io~1ingress.class")
                .and_then(Value::as_str)
                .map(str::to_string)
        });
    let tls_hosts = array(spec, "tls")
        .flat_map(|tls| array(tls, "hosts"))
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    let debug_annotations = ingress
        .pointer("/metadata/annotations")
        .and_then(Value::as_object)
        .map(|annotations| {
            annotations
                .iter()
                .filter(|(key, _)| {
                    INGRESS_DEBUG_PREFIXES
                        .iter()
                        .any(|prefix| key.starts_with(prefix))
                })
                .map(|(key, value)| {
                    (
                        key.clone(),
                        value.as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    Some(IngressInfo {
        name,
        class,
        tls_hosts,
        rules,
        debug_annotations,
    })
}

fn host_matches_service(host: &str, service: &str, namespace: &str) -> bool {
    host == service
        || host == format!("{service}.{namespace}")
        || host == format!("{service}.{namespace}.svc")
        || host == format!("{service}.{namespace}.svc.cluster.local")
}

/// Istio VirtualService routing to one of `services`, from its dynamic `spec`.
pub fn virtual_service_info(
    name: &str,
    spec: &Value,
    services: &[String],
    namespace: &str,
) -> Option<VirtualServiceInfo> {
    let mut destinations = BTreeSet::new();
    for protocol in ["http", "tcp", "tls"] {
        for route in array(spec, protocol) {
            for destination in array(route, "route") {
                if let Some(host) = destination
                    .pointer("/destination/host")
                    .and_then(Value::as_str)
                {
                    destinations.insert(host.to_string());
                }
            }
        }
    }

    let routes_to_pod = destinations.iter().any(|host| {
        services
            .iter()
            .any(|service| host_matches_service(host, service, namespace))
    });
    if !routes_to_pod {
        return None;
    }

    Some(VirtualServiceInfo {
        name: name.to_string(),
        hosts: strings(spec, "hosts"),
        gateways: strings(spec, "gateways"),
        destinations: destinations.into_iter().collect(),
    })
}

pub fn gateway_info(namespace: &str, name: &str, spec: &Value) -> GatewayInfo {
    let servers = array(spec, "servers")
        .map(|server| {
            let port = server
                .pointer("/port/number")
                .map(Value::to_string)
                .unwrap_or_else(|| "-".to_string());
            let protocol = server
                .pointer("/port/protocol")
                .and_then(Value::as_str)
                .unwrap_or("-");
            let hosts = strings(server, "hosts").join(",");
            format!("{protocol}:{port} {hosts}")
        })
        .collect();
    GatewayInfo {
        namespace: namespace.to_string(),
        name: name.to_string(),
        servers,
    }
}

fn strings(value: &Value, key: &str) -> Vec<String> {
    array(value, key)
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

/// Clears server-populated metadata so the object can be created in `namespace`.
pub fn prepare_copy(meta: &ObjectMeta, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: meta.name.clone(),
        namespace: Some(namespace.to_string()),
        labels: meta.labels.clone(),
        annotations: meta.annotations.clone().map(|mut annotations| {
            annotations.remove("kubectl.kubernetes.io/last-applied-configuration");
            annotations
        }),
        ..ObjectMeta::default()
    }
}

pub fn copied_config_map(source: &ConfigMap, namespace: &str) -> ConfigMap {
    ConfigMap {
        metadata: prepare_copy(&source.metadata, namespace),
        data: source.data.clone(),
        binary_data: source.binary_data.clone(),
        immutable: source.immutable,
    }
}

pub fn copied_secret(source: &Secret, namespace: &str) -> Secret {
    Secret {
        metadata: prepare_copy(&source.metadata, namespace),
        data: source.data.clone(),
        string_data: source.string_data.clone(),
        type_: source.type_.clone(),
        immutable: source.immutable,
    }
}

pub fn manifest<T>(value: &T) -> String
where
    T: Serialize,
{
    serde_yaml::to_string(value).unwrap_or_else(|error| format!("failed to format manifest: {error}"))
}

pub fn selector_query(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn amounts(map: Option<&BTreeMap<String, Quantity>>) -> ResourceAmounts {
    ResourceAmounts {
        cpu_millicores: quantity(map, "cpu", parse_cpu_millicores),
        memory_bytes: quantity(map, "memory", parse_memory_bytes),
    }
}

fn quantity(
    map: Option<&BTreeMap<String, Quantity>>,
    key: &str,
    parse: fn(&str) -> Option<u64>,
) -> Option<u64> {
    map.and_then(|map| map.get(key))
        .and_then(|value| parse(&value.0))
}

pub fn parse_cpu_millicores(value: &str) -> Option<u64> {
    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    let (number, multiplier) = if let Some(number) = raw.strip_suffix('m') {
        (number, 1.0)
    } else if let Some(number) = raw.strip_suffix('u') {
        (number, 0.001)
    } else if let Some(number) = raw.strip_suffix('n') {
        (number, 0.000001)
    } else {
        (raw, 1000.0)
    };

    let numeric = number.parse::<f64>().ok()?;
    let millicores = (numeric * multiplier).round();
    if !millicores.is_finite() || millicores < 0.0 {
        return None;
    }
    Some(millicores as u64)
}

pub fn parse_memory_bytes(value: &str) -> Option<u64> {
    const UNITS: [(&str, f64); 8] = [
        ("Ti", 1_099_511_627_776.0),
        ("Gi", 1_073_741_824.0),
        ("Mi", 1_048_576.0),
        ("Ki", 1_024.0),
        ("T", 1_000_000_000_000.0),
        ("G", 1_000_000_000.0),
        ("M", 1_000_000.0),
        ("k", 1_000.0),
    ];

    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    let (number, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, multiplier)| {
            raw.strip_suffix(suffix)
                .map(|number| (number, *multiplier))
        })
        .unwrap_or((raw, 1.0));

    let bytes = (number.parse::<f64>().ok()? * multiplier).round();
    if !bytes.is_finite() || bytes < 0.0 {
        return None;
    }
    Some(bytes as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn crashing_pod() -> Pod {
        serde_json::from_value(json!({
            "metadata": {
                "name": "api-7d9f-abcde",
                "namespace": "prod",
                "labels": {"app": "api"},
                "ownerReferences": [{
                    "apiVersion": "apps/v1",
                    "kind": "ReplicaSet",
                    "name": "api-7d9f",
                    "uid": "1"
                }]
            },
            "spec": {
                "nodeName": "node-a",
                "containers": [{
                    "name": "api",
                    "image": "registry/api:1.2",
                    "ports": [{"containerPort": 8080}],
                    "resources": {
                        "requests": {"cpu": "250m", "memory": "128Mi"},
                        "limits": {"cpu": "1", "memory": "256Mi"}
                    },
                    "envFrom": [{"configMapRef": {"name": "api-env"}}],
                    "env": [{
                        "name": "TOKEN",
                        "valueFrom": {"secretKeyRef": {"name": "api-token", "key": "token"}}
                    }]
                }],
                "volumes": [{"name": "tls", "secret": {"secretName": "api-tls"}}],
                "imagePullSecrets": [{"name": "regcred"}]
            },
            "status": {
                "phase": "Running",
                "podIP": "10.0.0.4",
                "containerStatuses": [{
                    "name": "api",
                    "image": "registry/api:1.2",
                    "imageID": "",
                    "ready": false,
                    "restartCount": 7,
                    "state": {"waiting": {"reason": "CrashLoopBackOff", "message": "back-off"}},
                    "lastState": {"terminated": {"exitCode": 137, "reason": "OOMKilled"}}
                }]
            }
        }))
        .unwrap()
    }

    #[test]
    fn pod_info_reports_waiting_reason_as_status() {
        let info = pod_info(&crashing_pod());

        assert_eq!(info.status, "CrashLoopBackOff");
        assert_eq!(info.phase, "Running");
        assert_eq!(info.ready_label(), "0/1");
        assert_eq!(info.restarts, 7);
        assert_eq!(info.node.as_deref(), Some("node-a"));
        assert_eq!(info.owners[0].kind, "ReplicaSet");

        let container = &info.containers[0];
        assert_eq!(container.last_termination_reason.as_deref(), Some("OOMKilled"));
        assert_eq!(container.last_exit_code, Some(137));
        assert_eq!(container.requests.cpu_millicores, Some(250));
        assert_eq!(container.limits.memory_bytes, Some(256 * 1_048_576));
        assert_eq!(container.ports, vec![8080]);
    }

    #[test]
    fn pod_references_collect_volumes_env_and_pull_secrets() {
        let info = pod_info(&crashing_pod());

        assert_eq!(info.config_map_refs, vec!["api-env".to_string()]);
        assert_eq!(
            info.secret_refs,
            vec![
                "api-tls".to_string(),
                "api-token".to_string(),
                "regcred".to_string()
            ]
        );
    }

    #[test]
    fn deployment_status_reflects_replicas() {
        let deployment: Deployment = serde_json::from_value(json!({
            "metadata": {"name": "api", "namespace": "prod"},
            "spec": {
                "replicas": 0,
                "selector": {"matchLabels": {"app": "api"}},
                "template": {}
            }
        }))
        .unwrap();

        let workload = deployment_workload(&deployment);

        assert_eq!(workload.ready, "0/0");
        assert_eq!(workload.status, "Scaled to 0");
        assert_eq!(workload.replicas, Some(0));
        assert_eq!(workload.selector.get("app").map(String::as_str), Some("api"));
    }

    #[test]
    fn terminating_namespace_is_detected() {
        let namespace: Namespace = serde_json::from_value(json!({
            "metadata": {"name": "old"},
            "status": {"phase": "Terminating"}
        }))
        .unwrap();

        let info = namespace_info(&namespace);

        assert!(!info.is_active());
    }

    #[test]
    fn ingress_keeps_only_rules_for_matching_services() {
        let ingress = json!({
            "metadata": {
                "name": "public",
                "annotations": {
                    "nginx.ingress.kubernetes.io/rewrite-target": "/",
                    "unrelated": "x"
                }
            },
            "spec": {
                "ingressClassName": "nginx",
                "tls": [{"hosts": ["api.example.com"]}],
                "rules": [{
                    "host": "api.example.com",
                    "http": {"paths": [
                        {"path": "/", "pathType": "Prefix",
                         "backend": {"service": {"name": "api", "port": {"number": 80}}}},
                        {"path": "/admin", "pathType": "Prefix",
                         "backend": {"service": {"name": "admin", "port": {"number": 80}}}}
                    ]}
                }]
            }
        });

        let info = ingress_info(&ingress, &["api".to_string()]).unwrap();

        assert_eq!(info.class.as_deref(), Some("nginx"));
        assert_eq!(info.tls_hosts, vec!["api.example.com".to_string()]);
        assert_eq!(info.rules.len(), 1);
        assert_eq!(info.rules[0].backend, "api:80");
        assert_eq!(info.debug_annotations.len(), 1);
        assert!(ingress_info(&ingress, &["other".to_string()]).is_none());
    }

    #[test]
    fn virtual_service_matches_short_and_fqdn_hosts() {
        let spec = json!({
            "hosts": ["api.example.com"],
            "gateways": ["istio-system/public"],
            "http": [{"route": [{"destination": {"host": "api.prod.svc.cluster.local"}}]}]
        });

        let info = virtual_service_info("api", &spec, &["api".to_string()], "prod").unwrap();

        assert_eq!(info.gateways, vec!["istio-system/public".to_string()]);
        assert!(virtual_service_info("api", &spec, &["web".to_string()], "prod").is_none());
    }

    #[test]
    fn copied_secret_drops_server_metadata() {
        let secret: Secret = serde_json::from_value(json!({
            "metadata": {
                "name": "regcred",
                "namespace": "source",
                "resourceVersion": "42",
                "uid": "abc"
            },
            "type": "kubernetes.io/dockerconfigjson",
            "data": {".dockerconfigjson": "e30="}
        }))
        .unwrap();

        let copy = copied_secret(&secret, "target");

        assert_eq!(copy.metadata.namespace.as_deref(), Some("target"));
        assert_eq!(copy.metadata.resource_version, None);
        assert_eq!(copy.metadata.uid, None);
        assert_eq!(copy.type_, secret.type_);
        assert_eq!(copy.data, secret.data);
    }

    #[test]
    fn quantities_parse_like_the_api_server() {
        assert_eq!(parse_cpu_millicores("250m"), Some(250));
        assert_eq!(parse_cpu_millicores("2"), Some(2_000));
        assert_eq!(parse_cpu_millicores("1500000n"), Some(2));
        assert_eq!(parse_memory_bytes("128Mi"), Some(134_217_728));
        assert_eq!(parse_memory_bytes("1G"), Some(1_000_000_000));
        assert_eq!(parse_memory_bytes("512"), Some(512));
        assert_eq!(parse_memory_bytes(""), None);
    }

    #[test]
    fn pod_metrics_parse_each_container() {
        let metrics = parse_pod_metrics(&json!({
            "containers": [
                {"name": "api", "usage": {"cpu": "12m", "memory": "64Mi"}},
                {"name": "sidecar", "usage": {"cpu": "3m", "memory": "16Mi"}}
            ]
        }));

        assert_eq!(metrics.containers.len(), 2);
        assert_eq!(metrics.total().cpu_millicores, 15);
        assert_eq!(
            metrics.usage_for("sidecar").map(|usage| usage.memory_bytes),
            Some(16 * 1_048_576)
        );
    }
}
