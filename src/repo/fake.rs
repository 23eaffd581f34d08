use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Mutex;

use super::Repository;
use crate::error::{RepoError, RepoResult};
use crate::model::{
    ConfigMapData, ConfigMapInfo, EventInfo, LogQuery, NamespaceInfo, NodeInfo, PodInfo,
    PodMetrics, RelatedResources, ResourceType, SecretData, SecretInfo, WorkloadInfo, WorkloadRef,
};

/// In-memory cluster for task and controller tests. Mutations are recorded in `calls`.
#[derive(Default)]
pub struct FakeRepository {
    pub namespaces: Vec<NamespaceInfo>,
    pub workloads: Vec<WorkloadInfo>,
    pub pods: Vec<PodInfo>,
    pub config_maps: Vec<ConfigMapData>,
    pub secrets: Vec<SecretData>,
    pub nodes: Vec<NodeInfo>,
    pub events: Vec<EventInfo>,
    pub logs: String,
    pub metrics: Option<PodMetrics>,
    pub failing_namespaces: BTreeSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeRepository {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn pod(&self, namespace: &str, name: &str) -> RepoResult<PodInfo> {
        self.pods
            .iter()
            .find(|pod| pod.namespace == namespace && pod.name == name)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(format!("pods \"{name}\" not found")))
    }

    fn check_target(&self, target: &str) -> RepoResult<()> {
        if self.failing_namespaces.contains(target) {
            return Err(RepoError::PermissionDenied(format!(
                "cannot create in namespace {target}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for FakeRepository {
    async fn list_namespaces(&self) -> RepoResult<Vec<NamespaceInfo>> {
        Ok(self.namespaces.clone())
    }

    async fn list_workloads(
        &self,
        namespace: &str,
        kind: ResourceType,
    ) -> RepoResult<Vec<WorkloadInfo>> {
        Ok(self
            .workloads
            .iter()
            .filter(|workload| workload.namespace == namespace && workload.kind == kind)
            .cloned()
            .collect())
    }

    async fn get_workload_pods(&self, workload: &WorkloadRef) -> RepoResult<Vec<PodInfo>> {
        Ok(self
            .pods
            .iter()
            .filter(|pod| {
                pod.namespace == workload.namespace
                    && pod.owners.iter().any(|owner| owner.name.starts_with(&workload.name))
            })
            .cloned()
            .collect())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> RepoResult<PodInfo> {
        self.pod(namespace, name)
    }

    async fn list_all_pods(&self, namespace: &str) -> RepoResult<Vec<PodInfo>> {
        Ok(self
            .pods
            .iter()
            .filter(|pod| pod.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn list_config_maps(&self, namespace: &str) -> RepoResult<Vec<ConfigMapInfo>> {
        Ok(self
            .config_maps
            .iter()
            .filter(|config_map| config_map.namespace == namespace)
            .map(|config_map| ConfigMapInfo {
                namespace: config_map.namespace.clone(),
                name: config_map.name.clone(),
                keys: config_map.data.len(),
                created: None,
            })
            .collect())
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> RepoResult<ConfigMapData> {
        self.config_maps
            .iter()
            .find(|config_map| config_map.namespace == namespace && config_map.name == name)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(format!("configmaps \"{name}\" not found")))
    }

    async fn list_secrets(&self, namespace: &str) -> RepoResult<Vec<SecretInfo>> {
        Ok(self
            .secrets
            .iter()
            .filter(|secret| secret.namespace == namespace)
            .map(|secret| SecretInfo {
                namespace: secret.namespace.clone(),
                name: secret.name.clone(),
                type_: secret.type_.clone(),
                keys: secret.data.len(),
                created: None,
            })
            .collect())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> RepoResult<SecretData> {
        self.secrets
            .iter()
            .find(|secret| secret.namespace == namespace && secret.name == name)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(format!("secrets \"{name}\" not found")))
    }

    async fn list_nodes(&self) -> RepoResult<Vec<NodeInfo>> {
        Ok(self.nodes.clone())
    }

    async fn get_node(&self, name: &str) -> RepoResult<NodeInfo> {
        self.nodes
            .iter()
            .find(|node| node.name == name)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(format!("nodes \"{name}\" not found")))
    }

    async fn list_pods_by_node(&self, node: &str) -> RepoResult<Vec<PodInfo>> {
        Ok(self
            .pods
            .iter()
            .filter(|pod| pod.node.as_deref() == Some(node))
            .cloned()
            .collect())
    }

    async fn get_pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        query: &LogQuery,
    ) -> RepoResult<String> {
        self.record(format!(
            "logs {namespace}/{pod} container={} previous={}",
            query.container.as_deref().unwrap_or("-"),
            query.previous
        ));
        Ok(self.logs.clone())
    }

    async fn get_all_container_logs(
        &self,
        namespace: &str,
        pod: &str,
        _tail_lines: i64,
    ) -> RepoResult<String> {
        self.record(format!("logs {namespace}/{pod} all"));
        Ok(self.logs.clone())
    }

    async fn get_previous_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        _tail_lines: i64,
    ) -> RepoResult<String> {
        self.record(format!("logs {namespace}/{pod} container={container} previous=true"));
        Ok(self.logs.clone())
    }

    async fn get_pod_events(&self, _namespace: &str, _pod: &str) -> RepoResult<Vec<EventInfo>> {
        Ok(self.events.clone())
    }

    async fn get_pod_metrics(
        &self,
        _namespace: &str,
        _pod: &str,
    ) -> RepoResult<Option<PodMetrics>> {
        Ok(self.metrics.clone())
    }

    async fn get_related_resources(&self, pod: &PodInfo) -> RepoResult<RelatedResources> {
        Ok(RelatedResources {
            config_maps: pod.config_map_refs.clone(),
            secrets: pod.secret_refs.clone(),
            ..RelatedResources::default()
        })
    }

    async fn describe_pod(&self, namespace: &str, name: &str) -> RepoResult<String> {
        let pod = self.pod(namespace, name)?;
        Ok(format!("Name: {}\nStatus: {}", pod.name, pod.status))
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> RepoResult<()> {
        self.pod(namespace, name)?;
        self.record(format!("delete pod {namespace}/{name}"));
        Ok(())
    }

    async fn scale_workload(
        &self,
        namespace: &str,
        name: &str,
        kind: ResourceType,
        replicas: i32,
    ) -> RepoResult<()> {
        self.record(format!(
            "scale {} {namespace}/{name} {replicas}",
            kind.kubectl_name()
        ));
        Ok(())
    }

    async fn restart_workload(
        &self,
        namespace: &str,
        name: &str,
        kind: ResourceType,
    ) -> RepoResult<()> {
        self.record(format!("restart {} {namespace}/{name}", kind.kubectl_name()));
        Ok(())
    }

    async fn copy_config_map_to_namespace(
        &self,
        source_namespace: &str,
        name: &str,
        target_namespace: &str,
    ) -> RepoResult<()> {
        self.record(format!("copy configmap {source_namespace}/{name} -> {target_namespace}"));
        self.check_target(target_namespace)
    }

    async fn copy_secret_to_namespace(
        &self,
        source_namespace: &str,
        name: &str,
        target_namespace: &str,
    ) -> RepoResult<()> {
        self.record(format!("copy secret {source_namespace}/{name} -> {target_namespace}"));
        self.check_target(target_namespace)
    }

    async fn force_delete_namespace(&self, name: &str) -> RepoResult<()> {
        self.record(format!("force delete namespace {name}"));
        Ok(())
    }
}
