pub mod analyze;
pub mod cluster;
pub mod convert;
pub mod describe;
#[cfg(test)]
pub mod fake;

use crate::error::RepoResult;
use crate::model::{
    ConfigMapData, ConfigMapInfo, DebugHelper, EventInfo, LogQuery, NamespaceInfo, NodeInfo,
    PodInfo, PodMetrics, RelatedResources, ResourceType, SecretData, SecretInfo, WorkloadInfo,
    WorkloadRef,
};
use async_trait::async_trait;

/// Cluster access used by task bodies. Implementations hold no observable state.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn list_namespaces(&self) -> RepoResult<Vec<NamespaceInfo>>;
    async fn list_workloads(
        &self,
        namespace: &str,
        kind: ResourceType,
    ) -> RepoResult<Vec<WorkloadInfo>>;
    async fn get_workload_pods(&self, workload: &WorkloadRef) -> RepoResult<Vec<PodInfo>>;
    async fn get_pod(&self, namespace: &str, name: &str) -> RepoResult<PodInfo>;
    async fn list_all_pods(&self, namespace: &str) -> RepoResult<Vec<PodInfo>>;
    async fn list_config_maps(&self, namespace: &str) -> RepoResult<Vec<ConfigMapInfo>>;
    async fn get_config_map(&self, namespace: &str, name: &str) -> RepoResult<ConfigMapData>;
    async fn list_secrets(&self, namespace: &str) -> RepoResult<Vec<SecretInfo>>;
    async fn get_secret(&self, namespace: &str, name: &str) -> RepoResult<SecretData>;
    async fn list_nodes(&self) -> RepoResult<Vec<NodeInfo>>;
    async fn get_node(&self, name: &str) -> RepoResult<NodeInfo>;
    async fn list_pods_by_node(&self, node: &str) -> RepoResult<Vec<PodInfo>>;
    async fn get_pod_logs(&self, namespace: &str, pod: &str, query: &LogQuery)
    -> RepoResult<String>;
    async fn get_all_container_logs(
        &self,
        namespace: &str,
        pod: &str,
        tail_lines: i64,
    ) -> RepoResult<String>;
    async fn get_previous_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        tail_lines: i64,
    ) -> RepoResult<String>;
    async fn get_pod_events(&self, namespace: &str, pod: &str) -> RepoResult<Vec<EventInfo>>;
    /// `Ok(None)` when the metrics API is not served.
    async fn get_pod_metrics(&self, namespace: &str, pod: &str) -> RepoResult<Option<PodMetrics>>;
    async fn get_related_resources(&self, pod: &PodInfo) -> RepoResult<RelatedResources>;
    async fn describe_pod(&self, namespace: &str, name: &str) -> RepoResult<String>;

    fn analyze_pod_issues(&self, pod: &PodInfo, events: &[EventInfo]) -> Vec<DebugHelper> {
        analyze::analyze_pod_issues(pod, events)
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> RepoResult<()>;
    async fn scale_workload(
        &self,
        namespace: &str,
        name: &str,
        kind: ResourceType,
        replicas: i32,
    ) -> RepoResult<()>;
    async fn restart_workload(
        &self,
        namespace: &str,
        name: &str,
        kind: ResourceType,
    ) -> RepoResult<()>;
    async fn copy_config_map_to_namespace(
        &self,
        source_namespace: &str,
        name: &str,
        target_namespace: &str,
    ) -> RepoResult<()>;
    async fn copy_secret_to_namespace(
        &self,
        source_namespace: &str,
        name: &str,
        target_namespace: &str,
    ) -> RepoResult<()>;
    async fn force_delete_namespace(&self, name: &str) -> RepoResult<()>;
}
