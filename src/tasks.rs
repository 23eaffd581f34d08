use std::future::Future;
use std::sync::Arc;
use tokio::time::{Duration, sleep, timeout};
use tracing::{debug, warn};

use crate::error::{RepoError, RepoResult};
use crate::message::{
    ClusterOverview, CopyJob, CopyKind, DashboardSnapshot, LogState, Msg, ResourceScope,
    ResourceSnapshot, Task,
};
use crate::model::{DEFAULT_TAIL_LINES, LogQuery, PodRef, ResourceType};
use crate::repo::Repository;

const READ_TIMEOUT: Duration = Duration::from_secs(10);
const DASHBOARD_TIMEOUT: Duration = Duration::from_secs(15);
const MUTATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const COPY_STEP_DELAY: Duration = Duration::from_millis(300);

/// Runs one task to completion and returns the single message it produces.
pub async fn run(task: Task, repo: Arc<dyn Repository>) -> Msg {
    let name = task.name();
    debug!("task start: {name}");
    let msg = match task {
        Task::LoadInitial => Msg::InitialLoad(load_overview(repo.as_ref()).await),
        Task::LoadNamespaces => Msg::NamespacesLoaded(load_overview(repo.as_ref()).await),
        Task::LoadWorkloads { namespace, kind } => {
            let result = bounded(name, READ_TIMEOUT, repo.list_workloads(&namespace, kind)).await;
            Msg::WorkloadsLoaded {
                namespace,
                kind,
                result,
            }
        }
        Task::LoadAllResources { scope, kind } => {
            let snapshot = load_resources(repo.as_ref(), &scope, kind).await;
            Msg::ResourcesLoaded {
                scope,
                kind,
                snapshot: Box::new(snapshot),
            }
        }
        Task::LoadPods { workload } => {
            let result = bounded(name, READ_TIMEOUT, repo.get_workload_pods(&workload)).await;
            Msg::PodsLoaded { workload, result }
        }
        Task::LoadPodsByNode { node } => {
            let result = bounded(name, READ_TIMEOUT, repo.list_pods_by_node(&node)).await;
            Msg::NodePodsLoaded { node, result }
        }
        Task::LoadDashboard { pod, log_state } => {
            let result = bounded(
                name,
                DASHBOARD_TIMEOUT,
                load_dashboard(repo.as_ref(), &pod, &log_state),
            )
            .await
            .map(Box::new);
            Msg::DashboardData {
                pod,
                log_state,
                result,
            }
        }
        Task::LoadLogs { pod, log_state } => {
            let result = bounded(name, READ_TIMEOUT, load_logs(repo.as_ref(), &pod, &log_state)).await;
            Msg::LogsUpdated {
                pod,
                log_state,
                result,
            }
        }
        Task::LoadConfigMap { namespace, name: config_map } => {
            let result =
                bounded(name, READ_TIMEOUT, repo.get_config_map(&namespace, &config_map)).await;
            Msg::ConfigMapData {
                namespace,
                name: config_map,
                result,
            }
        }
        Task::LoadSecret { namespace, name: secret } => {
            let result = bounded(name, READ_TIMEOUT, repo.get_secret(&namespace, &secret)).await;
            Msg::SecretData {
                namespace,
                name: secret,
                result,
            }
        }
        Task::Describe(pod) => {
            let result =
                bounded(name, READ_TIMEOUT, repo.describe_pod(&pod.namespace, &pod.name)).await;
            Msg::DescribeOutput { pod, result }
        }
        Task::DeletePod(pod) => {
            let result =
                bounded(name, MUTATION_TIMEOUT, repo.delete_pod(&pod.namespace, &pod.name)).await;
            Msg::PodDeleted { pod, result }
        }
        Task::DeleteNamespace(namespace) => {
            let result =
                bounded(name, MUTATION_TIMEOUT, repo.force_delete_namespace(&namespace)).await;
            Msg::NamespaceDeleted {
                name: namespace,
                result,
            }
        }
        Task::Scale { workload, replicas } => {
            let result = bounded(
                name,
                MUTATION_TIMEOUT,
                repo.scale_workload(&workload.namespace, &workload.name, workload.kind, replicas),
            )
            .await;
            Msg::WorkloadAction {
                summary: format!(
                    "Scaled {} {} to {replicas}",
                    workload.kind.kubectl_name(),
                    workload.name
                ),
                result,
            }
        }
        Task::Restart(workload) => {
            let result = bounded(
                name,
                MUTATION_TIMEOUT,
                repo.restart_workload(&workload.namespace, &workload.name, workload.kind),
            )
            .await;
            Msg::WorkloadAction {
                summary: format!(
                    "Restarted {} {}",
                    workload.kind.kubectl_name(),
                    workload.name
                ),
                result,
            }
        }
        Task::Copy(job) => copy_step(repo.as_ref(), job, COPY_STEP_DELAY).await,
        Task::Tick { generation, delay } => {
            sleep(delay).await;
            Msg::Tick(generation)
        }
        Task::ClearStatus { generation, delay } => {
            sleep(delay).await;
            Msg::StatusClear(generation)
        }
    };
    log_failure(name, &msg);
    msg
}

async fn bounded<T>(
    name: &str,
    limit: Duration,
    future: impl Future<Output = RepoResult<T>>,
) -> RepoResult<T> {
    match timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(RepoError::timed_out(name)),
    }
}

async fn load_overview(repo: &dyn Repository) -> RepoResult<ClusterOverview> {
    let (namespaces, nodes) = tokio::join!(
        bounded("namespace list", READ_TIMEOUT, repo.list_namespaces()),
        bounded("node list", READ_TIMEOUT, repo.list_nodes()),
    );
    let nodes = nodes.unwrap_or_else(|error| {
        debug!("node list unavailable: {error}");
        Vec::new()
    });
    Ok(ClusterOverview {
        namespaces: namespaces?,
        nodes,
    })
}

async fn load_resources(
    repo: &dyn Repository,
    scope: &ResourceScope,
    kind: ResourceType,
) -> ResourceSnapshot {
    let namespace = scope.namespace.as_str();
    let pods = async {
        match &scope.workload {
            Some(workload) => repo.get_workload_pods(workload).await,
            None => repo.list_all_pods(namespace).await,
        }
    };
    let (workloads, pods, config_maps, secrets) = tokio::join!(
        bounded("workload list", READ_TIMEOUT, repo.list_workloads(namespace, kind)),
        bounded("pod list", READ_TIMEOUT, pods),
        bounded("configmap list", READ_TIMEOUT, repo.list_config_maps(namespace)),
        bounded("secret list", READ_TIMEOUT, repo.list_secrets(namespace)),
    );
    ResourceSnapshot {
        workloads,
        pods,
        config_maps,
        secrets,
    }
}

async fn load_dashboard(
    repo: &dyn Repository,
    pod: &PodRef,
    log_state: &LogState,
) -> RepoResult<DashboardSnapshot> {
    let info = repo.get_pod(&pod.namespace, &pod.name).await?;
    let node = async {
        match info.node.as_deref() {
            Some(node) => Some(repo.get_node(node).await),
            None => None,
        }
    };
    let (logs, events, metrics, related, node) = tokio::join!(
        load_logs(repo, pod, log_state),
        repo.get_pod_events(&pod.namespace, &pod.name),
        repo.get_pod_metrics(&pod.namespace, &pod.name),
        repo.get_related_resources(&info),
        node,
    );
    let helpers = match &events {
        Ok(events) => repo.analyze_pod_issues(&info, events),
        Err(_) => repo.analyze_pod_issues(&info, &[]),
    };
    Ok(DashboardSnapshot {
        pod: info,
        logs,
        events,
        metrics,
        related,
        node,
        helpers,
    })
}

async fn load_logs(repo: &dyn Repository, pod: &PodRef, log_state: &LogState) -> RepoResult<String> {
    match (&log_state.container, log_state.previous) {
        (Some(container), true) => {
            repo.get_previous_logs(&pod.namespace, &pod.name, container, DEFAULT_TAIL_LINES)
                .await
        }
        (Some(container), false) => {
            let query = LogQuery::current(Some(container.clone()));
            repo.get_pod_logs(&pod.namespace, &pod.name, &query).await
        }
        (None, _) => {
            repo.get_all_container_logs(&pod.namespace, &pod.name, DEFAULT_TAIL_LINES)
                .await
        }
    }
}

/// Copies to `job.current_target`, then either hands back the next hop or the final result.
pub async fn copy_step(repo: &dyn Repository, mut job: CopyJob, delay: Duration) -> Msg {
    let target = job.current_target.clone();
    let copy = async {
        match job.kind {
            CopyKind::ConfigMap => {
                repo.copy_config_map_to_namespace(&job.source_namespace, &job.name, &target)
                    .await
            }
            CopyKind::Secret => {
                repo.copy_secret_to_namespace(&job.source_namespace, &job.name, &target)
                    .await
            }
        }
    };
    let outcome = bounded("copy", MUTATION_TIMEOUT, copy).await;
    if let Err(error) = &outcome {
        warn!("copy of {} to {target} failed: {error}", job.name);
    }
    job.record(outcome);

    if job.remaining.is_empty() {
        let (success, message) = job.summary();
        return Msg::CopyResult { success, message };
    }

    sleep(delay).await;
    job.advance();
    Msg::CopyProgress(job)
}

fn log_failure(name: &str, msg: &Msg) {
    let error = match msg {
        Msg::InitialLoad(Err(error)) | Msg::NamespacesLoaded(Err(error)) => Some(error),
        Msg::WorkloadsLoaded { result: Err(error), .. }
        | Msg::PodsLoaded { result: Err(error), .. }
        | Msg::NodePodsLoaded { result: Err(error), .. }
        | Msg::LogsUpdated { result: Err(error), .. }
        | Msg::ConfigMapData { result: Err(error), .. }
        | Msg::SecretData { result: Err(error), .. }
        | Msg::DescribeOutput { result: Err(error), .. }
        | Msg::PodDeleted { result: Err(error), .. }
        | Msg::NamespaceDeleted { result: Err(error), .. }
        | Msg::WorkloadAction { result: Err(error), .. }
        | Msg::DashboardData { result: Err(error), .. } => Some(error),
        _ => None,
    };
    if let Some(error) = error {
        warn!("{name} failed: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::{copy_step, run};
    use crate::message::{CopyJob, CopyKind, LogState, Msg, ResourceScope, Task};
    use crate::model::{
        ContainerInfo, NamespaceInfo, OwnerRef, PodInfo, PodRef, ResourceType, WorkloadRef,
    };
    use crate::repo::Repository;
    use crate::repo::fake::FakeRepository;
    use std::sync::Arc;
    use tokio::time::Duration;

    fn namespaces(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn pod(namespace: &str, name: &str, owner: &str) -> PodInfo {
        PodInfo {
            namespace: namespace.to_string(),
            name: name.to_string(),
            status: "Running".to_string(),
            phase: "Running".to_string(),
            owners: vec![OwnerRef {
                kind: "ReplicaSet".to_string(),
                name: owner.to_string(),
            }],
            containers: vec![ContainerInfo {
                name: "app".to_string(),
                ..ContainerInfo::default()
            }],
            ..PodInfo::default()
        }
    }

    #[tokio::test]
    async fn multi_namespace_copy_counts_failures() {
        let mut repo = FakeRepository::default();
        repo.failing_namespaces.insert("b".to_string());
        let repo = Arc::new(repo);

        let mut job = CopyJob::start(
            CopyKind::ConfigMap,
            "src",
            "settings",
            namespaces(&["a", "b", "c"]),
        )
        .expect("targets");
        let total = job.accounted();

        let result = loop {
            match copy_step(repo.as_ref(), job, Duration::ZERO).await {
                Msg::CopyProgress(next) => {
                    assert_eq!(next.accounted(), total);
                    job = next;
                }
                other => break other,
            }
        };

        assert_eq!(
            result,
            Msg::CopyResult {
                success: false,
                message: "Copied to 2 namespaces, 1 failed".to_string(),
            }
        );
        assert_eq!(
            repo.calls(),
            vec![
                "copy configmap src/settings -> a",
                "copy configmap src/settings -> b",
                "copy configmap src/settings -> c",
            ]
        );
    }

    #[tokio::test]
    async fn single_copy_reports_error_text() {
        let mut repo = FakeRepository::default();
        repo.failing_namespaces.insert("dst".to_string());

        let job = CopyJob::start(CopyKind::Secret, "src", "token", namespaces(&["dst"]))
            .expect("target");
        let msg = copy_step(&repo, job, Duration::ZERO).await;

        match msg {
            Msg::CopyResult { success, message } => {
                assert!(!success);
                assert!(message.starts_with("Error: permission denied"));
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[tokio::test]
    async fn initial_load_tolerates_missing_nodes() {
        let repo = FakeRepository {
            namespaces: vec![NamespaceInfo {
                name: "default".to_string(),
                phase: "Active".to_string(),
                created: None,
            }],
            ..FakeRepository::default()
        };
        let repo: Arc<dyn Repository> = Arc::new(repo);

        match run(Task::LoadInitial, repo).await {
            Msg::InitialLoad(Ok(overview)) => {
                assert_eq!(overview.namespaces.len(), 1);
                assert!(overview.nodes.is_empty());
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[tokio::test]
    async fn resources_use_workload_pods_when_scoped() {
        let repo = FakeRepository {
            pods: vec![
                pod("prod", "api-7d9-abc", "api-7d9"),
                pod("prod", "worker-5f-xyz", "worker-5f"),
            ],
            ..FakeRepository::default()
        };
        let repo: Arc<dyn Repository> = Arc::new(repo);
        let scope = ResourceScope {
            namespace: "prod".to_string(),
            workload: Some(WorkloadRef {
                namespace: "prod".to_string(),
                name: "api".to_string(),
                kind: ResourceType::Deployments,
            }),
        };

        let msg = run(
            Task::LoadAllResources {
                scope: scope.clone(),
                kind: ResourceType::Deployments,
            },
            repo,
        )
        .await;

        match msg {
            Msg::ResourcesLoaded {
                scope: loaded,
                snapshot,
                ..
            } => {
                assert_eq!(loaded, scope);
                let pods = snapshot.pods.expect("pods");
                assert_eq!(pods.len(), 1);
                assert_eq!(pods[0].name, "api-7d9-abc");
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[tokio::test]
    async fn previous_logs_use_the_selected_container() {
        let repo = Arc::new(FakeRepository {
            logs: "boom".to_string(),
            ..FakeRepository::default()
        });
        let target = PodRef {
            namespace: "prod".to_string(),
            name: "api-0".to_string(),
        };
        let log_state = LogState {
            container: Some("app".to_string()),
            previous: true,
        };

        let msg = run(
            Task::LoadLogs {
                pod: target,
                log_state,
            },
            repo.clone(),
        )
        .await;

        assert!(matches!(msg, Msg::LogsUpdated { result: Ok(ref logs), .. } if logs == "boom"));
        assert_eq!(
            repo.calls(),
            vec!["logs prod/api-0 container=app previous=true"]
        );
    }

    #[tokio::test]
    async fn dashboard_load_fails_for_missing_pod() {
        let repo: Arc<dyn Repository> = Arc::new(FakeRepository::default());
        let msg = run(
            Task::LoadDashboard {
                pod: PodRef {
                    namespace: "prod".to_string(),
                    name: "gone".to_string(),
                },
                log_state: LogState::default(),
            },
            repo,
        )
        .await;

        assert!(matches!(msg, Msg::DashboardData { result: Err(_), .. }));
    }

    #[tokio::test]
    async fn tick_returns_its_generation() {
        let repo: Arc<dyn Repository> = Arc::new(FakeRepository::default());
        let msg = run(
            Task::Tick {
                generation: 7,
                delay: Duration::ZERO,
            },
            repo,
        )
        .await;
        assert_eq!(msg, Msg::Tick(7));
    }
}
