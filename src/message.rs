use crossterm::event::KeyEvent;
use std::time::Duration;

use crate::error::RepoResult;
use crate::model::{
    ConfigMapData, ConfigMapInfo, DebugHelper, EventInfo, NamespaceInfo, NodeInfo, PodInfo,
    PodMetrics, PodRef, RelatedResources, ResourceType, SecretData, SecretInfo, WorkloadInfo,
    WorkloadRef,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyKind {
    ConfigMap,
    Secret,
}

impl CopyKind {
    pub fn label(self) -> &'static str {
        match self {
            CopyKind::ConfigMap => "ConfigMap",
            CopyKind::Secret => "Secret",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyTarget {
    Namespace(String),
    AllNamespaces,
}

/// One in-flight copy gesture. `current_target` is the namespace the next task writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    pub kind: CopyKind,
    pub source_namespace: String,
    pub name: String,
    pub current_target: String,
    pub remaining: Vec<String>,
    pub success: usize,
    pub errors: usize,
    pub last_error: Option<String>,
}

impl CopyJob {
    /// Returns `None` when no target is left.
    pub fn start(
        kind: CopyKind,
        source_namespace: &str,
        name: &str,
        mut targets: Vec<String>,
    ) -> Option<Self> {
        targets.retain(|target| target != source_namespace);
        if targets.is_empty() {
            return None;
        }
        let current_target = targets.remove(0);
        Some(Self {
            kind,
            source_namespace: source_namespace.to_string(),
            name: name.to_string(),
            current_target,
            remaining: targets,
            success: 0,
            errors: 0,
            last_error: None,
        })
    }

    /// Targets accounted for: finished, failed, queued and the one in flight.
    pub fn accounted(&self) -> usize {
        self.success + self.errors + self.remaining.len() + 1
    }

    pub fn record(&mut self, outcome: RepoResult<()>) {
        match outcome {
            Ok(()) => self.success += 1,
            Err(error) => {
                self.errors += 1;
                self.last_error = Some(error.to_string());
            }
        }
    }

    /// Moves to the next queued target. Returns `false` when the queue is drained.
    pub fn advance(&mut self) -> bool {
        if self.remaining.is_empty() {
            return false;
        }
        self.current_target = self.remaining.remove(0);
        true
    }

    pub fn summary(&self) -> (bool, String) {
        let finished = self.success + self.errors;
        if finished == 1 {
            return match &self.last_error {
                None => (
                    true,
                    format!(
                        "Copied {} {} to {}",
                        self.kind.label(),
                        self.name,
                        self.current_target
                    ),
                ),
                Some(error) => (false, format!("Error: {error}")),
            };
        }
        if self.errors == 0 {
            (true, format!("Copied to {} namespaces", self.success))
        } else {
            (
                false,
                format!(
                    "Copied to {} namespaces, {} failed",
                    self.success, self.errors
                ),
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    Restart(WorkloadRef),
    DeleteNamespace(String),
    Exec {
        pod: PodRef,
        container: Option<String>,
    },
    PortForward {
        pod: PodRef,
        local_port: u16,
        remote_port: u16,
    },
    DeletePod(PodRef),
}

impl ConfirmAction {
    pub fn tag(&self) -> &'static str {
        match self {
            ConfirmAction::Restart(_) => "restart",
            ConfirmAction::DeleteNamespace(_) => "delete_namespace",
            ConfirmAction::Exec { .. } => "exec",
            ConfirmAction::PortForward { .. } => "port-forward",
            ConfirmAction::DeletePod(_) => "delete",
        }
    }
}

/// Requests a widget leaves in its pending slot for the controller to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Scale {
        workload: WorkloadRef,
        replicas: i32,
    },
    Restart(WorkloadRef),
    DeletePod(PodRef),
    Copy {
        kind: CopyKind,
        source_namespace: String,
        name: String,
        target: CopyTarget,
    },
    Clipboard {
        label: String,
        text: String,
    },
    Describe(PodRef),
    Exec {
        pod: PodRef,
        container: Option<String>,
    },
    PortForward {
        pod: PodRef,
        port: u16,
    },
    ConfirmResult {
        confirmed: bool,
        action: ConfirmAction,
    },
    Notify(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogState {
    pub container: Option<String>,
    pub previous: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceScope {
    pub namespace: String,
    pub workload: Option<WorkloadRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterOverview {
    pub namespaces: Vec<NamespaceInfo>,
    pub nodes: Vec<NodeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSnapshot {
    pub workloads: RepoResult<Vec<WorkloadInfo>>,
    pub pods: RepoResult<Vec<PodInfo>>,
    pub config_maps: RepoResult<Vec<ConfigMapInfo>>,
    pub secrets: RepoResult<Vec<SecretInfo>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSnapshot {
    pub pod: PodInfo,
    pub logs: RepoResult<String>,
    pub events: RepoResult<Vec<EventInfo>>,
    pub metrics: RepoResult<Option<PodMetrics>>,
    pub related: RepoResult<RelatedResources>,
    pub node: Option<RepoResult<NodeInfo>>,
    pub helpers: Vec<DebugHelper>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    Key(KeyEvent),
    Resize {
        width: u16,
        height: u16,
    },
    Tick(u64),
    InitialLoad(RepoResult<ClusterOverview>),
    NamespacesLoaded(RepoResult<ClusterOverview>),
    WorkloadsLoaded {
        namespace: String,
        kind: ResourceType,
        result: RepoResult<Vec<WorkloadInfo>>,
    },
    ResourcesLoaded {
        scope: ResourceScope,
        kind: ResourceType,
        snapshot: Box<ResourceSnapshot>,
    },
    PodsLoaded {
        workload: WorkloadRef,
        result: RepoResult<Vec<PodInfo>>,
    },
    NodePodsLoaded {
        node: String,
        result: RepoResult<Vec<PodInfo>>,
    },
    DashboardData {
        pod: PodRef,
        log_state: LogState,
        result: RepoResult<Box<DashboardSnapshot>>,
    },
    LogsUpdated {
        pod: PodRef,
        log_state: LogState,
        result: RepoResult<String>,
    },
    ConfigMapData {
        namespace: String,
        name: String,
        result: RepoResult<ConfigMapData>,
    },
    SecretData {
        namespace: String,
        name: String,
        result: RepoResult<SecretData>,
    },
    DescribeOutput {
        pod: PodRef,
        result: RepoResult<String>,
    },
    PodDeleted {
        pod: PodRef,
        result: RepoResult<()>,
    },
    NamespaceDeleted {
        name: String,
        result: RepoResult<()>,
    },
    WorkloadAction {
        summary: String,
        result: RepoResult<()>,
    },
    CopyProgress(CopyJob),
    CopyResult {
        success: bool,
        message: String,
    },
    StatusClear(u64),
    ExecFinished(Result<(), String>),
    PortForwardStarted {
        pod: PodRef,
        local_port: u16,
        remote_port: u16,
    },
    PortForwardExited {
        pod: PodRef,
        local_port: u16,
        result: Result<(), String>,
    },
    ClipboardWritten {
        label: String,
        result: Result<(), String>,
    },
}

/// Work that runs off the event loop against the repository or the clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    LoadInitial,
    LoadNamespaces,
    LoadWorkloads {
        namespace: String,
        kind: ResourceType,
    },
    LoadAllResources {
        scope: ResourceScope,
        kind: ResourceType,
    },
    LoadPods {
        workload: WorkloadRef,
    },
    LoadPodsByNode {
        node: String,
    },
    LoadDashboard {
        pod: PodRef,
        log_state: LogState,
    },
    LoadLogs {
        pod: PodRef,
        log_state: LogState,
    },
    LoadConfigMap {
        namespace: String,
        name: String,
    },
    LoadSecret {
        namespace: String,
        name: String,
    },
    Describe(PodRef),
    DeletePod(PodRef),
    DeleteNamespace(String),
    Scale {
        workload: WorkloadRef,
        replicas: i32,
    },
    Restart(WorkloadRef),
    Copy(CopyJob),
    Tick {
        generation: u64,
        delay: Duration,
    },
    ClearStatus {
        generation: u64,
        delay: Duration,
    },
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::LoadInitial => "initial load",
            Task::LoadNamespaces => "namespace list",
            Task::LoadWorkloads { .. } => "workload list",
            Task::LoadAllResources { .. } => "resource list",
            Task::LoadPods { .. } => "workload pods",
            Task::LoadPodsByNode { .. } => "node pods",
            Task::LoadDashboard { .. } => "dashboard load",
            Task::LoadLogs { .. } => "log fetch",
            Task::LoadConfigMap { .. } => "configmap fetch",
            Task::LoadSecret { .. } => "secret fetch",
            Task::Describe(_) => "describe",
            Task::DeletePod(_) => "pod delete",
            Task::DeleteNamespace(_) => "namespace delete",
            Task::Scale { .. } => "scale",
            Task::Restart(_) => "restart",
            Task::Copy(_) => "copy",
            Task::Tick { .. } => "tick",
            Task::ClearStatus { .. } => "status clear",
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Task::DeletePod(_)
                | Task::DeleteNamespace(_)
                | Task::Scale { .. }
                | Task::Restart(_)
                | Task::Copy(_)
        )
    }
}

/// Follow-up work produced by the controller. Terminal-bound variants run on the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Task(Task),
    ExecShell {
        pod: PodRef,
        container: Option<String>,
    },
    StartPortForward {
        pod: PodRef,
        local_port: u16,
        remote_port: u16,
    },
    CopyToClipboard {
        label: String,
        text: String,
    },
}

impl From<Task> for Command {
    fn from(task: Task) -> Self {
        Command::Task(task)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfirmAction, CopyJob, CopyKind};
    use crate::error::RepoError;
    use crate::model::PodRef;

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn start_excludes_source_namespace() {
        let job = CopyJob::start(CopyKind::ConfigMap, "a", "settings", targets(&["a", "b"]));
        let job = job.expect("one target left");
        assert_eq!(job.current_target, "b");
        assert!(job.remaining.is_empty());

        assert!(CopyJob::start(CopyKind::Secret, "a", "token", targets(&["a"])).is_none());
    }

    #[test]
    fn accounting_is_constant_while_advancing() {
        let mut job = CopyJob::start(CopyKind::Secret, "src", "token", targets(&["a", "b", "c"]))
            .expect("targets");
        let total = job.accounted();
        assert_eq!(total, 3);

        job.record(Ok(()));
        assert!(job.advance());
        assert_eq!(job.accounted(), total);
        job.record(Err(RepoError::PermissionDenied("forbidden".to_string())));
        assert!(job.advance());
        assert_eq!(job.accounted(), total);
        job.record(Ok(()));
        assert!(!job.advance());

        assert_eq!(job.success + job.errors, total);
        assert_eq!(
            job.summary(),
            (false, "Copied to 2 namespaces, 1 failed".to_string())
        );
    }

    #[test]
    fn single_target_summary_names_the_target() {
        let mut job = CopyJob::start(CopyKind::ConfigMap, "src", "settings", targets(&["dst"]))
            .expect("target");
        job.record(Ok(()));
        assert_eq!(
            job.summary(),
            (true, "Copied ConfigMap settings to dst".to_string())
        );
    }

    #[test]
    fn confirm_tags_are_stable() {
        let pod = PodRef {
            namespace: "prod".to_string(),
            name: "api-0".to_string(),
        };
        assert_eq!(ConfirmAction::DeletePod(pod.clone()).tag(), "delete");
        assert_eq!(
            ConfirmAction::DeleteNamespace("old".to_string()).tag(),
            "delete_namespace"
        );
        assert_eq!(
            ConfirmAction::PortForward {
                pod,
                local_port: 8080,
                remote_port: 8080
            }
            .tag(),
            "port-forward"
        );
    }
}
