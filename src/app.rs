use crossterm::event::{KeyCode, KeyEvent};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::Preferences;
use crate::dashboard::Dashboard;
use crate::error::RepoError;
use crate::input::{Action, is_quit_chord, map_global};
use crate::message::{
    ClusterOverview, Command, ConfirmAction, CopyJob, CopyKind, CopyTarget, DashboardSnapshot,
    Intent, LogState, Msg, ResourceScope, ResourceSnapshot, Task,
};
use crate::model::{PodRef, ResourceType, WorkloadRef};
use crate::navigator::{Mode, NamespaceFocus, Navigator, ScaleHint, Section};
use crate::overlay::viewer::ViewerKind;
use crate::overlay::{Overlay, Overlays};

pub const STATUS_INFO_TTL: Duration = Duration::from_secs(3);
pub const STATUS_ERROR_TTL: Duration = Duration::from_secs(5);
pub const MUTATION_QUIET_PERIOD: Duration = Duration::from_secs(2);
const STATUS_MAX_CHARS: usize = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Navigator,
    Dashboard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortForwardSession {
    pub pod: PodRef,
    pub local_port: u16,
    pub remote_port: u16,
}

/// Session controller: owns every widget and turns messages into follow-up commands.
pub struct App {
    running: bool,
    view: View,
    navigator: Navigator,
    dashboard: Dashboard,
    overlays: Overlays,
    namespace: Option<String>,
    workload_context: Option<WorkloadRef>,
    node_context: Option<String>,
    fatal_error: Option<String>,
    initial_loading: bool,
    status: Option<Status>,
    status_generation: u64,
    tick_generation: u64,
    refresh_interval: Duration,
    quiet_until: Option<Instant>,
    last_log_state: LogState,
    port_forwards: Vec<PortForwardSession>,
    context: String,
    cluster: String,
    width: u16,
    height: u16,
}

impl App {
    /// `namespace` from the command line wins over the saved one; either skips the namespace picker.
    pub fn new(preferences: &Preferences, namespace: Option<String>) -> Self {
        let namespace = namespace.or_else(|| preferences.last_namespace.clone());
        let mode = if namespace.is_some() {
            Mode::Workloads
        } else {
            Mode::Namespace
        };
        Self {
            running: true,
            view: View::Navigator,
            navigator: Navigator::new(mode, preferences.last_resource_type),
            dashboard: Dashboard::default(),
            overlays: Overlays::default(),
            namespace,
            workload_context: None,
            node_context: None,
            fatal_error: None,
            initial_loading: true,
            status: None,
            status_generation: 0,
            tick_generation: 0,
            refresh_interval: preferences.refresh_interval(),
            quiet_until: None,
            last_log_state: LogState::default(),
            port_forwards: Vec::new(),
            context: String::new(),
            cluster: String::new(),
            width: 0,
            height: 0,
        }
    }

    pub fn set_kube_target(&mut self, context: String, cluster: String) {
        self.context = context;
        self.cluster = cluster;
    }

    pub fn set_refresh_interval(&mut self, interval: Duration) {
        self.refresh_interval = interval.max(Duration::from_secs(1));
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn overlays(&self) -> &Overlays {
        &self.overlays
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn workload_context(&self) -> Option<&WorkloadRef> {
        self.workload_context.as_ref()
    }

    pub fn node_context(&self) -> Option<&str> {
        self.node_context.as_deref()
    }

    pub fn fatal_error(&self) -> Option<&str> {
        self.fatal_error.as_deref()
    }

    pub fn is_initial_loading(&self) -> bool {
        self.initial_loading
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn port_forwards(&self) -> &[PortForwardSession] {
        &self.port_forwards
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn preferences(&self) -> Preferences {
        Preferences {
            last_namespace: self.namespace.clone(),
            last_resource_type: self.navigator.resource_type(),
            refresh_interval_secs: self.refresh_interval.as_secs().max(1),
        }
    }

    /// Commands to run once the event loop starts.
    pub fn init(&mut self) -> Vec<Command> {
        let mut commands = vec![Command::from(Task::LoadInitial)];
        if let Some(namespace) = self.namespace.clone() {
            commands.push(
                Task::LoadAllResources {
                    scope: ResourceScope {
                        namespace,
                        workload: None,
                    },
                    kind: self.navigator.resource_type(),
                }
                .into(),
            );
        }
        commands.push(self.arm_tick());
        commands
    }

    pub fn update(&mut self, msg: Msg) -> Vec<Command> {
        match msg {
            Msg::Key(key) => self.on_key(key),
            Msg::Resize { width, height } => {
                self.width = width;
                self.height = height;
                self.sync_pages();
                Vec::new()
            }
            Msg::Tick(generation) => self.on_tick(generation),
            Msg::InitialLoad(result) => self.on_initial_load(result),
            Msg::NamespacesLoaded(result) => match result {
                Ok(overview) => {
                    self.apply_overview(overview);
                    Vec::new()
                }
                Err(error) => self.set_error_status(&error),
            },
            Msg::WorkloadsLoaded {
                namespace,
                kind,
                result,
            } => {
                if self.namespace.as_deref() != Some(namespace.as_str())
                    || kind != self.navigator.resource_type()
                {
                    return Vec::new();
                }
                match result {
                    Ok(workloads) => {
                        self.navigator.set_workloads(workloads);
                        self.update_scale_hint();
                        Vec::new()
                    }
                    Err(error) => self.set_error_status(&error),
                }
            }
            Msg::ResourcesLoaded {
                scope,
                kind,
                snapshot,
            } => self.on_resources_loaded(scope, kind, *snapshot),
            Msg::PodsLoaded { workload, result } => {
                if self.node_context.is_some() || self.workload_context.as_ref() != Some(&workload) {
                    return Vec::new();
                }
                match result {
                    Ok(pods) => {
                        self.navigator.set_pods(pods);
                        self.update_scale_hint();
                        Vec::new()
                    }
                    Err(error) => self.set_error_status(&error),
                }
            }
            Msg::NodePodsLoaded { node, result } => {
                if self.node_context.as_deref() != Some(node.as_str()) {
                    return Vec::new();
                }
                match result {
                    Ok(pods) => {
                        self.navigator.set_pods(pods);
                        Vec::new()
                    }
                    Err(error) => self.set_error_status(&error),
                }
            }
            Msg::DashboardData {
                pod,
                log_state,
                result,
            } => {
                if self.view != View::Dashboard || !self.dashboard.shows(&pod) {
                    return Vec::new();
                }
                let mut commands = match result {
                    Ok(snapshot) => {
                        let logs_current = log_state == self.dashboard.log_state();
                        let failure = dashboard_failure(&snapshot, logs_current);
                        self.dashboard.apply_snapshot(*snapshot, logs_current);
                        match failure {
                            Some(error) => self.set_error_status(&error),
                            None => Vec::new(),
                        }
                    }
                    Err(error) => self.set_error_status(&error),
                };
                commands.extend(self.sync_log_state());
                commands
            }
            Msg::LogsUpdated {
                pod,
                log_state,
                result,
            } => {
                if self.view == View::Dashboard
                    && self.dashboard.shows(&pod)
                    && log_state == self.dashboard.log_state()
                {
                    self.dashboard
                        .apply_logs(result.map_err(|error| error.message().to_string()));
                }
                Vec::new()
            }
            Msg::ConfigMapData {
                namespace,
                name,
                result,
            } => {
                let viewer = &mut self.overlays.config_map;
                if !viewer.is_showing(&namespace, &name) {
                    return Vec::new();
                }
                match result {
                    Ok(data) => viewer.set_config_map(data),
                    Err(error) => viewer.set_error(error.message().to_string()),
                }
                Vec::new()
            }
            Msg::SecretData {
                namespace,
                name,
                result,
            } => {
                for kind in [ViewerKind::Secret, ViewerKind::DockerRegistry] {
                    let viewer = self.overlays.viewer_mut(kind);
                    if !viewer.is_showing(&namespace, &name) {
                        continue;
                    }
                    match &result {
                        Ok(data) => viewer.set_secret(data.clone()),
                        Err(error) => viewer.set_error(error.message().to_string()),
                    }
                }
                Vec::new()
            }
            Msg::DescribeOutput { pod, result } => {
                if self.view != View::Dashboard || !self.dashboard.shows(&pod) {
                    return Vec::new();
                }
                let commands = match &result {
                    Ok(_) => Vec::new(),
                    Err(error) => self.set_error_status(error),
                };
                self.dashboard
                    .show_describe(result.map_err(|error| error.message().to_string()));
                commands
            }
            Msg::PodDeleted { pod, result } => match result {
                Ok(()) => {
                    let mut commands = self.set_status(format!("Deleted pod {}", pod.name), false);
                    if self.view == View::Dashboard && self.dashboard.shows(&pod) {
                        self.leave_dashboard();
                    }
                    commands.extend(self.reload_current());
                    commands
                }
                Err(error) => self.set_error_status(&error),
            },
            Msg::NamespaceDeleted { name, result } => match result {
                Ok(()) => {
                    let mut commands = self.set_status(format!("Namespace {name} deleted"), false);
                    commands.push(Task::LoadNamespaces.into());
                    commands
                }
                Err(error) => self.set_error_status(&error),
            },
            Msg::WorkloadAction { summary, result } => match result {
                Ok(()) => {
                    let mut commands = self.set_status(summary, false);
                    commands.extend(self.reload_current());
                    commands
                }
                Err(error) => self.set_error_status(&error),
            },
            Msg::CopyProgress(job) => {
                self.set_sticky_status(format!("Copying to {}…", job.current_target));
                vec![self.mutation(Task::Copy(job))]
            }
            Msg::CopyResult { success, message } => self.set_status(message, !success),
            Msg::StatusClear(generation) => {
                if generation == self.status_generation {
                    self.status = None;
                    self.overlays.set_viewer_status(None);
                }
                Vec::new()
            }
            Msg::ExecFinished(result) => match result {
                Ok(()) => self.set_status("Shell session ended", false),
                Err(error) => self.set_status(format!("Error: {error}"), true),
            },
            Msg::PortForwardStarted {
                pod,
                local_port,
                remote_port,
            } => {
                let text = format!("Port-forward localhost:{local_port} -> {pod}:{remote_port}");
                self.port_forwards.push(PortForwardSession {
                    pod,
                    local_port,
                    remote_port,
                });
                self.set_status(text, false)
            }
            Msg::PortForwardExited {
                pod,
                local_port,
                result,
            } => {
                self.port_forwards
                    .retain(|session| !(session.pod == pod && session.local_port == local_port));
                match result {
                    Ok(()) => self.set_status(format!("Port-forward closed: {pod}"), false),
                    Err(error) => {
                        self.set_status(format!("Error: port-forward {pod}: {error}"), true)
                    }
                }
            }
            Msg::ClipboardWritten { label, result } => match result {
                Ok(()) => self.set_status(format!("Copied {label} to clipboard"), false),
                Err(error) => self.set_status(format!("Error: {error}"), true),
            },
        }
    }

    fn on_key(&mut self, key: KeyEvent) -> Vec<Command> {
        if is_quit_chord(key) {
            self.running = false;
            return Vec::new();
        }

        if self.fatal_error.is_some() {
            return match key.code {
                KeyCode::Char('q') => {
                    self.running = false;
                    Vec::new()
                }
                KeyCode::Char('r') => {
                    self.fatal_error = None;
                    self.initial_loading = true;
                    vec![Task::LoadInitial.into()]
                }
                _ => Vec::new(),
            };
        }

        if self.overlays.confirm.is_visible() {
            self.overlays.confirm.handle_key(key);
            let intent = self.overlays.confirm.take_pending_request();
            return self.dispatch_intent(intent);
        }
        if self.overlays.action_menu.is_visible() {
            self.overlays.action_menu.handle_key(key);
            let intent = self.overlays.action_menu.take_pending_request();
            return self.dispatch_intent(intent);
        }
        if self.overlays.help.is_visible() {
            self.overlays.help.handle_key(key);
            return Vec::new();
        }
        if let Some(viewer) = self.overlays.visible_viewer_mut() {
            viewer.handle_key(key);
            let intent = viewer.take_pending_request();
            return self.dispatch_intent(intent);
        }

        if self.view == View::Navigator && self.navigator.is_searching() {
            self.navigator.handle_search_key(key);
            return Vec::new();
        }
        if self.view == View::Dashboard && self.dashboard.is_searching() {
            self.dashboard.handle_key(key);
            return self.after_dashboard_key();
        }
        if self.view == View::Navigator
            && self.navigator.mode() == Mode::Namespace
            && self.navigator.is_node_searching()
        {
            self.navigator.handle_node_filter_key(key);
            return Vec::new();
        }

        if let Some(action) = map_global(key) {
            return self.on_action(action);
        }

        match self.view {
            View::Dashboard => {
                self.dashboard.handle_key(key);
                self.after_dashboard_key()
            }
            View::Navigator => {
                self.navigator.handle_key(key);
                Vec::new()
            }
        }
    }

    fn on_action(&mut self, action: Action) -> Vec<Command> {
        debug!("action={action:?}");
        match action {
            Action::Quit => {
                self.running = false;
                Vec::new()
            }
            Action::ToggleHelp => {
                self.overlays.toggle_help();
                Vec::new()
            }
            Action::Refresh => self.reload_current(),
            Action::NamespaceMode => {
                if self.view == View::Dashboard {
                    self.dashboard.close();
                    self.view = View::Navigator;
                }
                self.enter_namespace_mode()
            }
            Action::ResourceTypeMode => {
                if self.namespace.is_none() {
                    return self.set_status("Select a namespace first", false);
                }
                if self.view == View::Dashboard {
                    self.dashboard.close();
                    self.view = View::Navigator;
                }
                self.navigator.set_mode(Mode::ResourceType);
                Vec::new()
            }
            Action::NextPanel | Action::PrevPanel => {
                let forward = action == Action::NextPanel;
                match (self.view, self.navigator.mode()) {
                    (View::Dashboard, _) if forward => self.dashboard.next_panel(),
                    (View::Dashboard, _) => self.dashboard.prev_panel(),
                    (View::Navigator, Mode::Resources) if forward => self.navigator.next_section(),
                    (View::Navigator, Mode::Resources) => self.navigator.prev_section(),
                    (View::Navigator, Mode::Namespace) => self.navigator.toggle_namespace_focus(),
                    _ => {}
                }
                Vec::new()
            }
            Action::Back => self.back(),
            Action::Enter => self.enter(),
            Action::OpenActionMenu => {
                if self.view != View::Navigator || self.navigator.mode() != Mode::Workloads {
                    return Vec::new();
                }
                let Some(workload) = self.navigator.selected_workload().cloned() else {
                    return Vec::new();
                };
                if self.overlays.show_action_menu(&workload) {
                    Vec::new()
                } else {
                    self.set_status(format!("No actions for {}", workload.kind.title()), false)
                }
            }
            Action::Restart => match self.restart_target() {
                Some(workload) => {
                    self.confirm_restart(workload);
                    Vec::new()
                }
                None => self.set_status("Nothing to restart here", false),
            },
            Action::ScaleUp => self.quick_scale(1),
            Action::ScaleDown => self.quick_scale(-1),
        }
    }

    fn enter(&mut self) -> Vec<Command> {
        if self.view == View::Dashboard {
            return Vec::new();
        }
        match self.navigator.mode() {
            Mode::Namespace => {
                if self.navigator.namespace_focus() == NamespaceFocus::Nodes {
                    return match self.navigator.selected_node() {
                        Some(node) => {
                            let name = node.name.clone();
                            self.enter_node(name)
                        }
                        None => Vec::new(),
                    };
                }
                let Some(namespace) = self.navigator.selected_namespace().cloned() else {
                    return Vec::new();
                };
                if !namespace.is_active() {
                    self.overlays.show_confirm(
                        format!(
                            "Namespace {} is {}. Force delete it by removing finalizers?",
                            namespace.name, namespace.phase
                        ),
                        ConfirmAction::DeleteNamespace(namespace.name),
                    );
                    return Vec::new();
                }
                self.commit_namespace(namespace.name)
            }
            Mode::ResourceType => {
                let Some(kind) = self.navigator.selected_resource_type() else {
                    return Vec::new();
                };
                self.navigator.set_resource_type(kind);
                self.navigator.set_mode(Mode::Workloads);
                self.workload_context = None;
                let mut commands = self.workload_reload();
                commands.push(self.arm_tick());
                commands
            }
            Mode::Workloads => {
                let Some(workload) = self.navigator.selected_workload() else {
                    return Vec::new();
                };
                let reference = workload.reference();
                if reference.kind == ResourceType::Pods {
                    return self.open_dashboard(PodRef {
                        namespace: reference.namespace,
                        name: reference.name,
                    });
                }
                self.workload_context = Some(reference.clone());
                self.navigator.set_mode(Mode::Resources);
                self.navigator.set_pods(Vec::new());
                self.navigator.set_scale_hint(None);
                vec![
                    Task::LoadPods {
                        workload: reference,
                    }
                    .into(),
                    self.arm_tick(),
                ]
            }
            Mode::Resources => self.enter_resource(),
        }
    }

    fn enter_resource(&mut self) -> Vec<Command> {
        let copy_targets = self.copy_candidates();
        match self.navigator.section() {
            Section::Pods => match self.navigator.selected_pod() {
                Some(pod) => {
                    let pod = pod.reference();
                    self.open_dashboard(pod)
                }
                None => Vec::new(),
            },
            Section::ConfigMaps => {
                let Some(config_map) = self.navigator.selected_config_map() else {
                    return Vec::new();
                };
                let (namespace, name) = (config_map.namespace.clone(), config_map.name.clone());
                self.overlays
                    .show_viewer(ViewerKind::ConfigMap, &namespace, &name, copy_targets);
                vec![Task::LoadConfigMap { namespace, name }.into()]
            }
            Section::Secrets | Section::DockerSecrets => {
                let Some(secret) = self.navigator.selected_secret() else {
                    return Vec::new();
                };
                let kind = if secret.is_docker_registry() {
                    ViewerKind::DockerRegistry
                } else {
                    ViewerKind::Secret
                };
                let (namespace, name) = (secret.namespace.clone(), secret.name.clone());
                self.overlays.show_viewer(kind, &namespace, &name, copy_targets);
                vec![Task::LoadSecret { namespace, name }.into()]
            }
        }
    }

    fn back(&mut self) -> Vec<Command> {
        match self.view {
            View::Dashboard => {
                if self.dashboard.back() {
                    self.sync_pages();
                    return Vec::new();
                }
                self.leave_dashboard();
                self.resource_reload()
            }
            View::Navigator => {
                if self.navigator.has_filter() {
                    self.navigator.clear_search();
                    return Vec::new();
                }
                match self.navigator.mode() {
                    Mode::Namespace => Vec::new(),
                    Mode::Workloads | Mode::Resources | Mode::ResourceType => {
                        self.enter_namespace_mode()
                    }
                }
            }
        }
    }

    fn enter_namespace_mode(&mut self) -> Vec<Command> {
        self.workload_context = None;
        self.node_context = None;
        self.navigator.clear_node_filter();
        self.navigator.set_scale_hint(None);
        self.navigator.set_mode(Mode::Namespace);
        vec![Task::LoadNamespaces.into()]
    }

    fn commit_namespace(&mut self, namespace: String) -> Vec<Command> {
        info!("namespace selected: {namespace}");
        self.namespace = Some(namespace.clone());
        self.workload_context = None;
        self.node_context = None;
        self.navigator.set_workloads(Vec::new());
        self.clear_resource_lists();
        self.navigator.set_mode(Mode::Workloads);
        vec![
            Task::LoadAllResources {
                scope: ResourceScope {
                    namespace,
                    workload: None,
                },
                kind: self.navigator.resource_type(),
            }
            .into(),
            self.arm_tick(),
        ]
    }

    fn enter_node(&mut self, node: String) -> Vec<Command> {
        self.node_context = Some(node.clone());
        self.workload_context = None;
        self.clear_resource_lists();
        self.navigator.set_mode(Mode::Resources);
        vec![Task::LoadPodsByNode { node }.into(), self.arm_tick()]
    }

    fn clear_resource_lists(&mut self) {
        self.navigator.set_pods(Vec::new());
        self.navigator.set_config_maps(Vec::new());
        self.navigator.set_secrets(Vec::new());
        self.navigator.set_scale_hint(None);
    }

    fn open_dashboard(&mut self, pod: PodRef) -> Vec<Command> {
        debug!("opening dashboard for {pod}");
        self.view = View::Dashboard;
        self.dashboard.open(pod.clone());
        self.last_log_state = self.dashboard.log_state();
        vec![
            Task::LoadDashboard {
                pod,
                log_state: self.last_log_state.clone(),
            }
            .into(),
            self.arm_tick(),
        ]
    }

    fn leave_dashboard(&mut self) {
        self.dashboard.close();
        self.view = View::Navigator;
        if self.navigator.mode() != Mode::Resources {
            self.navigator.set_mode(Mode::Resources);
        }
    }

    /// Page sizes follow the cached terminal height; a fullscreen panel gets the whole body.
    fn sync_pages(&mut self) {
        if self.height == 0 {
            return;
        }
        let rows = usize::from(self.height);
        let body = rows.saturating_sub(6);
        self.navigator.set_page(rows.saturating_sub(8));
        self.dashboard.set_page(if self.dashboard.is_fullscreen() {
            body
        } else {
            body / 2
        });
        self.overlays.set_page(rows.saturating_sub(10) / 2);
    }

    fn after_dashboard_key(&mut self) -> Vec<Command> {
        self.sync_pages();
        let intent = self.dashboard.take_pending_request();
        let mut commands = self.dispatch_intent(intent);
        commands.extend(self.sync_log_state());
        commands
    }

    /// Fetches logs once whenever the dashboard's container or previous-instance choice changes.
    fn sync_log_state(&mut self) -> Vec<Command> {
        if self.view != View::Dashboard {
            return Vec::new();
        }
        let Some(pod) = self.dashboard.pod().cloned() else {
            return Vec::new();
        };
        let log_state = self.dashboard.log_state();
        if log_state == self.last_log_state {
            return Vec::new();
        }
        self.last_log_state = log_state.clone();
        vec![Task::LoadLogs { pod, log_state }.into()]
    }

    fn dispatch_intent(&mut self, intent: Option<Intent>) -> Vec<Command> {
        match intent {
            Some(intent) => self.handle_intent(intent),
            None => Vec::new(),
        }
    }

    fn handle_intent(&mut self, intent: Intent) -> Vec<Command> {
        debug!("intent={intent:?}");
        match intent {
            Intent::Scale { workload, replicas } => {
                let mut commands =
                    self.set_status(format!("Scaling {} to {replicas}…", workload.name), false);
                commands.push(self.mutation(Task::Scale { workload, replicas }));
                commands
            }
            Intent::Restart(workload) => {
                self.confirm_restart(workload);
                Vec::new()
            }
            Intent::DeletePod(pod) => {
                self.overlays.show_confirm(
                    format!("Delete pod {pod}?"),
                    ConfirmAction::DeletePod(pod),
                );
                Vec::new()
            }
            Intent::Copy {
                kind,
                source_namespace,
                name,
                target,
            } => self.start_copy(kind, &source_namespace, &name, target),
            Intent::Clipboard { label, text } => vec![Command::CopyToClipboard { label, text }],
            Intent::Describe(pod) => vec![Task::Describe(pod).into()],
            Intent::Exec { pod, container } => {
                let target = match &container {
                    Some(container) => format!("{pod} ({container})"),
                    None => pod.to_string(),
                };
                self.overlays.show_confirm(
                    format!("Open a shell in {target}?"),
                    ConfirmAction::Exec { pod, container },
                );
                Vec::new()
            }
            Intent::PortForward { pod, port } => {
                self.overlays.show_confirm(
                    format!("Forward localhost:{port} to {pod}:{port}?"),
                    ConfirmAction::PortForward {
                        pod,
                        local_port: port,
                        remote_port: port,
                    },
                );
                Vec::new()
            }
            Intent::ConfirmResult {
                confirmed: false,
                action,
            } => {
                debug!("confirmation declined: {}", action.tag());
                Vec::new()
            }
            Intent::ConfirmResult {
                confirmed: true,
                action,
            } => self.on_confirmed(action),
            Intent::Notify(text) => self.set_status(text, false),
        }
    }

    fn on_confirmed(&mut self, action: ConfirmAction) -> Vec<Command> {
        info!("confirmed {}", action.tag());
        match action {
            ConfirmAction::Restart(workload) => {
                let mut commands =
                    self.set_status(format!("Restarting {}…", workload.name), false);
                commands.push(self.mutation(Task::Restart(workload)));
                commands
            }
            ConfirmAction::DeleteNamespace(name) => {
                let mut commands = self.set_status(format!("Deleting namespace {name}…"), false);
                commands.push(self.mutation(Task::DeleteNamespace(name)));
                commands
            }
            ConfirmAction::DeletePod(pod) => {
                let mut commands = self.set_status(format!("Deleting pod {}…", pod.name), false);
                commands.push(self.mutation(Task::DeletePod(pod)));
                commands
            }
            ConfirmAction::Exec { pod, container } => vec![Command::ExecShell { pod, container }],
            ConfirmAction::PortForward {
                pod,
                local_port,
                remote_port,
            } => vec![Command::StartPortForward {
                pod,
                local_port,
                remote_port,
            }],
        }
    }

    fn confirm_restart(&mut self, workload: WorkloadRef) {
        self.overlays.show_confirm(
            format!("Restart {workload}?"),
            ConfirmAction::Restart(workload),
        );
    }

    fn restart_target(&self) -> Option<WorkloadRef> {
        match (self.view, self.navigator.mode()) {
            (View::Dashboard, _) => self.dashboard.restartable_owner(),
            (View::Navigator, Mode::Workloads) => self
                .navigator
                .selected_workload()
                .map(|workload| workload.reference())
                .filter(|workload| workload.kind.is_restartable()),
            (View::Navigator, Mode::Resources) => self
                .workload_context
                .clone()
                .filter(|workload| workload.kind.is_restartable()),
            _ => None,
        }
    }

    /// `s` / `d` outside overlays. `d` doubles as delete for pods and terminating namespaces.
    fn quick_scale(&mut self, delta: i32) -> Vec<Command> {
        match (self.view, self.navigator.mode()) {
            (View::Dashboard, _) => {
                self.dashboard.scale_owner(delta);
                self.after_dashboard_key()
            }
            (View::Navigator, Mode::Namespace) => {
                if delta > 0 {
                    return Vec::new();
                }
                match self.navigator.selected_namespace() {
                    Some(namespace) if !namespace.is_active() => {
                        let name = namespace.name.clone();
                        self.overlays.show_confirm(
                            format!("Force delete namespace {name} by removing finalizers?"),
                            ConfirmAction::DeleteNamespace(name),
                        );
                        Vec::new()
                    }
                    _ => Vec::new(),
                }
            }
            (View::Navigator, Mode::Resources) => {
                if let Some(hint) = self.navigator.scale_hint().cloned() {
                    return self.scale_by(hint.workload, hint.replicas, delta);
                }
                if delta < 0
                    && self.navigator.section() == Section::Pods
                    && let Some(pod) = self.navigator.selected_pod()
                {
                    let pod = pod.reference();
                    return self.handle_intent(Intent::DeletePod(pod));
                }
                match self.workload_context.clone() {
                    Some(workload) if workload.kind.is_scalable() => {
                        let replicas = self.workload_replicas(&workload).unwrap_or(0);
                        self.scale_by(workload, replicas, delta)
                    }
                    _ => Vec::new(),
                }
            }
            (View::Navigator, Mode::Workloads) => {
                let Some(workload) = self.navigator.selected_workload() else {
                    return Vec::new();
                };
                if !workload.kind.is_scalable() {
                    let text = format!("{} cannot be scaled", workload.kind.title());
                    return self.set_status(text, false);
                }
                let (reference, replicas) = (workload.reference(), workload.replicas.unwrap_or(0));
                self.scale_by(reference, replicas, delta)
            }
            (View::Navigator, Mode::ResourceType) => Vec::new(),
        }
    }

    fn scale_by(&mut self, workload: WorkloadRef, replicas: i32, delta: i32) -> Vec<Command> {
        if delta < 0 && replicas <= 0 {
            return Vec::new();
        }
        let replicas = (replicas + delta).max(0);
        self.handle_intent(Intent::Scale { workload, replicas })
    }

    fn workload_replicas(&self, workload: &WorkloadRef) -> Option<i32> {
        self.navigator
            .workloads()
            .iter()
            .find(|candidate| candidate.reference() == *workload)
            .and_then(|candidate| candidate.replicas)
    }

    fn update_scale_hint(&mut self) {
        let hint = self
            .workload_context
            .as_ref()
            .filter(|workload| workload.kind.is_scalable() && self.navigator.pods().is_empty())
            .map(|workload| ScaleHint {
                workload: workload.clone(),
                replicas: self.workload_replicas(workload).unwrap_or(0),
            });
        self.navigator.set_scale_hint(hint);
    }

    fn copy_candidates(&self) -> Vec<String> {
        self.navigator
            .namespaces()
            .iter()
            .filter(|namespace| namespace.is_active())
            .map(|namespace| namespace.name.clone())
            .collect()
    }

    fn start_copy(
        &mut self,
        kind: CopyKind,
        source_namespace: &str,
        name: &str,
        target: CopyTarget,
    ) -> Vec<Command> {
        let targets = match target {
            CopyTarget::Namespace(namespace) => vec![namespace],
            CopyTarget::AllNamespaces => self.copy_candidates(),
        };
        match CopyJob::start(kind, source_namespace, name, targets) {
            None => self.set_status("No other namespaces to copy to", false),
            Some(job) => {
                info!(
                    "copying {} {source_namespace}/{name} to {} namespaces",
                    kind.label(),
                    job.accounted()
                );
                self.set_sticky_status(format!("Copying to {}…", job.current_target));
                vec![self.mutation(Task::Copy(job))]
            }
        }
    }

    fn mutation(&mut self, task: Task) -> Command {
        if task.is_mutation() {
            self.quiet_until = Some(Instant::now() + MUTATION_QUIET_PERIOD);
        }
        task.into()
    }

    fn is_quiet(&self) -> bool {
        self.quiet_until
            .is_some_and(|until| Instant::now() < until)
    }

    fn arm_tick(&mut self) -> Command {
        self.tick_generation += 1;
        Task::Tick {
            generation: self.tick_generation,
            delay: self.refresh_interval,
        }
        .into()
    }

    fn on_tick(&mut self, generation: u64) -> Vec<Command> {
        if generation != self.tick_generation {
            return Vec::new();
        }
        let mut commands = match self.view {
            View::Dashboard => self.dashboard_reload(),
            View::Navigator if self.is_quiet() => {
                debug!("tick reload suppressed after mutation");
                Vec::new()
            }
            View::Navigator => self.reload_current(),
        };
        commands.push(self.arm_tick());
        commands
    }

    fn reload_current(&mut self) -> Vec<Command> {
        match self.view {
            View::Dashboard => self.dashboard_reload(),
            View::Navigator => match self.navigator.mode() {
                Mode::Namespace => vec![Task::LoadNamespaces.into()],
                Mode::ResourceType => Vec::new(),
                Mode::Workloads => self.workload_reload(),
                Mode::Resources => self.resource_reload(),
            },
        }
    }

    fn dashboard_reload(&self) -> Vec<Command> {
        match self.dashboard.pod() {
            Some(pod) => vec![
                Task::LoadDashboard {
                    pod: pod.clone(),
                    log_state: self.dashboard.log_state(),
                }
                .into(),
            ],
            None => Vec::new(),
        }
    }

    fn workload_reload(&self) -> Vec<Command> {
        match &self.namespace {
            Some(namespace) => vec![
                Task::LoadWorkloads {
                    namespace: namespace.clone(),
                    kind: self.navigator.resource_type(),
                }
                .into(),
            ],
            None => Vec::new(),
        }
    }

    fn resource_reload(&self) -> Vec<Command> {
        if let Some(node) = &self.node_context {
            return vec![Task::LoadPodsByNode { node: node.clone() }.into()];
        }
        match &self.namespace {
            Some(namespace) => vec![
                Task::LoadAllResources {
                    scope: ResourceScope {
                        namespace: namespace.clone(),
                        workload: self.workload_context.clone(),
                    },
                    kind: self.navigator.resource_type(),
                }
                .into(),
            ],
            None => Vec::new(),
        }
    }

    fn on_initial_load(&mut self, result: Result<ClusterOverview, RepoError>) -> Vec<Command> {
        self.initial_loading = false;
        match result {
            Ok(overview) => {
                self.apply_overview(overview);
                Vec::new()
            }
            Err(error) if self.namespace.is_some() => self.set_error_status(&error),
            Err(error) => {
                self.fatal_error = Some(status_text(error.message()));
                Vec::new()
            }
        }
    }

    fn apply_overview(&mut self, overview: ClusterOverview) {
        self.navigator.set_namespaces(overview.namespaces);
        self.navigator.set_nodes(overview.nodes);
    }

    fn on_resources_loaded(
        &mut self,
        scope: ResourceScope,
        kind: ResourceType,
        snapshot: ResourceSnapshot,
    ) -> Vec<Command> {
        if self.node_context.is_some()
            || self.namespace.as_deref() != Some(scope.namespace.as_str())
            || scope.workload != self.workload_context
        {
            return Vec::new();
        }

        let mut first_error = None;
        if kind == self.navigator.resource_type() {
            match snapshot.workloads {
                Ok(workloads) => self.navigator.set_workloads(workloads),
                Err(error) => first_error = first_error.or(Some(error)),
            }
        }
        match snapshot.pods {
            Ok(pods) => self.navigator.set_pods(pods),
            Err(error) => first_error = first_error.or(Some(error)),
        }
        match snapshot.config_maps {
            Ok(config_maps) => self.navigator.set_config_maps(config_maps),
            Err(error) => first_error = first_error.or(Some(error)),
        }
        match snapshot.secrets {
            Ok(secrets) => self.navigator.set_secrets(secrets),
            Err(error) => first_error = first_error.or(Some(error)),
        }
        self.update_scale_hint();

        match first_error {
            Some(error) => self.set_error_status(&error),
            None => Vec::new(),
        }
    }

    /// Sets an auto-clearing status, mirrored into every viewer footer.
    fn set_status(&mut self, text: impl Into<String>, error: bool) -> Vec<Command> {
        self.set_sticky_status_with(text.into(), error);
        vec![
            Task::ClearStatus {
                generation: self.status_generation,
                delay: if error {
                    STATUS_ERROR_TTL
                } else {
                    STATUS_INFO_TTL
                },
            }
            .into(),
        ]
    }

    fn set_error_status(&mut self, error: &RepoError) -> Vec<Command> {
        self.set_status(format!("Error: {}", error.message()), true)
    }

    fn set_sticky_status(&mut self, text: String) {
        self.set_sticky_status_with(text, false);
    }

    fn set_sticky_status_with(&mut self, text: String, error: bool) {
        self.status_generation += 1;
        let text = status_text(&text);
        self.overlays.set_viewer_status(Some(&text));
        self.status = Some(Status { text, error });
    }
}

/// First panel error worth surfacing. Soft errors such as a missing metrics server stay in the panel.
fn dashboard_failure(snapshot: &DashboardSnapshot, logs_current: bool) -> Option<RepoError> {
    let logs = if logs_current {
        snapshot.logs.as_ref().err()
    } else {
        None
    };
    [
        logs,
        snapshot.events.as_ref().err(),
        snapshot.metrics.as_ref().err(),
        snapshot.related.as_ref().err(),
        snapshot
            .node
            .as_ref()
            .and_then(|node| node.as_ref().err()),
    ]
    .into_iter()
    .flatten()
    .find(|error| !error.is_soft())
    .cloned()
}

/// First non-empty line, clipped for the footer.
fn status_text(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    if line.chars().count() <= STATUS_MAX_CHARS {
        return line.to_string();
    }
    let clipped = line.chars().take(STATUS_MAX_CHARS - 1).collect::<String>();
    format!("{clipped}…")
}

#[cfg(test)]
mod tests {
    use super::{App, MUTATION_QUIET_PERIOD, STATUS_INFO_TTL, View, status_text};
    use crate::config::Preferences;
    use crate::error::RepoError;
    use crate::message::{
        ClusterOverview, Command, CopyKind, CopyTarget, DashboardSnapshot, Intent, LogState, Msg,
        ResourceScope, ResourceSnapshot, Task,
    };
    use crate::model::{
        ConfigMapData, ConfigMapInfo, ContainerInfo, NamespaceInfo, PodInfo, PodRef,
        RelatedResources, ResourceType, WorkloadInfo, WorkloadRef,
    };
    use crate::navigator::{Mode, Section};
    use crate::overlay::Overlay;
    use crate::repo::fake::FakeRepository;
    use crate::tasks;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::collections::{BTreeMap, BTreeSet, VecDeque};
    use std::sync::Arc;
    use std::time::Instant;

    fn key(code: KeyCode) -> Msg {
        Msg::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn press(app: &mut App, code: KeyCode) -> Vec<Command> {
        app.update(key(code))
    }

    fn namespace(name: &str, phase: &str) -> NamespaceInfo {
        NamespaceInfo {
            name: name.to_string(),
            phase: phase.to_string(),
            created: None,
        }
    }

    fn overview(names: &[(&str, &str)]) -> Msg {
        Msg::InitialLoad(Ok(ClusterOverview {
            namespaces: names
                .iter()
                .map(|(name, phase)| namespace(name, phase))
                .collect(),
            nodes: Vec::new(),
        }))
    }

    fn deployment(replicas: i32) -> WorkloadInfo {
        WorkloadInfo {
            namespace: "prod".to_string(),
            name: "api".to_string(),
            kind: ResourceType::Deployments,
            ready: format!("{replicas}/{replicas}"),
            status: "Available".to_string(),
            replicas: Some(replicas),
            ready_replicas: replicas,
            selector: BTreeMap::from([("app".to_string(), "api".to_string())]),
            created: None,
        }
    }

    fn pod(name: &str) -> PodInfo {
        PodInfo {
            namespace: "prod".to_string(),
            name: name.to_string(),
            status: "Running".to_string(),
            containers: vec![
                ContainerInfo {
                    name: "app".to_string(),
                    ..ContainerInfo::default()
                },
                ContainerInfo {
                    name: "sidecar".to_string(),
                    ..ContainerInfo::default()
                },
            ],
            ..PodInfo::default()
        }
    }

    fn app_in(namespace: &str) -> App {
        let preferences = Preferences {
            last_namespace: Some(namespace.to_string()),
            ..Preferences::default()
        };
        App::new(&preferences, None)
    }

    fn snapshot(pods: Vec<PodInfo>, workloads: Vec<WorkloadInfo>) -> ResourceSnapshot {
        ResourceSnapshot {
            workloads: Ok(workloads),
            pods: Ok(pods),
            config_maps: Ok(vec![ConfigMapInfo {
                namespace: "prod".to_string(),
                name: "settings".to_string(),
                keys: 1,
                created: None,
            }]),
            secrets: Ok(Vec::new()),
        }
    }

    fn resources_loaded(workload: Option<WorkloadRef>, snapshot: ResourceSnapshot) -> Msg {
        Msg::ResourcesLoaded {
            scope: ResourceScope {
                namespace: "prod".to_string(),
                workload,
            },
            kind: ResourceType::Deployments,
            snapshot: Box::new(snapshot),
        }
    }

    fn tasks_of(commands: &[Command]) -> Vec<&Task> {
        commands
            .iter()
            .filter_map(|command| match command {
                Command::Task(task) => Some(task),
                _ => None,
            })
            .collect()
    }

    fn count_tasks(commands: &[Command], predicate: impl Fn(&Task) -> bool) -> usize {
        tasks_of(commands).into_iter().filter(|task| predicate(task)).count()
    }

    fn tick_generation(commands: &[Command]) -> Option<u64> {
        tasks_of(commands).into_iter().find_map(|task| match task {
            Task::Tick { generation, .. } => Some(*generation),
            _ => None,
        })
    }

    fn status_of(app: &App) -> Option<(&str, bool)> {
        app.status()
            .map(|status| (status.text.as_str(), status.error))
    }

    fn dashboard_app() -> App {
        let mut app = app_in("prod");
        app.update(overview(&[("prod", "Active")]));
        app.open_dashboard(PodRef {
            namespace: "prod".to_string(),
            name: "api-0".to_string(),
        });
        app.update(dashboard_data(dashboard_snapshot()));
        app
    }

    fn dashboard_snapshot() -> DashboardSnapshot {
        DashboardSnapshot {
            pod: pod("api-0"),
            logs: Ok("boot\nErr: upstream timeout\nready".to_string()),
            events: Ok(Vec::new()),
            metrics: Ok(None),
            related: Ok(RelatedResources::default()),
            node: None,
            helpers: Vec::new(),
        }
    }

    fn dashboard_data(snapshot: DashboardSnapshot) -> Msg {
        Msg::DashboardData {
            pod: PodRef {
                namespace: "prod".to_string(),
                name: "api-0".to_string(),
            },
            log_state: LogState::default(),
            result: Ok(Box::new(snapshot)),
        }
    }

    /// Runs repository tasks until none are left. Clock tasks are skipped.
    async fn drive(app: &mut App, repo: Arc<FakeRepository>, commands: Vec<Command>) {
        let mut queue = VecDeque::from(commands);
        while let Some(command) = queue.pop_front() {
            let Command::Task(task) = command else {
                continue;
            };
            if matches!(task, Task::Tick { .. } | Task::ClearStatus { .. }) {
                continue;
            }
            let msg = tasks::run(task, repo.clone()).await;
            queue.extend(app.update(msg));
        }
    }

    #[test]
    fn resize_caches_terminal_size() {
        let mut app = dashboard_app();
        app.update(Msg::Resize {
            width: 120,
            height: 40,
        });
        assert_eq!((app.width, app.height), (120, 40));
        let mut expected = app.dashboard.clone();
        expected.set_page(17);
        assert_eq!(app.dashboard, expected);

        press(&mut app, KeyCode::Char('F'));
        assert!(app.dashboard.is_fullscreen());
        let mut expected = app.dashboard.clone();
        expected.set_page(34);
        assert_eq!(app.dashboard, expected);

        press(&mut app, KeyCode::Esc);
        assert!(!app.dashboard.is_fullscreen());
        let mut expected = app.dashboard.clone();
        expected.set_page(17);
        assert_eq!(app.dashboard, expected);
    }

    #[test]
    fn dashboard_panel_failure_reaches_the_status_line() {
        let mut app = dashboard_app();
        assert_eq!(app.status(), None);

        let commands = app.update(dashboard_data(DashboardSnapshot {
            events: Err(RepoError::PermissionDenied("events is forbidden".to_string())),
            metrics: Err(RepoError::Unavailable("metrics".to_string())),
            ..dashboard_snapshot()
        }));

        assert_eq!(status_of(&app), Some(("Error: events is forbidden", true)));
        let generation = tasks_of(&commands)
            .into_iter()
            .find_map(|task| match task {
                Task::ClearStatus { generation, .. } => Some(*generation),
                _ => None,
            })
            .expect("status clear scheduled");
        app.update(Msg::StatusClear(generation));
        assert_eq!(app.status(), None);
    }

    #[test]
    fn soft_dashboard_failures_stay_in_their_panel() {
        let mut app = dashboard_app();
        let commands = app.update(dashboard_data(DashboardSnapshot {
            metrics: Err(RepoError::Unavailable("metrics".to_string())),
            ..dashboard_snapshot()
        }));

        assert_eq!(app.status(), None);
        assert_eq!(
            count_tasks(&commands, |task| matches!(task, Task::ClearStatus { .. })),
            0
        );
    }

    #[test]
    fn copy_with_no_other_namespace_only_sets_status() {
        let mut app = app_in("src");
        app.update(overview(&[("src", "Active"), ("old", "Terminating")]));

        let commands = app.handle_intent(Intent::Copy {
            kind: CopyKind::ConfigMap,
            source_namespace: "src".to_string(),
            name: "settings".to_string(),
            target: CopyTarget::AllNamespaces,
        });

        assert_eq!(status_of(&app), Some(("No other namespaces to copy to", false)));
        assert_eq!(count_tasks(&commands, |task| matches!(task, Task::Copy(_))), 0);
        let clear = tasks_of(&commands).into_iter().find_map(|task| match task {
            Task::ClearStatus { generation, delay } => Some((*generation, *delay)),
            _ => None,
        });
        let (generation, delay) = clear.expect("status clear scheduled");
        assert_eq!(delay, STATUS_INFO_TTL);

        app.update(Msg::StatusClear(generation));
        assert_eq!(app.status(), None);
    }

    #[tokio::test]
    async fn copy_to_all_namespaces_reports_partial_failure() {
        let mut app = app_in("src");
        app.update(overview(&[
            ("src", "Active"),
            ("a", "Active"),
            ("b", "Active"),
            ("c", "Active"),
        ]));
        let repo = Arc::new(FakeRepository {
            config_maps: vec![ConfigMapData {
                namespace: "src".to_string(),
                name: "settings".to_string(),
                data: BTreeMap::new(),
            }],
            failing_namespaces: BTreeSet::from(["b".to_string()]),
            ..FakeRepository::default()
        });

        let commands = app.handle_intent(Intent::Copy {
            kind: CopyKind::ConfigMap,
            source_namespace: "src".to_string(),
            name: "settings".to_string(),
            target: CopyTarget::AllNamespaces,
        });
        assert_eq!(status_of(&app), Some(("Copying to a…", false)));

        drive(&mut app, repo.clone(), commands).await;

        assert_eq!(
            status_of(&app),
            Some(("Copied to 2 namespaces, 1 failed", true))
        );
        assert_eq!(
            repo.calls(),
            vec![
                "copy configmap src/settings -> a".to_string(),
                "copy configmap src/settings -> b".to_string(),
                "copy configmap src/settings -> c".to_string(),
            ]
        );
    }

    #[test]
    fn back_unwinds_search_then_fullscreen_then_dashboard() {
        let mut app = dashboard_app();
        press(&mut app, KeyCode::Char('/'));
        for c in "Err".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        assert!(app.dashboard().is_fullscreen());
        assert_eq!(
            app.dashboard().logs().visible_lines(),
            vec!["Err: upstream timeout"]
        );

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.dashboard().logs().search.query, "");
        assert!(app.dashboard().is_fullscreen());

        press(&mut app, KeyCode::Esc);
        assert!(!app.dashboard().is_fullscreen());
        assert_eq!(app.view(), View::Dashboard);

        let commands = press(&mut app, KeyCode::Esc);
        assert_eq!(app.view(), View::Navigator);
        assert_eq!(app.navigator().mode(), Mode::Resources);
        assert!(app.dashboard().pod().is_none());
        assert_eq!(
            count_tasks(&commands, |task| matches!(task, Task::LoadAllResources { .. })),
            1
        );
    }

    #[test]
    fn terminating_namespace_enter_confirms_force_delete() {
        let preferences = Preferences::default();
        let mut app = App::new(&preferences, None);
        app.update(overview(&[("old", "Terminating")]));
        assert_eq!(app.navigator().mode(), Mode::Namespace);

        press(&mut app, KeyCode::Enter);
        assert!(app.overlays().confirm.is_visible());
        assert_eq!(
            app.overlays().confirm.action().map(|action| action.tag()),
            Some("delete_namespace")
        );

        let commands = press(&mut app, KeyCode::Char('y'));
        assert!(
            tasks_of(&commands).contains(&&Task::DeleteNamespace("old".to_string()))
        );

        let commands = app.update(Msg::NamespaceDeleted {
            name: "old".to_string(),
            result: Ok(()),
        });
        assert_eq!(status_of(&app), Some(("Namespace old deleted", false)));
        assert!(tasks_of(&commands).contains(&&Task::LoadNamespaces));
    }

    #[test]
    fn log_state_changes_fetch_logs_once_each() {
        let mut app = dashboard_app();
        let is_log_fetch = |task: &Task| matches!(task, Task::LoadLogs { .. });

        let commands = press(&mut app, KeyCode::Char('2'));
        assert_eq!(count_tasks(&commands, is_log_fetch), 1);
        assert!(tasks_of(&commands).contains(&&Task::LoadLogs {
            pod: PodRef {
                namespace: "prod".to_string(),
                name: "api-0".to_string(),
            },
            log_state: LogState {
                container: Some("sidecar".to_string()),
                previous: false,
            },
        }));

        let commands = press(&mut app, KeyCode::Char('P'));
        assert_eq!(count_tasks(&commands, is_log_fetch), 1);

        let commands = press(&mut app, KeyCode::Char('f'));
        assert_eq!(count_tasks(&commands, is_log_fetch), 0);
    }

    #[test]
    fn scale_hint_keys_follow_owner_replicas() {
        let mut app = app_in("prod");
        app.update(resources_loaded(None, snapshot(Vec::new(), vec![deployment(3)])));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.navigator().mode(), Mode::Resources);
        let workload = deployment(3).reference();
        app.update(resources_loaded(
            Some(workload.clone()),
            snapshot(Vec::new(), vec![deployment(3)]),
        ));
        assert_eq!(app.navigator().scale_hint().map(|hint| hint.replicas), Some(3));

        let commands = press(&mut app, KeyCode::Char('d'));
        assert!(tasks_of(&commands).contains(&&Task::Scale {
            workload: workload.clone(),
            replicas: 2,
        }));

        app.update(resources_loaded(
            Some(workload.clone()),
            snapshot(Vec::new(), vec![deployment(0)]),
        ));
        let commands = press(&mut app, KeyCode::Char('s'));
        assert!(tasks_of(&commands).contains(&&Task::Scale {
            workload: workload.clone(),
            replicas: 1,
        }));

        let commands = press(&mut app, KeyCode::Char('d'));
        assert_eq!(count_tasks(&commands, |task| matches!(task, Task::Scale { .. })), 0);
    }

    #[test]
    fn at_most_one_overlay_is_visible() {
        let mut app = app_in("prod");
        app.update(resources_loaded(None, snapshot(Vec::new(), vec![deployment(2)])));
        press(&mut app, KeyCode::Char('a'));
        assert!(app.overlays().action_menu.is_visible());

        // Restart item sits after the six scale presets.
        for _ in 0..6 {
            press(&mut app, KeyCode::Down);
        }
        press(&mut app, KeyCode::Enter);
        assert!(app.overlays().confirm.is_visible());
        assert_eq!(app.overlays().visible_count(), 1);

        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.overlays().visible_count(), 0);
        press(&mut app, KeyCode::Char('?'));
        assert_eq!(app.overlays().visible_count(), 1);
    }

    #[test]
    fn status_clear_empties_every_viewer_footer() {
        let mut app = app_in("prod");
        app.update(resources_loaded(None, snapshot(Vec::new(), Vec::new())));
        app.navigator.set_mode(Mode::Resources);
        app.navigator.next_section();
        assert_eq!(app.navigator().section(), Section::ConfigMaps);
        press(&mut app, KeyCode::Enter);
        assert!(app.overlays().config_map.is_visible());

        let commands = app.update(Msg::CopyResult {
            success: true,
            message: "Copied ConfigMap settings to dev".to_string(),
        });
        assert_eq!(
            app.overlays().config_map.status(),
            Some("Copied ConfigMap settings to dev")
        );
        let generation = tasks_of(&commands)
            .into_iter()
            .find_map(|task| match task {
                Task::ClearStatus { generation, .. } => Some(*generation),
                _ => None,
            })
            .expect("clear scheduled");

        app.update(Msg::StatusClear(generation));
        assert_eq!(app.status(), None);
        assert_eq!(app.overlays().config_map.status(), None);
        assert_eq!(app.overlays().secret.status(), None);
        assert_eq!(app.overlays().docker.status(), None);
    }

    #[test]
    fn older_status_clear_keeps_newer_status() {
        let mut app = app_in("prod");
        app.set_status("first", false);
        let first = app.status_generation;
        app.set_status("second", false);
        app.update(Msg::StatusClear(first));
        assert_eq!(status_of(&app), Some(("second", false)));
    }

    #[test]
    fn viewer_intent_is_dispatched_on_the_same_key() {
        let mut app = app_in("prod");
        app.update(resources_loaded(None, snapshot(Vec::new(), Vec::new())));
        app.navigator.set_mode(Mode::Resources);
        app.navigator.next_section();
        let commands = press(&mut app, KeyCode::Enter);
        assert!(tasks_of(&commands).contains(&&Task::LoadConfigMap {
            namespace: "prod".to_string(),
            name: "settings".to_string(),
        }));
        app.update(Msg::ConfigMapData {
            namespace: "prod".to_string(),
            name: "settings".to_string(),
            result: Ok(ConfigMapData {
                namespace: "prod".to_string(),
                name: "settings".to_string(),
                data: BTreeMap::from([("PORT".to_string(), "8080".to_string())]),
            }),
        });

        let commands = press(&mut app, KeyCode::Enter);
        assert_eq!(
            commands,
            vec![Command::CopyToClipboard {
                label: "PORT".to_string(),
                text: "8080".to_string(),
            }]
        );
    }

    #[test]
    fn preferences_restore_namespace_and_resource_type() {
        let saved = Preferences {
            last_namespace: Some("prod".to_string()),
            last_resource_type: ResourceType::StatefulSets,
            refresh_interval_secs: 7,
        };
        let app = App::new(&saved, None);
        assert_eq!(app.navigator().mode(), Mode::Workloads);
        assert_eq!(app.preferences(), saved);

        let overridden = App::new(&saved, Some("dev".to_string()));
        assert_eq!(overridden.namespace(), Some("dev"));
    }

    #[test]
    fn reapplying_resources_is_a_pure_replacement() {
        let mut app = app_in("prod");
        let msg = resources_loaded(None, snapshot(vec![pod("api-0")], vec![deployment(2)]));
        app.update(msg.clone());
        let first = app.navigator().clone();
        app.update(msg);
        assert_eq!(app.navigator(), &first);
    }

    #[test]
    fn tick_reloads_without_touching_state() {
        let mut app = app_in("prod");
        let commands = app.init();
        let generation = tick_generation(&commands).expect("tick armed");
        app.update(resources_loaded(None, snapshot(vec![pod("api-0")], vec![deployment(2)])));
        let before = app.navigator().clone();

        let commands = app.update(Msg::Tick(generation));
        assert_eq!(app.navigator(), &before);
        assert_eq!(
            count_tasks(&commands, |task| matches!(task, Task::LoadWorkloads { .. })),
            1
        );
        let next = tick_generation(&commands).expect("tick re-armed");
        assert!(app.update(Msg::Tick(generation)).is_empty());
        assert!(!app.update(Msg::Tick(next)).is_empty());
    }

    #[test]
    fn mutations_quiet_tick_reloads_briefly() {
        let mut app = app_in("prod");
        let commands = app.init();
        let generation = tick_generation(&commands).expect("tick armed");
        app.handle_intent(Intent::Scale {
            workload: deployment(2).reference(),
            replicas: 3,
        });

        let commands = app.update(Msg::Tick(generation));
        assert_eq!(
            count_tasks(&commands, |task| matches!(task, Task::LoadWorkloads { .. })),
            0
        );

        app.quiet_until = Instant::now().checked_sub(MUTATION_QUIET_PERIOD);
        let next = tick_generation(&commands).expect("tick re-armed");
        let commands = app.update(Msg::Tick(next));
        assert_eq!(
            count_tasks(&commands, |task| matches!(task, Task::LoadWorkloads { .. })),
            1
        );
    }

    #[test]
    fn initial_load_failure_blocks_without_a_namespace() {
        let mut app = App::new(&Preferences::default(), None);
        app.update(Msg::InitialLoad(Err(RepoError::PermissionDenied(
            "namespaces is forbidden".to_string(),
        ))));
        assert_eq!(app.fatal_error(), Some("namespaces is forbidden"));

        let commands = press(&mut app, KeyCode::Char('r'));
        assert_eq!(commands, vec![Command::Task(Task::LoadInitial)]);
        assert_eq!(app.fatal_error(), None);

        let mut scoped = app_in("prod");
        scoped.update(Msg::InitialLoad(Err(RepoError::PermissionDenied(
            "namespaces is forbidden".to_string(),
        ))));
        assert_eq!(scoped.fatal_error(), None);
        assert_eq!(
            status_of(&scoped),
            Some(("Error: namespaces is forbidden", true))
        );
    }

    #[test]
    fn stale_resource_results_are_dropped() {
        let mut app = app_in("prod");
        app.update(Msg::ResourcesLoaded {
            scope: ResourceScope {
                namespace: "dev".to_string(),
                workload: None,
            },
            kind: ResourceType::Deployments,
            snapshot: Box::new(snapshot(vec![pod("web-0")], Vec::new())),
        });
        assert!(app.navigator().pods().is_empty());
    }

    #[test]
    fn confirmed_exec_hands_off_to_the_terminal() {
        let mut app = dashboard_app();
        press(&mut app, KeyCode::Char('e'));
        assert!(app.overlays().confirm.is_visible());
        let commands = press(&mut app, KeyCode::Char('y'));
        assert_eq!(
            commands,
            vec![Command::ExecShell {
                pod: PodRef {
                    namespace: "prod".to_string(),
                    name: "api-0".to_string(),
                },
                container: Some("app".to_string()),
            }]
        );
    }

    #[test]
    fn status_keeps_first_line_only() {
        assert_eq!(status_text("\n  boom \nsecond"), "boom");
        let long = "x".repeat(400);
        assert_eq!(status_text(&long).chars().count(), 180);
    }
}
