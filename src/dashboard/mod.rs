pub mod events;
pub mod logs;
pub mod metrics;
pub mod related;

use crossterm::event::{KeyCode, KeyEvent};

use crate::input::{Nav, TextInput, digit, map_navigation, map_text_input};
use crate::message::{DashboardSnapshot, Intent, LogState};
use crate::model::{DebugHelper, PodInfo, PodRef, ResourceType, WorkloadRef};

use events::EventsPanel;
use logs::LogsPanel;
use metrics::MetricsPanel;
use related::{RelatedPanel, related_lines};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Panel {
    #[default]
    Logs,
    Events,
    Metrics,
    Related,
}

impl Panel {
    pub const ALL: [Panel; 4] = [Panel::Logs, Panel::Events, Panel::Metrics, Panel::Related];

    pub fn title(self) -> &'static str {
        match self {
            Panel::Logs => "Logs",
            Panel::Events => "Events",
            Panel::Metrics => "Metrics",
            Panel::Related => "Related",
        }
    }

    fn offset(self, delta: isize) -> Self {
        let index = Self::ALL
            .iter()
            .position(|panel| *panel == self)
            .unwrap_or_default() as isize;
        Self::ALL[(index + delta).rem_euclid(Self::ALL.len() as isize) as usize]
    }

    fn is_searchable(self) -> bool {
        matches!(self, Panel::Logs | Panel::Events)
    }
}

/// Query typed into a panel filter. `typing` is set while keystrokes edit the query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchState {
    pub query: String,
    pub typing: bool,
}

impl SearchState {
    pub fn is_active(&self) -> bool {
        self.typing || !self.query.is_empty()
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.typing = false;
    }

    /// Applies one editing keystroke. Returns `true` when the query text changed.
    pub fn apply(&mut self, input: TextInput) -> bool {
        match input {
            TextInput::Char(c) => {
                self.query.push(c);
                true
            }
            TextInput::Backspace => self.query.pop().is_some(),
            TextInput::Submit => {
                self.typing = false;
                false
            }
            TextInput::Cancel => {
                let changed = !self.query.is_empty();
                self.clear();
                changed
            }
        }
    }
}

/// Four-panel view of one pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pod: Option<PodRef>,
    info: Option<PodInfo>,
    focus: Panel,
    fullscreen: bool,
    helpers: Vec<DebugHelper>,
    logs: LogsPanel,
    events: EventsPanel,
    metrics: MetricsPanel,
    related: RelatedPanel,
    pending: Option<Intent>,
    page: usize,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self {
            pod: None,
            info: None,
            focus: Panel::default(),
            fullscreen: false,
            helpers: Vec::new(),
            logs: LogsPanel::default(),
            events: EventsPanel::default(),
            metrics: MetricsPanel::default(),
            related: RelatedPanel::default(),
            pending: None,
            page: 10,
        }
    }
}

impl Dashboard {
    pub fn open(&mut self, pod: PodRef) {
        let page = self.page;
        *self = Self {
            pod: Some(pod),
            page,
            ..Self::default()
        };
    }

    pub fn close(&mut self) {
        let page = self.page;
        *self = Self {
            page,
            ..Self::default()
        };
    }

    pub fn pod(&self) -> Option<&PodRef> {
        self.pod.as_ref()
    }

    pub fn info(&self) -> Option<&PodInfo> {
        self.info.as_ref()
    }

    pub fn focus(&self) -> Panel {
        self.focus
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn helpers(&self) -> &[DebugHelper] {
        &self.helpers
    }

    pub fn logs(&self) -> &LogsPanel {
        &self.logs
    }

    pub fn events(&self) -> &EventsPanel {
        &self.events
    }

    pub fn metrics(&self) -> &MetricsPanel {
        &self.metrics
    }

    pub fn related(&self) -> &RelatedPanel {
        &self.related
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn shows(&self, pod: &PodRef) -> bool {
        self.pod.as_ref() == Some(pod)
    }

    pub fn next_panel(&mut self) {
        self.focus = self.focus.offset(1);
    }

    pub fn prev_panel(&mut self) {
        self.focus = self.focus.offset(-1);
    }

    /// Fullscreen needs a pod to show.
    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen = self.pod.is_some() && !self.fullscreen;
    }

    pub fn is_searching(&self) -> bool {
        self.fullscreen
            && self.focus.is_searchable()
            && self.focused_search().is_some_and(|search| search.typing)
    }

    /// Steps back one level inside the dashboard. Returns `false` when the caller should leave it.
    pub fn back(&mut self) -> bool {
        if let Some(search) = self.focused_search_mut()
            && search.is_active()
        {
            search.clear();
            self.search_changed();
            return true;
        }
        if self.fullscreen {
            self.fullscreen = false;
            return true;
        }
        false
    }

    pub fn log_state(&self) -> LogState {
        let container = match (self.logs.container(), self.logs.previous()) {
            (Some(container), _) => Some(container.to_string()),
            (None, true) => self
                .info
                .as_ref()
                .and_then(|info| info.containers.first())
                .map(|container| container.name.clone()),
            (None, false) => None,
        };
        LogState {
            container,
            previous: self.logs.previous(),
        }
    }

    /// Applies a full reload. Logs are kept when they were fetched for an older log selection.
    pub fn apply_snapshot(&mut self, snapshot: DashboardSnapshot, logs_current: bool) {
        let DashboardSnapshot {
            pod,
            logs,
            events,
            metrics,
            related,
            node,
            helpers,
        } = snapshot;

        if logs_current {
            match logs {
                Ok(text) => self.logs.set_text(&text),
                Err(error) => self.logs.set_error(error.message().to_string()),
            }
        }
        match events {
            Ok(events) => self.events.set_events(events),
            Err(error) => self.events.set_error(error.message().to_string()),
        }
        match metrics {
            Ok(metrics) => self.metrics.set_metrics(metrics),
            Err(error) => self.metrics.set_error(error.message().to_string()),
        }
        match related {
            Ok(related) => self.related.set_related(related),
            Err(error) => self.related.set_error(error.message().to_string()),
        }
        self.metrics
            .set_node(node.map(|result| result.map_err(|error| error.message().to_string())));
        self.helpers = helpers;
        self.info = Some(pod);
    }

    pub fn apply_logs(&mut self, result: Result<String, String>) {
        match result {
            Ok(text) => self.logs.set_text(&text),
            Err(error) => self.logs.set_error(error),
        }
    }

    pub fn show_describe(&mut self, output: Result<String, String>) {
        self.related.show_describe(output);
        self.focus = Panel::Related;
    }

    /// The scalable workload that owns the pod, with its desired replicas.
    pub fn owner_workload(&self) -> Option<(WorkloadRef, i32)> {
        let pod = self.pod.as_ref()?;
        let related = self.related.related()?;
        related.owners.iter().find_map(|owner| {
            owner
                .scalable_workload(&pod.namespace)
                .map(|workload| (workload, owner.replicas.unwrap_or(0)))
        })
    }

    pub fn restartable_owner(&self) -> Option<WorkloadRef> {
        let pod = self.pod.as_ref()?;
        let related = self.related.related()?;
        related.owners.iter().find_map(|owner| {
            let kind = ResourceType::from_kind(&owner.kind)?;
            kind.is_restartable().then(|| WorkloadRef {
                namespace: pod.namespace.clone(),
                name: owner.name.clone(),
                kind,
            })
        })
    }

    /// Scale request for the owning workload. `None` yields a notification instead.
    pub fn scale_owner(&mut self, delta: i32) {
        let intent = match self.owner_workload() {
            None => Intent::Notify("No scalable owner for this pod".to_string()),
            Some((_, 0)) if delta < 0 => Intent::Notify("Already scaled to 0".to_string()),
            Some((workload, replicas)) => Intent::Scale {
                workload,
                replicas: (replicas + delta).max(0),
            },
        };
        self.pending = Some(intent);
    }

    pub fn take_pending_request(&mut self) -> Option<Intent> {
        self.pending.take()
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.is_searching() {
            if let Some(input) = map_text_input(key) {
                let changed = self
                    .focused_search_mut()
                    .is_some_and(|search| search.apply(input));
                if changed {
                    self.search_changed();
                }
            }
            return;
        }

        let Some(pod) = self.pod.clone() else {
            return;
        };

        if let Some(index) = digit(key) {
            self.select_container(index);
            return;
        }

        match key.code {
            KeyCode::Char('/') if self.focus.is_searchable() => {
                self.fullscreen = true;
                if let Some(search) = self.focused_search_mut() {
                    search.typing = true;
                }
            }
            KeyCode::Char('x') => self.pending = Some(Intent::DeletePod(pod)),
            KeyCode::Char('+') => self.scale_owner(1),
            KeyCode::Char('-') => self.scale_owner(-1),
            KeyCode::Char('D') => self.pending = Some(Intent::Describe(pod)),
            KeyCode::Char('e') => {
                let container = self.log_state().container.or_else(|| {
                    self.info
                        .as_ref()
                        .and_then(|info| info.containers.first())
                        .map(|container| container.name.clone())
                });
                self.pending = Some(Intent::Exec { pod, container });
            }
            KeyCode::Char('p') => {
                let port = self.info.as_ref().and_then(PodInfo::first_port);
                self.pending = Some(match port {
                    Some(port) => Intent::PortForward { pod, port },
                    None => Intent::Notify("Pod exposes no container ports".to_string()),
                });
            }
            KeyCode::Char('C') => {
                self.pending = Some(match self.events.copy_text() {
                    Some(text) => Intent::Clipboard {
                        label: "events".to_string(),
                        text,
                    },
                    None => Intent::Notify("No events to copy".to_string()),
                });
            }
            KeyCode::Char('m') => {
                self.related.toggle_manifest();
                self.focus = Panel::Related;
            }
            KeyCode::Char('F') => self.toggle_fullscreen(),
            KeyCode::Char('w') => match self.focus {
                Panel::Events => self.events.toggle_warnings_only(),
                _ => self.logs.toggle_errors_only(),
            },
            KeyCode::Char('f') => self.logs.toggle_follow(),
            KeyCode::Char('P') => self.logs.toggle_previous(),
            _ => {
                if let Some(nav) = map_navigation(key) {
                    self.scroll_focused(nav);
                }
            }
        }
    }

    fn select_container(&mut self, index: usize) {
        if index == 0 {
            self.logs.select_container(None);
            return;
        }
        let name = self
            .info
            .as_ref()
            .and_then(|info| info.containers.get(index - 1))
            .map(|container| container.name.clone());
        match name {
            Some(name) => self.logs.select_container(Some(name)),
            None => {
                self.pending = Some(Intent::Notify(format!("No container #{index}")));
            }
        }
    }

    fn scroll_focused(&mut self, nav: Nav) {
        let page = self.page;
        match self.focus {
            Panel::Logs => self.logs.scroll_by(nav, page),
            Panel::Events => self.events.scroll_by(nav, page),
            Panel::Metrics => {
                let rows = self
                    .info
                    .as_ref()
                    .map(|info| info.containers.len())
                    .unwrap_or_default();
                self.metrics.handle_nav(nav, rows.max(1), page);
            }
            Panel::Related => {
                let len = self.related_len();
                self.related.scroll_by(nav, len, page);
            }
        }
    }

    fn related_len(&self) -> usize {
        match self.related.view() {
            related::RelatedView::Related => self
                .related
                .related()
                .map(|related| related_lines(related).len())
                .unwrap_or_default(),
            related::RelatedView::Manifest => self
                .info
                .as_ref()
                .map(|info| info.manifest.lines().count())
                .unwrap_or_default(),
            related::RelatedView::Describe => match self.related.describe() {
                Some(Ok(text)) => text.lines().count(),
                _ => 1,
            },
        }
    }

    fn focused_search(&self) -> Option<&SearchState> {
        match self.focus {
            Panel::Logs => Some(&self.logs.search),
            Panel::Events => Some(&self.events.search),
            Panel::Metrics | Panel::Related => None,
        }
    }

    fn focused_search_mut(&mut self) -> Option<&mut SearchState> {
        match self.focus {
            Panel::Logs => Some(&mut self.logs.search),
            Panel::Events => Some(&mut self.events.search),
            Panel::Metrics | Panel::Related => None,
        }
    }

    fn search_changed(&mut self) {
        match self.focus {
            Panel::Logs => self.logs.search_changed(),
            Panel::Events => self.events.search_changed(),
            Panel::Metrics | Panel::Related => {}
        }
    }
}
