use crossterm::event::{KeyCode, KeyEvent};
use std::ops::Range;

use crate::input::{Nav, TextInput, apply_nav, map_navigation, map_text_input};
use crate::model::{
    ConfigMapInfo, NamespaceInfo, NodeInfo, PodInfo, ResourceType, SecretInfo, WorkloadInfo,
    WorkloadRef, contains_ignore_case,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Workloads,
    Resources,
    Namespace,
    ResourceType,
}

/// The stacked lists shown in Resources mode, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Pods,
    ConfigMaps,
    Secrets,
    DockerSecrets,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Pods,
        Section::ConfigMaps,
        Section::Secrets,
        Section::DockerSecrets,
    ];

    pub fn index(self) -> usize {
        match self {
            Section::Pods => 0,
            Section::ConfigMaps => 1,
            Section::Secrets => 2,
            Section::DockerSecrets => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Section::Pods => "Pods",
            Section::ConfigMaps => "ConfigMaps",
            Section::Secrets => "Secrets",
            Section::DockerSecrets => "Docker Registry Secrets",
        }
    }

    fn offset(self, delta: isize) -> Section {
        let len = Self::ALL.len() as isize;
        let index = (self.index() as isize + delta).rem_euclid(len) as usize;
        Self::ALL[index]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamespaceFocus {
    #[default]
    Namespaces,
    Nodes,
}

/// Owning workload offered for scaling while its pod list is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleHint {
    pub workload: WorkloadRef,
    pub replicas: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    mode: Mode,
    resource_type: ResourceType,
    workload_cursor: usize,
    namespace_cursor: usize,
    type_cursor: usize,
    node_cursor: usize,
    section: Section,
    section_cursors: [usize; 4],
    query: String,
    searching: bool,
    namespace_focus: NamespaceFocus,
    node_query: String,
    node_searching: bool,
    workloads: Vec<WorkloadInfo>,
    pods: Vec<PodInfo>,
    config_maps: Vec<ConfigMapInfo>,
    secrets: Vec<SecretInfo>,
    namespaces: Vec<NamespaceInfo>,
    nodes: Vec<NodeInfo>,
    scale_hint: Option<ScaleHint>,
    page: usize,
}

impl Navigator {
    pub fn new(mode: Mode, resource_type: ResourceType) -> Self {
        Self {
            mode,
            resource_type,
            workload_cursor: 0,
            namespace_cursor: 0,
            type_cursor: 0,
            node_cursor: 0,
            section: Section::Pods,
            section_cursors: [0; 4],
            query: String::new(),
            searching: false,
            namespace_focus: NamespaceFocus::Namespaces,
            node_query: String::new(),
            node_searching: false,
            workloads: Vec::new(),
            pods: Vec::new(),
            config_maps: Vec::new(),
            secrets: Vec::new(),
            namespaces: Vec::new(),
            nodes: Vec::new(),
            scale_hint: None,
            page: 10,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn namespace_focus(&self) -> NamespaceFocus {
        self.namespace_focus
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn node_query(&self) -> &str {
        &self.node_query
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    pub fn is_node_searching(&self) -> bool {
        self.node_searching
    }

    pub fn has_filter(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn scale_hint(&self) -> Option<&ScaleHint> {
        self.scale_hint.as_ref()
    }

    pub fn set_scale_hint(&mut self, hint: Option<ScaleHint>) {
        self.scale_hint = hint;
    }

    pub fn set_page(&mut self, rows: usize) {
        self.page = rows.max(1);
    }

    /// Switches mode, resetting that mode's cursor and the search query.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.clear_search();
        match mode {
            Mode::Workloads => self.workload_cursor = 0,
            Mode::Resources => {
                self.section = Section::Pods;
                self.section_cursors = [0; 4];
            }
            Mode::Namespace => {
                self.namespace_cursor = 0;
                self.namespace_focus = NamespaceFocus::Namespaces;
                self.node_searching = false;
            }
            Mode::ResourceType => self.type_cursor = 0,
        }
    }

    pub fn set_resource_type(&mut self, resource_type: ResourceType) {
        if self.resource_type != resource_type {
            self.workloads.clear();
            self.workload_cursor = 0;
        }
        self.resource_type = resource_type;
    }

    pub fn clear_search(&mut self) {
        self.query.clear();
        self.searching = false;
        self.reset_cursor();
    }

    pub fn clear_node_filter(&mut self) {
        self.node_query.clear();
        self.node_searching = false;
        self.node_cursor = 0;
    }

    pub fn set_workloads(&mut self, workloads: Vec<WorkloadInfo>) {
        self.workloads = workloads;
        self.workload_cursor = clamp(self.workload_cursor, self.visible_workloads().len());
    }

    pub fn set_pods(&mut self, pods: Vec<PodInfo>) {
        self.pods = pods;
        self.clamp_section(Section::Pods);
    }

    pub fn set_config_maps(&mut self, config_maps: Vec<ConfigMapInfo>) {
        self.config_maps = config_maps;
        self.clamp_section(Section::ConfigMaps);
    }

    pub fn set_secrets(&mut self, secrets: Vec<SecretInfo>) {
        self.secrets = secrets;
        self.clamp_section(Section::Secrets);
        self.clamp_section(Section::DockerSecrets);
    }

    pub fn set_namespaces(&mut self, namespaces: Vec<NamespaceInfo>) {
        self.namespaces = namespaces;
        self.namespace_cursor = clamp(self.namespace_cursor, self.visible_namespaces().len());
    }

    pub fn set_nodes(&mut self, nodes: Vec<NodeInfo>) {
        self.nodes = nodes;
        self.node_cursor = clamp(self.node_cursor, self.visible_nodes().len());
        if self.nodes.is_empty() {
            self.namespace_focus = NamespaceFocus::Namespaces;
            self.node_searching = false;
        }
    }

    pub fn workloads(&self) -> &[WorkloadInfo] {
        &self.workloads
    }

    pub fn pods(&self) -> &[PodInfo] {
        &self.pods
    }

    pub fn namespaces(&self) -> &[NamespaceInfo] {
        &self.namespaces
    }

    pub fn nodes(&self) -> &[NodeInfo] {
        &self.nodes
    }

    pub fn has_nodes(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn visible_workloads(&self) -> Vec<&WorkloadInfo> {
        self.workloads
            .iter()
            .filter(|workload| workload.matches_filter(&self.query))
            .collect()
    }

    pub fn visible_pods(&self) -> Vec<&PodInfo> {
        self.pods
            .iter()
            .filter(|pod| pod.matches_filter(&self.query))
            .collect()
    }

    pub fn visible_config_maps(&self) -> Vec<&ConfigMapInfo> {
        self.config_maps
            .iter()
            .filter(|config_map| contains_ignore_case(&config_map.name, &self.query))
            .collect()
    }

    /// Secrets of one partition: `docker` selects registry credentials, otherwise the rest.
    pub fn visible_secrets(&self, docker: bool) -> Vec<&SecretInfo> {
        self.secrets
            .iter()
            .filter(|secret| secret.is_docker_registry() == docker)
            .filter(|secret| contains_ignore_case(&secret.name, &self.query))
            .collect()
    }

    pub fn visible_namespaces(&self) -> Vec<&NamespaceInfo> {
        self.namespaces
            .iter()
            .filter(|namespace| {
                contains_ignore_case(&namespace.name, &self.query)
                    || contains_ignore_case(&namespace.phase, &self.query)
            })
            .collect()
    }

    pub fn visible_resource_types(&self) -> Vec<ResourceType> {
        ResourceType::ALL
            .into_iter()
            .filter(|kind| {
                contains_ignore_case(kind.title(), &self.query)
                    || contains_ignore_case(kind.description(), &self.query)
            })
            .collect()
    }

    pub fn visible_nodes(&self) -> Vec<&NodeInfo> {
        self.nodes
            .iter()
            .filter(|node| node.matches_filter(&self.node_query))
            .collect()
    }

    pub fn section_len(&self, section: Section) -> usize {
        match section {
            Section::Pods => self.visible_pods().len(),
            Section::ConfigMaps => self.visible_config_maps().len(),
            Section::Secrets => self.visible_secrets(false).len(),
            Section::DockerSecrets => self.visible_secrets(true).len(),
        }
    }

    pub fn cursor(&self) -> usize {
        match self.mode {
            Mode::Workloads => self.workload_cursor,
            Mode::Resources => self.section_cursors[self.section.index()],
            Mode::Namespace => self.namespace_cursor,
            Mode::ResourceType => self.type_cursor,
        }
    }

    pub fn section_cursor(&self, section: Section) -> usize {
        self.section_cursors[section.index()]
    }

    pub fn node_cursor(&self) -> usize {
        self.node_cursor
    }

    pub fn selected_workload(&self) -> Option<&WorkloadInfo> {
        self.visible_workloads().get(self.workload_cursor).copied()
    }

    pub fn selected_pod(&self) -> Option<&PodInfo> {
        self.visible_pods()
            .get(self.section_cursor(Section::Pods))
            .copied()
    }

    pub fn selected_config_map(&self) -> Option<&ConfigMapInfo> {
        self.visible_config_maps()
            .get(self.section_cursor(Section::ConfigMaps))
            .copied()
    }

    /// The focused secret of the active secret partition.
    pub fn selected_secret(&self) -> Option<&SecretInfo> {
        match self.section {
            Section::Secrets => self
                .visible_secrets(false)
                .get(self.section_cursor(Section::Secrets))
                .copied(),
            Section::DockerSecrets => self
                .visible_secrets(true)
                .get(self.section_cursor(Section::DockerSecrets))
                .copied(),
            _ => None,
        }
    }

    pub fn selected_namespace(&self) -> Option<&NamespaceInfo> {
        self.visible_namespaces()
            .get(self.namespace_cursor)
            .copied()
    }

    pub fn selected_node(&self) -> Option<&NodeInfo> {
        self.visible_nodes().get(self.node_cursor).copied()
    }

    pub fn selected_resource_type(&self) -> Option<ResourceType> {
        self.visible_resource_types().get(self.type_cursor).copied()
    }

    pub fn next_section(&mut self) {
        self.section = self.section.offset(1);
    }

    pub fn prev_section(&mut self) {
        self.section = self.section.offset(-1);
    }

    pub fn toggle_namespace_focus(&mut self) {
        self.namespace_focus = match self.namespace_focus {
            NamespaceFocus::Namespaces if self.has_nodes() => NamespaceFocus::Nodes,
            _ => NamespaceFocus::Namespaces,
        };
    }

    /// Keys that reach the navigator after global chords were tried.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.mode == Mode::Namespace && self.has_nodes() {
            match map_navigation(key) {
                Some(Nav::Left) => {
                    self.namespace_focus = NamespaceFocus::Namespaces;
                    return true;
                }
                Some(Nav::Right) => {
                    self.namespace_focus = NamespaceFocus::Nodes;
                    return true;
                }
                _ => {}
            }
        }

        let on_nodes =
            self.mode == Mode::Namespace && self.namespace_focus == NamespaceFocus::Nodes;
        match key.code {
            KeyCode::Char('/') if on_nodes => {
                self.node_searching = true;
                return true;
            }
            KeyCode::Char('/') => {
                self.searching = true;
                return true;
            }
            KeyCode::Char('c') if on_nodes => {
                self.clear_node_filter();
                return true;
            }
            KeyCode::Char('c') => {
                self.clear_search();
                return true;
            }
            _ => {}
        }

        let Some(nav) = map_navigation(key) else {
            return false;
        };
        if on_nodes {
            self.node_cursor = apply_nav(self.node_cursor, nav, self.visible_nodes().len(), self.page);
            return true;
        }
        match self.mode {
            Mode::Workloads => {
                self.workload_cursor =
                    apply_nav(self.workload_cursor, nav, self.visible_workloads().len(), self.page);
            }
            Mode::Namespace => {
                self.namespace_cursor = apply_nav(
                    self.namespace_cursor,
                    nav,
                    self.visible_namespaces().len(),
                    self.page,
                );
            }
            Mode::ResourceType => {
                self.type_cursor =
                    apply_nav(self.type_cursor, nav, self.visible_resource_types().len(), self.page);
            }
            Mode::Resources => self.move_in_sections(nav),
        }
        true
    }

    /// Typing into the list filter.
    pub fn handle_search_key(&mut self, key: KeyEvent) {
        match map_text_input(key) {
            Some(TextInput::Submit) => self.searching = false,
            Some(TextInput::Cancel) if self.query.is_empty() => self.searching = false,
            Some(TextInput::Cancel) => {
                self.query.clear();
                self.reset_cursor();
            }
            Some(TextInput::Backspace) => {
                self.query.pop();
                self.reset_cursor();
            }
            Some(TextInput::Char(c)) => {
                self.query.push(c);
                self.reset_cursor();
            }
            None => {}
        }
    }

    pub fn handle_node_filter_key(&mut self, key: KeyEvent) {
        match map_text_input(key) {
            Some(TextInput::Submit) => self.node_searching = false,
            Some(TextInput::Cancel) if self.node_query.is_empty() => self.node_searching = false,
            Some(TextInput::Cancel) => {
                self.node_query.clear();
                self.node_cursor = 0;
            }
            Some(TextInput::Backspace) => {
                self.node_query.pop();
                self.node_cursor = 0;
            }
            Some(TextInput::Char(c)) => {
                self.node_query.push(c);
                self.node_cursor = 0;
            }
            None => {}
        }
    }

    fn move_in_sections(&mut self, nav: Nav) {
        let index = self.section.index();
        let len = self.section_len(self.section);
        let cursor = self.section_cursors[index];
        match nav {
            Nav::Down if len == 0 || cursor + 1 >= len => {
                let next = Section::ALL
                    .into_iter()
                    .skip(index + 1)
                    .find(|section| self.section_len(*section) > 0);
                if let Some(next) = next {
                    self.section = next;
                    self.section_cursors[next.index()] = 0;
                }
            }
            Nav::Up if cursor == 0 => {
                let previous = Section::ALL
                    .into_iter()
                    .take(index)
                    .rev()
                    .find(|section| self.section_len(*section) > 0);
                if let Some(previous) = previous {
                    self.section = previous;
                    self.section_cursors[previous.index()] =
                        self.section_len(previous).saturating_sub(1);
                }
            }
            nav => self.section_cursors[index] = apply_nav(cursor, nav, len, self.page),
        }
    }

    fn reset_cursor(&mut self) {
        match self.mode {
            Mode::Workloads => self.workload_cursor = 0,
            Mode::Resources => self.section_cursors = [0; 4],
            Mode::Namespace => self.namespace_cursor = 0,
            Mode::ResourceType => self.type_cursor = 0,
        }
    }

    fn clamp_section(&mut self, section: Section) {
        let len = self.section_len(section);
        let cursor = &mut self.section_cursors[section.index()];
        *cursor = clamp(*cursor, len);
    }
}

fn clamp(cursor: usize, len: usize) -> usize {
    cursor.min(len.saturating_sub(1))
}

/// Rows to draw so the cursor stays centred once the list outgrows the pane.
pub fn viewport(cursor: usize, len: usize, height: usize) -> Range<usize> {
    if height == 0 || len <= height {
        return 0..len;
    }
    let start = cursor.saturating_sub(height / 2).min(len - height);
    start..start + height
}
