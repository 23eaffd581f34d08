use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use crossterm::event::{KeyCode, KeyEvent};
use serde::Deserialize;
use std::collections::BTreeMap;

use super::Overlay;
use crate::input::{TextInput, apply_nav, map_navigation, map_text_input};
use crate::message::{CopyKind, CopyTarget, Intent};
use crate::model::{ConfigMapData, SecretData, contains_ignore_case};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerKind {
    ConfigMap,
    Secret,
    DockerRegistry,
}

impl ViewerKind {
    pub fn title(self) -> &'static str {
        match self {
            ViewerKind::ConfigMap => "ConfigMap",
            ViewerKind::Secret => "Secret",
            ViewerKind::DockerRegistry => "Docker Registry",
        }
    }

    fn copy_kind(self) -> CopyKind {
        match self {
            ViewerKind::ConfigMap => CopyKind::ConfigMap,
            ViewerKind::Secret | ViewerKind::DockerRegistry => CopyKind::Secret,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewerState {
    #[default]
    Normal,
    Action,
    NamespaceSelector,
}

pub const VIEWER_ACTIONS: [&str; 2] = ["Copy to namespace…", "Copy to all namespaces"];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewerEntry {
    pub key: String,
    pub value: String,
    pub details: Vec<(&'static str, String)>,
}

/// Key/value viewer shared by ConfigMaps, Secrets and docker-registry Secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueViewer {
    kind: ViewerKind,
    visible: bool,
    loading: bool,
    namespace: String,
    name: String,
    entries: Vec<ViewerEntry>,
    error: Option<String>,
    state: ViewerState,
    cursor: usize,
    action_cursor: usize,
    namespaces: Vec<String>,
    filter: String,
    namespace_cursor: usize,
    status: Option<String>,
    pending: Option<Intent>,
    page: usize,
}

impl ValueViewer {
    pub fn new(kind: ViewerKind) -> Self {
        Self {
            kind,
            visible: false,
            loading: false,
            namespace: String::new(),
            name: String::new(),
            entries: Vec::new(),
            error: None,
            state: ViewerState::Normal,
            cursor: 0,
            action_cursor: 0,
            namespaces: Vec::new(),
            filter: String::new(),
            namespace_cursor: 0,
            status: None,
            pending: None,
            page: 10,
        }
    }

    /// Opens the viewer while its data is still loading. `namespaces` feeds the copy selector.
    pub fn show_loading(&mut self, namespace: &str, name: &str, namespaces: Vec<String>) {
        let status = self.status.take();
        *self = Self {
            visible: true,
            loading: true,
            namespace: namespace.to_string(),
            name: name.to_string(),
            namespaces,
            status,
            page: self.page,
            ..Self::new(self.kind)
        };
    }

    pub fn is_showing(&self, namespace: &str, name: &str) -> bool {
        self.visible && self.namespace == namespace && self.name == name
    }

    pub fn set_config_map(&mut self, data: ConfigMapData) {
        self.set_entries(plain_entries(data.data));
    }

    pub fn set_secret(&mut self, data: SecretData) {
        let entries = match self.kind {
            ViewerKind::DockerRegistry => match docker_entries(&data.data) {
                Ok(entries) => entries,
                Err(error) => {
                    self.set_error(error);
                    return;
                }
            },
            _ => plain_entries(data.data),
        };
        self.set_entries(entries);
    }

    pub fn set_error(&mut self, error: String) {
        self.loading = false;
        self.error = Some(error);
    }

    fn set_entries(&mut self, entries: Vec<ViewerEntry>) {
        self.loading = false;
        self.error = None;
        self.entries = entries;
        self.cursor = self.cursor.min(self.entries.len().saturating_sub(1));
    }

    pub fn set_status(&mut self, status: Option<String>) {
        self.status = status;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn kind(&self) -> ViewerKind {
        self.kind
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn entries(&self) -> &[ViewerEntry] {
        &self.entries
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn action_cursor(&self) -> usize {
        self.action_cursor
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn namespace_cursor(&self) -> usize {
        self.namespace_cursor
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn visible_namespaces(&self) -> Vec<&str> {
        self.namespaces
            .iter()
            .map(String::as_str)
            .filter(|namespace| contains_ignore_case(namespace, &self.filter))
            .collect()
    }

    fn copy_intent(&self, target: CopyTarget) -> Intent {
        Intent::Copy {
            kind: self.kind.copy_kind(),
            source_namespace: self.namespace.clone(),
            name: self.name.clone(),
            target,
        }
    }

    fn handle_normal(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.hide(),
            KeyCode::Enter => {
                if let Some(entry) = self.entries.get(self.cursor) {
                    let label = match self.kind {
                        ViewerKind::DockerRegistry => format!("password for {}", entry.key),
                        _ => entry.key.clone(),
                    };
                    self.pending = Some(Intent::Clipboard {
                        label,
                        text: entry.value.clone(),
                    });
                }
            }
            KeyCode::Char('a') if !self.loading => {
                self.state = ViewerState::Action;
                self.action_cursor = 0;
            }
            _ => {
                if let Some(nav) = map_navigation(key) {
                    self.cursor = apply_nav(self.cursor, nav, self.entries.len(), self.page);
                }
            }
        }
    }

    fn handle_action(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.state = ViewerState::Normal,
            KeyCode::Enter => {
                if self.action_cursor == 0 {
                    self.state = ViewerState::NamespaceSelector;
                    self.filter.clear();
                    self.namespace_cursor = 0;
                } else {
                    self.pending = Some(self.copy_intent(CopyTarget::AllNamespaces));
                    self.state = ViewerState::Normal;
                }
            }
            _ => {
                if let Some(nav) = map_navigation(key) {
                    self.action_cursor = apply_nav(self.action_cursor, nav, VIEWER_ACTIONS.len(), 1);
                }
            }
        }
    }

    fn handle_selector(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Down | KeyCode::PageUp | KeyCode::PageDown => {
                if let Some(nav) = map_navigation(key) {
                    let len = self.visible_namespaces().len();
                    self.namespace_cursor = apply_nav(self.namespace_cursor, nav, len, self.page);
                }
                return;
            }
            _ => {}
        }
        match map_text_input(key) {
            Some(TextInput::Cancel) => self.state = ViewerState::Action,
            Some(TextInput::Submit) => {
                let target = self
                    .visible_namespaces()
                    .get(self.namespace_cursor)
                    .map(|namespace| namespace.to_string());
                if let Some(target) = target
                    && target != self.namespace
                {
                    self.pending = Some(self.copy_intent(CopyTarget::Namespace(target)));
                    self.state = ViewerState::Normal;
                }
            }
            Some(TextInput::Char(c)) => {
                self.filter.push(c);
                self.namespace_cursor = 0;
            }
            Some(TextInput::Backspace) => {
                self.filter.pop();
                self.namespace_cursor = 0;
            }
            None => {}
        }
    }
}

impl Overlay for ValueViewer {
    fn is_visible(&self) -> bool {
        self.visible
    }

    fn hide(&mut self) {
        self.visible = false;
        self.state = ViewerState::Normal;
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match self.state {
            ViewerState::Normal => self.handle_normal(key),
            ViewerState::Action => self.handle_action(key),
            ViewerState::NamespaceSelector => self.handle_selector(key),
        }
    }

    fn take_pending_request(&mut self) -> Option<Intent> {
        self.pending.take()
    }
}

fn plain_entries(data: BTreeMap<String, String>) -> Vec<ViewerEntry> {
    data.into_iter()
        .map(|(key, value)| ViewerEntry {
            key,
            value,
            details: Vec::new(),
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct DockerConfig {
    #[serde(default)]
    auths: BTreeMap<String, DockerAuth>,
}

#[derive(Debug, Default, Deserialize)]
struct DockerAuth {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    auth: Option<String>,
}

/// One entry per registry from `.dockerconfigjson` (or legacy `.dockercfg`).
pub fn docker_entries(data: &BTreeMap<String, String>) -> Result<Vec<ViewerEntry>, String> {
    let auths = if let Some(raw) = data.get(".dockerconfigjson") {
        serde_json::from_str::<DockerConfig>(raw)
            .map_err(|error| format!("invalid .dockerconfigjson: {error}"))?
            .auths
    } else if let Some(raw) = data.get(".dockercfg") {
        serde_json::from_str::<BTreeMap<String, DockerAuth>>(raw)
            .map_err(|error| format!("invalid .dockercfg: {error}"))?
    } else {
        return Err("secret has no docker config key".to_string());
    };

    Ok(auths
        .into_iter()
        .map(|(server, auth)| {
            let decoded = auth.auth.as_deref().and_then(decode_auth);
            let (username, password) = match (auth.username, auth.password, decoded) {
                (Some(username), Some(password), _) => (username, password),
                (username, password, Some((user, pass))) => {
                    (username.unwrap_or(user), password.unwrap_or(pass))
                }
                (username, password, None) => {
                    (username.unwrap_or_default(), password.unwrap_or_default())
                }
            };
            ViewerEntry {
                key: server,
                value: password,
                details: vec![
                    ("username", username),
                    ("email", auth.email.unwrap_or_else(|| "-".to_string())),
                ],
            }
        })
        .collect())
}

fn decode_auth(auth: &str) -> Option<(String, String)> {
    let bytes = STANDARD.decode(auth.trim()).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let (user, pass) = text.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}
