use crossterm::event::{KeyCode, KeyEvent};

use super::Overlay;
use crate::input::{apply_nav, map_navigation};
use crate::message::Intent;
use crate::model::WorkloadInfo;

const SCALE_PRESETS: [i32; 6] = [0, 1, 2, 3, 5, 10];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
    pub intent: Intent,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionMenu {
    visible: bool,
    title: String,
    items: Vec<MenuItem>,
    cursor: usize,
    pending: Option<Intent>,
}

impl ActionMenu {
    /// Opens the menu for `workload`. Returns `false` when the kind offers no actions.
    pub fn show(&mut self, workload: &WorkloadInfo) -> bool {
        self.items = menu_items(workload);
        self.title = format!("{} {}", workload.kind.kind(), workload.name);
        self.cursor = 0;
        self.pending = None;
        self.visible = !self.items.is_empty();
        self.visible
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl Overlay for ActionMenu {
    fn is_visible(&self) -> bool {
        self.visible
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('a') => self.hide(),
            KeyCode::Enter => {
                if let Some(item) = self.items.get(self.cursor) {
                    self.pending = Some(item.intent.clone());
                    self.hide();
                }
            }
            _ => {
                if let Some(nav) = map_navigation(key) {
                    self.cursor = apply_nav(self.cursor, nav, self.items.len(), 5);
                }
            }
        }
    }

    fn take_pending_request(&mut self) -> Option<Intent> {
        self.pending.take()
    }
}

fn menu_items(workload: &WorkloadInfo) -> Vec<MenuItem> {
    let reference = workload.reference();
    let target = format!("{}/{}", workload.kind.kubectl_name(), workload.name);
    let mut items = Vec::new();

    if workload.kind.is_scalable() {
        let current = workload.replicas.unwrap_or(0);
        for replicas in SCALE_PRESETS {
            let marker = if replicas == current { " (current)" } else { "" };
            items.push(MenuItem {
                label: format!("Scale to {replicas}{marker}"),
                intent: Intent::Scale {
                    workload: reference.clone(),
                    replicas,
                },
            });
        }
    }

    if workload.kind.is_restartable() {
        items.push(MenuItem {
            label: "Restart".to_string(),
            intent: Intent::Restart(reference.clone()),
        });
    }

    if workload.kind.is_scalable() {
        let command = format!(
            "kubectl scale {target} -n {} --replicas={}",
            workload.namespace,
            workload.replicas.unwrap_or(0)
        );
        items.push(copy_item("Copy scale command", command));
    }

    if workload.kind.is_restartable() {
        let command = format!("kubectl rollout restart {target} -n {}", workload.namespace);
        items.push(copy_item("Copy rollout restart command", command));
    }

    if !workload.selector.is_empty() {
        let selector = workload
            .selector
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",");
        let command = format!("kubectl get pods -n {} -l {selector}", workload.namespace);
        items.push(copy_item("Copy get pods command", command));
    }

    items
}

fn copy_item(label: &str, command: String) -> MenuItem {
    MenuItem {
        label: format!("{label}: {command}"),
        intent: Intent::Clipboard {
            label: "command".to_string(),
            text: command,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::ActionMenu;
    use crate::message::Intent;
    use crate::model::{ResourceType, WorkloadInfo};
    use crate::overlay::Overlay;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::collections::BTreeMap;

    fn workload(kind: ResourceType) -> WorkloadInfo {
        WorkloadInfo {
            namespace: "prod".to_string(),
            name: "api".to_string(),
            kind,
            ready: "3/3".to_string(),
            status: "Running".to_string(),
            replicas: Some(3),
            ready_replicas: 3,
            selector: BTreeMap::from([("app".to_string(), "api".to_string())]),
            created: None,
        }
    }

    #[test]
    fn deployment_menu_lists_presets_then_commands() {
        let mut menu = ActionMenu::default();
        assert!(menu.show(&workload(ResourceType::Deployments)));
        let labels = menu
            .items()
            .iter()
            .map(|item| item.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels[0], "Scale to 0");
        assert_eq!(labels[3], "Scale to 3 (current)");
        assert_eq!(labels[6], "Restart");
        assert_eq!(
            labels[7],
            "Copy scale command: kubectl scale deployment/api -n prod --replicas=3"
        );
        assert_eq!(
            labels.last().copied(),
            Some("Copy get pods command: kubectl get pods -n prod -l app=api")
        );
    }

    #[test]
    fn enter_emits_selected_item() {
        let mut menu = ActionMenu::default();
        menu.show(&workload(ResourceType::Deployments));
        menu.handle_key(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE));
        menu.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert!(!menu.is_visible());
        assert!(matches!(
            menu.take_pending_request(),
            Some(Intent::Scale { replicas: 1, .. })
        ));
    }

    #[test]
    fn jobs_only_offer_the_selector_command() {
        let mut menu = ActionMenu::default();
        assert!(menu.show(&workload(ResourceType::Jobs)));
        assert_eq!(menu.items().len(), 1);

        let mut bare = workload(ResourceType::CronJobs);
        bare.selector.clear();
        assert!(!menu.show(&bare));
    }
}
