pub mod action_menu;
pub mod confirm;
pub mod help;
pub mod viewer;

use crossterm::event::KeyEvent;

use crate::message::{ConfirmAction, Intent};
use crate::model::WorkloadInfo;

use action_menu::ActionMenu;
use confirm::ConfirmDialog;
use help::HelpOverlay;
use viewer::{ValueViewer, ViewerKind};

/// Modal widget layered over the main view.
pub trait Overlay {
    fn is_visible(&self) -> bool;
    fn hide(&mut self);
    fn handle_key(&mut self, key: KeyEvent);

    /// Returns and clears the intent queued by the last key, if any.
    fn take_pending_request(&mut self) -> Option<Intent> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlays {
    pub confirm: ConfirmDialog,
    pub action_menu: ActionMenu,
    pub help: HelpOverlay,
    pub config_map: ValueViewer,
    pub secret: ValueViewer,
    pub docker: ValueViewer,
}

impl Default for Overlays {
    fn default() -> Self {
        Self {
            confirm: ConfirmDialog::default(),
            action_menu: ActionMenu::default(),
            help: HelpOverlay::default(),
            config_map: ValueViewer::new(ViewerKind::ConfigMap),
            secret: ValueViewer::new(ViewerKind::Secret),
            docker: ValueViewer::new(ViewerKind::DockerRegistry),
        }
    }
}

impl Overlays {
    pub fn hide_all(&mut self) {
        self.confirm.hide();
        self.action_menu.hide();
        self.help.hide();
        for viewer in self.viewers_mut() {
            viewer.hide();
        }
    }

    pub fn visible_count(&self) -> usize {
        let fixed: [&dyn Overlay; 3] = [&self.confirm, &self.action_menu, &self.help];
        fixed.iter().filter(|overlay| overlay.is_visible()).count()
            + self.viewers().iter().filter(|viewer| viewer.is_visible()).count()
    }

    pub fn show_confirm(&mut self, prompt: String, action: ConfirmAction) {
        self.hide_all();
        self.confirm.show(prompt, action);
    }

    pub fn show_action_menu(&mut self, workload: &WorkloadInfo) -> bool {
        self.hide_all();
        self.action_menu.show(workload)
    }

    pub fn toggle_help(&mut self) {
        let show = !self.help.is_visible();
        self.hide_all();
        if show {
            self.help.toggle();
        }
    }

    pub fn show_viewer(
        &mut self,
        kind: ViewerKind,
        namespace: &str,
        name: &str,
        namespaces: Vec<String>,
    ) {
        self.hide_all();
        self.viewer_mut(kind).show_loading(namespace, name, namespaces);
    }

    pub fn viewer_mut(&mut self, kind: ViewerKind) -> &mut ValueViewer {
        match kind {
            ViewerKind::ConfigMap => &mut self.config_map,
            ViewerKind::Secret => &mut self.secret,
            ViewerKind::DockerRegistry => &mut self.docker,
        }
    }

    pub fn visible_viewer(&self) -> Option<&ValueViewer> {
        self.viewers().into_iter().find(|viewer| viewer.is_visible())
    }

    pub fn visible_viewer_mut(&mut self) -> Option<&mut ValueViewer> {
        self.viewers_mut().into_iter().find(|viewer| viewer.is_visible())
    }

    /// Mirrors the controller status into every viewer footer.
    pub fn set_viewer_status(&mut self, status: Option<&str>) {
        for viewer in self.viewers_mut() {
            viewer.set_status(status.map(str::to_string));
        }
    }

    pub fn set_page(&mut self, page: usize) {
        for viewer in self.viewers_mut() {
            viewer.set_page(page);
        }
    }

    fn viewers(&self) -> [&ValueViewer; 3] {
        [&self.config_map, &self.secret, &self.docker]
    }

    fn viewers_mut(&mut self) -> [&mut ValueViewer; 3] {
        [&mut self.config_map, &mut self.secret, &mut self.docker]
    }
}

#[cfg(test)]
mod tests {
    use super::{Overlay, Overlays};
    use super::viewer::ViewerKind;
    use crate::message::ConfirmAction;

    #[test]
    fn showing_one_overlay_hides_the_others() {
        let mut overlays = Overlays::default();
        overlays.toggle_help();
        assert_eq!(overlays.visible_count(), 1);

        overlays.show_viewer(ViewerKind::Secret, "prod", "token", Vec::new());
        assert_eq!(overlays.visible_count(), 1);
        assert!(!overlays.help.is_visible());

        overlays.show_confirm(
            "Delete pod?".to_string(),
            ConfirmAction::DeleteNamespace("old".to_string()),
        );
        assert_eq!(overlays.visible_count(), 1);
        assert!(overlays.visible_viewer().is_none());
    }

    #[test]
    fn status_reaches_every_viewer() {
        let mut overlays = Overlays::default();
        overlays.set_viewer_status(Some("Copying to dev…"));
        assert_eq!(overlays.docker.status(), Some("Copying to dev…"));
        overlays.set_viewer_status(None);
        assert_eq!(overlays.config_map.status(), None);
        assert_eq!(overlays.secret.status(), None);
    }
}
