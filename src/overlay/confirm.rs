use crossterm::event::{KeyCode, KeyEvent};

use super::Overlay;
use crate::message::{ConfirmAction, Intent};

/// Yes/No prompt carrying the action it guards. Defaults to No.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfirmDialog {
    visible: bool,
    prompt: String,
    action: Option<ConfirmAction>,
    yes_selected: bool,
    pending: Option<Intent>,
}

impl ConfirmDialog {
    pub fn show(&mut self, prompt: String, action: ConfirmAction) {
        self.visible = true;
        self.prompt = prompt;
        self.action = Some(action);
        self.yes_selected = false;
        self.pending = None;
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn yes_selected(&self) -> bool {
        self.yes_selected
    }

    pub fn action(&self) -> Option<&ConfirmAction> {
        self.action.as_ref()
    }

    fn commit(&mut self, confirmed: bool) {
        self.visible = false;
        if let Some(action) = self.action.take() {
            self.pending = Some(Intent::ConfirmResult { confirmed, action });
        }
    }
}

impl Overlay for ConfirmDialog {
    fn is_visible(&self) -> bool {
        self.visible
    }

    fn hide(&mut self) {
        self.visible = false;
        self.action = None;
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('h') | KeyCode::Left => self.yes_selected = true,
            KeyCode::Char('l') | KeyCode::Right => self.yes_selected = false,
            KeyCode::Tab | KeyCode::BackTab => self.yes_selected = !self.yes_selected,
            KeyCode::Char('y') | KeyCode::Char('Y') => self.commit(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.commit(false),
            KeyCode::Enter => self.commit(self.yes_selected),
            _ => {}
        }
    }

    fn take_pending_request(&mut self) -> Option<Intent> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::ConfirmDialog;
    use crate::message::{ConfirmAction, Intent};
    use crate::overlay::Overlay;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn shown() -> ConfirmDialog {
        let mut dialog = ConfirmDialog::default();
        dialog.show(
            "Force delete namespace old?".to_string(),
            ConfirmAction::DeleteNamespace("old".to_string()),
        );
        dialog
    }

    #[test]
    fn enter_uses_current_choice_which_defaults_to_no() {
        let mut dialog = shown();
        dialog.handle_key(key(KeyCode::Enter));
        assert!(!dialog.is_visible());
        assert_eq!(
            dialog.take_pending_request(),
            Some(Intent::ConfirmResult {
                confirmed: false,
                action: ConfirmAction::DeleteNamespace("old".to_string()),
            })
        );
        assert_eq!(dialog.take_pending_request(), None);
    }

    #[test]
    fn left_then_enter_confirms() {
        let mut dialog = shown();
        dialog.handle_key(key(KeyCode::Char('h')));
        assert!(dialog.yes_selected());
        dialog.handle_key(key(KeyCode::Tab));
        dialog.handle_key(key(KeyCode::Tab));
        dialog.handle_key(key(KeyCode::Enter));
        assert!(matches!(
            dialog.take_pending_request(),
            Some(Intent::ConfirmResult {
                confirmed: true,
                ..
            })
        ));
    }

    #[test]
    fn escape_always_reports_a_denial() {
        let mut dialog = shown();
        dialog.handle_key(key(KeyCode::Char('h')));
        dialog.handle_key(key(KeyCode::Esc));
        assert!(matches!(
            dialog.take_pending_request(),
            Some(Intent::ConfirmResult {
                confirmed: false,
                ..
            })
        ));
    }
}
