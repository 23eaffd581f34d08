use crossterm::event::{KeyCode, KeyEvent};

use super::Overlay;
use crate::input::{apply_nav, map_navigation};

pub const HELP_SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Global",
        &[
            ("q / Ctrl-C", "quit"),
            ("?", "toggle help"),
            ("r / F5", "refresh"),
            ("n", "namespaces"),
            ("t", "resource types"),
            ("Esc", "back, close overlay, clear filter"),
            ("Tab / Shift-Tab", "next / previous panel or section"),
        ],
    ),
    (
        "Navigator",
        &[
            ("j/k, arrows", "move"),
            ("g / G", "top / bottom"),
            ("/", "search"),
            ("c", "clear filter"),
            ("Enter", "open"),
            ("a", "workload actions"),
            ("s / d", "scale up / down"),
            ("R", "restart workload"),
            ("h / l", "namespaces or nodes"),
        ],
    ),
    (
        "Dashboard",
        &[
            ("1..9 / 0", "select container / all"),
            ("P", "previous instance logs"),
            ("f", "follow tail"),
            ("w", "errors or warnings only"),
            ("/", "search panel"),
            ("F", "fullscreen"),
            ("m", "manifest"),
            ("D", "describe"),
            ("C", "copy visible events"),
            ("+ / -", "scale owner"),
            ("x", "delete pod"),
            ("e", "exec shell"),
            ("p", "port-forward"),
        ],
    ),
    (
        "Viewers",
        &[
            ("Enter", "copy value"),
            ("a", "copy to namespace"),
            ("Esc", "back / close"),
        ],
    ),
];

pub fn help_line_count() -> usize {
    HELP_SECTIONS
        .iter()
        .map(|(_, entries)| entries.len() + 2)
        .sum()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HelpOverlay {
    visible: bool,
    scroll: usize,
}

impl HelpOverlay {
    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        self.scroll = 0;
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }
}

impl Overlay for HelpOverlay {
    fn is_visible(&self) -> bool {
        self.visible
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('?') | KeyCode::Esc => self.hide(),
            _ => {
                if let Some(nav) = map_navigation(key) {
                    self.scroll = apply_nav(self.scroll, nav, help_line_count(), 10);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HelpOverlay;
    use crate::overlay::Overlay;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn only_question_mark_or_escape_closes() {
        let mut help = HelpOverlay::default();
        help.toggle();
        help.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(help.is_visible());
        help.handle_key(KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE));
        assert_eq!(help.scroll(), 1);
        help.handle_key(KeyEvent::new(KeyCode::Char('?'), KeyModifiers::NONE));
        assert!(!help.is_visible());
    }
}
