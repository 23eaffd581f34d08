use crate::input::{Nav, apply_nav};
use crate::model::contains_ignore_case;

use super::SearchState;

const ERROR_MARKERS: [&str; 6] = ["error", "fatal", "panic", "exception", "fail", "warn"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogsPanel {
    lines: Vec<String>,
    scroll: usize,
    follow: bool,
    errors_only: bool,
    container: Option<String>,
    previous: bool,
    error: Option<String>,
    pub search: SearchState,
}

impl Default for LogsPanel {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            scroll: 0,
            follow: true,
            errors_only: false,
            container: None,
            previous: false,
            error: None,
            search: SearchState::default(),
        }
    }
}

impl LogsPanel {
    pub fn set_text(&mut self, text: &str) {
        self.lines = text.lines().map(str::to_string).collect();
        self.error = None;
        self.clamp_scroll();
    }

    pub fn set_error(&mut self, error: String) {
        self.error = Some(error);
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn follow(&self) -> bool {
        self.follow
    }

    pub fn errors_only(&self) -> bool {
        self.errors_only
    }

    pub fn previous(&self) -> bool {
        self.previous
    }

    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn visible_lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .map(String::as_str)
            .filter(|line| !self.errors_only || is_error_line(line))
            .filter(|line| contains_ignore_case(line, &self.search.query))
            .collect()
    }

    /// First visible line for a pane of `height` rows, honouring follow mode.
    pub fn window_start(&self, height: usize) -> usize {
        let len = self.visible_lines().len();
        if self.follow {
            len.saturating_sub(height)
        } else {
            self.scroll.min(len.saturating_sub(1))
        }
    }

    pub fn toggle_follow(&mut self) {
        self.follow = !self.follow;
        if !self.follow {
            self.scroll = self.visible_lines().len().saturating_sub(1);
        }
    }

    pub fn toggle_errors_only(&mut self) {
        self.errors_only = !self.errors_only;
        self.clamp_scroll();
    }

    pub fn toggle_previous(&mut self) {
        self.previous = !self.previous;
    }

    pub fn select_container(&mut self, container: Option<String>) {
        self.container = container;
    }

    pub fn scroll_by(&mut self, nav: Nav, page: usize) {
        let len = self.visible_lines().len();
        match nav {
            Nav::Bottom => {
                self.follow = true;
                self.scroll = len.saturating_sub(1);
                return;
            }
            Nav::Up | Nav::PageUp | Nav::Top if self.follow => {
                self.follow = false;
                self.scroll = len.saturating_sub(page);
            }
            _ => {}
        }
        self.scroll = apply_nav(self.scroll, nav, len, page);
    }

    pub fn search_changed(&mut self) {
        self.scroll = 0;
        self.clamp_scroll();
    }

    fn clamp_scroll(&mut self) {
        let len = self.visible_lines().len();
        self.scroll = self.scroll.min(len.saturating_sub(1));
    }
}

pub fn is_error_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    ERROR_MARKERS.iter().any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::{LogsPanel, is_error_line};
    use crate::input::Nav;

    #[test]
    fn errors_only_keeps_failure_lines() {
        let mut panel = LogsPanel::default();
        panel.set_text("starting\nERROR db unreachable\nready\npanic: nil map");
        panel.toggle_errors_only();
        assert_eq!(
            panel.visible_lines(),
            vec!["ERROR db unreachable", "panic: nil map"]
        );
    }

    #[test]
    fn search_is_case_insensitive() {
        let mut panel = LogsPanel::default();
        panel.set_text("GET /health 200\nGET /api 500\n");
        panel.search.query = "API".to_string();
        assert_eq!(panel.visible_lines(), vec!["GET /api 500"]);
    }

    #[test]
    fn scrolling_up_leaves_follow_mode() {
        let mut panel = LogsPanel::default();
        panel.set_text(&(0..50).map(|n| n.to_string()).collect::<Vec<_>>().join("\n"));
        assert!(panel.follow());
        assert_eq!(panel.window_start(10), 40);

        panel.scroll_by(Nav::Up, 10);
        assert!(!panel.follow());
        assert_eq!(panel.window_start(10), 39);

        panel.scroll_by(Nav::Bottom, 10);
        assert!(panel.follow());
    }

    #[test]
    fn detects_error_markers() {
        assert!(is_error_line("level=warn msg=slow"));
        assert!(!is_error_line("level=info msg=ok"));
    }
}
