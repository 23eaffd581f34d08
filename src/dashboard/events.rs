use crate::input::{Nav, apply_nav};
use crate::model::EventInfo;

use super::SearchState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsPanel {
    events: Vec<EventInfo>,
    warnings_only: bool,
    scroll: usize,
    error: Option<String>,
    pub search: SearchState,
}

impl Default for EventsPanel {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            warnings_only: true,
            scroll: 0,
            error: None,
            search: SearchState::default(),
        }
    }
}

impl EventsPanel {
    pub fn set_events(&mut self, events: Vec<EventInfo>) {
        self.events = events;
        self.error = None;
        self.clamp_scroll();
    }

    pub fn set_error(&mut self, error: String) {
        self.error = Some(error);
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn warnings_only(&self) -> bool {
        self.warnings_only
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn total(&self) -> usize {
        self.events.len()
    }

    pub fn visible_events(&self) -> Vec<&EventInfo> {
        self.events
            .iter()
            .filter(|event| !self.warnings_only || event.is_warning())
            .filter(|event| event.matches_filter(&self.search.query))
            .collect()
    }

    pub fn toggle_warnings_only(&mut self) {
        self.warnings_only = !self.warnings_only;
        self.scroll = 0;
    }

    pub fn scroll_by(&mut self, nav: Nav, page: usize) {
        self.scroll = apply_nav(self.scroll, nav, self.visible_events().len(), page);
    }

    pub fn search_changed(&mut self) {
        self.scroll = 0;
    }

    /// Plain-text rendering of the filtered events for the clipboard.
    pub fn copy_text(&self) -> Option<String> {
        let events = self.visible_events();
        if events.is_empty() {
            return None;
        }
        let lines = events
            .into_iter()
            .map(|event| {
                let seen = event
                    .last_seen
                    .map(|time| time.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                format!(
                    "{seen} {} {} x{} {}",
                    event.type_, event.reason, event.count, event.message
                )
            })
            .collect::<Vec<_>>();
        Some(lines.join("\n"))
    }

    fn clamp_scroll(&mut self) {
        let len = self.visible_events().len();
        self.scroll = self.scroll.min(len.saturating_sub(1));
    }
}
