use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Chords the session controller handles before any widget sees the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    ToggleHelp,
    Refresh,
    NamespaceMode,
    ResourceTypeMode,
    NextPanel,
    PrevPanel,
    Back,
    Enter,
    OpenActionMenu,
    Restart,
    ScaleUp,
    ScaleDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInput {
    Char(char),
    Backspace,
    Submit,
    Cancel,
}

pub fn is_quit_chord(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('c')) && key.modifiers.contains(KeyModifiers::CONTROL)
}

pub fn map_global(key: KeyEvent) -> Option<Action> {
    if is_quit_chord(key) {
        return Some(Action::Quit);
    }
    if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
        return None;
    }

    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        KeyCode::Char('r') | KeyCode::F(5) => Some(Action::Refresh),
        KeyCode::Char('n') => Some(Action::NamespaceMode),
        KeyCode::Char('t') => Some(Action::ResourceTypeMode),
        KeyCode::Tab => Some(Action::NextPanel),
        KeyCode::BackTab => Some(Action::PrevPanel),
        KeyCode::Esc => Some(Action::Back),
        KeyCode::Enter => Some(Action::Enter),
        KeyCode::Char('a') => Some(Action::OpenActionMenu),
        KeyCode::Char('R') => Some(Action::Restart),
        KeyCode::Char('s') => Some(Action::ScaleUp),
        KeyCode::Char('d') => Some(Action::ScaleDown),
        _ => None,
    }
}

pub fn map_navigation(key: KeyEvent) -> Option<Nav> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('d') => Some(Nav::PageDown),
            KeyCode::Char('u') => Some(Nav::PageUp),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Nav::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Nav::Down),
        KeyCode::Left | KeyCode::Char('h') => Some(Nav::Left),
        KeyCode::Right | KeyCode::Char('l') => Some(Nav::Right),
        KeyCode::PageUp => Some(Nav::PageUp),
        KeyCode::PageDown => Some(Nav::PageDown),
        KeyCode::Home | KeyCode::Char('g') => Some(Nav::Top),
        KeyCode::End | KeyCode::Char('G') => Some(Nav::Bottom),
        _ => None,
    }
}

pub fn map_text_input(key: KeyEvent) -> Option<TextInput> {
    match key.code {
        KeyCode::Esc => Some(TextInput::Cancel),
        KeyCode::Enter | KeyCode::Tab => Some(TextInput::Submit),
        KeyCode::Char('m') | KeyCode::Char('j')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            Some(TextInput::Submit)
        }
        KeyCode::Backspace => Some(TextInput::Backspace),
        KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            Some(TextInput::Char(c))
        }
        _ => None,
    }
}

/// Digit keys `1..=9` and `0`, used for container selection.
pub fn digit(key: KeyEvent) -> Option<usize> {
    match key.code {
        KeyCode::Char(c) if key.modifiers.is_empty() && c.is_ascii_digit() => {
            c.to_digit(10).map(|value| value as usize)
        }
        _ => None,
    }
}

/// Moves a cursor by `delta` within `len` items.
pub fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let max = len.saturating_sub(1) as isize;
    (current as isize + delta).clamp(0, max) as usize
}

/// Applies a navigation key to a plain list cursor.
pub fn apply_nav(current: usize, nav: Nav, len: usize, page: usize) -> usize {
    let page = page.max(1) as isize;
    match nav {
        Nav::Up => step(current, -1, len),
        Nav::Down => step(current, 1, len),
        Nav::PageUp => step(current, -page, len),
        Nav::PageDown => step(current, page, len),
        Nav::Top => 0,
        Nav::Bottom => len.saturating_sub(1),
        Nav::Left | Nav::Right => current.min(len.saturating_sub(1)),
    }
}
