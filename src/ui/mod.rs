mod dashboard;
mod navigator;
mod overlay;

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::app::{App, View};
use crate::navigator::Mode;

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);
const PL_D: Color = Color::Rgb(82, 24, 124);
const SELECTED: Color = Color::Rgb(24, 36, 58);
const HIGHLIGHT_SYMBOL: &str = "󰜴 ";

pub fn render(frame: &mut Frame, app: &App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    if let Some(error) = app.fatal_error() {
        render_error_screen(frame, root[1], error);
    } else {
        match app.view() {
            View::Navigator => navigator::render(frame, root[1], app),
            View::Dashboard => dashboard::render(frame, root[1], app.dashboard()),
        }
    }
    render_footer(frame, root[2], app);

    overlay::render(frame, app.overlays());
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, " 󱃾 kubedeck ", Color::Black, ACCENT, PL_A);
    let context = if app.context().is_empty() {
        "-"
    } else {
        app.context()
    };
    push_powerline_segment(
        &mut spans,
        format!(" 󰠳 {} ", compact_text(context, 24)),
        Color::White,
        PL_A,
        PL_B,
    );
    let namespace = app.namespace().unwrap_or("-");
    push_powerline_segment(
        &mut spans,
        format!(" 󰉖 {} ", compact_text(namespace, 24)),
        Color::White,
        PL_B,
        PL_C,
    );
    push_powerline_segment(
        &mut spans,
        format!(" {} ", compact_text(&location_label(app), 48)),
        Color::White,
        PL_C,
        BG,
    );

    let left = Line::from(spans);
    let cluster = display_cluster_endpoint(app.cluster());
    if cluster.is_empty() || area.width < 60 {
        frame.render_widget(Paragraph::new(left).style(Style::default().bg(BG)), area);
        return;
    }

    let right = Line::from(vec![Span::styled(
        format!("{} ", compact_text(&cluster, 40)),
        Style::default().fg(MUTED),
    )]);
    let right_width = (spans_width(&right.spans) as u16).min(area.width / 2);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(Paragraph::new(left).style(Style::default().bg(BG)), chunks[0]);
    frame.render_widget(
        Paragraph::new(right)
            .style(Style::default().bg(BG))
            .alignment(Alignment::Right),
        chunks[1],
    );
}

fn location_label(app: &App) -> String {
    if app.view() == View::Dashboard {
        return match app.dashboard().pod() {
            Some(pod) => format!("󰋊 {}", pod.name),
            None => "󰋊 pod".to_string(),
        };
    }
    let navigator = app.navigator();
    match navigator.mode() {
        Mode::Namespace => "namespaces".to_string(),
        Mode::ResourceType => "resource types".to_string(),
        Mode::Workloads => navigator.resource_type().title().to_ascii_lowercase(),
        Mode::Resources => match (app.node_context(), app.workload_context()) {
            (Some(node), _) => format!("󰣇 {node}"),
            (None, Some(workload)) => format!("{} {}", workload.kind.title(), workload.name),
            (None, None) => "resources".to_string(),
        },
    }
}

fn render_error_screen(frame: &mut Frame, area: Rect, error: &str) {
    let lines = vec![
        Line::from(Span::styled(
            "Could not reach the cluster",
            Style::default().fg(ERROR).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(error.to_string(), Style::default().fg(Color::White))),
        Line::from(""),
        Line::from(Span::styled(
            "r retry   q quit",
            Style::default().fg(MUTED),
        )),
    ];
    let panel = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Error")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ERROR))
                .style(Style::default().bg(PANEL)),
        );
    frame.render_widget(panel, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    let (status_text, status_bg, status_fg) = match app.status() {
        Some(status) if status.error => (status.text.clone(), ERROR, Color::Black),
        Some(status) => (status.text.clone(), PL_B, Color::White),
        None if app.is_initial_loading() => ("Loading cluster…".to_string(), PL_B, Color::White),
        None => (footer_hint(app).to_string(), PL_D, Color::White),
    };

    let (mode_label, mode_bg) = if input_active(app) {
        (" 󰈲 flt ", WARN)
    } else {
        (" 󰘳 nrm ", PL_A)
    };
    let mode_fg = if input_active(app) {
        Color::Black
    } else {
        Color::White
    };
    push_powerline_segment(&mut spans, mode_label, mode_fg, mode_bg, status_bg);
    let width_hint = area.width.saturating_sub(24).min(160) as usize;
    push_powerline_segment(
        &mut spans,
        format!(
            " {} {} ",
            footer_status_icon(&status_text),
            compact_text(&status_text, width_hint.max(24))
        ),
        status_fg,
        status_bg,
        BG,
    );

    let forwards = app.port_forwards();
    if forwards.is_empty() || area.width < 60 {
        frame.render_widget(Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)), area);
        return;
    }

    let right = Line::from(Span::styled(
        format!(" 󰌘 {} forward{} ", forwards.len(), if forwards.len() == 1 { "" } else { "s" }),
        Style::default().fg(ACCENT),
    ));
    let right_width = spans_width(&right.spans) as u16;
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(right)
            .style(Style::default().bg(BG))
            .alignment(Alignment::Right),
        chunks[1],
    );
}

fn input_active(app: &App) -> bool {
    match app.view() {
        View::Navigator => app.navigator().is_searching() || app.navigator().is_node_searching(),
        View::Dashboard => app.dashboard().is_searching(),
    }
}

fn footer_hint(app: &App) -> &'static str {
    match (app.view(), app.navigator().mode()) {
        (View::Dashboard, _) => "Tab panel  1-9 container  P previous  / search  F fullscreen  ? help",
        (View::Navigator, Mode::Namespace) => "Enter select  Tab nodes  / search  ? help",
        (View::Navigator, Mode::ResourceType) => "Enter select  Esc back  ? help",
        (View::Navigator, Mode::Workloads) => "Enter pods  a actions  s/d scale  R restart  t type  ? help",
        (View::Navigator, Mode::Resources) => "Enter open  Tab section  d delete  / search  ? help",
    }
}

fn footer_status_icon(status_text: &str) -> &'static str {
    let status = status_text.to_ascii_lowercase();
    let has_failure = [
        "failed",
        "error",
        "timed out",
        "timeout",
        "unreachable",
        "refused",
        "forbidden",
        "denied",
    ]
    .iter()
    .any(|needle| status.contains(needle));
    if has_failure { "󰅚" } else { "󰄬" }
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|span| span.content.chars().count()).sum()
}

fn panel_block(title: impl Into<String>, focused: bool) -> Block<'static> {
    Block::default()
        .title(title.into())
        .borders(Borders::ALL)
        .border_style(if focused {
            Style::default().fg(ACCENT)
        } else {
            Style::default().fg(MUTED)
        })
        .style(Style::default().bg(PANEL))
}

fn row_highlight_style() -> Style {
    Style::default().bg(SELECTED).add_modifier(Modifier::BOLD)
}

fn header_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn display_cluster_endpoint(cluster: &str) -> String {
    let trimmed = cluster.trim().trim_end_matches('/');
    trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed)
        .to_string()
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Rows available inside a bordered table with a header line.
fn table_rows_visible(area: Rect) -> usize {
    area.height.saturating_sub(3).max(1) as usize
}

fn inner_height(area: Rect) -> usize {
    area.height.saturating_sub(2).max(1) as usize
}
