use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Cell, Paragraph, Row, Table, Wrap};

use super::{
    ACCENT, ERROR, MUTED, PANEL, WARN, compact_text, header_style, inner_height, panel_block,
};
use crate::dashboard::logs::is_error_line;
use crate::dashboard::metrics::MetricsColumn;
use crate::dashboard::related::{LineKind, RelatedView, related_lines};
use crate::dashboard::{Dashboard, Panel, SearchState};
use crate::model::{
    NodeInfo, Severity, format_bytes, format_cpu_millicores, format_optional_bytes,
    format_optional_cpu,
};

pub(super) fn render(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let helper_rows = if dashboard.helpers().is_empty() || dashboard.is_fullscreen() {
        0
    } else {
        dashboard.helpers().len().min(3) as u16 + 2
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(helper_rows),
            Constraint::Min(4),
        ])
        .split(area);

    render_summary(frame, chunks[0], dashboard);
    if helper_rows > 0 {
        render_helpers(frame, chunks[1], dashboard);
    }

    if dashboard.is_fullscreen() {
        render_panel(frame, chunks[2], dashboard, dashboard.focus());
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[2]);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[0]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    render_panel(frame, top[0], dashboard, Panel::Logs);
    render_panel(frame, top[1], dashboard, Panel::Events);
    render_panel(frame, bottom[0], dashboard, Panel::Metrics);
    render_panel(frame, bottom[1], dashboard, Panel::Related);
}

fn render_summary(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let Some(info) = dashboard.info() else {
        let name = dashboard
            .pod()
            .map(ToString::to_string)
            .unwrap_or_default();
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(" Loading {name}…"),
                Style::default().fg(MUTED),
            )),
            area,
        );
        return;
    };

    let selected = dashboard.logs().container();
    let mut spans = vec![
        Span::styled(
            format!(" {} ", info.status),
            Style::default().fg(status_color(&info.status)).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                "ready {}  restarts {}  node {}  ",
                info.ready_label(),
                info.restarts,
                info.node.as_deref().unwrap_or("-")
            ),
            Style::default().fg(MUTED),
        ),
    ];
    let all_style = if selected.is_none() {
        Style::default().fg(Color::Black).bg(ACCENT)
    } else {
        Style::default().fg(MUTED)
    };
    spans.push(Span::styled("0:all", all_style));
    for (index, container) in info.containers.iter().enumerate() {
        let style = if selected == Some(container.name.as_str()) {
            Style::default().fg(Color::Black).bg(ACCENT)
        } else if container.ready {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(WARN)
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(format!("{}:{}", index + 1, container.name), style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_helpers(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let lines = dashboard
        .helpers()
        .iter()
        .take(3)
        .map(|helper| {
            let color = match helper.severity {
                Severity::Critical => ERROR,
                Severity::Warning => WARN,
                Severity::Info => ACCENT,
            };
            let command = helper
                .commands
                .first()
                .map(|command| format!("  $ {command}"))
                .unwrap_or_default();
            Line::from(vec![
                Span::styled(
                    format!("[{}] ", helper.severity.label()),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(helper.title.clone(), Style::default().fg(Color::White)),
                Span::styled(format!("  {}", helper.detail), Style::default().fg(MUTED)),
                Span::styled(command, Style::default().fg(Color::Rgb(125, 211, 252))),
            ])
        })
        .collect::<Vec<_>>();
    frame.render_widget(
        Paragraph::new(lines).block(panel_block("󰨮 Debug helpers", false)),
        area,
    );
}

fn render_panel(frame: &mut Frame, area: Rect, dashboard: &Dashboard, panel: Panel) {
    let focused = dashboard.focus() == panel;
    match panel {
        Panel::Logs => render_logs(frame, area, dashboard, focused),
        Panel::Events => render_events(frame, area, dashboard, focused),
        Panel::Metrics => render_metrics(frame, area, dashboard, focused),
        Panel::Related => render_related(frame, area, dashboard, focused),
    }
}

fn search_suffix(search: &SearchState) -> String {
    match (search.typing, search.query.is_empty()) {
        (true, _) => format!("  /{}▏", search.query),
        (false, false) => format!("  /{}", search.query),
        (false, true) => String::new(),
    }
}

fn render_logs(frame: &mut Frame, area: Rect, dashboard: &Dashboard, focused: bool) {
    let logs = dashboard.logs();
    let mut flags = vec![logs.container().unwrap_or("all").to_string()];
    if logs.previous() {
        flags.push("previous".to_string());
    }
    flags.push(if logs.follow() { "follow" } else { "paused" }.to_string());
    if logs.errors_only() {
        flags.push("errors".to_string());
    }
    let title = format!("󰍩 Logs [{}]{}", flags.join(" "), search_suffix(&logs.search));
    let block = panel_block(title, focused);

    if let Some(error) = logs.error()
        && logs.is_empty()
    {
        render_panel_error(frame, area, block, error);
        return;
    }
    let block = with_error_banner(block, logs.error());

    let height = inner_height(area);
    let lines = logs.visible_lines();
    let start = logs.window_start(height);
    let text = lines
        .iter()
        .skip(start)
        .take(height)
        .map(|line| {
            let style = if is_error_line(line) {
                Style::default().fg(ERROR)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(Span::styled(line.to_string(), style))
        })
        .collect::<Vec<_>>();
    let text = if text.is_empty() {
        Text::from(Span::styled("No log lines", Style::default().fg(MUTED)))
    } else {
        Text::from(text)
    };
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn render_events(frame: &mut Frame, area: Rect, dashboard: &Dashboard, focused: bool) {
    let events = dashboard.events();
    let visible = events.visible_events();
    let filter = if events.warnings_only() {
        "warnings"
    } else {
        "all"
    };
    let title = format!(
        "󱐋 Events [{filter} {}/{}]{}",
        visible.len(),
        events.total(),
        search_suffix(&events.search)
    );
    let block = panel_block(title, focused);

    if let Some(error) = events.error()
        && events.total() == 0
    {
        render_panel_error(frame, area, block, error);
        return;
    }
    let block = with_error_banner(block, events.error());

    let width = area.width.saturating_sub(2) as usize;
    let lines = visible
        .iter()
        .skip(events.scroll())
        .take(inner_height(area))
        .map(|event| {
            let color = if event.is_warning() { WARN } else { MUTED };
            let prefix = format!("{} x{} ", event.reason, event.count);
            let message_width = width.saturating_sub(prefix.chars().count()).max(8);
            Line::from(vec![
                Span::styled(prefix, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::styled(
                    compact_text(&event.message, message_width),
                    Style::default().fg(Color::White),
                ),
            ])
        })
        .collect::<Vec<_>>();
    let text = if lines.is_empty() {
        Text::from(Span::styled("No events", Style::default().fg(MUTED)))
    } else {
        Text::from(lines)
    };
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn render_metrics(frame: &mut Frame, area: Rect, dashboard: &Dashboard, focused: bool) {
    let metrics = dashboard.metrics();
    let block = panel_block("󰓅 Metrics", focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width < 20 || inner.height < 2 {
        return;
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
        .split(inner);
    let column_focus = focused.then_some(metrics.column());

    let header = Row::new(["CONTAINER", "CPU", "MEM", "RST"].map(Cell::from)).style(header_style());
    let rows = dashboard
        .info()
        .map(|info| metrics.container_rows(info))
        .unwrap_or_default()
        .into_iter()
        .skip(metrics.scroll(MetricsColumn::Containers))
        .map(|row| {
            let cpu = match (row.usage, row.cpu_percent()) {
                (Some(usage), Some(percent)) => {
                    format!("{} {percent}%", format_cpu_millicores(usage.cpu_millicores))
                }
                (Some(usage), None) => format_cpu_millicores(usage.cpu_millicores),
                (None, _) => format_optional_cpu(row.requests.cpu_millicores),
            };
            let memory = match (row.usage, row.memory_percent()) {
                (Some(usage), Some(percent)) => {
                    format!("{} {percent}%", format_bytes(usage.memory_bytes))
                }
                (Some(usage), None) => format_bytes(usage.memory_bytes),
                (None, _) => format_optional_bytes(row.requests.memory_bytes),
            };
            let pressure = row.cpu_percent().max(row.memory_percent()).unwrap_or(0);
            Row::new(vec![
                Cell::from(row.name),
                Cell::from(cpu).style(Style::default().fg(usage_color(pressure))),
                Cell::from(memory).style(Style::default().fg(usage_color(pressure))),
                Cell::from(row.restarts.to_string()),
            ])
        })
        .collect::<Vec<_>>();
    let container_title = match (metrics.error(), metrics.unavailable()) {
        (Some(error), _) => Line::from(Span::styled(
            compact_text(error, columns[0].width as usize),
            Style::default().fg(ERROR),
        )),
        (None, Some(reason)) => Line::from(Span::styled(
            compact_text(reason, columns[0].width as usize),
            Style::default().fg(WARN),
        )),
        (None, None) => Line::from(Span::styled(
            "containers",
            column_title_style(column_focus == Some(MetricsColumn::Containers)),
        )),
    };
    let split = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(columns[0]);
    frame.render_widget(Paragraph::new(container_title), split[0]);
    frame.render_widget(
        Table::new(
            rows,
            [
                Constraint::Percentage(34),
                Constraint::Percentage(28),
                Constraint::Percentage(28),
                Constraint::Percentage(10),
            ],
        )
        .header(header)
        .column_spacing(1),
        split[1],
    );

    let mut node_lines = vec![Line::from(Span::styled(
        "node",
        column_title_style(column_focus == Some(MetricsColumn::Node)),
    ))];
    match (metrics.node(), metrics.node_error()) {
        (Some(node), _) => node_lines.extend(node_lines_for(node)),
        (None, Some(error)) => node_lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(ERROR),
        ))),
        (None, None) => node_lines.push(Line::from(Span::styled(
            "Not scheduled",
            Style::default().fg(MUTED),
        ))),
    }
    frame.render_widget(
        Paragraph::new(node_lines)
            .wrap(Wrap { trim: false })
            .scroll((metrics.scroll(MetricsColumn::Node) as u16, 0)),
        columns[1],
    );
}

fn node_lines_for(node: &NodeInfo) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled(node.name.clone(), Style::default().fg(Color::White)),
        Span::styled(
            format!("  {}", node.status_label()),
            Style::default().fg(if node.ready { ACCENT } else { ERROR }),
        ),
    ])];
    if let Some(usage) = node.usage {
        lines.push(meter_line(
            "cpu",
            format!(
                "{}/{}",
                format_cpu_millicores(usage.cpu_millicores),
                format_optional_cpu(node.cpu_allocatable)
            ),
            node.cpu_allocatable
                .filter(|total| *total > 0)
                .map(|total| usage.cpu_millicores.saturating_mul(100) / total),
        ));
        lines.push(meter_line(
            "mem",
            format!(
                "{}/{}",
                format_bytes(usage.memory_bytes),
                format_optional_bytes(node.memory_allocatable)
            ),
            node.memory_allocatable
                .filter(|total| *total > 0)
                .map(|total| usage.memory_bytes.saturating_mul(100) / total),
        ));
    }
    lines.push(Line::from(Span::styled(
        format!("{}  {}", node.version, node.runtime),
        Style::default().fg(MUTED),
    )));
    for condition in node
        .conditions
        .iter()
        .filter(|condition| condition.type_ != "Ready" && condition.status == "True")
    {
        lines.push(Line::from(Span::styled(
            format!("{} {}", condition.type_, condition.reason.as_deref().unwrap_or("")),
            Style::default().fg(WARN),
        )));
    }
    for taint in &node.taints {
        lines.push(Line::from(Span::styled(
            format!("taint {taint}"),
            Style::default().fg(MUTED),
        )));
    }
    lines
}

fn meter_line(label: &str, value: String, percent: Option<u64>) -> Line<'static> {
    const WIDTH: usize = 10;
    let Some(percent) = percent else {
        return Line::from(format!("{label} {value}"));
    };
    let percent = percent.min(100);
    let mut filled = WIDTH * percent as usize / 100;
    if percent > 0 && filled == 0 {
        filled = 1;
    }
    let color = usage_color(percent);
    Line::from(vec![
        Span::styled(format!("{label} "), Style::default().fg(MUTED)),
        Span::styled(" ".repeat(filled), Style::default().bg(color)),
        Span::styled(
            " ".repeat(WIDTH - filled),
            Style::default().bg(Color::Rgb(30, 41, 59)),
        ),
        Span::styled(format!(" {percent:>3}% {value}"), Style::default().fg(Color::White)),
    ])
}

fn render_related(frame: &mut Frame, area: Rect, dashboard: &Dashboard, focused: bool) {
    let related = dashboard.related();
    let title = format!("󰌷 {}", related.view().title());
    let mut block = panel_block(title, focused);

    let text = match related.view() {
        RelatedView::Related => match (related.related(), related.error()) {
            (None, Some(error)) => {
                Text::from(Span::styled(error.to_string(), Style::default().fg(ERROR)))
            }
            (Some(resources), error) => {
                block = with_error_banner(block, error);
                let lines = related_lines(resources);
                if lines.is_empty() {
                    Text::from(Span::styled("Nothing related", Style::default().fg(MUTED)))
                } else {
                    Text::from(
                        lines
                            .into_iter()
                            .map(|(kind, text)| match kind {
                                LineKind::Heading => Line::from(Span::styled(
                                    text,
                                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                                )),
                                LineKind::Item => Line::from(format!("  {text}")),
                                LineKind::Detail => Line::from(Span::styled(
                                    format!("    {text}"),
                                    Style::default().fg(MUTED),
                                )),
                            })
                            .collect::<Vec<_>>(),
                    )
                }
            }
            (None, None) => Text::from(Span::styled("Loading…", Style::default().fg(MUTED))),
        },
        RelatedView::Manifest => match dashboard.info() {
            Some(info) => highlight_yaml_text(&info.manifest),
            None => Text::from(""),
        },
        RelatedView::Describe => match related.describe() {
            Some(Ok(output)) => Text::from(output.clone()),
            Some(Err(error)) => {
                Text::from(Span::styled(error.clone(), Style::default().fg(ERROR)))
            }
            None => Text::from(Span::styled("Describing…", Style::default().fg(MUTED))),
        },
    };

    frame.render_widget(
        Paragraph::new(text)
            .block(block)
            .style(Style::default().bg(PANEL))
            .scroll((related.scroll() as u16, 0)),
        area,
    );
}

fn render_panel_error(frame: &mut Frame, area: Rect, block: Block<'static>, error: &str) {
    frame.render_widget(
        Paragraph::new(error.to_string())
            .style(Style::default().fg(ERROR))
            .wrap(Wrap { trim: false })
            .block(block),
        area,
    );
}

/// Last refresh failed but older data is still on screen.
fn with_error_banner(block: Block<'static>, error: Option<&str>) -> Block<'static> {
    match error {
        Some(error) => block.title_bottom(Line::from(Span::styled(
            format!(" {error} "),
            Style::default().fg(ERROR),
        ))),
        None => block,
    }
}

fn column_title_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(MUTED)
    }
}

fn status_color(status: &str) -> Color {
    match status {
        "Running" | "Succeeded" | "Completed" => ACCENT,
        "Pending" | "ContainerCreating" | "Terminating" => WARN,
        _ => ERROR,
    }
}

fn usage_color(percent: u64) -> Color {
    if percent >= 90 {
        ERROR
    } else if percent >= 70 {
        WARN
    } else {
        ACCENT
    }
}

fn highlight_yaml_text(input: &str) -> Text<'static> {
    Text::from(input.lines().map(highlight_yaml_line).collect::<Vec<_>>())
}

fn highlight_yaml_line(line: &str) -> Line<'static> {
    let indent_len = line
        .as_bytes()
        .iter()
        .take_while(|byte| **byte == b' ')
        .count();
    let (indent, trimmed) = line.split_at(indent_len);
    let mut spans = vec![Span::raw(indent.to_string())];

    let content = match trimmed.strip_prefix("- ") {
        Some(rest) => {
            spans.push(Span::styled("- ", Style::default().fg(ACCENT)));
            rest
        }
        None => trimmed,
    };
    match content.split_once(':') {
        Some((key, value)) if !key.is_empty() && !key.contains(' ') => {
            spans.push(Span::styled(
                key.to_string(),
                Style::default().fg(Color::Rgb(103, 232, 249)),
            ));
            spans.push(Span::styled(":", Style::default().fg(MUTED)));
            if !value.trim().is_empty() {
                spans.push(Span::styled(
                    value.to_string(),
                    Style::default().fg(Color::Rgb(147, 197, 253)),
                ));
            }
        }
        _ => spans.push(Span::styled(
            content.to_string(),
            Style::default().fg(Color::White),
        )),
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::{highlight_yaml_line, meter_line, render_events};
    use crate::dashboard::Dashboard;
    use crate::error::RepoError;
    use crate::message::DashboardSnapshot;
    use crate::model::{EventInfo, PodInfo, PodRef, RelatedResources};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn snapshot(events: Result<Vec<EventInfo>, RepoError>) -> DashboardSnapshot {
        DashboardSnapshot {
            pod: PodInfo::default(),
            logs: Ok(String::new()),
            events,
            metrics: Ok(None),
            related: Ok(RelatedResources::default()),
            node: None,
            helpers: Vec::new(),
        }
    }

    #[test]
    fn events_stay_visible_under_refresh_error() {
        let mut dashboard = Dashboard::default();
        dashboard.open(PodRef {
            namespace: "prod".to_string(),
            name: "api-0".to_string(),
        });
        dashboard.apply_snapshot(
            snapshot(Ok(vec![EventInfo {
                type_: "Warning".to_string(),
                reason: "BackOff".to_string(),
                message: "restarting".to_string(),
                count: 1,
                ..EventInfo::default()
            }])),
            true,
        );
        dashboard.apply_snapshot(
            snapshot(Err(RepoError::Transient("events timed out".to_string()))),
            true,
        );

        let mut terminal = Terminal::new(TestBackend::new(60, 8)).expect("terminal");
        terminal
            .draw(|frame| render_events(frame, frame.area(), &dashboard, true))
            .expect("draw");
        let text = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert!(text.contains("BackOff"));
        assert!(text.contains("events timed out"));
    }

    #[test]
    fn yaml_keys_are_split_from_values() {
        let line = highlight_yaml_line("  image: nginx:1.27");
        let contents = line
            .spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect::<Vec<_>>();
        assert_eq!(contents, vec!["  ", "image", ":", " nginx:1.27"]);
    }

    #[test]
    fn meter_marks_small_usage() {
        let line = meter_line("cpu", "5m/4.00c".to_string(), Some(1));
        assert_eq!(line.spans[1].content.chars().count(), 1);
    }
}
