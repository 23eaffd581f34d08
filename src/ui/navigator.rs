use chrono::Utc;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Cell, Paragraph, Row, Table, TableState};

use super::{
    ACCENT, ERROR, HIGHLIGHT_SYMBOL, MUTED, WARN, header_style, panel_block, row_highlight_style,
    table_rows_visible,
};
use crate::app::App;
use crate::model::{format_age, format_optional_bytes, format_optional_cpu};
use crate::navigator::{Mode, NamespaceFocus, Navigator, Section, viewport};

pub(super) fn render(frame: &mut Frame, area: Rect, app: &App) {
    let navigator = app.navigator();
    let (body, search) = split_search_line(area, navigator);
    match navigator.mode() {
        Mode::Namespace => render_namespaces(frame, body, navigator),
        Mode::ResourceType => render_resource_types(frame, body, navigator),
        Mode::Workloads => render_workloads(frame, body, navigator),
        Mode::Resources => render_resources(frame, body, navigator),
    }
    if let Some(search) = search {
        render_search_line(frame, search, navigator);
    }
}

fn split_search_line(area: Rect, navigator: &Navigator) -> (Rect, Option<Rect>) {
    if !navigator.is_searching() && !navigator.has_filter() && !navigator.is_node_searching() {
        return (area, None);
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    (chunks[0], Some(chunks[1]))
}

fn render_search_line(frame: &mut Frame, area: Rect, navigator: &Navigator) {
    let (prefix, query, typing) = if navigator.is_node_searching() {
        ("nodes /", navigator.node_query(), true)
    } else {
        ("/", navigator.query(), navigator.is_searching())
    };
    let cursor = if typing { "▏" } else { "" };
    let line = Line::from(vec![
        Span::styled(format!(" {prefix}"), Style::default().fg(WARN)),
        Span::styled(format!("{query}{cursor}"), Style::default().fg(Color::White)),
        Span::styled("  Esc clears", Style::default().fg(MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn table<'a>(
    headers: &[&'static str],
    rows: Vec<Row<'a>>,
    widths: Vec<Constraint>,
    title: String,
    focused: bool,
) -> Table<'a> {
    let header = Row::new(headers.iter().map(|header| Cell::from(*header)))
        .height(1)
        .style(header_style());
    Table::new(rows, widths)
        .header(header)
        .block(panel_block(title, focused))
        .column_spacing(1)
        .row_highlight_style(row_highlight_style())
        .highlight_symbol(HIGHLIGHT_SYMBOL)
}

/// Draws `table` with the selected row centred once `len` rows outgrow the pane.
fn render_table(
    frame: &mut Frame,
    area: Rect,
    table: Table<'_>,
    selected: Option<usize>,
    len: usize,
) {
    let mut state = TableState::default();
    if let Some(cursor) = selected {
        *state.offset_mut() = viewport(cursor, len, table_rows_visible(area)).start;
    }
    state.select(selected);
    frame.render_stateful_widget(table, area, &mut state);
}

fn phase_style(phase: &str) -> Style {
    match phase {
        "Active" | "Running" | "Succeeded" | "Completed" | "Available" | "Ready" => {
            Style::default().fg(ACCENT)
        }
        "Pending" | "Terminating" | "Progressing" | "ContainerCreating" => {
            Style::default().fg(WARN)
        }
        _ if phase.contains("Err") || phase.contains("BackOff") || phase == "Failed" => {
            Style::default().fg(ERROR)
        }
        _ => Style::default().fg(Color::White),
    }
}

fn render_namespaces(frame: &mut Frame, area: Rect, navigator: &Navigator) {
    let now = Utc::now();
    let namespaces = navigator.visible_namespaces();
    let focus = navigator.namespace_focus();
    let (namespace_area, node_area) = if navigator.has_nodes() {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(area);
        (chunks[0], Some(chunks[1]))
    } else {
        (area, None)
    };

    let rows = namespaces
        .iter()
        .map(|namespace| {
            Row::new(vec![
                Cell::from(namespace.name.clone()),
                Cell::from(namespace.phase.clone()).style(phase_style(&namespace.phase)),
                Cell::from(format_age(namespace.created, now)),
            ])
        })
        .collect();
    let title = format!("󰉖 Namespaces ({})", namespaces.len());
    render_table(
        frame,
        namespace_area,
        table(
            &["NAME", "STATUS", "AGE"],
            rows,
            vec![
                Constraint::Percentage(60),
                Constraint::Percentage(25),
                Constraint::Percentage(15),
            ],
            title,
            focus == NamespaceFocus::Namespaces,
        ),
        (!namespaces.is_empty()).then(|| navigator.cursor()),
        namespaces.len(),
    );

    let Some(node_area) = node_area else {
        return;
    };
    let nodes = navigator.visible_nodes();
    let rows = nodes
        .iter()
        .map(|node| {
            let status = node.status_label();
            let usage = node.usage.map(|usage| {
                (
                    format_optional_cpu(Some(usage.cpu_millicores)),
                    format_optional_bytes(Some(usage.memory_bytes)),
                )
            });
            let (cpu, memory) = usage.unwrap_or_else(|| ("-".to_string(), "-".to_string()));
            Row::new(vec![
                Cell::from(node.name.clone()),
                Cell::from(status).style(phase_style(status)),
                Cell::from(node.roles.clone()),
                Cell::from(cpu),
                Cell::from(memory),
                Cell::from(node.version.clone()),
            ])
        })
        .collect();
    let title = format!("󰣇 Nodes ({})", nodes.len());
    render_table(
        frame,
        node_area,
        table(
            &["NAME", "STATUS", "ROLES", "CPU", "MEM", "VERSION"],
            rows,
            vec![
                Constraint::Percentage(30),
                Constraint::Percentage(14),
                Constraint::Percentage(16),
                Constraint::Percentage(10),
                Constraint::Percentage(12),
                Constraint::Percentage(18),
            ],
            title,
            focus == NamespaceFocus::Nodes,
        ),
        (!nodes.is_empty()).then(|| navigator.node_cursor()),
        nodes.len(),
    );
}

fn render_resource_types(frame: &mut Frame, area: Rect, navigator: &Navigator) {
    let kinds = navigator.visible_resource_types();
    let rows = kinds
        .iter()
        .map(|kind| {
            let marker = if *kind == navigator.resource_type() {
                "●"
            } else {
                " "
            };
            Row::new(vec![
                Cell::from(marker).style(Style::default().fg(ACCENT)),
                Cell::from(kind.title()),
                Cell::from(kind.description()).style(Style::default().fg(MUTED)),
            ])
        })
        .collect();
    render_table(
        frame,
        area,
        table(
            &["", "TYPE", "DESCRIPTION"],
            rows,
            vec![
                Constraint::Length(2),
                Constraint::Percentage(25),
                Constraint::Percentage(70),
            ],
            "󰙨 Resource types".to_string(),
            true,
        ),
        (!kinds.is_empty()).then(|| navigator.cursor()),
        kinds.len(),
    );
}

fn render_workloads(frame: &mut Frame, area: Rect, navigator: &Navigator) {
    let now = Utc::now();
    let workloads = navigator.visible_workloads();
    let rows = workloads
        .iter()
        .map(|workload| {
            Row::new(vec![
                Cell::from(workload.name.clone()),
                Cell::from(workload.ready.clone()),
                Cell::from(workload.status.clone()).style(phase_style(&workload.status)),
                Cell::from(format_age(workload.created, now)),
            ])
        })
        .collect();
    let title = format!(
        "{} ({})",
        navigator.resource_type().title(),
        workloads.len()
    );
    render_table(
        frame,
        area,
        table(
            &["NAME", "READY", "STATUS", "AGE"],
            rows,
            vec![
                Constraint::Percentage(50),
                Constraint::Percentage(15),
                Constraint::Percentage(25),
                Constraint::Percentage(10),
            ],
            title,
            true,
        ),
        (!workloads.is_empty()).then(|| navigator.cursor()),
        workloads.len(),
    );
}

fn render_resources(frame: &mut Frame, area: Rect, navigator: &Navigator) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
        ])
        .split(area);

    for (section, chunk) in Section::ALL.into_iter().zip(chunks.iter()) {
        let focused = navigator.section() == section;
        let selected = (focused && navigator.section_len(section) > 0)
            .then(|| navigator.section_cursor(section));
        match section {
            Section::Pods => render_pods(frame, *chunk, navigator, focused, selected),
            Section::ConfigMaps => {
                render_config_maps(frame, *chunk, navigator, focused, selected)
            }
            Section::Secrets | Section::DockerSecrets => render_secrets(
                frame,
                *chunk,
                navigator,
                section,
                focused,
                selected,
            ),
        }
    }
}

fn render_pods(
    frame: &mut Frame,
    area: Rect,
    navigator: &Navigator,
    focused: bool,
    selected: Option<usize>,
) {
    if let Some(hint) = navigator.scale_hint()
        && navigator.pods().is_empty()
    {
        let lines = vec![
            Line::from(Span::styled(
                format!(
                    "{} {} has no pods (replicas: {})",
                    hint.workload.kind.title(),
                    hint.workload.name,
                    hint.replicas
                ),
                Style::default().fg(WARN).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "s scale up   d scale down",
                Style::default().fg(MUTED),
            )),
        ];
        frame.render_widget(
            Paragraph::new(lines).block(panel_block("Pods (0)", focused)),
            area,
        );
        return;
    }

    let now = Utc::now();
    let pods = navigator.visible_pods();
    let rows = pods
        .iter()
        .map(|pod| {
            Row::new(vec![
                Cell::from(pod.name.clone()),
                Cell::from(pod.ready_label()),
                Cell::from(pod.status.clone()).style(phase_style(&pod.status)),
                Cell::from(pod.restarts.to_string()),
                Cell::from(pod.node.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(format_age(pod.created, now)),
            ])
        })
        .collect();
    render_table(
        frame,
        area,
        table(
            &["NAME", "READY", "STATUS", "RESTARTS", "NODE", "AGE"],
            rows,
            vec![
                Constraint::Percentage(34),
                Constraint::Percentage(8),
                Constraint::Percentage(18),
                Constraint::Percentage(10),
                Constraint::Percentage(22),
                Constraint::Percentage(8),
            ],
            format!("{} ({})", Section::Pods.title(), pods.len()),
            focused,
        ),
        selected,
        pods.len(),
    );
}

fn render_config_maps(
    frame: &mut Frame,
    area: Rect,
    navigator: &Navigator,
    focused: bool,
    selected: Option<usize>,
) {
    let now = Utc::now();
    let config_maps = navigator.visible_config_maps();
    let rows = config_maps
        .iter()
        .map(|config_map| {
            Row::new(vec![
                Cell::from(config_map.name.clone()),
                Cell::from(config_map.keys.to_string()),
                Cell::from(format_age(config_map.created, now)),
            ])
        })
        .collect();
    render_table(
        frame,
        area,
        table(
            &["NAME", "KEYS", "AGE"],
            rows,
            vec![
                Constraint::Percentage(70),
                Constraint::Percentage(15),
                Constraint::Percentage(15),
            ],
            format!("{} ({})", Section::ConfigMaps.title(), config_maps.len()),
            focused,
        ),
        selected,
        config_maps.len(),
    );
}

fn render_secrets(
    frame: &mut Frame,
    area: Rect,
    navigator: &Navigator,
    section: Section,
    focused: bool,
    selected: Option<usize>,
) {
    let now = Utc::now();
    let secrets = navigator.visible_secrets(section == Section::DockerSecrets);
    let rows = secrets
        .iter()
        .map(|secret| {
            Row::new(vec![
                Cell::from(secret.name.clone()),
                Cell::from(secret.type_.clone()).style(Style::default().fg(MUTED)),
                Cell::from(secret.keys.to_string()),
                Cell::from(format_age(secret.created, now)),
            ])
        })
        .collect();
    render_table(
        frame,
        area,
        table(
            &["NAME", "TYPE", "KEYS", "AGE"],
            rows,
            vec![
                Constraint::Percentage(45),
                Constraint::Percentage(35),
                Constraint::Percentage(10),
                Constraint::Percentage(10),
            ],
            format!("{} ({})", section.title(), secrets.len()),
            focused,
        ),
        selected,
        secrets.len(),
    );
}

#[cfg(test)]
mod tests {
    use super::render_workloads;
    use crate::model::{ResourceType, WorkloadInfo};
    use crate::navigator::{Mode, Navigator};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn workload(index: usize) -> WorkloadInfo {
        WorkloadInfo {
            namespace: "prod".to_string(),
            name: format!("deploy-{index:02}"),
            kind: ResourceType::Deployments,
            ready: "1/1".to_string(),
            status: "Available".to_string(),
            replicas: Some(1),
            ready_replicas: 1,
            selector: Default::default(),
            created: None,
        }
    }

    #[test]
    fn long_lists_keep_the_cursor_centred() {
        let mut navigator = Navigator::new(Mode::Workloads, ResourceType::Deployments);
        navigator.set_workloads((0..40).map(workload).collect());
        for _ in 0..20 {
            navigator.handle_key(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE));
        }
        assert_eq!(navigator.cursor(), 20);

        // 13 rows leave 10 for data below the border and header.
        let mut terminal = Terminal::new(TestBackend::new(80, 13)).expect("terminal");
        terminal
            .draw(|frame| render_workloads(frame, frame.area(), &navigator))
            .expect("draw");
        let text = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert!(text.contains("deploy-15"));
        assert!(text.contains("deploy-24"));
        assert!(!text.contains("deploy-14"));
        assert!(!text.contains("deploy-25"));
    }
}
