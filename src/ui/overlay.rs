use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap};

use super::{
    ACCENT, ERROR, HIGHLIGHT_SYMBOL, MUTED, PANEL, WARN, centered_rect, compact_text, header_style,
    panel_block, row_highlight_style, table_rows_visible,
};
use crate::overlay::action_menu::ActionMenu;
use crate::overlay::confirm::ConfirmDialog;
use crate::overlay::help::{HELP_SECTIONS, HelpOverlay};
use crate::overlay::viewer::{VIEWER_ACTIONS, ValueViewer, ViewerState};
use crate::overlay::{Overlay, Overlays};

pub(super) fn render(frame: &mut Frame, overlays: &Overlays) {
    if let Some(viewer) = overlays.visible_viewer() {
        render_viewer(frame, viewer);
    }
    if overlays.action_menu.is_visible() {
        render_action_menu(frame, &overlays.action_menu);
    }
    if overlays.help.is_visible() {
        render_help(frame, &overlays.help);
    }
    if overlays.confirm.is_visible() {
        render_confirm(frame, &overlays.confirm);
    }
}

fn render_confirm(frame: &mut Frame, dialog: &ConfirmDialog) {
    let area = centered_rect(56, 24, frame.area());
    frame.render_widget(Clear, area);

    let button = |label: &'static str, active: bool, color: Color| {
        if active {
            Span::styled(
                format!(" {label} "),
                Style::default().fg(Color::Black).bg(color).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(format!(" {label} "), Style::default().fg(MUTED))
        }
    };
    let lines = vec![
        Line::from(Span::styled(
            dialog.prompt().to_string(),
            Style::default().fg(Color::White),
        )),
        Line::from(""),
        Line::from(vec![
            button("Yes", dialog.yes_selected(), WARN),
            Span::raw("   "),
            button("No", !dialog.yes_selected(), ACCENT),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "y/n  h/l  Enter",
            Style::default().fg(MUTED),
        )),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(
                panel_block("Confirm", true).border_style(Style::default().fg(WARN)),
            ),
        area,
    );
}

fn render_action_menu(frame: &mut Frame, menu: &ActionMenu) {
    let area = centered_rect(64, 50, frame.area());
    frame.render_widget(Clear, area);
    let items = menu
        .items()
        .iter()
        .map(|item| ListItem::new(item.label.clone()))
        .collect::<Vec<_>>();
    let list = List::new(items)
        .block(panel_block(menu.title().to_string(), true))
        .style(Style::default().fg(Color::White))
        .highlight_style(row_highlight_style())
        .highlight_symbol(HIGHLIGHT_SYMBOL);
    let mut state = ListState::default();
    state.select((!menu.items().is_empty()).then_some(menu.cursor()));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_help(frame: &mut Frame, help: &HelpOverlay) {
    let area = centered_rect(70, 76, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = Vec::new();
    for (section, entries) in HELP_SECTIONS {
        lines.push(Line::from(Span::styled(
            section.to_string(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )));
        for (keys, description) in entries.iter() {
            lines.push(Line::from(vec![
                Span::styled(format!("  {keys:<18}"), Style::default().fg(WARN)),
                Span::styled(description.to_string(), Style::default().fg(Color::White)),
            ]));
        }
        lines.push(Line::from(""));
    }

    frame.render_widget(
        Paragraph::new(lines)
            .scroll((help.scroll() as u16, 0))
            .block(panel_block("Help", true)),
        area,
    );
}

fn render_viewer(frame: &mut Frame, viewer: &ValueViewer) {
    let area = centered_rect(84, 80, frame.area());
    frame.render_widget(Clear, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    let title = format!(
        "{} {}/{}",
        viewer.kind().title(),
        viewer.namespace(),
        viewer.name()
    );
    let block = panel_block(title, true);

    if viewer.is_loading() {
        frame.render_widget(
            Paragraph::new(Span::styled("Loading…", Style::default().fg(MUTED))).block(block),
            chunks[0],
        );
    } else if let Some(error) = viewer.error() {
        frame.render_widget(
            Paragraph::new(error.to_string())
                .style(Style::default().fg(ERROR))
                .wrap(Wrap { trim: false })
                .block(block),
            chunks[0],
        );
    } else {
        render_entries(frame, chunks[0], viewer, block);
    }

    match viewer.state() {
        ViewerState::Normal => {}
        ViewerState::Action => render_viewer_actions(frame, area, viewer),
        ViewerState::NamespaceSelector => render_namespace_selector(frame, area, viewer),
    }

    let footer = match viewer.status() {
        Some(status) => Span::styled(
            format!(" {}", compact_text(status, chunks[1].width as usize)),
            Style::default().fg(Color::Black).bg(ACCENT),
        ),
        None => Span::styled(
            " Enter copy value   a copy to namespace   Esc close",
            Style::default().fg(MUTED),
        ),
    };
    frame.render_widget(
        Paragraph::new(Line::from(footer)).style(Style::default().bg(PANEL)),
        chunks[1],
    );
}

fn render_entries(
    frame: &mut Frame,
    area: Rect,
    viewer: &ValueViewer,
    block: ratatui::widgets::Block<'static>,
) {
    let detail_headers = viewer
        .entries()
        .first()
        .map(|entry| entry.details.iter().map(|(label, _)| *label).collect::<Vec<_>>())
        .unwrap_or_default();
    let mut headers = vec!["KEY"];
    headers.extend(detail_headers.iter().map(|label| match *label {
        "username" => "USERNAME",
        "email" => "EMAIL",
        other => other,
    }));
    headers.push("VALUE");

    let value_width = area.width.saturating_sub(4) as usize / 2;
    let rows = viewer
        .entries()
        .iter()
        .map(|entry| {
            let mut cells = vec![Cell::from(entry.key.clone())];
            cells.extend(entry.details.iter().map(|(_, value)| Cell::from(value.clone())));
            let first_line = entry.value.lines().next().unwrap_or_default();
            cells.push(Cell::from(compact_text(first_line, value_width.max(8))));
            Row::new(cells)
        })
        .collect::<Vec<_>>();

    let columns = headers.len() as u16;
    let mut widths = vec![Constraint::Percentage(30)];
    for _ in 2..columns {
        widths.push(Constraint::Percentage(20));
    }
    widths.push(Constraint::Fill(1));

    let table = Table::new(rows, widths)
        .header(Row::new(headers).style(header_style()))
        .block(block)
        .column_spacing(1)
        .row_highlight_style(row_highlight_style())
        .highlight_symbol(HIGHLIGHT_SYMBOL);
    let mut state = TableState::default();
    state.select((!viewer.entries().is_empty()).then_some(viewer.cursor()));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_viewer_actions(frame: &mut Frame, parent: Rect, viewer: &ValueViewer) {
    let area = centered_rect(50, 30, parent);
    frame.render_widget(Clear, area);
    let list = List::new(VIEWER_ACTIONS.map(ListItem::new))
        .block(panel_block("Actions", true))
        .highlight_style(row_highlight_style())
        .highlight_symbol(HIGHLIGHT_SYMBOL);
    let mut state = ListState::default();
    state.select(Some(viewer.action_cursor()));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_namespace_selector(frame: &mut Frame, parent: Rect, viewer: &ValueViewer) {
    let area = centered_rect(50, 60, parent);
    frame.render_widget(Clear, area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(" filter: ", Style::default().fg(MUTED)),
            Span::styled(format!("{}▏", viewer.filter()), Style::default().fg(WARN)),
        ]))
        .style(Style::default().bg(PANEL)),
        chunks[0],
    );

    let namespaces = viewer.visible_namespaces();
    let rows = table_rows_visible(chunks[1]);
    let items = namespaces
        .iter()
        .map(|namespace| {
            let style = if *namespace == viewer.namespace() {
                Style::default().fg(MUTED)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(namespace.to_string()).style(style)
        })
        .collect::<Vec<_>>();
    let title = format!("Copy to namespace ({})", namespaces.len());
    let list = List::new(items)
        .block(panel_block(title, true))
        .highlight_style(row_highlight_style())
        .highlight_symbol(HIGHLIGHT_SYMBOL);
    let mut state = ListState::default().with_offset(
        viewer
            .namespace_cursor()
            .saturating_sub(rows.saturating_sub(1)),
    );
    state.select((!namespaces.is_empty()).then_some(viewer.namespace_cursor()));
    frame.render_stateful_widget(list, chunks[1], &mut state);
}
