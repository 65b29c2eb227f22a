//! Frame layout and widgets for the browser.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, Paragraph},
    Frame,
};

use super::app::App;
use crate::host::{ListingView, Severity};

const ACCENT: Color = Color::Cyan;
const MARK_GUTTER: &str = "* ";
const PLAIN_GUTTER: &str = "  ";

struct LayoutAreas {
    listing: Rect,
    transfer: Option<Rect>,
    status: Rect,
}

fn calculate_layout(area: Rect, show_transfer: bool) -> LayoutAreas {
    let constraints: Vec<Constraint> = if show_transfer {
        vec![
            Constraint::Min(5),
            Constraint::Percentage(40),
            Constraint::Length(1),
        ]
    } else {
        vec![Constraint::Min(5), Constraint::Length(1)]
    };
    let slots = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    if show_transfer {
        LayoutAreas {
            listing: slots[0],
            transfer: Some(slots[1]),
            status: slots[2],
        }
    } else {
        LayoutAreas {
            listing: slots[0],
            transfer: None,
            status: slots[1],
        }
    }
}

pub fn draw(frame: &mut Frame, app: &App) {
    let transfer = app.transfer_output();
    let areas = calculate_layout(frame.area(), transfer.is_some());

    draw_listing(frame, areas.listing, app);
    if let (Some(area), Some((rendered, lines))) = (areas.transfer, transfer) {
        draw_transfer(frame, area, rendered, lines);
    }
    draw_status(frame, areas.status, app);
}

fn draw_listing(frame: &mut Frame, area: Rect, app: &App) {
    let view = app.view();
    let items: Vec<ListItem> = view
        .entries()
        .iter()
        .enumerate()
        .map(|(line, entry)| {
            let gutter = if view.is_annotated(line) {
                Span::styled(
                    MARK_GUTTER,
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                )
            } else {
                Span::raw(PLAIN_GUTTER)
            };
            let name = if entry.is_dir {
                Span::styled(entry.display(), Style::default().fg(Color::Blue))
            } else {
                Span::raw(entry.display())
            };
            let mut item = ListItem::new(Line::from(vec![gutter, name]));
            if line == view.cursor_index() {
                item = item.style(Style::default().add_modifier(Modifier::REVERSED));
            }
            item
        })
        .collect();

    let title = format!(
        " {} | {} marked, dest: {} ",
        view.base_dir().display(),
        app.mark_count(),
        app.destination(),
    );
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(title),
    );
    frame.render_widget(list, area);
}

fn draw_transfer(frame: &mut Frame, area: Rect, rendered: &str, lines: &[String]) {
    // Tail of the scrollback that fits the pane.
    let visible = area.height.saturating_sub(2) as usize;
    let start = lines.len().saturating_sub(visible);
    let text: Vec<Line> = lines[start..]
        .iter()
        .map(|l| Line::raw(l.as_str()))
        .collect();

    let pane = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(format!(" {rendered} ")),
    );
    frame.render_widget(pane, area);
}

fn draw_status(frame: &mut Frame, area: Rect, app: &App) {
    let line = if let Some(prompt) = app.prompt() {
        Line::from(vec![Span::styled(
            format!(":{prompt}"),
            Style::default().fg(ACCENT),
        )])
    } else if let Some((severity, message)) = app.sink().current() {
        let style = match severity {
            Severity::Info => Style::default().fg(Color::Green),
            Severity::Warning => Style::default().fg(Color::Yellow),
            Severity::Error => Style::default().fg(Color::Red),
        };
        Line::from(vec![Span::styled(message, style)])
    } else {
        Line::from(vec![Span::styled(
            "m mark  u upload  U upload+remove  c clear  : command  q quit",
            Style::default().fg(Color::DarkGray),
        )])
    };
    frame.render_widget(Paragraph::new(line), area);
}
