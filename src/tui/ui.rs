//! UI rendering for terminal mode.

use super::app::TerminalApp;
use crate::io::PORT_COUNT;
use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph},
};

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &TerminalApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_tabs(frame, chunks[0], app);
    draw_screen(frame, chunks[1], app);
    draw_status(frame, chunks[2], app);
}

/// Tab strip: `*` marks unread output, `?` a pending GPI.
fn draw_tabs(frame: &mut Frame, area: Rect, app: &TerminalApp) {
    let mut spans = Vec::with_capacity(PORT_COUNT * 2);
    for port in 0..PORT_COUNT {
        let unread = if app.terminals[port].unread { "*" } else { " " };
        let waiting = if app.is_waiting(port) { "?" } else { " " };
        let text = format!(" F{} p{}{}{} ", port + 1, port, unread, waiting);

        let style = if port == app.viewed {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else if app.terminals[port].unread {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        spans.push(Span::styled(text, style));
        spans.push(Span::raw("|"));
    }

    let tabs = Paragraph::new(Line::from(spans))
        .block(Block::default().title(" Ports ").borders(Borders::ALL));

    frame.render_widget(tabs, area);
}

/// The viewed terminal, scrolled to its last lines.
fn draw_screen(frame: &mut Frame, area: Rect, app: &TerminalApp) {
    let screen = &app.terminals[app.viewed];
    let rows = (area.height as usize).saturating_sub(2);
    let start = screen.lines.len().saturating_sub(rows);

    let mut lines: Vec<Line> = screen.lines[start..]
        .iter()
        .map(|l| Line::from(l.as_str()))
        .collect();
    if !app.halted && app.is_waiting(app.viewed) {
        if let Some(last) = lines.last_mut() {
            last.spans.push(Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)));
        }
    }

    let (title, style) = if app.halted {
        (" Halted ".to_string(), Style::default().fg(Color::DarkGray))
    } else {
        (format!(" Terminal {} ", app.viewed), Style::default().fg(Color::White))
    };

    let paragraph = Paragraph::new(lines).style(style).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(if app.halted {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::Green)
            }),
    );

    frame.render_widget(paragraph, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &TerminalApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default().title(" Status ").borders(Borders::ALL));

    frame.render_widget(status, area);
}
