//! UI rendering for the studio.

mod gallery;
mod home;
mod settings;
mod wizard;

use falcon_core::format::{format_cost, format_relative_time, truncate};
use falcon_core::models;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Screen};

// ========== Colors ==========

/// App name and active highlights
const ACCENT: Color = Color::Rgb(0, 200, 200);
/// Panel borders
const BORDER_COLOR: Color = Color::Rgb(80, 160, 80);
/// Border of the wizard panel
const BORDER_WIZARD: Color = Color::Rgb(180, 100, 180);
/// Secondary text
const DIM: Color = Color::Rgb(128, 128, 128);
/// Background of the selected row
const SELECTED_BG: Color = Color::Rgb(40, 60, 80);
/// Error banner background
const ERROR_BG: Color = Color::Rgb(170, 40, 40);
/// Dollar amounts
const COST_COLOR: Color = Color::Rgb(255, 215, 0);
/// Labels in key/value rows
const LABEL_COLOR: Color = Color::Rgb(100, 180, 180);

/// Render the application UI.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let banner_height = if app.error_message().is_some() { 1 } else { 0 };

    // Layout: header, error banner, body, footer
    let chunks = Layout::vertical([
        Constraint::Length(2),             // Header
        Constraint::Length(banner_height), // Error banner
        Constraint::Min(5),                // Body
        Constraint::Length(1),             // Footer
    ])
    .split(area);

    render_header(frame, app, chunks[0]);
    if let Some(message) = app.error_message() {
        render_banner(frame, message, chunks[1]);
    }

    match app.screen {
        Screen::Home => home::render_home(frame, app, chunks[2]),
        Screen::Wizard => wizard::render_wizard(frame, app, chunks[2]),
        Screen::Gallery => gallery::render_gallery(frame, app, chunks[2]),
        Screen::Settings => settings::render_settings(frame, app, chunks[2]),
    }

    render_footer(frame, app, chunks[3]);
}

/// App name on the left, key hints for the current screen on the right.
fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::horizontal([
        Constraint::Length(9), // App name
        Constraint::Min(1),    // Hints
    ])
    .split(area);

    let name = Paragraph::new(" falcon ")
        .style(Style::default().fg(ACCENT).bold())
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(name, chunks[0]);

    let hints = match app.screen {
        Screen::Home => vec![
            ("↑↓", "move"),
            ("Enter", "select"),
            ("g", "gallery"),
            ("s", "settings"),
            ("q", "quit"),
        ],
        Screen::Wizard => app
            .wizard
            .as_ref()
            .map(wizard::key_hints)
            .unwrap_or_default(),
        Screen::Gallery => vec![
            ("↑↓", "move"),
            ("←→", "page"),
            ("Enter", "open"),
            ("e", "edit"),
            ("v", "vary"),
            ("u", "upscale"),
            ("b", "remove bg"),
            ("Esc", "back"),
        ],
        Screen::Settings if app.settings.key_input.is_some() => {
            vec![("Enter", "keep"), ("Esc", "cancel")]
        }
        Screen::Settings => vec![
            ("↑↓", "move"),
            ("Enter/←→", "change"),
            ("s", "save"),
            ("Esc", "cancel"),
        ],
    };

    let line = Line::from(hint_spans(&hints));
    let hints = Paragraph::new(line).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(hints, chunks[1]);
}

fn render_banner(frame: &mut Frame, message: &str, area: Rect) {
    let banner = Paragraph::new(format!(" ✗ {}", message))
        .style(Style::default().fg(Color::White).bg(ERROR_BG).bold());
    frame.render_widget(banner, area);
}

/// Cost totals from the history document.
fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let totals = app.history.total_cost;
    let spans = vec![
        Span::styled(" Session ", Style::default().fg(DIM)),
        Span::styled(format_cost(totals.session), Style::default().fg(COST_COLOR)),
        Span::raw("  │ "),
        Span::styled("Today ", Style::default().fg(DIM)),
        Span::styled(format_cost(totals.today), Style::default().fg(COST_COLOR)),
        Span::raw("  │ "),
        Span::styled("All-time ", Style::default().fg(DIM)),
        Span::styled(format_cost(totals.all_time), Style::default().fg(COST_COLOR)),
        Span::raw("  │ "),
        Span::styled(
            format!("{} generations", app.history.len()),
            Style::default().fg(DIM),
        ),
    ];
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ========== Shared helpers ==========

fn hint_spans(hints: &[(&'static str, &'static str)]) -> Vec<Span<'static>> {
    let mut spans = vec![Span::raw(" ")];
    for (key, action) in hints {
        spans.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(format!(" {}  ", action)));
    }
    spans
}

fn panel(title: &str, color: Color) -> Block<'static> {
    Block::default()
        .title(format!(" {} ", title))
        .title_style(Style::default().fg(color).bold())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

/// A menu row, highlighted when selected and dimmed when disabled.
fn menu_line(text: String, selected: bool, enabled: bool) -> Line<'static> {
    let marker = if selected { "▸ " } else { "  " };
    let style = match (selected, enabled) {
        (_, false) => Style::default().fg(DIM),
        (true, true) => Style::default()
            .fg(ACCENT)
            .bg(SELECTED_BG)
            .add_modifier(Modifier::BOLD),
        (false, true) => Style::default(),
    };
    Line::from(Span::styled(format!("{}{}", marker, text), style))
}

/// `label  value` row.
fn field_line(label: &str, value: String, width: usize) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("  {:<width$} ", label, width = width),
            Style::default().fg(LABEL_COLOR),
        ),
        Span::raw(value),
    ])
}
