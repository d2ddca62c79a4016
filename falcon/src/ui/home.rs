use falcon_core::config::resolve_api_key;

use super::*;
use crate::app::HOME_ITEMS;

pub(super) fn render_home(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::horizontal([
        Constraint::Percentage(40), // Menu
        Constraint::Percentage(60), // Status
    ])
    .split(area);

    render_menu(frame, app, chunks[0]);
    render_status(frame, app, chunks[1]);
}

fn render_menu(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![Line::raw("")];
    for (i, item) in HOME_ITEMS.iter().enumerate() {
        lines.push(menu_line(
            item.label().to_string(),
            i == app.home_index,
            app.home_item_enabled(*item),
        ));
    }
    if let Some(item) = HOME_ITEMS.get(app.home_index) {
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            format!("  {}", item.description()),
            Style::default().fg(DIM),
        ));
    }

    let menu = Paragraph::new(lines).block(panel("Studio", BORDER_COLOR));
    frame.render_widget(menu, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let config = &app.config;
    let mut lines = vec![
        Line::raw(""),
        field_line("Model", models::display_name(&config.default_model).to_string(), 11),
        field_line(
            "Defaults",
            format!("{} | {}", config.default_aspect, config.default_resolution),
            11,
        ),
        field_line("Upscaler", models::display_name(&config.upscaler).to_string(), 11),
        field_line(
            "API key",
            if resolve_api_key(None, config).is_ok() {
                "set".to_string()
            } else {
                "missing (set FAL_KEY or add one in Settings)".to_string()
            },
            11,
        ),
        Line::raw(""),
    ];

    match app.history.last() {
        Some(last) => {
            lines.push(Line::styled("  Last:", Style::default().fg(ACCENT).bold()));
            lines.push(field_line("Prompt", truncate(&last.prompt, 50), 11));
            lines.push(field_line(
                "Model",
                models::display_name(&last.model).to_string(),
                11,
            ));
            lines.push(field_line("File", last.file_name(), 11));
            lines.push(field_line(
                "When",
                format!("{}  {}", format_relative_time(last.timestamp), format_cost(last.cost)),
                11,
            ));
        }
        None => lines.push(Line::styled(
            "  No generations yet. Pick Generate to start.",
            Style::default().fg(DIM),
        )),
    }

    let status = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel("Status", BORDER_COLOR));
    frame.render_widget(status, area);
}
