use super::*;
use crate::app::SETTINGS_ROWS;

pub(super) fn render_settings(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![Line::raw("")];
    for (i, row) in SETTINGS_ROWS.iter().enumerate() {
        let text = format!("{:<20} {}", row.label(), app.setting_value(*row));
        lines.push(menu_line(text, i == app.settings.index, true));
    }

    lines.push(Line::raw(""));
    let note = if app.settings.key_input.is_some() {
        "  Type the new key. It is stored in ~/.falcon/config.json; FAL_KEY still wins."
    } else if app.settings.draft != app.config {
        "  Unsaved changes. Press s to save."
    } else {
        "  Changes are saved to ~/.falcon/config.json."
    };
    lines.push(Line::styled(note, Style::default().fg(DIM)));

    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel("Settings", BORDER_COLOR));
    frame.render_widget(body, area);
}
