use super::*;
use crate::app::GALLERY_PAGE_SIZE;

pub(super) fn render_gallery(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::vertical([
        Constraint::Length(GALLERY_PAGE_SIZE as u16 + 2), // Page of generations
        Constraint::Min(4),                               // Selected generation
    ])
    .split(area);

    render_page(frame, app, chunks[0]);
    render_selected(frame, app, chunks[1]);
}

fn render_page(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!(
        "Gallery {}/{}",
        app.gallery_page() + 1,
        app.gallery_page_count()
    );
    let page_start = app.gallery_page() * GALLERY_PAGE_SIZE;

    let lines: Vec<Line> = if app.history.is_empty() {
        vec![Line::styled(
            "  No generations yet.",
            Style::default().fg(DIM),
        )]
    } else {
        app.history
            .newest_first()
            .enumerate()
            .skip(page_start)
            .take(GALLERY_PAGE_SIZE)
            .map(|(i, generation)| {
                let text = format!(
                    "{:>3}. {:<8} {:<8} {:<5} {:<3} {}  {}",
                    i + 1,
                    format_relative_time(generation.timestamp),
                    generation.model,
                    generation.aspect,
                    generation.resolution,
                    format_cost(generation.cost),
                    truncate(&generation.prompt, 48)
                );
                menu_line(text, i == app.gallery_index, true)
            })
            .collect()
    };

    frame.render_widget(
        Paragraph::new(lines).block(panel(&title, BORDER_COLOR)),
        area,
    );
}

fn render_selected(frame: &mut Frame, app: &App, area: Rect) {
    let Some(generation) = app.selected_generation() else {
        frame.render_widget(panel("Details", BORDER_COLOR), area);
        return;
    };

    let mut lines = vec![
        field_line("Prompt", generation.prompt.clone(), 7),
        field_line("File", generation.output.display().to_string(), 7),
        field_line(
            "Model",
            models::display_name(&generation.model).to_string(),
            7,
        ),
        field_line(
            "When",
            generation.timestamp.format("%Y-%m-%d %H:%M UTC").to_string(),
            7,
        ),
    ];
    if let Some(source) = &generation.edited_from {
        lines.push(field_line("From", source.display().to_string(), 7));
    }

    let details = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel("Details", BORDER_COLOR));
    frame.render_widget(details, area);
}
