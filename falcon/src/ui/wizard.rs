use falcon_core::models::{ASPECT_RATIOS, RESOLUTIONS};

use super::*;
use crate::wizard::{preset_choices, Field, Flow, PresetChoice, Step, Wizard, FOLLOW_UPS};

/// Key hints for the wizard's current step.
pub(super) fn key_hints(wizard: &Wizard) -> Vec<(&'static str, &'static str)> {
    match wizard.step {
        Step::Prompt => vec![("Enter", "next"), ("Esc", "back")],
        Step::Preset | Step::Model | Step::Aspect | Step::Resolution => {
            vec![("↑↓", "choose"), ("Enter", "next"), ("Esc", "back")]
        }
        Step::Scale => vec![("↑↓", "scale"), ("Enter", "next"), ("Esc", "back")],
        Step::Confirm { editing: None } => vec![
            ("↑↓", "field"),
            ("e", "edit"),
            ("Enter/y", "run"),
            ("n/Esc", "back"),
        ],
        Step::Confirm {
            editing: Some(Field::Prompt),
        } => vec![("Enter", "keep"), ("Esc", "revert")],
        Step::Confirm { editing: Some(_) } => {
            vec![("←→", "change"), ("Enter", "keep"), ("Esc", "revert")]
        }
        Step::InFlight => vec![("", "working...")],
        Step::Done => vec![("↑↓", "choose"), ("Enter", "select"), ("Esc", "menu")],
    }
}

pub(super) fn render_wizard(frame: &mut Frame, app: &App, area: Rect) {
    let Some(wizard) = app.wizard.as_ref() else {
        return;
    };

    let mut lines = vec![Line::raw("")];
    if let Some(source) = &wizard.source {
        lines.push(field_line("Source", source.file_name(), 8));
        lines.push(field_line("Prompt", truncate(&source.prompt, 60), 8));
        lines.push(Line::raw(""));
    }

    match &wizard.step {
        Step::Prompt => prompt_lines(wizard, &mut lines),
        Step::Preset => preset_lines(wizard, &mut lines),
        Step::Model => {
            lines.push(heading("Model"));
            for (i, id) in wizard.model_options().iter().enumerate() {
                let text = match models::find(id) {
                    Some(model) => format!("{:<18} {}", model.name, model.pricing_label),
                    None => id.to_string(),
                };
                lines.push(menu_line(text, i == wizard.cursor, true));
            }
        }
        Step::Aspect => {
            lines.push(heading("Aspect ratio"));
            for (i, aspect) in ASPECT_RATIOS.iter().enumerate() {
                lines.push(menu_line(aspect.to_string(), i == wizard.cursor, true));
            }
        }
        Step::Resolution => {
            lines.push(heading("Resolution"));
            for (i, res) in RESOLUTIONS.iter().enumerate() {
                lines.push(menu_line(res.to_string(), i == wizard.cursor, true));
            }
        }
        Step::Scale => {
            lines.push(heading("Scale factor"));
            lines.push(Line::styled(
                format!("  ◀ {}x ▶", wizard.choices.scale),
                Style::default().fg(ACCENT).bold(),
            ));
        }
        Step::Confirm { editing } => confirm_lines(wizard, *editing, &mut lines),
        Step::InFlight => {
            lines.push(Line::styled(
                format!("  ⠿ {}", in_flight_message(wizard)),
                Style::default().fg(ACCENT).bold(),
            ));
            lines.push(Line::styled(
                "  This can take a minute. Keys are paused until it finishes.",
                Style::default().fg(DIM),
            ));
        }
        Step::Done => done_lines(wizard, &mut lines),
    }

    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel(wizard.flow.title(), BORDER_WIZARD));
    frame.render_widget(body, area);
}

fn heading(text: &str) -> Line<'static> {
    Line::styled(format!("  {}", text), Style::default().fg(LABEL_COLOR).bold())
}

fn prompt_lines(wizard: &Wizard, lines: &mut Vec<Line<'static>>) {
    let label = match wizard.flow {
        Flow::Edit => "Describe the change",
        _ => "Describe the image",
    };
    lines.push(heading(label));
    lines.push(Line::from(vec![
        Span::raw("  > "),
        Span::raw(wizard.choices.prompt.clone()),
        Span::styled("▏", Style::default().fg(ACCENT)),
    ]));
}

fn preset_lines(wizard: &Wizard, lines: &mut Vec<Line<'static>>) {
    lines.push(heading("Preset"));
    for (i, choice) in preset_choices().iter().enumerate() {
        let text = match choice {
            PresetChoice::Defaults => format!(
                "Use defaults ({}, {})",
                wizard.choices.aspect, wizard.choices.resolution
            ),
            PresetChoice::Preset(preset) => format!(
                "{:<10} {:<26} {}",
                preset.name,
                preset.description,
                preset.summary()
            ),
            PresetChoice::Custom => "Custom (model, aspect, resolution)".to_string(),
        };
        lines.push(menu_line(text, i == wizard.cursor, true));
    }
}

fn confirm_lines(wizard: &Wizard, editing: Option<Field>, lines: &mut Vec<Line<'static>>) {
    lines.push(heading("Ready"));
    for (i, field) in wizard.fields().iter().enumerate() {
        let value = wizard.field_value(*field);
        let selected = i == wizard.cursor;
        let line = if editing == Some(*field) {
            let shown = if *field == Field::Prompt {
                format!("{}▏", value)
            } else {
                format!("◀ {} ▶", value)
            };
            Line::from(vec![
                Span::styled(
                    format!("▸ {:<11} ", field.label()),
                    Style::default().fg(LABEL_COLOR),
                ),
                Span::styled(shown, Style::default().fg(ACCENT).bold()),
            ])
        } else {
            menu_line(format!("{:<11} {}", field.label(), value), selected, true)
        };
        lines.push(line);
    }
    lines.push(Line::raw(""));
    lines.push(Line::from(vec![
        Span::styled("  Est. cost ", Style::default().fg(DIM)),
        Span::styled(
            format_cost(wizard.estimated_cost()),
            Style::default().fg(COST_COLOR),
        ),
    ]));
}

fn in_flight_message(wizard: &Wizard) -> String {
    let choices = &wizard.choices;
    match wizard.flow {
        Flow::Generate | Flow::Variations => format!(
            "Generating with {}...",
            models::display_name(&choices.model)
        ),
        Flow::Edit => format!("Editing with {}...", models::display_name(&choices.model)),
        Flow::Upscale => format!(
            "Upscaling {}x with {}...",
            choices.scale,
            models::display_name(&choices.upscaler)
        ),
        Flow::RemoveBackground => format!(
            "Removing background with {}...",
            models::display_name(&choices.background_remover)
        ),
    }
}

fn done_lines(wizard: &Wizard, lines: &mut Vec<Line<'static>>) {
    for saved in &wizard.results {
        let dims = saved
            .dimensions
            .map(|d| d.to_string())
            .unwrap_or_else(|| "?".to_string());
        lines.push(Line::from(vec![
            Span::styled("  ✓ ", Style::default().fg(Color::Green).bold()),
            Span::raw(format!("{} ({}, {})", saved.path.display(), dims, saved.size)),
        ]));
    }
    if !wizard.results.is_empty() {
        let cost: f64 = wizard.results.iter().map(|s| s.generation.cost).sum();
        lines.push(Line::styled(
            format!("    {}", format_cost(cost)),
            Style::default().fg(COST_COLOR),
        ));
    }
    lines.push(Line::raw(""));
    lines.push(heading("Next"));
    for (i, follow_up) in FOLLOW_UPS.iter().enumerate() {
        lines.push(menu_line(follow_up.label().to_string(), i == wizard.cursor, true));
    }
}
