//! Studio wizard state machine
//!
//! A [`Wizard`] is plain data. [`Wizard::handle`] maps one [`Input`] to a new
//! state plus a [`Command`] for the app loop; nothing here touches the network
//! or the disk. The app runs a job only when it receives `Command::Run`.
//!
//! ## Flows
//!
//! | Flow | Steps |
//! |------|-------|
//! | Generate | Prompt, Preset (or Model, Aspect, Resolution), Confirm |
//! | Edit | Prompt, Confirm |
//! | Variations | Confirm |
//! | Upscale | Scale, Confirm |
//! | Remove background | Confirm |
//!
//! Every flow then passes through InFlight to Done, which offers follow-ups.

use std::path::PathBuf;

use falcon_core::image::generate_filename;
use falcon_core::jobs::{
    base_prompt, BackgroundJob, GenerateJob, SavedImage, UpscaleJob, MAX_IMAGES, MAX_SCALE,
};
use falcon_core::models::{self, ModelConfig, ASPECT_RATIOS, RESOLUTIONS};
use falcon_core::{AspectRatio, FalconConfig, Generation, Resolution};

use crate::preset::{Preset, PRESETS};

/// Model used for edits when neither the source model nor the default can edit.
const FALLBACK_EDIT_MODEL: &str = "gpt";

/// Key input, decoupled from the terminal backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Char(char),
    Backspace,
    Enter,
    Esc,
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Generate,
    Edit,
    Variations,
    Upscale,
    RemoveBackground,
}

impl Flow {
    pub fn title(&self) -> &'static str {
        match self {
            Flow::Generate => "Generate",
            Flow::Edit => "Edit Image",
            Flow::Variations => "Variations",
            Flow::Upscale => "Upscale Image",
            Flow::RemoveBackground => "Remove Background",
        }
    }

    /// Whether the flow acts on an existing generation.
    pub fn needs_source(&self) -> bool {
        *self != Flow::Generate
    }
}

/// A value editable on the confirm screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Prompt,
    Model,
    Aspect,
    Resolution,
    Count,
    Scale,
    Upscaler,
    Remover,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::Prompt => "Prompt",
            Field::Model => "Model",
            Field::Aspect => "Aspect",
            Field::Resolution => "Resolution",
            Field::Count => "Images",
            Field::Scale => "Scale",
            Field::Upscaler => "Upscaler",
            Field::Remover => "Remover",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Prompt,
    Preset,
    Model,
    Aspect,
    Resolution,
    Scale,
    Confirm { editing: Option<Field> },
    InFlight,
    Done,
}

/// Actions offered once a job has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    EditFurther,
    Vary,
    Upscale,
    RemoveBackground,
    Regenerate,
    NewPrompt,
    Home,
}

pub const FOLLOW_UPS: [FollowUp; 7] = [
    FollowUp::EditFurther,
    FollowUp::Vary,
    FollowUp::Upscale,
    FollowUp::RemoveBackground,
    FollowUp::Regenerate,
    FollowUp::NewPrompt,
    FollowUp::Home,
];

impl FollowUp {
    pub fn label(&self) -> &'static str {
        match self {
            FollowUp::EditFurther => "Edit further",
            FollowUp::Vary => "Variations",
            FollowUp::Upscale => "Upscale",
            FollowUp::RemoveBackground => "Remove background",
            FollowUp::Regenerate => "Regenerate",
            FollowUp::NewPrompt => "New prompt",
            FollowUp::Home => "Back to menu",
        }
    }
}

/// Entries of the preset step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PresetChoice {
    /// Keep the configured defaults
    Defaults,
    Preset(&'static Preset),
    /// Pick model, aspect and resolution by hand
    Custom,
}

pub fn preset_choices() -> Vec<PresetChoice> {
    std::iter::once(PresetChoice::Defaults)
        .chain(PRESETS.iter().map(PresetChoice::Preset))
        .chain(std::iter::once(PresetChoice::Custom))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Generate(GenerateJob),
    Upscale(UpscaleJob),
    RemoveBackground(BackgroundJob),
}

/// What the app loop should do after an input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    None,
    /// Leave the wizard for the home menu
    Exit,
    Run(Job),
    /// Start a new flow on the newest generation
    StartFlow(Flow),
}

/// The values a job is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Choices {
    pub prompt: String,
    pub model: String,
    pub aspect: AspectRatio,
    pub resolution: Resolution,
    pub num_images: u32,
    pub scale: u32,
    pub upscaler: String,
    pub background_remover: String,
}

#[derive(Debug, Clone)]
pub struct Wizard {
    pub flow: Flow,
    pub step: Step,
    back: Vec<Step>,
    pub source: Option<Generation>,
    pub choices: Choices,
    /// Starting values, restored by the Defaults preset
    initial: Choices,
    /// Choices before the field being edited, restored on Esc
    undo: Option<Choices>,
    /// Selection in list steps, the confirm field list and the follow-up menu
    pub cursor: usize,
    /// Files written by the last run
    pub results: Vec<SavedImage>,
}

impl Wizard {
    /// Start `flow`. Returns `None` when the flow needs a source and none is given.
    pub fn new(flow: Flow, config: &FalconConfig, source: Option<Generation>) -> Option<Self> {
        if flow.needs_source() && source.is_none() {
            return None;
        }

        let mut choices = Choices {
            prompt: String::new(),
            model: config.default_model.clone(),
            aspect: config.default_aspect,
            resolution: config.default_resolution,
            num_images: 1,
            scale: 2,
            upscaler: config.upscaler.clone(),
            background_remover: config.background_remover.clone(),
        };
        if let Some(src) = &source {
            choices.aspect = src.aspect;
            choices.resolution = src.resolution;
            match flow {
                Flow::Edit => choices.model = edit_model(&src.model, &config.default_model),
                Flow::Variations => {
                    choices.prompt = base_prompt(&src.prompt).to_string();
                    if models::find(&src.model).is_some_and(ModelConfig::is_generation) {
                        choices.model = src.model.clone();
                    }
                }
                _ => {}
            }
        }

        let step = match flow {
            Flow::Generate | Flow::Edit => Step::Prompt,
            Flow::Upscale => Step::Scale,
            Flow::Variations | Flow::RemoveBackground => Step::Confirm { editing: None },
        };

        Some(Self {
            flow,
            step,
            back: Vec::new(),
            source,
            initial: choices.clone(),
            choices,
            undo: None,
            cursor: 0,
            results: Vec::new(),
        })
    }

    /// Apply one input.
    pub fn handle(&mut self, input: Input) -> Command {
        match self.step.clone() {
            Step::InFlight => Command::None,
            Step::Prompt => self.handle_prompt(input),
            Step::Preset => self.handle_preset(input),
            Step::Model => self.handle_model(input),
            Step::Aspect => self.handle_aspect(input),
            Step::Resolution => self.handle_resolution(input),
            Step::Scale => self.handle_scale(input),
            Step::Confirm { editing: None } => self.handle_confirm(input),
            Step::Confirm {
                editing: Some(field),
            } => self.handle_field_edit(field, input),
            Step::Done => self.handle_done(input),
        }
    }

    /// The job finished; show results and follow-ups.
    pub fn complete(&mut self, results: Vec<SavedImage>) {
        self.results = results;
        self.step = Step::Done;
        self.back.clear();
        self.cursor = 0;
    }

    /// Confirm-screen fields for the current flow and model.
    pub fn fields(&self) -> Vec<Field> {
        match self.flow {
            Flow::Generate | Flow::Variations => {
                let mut fields = vec![Field::Prompt, Field::Model];
                if let Some(model) = models::find(&self.choices.model) {
                    if model.uses_aspect() {
                        fields.push(Field::Aspect);
                    }
                    if model.capabilities.supports_resolution {
                        fields.push(Field::Resolution);
                    }
                }
                fields.push(Field::Count);
                fields
            }
            Flow::Edit => vec![Field::Prompt, Field::Model],
            Flow::Upscale => vec![Field::Scale, Field::Upscaler],
            Flow::RemoveBackground => vec![Field::Remover],
        }
    }

    /// Display value of a field.
    pub fn field_value(&self, field: Field) -> String {
        let c = &self.choices;
        match field {
            Field::Prompt => c.prompt.clone(),
            Field::Model => models::display_name(&c.model).to_string(),
            Field::Aspect => c.aspect.to_string(),
            Field::Resolution => c.resolution.to_string(),
            Field::Count => c.num_images.to_string(),
            Field::Scale => format!("{}x", c.scale),
            Field::Upscaler => models::display_name(&c.upscaler).to_string(),
            Field::Remover => models::display_name(&c.background_remover).to_string(),
        }
    }

    /// Estimated cost of confirming now.
    pub fn estimated_cost(&self) -> f64 {
        let c = &self.choices;
        match self.flow {
            Flow::Generate | Flow::Variations => {
                models::estimate_cost(&c.model, Some(c.resolution), c.num_images)
            }
            Flow::Edit => models::estimate_cost(&c.model, Some(c.resolution), 1),
            Flow::Upscale => models::estimate_cost(&c.upscaler, None, 1),
            Flow::RemoveBackground => models::estimate_cost(&c.background_remover, None, 1),
        }
    }

    /// Generation model ids offered in the model step and field.
    pub fn model_options(&self) -> Vec<&'static str> {
        models::generation_models()
            .into_iter()
            .filter(|id| {
                self.flow != Flow::Edit
                    || models::find(id).is_some_and(|m| m.capabilities.supports_edit)
            })
            .collect()
    }

    // ============================================
    // Steps
    // ============================================

    fn handle_prompt(&mut self, input: Input) -> Command {
        match input {
            Input::Esc => self.go_back(),
            Input::Char(c) => {
                self.choices.prompt.push(c);
                Command::None
            }
            Input::Backspace => {
                self.choices.prompt.pop();
                Command::None
            }
            Input::Enter => {
                let trimmed = self.choices.prompt.trim().to_string();
                if trimmed.is_empty() {
                    return Command::None;
                }
                self.choices.prompt = trimmed;
                let next = if self.flow == Flow::Generate {
                    Step::Preset
                } else {
                    Step::Confirm { editing: None }
                };
                self.advance(next);
                Command::None
            }
            _ => Command::None,
        }
    }

    fn handle_preset(&mut self, input: Input) -> Command {
        let choices = preset_choices();
        match input {
            Input::Esc => self.go_back(),
            Input::Up | Input::Down => {
                self.move_cursor(input, choices.len());
                Command::None
            }
            Input::Enter => {
                match choices.get(self.cursor).copied() {
                    Some(PresetChoice::Defaults) => {
                        self.choices.aspect = self.initial.aspect;
                        self.choices.resolution = self.initial.resolution;
                        self.advance(Step::Confirm { editing: None });
                    }
                    Some(PresetChoice::Preset(preset)) => {
                        preset.apply(&mut self.choices.aspect, &mut self.choices.resolution);
                        self.advance(Step::Confirm { editing: None });
                    }
                    Some(PresetChoice::Custom) => self.advance(Step::Model),
                    None => {}
                }
                Command::None
            }
            _ => Command::None,
        }
    }

    fn handle_model(&mut self, input: Input) -> Command {
        let options = self.model_options();
        match input {
            Input::Esc => self.go_back(),
            Input::Up | Input::Down => {
                self.move_cursor(input, options.len());
                Command::None
            }
            Input::Enter => {
                if let Some(id) = options.get(self.cursor) {
                    self.choices.model = (*id).to_string();
                    let next = match models::find(id) {
                        Some(m) if m.uses_aspect() => Step::Aspect,
                        Some(m) if m.capabilities.supports_resolution => Step::Resolution,
                        _ => Step::Confirm { editing: None },
                    };
                    self.advance(next);
                }
                Command::None
            }
            _ => Command::None,
        }
    }

    fn handle_aspect(&mut self, input: Input) -> Command {
        match input {
            Input::Esc => self.go_back(),
            Input::Up | Input::Down | Input::Left | Input::Right => {
                self.move_cursor(input, ASPECT_RATIOS.len());
                Command::None
            }
            Input::Enter => {
                self.choices.aspect = ASPECT_RATIOS[self.cursor % ASPECT_RATIOS.len()];
                let next = if self.current_model().is_some_and(|m| m.capabilities.supports_resolution) {
                    Step::Resolution
                } else {
                    Step::Confirm { editing: None }
                };
                self.advance(next);
                Command::None
            }
            _ => Command::None,
        }
    }

    fn handle_resolution(&mut self, input: Input) -> Command {
        match input {
            Input::Esc => self.go_back(),
            Input::Up | Input::Down => {
                self.move_cursor(input, RESOLUTIONS.len());
                Command::None
            }
            Input::Enter => {
                self.choices.resolution = RESOLUTIONS[self.cursor % RESOLUTIONS.len()];
                self.advance(Step::Confirm { editing: None });
                Command::None
            }
            _ => Command::None,
        }
    }

    fn handle_scale(&mut self, input: Input) -> Command {
        match input {
            Input::Esc => self.go_back(),
            Input::Up | Input::Right => {
                self.choices.scale = (self.choices.scale + 1).min(MAX_SCALE);
                Command::None
            }
            Input::Down | Input::Left => {
                self.choices.scale = self.choices.scale.saturating_sub(1).max(1);
                Command::None
            }
            Input::Enter => {
                self.advance(Step::Confirm { editing: None });
                Command::None
            }
            _ => Command::None,
        }
    }

    fn handle_confirm(&mut self, input: Input) -> Command {
        let fields = self.fields();
        match input {
            Input::Esc | Input::Char('n') => self.go_back(),
            Input::Up | Input::Down => {
                self.move_cursor(input, fields.len());
                Command::None
            }
            Input::Char('e') | Input::Right => {
                if let Some(field) = fields.get(self.cursor).copied() {
                    self.undo = Some(self.choices.clone());
                    self.step = Step::Confirm {
                        editing: Some(field),
                    };
                }
                Command::None
            }
            Input::Enter | Input::Char('y') => self.run(),
            _ => Command::None,
        }
    }

    fn handle_field_edit(&mut self, field: Field, input: Input) -> Command {
        match (field, input) {
            (_, Input::Esc) => {
                if let Some(undo) = self.undo.take() {
                    self.choices = undo;
                }
                self.step = Step::Confirm { editing: None };
            }
            (Field::Prompt, Input::Char(c)) => self.choices.prompt.push(c),
            (Field::Prompt, Input::Backspace) => {
                self.choices.prompt.pop();
            }
            (Field::Prompt, Input::Enter) => {
                let trimmed = self.choices.prompt.trim().to_string();
                if !trimmed.is_empty() {
                    self.choices.prompt = trimmed;
                    self.finish_edit();
                }
            }
            (_, Input::Enter) => self.finish_edit(),
            (_, Input::Left | Input::Up) => self.cycle(field, false),
            (_, Input::Right | Input::Down) => self.cycle(field, true),
            _ => {}
        }
        Command::None
    }

    fn handle_done(&mut self, input: Input) -> Command {
        match input {
            Input::Esc => Command::Exit,
            Input::Up | Input::Down => {
                self.move_cursor(input, FOLLOW_UPS.len());
                Command::None
            }
            Input::Enter => match FOLLOW_UPS.get(self.cursor) {
                Some(follow_up) => self.follow_up(*follow_up),
                None => Command::None,
            },
            _ => Command::None,
        }
    }

    /// Act on a follow-up from the done screen.
    pub fn follow_up(&mut self, follow_up: FollowUp) -> Command {
        match follow_up {
            FollowUp::EditFurther => Command::StartFlow(Flow::Edit),
            FollowUp::Vary => Command::StartFlow(Flow::Variations),
            FollowUp::Upscale => Command::StartFlow(Flow::Upscale),
            FollowUp::RemoveBackground => Command::StartFlow(Flow::RemoveBackground),
            FollowUp::NewPrompt => Command::StartFlow(Flow::Generate),
            FollowUp::Home => Command::Exit,
            FollowUp::Regenerate => self.run(),
        }
    }

    // ============================================
    // Helpers
    // ============================================

    fn run(&mut self) -> Command {
        match self.build_job() {
            Some(job) => {
                self.step = Step::InFlight;
                Command::Run(job)
            }
            None => Command::None,
        }
    }

    /// Build the job for the current choices, with a fresh output name.
    pub fn build_job(&self) -> Option<Job> {
        let c = &self.choices;
        let generate = |prefix: &str, edit_source: Option<PathBuf>, num_images: u32| {
            Job::Generate(GenerateJob {
                prompt: c.prompt.clone(),
                model: c.model.clone(),
                aspect: c.aspect,
                resolution: c.resolution,
                num_images,
                edit_source,
                transparent: false,
                output: PathBuf::from(generate_filename(prefix)),
            })
        };

        match self.flow {
            Flow::Generate => Some(generate("fal", None, c.num_images)),
            Flow::Variations => Some(generate("var", None, c.num_images)),
            Flow::Edit => {
                let source = self.source.as_ref()?;
                Some(generate("edit", Some(source.output.clone()), 1))
            }
            Flow::Upscale => {
                let source = self.source.as_ref()?;
                Some(Job::Upscale(UpscaleJob::from_generation(
                    source,
                    &c.upscaler,
                    c.scale,
                )))
            }
            Flow::RemoveBackground => {
                let source = self.source.as_ref()?;
                Some(Job::RemoveBackground(BackgroundJob::from_generation(
                    source,
                    &c.background_remover,
                )))
            }
        }
    }

    fn current_model(&self) -> Option<&'static ModelConfig> {
        models::find(&self.choices.model)
    }

    fn advance(&mut self, next: Step) {
        let previous = std::mem::replace(&mut self.step, next);
        self.back.push(previous);
        self.cursor = self.initial_cursor();
    }

    fn go_back(&mut self) -> Command {
        match self.back.pop() {
            Some(previous) => {
                self.step = previous;
                self.cursor = self.initial_cursor();
                Command::None
            }
            None => Command::Exit,
        }
    }

    /// Cursor position when entering the current step: the current value.
    fn initial_cursor(&self) -> usize {
        let c = &self.choices;
        match self.step {
            Step::Model => self
                .model_options()
                .iter()
                .position(|id| *id == c.model)
                .unwrap_or(0),
            Step::Aspect => ASPECT_RATIOS.iter().position(|a| *a == c.aspect).unwrap_or(0),
            Step::Resolution => RESOLUTIONS
                .iter()
                .position(|r| *r == c.resolution)
                .unwrap_or(0),
            _ => 0,
        }
    }

    fn move_cursor(&mut self, input: Input, len: usize) {
        if len == 0 {
            return;
        }
        self.cursor = match input {
            Input::Up | Input::Left => (self.cursor + len - 1) % len,
            _ => (self.cursor + 1) % len,
        };
    }

    fn finish_edit(&mut self) {
        self.undo = None;
        self.step = Step::Confirm { editing: None };
        let len = self.fields().len();
        if self.cursor >= len {
            self.cursor = len.saturating_sub(1);
        }
    }

    fn cycle(&mut self, field: Field, forward: bool) {
        if field == Field::Model {
            let options = self.model_options();
            let next = cycle_in(&options, self.choices.model.as_str(), forward);
            self.choices.model = next.to_string();
            return;
        }

        let c = &mut self.choices;
        match field {
            Field::Prompt | Field::Model => {}
            Field::Aspect => c.aspect = cycle_in(&ASPECT_RATIOS, c.aspect, forward),
            Field::Resolution => c.resolution = cycle_in(&RESOLUTIONS, c.resolution, forward),
            Field::Count => c.num_images = cycle_number(c.num_images, MAX_IMAGES, forward),
            Field::Scale => c.scale = cycle_number(c.scale, MAX_SCALE, forward),
            Field::Upscaler => {
                let next = cycle_in(&models::upscalers(), c.upscaler.as_str(), forward);
                c.upscaler = next.to_string();
            }
            Field::Remover => {
                let next = cycle_in(&models::background_removers(), c.background_remover.as_str(), forward);
                c.background_remover = next.to_string();
            }
        }
    }
}

/// Next (or previous) entry after `current`, wrapping. Unknown values start at the front.
pub(crate) fn cycle_in<T: Copy + PartialEq>(options: &[T], current: T, forward: bool) -> T {
    let len = options.len();
    match options.iter().position(|o| *o == current) {
        Some(i) if forward => options[(i + 1) % len],
        Some(i) => options[(i + len - 1) % len],
        None => options[0],
    }
}

fn cycle_number(current: u32, max: u32, forward: bool) -> u32 {
    match (forward, current) {
        (true, n) if n >= max => 1,
        (true, n) => n + 1,
        (false, n) if n <= 1 => max,
        (false, n) => n - 1,
    }
}

/// An edit-capable model: the source's, else the default, else the fallback.
fn edit_model(source_model: &str, default_model: &str) -> String {
    [source_model, default_model]
        .into_iter()
        .find(|id| {
            models::find(id).is_some_and(|m| m.is_generation() && m.capabilities.supports_edit)
        })
        .unwrap_or(FALLBACK_EDIT_MODEL)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FalconConfig {
        FalconConfig::default()
    }

    fn source(prompt: &str, model: &str) -> Generation {
        Generation::new(
            prompt,
            model,
            AspectRatio::Story,
            Resolution::FourK,
            PathBuf::from("/work/fox.png"),
            0.3,
        )
    }

    fn press(wizard: &mut Wizard, inputs: &[Input]) -> Vec<Command> {
        inputs.iter().map(|i| wizard.handle(*i)).collect()
    }

    fn type_text(wizard: &mut Wizard, text: &str) {
        for c in text.chars() {
            wizard.handle(Input::Char(c));
        }
    }

    fn confirm() -> Step {
        Step::Confirm { editing: None }
    }

    #[test]
    fn test_generate_with_defaults_emits_one_job() {
        let mut w = Wizard::new(Flow::Generate, &config(), None).unwrap();
        type_text(&mut w, "  a red fox ");
        w.handle(Input::Enter);
        assert_eq!(w.step, Step::Preset);

        w.handle(Input::Enter); // Defaults
        assert_eq!(w.step, confirm());

        let job = match w.handle(Input::Enter) {
            Command::Run(Job::Generate(job)) => job,
            other => panic!("expected a generate job, got {:?}", other),
        };
        assert_eq!(job.prompt, "a red fox");
        assert_eq!(job.model, "banana");
        assert_eq!(job.aspect, AspectRatio::Square);
        assert_eq!(job.resolution, Resolution::TwoK);
        assert!(job.edit_source.is_none());
        assert_eq!(w.step, Step::InFlight);

        // Nothing else is emitted while in flight
        let commands = press(&mut w, &[Input::Enter, Input::Char('y'), Input::Esc]);
        assert!(commands.iter().all(|c| *c == Command::None));
        assert_eq!(w.step, Step::InFlight);
    }

    #[test]
    fn test_empty_prompt_does_not_advance() {
        let mut w = Wizard::new(Flow::Generate, &config(), None).unwrap();
        type_text(&mut w, "   ");
        w.handle(Input::Enter);
        assert_eq!(w.step, Step::Prompt);

        type_text(&mut w, "x");
        w.handle(Input::Backspace);
        assert_eq!(w.choices.prompt, "   ");
    }

    #[test]
    fn test_back_pops_to_previous_step_then_exits() {
        let mut w = Wizard::new(Flow::Generate, &config(), None).unwrap();
        type_text(&mut w, "fox");
        w.handle(Input::Enter);
        // Custom is the last preset entry
        w.handle(Input::Up);
        w.handle(Input::Enter);
        assert_eq!(w.step, Step::Model);

        assert_eq!(w.handle(Input::Esc), Command::None);
        assert_eq!(w.step, Step::Preset);
        assert_eq!(w.handle(Input::Esc), Command::None);
        assert_eq!(w.step, Step::Prompt);
        assert_eq!(w.choices.prompt, "fox");
        assert_eq!(w.handle(Input::Esc), Command::Exit);
    }

    #[test]
    fn test_custom_path_skips_unsupported_steps() {
        let mut w = Wizard::new(Flow::Generate, &config(), None).unwrap();
        type_text(&mut w, "fox");
        press(&mut w, &[Input::Enter, Input::Up, Input::Enter]);

        // Model list: gpt, banana, gemini, gemini3; cursor starts on banana
        assert_eq!(w.cursor, 1);
        press(&mut w, &[Input::Down, Input::Enter]);
        assert_eq!(w.choices.model, "gemini");
        assert_eq!(w.step, Step::Aspect);

        // Square is selected on entry; move to 4:3
        press(&mut w, &[Input::Down, Input::Enter]);
        assert_eq!(w.choices.aspect, AspectRatio::Classic);
        // gemini has no resolution control
        assert_eq!(w.step, confirm());
        assert!(!w.fields().contains(&Field::Resolution));
    }

    #[test]
    fn test_explicit_size_model_still_picks_aspect() {
        let mut w = Wizard::new(Flow::Generate, &config(), None).unwrap();
        type_text(&mut w, "fox");
        press(&mut w, &[Input::Enter, Input::Up, Input::Enter, Input::Up, Input::Enter]);
        assert_eq!(w.choices.model, "gpt");
        assert_eq!(w.step, Step::Aspect);
        w.handle(Input::Enter);
        assert_eq!(w.step, confirm());
    }

    #[test]
    fn test_preset_applies_aspect_and_resolution() {
        let mut config = config();
        config.default_resolution = Resolution::OneK;
        let mut w = Wizard::new(Flow::Generate, &config, None).unwrap();
        type_text(&mut w, "book");
        w.handle(Input::Enter);

        let cover = preset_choices()
            .iter()
            .position(|c| matches!(c, PresetChoice::Preset(p) if p.name == "cover"))
            .unwrap();
        for _ in 0..cover {
            w.handle(Input::Down);
        }
        w.handle(Input::Enter);
        assert_eq!(w.choices.aspect, AspectRatio::PhotoPortrait);
        assert_eq!(w.choices.resolution, Resolution::TwoK);

        // Going back and picking Defaults restores the configured values
        press(&mut w, &[Input::Esc, Input::Enter]);
        assert_eq!(w.choices.aspect, AspectRatio::Square);
        assert_eq!(w.choices.resolution, Resolution::OneK);
    }

    #[test]
    fn test_confirm_field_edit_and_revert() {
        let mut w = Wizard::new(Flow::Variations, &config(), Some(source("a fox", "banana"))).unwrap();
        assert_eq!(w.step, confirm());

        // Model field, cycle forward, then cancel
        press(&mut w, &[Input::Down, Input::Char('e')]);
        assert_eq!(
            w.step,
            Step::Confirm {
                editing: Some(Field::Model)
            }
        );
        w.handle(Input::Right);
        assert_eq!(w.choices.model, "gemini");
        w.handle(Input::Esc);
        assert_eq!(w.choices.model, "banana");
        assert_eq!(w.step, confirm());

        // Prompt field, retype and commit
        press(&mut w, &[Input::Up, Input::Char('e')]);
        for _ in 0.."a fox".len() {
            w.handle(Input::Backspace);
        }
        type_text(&mut w, "a wolf");
        w.handle(Input::Enter);
        assert_eq!(w.choices.prompt, "a wolf");
        assert_eq!(w.step, confirm());
    }

    #[test]
    fn test_edit_flow_uses_source_and_edit_model() {
        let mut w = Wizard::new(Flow::Edit, &config(), Some(source("a fox", "clarity"))).unwrap();
        assert_eq!(w.step, Step::Prompt);
        // A utility source falls back to the default model
        assert_eq!(w.choices.model, "banana");

        type_text(&mut w, "add rain");
        w.handle(Input::Enter);
        assert_eq!(w.step, confirm());

        match w.handle(Input::Char('y')) {
            Command::Run(Job::Generate(job)) => {
                assert_eq!(job.prompt, "add rain");
                assert_eq!(job.edit_source, Some(PathBuf::from("/work/fox.png")));
                assert_eq!(job.aspect, AspectRatio::Story);
                assert_eq!(job.num_images, 1);
            }
            other => panic!("expected an edit job, got {:?}", other),
        }
    }

    #[test]
    fn test_upscale_scale_is_bounded() {
        let mut w = Wizard::new(Flow::Upscale, &config(), Some(source("a fox", "banana"))).unwrap();
        assert_eq!(w.step, Step::Scale);

        for _ in 0..10 {
            w.handle(Input::Up);
        }
        assert_eq!(w.choices.scale, MAX_SCALE);
        for _ in 0..10 {
            w.handle(Input::Down);
        }
        assert_eq!(w.choices.scale, 1);

        w.handle(Input::Enter);
        match w.handle(Input::Enter) {
            Command::Run(Job::Upscale(job)) => {
                assert_eq!(job.scale, 1);
                assert_eq!(job.model, "clarity");
                assert_eq!(job.label(), "[upscale 1x] a fox");
            }
            other => panic!("expected an upscale job, got {:?}", other),
        }
    }

    #[test]
    fn test_remove_background_confirms_directly() {
        let mut w =
            Wizard::new(Flow::RemoveBackground, &config(), Some(source("a fox", "banana"))).unwrap();
        assert_eq!(w.fields(), vec![Field::Remover]);
        assert!(matches!(
            w.handle(Input::Enter),
            Command::Run(Job::RemoveBackground(ref job)) if job.model == "rmbg"
        ));
    }

    #[test]
    fn test_flows_needing_a_source() {
        assert!(Wizard::new(Flow::Edit, &config(), None).is_none());
        assert!(Wizard::new(Flow::Upscale, &config(), None).is_none());
        assert!(Wizard::new(Flow::Generate, &config(), None).is_some());
    }

    #[test]
    fn test_variations_strip_labels() {
        let w = Wizard::new(
            Flow::Variations,
            &config(),
            Some(source("[rmbg] [upscale 2x] a fox", "rmbg")),
        )
        .unwrap();
        assert_eq!(w.choices.prompt, "a fox");
        assert_eq!(w.choices.model, "banana");
    }

    #[test]
    fn test_follow_ups_start_the_right_flow() {
        let mut w = Wizard::new(Flow::Variations, &config(), Some(source("a fox", "gemini"))).unwrap();
        assert!(matches!(w.handle(Input::Enter), Command::Run(_)));
        w.complete(Vec::new());
        assert_eq!(w.step, Step::Done);

        assert_eq!(w.follow_up(FollowUp::EditFurther), Command::StartFlow(Flow::Edit));
        assert_eq!(w.follow_up(FollowUp::Vary), Command::StartFlow(Flow::Variations));
        assert_eq!(w.follow_up(FollowUp::Upscale), Command::StartFlow(Flow::Upscale));
        assert_eq!(
            w.follow_up(FollowUp::RemoveBackground),
            Command::StartFlow(Flow::RemoveBackground)
        );
        assert_eq!(w.follow_up(FollowUp::NewPrompt), Command::StartFlow(Flow::Generate));
        assert_eq!(w.follow_up(FollowUp::Home), Command::Exit);

        // Regenerate reruns the same prompt
        match w.follow_up(FollowUp::Regenerate) {
            Command::Run(Job::Generate(job)) => {
                assert_eq!(job.prompt, "a fox");
                assert_eq!(job.model, "gemini");
            }
            other => panic!("expected a rerun, got {:?}", other),
        }
        assert_eq!(w.step, Step::InFlight);
    }

    #[test]
    fn test_done_menu_navigation() {
        let mut w =
            Wizard::new(Flow::RemoveBackground, &config(), Some(source("a fox", "banana"))).unwrap();
        w.handle(Input::Enter);
        w.complete(Vec::new());

        // Up wraps to "Back to menu"
        w.handle(Input::Up);
        assert_eq!(FOLLOW_UPS[w.cursor], FollowUp::Home);
        assert_eq!(w.handle(Input::Enter), Command::Exit);
        assert_eq!(w.handle(Input::Esc), Command::Exit);
    }

    #[test]
    fn test_cycle_helpers() {
        assert_eq!(cycle_number(4, 4, true), 1);
        assert_eq!(cycle_number(1, 8, false), 8);
        assert_eq!(cycle_in(&["a", "b", "c"], "c", true), "a");
        assert_eq!(cycle_in(&["a", "b", "c"], "z", false), "a");
        assert_eq!(cycle_in(&RESOLUTIONS, Resolution::FourK, true), Resolution::OneK);
        assert_eq!(cycle_in(&ASPECT_RATIOS, AspectRatio::Square, false), AspectRatio::Ultrawide);
    }
}
