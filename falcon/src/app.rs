//! Application state for the studio.

mod gallery;
mod home;
mod settings;
mod wizard;

use std::path::Path;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use falcon_core::config::{resolve_api_key, ConfigPatch};
use falcon_core::models::{self, ASPECT_RATIOS, RESOLUTIONS};
use falcon_core::{image, jobs, FalClient, FalconConfig, Generation, History, Store};

use crate::wizard::{cycle_in, Command, Flow, Input, Job, Wizard};

/// How long an error stays in the banner.
pub const BANNER_TIMEOUT: Duration = Duration::from_secs(5);

/// Generations per gallery page.
pub const GALLERY_PAGE_SIZE: usize = 8;

/// Log levels offered in settings.
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Current screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Home,
    Wizard,
    Gallery,
    Settings,
}

/// Home menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeItem {
    Generate,
    EditLast,
    Variations,
    Upscale,
    RemoveBackground,
    Gallery,
    Settings,
}

pub const HOME_ITEMS: [HomeItem; 7] = [
    HomeItem::Generate,
    HomeItem::EditLast,
    HomeItem::Variations,
    HomeItem::Upscale,
    HomeItem::RemoveBackground,
    HomeItem::Gallery,
    HomeItem::Settings,
];

impl HomeItem {
    pub fn label(&self) -> &'static str {
        match self {
            HomeItem::Generate => "Generate",
            HomeItem::EditLast => "Edit Last",
            HomeItem::Variations => "Variations",
            HomeItem::Upscale => "Upscale",
            HomeItem::RemoveBackground => "Remove BG",
            HomeItem::Gallery => "Gallery",
            HomeItem::Settings => "Settings",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            HomeItem::Generate => "Create a new image from a prompt",
            HomeItem::EditLast => "Edit the last image with a new prompt",
            HomeItem::Variations => "More takes on the last prompt",
            HomeItem::Upscale => "Upscale the last image",
            HomeItem::RemoveBackground => "Cut out the subject of the last image",
            HomeItem::Gallery => "Browse past generations",
            HomeItem::Settings => "Defaults and API key",
        }
    }

    /// Whether the entry acts on the last generation.
    pub fn needs_history(&self) -> bool {
        matches!(
            self,
            HomeItem::EditLast | HomeItem::Variations | HomeItem::Upscale | HomeItem::RemoveBackground
        )
    }
}

/// Settings rows, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsRow {
    DefaultModel,
    DefaultAspect,
    DefaultResolution,
    Upscaler,
    BackgroundRemover,
    OpenAfterGenerate,
    ApiKey,
    LogLevel,
}

pub const SETTINGS_ROWS: [SettingsRow; 8] = [
    SettingsRow::DefaultModel,
    SettingsRow::DefaultAspect,
    SettingsRow::DefaultResolution,
    SettingsRow::Upscaler,
    SettingsRow::BackgroundRemover,
    SettingsRow::OpenAfterGenerate,
    SettingsRow::ApiKey,
    SettingsRow::LogLevel,
];

impl SettingsRow {
    pub fn label(&self) -> &'static str {
        match self {
            SettingsRow::DefaultModel => "Default Model",
            SettingsRow::DefaultAspect => "Default Aspect",
            SettingsRow::DefaultResolution => "Default Resolution",
            SettingsRow::Upscaler => "Upscaler",
            SettingsRow::BackgroundRemover => "Background Remover",
            SettingsRow::OpenAfterGenerate => "Open After Generate",
            SettingsRow::ApiKey => "API Key",
            SettingsRow::LogLevel => "Log Level",
        }
    }
}

/// Settings screen state: a draft of the config plus the selection.
#[derive(Debug, Clone)]
pub struct SettingsState {
    pub index: usize,
    pub draft: FalconConfig,
    /// Text typed for a new API key, while editing it
    pub key_input: Option<String>,
}

/// Main application state.
pub struct App {
    store: Store,
    pub config: FalconConfig,
    pub history: History,
    base_url: String,
    pub screen: Screen,
    pub home_index: usize,
    pub wizard: Option<Wizard>,
    /// Selection in the newest-first gallery list
    pub gallery_index: usize,
    pub settings: SettingsState,
    error: Option<(String, Instant)>,
    /// Job confirmed in the wizard, run by the main loop
    pending: Option<Job>,
    pub should_quit: bool,
}

impl App {
    pub fn new(store: Store, config: FalconConfig, base_url: impl Into<String>) -> Self {
        let history = store.load_history();
        let settings = SettingsState {
            index: 0,
            draft: config.clone(),
            key_input: None,
        };
        Self {
            store,
            config,
            history,
            base_url: base_url.into(),
            screen: Screen::Home,
            home_index: 0,
            wizard: None,
            gallery_index: 0,
            settings,
            error: None,
            pending: None,
            should_quit: false,
        }
    }

    /// Handle a key event.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.pending.is_some() {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        match self.screen {
            Screen::Home => self.handle_home_key(key),
            Screen::Wizard => self.handle_wizard_key(key),
            Screen::Gallery => self.handle_gallery_key(key),
            Screen::Settings => self.handle_settings_key(key),
        }
    }

    /// Expire the error banner.
    pub fn tick(&mut self) {
        if let Some((_, since)) = &self.error {
            if since.elapsed() >= BANNER_TIMEOUT {
                self.error = None;
            }
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|(message, _)| message.as_str())
    }

    pub(crate) fn show_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(error = %message, "Studio error");
        self.error = Some((message, Instant::now()));
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Run the confirmed job, if any, and route the result.
    ///
    /// Success moves the wizard to its done step; failure shows the banner and
    /// returns to Home.
    pub async fn run_pending(&mut self) {
        let Some(job) = self.pending.take() else {
            return;
        };

        match self.execute(&job).await {
            Ok(outcome) => {
                tracing::info!(images = outcome.images.len(), "Studio job complete");
                self.history = outcome.history.clone();
                if self.config.open_after_generate {
                    if let Some(path) = outcome.first_path() {
                        self.open_image(path);
                    }
                }
                if let Some(wizard) = self.wizard.as_mut() {
                    wizard.complete(outcome.images);
                }
            }
            Err(e) => {
                self.show_error(e.to_string());
                self.go_home();
            }
        }
    }

    async fn execute(&self, job: &Job) -> falcon_core::Result<jobs::JobOutcome> {
        let api_key = resolve_api_key(None, &self.config)?;
        let client = FalClient::with_base_url(&api_key, &self.base_url)?;
        match job {
            Job::Generate(job) => jobs::run_generate(&client, &self.store, job).await,
            Job::Upscale(job) => jobs::run_upscale(&client, &self.store, job).await,
            Job::RemoveBackground(job) => jobs::run_remove_background(&client, &self.store, job).await,
        }
    }

    /// Start a wizard flow. Flows acting on an image use `source`.
    pub(crate) fn start_flow(&mut self, flow: Flow, source: Option<Generation>) {
        match Wizard::new(flow, &self.config, source) {
            Some(wizard) => {
                tracing::debug!(flow = flow.title(), "Starting flow");
                self.wizard = Some(wizard);
                self.screen = Screen::Wizard;
            }
            None => self.show_error("No previous generation found"),
        }
    }

    /// Start a flow on the newest generation, re-read from disk.
    pub(crate) fn start_flow_on_last(&mut self, flow: Flow) {
        self.history = self.store.load_history();
        let source = if flow.needs_source() {
            self.history.last().cloned()
        } else {
            None
        };
        self.start_flow(flow, source);
    }

    pub(crate) fn go_home(&mut self) {
        self.wizard = None;
        self.screen = Screen::Home;
    }

    pub(crate) fn open_image(&mut self, path: &Path) {
        if let Err(e) = image::open(path) {
            self.show_error(e.to_string());
        }
    }
}

/// Map a key to wizard input.
fn wizard_input(key: KeyEvent) -> Option<Input> {
    match key.code {
        KeyCode::Char(c) => Some(Input::Char(c)),
        KeyCode::Backspace => Some(Input::Backspace),
        KeyCode::Enter => Some(Input::Enter),
        KeyCode::Esc => Some(Input::Esc),
        KeyCode::Up => Some(Input::Up),
        KeyCode::Down => Some(Input::Down),
        KeyCode::Left => Some(Input::Left),
        KeyCode::Right => Some(Input::Right),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use falcon_core::{AspectRatio, Resolution};
    use std::path::PathBuf;
    use tempfile::TempDir;

    pub(super) fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    pub(super) fn test_app() -> (TempDir, App) {
        let tmp = TempDir::new().unwrap();
        let store = Store::open(tmp.path().join(".falcon"), tmp.path().join(".falconrc")).unwrap();
        let config = store.load_config();
        let app = App::new(store, config, "http://127.0.0.1:9");
        (tmp, app)
    }

    pub(super) fn record(app: &mut App, prompt: &str) {
        let generation = Generation::new(
            prompt,
            "banana",
            AspectRatio::Square,
            Resolution::TwoK,
            PathBuf::from(format!("/tmp/{}.png", prompt)),
            0.15,
        );
        app.history = app.store.append_generation(generation).unwrap();
    }

    #[test]
    fn test_ctrl_c_quits() {
        let (_tmp, mut app) = test_app();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn test_banner_expires() {
        let (_tmp, mut app) = test_app();
        app.show_error("boom");
        app.tick();
        assert_eq!(app.error_message(), Some("boom"));

        app.error = Some(("boom".to_string(), Instant::now() - BANNER_TIMEOUT));
        app.tick();
        assert_eq!(app.error_message(), None);
    }

    #[test]
    fn test_confirmed_job_is_queued_and_keys_ignored() {
        let (_tmp, mut app) = test_app();
        app.start_flow(Flow::Generate, None);
        for c in "fox".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Enter)); // prompt
        app.handle_key(key(KeyCode::Enter)); // defaults
        app.handle_key(key(KeyCode::Enter)); // confirm
        assert!(app.has_pending());

        // Keys are dropped while the job is pending
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.screen, Screen::Wizard);
    }

    #[tokio::test]
    async fn test_failed_job_returns_home_with_banner() {
        let (_tmp, mut app) = test_app();
        // Nothing listens on the discard port, so the request fails
        app.config.api_key = Some("test-key".to_string());
        app.start_flow(Flow::Generate, None);
        if let Some(wizard) = app.wizard.as_mut() {
            wizard.choices.prompt = "fox".to_string();
        }
        app.pending = app.wizard.as_ref().and_then(|w| w.build_job());
        assert!(app.has_pending());

        app.run_pending().await;
        assert!(!app.has_pending());
        assert_eq!(app.screen, Screen::Home);
        assert!(app.wizard.is_none());
        assert!(app.error_message().is_some());
        assert!(app.history.is_empty());
    }
}
