use super::*;

impl App {
    pub(super) fn open_settings(&mut self) {
        self.settings = SettingsState {
            index: 0,
            draft: self.config.clone(),
            key_input: None,
        };
        self.screen = Screen::Settings;
    }

    /// Handle keyboard input in settings.
    pub(super) fn handle_settings_key(&mut self, key: KeyEvent) {
        if self.settings.key_input.is_some() {
            self.handle_key_input(key);
            return;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.screen = Screen::Home;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.settings.index = (self.settings.index + 1) % SETTINGS_ROWS.len();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.settings.index =
                    (self.settings.index + SETTINGS_ROWS.len() - 1) % SETTINGS_ROWS.len();
            }
            KeyCode::Enter | KeyCode::Right | KeyCode::Char(' ') => self.change_setting(true),
            KeyCode::Left => self.change_setting(false),
            KeyCode::Char('s') => self.save_settings(),
            _ => {}
        }
    }

    /// Typing a new API key. Enter keeps it, Esc discards it.
    fn handle_key_input(&mut self, key: KeyEvent) {
        let Some(input) = self.settings.key_input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Enter => {
                let typed = input.trim().to_string();
                if !typed.is_empty() {
                    self.settings.draft.api_key = Some(typed);
                }
                self.settings.key_input = None;
            }
            KeyCode::Esc => {
                self.settings.key_input = None;
            }
            _ => {}
        }
    }

    fn change_setting(&mut self, forward: bool) {
        let Some(row) = SETTINGS_ROWS.get(self.settings.index).copied() else {
            return;
        };
        let draft = &mut self.settings.draft;
        match row {
            SettingsRow::DefaultModel => {
                let next = cycle_in(&models::generation_models(), draft.default_model.as_str(), forward);
                draft.default_model = next.to_string();
            }
            SettingsRow::DefaultAspect => {
                draft.default_aspect = cycle_in(&ASPECT_RATIOS, draft.default_aspect, forward);
            }
            SettingsRow::DefaultResolution => {
                draft.default_resolution = cycle_in(&RESOLUTIONS, draft.default_resolution, forward);
            }
            SettingsRow::Upscaler => {
                let next = cycle_in(&models::upscalers(), draft.upscaler.as_str(), forward);
                draft.upscaler = next.to_string();
            }
            SettingsRow::BackgroundRemover => {
                let next = cycle_in(&models::background_removers(), draft.background_remover.as_str(), forward);
                draft.background_remover = next.to_string();
            }
            SettingsRow::OpenAfterGenerate => {
                draft.open_after_generate = !draft.open_after_generate;
            }
            SettingsRow::LogLevel => {
                let next = cycle_in(&LOG_LEVELS, draft.log_level.as_str(), forward);
                draft.log_level = next.to_string();
            }
            SettingsRow::ApiKey => {
                self.settings.key_input = Some(String::new());
            }
        }
    }

    /// Persist only the fields that changed, then reload the merged config.
    fn save_settings(&mut self) {
        let patch = changed_fields(&self.config, &self.settings.draft);
        if patch == ConfigPatch::default() {
            self.screen = Screen::Home;
            return;
        }
        match self.store.save_config(&patch) {
            Ok(_) => {
                tracing::info!("Settings saved");
                self.config = self.store.load_config();
                self.screen = Screen::Home;
            }
            Err(e) => self.show_error(format!("Failed to save settings: {}", e)),
        }
    }

    /// Display value for a settings row.
    pub fn setting_value(&self, row: SettingsRow) -> String {
        let draft = &self.settings.draft;
        match row {
            SettingsRow::DefaultModel => models::display_name(&draft.default_model).to_string(),
            SettingsRow::DefaultAspect => draft.default_aspect.to_string(),
            SettingsRow::DefaultResolution => draft.default_resolution.to_string(),
            SettingsRow::Upscaler => models::display_name(&draft.upscaler).to_string(),
            SettingsRow::BackgroundRemover => {
                models::display_name(&draft.background_remover).to_string()
            }
            SettingsRow::OpenAfterGenerate => {
                let value = if draft.open_after_generate { "Yes" } else { "No" };
                value.to_string()
            }
            SettingsRow::ApiKey => match &self.settings.key_input {
                Some(typed) => "*".repeat(typed.chars().count()),
                None => draft
                    .api_key
                    .as_deref()
                    .map(mask_key)
                    .unwrap_or_else(|| "(not set)".to_string()),
            },
            SettingsRow::LogLevel => draft.log_level.clone(),
        }
    }
}

/// The fields of `draft` that differ from `current`.
fn changed_fields(current: &FalconConfig, draft: &FalconConfig) -> ConfigPatch {
    fn changed<T: PartialEq + Clone>(a: &T, b: &T) -> Option<T> {
        (a != b).then(|| b.clone())
    }

    ConfigPatch {
        api_key: if current.api_key != draft.api_key {
            draft.api_key.clone()
        } else {
            None
        },
        default_model: changed(&current.default_model, &draft.default_model),
        default_aspect: changed(&current.default_aspect, &draft.default_aspect),
        default_resolution: changed(&current.default_resolution, &draft.default_resolution),
        open_after_generate: changed(&current.open_after_generate, &draft.open_after_generate),
        upscaler: changed(&current.upscaler, &draft.upscaler),
        background_remover: changed(&current.background_remover, &draft.background_remover),
        log_level: changed(&current.log_level, &draft.log_level),
    }
}

/// Show the first 8 and last 4 characters of a key.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
