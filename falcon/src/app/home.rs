use super::*;

impl App {
    /// Handle keyboard input on the home menu.
    pub(super) fn handle_home_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.home_index = (self.home_index + 1) % HOME_ITEMS.len();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.home_index = (self.home_index + HOME_ITEMS.len() - 1) % HOME_ITEMS.len();
            }
            KeyCode::Char('g') => self.activate(HomeItem::Gallery),
            KeyCode::Char('s') => self.activate(HomeItem::Settings),
            KeyCode::Enter => {
                if let Some(item) = HOME_ITEMS.get(self.home_index).copied() {
                    self.activate(item);
                }
            }
            _ => {}
        }
    }

    /// Whether a home entry can be chosen right now.
    pub fn home_item_enabled(&self, item: HomeItem) -> bool {
        !item.needs_history() || !self.history.is_empty()
    }

    fn activate(&mut self, item: HomeItem) {
        if !self.home_item_enabled(item) {
            return;
        }
        match item {
            HomeItem::Generate => self.start_flow(Flow::Generate, None),
            HomeItem::EditLast => self.start_flow_on_last(Flow::Edit),
            HomeItem::Variations => self.start_flow_on_last(Flow::Variations),
            HomeItem::Upscale => self.start_flow_on_last(Flow::Upscale),
            HomeItem::RemoveBackground => self.start_flow_on_last(Flow::RemoveBackground),
            HomeItem::Gallery => {
                self.history = self.store.load_history();
                self.gallery_index = 0;
                self.screen = Screen::Gallery;
            }
            HomeItem::Settings => self.open_settings(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{key, record, test_app};
    use super::*;

    #[test]
    fn test_history_items_ignored_when_empty() {
        let (_tmp, mut app) = test_app();
        app.home_index = 1; // Edit Last
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.screen, Screen::Home);
        assert!(!app.home_item_enabled(HomeItem::Upscale));

        record(&mut app, "fox");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.screen, Screen::Wizard);
        let wizard = app.wizard.as_ref().unwrap();
        assert_eq!(wizard.flow, Flow::Edit);
        assert_eq!(wizard.source.as_ref().unwrap().prompt, "fox");
    }

    #[test]
    fn test_navigation_wraps_and_quits() {
        let (_tmp, mut app) = test_app();
        app.handle_key(key(KeyCode::Up));
        assert_eq!(HOME_ITEMS[app.home_index], HomeItem::Settings);
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.screen, Screen::Settings);

        app.screen = Screen::Home;
        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }
}
