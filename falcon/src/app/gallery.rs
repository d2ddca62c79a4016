use super::*;

impl App {
    /// Handle keyboard input in the gallery.
    pub(super) fn handle_gallery_key(&mut self, key: KeyEvent) {
        let count = self.history.len();
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.screen = Screen::Home;
            }
            KeyCode::Down | KeyCode::Char('j') if count > 0 => {
                self.gallery_index = (self.gallery_index + 1).min(count - 1);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.gallery_index = self.gallery_index.saturating_sub(1);
            }
            KeyCode::Right | KeyCode::PageDown if count > 0 => {
                self.gallery_index = (self.gallery_index + GALLERY_PAGE_SIZE).min(count - 1);
            }
            KeyCode::Left | KeyCode::PageUp => {
                self.gallery_index = self.gallery_index.saturating_sub(GALLERY_PAGE_SIZE);
            }
            KeyCode::Enter => {
                if let Some(generation) = self.selected_generation() {
                    let path = generation.output.clone();
                    self.open_image(&path);
                }
            }
            KeyCode::Char('e') => self.start_flow_on_selected(Flow::Edit),
            KeyCode::Char('v') => self.start_flow_on_selected(Flow::Variations),
            KeyCode::Char('u') => self.start_flow_on_selected(Flow::Upscale),
            KeyCode::Char('b') => self.start_flow_on_selected(Flow::RemoveBackground),
            _ => {}
        }
    }

    pub fn selected_generation(&self) -> Option<&Generation> {
        self.history.newest_first().nth(self.gallery_index)
    }

    /// Zero-based page of the current selection.
    pub fn gallery_page(&self) -> usize {
        self.gallery_index / GALLERY_PAGE_SIZE
    }

    pub fn gallery_page_count(&self) -> usize {
        self.history.len().div_ceil(GALLERY_PAGE_SIZE).max(1)
    }

    fn start_flow_on_selected(&mut self, flow: Flow) {
        if let Some(source) = self.selected_generation().cloned() {
            self.start_flow(flow, Some(source));
        }
    }
}
