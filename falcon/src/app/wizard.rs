use super::*;

impl App {
    /// Forward keyboard input to the active wizard and act on its command.
    pub(super) fn handle_wizard_key(&mut self, key: KeyEvent) {
        let Some(input) = wizard_input(key) else {
            return;
        };
        let command = match self.wizard.as_mut() {
            Some(wizard) => wizard.handle(input),
            None => Command::Exit,
        };

        match command {
            Command::None => {}
            Command::Exit => self.go_home(),
            Command::Run(job) => {
                tracing::debug!(?job, "Job confirmed");
                self.pending = Some(job);
            }
            Command::StartFlow(flow) => self.start_flow_on_last(flow),
        }
    }
}
