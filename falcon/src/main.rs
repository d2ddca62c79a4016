//! falcon - fal.ai image generation from the terminal
//!
//! With arguments, runs one command (generate, edit, vary, upscale, remove
//! background, show last). Without arguments, opens the interactive studio.

mod app;
mod cli;
mod preset;
mod ui;
mod validate;
mod wizard;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use falcon_core::api::DEFAULT_BASE_URL;
use falcon_core::{FalconConfig, Store};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::app::App;

/// Overrides the fal.ai host, e.g. for a local mock.
const API_URL_ENV: &str = "FALCON_API_URL";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let store = Store::open_default().context("failed to open ~/.falcon")?;
    let config = store.load_config();

    // Log to file only; the terminal belongs to the CLI output or the studio
    let _log_guard = falcon_core::logging::init(&store.logs_dir(), &config.log_level)
        .context("failed to initialize logging")?;

    let base_url = std::env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

    if std::env::args_os().len() <= 1 {
        tracing::info!("falcon studio starting up");
        let result = run_studio(store, config, base_url).await;
        tracing::info!("falcon studio shutting down");
        return result;
    }

    let args = match cli::Args::try_parse() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            tracing::debug!(error = %e, "Invalid arguments");
            let _ = e.print();
            std::process::exit(1);
        }
    };
    tracing::info!(?args, "falcon command");
    let ctx = cli::CommandEnv {
        store,
        config,
        base_url,
        cwd: std::env::current_dir().context("failed to read current directory")?,
    };
    cli::run(args, &ctx).await
}

async fn run_studio(store: Store, config: FalconConfig, base_url: String) -> Result<()> {
    let mut app = App::new(store, config, base_url);

    // Setup terminal
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal")?;

    // Run the main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;

    result
}

/// Run the studio loop.
async fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|frame| ui::render(frame, app))?;

        // A confirmed job runs to completion before keys are read again
        if app.has_pending() {
            app.run_pending().await;
            drain_events()?;
            continue;
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            break;
        }

        // Lets background tasks such as viewer reapers run
        tokio::task::yield_now().await;
    }

    Ok(())
}

/// Discard keys typed while a job was running.
fn drain_events() -> Result<()> {
    while event::poll(Duration::ZERO)? {
        event::read()?;
    }
    Ok(())
}
