mod app;
mod components;
mod config;
mod engine;
mod error;
mod event;
mod fs;
mod handler;
mod logging;
mod tui;
mod ui;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use crate::app::App;
use crate::config::{AppConfig, FilterConfig, SessionState};
use crate::engine::{Engine, EngineOptions};
use crate::error::AppError;
use crate::event::{Event, EventHandler};
use crate::fs::gateway::DiskGateway;
use crate::tui::{install_panic_hook, Tui};

/// Browse a project tree and pick files with cascading checkboxes.
#[derive(Parser, Debug)]
#[command(name = "pp", version, about)]
struct Cli {
    /// Root folder (defaults to the last session's root, then the configured
    /// default path, then the current directory)
    path: Option<PathBuf>,

    /// Path to a config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Hide files with this extension after loading (repeatable)
    #[arg(long = "disable-ext", value_name = "EXT")]
    disable_ext: Vec<String>,

    /// Do not write log files
    #[arg(long)]
    no_log: bool,

    /// Print the selected files to stdout on exit
    #[arg(long)]
    print_selection: bool,
}

impl Cli {
    fn overrides(&self) -> AppConfig {
        AppConfig {
            filter: FilterConfig {
                disabled_extensions: (!self.disable_ext.is_empty())
                    .then(|| self.disable_ext.clone()),
                ..FilterConfig::default()
            },
            ..AppConfig::default()
        }
    }
}

/// Pick the root: explicit path, else the remembered one if it still
/// exists, else the configured default, else `.`.
fn resolve_root(
    cli_path: Option<&Path>,
    config: &AppConfig,
    session: &SessionState,
) -> error::Result<PathBuf> {
    let candidate = match cli_path {
        Some(path) => path.to_path_buf(),
        None => {
            let remembered = session
                .last_root
                .clone()
                .filter(|p| config.restore_last_root() && p.is_dir());
            remembered
                .or_else(|| config.default_path().filter(|p| p.is_dir()))
                .unwrap_or_else(|| PathBuf::from("."))
        }
    };
    let path = candidate.canonicalize().map_err(|_| {
        AppError::InvalidPath(format!("{} does not exist", candidate.display()))
    })?;
    if !path.is_dir() {
        return Err(AppError::InvalidPath(format!(
            "{} is not a directory",
            path.display()
        )));
    }
    Ok(path)
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));

    let _log_guard = if cli.no_log {
        None
    } else {
        logging::init(config.log_dir(), config.log_level())
    };

    let session_path = SessionState::default_path();
    let session = session_path
        .as_deref()
        .map(SessionState::load_from)
        .unwrap_or_default();

    let root = resolve_root(cli.path.as_deref(), &config, &session)?;
    let options = EngineOptions {
        dirs_first: config.dirs_first(),
        disabled_extensions: config.disabled_extensions(),
    };
    let engine = Engine::new(
        Box::new(DiskGateway::new(config.ignore_dirs())),
        options,
        &root,
    )?;

    install_panic_hook();

    let mut tui = Tui::new()?;
    let mut app = App::new(engine, config.confirm_delete());
    let mut events = EventHandler::new(Duration::from_millis(250));

    loop {
        tui.terminal_mut().draw(|frame| {
            ui::render(&mut app, frame);
        })?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&mut app, key),
            Event::Tick => app.clear_expired_status(),
            Event::Resize(_, _) => {}
        }

        if app.should_quit {
            break;
        }
    }

    tui.restore()?;

    if let Some(path) = session_path {
        let state = SessionState {
            last_root: Some(app.engine.root_path().to_path_buf()),
        };
        if let Err(e) = state.save_to(&path) {
            tracing::warn!(path = %path.display(), error = %e, "could not save session");
        }
    }

    if cli.print_selection {
        for file in app.engine.selection().selected_files() {
            println!("{}", file.display());
        }
    }

    tracing::info!(
        selected = app.engine.selection().len(),
        "exiting"
    );
    Ok(())
}
