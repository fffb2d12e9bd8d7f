use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use crossterm::{
    event::EventStream,
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use xcconsole::app::{App, TICK_INTERVAL};
use xcconsole::config::Config;
use xcconsole::context;
use xcconsole::effects;
use xcconsole::error::Result;
use xcconsole::event::Action;
use xcconsole::logging::init_tracing;
use xcconsole::tui::Renderer;

#[derive(Parser, Debug)]
#[command(
    name = "xcconsole",
    author,
    version,
    about = "Build, run and test Xcode projects with a live TUI console",
    long_about = None
)]
struct Args {
    /// Configuration file (defaults to ./.xcconsole.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Workspace or project to build
    #[arg(short, long)]
    project: Option<String>,

    /// Scheme to build
    #[arg(short, long)]
    scheme: Option<String>,

    /// Maximum lines kept in the stream and phase buffers
    #[arg(short = 'm', long)]
    max_lines: Option<usize>,

    /// Operation to start once the project context is loaded
    #[arg(value_enum)]
    action: Option<Action>,
}

/// Load the configuration and apply command line overrides
fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(project) = &args.project {
        config.project.path = project.clone();
    }
    if let Some(scheme) = &args.scheme {
        config.project.scheme = scheme.clone();
    }
    if let Some(max_lines) = args.max_lines {
        config.buffer.max_lines = max_lines;
    }
    config.validate()?;
    Ok(config)
}

/// Initialize the terminal for TUI
fn init_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

/// Restore the terminal to its original state
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}

/// Run the application
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
) -> io::Result<()> {
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        // Update visible rows based on terminal size
        let size = terminal.size()?;
        app.set_content_rows(Renderer::content_rows(size.height));

        terminal.draw(|frame| Renderer::render(frame, &app))?;

        let Some(message) = app.next_message(&mut events, &mut ticker).await else {
            break;
        };
        if let Some(intent) = app.update(message) {
            effects::run(intent, &app.config().editor);
        }

        if app.should_quit() {
            break;
        }
    }

    app.shutdown().await;
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let _guard = init_tracing(&config.log)?;
    info!(project = %config.project.path, scheme = %config.project.scheme, "starting");

    let mut app = App::new(config);
    app.set_context_receiver(context::spawn(app.config().project.clone()));
    app.set_pending_action(args.action);

    let mut terminal = init_terminal()?;
    let result = run_app(&mut terminal, app).await;
    restore_terminal(&mut terminal)?;

    if let Err(err) = &result {
        error!(error = %err, "console exited with error");
    }
    Ok(result?)
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("xcconsole: {err}");
            ExitCode::FAILURE
        }
    }
}
