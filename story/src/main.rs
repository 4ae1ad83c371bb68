//! Branching story player for the terminal.
//!
//! Fetches the story graph for a user and walks it in a small TUI.
//!
//! # Headless Mode
//!
//! Run with `--headless` for a text-based interface suitable for scripted runs:
//!
//! ```bash
//! cargo run -p story -- --headless --user-id 279058397
//! ```

mod app;
mod events;
mod headless;
mod ui;

use std::fs::File;
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use story_core::{LoadError, Loader, StoryConfig, StorySession};
use storybot::Storybot;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, Session};
use events::{pump, EventResult};
use ui::render::render;

/// Log file used while the alternate screen owns the terminal.
const TUI_LOG_FILE: &str = "story.log";

/// Flags layered on top of `StoryConfig::from_env`.
#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    headless: bool,
    debug: bool,
    help: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mut config = StoryConfig::from_env();
    let cli = parse_args(&args, &mut config);

    if cli.help {
        print_help();
        return Ok(());
    }

    setup_logging(cli.headless, cli.debug)?;
    info!(base_url = %config.base_url, headless = cli.headless, "starting story player");

    let session = load_session(&config).await?;

    if cli.headless {
        headless::run_headless(session, &config.base_url).await?;
        return Ok(());
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, App::new(session, config.base_url.clone()));

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;

    result.context("story UI failed")
}

/// Build the session and load the graph.
///
/// Load failures are logged and the player starts with an empty story.
async fn load_session(config: &StoryConfig) -> anyhow::Result<Session> {
    let client = Storybot::new(&config.base_url).context("failed to create backend client")?;
    let mut loader = Loader::new(client);
    let mut session = StorySession::new(config.position_store(), config.settle_delay);

    match session.bootstrap(&mut loader, config.identity().as_ref()).await {
        Ok(Some(start)) => info!(%start, "story ready"),
        Ok(None) => warn!("story graph is empty"),
        Err(LoadError::NoIdentity) => {
            eprintln!("No user id: pass --user-id, --init-data or --query, or set STORY_USER_ID.");
        }
        Err(e) => eprintln!("Could not load the story: {e}"),
    }

    Ok(session)
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| render(f, &app))?;

        // Poll for events with timeout for animations
        let ev = if event::poll(Duration::from_millis(100))? {
            Some(event::read()?)
        } else {
            None
        };
        if pump(&mut app, ev) == EventResult::Quit {
            return Ok(());
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Apply command-line flags over the environment configuration.
fn parse_args(args: &[String], config: &mut StoryConfig) -> CliArgs {
    let mut cli = CliArgs::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--headless" => cli.headless = true,
            "--debug" => cli.debug = true,
            "-h" | "--help" => cli.help = true,
            "--user-id" => {
                if let Some(id) = args.get(i + 1) {
                    config.user_id = Some(id.clone());
                    i += 1;
                }
            }
            "--init-data" => {
                if let Some(data) = args.get(i + 1) {
                    config.init_data = Some(data.clone());
                    i += 1;
                }
            }
            "--query" => {
                if let Some(query) = args.get(i + 1) {
                    config.query = Some(query.clone());
                    i += 1;
                }
            }
            "--position-file" => {
                if let Some(path) = args.get(i + 1) {
                    config.position_path = Some(PathBuf::from(path));
                    i += 1;
                }
            }
            "--settle-ms" => {
                if let Some(ms) = args.get(i + 1).and_then(|v| v.parse::<u64>().ok()) {
                    config.settle_delay = Duration::from_millis(ms);
                    i += 1;
                }
            }
            "--base-url" => {
                if let Some(url) = args.get(i + 1) {
                    config.base_url = url.clone();
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    cli
}

/// Logs go to stderr in headless mode and to a file under the TUI.
fn setup_logging(headless: bool, debug: bool) -> anyhow::Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    if headless {
        let layer = fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_filter(filter);
        tracing_subscriber::registry().with(layer).try_init()?;
    } else {
        let file = File::create(TUI_LOG_FILE)
            .with_context(|| format!("failed to create {TUI_LOG_FILE}"))?;
        let layer = fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_filter(filter);
        tracing_subscriber::registry().with(layer).try_init()?;
    }

    Ok(())
}

fn print_help() {
    println!("story - branching story player");
    println!();
    println!("USAGE:");
    println!("  story [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help              Show this help message");
    println!("  --headless              Run in headless mode (text-only, no TUI)");
    println!("  --user-id <ID>          User to load the story for");
    println!("  --init-data <QUERY>     Mini-app init data; its user id wins over --user-id");
    println!("  --query <QUERY>         Launch URL query; its user_id comes after init data");
    println!("  --position-file <PATH>  Remember the position across runs");
    println!("  --settle-ms <MS>        Delay before a choice takes effect (default: 700)");
    println!("  --base-url <URL>        Backend host");
    println!("  --debug                 Verbose logging");
    println!();
    println!("ENVIRONMENT:");
    println!("  STORYBOT_BASE_URL, STORY_USER_ID, STORY_INIT_DATA, STORY_QUERY,");
    println!("  STORY_SETTLE_MS, STORY_POSITION_FILE, RUST_LOG");
    println!();
    println!("EXAMPLES:");
    println!("  story --user-id 279058397                 # Interactive TUI mode");
    println!("  story --headless --user-id 279058397      # Headless");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("story")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_args_flags() {
        let mut config = StoryConfig::new();
        let cli = parse_args(&args(&["--headless", "--debug"]), &mut config);
        assert_eq!(
            cli,
            CliArgs {
                headless: true,
                debug: true,
                help: false
            }
        );
    }

    #[test]
    fn test_parse_args_overrides_config() {
        let mut config = StoryConfig::new().with_user_id("1");
        parse_args(
            &args(&[
                "--user-id",
                "42",
                "--settle-ms",
                "0",
                "--position-file",
                "pos.json",
                "--query",
                "?user_id=7",
            ]),
            &mut config,
        );
        assert_eq!(config.query.as_deref(), Some("?user_id=7"));

        assert_eq!(config.user_id.as_deref(), Some("42"));
        assert_eq!(config.settle_delay, Duration::ZERO);
        assert_eq!(config.position_path, Some(PathBuf::from("pos.json")));
    }

    #[test]
    fn test_parse_args_ignores_bad_settle() {
        let mut config = StoryConfig::new();
        parse_args(&args(&["--settle-ms", "soon"]), &mut config);
        assert_eq!(config.settle_delay, story_core::DEFAULT_SETTLE_DELAY);
    }
}
