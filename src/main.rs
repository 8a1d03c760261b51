mod accounts;
mod app;
mod biometric;
mod config;
mod constants;
mod display;
mod feed;
mod filters;
mod graphics;
mod input;
mod pixabay;
mod session;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use directories::ProjectDirs;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use app::App;
use config::Config;
use display::{CliDisplayMode, DisplayMode};
use graphics::{kitty_delete_all, kitty_render_image, sixel_render_image};
use session::SessionStore;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Display mode: 'auto', 'kitty', 'sixel', 'blocks', or 'ascii' (default: auto-detect)
  #[arg(short, long, default_value = "auto")]
  display_mode: CliDisplayMode,

  /// Pixabay API key (falls back to `api_key` in prefs.toml)
  #[arg(long, env = "PIXABAY_API_KEY", hide_env_values = true)]
  api_key: Option<String>,

  /// Log level used when PIXELS_LOG is not set
  #[arg(long, default_value = "info")]
  log_level: String,

  /// Print shell completions and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<Shell>,
}

// --- Logging ---

/// Log to a daily file in the cache dir; the terminal belongs to the UI.
fn init_tracing(level: &str) -> Option<WorkerGuard> {
  let dirs = ProjectDirs::from("", "", "pixels")?;
  let log_dir = dirs.cache_dir().join("logs");
  std::fs::create_dir_all(&log_dir).ok()?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "pixels.log"));
  let filter = EnvFilter::try_from_env("PIXELS_LOG").unwrap_or_else(|_| EnvFilter::new(level));
  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .with(filter)
    .try_init()
    .ok()?;
  Some(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    let mut cmd = Args::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
    return Ok(());
  }

  let _guard = init_tracing(&args.log_level);
  info!(version = env!("CARGO_PKG_VERSION"), "starting");

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, args).await;
  ratatui::restore();
  result
}

async fn run(terminal: &mut DefaultTerminal, args: Args) -> Result<()> {
  let display_mode = display::resolve_display_mode(args.display_mode);
  let config = Config::load();
  let api_key = args.api_key.or_else(|| config.api_key.clone()).unwrap_or_default();
  let session = SessionStore::default_location();
  if let Some(ref store) = session {
    info!(path = %store.path().display(), "session store");
  }
  info!(mode = display_mode.label(), has_key = !api_key.is_empty(), "display and key resolved");

  let mut app = App::new(display_mode, config, api_key, session);
  let uses_graphics_protocol = display_mode.is_graphics_protocol();

  loop {
    app.check_pending();
    app.expire_error();

    terminal.draw(|frame| ui::ui(frame, &mut app)).context("Failed to draw frame")?;
    app.sync_scroll();

    if uses_graphics_protocol {
      if let Some(area) = app.gfx.preview_area {
        if let Some((id, image)) = app.visible_image() {
          let key = (id, area);
          if app.gfx.last_sent != Some(key) {
            if display_mode == DisplayMode::Kitty {
              kitty_delete_all()?;
            }
            match display_mode {
              DisplayMode::Kitty => kitty_render_image(image, area)?,
              DisplayMode::Sixel => sixel_render_image(image, area)?,
              _ => {}
            }
            app.gfx.last_sent = Some(key);
          }
        }
      } else if app.gfx.last_sent.is_some() {
        if display_mode == DisplayMode::Kitty {
          kitty_delete_all()?;
        }
        app.gfx.last_sent = None;
      }
    }

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key);
        }
        Event::Resize(..) => app.gfx.invalidate(),
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  if display_mode == DisplayMode::Kitty {
    kitty_delete_all()?;
  }
  info!("shutting down");
  Ok(())
}
