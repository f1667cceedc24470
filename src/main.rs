mod app;
mod config;
mod constants;
mod error;
mod fetcher;
mod input;
mod pagination;
mod playback;
mod player;
mod queue;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::time::{Duration, Instant};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use app::App;
use config::Config;
use constants::constants;
use fetcher::PageFetcher;
use player::MpvEmbed;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Base URL of the search backend (default: prefs.toml, then the built-in address)
  #[arg(short, long)]
  backend: Option<String>,

  /// Play audio only; mpv opens no video window
  #[arg(short, long)]
  audio_only: bool,

  /// How long a video may sit unstarted before it is skipped, in milliseconds
  #[arg(long)]
  grace_ms: Option<u64>,
}

// --- Logging ---

/// Log to a daily file; the terminal belongs to the UI.
fn init_logging() -> Result<WorkerGuard> {
  let log_dir = ProjectDirs::from("", "", "shortfeed")
    .map(|dirs| dirs.data_dir().to_path_buf())
    .unwrap_or_else(std::env::temp_dir);
  std::fs::create_dir_all(&log_dir).with_context(|| format!("Failed to create log dir {}", log_dir.display()))?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "shortfeed.log"));
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shortfeed=info"));
  tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(writer).with_ansi(false)).init();
  Ok(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let _guard = init_logging()?;

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
  let config = Config::load();
  let backend_url = args
    .backend
    .or_else(|| config.backend_url.clone())
    .unwrap_or_else(|| constants().default_backend_url.clone());
  let grace = Duration::from_millis(args.grace_ms.or(config.skip_grace_ms).unwrap_or(constants().skip_grace_ms));
  let fetcher = PageFetcher::new(&backend_url).context("Failed to set up search backend")?;
  info!(backend = %backend_url, grace_ms = grace.as_millis() as u64, audio_only = args.audio_only, "starting");

  let (embed, player_rx) = MpvEmbed::new(args.audio_only);
  let mut app = App::new(embed, player_rx, fetcher, config, grace);

  loop {
    app.check_pending(Instant::now());
    app.expire_error();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key);
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  app.playback.stop();
  info!("exiting");
  Ok(())
}
