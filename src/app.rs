use anyhow::Result;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::constants::constants;
use crate::error::{FetchError, Notice};
use crate::fetcher::{Page, PageFetcher};
use crate::pagination::{PageOutcome, PageRequest, PaginationCoordinator};
use crate::playback::{Navigation, PlaybackController, Recovery};
use crate::player::{Embed, PlayerSignal, watch_url};
use crate::queue::{FetchState, QueueStore};
use crate::theme::{self, THEMES};

// --- Types ---

pub type PageResult = Result<Page, FetchError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  /// The topic box has focus; arrow keys edit text.
  Input,
  /// Arrow keys navigate the queue.
  Player,
}

/// What the status line shows, highest priority first.
#[derive(Debug, PartialEq, Eq)]
pub enum Status<'a> {
  Busy(&'static str),
  Notice(&'a Notice),
  Error(&'a str),
  Position { index: usize, total: usize },
  Prompt,
}

/// A page request on its way to the backend.
pub(crate) struct PendingPage {
  request: PageRequest,
  rx: oneshot::Receiver<PageResult>,
}

/// In-flight async task receivers.
#[derive(Default)]
pub(crate) struct AsyncTasks {
  pub(crate) search: Option<PendingPage>,
  pub(crate) more: Option<PendingPage>,
}

pub struct App<E: Embed> {
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub mode: AppMode,
  pub theme_index: usize,
  pub queue: QueueStore,
  pub playback: PlaybackController<E>,
  pub pagination: PaginationCoordinator,
  pub notice: Option<Notice>,
  pub last_error: Option<String>,
  pub should_quit: bool,
  fetcher: PageFetcher,
  player_rx: mpsc::UnboundedReceiver<PlayerSignal>,
  pub(crate) tasks: AsyncTasks,
  config: Config,
  /// When the last error was set; used for auto-dismiss.
  error_time: Option<Instant>,
}

impl<E: Embed> App<E> {
  pub fn new(
    embed: E,
    player_rx: mpsc::UnboundedReceiver<PlayerSignal>,
    fetcher: PageFetcher,
    config: Config,
    grace: Duration,
  ) -> Self {
    let theme_index = config.theme_name.as_deref().and_then(theme::index_of).unwrap_or(0);
    Self {
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      mode: AppMode::Input,
      theme_index,
      queue: QueueStore::new(),
      playback: PlaybackController::new(embed, grace),
      pagination: PaginationCoordinator::new(constants().max_duplicate_pages),
      notice: None,
      last_error: None,
      should_quit: false,
      fetcher,
      player_rx,
      tasks: AsyncTasks::default(),
      config,
      error_time: None,
    }
  }

  pub fn theme(&self) -> &'static theme::Theme {
    // theme_index is bounded by index_of() on load and modular arithmetic in next_theme().
    &THEMES[self.theme_index]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.config.theme_name = Some(self.theme().name.to_string());
    self.config.save();
  }

  pub fn backend_url(&self) -> &str {
    self.fetcher.base_url()
  }

  // --- Transient errors ---

  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(constants().error_display_secs)
    {
      self.clear_error();
    }
  }

  pub fn status(&self) -> Status<'_> {
    match self.queue.fetch_state() {
      FetchState::Searching => return Status::Busy("Searching for videos…"),
      FetchState::LoadingMore => return Status::Busy("Loading more videos…"),
      FetchState::Idle => {}
    }
    if let Some(notice) = &self.notice {
      return Status::Notice(notice);
    }
    if let Some(err) = &self.last_error {
      return Status::Error(err);
    }
    match self.queue.cursor() {
      Some(i) => Status::Position { index: i + 1, total: self.queue.len() },
      None => Status::Prompt,
    }
  }

  // --- Search ---

  /// Start a search for the topic in the input box. Blank topics and
  /// submissions during an in-flight search are ignored.
  pub fn submit_search(&mut self) {
    let topic = self.input.trim().to_string();
    if self.queue.start_search(&topic).is_none() {
      return;
    }
    info!(topic = %topic, "search triggered");
    self.playback.stop();
    self.notice = None;
    self.clear_error();
    // Any continuation fetch belongs to the old topic.
    self.tasks.more = None;

    let request = self.pagination.first_page(&self.queue);
    self.tasks.search = Some(self.spawn_fetch(request));
    self.mode = AppMode::Player;
  }

  /// Put `topic` in the input box and search for it.
  pub fn fill_search(&mut self, topic: &str) {
    self.input = topic.to_string();
    self.cursor_position = self.input.chars().count();
    self.input_scroll = 0;
    self.submit_search();
  }

  pub fn search_suggestion(&mut self, slot: usize) {
    if let Some(topic) = constants().suggestions.get(slot) {
      self.fill_search(topic);
    }
  }

  fn spawn_fetch(&self, request: PageRequest) -> PendingPage {
    let fetcher = self.fetcher.clone();
    let topic = request.topic.clone();
    let token = request.page_token.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(fetcher.fetch(&topic, token.as_deref()).await);
    });
    PendingPage { request, rx }
  }

  pub fn on_search_result(&mut self, request: &PageRequest, result: PageResult) {
    let outcome = self.pagination.on_first_page(&mut self.queue, request, result);
    self.apply_outcome(outcome);
  }

  pub fn on_page_result(&mut self, request: &PageRequest, result: PageResult) {
    let outcome = self.pagination.on_page(&mut self.queue, request, result);
    self.apply_outcome(outcome);
  }

  fn apply_outcome(&mut self, outcome: PageOutcome) {
    match outcome {
      PageOutcome::PlayFrom(index) => {
        if self.load_index(index) {
          self.notice = None;
        }
      }
      PageOutcome::FetchMore(request) => self.tasks.more = Some(self.spawn_fetch(request)),
      PageOutcome::NoResults => self.notice = Some(Notice::NoResults),
      PageOutcome::Failed(notice) => self.notice = Some(notice),
      PageOutcome::Discarded => {}
    }
  }

  /// Returns whether a player is now bound.
  fn load_index(&mut self, index: usize) -> bool {
    match self.playback.load(&mut self.queue, index) {
      Ok(loaded) => loaded.is_some(),
      Err(e) => {
        warn!(err = %e, "playback: load failed");
        self.set_error(format!("Playback error: {:#}", e));
        false
      }
    }
  }

  // --- Playback ---

  pub fn on_player_signal(&mut self, signal: PlayerSignal, now: Instant) {
    let result = self.playback.on_signal(&mut self.queue, signal, now);
    self.handle_recovery(result);
  }

  pub fn tick(&mut self, now: Instant) {
    let result = self.playback.tick(&mut self.queue, now);
    self.handle_recovery(result);
  }

  fn handle_recovery(&mut self, result: Result<Option<Recovery>>) {
    match result {
      Ok(Some(Recovery::Exhausted)) => self.notice = Some(Notice::QueueExhausted),
      Ok(Some(Recovery::Reloaded(index))) => debug!(index, remaining = self.queue.len(), "recovered"),
      Ok(None) => {}
      Err(e) => self.set_error(format!("Playback error: {:#}", e)),
    }
  }

  pub fn next_video(&mut self) {
    let result = self.playback.advance(&mut self.queue, &mut self.pagination);
    self.handle_navigation(result);
  }

  pub fn prev_video(&mut self) {
    let result = self.playback.retreat(&mut self.queue);
    self.handle_navigation(result);
  }

  fn handle_navigation(&mut self, result: Result<Navigation>) {
    match result {
      Ok(Navigation::Loaded(_)) => {
        self.notice = None;
        self.clear_error();
      }
      Ok(Navigation::Fetching(request)) => {
        self.notice = None;
        self.tasks.more = Some(self.spawn_fetch(request));
      }
      Ok(Navigation::Ignored) => {}
      Err(e) => self.set_error(format!("Playback error: {:#}", e)),
    }
  }

  /// Open the current video on youtube.com in the default browser.
  pub fn open_in_browser(&mut self) {
    let Some(video_id) = self.playback.current_video() else { return };
    let url = watch_url(video_id);
    #[cfg(target_os = "macos")]
    let cmd = "open";
    #[cfg(not(target_os = "macos"))]
    let cmd = "xdg-open";
    match std::process::Command::new(cmd)
      .arg(&url)
      .stdin(std::process::Stdio::null())
      .stdout(std::process::Stdio::null())
      .stderr(std::process::Stdio::null())
      .spawn()
    {
      Ok(mut child) => {
        // Reap the child in a background thread to avoid zombie processes.
        std::thread::spawn(move || {
          let _ = child.wait();
        });
      }
      Err(e) => self.set_error(format!("Failed to open browser: {}", e)),
    }
  }

  // --- Event polling ---

  /// Drain finished fetches and player signals, then fire due timers.
  pub fn check_pending(&mut self, now: Instant) {
    if let Some(mut pending) = self.tasks.search.take() {
      match pending.rx.try_recv() {
        Ok(result) => self.on_search_result(&pending.request, result),
        Err(oneshot::error::TryRecvError::Empty) => self.tasks.search = Some(pending),
        Err(oneshot::error::TryRecvError::Closed) => {
          self.queue.finish_fetch();
          self.notice = Some(Notice::FetchFailure("search task failed".to_string()));
        }
      }
    }

    if let Some(mut pending) = self.tasks.more.take() {
      match pending.rx.try_recv() {
        Ok(result) => self.on_page_result(&pending.request, result),
        Err(oneshot::error::TryRecvError::Empty) => self.tasks.more = Some(pending),
        Err(oneshot::error::TryRecvError::Closed) => {
          if pending.request.generation == self.queue.generation() {
            self.queue.finish_fetch();
          }
        }
      }
    }

    while let Ok(signal) = self.player_rx.try_recv() {
      self.on_player_signal(signal, now);
    }

    self.tick(now);
  }
}
