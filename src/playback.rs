//! Drives one embedded player at a time.
//!
//! The controller binds a player to the queue's current entry, watches the
//! signals it reports, and removes entries that turn out to be unplayable.
//! A stall is detected with a single `PendingSkip` deadline that belongs to
//! the handle that armed it; tearing the handle down always disarms it.

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::pagination::{PageRequest, PaginationCoordinator};
use crate::player::{Embed, PlayerEvent, PlayerSignal, PlayerState};
use crate::queue::{QueueStore, VideoId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
  Idle,
  Loading,
  Active,
  Stalled,
  Errored,
  /// Every entry was removed as unplayable; a new search is needed.
  Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unplayable {
  Stalled,
  Errored(i32),
}

/// Result of automatic recovery from an unplayable entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
  Reloaded(usize),
  Exhausted,
}

/// Result of manual navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
  Loaded(usize),
  /// The end of the queue was reached and a continuation page was requested.
  Fetching(PageRequest),
  Ignored,
}

struct PlaybackHandle<I> {
  video_id: VideoId,
  epoch: u64,
  _instance: I,
}

#[derive(Debug, Clone, Copy)]
struct PendingSkip {
  epoch: u64,
  deadline: Instant,
}

pub struct PlaybackController<E: Embed> {
  embed: E,
  handle: Option<PlaybackHandle<E::Instance>>,
  pending_skip: Option<PendingSkip>,
  state: PlaybackState,
  epoch: u64,
  grace: Duration,
}

impl<E: Embed> PlaybackController<E> {
  pub fn new(embed: E, grace: Duration) -> Self {
    Self { embed, handle: None, pending_skip: None, state: PlaybackState::Idle, epoch: 0, grace }
  }

  pub fn state(&self) -> PlaybackState {
    self.state
  }

  pub fn current_video(&self) -> Option<&str> {
    self.handle.as_ref().map(|h| h.video_id.as_str())
  }

  pub fn is_bound(&self) -> bool {
    self.handle.is_some()
  }

  #[cfg(test)]
  pub fn is_skip_armed(&self) -> bool {
    self.pending_skip.is_some()
  }

  // --- Handle lifecycle ---

  /// Destroy the current handle (if any) and bind a new one to entry `index`.
  ///
  /// The old player is released before the new one is created, including when
  /// creation fails. Returns the index actually loaded, or `None` on an empty queue.
  pub fn load(&mut self, queue: &mut QueueStore, index: usize) -> Result<Option<usize>> {
    self.teardown();
    let Some(index) = queue.set_cursor(index) else { return Ok(None) };
    let Some(video_id) = queue.current().map(String::from) else { return Ok(None) };

    self.epoch += 1;
    let instance =
      self.embed.mount(&video_id, self.epoch).with_context(|| format!("Failed to start player for {}", video_id))?;
    info!(video_id = %video_id, index, epoch = self.epoch, "playback: loaded");
    self.handle = Some(PlaybackHandle { video_id, epoch: self.epoch, _instance: instance });
    self.state = PlaybackState::Loading;
    Ok(Some(index))
  }

  /// Tear down playback, e.g. when a new search replaces the queue.
  pub fn stop(&mut self) {
    self.teardown();
  }

  fn teardown(&mut self) {
    self.pending_skip = None;
    if let Some(handle) = self.handle.take() {
      debug!(video_id = %handle.video_id, epoch = handle.epoch, "playback: destroying handle");
    }
    self.state = PlaybackState::Idle;
  }

  // --- Player signals ---

  pub fn on_signal(
    &mut self,
    queue: &mut QueueStore,
    signal: PlayerSignal,
    now: Instant,
  ) -> Result<Option<Recovery>> {
    let Some(handle) = &self.handle else { return Ok(None) };
    if handle.epoch != signal.epoch {
      debug!(signal_epoch = signal.epoch, epoch = handle.epoch, "playback: ignoring stale signal");
      return Ok(None);
    }

    match signal.event {
      PlayerEvent::Ready => {
        self.pending_skip = None;
        if matches!(self.state, PlaybackState::Loading | PlaybackState::Stalled) {
          self.state = PlaybackState::Active;
        }
      }
      PlayerEvent::StateChanged(PlayerState::Unstarted) => {
        let epoch = handle.epoch;
        self.pending_skip.get_or_insert(PendingSkip { epoch, deadline: now + self.grace });
        self.state = PlaybackState::Stalled;
      }
      PlayerEvent::StateChanged(PlayerState::Playing) => {
        self.pending_skip = None;
        self.state = PlaybackState::Active;
      }
      PlayerEvent::StateChanged(other) => {
        debug!(state = ?other, code = other.code(), "playback: state change");
      }
      PlayerEvent::Error(code) => {
        self.state = PlaybackState::Errored;
        return self.handle_unplayable(queue, Unplayable::Errored(code));
      }
    }
    Ok(None)
  }

  /// Fire the pending skip if its grace period has elapsed.
  pub fn tick(&mut self, queue: &mut QueueStore, now: Instant) -> Result<Option<Recovery>> {
    let Some(skip) = self.pending_skip else { return Ok(None) };
    if now < skip.deadline {
      return Ok(None);
    }
    self.pending_skip = None;
    if self.handle.as_ref().map(|h| h.epoch) != Some(skip.epoch) {
      return Ok(None);
    }
    self.handle_unplayable(queue, Unplayable::Stalled)
  }

  /// Remove the loaded entry from the queue and load its replacement.
  ///
  /// There is no retry cap here: a replacement that also fails comes back
  /// through the same path until the queue runs out.
  fn handle_unplayable(&mut self, queue: &mut QueueStore, reason: Unplayable) -> Result<Option<Recovery>> {
    let Some(video_id) = self.current_video().map(String::from) else { return Ok(None) };
    warn!(video_id = %video_id, ?reason, "playback: video unplayable, removing");
    self.teardown();

    let Some(index) = queue.position_of(&video_id) else {
      debug!(video_id = %video_id, "playback: unplayable entry already gone");
      return Ok(None);
    };
    queue.remove_at(index);

    if queue.is_empty() {
      info!("playback: queue exhausted");
      self.state = PlaybackState::Empty;
      return Ok(Some(Recovery::Exhausted));
    }
    let replacement = if index < queue.len() { index } else { 0 };
    Ok(self.load(queue, replacement)?.map(Recovery::Reloaded))
  }

  // --- Manual navigation ---

  pub fn advance(&mut self, queue: &mut QueueStore, pagination: &mut PaginationCoordinator) -> Result<Navigation> {
    let Some(cursor) = queue.cursor() else { return Ok(Navigation::Ignored) };
    if cursor + 1 < queue.len() {
      return self.navigate(queue, cursor + 1);
    }
    if queue.is_fetching() {
      debug!("playback: fetch in flight, ignoring advance");
      return Ok(Navigation::Ignored);
    }
    if let Some(request) = pagination.maybe_fetch_more(queue) {
      return Ok(Navigation::Fetching(request));
    }
    self.navigate(queue, 0)
  }

  pub fn retreat(&mut self, queue: &mut QueueStore) -> Result<Navigation> {
    let Some(cursor) = queue.cursor() else { return Ok(Navigation::Ignored) };
    let target = if cursor > 0 { cursor - 1 } else { queue.len() - 1 };
    self.navigate(queue, target)
  }

  fn navigate(&mut self, queue: &mut QueueStore, index: usize) -> Result<Navigation> {
    Ok(match self.load(queue, index)? {
      Some(i) => Navigation::Loaded(i),
      None => Navigation::Ignored,
    })
  }
}
