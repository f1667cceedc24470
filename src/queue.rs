//! The ordered set of candidate videos for the active topic.
//!
//! `QueueStore` owns both the video list with its playback cursor and the
//! `SearchSession` describing where the list came from. Every mutation keeps
//! three invariants: identifiers are unique, the cursor is a valid index
//! whenever the list is non-empty, and the continuation token only changes
//! through an explicit update.

use std::collections::HashSet;
use tracing::debug;

pub type VideoId = String;

/// Which page request, if any, is outstanding for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
  #[default]
  Idle,
  /// The first page of a new search.
  Searching,
  /// A continuation page.
  LoadingMore,
}

#[derive(Debug, Clone, Default)]
pub struct SearchSession {
  pub topic: String,
  /// Opaque continuation token; `None` means no further pages.
  pub page_token: Option<String>,
  pub fetch: FetchState,
  /// Bumped by every accepted search. Page results carry the generation they
  /// were requested under and are dropped if it no longer matches.
  pub generation: u64,
}

#[derive(Debug, Default)]
pub struct QueueStore {
  videos: Vec<VideoId>,
  members: HashSet<VideoId>,
  cursor: usize,
  session: SearchSession,
}

impl QueueStore {
  pub fn new() -> Self {
    Self::default()
  }

  // --- Search session ---

  /// Replace the queue and session for a new topic.
  ///
  /// Returns the new session generation, or `None` if the topic is blank or
  /// the first page of the previous search is still in flight.
  pub fn start_search(&mut self, topic: &str) -> Option<u64> {
    let topic = topic.trim();
    if topic.is_empty() {
      debug!("queue: ignoring empty topic");
      return None;
    }
    if self.session.fetch == FetchState::Searching {
      debug!(topic = %topic, "queue: search already in flight, rejecting");
      return None;
    }
    self.videos.clear();
    self.members.clear();
    self.cursor = 0;
    self.session = SearchSession {
      topic: topic.to_string(),
      page_token: None,
      fetch: FetchState::Searching,
      generation: self.session.generation + 1,
    };
    Some(self.session.generation)
  }

  /// Load the first page of a search. Later duplicates within the page are dropped.
  pub fn set_page(&mut self, identifiers: Vec<VideoId>, page_token: Option<String>) {
    self.videos.clear();
    self.members.clear();
    for id in identifiers {
      if self.members.insert(id.clone()) {
        self.videos.push(id);
      }
    }
    self.cursor = 0;
    self.session.page_token = page_token;
    self.session.fetch = FetchState::Idle;
  }

  /// Append the identifiers not already queued, keeping their relative order.
  /// Returns how many were added.
  pub fn append_page(&mut self, identifiers: Vec<VideoId>, page_token: Option<String>) -> usize {
    let before = self.videos.len();
    for id in identifiers {
      if self.members.insert(id.clone()) {
        self.videos.push(id);
      }
    }
    self.session.page_token = page_token;
    self.session.fetch = FetchState::Idle;
    self.videos.len() - before
  }

  /// Mark a continuation fetch as outstanding. Fails if there is no token or
  /// any fetch is already in flight.
  pub fn begin_fetch_more(&mut self) -> bool {
    if self.session.page_token.is_none() || self.session.fetch != FetchState::Idle {
      return false;
    }
    self.session.fetch = FetchState::LoadingMore;
    true
  }

  /// Clear the in-flight flag after a failed or empty request.
  pub fn finish_fetch(&mut self) {
    self.session.fetch = FetchState::Idle;
  }

  pub fn clear_page_token(&mut self) {
    self.session.page_token = None;
  }

  // --- Cursor & removal ---

  /// Remove the entry at `index`.
  ///
  /// A cursor past the removed entry shifts down with it. A cursor left beyond
  /// the end wraps to 0. Returns the removed identifier.
  pub fn remove_at(&mut self, index: usize) -> Option<VideoId> {
    if index >= self.videos.len() {
      return None;
    }
    let removed = self.videos.remove(index);
    self.members.remove(&removed);
    if self.cursor > index {
      self.cursor -= 1;
    }
    if self.cursor >= self.videos.len() {
      self.cursor = 0;
    }
    Some(removed)
  }

  /// Clamp `index` into the queue and make it current. `None` on an empty queue.
  pub fn set_cursor(&mut self, index: usize) -> Option<usize> {
    if self.videos.is_empty() {
      return None;
    }
    self.cursor = index.min(self.videos.len() - 1);
    Some(self.cursor)
  }

  // --- Accessors ---

  /// The playback cursor, undefined (`None`) while the queue is empty.
  pub fn cursor(&self) -> Option<usize> {
    if self.videos.is_empty() { None } else { Some(self.cursor) }
  }

  pub fn current(&self) -> Option<&str> {
    self.cursor().map(|i| self.videos[i].as_str())
  }

  pub fn position_of(&self, video_id: &str) -> Option<usize> {
    if !self.members.contains(video_id) {
      return None;
    }
    self.videos.iter().position(|v| v == video_id)
  }

  pub fn len(&self) -> usize {
    self.videos.len()
  }

  pub fn is_empty(&self) -> bool {
    self.videos.is_empty()
  }

  #[cfg(test)]
  pub fn videos(&self) -> &[VideoId] {
    &self.videos
  }

  pub fn topic(&self) -> &str {
    &self.session.topic
  }

  pub fn page_token(&self) -> Option<&str> {
    self.session.page_token.as_deref()
  }

  pub fn generation(&self) -> u64 {
    self.session.generation
  }

  pub fn fetch_state(&self) -> FetchState {
    self.session.fetch
  }

  pub fn is_fetching(&self) -> bool {
    self.session.fetch != FetchState::Idle
  }
}
