use tracing::{info, warn};

use crate::error::{FetchError, Notice};
use crate::fetcher::Page;
use crate::queue::QueueStore;

/// A page request captured at the moment it was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
  pub topic: String,
  pub page_token: Option<String>,
  /// Session generation the result must still match to be merged.
  pub generation: u64,
}

/// What the caller should do after a page result has been merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
  /// Start playback at this index.
  PlayFrom(usize),
  /// The page held nothing new but more exist; issue this request next.
  FetchMore(PageRequest),
  /// The first page of a search came back empty.
  NoResults,
  /// The request failed; the queue and cursor are untouched.
  Failed(Notice),
  /// The result belongs to a search that has since been replaced.
  Discarded,
}

/// Decides when to pull more pages and how to merge them into the queue.
#[derive(Debug)]
pub struct PaginationCoordinator {
  /// Consecutive continuation pages that added nothing.
  duplicate_pages: usize,
  max_duplicate_pages: usize,
}

impl PaginationCoordinator {
  pub fn new(max_duplicate_pages: usize) -> Self {
    Self { duplicate_pages: 0, max_duplicate_pages: max_duplicate_pages.max(1) }
  }

  /// Request for the first page of the search just started on `queue`.
  pub fn first_page(&mut self, queue: &QueueStore) -> PageRequest {
    self.duplicate_pages = 0;
    PageRequest { topic: queue.topic().to_string(), page_token: None, generation: queue.generation() }
  }

  /// Issue a continuation request if a token is present and nothing is in flight.
  pub fn maybe_fetch_more(&mut self, queue: &mut QueueStore) -> Option<PageRequest> {
    if !queue.begin_fetch_more() {
      return None;
    }
    let request = PageRequest {
      topic: queue.topic().to_string(),
      page_token: queue.page_token().map(String::from),
      generation: queue.generation(),
    };
    info!(topic = %request.topic, "pagination: fetching more");
    Some(request)
  }

  pub fn on_first_page(
    &mut self,
    queue: &mut QueueStore,
    request: &PageRequest,
    result: Result<Page, FetchError>,
  ) -> PageOutcome {
    if request.generation != queue.generation() {
      info!(topic = %request.topic, "pagination: discarding result of superseded search");
      return PageOutcome::Discarded;
    }
    match result {
      Ok(page) if page.videos.is_empty() => {
        queue.finish_fetch();
        info!(topic = %request.topic, "pagination: no results");
        PageOutcome::NoResults
      }
      Ok(page) => {
        queue.set_page(page.videos, page.next_page_token);
        info!(topic = %request.topic, count = queue.len(), "pagination: first page loaded");
        PageOutcome::PlayFrom(0)
      }
      Err(e) => {
        queue.finish_fetch();
        warn!(topic = %request.topic, err = %e, "pagination: search failed");
        PageOutcome::Failed(Notice::from_fetch_error(&e))
      }
    }
  }

  pub fn on_page(
    &mut self,
    queue: &mut QueueStore,
    request: &PageRequest,
    result: Result<Page, FetchError>,
  ) -> PageOutcome {
    if request.generation != queue.generation() {
      info!(topic = %request.topic, "pagination: discarding page of superseded search");
      return PageOutcome::Discarded;
    }
    let page = match result {
      Ok(page) => page,
      Err(e) => {
        queue.finish_fetch();
        warn!(topic = %request.topic, err = %e, "pagination: fetch failed, keeping queue");
        return PageOutcome::Failed(Notice::from_fetch_error(&e));
      }
    };

    if page.videos.is_empty() {
      queue.finish_fetch();
      queue.clear_page_token();
      self.duplicate_pages = 0;
      info!(topic = %request.topic, "pagination: empty page, looping to start");
      return PageOutcome::PlayFrom(0);
    }

    let old_len = queue.len();
    let added = queue.append_page(page.videos, page.next_page_token);
    info!(added, total = queue.len(), "pagination: page merged");
    if added > 0 {
      self.duplicate_pages = 0;
      return PageOutcome::PlayFrom(old_len);
    }

    if queue.page_token().is_some() {
      self.duplicate_pages += 1;
      if self.duplicate_pages >= self.max_duplicate_pages {
        warn!(pages = self.duplicate_pages, "pagination: too many duplicate pages, looping to start");
      } else if let Some(next) = self.maybe_fetch_more(queue) {
        return PageOutcome::FetchMore(next);
      }
    }
    self.duplicate_pages = 0;
    PageOutcome::PlayFrom(0)
  }
}
