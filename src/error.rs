use thiserror::Error;

/// Failure of a single page request against the search backend.
#[derive(Debug, Error)]
pub enum FetchError {
  /// The backend reported that its upstream quota is spent.
  #[error("quota exceeded: {0}")]
  QuotaExceeded(String),

  /// Any other non-2xx reply.
  #[error("{message} (status: {status})")]
  Backend { status: u16, message: String },

  #[error("network error: {0}")]
  Network(#[from] reqwest::Error),

  #[error("malformed response: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("invalid backend url: {0}")]
  Url(String),
}

impl FetchError {
  pub fn is_quota(&self) -> bool {
    matches!(self, FetchError::QuotaExceeded(_))
  }
}

/// User-visible conditions surfaced on the status line and placeholder panel.
///
/// Unplayable videos never show up here: they are recovered silently and only
/// the position counter changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
  /// The search succeeded but returned nothing.
  NoResults,
  /// Backend rate limit; retrying before the external reset is pointless.
  QuotaExceeded,
  /// Network or backend failure; resubmitting may help.
  FetchFailure(String),
  /// Every entry of the queue was removed as unplayable.
  QueueExhausted,
}

impl Notice {
  pub fn from_fetch_error(err: &FetchError) -> Self {
    if err.is_quota() { Notice::QuotaExceeded } else { Notice::FetchFailure(err.to_string()) }
  }

  /// Short text for the status line.
  pub fn headline(&self) -> String {
    match self {
      Notice::NoResults => "No videos found for this topic".to_string(),
      Notice::QuotaExceeded => "API quota exceeded".to_string(),
      Notice::FetchFailure(_) => "Error loading videos".to_string(),
      Notice::QueueExhausted => "No playable videos found".to_string(),
    }
  }

  /// Longer explanation for the placeholder panel.
  pub fn detail(&self) -> String {
    match self {
      Notice::NoResults => "No videos found. Try a different topic.".to_string(),
      Notice::QuotaExceeded => {
        "The daily API quota has been exceeded. It resets at midnight Pacific Time; please try again later.".to_string()
      }
      Notice::FetchFailure(msg) => format!("Error: {}. Please try again.", msg),
      Notice::QueueExhausted => "All videos were unavailable. Try a different topic.".to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quota_error_maps_to_quota_notice() {
    let err = FetchError::QuotaExceeded("quota exceeded for today".into());
    assert!(err.is_quota());
    assert_eq!(Notice::from_fetch_error(&err), Notice::QuotaExceeded);
  }

  #[test]
  fn backend_error_maps_to_fetch_failure() {
    let err = FetchError::Backend { status: 500, message: "boom".into() };
    assert!(!err.is_quota());
    match Notice::from_fetch_error(&err) {
      Notice::FetchFailure(msg) => assert!(msg.contains("boom") && msg.contains("500")),
      other => panic!("unexpected notice: {:?}", other),
    }
  }

  #[test]
  fn fetch_failure_detail_includes_message() {
    let notice = Notice::FetchFailure("connection refused".into());
    assert_eq!(notice.detail(), "Error: connection refused. Please try again.");
  }
}
