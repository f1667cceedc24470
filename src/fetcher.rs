use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::error::FetchError;
use crate::queue::VideoId;

/// Fallback message when the backend fails without saying why.
const GENERIC_FAILURE: &str = "Failed to fetch videos";

/// One page of search results, normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
  pub videos: Vec<VideoId>,
  /// `None` when the backend has no further pages.
  pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosBody {
  #[serde(default)]
  videos: Vec<String>,
  #[serde(default)]
  next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
  #[serde(default)]
  error: Option<String>,
  #[serde(default)]
  message: Option<String>,
}

/// Turn a backend reply into a `Page` or a typed failure.
pub fn parse_page(status: u16, body: &str) -> Result<Page, FetchError> {
  if !(200..300).contains(&status) {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let is_quota = [&parsed.error, &parsed.message]
      .into_iter()
      .flatten()
      .any(|s| s.to_lowercase().contains("quota"));
    let message = parsed.error.or(parsed.message).unwrap_or_else(|| GENERIC_FAILURE.to_string());
    if is_quota {
      return Err(FetchError::QuotaExceeded(message));
    }
    return Err(FetchError::Backend { status, message });
  }

  let parsed: VideosBody = serde_json::from_str(body)?;
  let videos = parsed.videos.into_iter().map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).collect();
  let next_page_token = parsed.next_page_token.filter(|t| !t.is_empty());
  Ok(Page { videos, next_page_token })
}

/// Issues single paginated search requests against the backend.
#[derive(Debug, Clone)]
pub struct PageFetcher {
  client: Client,
  base_url: String,
}

impl PageFetcher {
  pub fn new(base_url: &str) -> Result<Self, FetchError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(constants().request_timeout_secs))
      .user_agent(concat!("shortfeed/", env!("CARGO_PKG_VERSION")))
      .build()?;
    let fetcher = Self { client, base_url: base_url.trim_end_matches('/').to_string() };
    // Validate eagerly so a bad --backend fails at startup.
    fetcher.videos_url("probe", None)?;
    Ok(fetcher)
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// `{base}/videos?tag=<topic>[&page_token=<token>]`
  pub fn videos_url(&self, topic: &str, page_token: Option<&str>) -> Result<Url, FetchError> {
    let mut url =
      Url::parse(&format!("{}/videos", self.base_url)).map_err(|e| FetchError::Url(format!("{}: {}", self.base_url, e)))?;
    {
      let mut pairs = url.query_pairs_mut();
      pairs.append_pair("tag", topic);
      if let Some(token) = page_token {
        pairs.append_pair("page_token", token);
      }
    }
    Ok(url)
  }

  pub async fn fetch(&self, topic: &str, page_token: Option<&str>) -> Result<Page, FetchError> {
    let url = self.videos_url(topic, page_token)?;
    debug!(url = %url, "fetch: requesting page");

    let response = self.client.get(url).send().await?;
    let status = response.status().as_u16();
    let body = response.text().await?;

    match parse_page(status, &body) {
      Ok(page) => {
        info!(
          topic = %topic,
          count = page.videos.len(),
          has_more = page.next_page_token.is_some(),
          "fetch: page received"
        );
        Ok(page)
      }
      Err(e) => {
        warn!(topic = %topic, status, err = %e, "fetch: request failed");
        Err(e)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // --- parse_page: success ---

  #[test]
  fn parses_page_with_token() {
    let page = parse_page(200, r#"{"tag":"history","videos":["a","b","c"],"count":3,"next_page_token":"T1"}"#).unwrap();
    assert_eq!(page.videos, vec!["a", "b", "c"]);
    assert_eq!(page.next_page_token.as_deref(), Some("T1"));
  }

  #[test]
  fn null_or_empty_token_means_no_more_pages() {
    let page = parse_page(200, r#"{"videos":["d"],"next_page_token":null}"#).unwrap();
    assert_eq!(page.next_page_token, None);
    let page = parse_page(200, r#"{"videos":["d"],"next_page_token":""}"#).unwrap();
    assert_eq!(page.next_page_token, None);
    let page = parse_page(200, r#"{"videos":["d"]}"#).unwrap();
    assert_eq!(page.next_page_token, None);
  }

  #[test]
  fn missing_videos_is_empty_page() {
    let page = parse_page(200, "{}").unwrap();
    assert!(page.videos.is_empty());
  }

  #[test]
  fn blank_identifiers_are_dropped() {
    let page = parse_page(200, r#"{"videos":["a"," ","","b"]}"#).unwrap();
    assert_eq!(page.videos, vec!["a", "b"]);
  }

  #[test]
  fn garbage_success_body_is_decode_error() {
    assert!(matches!(parse_page(200, "<html>"), Err(FetchError::Decode(_))));
  }

  // --- parse_page: failure ---

  #[test]
  fn quota_in_error_field() {
    let err = parse_page(429, r#"{"error":"quota exceeded for today"}"#).unwrap_err();
    assert!(matches!(err, FetchError::QuotaExceeded(ref m) if m == "quota exceeded for today"));
  }

  #[test]
  fn quota_in_message_field() {
    let err =
      parse_page(429, r#"{"error":"rate_limited","message":"YouTube API Quota exceeded. Try tomorrow."}"#).unwrap_err();
    assert!(err.is_quota());
  }

  #[test]
  fn other_errors_are_backend_failures() {
    let err = parse_page(500, r#"{"error":"upstream exploded"}"#).unwrap_err();
    assert!(matches!(err, FetchError::Backend { status: 500, ref message } if message == "upstream exploded"));
  }

  #[test]
  fn unparseable_error_body_uses_generic_message() {
    let err = parse_page(502, "Bad Gateway").unwrap_err();
    assert!(matches!(err, FetchError::Backend { status: 502, ref message } if message == GENERIC_FAILURE));
  }

  // --- videos_url ---

  #[test]
  fn builds_first_page_url() {
    let fetcher = PageFetcher::new("http://localhost:8000/api/").unwrap();
    let url = fetcher.videos_url("maslow's hierarchy", None).unwrap();
    assert_eq!(url.path(), "/api/videos");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(pairs, vec![("tag".to_string(), "maslow's hierarchy".to_string())]);
  }

  #[test]
  fn builds_continuation_url() {
    let fetcher = PageFetcher::new("http://localhost:8000/api").unwrap();
    let url = fetcher.videos_url("a&b", Some("CAoQAA")).unwrap();
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(
      pairs,
      vec![("tag".to_string(), "a&b".to_string()), ("page_token".to_string(), "CAoQAA".to_string())]
    );
  }

  #[test]
  fn rejects_invalid_base_url() {
    assert!(matches!(PageFetcher::new("not a url"), Err(FetchError::Url(_))));
  }

  // --- fetch over HTTP ---

  /// Answer a single request with `status` and a JSON `body`; yields the request head.
  async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/api", listener.local_addr().unwrap());
    let server = tokio::spawn(async move {
      let (mut socket, _) = listener.accept().await.unwrap();
      let mut head = Vec::new();
      let mut buf = [0u8; 1024];
      while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
          break;
        }
        head.extend_from_slice(&buf[..n]);
      }
      let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
      );
      socket.write_all(response.as_bytes()).await.unwrap();
      String::from_utf8_lossy(&head).into_owned()
    });
    (base_url, server)
  }

  #[tokio::test]
  async fn fetch_sends_topic_and_token() {
    let (base_url, server) = serve_once("200 OK", r#"{"videos":["a","b"],"next_page_token":"T2"}"#).await;
    let fetcher = PageFetcher::new(&base_url).unwrap();
    let page = fetcher.fetch("black holes", Some("T1")).await.unwrap();
    assert_eq!(page, Page { videos: vec!["a".into(), "b".into()], next_page_token: Some("T2".into()) });

    let head = server.await.unwrap();
    let request_line = head.lines().next().unwrap();
    assert!(request_line.starts_with("GET /api/videos?tag=black+holes&page_token=T1 "), "{}", request_line);
  }

  #[tokio::test]
  async fn fetch_maps_429_quota_reply() {
    let (base_url, server) =
      serve_once("429 Too Many Requests", r#"{"error":"quota_exceeded","message":"YouTube API quota exceeded"}"#).await;
    let fetcher = PageFetcher::new(&base_url).unwrap();
    let err = fetcher.fetch("history", None).await.unwrap_err();
    assert!(err.is_quota(), "{:?}", err);
    server.await.unwrap();
  }

  #[tokio::test]
  async fn fetch_maps_server_error() {
    let (base_url, server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
    let fetcher = PageFetcher::new(&base_url).unwrap();
    let err = fetcher.fetch("history", None).await.unwrap_err();
    assert!(matches!(err, FetchError::Backend { status: 500, ref message } if message == "boom"));
    server.await.unwrap();
  }

  #[tokio::test]
  async fn fetch_reports_connection_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/api", listener.local_addr().unwrap());
    drop(listener);
    let fetcher = PageFetcher::new(&base_url).unwrap();
    assert!(matches!(fetcher.fetch("history", None).await, Err(FetchError::Network(_))));
  }
}
