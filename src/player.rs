//! The embedded video player boundary.
//!
//! Whatever widget renders the video reports back through a closed set of
//! `PlayerEvent`s, each tagged with the epoch of the handle that produced it.
//! `MpvEmbed` is the production widget: one mpv process per handle, observed
//! over its JSON IPC socket.

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::{
  io::{AsyncBufReadExt, AsyncWriteExt, BufReader as TokioBufReader},
  net::UnixStream,
  process::{Child as TokioChild, Command},
  sync::mpsc,
  task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::constants::constants;

/// Playback states as numbered by the embedding widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
  Unstarted,
  Ended,
  Playing,
  Paused,
  Buffering,
  Cued,
}

impl PlayerState {
  pub fn code(self) -> i32 {
    match self {
      PlayerState::Unstarted => -1,
      PlayerState::Ended => 0,
      PlayerState::Playing => 1,
      PlayerState::Paused => 2,
      PlayerState::Buffering => 3,
      PlayerState::Cued => 5,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
  Ready,
  StateChanged(PlayerState),
  /// Widget error code. Every code means the video cannot be played.
  Error(i32),
}

/// A `PlayerEvent` from the handle created at `epoch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSignal {
  pub epoch: u64,
  pub event: PlayerEvent,
}

/// Something that can bind a player to a video.
///
/// Dropping the returned instance destroys the player and releases every
/// resource it holds.
pub trait Embed {
  type Instance;

  fn mount(&mut self, video_id: &str, epoch: u64) -> Result<Self::Instance>;
}

pub fn watch_url(video_id: &str) -> String {
  format!("https://www.youtube.com/watch?v={}", video_id)
}

// --- mpv event translation ---

const ERROR_INVALID_PARAM: i32 = 2;
const ERROR_PLAYBACK: i32 = 5;
const ERROR_NOT_FOUND: i32 = 100;

fn mpv_error_code(file_error: Option<&str>) -> i32 {
  match file_error {
    Some("loading failed") => ERROR_NOT_FOUND,
    Some("unrecognized file format") => ERROR_INVALID_PARAM,
    _ => ERROR_PLAYBACK,
  }
}

/// Properties observed over IPC, in `observe_property` id order.
const OBSERVED_PROPERTIES: [&str; 2] = ["pause", "paused-for-cache"];

/// Translate one mpv IPC message into player events.
///
/// `start-file` is the video being queued up. `file-loaded` means the stream
/// resolved but nothing is playing yet, so it is reported as ready followed by
/// unstarted; `playback-restart` is the first rendered frame. Only the `true`
/// edge of an observed property is reported: mpv sends every observed value
/// once on registration, and an early `pause: false` must not read as playing.
pub fn translate_mpv_event(message: &Value) -> Vec<PlayerEvent> {
  match message.get("event").and_then(Value::as_str) {
    Some("start-file") => vec![PlayerEvent::StateChanged(PlayerState::Cued)],
    Some("property-change") => {
      if message.get("data").and_then(Value::as_bool) != Some(true) {
        return Vec::new();
      }
      match message.get("name").and_then(Value::as_str) {
        Some("pause") => vec![PlayerEvent::StateChanged(PlayerState::Paused)],
        Some("paused-for-cache") => vec![PlayerEvent::StateChanged(PlayerState::Buffering)],
        _ => Vec::new(),
      }
    }
    Some("file-loaded") => vec![PlayerEvent::Ready, PlayerEvent::StateChanged(PlayerState::Unstarted)],
    Some("playback-restart") => vec![PlayerEvent::StateChanged(PlayerState::Playing)],
    Some("end-file") => match message.get("reason").and_then(Value::as_str) {
      Some("error") => vec![PlayerEvent::Error(mpv_error_code(message.get("file_error").and_then(Value::as_str)))],
      Some("eof") => vec![PlayerEvent::StateChanged(PlayerState::Ended)],
      _ => Vec::new(),
    },
    _ => Vec::new(),
  }
}

// --- mpv ---

pub struct MpvEmbed {
  events: mpsc::UnboundedSender<PlayerSignal>,
  audio_only: bool,
}

impl MpvEmbed {
  pub fn new(audio_only: bool) -> (Self, mpsc::UnboundedReceiver<PlayerSignal>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { events: tx, audio_only }, rx)
  }
}

/// A running mpv process bound to one video.
pub struct MpvInstance {
  // Spawned with kill_on_drop, so dropping the instance kills mpv.
  _child: TokioChild,
  monitor: JoinHandle<()>,
  socket_path: PathBuf,
}

impl Drop for MpvInstance {
  fn drop(&mut self) {
    self.monitor.abort();
    let _ = std::fs::remove_file(&self.socket_path);
  }
}

impl Embed for MpvEmbed {
  type Instance = MpvInstance;

  fn mount(&mut self, video_id: &str, epoch: u64) -> Result<MpvInstance> {
    let socket_path = std::env::temp_dir().join(format!("shortfeed-mpv-{}-{}.sock", std::process::id(), epoch));
    let socket_path_str = socket_path.to_str().context("Temp dir path is not valid UTF-8")?.to_string();
    // Remove stale socket if it exists from a previous crash.
    let _ = std::fs::remove_file(&socket_path);

    let url = watch_url(video_id);
    let mut cmd = Command::new("mpv");
    cmd.args(["--keep-open=yes", "--force-window=yes", &format!("--input-ipc-server={}", socket_path_str)]);
    if self.audio_only {
      cmd.arg("--no-video");
    }
    cmd.arg("--").arg(&url);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());
    cmd.kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        anyhow!("mpv not found. Install it with: brew install mpv (macOS) or apt install mpv (Linux)")
      } else {
        anyhow!(e).context("Failed to spawn mpv process")
      }
    })?;
    info!(video_id = %video_id, epoch, "mpv: spawned");

    let monitor = tokio::spawn(monitor_ipc(socket_path.clone(), epoch, self.events.clone()));
    Ok(MpvInstance { _child: child, monitor, socket_path })
  }
}

async fn connect_ipc(socket_path: &Path) -> Option<UnixStream> {
  let c = constants();
  for attempt in 0..c.ipc_connect_attempts {
    match UnixStream::connect(socket_path).await {
      Ok(stream) => return Some(stream),
      Err(e) => {
        debug!(attempt, err = %e, "mpv: IPC connect failed, retrying");
        tokio::time::sleep(Duration::from_millis(c.ipc_retry_ms)).await;
      }
    }
  }
  None
}

/// Forward translated mpv events until the socket closes or the receiver goes away.
async fn monitor_ipc(socket_path: PathBuf, epoch: u64, events: mpsc::UnboundedSender<PlayerSignal>) {
  let Some(stream) = connect_ipc(&socket_path).await else {
    warn!(epoch, path = %socket_path.display(), "mpv: IPC socket never came up");
    return;
  };

  let (reader, mut writer) = stream.into_split();
  for (id, name) in OBSERVED_PROPERTIES.iter().enumerate() {
    let cmd = format!("{}\n", serde_json::json!({ "command": ["observe_property", id + 1, name] }));
    if let Err(e) = writer.write_all(cmd.as_bytes()).await {
      warn!(epoch, err = %e, property = %name, "mpv: observe_property failed");
    }
  }

  let mut lines = TokioBufReader::new(reader).lines();
  while let Ok(Some(line)) = lines.next_line().await {
    let Ok(message) = serde_json::from_str::<Value>(&line) else { continue };
    for event in translate_mpv_event(&message) {
      debug!(epoch, ?event, "mpv: event");
      if events.send(PlayerSignal { epoch, event }).is_err() {
        return;
      }
    }
  }
  debug!(epoch, "mpv: IPC stream closed");
}
