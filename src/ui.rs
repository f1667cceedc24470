use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style},
  text::{Line, Span},
  widgets::{Block, BorderType, Padding, Paragraph, Wrap},
};

use crate::app::{App, AppMode, Status};
use crate::constants::constants;
use crate::playback::PlaybackState;
use crate::player::{Embed, watch_url};
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

fn state_label(state: PlaybackState) -> &'static str {
  match state {
    PlaybackState::Idle => "Idle",
    PlaybackState::Loading => "Loading…",
    PlaybackState::Active => "Playing",
    PlaybackState::Stalled => "Waiting for video to start…",
    PlaybackState::Errored => "Player error",
    PlaybackState::Empty => "No playable videos",
  }
}

fn panel<'a>(theme: &Theme) -> Block<'a> {
  Block::bordered()
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(theme.border))
    .padding(Padding::horizontal(1))
}

// --- UI Rendering ---

pub fn ui<E: Embed>(frame: &mut Frame, app: &mut App<E>) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  if app.playback.is_bound() {
    render_now_playing(frame, app, main_area);
  } else {
    render_placeholder(frame, app, main_area);
  }
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);
}

fn render_header<E: Embed>(frame: &mut Frame, app: &App<E>, area: Rect) {
  let theme = app.theme();
  let left = Line::from(Span::styled(" ▶ shortfeed ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let right_text = format!("{}  v{} ", app.backend_url(), env!("CARGO_PKG_VERSION"));
  let width = right_text.chars().count() as u16;
  let right = Line::from(Span::styled(right_text, Style::default().fg(theme.muted)));
  let right_area = Rect { x: area.x + area.width.saturating_sub(width), width: width.min(area.width), ..area };
  frame.render_widget(right, right_area);
}

fn render_now_playing<E: Embed>(frame: &mut Frame, app: &App<E>, area: Rect) {
  let theme = app.theme();
  let inner_w = area.width.saturating_sub(4) as usize;

  let title = Line::from(vec![
    Span::styled(" Now Playing ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
    Span::styled(
      format!(" {} ", truncate_str(app.queue.topic(), inner_w / 2)),
      Style::default().fg(theme.badge_fg).bg(theme.badge_bg),
    ),
    Span::raw(" "),
  ]);

  let mut lines = vec![Line::from("")];
  if let Some(cursor) = app.queue.cursor() {
    lines.push(Line::from(Span::styled(
      format!("Video {} of {}", cursor + 1, app.queue.len()),
      Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));
  }
  if let Some(video_id) = app.playback.current_video() {
    lines.push(Line::from(vec![
      Span::styled("Video id  ", Style::default().fg(theme.muted)),
      Span::styled(video_id.to_string(), Style::default().fg(theme.fg)),
    ]));
    lines.push(Line::from(vec![
      Span::styled("State     ", Style::default().fg(theme.muted)),
      Span::styled(state_label(app.playback.state()), Style::default().fg(theme.status)),
    ]));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
      truncate_str(&watch_url(video_id), inner_w),
      Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED),
    )));
  }

  frame.render_widget(Paragraph::new(lines).block(panel(theme).title(title)), area);
}

fn render_placeholder<E: Embed>(frame: &mut Frame, app: &App<E>, area: Rect) {
  let theme = app.theme();
  let mut text = vec![Line::from("")];

  if let Some(notice) = &app.notice {
    text.push(Line::from(Span::styled(
      notice.headline(),
      Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
    )));
    text.push(Line::from(""));
    text.push(Line::from(Span::styled(notice.detail(), Style::default().fg(theme.fg))));
  } else {
    text.push(Line::from(Span::styled(
      "▶  Pick a topic, watch a feed",
      Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
    )));
    text.push(Line::from(""));
    text.push(Line::from(Span::styled(
      "Type a topic below and press Enter, or try one of these:",
      Style::default().fg(theme.muted),
    )));
  }

  text.push(Line::from(""));
  for (i, topic) in constants().suggestions.iter().enumerate() {
    text.push(Line::from(vec![
      Span::styled(format!(" F{} ", i + 1), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
      Span::styled(format!(" {}", topic), Style::default().fg(theme.fg)),
    ]));
  }

  let paragraph = Paragraph::new(text).alignment(Alignment::Center).wrap(Wrap { trim: true }).block(panel(theme));
  frame.render_widget(paragraph, area);
}

fn render_status<E: Embed>(frame: &mut Frame, app: &App<E>, area: Rect) {
  let theme = app.theme();
  let (text, style) = match app.status() {
    Status::Busy(msg) => (format!(" ⏳ {}", msg), Style::default().fg(theme.status)),
    Status::Notice(notice) => (format!(" ⚠  {}", notice.headline()), Style::default().fg(theme.error)),
    Status::Error(err) => (format!(" ⚠  {}", err), Style::default().fg(theme.error)),
    Status::Position { index, total } => (format!(" ♪ Video {} of {}", index, total), Style::default().fg(theme.status)),
    Status::Prompt => (" Ready".to_string(), Style::default().fg(theme.muted)),
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input<E: Embed>(frame: &mut Frame, app: &mut App<E>, area: Rect) {
  let theme = app.theme();
  let border_color = if app.mode == AppMode::Input { theme.accent } else { theme.border };
  let input_block = Block::bordered()
    .title(" Topic ")
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if app.mode == AppMode::Input {
    let cursor_x = area.x + 2 + (cursor_col - app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_footer<E: Embed>(frame: &mut Frame, app: &App<E>, area: Rect) {
  let theme = app.theme();
  let has_queue = !app.queue.is_empty();
  let keys: Vec<(&str, &str)> = match app.mode {
    AppMode::Input => {
      let mut k = vec![("Enter", "Search"), ("F1-F5", "Suggest"), ("^t", "Theme")];
      if has_queue {
        k.push(("Tab", "Player"));
      } else {
        k.push(("Esc", "Quit"));
      }
      k
    }
    AppMode::Player => {
      let mut k = vec![("↓/j", "Next"), ("↑/k", "Prev")];
      if app.playback.is_bound() {
        k.push(("^o", "Browser"));
      }
      k.push(("/", "Topic"));
      k.push(("^t", "Theme"));
      k.push(("^c", "Quit"));
      k
    }
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::error::Notice;
  use crate::fetcher::{Page, PageFetcher};
  use crate::player::testing::FakeEmbed;
  use ratatui::{Terminal, backend::TestBackend};
  use std::time::Duration;
  use tokio::sync::mpsc;

  fn make_app() -> App<FakeEmbed> {
    let (_tx, rx) = mpsc::unbounded_channel();
    let fetcher = PageFetcher::new("http://127.0.0.1:9/api").unwrap();
    App::new(FakeEmbed::default(), rx, fetcher, Config::default(), Duration::from_secs(3))
  }

  fn render(app: &mut App<FakeEmbed>) -> String {
    let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
    terminal.draw(|f| ui(f, app)).unwrap();
    terminal.backend().buffer().content().iter().map(|c| c.symbol()).collect()
  }

  // --- helpers ---

  #[test]
  fn truncate_short_string_unchanged() {
    assert_eq!(truncate_str("abc", 5), "abc");
  }

  #[test]
  fn truncate_long_string_gets_ellipsis() {
    assert_eq!(truncate_str("abcdef", 4), "abc…");
  }

  #[test]
  fn display_width_counts_wide_chars() {
    assert_eq!(display_width("a日b", 3), 4);
    assert_eq!(display_width("a日b", 1), 1);
  }

  // --- rendering ---

  #[test]
  fn welcome_lists_suggestions() {
    let mut app = make_app();
    let screen = render(&mut app);
    assert!(screen.contains("F1"));
    assert!(screen.contains("photosynthesis"));
    assert!(screen.contains("Ready"));
  }

  #[test]
  fn notice_replaces_welcome() {
    let mut app = make_app();
    app.notice = Some(Notice::NoResults);
    let screen = render(&mut app);
    assert!(screen.contains("No videos found for this topic"));
    assert!(!screen.contains("Pick a topic"));
  }

  #[test]
  fn now_playing_shows_position() {
    let mut app = make_app();
    app.queue.start_search("history").unwrap();
    let request = app.pagination.first_page(&app.queue);
    app.on_search_result(&request, Ok(Page { videos: vec!["a".into(), "b".into()], next_page_token: None }));
    let screen = render(&mut app);
    assert!(screen.contains("Now Playing"));
    assert!(screen.contains("history"));
    assert!(screen.contains("Video 1 of 2"));
    assert!(screen.contains("watch?v=a"));
  }
}
