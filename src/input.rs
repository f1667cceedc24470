use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

use crate::app::{App, AppMode};
use crate::player::Embed;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

pub fn handle_key_event<E: Embed>(app: &mut App<E>, key: event::KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) {
    match key.code {
      KeyCode::Char('c') => {
        app.should_quit = true;
        return;
      }
      KeyCode::Char('t') => {
        app.next_theme();
        return;
      }
      KeyCode::Char('o') => {
        app.open_in_browser();
        return;
      }
      _ => {}
    }
  }

  // F1..F5 search a suggested topic from either mode.
  if let KeyCode::F(n @ 1..=5) = key.code {
    app.search_suggestion(usize::from(n) - 1);
    return;
  }

  match app.mode {
    AppMode::Input => handle_input_key(app, key),
    AppMode::Player => handle_player_key(app, key),
  }
}

fn handle_input_key<E: Embed>(app: &mut App<E>, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => {
      app.submit_search();
    }
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    KeyCode::Tab => {
      if !app.queue.is_empty() {
        app.mode = AppMode::Player;
      }
    }
    KeyCode::Esc => {
      if !app.input.is_empty() {
        app.input.clear();
        app.cursor_position = 0;
        app.input_scroll = 0;
      } else if !app.queue.is_empty() {
        app.mode = AppMode::Player;
      } else {
        app.should_quit = true;
      }
    }
    _ => {}
  }
}

fn handle_player_key<E: Embed>(app: &mut App<E>, key: event::KeyEvent) {
  match key.code {
    KeyCode::Down | KeyCode::Right | KeyCode::Char('j') | KeyCode::Char('n') => {
      app.next_video();
    }
    KeyCode::Up | KeyCode::Left | KeyCode::Char('k') | KeyCode::Char('p') => {
      app.prev_video();
    }
    KeyCode::Tab | KeyCode::Esc | KeyCode::Char('/') => {
      app.mode = AppMode::Input;
    }
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::fetcher::{Page, PageFetcher};
  use crate::player::testing::FakeEmbed;
  use ratatui::crossterm::event::KeyEvent;
  use std::time::Duration;
  use tokio::sync::mpsc;

  fn make_app() -> (App<FakeEmbed>, FakeEmbed) {
    let embed = FakeEmbed::default();
    let (_tx, rx) = mpsc::unbounded_channel();
    let fetcher = PageFetcher::new("http://127.0.0.1:9/api").unwrap();
    (App::new(embed.clone(), rx, fetcher, Config::default(), Duration::from_secs(3)), embed)
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
  }

  fn type_str(app: &mut App<FakeEmbed>, s: &str) {
    for c in s.chars() {
      handle_key_event(app, key(KeyCode::Char(c)));
    }
  }

  /// Queue of three videos with the first one playing, focus on the player.
  fn playing(app: &mut App<FakeEmbed>) {
    app.queue.start_search("history").unwrap();
    let request = app.pagination.first_page(&app.queue);
    let page = Page { videos: vec!["a".into(), "b".into(), "c".into()], next_page_token: None };
    app.on_search_result(&request, Ok(page));
    app.mode = AppMode::Player;
  }

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("hello", 0), 0);
    assert_eq!(char_to_byte_index("hello", 3), 3);
    assert_eq!(char_to_byte_index("hello", 5), 5); // past end
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "aé日"; // a=1 byte, é=2 bytes, 日=3 bytes
    assert_eq!(char_to_byte_index(s, 0), 0); // 'a'
    assert_eq!(char_to_byte_index(s, 1), 1); // 'é' starts at byte 1
    assert_eq!(char_to_byte_index(s, 2), 3); // '日' starts at byte 3
    assert_eq!(char_to_byte_index(s, 3), 6); // past end
  }

  #[test]
  fn char_to_byte_empty() {
    assert_eq!(char_to_byte_index("", 0), 0);
    assert_eq!(char_to_byte_index("", 5), 0);
  }

  // --- input mode ---

  #[test]
  fn typing_edits_at_cursor() {
    let (mut app, _) = make_app();
    type_str(&mut app, "hstory");
    handle_key_event(&mut app, key(KeyCode::Home));
    handle_key_event(&mut app, key(KeyCode::Right));
    type_str(&mut app, "i");
    assert_eq!(app.input, "history");
    handle_key_event(&mut app, key(KeyCode::End));
    handle_key_event(&mut app, key(KeyCode::Backspace));
    assert_eq!(app.input, "histor");
    assert_eq!(app.cursor_position, 6);
  }

  #[test]
  fn letters_type_in_input_mode() {
    let (mut app, embed) = make_app();
    playing(&mut app);
    app.mode = AppMode::Input;
    type_str(&mut app, "jn");
    assert_eq!(app.input, "jn");
    assert_eq!(embed.mounted(), vec!["a"]);
  }

  #[test]
  fn enter_on_blank_input_stays_in_input() {
    let (mut app, _) = make_app();
    type_str(&mut app, "  ");
    handle_key_event(&mut app, key(KeyCode::Enter));
    assert_eq!(app.mode, AppMode::Input);
    assert!(app.tasks.search.is_none());
  }

  #[test]
  fn esc_clears_then_quits() {
    let (mut app, _) = make_app();
    type_str(&mut app, "abc");
    handle_key_event(&mut app, key(KeyCode::Esc));
    assert!(app.input.is_empty());
    assert!(!app.should_quit);
    handle_key_event(&mut app, key(KeyCode::Esc));
    assert!(app.should_quit);
  }

  #[test]
  fn ctrl_c_quits() {
    let (mut app, _) = make_app();
    handle_key_event(&mut app, ctrl('c'));
    assert!(app.should_quit);
  }

  // --- player mode ---

  #[test]
  fn player_keys_navigate() {
    let (mut app, embed) = make_app();
    playing(&mut app);
    handle_key_event(&mut app, key(KeyCode::Down));
    handle_key_event(&mut app, key(KeyCode::Char('n')));
    assert_eq!(app.queue.cursor(), Some(2));
    handle_key_event(&mut app, key(KeyCode::Char('j')));
    assert_eq!(app.queue.cursor(), Some(0));
    handle_key_event(&mut app, key(KeyCode::Left));
    assert_eq!(app.queue.cursor(), Some(2));
    assert_eq!(embed.mounted(), vec!["a", "b", "c", "a", "c"]);
    assert_eq!(embed.live(), 1);
  }

  #[test]
  fn focus_returns_to_input() {
    let (mut app, _) = make_app();
    playing(&mut app);
    handle_key_event(&mut app, key(KeyCode::Char('/')));
    assert_eq!(app.mode, AppMode::Input);
    handle_key_event(&mut app, key(KeyCode::Tab));
    assert_eq!(app.mode, AppMode::Player);
    handle_key_event(&mut app, key(KeyCode::Esc));
    assert_eq!(app.mode, AppMode::Input);
  }

  #[test]
  fn tab_needs_a_queue() {
    let (mut app, _) = make_app();
    handle_key_event(&mut app, key(KeyCode::Tab));
    assert_eq!(app.mode, AppMode::Input);
  }

  #[tokio::test]
  async fn function_key_searches_suggestion() {
    let (mut app, _) = make_app();
    handle_key_event(&mut app, key(KeyCode::F(2)));
    assert_eq!(app.input, crate::constants::constants().suggestions[1]);
    assert_eq!(app.queue.topic(), app.input);
    assert_eq!(app.mode, AppMode::Player);
  }
}
