use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub muted: Color,
  pub accent: Color,
  pub border: Color,
  pub status: Color,
  pub error: Color,
  pub key_fg: Color,
  pub key_bg: Color,
  pub badge_fg: Color,
  pub badge_bg: Color,
}

pub const THEMES: [Theme; 3] = [
  Theme {
    name: "Dusk",
    bg: Color::Rgb(24, 22, 36),
    fg: Color::Rgb(226, 222, 240),
    muted: Color::Rgb(128, 122, 150),
    accent: Color::Rgb(168, 126, 255),
    border: Color::Rgb(70, 64, 96),
    status: Color::Rgb(120, 200, 255),
    error: Color::Rgb(255, 128, 128),
    key_fg: Color::Rgb(24, 22, 36),
    key_bg: Color::Rgb(168, 126, 255),
    badge_fg: Color::Rgb(24, 22, 36),
    badge_bg: Color::Rgb(255, 196, 120),
  },
  Theme {
    name: "Paper",
    bg: Color::Rgb(250, 248, 242),
    fg: Color::Rgb(40, 40, 40),
    muted: Color::Rgb(140, 136, 128),
    accent: Color::Rgb(204, 60, 60),
    border: Color::Rgb(210, 204, 192),
    status: Color::Rgb(40, 110, 170),
    error: Color::Rgb(190, 40, 40),
    key_fg: Color::Rgb(250, 248, 242),
    key_bg: Color::Rgb(204, 60, 60),
    badge_fg: Color::Rgb(250, 248, 242),
    badge_bg: Color::Rgb(60, 130, 90),
  },
  Theme {
    name: "Terminal",
    bg: Color::Reset,
    fg: Color::White,
    muted: Color::DarkGray,
    accent: Color::Red,
    border: Color::Gray,
    status: Color::Cyan,
    error: Color::LightRed,
    key_fg: Color::Black,
    key_bg: Color::Red,
    badge_fg: Color::Black,
    badge_bg: Color::Yellow,
  },
];

pub fn index_of(name: &str) -> Option<usize> {
  THEMES.iter().position(|t| t.name.eq_ignore_ascii_case(name))
}
