use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub chip_bg: Color,
  pub status: Color,
  pub error: Color,
  pub success: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "Paper",
    bg: Color::Rgb(255, 255, 255),
    fg: Color::Rgb(20, 20, 20),
    accent: Color::Rgb(0, 0, 0),
    muted: Color::Rgb(115, 115, 115),
    border: Color::Rgb(229, 229, 229),
    highlight_fg: Color::Rgb(255, 255, 255),
    highlight_bg: Color::Rgb(38, 38, 38),
    stripe_bg: Color::Rgb(245, 245, 245),
    chip_bg: Color::Rgb(229, 229, 229),
    status: Color::Rgb(99, 102, 241),
    error: Color::Rgb(220, 38, 38),
    success: Color::Rgb(16, 185, 129),
    key_fg: Color::Rgb(255, 255, 255),
    key_bg: Color::Rgb(64, 64, 64),
  },
  Theme {
    name: "Midnight",
    bg: Color::Rgb(17, 17, 27),
    fg: Color::Rgb(205, 214, 244),
    accent: Color::Rgb(137, 180, 250),
    muted: Color::Rgb(108, 112, 134),
    border: Color::Rgb(69, 71, 90),
    highlight_fg: Color::Rgb(17, 17, 27),
    highlight_bg: Color::Rgb(137, 180, 250),
    stripe_bg: Color::Rgb(24, 24, 37),
    chip_bg: Color::Rgb(49, 50, 68),
    status: Color::Rgb(249, 226, 175),
    error: Color::Rgb(243, 139, 168),
    success: Color::Rgb(166, 227, 161),
    key_fg: Color::Rgb(17, 17, 27),
    key_bg: Color::Rgb(180, 190, 254),
  },
  Theme {
    name: "Terminal",
    bg: Color::Reset,
    fg: Color::Reset,
    accent: Color::Cyan,
    muted: Color::DarkGray,
    border: Color::DarkGray,
    highlight_fg: Color::Black,
    highlight_bg: Color::Cyan,
    stripe_bg: Color::Reset,
    chip_bg: Color::DarkGray,
    status: Color::Yellow,
    error: Color::Red,
    success: Color::Green,
    key_fg: Color::Black,
    key_bg: Color::Gray,
  },
];

/// Parse `#rrggbb` into a terminal color.
pub fn parse_hex(hex: &str) -> Option<Color> {
  let hex = hex.strip_prefix('#')?;
  if hex.len() != 6 {
    return None;
  }
  let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
  Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}
