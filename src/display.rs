use clap::ValueEnum;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliDisplayMode {
  Auto,
  Kitty,
  Sixel,
  Blocks,
  Ascii,
}

/// How image previews are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
  Ascii,
  /// True-color half-block cells.
  Blocks,
  Sixel,
  Kitty,
}

impl DisplayMode {
  pub fn label(self) -> &'static str {
    match self {
      DisplayMode::Ascii => "ascii",
      DisplayMode::Blocks => "half-block",
      DisplayMode::Sixel => "sixel",
      DisplayMode::Kitty => "kitty",
    }
  }

  /// Whether previews are written straight to the terminal instead of the cell buffer.
  pub fn is_graphics_protocol(self) -> bool {
    matches!(self, DisplayMode::Kitty | DisplayMode::Sixel)
  }

  /// Terminal rows used per pixel row when sizing a preview.
  pub fn rows_per_pixel_pair(self) -> f32 {
    match self {
      DisplayMode::Blocks => 0.5,
      _ => 1.0,
    }
  }
}

/// Pick the best mode from the terminal's environment.
///
/// Probe order: Kitty graphics > Sixel > true-color half-block > ASCII
pub fn detect_from_env(term: &str, term_program: &str, colorterm: &str) -> DisplayMode {
  let term_program = term_program.to_lowercase();
  if term == "xterm-kitty" || matches!(term_program.as_str(), "kitty" | "wezterm" | "ghostty") {
    return DisplayMode::Kitty;
  }
  if matches!(term_program.as_str(), "foot" | "mlterm" | "contour") || term.contains("sixel") {
    return DisplayMode::Sixel;
  }
  let colorterm = colorterm.to_lowercase();
  if colorterm == "truecolor" || colorterm == "24bit" {
    return DisplayMode::Blocks;
  }
  DisplayMode::Ascii
}

pub fn detect_display_mode() -> DisplayMode {
  let var = |name: &str| std::env::var(name).unwrap_or_default();
  detect_from_env(&var("TERM"), &var("TERM_PROGRAM"), &var("COLORTERM"))
}

pub fn resolve_display_mode(cli: CliDisplayMode) -> DisplayMode {
  match cli {
    CliDisplayMode::Auto => detect_display_mode(),
    CliDisplayMode::Kitty => DisplayMode::Kitty,
    CliDisplayMode::Sixel => DisplayMode::Sixel,
    CliDisplayMode::Blocks => DisplayMode::Blocks,
    CliDisplayMode::Ascii => DisplayMode::Ascii,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kitty_family_detected() {
    assert_eq!(detect_from_env("xterm-kitty", "", ""), DisplayMode::Kitty);
    assert_eq!(detect_from_env("xterm-256color", "WezTerm", "truecolor"), DisplayMode::Kitty);
  }

  #[test]
  fn sixel_terminals_detected() {
    assert_eq!(detect_from_env("foot", "foot", "truecolor"), DisplayMode::Sixel);
    assert_eq!(detect_from_env("xterm-sixel", "", ""), DisplayMode::Sixel);
  }

  #[test]
  fn truecolor_falls_back_to_blocks_then_ascii() {
    assert_eq!(detect_from_env("xterm-256color", "Apple_Terminal", "24bit"), DisplayMode::Blocks);
    assert_eq!(detect_from_env("xterm", "", ""), DisplayMode::Ascii);
  }
}
