use std::io::{Cursor, Write};

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use color_quant::NeuQuant;
use image::{DynamicImage, ImageFormat, imageops::FilterType};
use ratatui::{
  buffer::Buffer,
  layout::Rect,
  style::{Color, Style},
  widgets::Widget,
};

use crate::display::DisplayMode;

/// Width-to-height ratio of a terminal cell, in pixels.
const CELL_ASPECT: f32 = 0.5;

/// Largest rectangle inside `area` with the image's aspect ratio, centered.
pub fn fit_area(area: Rect, aspect: f32) -> Rect {
  if area.is_empty() || !aspect.is_finite() || aspect <= 0.0 {
    return area;
  }
  // Columns per row that reproduce the pixel aspect on screen.
  let cols_per_row = aspect / CELL_ASPECT;
  let mut width = area.width;
  let mut height = (width as f32 / cols_per_row).round() as u16;
  if height > area.height {
    height = area.height;
    width = ((height as f32 * cols_per_row).round() as u16).min(area.width);
  }
  let (width, height) = (width.max(1), height.max(1));
  Rect {
    x: area.x + (area.width - width) / 2,
    y: area.y + (area.height - height) / 2,
    width,
    height,
  }
}

/// Pixel size to resample an image to before drawing it into `area` with cells.
pub fn cell_pixels(area: Rect, mode: DisplayMode) -> (u32, u32) {
  let rows = area.height as f32 / mode.rows_per_pixel_pair();
  (area.width.max(1) as u32, (rows.round() as u32).max(1))
}

/// Resample for cell rendering; graphics protocols scale on their own.
pub fn prepare(image: &DynamicImage, area: Rect, mode: DisplayMode) -> DynamicImage {
  let (w, h) = cell_pixels(area, mode);
  image.resize_exact(w, h, FilterType::Triangle)
}

// --- Preview Widget ---

pub struct PreviewWidget<'a> {
  /// Already resampled with [`prepare`].
  pub image: &'a DynamicImage,
  pub display_mode: DisplayMode,
}

const ASCII_RAMP: [&str; 10] = [" ", ".", ":", "-", "=", "+", "*", "#", "%", "@"];

impl Widget for PreviewWidget<'_> {
  fn render(self, area: Rect, buf: &mut Buffer) {
    if area.is_empty() {
      return;
    }
    match self.display_mode {
      DisplayMode::Blocks => render_blocks(self.image, area, buf),
      DisplayMode::Ascii => render_ascii(self.image, area, buf),
      DisplayMode::Kitty | DisplayMode::Sixel => {}
    }
  }
}

fn cell(area: Rect, x: u32, y: u32) -> (u16, u16) {
  let x = u16::try_from(x).unwrap_or(u16::MAX);
  let y = u16::try_from(y).unwrap_or(u16::MAX);
  (area.x.saturating_add(x), area.y.saturating_add(y))
}

/// Two pixels per cell: the upper one as foreground of `▀`, the lower one as background.
fn render_blocks(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let rgb = image.to_rgb8();
  let width = rgb.width().min(area.width as u32);
  let rows = rgb.height().div_ceil(2).min(area.height as u32);

  for y in 0..rows {
    for x in 0..width {
      let upper = rgb.get_pixel(x, y * 2);
      let fg = Color::Rgb(upper[0], upper[1], upper[2]);
      let bg = match y * 2 + 1 {
        lower_y if lower_y < rgb.height() => {
          let lower = rgb.get_pixel(x, lower_y);
          Color::Rgb(lower[0], lower[1], lower[2])
        }
        _ => Color::Reset,
      };
      let (cx, cy) = cell(area, x, y);
      buf.set_string(cx, cy, "▀", Style::default().fg(fg).bg(bg));
    }
  }
}

fn render_ascii(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let luma = image.to_luma8();
  let width = luma.width().min(area.width as u32);
  let height = luma.height().min(area.height as u32);

  for y in 0..height {
    for x in 0..width {
      let level = luma.get_pixel(x, y)[0] as usize * (ASCII_RAMP.len() - 1) / 255;
      let (cx, cy) = cell(area, x, y);
      buf.set_string(cx, cy, ASCII_RAMP[level.min(ASCII_RAMP.len() - 1)], Style::default());
    }
  }
}

// --- Kitty Graphics Protocol ---
//
//   First:     \x1B_G a=T,f=100,t=d,i=1,p=1,c=<cols>,r=<rows>,q=2,m=1;<base64>\x1B\\
//   Continue:  \x1B_G m=1;<base64>\x1B\\
//   Last:      \x1B_G m=0;<base64>\x1B\\
//
// A fixed image and placement id means each send replaces the previous preview.

const KITTY_CHUNK_SIZE: usize = 4096;

/// Escape sequences transmitting `image` as PNG, scaled by the terminal over `area`.
pub fn kitty_sequences(image: &DynamicImage, area: Rect) -> Result<Vec<String>> {
  let mut png = Vec::new();
  image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png).context("Failed to encode preview as PNG for kitty")?;

  let b64 = BASE64.encode(&png);
  let chunks: Vec<&[u8]> = b64.as_bytes().chunks(KITTY_CHUNK_SIZE).collect();
  let last = chunks.len().saturating_sub(1);

  chunks
    .iter()
    .enumerate()
    .map(|(i, chunk)| {
      let data = std::str::from_utf8(chunk).context("base64 chunk was not valid UTF-8")?;
      let more = u8::from(i < last);
      Ok(if i == 0 {
        format!("\x1B_Ga=T,f=100,t=d,i=1,p=1,c={},r={},q=2,m={};{}\x1B\\", area.width, area.height, more, data)
      } else {
        format!("\x1B_Gm={};{}\x1B\\", more, data)
      })
    })
    .collect()
}

/// Delete every Kitty image on screen (leaving a preview, and on exit).
pub fn kitty_delete_all() -> Result<()> {
  let mut stdout = std::io::stdout();
  write!(stdout, "\x1B_Ga=d,d=a,q=2\x1B\\").context("Failed to write kitty delete all")?;
  stdout.flush().context("Failed to flush kitty delete")?;
  Ok(())
}

pub fn kitty_render_image(image: &DynamicImage, area: Rect) -> Result<()> {
  if area.is_empty() {
    return Ok(());
  }
  let sequences = kitty_sequences(image, area)?;
  let mut stdout = std::io::stdout();
  write!(stdout, "\x1B[{};{}H", area.y.saturating_add(1), area.x.saturating_add(1))
    .context("Failed to position cursor for kitty image")?;
  for seq in sequences {
    stdout.write_all(seq.as_bytes()).context("Failed to write kitty image chunk")?;
  }
  stdout.flush().context("Failed to flush kitty image")?;
  Ok(())
}

// --- Sixel Graphics Protocol ---
//
//   DCS q "1;1;<w>;<h> #<n>;2;<r%>;<g%>;<b%> ... <data> ST
//
// Each data character (0x3F + bitmap) covers six vertical pixels of one color.
// `$` rewinds to the start of the band, `-` moves to the next band, and
// `!<n><ch>` repeats a character. Colors are quantized with NeuQuant.

const SIXEL_MAX_COLORS: usize = 256;
/// Assumed cell size in pixels when rasterizing for Sixel.
const SIXEL_CELL: (u32, u32) = (8, 16);

fn push_run(out: &mut String, ch: char, run: usize) {
  if run > 3 {
    out.push_str(&format!("!{}{}", run, ch));
  } else {
    out.extend(std::iter::repeat_n(ch, run));
  }
}

/// Encode `image` as a Sixel stream sized to cover `area`.
pub fn encode_sixel(image: &DynamicImage, area: Rect) -> String {
  let rgb = image
    .resize_exact(area.width as u32 * SIXEL_CELL.0, area.height as u32 * SIXEL_CELL.1, FilterType::Triangle)
    .into_rgb8();
  let (w, h) = (rgb.width() as usize, rgb.height() as usize);

  let rgba: Vec<u8> = rgb.pixels().flat_map(|p| [p[0], p[1], p[2], 255]).collect();
  let nq = NeuQuant::new(10, SIXEL_MAX_COLORS, &rgba);
  let palette: Vec<[u8; 3]> = nq.color_map_rgb().chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
  let indices: Vec<usize> = rgb.pixels().map(|p| nq.index_of(&[p[0], p[1], p[2], 255])).collect();

  let mut out = format!("\x1BPq\"1;1;{};{}", w, h);
  for (i, c) in palette.iter().enumerate() {
    let pct = |v: u8| v as u32 * 100 / 255;
    out.push_str(&format!("#{};2;{};{};{}", i, pct(c[0]), pct(c[1]), pct(c[2])));
  }

  let mut band = vec![0u8; w];
  for y_base in (0..h).step_by(6) {
    for color in 0..palette.len() {
      band.iter_mut().for_each(|b| *b = 0);
      let mut used = false;
      for bit in 0..6 {
        let y = y_base + bit;
        if y >= h {
          break;
        }
        for (x, slot) in band.iter_mut().enumerate() {
          if indices[y * w + x] == color {
            *slot |= 1 << bit;
            used = true;
          }
        }
      }
      if !used {
        continue;
      }

      out.push_str(&format!("#{}", color));
      let mut run_start = 0;
      for x in 1..=w {
        if x == w || band[x] != band[run_start] {
          push_run(&mut out, (band[run_start] + 0x3F) as char, x - run_start);
          run_start = x;
        }
      }
      out.push('$');
    }
    out.push('-');
  }
  out.push_str("\x1B\\");
  out
}

pub fn sixel_render_image(image: &DynamicImage, area: Rect) -> Result<()> {
  if area.is_empty() {
    return Ok(());
  }
  let data = encode_sixel(image, area);
  let mut stdout = std::io::stdout();
  write!(stdout, "\x1B[{};{}H{}", area.y.saturating_add(1), area.x.saturating_add(1), data)
    .context("Failed to write sixel image")?;
  stdout.flush().context("Failed to flush sixel image")?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  fn solid(w: u32, h: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(color)))
  }

  // --- fit_area ---

  #[test]
  fn landscape_image_is_height_bound() {
    let area = Rect::new(0, 0, 80, 20);
    let fit = fit_area(area, 16.0 / 9.0);
    assert_eq!(fit.height, 20);
    assert_eq!(fit.width, 71);
    assert_eq!(fit.x, 4);
  }

  #[test]
  fn wide_area_with_square_image_is_centered() {
    let fit = fit_area(Rect::new(10, 5, 100, 30), 1.0);
    assert_eq!((fit.width, fit.height), (60, 30));
    assert_eq!((fit.x, fit.y), (30, 5));
  }

  #[test]
  fn tall_area_is_width_bound() {
    let fit = fit_area(Rect::new(0, 0, 20, 50), 2.0);
    assert_eq!((fit.width, fit.height), (20, 5));
    assert_eq!(fit.y, 22);
  }

  #[test]
  fn degenerate_aspect_keeps_area() {
    let area = Rect::new(0, 0, 10, 10);
    assert_eq!(fit_area(area, 0.0), area);
    assert_eq!(fit_area(area, f32::NAN), area);
  }

  #[test]
  fn half_blocks_use_two_pixel_rows_per_cell() {
    let area = Rect::new(0, 0, 30, 10);
    assert_eq!(cell_pixels(area, DisplayMode::Blocks), (30, 20));
    assert_eq!(cell_pixels(area, DisplayMode::Ascii), (30, 10));
  }

  // --- widgets ---

  #[test]
  fn blocks_paint_upper_and_lower_pixels() {
    let area = Rect::new(0, 0, 4, 2);
    let image = solid(4, 4, [255, 0, 0]);
    let mut buf = Buffer::empty(area);
    PreviewWidget { image: &image, display_mode: DisplayMode::Blocks }.render(area, &mut buf);
    let cell = &buf[(1, 1)];
    assert_eq!(cell.symbol(), "▀");
    assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
    assert_eq!(cell.bg, Color::Rgb(255, 0, 0));
  }

  #[test]
  fn ascii_maps_white_to_densest_glyph() {
    let area = Rect::new(0, 0, 3, 2);
    let image = solid(3, 2, [255, 255, 255]);
    let mut buf = Buffer::empty(area);
    PreviewWidget { image: &image, display_mode: DisplayMode::Ascii }.render(area, &mut buf);
    assert_eq!(buf[(2, 1)].symbol(), "@");
  }

  // --- protocols ---

  #[test]
  fn kitty_chunks_mark_continuation() {
    let sequences = kitty_sequences(&solid(64, 64, [10, 200, 30]), Rect::new(0, 0, 10, 5)).unwrap();
    let first = &sequences[0];
    assert!(first.starts_with("\x1B_Ga=T,f=100"));
    assert!(first.contains("c=10,r=5"));
    let last = sequences.last().unwrap();
    assert!(last.contains("m=0;"));
  }

  #[test]
  fn sixel_stream_is_framed() {
    let data = encode_sixel(&solid(16, 16, [0, 0, 255]), Rect::new(0, 0, 4, 2));
    assert!(data.starts_with("\x1BPq\"1;1;32;32"));
    assert!(data.ends_with("\x1B\\"));
    // A solid image compresses every full band into one repeated run.
    assert!(data.contains("!32~"));
  }
}
