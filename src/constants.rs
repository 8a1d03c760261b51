//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available,
//! no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // Pixabay
  pub api_base_url: String,
  pub per_page: u32,
  pub safe_search: bool,
  pub editors_choice: bool,

  // Search box
  pub search_debounce_ms: u64,
  pub min_search_len: usize,

  /// Category bar entries, in display order.
  pub categories: Vec<String>,

  // Filter editor option lists
  pub order_options: Vec<String>,
  pub orientation_options: Vec<String>,
  pub type_options: Vec<String>,
  pub color_options: Vec<String>,

  /// Maximum number of preview images downloaded concurrently.
  pub preview_concurrency: usize,
  /// Simulated round trip of the mock banking backend.
  pub mock_latency_ms: u64,
}

impl Constants {
  pub fn search_debounce(&self) -> Duration {
    Duration::from_millis(self.search_debounce_ms)
  }

  pub fn mock_latency(&self) -> Duration {
    Duration::from_millis(self.mock_latency_ms)
  }
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
