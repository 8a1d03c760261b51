use std::collections::BTreeMap;

use thiserror::Error;

use crate::constants::constants;

/// The fixed set of filter categories the image API understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterCategory {
  Order,
  Orientation,
  Type,
  Colors,
}

impl FilterCategory {
  pub const ALL: [FilterCategory; 4] =
    [FilterCategory::Order, FilterCategory::Orientation, FilterCategory::Type, FilterCategory::Colors];

  /// Parameter key used in the query mapping.
  pub fn key(self) -> &'static str {
    match self {
      FilterCategory::Order => "order",
      FilterCategory::Orientation => "orientation",
      FilterCategory::Type => "type",
      FilterCategory::Colors => "colors",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      FilterCategory::Order => "Order",
      FilterCategory::Orientation => "Orientation",
      FilterCategory::Type => "Type",
      FilterCategory::Colors => "Colors",
    }
  }

  /// Legal values for this category, as listed in `constants.ron`.
  pub fn options(self) -> &'static [String] {
    let c = constants();
    match self {
      FilterCategory::Order => &c.order_options,
      FilterCategory::Orientation => &c.orientation_options,
      FilterCategory::Type => &c.type_options,
      FilterCategory::Colors => &c.color_options,
    }
  }

  pub fn allows(self, value: &str) -> bool {
    self.options().iter().any(|o| o == value)
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
  #[error("'{value}' is not a valid {category} filter")]
  InvalidValue { category: &'static str, value: String },
}

/// User-selected constraint values, at most one per category.
///
/// Every stored value is a member of its category's option list; the only way
/// in is through [`FilterSet::set`], which validates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
  entries: BTreeMap<FilterCategory, String>,
}

impl FilterSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn get(&self, category: FilterCategory) -> Option<&str> {
    self.entries.get(&category).map(String::as_str)
  }

  pub fn set(&mut self, category: FilterCategory, value: impl Into<String>) -> Result<(), FilterError> {
    let value = value.into();
    if !category.allows(&value) {
      return Err(FilterError::InvalidValue { category: category.key(), value });
    }
    self.entries.insert(category, value);
    Ok(())
  }

  /// Select `value`, or deselect it if it is already the selected value.
  pub fn toggle(&mut self, category: FilterCategory, value: &str) -> Result<(), FilterError> {
    if self.get(category) == Some(value) {
      self.entries.remove(&category);
      return Ok(());
    }
    self.set(category, value)
  }

  pub fn remove(&mut self, category: FilterCategory) -> Option<String> {
    self.entries.remove(&category)
  }

  pub fn iter(&self) -> impl Iterator<Item = (FilterCategory, &str)> {
    self.entries.iter().map(|(c, v)| (*c, v.as_str()))
  }
}

/// Cursor state for the filter editor modal. Edits a draft copy of the active
/// filters; nothing reaches the feed until the draft is applied.
#[derive(Debug, Clone, Default)]
pub struct FilterEditor {
  pub draft: FilterSet,
  row: usize,
  col: usize,
}

impl FilterEditor {
  pub fn new(current: Option<&FilterSet>) -> Self {
    Self { draft: current.cloned().unwrap_or_default(), row: 0, col: 0 }
  }

  pub fn category(&self) -> FilterCategory {
    FilterCategory::ALL[self.row]
  }

  pub fn cursor(&self) -> (usize, usize) {
    (self.row, self.col)
  }

  pub fn move_up(&mut self) {
    self.row = self.row.saturating_sub(1);
    self.clamp_col();
  }

  pub fn move_down(&mut self) {
    self.row = (self.row + 1).min(FilterCategory::ALL.len() - 1);
    self.clamp_col();
  }

  pub fn move_left(&mut self) {
    self.col = self.col.saturating_sub(1);
  }

  pub fn move_right(&mut self) {
    let last = self.category().options().len().saturating_sub(1);
    self.col = (self.col + 1).min(last);
  }

  /// Toggle the option under the cursor in the draft.
  pub fn toggle_current(&mut self) {
    let category = self.category();
    if let Some(value) = category.options().get(self.col) {
      // Options come from the category's own list, so this cannot fail.
      let _ = self.draft.toggle(category, value);
    }
  }

  fn clamp_col(&mut self) {
    let last = self.category().options().len().saturating_sub(1);
    self.col = self.col.min(last);
  }
}
