//! Incremental image feed: query reconciliation, pagination and result storage.
//!
//! [`FeedController`] is a synchronous state machine. Every user action either
//! returns `None` or a [`FetchRequest`]; the caller runs the request against the
//! search client and hands the outcome back through
//! [`FeedController::apply_response`]. Keeping the network out of the controller
//! makes every transition testable without a runtime.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::filters::{FilterCategory, FilterEditor, FilterSet};
use crate::pixabay::{ImageHit, SearchError, SearchResponse};

// --- Query ---

/// The composite of term, category, filters and page cursor driving a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
  pub page: u32,
  pub search_term: Option<String>,
  pub category: Option<String>,
  pub filters: FilterSet,
}

impl Query {
  /// Request parameters: `page`, then `q` and `category` when present, then every filter entry.
  pub fn params(&self) -> Vec<(String, String)> {
    let mut params = vec![("page".to_string(), self.page.to_string())];
    if let Some(ref term) = self.search_term
      && !term.is_empty()
    {
      params.push(("q".to_string(), term.clone()));
    }
    if let Some(ref category) = self.category {
      params.push(("category".to_string(), category.clone()));
    }
    params.extend(self.filters.iter().map(|(c, v)| (c.key().to_string(), v.to_string())));
    params
  }

  #[cfg(test)]
  pub fn param(&self, key: &str) -> Option<String> {
    self.params().into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
  }
}

// --- Fetch bookkeeping ---

/// Identifies one issued fetch. `lineage` is the `seq` of the reset fetch that
/// started the current result list; appends inherit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
  pub seq: u64,
  pub lineage: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
  /// Replaces the result store.
  Reset,
  /// Extends the result store.
  Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
  pub ticket: Ticket,
  pub mode: FetchMode,
  pub query: Query,
}

impl FetchRequest {
  pub fn params(&self) -> Vec<(String, String)> {
    self.query.params()
  }
}

/// What [`FeedController::apply_response`] did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
  Replaced(usize),
  Appended(usize),
  /// The response belongs to a superseded query and was dropped.
  Stale,
  /// Transport/status failure or a null hit list; the store is untouched.
  Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Idle,
  Fetching,
}

// --- Result store ---

/// Ordered hits accumulated across the pages of one query lineage.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
  items: Vec<ImageHit>,
}

impl ResultStore {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&ImageHit> {
    self.items.get(index)
  }

  pub fn items(&self) -> &[ImageHit] {
    &self.items
  }

  fn clear(&mut self) {
    self.items.clear();
  }

  fn replace(&mut self, hits: Vec<ImageHit>) {
    self.items = hits;
  }

  fn append(&mut self, hits: Vec<ImageHit>) {
    self.items.extend(hits);
  }
}

// --- Debounce ---

/// Deadline-based debouncer: each push re-arms the timer, and only the last
/// value pushed within the window is released once the window elapses.
#[derive(Debug)]
pub struct Debouncer<T> {
  window: Duration,
  pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
  pub fn new(window: Duration) -> Self {
    Self { window, pending: None }
  }

  pub fn push(&mut self, value: T, now: Instant) {
    self.pending = Some((value, now + self.window));
  }

  pub fn cancel(&mut self) {
    self.pending = None;
  }

  /// Release the pending value if its deadline has passed.
  pub fn take_settled(&mut self, now: Instant) -> Option<T> {
    match self.pending {
      Some((_, deadline)) if now >= deadline => self.pending.take().map(|(value, _)| value),
      _ => None,
    }
  }
}

// --- Controller ---

pub struct FeedController {
  page: u32,
  /// Term of the query that produced the current store.
  search_term: String,
  /// Last settled input, kept even when too short to search.
  typed_term: String,
  category: Option<String>,
  /// `None` until the user has applied filters at least once.
  filters: Option<FilterSet>,
  store: ResultStore,
  end_of_page_reached: bool,
  /// No more pages are reachable for the current lineage. Also set when the
  /// first page failed, so nothing is appended to a list that never loaded.
  exhausted: bool,
  total_hits: Option<u32>,
  next_seq: u64,
  lineage: u64,
  /// Seq of the most recently issued fetch still awaiting a response.
  awaiting: Option<u64>,
  /// Open filter editor, if any.
  pub editor: Option<FilterEditor>,
  /// Last fetch failure, cleared by the next successful response.
  pub last_error: Option<String>,
}

impl Default for FeedController {
  fn default() -> Self {
    Self::new()
  }
}

impl FeedController {
  pub fn new() -> Self {
    Self {
      page: 1,
      search_term: String::new(),
      typed_term: String::new(),
      category: None,
      filters: None,
      store: ResultStore::default(),
      end_of_page_reached: false,
      exhausted: false,
      total_hits: None,
      next_seq: 0,
      lineage: 0,
      awaiting: None,
      editor: None,
      last_error: None,
    }
  }

  // --- Accessors ---

  pub fn page(&self) -> u32 {
    self.page
  }

  pub fn search_term(&self) -> &str {
    &self.search_term
  }

  pub fn typed_term(&self) -> &str {
    &self.typed_term
  }

  pub fn category(&self) -> Option<&str> {
    self.category.as_deref()
  }

  pub fn filters(&self) -> Option<&FilterSet> {
    self.filters.as_ref()
  }

  pub fn store(&self) -> &ResultStore {
    &self.store
  }

  pub fn total_hits(&self) -> Option<u32> {
    self.total_hits
  }

  pub fn is_exhausted(&self) -> bool {
    self.exhausted
  }

  #[cfg(test)]
  pub fn end_of_page_reached(&self) -> bool {
    self.end_of_page_reached
  }

  pub fn phase(&self) -> Phase {
    if self.awaiting.is_some() { Phase::Fetching } else { Phase::Idle }
  }

  /// Snapshot of the query the next fetch would use.
  pub fn query(&self) -> Query {
    Query {
      page: self.page,
      search_term: (!self.search_term.is_empty()).then(|| self.search_term.clone()),
      category: self.category.clone(),
      filters: self.filters.clone().unwrap_or_default(),
    }
  }

  // --- Actions ---

  /// Initial load when the browser opens.
  pub fn start(&mut self) -> FetchRequest {
    self.reset_fetch()
  }

  /// Apply a settled search term. Terms of 1..min_search_len chars are stored but not searched.
  pub fn set_search_term(&mut self, text: &str) -> Option<FetchRequest> {
    self.typed_term = text.to_string();
    let len = text.chars().count();
    if len != 0 && len < constants().min_search_len {
      debug!(term = %text, "search term too short, waiting for more input");
      return None;
    }
    self.search_term = text.to_string();
    self.category = None;
    info!(term = %text, "search term settled");
    Some(self.reset_fetch())
  }

  /// Select a category, or clear it with `None`. Clears any search term.
  pub fn set_category(&mut self, category: Option<&str>) -> Option<FetchRequest> {
    self.category = category.map(str::to_string);
    self.search_term.clear();
    self.typed_term.clear();
    info!(category = ?self.category, "category changed");
    Some(self.reset_fetch())
  }

  pub fn open_filter_editor(&mut self) {
    self.editor = Some(FilterEditor::new(self.filters.as_ref()));
  }

  pub fn close_filter_editor(&mut self) {
    self.editor = None;
  }

  /// Replace the active filters. An empty set is ignored; the editor closes either way.
  pub fn apply_filters(&mut self, filters: FilterSet) -> Option<FetchRequest> {
    self.close_filter_editor();
    if filters.is_empty() {
      return None;
    }
    info!(count = filters.len(), "filters applied");
    self.filters = Some(filters);
    Some(self.reset_fetch())
  }

  /// Drop all filters, if any were ever applied. The editor closes either way.
  pub fn reset_filters(&mut self) -> Option<FetchRequest> {
    self.close_filter_editor();
    self.filters.take()?;
    info!("filters reset");
    Some(self.reset_fetch())
  }

  /// Drop one applied filter. Removing a value that is not applied does nothing.
  pub fn remove_filter(&mut self, category: FilterCategory) -> Option<FetchRequest> {
    self.filters.as_mut()?.remove(category)?;
    info!(filter = category.key(), "filter removed");
    Some(self.reset_fetch())
  }

  pub fn clear_search(&mut self) -> Option<FetchRequest> {
    self.search_term.clear();
    self.typed_term.clear();
    Some(self.reset_fetch())
  }

  /// Level-triggered end-of-list detection. Fires one append fetch per dwell
  /// past the bottom threshold; leaving the threshold re-arms the latch.
  /// Nothing fires while any fetch of the current lineage is outstanding, so
  /// pages land in order.
  pub fn on_scroll_position_changed(
    &mut self,
    content_height: i64,
    viewport_height: i64,
    scroll_offset: i64,
  ) -> Option<FetchRequest> {
    let bottom_position = content_height - viewport_height;
    if scroll_offset > bottom_position - 1 {
      if self.end_of_page_reached || self.awaiting.is_some() || self.exhausted {
        return None;
      }
      self.end_of_page_reached = true;
      self.page += 1;
      let request = self.issue(FetchMode::Append);
      debug!(page = self.page, seq = request.ticket.seq, "end of list reached, loading next page");
      Some(request)
    } else {
      self.end_of_page_reached = false;
      None
    }
  }

  /// Fold a finished fetch back into the store.
  pub fn apply_response(
    &mut self,
    ticket: Ticket,
    mode: FetchMode,
    result: Result<SearchResponse, SearchError>,
  ) -> ApplyOutcome {
    if ticket.lineage != self.lineage {
      debug!(seq = ticket.seq, lineage = ticket.lineage, current = self.lineage, "discarding stale response");
      return ApplyOutcome::Stale;
    }
    if self.awaiting == Some(ticket.seq) {
      self.awaiting = None;
    }

    let response = match result {
      Ok(response) => response,
      Err(e) => {
        warn!(seq = ticket.seq, err = %e, "image search failed");
        self.last_error = Some(format!("Search failed: {}", e));
        self.page_failed(mode);
        return ApplyOutcome::Failed;
      }
    };
    let Some(hits) = response.hits else {
      self.page_failed(mode);
      return ApplyOutcome::Failed;
    };

    self.last_error = None;
    self.total_hits = Some(response.total_hits);
    let count = hits.len();
    let outcome = match mode {
      FetchMode::Reset => {
        self.store.replace(hits);
        ApplyOutcome::Replaced(count)
      }
      FetchMode::Append => {
        self.store.append(hits);
        ApplyOutcome::Appended(count)
      }
    };
    self.exhausted = count == 0 || self.store.len() >= response.total_hits as usize;
    debug!(seq = ticket.seq, count, total = self.store.len(), exhausted = self.exhausted, "results applied");
    outcome
  }

  // --- Internals ---

  fn reset_fetch(&mut self) -> FetchRequest {
    self.page = 1;
    self.store.clear();
    self.exhausted = false;
    self.total_hits = None;
    self.end_of_page_reached = false;
    self.issue(FetchMode::Reset)
  }

  fn issue(&mut self, mode: FetchMode) -> FetchRequest {
    self.next_seq += 1;
    if mode == FetchMode::Reset {
      self.lineage = self.next_seq;
    }
    let ticket = Ticket { seq: self.next_seq, lineage: self.lineage };
    self.awaiting = Some(ticket.seq);
    FetchRequest { ticket, mode, query: self.query() }
  }

  /// A failed append gives the page number back so the next scroll retries it.
  /// A failed reset leaves no first page to extend.
  fn page_failed(&mut self, mode: FetchMode) {
    match mode {
      FetchMode::Append if self.page > 1 => {
        self.page -= 1;
        self.end_of_page_reached = false;
      }
      FetchMode::Append => {}
      FetchMode::Reset => self.exhausted = true,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn hit(id: u64) -> ImageHit {
    ImageHit {
      id,
      page_url: String::new(),
      tags: "a, b".to_string(),
      preview_url: format!("https://cdn.example/{id}_150.jpg"),
      webformat_url: format!("https://cdn.example/{id}_640.jpg"),
      image_width: 640,
      image_height: 480,
      user: "someone".to_string(),
      likes: 0,
      downloads: 0,
      views: 0,
    }
  }

  fn page_of(ids: std::ops::Range<u64>, total_hits: u32) -> Result<SearchResponse, SearchError> {
    Ok(SearchResponse { total_hits, hits: Some(ids.map(hit).collect()) })
  }

  fn land(feed: &mut FeedController, request: &FetchRequest, ids: std::ops::Range<u64>) -> ApplyOutcome {
    feed.apply_response(request.ticket, request.mode, page_of(ids, 500))
  }

  /// A controller that has finished its initial load of 25 hits.
  fn loaded() -> FeedController {
    let mut feed = FeedController::new();
    let request = feed.start();
    land(&mut feed, &request, 0..25);
    feed
  }

  fn filters(pairs: &[(FilterCategory, &str)]) -> FilterSet {
    let mut set = FilterSet::new();
    for (c, v) in pairs {
      set.set(*c, *v).unwrap();
    }
    set
  }

  // --- Query ---

  #[test]
  fn params_union_of_page_term_category_and_filters() {
    let query = Query {
      page: 3,
      search_term: Some("cat".to_string()),
      category: None,
      filters: filters(&[(FilterCategory::Order, "popular"), (FilterCategory::Colors, "red")]),
    };
    let params = query.params();
    assert_eq!(params[0], ("page".to_string(), "3".to_string()));
    assert_eq!(query.param("q").as_deref(), Some("cat"));
    assert_eq!(query.param("order").as_deref(), Some("popular"));
    assert_eq!(query.param("colors").as_deref(), Some("red"));
    assert_eq!(query.param("category"), None);
  }

  #[test]
  fn empty_term_is_not_sent() {
    let query = Query { page: 1, search_term: Some(String::new()), category: None, filters: FilterSet::new() };
    assert_eq!(query.params(), vec![("page".to_string(), "1".to_string())]);
  }

  // --- Debouncer ---

  #[test]
  fn debouncer_releases_only_last_value_after_window() {
    let start = Instant::now();
    let mut debouncer = Debouncer::new(Duration::from_millis(400));
    debouncer.push("c", start);
    debouncer.push("ca", start + Duration::from_millis(100));
    debouncer.push("cat", start + Duration::from_millis(200));
    assert_eq!(debouncer.take_settled(start + Duration::from_millis(500)), None);
    assert_eq!(debouncer.take_settled(start + Duration::from_millis(600)), Some("cat"));
    assert_eq!(debouncer.take_settled(start + Duration::from_secs(5)), None);
  }

  #[test]
  fn debouncer_cancel_drops_pending_value() {
    let start = Instant::now();
    let mut debouncer = Debouncer::new(Duration::from_millis(400));
    debouncer.push(1, start);
    debouncer.cancel();
    assert_eq!(debouncer.take_settled(start + Duration::from_secs(1)), None);
  }

  // --- Search term ---

  #[test]
  fn settled_terms_fetch_only_when_empty_or_long_enough() {
    let mut feed = loaded();
    let issued: Vec<bool> =
      ["c", "ca", "cat", "", "do", "dogs"].iter().map(|t| feed.set_search_term(t).is_some()).collect();
    assert_eq!(issued, vec![false, false, true, true, false, true]);
  }

  #[test]
  fn short_term_is_stored_without_touching_results() {
    let mut feed = loaded();
    feed.set_category(Some("nature"));
    assert!(feed.set_search_term("ab").is_none());
    assert_eq!(feed.typed_term(), "ab");
    assert_eq!(feed.search_term(), "");
    assert_eq!(feed.category(), Some("nature"));
  }

  #[test]
  fn empty_term_resets_everything() {
    let mut feed = loaded();
    let first = feed.set_search_term("mountains").unwrap();
    land(&mut feed, &first, 0..25);
    feed.set_category(Some("travel"));
    let request = feed.set_search_term("").unwrap();
    assert_eq!(request.mode, FetchMode::Reset);
    assert_eq!(feed.category(), None);
    assert!(feed.store().is_empty());
    assert_eq!(request.query.param("q"), None);
    assert_eq!(request.query.page, 1);
  }

  // --- Category / term exclusivity ---

  #[test]
  fn category_then_term_scenario() {
    let mut feed = FeedController::new();
    let request = feed.set_category(Some("nature")).unwrap();
    assert_eq!(
      request.params(),
      vec![("page".to_string(), "1".to_string()), ("category".to_string(), "nature".to_string())]
    );
    assert!(feed.store().is_empty());

    let request = feed.set_search_term("cat").unwrap();
    assert_eq!(feed.category(), None);
    assert_eq!(request.params(), vec![("page".to_string(), "1".to_string()), ("q".to_string(), "cat".to_string())]);
    assert!(feed.store().is_empty());
  }

  #[test]
  fn category_clears_term_and_keeps_filters() {
    let mut feed = loaded();
    feed.apply_filters(filters(&[(FilterCategory::Orientation, "vertical")]));
    feed.set_search_term("sunset");
    let request = feed.set_category(Some("places")).unwrap();
    assert_eq!(feed.search_term(), "");
    assert_eq!(request.query.param("q"), None);
    assert_eq!(request.query.param("orientation").as_deref(), Some("vertical"));
  }

  #[test]
  fn term_clears_category_and_keeps_filters() {
    let mut feed = loaded();
    feed.apply_filters(filters(&[(FilterCategory::Type, "photo")]));
    feed.set_category(Some("food"));
    let request = feed.set_search_term("pasta").unwrap();
    assert_eq!(request.query.param("category"), None);
    assert_eq!(request.query.param("type").as_deref(), Some("photo"));
  }

  // --- Filters ---

  #[test]
  fn apply_empty_filters_is_ignored_but_closes_editor() {
    let mut feed = loaded();
    feed.open_filter_editor();
    assert!(feed.apply_filters(FilterSet::new()).is_none());
    assert!(feed.editor.is_none());
    assert_eq!(feed.store().len(), 25);
  }

  #[test]
  fn reset_filters_requires_previous_filters() {
    let mut feed = loaded();
    feed.open_filter_editor();
    assert!(feed.reset_filters().is_none());
    assert!(feed.editor.is_none());

    feed.apply_filters(filters(&[(FilterCategory::Order, "latest")]));
    feed.open_filter_editor();
    let request = feed.reset_filters().unwrap();
    assert!(feed.editor.is_none());
    assert!(feed.filters().is_none());
    assert_eq!(request.query.param("order"), None);
  }

  #[test]
  fn remove_filter_scenario() {
    let mut feed = loaded();
    let applied = feed.apply_filters(filters(&[(FilterCategory::Order, "popular")])).unwrap();
    land(&mut feed, &applied, 0..25);
    let scrolled = feed.on_scroll_position_changed(100, 20, 80).unwrap();
    land(&mut feed, &scrolled, 25..50);
    assert_eq!(feed.page(), 2);

    let request = feed.remove_filter(FilterCategory::Order).unwrap();
    assert_eq!(request.query.param("order"), None);
    assert_eq!(request.query.page, 1);
    assert_eq!(feed.page(), 1);
    assert!(feed.store().is_empty());
  }

  #[test]
  fn removing_absent_filter_is_a_no_op() {
    let mut feed = loaded();
    assert!(feed.remove_filter(FilterCategory::Order).is_none());
    assert!(feed.filters().is_none());
    assert!(feed.reset_filters().is_none());
    assert_eq!(feed.store().len(), 25);

    feed.apply_filters(filters(&[(FilterCategory::Type, "vector")]));
    assert!(feed.remove_filter(FilterCategory::Order).is_none());
    assert_eq!(feed.filters().map(FilterSet::len), Some(1));
  }

  #[test]
  fn every_mutating_action_resets_page_and_store() {
    let actions: [fn(&mut FeedController) -> Option<FetchRequest>; 6] = [
      |f| f.set_search_term("forest"),
      |f| f.set_category(Some("animals")),
      |f| f.apply_filters(filters(&[(FilterCategory::Colors, "green")])),
      |f| {
        f.apply_filters(filters(&[(FilterCategory::Colors, "green"), (FilterCategory::Type, "photo")]));
        f.remove_filter(FilterCategory::Colors)
      },
      |f| f.clear_search(),
      |f| {
        f.apply_filters(filters(&[(FilterCategory::Order, "latest")]));
        f.reset_filters()
      },
    ];
    for action in actions {
      let mut feed = loaded();
      let next = feed.on_scroll_position_changed(100, 20, 90).unwrap();
      land(&mut feed, &next, 25..50);
      assert_eq!(feed.page(), 2);
      let request = action(&mut feed).unwrap();
      assert_eq!(request.mode, FetchMode::Reset);
      assert_eq!(feed.page(), 1);
      assert!(feed.store().is_empty());
    }
  }

  // --- Scroll ---

  #[test]
  fn dwell_past_threshold_fires_once() {
    let mut feed = loaded();
    assert!(feed.on_scroll_position_changed(1000, 200, 800).is_some());
    assert!(feed.on_scroll_position_changed(1000, 200, 805).is_none());
    assert_eq!(feed.page(), 2);
  }

  #[test]
  fn leaving_threshold_rearms_trigger() {
    let mut feed = loaded();
    let first = feed.on_scroll_position_changed(1000, 200, 800).unwrap();
    land(&mut feed, &first, 25..50);
    // Content grew, so the same offset is now above the threshold.
    assert!(feed.on_scroll_position_changed(2000, 200, 800).is_none());
    assert!(!feed.end_of_page_reached());
    let second = feed.on_scroll_position_changed(2000, 200, 1800).unwrap();
    assert_eq!(second.mode, FetchMode::Append);
    assert_eq!(second.query.page, 3);
  }

  #[test]
  fn append_keeps_existing_results() {
    let mut feed = loaded();
    let request = feed.on_scroll_position_changed(1000, 200, 800).unwrap();
    assert_eq!(feed.store().len(), 25);
    assert_eq!(land(&mut feed, &request, 25..50), ApplyOutcome::Appended(25));
    assert_eq!(feed.store().len(), 50);
    assert_eq!(feed.store().get(25).map(|h| h.id), Some(25));
  }

  #[test]
  fn scroll_waits_for_initial_results() {
    let mut feed = FeedController::new();
    let request = feed.start();
    assert!(feed.on_scroll_position_changed(0, 20, 0).is_none());
    land(&mut feed, &request, 0..25);
    assert!(feed.on_scroll_position_changed(0, 20, 0).is_some());
  }

  #[test]
  fn no_second_page_fetch_while_one_is_loading() {
    let mut feed = loaded();
    let page_two = feed.on_scroll_position_changed(1000, 200, 800).unwrap();
    // Scrolling away re-arms the latch, coming back must still wait for page 2.
    assert!(feed.on_scroll_position_changed(1000, 200, 100).is_none());
    assert!(feed.on_scroll_position_changed(1000, 200, 800).is_none());
    assert_eq!(feed.page(), 2);

    assert_eq!(land(&mut feed, &page_two, 25..50), ApplyOutcome::Appended(25));
    let page_three = feed.on_scroll_position_changed(1000, 200, 800).unwrap();
    assert_eq!(page_three.query.page, 3);
    land(&mut feed, &page_three, 50..75);
    let ids: Vec<u64> = feed.store().items().iter().map(|h| h.id).collect();
    assert_eq!(ids, (0..75).collect::<Vec<_>>());
  }

  #[test]
  fn failed_page_is_requested_again_on_next_scroll() {
    let mut feed = loaded();
    let page_two = feed.on_scroll_position_changed(1000, 200, 800).unwrap();
    assert!(feed.on_scroll_position_changed(1000, 200, 100).is_none());
    assert!(feed.on_scroll_position_changed(1000, 200, 800).is_none());
    feed.apply_response(page_two.ticket, page_two.mode, Err(SearchError::MissingApiKey));
    let retry = feed.on_scroll_position_changed(1000, 200, 800).unwrap();
    assert_eq!(retry.query.page, 2);
    land(&mut feed, &retry, 25..50);
    assert_eq!(feed.store().len(), 50);
  }

  #[test]
  fn failed_first_page_does_not_paginate() {
    let mut feed = FeedController::new();
    let request = feed.start();
    feed.apply_response(request.ticket, request.mode, Err(SearchError::MissingApiKey));
    assert!(feed.on_scroll_position_changed(0, 20, 0).is_none());
    assert_eq!(feed.page(), 1);

    let retry = feed.set_category(Some("nature")).unwrap();
    land(&mut feed, &retry, 0..25);
    assert!(!feed.is_exhausted());
    assert_eq!(feed.on_scroll_position_changed(25, 20, 5).map(|r| r.query.page), Some(2));
  }

  #[test]
  fn exhausted_feed_stops_paginating() {
    let mut feed = FeedController::new();
    let request = feed.start();
    feed.apply_response(request.ticket, request.mode, page_of(0..10, 10));
    assert!(feed.is_exhausted());
    assert!(feed.on_scroll_position_changed(100, 50, 60).is_none());
    assert_eq!(feed.page(), 1);
  }

  // --- Responses ---

  #[test]
  fn stale_reset_response_is_discarded() {
    let mut feed = FeedController::new();
    let old = feed.set_category(Some("music")).unwrap();
    let new = feed.set_search_term("guitar").unwrap();
    assert_eq!(land(&mut feed, &new, 0..3), ApplyOutcome::Replaced(3));
    assert_eq!(land(&mut feed, &old, 100..125), ApplyOutcome::Stale);
    assert_eq!(feed.store().items().iter().map(|h| h.id).collect::<Vec<_>>(), vec![0, 1, 2]);
  }

  #[test]
  fn append_from_previous_lineage_is_discarded() {
    let mut feed = loaded();
    let page_two = feed.on_scroll_position_changed(1000, 200, 800).unwrap();
    let reset = feed.set_category(Some("sports")).unwrap();
    land(&mut feed, &reset, 0..25);
    assert_eq!(land(&mut feed, &page_two, 25..50), ApplyOutcome::Stale);
    assert_eq!(feed.store().len(), 25);
  }

  #[test]
  fn failure_leaves_store_untouched_and_records_error() {
    let mut feed = loaded();
    let request = feed.on_scroll_position_changed(1000, 200, 800).unwrap();
    let outcome = feed.apply_response(
      request.ticket,
      request.mode,
      Err(SearchError::Status { status: 400, body: "[ERROR 400] page is out of valid range.".to_string() }),
    );
    assert_eq!(outcome, ApplyOutcome::Failed);
    assert_eq!(feed.store().len(), 25);
    assert!(feed.last_error.as_deref().unwrap_or_default().contains("400"));
    assert_eq!(feed.page(), 1);
    assert!(!feed.end_of_page_reached());
    assert_eq!(feed.phase(), Phase::Idle);
  }

  #[test]
  fn null_hits_do_not_mutate_store() {
    let mut feed = loaded();
    let request = feed.set_search_term("nothing").unwrap();
    let outcome =
      feed.apply_response(request.ticket, request.mode, Ok(SearchResponse { total_hits: 0, hits: None }));
    assert_eq!(outcome, ApplyOutcome::Failed);
    assert!(feed.store().is_empty());
  }

  #[test]
  fn phase_tracks_latest_fetch() {
    let mut feed = FeedController::new();
    assert_eq!(feed.phase(), Phase::Idle);
    let request = feed.start();
    assert_eq!(feed.phase(), Phase::Fetching);
    land(&mut feed, &request, 0..5);
    assert_eq!(feed.phase(), Phase::Idle);
  }
}
