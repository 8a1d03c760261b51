use std::collections::HashMap;
use std::time::{Duration, Instant};

use image::DynamicImage;
use ratatui::{layout::Rect, widgets::ListState};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::accounts::{AccountsError, BankAccount, LoginResponse, MockBank};
use crate::biometric::{BiometricCapabilities, BiometricProbe, probe_from_config};
use crate::config::Config;
use crate::constants::constants;
use crate::display::DisplayMode;
use crate::feed::{ApplyOutcome, Debouncer, FeedController, FetchMode, FetchRequest, Ticket};
use crate::pixabay::{ImageHit, Preview, SearchClient, SearchError, SearchResponse, fetch_image, prefetch_previews};
use crate::session::{InFlight, Resource, SessionStore, UserState};
use crate::theme::THEMES;

// --- Types ---

pub type FeedResult = (Ticket, FetchMode, Result<SearchResponse, SearchError>);
pub type DetailResult = (u64, anyhow::Result<DynamicImage>);
type LoginResult = Result<LoginResponse, AccountsError>;
type AccountsResult = Result<Vec<BankAccount>, AccountsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
  Welcome,
  Login,
  Dashboard,
  Browser,
  Detail,
  About,
}

/// Which part of the image browser has the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  Input,
  Results,
  Filters,
  Categories,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
  Username,
  Password,
}

#[derive(Debug, Clone)]
pub struct LoginForm {
  pub username: String,
  pub password: String,
  pub focus: LoginField,
  /// Cursor position within the focused field (char index).
  pub cursor: usize,
}

impl Default for LoginForm {
  fn default() -> Self {
    Self { username: String::new(), password: String::new(), focus: LoginField::Username, cursor: 0 }
  }
}

impl LoginForm {
  pub fn active(&self) -> &str {
    match self.focus {
      LoginField::Username => &self.username,
      LoginField::Password => &self.password,
    }
  }

  pub fn active_mut(&mut self) -> &mut String {
    match self.focus {
      LoginField::Username => &mut self.username,
      LoginField::Password => &mut self.password,
    }
  }

  pub fn toggle_focus(&mut self) {
    self.focus = match self.focus {
      LoginField::Username => LoginField::Password,
      LoginField::Password => LoginField::Username,
    };
    self.cursor = self.active().chars().count();
  }
}

/// Check the login form before it is sent. Returns the trimmed credentials.
pub fn validate_credentials(username: &str, password: &str) -> Result<(String, String), &'static str> {
  let username = username.trim();
  if username.chars().count() < 2 {
    return Err("Please enter a valid username (at least 2 characters)");
  }
  let password = password.trim();
  if password.is_empty() {
    return Err("Please enter a password");
  }
  Ok((username.to_string(), password.to_string()))
}

/// Modal questions that take over the keyboard until answered.
#[derive(Debug, Clone)]
pub enum Dialog {
  EnrollBiometric(BiometricCapabilities),
  ConfirmLogout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
  BrowseImages,
  RefreshAccounts,
  About,
  Logout,
}

impl QuickAction {
  pub const ALL: [QuickAction; 4] =
    [QuickAction::BrowseImages, QuickAction::RefreshAccounts, QuickAction::About, QuickAction::Logout];

  pub fn label(self) -> &'static str {
    match self {
      QuickAction::BrowseImages => "Browse images",
      QuickAction::RefreshAccounts => "Refresh accounts",
      QuickAction::About => "About",
      QuickAction::Logout => "Log out",
    }
  }
}

/// Terminal graphics protocol rendering state (Kitty/Sixel).
#[derive(Default)]
pub struct GraphicsCache {
  pub preview_area: Option<Rect>,
  pub last_sent: Option<(u64, Rect)>,
  pub resized: Option<(u64, u16, u16, DynamicImage)>,
}

impl GraphicsCache {
  pub fn invalidate(&mut self) {
    self.last_sent = None;
    self.resized = None;
  }
}

/// Channels and handles for work running on the tokio runtime.
pub(crate) struct AsyncTasks {
  feed_tx: mpsc::UnboundedSender<FeedResult>,
  feed_rx: mpsc::UnboundedReceiver<FeedResult>,
  preview_tx: mpsc::Sender<Preview>,
  preview_rx: mpsc::Receiver<Preview>,
  preview_handles: Vec<JoinHandle<()>>,
  detail_rx: Option<oneshot::Receiver<DetailResult>>,
  login_rx: Option<oneshot::Receiver<LoginResult>>,
  accounts_rx: Option<(String, oneshot::Receiver<AccountsResult>)>,
}

impl AsyncTasks {
  fn new() -> Self {
    let (feed_tx, feed_rx) = mpsc::unbounded_channel();
    let (preview_tx, preview_rx) = mpsc::channel(64);
    Self {
      feed_tx,
      feed_rx,
      preview_tx,
      preview_rx,
      preview_handles: Vec::new(),
      detail_rx: None,
      login_rx: None,
      accounts_rx: None,
    }
  }
}

pub struct App {
  pub screen: Screen,
  /// Screen to return to when the About page closes.
  about_return: Screen,
  pub mode: AppMode,
  pub theme_index: usize,
  pub display_mode: DisplayMode,
  // Search box
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  // Image browser
  pub feed: FeedController,
  debouncer: Debouncer<String>,
  search: SearchClient,
  feed_started: bool,
  pub list_state: ListState,
  /// Rows visible in the results list at the last draw.
  pub results_viewport: Option<u16>,
  scroll_moved: bool,
  /// Cursor in the category bar; 0 is "All".
  pub category_cursor: usize,
  pub previews: HashMap<u64, DynamicImage>,
  pub detail_index: Option<usize>,
  pub detail_image: Option<(u64, DynamicImage)>,
  pub gfx: GraphicsCache,
  // Accounts
  pub login: LoginForm,
  pub user: UserState,
  session: Option<SessionStore>,
  pub(crate) bank: MockBank,
  in_flight: InFlight<Resource>,
  biometric: Box<dyn BiometricProbe>,
  pub capabilities: BiometricCapabilities,
  pub dialog: Option<Dialog>,
  pub action_index: usize,
  config: Config,
  // Messages
  pub last_error: Option<String>,
  pub info_message: Option<String>,
  pub should_quit: bool,
  error_time: Option<Instant>,
  pub(crate) tasks: AsyncTasks,
}

impl App {
  pub fn new(display_mode: DisplayMode, config: Config, api_key: String, session: Option<SessionStore>) -> Self {
    let theme_index =
      if let Some(ref name) = config.theme_name { THEMES.iter().position(|t| t.name == name).unwrap_or(0) } else { 0 };
    let user = session.as_ref().map(SessionStore::load).unwrap_or_default();
    let biometric = probe_from_config(config.simulated_biometric.as_deref());
    let capabilities = biometric.check_capabilities();
    debug!(available = capabilities.is_available, kind = %capabilities.biometric_type, "biometric probe");

    Self {
      screen: Screen::Welcome,
      about_return: Screen::Welcome,
      mode: AppMode::Results,
      theme_index,
      display_mode,
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      feed: FeedController::new(),
      debouncer: Debouncer::new(constants().search_debounce()),
      search: SearchClient::new(reqwest::Client::new(), api_key),
      feed_started: false,
      list_state: ListState::default(),
      results_viewport: None,
      scroll_moved: false,
      category_cursor: 0,
      previews: HashMap::new(),
      detail_index: None,
      detail_image: None,
      gfx: GraphicsCache::default(),
      login: LoginForm::default(),
      user,
      session,
      bank: MockBank::default(),
      in_flight: InFlight::default(),
      biometric,
      capabilities,
      dialog: None,
      action_index: 0,
      config,
      last_error: None,
      info_message: None,
      should_quit: false,
      error_time: None,
      tasks: AsyncTasks::new(),
    }
  }

  pub fn theme(&self) -> &'static crate::theme::Theme {
    &THEMES[self.theme_index % THEMES.len()]
  }

  // --- Messages ---

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages after 5 seconds.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(5)
    {
      self.last_error = None;
      self.error_time = None;
    }
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.config.theme_name = Some(self.theme().name.to_string());
    self.config.save();
  }

  fn persist_session(&self) {
    if let Some(ref store) = self.session
      && let Err(e) = store.save(&self.user)
    {
      warn!(err = %e, "failed to persist session");
    }
  }

  // --- Navigation ---

  /// Leave the welcome page. A restored session goes straight to the
  /// dashboard unless it is locked behind biometrics.
  pub fn leave_welcome(&mut self) {
    if self.user.is_logged_in && !self.user.biometric_enabled {
      self.enter_dashboard();
    } else {
      self.enter_login();
    }
  }

  pub fn enter_login(&mut self) {
    self.user.clear_error();
    self.capabilities = self.biometric.check_capabilities();
    self.login.cursor = self.login.active().chars().count();
    self.screen = Screen::Login;
  }

  pub fn enter_dashboard(&mut self) {
    self.screen = Screen::Dashboard;
    if self.user.bank_accounts.is_empty() {
      self.trigger_accounts();
    }
  }

  pub fn open_about(&mut self) {
    if self.screen != Screen::About {
      self.about_return = self.screen;
    }
    self.screen = Screen::About;
  }

  pub fn close_about(&mut self) {
    self.screen = self.about_return;
  }

  // --- Login ---

  pub fn submit_login(&mut self) {
    if self.user.loading {
      return;
    }
    let (username, password) = match validate_credentials(&self.login.username, &self.login.password) {
      Ok(credentials) => credentials,
      Err(msg) => {
        self.set_error(msg.to_string());
        return;
      }
    };
    if !self.in_flight.begin(Resource::Login) {
      return;
    }
    info!(username = %username, "login submitted");
    self.clear_error();
    self.user.login_pending();

    let bank = self.bank.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(bank.login(&username, &password).await);
    });
    self.tasks.login_rx = Some(rx);
  }

  /// Unlock a restored session with the biometric sensor.
  pub fn trigger_biometric_login(&mut self) {
    if !self.user.biometric_enabled || !self.capabilities.is_available {
      return;
    }
    let result = self.biometric.authenticate();
    if !result.success {
      let reason = result.error.unwrap_or_else(|| "Biometric authentication failed".to_string());
      self.set_error(format!("Authentication failed: {}", reason));
      return;
    }
    if self.user.is_logged_in {
      info!(kind = ?result.biometric_type, "biometric unlock");
      self.info_message = Some("Biometric authentication successful!".to_string());
      self.enter_dashboard();
    } else {
      self.set_error("No saved session. Sign in with your password first.".to_string());
    }
  }

  pub fn answer_enrollment(&mut self, enable: bool) {
    let Some(Dialog::EnrollBiometric(capabilities)) = self.dialog.take() else { return };
    if enable {
      self.user.set_biometric_enabled(true, capabilities.biometric_type.clone());
      self.persist_session();
      self.info_message = Some(format!("You can now use {} to sign in quickly.", capabilities.biometric_type));
    }
    self.enter_dashboard();
  }

  // --- Dashboard ---

  pub fn trigger_accounts(&mut self) {
    let Some(user_id) = self.user.id.clone() else { return };
    if !self.in_flight.begin(Resource::Accounts(user_id.clone())) {
      debug!(user = %user_id, "accounts fetch already in flight");
      return;
    }
    self.user.accounts_pending();

    let bank = self.bank.clone();
    let id = user_id.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(bank.list_accounts_for_user(&id).await);
    });
    self.tasks.accounts_rx = Some((user_id, rx));
  }

  pub fn run_quick_action(&mut self) {
    match QuickAction::ALL.get(self.action_index).copied() {
      Some(QuickAction::BrowseImages) => self.open_browser(),
      Some(QuickAction::RefreshAccounts) => self.trigger_accounts(),
      Some(QuickAction::About) => self.open_about(),
      Some(QuickAction::Logout) => self.request_logout(),
      None => {}
    }
  }

  pub fn request_logout(&mut self) {
    self.dialog = Some(Dialog::ConfirmLogout);
  }

  pub fn confirm_logout(&mut self, confirmed: bool) {
    if !matches!(self.dialog.take(), Some(Dialog::ConfirmLogout)) || !confirmed {
      return;
    }
    if let Some((user_id, _)) = self.tasks.accounts_rx.take() {
      self.in_flight.finish(&Resource::Accounts(user_id));
    }
    info!(username = ?self.user.username, "logged out");
    self.user.logout();
    self.persist_session();
    self.login = LoginForm::default();
    self.action_index = 0;
    self.enter_login();
  }

  // --- Image browser ---

  /// Show the browser, issuing the initial fetch the first time.
  pub fn open_browser(&mut self) {
    self.screen = Screen::Browser;
    if !self.feed_started {
      self.feed_started = true;
      let request = self.feed.start();
      self.dispatch(Some(request));
    }
  }

  /// Run a fetch issued by the feed controller in the background.
  fn dispatch(&mut self, request: Option<FetchRequest>) {
    let Some(request) = request else { return };
    if request.mode == FetchMode::Reset {
      self.cancel_previews();
      self.previews.clear();
      self.list_state.select(None);
      *self.list_state.offset_mut() = 0;
      self.gfx.invalidate();
    }
    info!(seq = request.ticket.seq, page = request.query.page, mode = ?request.mode, "fetch issued");

    let client = self.search.clone();
    let tx = self.tasks.feed_tx.clone();
    tokio::spawn(async move {
      let result = client.search(&request.params()).await;
      let _ = tx.send((request.ticket, request.mode, result));
    });
  }

  /// The search box changed; re-arm the debounce timer.
  pub fn on_input_changed(&mut self) {
    self.debouncer.push(self.input.clone(), Instant::now());
  }

  /// Search right away instead of waiting for the debounce window.
  pub fn submit_search(&mut self) {
    self.debouncer.cancel();
    let request = self.feed.set_search_term(&self.input);
    self.dispatch(request);
  }

  pub fn clear_search(&mut self) {
    self.debouncer.cancel();
    self.input.clear();
    self.cursor_position = 0;
    self.input_scroll = 0;
    if !self.feed.search_term().is_empty() {
      let request = self.feed.clear_search();
      self.dispatch(request);
    }
  }

  /// Entries of the category bar: `None` for "All", then the configured categories.
  pub fn category_entries() -> impl Iterator<Item = Option<&'static str>> {
    std::iter::once(None).chain(constants().categories.iter().map(|c| Some(c.as_str())))
  }

  /// Select the category under the cursor. Selecting the active one clears it.
  pub fn select_category_at_cursor(&mut self) {
    let Some(entry) = Self::category_entries().nth(self.category_cursor) else { return };
    let target = if entry.is_some() && entry == self.feed.category() { None } else { entry };
    self.select_category(target);
  }

  pub fn select_category(&mut self, category: Option<&str>) {
    // A pending term would otherwise land after the category and undo it.
    self.debouncer.cancel();
    self.input.clear();
    self.cursor_position = 0;
    self.input_scroll = 0;
    let request = self.feed.set_category(category);
    self.dispatch(request);
  }

  pub fn open_filters(&mut self) {
    self.feed.open_filter_editor();
    self.mode = AppMode::Filters;
  }

  pub fn apply_filter_draft(&mut self) {
    let Some(draft) = self.feed.editor.as_ref().map(|e| e.draft.clone()) else { return };
    let request = self.feed.apply_filters(draft);
    self.dispatch(request);
    self.mode = AppMode::Results;
  }

  pub fn reset_filters(&mut self) {
    let request = self.feed.reset_filters();
    self.dispatch(request);
    self.mode = AppMode::Results;
  }

  pub fn cancel_filters(&mut self) {
    self.feed.close_filter_editor();
    self.mode = AppMode::Results;
  }

  /// Remove the `n`th applied filter chip.
  pub fn remove_chip(&mut self, n: usize) {
    let Some(category) = self.feed.filters().and_then(|f| f.iter().nth(n)).map(|(c, _)| c) else { return };
    let request = self.feed.remove_filter(category);
    self.dispatch(request);
  }

  // --- Scrolling ---

  fn select_clamped(&mut self, index: usize) {
    let count = self.feed.store().len();
    if count == 0 {
      return;
    }
    self.list_state.select(Some(index.min(count - 1)));
    self.scroll_moved = true;
  }

  pub fn select_next(&mut self, step: usize) {
    let next = self.list_state.selected().map_or(0, |i| i.saturating_add(step));
    self.select_clamped(next);
  }

  pub fn select_previous(&mut self, step: usize) {
    let prev = self.list_state.selected().map_or(0, |i| i.saturating_sub(step));
    self.select_clamped(prev);
  }

  pub fn scroll_to_top(&mut self) {
    self.select_clamped(0);
    *self.list_state.offset_mut() = 0;
  }

  pub fn scroll_to_bottom(&mut self) {
    self.select_clamped(usize::MAX);
  }

  /// Report the list position after a draw that followed user scrolling.
  pub fn sync_scroll(&mut self) {
    if !std::mem::take(&mut self.scroll_moved) {
      return;
    }
    let Some(viewport) = self.results_viewport else { return };
    let request = self.feed.on_scroll_position_changed(
      self.feed.store().len() as i64,
      viewport as i64,
      self.list_state.offset() as i64,
    );
    self.dispatch(request);
  }

  // --- Previews ---

  fn cancel_previews(&mut self) {
    for handle in self.tasks.preview_handles.drain(..) {
      handle.abort();
    }
  }

  /// Fetch thumbnails for hits from `start` onward that are not cached yet.
  fn prefetch_from(&mut self, start: usize) {
    let targets: Vec<(u64, String)> = self
      .feed
      .store()
      .items()
      .iter()
      .skip(start)
      .filter(|h| !self.previews.contains_key(&h.id))
      .map(|h| (h.id, h.preview_url.clone()))
      .collect();
    if targets.is_empty() {
      return;
    }
    debug!(count = targets.len(), "prefetching previews");
    let client = self.search.http().clone();
    let tx = self.tasks.preview_tx.clone();
    self.tasks.preview_handles.retain(|h| !h.is_finished());
    self.tasks.preview_handles.push(tokio::spawn(prefetch_previews(client, targets, tx)));
  }

  pub fn selected_hit(&self) -> Option<&ImageHit> {
    self.list_state.selected().and_then(|i| self.feed.store().get(i))
  }

  // --- Detail ---

  pub fn open_detail(&mut self) {
    let Some(index) = self.list_state.selected() else { return };
    let Some(hit) = self.feed.store().get(index) else { return };
    let (id, url) = (hit.id, hit.webformat_url.clone());

    self.detail_index = Some(index);
    self.detail_image = self.previews.get(&id).cloned().map(|image| (id, image));
    self.gfx.invalidate();
    self.screen = Screen::Detail;

    let client = self.search.http().clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send((id, fetch_image(&client, &url).await));
    });
    self.tasks.detail_rx = Some(rx);
  }

  pub fn close_detail(&mut self) {
    self.tasks.detail_rx = None;
    self.detail_index = None;
    self.detail_image = None;
    self.gfx.invalidate();
    self.screen = Screen::Browser;
  }

  pub fn detail_hit(&self) -> Option<&ImageHit> {
    self.detail_index.and_then(|i| self.feed.store().get(i))
  }

  /// The image shown by the current screen, with its hit id.
  pub fn visible_image(&self) -> Option<(u64, &DynamicImage)> {
    match self.screen {
      Screen::Detail => self.detail_image.as_ref().map(|(id, image)| (*id, image)),
      Screen::Browser => self.selected_hit().and_then(|h| self.previews.get(&h.id).map(|image| (h.id, image))),
      _ => None,
    }
  }

  pub fn open_in_browser(&mut self) {
    let Some(url) = self.detail_hit().map(|h| h.page_url.clone()).filter(|u| !u.is_empty()) else { return };
    #[cfg(target_os = "macos")]
    let cmd = "open";
    #[cfg(not(target_os = "macos"))]
    let cmd = "xdg-open";
    match std::process::Command::new(cmd)
      .arg(&url)
      .stdin(std::process::Stdio::null())
      .stdout(std::process::Stdio::null())
      .stderr(std::process::Stdio::null())
      .spawn()
    {
      Ok(mut child) => {
        // Reap the child in a background thread to avoid zombie processes.
        std::thread::spawn(move || {
          let _ = child.wait();
        });
      }
      Err(e) => self.set_error(format!("Failed to open browser: {}", e)),
    }
  }

  // --- Polling ---

  pub fn check_pending(&mut self) {
    if let Some(term) = self.debouncer.take_settled(Instant::now()) {
      let request = self.feed.set_search_term(&term);
      self.dispatch(request);
    }

    while let Ok((ticket, mode, result)) = self.tasks.feed_rx.try_recv() {
      match self.feed.apply_response(ticket, mode, result) {
        ApplyOutcome::Replaced(count) => {
          self.list_state.select((count > 0).then_some(0));
          if count == 0 {
            self.info_message = Some("No images found.".to_string());
          } else {
            self.info_message = None;
          }
          self.prefetch_from(0);
        }
        ApplyOutcome::Appended(count) => {
          let start = self.feed.store().len().saturating_sub(count);
          self.prefetch_from(start);
        }
        ApplyOutcome::Failed => {
          let msg = self.feed.last_error.clone().unwrap_or_else(|| "Search returned no results.".to_string());
          self.set_error(msg);
        }
        ApplyOutcome::Stale => {}
      }
    }

    while let Ok(preview) = self.tasks.preview_rx.try_recv() {
      if self.selected_hit().is_some_and(|h| h.id == preview.id) {
        self.gfx.invalidate();
      }
      self.previews.insert(preview.id, preview.image);
    }

    if let Some(mut rx) = self.tasks.detail_rx.take() {
      match rx.try_recv() {
        Ok((id, Ok(image))) => {
          if self.detail_hit().is_some_and(|h| h.id == id) {
            self.detail_image = Some((id, image));
            self.gfx.invalidate();
          }
        }
        Ok((id, Err(e))) => debug!(id, err = %e, "full-size image unavailable, keeping preview"),
        Err(oneshot::error::TryRecvError::Empty) => self.tasks.detail_rx = Some(rx),
        Err(oneshot::error::TryRecvError::Closed) => {}
      }
    }

    if let Some(mut rx) = self.tasks.login_rx.take() {
      match rx.try_recv() {
        Ok(result) => {
          self.in_flight.finish(&Resource::Login);
          match result {
            Ok(response) => {
              info!(username = %response.username, "login succeeded");
              self.user.login_fulfilled(response);
              self.login.password.clear();
              self.persist_session();
              if self.capabilities.is_available && !self.user.biometric_enabled {
                self.dialog = Some(Dialog::EnrollBiometric(self.capabilities.clone()));
              } else {
                self.enter_dashboard();
              }
            }
            Err(e) => {
              warn!(err = %e, "login rejected");
              self.user.login_rejected(e.to_string());
            }
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => self.tasks.login_rx = Some(rx),
        Err(oneshot::error::TryRecvError::Closed) => {
          self.in_flight.finish(&Resource::Login);
          self.user.login_rejected("Login failed");
        }
      }
    }

    if let Some((user_id, mut rx)) = self.tasks.accounts_rx.take() {
      match rx.try_recv() {
        Ok(result) => {
          self.in_flight.finish(&Resource::Accounts(user_id));
          match result {
            Ok(accounts) => {
              info!(count = accounts.len(), "accounts loaded");
              self.user.accounts_fulfilled(accounts);
              self.persist_session();
            }
            Err(e) => self.user.accounts_rejected(e.to_string()),
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => self.tasks.accounts_rx = Some((user_id, rx)),
        Err(oneshot::error::TryRecvError::Closed) => {
          self.in_flight.finish(&Resource::Accounts(user_id));
          self.user.accounts_rejected("Failed to fetch bank accounts");
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn app() -> App {
    let mut app = App::new(DisplayMode::Ascii, Config::default(), String::new(), None);
    app.bank = MockBank::new(Duration::ZERO);
    app
  }

  /// Give spawned tasks a chance to finish, then poll.
  async fn settle(app: &mut App) {
    for _ in 0..10 {
      tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
    app.check_pending();
  }

  // --- validate_credentials ---

  #[test]
  fn credentials_are_trimmed() {
    assert_eq!(validate_credentials("  demo ", " pw "), Ok(("demo".to_string(), "pw".to_string())));
  }

  #[test]
  fn short_username_rejected() {
    assert_eq!(validate_credentials(" j ", "pw"), Err("Please enter a valid username (at least 2 characters)"));
  }

  #[test]
  fn blank_password_rejected() {
    assert_eq!(validate_credentials("demo", "   "), Err("Please enter a password"));
  }

  #[test]
  fn login_form_focus_moves_cursor_to_end() {
    let mut form = LoginForm { username: "demo".to_string(), password: "abc".to_string(), ..LoginForm::default() };
    form.toggle_focus();
    assert_eq!(form.focus, LoginField::Password);
    assert_eq!(form.cursor, 3);
    form.active_mut().push('d');
    assert_eq!(form.password, "abcd");
  }

  #[test]
  fn category_entries_start_with_all() {
    let mut entries = App::category_entries();
    assert_eq!(entries.next(), Some(None));
    assert_eq!(entries.count(), constants().categories.len());
  }

  // --- Flows ---

  #[tokio::test]
  async fn category_cancels_pending_search_input() {
    let mut app = app();
    app.open_browser();
    app.input = "cats".to_string();
    app.on_input_changed();
    app.select_category(Some("nature"));
    assert!(app.input.is_empty());
    assert_eq!(app.feed.category(), Some("nature"));
    app.check_pending();
    assert_eq!(app.feed.search_term(), "");
  }

  #[tokio::test]
  async fn selecting_active_category_clears_it() {
    let mut app = app();
    app.open_browser();
    app.category_cursor = 1 + constants().categories.iter().position(|c| c == "music").unwrap_or(0);
    app.select_category_at_cursor();
    assert_eq!(app.feed.category(), Some("music"));
    app.select_category_at_cursor();
    assert_eq!(app.feed.category(), None);
  }

  #[tokio::test]
  async fn missing_api_key_surfaces_as_error() {
    let mut app = app();
    app.open_browser();
    settle(&mut app).await;
    assert!(app.last_error.as_deref().unwrap_or_default().contains("API key"));
    assert!(app.feed.store().is_empty());
  }

  #[tokio::test]
  async fn login_then_accounts_load() {
    let mut app = app();
    app.leave_welcome();
    assert_eq!(app.screen, Screen::Login);
    app.login.username = "demo".to_string();
    app.login.password = "secret".to_string();
    app.submit_login();
    assert!(app.user.loading);
    settle(&mut app).await;
    assert!(app.user.is_logged_in);
    assert_eq!(app.screen, Screen::Dashboard);
    assert!(app.login.password.is_empty());
    settle(&mut app).await;
    assert_eq!(app.user.bank_accounts.len(), 1);
    assert!(!app.user.loading);
  }

  #[tokio::test]
  async fn unknown_user_gets_inline_error() {
    let mut app = app();
    app.enter_login();
    app.login.username = "nobody".to_string();
    app.login.password = "x".to_string();
    app.submit_login();
    settle(&mut app).await;
    assert_eq!(app.screen, Screen::Login);
    assert_eq!(app.user.error.as_deref(), Some("Invalid username or password"));
  }

  #[tokio::test]
  async fn duplicate_accounts_fetch_is_ignored() {
    let mut app = app();
    app.user.id = Some("1".to_string());
    app.trigger_accounts();
    assert!(app.in_flight.contains(&Resource::Accounts("1".to_string())));
    app.trigger_accounts();
    settle(&mut app).await;
    assert_eq!(app.user.bank_accounts.len(), 3);
    assert!(!app.in_flight.contains(&Resource::Accounts("1".to_string())));
  }

  #[tokio::test]
  async fn enrollment_prompt_after_login_with_sensor() {
    let config = Config { simulated_biometric: Some("fingerprint".to_string()), ..Config::default() };
    let mut app = App::new(DisplayMode::Ascii, config, String::new(), None);
    app.bank = MockBank::new(Duration::ZERO);
    app.enter_login();
    app.login.username = "john.doe".to_string();
    app.login.password = "pw".to_string();
    app.submit_login();
    settle(&mut app).await;
    assert!(matches!(app.dialog, Some(Dialog::EnrollBiometric(_))));
    app.answer_enrollment(true);
    assert!(app.user.biometric_enabled);
    assert_eq!(app.user.biometric_type.as_deref(), Some("Fingerprint"));
    assert_eq!(app.screen, Screen::Dashboard);
  }

  #[tokio::test]
  async fn logout_needs_confirmation_and_keeps_biometrics() {
    let mut app = app();
    app.user.is_logged_in = true;
    app.user.id = Some("3".to_string());
    app.user.set_biometric_enabled(true, "Face ID");
    app.screen = Screen::Dashboard;
    app.request_logout();
    app.confirm_logout(false);
    assert!(app.user.is_logged_in);

    app.request_logout();
    app.confirm_logout(true);
    assert!(!app.user.is_logged_in);
    assert!(app.user.biometric_enabled);
    assert_eq!(app.screen, Screen::Login);
  }

  #[test]
  fn biometric_unlock_needs_saved_session() {
    let config = Config { simulated_biometric: Some("face".to_string()), ..Config::default() };
    let mut app = App::new(DisplayMode::Ascii, config, String::new(), None);
    app.user.set_biometric_enabled(true, "Face ID");
    app.trigger_biometric_login();
    assert_eq!(app.screen, Screen::Welcome);
    assert!(app.last_error.is_some());
  }

  #[test]
  fn about_returns_to_previous_screen() {
    let mut app = app();
    app.screen = Screen::Dashboard;
    app.open_about();
    app.open_about();
    assert_eq!(app.screen, Screen::About);
    app.close_about();
    assert_eq!(app.screen, Screen::Dashboard);
  }
}
