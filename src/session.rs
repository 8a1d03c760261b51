use std::collections::HashSet;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::accounts::{AccountType, BankAccount, LoginResponse};

/// Signed-in user, their accounts and the biometric preference.
///
/// `loading` and `error` describe the request in progress and are never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserState {
  pub id: Option<String>,
  pub name: Option<String>,
  pub username: Option<String>,
  pub email: Option<String>,
  pub token: Option<String>,
  pub is_logged_in: bool,
  pub bank_accounts: Vec<BankAccount>,
  #[serde(skip)]
  pub loading: bool,
  #[serde(skip)]
  pub error: Option<String>,
  pub biometric_enabled: bool,
  pub biometric_type: Option<String>,
}

impl UserState {
  // --- Login ---

  pub fn login_pending(&mut self) {
    self.loading = true;
    self.error = None;
  }

  pub fn login_fulfilled(&mut self, user: LoginResponse) {
    self.loading = false;
    self.id = Some(user.id);
    self.name = Some(user.name);
    self.username = Some(user.username);
    self.email = Some(user.email);
    self.token = Some(user.token);
    self.is_logged_in = true;
    self.error = None;
  }

  pub fn login_rejected(&mut self, message: impl Into<String>) {
    self.loading = false;
    self.error = Some(message.into());
    self.is_logged_in = false;
  }

  // --- Accounts ---

  /// Only flags loading when nothing is on screen yet, so a refresh keeps the cards visible.
  pub fn accounts_pending(&mut self) {
    if self.bank_accounts.is_empty() {
      self.loading = true;
    }
    self.error = None;
  }

  pub fn accounts_fulfilled(&mut self, accounts: Vec<BankAccount>) {
    self.loading = false;
    self.bank_accounts = accounts;
    self.error = None;
  }

  pub fn accounts_rejected(&mut self, message: impl Into<String>) {
    self.loading = false;
    self.error = Some(message.into());
  }

  // --- Misc ---

  /// Forget the identity and accounts. Biometric settings survive.
  pub fn logout(&mut self) {
    *self = Self {
      biometric_enabled: self.biometric_enabled,
      biometric_type: self.biometric_type.take(),
      ..Self::default()
    };
  }

  pub fn clear_error(&mut self) {
    self.error = None;
  }

  pub fn set_biometric_enabled(&mut self, enabled: bool, biometric_type: impl Into<String>) {
    self.biometric_enabled = enabled;
    self.biometric_type = Some(biometric_type.into());
  }

  // --- Derived data ---

  pub fn net_worth(&self) -> f64 {
    self.bank_accounts.iter().map(|a| a.balance).sum()
  }

  pub fn total_for(&self, account_type: AccountType) -> f64 {
    self.bank_accounts.iter().filter(|a| a.account_type == account_type).map(|a| a.balance).sum()
  }

  /// Display name for greetings, falling back to the username.
  pub fn display_name(&self) -> &str {
    self.name.as_deref().or(self.username.as_deref()).unwrap_or("there")
  }
}

/// Format a balance like `$12,750.00` or `-$2,340.75`.
pub fn format_money(amount: f64, currency: &str) -> String {
  let symbol = match currency {
    "USD" => "$",
    "EUR" => "€",
    "GBP" => "£",
    _ => "",
  };
  let cents = (amount.abs() * 100.0).round() as u64;
  let whole = (cents / 100).to_string();
  let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
  for (i, ch) in whole.chars().enumerate() {
    if i > 0 && (whole.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(ch);
  }
  let sign = if amount < 0.0 { "-" } else { "" };
  let suffix = if symbol.is_empty() { format!(" {}", currency) } else { String::new() };
  format!("{}{}{}.{:02}{}", sign, symbol, grouped, cents % 100, suffix)
}

/// Keys of requests that may be in flight, one at a time per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
  Login,
  Accounts(String),
}

/// Per-resource in-flight guard: a second `begin` for the same key is refused
/// until `finish` is called.
#[derive(Debug)]
pub struct InFlight<K> {
  keys: HashSet<K>,
}

impl<K> Default for InFlight<K> {
  fn default() -> Self {
    Self { keys: HashSet::new() }
  }
}

impl<K: Eq + Hash> InFlight<K> {
  pub fn begin(&mut self, key: K) -> bool {
    self.keys.insert(key)
  }

  pub fn finish(&mut self, key: &K) {
    self.keys.remove(key);
  }

  #[cfg(test)]
  pub fn contains(&self, key: &K) -> bool {
    self.keys.contains(key)
  }
}

/// JSON file persistence for [`UserState`].
pub struct SessionStore {
  path: PathBuf,
}

impl SessionStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// `session.json` in the platform data directory, if one can be determined.
  pub fn default_location() -> Option<Self> {
    ProjectDirs::from("", "", "pixels").map(|dirs| Self::new(dirs.data_dir().join("session.json")))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Rehydrate the saved state. A missing or unreadable file yields a fresh state.
  pub fn load(&self) -> UserState {
    let content = match std::fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(_) => return UserState::default(),
    };
    match serde_json::from_str(&content) {
      Ok(state) => {
        info!(path = %self.path.display(), "session restored");
        state
      }
      Err(e) => {
        warn!(path = %self.path.display(), err = %e, "ignoring corrupt session file");
        UserState::default()
      }
    }
  }

  pub fn save(&self, state: &UserState) -> Result<()> {
    if let Some(dir) = self.path.parent() {
      std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(state).context("Failed to serialize session")?;
    std::fs::write(&self.path, json).with_context(|| format!("Failed to write {}", self.path.display()))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn john() -> LoginResponse {
    LoginResponse {
      id: "1".to_string(),
      username: "john.doe".to_string(),
      name: "John Doe".to_string(),
      email: "john.doe@example.com".to_string(),
      token: "mock_token_1_0".to_string(),
    }
  }

  fn account(account_type: AccountType, balance: f64) -> BankAccount {
    BankAccount {
      id: "x".to_string(),
      account_number: "****0000".to_string(),
      account_type,
      balance,
      currency: "USD".to_string(),
      card_color: "#000000".to_string(),
      bank_name: "Test Bank".to_string(),
    }
  }

  #[test]
  fn login_lifecycle() {
    let mut state = UserState::default();
    state.login_pending();
    assert!(state.loading);
    state.login_fulfilled(john());
    assert!(state.is_logged_in);
    assert!(!state.loading);
    assert_eq!(state.display_name(), "John Doe");
  }

  #[test]
  fn rejected_login_sets_error() {
    let mut state = UserState::default();
    state.login_pending();
    state.login_rejected("Invalid username or password");
    assert!(!state.is_logged_in);
    assert!(!state.loading);
    assert_eq!(state.error.as_deref(), Some("Invalid username or password"));
    state.clear_error();
    assert!(state.error.is_none());
  }

  #[test]
  fn accounts_refresh_keeps_cards_visible() {
    let mut state = UserState::default();
    state.accounts_pending();
    assert!(state.loading);
    state.accounts_fulfilled(vec![account(AccountType::Checking, 10.0)]);
    state.accounts_pending();
    assert!(!state.loading);
  }

  #[test]
  fn accounts_failure_is_a_store_error() {
    let mut state = UserState::default();
    state.accounts_pending();
    state.accounts_rejected("Failed to fetch bank accounts");
    assert!(!state.loading);
    assert_eq!(state.error.as_deref(), Some("Failed to fetch bank accounts"));
  }

  #[test]
  fn logout_keeps_biometric_settings() {
    let mut state = UserState::default();
    state.login_fulfilled(john());
    state.accounts_fulfilled(vec![account(AccountType::Savings, 5.0)]);
    state.set_biometric_enabled(true, "Fingerprint");
    state.logout();
    assert!(!state.is_logged_in);
    assert!(state.id.is_none());
    assert!(state.bank_accounts.is_empty());
    assert!(state.biometric_enabled);
    assert_eq!(state.biometric_type.as_deref(), Some("Fingerprint"));
  }

  #[test]
  fn derived_totals() {
    let mut state = UserState::default();
    state.accounts_fulfilled(vec![
      account(AccountType::Checking, 5420.5),
      account(AccountType::Savings, 12750.0),
      account(AccountType::Credit, -2340.75),
    ]);
    assert!((state.net_worth() - 15829.75).abs() < 1e-9);
    assert!((state.total_for(AccountType::Credit) + 2340.75).abs() < 1e-9);
  }

  #[test]
  fn money_formatting() {
    assert_eq!(format_money(12750.0, "USD"), "$12,750.00");
    assert_eq!(format_money(-2340.75, "USD"), "-$2,340.75");
    assert_eq!(format_money(5.5, "USD"), "$5.50");
    assert_eq!(format_money(1234567.891, "CHF"), "1,234,567.89 CHF");
  }

  #[test]
  fn in_flight_guard_refuses_duplicates() {
    let mut in_flight = InFlight::default();
    let key = Resource::Accounts("1".to_string());
    assert!(in_flight.begin(key.clone()));
    assert!(!in_flight.begin(key.clone()));
    assert!(in_flight.begin(Resource::Login));
    in_flight.finish(&key);
    assert!(!in_flight.contains(&key));
    assert!(in_flight.begin(key));
  }

  #[test]
  fn session_round_trips_without_transient_fields() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("nested").join("session.json"));
    let mut state = UserState::default();
    state.login_fulfilled(john());
    state.set_biometric_enabled(true, "Face ID");
    state.error = Some("transient".to_string());
    state.loading = true;
    store.save(&state).unwrap();

    let restored = store.load();
    assert!(restored.is_logged_in);
    assert_eq!(restored.username.as_deref(), Some("john.doe"));
    assert_eq!(restored.biometric_type.as_deref(), Some("Face ID"));
    assert!(restored.error.is_none());
    assert!(!restored.loading);
  }

  #[test]
  fn missing_or_corrupt_session_yields_default() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("session.json"));
    assert_eq!(store.load(), UserState::default());
    std::fs::write(store.path(), "{ not json").unwrap();
    assert_eq!(store.load(), UserState::default());
  }
}
