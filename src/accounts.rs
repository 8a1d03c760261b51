//! Mock identity and bank-account backend.
//!
//! Login matches the username case-insensitively against a fixed user table and
//! never looks at the password. Every call sleeps for a configurable latency to
//! mimic a network round trip.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::constants;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountsError {
  #[error("Invalid username or password")]
  InvalidCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
  pub id: String,
  pub username: String,
  pub name: String,
  pub email: String,
  pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
  Checking,
  Savings,
  Credit,
}

impl AccountType {
  pub const ALL: [AccountType; 3] = [AccountType::Checking, AccountType::Savings, AccountType::Credit];

  pub fn label(self) -> &'static str {
    match self {
      AccountType::Checking => "Checking",
      AccountType::Savings => "Savings",
      AccountType::Credit => "Credit",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
  pub id: String,
  pub account_number: String,
  pub account_type: AccountType,
  pub balance: f64,
  pub currency: String,
  /// Hex color like `#6366f1`, used as the card accent.
  pub card_color: String,
  pub bank_name: String,
}

struct MockUser {
  id: &'static str,
  username: &'static str,
  name: &'static str,
  email: &'static str,
}

struct MockAccount {
  id: &'static str,
  user_id: &'static str,
  account_number: &'static str,
  account_type: AccountType,
  balance: f64,
  card_color: &'static str,
  bank_name: &'static str,
}

const MOCK_USERS: &[MockUser] = &[
  MockUser { id: "1", username: "john.doe", name: "John Doe", email: "john.doe@example.com" },
  MockUser { id: "2", username: "jane.smith", name: "Jane Smith", email: "jane.smith@example.com" },
  MockUser { id: "3", username: "demo", name: "Demo User", email: "demo@example.com" },
];

const MOCK_ACCOUNTS: &[MockAccount] = &[
  MockAccount {
    id: "1",
    user_id: "1",
    account_number: "****1234",
    account_type: AccountType::Checking,
    balance: 5420.5,
    card_color: "#6366f1",
    bank_name: "Premier Bank",
  },
  MockAccount {
    id: "2",
    user_id: "1",
    account_number: "****5678",
    account_type: AccountType::Savings,
    balance: 12750.0,
    card_color: "#10b981",
    bank_name: "Premier Bank",
  },
  MockAccount {
    id: "3",
    user_id: "1",
    account_number: "****9012",
    account_type: AccountType::Credit,
    balance: -2340.75,
    card_color: "#f59e0b",
    bank_name: "Premier Credit",
  },
  MockAccount {
    id: "4",
    user_id: "2",
    account_number: "****3456",
    account_type: AccountType::Checking,
    balance: 8720.25,
    card_color: "#8b5cf6",
    bank_name: "Metro Bank",
  },
  MockAccount {
    id: "5",
    user_id: "2",
    account_number: "****7890",
    account_type: AccountType::Savings,
    balance: 25430.8,
    card_color: "#06b6d4",
    bank_name: "Metro Bank",
  },
  MockAccount {
    id: "6",
    user_id: "3",
    account_number: "****1111",
    account_type: AccountType::Checking,
    balance: 1250.0,
    card_color: "#ef4444",
    bank_name: "City Bank",
  },
];

/// In-process stand-in for the banking API.
#[derive(Debug, Clone)]
pub struct MockBank {
  latency: Duration,
}

impl Default for MockBank {
  fn default() -> Self {
    Self::new(constants().mock_latency())
  }
}

impl MockBank {
  pub fn new(latency: Duration) -> Self {
    Self { latency }
  }

  async fn round_trip(&self) {
    if !self.latency.is_zero() {
      tokio::time::sleep(self.latency).await;
    }
  }

  pub async fn login(&self, username: &str, _password: &str) -> Result<LoginResponse, AccountsError> {
    self.round_trip().await;
    let user =
      MOCK_USERS.iter().find(|u| u.username.eq_ignore_ascii_case(username)).ok_or(AccountsError::InvalidCredentials)?;
    Ok(LoginResponse {
      id: user.id.to_string(),
      username: user.username.to_string(),
      name: user.name.to_string(),
      email: user.email.to_string(),
      token: format!("mock_token_{}_{}", user.id, chrono::Utc::now().timestamp_millis()),
    })
  }

  pub async fn list_accounts_for_user(&self, user_id: &str) -> Result<Vec<BankAccount>, AccountsError> {
    self.round_trip().await;
    Ok(
      MOCK_ACCOUNTS
        .iter()
        .filter(|a| a.user_id == user_id)
        .map(|a| BankAccount {
          id: a.id.to_string(),
          account_number: a.account_number.to_string(),
          account_type: a.account_type,
          balance: a.balance,
          currency: "USD".to_string(),
          card_color: a.card_color.to_string(),
          bank_name: a.bank_name.to_string(),
        })
        .collect(),
    )
  }
}
