//! Odyssey HTTP API: authentication, account state and reward endpoints.

pub mod auth;
mod client;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::native_token::lamports_to_sol;

use crate::Result;

pub use auth::{login, sign_challenge};
pub use client::{decode_response, OdysseyClient};

/// Authorization credential for one account, valid for one run.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Snapshot of an account as the service reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Wallet balance in lamports
    #[serde(rename = "wallet_balance", default)]
    pub balance: u64,
    /// Ring (reward point) count
    #[serde(rename = "ring", default)]
    pub points: u64,
    /// Claimed but unopened mystery boxes
    #[serde(rename = "ring_monitor", default)]
    pub boxes: u64,
}

impl AccountInfo {
    pub fn balance_sol(&self) -> f64 {
        lamports_to_sol(self.balance)
    }
}

/// Every Odyssey endpoint the runner touches.
///
/// Templates (`check_in_transaction`, `mystery_box_transaction`) are base64
/// encoded wire transactions that still need the account's signature.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OdysseyApi: Send + Sync {
    /// `GET /auth/sonic/challenge?wallet=<address>`
    async fn challenge(&self, address: &str) -> Result<String>;

    /// `POST /auth/sonic/authorize`
    async fn authorize(
        &self, address: &str, address_encoded: &str, signature: &str,
    ) -> Result<AuthToken>;

    /// `GET /user/rewards/info`
    async fn account_info(&self, token: &AuthToken) -> Result<AccountInfo>;

    /// `GET /user/check-in/transaction`
    async fn check_in_transaction(&self, token: &AuthToken) -> Result<String>;

    /// `POST /user/check-in`
    async fn submit_check_in(&self, token: &AuthToken, signature: &str) -> Result<()>;

    /// `GET /user/transactions/state/daily`, today's on-chain transaction count
    async fn daily_transactions(&self, token: &AuthToken) -> Result<u64>;

    /// `POST /user/transactions/rewards/claim`
    async fn claim_stage(&self, token: &AuthToken, stage: u8) -> Result<()>;

    /// `GET /user/rewards/mystery-box/build-tx`
    async fn mystery_box_transaction(&self, token: &AuthToken) -> Result<String>;

    /// `POST /user/rewards/mystery-box/open`
    async fn open_mystery_box(&self, token: &AuthToken, signature: &str) -> Result<()>;
}
