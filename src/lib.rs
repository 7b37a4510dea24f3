//! # Sonic Odyssey
//! Daily check-in and reward runner for the Sonic Odyssey campaign.
//!
//! For every configured wallet the runner logs in with a signed challenge,
//! checks in, pads the day's on-chain transaction count, claims the
//! milestone boxes and opens them. Accounts are processed one at a time.

pub use crate::utils::error::{Error, Result};

pub mod api;
pub mod blockchain;
pub mod config;
pub mod engine;
pub mod tasks;
pub mod utils;
pub mod wallet;

pub use crate::engine::{AccountReport, DailyRunner, RunSummary};
pub use crate::tasks::{TaskKind, TaskOutcome, TaskRunner};
