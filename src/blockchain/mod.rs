//! Ledger access: RPC client, transaction helpers and the confirming submitter

pub mod solana_client;
pub mod submitter;
pub mod transaction_builder;

// Re-export for convenience
pub use solana_client::*;
pub use submitter::TransactionSubmitter;
pub use transaction_builder::*;
