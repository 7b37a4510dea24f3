//! Send a signed transaction and wait for it to land.

use std::time::Duration;

use log::{debug, info};
use solana_sdk::{hash::Hash, signature::Signature, transaction::Transaction};

use super::solana_client::{LedgerRpc, SignatureStatus};
use crate::utils::RetryPolicy;
use crate::{Error, Result};

/// Submits transactions with bounded retry.
///
/// One attempt is: send, fetch the current blockhash validity window, then
/// poll the signature until it is confirmed, fails on chain, or the block
/// height passes the window.
pub struct TransactionSubmitter<R> {
    rpc: R,
    policy: RetryPolicy,
    poll_interval: Duration,
}

impl<R: LedgerRpc> TransactionSubmitter<R> {
    pub fn new(rpc: R, policy: RetryPolicy, poll_interval: Duration) -> Self {
        Self { rpc, policy, poll_interval }
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Blockhash for locally built transactions.
    pub async fn latest_blockhash(&self) -> Result<Hash> {
        Ok(self.rpc.latest_blockhash().await?.0)
    }

    /// Submit and confirm. Returns the signature on confirmation and an error
    /// once every attempt has failed; never a placeholder signature.
    pub async fn submit(&self, transaction: &Transaction) -> Result<Signature> {
        if !transaction.is_signed() {
            return Err(Error::TransactionError("transaction is missing signatures".into()));
        }

        self.policy
            .run("transaction submission", |_| self.submit_once(transaction), Error::is_retryable)
            .await
            .into_result("transaction submission")
    }

    async fn submit_once(&self, transaction: &Transaction) -> Result<Signature> {
        let signature = self.rpc.send_transaction(transaction).await?;
        debug!("sent transaction {}", signature);

        let (_, last_valid_height) = self.rpc.latest_blockhash().await?;
        loop {
            match self.rpc.signature_status(&signature).await? {
                | SignatureStatus::Confirmed => {
                    info!("transaction {} confirmed", signature);
                    return Ok(signature);
                }
                | SignatureStatus::Failed(reason) => {
                    return Err(Error::TransactionError(format!(
                        "transaction {} failed: {}",
                        signature, reason
                    )));
                }
                | SignatureStatus::Pending => {}
            }

            if self.rpc.block_height().await? > last_valid_height {
                return Err(Error::ConfirmationTimeout(signature.to_string()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
