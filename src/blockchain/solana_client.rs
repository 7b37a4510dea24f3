use std::time::Duration;

use async_trait::async_trait;
use solana_client::{nonblocking::rpc_client::RpcClient, rpc_config::RpcSendTransactionConfig};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    signature::Signature,
    transaction::Transaction,
};

use crate::config::SolanaConfig;
use crate::Result;

/// Where a submitted signature stands at the configured commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
    Pending,
    Confirmed,
    Failed(String),
}

/// The ledger primitives the submitter needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Send a fully signed transaction, returning its signature.
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature>;

    /// Latest blockhash and the last block height at which it is valid.
    async fn latest_blockhash(&self) -> Result<(Hash, u64)>;

    async fn signature_status(&self, signature: &Signature) -> Result<SignatureStatus>;

    async fn block_height(&self) -> Result<u64>;
}

/// Sonic devnet access over the Solana JSON-RPC client
pub struct SolanaLedger {
    client: RpcClient,
    commitment: CommitmentConfig,
}

impl SolanaLedger {
    /// Create a new ledger client from configuration
    pub fn new(config: &SolanaConfig) -> Result<Self> {
        let commitment = config.commitment_config()?;
        let client = RpcClient::new_with_timeout_and_commitment(
            config.rpc_url.clone(),
            Duration::from_secs(config.timeout_seconds),
            commitment,
        );
        Ok(Self { client, commitment })
    }

    /// Get the RPC client
    pub fn get_client(&self) -> &RpcClient {
        &self.client
    }
}

#[async_trait]
impl LedgerRpc for SolanaLedger {
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        let config = RpcSendTransactionConfig {
            preflight_commitment: Some(self.commitment.commitment),
            ..RpcSendTransactionConfig::default()
        };
        Ok(self.client.send_transaction_with_config(transaction, config).await?)
    }

    async fn latest_blockhash(&self) -> Result<(Hash, u64)> {
        Ok(self.client.get_latest_blockhash_with_commitment(self.commitment).await?)
    }

    async fn signature_status(&self, signature: &Signature) -> Result<SignatureStatus> {
        let status = self
            .client
            .get_signature_status_with_commitment(signature, self.commitment)
            .await?;
        Ok(match status {
            | None => SignatureStatus::Pending,
            | Some(Ok(())) => SignatureStatus::Confirmed,
            | Some(Err(e)) => SignatureStatus::Failed(e.to_string()),
        })
    }

    async fn block_height(&self) -> Result<u64> {
        Ok(self.client.get_block_height_with_commitment(self.commitment).await?)
    }
}
