use log::{error, info};
use solana_sdk::signature::{Keypair, Signature, Signer};

use super::{TaskOutcome, TaskRunner};
use crate::api::{AuthToken, OdysseyApi};
use crate::blockchain::{build_transfer, LedgerRpc};
use crate::Result;

/// Transfers needed to lift `current` to `target`, plus `buffer` in case some
/// are not counted. Zero once the target is reached.
pub fn padding_plan(current: u64, target: u64, buffer: u64) -> u64 {
    if current >= target {
        0
    } else {
        target - current + buffer
    }
}

impl<A: OdysseyApi, R: LedgerRpc> TaskRunner<A, R> {
    /// Send small transfers until today's transaction count reaches the target.
    pub async fn pad_transactions(&self, keypair: &Keypair, token: &AuthToken) -> TaskOutcome {
        self.pacing.step.sleep().await;
        let count = match self.api.daily_transactions(token).await {
            | Ok(count) => count,
            | Err(e) => {
                error!("Failed to read daily transactions for {}: {}", keypair.pubkey(), e);
                return TaskOutcome::failed(&e);
            }
        };

        let planned =
            padding_plan(count, self.settings.daily_tx_target, self.settings.padding_buffer);
        if planned == 0 {
            info!("{} already has {} transactions today", keypair.pubkey(), count);
            return TaskOutcome::Skipped(format!("{} transactions already sent today", count));
        }

        info!("{} has {} transactions today, sending {} transfers", keypair.pubkey(), count, planned);
        let mut succeeded = 0;
        for n in 1..=planned {
            if n > 1 {
                self.pacing.step.sleep().await;
            }
            match self.send_padding_transfer(keypair).await {
                | Ok(signature) => {
                    succeeded += 1;
                    info!("[{}/{}] transfer {} confirmed", n, planned, signature);
                }
                | Err(e) => error!("[{}/{}] transfer failed: {}", n, planned, e),
            }
        }

        if succeeded == planned {
            TaskOutcome::Completed(format!("{} transfers confirmed", succeeded))
        } else {
            TaskOutcome::Partial { succeeded, attempted: planned }
        }
    }

    async fn send_padding_transfer(&self, keypair: &Keypair) -> Result<Signature> {
        let recipient = Keypair::new().pubkey();
        let blockhash = self.submitter.latest_blockhash().await?;
        let transaction =
            build_transfer(keypair, &recipient, self.settings.transfer_lamports, blockhash);
        self.submitter.submit(&transaction).await
    }
}
