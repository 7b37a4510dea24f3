use log::{error, info};
use solana_sdk::signature::{Keypair, Signature, Signer};

use super::{TaskOutcome, TaskRunner};
use crate::api::{AuthToken, OdysseyApi};
use crate::blockchain::{sign_template, LedgerRpc};
use crate::utils::RetryOutcome;
use crate::{Error, Result};

impl<A: OdysseyApi, R: LedgerRpc> TaskRunner<A, R> {
    /// Open `count` mystery boxes one at a time.
    ///
    /// Retries apply to a single box, so an earlier box is never opened twice.
    pub async fn open_boxes(&self, keypair: &Keypair, token: &AuthToken, count: u64) -> TaskOutcome {
        if count == 0 {
            info!("{} has no boxes to open", keypair.pubkey());
            return TaskOutcome::Skipped("no boxes to open".to_string());
        }

        let mut opened = 0;
        let mut last_failure = None;
        for n in 1..=count {
            if n > 1 {
                self.pacing.between_boxes.sleep().await;
            }
            let operation = format!("opening box {}/{}", n, count);
            let outcome = self
                .retry
                .open_box
                .run(&operation, |_| self.open_box_once(keypair, token), Error::is_retryable)
                .await;

            match outcome {
                | RetryOutcome::Success(signature) => {
                    opened += 1;
                    info!("[{}/{}] {} opened box, signature {}", n, count, keypair.pubkey(), signature);
                }
                | RetryOutcome::Terminal { error, .. } if error.is_unauthorized() => {
                    return TaskOutcome::failed(&error);
                }
                | failure => {
                    error!("[{}/{}] {} could not open box", n, count, keypair.pubkey());
                    last_failure = Some(failure);
                }
            }
        }

        match last_failure {
            | None => TaskOutcome::Completed(format!("{} boxes opened", opened)),
            | Some(failure) if opened == 0 => TaskOutcome::from_retry(
                failure.map(|signature| TaskOutcome::Completed(signature.to_string())),
            ),
            | Some(_) => TaskOutcome::Partial { succeeded: opened, attempted: count },
        }
    }

    async fn open_box_once(&self, keypair: &Keypair, token: &AuthToken) -> Result<Signature> {
        self.pacing.step.sleep().await;
        let template = self.api.mystery_box_transaction(token).await?;
        let transaction = sign_template(&template, keypair)?;
        let signature = self.submitter.submit(&transaction).await?;
        self.api.open_mystery_box(token, &signature.to_string()).await?;
        Ok(signature)
    }
}
