use log::{info, warn};
use solana_sdk::signature::{Keypair, Signer};

use super::{TaskOutcome, TaskRunner};
use crate::api::{AuthToken, OdysseyApi};
use crate::blockchain::{sign_template, LedgerRpc};
use crate::{Error, Result};

impl<A: OdysseyApi, R: LedgerRpc> TaskRunner<A, R> {
    /// Sign and submit today's check-in transaction, then report it.
    pub async fn check_in(&self, keypair: &Keypair, token: &AuthToken) -> TaskOutcome {
        let outcome = self
            .retry
            .check_in
            .run("daily check-in", |_| self.check_in_once(keypair, token), Error::is_retryable)
            .await;
        TaskOutcome::from_retry(outcome)
    }

    async fn check_in_once(&self, keypair: &Keypair, token: &AuthToken) -> Result<TaskOutcome> {
        self.pacing.step.sleep().await;

        let template = match self.api.check_in_transaction(token).await {
            | Ok(template) => template,
            | Err(e) if e.is_already_checked_in() => return Ok(already_checked_in(keypair)),
            | Err(e) => return Err(e),
        };

        let transaction = sign_template(&template, keypair)?;
        let signature = self.submitter.submit(&transaction).await?;

        match self.api.submit_check_in(token, &signature.to_string()).await {
            | Ok(()) => {
                info!("{} checked in, signature {}", keypair.pubkey(), signature);
                Ok(TaskOutcome::Completed(format!("checked in with {}", signature)))
            }
            | Err(e) if e.is_already_checked_in() => Ok(already_checked_in(keypair)),
            | Err(e) => Err(e),
        }
    }
}

fn already_checked_in(keypair: &Keypair) -> TaskOutcome {
    warn!("{} has already checked in today", keypair.pubkey());
    TaskOutcome::AlreadyDone("already checked in today".to_string())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{confirming_ledger, runner, template_for};
    use super::*;
    use crate::api::MockOdysseyApi;
    use crate::blockchain::MockLedgerRpc;
    use crate::tasks::FailureKind;
    use crate::utils::error::ALREADY_CHECKED_IN;

    #[tokio::test]
    async fn test_check_in_submits_signed_template() {
        let keypair = Keypair::new();
        let template = template_for(&keypair);

        let mut api = MockOdysseyApi::new();
        api.expect_check_in_transaction().times(1).returning(move |_| Ok(template.clone()));
        api.expect_submit_check_in().times(1).returning(|_, _| Ok(()));

        let outcome = runner(api, confirming_ledger()).check_in(&keypair, &AuthToken::new("t")).await;
        assert!(matches!(outcome, TaskOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn test_already_checked_in_is_not_retried() {
        let keypair = Keypair::new();
        let mut api = MockOdysseyApi::new();
        api.expect_check_in_transaction().times(1).returning(|_| {
            Err(Error::ApiError { status: 400, message: ALREADY_CHECKED_IN.into() })
        });
        api.expect_submit_check_in().never();
        let mut rpc = MockLedgerRpc::new();
        rpc.expect_send_transaction().never();

        let outcome = runner(api, rpc).check_in(&keypair, &AuthToken::new("t")).await;
        assert!(matches!(outcome, TaskOutcome::AlreadyDone(_)));
    }

    #[tokio::test]
    async fn test_check_in_gives_up_after_six_attempts() {
        let keypair = Keypair::new();
        let mut api = MockOdysseyApi::new();
        api.expect_check_in_transaction()
            .times(6)
            .returning(|_| Err(Error::ApiError { status: 502, message: "Bad Gateway".into() }));

        let outcome = runner(api, MockLedgerRpc::new()).check_in(&keypair, &AuthToken::new("t")).await;
        assert!(matches!(
            outcome,
            TaskOutcome::Failed { kind: FailureKind::Exhausted { attempts: 6 }, .. }
        ));
    }

    #[tokio::test]
    async fn test_unauthorized_expires_session() {
        let keypair = Keypair::new();
        let mut api = MockOdysseyApi::new();
        api.expect_check_in_transaction()
            .times(1)
            .returning(|_| Err(Error::ApiError { status: 401, message: "Unauthorized".into() }));

        let outcome = runner(api, MockLedgerRpc::new()).check_in(&keypair, &AuthToken::new("t")).await;
        assert!(outcome.session_expired());
    }
}
