use std::fmt;

use log::{error, info, warn};
use solana_sdk::signature::{Keypair, Signer};

use super::{TaskOutcome, TaskRunner};
use crate::api::{AuthToken, OdysseyApi};
use crate::blockchain::LedgerRpc;

/// Daily transaction count unlocking stage one
pub const STAGE_ONE_MIN: u64 = 10;
/// Daily transaction count unlocking stage two
pub const STAGE_TWO_MIN: u64 = 50;
/// Daily transaction count unlocking stage three
pub const STAGE_THREE_MIN: u64 = 100;

/// Transaction-milestone reward tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    One,
    Two,
    Three,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::One, Stage::Two, Stage::Three];

    /// Highest stage unlocked by `count` transactions, if any.
    pub fn for_transaction_count(count: u64) -> Option<Stage> {
        match count {
            | c if c >= STAGE_THREE_MIN => Some(Stage::Three),
            | c if c >= STAGE_TWO_MIN => Some(Stage::Two),
            | c if c >= STAGE_ONE_MIN => Some(Stage::One),
            | _ => None,
        }
    }

    /// Number sent in the claim request
    pub fn number(self) -> u8 {
        match self {
            | Stage::One => 1,
            | Stage::Two => 2,
            | Stage::Three => 3,
        }
    }

    /// Every stage from one up to and including `self`.
    pub fn up_to(self) -> impl Iterator<Item = Stage> {
        Stage::ALL.into_iter().filter(move |stage| *stage <= self)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {}", self.number())
    }
}

impl<A: OdysseyApi, R: LedgerRpc> TaskRunner<A, R> {
    /// Claim every reward stage today's transaction count has unlocked.
    ///
    /// A stage the service reports as already claimed counts as done. Other
    /// failures are logged and later stages are still attempted; only a
    /// rejected token stops the task.
    pub async fn claim_boxes(&self, keypair: &Keypair, token: &AuthToken) -> TaskOutcome {
        self.pacing.step.sleep().await;
        let count = match self.api.daily_transactions(token).await {
            | Ok(count) => count,
            | Err(e) => {
                error!("Failed to read daily transactions for {}: {}", keypair.pubkey(), e);
                return TaskOutcome::failed(&e);
            }
        };

        let top = match Stage::for_transaction_count(count) {
            | Some(stage) => stage,
            | None => {
                info!("{} has only {} transactions today, nothing to claim", keypair.pubkey(), count);
                return TaskOutcome::Skipped(format!("{} transactions unlock no stage", count));
            }
        };

        let mut claimed = 0;
        let mut already = 0;
        let mut attempted = 0;
        for stage in top.up_to() {
            self.pacing.step.sleep().await;
            attempted += 1;
            match self.api.claim_stage(token, stage.number()).await {
                | Ok(()) => {
                    claimed += 1;
                    info!("{} claimed {} box", keypair.pubkey(), stage);
                }
                | Err(e) if e.is_already_claimed() => {
                    already += 1;
                    warn!("{} already claimed {} today", keypair.pubkey(), stage);
                }
                | Err(e) if e.is_unauthorized() => {
                    error!("{} session rejected while claiming {}: {}", keypair.pubkey(), stage, e);
                    return TaskOutcome::failed(&e);
                }
                | Err(e) => error!("{} failed to claim {}: {}", keypair.pubkey(), stage, e),
            }
        }

        match (claimed, already) {
            | (c, a) if c + a < attempted => TaskOutcome::Partial { succeeded: c + a, attempted },
            | (0, _) => TaskOutcome::AlreadyDone(format!("stages 1-{} already claimed", top.number())),
            | (c, _) => TaskOutcome::Completed(format!("{} of {} stages claimed", c, attempted)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::runner;
    use super::*;
    use crate::api::MockOdysseyApi;
    use crate::blockchain::MockLedgerRpc;
    use crate::utils::error::ALREADY_CLAIMED;
    use crate::Error;
    use mockall::predicate::eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, None)]
    #[case(9, None)]
    #[case(10, Some(Stage::One))]
    #[case(49, Some(Stage::One))]
    #[case(50, Some(Stage::Two))]
    #[case(99, Some(Stage::Two))]
    #[case(100, Some(Stage::Three))]
    #[case(250, Some(Stage::Three))]
    fn test_stage_for_count(#[case] count: u64, #[case] expected: Option<Stage>) {
        assert_eq!(Stage::for_transaction_count(count), expected);
    }

    #[test]
    fn test_up_to_is_cumulative() {
        let numbers: Vec<u8> = Stage::Two.up_to().map(Stage::number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(Stage::Three.up_to().count(), 3);
    }

    #[tokio::test]
    async fn test_claims_stages_in_order() {
        let mut api = MockOdysseyApi::new();
        api.expect_daily_transactions().returning(|_| Ok(45));
        api.expect_claim_stage().with(mockall::predicate::always(), eq(1u8)).times(1).returning(|_, _| Ok(()));
        api.expect_claim_stage().with(mockall::predicate::always(), eq(2u8)).times(1).returning(|_, _| Ok(()));
        api.expect_claim_stage().with(mockall::predicate::always(), eq(3u8)).never();

        let outcome =
            runner(api, MockLedgerRpc::new()).claim_boxes(&Keypair::new(), &AuthToken::new("t")).await;
        assert_eq!(outcome, TaskOutcome::Completed("2 of 2 stages claimed".into()));
    }

    #[tokio::test]
    async fn test_already_claimed_is_benign() {
        let mut api = MockOdysseyApi::new();
        api.expect_daily_transactions().returning(|_| Ok(12));
        api.expect_claim_stage()
            .times(1)
            .returning(|_, _| Err(Error::ApiError { status: 400, message: ALREADY_CLAIMED.into() }));

        let outcome =
            runner(api, MockLedgerRpc::new()).claim_boxes(&Keypair::new(), &AuthToken::new("t")).await;
        assert!(matches!(outcome, TaskOutcome::AlreadyDone(_)));
    }

    #[tokio::test]
    async fn test_failed_stage_does_not_stop_later_stages() {
        let mut api = MockOdysseyApi::new();
        api.expect_daily_transactions().returning(|_| Ok(100));
        api.expect_claim_stage()
            .times(3)
            .returning(|_, stage| {
                if stage == 2 {
                    Err(Error::ApiError { status: 500, message: "Internal Server Error".into() })
                } else {
                    Ok(())
                }
            });

        let outcome =
            runner(api, MockLedgerRpc::new()).claim_boxes(&Keypair::new(), &AuthToken::new("t")).await;
        assert_eq!(outcome, TaskOutcome::Partial { succeeded: 2, attempted: 3 });
    }

    #[tokio::test]
    async fn test_too_few_transactions() {
        let mut api = MockOdysseyApi::new();
        api.expect_daily_transactions().returning(|_| Ok(3));
        api.expect_claim_stage().never();

        let outcome =
            runner(api, MockLedgerRpc::new()).claim_boxes(&Keypair::new(), &AuthToken::new("t")).await;
        assert!(matches!(outcome, TaskOutcome::Skipped(_)));
    }
}
