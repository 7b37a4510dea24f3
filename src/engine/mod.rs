//! Per-account driver: login, inspect, run the daily tasks, report.

use log::{error, info, warn};
use solana_sdk::signature::{Keypair, Signer};

use crate::api::{login, AccountInfo, OdysseyApi};
use crate::blockchain::LedgerRpc;
use crate::tasks::{TaskKind, TaskOutcome, TaskRunner};
use crate::Result;

/// What happened to one account.
#[derive(Debug, Clone)]
pub struct AccountReport {
    /// 1-based position in the key file
    pub index: usize,
    pub address: String,
    pub before: AccountInfo,
    /// Snapshot taken after claiming, if it could be fetched
    pub after: Option<AccountInfo>,
    pub outcomes: Vec<(TaskKind, TaskOutcome)>,
}

impl AccountReport {
    pub fn outcome(&self, kind: TaskKind) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|(k, _)| *k == kind).map(|(_, outcome)| outcome)
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_success())
    }
}

/// An account that never got past login or the first inspection.
#[derive(Debug, Clone)]
pub struct AccountFailure {
    pub index: usize,
    pub address: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<AccountReport>,
    pub failures: Vec<AccountFailure>,
}

impl RunSummary {
    pub fn accounts(&self) -> usize {
        self.reports.len() + self.failures.len()
    }

    pub fn log_summary(&self) {
        let clean = self.reports.iter().filter(|r| r.all_succeeded()).count();
        info!("=== RUN SUMMARY ===");
        info!(
            "Accounts: {} | Fully done: {} | With task failures: {} | Not processed: {}",
            self.accounts(),
            clean,
            self.reports.len() - clean,
            self.failures.len()
        );
        for report in &self.reports {
            let boxes = report.after.map_or(report.before.boxes, |after| after.boxes);
            info!(
                "#{} {} | {:.4} SOL | {} rings | {} boxes",
                report.index,
                report.address,
                report.before.balance_sol(),
                report.before.points,
                boxes
            );
            for (kind, outcome) in &report.outcomes {
                info!("    {}: {}", kind, outcome);
            }
        }
        for failure in &self.failures {
            warn!("#{} {} not processed: {}", failure.index, failure.address, failure.reason);
        }
        info!("===================");
    }
}

/// Runs every account through the daily tasks, one after another.
pub struct DailyRunner<A, R> {
    tasks: TaskRunner<A, R>,
}

impl<A: OdysseyApi, R: LedgerRpc> DailyRunner<A, R> {
    pub fn new(tasks: TaskRunner<A, R>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &TaskRunner<A, R> {
        &self.tasks
    }

    /// Process accounts in order. A failing account never stops the ones after it.
    pub async fn run(&self, keypairs: &[Keypair]) -> RunSummary {
        let mut summary = RunSummary::default();
        let total = keypairs.len();

        for (i, keypair) in keypairs.iter().enumerate() {
            let index = i + 1;
            let address = keypair.pubkey().to_string();
            info!("[{}/{}] Processing {}", index, total, address);

            match self.process_account(index, keypair).await {
                | Ok(report) => summary.reports.push(report),
                | Err(e) => {
                    error!("[{}/{}] {} skipped: {}", index, total, address, e);
                    summary.failures.push(AccountFailure { index, address, reason: e.to_string() });
                }
            }
        }

        summary
    }

    /// Login, inspect, then run the enabled tasks in order.
    ///
    /// Only login and the first inspection can fail the account as a whole;
    /// task failures are recorded in the report.
    pub async fn process_account(&self, index: usize, keypair: &Keypair) -> Result<AccountReport> {
        let api = self.tasks.api();
        let settings = self.tasks.settings();
        let address = keypair.pubkey().to_string();

        self.tasks.pacing().step.sleep().await;
        let token = login(api, keypair).await?;
        info!("{} logged in", address);

        let before = api.account_info(&token).await?;
        info!(
            "{} balance {:.4} SOL, {} rings, {} boxes",
            address,
            before.balance_sol(),
            before.points,
            before.boxes
        );

        let mut report = AccountReport { index, address, before, after: None, outcomes: Vec::new() };

        let outcome = if settings.check_in {
            self.tasks.check_in(keypair, &token).await
        } else {
            disabled()
        };
        if !self.record(&mut report, TaskKind::CheckIn, outcome) {
            return Ok(report);
        }

        let outcome = if settings.pad_transactions {
            self.tasks.pad_transactions(keypair, &token).await
        } else {
            disabled()
        };
        if !self.record(&mut report, TaskKind::PadTransactions, outcome) {
            return Ok(report);
        }

        let outcome = if settings.claim_boxes {
            self.tasks.claim_boxes(keypair, &token).await
        } else {
            disabled()
        };
        if !self.record(&mut report, TaskKind::ClaimBoxes, outcome) {
            return Ok(report);
        }

        let boxes = match api.account_info(&token).await {
            | Ok(info) => {
                info!("{} has {} boxes to open", report.address, info.boxes);
                report.after = Some(info);
                info.boxes
            }
            | Err(e) => {
                warn!("{} could not refresh account info: {}", report.address, e);
                if e.is_unauthorized() {
                    self.record(&mut report, TaskKind::OpenBoxes, TaskOutcome::failed(&e));
                    return Ok(report);
                }
                before.boxes
            }
        };

        let outcome = if settings.open_boxes {
            self.tasks.open_boxes(keypair, &token, boxes).await
        } else {
            disabled()
        };
        self.record(&mut report, TaskKind::OpenBoxes, outcome);

        Ok(report)
    }

    /// Log and store an outcome. Returns false when the account must stop.
    fn record(&self, report: &mut AccountReport, kind: TaskKind, outcome: TaskOutcome) -> bool {
        match &outcome {
            | o if o.session_expired() => {
                error!("{} {}: {}, stopping this account", report.address, kind, o)
            }
            | o if o.is_success() => info!("{} {}: {}", report.address, kind, o),
            | o => warn!("{} {}: {}", report.address, kind, o),
        }
        let keep_going = !outcome.session_expired();
        report.outcomes.push((kind, outcome));
        keep_going
    }
}

fn disabled() -> TaskOutcome {
    TaskOutcome::Skipped("disabled".to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::api::{AuthToken, MockOdysseyApi};
    use crate::blockchain::{MockLedgerRpc, TransactionSubmitter};
    use crate::config::{Config, PacingConfig, RetryConfig};
    use crate::utils::RetryPolicy;
    use crate::Error;

    fn daily_runner(api: MockOdysseyApi, config: &Config) -> DailyRunner<MockOdysseyApi, MockLedgerRpc> {
        let submitter =
            TransactionSubmitter::new(MockLedgerRpc::new(), RetryPolicy::immediate(5), Duration::ZERO);
        DailyRunner::new(TaskRunner::new(api, submitter, config))
    }

    fn only_claims() -> Config {
        let mut config = Config::default();
        config.pacing = PacingConfig::none();
        config.retry = RetryConfig::immediate();
        config.tasks.check_in = false;
        config.tasks.pad_transactions = false;
        config
    }

    fn logged_in(api: &mut MockOdysseyApi) {
        api.expect_challenge().returning(|_| Ok("challenge".into()));
        api.expect_authorize().returning(|_, _, _| Ok(AuthToken::new("token")));
    }

    #[tokio::test]
    async fn test_disabled_tasks_are_skipped() {
        let mut api = MockOdysseyApi::new();
        logged_in(&mut api);
        api.expect_account_info().returning(|_| Ok(AccountInfo { balance: 1, points: 2, boxes: 0 }));
        api.expect_daily_transactions().returning(|_| Ok(5));
        api.expect_check_in_transaction().never();

        let runner = daily_runner(api, &only_claims());
        let report = runner.process_account(1, &Keypair::new()).await.unwrap();

        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(report.outcome(TaskKind::CheckIn), Some(&TaskOutcome::Skipped("disabled".into())));
        assert!(matches!(report.outcome(TaskKind::OpenBoxes), Some(TaskOutcome::Skipped(_))));
        assert!(report.all_succeeded());
    }

    #[tokio::test]
    async fn test_session_expiry_stops_account() {
        let mut api = MockOdysseyApi::new();
        logged_in(&mut api);
        api.expect_account_info().times(1).returning(|_| Ok(AccountInfo::default()));
        api.expect_daily_transactions()
            .returning(|_| Err(Error::ApiError { status: 401, message: "Unauthorized".into() }));
        api.expect_mystery_box_transaction().never();

        let runner = daily_runner(api, &only_claims());
        let report = runner.process_account(1, &Keypair::new()).await.unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert!(report.outcome(TaskKind::ClaimBoxes).unwrap().session_expired());
        assert!(report.outcome(TaskKind::OpenBoxes).is_none());
    }

    #[tokio::test]
    async fn test_login_failure_is_reported() {
        let mut api = MockOdysseyApi::new();
        api.expect_challenge()
            .returning(|_| Err(Error::ApiError { status: 500, message: "down".into() }));

        let runner = daily_runner(api, &only_claims());
        let summary = runner.run(&[Keypair::new(), Keypair::new()]).await;

        assert_eq!(summary.accounts(), 2);
        assert_eq!(summary.failures.len(), 2);
        assert_eq!(summary.failures[1].index, 2);
        summary.log_summary();
    }
}
