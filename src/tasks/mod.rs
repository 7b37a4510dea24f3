//! The four daily tasks run for every account.
//!
//! Each task returns a [`TaskOutcome`] instead of an error so the caller can
//! decide whether the account's remaining tasks still make sense.

mod check_in;
mod claim;
mod open_boxes;
mod padding;

use std::fmt;

use crate::api::OdysseyApi;
use crate::blockchain::{LedgerRpc, TransactionSubmitter};
use crate::config::{Config, PacingConfig, RetryConfig, TasksConfig};
use crate::utils::RetryOutcome;
use crate::Error;

pub use claim::{Stage, STAGE_ONE_MIN, STAGE_THREE_MIN, STAGE_TWO_MIN};
pub use padding::padding_plan;

/// Which task an outcome belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    CheckIn,
    PadTransactions,
    ClaimBoxes,
    OpenBoxes,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            | TaskKind::CheckIn => "check-in",
            | TaskKind::PadTransactions => "transaction padding",
            | TaskKind::ClaimBoxes => "box claiming",
            | TaskKind::OpenBoxes => "box opening",
        };
        f.write_str(name)
    }
}

/// Why a task failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Every retry failed
    Exhausted { attempts: u32 },
    /// A failure retrying could not fix
    Terminal,
    /// The service rejected the session token
    SessionExpired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed(String),
    /// The service already recorded this action today
    AlreadyDone(String),
    Skipped(String),
    /// Some of a batch of independent actions succeeded
    Partial { succeeded: u64, attempted: u64 },
    Failed { reason: String, kind: FailureKind },
}

impl TaskOutcome {
    /// Failure outcome for an error that will not be retried.
    pub fn failed(error: &Error) -> Self {
        let kind =
            if error.is_unauthorized() { FailureKind::SessionExpired } else { FailureKind::Terminal };
        TaskOutcome::Failed { reason: error.to_string(), kind }
    }

    pub(crate) fn from_retry(outcome: RetryOutcome<TaskOutcome>) -> Self {
        match outcome {
            | RetryOutcome::Success(outcome) => outcome,
            | RetryOutcome::Exhausted { attempts, error } => TaskOutcome::Failed {
                reason: error.to_string(),
                kind: FailureKind::Exhausted { attempts },
            },
            | RetryOutcome::Terminal { error, .. } => TaskOutcome::failed(&error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            TaskOutcome::Completed(_) | TaskOutcome::AlreadyDone(_) | TaskOutcome::Skipped(_)
        )
    }

    pub fn session_expired(&self) -> bool {
        matches!(self, TaskOutcome::Failed { kind: FailureKind::SessionExpired, .. })
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            | TaskOutcome::Completed(detail) => write!(f, "completed: {}", detail),
            | TaskOutcome::AlreadyDone(detail) => write!(f, "already done: {}", detail),
            | TaskOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            | TaskOutcome::Partial { succeeded, attempted } => {
                write!(f, "partial: {}/{} succeeded", succeeded, attempted)
            }
            | TaskOutcome::Failed { reason, kind } => match kind {
                | FailureKind::Exhausted { attempts } => {
                    write!(f, "failed after {} attempts: {}", attempts, reason)
                }
                | FailureKind::Terminal => write!(f, "failed: {}", reason),
                | FailureKind::SessionExpired => write!(f, "session expired: {}", reason),
            },
        }
    }
}

/// Runs the daily tasks against one API client and one ledger.
pub struct TaskRunner<A, R> {
    api: A,
    submitter: TransactionSubmitter<R>,
    settings: TasksConfig,
    pacing: PacingConfig,
    retry: RetryConfig,
}

impl<A: OdysseyApi, R: LedgerRpc> TaskRunner<A, R> {
    pub fn new(api: A, submitter: TransactionSubmitter<R>, config: &Config) -> Self {
        Self {
            api,
            submitter,
            settings: config.tasks.clone(),
            pacing: config.pacing,
            retry: config.retry,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn submitter(&self) -> &TransactionSubmitter<R> {
        &self.submitter
    }

    pub fn settings(&self) -> &TasksConfig {
        &self.settings
    }

    pub fn pacing(&self) -> &PacingConfig {
        &self.pacing
    }
}
