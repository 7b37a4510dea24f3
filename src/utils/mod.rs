//! Utility functions and types shared by the runner.

pub mod error;
mod fs;
mod logging;
pub mod retry;

pub use error::Error;
pub use fs::*;
pub use logging::{init_logging, init_test_logging, LOG_ENV};
pub use retry::{DelayRange, RetryOutcome, RetryPolicy};

/// Re-export of commonly used types
pub mod prelude {
    pub use super::{
        error::{Error, Result},
        fs::*,
        logging::init_logging,
        retry::{DelayRange, RetryOutcome, RetryPolicy},
    };
}

/// Common result type for utility functions
pub type Result<T> = std::result::Result<T, Error>;
