//! Error handling for the daily-task runner.

use thiserror::Error;

/// Service message returned when today's check-in has already been recorded.
pub const ALREADY_CHECKED_IN: &str = "current account already checked in";

/// Service message returned when a transaction-milestone stage was claimed before.
pub const ALREADY_CLAIMED: &str = "interact rewards already claimed";

/// Main error type for the runner
#[derive(Debug, Error)]
pub enum Error {
    /// Key material errors (bad base58, wrong length, bad seed phrase)
    #[error("Wallet error: {0}")]
    WalletError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Non-success answer from the Odyssey HTTP API
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// Ledger RPC / transport errors
    #[error("RPC error: {0}")]
    RpcError(String),

    /// Transaction decoding, signing or on-chain execution errors
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// A submitted transaction was not confirmed before its blockhash expired
    #[error("Transaction {0} was not confirmed before its blockhash expired")]
    ConfirmationTimeout(String),

    /// A bounded retry gave up
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { operation: String, attempts: u32, last_error: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// HTTP client errors
    #[error("Request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    /// Invalid argument errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

/// Result type for the runner
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Message the service attached to an API error, if any.
    pub fn api_message(&self) -> Option<&str> {
        match self {
            | Error::ApiError { message, .. } => Some(message.as_str()),
            | _ => None,
        }
    }

    /// The authorization token was rejected; nothing else on this account can succeed.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::ApiError { status: 401, .. })
    }

    pub fn is_already_checked_in(&self) -> bool {
        self.api_message().map_or(false, |m| m == ALREADY_CHECKED_IN)
    }

    pub fn is_already_claimed(&self) -> bool {
        self.api_message().map_or(false, |m| m == ALREADY_CLAIMED)
    }

    /// Whether repeating the same operation may succeed.
    ///
    /// Bad key material, bad configuration and a rejected token are final.
    /// Everything the network or the service might recover from is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            | Error::WalletError(_) | Error::ConfigError(_) | Error::InvalidArgument(_) => false,
            | Error::ApiError { .. } => !self.is_unauthorized(),
            | Error::TomlError(_) | Error::TomlSerializeError(_) => false,
            | _ => true,
        }
    }
}

impl From<bs58::decode::Error> for Error {
    fn from(err: bs58::decode::Error) -> Self {
        Error::WalletError(format!("bs58 decode error: {}", err))
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::TransactionError(format!("base64 decode error: {}", err))
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::TransactionError(format!("bincode error: {}", err))
    }
}

impl From<solana_client::client_error::ClientError> for Error {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        Error::RpcError(err.to_string())
    }
}

impl From<solana_sdk::signer::SignerError> for Error {
    fn from(err: solana_sdk::signer::SignerError) -> Self {
        Error::TransactionError(format!("signing failed: {}", err))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::ConfigError(format!("invalid URL: {}", err))
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
