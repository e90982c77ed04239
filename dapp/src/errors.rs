use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DappError {
    // Provider errors
    NoProvider,
    NoSigner,
    UserRejected,
    ConnectInProgress,

    // Chain errors
    OnChainRevert(String),
    ConfirmationTimeout(String),

    // Network errors
    NetworkError(String),
    InvalidResponse(String),

    // Validation errors
    ValidationError(String),
    InvalidAddress(String),
    InvalidAmount(String),

    // Configuration file errors
    ConfigError(String),
}

impl DappError {
    /// Short machine-readable label used in diagnostic logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DappError::NoProvider => "no_provider",
            DappError::NoSigner => "no_signer",
            DappError::UserRejected => "user_rejected",
            DappError::ConnectInProgress => "connect_in_progress",
            DappError::OnChainRevert(_) => "on_chain_revert",
            DappError::ConfirmationTimeout(_) => "confirmation_timeout",
            DappError::NetworkError(_) => "network",
            DappError::InvalidResponse(_) => "invalid_response",
            DappError::ValidationError(_) => "validation",
            DappError::InvalidAddress(_) => "invalid_address",
            DappError::InvalidAmount(_) => "invalid_amount",
            DappError::ConfigError(_) => "config",
        }
    }

    /// Whether the user can recover by acting again (retrying, fixing input,
    /// enabling a wallet). Config and response-shape failures need a code or
    /// deployment fix instead.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            DappError::ValidationError(_)
                | DappError::InvalidResponse(_)
                | DappError::ConfigError(_)
        )
    }
}

impl fmt::Display for DappError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DappError::NoProvider => write!(f, "No Ethereum provider found"),
            DappError::NoSigner => write!(f, "No connected account available for signing"),
            DappError::UserRejected => write!(f, "User rejected the request"),
            DappError::ConnectInProgress => write!(f, "A wallet connection is already pending"),

            DappError::OnChainRevert(msg) => write!(f, "Transaction reverted: {}", msg),
            DappError::ConfirmationTimeout(msg) => {
                write!(f, "Timed out waiting for confirmation: {}", msg)
            }

            DappError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DappError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),

            DappError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            DappError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
            DappError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),

            DappError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for DappError {}

pub type DappResult<T> = Result<T, DappError>;

// Helper macro for easy error creation
#[macro_export]
macro_rules! dapp_error {
    ($variant:ident, $msg:expr) => {
        $crate::errors::DappError::$variant($msg.to_string())
    };
    ($variant:ident) => {
        $crate::errors::DappError::$variant
    };
}

// Conversion helpers
impl From<std::io::Error> for DappError {
    fn from(error: std::io::Error) -> Self {
        DappError::ConfigError(error.to_string())
    }
}

impl From<serde_json::Error> for DappError {
    fn from(error: serde_json::Error) -> Self {
        DappError::ValidationError(format!("JSON error: {}", error))
    }
}

#[cfg(feature = "rpc")]
impl From<reqwest::Error> for DappError {
    fn from(error: reqwest::Error) -> Self {
        DappError::NetworkError(error.to_string())
    }
}
