// common/src/error.rs
use thiserror::Error;

/// Errors raised by the wallet, session and persistence layers.
///
/// Every operation reports these synchronously to its caller; presentation
/// is the caller's job.
#[derive(Debug, Error)]
pub enum VanguardError {
    /// Bad user input: missing field, short password, mismatched confirmation.
    #[error("{0}")]
    Validation(String),

    #[error("Invalid wallet password")]
    InvalidCredentials,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Recovery phrase must contain exactly {expected} words, got {actual}")]
    InvalidPhraseFormat { expected: usize, actual: usize },

    #[error("Recovery phrase does not match any wallet")]
    PhraseMismatch,

    /// A stored record could not be parsed. Readers discard the record and
    /// fall back to an empty state, so this rarely escapes the store.
    #[error("Corrupt record under key '{key}': {reason}")]
    PersistenceCorruption { key: String, reason: String },

    #[error("Storage failure: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Crypto failure: {0}")]
    Crypto(String),
}

impl VanguardError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InvalidCredentials => "invalid_credentials",
            Self::AuthenticationFailed => "authentication_failed",
            Self::WalletNotFound(_) => "wallet_not_found",
            Self::InvalidPhraseFormat { .. } => "invalid_phrase_format",
            Self::PhraseMismatch => "phrase_mismatch",
            Self::PersistenceCorruption { .. } => "persistence_corruption",
            Self::Storage(_) => "storage_error",
            Self::Serialization(_) => "serialization_error",
            Self::Crypto(_) => "crypto_error",
        }
    }

    /// Whether the message is safe and useful to show to an end user.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::InvalidCredentials
                | Self::AuthenticationFailed
                | Self::WalletNotFound(_)
                | Self::InvalidPhraseFormat { .. }
                | Self::PhraseMismatch
        )
    }
}

pub type Result<T> = std::result::Result<T, VanguardError>;
