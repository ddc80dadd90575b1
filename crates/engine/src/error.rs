//! The module contains the errors the engine can throw.
//!
//! Every error belongs to one stable [`ErrorKind`], which is what callers (the
//! HTTP layer, retry policies) should branch on. The human readable message is
//! the `Display` output.
//!
//! Storage failures are wrapped in [`Database`]; its message never includes
//! the underlying driver text, which stays reachable through
//! [`std::error::Error::source`] for logging.
//!
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

use crate::MoneyCents;

/// Stable classification of [`EngineError`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or inconsistent input. Never retried.
    Validation,
    /// The actor lacks the relationship required to act at all.
    Unauthorized,
    /// The actor can see the resource but lacks the capability.
    Forbidden,
    /// The id is absent, or hidden from the actor.
    NotFound,
    /// The operation lost against the current state of the resource.
    Conflict,
    /// Storage failure. Safe to retry only for idempotent operations.
    Persistence,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Persistence => "persistence",
        }
    }
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Cannot split between zero participants")]
    EmptyParticipants,
    #[error("Split parameters mismatch: {0}")]
    StrategyParamsMismatch(String),
    #[error("Custom amounts sum to {actual}, expected {expected}")]
    SumMismatch {
        expected: MoneyCents,
        actual: MoneyCents,
    },
    #[error("Percentages sum to {0} basis points, expected 10000")]
    InvalidPercentageTotal(i64),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Share already paid: {0}")]
    AlreadyPaid(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Storage failure")]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Returns the stable kind of the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_)
            | Self::InvalidInput(_)
            | Self::EmptyParticipants
            | Self::StrategyParamsMismatch(_)
            | Self::SumMismatch { .. }
            | Self::InvalidPercentageTotal(_) => ErrorKind::Validation,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::KeyNotFound(_) => ErrorKind::NotFound,
            Self::ExistingKey(_) | Self::AlreadyPaid(_) | Self::InvalidTransition(_) => {
                ErrorKind::Conflict
            }
            Self::Database(_) => ErrorKind::Persistence,
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::EmptyParticipants, Self::EmptyParticipants) => true,
            (Self::StrategyParamsMismatch(a), Self::StrategyParamsMismatch(b)) => a == b,
            (
                Self::SumMismatch {
                    expected: e1,
                    actual: a1,
                },
                Self::SumMismatch {
                    expected: e2,
                    actual: a2,
                },
            ) => e1 == e2 && a1 == a2,
            (Self::InvalidPercentageTotal(a), Self::InvalidPercentageTotal(b)) => a == b,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::AlreadyPaid(a), Self::AlreadyPaid(b)) => a == b,
            (Self::InvalidTransition(a), Self::InvalidTransition(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_message_hides_driver_text() {
        let err = EngineError::from(DbErr::Custom("no such table: secret".to_string()));
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(!err.to_string().contains("secret"));
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert!(source.is_some_and(|s| s.contains("secret")));
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(EngineError::EmptyParticipants.kind(), ErrorKind::Validation);
        assert_eq!(
            EngineError::AlreadyPaid("x".to_string()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            EngineError::KeyNotFound("x".to_string()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(ErrorKind::NotFound.as_str(), "not_found");
    }
}
