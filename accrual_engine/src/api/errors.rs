use thiserror::Error;

use crate::db_types::OrderNumber;

#[derive(Debug, Clone, Error)]
pub enum AccrualError {
    #[error("Order number is invalid: '{0}'")]
    InvalidOrderNumber(String),
    #[error("Order is invalid. {0}")]
    InvalidOrder(String),
    #[error("Reward rule is invalid. {0}")]
    InvalidRewardRule(String),
    #[error("Order {0} already exists")]
    OrderAlreadyExists(OrderNumber),
    #[error("A reward rule for '{0}' already exists")]
    RewardAlreadyExists(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("There are no registered orders waiting to be processed")]
    NoRegisteredOrder,
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Broad classification of [`AccrualError`]s, used to decide how an error is reported or retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request was malformed. Never retried.
    Validation,
    /// The entity already exists.
    Conflict,
    /// The entity does not exist. Benign for the processor's polling path.
    NotFound,
    /// The backing store failed. The next processing cycle is the retry.
    Storage,
}

impl AccrualError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidOrderNumber(_) | Self::InvalidOrder(_) | Self::InvalidRewardRule(_) => ErrorCategory::Validation,
            Self::OrderAlreadyExists(_) | Self::RewardAlreadyExists(_) => ErrorCategory::Conflict,
            Self::OrderNotFound(_) | Self::NoRegisteredOrder => ErrorCategory::NotFound,
            Self::DatabaseError(_) => ErrorCategory::Storage,
        }
    }
}

impl From<sqlx::Error> for AccrualError {
    fn from(e: sqlx::Error) -> Self {
        AccrualError::DatabaseError(e.to_string())
    }
}
