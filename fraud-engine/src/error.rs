//! Error types for the fraud scoring engine

use rust_decimal::Decimal;
use thiserror::Error;

/// Fraud engine error
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Transaction is missing a required identifying field
    #[error("Invalid transaction '{id}': {reason}")]
    InvalidTransaction {
        /// Identifier of the offending transaction (may be empty)
        id: String,
        /// What was missing or malformed
        reason: String,
    },

    /// Rule id not present in the rule set
    #[error("Unknown rule: {0}")]
    UnknownRule(String),

    /// Rejected weight value
    #[error("Invalid weight {weight} for rule '{rule_id}': weight must be non-negative")]
    InvalidWeight {
        /// Rule the weight was destined for
        rule_id: String,
        /// The rejected value
        weight: Decimal,
    },
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
