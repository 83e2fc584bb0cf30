//! Core types for the fraud scoring engine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single payment transaction under evaluation.
///
/// The identifying fields (`id`, `amount`, `channel`) are required; the
/// contextual fields are optional and default to absent when an ingest
/// payload omits them. Predicates handle absence themselves, so a partial
/// transaction never fails evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Caller-supplied transaction identifier
    pub id: String,

    /// Transaction timestamp
    pub date: DateTime<Utc>,

    /// Transaction amount
    pub amount: Decimal,

    /// Channel the transaction arrived on (web, mobile, pos, atm)
    pub channel: String,

    /// Payment mode (card, wallet, bank transfer, ...)
    pub payment_mode: String,

    /// Gateway that processed the transaction
    pub gateway: String,

    /// Payer identity
    pub payer_email: String,

    /// Payer device / user-agent fingerprint
    pub payer_device: String,

    /// Payee identity
    pub payee: String,

    /// Geolocation the transaction originated from
    #[serde(default)]
    pub payer_location: Option<String>,

    /// Payer's usual geolocation, if the ingest layer resolved it
    #[serde(default)]
    pub payer_usual_location: Option<String>,

    /// Browser observed on this transaction
    #[serde(default)]
    pub payer_browser: Option<String>,

    /// Payer's usual browser
    #[serde(default)]
    pub payer_usual_browser: Option<String>,

    /// Whether this payee has not been paid by this payer before
    #[serde(default)]
    pub is_new_payee: Option<bool>,

    /// Payer's historical average transaction amount
    #[serde(default)]
    pub avg_transaction_amount: Option<Decimal>,

    /// Standard deviation of the payer's historical amounts
    #[serde(default)]
    pub std_transaction_amount: Option<Decimal>,

    /// Number of transactions by this payer in the trailing hour
    #[serde(default)]
    pub transaction_count_last_hour: Option<u32>,

    /// Payer's usual hourly transaction count
    #[serde(default)]
    pub usual_transaction_count_per_hour: Option<u32>,

    /// Whether the payer's credential was changed recently
    #[serde(default)]
    pub password_changed_recently: Option<bool>,

    /// Payer's usual channel
    #[serde(default)]
    pub usual_channel: Option<String>,
}

/// Behavioral baseline for a payer, supplied by an external profiling
/// collaborator.
///
/// Predicates read the corresponding transaction field first and fall back
/// to the baseline, so a transaction that already carries derived context
/// never needs one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    /// Average transaction amount
    pub avg_transaction_amount: Decimal,

    /// Standard deviation of transaction amounts
    pub std_transaction_amount: Decimal,

    /// Usual geolocation
    pub usual_location: String,

    /// Usual device fingerprint
    pub usual_device: String,

    /// Usual browser
    pub usual_browser: String,

    /// Payees this payer has transacted with before
    pub usual_payees: HashSet<String>,

    /// Usual hourly transaction count
    pub usual_transaction_count_per_hour: u32,

    /// Usual channel
    pub usual_channel: String,

    /// Last credential change, if any
    #[serde(default)]
    pub last_password_change: Option<DateTime<Utc>>,
}

/// One rule that fired during an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredRule {
    /// Identifier of the rule
    pub rule_id: String,

    /// Human-readable rule name
    pub rule_name: String,

    /// Escalation-adjusted contribution to the fraud score
    pub contribution: Decimal,
}

/// Outcome of scoring a single transaction.
///
/// A plain value: constructed fresh per evaluation, never mutated after
/// return, and carrying no reference back to the rule set or transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudDetectionResult {
    /// Identifier of the evaluated transaction
    pub transaction_id: String,

    /// Score reached the fraud threshold
    pub is_fraud: bool,

    /// Score reached the suspicion threshold but not the fraud threshold
    pub is_suspicious: bool,

    /// Aggregate weighted evidence
    pub fraud_score: Decimal,

    /// Rules that fired, in rule-set order
    pub triggered_rules: Vec<TriggeredRule>,

    /// Triggered rule names with contributions, empty below the suspicion
    /// threshold
    pub fraud_reason: String,
}

impl FraudDetectionResult {
    /// Risk tier derived from the authoritative classification flags.
    pub fn tier(&self) -> RiskTier {
        RiskTier::from(self)
    }
}

/// Risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    /// Below the suspicion threshold
    Clear,
    /// At or above the suspicion threshold, below the fraud threshold
    Suspicious,
    /// At or above the fraud threshold
    Fraud,
}

impl From<&FraudDetectionResult> for RiskTier {
    fn from(result: &FraudDetectionResult) -> Self {
        if result.is_fraud {
            RiskTier::Fraud
        } else if result.is_suspicious {
            RiskTier::Suspicious
        } else {
            RiskTier::Clear
        }
    }
}

/// Serializable projection of a rule's externally mutable state.
///
/// This is what rule-management tooling persists and re-applies; the
/// predicate itself never leaves the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTuning {
    /// Identifier of the rule being tuned
    pub rule_id: String,

    /// Configured weight
    pub weight: Decimal,

    /// Whether the rule participates in scoring
    pub enabled: bool,
}
