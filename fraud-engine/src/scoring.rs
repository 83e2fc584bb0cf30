//! Scoring engine: weighted rule aggregation with escalation

use crate::error::{Error, Result};
use crate::rules::Rule;
use crate::ruleset::RuleSnapshot;
use crate::types::{Baseline, FraudDetectionResult, Transaction, TriggeredRule};
use rust_decimal::Decimal;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

/// Classification thresholds and the escalation step.
///
/// Engine-level configuration, not per-call parameters: a deployment
/// overrides these without touching predicate logic.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Score at or above which a transaction is classified as fraud
    pub fraud_threshold: Decimal,

    /// Score at or above which a transaction is flagged for review
    pub suspicious_threshold: Decimal,

    /// Multiplier increase per co-triggered rule beyond the first
    pub escalation_step: Decimal,
}

impl ScoringConfig {
    /// Default fraud threshold
    pub const DEFAULT_FRAUD_THRESHOLD: i64 = 70;

    /// Default suspicion threshold
    pub const DEFAULT_SUSPICIOUS_THRESHOLD: i64 = 40;

    /// Default escalation step, in tenths (0.2)
    pub const DEFAULT_ESCALATION_STEP_TENTHS: i64 = 2;
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            fraud_threshold: Decimal::from(Self::DEFAULT_FRAUD_THRESHOLD),
            suspicious_threshold: Decimal::from(Self::DEFAULT_SUSPICIOUS_THRESHOLD),
            escalation_step: Decimal::new(Self::DEFAULT_ESCALATION_STEP_TENTHS, 1),
        }
    }
}

/// Rule-based fraud detector.
///
/// `evaluate` is a pure synchronous computation: no I/O, no suspension
/// points, no shared mutable state. It is safe to call from parallel workers
/// as long as each call holds its own [`RuleSnapshot`].
#[derive(Debug, Clone, Default)]
pub struct FraudDetector {
    config: ScoringConfig,
}

impl FraudDetector {
    /// Detector with explicit thresholds.
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score one transaction against a rule snapshot.
    ///
    /// Missing optional transaction fields never fail evaluation; the only
    /// fatal condition is a transaction without its identifying fields. A
    /// predicate that panics counts as "did not trigger", so a syntactically
    /// valid transaction always produces a result.
    pub fn evaluate(
        &self,
        transaction: &Transaction,
        rules: &RuleSnapshot,
        baseline: Option<&Baseline>,
    ) -> Result<FraudDetectionResult> {
        validate(transaction)?;

        let triggered: Vec<&Rule> = rules
            .enabled_rules()
            .filter(|rule| {
                catch_unwind(AssertUnwindSafe(|| rule.check(transaction, baseline)))
                    .unwrap_or_else(|_| {
                        warn!(
                            rule_id = rule.id(),
                            transaction_id = %transaction.id,
                            "rule predicate panicked, treating as not triggered"
                        );
                        false
                    })
            })
            .collect();

        let multiplier = self.escalation_multiplier(triggered.len());

        let mut fraud_score = Decimal::ZERO;
        let triggered_rules: Vec<TriggeredRule> = triggered
            .iter()
            .map(|rule| {
                let contribution = rule.weight() * multiplier;
                fraud_score += contribution;
                TriggeredRule {
                    rule_id: rule.id().to_string(),
                    rule_name: rule.name().to_string(),
                    contribution,
                }
            })
            .collect();

        let is_fraud = fraud_score >= self.config.fraud_threshold;
        let is_suspicious = !is_fraud && fraud_score >= self.config.suspicious_threshold;

        let fraud_reason = if is_fraud || is_suspicious {
            triggered_rules
                .iter()
                .map(|r| format!("{} (Score: {:.1})", r.rule_name, r.contribution))
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            String::new()
        };

        debug!(
            transaction_id = %transaction.id,
            %fraud_score,
            triggered = triggered_rules.len(),
            is_fraud,
            is_suspicious,
            "scored transaction"
        );

        Ok(FraudDetectionResult {
            transaction_id: transaction.id.clone(),
            is_fraud,
            is_suspicious,
            fraud_score,
            triggered_rules,
            fraud_reason,
        })
    }

    /// Escalation multiplier for a trigger count.
    ///
    /// A single signal is taken at face value; each additional co-triggered
    /// rule raises the multiplier by the configured step.
    pub fn escalation_multiplier(&self, triggered_count: usize) -> Decimal {
        if triggered_count <= 1 {
            return Decimal::ONE;
        }
        Decimal::ONE + self.config.escalation_step * Decimal::from(triggered_count as u64 - 1)
    }
}

fn validate(transaction: &Transaction) -> Result<()> {
    if transaction.id.trim().is_empty() {
        return Err(Error::InvalidTransaction {
            id: transaction.id.clone(),
            reason: "missing transaction id".to_string(),
        });
    }
    if transaction.channel.trim().is_empty() {
        return Err(Error::InvalidTransaction {
            id: transaction.id.clone(),
            reason: "missing channel".to_string(),
        });
    }
    Ok(())
}
