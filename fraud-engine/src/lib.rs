//! Rule-based transaction fraud scoring
//!
//! Evaluates a configurable set of weighted boolean rules against a single
//! transaction (plus an optional behavioral baseline), compounds co-firing
//! rules with an escalation multiplier, and classifies the result into
//! clear / suspicious / fraud tiers with an explainable breakdown.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod rules;
pub mod ruleset;
pub mod scoring;
pub mod types;

pub use error::{Error, Result};
pub use rules::{default_rules, Predicate, Rule};
pub use ruleset::{RuleSet, RuleSnapshot, SharedRuleSet};
pub use scoring::{FraudDetector, ScoringConfig};
pub use types::*;
