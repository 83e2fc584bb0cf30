//! Rule catalog with tunable state and immutable evaluation snapshots
//!
//! A [`RuleSet`] is not thread-safe by itself: configuration callers either
//! serialize writes or go through [`SharedRuleSet`], which republishes an
//! immutable [`RuleSnapshot`] on every successful mutation. Evaluations read
//! whichever snapshot was current when they started and are unaffected by
//! later edits.

use crate::error::{Error, Result};
use crate::rules::{default_rules, Rule};
use crate::types::RuleTuning;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::warn;

/// Ordered, mutable catalog of rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Create a rule set from a list of rules, preserving order.
    ///
    /// A duplicate id keeps the first registration and drops the rest.
    pub fn new(rules: Vec<Rule>) -> Self {
        let mut set = Self { rules: Vec::new() };
        for rule in rules {
            set.register(rule);
        }
        set
    }

    /// Rule set with the default catalog.
    pub fn with_default_catalog() -> Self {
        Self::new(default_rules())
    }

    /// Current rules in registration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Look up a rule by id.
    pub fn get(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id() == rule_id)
    }

    /// Append a rule. First registration of an id wins.
    pub fn register(&mut self, rule: Rule) {
        if self.rules.iter().any(|r| r.id() == rule.id()) {
            warn!(rule_id = rule.id(), "duplicate rule id, keeping existing rule");
            return;
        }
        self.rules.push(rule);
    }

    /// Enable or disable a rule. Idempotent.
    pub fn set_enabled(&mut self, rule_id: &str, enabled: bool) -> Result<()> {
        let rule = self.get_mut(rule_id)?;
        rule.set_enabled(enabled);
        Ok(())
    }

    /// Change a rule's weight. Negative weights are rejected.
    pub fn set_weight(&mut self, rule_id: &str, weight: Decimal) -> Result<()> {
        if weight.is_sign_negative() {
            return Err(Error::InvalidWeight {
                rule_id: rule_id.to_string(),
                weight,
            });
        }
        let rule = self.get_mut(rule_id)?;
        rule.set_weight(weight);
        Ok(())
    }

    /// Immutable snapshot for the scoring engine.
    pub fn snapshot(&self) -> RuleSnapshot {
        RuleSnapshot {
            rules: Arc::from(self.rules.as_slice()),
        }
    }

    /// Tunable state of every rule, in registration order.
    pub fn tunings(&self) -> Vec<RuleTuning> {
        self.rules.iter().map(Rule::tuning).collect()
    }

    /// Merge persisted tunings back onto the catalog.
    ///
    /// Tunings for ids no longer in the catalog are skipped with a warning;
    /// a persisted set may predate a catalog change. A negative persisted
    /// weight rejects the whole merge before any rule is touched, so a
    /// failed call never leaves the catalog half-applied.
    pub fn apply_tunings(&mut self, tunings: &[RuleTuning]) -> Result<()> {
        for tuning in tunings {
            if tuning.weight.is_sign_negative() {
                return Err(Error::InvalidWeight {
                    rule_id: tuning.rule_id.clone(),
                    weight: tuning.weight,
                });
            }
        }
        for tuning in tunings {
            match self.get_mut(&tuning.rule_id) {
                Ok(rule) => {
                    rule.set_weight(tuning.weight);
                    rule.set_enabled(tuning.enabled);
                }
                Err(_) => {
                    warn!(rule_id = %tuning.rule_id, "skipping tuning for unknown rule");
                }
            }
        }
        Ok(())
    }

    fn get_mut(&mut self, rule_id: &str) -> Result<&mut Rule> {
        self.rules
            .iter_mut()
            .find(|r| r.id() == rule_id)
            .ok_or_else(|| Error::UnknownRule(rule_id.to_string()))
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::with_default_catalog()
    }
}

/// Immutable view of a rule set, taken at a point in time.
///
/// Cheap to clone and safe to hand to concurrent evaluations; mutations to
/// the originating [`RuleSet`] never show through an issued snapshot.
#[derive(Debug, Clone)]
pub struct RuleSnapshot {
    rules: Arc<[Rule]>,
}

impl RuleSnapshot {
    /// Rules in registration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Enabled rules in registration order.
    pub fn enabled_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.enabled())
    }
}

/// Copy-on-write publisher around a [`RuleSet`].
///
/// Writers serialize through the lock and each successful mutation
/// republishes a fresh snapshot; readers clone the current snapshot without
/// blocking evaluation.
pub struct SharedRuleSet {
    inner: RwLock<SharedState>,
}

struct SharedState {
    set: RuleSet,
    published: RuleSnapshot,
}

impl SharedRuleSet {
    /// Wrap a rule set and publish its initial snapshot.
    pub fn new(set: RuleSet) -> Self {
        let published = set.snapshot();
        Self {
            inner: RwLock::new(SharedState { set, published }),
        }
    }

    /// Snapshot current at this instant.
    pub fn snapshot(&self) -> RuleSnapshot {
        self.inner.read().published.clone()
    }

    /// Tunable state of the current catalog.
    pub fn tunings(&self) -> Vec<RuleTuning> {
        self.inner.read().set.tunings()
    }

    /// Enable or disable a rule and republish.
    pub fn set_enabled(&self, rule_id: &str, enabled: bool) -> Result<()> {
        let mut state = self.inner.write();
        state.set.set_enabled(rule_id, enabled)?;
        state.published = state.set.snapshot();
        Ok(())
    }

    /// Change a rule's weight and republish.
    pub fn set_weight(&self, rule_id: &str, weight: Decimal) -> Result<()> {
        let mut state = self.inner.write();
        state.set.set_weight(rule_id, weight)?;
        state.published = state.set.snapshot();
        Ok(())
    }

    /// Register a rule and republish.
    pub fn register(&self, rule: Rule) {
        let mut state = self.inner.write();
        state.set.register(rule);
        state.published = state.set.snapshot();
    }

    /// Merge persisted tunings and republish.
    pub fn apply_tunings(&self, tunings: &[RuleTuning]) -> Result<()> {
        let mut state = self.inner.write();
        state.set.apply_tunings(tunings)?;
        state.published = state.set.snapshot();
        Ok(())
    }
}

impl Default for SharedRuleSet {
    fn default() -> Self {
        Self::new(RuleSet::default())
    }
}
