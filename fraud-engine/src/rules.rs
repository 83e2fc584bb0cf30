//! Rule model and the default predicate catalog
//!
//! A [`Rule`] pairs tunable metadata (weight, enabled flag) with a pure
//! predicate over a transaction and an optional behavioral baseline.
//! Predicates never mutate their inputs and never retain state between
//! invocations, so a rule catalog can be shared freely across evaluations.

use crate::types::{Baseline, RuleTuning, Transaction};
use chrono::Duration;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

/// How long after a credential change a baseline-derived signal still counts
/// as "recent".
pub const PASSWORD_CHANGE_RECENCY_HOURS: i64 = 24;

/// Pure predicate over (transaction, optional baseline).
pub type Predicate = Arc<dyn Fn(&Transaction, Option<&Baseline>) -> bool + Send + Sync>;

/// A named, weighted, enable-able fraud signal.
///
/// The id is immutable once constructed; weight and enabled are mutated only
/// through [`crate::RuleSet`].
#[derive(Clone)]
pub struct Rule {
    id: String,
    name: String,
    description: String,
    weight: Decimal,
    enabled: bool,
    predicate: Predicate,
}

impl Rule {
    /// Create an enabled rule.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        weight: Decimal,
        predicate: Predicate,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            weight,
            enabled: true,
            predicate,
        }
    }

    /// Stable rule identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable rule name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What the rule flags
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Current weight
    pub fn weight(&self) -> Decimal {
        self.weight
    }

    /// Whether the rule participates in scoring
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Evaluate the predicate.
    pub fn check(&self, transaction: &Transaction, baseline: Option<&Baseline>) -> bool {
        (self.predicate)(transaction, baseline)
    }

    /// Projection of the externally mutable state.
    pub fn tuning(&self) -> RuleTuning {
        RuleTuning {
            rule_id: self.id.clone(),
            weight: self.weight,
            enabled: self.enabled,
        }
    }

    pub(crate) fn set_weight(&mut self, weight: Decimal) {
        self.weight = weight;
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("weight", &self.weight)
            .field("enabled", &self.enabled)
            .finish()
    }
}

// Signal resolution: the transaction field wins, the baseline fills the gap.

fn avg_amount(tx: &Transaction, baseline: Option<&Baseline>) -> Decimal {
    tx.avg_transaction_amount
        .or_else(|| baseline.map(|b| b.avg_transaction_amount))
        .unwrap_or(Decimal::ZERO)
}

fn std_amount(tx: &Transaction, baseline: Option<&Baseline>) -> Decimal {
    tx.std_transaction_amount
        .or_else(|| baseline.map(|b| b.std_transaction_amount))
        .unwrap_or(Decimal::ZERO)
}

fn usual_location<'a>(tx: &'a Transaction, baseline: Option<&'a Baseline>) -> Option<&'a str> {
    tx.payer_usual_location
        .as_deref()
        .or_else(|| baseline.map(|b| b.usual_location.as_str()))
}

fn usual_browser<'a>(tx: &'a Transaction, baseline: Option<&'a Baseline>) -> Option<&'a str> {
    tx.payer_usual_browser
        .as_deref()
        .or_else(|| baseline.map(|b| b.usual_browser.as_str()))
}

fn usual_channel<'a>(tx: &'a Transaction, baseline: Option<&'a Baseline>) -> Option<&'a str> {
    tx.usual_channel
        .as_deref()
        .or_else(|| baseline.map(|b| b.usual_channel.as_str()))
}

fn usual_hourly_count(tx: &Transaction, baseline: Option<&Baseline>) -> u32 {
    tx.usual_transaction_count_per_hour
        .or_else(|| baseline.map(|b| b.usual_transaction_count_per_hour))
        .unwrap_or(0)
}

fn is_new_payee(tx: &Transaction, baseline: Option<&Baseline>) -> bool {
    tx.is_new_payee
        .or_else(|| baseline.map(|b| !b.usual_payees.contains(&tx.payee)))
        .unwrap_or(false)
}

fn password_changed_recently(tx: &Transaction, baseline: Option<&Baseline>) -> bool {
    if let Some(flag) = tx.password_changed_recently {
        return flag;
    }
    baseline
        .and_then(|b| b.last_password_change)
        .map_or(false, |changed_at| {
            changed_at <= tx.date
                && tx.date - changed_at <= Duration::hours(PASSWORD_CHANGE_RECENCY_HOURS)
        })
}

/// Build a fresh instance of the default rule catalog.
///
/// Every caller gets an independently tunable set; there is no shared
/// mutable catalog. Mismatch rules evaluate to false when the usual-side
/// signal is unknown: an unknown signal is not evidence of fraud.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "social-media-location-mismatch",
            "Social Media Location Mismatch",
            "Transaction originates from a location different from the payer's usual activity",
            Decimal::from(20),
            Arc::new(|tx, baseline| {
                match (tx.payer_location.as_deref(), usual_location(tx, baseline)) {
                    (Some(current), Some(usual)) => current != usual,
                    _ => false,
                }
            }),
        ),
        Rule::new(
            "high-value-transaction",
            "High-Value Transaction",
            "Amount exceeds 10x the payer's average transaction value",
            Decimal::from(30),
            Arc::new(|tx, baseline| tx.amount > avg_amount(tx, baseline) * Decimal::from(10)),
        ),
        Rule::new(
            "z-score-anomaly",
            "Z-Score Anomaly Detection",
            "Amount deviates more than 3 standard deviations from the payer's norm",
            Decimal::from(25),
            Arc::new(|tx, baseline| {
                let avg = avg_amount(tx, baseline);
                let std = std_amount(tx, baseline);
                if avg <= Decimal::ZERO || std <= Decimal::ZERO {
                    return false;
                }
                // |z| > 3, expressed without the division
                (tx.amount - avg).abs() > std * Decimal::from(3)
            }),
        ),
        Rule::new(
            "channel-switching",
            "Channel Switching Behavior",
            "Transaction arrives on a channel the payer does not usually use",
            Decimal::from(15),
            Arc::new(|tx, baseline| match usual_channel(tx, baseline) {
                Some(usual) => tx.channel != usual,
                None => false,
            }),
        ),
        Rule::new(
            "transaction-volume-spike",
            "Sudden Spike in Transaction Volume",
            "Trailing-hour transaction count exceeds 3x the payer's usual rate",
            Decimal::from(35),
            Arc::new(|tx, baseline| {
                let last_hour = u64::from(tx.transaction_count_last_hour.unwrap_or(0));
                last_hour > u64::from(usual_hourly_count(tx, baseline)) * 3
            }),
        ),
        Rule::new(
            "unusual-browser-device",
            "Unusual Browser or Device Usage",
            "Unknown browser, headless automation, or anonymizing browser",
            Decimal::from(30),
            Arc::new(|tx, baseline| {
                let browser_mismatch =
                    match (tx.payer_browser.as_deref(), usual_browser(tx, baseline)) {
                        (Some(current), Some(usual)) => current != usual,
                        _ => false,
                    };
                let headless = tx.payer_device.to_lowercase().contains("headless");
                let anonymized = tx
                    .payer_browser
                    .as_deref()
                    .map_or(false, |b| b.to_lowercase().contains("tor"));
                browser_mismatch || headless || anonymized
            }),
        ),
        Rule::new(
            "new-payee-high-amount",
            "New Payee with High Transaction Amount",
            "High-value transaction to a payee this payer has not paid before",
            Decimal::from(40),
            Arc::new(|tx, baseline| {
                is_new_payee(tx, baseline)
                    && tx.amount > avg_amount(tx, baseline) * Decimal::from(5)
            }),
        ),
        Rule::new(
            "password-change-high-transaction",
            "Password Change & High-Value Transaction",
            "High-value transaction shortly after a credential change",
            Decimal::from(35),
            Arc::new(|tx, baseline| {
                password_changed_recently(tx, baseline)
                    && tx.amount > avg_amount(tx, baseline) * Decimal::from(5)
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    fn transaction(amount: i64) -> Transaction {
        Transaction {
            id: "txn-1".to_string(),
            date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            amount: Decimal::from(amount),
            channel: "web".to_string(),
            payment_mode: "card".to_string(),
            gateway: "stripe".to_string(),
            payer_email: "payer@example.com".to_string(),
            payer_device: "MacIntel".to_string(),
            payee: "merchant-1".to_string(),
            payer_location: None,
            payer_usual_location: None,
            payer_browser: None,
            payer_usual_browser: None,
            is_new_payee: None,
            avg_transaction_amount: None,
            std_transaction_amount: None,
            transaction_count_last_hour: None,
            usual_transaction_count_per_hour: None,
            password_changed_recently: None,
            usual_channel: None,
        }
    }

    fn baseline() -> Baseline {
        Baseline {
            avg_transaction_amount: Decimal::from(100),
            std_transaction_amount: Decimal::from(20),
            usual_location: "Berlin".to_string(),
            usual_device: "MacIntel".to_string(),
            usual_browser: "Firefox".to_string(),
            usual_payees: HashSet::from(["merchant-1".to_string()]),
            usual_transaction_count_per_hour: 2,
            usual_channel: "web".to_string(),
            last_password_change: None,
        }
    }

    fn rule(id: &str) -> Rule {
        default_rules()
            .into_iter()
            .find(|r| r.id() == id)
            .unwrap_or_else(|| panic!("no rule {id}"))
    }

    #[test]
    fn default_catalog_has_stable_order() {
        let ids: Vec<String> = default_rules().iter().map(|r| r.id().to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "social-media-location-mismatch",
                "high-value-transaction",
                "z-score-anomaly",
                "channel-switching",
                "transaction-volume-spike",
                "unusual-browser-device",
                "new-payee-high-amount",
                "password-change-high-transaction",
            ]
        );
    }

    #[test]
    fn location_mismatch_needs_both_signals() {
        let mut tx = transaction(100);
        assert!(!rule("social-media-location-mismatch").check(&tx, None));

        tx.payer_location = Some("Lagos".to_string());
        // Usual location unknown: not evidence
        assert!(!rule("social-media-location-mismatch").check(&tx, None));

        tx.payer_usual_location = Some("Berlin".to_string());
        assert!(rule("social-media-location-mismatch").check(&tx, None));

        tx.payer_location = Some("Berlin".to_string());
        assert!(!rule("social-media-location-mismatch").check(&tx, None));
    }

    #[test]
    fn location_mismatch_falls_back_to_baseline() {
        let mut tx = transaction(100);
        tx.payer_location = Some("Lagos".to_string());
        assert!(rule("social-media-location-mismatch").check(&tx, Some(&baseline())));
    }

    #[test]
    fn high_value_uses_zero_average_when_unknown() {
        // avg defaults to 0, so any positive amount clears 10x
        let tx = transaction(1);
        assert!(rule("high-value-transaction").check(&tx, None));

        let mut tx = transaction(500);
        tx.avg_transaction_amount = Some(Decimal::from(100));
        assert!(!rule("high-value-transaction").check(&tx, None));
        tx.amount = Decimal::from(1001);
        assert!(rule("high-value-transaction").check(&tx, None));
    }

    #[test]
    fn z_score_skips_on_zero_variance() {
        let mut tx = transaction(1_000_000);
        tx.avg_transaction_amount = Some(Decimal::from(100));
        tx.std_transaction_amount = Some(Decimal::ZERO);
        assert!(!rule("z-score-anomaly").check(&tx, None));

        tx.std_transaction_amount = None;
        assert!(!rule("z-score-anomaly").check(&tx, None));

        tx.std_transaction_amount = Some(Decimal::from(20));
        assert!(rule("z-score-anomaly").check(&tx, None));
    }

    #[test]
    fn z_score_is_two_sided() {
        let mut tx = transaction(10);
        tx.avg_transaction_amount = Some(Decimal::from(100));
        tx.std_transaction_amount = Some(Decimal::from(20));
        // 90 below average is 4.5 sigma
        assert!(rule("z-score-anomaly").check(&tx, None));
    }

    #[test]
    fn channel_switching_ignores_unknown_usual_channel() {
        let mut tx = transaction(100);
        assert!(!rule("channel-switching").check(&tx, None));

        tx.usual_channel = Some("mobile".to_string());
        assert!(rule("channel-switching").check(&tx, None));

        tx.usual_channel = None;
        let mut base = baseline();
        base.usual_channel = "atm".to_string();
        assert!(rule("channel-switching").check(&tx, Some(&base)));
    }

    #[test]
    fn volume_spike_compares_against_usual_rate() {
        let mut tx = transaction(100);
        tx.transaction_count_last_hour = Some(7);
        tx.usual_transaction_count_per_hour = Some(2);
        assert!(rule("transaction-volume-spike").check(&tx, None));

        tx.transaction_count_last_hour = Some(6);
        assert!(!rule("transaction-volume-spike").check(&tx, None));

        // Both unknown: 0 > 0 is false
        tx.transaction_count_last_hour = None;
        tx.usual_transaction_count_per_hour = None;
        assert!(!rule("transaction-volume-spike").check(&tx, None));
    }

    #[test]
    fn headless_device_always_flags() {
        let mut tx = transaction(100);
        tx.payer_device = "HeadlessChrome/120".to_string();
        assert!(rule("unusual-browser-device").check(&tx, None));
    }

    #[test]
    fn tor_browser_always_flags() {
        let mut tx = transaction(100);
        tx.payer_browser = Some("Tor Browser 13".to_string());
        assert!(rule("unusual-browser-device").check(&tx, None));
    }

    #[test]
    fn browser_mismatch_needs_both_signals() {
        let mut tx = transaction(100);
        tx.payer_browser = Some("Chrome".to_string());
        assert!(!rule("unusual-browser-device").check(&tx, None));

        tx.payer_usual_browser = Some("Firefox".to_string());
        assert!(rule("unusual-browser-device").check(&tx, None));

        tx.payer_usual_browser = None;
        assert!(rule("unusual-browser-device").check(&tx, Some(&baseline())));
    }

    #[test]
    fn new_payee_falls_back_to_baseline_payee_set() {
        let mut tx = transaction(600);
        tx.avg_transaction_amount = Some(Decimal::from(100));
        tx.payee = "merchant-unknown".to_string();
        assert!(rule("new-payee-high-amount").check(&tx, Some(&baseline())));

        tx.payee = "merchant-1".to_string();
        assert!(!rule("new-payee-high-amount").check(&tx, Some(&baseline())));
    }

    #[test]
    fn new_payee_requires_high_amount() {
        let mut tx = transaction(400);
        tx.is_new_payee = Some(true);
        tx.avg_transaction_amount = Some(Decimal::from(100));
        assert!(!rule("new-payee-high-amount").check(&tx, None));

        tx.amount = Decimal::from(501);
        assert!(rule("new-payee-high-amount").check(&tx, None));
    }

    #[test]
    fn password_change_recency_window_from_baseline() {
        let mut tx = transaction(600);
        tx.avg_transaction_amount = Some(Decimal::from(100));

        let mut base = baseline();
        base.last_password_change = Some(tx.date - Duration::hours(2));
        assert!(rule("password-change-high-transaction").check(&tx, Some(&base)));

        base.last_password_change = Some(tx.date - Duration::hours(48));
        assert!(!rule("password-change-high-transaction").check(&tx, Some(&base)));

        // A change recorded after the transaction does not count
        base.last_password_change = Some(tx.date + Duration::hours(1));
        assert!(!rule("password-change-high-transaction").check(&tx, Some(&base)));
    }

    #[test]
    fn transaction_flag_overrides_baseline_password_signal() {
        let mut tx = transaction(600);
        tx.avg_transaction_amount = Some(Decimal::from(100));
        tx.password_changed_recently = Some(false);

        let mut base = baseline();
        base.last_password_change = Some(tx.date - Duration::hours(1));
        assert!(!rule("password-change-high-transaction").check(&tx, Some(&base)));
    }
}
