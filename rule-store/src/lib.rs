//! Pluggable persistence for rule-set tunings
//!
//! External rule-management tooling edits weights and enabled flags on a
//! [`fraud_engine::RuleSet`]; this crate stores and restores that tunable
//! state so edits survive restarts.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod repository;

pub use error::{Result, StoreError};
pub use repository::{FileRepository, MemoryRepository, RuleSetRepository};
