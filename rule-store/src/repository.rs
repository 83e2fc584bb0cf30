//! Repository implementations for rule tunings
//!
//! The engine only ever consumes the currently active snapshot; persisting
//! the edited rule set is the configuration layer's job. What gets stored is
//! the tunable projection of each rule (id, weight, enabled) — predicates
//! stay in the catalog and are rebound on load via
//! [`fraud_engine::RuleSet::apply_tunings`].

use crate::error::Result;
use fraud_engine::RuleTuning;
use parking_lot::Mutex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

/// Durable storage for the tunable state of a rule set.
pub trait RuleSetRepository {
    /// Load the persisted tunings, `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<Vec<RuleTuning>>>;

    /// Persist the given tunings, replacing any previous save.
    fn save(&self, tunings: &[RuleTuning]) -> Result<()>;
}

/// JSON-file-backed repository.
pub struct FileRepository {
    path: PathBuf,
}

impl FileRepository {
    /// Repository persisting to the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path the repository persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleSetRepository for FileRepository {
    fn load(&self) -> Result<Option<Vec<RuleTuning>>> {
        let payload = match fs::read_to_string(&self.path) {
            Ok(payload) => payload,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let tunings: Vec<RuleTuning> = serde_json::from_str(&payload)?;
        info!(
            path = %self.path.display(),
            count = tunings.len(),
            "loaded rule tunings"
        );
        Ok(Some(tunings))
    }

    fn save(&self, tunings: &[RuleTuning]) -> Result<()> {
        let payload = serde_json::to_string_pretty(tunings)?;
        // Write-then-rename so a crash mid-save never leaves a torn file.
        // The suffix is appended to the whole file name, not swapped for the
        // extension, so sibling repositories never share a scratch file.
        let mut tmp_name = self.path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &self.path)?;
        info!(
            path = %self.path.display(),
            count = tunings.len(),
            "saved rule tunings"
        );
        Ok(())
    }
}

/// In-memory repository for tests and embedded use.
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<Option<Vec<RuleTuning>>>,
}

impl MemoryRepository {
    /// Empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleSetRepository for MemoryRepository {
    fn load(&self) -> Result<Option<Vec<RuleTuning>>> {
        Ok(self.inner.lock().clone())
    }

    fn save(&self, tunings: &[RuleTuning]) -> Result<()> {
        *self.inner.lock() = Some(tunings.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fraud_engine::RuleSet;
    use rust_decimal::Decimal;

    #[test]
    fn file_repository_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::new(dir.path().join("rules.json"));
        assert!(repo.load().unwrap().is_none());
    }

    #[test]
    fn file_repository_roundtrips_tunings() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::new(dir.path().join("rules.json"));

        let mut set = RuleSet::default();
        set.set_enabled("channel-switching", false).unwrap();
        set.set_weight("high-value-transaction", Decimal::from(45))
            .unwrap();
        repo.save(&set.tunings()).unwrap();

        let mut restored = RuleSet::default();
        restored
            .apply_tunings(&repo.load().unwrap().unwrap())
            .unwrap();

        assert!(!restored.get("channel-switching").unwrap().enabled());
        assert_eq!(
            restored.get("high-value-transaction").unwrap().weight(),
            Decimal::from(45)
        );
    }

    #[test]
    fn file_repository_save_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::new(dir.path().join("rules.json"));

        let set = RuleSet::default();
        repo.save(&set.tunings()).unwrap();

        let mut edited = RuleSet::default();
        edited.set_enabled("z-score-anomaly", false).unwrap();
        repo.save(&edited.tunings()).unwrap();

        let loaded = repo.load().unwrap().unwrap();
        let z = loaded
            .iter()
            .find(|t| t.rule_id == "z-score-anomaly")
            .unwrap();
        assert!(!z.enabled);
    }

    #[test]
    fn scratch_file_keeps_the_full_file_name() {
        let dir = tempfile::tempdir().unwrap();

        // Occupy the name an extension-swapping scratch file would use;
        // the save must not touch it
        fs::create_dir(dir.path().join("rules.tmp")).unwrap();

        let repo = FileRepository::new(dir.path().join("rules.json"));
        repo.save(&RuleSet::default().tunings()).unwrap();

        assert!(dir.path().join("rules.json").is_file());
        assert!(dir.path().join("rules.tmp").is_dir());
        assert!(!dir.path().join("rules.json.tmp").exists());
    }

    #[test]
    fn file_repository_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        fs::write(&path, "not json").unwrap();

        let repo = FileRepository::new(path);
        assert!(matches!(
            repo.load(),
            Err(crate::error::StoreError::Serialization(_))
        ));
    }

    #[test]
    fn memory_repository_roundtrips() {
        let repo = MemoryRepository::new();
        assert!(repo.load().unwrap().is_none());

        let tunings = RuleSet::default().tunings();
        repo.save(&tunings).unwrap();
        assert_eq!(repo.load().unwrap().unwrap(), tunings);
    }
}
