// tierline-core/src/infrastructure/adapters/quarantine.rs

use std::path::PathBuf;
use std::sync::Mutex;

use crate::domain::ports::QuarantineRepository;
use crate::domain::quarantine::QuarantineRecord;
use crate::error::TierlineError;
use crate::infrastructure::fs::write_json;

/// Quarantine records as one JSON array on disk, rewritten atomically.
#[derive(Debug, Clone)]
pub struct JsonFileQuarantineRepository {
    path: PathBuf,
}

impl JsonFileQuarantineRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl QuarantineRepository for JsonFileQuarantineRepository {
    fn load_all(&self) -> Result<Vec<QuarantineRecord>, TierlineError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save_all(&self, records: &[QuarantineRecord]) -> Result<(), TierlineError> {
        write_json(&self.path, records)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryQuarantineRepository {
    records: Mutex<Vec<QuarantineRecord>>,
}

impl InMemoryQuarantineRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuarantineRepository for InMemoryQuarantineRepository {
    fn load_all(&self) -> Result<Vec<QuarantineRecord>, TierlineError> {
        let records = self
            .records
            .lock()
            .map_err(|_| TierlineError::InternalError("Quarantine lock poisoned".into()))?;
        Ok(records.clone())
    }

    fn save_all(&self, records: &[QuarantineRecord]) -> Result<(), TierlineError> {
        let mut stored = self
            .records
            .lock()
            .map_err(|_| TierlineError::InternalError("Quarantine lock poisoned".into()))?;
        *stored = records.to_vec();
        Ok(())
    }
}
