// tierline-core/src/application/quarantine.rs

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::ports::QuarantineRepository;
use crate::domain::quarantine::{
    NewQuarantineRecord, QuarantineFilter, QuarantineRecord, QuarantineStatus, QuarantineSummary,
};
use crate::error::TierlineError;

/// Owns quarantine records. Records are never removed: discarding is a status.
///
/// Every mutation is written through the repository before it becomes
/// visible; a failed write leaves the store unchanged.
pub struct QuarantineStore {
    repository: Arc<dyn QuarantineRepository>,
    records: Mutex<Vec<QuarantineRecord>>,
}

impl QuarantineStore {
    pub fn open(repository: Arc<dyn QuarantineRepository>) -> Result<Self, TierlineError> {
        let records = repository.load_all()?;
        Ok(Self {
            repository,
            records: Mutex::new(records),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<QuarantineRecord>>, TierlineError> {
        self.records
            .lock()
            .map_err(|_| TierlineError::InternalError("Quarantine store lock poisoned".into()))
    }

    #[instrument(skip(self, new), fields(entity = %new.entity, rules = new.failed_rules.len()))]
    pub fn capture(&self, new: NewQuarantineRecord) -> Result<QuarantineRecord, TierlineError> {
        let now = Utc::now();
        let record = QuarantineRecord {
            id: Uuid::new_v4().to_string(),
            source_tier: new.source_tier,
            target_tier: new.target_tier,
            entity: new.entity,
            failed_rules: new.failed_rules,
            original_data: new.original_data,
            status: QuarantineStatus::Pending,
            retry_count: 0,
            notes: new.notes,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
        };

        let mut records = self.lock()?;
        let mut next = records.clone();
        next.push(record.clone());
        self.repository.save_all(&next)?;
        *records = next;

        info!(id = %record.id, "🚧 Quarantined '{}' ({})", record.entity, record.tier_transition());
        Ok(record)
    }

    pub fn get(&self, id: &str) -> Result<Option<QuarantineRecord>, TierlineError> {
        Ok(self.lock()?.iter().find(|r| r.id == id).cloned())
    }

    pub fn list_records(
        &self,
        filter: &QuarantineFilter,
    ) -> Result<Vec<QuarantineRecord>, TierlineError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    /// Marks the record for another attempt. Nothing is re-validated here.
    pub fn retry(&self, id: &str) -> Result<Option<QuarantineRecord>, TierlineError> {
        self.update(id, QuarantineStatus::Retried, None, |r| r.retry_count += 1)
    }

    /// Accepts the data despite the failed rules. Notes are mandatory.
    pub fn override_record(
        &self,
        id: &str,
        notes: &str,
    ) -> Result<Option<QuarantineRecord>, TierlineError> {
        if notes.trim().is_empty() {
            return Err(DomainError::OverrideNotesRequired(id.to_string()).into());
        }
        self.update(
            id,
            QuarantineStatus::Overridden,
            Some(notes.trim().to_string()),
            |_| {},
        )
    }

    pub fn discard(&self, id: &str) -> Result<Option<QuarantineRecord>, TierlineError> {
        self.update(id, QuarantineStatus::Discarded, None, |_| {})
    }

    pub fn summary(&self) -> Result<QuarantineSummary, TierlineError> {
        Ok(QuarantineSummary::from_records(&self.lock()?))
    }

    /// `Ok(None)` for an unknown id; `InvalidTransition` for an illegal move.
    fn update<F>(
        &self,
        id: &str,
        to: QuarantineStatus,
        notes: Option<String>,
        apply: F,
    ) -> Result<Option<QuarantineRecord>, TierlineError>
    where
        F: FnOnce(&mut QuarantineRecord),
    {
        let mut records = self.lock()?;
        let Some(index) = records.iter().position(|r| r.id == id) else {
            return Ok(None);
        };

        let from = records[index].status;
        if !from.can_transition_to(&to) {
            return Err(DomainError::InvalidTransition {
                id: id.to_string(),
                from: from.to_string(),
                to: to.to_string(),
            }
            .into());
        }

        let mut next = records.clone();
        let record = &mut next[index];
        apply(record);
        record.transition(to, notes);
        let updated = record.clone();

        self.repository.save_all(&next)?;
        *records = next;

        info!(id, from = %from, to = %to, "Quarantine record updated");
        Ok(Some(updated))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::contract::{RuleKind, RuleResult};
    use crate::infrastructure::adapters::{
        InMemoryQuarantineRepository, JsonFileQuarantineRepository,
    };
    use anyhow::Result;

    fn memory_store() -> Result<QuarantineStore> {
        Ok(QuarantineStore::open(Arc::new(
            InMemoryQuarantineRepository::new(),
        ))?)
    }

    fn failure(entity: &str, source: &str, kind: RuleKind) -> NewQuarantineRecord {
        NewQuarantineRecord {
            source_tier: source.into(),
            target_tier: "gold".into(),
            entity: entity.into(),
            failed_rules: vec![RuleResult {
                kind,
                field: Some("order_id".into()),
                passed: false,
                violation_count: 2,
                total_count: 10,
                details: None,
            }],
            original_data: serde_json::json!([{ "order_id": null }]),
            notes: None,
        }
    }

    #[test]
    fn test_capture_then_retry() -> Result<()> {
        let store = memory_store()?;
        let record = store.capture(failure("orders", "silver", RuleKind::NotNull))?;
        assert_eq!(record.status, QuarantineStatus::Pending);
        assert_eq!(record.retry_count, 0);
        assert!(Uuid::parse_str(&record.id).is_ok());

        let retried = store.retry(&record.id)?.unwrap();
        assert_eq!(retried.status, QuarantineStatus::Retried);
        assert_eq!(retried.retry_count, 1);
        assert_eq!(retried.history.len(), 1);

        let again = store.retry(&record.id)?.unwrap();
        assert_eq!(again.retry_count, 2);
        Ok(())
    }

    #[test]
    fn test_unknown_id_is_none() -> Result<()> {
        let store = memory_store()?;
        assert!(store.discard("nonexistent")?.is_none());
        assert!(store.retry("nonexistent")?.is_none());
        assert!(store.override_record("nonexistent", "ok")?.is_none());
        Ok(())
    }

    #[test]
    fn test_override_requires_notes() -> Result<()> {
        let store = memory_store()?;
        let record = store.capture(failure("orders", "silver", RuleKind::Unique))?;

        let err = store.override_record(&record.id, "   ").unwrap_err();
        assert!(matches!(
            err,
            TierlineError::Domain(DomainError::OverrideNotesRequired(_))
        ));

        let overridden = store
            .override_record(&record.id, "accepted by data owner")?
            .unwrap();
        assert_eq!(overridden.status, QuarantineStatus::Overridden);
        assert_eq!(overridden.notes.as_deref(), Some("accepted by data owner"));

        assert!(store.discard(&record.id)?.is_some());
        Ok(())
    }

    #[test]
    fn test_overridden_record_can_be_retried() -> Result<()> {
        let store = memory_store()?;
        let record = store.capture(failure("orders", "silver", RuleKind::RangeCheck))?;
        store.override_record(&record.id, "accepted by data owner")?;

        // Upstream fixed, the data goes through the gate again
        let retried = store.retry(&record.id)?.unwrap();
        assert_eq!(retried.status, QuarantineStatus::Retried);
        assert_eq!(retried.retry_count, 1);
        assert_eq!(retried.history.len(), 2);
        assert_eq!(retried.history[1].from, QuarantineStatus::Overridden);

        store.discard(&record.id)?;
        assert!(store.retry(&record.id).is_err());
        assert!(store.override_record(&record.id, "too late").is_err());
        Ok(())
    }

    #[test]
    fn test_discard_is_terminal_and_kept() -> Result<()> {
        let store = memory_store()?;
        let record = store.capture(failure("orders", "silver", RuleKind::NotNull))?;
        store.discard(&record.id)?;

        let err = store.retry(&record.id).unwrap_err();
        assert!(matches!(
            err,
            TierlineError::Domain(DomainError::InvalidTransition { .. })
        ));

        let discarded = store.list_records(&QuarantineFilter {
            status: Some(QuarantineStatus::Discarded),
            ..Default::default()
        })?;
        assert_eq!(discarded.len(), 1);
        Ok(())
    }

    #[test]
    fn test_filter_and_summary() -> Result<()> {
        let store = memory_store()?;
        store.capture(failure("orders", "silver", RuleKind::NotNull))?;
        store.capture(failure("orders", "bronze", RuleKind::Unique))?;
        let customers = store.capture(failure("customers", "silver", RuleKind::NotNull))?;
        store.discard(&customers.id)?;

        let orders = store.list_records(&QuarantineFilter {
            entity: Some("orders".into()),
            ..Default::default()
        })?;
        assert_eq!(orders.len(), 2);

        let from_silver = store.list_records(&QuarantineFilter {
            source_tier: Some("silver".into()),
            status: Some(QuarantineStatus::Pending),
            ..Default::default()
        })?;
        assert_eq!(from_silver.len(), 1);

        let summary = store.summary()?;
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_entity["orders"], 2);
        assert_eq!(summary.by_transition["silver->gold"], 2);
        assert_eq!(summary.by_rule_kind["not_null"], 2);
        assert_eq!(summary.by_status["discarded"], 1);
        Ok(())
    }

    #[test]
    fn test_persisted_across_reopen() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("quarantine.json");

        let id = {
            let store = QuarantineStore::open(Arc::new(JsonFileQuarantineRepository::new(&path)))?;
            let record = store.capture(failure("orders", "silver", RuleKind::NotNull))?;
            store.retry(&record.id)?;
            record.id
        };

        let store = QuarantineStore::open(Arc::new(JsonFileQuarantineRepository::new(&path)))?;
        let record = store.get(&id)?.unwrap();
        assert_eq!(record.status, QuarantineStatus::Retried);
        assert_eq!(record.retry_count, 1);
        assert_eq!(record.history[0].from, QuarantineStatus::Pending);
        Ok(())
    }
}
