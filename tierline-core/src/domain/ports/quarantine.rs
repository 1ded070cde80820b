use crate::domain::quarantine::QuarantineRecord;
use crate::error::TierlineError;

/// Durable storage behind the quarantine store. Records are written whole;
/// the store decides what changes, the repository only keeps it.
pub trait QuarantineRepository: Send + Sync {
    fn load_all(&self) -> Result<Vec<QuarantineRecord>, TierlineError>;

    fn save_all(&self, records: &[QuarantineRecord]) -> Result<(), TierlineError>;
}
