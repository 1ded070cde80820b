// tierline-core/src/domain/quarantine.rs

use crate::domain::contract::RuleResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuarantineStatus {
    #[default]
    Pending,
    Retried,
    Overridden,
    Discarded, // Soft-delete
}

impl QuarantineStatus {
    pub fn can_transition_to(&self, next: &QuarantineStatus) -> bool {
        match (self, next) {
            // A record can be retried as often as the caller wants
            (Self::Pending | Self::Retried | Self::Overridden, Self::Retried) => true,
            (Self::Pending | Self::Retried, Self::Overridden) => true,
            (Self::Pending | Self::Retried | Self::Overridden, Self::Discarded) => true,
            // Discarded is terminal; nothing goes back to pending.
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Retried => "retried",
            Self::Overridden => "overridden",
            Self::Discarded => "discarded",
        }
    }
}

impl fmt::Display for QuarantineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit entry appended on every status change.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StatusChange {
    pub from: QuarantineStatus,
    pub to: QuarantineStatus,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QuarantineRecord {
    pub id: String,
    pub source_tier: String,
    pub target_tier: String,
    pub entity: String,
    pub failed_rules: Vec<RuleResult>,
    pub original_data: serde_json::Value,
    pub status: QuarantineStatus,
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub history: Vec<StatusChange>,
}

impl QuarantineRecord {
    pub fn transition(&mut self, to: QuarantineStatus, notes: Option<String>) {
        let now = Utc::now();
        self.history.push(StatusChange {
            from: self.status,
            to,
            at: now,
            notes: notes.clone(),
        });
        self.status = to;
        self.updated_at = now;
        if notes.is_some() {
            self.notes = notes;
        }
    }

    pub fn tier_transition(&self) -> String {
        format!("{}->{}", self.source_tier, self.target_tier)
    }
}

/// Input of `capture`: everything except identity, status and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuarantineRecord {
    pub source_tier: String,
    pub target_tier: String,
    pub entity: String,
    pub failed_rules: Vec<RuleResult>,
    pub original_data: serde_json::Value,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuarantineFilter {
    pub entity: Option<String>,
    pub status: Option<QuarantineStatus>,
    pub source_tier: Option<String>,
}

impl QuarantineFilter {
    pub fn matches(&self, record: &QuarantineRecord) -> bool {
        self.entity.as_ref().is_none_or(|e| &record.entity == e)
            && self.status.is_none_or(|s| record.status == s)
            && self
                .source_tier
                .as_ref()
                .is_none_or(|t| &record.source_tier == t)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuarantineSummary {
    pub total: usize,
    pub by_entity: BTreeMap<String, usize>,
    pub by_transition: BTreeMap<String, usize>,
    pub by_rule_kind: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
}

impl QuarantineSummary {
    pub fn from_records(records: &[QuarantineRecord]) -> Self {
        let mut summary = QuarantineSummary {
            total: records.len(),
            ..Default::default()
        };

        for record in records {
            *summary.by_entity.entry(record.entity.clone()).or_default() += 1;
            *summary
                .by_transition
                .entry(record.tier_transition())
                .or_default() += 1;
            *summary
                .by_status
                .entry(record.status.to_string())
                .or_default() += 1;
            for rule in &record.failed_rules {
                *summary
                    .by_rule_kind
                    .entry(rule.kind.to_string())
                    .or_default() += 1;
            }
        }

        summary
    }
}
