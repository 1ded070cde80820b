// tierline-core/src/domain/calculation.rs

use crate::domain::value::SqlValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Fixed precedence of calculation layers. Declaration order is the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Transaction,
    TimeWindow,
    Aggregation,
    Derived,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Layer::Transaction => "transaction",
            Layer::TimeWindow => "time_window",
            Layer::Aggregation => "aggregation",
            Layer::Derived => "derived",
        };
        f.write_str(s)
    }
}

/// A declarative calculation: one SELECT materialized into `output_table`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationDefinition {
    pub id: String,
    pub layer: Layer,

    /// SELECT statement; `$name` placeholders are bound, never spliced.
    pub logic: String,

    #[serde(default)]
    pub depends_on: Vec<String>,

    pub output_table: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Default placeholder values, overridden by run-level parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, SqlValue>,
}

/// A detection/scoring pass run on the programmatic stage path after the calculations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionModel {
    pub id: String,
    pub logic: String,
    pub output_table: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, SqlValue>,
}
