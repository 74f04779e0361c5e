//! Attribute type metadata (component A: the static, read-only mapping
//! from attribute key to its summary configuration).

use super::attribute::AggregationMethod;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use strum::{Display, EnumString};

/// The full vocabulary of summary functions the evaluator understands.
/// `MedianHigh`/`MedianLow` are distinct evaluation strategies but both
/// normalise to [`AggregationMethod::Median`] when recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SummaryKind {
    Count,
    Max,
    Min,
    Mean,
    Median,
    MedianHigh,
    MedianLow,
    Mode,
    MostCommon,
    List,
}

impl SummaryKind {
    /// The method name recorded on an attribute record when this
    /// summary produces the canonical value (Open Question 1: always
    /// normalised, including at `i = 0`).
    pub fn recorded_method(self) -> AggregationMethod {
        match self {
            SummaryKind::Count => AggregationMethod::Count,
            SummaryKind::Max => AggregationMethod::Max,
            SummaryKind::Min => AggregationMethod::Min,
            SummaryKind::Mean => AggregationMethod::Mean,
            SummaryKind::Median | SummaryKind::MedianHigh | SummaryKind::MedianLow => {
                AggregationMethod::Median
            }
            SummaryKind::Mode => AggregationMethod::Mode,
            SummaryKind::MostCommon => AggregationMethod::MostCommon,
            SummaryKind::List => AggregationMethod::List,
        }
    }
}

/// Restricts which direction(s) an attribute's traverse value may
/// propagate across levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TraverseDirection {
    /// Upward only (tips to root).
    Ancestor,
    /// Downward only (root to tips).
    Descendant,
}

/// Per-key configuration for one attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeTypeMeta {
    #[serde(rename = "type")]
    pub value_type: super::value::ValueType,
    pub summary: Vec<SummaryKind>,
    #[serde(default)]
    pub traverse: Option<SummaryKind>,
    #[serde(default)]
    pub traverse_direction: Option<TraverseDirection>,
}

impl AttributeTypeMeta {
    /// Whether this attribute propagates downward at all: it must name
    /// a traverse summary, not be restricted to ancestor-only, and the
    /// traverse summary must not be `list` (Open Question 2 — a list
    /// traverse value is never carried across levels, so stamping an
    /// ancestor copy for it would set a method with no corresponding
    /// value).
    pub fn propagates_downward(&self) -> bool {
        match (self.traverse, self.traverse_direction) {
            (Some(SummaryKind::List), _) => false,
            (Some(_), Some(TraverseDirection::Ancestor)) => false,
            (Some(_), _) => true,
            (None, _) => false,
        }
    }

    /// Whether this attribute's traverse value may flow upward.
    pub fn propagates_upward(&self) -> bool {
        self.traverse.is_some() && self.traverse_direction != Some(TraverseDirection::Descendant)
    }
}

/// Static, read-only mapping from attribute key to its metadata.
#[derive(Debug, Clone, Default)]
pub struct AttributeTypeTable {
    entries: HashMap<String, AttributeTypeMeta>,
}

impl AttributeTypeTable {
    pub fn new(entries: HashMap<String, AttributeTypeMeta>) -> Self {
        Self { entries }
    }

    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        let entries: HashMap<String, AttributeTypeMeta> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    pub fn get(&self, key: &str) -> Option<&AttributeTypeMeta> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys participating in upward summarisation: every configured key
    /// (summary is always set per the data model).
    pub fn upward_keys(&self) -> HashSet<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Keys participating in downward propagation.
    pub fn downward_keys(&self) -> HashSet<&str> {
        self.entries
            .iter()
            .filter(|(_, meta)| meta.propagates_downward())
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

impl TryFrom<serde_json::Value> for AttributeTypeTable {
    type Error = serde_json::Error;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let entries: HashMap<String, AttributeTypeMeta> = serde_json::from_value(value)?;
        Ok(Self::new(entries))
    }
}
