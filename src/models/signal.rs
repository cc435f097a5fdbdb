use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::indicators::IndicatorSnapshot;
use crate::models::strategy::{ConditionMap, RuleKind};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalClassification {
    Long,
    Short,
    #[serde(alias = "EXIT LONG")]
    ExitLong,
    #[serde(alias = "EXIT SHORT")]
    ExitShort,
    #[default]
    None,
}

impl SignalClassification {
    pub const ALL: [SignalClassification; 5] = [
        SignalClassification::Long,
        SignalClassification::Short,
        SignalClassification::ExitLong,
        SignalClassification::ExitShort,
        SignalClassification::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalClassification::Long => "LONG",
            SignalClassification::Short => "SHORT",
            SignalClassification::ExitLong => "EXIT_LONG",
            SignalClassification::ExitShort => "EXIT_SHORT",
            SignalClassification::None => "NONE",
        }
    }

    pub fn is_actionable(&self) -> bool {
        *self != SignalClassification::None
    }
}

impl fmt::Display for SignalClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalClassification {
    type Err = String;

    /// Accepts the canonical names and the older space-separated exit names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace(' ', "_").as_str() {
            "LONG" => Ok(SignalClassification::Long),
            "SHORT" => Ok(SignalClassification::Short),
            "EXIT_LONG" => Ok(SignalClassification::ExitLong),
            "EXIT_SHORT" => Ok(SignalClassification::ExitShort),
            "NONE" => Ok(SignalClassification::None),
            _ => Err(s.to_string()),
        }
    }
}

/// Outcome of one classification cycle. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub classification: SignalClassification,
    pub confidence: f64,
    /// Conditions of the matched rule with their values; empty for NONE.
    pub matched_conditions: ConditionMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<RuleKind>,
    pub snapshot: IndicatorSnapshot,
}

impl SignalResult {
    pub fn none(snapshot: IndicatorSnapshot) -> Self {
        Self {
            classification: SignalClassification::None,
            confidence: 0.0,
            matched_conditions: ConditionMap::new(),
            matched_rule: None,
            snapshot,
        }
    }

    pub fn price(&self) -> f64 {
        self.snapshot.close
    }
}
