//! Strategy rule data models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::models::indicators::IchimokuParams;
use crate::models::signal::SignalClassification;

/// Named boolean derived from the latest indicator snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    PriceAboveCloud,
    PriceBelowCloud,
    TenkanAboveKijun,
    TenkanBelowKijun,
    SpanAAboveSpanB,
    SpanABelowSpanB,
    ChikouAbovePrice,
    ChikouBelowPrice,
    ChikouAboveCloud,
    ChikouBelowCloud,
}

impl Condition {
    pub const ALL: [Condition; 10] = [
        Condition::PriceAboveCloud,
        Condition::PriceBelowCloud,
        Condition::TenkanAboveKijun,
        Condition::TenkanBelowKijun,
        Condition::SpanAAboveSpanB,
        Condition::SpanABelowSpanB,
        Condition::ChikouAbovePrice,
        Condition::ChikouBelowPrice,
        Condition::ChikouAboveCloud,
        Condition::ChikouBelowCloud,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::PriceAboveCloud => "price_above_cloud",
            Condition::PriceBelowCloud => "price_below_cloud",
            Condition::TenkanAboveKijun => "tenkan_above_kijun",
            Condition::TenkanBelowKijun => "tenkan_below_kijun",
            Condition::SpanAAboveSpanB => "span_a_above_span_b",
            Condition::SpanABelowSpanB => "span_a_below_span_b",
            Condition::ChikouAbovePrice => "chikou_above_price",
            Condition::ChikouBelowPrice => "chikou_below_price",
            Condition::ChikouAboveCloud => "chikou_above_cloud",
            Condition::ChikouBelowCloud => "chikou_below_cloud",
        }
    }

    /// Lower-case, spaces and hyphens to underscores, repeated underscores collapsed.
    pub fn normalize_name(name: &str) -> String {
        let mut normalized = String::with_capacity(name.len());
        for ch in name.trim().chars() {
            let ch = match ch {
                ' ' | '-' => '_',
                other => other.to_ascii_lowercase(),
            };
            if ch == '_' && normalized.ends_with('_') {
                continue;
            }
            normalized.push(ch);
        }
        normalized
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = Self::normalize_name(s);
        Condition::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| s.to_string())
    }
}

/// Boolean value of every condition at one bar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionMap(BTreeMap<Condition, bool>);

impl ConditionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, condition: Condition, value: bool) {
        self.0.insert(condition, value);
    }

    /// Value of a condition; absent conditions read as false.
    pub fn get(&self, condition: Condition) -> bool {
        self.0.get(&condition).copied().unwrap_or(false)
    }

    pub fn contains(&self, condition: Condition) -> bool {
        self.0.contains_key(&condition)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Condition, bool)> + '_ {
        self.0.iter().map(|(c, v)| (*c, *v))
    }

    pub fn true_conditions(&self) -> Vec<Condition> {
        self.iter().filter(|(_, v)| *v).map(|(c, _)| c).collect()
    }

    /// Restrict the map to the listed conditions.
    pub fn subset(&self, conditions: &[Condition]) -> ConditionMap {
        conditions
            .iter()
            .map(|c| (*c, self.get(*c)))
            .collect()
    }
}

impl FromIterator<(Condition, bool)> for ConditionMap {
    fn from_iter<I: IntoIterator<Item = (Condition, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// How a rule combines its conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicMode {
    #[default]
    All,
    Any,
}

impl FromStr for LogicMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(LogicMode::All),
            "ANY" => Ok(LogicMode::Any),
            _ => Err(s.to_string()),
        }
    }
}

/// The four rule slots, listed in evaluation precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    LongEntry,
    ShortEntry,
    LongExit,
    ShortExit,
}

impl RuleKind {
    /// Entries before exits, long before short. First satisfied rule wins.
    pub const PRECEDENCE: [RuleKind; 4] = [
        RuleKind::LongEntry,
        RuleKind::ShortEntry,
        RuleKind::LongExit,
        RuleKind::ShortExit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::LongEntry => "long_entry",
            RuleKind::ShortEntry => "short_entry",
            RuleKind::LongExit => "long_exit",
            RuleKind::ShortExit => "short_exit",
        }
    }

    pub fn classification(&self) -> SignalClassification {
        match self {
            RuleKind::LongEntry => SignalClassification::Long,
            RuleKind::ShortEntry => SignalClassification::Short,
            RuleKind::LongExit => SignalClassification::ExitLong,
            RuleKind::ShortExit => SignalClassification::ExitShort,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub conditions: Vec<Condition>,
    pub logic: LogicMode,
}

impl Rule {
    pub fn new(conditions: Vec<Condition>, logic: LogicMode) -> Self {
        Self { conditions, logic }
    }

    pub fn all(conditions: Vec<Condition>) -> Self {
        Self::new(conditions, LogicMode::All)
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Self::new(conditions, LogicMode::Any)
    }
}

/// Long/short entry/exit rule set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyRules {
    pub long_entry: Rule,
    pub short_entry: Rule,
    pub long_exit: Rule,
    pub short_exit: Rule,
}

impl StrategyRules {
    pub fn rule(&self, kind: RuleKind) -> &Rule {
        match kind {
            RuleKind::LongEntry => &self.long_entry,
            RuleKind::ShortEntry => &self.short_entry,
            RuleKind::LongExit => &self.long_exit,
            RuleKind::ShortExit => &self.short_exit,
        }
    }

    /// Full trend alignment to enter, loss of price or momentum alignment to exit.
    pub fn reference() -> Self {
        Self {
            long_entry: Rule::all(vec![
                Condition::PriceAboveCloud,
                Condition::TenkanAboveKijun,
                Condition::SpanAAboveSpanB,
                Condition::ChikouAbovePrice,
                Condition::ChikouAboveCloud,
            ]),
            short_entry: Rule::all(vec![
                Condition::PriceBelowCloud,
                Condition::TenkanBelowKijun,
                Condition::SpanABelowSpanB,
                Condition::ChikouBelowPrice,
                Condition::ChikouBelowCloud,
            ]),
            long_exit: Rule::any(vec![
                Condition::PriceBelowCloud,
                Condition::TenkanBelowKijun,
            ]),
            short_exit: Rule::any(vec![
                Condition::PriceAboveCloud,
                Condition::TenkanAboveKijun,
            ]),
        }
    }
}

/// Validated strategy: indicator parameters plus rule set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub params: IchimokuParams,
    pub rules: StrategyRules,
}

impl StrategyConfig {
    pub fn reference() -> Self {
        Self {
            name: "ichimoku_reference".to_string(),
            description: "Ichimoku 9/26/52/26 trend alignment".to_string(),
            params: IchimokuParams::default(),
            rules: StrategyRules::reference(),
        }
    }
}
