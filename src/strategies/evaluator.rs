//! Rule engine: classifies a condition map against a strategy's rule set

use crate::models::indicators::IndicatorSnapshot;
use crate::models::signal::SignalResult;
use crate::models::strategy::{ConditionMap, LogicMode, Rule, RuleKind, StrategyRules};

/// Result of evaluating one rule slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleOutcome {
    pub kind: RuleKind,
    pub satisfied: bool,
    /// Share of the rule's conditions that hold, in [0, 1].
    pub confidence: f64,
}

pub struct StrategyEvaluator;

impl StrategyEvaluator {
    /// Classify `conditions` with fixed precedence
    /// long_entry → short_entry → long_exit → short_exit.
    ///
    /// Stateless and position-unaware: exits fire whether or not an entry was seen.
    pub fn classify(
        conditions: &ConditionMap,
        rules: &StrategyRules,
        snapshot: IndicatorSnapshot,
    ) -> SignalResult {
        let matched = Self::evaluate_rules(conditions, rules)
            .into_iter()
            .find(|outcome| outcome.satisfied);

        match matched {
            Some(outcome) => SignalResult {
                classification: outcome.kind.classification(),
                confidence: outcome.confidence,
                matched_conditions: conditions.subset(&rules.rule(outcome.kind).conditions),
                matched_rule: Some(outcome.kind),
                snapshot,
            },
            None => SignalResult::none(snapshot),
        }
    }

    /// Evaluate all four rule slots in precedence order
    pub fn evaluate_rules(conditions: &ConditionMap, rules: &StrategyRules) -> [RuleOutcome; 4] {
        RuleKind::PRECEDENCE.map(|kind| {
            let rule = rules.rule(kind);
            RuleOutcome {
                kind,
                satisfied: Self::is_satisfied(rule, conditions),
                confidence: Self::confidence(rule, conditions),
            }
        })
    }

    /// An empty rule is never satisfied
    pub fn is_satisfied(rule: &Rule, conditions: &ConditionMap) -> bool {
        if rule.conditions.is_empty() {
            return false;
        }
        match rule.logic {
            LogicMode::All => rule.conditions.iter().all(|c| conditions.get(*c)),
            LogicMode::Any => rule.conditions.iter().any(|c| conditions.get(*c)),
        }
    }

    /// true-condition count / listed-condition count, for both logic modes
    pub fn confidence(rule: &Rule, conditions: &ConditionMap) -> f64 {
        if rule.conditions.is_empty() {
            return 0.0;
        }
        let met = rule
            .conditions
            .iter()
            .filter(|c| conditions.get(**c))
            .count();
        met as f64 / rule.conditions.len() as f64
    }
}
