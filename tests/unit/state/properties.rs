//! Property tests for the rule engine and state tracker

use proptest::prelude::*;

use kumo::models::signal::SignalClassification;
use kumo::models::state::SignalState;
use kumo::models::strategy::{Condition, ConditionMap, LogicMode, Rule};
use kumo::state::tracker::StateTracker;
use kumo::strategies::evaluator::StrategyEvaluator;

use crate::support::result;

fn signal_strategy() -> impl Strategy<Value = SignalClassification> {
    prop::sample::select(SignalClassification::ALL.to_vec())
}

fn condition_map_strategy() -> impl Strategy<Value = ConditionMap> {
    prop::collection::vec(any::<bool>(), Condition::ALL.len()).prop_map(|values| {
        Condition::ALL
            .iter()
            .copied()
            .zip(values)
            .collect::<ConditionMap>()
    })
}

fn rule_strategy() -> impl Strategy<Value = Rule> {
    (
        prop::sample::subsequence(Condition::ALL.to_vec(), 0..=Condition::ALL.len()),
        any::<bool>(),
    )
        .prop_map(|(conditions, all)| {
            Rule::new(conditions, if all { LogicMode::All } else { LogicMode::Any })
        })
}

proptest! {
    #[test]
    fn transition_count_is_monotonic(signals in prop::collection::vec(signal_strategy(), 0..60)) {
        let mut state: Option<SignalState> = None;
        let mut changes = 0u64;

        for signal in signals {
            let prior = state.clone();
            let transition = StateTracker::apply("X", &result(signal, 1.0), prior.as_ref());
            let prior_count = prior.as_ref().map_or(0, |s| s.transition_count);
            let prior_signal = prior.as_ref().map_or(SignalClassification::None, |s| s.current_signal);

            prop_assert!(transition.state.transition_count >= prior_count);
            if signal == SignalClassification::None || signal == prior_signal {
                prop_assert!(!transition.changed);
                prop_assert_eq!(transition.state.transition_count, prior_count);
            } else {
                prop_assert!(transition.changed);
                prop_assert_eq!(transition.state.transition_count, prior_count + 1);
                changes += 1;
            }
            state = Some(transition.state);
        }

        prop_assert_eq!(state.map_or(0, |s| s.transition_count), changes);
    }

    #[test]
    fn applying_the_same_result_twice_changes_once(
        history in prop::collection::vec(signal_strategy(), 0..10),
        signal in signal_strategy(),
    ) {
        let mut state: Option<SignalState> = None;
        for s in history {
            state = Some(StateTracker::apply("X", &result(s, 0.5), state.as_ref()).state);
        }
        let before = state.as_ref().map_or(0, |s| s.transition_count);

        let first = StateTracker::apply("X", &result(signal, 0.5), state.as_ref());
        let second = StateTracker::apply("X", &result(signal, 0.5), Some(&first.state));

        prop_assert!(!second.changed);
        prop_assert_eq!(&second.state, &first.state);
        prop_assert!(second.state.transition_count - before <= 1);
    }

    #[test]
    fn confidence_stays_in_unit_interval(map in condition_map_strategy(), rule in rule_strategy()) {
        let confidence = StrategyEvaluator::confidence(&rule, &map);
        prop_assert!((0.0..=1.0).contains(&confidence));

        if rule.logic == LogicMode::All && StrategyEvaluator::is_satisfied(&rule, &map) {
            prop_assert_eq!(confidence, 1.0);
        }
    }
}
