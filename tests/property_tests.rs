//! Property-based tests for modelrun-db
//!
//! - State machine: every (current, requested) pair is decided, and only
//!   the documented forward transitions are accepted
//! - Argument validation: rejected requests never produce a record
//! - Run with ProptestConfig::with_cases(100)

use std::sync::Arc;

use modelrun_db::attribute::{ArgumentDefinitions, Attribute};
use modelrun_db::document::MemoryDocumentStore;
use modelrun_db::modelrun::{ModelRunManager, RunState, ScheduleEvent};
use modelrun_db::Error;
use proptest::prelude::*;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

fn arb_state() -> impl Strategy<Value = RunState> {
    prop_oneof![
        Just(RunState::Idle),
        Just(RunState::Running),
        proptest::collection::vec("[a-z ]{0,12}", 0..4).prop_map(RunState::failed),
        "[a-z0-9-]{1,16}".prop_map(RunState::success),
    ]
}

fn allowed(from: &RunState, to: &RunState) -> Option<ScheduleEvent> {
    match (from, to) {
        (RunState::Idle, RunState::Running) => Some(ScheduleEvent::Started),
        (RunState::Idle | RunState::Running, RunState::Failed { .. })
        | (RunState::Running, RunState::Success { .. }) => Some(ScheduleEvent::Finished),
        _ => None,
    }
}

/// Argument lists over defined and undefined names with well- and ill-typed values
fn arb_arguments() -> impl Strategy<Value = Vec<Attribute>> {
    let name = prop_oneof![
        Just("gabor_orientations"),
        Just("max_eccentricity"),
        Just("normalized_pixels_per_degree"),
        Just("undefined_parameter"),
    ];
    let value = prop_oneof![
        (-100i64..100).prop_map(serde_json::Value::from),
        (-100.0f64..100.0).prop_map(serde_json::Value::from),
        "[a-z]{1,5}".prop_map(serde_json::Value::from),
    ];
    proptest::collection::vec(
        (name, value).prop_map(|(name, value)| Attribute::new(name, value)),
        0..5,
    )
}

fn expected_valid(arguments: &[Attribute]) -> bool {
    let mut names = std::collections::HashSet::new();
    arguments.iter().all(|arg| {
        names.insert(arg.name.clone())
            && match arg.name.as_str() {
                "gabor_orientations" => arg.value.is_i64() || arg.value.is_u64(),
                "max_eccentricity" | "normalized_pixels_per_degree" => arg.value.is_number(),
                _ => false,
            }
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: the transition table is total and matches the life cycle
    #[test]
    fn prop_transition_table(from in arb_state(), to in arb_state()) {
        match (from.transition_to(&to), allowed(&from, &to)) {
            (Ok(event), Some(expected)) => prop_assert_eq!(event, expected),
            (Err(Error::IllegalTransition { from: f, to: t }), None) => {
                prop_assert_eq!(f, from.tag());
                prop_assert_eq!(t, to.tag());
            }
            (result, expected) => {
                prop_assert!(false, "{} -> {}: got {:?}, expected {:?}", from, to, result, expected);
            }
        }
    }

    /// Property: terminal states accept nothing
    #[test]
    fn prop_terminal_states_are_final(from in arb_state(), to in arb_state()) {
        prop_assume!(from.is_failed() || from.is_success());
        prop_assert!(from.transition_to(&to).is_err());
    }

    /// Property: exactly one predicate holds and the JSON form round-trips
    #[test]
    fn prop_state_json_round_trip(state in arb_state()) {
        let predicates = [state.is_idle(), state.is_running(), state.is_failed(), state.is_success()];
        prop_assert_eq!(predicates.iter().filter(|p| **p).count(), 1);

        let json = state.to_json();
        prop_assert_eq!(json["type"].as_str(), Some(state.tag()));
        prop_assert_eq!(RunState::from_json(&json).unwrap(), state);
    }

    /// Property: validation accepts exactly the well-formed argument lists
    #[test]
    fn prop_argument_validation(arguments in arb_arguments()) {
        let definitions = ArgumentDefinitions::with_defaults();
        let result = definitions.validate_arguments(&arguments);
        prop_assert_eq!(result.is_ok(), expected_valid(&arguments));

        if let Ok(validated) = result {
            for arg in &arguments {
                prop_assert_eq!(&validated[&arg.name].value, &arg.value);
            }
            prop_assert!(validated.contains_key("gabor_orientations"));
            prop_assert!(validated.contains_key("max_eccentricity"));
        }
    }

    /// Property: a rejected creation writes no record and no directory
    #[test]
    fn prop_rejected_create_has_no_side_effects(arguments in arb_arguments()) {
        prop_assume!(!expected_valid(&arguments));

        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryDocumentStore::new());
        let runs = ModelRunManager::new(store.clone(), tmp.path().join("runs"));
        let result = runs.create(
            "run",
            "exp",
            "model",
            &ArgumentDefinitions::with_defaults(),
            &arguments,
            None,
        );

        prop_assert!(matches!(result, Err(Error::Validation(_))));
        prop_assert!(store.is_empty());
        prop_assert!(!tmp.path().join("runs").exists());
    }
}
