//! Permission evaluation properties

use practice_context::identity::{
    DelegateRecord, PermissionMap, PermissionSet, Profile, UnifiedContext,
};
use practice_context::permissions::PermissionEvaluator;
use proptest::prelude::*;
use std::collections::BTreeMap;

const MODULES: &[&str] = &["patients", "financial", "prescriptions", "messaging", "schedule"];
const ACTIONS: &[&str] = &["view", "create", "edit", "delete", "view_details"];
const CATEGORIES: &[&str] = &[
    "patient_records",
    "clinical_history",
    "prescriptions",
    "financial",
    "messages",
    "calendar",
];

fn map_strategy() -> impl Strategy<Value = PermissionMap> {
    prop::collection::btree_map(
        prop::sample::select(MODULES).prop_map(str::to_string),
        prop::collection::btree_map(
            prop::sample::select(ACTIONS).prop_map(str::to_string),
            any::<bool>(),
            0..4,
        ),
        0..4,
    )
}

fn delegate_context(permissions: PermissionSet) -> UnifiedContext {
    let owner = Profile::new("o1", "Owner");
    UnifiedContext::delegate(DelegateRecord::new("d1", "o1", permissions), owner).unwrap()
}

/// Map delegates get exactly what the map lists as `true`.
#[test]
fn test_map_grants_are_exact() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let evaluator = PermissionEvaluator::new();

    runner
        .run(
            &(
                map_strategy(),
                prop::sample::select(MODULES),
                prop::sample::select(ACTIONS),
            ),
            |(map, module, action)| {
                let expected = map
                    .get(module)
                    .and_then(|actions| actions.get(action))
                    .copied()
                    .unwrap_or(false);
                let ctx = delegate_context(PermissionSet::Map(map));
                prop_assert_eq!(evaluator.has_permission(&ctx, module, action), expected);
                prop_assert_eq!(
                    evaluator.verify_permission(&ctx, module, action).is_ok(),
                    expected
                );
                Ok(())
            },
        )
        .unwrap();
}

/// Owners and full delegates are never denied; empty maps always are.
#[test]
fn test_full_and_empty_grants() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let evaluator = PermissionEvaluator::new();
    let owner = UnifiedContext::owner(Profile::new("o1", "Owner"));
    let full = delegate_context(PermissionSet::Full);
    let empty = delegate_context(PermissionSet::Map(BTreeMap::new()));

    runner
        .run(&("[a-z_]{1,12}", "[a-z_]{1,12}"), |(module, action)| {
            prop_assert!(evaluator.has_permission(&owner, &module, &action));
            prop_assert!(evaluator.has_permission(&full, &module, &action));
            prop_assert!(!evaluator.has_permission(&empty, &module, &action));
            Ok(())
        })
        .unwrap();
}

/// Sensitive categories follow view_details on their module; others are open.
#[test]
fn test_sensitive_categories_follow_view_details() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let evaluator = PermissionEvaluator::new();

    runner
        .run(
            &(
                map_strategy(),
                prop::sample::select(CATEGORIES),
            ),
            |(map, category)| {
                let ctx = delegate_context(PermissionSet::Map(map.clone()));
                let expected = match evaluator.sensitive_module(category) {
                    Some(module) => map
                        .get(module)
                        .and_then(|actions| actions.get("view_details"))
                        .copied()
                        .unwrap_or(false),
                    None => true,
                };
                prop_assert_eq!(evaluator.can_view_sensitive(&ctx, category), expected);
                Ok(())
            },
        )
        .unwrap();
}
