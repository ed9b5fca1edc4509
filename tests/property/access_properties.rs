//! Access gate properties over generated routes and profiles

use practice_context::access::{AccessGate, NavigationAction, RedirectReason};
use practice_context::identity::{Profile, UnifiedContext};
use proptest::prelude::*;

fn route_strategy() -> impl Strategy<Value = (bool, String)> {
    (
        any::<bool>(),
        prop::collection::vec("[a-z0-9-]{1,8}", 0..4),
        prop::option::of("[a-z]{1,5}=[a-z0-9]{1,5}"),
    )
        .prop_map(|(protected, segments, query)| {
            let mut route = if protected { "/app" } else { "/site" }.to_string();
            for segment in segments {
                route.push('/');
                route.push_str(&segment);
            }
            if let Some(query) = query {
                route.push('?');
                route.push_str(&query);
            }
            (protected, route)
        })
}

fn profile_strategy() -> impl Strategy<Value = Profile> {
    (
        prop::option::of("[a-z]{1,6}@clinic\\.test"),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        prop::option::of("[a-z]{3,8}"),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |(email, paid, free_tier, is_admin, plan_name, legacy_sub, legacy_life)| {
                let mut profile = Profile::new("p1", "Generated");
                profile.email = email;
                profile.is_admin = is_admin;
                profile.plan.paid = paid;
                profile.plan.free_tier = free_tier;
                profile.plan.plan_name = plan_name;
                profile.plan.legacy.subscription_active = legacy_sub;
                profile.plan.legacy.lifetime_access = legacy_life;
                profile
            },
        )
}

proptest! {
    #[test]
    fn unauthenticated_never_reaches_protected_routes((protected, route) in route_strategy()) {
        let action = AccessGate::default().decide(None, &route, false);
        if protected {
            prop_assert_eq!(action, NavigationAction::redirect("/", RedirectReason::NoUser));
        } else {
            prop_assert!(action.is_stay());
        }
    }

    #[test]
    fn decisions_are_deterministic(
        (_, route) in route_strategy(),
        profile in profile_strategy(),
        bypass in any::<bool>(),
    ) {
        let gate = AccessGate::default();
        let ctx = UnifiedContext::owner(profile);
        let first = gate.decide(Some(&ctx), &route, bypass);
        let second = gate.decide(Some(&ctx), &route, bypass);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn staying_on_protected_routes_requires_data_and_access(
        (protected, route) in route_strategy(),
        profile in profile_strategy(),
    ) {
        let valid = profile.has_valid_data();
        let access = profile.has_access();
        let ctx = UnifiedContext::owner(profile);
        let action = AccessGate::default().decide(Some(&ctx), &route, false);
        if protected && action.is_stay() {
            prop_assert!(valid && access);
        }
        if !valid {
            prop_assert!(action.reason() != Some(RedirectReason::NoAccess));
        }
    }

    #[test]
    fn redirects_never_point_at_the_requested_route(
        (_, route) in route_strategy(),
        profile in profile_strategy(),
    ) {
        let ctx = UnifiedContext::owner(profile);
        let gate = AccessGate::default();
        for candidate in [route.as_str(), "/complete-profile", "/checkout", "/app/dashboard", "/"] {
            if let NavigationAction::RedirectTo { path, .. } = gate.decide(Some(&ctx), candidate, false) {
                prop_assert_ne!(path.as_str(), candidate);
            }
        }
    }
}
