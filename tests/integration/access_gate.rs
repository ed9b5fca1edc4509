//! Route decisions over resolved contexts

use super::test_utils::{delegate, owner, Harness};
use practice_context::access::{AccessGate, NavigationAction, RedirectReason, RouteConfig};
use practice_context::error::ResolutionError;
use practice_context::identity::{PermissionSet, Profile, UnifiedContext};
use std::time::Duration;

fn owner_context(profile: Profile) -> UnifiedContext {
    UnifiedContext::owner(profile)
}

#[test]
fn test_unauthenticated_routes() {
    let gate = AccessGate::default();
    assert!(gate.decide(None, "/", false).is_stay());
    assert!(gate.decide(None, "/login", false).is_stay());
    assert!(gate.decide(None, "/pricing", false).is_stay());
    assert_eq!(
        gate.decide(None, "/app/patients/42", false),
        NavigationAction::redirect("/", RedirectReason::NoUser)
    );
    // Whole path segments only
    assert!(gate.decide(None, "/applications", false).is_stay());
}

#[test]
fn test_rules_apply_in_order() {
    let gate = AccessGate::default();

    let no_email = Profile::new("o1", "No Email");
    assert_eq!(
        gate.decide(Some(&owner_context(no_email)), "/app/x", false),
        NavigationAction::redirect("/complete-profile", RedirectReason::InvalidData)
    );

    let mut unpaid = owner("o1");
    unpaid.plan.free_tier = false;
    unpaid.plan.plan_name = Some("starter".into());
    assert_eq!(
        gate.decide(Some(&owner_context(unpaid)), "/app/x", false),
        NavigationAction::redirect("/checkout", RedirectReason::NoAccess)
    );

    let ctx = owner_context(owner("o1"));
    assert_eq!(
        gate.decide(Some(&ctx), "/login", false),
        NavigationAction::redirect("/app/dashboard", RedirectReason::AlreadyAuthenticated)
    );
    assert!(gate.decide(Some(&ctx), "/login", true).is_stay());
    assert!(gate.decide(Some(&ctx), "/app/x", false).is_stay());
}

#[test]
fn test_admin_and_legacy_accounts_have_access() {
    let gate = AccessGate::default();

    let mut admin = Profile::new("a1", "Admin");
    admin.email = Some("admin@clinic.test".into());
    admin.plan.plan_name = Some("internal".into());
    admin.is_admin = true;
    assert!(gate.decide(Some(&owner_context(admin)), "/app/x", false).is_stay());

    let mut legacy = Profile::new("l1", "Legacy");
    legacy.email = Some("legacy@clinic.test".into());
    legacy.plan.legacy.lifetime_access = true;
    assert!(legacy.is_legacy_grandfathered());
    assert!(gate.decide(Some(&owner_context(legacy)), "/app/x", false).is_stay());
}

#[test]
fn test_no_redirect_loops() {
    let gate = AccessGate::default();
    let incomplete = owner_context(Profile::new("o1", "No Email"));
    assert!(gate
        .decide(Some(&incomplete), "/complete-profile", false)
        .is_stay());

    let mut unpaid = owner("o1");
    unpaid.plan.free_tier = false;
    unpaid.plan.plan_name = Some("starter".into());
    assert!(gate
        .decide(Some(&owner_context(unpaid)), "/checkout?plan=pro", false)
        .is_stay());
}

#[test]
fn test_custom_route_table() {
    let routes = RouteConfig {
        app_prefix: "/portal".into(),
        public_entry: "/welcome".into(),
        ..RouteConfig::default()
    };
    let gate = AccessGate::new(routes);
    assert_eq!(
        gate.decide(None, "/portal/home", false),
        NavigationAction::redirect("/welcome", RedirectReason::NoUser)
    );
    assert!(gate.decide(None, "/app/x", false).is_stay());
}

#[test]
fn test_failure_navigation() {
    let gate = AccessGate::default();
    assert_eq!(
        gate.decide_failure(&ResolutionError::Deactivated("d1".into()), "/app/x"),
        NavigationAction::redirect("/", RedirectReason::Deactivated)
    );
    assert_eq!(
        gate.decide_failure(&ResolutionError::NotFound("u1".into()), "/app/x"),
        NavigationAction::redirect("/", RedirectReason::NoUser)
    );
    assert!(gate
        .decide_failure(&ResolutionError::Timeout(Duration::from_secs(15)), "/app/x")
        .is_stay());
    assert!(gate
        .decide_failure(&ResolutionError::Upstream("down".into()), "/app/x")
        .is_stay());
}

#[tokio::test(start_paused = true)]
async fn test_delegate_inherits_owner_plan() {
    let mut unpaid = owner("o1");
    unpaid.plan.free_tier = false;
    unpaid.plan.plan_name = Some("starter".into());
    let h = Harness::new([unpaid], [delegate("d1", "o1", PermissionSet::Full)]);

    let ctx = h.resolver.resolve("d1", false).await.unwrap();
    assert_eq!(
        AccessGate::default().decide(Some(&ctx), "/app/x", false),
        NavigationAction::redirect("/checkout", RedirectReason::NoAccess)
    );
}
