//! Context resolution through the shared cache

use super::test_utils::{delegate, owner, Harness};
use practice_context::error::ResolutionError;
use practice_context::identity::{PermissionSet, PrincipalKind, ProfileUpdate};
use practice_context::types::CONTEXT_NAMESPACE;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_concurrent_resolutions_share_one_upstream_call() {
    let h = Harness::new([owner("o1")], []);
    h.profiles.set_latency(Some(Duration::from_millis(200)));

    let (a, b, c) = tokio::join!(
        h.resolver.resolve("o1", false),
        h.resolver.resolve("o1", false),
        h.resolver.resolve("o1", false),
    );
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&b, &c));
    assert_eq!(h.profiles.get_calls(), 1);
    let stats = h.cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.coalesced, 2);
}

#[tokio::test(start_paused = true)]
async fn test_context_lives_for_its_ttl() {
    let h = Harness::new([owner("o1")], []);

    h.resolver.resolve("o1", false).await.unwrap();
    tokio::time::advance(Duration::from_secs(299)).await;
    h.resolver.resolve("o1", false).await.unwrap();
    assert_eq!(h.profiles.get_calls(), 1);

    tokio::time::advance(Duration::from_secs(1)).await;
    h.resolver.resolve("o1", false).await.unwrap();
    assert_eq!(h.profiles.get_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_forced_resolution_is_fresh_and_short_lived() {
    let h = Harness::new([owner("o1")], []);

    let first = h.resolver.resolve("o1", false).await.unwrap();
    let forced = h.resolver.resolve("o1", true).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &forced));
    assert_eq!(h.profiles.get_calls(), 2);

    // The forced result is served for one second only
    let cached = h.resolver.resolve("o1", false).await.unwrap();
    assert!(Arc::ptr_eq(&forced, &cached));
    tokio::time::advance(Duration::from_secs(1)).await;
    h.resolver.resolve("o1", false).await.unwrap();
    assert_eq!(h.profiles.get_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_failures_are_not_cached() {
    let h = Harness::new([owner("o1")], []);
    h.profiles.fail_next(1);

    let err = h.resolver.resolve("o1", false).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(h.resolver.resolve("o1", false).await.is_ok());
    assert_eq!(h.profiles.get_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_delegate_context_carries_owner_and_grant() {
    let perms = PermissionSet::empty().grant("patients", &["view"]);
    let h = Harness::new([owner("o1")], [delegate("d1", "o1", perms.clone())]);

    let ctx = h.resolver.resolve("d1", false).await.unwrap();
    assert_eq!(ctx.principal_kind(), PrincipalKind::Delegate);
    assert_eq!(ctx.principal_id(), "d1");
    assert_eq!(ctx.effective_owner_id(), "o1");
    assert_eq!(ctx.owner_profile().id, "o1");
    assert_eq!(ctx.permissions(), &perms);
    assert!(ctx.delegate_record().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_delegate_with_missing_owner_is_upstream_failure() {
    let h = Harness::new([], [delegate("d1", "gone", PermissionSet::Full)]);
    assert!(matches!(
        h.resolver.resolve("d1", false).await,
        Err(ResolutionError::Upstream(_))
    ));
    assert_eq!(
        h.resolver.resolve("nobody", false).await.unwrap_err(),
        ResolutionError::NotFound("nobody".into())
    );
}

#[tokio::test(start_paused = true)]
async fn test_retry_recovers_from_transient_failures() {
    let h = Harness::new([owner("o1")], []);
    h.profiles.fail_next(2);

    let started = tokio::time::Instant::now();
    let ctx = h.resolver.resolve_with_retry("o1", false).await.unwrap();
    assert_eq!(ctx.principal_id(), "o1");
    assert_eq!(h.profiles.get_calls(), 3);
    // Backoff of 1s then 2s
    assert!(started.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_retry_gives_up_after_max_attempts() {
    let h = Harness::new([owner("o1")], []);
    h.profiles.fail_always(true);

    let err = h.resolver.resolve_with_retry("o1", false).await.unwrap_err();
    assert!(matches!(err, ResolutionError::Upstream(_)));
    assert_eq!(h.profiles.get_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_authorization_failures_are_not_retried() {
    let mut record = delegate("d1", "o1", PermissionSet::Full);
    record.active = false;
    let h = Harness::new([owner("o1")], [record]);

    let err = h.resolver.resolve_with_retry("d1", false).await.unwrap_err();
    assert_eq!(err, ResolutionError::Deactivated("d1".into()));
    assert_eq!(h.delegates.get_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_profile_update_refreshes_delegate_contexts() {
    let h = Harness::new([owner("o1")], [delegate("d1", "o1", PermissionSet::Full)]);
    let before = h.resolver.resolve("d1", false).await.unwrap();
    assert_eq!(before.owner_profile().display_name, "Owner o1");

    let update = ProfileUpdate {
        display_name: Some("Dr. Renamed".into()),
        ..Default::default()
    };
    h.resolver.update_profile("o1", &update).await.unwrap();

    let after = h.resolver.resolve("d1", false).await.unwrap();
    assert_eq!(after.owner_profile().display_name, "Dr. Renamed");
}

#[tokio::test(start_paused = true)]
async fn test_permission_change_is_visible_on_next_resolution() {
    let h = Harness::new(
        [owner("o1")],
        [delegate("d1", "o1", PermissionSet::empty())],
    );
    let ctx = h.resolver.resolve("d1", false).await.unwrap();
    assert!(!ctx.permissions().allows("financial", "view"));

    h.resolver
        .set_delegate_permissions("d1", PermissionSet::empty().grant("financial", &["view"]))
        .await
        .unwrap();
    let ctx = h.resolver.resolve("d1", false).await.unwrap();
    assert!(ctx.permissions().allows("financial", "view"));

    h.resolver.set_delegate_active("d1", false).await.unwrap();
    assert_eq!(
        h.resolver.resolve("d1", false).await.unwrap_err(),
        ResolutionError::Deactivated("d1".into())
    );
}

#[tokio::test(start_paused = true)]
async fn test_manual_invalidation() {
    let h = Harness::new([owner("o1"), owner("o2")], []);
    h.resolver.resolve("o1", false).await.unwrap();
    h.resolver.resolve("o2", false).await.unwrap();

    assert_eq!(h.resolver.invalidate(CONTEXT_NAMESPACE, Some("o1")), 1);
    h.resolver.resolve("o2", false).await.unwrap();
    assert_eq!(h.profiles.get_calls(), 2);

    assert_eq!(h.resolver.invalidate(CONTEXT_NAMESPACE, None), 1);
    h.resolver.resolve("o1", false).await.unwrap();
    h.resolver.resolve("o2", false).await.unwrap();
    assert_eq!(h.profiles.get_calls(), 4);
}
