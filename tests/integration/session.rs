//! Caller-side session state: supersession, reset and status watching

use super::test_utils::{delegate, owner, Harness};
use practice_context::access::{AccessGate, RedirectReason};
use practice_context::cache::CacheService;
use practice_context::identity::PermissionSet;
use practice_context::session::{IdentitySession, SessionState, SignInOutcome};
use practice_context::status::{
    ConnectionStatusProvider, PollerConfig, ScriptedStatusProvider, StatusPoller,
};
use std::sync::Arc;
use std::time::Duration;

fn session(h: &Harness) -> IdentitySession {
    IdentitySession::new(Arc::clone(&h.resolver), AccessGate::default())
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_later_sign_in_supersedes_earlier_one() {
    let h = Harness::new([owner("o1"), owner("o2")], []);
    h.profiles.set_latency(Some(Duration::from_millis(100)));
    let session = session(&h);

    let (first, second) = tokio::join!(session.sign_in("o1", None, "/app/x"), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.sign_in("o2", None, "/app/x").await
    });

    assert!(matches!(first, Ok(SignInOutcome::Superseded)));
    assert!(matches!(second, Ok(SignInOutcome::Authenticated { .. })));
    assert_eq!(session.context().unwrap().principal_id(), "o2");
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_discards_in_flight_resolution() {
    let h = Harness::new([owner("o1")], []);
    h.profiles.set_latency(Some(Duration::from_millis(100)));
    let session = session(&h);

    let (outcome, ()) = tokio::join!(session.sign_in("o1", None, "/app/x"), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.sign_out();
    });

    assert!(matches!(outcome, Ok(SignInOutcome::Superseded)));
    assert!(!session.is_authenticated());
    assert!(matches!(session.state(), SessionState::Unauthenticated));
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_resets_to_unauthenticated() {
    let h = Harness::new([owner("o1")], []);
    let session = session(&h);
    session.sign_in("o1", None, "/app/x").await.unwrap();
    assert!(session.is_authenticated());

    h.profiles.fail_always(true);
    let failure = session.refresh("/app/x").await.unwrap_err();
    assert!(failure.retryable);
    assert!(failure.action.is_stay());
    assert!(!session.is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn test_refresh_bypasses_cache() {
    let h = Harness::new([owner("o1")], []);
    let session = session(&h);
    session.sign_in("o1", None, "/app/x").await.unwrap();
    let calls = h.profiles.get_calls();

    let outcome = session.refresh("/login").await.unwrap();
    assert_eq!(h.profiles.get_calls(), calls + 1);
    match outcome {
        SignInOutcome::Authenticated { action, .. } => {
            assert_eq!(action.reason(), Some(RedirectReason::AlreadyAuthenticated))
        }
        SignInOutcome::Superseded => panic!("refresh was not superseded"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_deactivated_delegate_is_sent_to_public_entry() {
    let mut record = delegate("d1", "o1", PermissionSet::Full);
    record.active = false;
    let h = Harness::new([owner("o1")], [record]);
    let session = session(&h);

    let failure = session.sign_in("d1", None, "/app/x").await.unwrap_err();
    assert_eq!(failure.action.reason(), Some(RedirectReason::Deactivated));
    assert!(!failure.retryable);
    assert!(!session.can("patients", "view"));
}

#[tokio::test(start_paused = true)]
async fn test_session_watches_effective_owner_status() {
    let provider = Arc::new(ScriptedStatusProvider::new());
    provider.set_state("o1", "open");
    let poller = Arc::new(StatusPoller::new(
        CacheService::new(),
        Arc::clone(&provider) as Arc<dyn ConnectionStatusProvider>,
        PollerConfig::default(),
    ));
    let h = Harness::new(
        [owner("o1")],
        [delegate(
            "d1",
            "o1",
            PermissionSet::empty().grant("messaging", &["view"]),
        )],
    );
    let session = session(&h).with_poller(poller);

    session.sign_in("d1", None, "/app/inbox").await.unwrap();
    settle().await;
    assert!(session.is_monitoring());
    assert!(session.connection_status().unwrap().is_connected());
    assert!(session.can("messaging", "view"));
    assert!(!session.can("messaging", "send"));
    assert_eq!(provider.fetch_count(), 1);

    session.sign_out();
    assert!(!session.is_monitoring());
    assert_eq!(session.connection_status(), None);
}
