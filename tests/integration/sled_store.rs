//! Resolution over the sled-backed stores

use practice_context::cache::CacheService;
use practice_context::error::ResolutionError;
use practice_context::identity::{AuthClaims, PrincipalKind};
use practice_context::resolver::{ContextResolver, ResolverPolicy};
use practice_context::store::persistence::open_db;
use practice_context::store::{
    DelegateStore, Fixture, ProfileStore, SledDelegateStore, SledProfileStore,
};
use std::sync::Arc;
use tempfile::TempDir;

const FIXTURE: &str = r#"{
    "profiles": [
        {"id": "o1", "display_name": "Dr. Owner", "email": "owner@clinic.test",
         "plan": {"paid": true, "plan_name": "pro"}}
    ],
    "delegates": [
        {"id": "d1", "owner_id": "o1", "active": true,
         "permissions": {"patients": {"view": true, "view_details": true}}},
        {"id": "d2", "owner_id": "o1", "active": false, "permissions": "full"}
    ]
}"#;

struct SledHarness {
    resolver: ContextResolver,
    profiles: Arc<SledProfileStore>,
    delegates: Arc<SledDelegateStore>,
}

fn open(dir: &TempDir) -> SledHarness {
    let db = open_db(dir.path().join("store")).unwrap();
    let profiles = Arc::new(SledProfileStore::new(&db).unwrap());
    let delegates = Arc::new(SledDelegateStore::new(&db).unwrap());
    let resolver = ContextResolver::new(
        CacheService::new(),
        profiles.clone(),
        delegates.clone(),
        ResolverPolicy::default(),
    );
    SledHarness {
        resolver,
        profiles,
        delegates,
    }
}

#[tokio::test]
async fn test_fixture_import_and_resolution() {
    let dir = TempDir::new().unwrap();
    let fixture_path = dir.path().join("fixture.json");
    std::fs::write(&fixture_path, FIXTURE).unwrap();

    let h = open(&dir);
    let fixture = Fixture::load_from_file(&fixture_path).unwrap();
    let summary = fixture
        .import_into(h.profiles.as_ref(), h.delegates.as_ref())
        .await
        .unwrap();
    assert_eq!((summary.profiles, summary.delegates), (1, 2));

    let owner = h.resolver.resolve("o1", false).await.unwrap();
    assert_eq!(owner.principal_kind(), PrincipalKind::Owner);
    assert!(owner.owner_profile().has_access());

    let delegate = h.resolver.resolve("d1", false).await.unwrap();
    assert_eq!(delegate.effective_owner_id(), "o1");
    assert!(delegate.permissions().allows("patients", "view_details"));

    assert_eq!(
        h.resolver.resolve("d2", false).await.unwrap_err(),
        ResolutionError::Deactivated("d2".into())
    );
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let h = open(&dir);
        Fixture::from_json(FIXTURE)
            .unwrap()
            .import_into(h.profiles.as_ref(), h.delegates.as_ref())
            .await
            .unwrap();
        h.resolver.set_delegate_active("d2", true).await.unwrap();
    }

    let h = open(&dir);
    assert!(h.delegates.is_active("d2").await.unwrap());
    assert_eq!(h.profiles.len(), 1);
    let ctx = h.resolver.resolve("d2", false).await.unwrap();
    assert!(ctx.permissions().is_full());
}

#[tokio::test]
async fn test_bootstrap_persists_one_profile() {
    let dir = TempDir::new().unwrap();
    let h = open(&dir);
    let claims = AuthClaims::new("u1").with_email("u1@clinic.test", false);

    let (a, b) = tokio::join!(
        h.resolver.resolve_or_bootstrap("u1", Some(&claims)),
        h.resolver.resolve_or_bootstrap("u1", Some(&claims)),
    );
    assert_eq!(a.unwrap().principal_id(), "u1");
    assert_eq!(b.unwrap().principal_id(), "u1");
    assert_eq!(h.profiles.len(), 1);

    let stored = h.profiles.get("u1").await.unwrap().unwrap();
    assert_eq!(stored.display_name, "u1");
    assert_eq!(stored.email.as_deref(), Some("u1@clinic.test"));
}

#[tokio::test]
async fn test_mutations_on_missing_records_are_not_found() {
    let dir = TempDir::new().unwrap();
    let h = open(&dir);
    assert_eq!(
        h.resolver.set_delegate_active("ghost", false).await.unwrap_err(),
        ResolutionError::NotFound("ghost".into())
    );
}
