mod common;

use std::time::Duration;

use common::{build_harness, file_harness, file_store_at, request, sqlite_store};

use domain::punishment::{Identity, PunishmentId, RemainingTime, ScopeId};
use tribunal_application::error::AppError;
use tribunal_application::ports::incoming::punishments::PunishmentsUseCase;

fn alice() -> Identity {
    Identity::Player("alice".to_string())
}

fn survival() -> Option<ScopeId> {
    Some(ScopeId::from("survival"))
}

#[tokio::test]
async fn scoped_ban_lifecycle() {
    let (harness, _tmp) = file_harness().await;
    harness
        .directory
        .record_join("alice", None, Some("10.0.0.1".parse().unwrap()));

    let ban = harness
        .punishments
        .ban(
            "alice",
            request("admin", Some("cheating"), Some("survival"), 86_400_000, false, false),
        )
        .await
        .unwrap();
    assert!(ban.id.as_i64() > 0);

    assert!(harness.punishments.is_banned(&alice(), survival().as_ref()));
    assert!(!harness
        .punishments
        .is_banned(&alice(), Some(&ScopeId::from("creative"))));
    assert!(!harness.punishments.is_banned(&alice(), None));

    let active = harness
        .punishments
        .active_ban(&alice(), survival().as_ref())
        .unwrap();
    assert_eq!(active.reason.as_deref(), Some("cheating"));
    match active.remaining_time(time::OffsetDateTime::now_utc()) {
        RemainingTime::Left(left) => assert!(left <= time::Duration::hours(24)),
        other => panic!("expected a countdown, got {other:?}"),
    }

    let revoked = harness
        .punishments
        .unban(&alice(), survival(), "console")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(revoked.revoked_by(), Some("console"));
    assert!(!harness.punishments.is_banned(&alice(), survival().as_ref()));

    // A second unban for the same slot is a no-op, never an error.
    let again = harness
        .punishments
        .unban(&alice(), survival(), "console")
        .await
        .unwrap();
    assert!(again.is_none());
}

#[tokio::test]
async fn temporary_bans_expire_on_their_own() {
    let (harness, _tmp) = file_harness().await;

    let ban = harness
        .punishments
        .ban(
            "alice",
            request("admin", Some("cheating"), Some("survival"), 60, false, false),
        )
        .await
        .unwrap();
    assert!(harness.punishments.is_banned(&alice(), survival().as_ref()));

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(!harness.punishments.is_banned(&alice(), survival().as_ref()));
    assert!(harness.punishments.active_bans().is_empty());

    // The expiration task closed the persisted record too.
    let stored = harness.punishments.ban_by_id(ban.id).await.unwrap();
    assert_eq!(stored.revoked_by(), Some("expiration"));
    assert_eq!(
        stored.remaining_time(time::OffsetDateTime::now_utc()),
        RemainingTime::Elapsed
    );
}

#[tokio::test]
async fn double_ban_replaces_the_active_record() {
    let (harness, _tmp) = file_harness().await;

    let first = harness
        .punishments
        .ban("alice", request("admin", Some("cheating"), Some("survival"), -1, false, false))
        .await
        .unwrap();
    let second = harness
        .punishments
        .ban("alice", request("mod", Some("evasion"), Some("survival"), -1, false, false))
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    let active = harness.punishments.active_bans_for(&alice());
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.id);
    assert_eq!(active[0].reason.as_deref(), Some("evasion"));

    // The first record was closed out, not deleted.
    let closed = harness.punishments.ban_by_id(first.id).await.unwrap();
    assert_eq!(closed.revoked_by(), Some("mod"));
}

#[tokio::test]
async fn global_bans_cover_every_scope_and_need_the_global_slot_to_unban() {
    let (harness, _tmp) = file_harness().await;

    harness
        .punishments
        .ban("alice", request("admin", Some("cheating"), None, -1, true, false))
        .await
        .unwrap();

    assert!(harness.punishments.is_banned(&alice(), survival().as_ref()));
    assert!(harness.punishments.is_banned(&alice(), None));

    // A scoped unban never touches the network-wide ban.
    let missed = harness
        .punishments
        .unban(&alice(), survival(), "console")
        .await
        .unwrap();
    assert!(missed.is_none());
    assert!(harness.punishments.is_banned(&alice(), None));

    let revoked = harness
        .punishments
        .unban(&alice(), None, "console")
        .await
        .unwrap();
    assert!(revoked.is_some());
    assert!(!harness.punishments.is_banned(&alice(), survival().as_ref()));
}

#[tokio::test]
async fn ip_bans_need_a_known_address() {
    let (harness, _tmp) = file_harness().await;

    let missing = harness
        .punishments
        .ban_ip("ghost", request("admin", None, None, -1, false, false))
        .await;
    assert!(matches!(missing, Err(AppError::InvalidArgument { .. })));

    let addr: std::net::IpAddr = "10.0.0.9".parse().unwrap();
    harness.directory.record_join("bob", None, Some(addr));
    let ban = harness
        .punishments
        .ban_ip("bob", request("admin", Some("evasion"), None, -1, false, false))
        .await
        .unwrap();
    assert_eq!(ban.target, Identity::Address(addr));
    assert!(harness.punishments.is_banned(&Identity::Address(addr), None));

    let revoked = harness
        .punishments
        .unban(&Identity::Address(addr), None, "console")
        .await
        .unwrap();
    assert!(revoked.is_some());
}

#[tokio::test]
async fn unban_by_id_matches_the_cached_record() {
    let (harness, _tmp) = file_harness().await;

    let ban = harness
        .punishments
        .ban("alice", request("admin", None, Some("survival"), -1, false, false))
        .await
        .unwrap();

    let revoked = harness
        .punishments
        .unban_id(ban.id, "console")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(revoked.id, ban.id);
    assert!(!harness.punishments.is_banned(&alice(), survival().as_ref()));

    let missing = harness
        .punishments
        .unban_id(PunishmentId(9_999), "console")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn vetoed_operations_have_no_side_effects() {
    let (harness, _tmp) = file_harness().await;
    harness.events.register_veto_hook(Box::new(|_| false));

    let result = harness
        .punishments
        .ban("alice", request("admin", None, Some("survival"), -1, false, false))
        .await;
    assert!(matches!(result, Err(AppError::Vetoed)));
    assert!(!harness.punishments.is_banned(&alice(), survival().as_ref()));

    let bans = harness.store.containers().bans.clone();
    assert_eq!(harness.store.count(&bans, &[]).await.unwrap(), 0);
}

#[tokio::test]
async fn mutes_share_the_expiry_machinery() {
    let (harness, _tmp) = file_harness().await;

    harness
        .punishments
        .mute("alice", request("admin", Some("spam"), Some("survival"), 60, false, false))
        .await
        .unwrap();
    assert!(harness.punishments.is_muted(&alice(), survival().as_ref()));
    assert!(!harness.punishments.is_banned(&alice(), survival().as_ref()));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!harness.punishments.is_muted(&alice(), survival().as_ref()));

    harness
        .punishments
        .mute("alice", request("admin", Some("spam"), Some("survival"), -1, false, false))
        .await
        .unwrap();
    let revoked = harness
        .punishments
        .unmute(&alice(), survival(), "console")
        .await
        .unwrap();
    assert!(revoked.is_some());
    assert!(!harness.punishments.is_muted(&alice(), survival().as_ref()));
}

#[tokio::test]
async fn warnings_and_kicks_accumulate_history() {
    let (harness, _tmp) = file_harness().await;
    harness
        .directory
        .record_join("alice", None, Some("10.0.0.1".parse().unwrap()));

    harness
        .punishments
        .warn("alice", request("admin", Some("language"), Some("survival"), -1, false, false))
        .await
        .unwrap();
    harness
        .punishments
        .warn("alice", request("mod", Some("spam"), None, -1, false, false))
        .await
        .unwrap();
    let warnings = harness.punishments.warnings("Alice").await.unwrap();
    assert_eq!(warnings.len(), 2);

    harness
        .punishments
        .kick("alice", request("admin", Some("afk"), Some("survival"), -1, false, false))
        .await
        .unwrap();
    let kicks = harness.punishments.kicks("alice").await.unwrap();
    assert_eq!(kicks.len(), 1);
    assert!(!harness.directory.is_online("alice").await.unwrap());
}

#[tokio::test]
async fn restore_rebuilds_the_active_cache_from_storage() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let store = file_store_at(tmp.path());
        store.load().await.unwrap();
        let harness = build_harness(store);
        harness
            .punishments
            .ban("alice", request("admin", Some("cheating"), Some("survival"), -1, false, false))
            .await
            .unwrap();
        // Already run out by the time the next process restores.
        harness
            .punishments
            .ban("bob", request("admin", None, Some("survival"), 10, false, false))
            .await
            .unwrap();
        harness.store.unload().await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(50)).await;

    let store = file_store_at(tmp.path());
    store.load().await.unwrap();
    let harness = build_harness(store);
    harness.punishments.restore().await.unwrap();

    assert!(harness.punishments.is_banned(&alice(), survival().as_ref()));
    assert!(!harness
        .punishments
        .is_banned(&Identity::Player("bob".to_string()), survival().as_ref()));
}

#[tokio::test]
async fn the_manager_works_over_sqlite_too() {
    let harness = build_harness(sqlite_store().await);

    harness
        .punishments
        .ban("alice", request("admin", Some("cheating"), Some("survival"), -1, false, false))
        .await
        .unwrap();
    assert!(harness.punishments.is_banned(&alice(), survival().as_ref()));

    let revoked = harness
        .punishments
        .unban(&alice(), survival(), "console")
        .await
        .unwrap();
    assert!(revoked.is_some());
    assert!(!harness.punishments.is_banned(&alice(), survival().as_ref()));
}

#[tokio::test]
async fn audit_rows_accumulate_for_every_mutation() {
    let (harness, _tmp) = file_harness().await;

    harness
        .punishments
        .ban("alice", request("admin", None, Some("survival"), -1, false, false))
        .await
        .unwrap();
    harness
        .punishments
        .unban(&alice(), survival(), "console")
        .await
        .unwrap();

    let audit = harness.store.containers().audit_log.clone();
    assert_eq!(harness.store.count(&audit, &[]).await.unwrap(), 2);
}
