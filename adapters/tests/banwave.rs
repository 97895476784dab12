mod common;

use common::{build_harness, file_harness, file_store_at, request};

use domain::events::{PreEvent, PunishmentEvent};
use domain::punishment::{Identity, ScopeId};
use tribunal_application::ports::incoming::banwave::BanwaveUseCase;
use tribunal_application::ports::incoming::punishments::PunishmentsUseCase;

fn bob() -> Identity {
    Identity::Player("bob".to_string())
}

#[tokio::test]
async fn resubmission_updates_the_pending_entry_in_place() {
    let (harness, _tmp) = file_harness().await;

    harness
        .banwave
        .add_entry(
            "bob",
            request("admin", Some("ban-evasion"), Some("survival"), -1, true, true),
        )
        .await
        .unwrap();
    harness
        .banwave
        .add_entry(
            "bob",
            request("mod", Some("compromised account"), Some("survival"), -1, true, true),
        )
        .await
        .unwrap();

    let entries = harness.banwave.entries_for(&bob()).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].reason.as_deref(), Some("compromised account"));
    assert_eq!(entries[0].staff, "mod");

    // A different scope is a different slot.
    harness
        .banwave
        .add_entry(
            "bob",
            request("admin", Some("ban-evasion"), Some("survival"), -1, false, true),
        )
        .await
        .unwrap();
    assert_eq!(harness.banwave.entries_for(&bob()).await.len(), 2);
}

#[tokio::test]
async fn removal_is_keyed_and_idempotent() {
    let (harness, _tmp) = file_harness().await;

    harness
        .banwave
        .add_entry("bob", request("admin", None, Some("survival"), -1, false, true))
        .await
        .unwrap();

    // The global slot holds nothing for bob.
    let missed = harness
        .banwave
        .remove_entry(&bob(), None, "console")
        .await
        .unwrap();
    assert!(missed.is_none());

    let removed = harness
        .banwave
        .remove_entry(&bob(), Some(ScopeId::from("survival")), "console")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(removed.removed_by.as_deref(), Some("console"));
    assert!(harness.banwave.entries().await.is_empty());

    let again = harness
        .banwave
        .remove_entry(&bob(), Some(ScopeId::from("survival")), "console")
        .await
        .unwrap();
    assert!(again.is_none());
}

#[tokio::test]
async fn a_wave_applies_entries_in_order_and_survives_one_failure() {
    let (harness, _tmp) = file_harness().await;
    let mut events = harness.subscribe();

    // Mallory's ban is vetoed, which fails that one application.
    harness.events.register_veto_hook(Box::new(|event| {
        !matches!(
            event,
            PreEvent::Punish {
                target: Identity::Player(name),
                ..
            } if name.as_str() == "mallory"
        )
    }));

    for name in ["alice", "mallory", "carol"] {
        harness
            .banwave
            .add_entry(
                name,
                request("admin", Some("banwave bots"), Some("survival"), -1, false, true),
            )
            .await
            .unwrap();
    }

    harness.banwave.tick().await.unwrap();
    assert!(!harness.banwave.is_running());
    assert!(harness.banwave.entries().await.is_empty());

    let scope = ScopeId::from("survival");
    let banned = |name: &str| {
        harness
            .punishments
            .is_banned(&Identity::Player(name.to_string()), Some(&scope))
    };
    assert!(banned("alice"));
    assert!(!banned("mallory"));
    assert!(banned("carol"));

    let mut removal_order = Vec::new();
    let mut ended = None;
    while let Ok(event) = events.try_recv() {
        match event {
            PunishmentEvent::BanwaveEntryRemoved(entry) => {
                removal_order.push(entry.target.key_string());
            }
            PunishmentEvent::BanwaveEnded { applied, failed } => ended = Some((applied, failed)),
            _ => {}
        }
    }
    assert_eq!(removal_order, vec!["alice", "mallory", "carol"]);
    assert_eq!(ended, Some((2, 1)));
}

#[tokio::test]
async fn an_empty_queue_makes_the_tick_a_no_op() {
    let (harness, _tmp) = file_harness().await;
    let mut events = harness.subscribe();

    harness.banwave.tick().await.unwrap();

    assert!(events.try_recv().is_err());
    assert!(!harness.banwave.is_running());
}

#[tokio::test]
async fn trigger_prefixes_route_reasons_into_the_queue() {
    let (harness, _tmp) = file_harness().await;

    assert!(harness.banwave.is_banwave_reason(Some("Banwave evasion ring")));
    assert!(harness.banwave.is_banwave_reason(Some("§c§lBANWAVE: bots")));
    assert!(harness.banwave.is_banwave_reason(Some("  banwave later")));
    assert!(!harness.banwave.is_banwave_reason(Some("cheating")));
    assert!(!harness.banwave.is_banwave_reason(None));
}

#[tokio::test]
async fn pending_entries_survive_a_restart() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let store = file_store_at(tmp.path());
        store.load().await.unwrap();
        let harness = build_harness(store);
        harness
            .banwave
            .add_entry("bob", request("admin", None, Some("survival"), -1, false, true))
            .await
            .unwrap();
        harness
            .banwave
            .add_entry("carol", request("admin", None, None, -1, true, true))
            .await
            .unwrap();
    }

    let store = file_store_at(tmp.path());
    store.load().await.unwrap();
    let harness = build_harness(store);
    harness.banwave.restore().await.unwrap();

    let entries = harness.banwave.entries().await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].target, bob());

    // Consumed entries are not resurrected by the next restore.
    harness.banwave.tick().await.unwrap();
    let store = file_store_at(tmp.path());
    store.load().await.unwrap();
    let harness = build_harness(store);
    harness.banwave.restore().await.unwrap();
    assert!(harness.banwave.entries().await.is_empty());
}
