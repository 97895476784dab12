mod common;

use common::{file_store, file_store_at, sqlite_store};

use tribunal_application::error::AppError;
use tribunal_application::storage::containers::columns;
use tribunal_application::storage::facade::{DataStore, PlayerKey};
use tribunal_application::storage::model::{Condition, Operator, Row, StoreValue, unix_millis};

fn player_row(name: &str, ip: &str, logins: i64, first_seen: i64) -> Row {
    let mut row = Row::new();
    row.insert(columns::NAME.to_string(), StoreValue::Text(name.to_string()));
    row.insert(columns::UUID.to_string(), StoreValue::Null);
    row.insert(columns::IP.to_string(), StoreValue::Text(ip.to_string()));
    row.insert(columns::FIRST_SEEN.to_string(), StoreValue::Int(first_seen));
    row.insert(columns::LAST_SEEN.to_string(), StoreValue::Null);
    row.insert(columns::LOGINS.to_string(), StoreValue::Int(logins));
    row.insert(columns::PLAYTIME.to_string(), StoreValue::Int(0));
    row
}

async fn seed_players(store: &DataStore) {
    let players = store.containers().players.clone();
    for (name, ip, logins, first_seen) in [
        ("alice", "10.0.0.1", 3, 1_000),
        ("bob", "10.0.0.2", 7, 2_000),
        ("carol", "10.0.0.3", 7, 3_000),
    ] {
        store
            .insert(&players, &player_row(name, ip, logins, first_seen))
            .await
            .unwrap();
    }
}

async fn check_typed_round_trip(store: DataStore) {
    let players = store.containers().players.clone();
    let now = time::OffsetDateTime::now_utc();
    let mut row = player_row("steve", "192.168.0.7", 1, 0);
    row.insert(columns::FIRST_SEEN.to_string(), StoreValue::Int(unix_millis(now)));
    let id = store.insert(&players, &row).await.unwrap();
    assert!(id > 0);

    let by_id = vec![Condition::eq(columns::ID, id)];
    let name: Option<String> = store.select(&players, columns::NAME, &by_id).await.unwrap();
    assert_eq!(name.as_deref(), Some("steve"));

    let logins: Option<i64> = store.select(&players, columns::LOGINS, &by_id).await.unwrap();
    assert_eq!(logins, Some(1));

    let seen: Option<time::OffsetDateTime> =
        store.select(&players, columns::FIRST_SEEN, &by_id).await.unwrap();
    assert_eq!(seen.map(unix_millis), Some(unix_millis(now)));

    // Stored nulls read back as absent.
    let last_seen: Option<i64> = store.select(&players, columns::LAST_SEEN, &by_id).await.unwrap();
    assert_eq!(last_seen, None);

    // Booleans live as integers in the bans container.
    let bans = store.containers().bans.clone();
    let mut ban_row = Row::new();
    for column in &bans.columns {
        ban_row.insert(column.name.to_string(), StoreValue::Null);
    }
    ban_row.insert(columns::TARGET.to_string(), StoreValue::Text("steve".to_string()));
    ban_row.insert(columns::STAFF.to_string(), StoreValue::Text("admin".to_string()));
    ban_row.insert(columns::DATE.to_string(), StoreValue::Int(0));
    ban_row.insert(columns::ACTIVE.to_string(), StoreValue::Bool(true));
    ban_row.insert(columns::GLOBAL.to_string(), StoreValue::Bool(false));
    ban_row.insert(columns::SILENT.to_string(), StoreValue::Bool(true));
    let ban_id = store.insert(&bans, &ban_row).await.unwrap();

    let silent: Option<bool> = store
        .select(&bans, columns::SILENT, &[Condition::eq(columns::ID, ban_id)])
        .await
        .unwrap();
    assert_eq!(silent, Some(true));
}

#[tokio::test]
async fn typed_round_trip_on_sqlite() {
    check_typed_round_trip(sqlite_store().await).await;
}

#[tokio::test]
async fn typed_round_trip_on_flat_files() {
    let (store, _tmp) = file_store().await;
    check_typed_round_trip(store).await;
}

async fn check_condition_composition(store: DataStore) {
    seed_players(&store).await;
    let players = store.containers().players.clone();

    // No conditions: everything.
    assert_eq!(store.count(&players, &[]).await.unwrap(), 3);

    // One condition, each operator.
    let one = |condition: Condition| vec![condition];
    assert_eq!(
        store.count(&players, &one(Condition::eq(columns::LOGINS, 7i64))).await.unwrap(),
        2
    );
    assert_eq!(
        store.count(&players, &one(Condition::ne(columns::LOGINS, 7i64))).await.unwrap(),
        1
    );
    assert_eq!(
        store.count(&players, &one(Condition::gt(columns::LOGINS, 3i64))).await.unwrap(),
        2
    );
    assert_eq!(
        store.count(&players, &one(Condition::lt(columns::LOGINS, 7i64))).await.unwrap(),
        1
    );
    assert_eq!(
        store.count(&players, &one(Condition::ge(columns::LOGINS, 7i64))).await.unwrap(),
        2
    );
    assert_eq!(
        store.count(&players, &one(Condition::le(columns::LOGINS, 3i64))).await.unwrap(),
        1
    );

    // Three conditions, AND-combined in declaration order.
    let three = vec![
        Condition::eq(columns::LOGINS, 7i64),
        Condition::ge(columns::FIRST_SEEN, 2_000i64),
        Condition::new(columns::NAME, Operator::Ne, "bob"),
    ];
    assert_eq!(store.count(&players, &three).await.unwrap(), 1);
    let name: Option<String> = store.select(&players, columns::NAME, &three).await.unwrap();
    assert_eq!(name.as_deref(), Some("carol"));

    let names: Vec<String> = store
        .column_values(&players, columns::NAME, &[Condition::ge(columns::LOGINS, 0i64)])
        .await
        .unwrap();
    assert_eq!(names, vec!["alice", "bob", "carol"]);

    // No match is an empty sequence, never an error.
    let none: Vec<String> = store
        .column_values(&players, columns::NAME, &[Condition::gt(columns::LOGINS, 100i64)])
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn condition_composition_on_sqlite() {
    check_condition_composition(sqlite_store().await).await;
}

#[tokio::test]
async fn condition_composition_on_flat_files() {
    let (store, _tmp) = file_store().await;
    check_condition_composition(store).await;
}

async fn check_update_and_delete(store: DataStore) {
    seed_players(&store).await;
    let players = store.containers().players.clone();

    let mut assignments = Row::new();
    assignments.insert(columns::PLAYTIME.to_string(), StoreValue::Int(500));
    let affected = store
        .update(&players, &assignments, &[Condition::eq(columns::LOGINS, 7i64)])
        .await
        .unwrap();
    assert_eq!(affected, 2);

    let affected = store
        .delete(&players, &[Condition::eq(columns::NAME, "alice")])
        .await
        .unwrap();
    assert_eq!(affected, 1);
    assert_eq!(store.count(&players, &[]).await.unwrap(), 2);

    // Deleting nothing affects zero rows.
    let affected = store
        .delete(&players, &[Condition::eq(columns::NAME, "alice")])
        .await
        .unwrap();
    assert_eq!(affected, 0);
}

#[tokio::test]
async fn update_and_delete_on_sqlite() {
    check_update_and_delete(sqlite_store().await).await;
}

#[tokio::test]
async fn update_and_delete_on_flat_files() {
    let (store, _tmp) = file_store().await;
    check_update_and_delete(store).await;
}

async fn check_keyless_rules(store: DataStore) {
    let audit = store.containers().audit_log.clone();

    let mut row = Row::new();
    row.insert(columns::ACTOR.to_string(), StoreValue::Text("admin".to_string()));
    row.insert(columns::ACTION.to_string(), StoreValue::Text("ban".to_string()));
    row.insert(columns::TARGET.to_string(), StoreValue::Text("alice".to_string()));
    row.insert(columns::SCOPE.to_string(), StoreValue::Null);
    row.insert(columns::DATE.to_string(), StoreValue::Int(1_000));
    row.insert(columns::DETAIL.to_string(), StoreValue::Null);

    // Appends are fine and report no id.
    assert_eq!(store.insert(&audit, &row).await.unwrap(), 0);
    assert_eq!(store.count(&audit, &[]).await.unwrap(), 1);

    // Addressing keyless rows by id is caller misuse.
    assert!(matches!(
        store.row_values(&audit, 1).await,
        Err(AppError::InvalidArgument { .. })
    ));
    let mut assignments = Row::new();
    assignments.insert(columns::ACTION.to_string(), StoreValue::Text("unban".to_string()));
    assert!(matches!(
        store.set_data(&audit, 1, &assignments).await,
        Err(AppError::InvalidArgument { .. })
    ));
    assert!(matches!(
        store.remove_entry(&audit, 1).await,
        Err(AppError::InvalidArgument { .. })
    ));
}

#[tokio::test]
async fn keyless_rules_on_sqlite() {
    check_keyless_rules(sqlite_store().await).await;
}

#[tokio::test]
async fn keyless_rules_on_flat_files() {
    let (store, _tmp) = file_store().await;
    check_keyless_rules(store).await;
}

async fn check_player_scoped_access(store: DataStore) {
    seed_players(&store).await;

    let by_name = PlayerKey::Name("Alice".to_string());
    let row = store.player_data(&by_name).await.unwrap().unwrap();
    assert_eq!(
        row.get(columns::IP),
        Some(&StoreValue::Text("10.0.0.1".to_string()))
    );

    store
        .set_player_data(&by_name, columns::LAST_SEEN, StoreValue::Int(9_000))
        .await
        .unwrap();
    let row = store.player_data(&by_name).await.unwrap().unwrap();
    assert_eq!(row.get(columns::LAST_SEEN), Some(&StoreValue::Int(9_000)));

    // Whitelisted counters increment read-then-write.
    let next = store
        .increment_player_stat(&by_name, columns::LOGINS, 2)
        .await
        .unwrap();
    assert_eq!(next, 5);

    // Anything off the whitelist is caller misuse.
    assert!(matches!(
        store.increment_player_stat(&by_name, columns::IP, 1).await,
        Err(AppError::InvalidArgument { .. })
    ));
    assert!(matches!(
        store
            .increment_player_stat(&by_name, columns::LAST_SEEN, 1)
            .await,
        Err(AppError::InvalidArgument { .. })
    ));

    // Unknown players cannot be incremented.
    assert!(matches!(
        store
            .increment_player_stat(&PlayerKey::Name("nobody".to_string()), columns::LOGINS, 1)
            .await,
        Err(AppError::InvalidArgument { .. })
    ));

    // Numeric ids address the same rows.
    let row = store.player_data(&PlayerKey::Id(1)).await.unwrap().unwrap();
    assert_eq!(
        row.get(columns::NAME),
        Some(&StoreValue::Text("alice".to_string()))
    );
}

#[tokio::test]
async fn player_scoped_access_on_sqlite() {
    check_player_scoped_access(sqlite_store().await).await;
}

#[tokio::test]
async fn player_scoped_access_on_flat_files() {
    let (store, _tmp) = file_store().await;
    check_player_scoped_access(store).await;
}

#[tokio::test]
async fn safe_select_defaults_on_storage_failure() {
    // Never loaded, so every access is a storage error.
    let tmp = tempfile::tempdir().unwrap();
    let store = file_store_at(tmp.path());
    let players = store.containers().players.clone();

    assert!(store.select::<String>(&players, columns::NAME, &[]).await.is_err());

    let value = store
        .safe_select(&players, columns::NAME, &[], "fallback".to_string())
        .await
        .unwrap();
    assert_eq!(value, "fallback");

    let count = store.safe_count(&players, &[], 42).await.unwrap();
    assert_eq!(count, 42);

    // Caller misuse is never converted into the default.
    assert!(store
        .safe_select(&players, "no_such_column", &[], "fallback".to_string())
        .await
        .is_err());
}

#[tokio::test]
async fn flat_files_persist_across_reloads() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let store = file_store_at(tmp.path());
        store.load().await.unwrap();
        seed_players(&store).await;
        store.unload().await.unwrap();
    }

    let store = file_store_at(tmp.path());
    store.load().await.unwrap();
    let players = store.containers().players.clone();
    assert_eq!(store.count(&players, &[]).await.unwrap(), 3);

    // Ids keep counting after a reload instead of reusing old ones.
    let id = store
        .insert(&players, &player_row("dave", "10.0.0.4", 0, 4_000))
        .await
        .unwrap();
    assert_eq!(id, 4);
}
