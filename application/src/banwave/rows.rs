use std::net::IpAddr;

use crate::error::AppResult;
use crate::punishments::rows::{identity_from_text, opt_int, opt_text, req_bool, req_int, req_text};
use crate::storage::containers::columns;
use crate::storage::model::{Row, StoreValue, from_unix_millis};
use domain::banwave::BanwaveEntry;
use domain::punishment::ScopeId;

pub fn entry_row(entry: &BanwaveEntry) -> Row {
    let mut row = Row::new();
    row.insert(
        columns::TARGET.to_string(),
        StoreValue::Text(entry.target.key_string()),
    );
    row.insert(
        columns::IP.to_string(),
        StoreValue::from_opt_text(entry.ip.map(|addr| addr.to_string())),
    );
    row.insert(
        columns::STAFF.to_string(),
        StoreValue::Text(entry.staff.clone()),
    );
    row.insert(
        columns::REASON.to_string(),
        StoreValue::from_opt_text(entry.reason.clone()),
    );
    row.insert(
        columns::SCOPE.to_string(),
        StoreValue::from_opt_text(entry.scope.as_ref().map(|s| s.as_str().to_string())),
    );
    row.insert(
        columns::DURATION.to_string(),
        StoreValue::from_opt_int(entry.duration.map(|d| d.whole_milliseconds() as i64)),
    );
    row.insert(columns::GLOBAL.to_string(), StoreValue::Bool(entry.global));
    row.insert(columns::SILENT.to_string(), StoreValue::Bool(entry.silent));
    row.insert(
        columns::PENDING.to_string(),
        StoreValue::Bool(entry.is_pending()),
    );
    row.insert(
        columns::CREATED_AT.to_string(),
        StoreValue::from_datetime(entry.created_at),
    );
    row.insert(
        columns::REMOVED_AT.to_string(),
        StoreValue::from_opt_datetime(entry.removed_at),
    );
    row.insert(
        columns::REMOVED_BY.to_string(),
        StoreValue::from_opt_text(entry.removed_by.clone()),
    );
    row
}

pub fn entry_from_row(row: &Row) -> AppResult<(i64, BanwaveEntry)> {
    let id = req_int(row, columns::ID)?;
    let ip: Option<IpAddr> = opt_text(row, columns::IP).and_then(|text| text.parse().ok());
    let entry = BanwaveEntry {
        target: identity_from_text(&req_text(row, columns::TARGET)?),
        ip,
        staff: req_text(row, columns::STAFF)?,
        reason: opt_text(row, columns::REASON),
        scope: opt_text(row, columns::SCOPE).map(ScopeId::from),
        duration: opt_int(row, columns::DURATION).map(time::Duration::milliseconds),
        global: req_bool(row, columns::GLOBAL)?,
        silent: req_bool(row, columns::SILENT)?,
        created_at: from_unix_millis(req_int(row, columns::CREATED_AT)?),
        removed_at: opt_int(row, columns::REMOVED_AT).map(from_unix_millis),
        removed_by: opt_text(row, columns::REMOVED_BY),
    };
    Ok((id, entry))
}

/// Assignments marking an entry consumed or withdrawn.
pub fn removal_assignments(entry: &BanwaveEntry) -> Row {
    let mut row = Row::new();
    row.insert(columns::PENDING.to_string(), StoreValue::Bool(false));
    row.insert(
        columns::REMOVED_AT.to_string(),
        StoreValue::from_opt_datetime(entry.removed_at),
    );
    row.insert(
        columns::REMOVED_BY.to_string(),
        StoreValue::from_opt_text(entry.removed_by.clone()),
    );
    row
}

/// Assignments refreshing a resubmitted entry in place.
pub fn resubmit_assignments(entry: &BanwaveEntry) -> Row {
    let mut row = Row::new();
    row.insert(
        columns::IP.to_string(),
        StoreValue::from_opt_text(entry.ip.map(|addr| addr.to_string())),
    );
    row.insert(
        columns::STAFF.to_string(),
        StoreValue::Text(entry.staff.clone()),
    );
    row.insert(
        columns::REASON.to_string(),
        StoreValue::from_opt_text(entry.reason.clone()),
    );
    row.insert(
        columns::DURATION.to_string(),
        StoreValue::from_opt_int(entry.duration.map(|d| d.whole_milliseconds() as i64)),
    );
    row.insert(columns::SILENT.to_string(), StoreValue::Bool(entry.silent));
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::punishment::Identity;
    use time::OffsetDateTime;

    #[test]
    fn entries_survive_the_row_round_trip() {
        let entry = BanwaveEntry {
            target: Identity::Player("bob".to_string()),
            ip: Some("10.0.0.9".parse().unwrap()),
            staff: "admin".to_string(),
            reason: Some("ban evasion".to_string()),
            scope: Some(ScopeId::from("survival")),
            duration: None,
            global: false,
            silent: true,
            created_at: from_unix_millis(5_000),
            removed_at: None,
            removed_by: None,
        };

        let mut row = entry_row(&entry);
        row.insert(columns::ID.to_string(), StoreValue::Int(11));
        let (id, restored) = entry_from_row(&row).unwrap();
        assert_eq!(id, 11);
        assert_eq!(restored, entry);
    }

    #[test]
    fn removal_clears_the_pending_flag() {
        let mut entry = BanwaveEntry {
            target: Identity::Player("bob".to_string()),
            ip: None,
            staff: "admin".to_string(),
            reason: None,
            scope: None,
            duration: None,
            global: true,
            silent: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
            removed_at: None,
            removed_by: None,
        };
        entry.mark_removed("console", OffsetDateTime::UNIX_EPOCH);
        let row = removal_assignments(&entry);
        assert_eq!(row.get(columns::PENDING), Some(&StoreValue::Bool(false)));
        assert_eq!(
            row.get(columns::REMOVED_BY),
            Some(&StoreValue::Text("console".to_string()))
        );
    }
}
