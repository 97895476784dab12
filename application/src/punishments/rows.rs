use std::net::IpAddr;

use crate::error::{AppError, AppResult};
use crate::storage::containers::columns;
use crate::storage::model::{Row, StoreValue, from_unix_millis};
use domain::punishment::{
    BanDetail, Identity, MuteDetail, Punishment, PunishmentDetail, PunishmentId, PunishmentKind,
    ScopeId,
};

/// Persisted form of a punishment. The id column is storage-assigned
/// and absent here; derived state (remaining time, task handles) never
/// lands in a row.
pub fn punishment_row(punishment: &Punishment) -> Row {
    let kind = punishment.kind();
    let closable = matches!(kind, PunishmentKind::Ban | PunishmentKind::Mute);
    let ip = match &punishment.detail {
        PunishmentDetail::Ban(ban) => ban.ip,
        _ => None,
    };

    let mut row = Row::new();
    row.insert(
        columns::TARGET.to_string(),
        StoreValue::Text(punishment.target.key_string()),
    );
    row.insert(
        columns::IP.to_string(),
        StoreValue::from_opt_text(ip.map(|addr| addr.to_string())),
    );
    row.insert(
        columns::STAFF.to_string(),
        StoreValue::Text(punishment.staff.clone()),
    );
    row.insert(
        columns::REASON.to_string(),
        StoreValue::from_opt_text(punishment.reason.clone()),
    );
    row.insert(
        columns::SCOPE.to_string(),
        StoreValue::from_opt_text(punishment.scope.as_ref().map(|s| s.as_str().to_string())),
    );
    row.insert(
        columns::DATE.to_string(),
        StoreValue::from_datetime(punishment.issued_at),
    );
    row.insert(
        columns::DURATION.to_string(),
        StoreValue::from_opt_int(
            punishment
                .duration()
                .map(|d| d.whole_milliseconds() as i64),
        ),
    );
    row.insert(
        columns::ACTIVE.to_string(),
        StoreValue::Bool(closable && punishment.revoked_by().is_none()),
    );
    row.insert(
        columns::UNBANNED_BY.to_string(),
        StoreValue::from_opt_text(punishment.revoked_by().map(ToString::to_string)),
    );
    row.insert(
        columns::UNBAN_DATE.to_string(),
        StoreValue::from_opt_datetime(punishment.revoke_date()),
    );
    row.insert(
        columns::GLOBAL.to_string(),
        StoreValue::Bool(punishment.global),
    );
    row.insert(
        columns::SILENT.to_string(),
        StoreValue::Bool(punishment.silent),
    );
    row
}

/// Assignments closing out a revoked record.
pub fn revoke_assignments(punishment: &Punishment) -> Row {
    let mut row = Row::new();
    row.insert(columns::ACTIVE.to_string(), StoreValue::Bool(false));
    row.insert(
        columns::UNBANNED_BY.to_string(),
        StoreValue::from_opt_text(punishment.revoked_by().map(ToString::to_string)),
    );
    row.insert(
        columns::UNBAN_DATE.to_string(),
        StoreValue::from_opt_datetime(punishment.revoke_date()),
    );
    row
}

pub fn punishment_from_row(kind: PunishmentKind, row: &Row) -> AppResult<Punishment> {
    let id = PunishmentId(req_int(row, columns::ID)?);
    let target = identity_from_text(&req_text(row, columns::TARGET)?);
    let ip: Option<IpAddr> = opt_text(row, columns::IP).and_then(|text| text.parse().ok());
    let duration = opt_int(row, columns::DURATION).map(time::Duration::milliseconds);
    let revoked_by = opt_text(row, columns::UNBANNED_BY);
    let revoke_date = opt_int(row, columns::UNBAN_DATE).map(from_unix_millis);

    let detail = match kind {
        PunishmentKind::Ban => PunishmentDetail::Ban(BanDetail {
            ip,
            duration,
            unbanned_by: revoked_by,
            unban_date: revoke_date,
            expiry_task: None,
        }),
        PunishmentKind::Mute => PunishmentDetail::Mute(MuteDetail {
            duration,
            unmuted_by: revoked_by,
            unmute_date: revoke_date,
            expiry_task: None,
        }),
        PunishmentKind::Warning => PunishmentDetail::Warning,
        PunishmentKind::Kick => PunishmentDetail::Kick,
    };

    Ok(Punishment {
        id,
        target,
        staff: req_text(row, columns::STAFF)?,
        reason: opt_text(row, columns::REASON),
        scope: opt_text(row, columns::SCOPE).map(ScopeId::from),
        issued_at: from_unix_millis(req_int(row, columns::DATE)?),
        silent: req_bool(row, columns::SILENT)?,
        global: req_bool(row, columns::GLOBAL)?,
        detail,
    })
}

/// Stored targets are either case-folded account names or textual
/// addresses; an address parse decides which.
pub fn identity_from_text(text: &str) -> Identity {
    match text.parse::<IpAddr>() {
        Ok(addr) => Identity::Address(addr),
        Err(_) => Identity::Player(text.to_string()),
    }
}

pub(crate) fn req_text(row: &Row, column: &str) -> AppResult<String> {
    opt_text(row, column)
        .ok_or_else(|| AppError::storage(format!("missing text column: {column}")))
}

pub(crate) fn opt_text(row: &Row, column: &str) -> Option<String> {
    row.get(column)
        .and_then(|value| value.as_text())
        .map(ToString::to_string)
}

pub(crate) fn req_int(row: &Row, column: &str) -> AppResult<i64> {
    opt_int(row, column)
        .ok_or_else(|| AppError::storage(format!("missing integer column: {column}")))
}

pub(crate) fn opt_int(row: &Row, column: &str) -> Option<i64> {
    row.get(column).and_then(StoreValue::as_int)
}

pub(crate) fn req_bool(row: &Row, column: &str) -> AppResult<bool> {
    req_int(row, column).map(|value| value != 0)
}
