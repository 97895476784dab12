use std::fmt;

/// Column names shared by services and adapters.
pub mod columns {
    pub const ID: &str = "id";
    pub const TARGET: &str = "target";
    pub const IP: &str = "ip";
    pub const STAFF: &str = "staff";
    pub const REASON: &str = "reason";
    pub const SCOPE: &str = "scope";
    pub const DATE: &str = "date";
    pub const DURATION: &str = "duration";
    pub const ACTIVE: &str = "active";
    pub const UNBANNED_BY: &str = "unbanned_by";
    pub const UNBAN_DATE: &str = "unban_date";
    pub const GLOBAL: &str = "global";
    pub const SILENT: &str = "silent";

    pub const NAME: &str = "name";
    pub const UUID: &str = "uuid";
    pub const FIRST_SEEN: &str = "first_seen";
    pub const LAST_SEEN: &str = "last_seen";
    pub const LOGINS: &str = "logins";
    pub const PLAYTIME: &str = "playtime";

    pub const PENDING: &str = "pending";
    pub const CREATED_AT: &str = "created_at";
    pub const REMOVED_AT: &str = "removed_at";
    pub const REMOVED_BY: &str = "removed_by";

    pub const ACTOR: &str = "actor";
    pub const ACTION: &str = "action";
    pub const DETAIL: &str = "detail";
}

/// Numeric counter columns `increment_player_stat` may touch.
pub const PLAYER_STAT_COLUMNS: &[&str] = &[columns::LOGINS, columns::PLAYTIME];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
}

#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
}

impl ColumnDef {
    const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Text,
            nullable: false,
        }
    }

    const fn text_null(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Text,
            nullable: true,
        }
    }

    const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Integer,
            nullable: false,
        }
    }

    const fn integer_null(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Integer,
            nullable: true,
        }
    }
}

/// Whether rows carry a storage-assigned numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPolicy {
    AutoId,
    Keyless,
}

/// A named logical table (relational backend) or document (flat-file
/// backend). The set is fixed at startup; adapters create missing
/// containers on `load()`.
#[derive(Debug, Clone)]
pub struct ContainerDef {
    pub name: &'static str,
    pub key: KeyPolicy,
    pub columns: Vec<ColumnDef>,
}

impl ContainerDef {
    pub fn has_key(&self) -> bool {
        self.key == KeyPolicy::AutoId
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Kind of a named position, treating the implicit `id` column of
    /// keyed containers as an integer.
    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        if name == columns::ID && self.has_key() {
            return Some(ColumnKind::Integer);
        }
        self.column(name).map(|column| column.kind)
    }
}

impl fmt::Display for ContainerDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The static container registry.
#[derive(Debug, Clone)]
pub struct Containers {
    pub bans: ContainerDef,
    pub mutes: ContainerDef,
    pub warnings: ContainerDef,
    pub kicks: ContainerDef,
    pub players: ContainerDef,
    pub banwave: ContainerDef,
    pub audit_log: ContainerDef,
}

fn punishment_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::text(columns::TARGET),
        ColumnDef::text_null(columns::IP),
        ColumnDef::text(columns::STAFF),
        ColumnDef::text_null(columns::REASON),
        ColumnDef::text_null(columns::SCOPE),
        ColumnDef::integer(columns::DATE),
        ColumnDef::integer_null(columns::DURATION),
        ColumnDef::integer(columns::ACTIVE),
        ColumnDef::text_null(columns::UNBANNED_BY),
        ColumnDef::integer_null(columns::UNBAN_DATE),
        ColumnDef::integer(columns::GLOBAL),
        ColumnDef::integer(columns::SILENT),
    ]
}

impl Containers {
    pub fn new() -> Self {
        Self {
            bans: ContainerDef {
                name: "bans",
                key: KeyPolicy::AutoId,
                columns: punishment_columns(),
            },
            mutes: ContainerDef {
                name: "mutes",
                key: KeyPolicy::AutoId,
                columns: punishment_columns(),
            },
            warnings: ContainerDef {
                name: "warnings",
                key: KeyPolicy::AutoId,
                columns: punishment_columns(),
            },
            kicks: ContainerDef {
                name: "kicks",
                key: KeyPolicy::AutoId,
                columns: punishment_columns(),
            },
            players: ContainerDef {
                name: "players",
                key: KeyPolicy::AutoId,
                columns: vec![
                    ColumnDef::text(columns::NAME),
                    ColumnDef::text_null(columns::UUID),
                    ColumnDef::text_null(columns::IP),
                    ColumnDef::integer_null(columns::FIRST_SEEN),
                    ColumnDef::integer_null(columns::LAST_SEEN),
                    ColumnDef::integer(columns::LOGINS),
                    ColumnDef::integer(columns::PLAYTIME),
                ],
            },
            banwave: ContainerDef {
                name: "banwave",
                key: KeyPolicy::AutoId,
                columns: vec![
                    ColumnDef::text(columns::TARGET),
                    ColumnDef::text_null(columns::IP),
                    ColumnDef::text(columns::STAFF),
                    ColumnDef::text_null(columns::REASON),
                    ColumnDef::text_null(columns::SCOPE),
                    ColumnDef::integer_null(columns::DURATION),
                    ColumnDef::integer(columns::GLOBAL),
                    ColumnDef::integer(columns::SILENT),
                    ColumnDef::integer(columns::PENDING),
                    ColumnDef::integer(columns::CREATED_AT),
                    ColumnDef::integer_null(columns::REMOVED_AT),
                    ColumnDef::text_null(columns::REMOVED_BY),
                ],
            },
            // Append-only; rows are never addressed individually.
            audit_log: ContainerDef {
                name: "audit_log",
                key: KeyPolicy::Keyless,
                columns: vec![
                    ColumnDef::text(columns::ACTOR),
                    ColumnDef::text(columns::ACTION),
                    ColumnDef::text(columns::TARGET),
                    ColumnDef::text_null(columns::SCOPE),
                    ColumnDef::integer(columns::DATE),
                    ColumnDef::text_null(columns::DETAIL),
                ],
            },
        }
    }

    pub fn all(&self) -> [&ContainerDef; 7] {
        [
            &self.bans,
            &self.mutes,
            &self.warnings,
            &self.kicks,
            &self.players,
            &self.banwave,
            &self.audit_log,
        ]
    }
}

impl Default for Containers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_names_are_unique() {
        let containers = Containers::new();
        let mut names: Vec<&str> = containers.all().iter().map(|c| c.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), containers.all().len());
    }

    #[test]
    fn id_is_an_integer_position_on_keyed_containers_only() {
        let containers = Containers::new();
        assert_eq!(
            containers.bans.column_kind(columns::ID),
            Some(ColumnKind::Integer)
        );
        assert_eq!(containers.audit_log.column_kind(columns::ID), None);
    }

    #[test]
    fn stat_whitelist_names_real_player_columns() {
        let containers = Containers::new();
        for stat in PLAYER_STAT_COLUMNS {
            assert_eq!(
                containers.players.column_kind(stat),
                Some(ColumnKind::Integer)
            );
        }
    }
}
