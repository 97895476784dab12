use domain::punishment::{PunishmentKind, RemainingTime};
use tribunal_application::ports::outgoing::localization::LocalizationPort;

/// English fallback catalog. Hosts with a message bundle implement the
/// port against it instead.
pub struct StaticLocalization;

impl LocalizationPort for StaticLocalization {
    fn flag_label(&self, flag: bool) -> String {
        if flag { "yes".to_string() } else { "no".to_string() }
    }

    fn kind_label(&self, kind: PunishmentKind) -> String {
        kind.as_str().to_string()
    }

    fn remaining_label(&self, remaining: RemainingTime) -> String {
        match remaining {
            RemainingTime::Elapsed => "expired".to_string(),
            RemainingTime::Permanent => "permanent".to_string(),
            RemainingTime::Left(left) => {
                let total_secs = left.whole_seconds().max(1);
                let days = total_secs / 86_400;
                let hours = (total_secs % 86_400) / 3_600;
                let minutes = (total_secs % 3_600) / 60;
                let seconds = total_secs % 60;
                let mut parts = Vec::new();
                if days > 0 {
                    parts.push(format!("{days}d"));
                }
                if hours > 0 {
                    parts.push(format!("{hours}h"));
                }
                if minutes > 0 {
                    parts.push(format!("{minutes}m"));
                }
                if parts.is_empty() {
                    parts.push(format!("{seconds}s"));
                }
                format!("{} left", parts.join(" "))
            }
        }
    }

    fn global_label(&self) -> String {
        "global".to_string()
    }
}
