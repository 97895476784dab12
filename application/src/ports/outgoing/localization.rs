use std::sync::Arc;

use domain::punishment::{PunishmentKind, RemainingTime};

/// Flag/enum to display-text translation. The core only ever hands raw
/// values across this boundary; wording lives with the host.
pub trait LocalizationPort: Send + Sync {
    fn flag_label(&self, flag: bool) -> String;

    fn kind_label(&self, kind: PunishmentKind) -> String;

    fn remaining_label(&self, remaining: RemainingTime) -> String;

    fn global_label(&self) -> String;
}

pub type DynLocalizationPort = Arc<dyn LocalizationPort>;
