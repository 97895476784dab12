use std::sync::Arc;

use domain::events::{PreEvent, PunishmentEvent};

pub trait EventsPort: Send + Sync {
    /// Offer a pre-event to listeners. `false` means a listener vetoed
    /// the operation; the caller must abort with no side effects.
    fn pre(&self, event: &PreEvent) -> bool;

    fn publish(&self, event: PunishmentEvent);
}

pub type DynEventsPort = Arc<dyn EventsPort>;
