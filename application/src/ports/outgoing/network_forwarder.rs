use std::sync::Arc;

use domain::events::PunishmentEvent;

/// Propagates global operations to the rest of the network.
/// Everything here is fire-and-forget; delivery is best effort.
pub trait NetworkForwarderPort: Send + Sync {
    /// Whether this node holds the routing context needed for
    /// network-wide operations.
    fn routing_available(&self) -> bool;

    fn forward_punishment(&self, event: &PunishmentEvent);

    fn forward_commands(&self, commands: &[String]);
}

pub type DynNetworkForwarderPort = Arc<dyn NetworkForwarderPort>;
