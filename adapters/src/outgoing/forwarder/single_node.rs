use tracing::debug;

use domain::events::PunishmentEvent;
use tribunal_application::ports::outgoing::network_forwarder::NetworkForwarderPort;

/// Forwarder for a node with no peers. This process is the whole
/// network, so it owns the routing context and forwarding is a log
/// line; a proxy-attached deployment swaps in a real transport here.
pub struct SingleNodeForwarder {
    routing_available: bool,
}

impl SingleNodeForwarder {
    pub fn new(routing_available: bool) -> Self {
        Self { routing_available }
    }
}

impl NetworkForwarderPort for SingleNodeForwarder {
    fn routing_available(&self) -> bool {
        self.routing_available
    }

    fn forward_punishment(&self, event: &PunishmentEvent) {
        debug!(?event, "no peers to forward punishment to");
    }

    fn forward_commands(&self, commands: &[String]) {
        debug!(?commands, "no peers to forward commands to");
    }
}
