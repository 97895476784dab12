use std::sync::RwLock;

use tokio::sync::broadcast::Sender;
use tracing::debug;

use domain::events::{PreEvent, PunishmentEvent};
use tribunal_application::ports::outgoing::events::EventsPort;

pub type VetoHook = Box<dyn Fn(&PreEvent) -> bool + Send + Sync>;

/// Event bus: post-events fan out over a tokio broadcast channel,
/// pre-events run through registered veto hooks synchronously.
pub struct TokioBroadcastEventsAdapter {
    tx: Sender<PunishmentEvent>,
    veto_hooks: RwLock<Vec<VetoHook>>,
}

impl TokioBroadcastEventsAdapter {
    pub fn new(tx: Sender<PunishmentEvent>) -> Self {
        Self {
            tx,
            veto_hooks: RwLock::new(Vec::new()),
        }
    }

    pub fn register_veto_hook(&self, hook: VetoHook) {
        if let Ok(mut hooks) = self.veto_hooks.write() {
            hooks.push(hook);
        }
    }
}

impl EventsPort for TokioBroadcastEventsAdapter {
    fn pre(&self, event: &PreEvent) -> bool {
        match self.veto_hooks.read() {
            Ok(hooks) => hooks.iter().all(|hook| hook(event)),
            // A poisoned hook list cannot veto anything.
            Err(_) => true,
        }
    }

    fn publish(&self, event: PunishmentEvent) {
        // No receivers is the normal case on an idle node.
        if self.tx.send(event).is_err() {
            debug!("punishment event dropped, no listeners");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::punishment::{Identity, PunishmentKind};
    use tokio::sync::broadcast;

    fn sample_pre_event() -> PreEvent {
        PreEvent::Punish {
            kind: PunishmentKind::Ban,
            target: Identity::Player("alice".to_string()),
            staff: "admin".to_string(),
            reason: None,
            scope: None,
            global: false,
        }
    }

    #[test]
    fn pre_events_pass_without_hooks() {
        let (tx, _rx) = broadcast::channel(4);
        let adapter = TokioBroadcastEventsAdapter::new(tx);
        assert!(adapter.pre(&sample_pre_event()));
    }

    #[test]
    fn any_hook_can_veto() {
        let (tx, _rx) = broadcast::channel(4);
        let adapter = TokioBroadcastEventsAdapter::new(tx);
        adapter.register_veto_hook(Box::new(|_| true));
        adapter.register_veto_hook(Box::new(|event| {
            !matches!(event, PreEvent::Punish { global: false, .. })
        }));
        assert!(!adapter.pre(&sample_pre_event()));
    }

    #[tokio::test]
    async fn post_events_reach_subscribers() {
        let (tx, mut rx) = broadcast::channel(4);
        let adapter = TokioBroadcastEventsAdapter::new(tx);
        adapter.publish(PunishmentEvent::BanwaveStarted { pending: 3 });
        match rx.recv().await {
            Ok(PunishmentEvent::BanwaveStarted { pending }) => assert_eq!(pending, 3),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
