use tracing::debug;

use crate::types::HubEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&[HubEvent])>;

/// Observers of hub push-event batches.
///
/// Handlers run in subscription order on the dispatching thread.
#[derive(Default)]
pub struct EventRegistry {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Handler)>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&[HubEvent]) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        debug!(subscription = id.0, "hub event handler subscribed");
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(existing, _)| *existing != id);
        let removed = self.handlers.len() != before;
        if removed {
            debug!(subscription = id.0, "hub event handler unsubscribed");
        }
        removed
    }

    pub fn dispatch(&mut self, events: &[HubEvent]) {
        if events.is_empty() {
            return;
        }
        for (_, handler) in self.handlers.iter_mut() {
            handler(events);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
