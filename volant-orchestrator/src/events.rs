//! The event bus. A single `vm-events` topic carrying `VmEvent`s over a
//! bounded broadcast channel, so a slow SSE client drops frames instead of
//! blocking publication.

use tokio::sync::broadcast;
use volant_core::event::VmEvent;

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<VmEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Fans `event` out to every live subscriber. A subscriber whose buffer
    /// is full silently misses it — `subscribe` callers that need every
    /// event should drain promptly.
    pub fn publish(&self, event: VmEvent) {
        // No receivers is not an error: publishing with nobody listening is
        // the common case before the first SSE client connects.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VmEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volant_core::event::VmEventType;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(VmEvent::new(VmEventType::Created, "web-1"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.vm_name, "web-1");
        assert_eq!(event.event_type, VmEventType::Created);
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(VmEvent::new(VmEventType::Stopped, "web-2"));
    }

    #[tokio::test]
    async fn multiple_subscribers_each_see_the_event() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(VmEvent::new(VmEventType::Running, "web-3"));

        assert_eq!(a.recv().await.unwrap().vm_name, "web-3");
        assert_eq!(b.recv().await.unwrap().vm_name, "web-3");
    }
}
