use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use devlog_types::events::RealtimeEvent;

/// Events buffered per subscriber before a slow connection starts skipping.
const CHANNEL_CAPACITY: usize = 1024;

/// Process-wide fan-out of realtime events to every open connection.
///
/// Delivery is best-effort: no acknowledgement, no replay for subscribers that
/// join after an event was sent.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<RealtimeEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    /// Subscribe to realtime events. Each open connection holds one receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all current subscribers.
    /// Returns how many subscribers it was handed to.
    pub fn broadcast(&self, event: RealtimeEvent) -> usize {
        let kind = event.kind();
        match self.inner.broadcast_tx.send(event) {
            Ok(receivers) => {
                debug!("{} broadcast to {} connections", kind, receivers);
                receivers
            }
            Err(_) => {
                debug!("{} dropped, nobody connected", kind);
                0
            }
        }
    }

    pub fn connection_count(&self) -> usize {
        self.inner.broadcast_tx.receiver_count()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devlog_types::events::CommentBroadcast;

    fn comment(text: &str) -> RealtimeEvent {
        RealtimeEvent::ReceiveComment(CommentBroadcast {
            post_id: 1,
            username: "ola".into(),
            text: text.into(),
            date: "1:00:00 PM".into(),
        })
    }

    #[test]
    fn every_subscriber_receives_the_event() {
        let dispatcher = Dispatcher::new();
        let mut a = dispatcher.subscribe();
        let mut b = dispatcher.subscribe();
        assert_eq!(dispatcher.connection_count(), 2);

        assert_eq!(dispatcher.broadcast(comment("hello")), 2);
        assert_eq!(a.try_recv().unwrap(), comment("hello"));
        assert_eq!(b.try_recv().unwrap(), comment("hello"));
    }

    #[test]
    fn broadcast_without_subscribers_is_dropped() {
        let dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.broadcast(comment("into the void")), 0);
    }

    #[test]
    fn late_subscriber_gets_no_replay() {
        let dispatcher = Dispatcher::new();
        let _early = dispatcher.subscribe();
        dispatcher.broadcast(comment("before"));

        let mut late = dispatcher.subscribe();
        assert!(late.try_recv().is_err());

        dispatcher.broadcast(comment("after"));
        assert_eq!(late.try_recv().unwrap(), comment("after"));
    }

    #[test]
    fn dropped_receiver_stops_counting() {
        let dispatcher = Dispatcher::new();
        let rx = dispatcher.subscribe();
        drop(rx);
        assert_eq!(dispatcher.connection_count(), 0);
    }
}
