//! Change-notification fan-out.
//!
//! Every committed Join/Submit/Cancel/Redeem publishes a [`SessionEvent`]
//! on a broadcast channel. Subscribers (the server's WebSocket layer, test
//! harnesses) receive a copy each; publishing never blocks and dropping
//! behind slow subscribers only affects those subscribers.

use serde::Serialize;
use tokio::sync::broadcast;

/// Default buffer size for the broadcast channel.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// A state change observers may care about.
///
/// Events are emitted after the owning transaction commits, so a received
/// event always describes durable state.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionCreated {
        session_id: i64,
        game_kind: String,
        entry_fee: i64,
        capacity: i32,
    },
    ParticipantJoined {
        session_id: i64,
        entry_id: i64,
        user_id: i64,
        entry_count: i32,
        capacity: i32,
    },
    ScoreSubmitted {
        session_id: i64,
        entry_id: i64,
        qualified: bool,
        scored_entries: i32,
        capacity: i32,
    },
    SessionCompleted {
        session_id: i64,
        winner_user_id: Option<i64>,
        winning_score: Option<i64>,
        prize_pool: i64,
    },
    SessionCancelled {
        session_id: i64,
        refunded_entries: usize,
    },
    CodeRedeemed {
        session_id: i64,
        merchant_id: String,
        amount: i64,
    },
}

/// Broadcast handle for session events. Cheap to clone; every manager that
/// mutates state holds one.
#[derive(Clone)]
pub struct SessionNotifier {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionNotifier {
    /// Create a notifier with the given channel buffer.
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer);
        Self { tx }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. A send with no subscribers is not an error.
    pub fn publish(&self, event: SessionEvent) {
        log::debug!("session event: {event:?}");
        let _ = self.tx.send(event);
    }

    /// Number of currently connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SessionNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_receives_published_event() {
        let notifier = SessionNotifier::default();
        let mut rx = notifier.subscribe();

        notifier.publish(SessionEvent::SessionCancelled {
            session_id: 7,
            refunded_entries: 2,
        });

        match rx.recv().await.expect("event should arrive") {
            SessionEvent::SessionCancelled {
                session_id,
                refunded_entries,
            } => {
                assert_eq!(session_id, 7);
                assert_eq!(refunded_entries, 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let notifier = SessionNotifier::new(8);
        assert_eq!(notifier.subscriber_count(), 0);
        notifier.publish(SessionEvent::SessionCreated {
            session_id: 1,
            game_kind: "brick_breaker".to_string(),
            entry_fee: 100,
            capacity: 4,
        });
    }
}
