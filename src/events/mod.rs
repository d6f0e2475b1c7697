//! Outbound schedule events.
//!
//! Every mutation of the schedule emits a best-effort event for the
//! push-notification transport, which lives outside this service. Events
//! are fire-and-forget: they are queued on an unbounded channel and
//! drained by a dispatcher task; a full or closed channel is logged and
//! never fails the operation that produced the event.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use classrota_models::UserId;

/// Kinds of outbound events, named as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    RoomAssigned,
    RoomUnassigned,
    StatsUpdated,
    ScheduleUpdated,
    ScheduleExceptionUpdated,
    ScheduleRequestCreated,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            EventKind::RoomAssigned => "room-assigned",
            EventKind::RoomUnassigned => "room-unassigned",
            EventKind::StatsUpdated => "stats-updated",
            EventKind::ScheduleUpdated => "schedule-updated",
            EventKind::ScheduleExceptionUpdated => "schedule-exception-updated",
            EventKind::ScheduleRequestCreated => "schedule-request-created",
        }
    }
}

/// An event as handed to the transport: the REST response payload plus
/// the target audience.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundEvent {
    pub event: EventKind,
    pub audience: Vec<UserId>,
    pub payload: serde_json::Value,
}

#[derive(Clone, Debug)]
pub struct EventPublisher {
    tx: mpsc::UnboundedSender<OutboundEvent>,
}

impl EventPublisher {
    /// Start the dispatcher task and return a publisher handle.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<OutboundEvent>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                // Transport boundary: the real push transport subscribes
                // here. Delivery problems are its concern, not ours.
                debug!(
                    event = event.event.name(),
                    audience = event.audience.len(),
                    "outbound event dispatched"
                );
            }
        });

        Self { tx }
    }

    /// Queue an event. Never fails the caller; serialization or channel
    /// errors are logged and dropped.
    pub fn publish<T: Serialize>(&self, event: EventKind, audience: Vec<UserId>, payload: &T) {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(err) => {
                warn!(event = event.name(), %err, "failed to serialize outbound event");
                return;
            }
        };

        if self
            .tx
            .send(OutboundEvent {
                event,
                audience,
                payload,
            })
            .is_err()
        {
            warn!(event = event.name(), "event dispatcher is gone, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_never_fails_the_caller() {
        let publisher = EventPublisher::spawn();
        publisher.publish(
            EventKind::RoomAssigned,
            vec![UserId::new()],
            &serde_json::json!({"schedule_id": "x"}),
        );
        // Even after the dispatcher is gone the publisher stays silent.
        drop(publisher.tx.clone());
    }

    #[test]
    fn event_names_match_the_wire_protocol() {
        assert_eq!(EventKind::RoomAssigned.name(), "room-assigned");
        assert_eq!(
            EventKind::ScheduleRequestCreated.name(),
            "schedule-request-created"
        );
        assert_eq!(
            serde_json::to_string(&EventKind::ScheduleExceptionUpdated).unwrap(),
            r#""schedule-exception-updated""#
        );
    }
}
