//! Typed state-transition events emitted by the wave, reservation and
//! addressing state machines once their transaction has committed.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{PickingOrderStatus, WaveItemStatus, WaveStatus};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a bounded channel and returns the sender half wrapped.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Sends an event without waiting for channel capacity.
    pub fn send(&self, event: Event) -> Result<(), String> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(event) => format!("event channel full, dropped {}", event.name()),
            TrySendError::Closed(event) => {
                format!("event channel closed, dropped {}", event.name())
            }
        })
    }

    /// Publishes events produced by a committed transaction. Delivery failures
    /// are logged; the business operation has already succeeded.
    pub fn publish_all(&self, events: Vec<Event>) {
        for event in events {
            if let Err(e) = self.send(event) {
                warn!(error = %e, "failed to publish state-transition event");
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    WaveCreated {
        wave_id: Uuid,
        wave_number: String,
        tenant_id: Uuid,
        order_count: usize,
        created_by: String,
    },
    WaveStatusChanged {
        wave_id: Uuid,
        from: WaveStatus,
        to: WaveStatus,
        actor: Option<String>,
    },
    WaveDeleted {
        wave_id: Uuid,
        wave_number: String,
    },
    WaveItemPicked {
        wave_id: Uuid,
        wave_item_id: Uuid,
        quantity: i32,
        picked_quantity: i32,
        status: WaveItemStatus,
    },
    WaveItemAdjusted {
        wave_id: Uuid,
        wave_item_id: Uuid,
        old_picked_quantity: i32,
        new_picked_quantity: i32,
    },
    OrderStatusChanged {
        order_id: Uuid,
        wave_id: Option<Uuid>,
        to: PickingOrderStatus,
    },
    ReservationCorrected {
        inventory_id: Uuid,
        product_id: Uuid,
        old_reserved: i32,
        new_reserved: i32,
    },
    InventoryMoved {
        movement_id: Uuid,
        product_id: Uuid,
        from_location_id: Option<Uuid>,
        to_location_id: Uuid,
        quantity: i32,
    },
    PreallocationExecuted {
        preallocation_id: Uuid,
        receiving_order_id: Uuid,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::WaveCreated { .. } => "wave_created",
            Event::WaveStatusChanged { .. } => "wave_status_changed",
            Event::WaveDeleted { .. } => "wave_deleted",
            Event::WaveItemPicked { .. } => "wave_item_picked",
            Event::WaveItemAdjusted { .. } => "wave_item_adjusted",
            Event::OrderStatusChanged { .. } => "order_status_changed",
            Event::ReservationCorrected { .. } => "reservation_corrected",
            Event::InventoryMoved { .. } => "inventory_moved",
            Event::PreallocationExecuted { .. } => "preallocation_executed",
        }
    }
}

/// Drains the event channel and writes each transition to the structured log.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::WaveStatusChanged {
                wave_id,
                from,
                to,
                actor,
            } => {
                info!(
                    event = event.name(),
                    wave_id = %wave_id,
                    from = %from,
                    to = %to,
                    actor = actor.as_deref().unwrap_or("-"),
                    "wave transition"
                );
            }
            Event::OrderStatusChanged {
                order_id,
                wave_id,
                to,
            } => {
                info!(
                    event = event.name(),
                    order_id = %order_id,
                    wave_id = ?wave_id,
                    to = %to,
                    "order transition"
                );
            }
            other => match serde_json::to_string(other) {
                Ok(payload) => info!(event = other.name(), payload = %payload, "event"),
                Err(e) => warn!(event = other.name(), error = %e, "unserializable event"),
            },
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_all_delivers_in_order() {
        let (sender, mut rx) = EventSender::channel(4);
        let wave_id = Uuid::new_v4();
        sender.publish_all(vec![
            Event::WaveStatusChanged {
                wave_id,
                from: WaveStatus::Pending,
                to: WaveStatus::Picking,
                actor: None,
            },
            Event::WaveDeleted {
                wave_id,
                wave_number: "OS-20240101-0001".into(),
            },
        ]);

        assert_eq!(rx.recv().await.unwrap().name(), "wave_status_changed");
        assert_eq!(rx.recv().await.unwrap().name(), "wave_deleted");
    }

    #[test]
    fn full_channel_reports_instead_of_blocking() {
        let (sender, _rx) = EventSender::channel(1);
        let event = Event::PreallocationExecuted {
            preallocation_id: Uuid::nil(),
            receiving_order_id: Uuid::nil(),
        };
        assert!(sender.send(event.clone()).is_ok());
        let err = sender.send(event).unwrap_err();
        assert!(err.contains("full"));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(Event::WaveItemPicked {
            wave_id: Uuid::nil(),
            wave_item_id: Uuid::nil(),
            quantity: 2,
            picked_quantity: 5,
            status: WaveItemStatus::Picking,
        })
        .unwrap();
        assert_eq!(json["type"], "wave_item_picked");
        assert_eq!(json["status"], "picking");
    }
}
