use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    /// Event delivery is best-effort; the triggering operation has already
    /// committed by the time the event is published.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping event: {}", e);
        }
    }
}

// The events the storefront can emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Coupon events
    CouponCreated(i64),
    CouponRedeemed {
        coupon_id: i64,
        code: String,
    },
    CouponApplied {
        cart_id: Uuid,
        code: String,
    },
    CouponRemoved {
        cart_id: Uuid,
    },

    // Booking events
    BookingCreated {
        booking_id: i64,
        provider_id: i64,
    },
    BookingCancelled(i64),

    // Cart events
    CartCreated(Uuid),
    CartItemAdded {
        cart_id: Uuid,
        product_id: i64,
    },
    CartItemRemoved {
        cart_id: Uuid,
        product_id: i64,
    },
}

/// Consumes events off the channel. Runs as a background task for the
/// lifetime of the process; the loop ends when every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::CouponRedeemed { coupon_id, code } => {
                info!(coupon_id, code, "Coupon redeemed");
            }
            Event::BookingCreated {
                booking_id,
                provider_id,
            } => {
                info!(booking_id, provider_id, "Booking created");
            }
            Event::BookingCancelled(booking_id) => {
                info!(booking_id, "Booking cancelled");
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    error!("Event channel closed; event processing loop terminated");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender.send(Event::CouponCreated(7)).await.unwrap();
        match rx.recv().await {
            Some(Event::CouponCreated(id)) => assert_eq!(id, 7),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        // Must not panic or return an error to the caller
        sender.send_or_log(Event::BookingCancelled(1)).await;
    }
}
