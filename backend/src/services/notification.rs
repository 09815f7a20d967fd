//! Live order-status notifications
//!
//! A process-wide broadcast hub. The order service publishes one event per
//! audited transition; every connected WebSocket client holds a receiver.
//! There is no replay: a client that lags past the buffer skips events.

use serde::Serialize;
use shared::models::OrderStatusEvent;
use tokio::sync::broadcast;

/// Buffered events per subscriber before it starts lagging
const BROADCAST_CAPACITY: usize = 256;

/// Event name clients listen for
pub const ORDER_STATUS_UPDATE: &str = "orderStatusUpdate";

/// Wire envelope sent to subscribers
#[derive(Debug, Clone, Serialize)]
pub struct LiveEnvelope<'a> {
    pub event: &'a str,
    pub data: &'a OrderStatusEvent,
}

impl<'a> LiveEnvelope<'a> {
    pub fn order_status(data: &'a OrderStatusEvent) -> Self {
        Self {
            event: ORDER_STATUS_UPDATE,
            data,
        }
    }
}

#[derive(Clone)]
pub struct OrderEventHub {
    tx: broadcast::Sender<OrderStatusEvent>,
}

impl Default for OrderEventHub {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx }
    }
}

impl OrderEventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish to all current subscribers. Returns how many received it.
    pub fn publish(&self, event: OrderStatusEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                tracing::debug!("No live subscribers for order status event");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderStatusEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(order_number: &str) -> OrderStatusEvent {
        OrderStatusEvent {
            order_number: order_number.to_string(),
            message: "Order (0001) status automatically updated to Received".to_string(),
            timestamp: Utc::now(),
            operator_id: "op".to_string(),
            operator_name: "Vendor".to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_fans_out_to_every_subscriber() {
        let hub = OrderEventHub::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        assert_eq!(hub.publish(event("250100001")), 2);

        assert_eq!(a.recv().await.unwrap().order_number, "250100001");
        assert_eq!(b.recv().await.unwrap().order_number, "250100001");
    }

    #[test]
    fn test_publish_without_subscribers_is_not_an_error() {
        let hub = OrderEventHub::new();
        assert_eq!(hub.publish(event("250100002")), 0);
    }

    #[test]
    fn test_late_subscriber_gets_no_replay() {
        let hub = OrderEventHub::new();
        let _early = hub.subscribe();
        hub.publish(event("250100003"));

        let mut late = hub.subscribe();
        assert!(matches!(
            late.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn test_envelope_shape() {
        let e = event("250100004");
        let json = serde_json::to_value(LiveEnvelope::order_status(&e)).unwrap();
        assert_eq!(json["event"], "orderStatusUpdate");
        assert_eq!(json["data"]["orderNumber"], "250100004");
        assert_eq!(json["data"]["operatorName"], "Vendor");
    }

    #[test]
    fn test_recv_with_tokio_test() {
        let hub = OrderEventHub::new();
        let mut rx = hub.subscribe();
        hub.publish(event("250100005"));
        let got = tokio_test::block_on(rx.recv()).unwrap();
        assert_eq!(got.order_number, "250100005");
    }
}
