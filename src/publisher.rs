// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Fire-and-forget event publisher.
//!
//! Publishing is deliberately decoupled from the write path's success: a
//! mutation that reached the primary store is already committed, so a publish
//! failure is logged and dropped rather than surfaced to the caller. The
//! search index catches up on the next successful event for that identity.

use tracing::warn;

use crate::broker::{ChannelPool, ExchangeKind};
use crate::event::{ChangeEvent, ChangeOp};
use crate::metrics;
use crate::product::ProductRecord;

#[derive(Clone)]
pub struct EventPublisher {
    pool: ChannelPool,
    exchange: String,
}

impl EventPublisher {
    pub fn new(pool: ChannelPool, exchange: impl Into<String>) -> Self {
        Self {
            pool,
            exchange: exchange.into(),
        }
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Publish a change event, logging and dropping on any failure.
    pub async fn publish(&self, op: ChangeOp, record: &ProductRecord) {
        let event = match ChangeEvent::from_record(op, record) {
            Ok(event) => event,
            Err(e) => {
                warn!(product_id = %record.id, error = %e, "event serialization failed, dropping");
                metrics::record_publish_dropped(&self.exchange);
                return;
            }
        };

        let channel = match self.pool.acquire().await {
            Ok(channel) => channel,
            Err(e) => {
                warn!(routing_key = %event.routing_key, error = %e, "channel acquisition failed, dropping event");
                metrics::record_publish_dropped(&self.exchange);
                return;
            }
        };

        // The exchange is declared durable on every publish; a no-op once it
        // exists, and self-healing after a broker restart.
        let result = channel
            .declare_exchange(&self.exchange, ExchangeKind::Topic, true)
            .and_then(|()| channel.publish(&self.exchange, &event.routing_key, event.body));
        if let Err(e) = result {
            warn!(routing_key = %event.routing_key, error = %e, "publish failed, dropping event");
            metrics::record_publish_dropped(&self.exchange);
        }
    }

    /// Publish in the background, off the caller's latency path.
    pub fn spawn_publish(&self, op: ChangeOp, record: ProductRecord) {
        let publisher = self.clone();
        tokio::spawn(async move {
            publisher.publish(op, &record).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Broker;
    use std::sync::Arc;

    fn record() -> ProductRecord {
        ProductRecord {
            id: "P1".to_string(),
            name: "Widget".to_string(),
            description: None,
            price: 9.99,
            category: None,
            tags: vec![],
            quantity: 1,
            images: vec![],
        }
    }

    #[tokio::test]
    async fn happy_publish_reaches_bound_queue() {
        let broker = Arc::new(Broker::default());
        let pool = ChannelPool::new(Arc::clone(&broker), 4);
        let publisher = EventPublisher::new(pool, "product_exchange");

        // Consumer side binds before the first publish
        publisher.publish(ChangeOp::Created, &record()).await;
        let conn = broker.connect();
        let queue = conn.declare_exclusive_queue().unwrap();
        queue.bind("product_exchange", "product.*").unwrap();

        publisher.publish(ChangeOp::Updated, &record()).await;
        let delivery = queue.recv().await.unwrap();
        assert_eq!(delivery.routing_key, "product.updated");
    }

    #[tokio::test]
    async fn happy_publish_declares_exchange() {
        let broker = Arc::new(Broker::default());
        let pool = ChannelPool::new(Arc::clone(&broker), 4);
        let publisher = EventPublisher::new(pool, "product_exchange");

        // No declare beforehand; the publisher brings the exchange up
        publisher.publish(ChangeOp::Created, &record()).await;
        assert!(broker
            .declare_exchange("product_exchange", ExchangeKind::Topic, true)
            .is_ok());
    }

    #[tokio::test]
    async fn failure_publish_with_no_consumers_is_silent() {
        let broker = Arc::new(Broker::default());
        let pool = ChannelPool::new(broker, 4);
        let publisher = EventPublisher::new(pool, "product_exchange");

        // Routing to zero queues drops the event without error
        publisher.publish(ChangeOp::Deleted, &record()).await;
    }
}
