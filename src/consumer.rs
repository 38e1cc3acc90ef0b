// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Index consumer: applies catalog change events to the search index.
//!
//! The consumer owns an exclusive queue bound to `product.*` and runs a
//! reconnecting session loop:
//!
//! ```text
//! Disconnected -> Connecting -> Bound -> Consuming
//!       ^                                   |
//!       +------- session lost (backoff) ----+
//! ```
//!
//! Settlement rules:
//! - successful index apply: ack
//! - index backend failure: nack with requeue (transient, redelivered)
//! - unknown operation or undecodable payload: reject (permanent)
//!
//! Index applies are idempotent by identity, so redelivery after a crash or
//! nack converges to the same index state.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::broker::{Broker, BrokerError, Connection, Delivery, ExchangeKind, QueueHandle};
use crate::config::PipelineConfig;
use crate::event::{decode_record, decode_tombstone, ChangeOp, EventError};
use crate::metrics;
use crate::resilience::RetryConfig;
use crate::store::SearchIndexStore;

/// Observable consumer lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Disconnected,
    Connecting,
    Bound,
    Consuming,
    Stopped,
}

impl ConsumerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumerState::Disconnected => "disconnected",
            ConsumerState::Connecting => "connecting",
            ConsumerState::Bound => "bound",
            ConsumerState::Consuming => "consuming",
            ConsumerState::Stopped => "stopped",
        }
    }
}

struct Session {
    // Keeps the exclusive queue alive; dropping it deletes the queue.
    _connection: Connection,
    queue: QueueHandle,
}

pub struct IndexConsumer {
    broker: Arc<Broker>,
    index: Arc<dyn SearchIndexStore>,
    exchange: String,
    binding: String,
    reconnect: RetryConfig,
    state_tx: watch::Sender<ConsumerState>,
}

impl IndexConsumer {
    pub fn new(
        broker: Arc<Broker>,
        index: Arc<dyn SearchIndexStore>,
        config: &PipelineConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConsumerState::Disconnected);
        Self {
            broker,
            index,
            exchange: config.exchange_name.clone(),
            binding: config.binding_pattern.clone(),
            reconnect: RetryConfig::daemon(),
            state_tx,
        }
    }

    /// Subscribe to lifecycle state changes.
    pub fn state(&self) -> watch::Receiver<ConsumerState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: ConsumerState) {
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed {
            debug!(state = state.as_str(), "consumer state changed");
            metrics::set_consumer_state(state.as_str());
        }
    }

    /// Run until `shutdown` flips to true. Session loss is handled with
    /// unbounded backoff; the consumer never gives up on its own.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut delay = self.reconnect.initial_delay;

        loop {
            if *shutdown.borrow() {
                break;
            }
            self.set_state(ConsumerState::Connecting);

            let session = match self.open_session().await {
                Ok(session) => session,
                Err(e) => {
                    warn!(error = %e, next_delay = ?delay, "session setup failed");
                    self.set_state(ConsumerState::Disconnected);
                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = shutdown.changed() => {}
                    }
                    delay = delay.mul_f64(self.reconnect.factor).min(self.reconnect.max_delay);
                    continue;
                }
            };
            self.set_state(ConsumerState::Bound);

            if let Err(e) = self.index.ensure_index().await {
                warn!(error = %e, next_delay = ?delay, "search index unavailable");
                self.set_state(ConsumerState::Disconnected);
                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = shutdown.changed() => {}
                }
                delay = delay.mul_f64(self.reconnect.factor).min(self.reconnect.max_delay);
                continue;
            }

            info!(queue = %session.queue.name(), binding = %self.binding, "consuming");
            self.set_state(ConsumerState::Consuming);
            delay = self.reconnect.initial_delay;

            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            self.set_state(ConsumerState::Stopped);
                            return;
                        }
                    }
                    delivery = session.queue.recv() => match delivery {
                        Some(delivery) => self.process(&session.queue, delivery).await,
                        None => {
                            warn!("queue closed, reconnecting");
                            break;
                        }
                    }
                }
            }
            self.set_state(ConsumerState::Disconnected);
        }
        self.set_state(ConsumerState::Stopped);
    }

    async fn open_session(&self) -> Result<Session, BrokerError> {
        self.broker
            .declare_exchange(&self.exchange, ExchangeKind::Topic, true)?;
        let connection = self.broker.connect();
        let queue = connection.declare_exclusive_queue()?;
        queue.bind(&self.exchange, &self.binding)?;
        Ok(Session {
            _connection: connection,
            queue,
        })
    }

    async fn process(&self, queue: &QueueHandle, delivery: Delivery) {
        let tag = delivery.delivery_tag;
        let op = match ChangeOp::from_routing_key(&delivery.routing_key) {
            Ok(op) => op,
            Err(EventError::UnknownOperation(op)) => {
                error!(routing_key = %delivery.routing_key, "unknown operation, rejecting");
                metrics::record_event_processed(&op, "rejected");
                queue.reject(tag);
                return;
            }
            Err(e) => {
                error!(routing_key = %delivery.routing_key, error = %e, "rejecting");
                queue.reject(tag);
                return;
            }
        };

        match op {
            ChangeOp::Created | ChangeOp::Updated => {
                let record = match decode_record(&delivery.payload) {
                    Ok(record) => record,
                    Err(e) => {
                        // Malformed payloads never become valid; don't requeue
                        error!(routing_key = %delivery.routing_key, error = %e, "undecodable payload, rejecting");
                        metrics::record_event_processed(op.as_str(), "rejected");
                        queue.reject(tag);
                        return;
                    }
                };
                match self.index.upsert(&record).await {
                    Ok(()) => {
                        debug!(product_id = %record.id, op = op.as_str(), redelivered = delivery.redelivered, "indexed");
                        metrics::record_index_apply("upsert", "success");
                        metrics::record_event_processed(op.as_str(), "success");
                        queue.ack(tag);
                    }
                    Err(e) => {
                        warn!(product_id = %record.id, error = %e, "index upsert failed, requeueing");
                        metrics::record_index_apply("upsert", "error");
                        metrics::record_event_processed(op.as_str(), "error");
                        queue.nack(tag, true);
                    }
                }
            }
            ChangeOp::Deleted => {
                let tombstone = match decode_tombstone(&delivery.payload) {
                    Ok(tombstone) => tombstone,
                    Err(e) => {
                        error!(routing_key = %delivery.routing_key, error = %e, "undecodable tombstone, rejecting");
                        metrics::record_event_processed(op.as_str(), "rejected");
                        queue.reject(tag);
                        return;
                    }
                };
                match self.index.remove(&tombstone.id).await {
                    Ok(()) => {
                        debug!(product_id = %tombstone.id, redelivered = delivery.redelivered, "deindexed");
                        metrics::record_index_apply("delete", "success");
                        metrics::record_event_processed(op.as_str(), "success");
                        queue.ack(tag);
                    }
                    Err(e) => {
                        warn!(product_id = %tombstone.id, error = %e, "index delete failed, requeueing");
                        metrics::record_index_apply("delete", "error");
                        metrics::record_event_processed(op.as_str(), "error");
                        queue.nack(tag, true);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ChangeEvent;
    use crate::product::ProductRecord;
    use crate::store::{MemoryIndex, StorageError};
    use crate::search::{SearchRequest, SearchResults};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn record(id: &str) -> ProductRecord {
        ProductRecord {
            id: id.to_string(),
            name: "Widget".to_string(),
            description: None,
            price: 9.99,
            category: None,
            tags: vec![],
            quantity: 1,
            images: vec![],
        }
    }

    struct Harness {
        broker: Arc<Broker>,
        index: Arc<dyn SearchIndexStore>,
        shutdown: watch::Sender<bool>,
        state: watch::Receiver<ConsumerState>,
        handle: tokio::task::JoinHandle<()>,
    }

    impl Harness {
        async fn start(index: Arc<dyn SearchIndexStore>) -> Self {
            let broker = Arc::new(Broker::default());
            let config = PipelineConfig::default();
            let consumer = Arc::new(IndexConsumer::new(
                Arc::clone(&broker),
                Arc::clone(&index),
                &config,
            ));
            let mut state = consumer.state();
            let (shutdown, shutdown_rx) = watch::channel(false);
            let handle = tokio::spawn({
                let consumer = Arc::clone(&consumer);
                async move { consumer.run(shutdown_rx).await }
            });
            state
                .wait_for(|s| *s == ConsumerState::Consuming)
                .await
                .unwrap();
            Self {
                broker,
                index,
                shutdown,
                state,
                handle,
            }
        }

        fn publish(&self, op: ChangeOp, record: &ProductRecord) {
            let event = ChangeEvent::from_record(op, record).unwrap();
            self.broker
                .publish("product_exchange", &event.routing_key, event.body)
                .unwrap();
        }

        async fn wait_for_count(&self, expected: usize) {
            for _ in 0..200 {
                if self.index.count().await.unwrap() == expected {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            panic!(
                "index never reached {} documents (at {})",
                expected,
                self.index.count().await.unwrap()
            );
        }

        async fn stop(mut self) {
            self.shutdown.send(true).unwrap();
            self.handle.await.unwrap();
            self.state
                .wait_for(|s| *s == ConsumerState::Stopped)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn happy_created_event_is_indexed() {
        let index = Arc::new(MemoryIndex::new());
        let harness = Harness::start(index.clone()).await;

        harness.publish(ChangeOp::Created, &record("P1"));
        harness.wait_for_count(1).await;
        harness.stop().await;
    }

    #[tokio::test]
    async fn happy_duplicate_events_converge() {
        let index = Arc::new(MemoryIndex::new());
        let harness = Harness::start(index.clone()).await;

        // At-least-once delivery: the same event applied twice is harmless
        harness.publish(ChangeOp::Created, &record("P1"));
        harness.publish(ChangeOp::Created, &record("P1"));
        harness.publish(ChangeOp::Updated, &record("P2"));
        harness.wait_for_count(2).await;
        harness.stop().await;
    }

    #[tokio::test]
    async fn happy_delete_event_removes_document() {
        let index = Arc::new(MemoryIndex::new());
        index.upsert(&record("P1")).await.unwrap();
        let harness = Harness::start(index.clone()).await;

        harness.publish(ChangeOp::Deleted, &record("P1"));
        harness.wait_for_count(0).await;

        // Deleting an already-absent document converges too
        harness.publish(ChangeOp::Deleted, &record("P1"));
        harness.publish(ChangeOp::Created, &record("P2"));
        harness.wait_for_count(1).await;
        harness.stop().await;
    }

    #[tokio::test]
    async fn failure_unknown_operation_is_rejected_not_requeued() {
        let index = Arc::new(MemoryIndex::new());
        let harness = Harness::start(index.clone()).await;

        harness
            .broker
            .publish(
                "product_exchange",
                "product.archived",
                Bytes::from_static(b"{}"),
            )
            .unwrap();
        // A later valid event still flows; the rejected one is gone for good
        harness.publish(ChangeOp::Created, &record("P1"));
        harness.wait_for_count(1).await;
        harness.stop().await;
    }

    #[tokio::test]
    async fn failure_malformed_payload_is_rejected() {
        let index = Arc::new(MemoryIndex::new());
        let harness = Harness::start(index.clone()).await;

        harness
            .broker
            .publish(
                "product_exchange",
                "product.created",
                Bytes::from_static(b"not json"),
            )
            .unwrap();
        harness.publish(ChangeOp::Created, &record("P1"));
        harness.wait_for_count(1).await;
        harness.stop().await;
    }

    struct FlakyIndex {
        inner: MemoryIndex,
        failures_left: AtomicUsize,
    }

    impl FlakyIndex {
        fn new(failures: usize) -> Self {
            Self {
                inner: MemoryIndex::new(),
                failures_left: AtomicUsize::new(failures),
            }
        }

        fn fail_next(&self) -> bool {
            self.failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }
    }

    #[async_trait]
    impl SearchIndexStore for FlakyIndex {
        async fn ensure_index(&self) -> Result<(), StorageError> {
            self.inner.ensure_index().await
        }
        async fn upsert(&self, record: &ProductRecord) -> Result<(), StorageError> {
            if self.fail_next() {
                return Err(StorageError::Backend("index briefly down".into()));
            }
            self.inner.upsert(record).await
        }
        async fn remove(&self, id: &str) -> Result<(), StorageError> {
            self.inner.remove(id).await
        }
        async fn search(&self, request: &SearchRequest) -> Result<SearchResults, StorageError> {
            self.inner.search(request).await
        }
        async fn count(&self) -> Result<usize, StorageError> {
            self.inner.count().await
        }
    }

    #[tokio::test]
    async fn failure_transient_index_error_redelivers_until_applied() {
        let index = Arc::new(FlakyIndex::new(2));
        let harness = Harness::start(index.clone()).await;

        harness.publish(ChangeOp::Created, &record("P1"));
        harness.wait_for_count(1).await;
        harness.stop().await;
    }

    #[tokio::test]
    async fn happy_shutdown_reaches_stopped_state() {
        let index = Arc::new(MemoryIndex::new());
        let harness = Harness::start(index.clone()).await;
        harness.stop().await;
    }
}
