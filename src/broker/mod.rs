// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-process topic-routed message broker.
//!
//! Durable-semantics transport for catalog change events: a named topic
//! exchange routes each published message to every queue whose binding
//! pattern matches the routing key. Consumers own *exclusive, auto-named*
//! queues scoped to their [`Connection`]; closing the connection deletes its
//! queues, so each logical consumer instance sees its own copy of the stream.
//!
//! Delivery is at-least-once: messages stay on an in-flight ledger until
//! acked, and nacked or abandoned deliveries come back marked `redelivered`.
//!
//! ```
//! use bytes::Bytes;
//! use catalog_sync::broker::{Broker, ExchangeKind};
//!
//! let broker = std::sync::Arc::new(Broker::default());
//! let rt = tokio::runtime::Runtime::new().expect("rt");
//! rt.block_on(async {
//!     broker
//!         .declare_exchange("product_exchange", ExchangeKind::Topic, true)
//!         .expect("declare");
//!     let conn = broker.connect();
//!     let queue = conn.declare_exclusive_queue().expect("queue");
//!     queue.bind("product_exchange", "product.*").expect("bind");
//!
//!     broker
//!         .publish("product_exchange", "product.created", Bytes::from_static(b"{}"))
//!         .expect("publish");
//!     let delivery = queue.recv().await.expect("recv");
//!     assert_eq!(delivery.routing_key, "product.created");
//!     queue.ack(delivery.delivery_tag);
//! });
//! ```

mod queue;
mod topic;

pub use queue::Delivery;
pub use topic::TopicPattern;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::debug;
use uuid::Uuid;

use crate::metrics;
use queue::MessageQueue;

pub type Result<T> = std::result::Result<T, BrokerError>;

#[derive(thiserror::Error, Debug)]
pub enum BrokerError {
    #[error("exchange not found: {0}")]
    ExchangeNotFound(String),
    #[error("exchange '{name}' already declared as {existing:?}, requested {requested:?}")]
    ExchangeKindMismatch {
        name: String,
        existing: ExchangeKind,
        requested: ExchangeKind,
    },
    #[error("exchange '{0}' already declared with different durability")]
    ExchangeDurabilityMismatch(String),
    #[error("connection closed")]
    ConnectionClosed,
}

/// Exchange routing discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    /// Pattern routing on dot-separated keys (`*`, `#` wildcards).
    Topic,
    /// Exact routing-key equality.
    Direct,
}

#[derive(Debug)]
struct ExchangeState {
    kind: ExchangeKind,
    durable: bool,
    // Bindings hold weak queue refs; dead entries are pruned on publish.
    bindings: Mutex<Vec<Binding>>,
}

#[derive(Debug)]
struct Binding {
    pattern: TopicPattern,
    queue: Weak<MessageQueue>,
}

/// In-process broker: exchange registry plus queue lifecycle.
///
/// One instance per process, shared via `Arc` between the publisher side and
/// every consumer connection.
#[derive(Debug)]
pub struct Broker {
    exchanges: RwLock<HashMap<String, Arc<ExchangeState>>>,
    // Per-queue ready-buffer capacity.
    queue_capacity: usize,
}

const DEFAULT_QUEUE_CAPACITY: usize = 1024;

impl Default for Broker {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl Broker {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            exchanges: RwLock::new(HashMap::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Declare an exchange. Re-declaring with identical parameters is a
    /// no-op; declaring an existing name with a different kind is an error.
    pub fn declare_exchange(&self, name: &str, kind: ExchangeKind, durable: bool) -> Result<()> {
        let mut exchanges = self.exchanges.write();
        if let Some(existing) = exchanges.get(name) {
            if existing.kind != kind {
                return Err(BrokerError::ExchangeKindMismatch {
                    name: name.to_string(),
                    existing: existing.kind,
                    requested: kind,
                });
            }
            if existing.durable != durable {
                return Err(BrokerError::ExchangeDurabilityMismatch(name.to_string()));
            }
            return Ok(());
        }
        exchanges.insert(
            name.to_string(),
            Arc::new(ExchangeState {
                kind,
                durable,
                bindings: Mutex::new(Vec::new()),
            }),
        );
        debug!(exchange = %name, ?kind, durable, "exchange declared");
        Ok(())
    }

    /// Open a connection. Exclusive queues declared on it live exactly as
    /// long as the connection.
    pub fn connect(self: &Arc<Self>) -> Connection {
        Connection {
            broker: Arc::clone(self),
            queues: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Publish a message to an exchange.
    ///
    /// Returns the number of queues the message was routed to. Zero matched
    /// bindings is not an error; the message is simply dropped, as a topic
    /// exchange does.
    pub fn publish(&self, exchange: &str, routing_key: &str, payload: Bytes) -> Result<usize> {
        let state = self
            .exchanges
            .read()
            .get(exchange)
            .cloned()
            .ok_or_else(|| BrokerError::ExchangeNotFound(exchange.to_string()))?;

        let mut routed = 0;
        let mut bindings = state.bindings.lock();
        bindings.retain(|binding| {
            let Some(queue) = binding.queue.upgrade() else {
                return false;
            };
            let matched = match state.kind {
                ExchangeKind::Topic => binding.pattern.matches(routing_key),
                ExchangeKind::Direct => binding.pattern.as_str() == routing_key,
            };
            if matched && queue.enqueue(routing_key, payload.clone()) {
                routed += 1;
            }
            true
        });
        drop(bindings);

        metrics::record_publish(exchange, routed);
        Ok(routed)
    }

    fn bind_queue(&self, exchange: &str, pattern: &str, queue: &Arc<MessageQueue>) -> Result<()> {
        let state = self
            .exchanges
            .read()
            .get(exchange)
            .cloned()
            .ok_or_else(|| BrokerError::ExchangeNotFound(exchange.to_string()))?;
        state.bindings.lock().push(Binding {
            pattern: TopicPattern::new(pattern),
            queue: Arc::downgrade(queue),
        });
        debug!(exchange = %exchange, pattern = %pattern, queue = %queue.name(), "queue bound");
        Ok(())
    }
}

/// A consumer-side connection owning exclusive queues.
///
/// Dropping (or closing) the connection closes every queue declared on it,
/// which unbinds them from their exchanges and discards buffered messages —
/// the auto-delete semantics of an exclusive queue.
#[derive(Debug)]
pub struct Connection {
    broker: Arc<Broker>,
    queues: Mutex<Vec<Arc<MessageQueue>>>,
    closed: AtomicBool,
}

impl Connection {
    /// Declare an exclusive queue with an auto-generated name.
    pub fn declare_exclusive_queue(&self) -> Result<QueueHandle> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BrokerError::ConnectionClosed);
        }
        let name = format!("amq.gen-{}", Uuid::new_v4().simple());
        let queue = Arc::new(MessageQueue::new(name, self.broker.queue_capacity));
        self.queues.lock().push(Arc::clone(&queue));
        Ok(QueueHandle {
            broker: Arc::clone(&self.broker),
            queue,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the connection and delete its exclusive queues.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for queue in self.queues.lock().drain(..) {
            queue.close();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Handle to an exclusive queue: bind, consume, settle.
#[derive(Debug)]
pub struct QueueHandle {
    broker: Arc<Broker>,
    queue: Arc<MessageQueue>,
}

impl QueueHandle {
    pub fn name(&self) -> &str {
        self.queue.name()
    }

    /// Bind this queue to an exchange with a topic pattern.
    pub fn bind(&self, exchange: &str, pattern: &str) -> Result<()> {
        self.broker.bind_queue(exchange, pattern, &self.queue)
    }

    /// Await the next delivery. `None` after the owning connection closes.
    pub async fn recv(&self) -> Option<Delivery> {
        self.queue.recv().await
    }

    /// Acknowledge successful processing.
    pub fn ack(&self, delivery_tag: u64) {
        if self.queue.ack(delivery_tag) {
            metrics::record_delivery_settled("ack");
        }
    }

    /// Negative-acknowledge; with `requeue` the message is redelivered.
    pub fn nack(&self, delivery_tag: u64, requeue: bool) {
        if self.queue.nack(delivery_tag, requeue) {
            metrics::record_delivery_settled(if requeue { "nack_requeue" } else { "reject" });
        }
    }

    /// Reject without redelivery (permanent failure).
    pub fn reject(&self, delivery_tag: u64) {
        self.nack(delivery_tag, false);
    }

    /// Return all unacked deliveries to the ready buffer.
    pub fn recover_unacked(&self) {
        self.queue.requeue_unacked();
    }
}

/// Bounded pool of publish channels over one broker.
///
/// Channel acquisition is semaphore-bounded so a burst of in-flight requests
/// cannot open unbounded broker resources. The pool is process-wide: created
/// once at startup and shared by every request handler.
#[derive(Debug, Clone)]
pub struct ChannelPool {
    broker: Arc<Broker>,
    permits: Arc<Semaphore>,
}

impl ChannelPool {
    pub fn new(broker: Arc<Broker>, size: usize) -> Self {
        Self {
            broker,
            permits: Arc::new(Semaphore::new(size.max(1))),
        }
    }

    /// Acquire a channel, waiting if the pool is exhausted.
    pub async fn acquire(&self) -> Result<Channel<'_>> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| BrokerError::ConnectionClosed)?;
        Ok(Channel {
            broker: Arc::clone(&self.broker),
            _permit: permit,
        })
    }
}

/// A borrowed publish channel; releases its pool slot on drop.
#[derive(Debug)]
pub struct Channel<'a> {
    broker: Arc<Broker>,
    _permit: SemaphorePermit<'a>,
}

impl Channel<'_> {
    pub fn declare_exchange(&self, name: &str, kind: ExchangeKind, durable: bool) -> Result<()> {
        self.broker.declare_exchange(name, kind, durable)
    }

    pub fn publish(&self, exchange: &str, routing_key: &str, payload: Bytes) -> Result<usize> {
        self.broker.publish(exchange, routing_key, payload)
    }
}
