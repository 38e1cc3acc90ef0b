// Per-queue message state: ready buffer, in-flight ledger, ack/nack/reject.

use std::collections::{HashMap, VecDeque};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::warn;

use crate::metrics;

/// A message handed to a consumer, pending acknowledgment.
///
/// The delivery stays in the queue's in-flight ledger until the consumer
/// acks, nacks, or rejects it by tag. At-least-once: a nacked (or requeued)
/// delivery comes back with `redelivered = true`.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub delivery_tag: u64,
    pub routing_key: String,
    pub payload: Bytes,
    pub redelivered: bool,
}

#[derive(Debug)]
struct QueueState {
    // Messages awaiting delivery, in publish order. Tag 0 = unassigned.
    ready: VecDeque<Delivery>,
    // Delivered but not yet settled, keyed by delivery tag.
    in_flight: HashMap<u64, Delivery>,
    next_tag: u64,
    closed: bool,
}

/// Bounded FIFO message queue with an unacked-message ledger.
#[derive(Debug)]
pub(crate) struct MessageQueue {
    name: String,
    capacity: usize,
    state: Mutex<QueueState>,
    notify: Notify,
}

impl MessageQueue {
    pub(crate) fn new(name: String, capacity: usize) -> Self {
        Self {
            name,
            capacity,
            state: Mutex::new(QueueState {
                ready: VecDeque::new(),
                in_flight: HashMap::new(),
                next_tag: 1,
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Append a message. Returns false if the queue is full or closed; the
    /// newest message is the one dropped (admission policy: drop-new).
    pub(crate) fn enqueue(&self, routing_key: &str, payload: Bytes) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        if state.ready.len() >= self.capacity {
            warn!(queue = %self.name, capacity = self.capacity, "queue full, dropping message");
            metrics::record_queue_dropped(&self.name);
            return false;
        }
        state.ready.push_back(Delivery {
            delivery_tag: 0,
            routing_key: routing_key.to_string(),
            payload,
            redelivered: false,
        });
        drop(state);
        self.notify.notify_one();
        true
    }

    /// Await the next delivery. Returns `None` once the queue is closed and
    /// drained.
    pub(crate) async fn recv(&self) -> Option<Delivery> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock();
                if let Some(mut delivery) = state.ready.pop_front() {
                    let tag = state.next_tag;
                    state.next_tag += 1;
                    delivery.delivery_tag = tag;
                    state.in_flight.insert(tag, delivery.clone());
                    return Some(delivery);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Settle a delivery as processed. Returns false for an unknown tag.
    pub(crate) fn ack(&self, delivery_tag: u64) -> bool {
        self.state.lock().in_flight.remove(&delivery_tag).is_some()
    }

    /// Settle a delivery as failed. With `requeue`, the message returns to
    /// the head of the ready buffer marked redelivered; without, it is
    /// dropped permanently (reject).
    pub(crate) fn nack(&self, delivery_tag: u64, requeue: bool) -> bool {
        let mut state = self.state.lock();
        let Some(mut delivery) = state.in_flight.remove(&delivery_tag) else {
            return false;
        };
        if requeue && !state.closed {
            delivery.redelivered = true;
            delivery.delivery_tag = 0;
            state.ready.push_front(delivery);
            drop(state);
            self.notify.notify_one();
        }
        true
    }

    /// Return every unsettled delivery to the ready buffer, preserving the
    /// original delivery order. Called when a consumer handle goes away.
    pub(crate) fn requeue_unacked(&self) {
        let mut state = self.state.lock();
        if state.in_flight.is_empty() {
            return;
        }
        let mut unacked: Vec<Delivery> = state.in_flight.drain().map(|(_, d)| d).collect();
        unacked.sort_by_key(|d| d.delivery_tag);
        for mut delivery in unacked.into_iter().rev() {
            delivery.redelivered = true;
            delivery.delivery_tag = 0;
            state.ready.push_front(delivery);
        }
        drop(state);
        self.notify.notify_one();
    }

    /// Close the queue. Ready and in-flight messages are discarded, matching
    /// the auto-delete behavior of an exclusive queue.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.ready.clear();
        state.in_flight.clear();
        drop(state);
        self.notify.notify_waiters();
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.state.lock().ready.len()
    }

    #[cfg(test)]
    pub(crate) fn in_flight_count(&self) -> usize {
        self.state.lock().in_flight.len()
    }
}
