// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Change events emitted after primary-store mutations.
//!
//! Every successful create/update/delete produces one [`ChangeEvent`] routed
//! as `product.<operation>` on the topic exchange. The payload is the full
//! JSON-serialized [`ProductRecord`] for created/updated; for deleted the
//! consumer only requires the `id` field to be present.
//!
//! Events carry no sequence number: ordering is delivery order within one
//! queue, and the last *delivered* event for an identity wins.

use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

use crate::product::ProductRecord;

/// Routing key prefix shared by all catalog change events.
pub const ROUTING_PREFIX: &str = "product";

#[derive(Error, Debug)]
pub enum EventError {
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
    #[error("invalid event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Catalog change operation, carried in the routing-key suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Created,
    Updated,
    Deleted,
}

impl ChangeOp {
    /// Returns the routing-key suffix for this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOp::Created => "created",
            ChangeOp::Updated => "updated",
            ChangeOp::Deleted => "deleted",
        }
    }

    /// Full routing key, e.g. `product.created`.
    pub fn routing_key(&self) -> String {
        format!("{}.{}", ROUTING_PREFIX, self.as_str())
    }

    /// Derive the operation from a routing key.
    ///
    /// The operation is the suffix after the last `.`; anything unrecognized
    /// is a permanent error, not a transient one.
    pub fn from_routing_key(routing_key: &str) -> Result<Self, EventError> {
        let suffix = routing_key.rsplit('.').next().unwrap_or(routing_key);
        match suffix {
            "created" => Ok(ChangeOp::Created),
            "updated" => Ok(ChangeOp::Updated),
            "deleted" => Ok(ChangeOp::Deleted),
            other => Err(EventError::UnknownOperation(other.to_string())),
        }
    }
}

/// An immutable change notification ready for publication.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub routing_key: String,
    pub body: Bytes,
}

impl ChangeEvent {
    /// Build an event from a mutated record.
    ///
    /// The full record is serialized for every operation, deletes included;
    /// consumers of a delete only rely on the `id` field.
    pub fn from_record(op: ChangeOp, record: &ProductRecord) -> Result<Self, EventError> {
        let body = serde_json::to_vec(record)?;
        Ok(Self {
            routing_key: op.routing_key(),
            body: Bytes::from(body),
        })
    }
}

/// Minimal payload for a delete: only the identity is required.
#[derive(Debug, Deserialize)]
pub struct Tombstone {
    pub id: String,
}

/// Decode a created/updated payload into the full record.
pub fn decode_record(body: &[u8]) -> Result<ProductRecord, EventError> {
    Ok(serde_json::from_slice(body)?)
}

/// Decode a deleted payload; tolerates extra fields beyond `id`.
pub fn decode_tombstone(body: &[u8]) -> Result<Tombstone, EventError> {
    Ok(serde_json::from_slice(body)?)
}
