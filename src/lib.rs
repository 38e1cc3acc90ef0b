//! # Catalog Sync
//!
//! Event-driven synchronization between a product catalog and its search
//! index, with a read-through cache on the side.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CatalogService (writes)                 │
//! │  • Validates and commits to the primary store               │
//! │  • Cache writes and event publishes run in the background   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                   product.created / updated / deleted
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Broker: durable topic exchange                 │
//! │  • Exclusive auto-named queues bound to `product.*`         │
//! │  • At-least-once delivery with ack / nack / reject          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  IndexConsumer → search index               │
//! │  • Reconnecting session loop with backoff                   │
//! │  • Idempotent applies; SearchService answers queries        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use catalog_sync::{
//!     Broker, CatalogService, ChannelPool, EventPublisher, IndexConsumer,
//!     MemoryCache, MemoryIndex, MemoryStore, NewProduct, PipelineConfig,
//!     QuerySpec, SearchService,
//! };
//! use tokio::sync::watch;
//!
//! # async fn example() {
//! let config = PipelineConfig::default();
//! let broker = Arc::new(Broker::new(config.queue_capacity));
//! let index = Arc::new(MemoryIndex::new());
//!
//! let publisher = EventPublisher::new(
//!     ChannelPool::new(Arc::clone(&broker), config.channel_pool_size),
//!     &config.exchange_name,
//! );
//! let catalog = CatalogService::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MemoryCache::new(Duration::from_secs(config.cache_ttl_secs))),
//!     publisher,
//! );
//!
//! let consumer = Arc::new(IndexConsumer::new(
//!     Arc::clone(&broker),
//!     index.clone(),
//!     &config,
//! ));
//! let (shutdown, shutdown_rx) = watch::channel(false);
//! tokio::spawn({
//!     let consumer = Arc::clone(&consumer);
//!     async move { consumer.run(shutdown_rx).await }
//! });
//!
//! let created = catalog
//!     .create(NewProduct {
//!         name: "Blue Widget".into(),
//!         description: None,
//!         price: 9.99,
//!         category: Some("tools".into()),
//!         tags: vec![],
//!         quantity: 3,
//!         images: vec![],
//!     })
//!     .await
//!     .expect("create");
//!
//! let search = SearchService::new(index, "memory", &config);
//! let results = search
//!     .search(QuerySpec { q: Some("widget".into()), ..Default::default() })
//!     .await
//!     .expect("search");
//! # let _ = (created, results, shutdown);
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`catalog`]: write-side service (create/get/update/delete/list)
//! - [`broker`]: in-process topic exchange with at-least-once queues
//! - [`consumer`]: the event consumer keeping the index in sync
//! - [`search`]: query validation, translation, and execution
//! - [`store`]: primary store and search index backends
//! - [`cache`]: read-through product cache
//! - [`resilience`]: retry presets shared by the backends

pub mod broker;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod consumer;
pub mod event;
pub mod metrics;
pub mod product;
pub mod publisher;
pub mod resilience;
pub mod search;
pub mod store;

pub use broker::{Broker, BrokerError, ChannelPool, Connection, Delivery, ExchangeKind, QueueHandle, TopicPattern};
pub use cache::{cache_key, CacheError, MemoryCache, ProductCache, RedisCache};
pub use catalog::{CatalogError, CatalogService};
pub use config::PipelineConfig;
pub use consumer::{ConsumerState, IndexConsumer};
pub use event::{ChangeEvent, ChangeOp, EventError, Tombstone};
pub use product::{NewProduct, ProductPatch, ProductRecord, ValidationError};
pub use publisher::EventPublisher;
pub use resilience::RetryConfig;
pub use search::{QuerySpec, SearchError, SearchRequest, SearchResults, SearchService};
pub use store::{MemoryIndex, MemoryStore, PrimaryStore, RediSearchIndex, SearchIndexStore, StorageError};
