//! # offcache
//!
//! An offline-first caching proxy engine: it sits between an application's
//! foreground page and the network, answering each request from a versioned
//! cache generation, the network, or a persistent video store. Large video
//! payloads are synced on demand through an explicit message protocol.
//!
//! ## Features
//!
//! - Four request strategies: network-first, cache-first, store-first and
//!   stale-while-revalidate
//! - Versioned cache generations with all-or-nothing install and
//!   activation-time garbage collection
//! - Persistent, restart-safe video store with atomic whole-record writes
//! - Page message protocol with exactly one outcome per sync request

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod router;
pub mod store;
pub mod sync;
pub mod worker;

pub use builder::WorkerConfigBuilder;
pub use cache::{CacheKey, CacheStore, EntryMetadata};
pub use config::{FetchConfig, WorkerConfig};
pub use error::ProxyError;
pub use fetch::{Fetcher, HttpFetcher, create_client};
pub use http::{ProxyResponse, Request};
pub use router::{RequestRouter, RouterRules, Strategy};
pub use store::{VideoRecord, VideoStore};
pub use sync::{PageMessage, SyncHandler, SyncOutcome, VideoDescriptor};
pub use worker::OfflineWorker;
