//! # Versioned Cache System
//!
//! Generation-tagged request→response caching for shell assets: install-time
//! population from a manifest, activation-time garbage collection of stale
//! generations, and a two-tier (memory over file) read path.

mod store;
mod types;

pub mod providers;

pub use providers::{CacheProvider, FileCache, MemoryCache};
pub use store::CacheStore;
pub use types::{CacheKey, CacheLookupResult, CacheResult, EntryMetadata};
