//! Cache provider implementations.

pub mod file;
pub mod memory;
pub mod provider;

pub use file::FileCache;
pub use memory::MemoryCache;
pub use provider::CacheProvider;
