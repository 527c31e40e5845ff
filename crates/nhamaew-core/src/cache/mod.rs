//! In-memory query cache for backend reads.
//!
//! This module provides the `QueryClient`, which stores read results under
//! a deterministic `QueryKey` and serves them until they go stale. Writes go
//! through `QueryClient::mutate`, which evicts the keys a mutation affects.
//!
//! Defaults mirror the storefront's freshness policy:
//! - entries are fresh for 2 minutes
//! - entries are dropped entirely after 5 minutes
//! - identical concurrent reads share one network request

pub mod client;
pub mod key;

pub use client::{CacheError, QueryClient, QueryOptions};
pub use key::{KeyPattern, QueryKey};
