//! Nhamaew Pet Store client core.
//!
//! A thin client for the pet store REST backend:
//! - `api`: typed HTTP client, one method per endpoint
//! - `models`: wire payloads and their display helpers
//! - `cache`: keyed, time-bounded query cache with request de-duplication
//! - `navigation`: stack-based drill-down through the category tree
//! - `pagination`: page-at-a-time accumulation for infinite lists
//! - `storefront`: the API client behind the cache, with invalidation rules
//! - `auth`, `config`: persisted session and settings
//! - `messaging`: LINE platform bridge and share messages

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod messaging;
pub mod models;
pub mod navigation;
pub mod pagination;
pub mod storefront;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{Session, SessionData};
pub use cache::{CacheError, KeyPattern, QueryClient, QueryKey, QueryOptions};
pub use config::Config;
pub use messaging::{Bridge, BridgeError, Capability, MessagingPlatform, ShareMessage};
pub use navigation::{CategoryNavigator, LoadState, NavigationFrame, SearchScope, Selection};
pub use pagination::{FetchNext, InfiniteList};
pub use storefront::{CartSelection, CheckoutError, Feed, Storefront};
