//! Signed-in LINE user session.
//!
//! The session carries the LINE user id that every user-scoped query and
//! mutation is keyed on. It is persisted as JSON in the cache directory and
//! expires after 30 days, the lifetime of a LINE access token.

pub mod session;

pub use session::{Session, SessionData};
