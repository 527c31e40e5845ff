//! Bridge to the LINE messaging platform.
//!
//! `MessagingPlatform` is the seam to whatever hosts the storefront (the LIFF
//! SDK inside the LINE app, or the LINE REST API from a server). `Bridge`
//! resolves the platform's capability set once and gates every call on it,
//! so callers never check for an API ad hoc.
//!
//! `share` builds the text and flex messages sent through the bridge.

pub mod bridge;
pub mod line;
pub mod share;

pub use bridge::{Bridge, BridgeError, Capability, Friendship, MessagingPlatform};
pub use line::HttpLinePlatform;
pub use share::ShareMessage;
