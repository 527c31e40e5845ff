//! REST API client module for the pet store backend.
//!
//! This module provides the `ApiClient` for the `/api/pet-store/v1`
//! endpoints: catalogue, cart, orders, reviews, favourites, shipping
//! address, profile and admin chat.
//!
//! Every request is JSON. User-scoped endpoints identify the customer by
//! LINE user id in the request body rather than by bearer token.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
