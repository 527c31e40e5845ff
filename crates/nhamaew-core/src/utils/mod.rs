//! Utility functions for display formatting.

pub mod format;

pub use format::{age_display, format_baht, format_date, format_rating, truncate};
