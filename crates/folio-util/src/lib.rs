//! Shared utilities for folio.
//!
//! This crate provides common utilities used across the folio workspace:
//! - ULID-based identifier generation
//! - Logging setup with tracing
//! - Path utilities
//! - Duration logging for versioning operations

pub mod id;
pub mod log;
pub mod path;
pub mod timing;

pub use id::{IdPrefix, Identifier};
pub use timing::TimingGuard;
