//! Command handlers for the folio CLI.

pub mod config;
pub mod logging;
pub mod version;

pub use config::*;
pub use logging::*;
pub use version::*;
