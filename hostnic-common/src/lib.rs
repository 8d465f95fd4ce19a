//! # hostnic Common
//!
//! Shared utilities for the hostnic tools.
//!
//! ## Logging
//!
//! ```rust,no_run
//! use hostnic_common::init_logging;
//!
//! init_logging("info").unwrap();
//! tracing::info!(host = "esx1", "Resolving host");
//! ```

pub mod logging;

pub use logging::{init_logging, init_logging_json};
