//! Pagewire Core - Foundation crate for the Pagewire extraction engine.
//!
//! This crate provides the configuration, error types, and request types
//! that the browser, engine, and target crates share.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Shared newtypes (`TargetId`, `SessionId`, `Timestamp`)
//! - [`request`] - The immutable `ExtractionRequest` supplied by callers
//!
//! # Example
//!
//! ```rust
//! use pagewire_core::{AppConfig, ExtractionRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let request = ExtractionRequest::new("golang")
//!     .with_scroll_count(3)
//!     .with_scroll_delay(config.extraction.default_scroll_delay());
//! request.validate()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod request;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, BrowserConfig, ExtractionConfig};
pub use error::{ConfigError, ConfigResult, PagewireError, Result};
pub use request::ExtractionRequest;
pub use types::{SessionId, TargetId, Timestamp};
