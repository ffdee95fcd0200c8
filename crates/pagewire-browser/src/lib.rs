//! Browser capability for the Pagewire extraction engine.
//!
//! The engine talks to a browser tab only through the [`BrowserTab`] trait:
//! navigate, wait for an element, evaluate script, count nodes, intercept
//! network responses, read and release them. [`BrowserEngine`] provides the
//! production implementation on top of chromiumoxide; tests substitute an
//! in-memory tab.

pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod tab;

pub use engine::{BrowserEngine, ChromeTab};
pub use error::{BrowserError, Result};
pub use fingerprint::Fingerprint;
pub use tab::{
    pattern_matches, BrowserTab, ExchangeHandle, ExchangeStream, InterceptedExchange, TabProvider,
};
