//! Interception-driven pagination engine.
//!
//! Infinite-scroll pages load each batch of results through a background
//! request. Instead of scraping the DOM, an extraction session pauses those
//! responses in the browser, decodes their bodies, and lets the decoded
//! continuation flag decide whether to scroll again.
//!
//! # Architecture
//!
//! ```text
//!   Tab ──exchanges──▶ Listener ──spawn──▶ decode task ─┬─▶ ItemSink
//!                                                      │
//!                                            ScrollGate (Pacer)
//!                                                      │
//!   Tab ◀──scroll──── Driver ◀──────── decision ───────┘
//! ```
//!
//! - [`listener`] runs one decode task per intercepted exchange
//! - [`gate`] serializes decisions so exactly one is pending at a time
//! - [`pacer`] enforces the scroll delay and budget
//! - [`driver`] navigates and scrolls
//! - [`session`] wires a session together and tears it down
//!
//! Sites plug in through [`Target`] and [`ResponseDecoder`].

pub mod decoder;
pub mod driver;
pub mod error;
pub mod gate;
pub mod listener;
pub mod pacer;
pub mod session;
pub mod sink;
pub mod target;

pub use decoder::{parse_json, DecodedPage, ResponseDecoder};
pub use driver::DriverState;
pub use error::{DecodeError, ExchangeError, ExtractError, Result};
pub use gate::{Baton, GateReader, GateWriter, Round, ScrollGate};
pub use pacer::Pacer;
pub use session::{Extraction, Extractor, SessionStats};
pub use sink::{ErrorSink, ItemSink, SinkHandle};
pub use target::{ItemOf, Target, TargetProfile, SCROLL_TO_BOTTOM};
