//! Response decoder contract.
//!
//! A decoder maps one intercepted response body to the items it carries and
//! whether the site reports more pages. Decoders are pure: no I/O, and the
//! same body always yields the same page. Missing or unknown fields degrade
//! to defaults; only bodies that are not JSON at all fail.

use crate::error::DecodeError;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Items decoded from one exchange plus the site's continuation flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPage<T> {
    /// Items in page order
    pub items: Vec<T>,
    /// Whether the site reports that more pages exist
    pub has_more: bool,
}

impl<T> DecodedPage<T> {
    /// Build a page.
    #[must_use]
    pub fn new(items: Vec<T>, has_more: bool) -> Self {
        Self { items, has_more }
    }

    /// Number of decoded items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the page carried no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Per-target mapping from a raw response body to domain items.
pub trait ResponseDecoder: Send + Sync + 'static {
    /// Domain item produced by this decoder
    type Item: Send + 'static;

    /// Decode one response body.
    fn decode(&self, body: &[u8]) -> Result<DecodedPage<Self::Item>, DecodeError>;
}

/// Parse a body into a lenient schema struct.
///
/// Schema structs are expected to use `#[serde(default)]` so that only
/// non-JSON input fails.
pub fn parse_json<S: DeserializeOwned>(body: &[u8]) -> Result<S, DecodeError> {
    Ok(serde_json::from_slice(body)?)
}

/// Run a decoder, turning a panic into [`DecodeError::Panicked`].
///
/// Callers still owe the gate a decision for the exchange, so a panic must
/// surface as an ordinary decode failure.
pub(crate) fn decode_guarded<D: ResponseDecoder>(
    decoder: &D,
    body: &[u8],
) -> Result<DecodedPage<D::Item>, DecodeError> {
    catch_unwind(AssertUnwindSafe(|| decoder.decode(body)))
        .unwrap_or_else(|payload| Err(DecodeError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Listing {
        items: Vec<String>,
        has_more: bool,
    }

    struct ListingDecoder;

    impl ResponseDecoder for ListingDecoder {
        type Item = String;

        fn decode(&self, body: &[u8]) -> Result<DecodedPage<String>, DecodeError> {
            let listing: Listing = parse_json(body)?;
            Ok(DecodedPage::new(listing.items, listing.has_more))
        }
    }

    #[test]
    fn test_missing_fields_degrade_to_defaults() {
        let page = ListingDecoder.decode(br#"{"unrelated": 1}"#).expect("decode");
        assert!(page.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn test_non_json_fails() {
        let err = ListingDecoder.decode(b"<!doctype html>").expect_err("not json");
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_decode_is_pure() {
        let body = br#"{"items": ["a", "b"], "has_more": true}"#;
        let first = ListingDecoder.decode(body).expect("decode");
        let second = ListingDecoder.decode(body).expect("decode");
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    struct ExplodingDecoder;

    impl ResponseDecoder for ExplodingDecoder {
        type Item = String;

        fn decode(&self, body: &[u8]) -> Result<DecodedPage<String>, DecodeError> {
            let listing: Listing = parse_json(body)?;
            if listing.items.is_empty() {
                panic!("listing without items");
            }
            Ok(DecodedPage::new(listing.items, listing.has_more))
        }
    }

    #[test]
    fn test_guarded_decode_reports_panic() {
        let err = decode_guarded(&ExplodingDecoder, br#"{"items": []}"#).expect_err("panics");
        match err {
            DecodeError::Panicked(message) => assert_eq!(message, "listing without items"),
            other => panic!("expected Panicked, got {other:?}"),
        }

        let page = decode_guarded(&ExplodingDecoder, br#"{"items": ["a"]}"#).expect("decode");
        assert_eq!(page.items, vec!["a".to_string()]);
        assert!(matches!(
            decode_guarded(&ExplodingDecoder, b"nope"),
            Err(DecodeError::Malformed(_))
        ));
    }
}
