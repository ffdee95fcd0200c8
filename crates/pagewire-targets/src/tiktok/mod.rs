//! TikTok targets: content search, a user's posts, and user search.
//!
//! All three load pages through the web API while the body scrolls, and
//! report continuation through `has_more`.

mod schema;

pub use schema::{
    Author, Challenge, ContentItem, ImageUrls, Music, SearchDecoder, Stats, UserContentDecoder,
    UserInfo, UserSearchDecoder, Video,
};

use crate::site::SiteTarget;
use pagewire_core::ExtractionRequest;
use pagewire_engine::{Extraction, Extractor, Target, TargetProfile};
use std::sync::Arc;
use url::Url;

const SEARCH_PATTERN: &str = "*/search/general/full/*";
const USER_CONTENT_PATTERN: &str = "*/post/item_list/*";
const USER_SEARCH_PATTERN: &str = "*/search/user/full/*";

const VIDEO_CARD: &str = r#"[id^="column-item-video-container-"]"#;
const USER_CARD: &str = r#"[id^="search_user-item-user-link-"]"#;

/// Content search by keyword.
pub fn search_target() -> pagewire_core::Result<SiteTarget<SearchDecoder>> {
    SiteTarget::new(
        "tiktok-search",
        TargetProfile::new(
            SEARCH_PATTERN,
            r#"[data-e2e="search_top-item-list"]"#,
            VIDEO_CARD,
        ),
        SearchDecoder,
        search_url,
    )
}

/// Posts of one account, by handle.
pub fn user_content_target() -> pagewire_core::Result<SiteTarget<UserContentDecoder>> {
    SiteTarget::new(
        "tiktok-user-content",
        TargetProfile::new(
            USER_CONTENT_PATTERN,
            r#"[data-e2e="user-post-item-list"]"#,
            VIDEO_CARD,
        ),
        UserContentDecoder,
        user_url,
    )
}

/// Account search by keyword.
pub fn search_user_target() -> pagewire_core::Result<SiteTarget<UserSearchDecoder>> {
    SiteTarget::new(
        "tiktok-search-user",
        TargetProfile::new(
            USER_SEARCH_PATTERN,
            r#"[data-e2e="search-user-container"]"#,
            USER_CARD,
        ),
        UserSearchDecoder,
        user_search_url,
    )
}

fn search_url(term: &str) -> Result<Url, url::ParseError> {
    with_search_query("https://tiktok.com/search", term)
}

fn user_search_url(term: &str) -> Result<Url, url::ParseError> {
    with_search_query("https://tiktok.com/search/user", term)
}

// `t` busts the search cache.
fn with_search_query(base: &str, term: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    url.query_pairs_mut()
        .append_pair("q", term)
        .append_pair("t", &chrono::Utc::now().timestamp_millis().to_string());
    Ok(url)
}

fn user_url(term: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse("https://tiktok.com/")?;
    url.set_path(&format!("/@{}", term.trim_start_matches('@')));
    Ok(url)
}

/// TikTok extraction routines over a shared [`Extractor`].
pub struct TikTok {
    extractor: Arc<Extractor>,
    search: SiteTarget<SearchDecoder>,
    user_content: SiteTarget<UserContentDecoder>,
    search_user: SiteTarget<UserSearchDecoder>,
}

impl TikTok {
    pub fn new(extractor: Arc<Extractor>) -> pagewire_core::Result<Self> {
        let tiktok = Self {
            extractor,
            search: search_target()?,
            user_content: user_content_target()?,
            search_user: search_user_target()?,
        };
        tracing::debug!(
            "TikTok targets ready: {}, {}, {}",
            tiktok.search.id(),
            tiktok.user_content.id(),
            tiktok.search_user.id()
        );
        Ok(tiktok)
    }

    /// Videos matching `request.term`.
    pub async fn search(&self, request: &ExtractionRequest) -> Extraction<ContentItem> {
        self.extractor.extract(&self.search, request).await
    }

    /// Videos posted by the account `request.term` (with or without `@`).
    pub async fn user_content(&self, request: &ExtractionRequest) -> Extraction<ContentItem> {
        self.extractor.extract(&self.user_content, request).await
    }

    /// Accounts matching `request.term`.
    pub async fn search_user(&self, request: &ExtractionRequest) -> Extraction<UserInfo> {
        self.extractor.extract(&self.search_user, request).await
    }
}
