//! YouTube targets: channel search, video comments, and video search.
//!
//! Search pages ship their first results inline as `ytInitialData`; later
//! pages and all comments arrive through `youtubei/v1` calls.

mod schema;
mod text;

pub use schema::{
    Channel, ChannelItem, ChannelSearchDecoder, CommentItem, CommentsDecoder, Thumbnail,
    VideoItem, VideoSearchDecoder,
};
pub use text::{parse_duration_secs, parse_view_count};

use crate::site::SiteTarget;
use pagewire_core::ExtractionRequest;
use pagewire_engine::{Extraction, Extractor, Target, TargetProfile};
use std::sync::Arc;
use url::Url;

const SEARCH_PATTERN: &str = "*youtubei/v1/search*";
const SEARCH_PATH: &str = "youtubei/v1/search";
const NEXT_PATTERN: &str = "*youtubei/v1/next*";
const NEXT_PATH: &str = "youtubei/v1/next";

const SEARCH_SECTION: &str = "ytd-section-list-renderer div#contents ytd-item-section-renderer";
const INITIAL_DATA: &str = "ytInitialData";

/// Search filter selecting channels only (`sp=EgIQAg%3D%3D`).
const CHANNEL_FILTER: &str = "EgIQAg==";

/// Channels matching a keyword.
pub fn search_channel_target() -> pagewire_core::Result<SiteTarget<ChannelSearchDecoder>> {
    let profile = TargetProfile::new(SEARCH_PATTERN, SEARCH_SECTION, SEARCH_SECTION)
        .with_url_contains(SEARCH_PATH)
        .with_scroll_script(
            r#"window.scrollTo(0,document.querySelector("ytd-section-list-renderer div#contents").scrollHeight);"#,
        )
        .with_seed_script(INITIAL_DATA);
    SiteTarget::new(
        "youtube-search-channel",
        profile,
        ChannelSearchDecoder,
        channel_search_url,
    )
}

/// Top-level comments of one video, by video id.
pub fn content_comments_target() -> pagewire_core::Result<SiteTarget<CommentsDecoder>> {
    let profile = TargetProfile::new(
        NEXT_PATTERN,
        "ytd-comments",
        "ytd-item-section-renderer div#contents ytd-comment-thread-renderer",
    )
    .with_url_contains(NEXT_PATH)
    .with_prime_script(r#"window.scrollTo(0,document.querySelector("ytd-comments").scrollHeight);"#)
    .with_scroll_script(
        r#"window.scrollTo(0,document.querySelector("ytd-item-section-renderer div#contents").scrollHeight);"#,
    );
    SiteTarget::new("youtube-comments", profile, CommentsDecoder, watch_url)
}

/// First page of video results for a keyword. Never scrolls.
pub fn search_content_target() -> pagewire_core::Result<SiteTarget<VideoSearchDecoder>> {
    let profile = TargetProfile::new(SEARCH_PATTERN, SEARCH_SECTION, SEARCH_SECTION)
        .with_url_contains(SEARCH_PATH)
        .with_seed_script(INITIAL_DATA)
        .with_max_scrolls(0);
    SiteTarget::new(
        "youtube-search-content",
        profile,
        VideoSearchDecoder,
        content_search_url,
    )
}

fn content_search_url(term: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse("https://youtube.com/results")?;
    url.query_pairs_mut().append_pair("search_query", term);
    Ok(url)
}

fn channel_search_url(term: &str) -> Result<Url, url::ParseError> {
    let mut url = content_search_url(term)?;
    url.query_pairs_mut().append_pair("sp", CHANNEL_FILTER);
    Ok(url)
}

fn watch_url(term: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse("https://youtube.com/watch")?;
    url.query_pairs_mut().append_pair("v", term);
    Ok(url)
}

/// YouTube extraction routines over a shared [`Extractor`].
pub struct YouTube {
    extractor: Arc<Extractor>,
    search_channel: SiteTarget<ChannelSearchDecoder>,
    content_comments: SiteTarget<CommentsDecoder>,
    search_content: SiteTarget<VideoSearchDecoder>,
}

impl YouTube {
    pub fn new(extractor: Arc<Extractor>) -> pagewire_core::Result<Self> {
        let youtube = Self {
            extractor,
            search_channel: search_channel_target()?,
            content_comments: content_comments_target()?,
            search_content: search_content_target()?,
        };
        tracing::debug!(
            "YouTube targets ready: {}, {}, {}",
            youtube.search_channel.id(),
            youtube.content_comments.id(),
            youtube.search_content.id()
        );
        Ok(youtube)
    }

    /// Channels matching `request.term`.
    pub async fn search_channel(&self, request: &ExtractionRequest) -> Extraction<ChannelItem> {
        self.extractor.extract(&self.search_channel, request).await
    }

    /// Comments on the video whose id is `request.term`.
    pub async fn content_comments(&self, request: &ExtractionRequest) -> Extraction<CommentItem> {
        self.extractor.extract(&self.content_comments, request).await
    }

    /// Videos matching `request.term`, first page only.
    pub async fn search_content(&self, request: &ExtractionRequest) -> Extraction<VideoItem> {
        self.extractor.extract(&self.search_content, request).await
    }
}
