//! YouTube `youtubei/v1` payloads, the inline `ytInitialData` search page,
//! and the items decoded from them.

use super::text::{parse_duration_secs, parse_view_count};
use crate::lenient;
use pagewire_engine::{parse_json, DecodeError, DecodedPage, ResponseDecoder};
use serde::{Deserialize, Serialize};

/// Channel reference attached to videos, channels, and comments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel {
    pub name: String,
    pub id: String,
    /// Canonical path such as `/@handle`
    pub endpoint: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thumbnail {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// One channel search result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelItem {
    #[serde(flatten)]
    pub channel: Channel,
    pub description: String,
    pub subscriber_count_text: String,
    pub thumbnails: Vec<Thumbnail>,
}

/// One video search result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VideoItem {
    pub id: String,
    pub channel: Channel,
    pub thumbnails: Vec<Thumbnail>,
    /// Seconds
    pub duration: u64,
    pub duration_text: String,
    pub view_count: u64,
    pub view_count_text: String,
    pub title: String,
    pub desc: String,
    pub published_time: String,
}

/// One top-level comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommentItem {
    pub id: String,
    pub author: Channel,
    pub author_thumbnails: Vec<Thumbnail>,
    pub text: String,
    pub published_time: String,
    pub like_count: u64,
    pub like_count_text: String,
    pub reply_count: u64,
}

// Text arrives either as `simpleText` or as a list of `runs`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Text {
    simple_text: String,
    runs: Vec<Run>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Run {
    text: String,
    navigation_endpoint: NavigationEndpoint,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct NavigationEndpoint {
    browse_endpoint: BrowseEndpoint,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BrowseEndpoint {
    browse_id: String,
    canonical_base_url: String,
}

impl Text {
    fn text(&self) -> String {
        if self.simple_text.is_empty() {
            self.runs.iter().map(|run| run.text.as_str()).collect()
        } else {
            self.simple_text.clone()
        }
    }

    // Byline runs link the first run to the channel.
    fn owner(&self) -> Channel {
        self.runs
            .first()
            .map(|run| Channel {
                name: run.text.clone(),
                id: run.navigation_endpoint.browse_endpoint.browse_id.clone(),
                endpoint: run
                    .navigation_endpoint
                    .browse_endpoint
                    .canonical_base_url
                    .clone(),
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ThumbnailList {
    thumbnails: Vec<Thumbnail>,
}

impl ThumbnailList {
    // Channel avatars use protocol-relative URLs.
    fn into_absolute(self) -> Vec<Thumbnail> {
        self.thumbnails
            .into_iter()
            .map(|mut thumbnail| {
                if thumbnail.url.starts_with("//") {
                    thumbnail.url = format!("https:{}", thumbnail.url);
                }
                thumbnail
            })
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ContinuationItemRenderer {
    continuation_endpoint: ContinuationEndpoint,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ContinuationEndpoint {
    continuation_command: ContinuationCommand,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContinuationCommand {
    token: String,
}

fn has_token(renderer: Option<&ContinuationItemRenderer>) -> bool {
    renderer.is_some_and(|r| !r.continuation_endpoint.continuation_command.token.is_empty())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ContinuationItems<T> {
    continuation_items: Vec<T>,
}

// Search: API continuation pages and the inline first page share one shape
// below the section list.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SearchResponse {
    on_response_received_commands: Vec<SearchCommand>,
    contents: SearchContents,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SearchCommand {
    append_continuation_items_action: ContinuationItems<SectionSlot>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SearchContents {
    two_column_search_results_renderer: TwoColumnSearch,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TwoColumnSearch {
    primary_contents: PrimaryContents,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PrimaryContents {
    section_list_renderer: SectionList,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SectionList {
    contents: Vec<SectionSlot>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SectionSlot {
    item_section_renderer: ItemSection,
    continuation_item_renderer: Option<ContinuationItemRenderer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ItemSection {
    contents: Vec<SearchResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SearchResult {
    video_renderer: Option<VideoRenderer>,
    channel_renderer: Option<ChannelRenderer>,
}

impl SearchResponse {
    fn into_sections(self) -> (Vec<ItemSection>, bool) {
        let slots = self
            .contents
            .two_column_search_results_renderer
            .primary_contents
            .section_list_renderer
            .contents
            .into_iter()
            .chain(
                self.on_response_received_commands
                    .into_iter()
                    .flat_map(|command| command.append_continuation_items_action.continuation_items),
            );

        let mut sections = Vec::new();
        let mut has_more = false;
        for slot in slots {
            has_more |= has_token(slot.continuation_item_renderer.as_ref());
            sections.push(slot.item_section_renderer);
        }
        (sections, has_more)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct VideoRenderer {
    video_id: String,
    thumbnail: ThumbnailList,
    title: Text,
    length_text: Text,
    view_count_text: Text,
    owner_text: Text,
    detailed_metadata_snippets: Vec<MetadataSnippet>,
    published_time_text: Text,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MetadataSnippet {
    snippet_text: Text,
}

impl VideoRenderer {
    fn into_item(self) -> VideoItem {
        let duration_text = self.length_text.text();
        let view_count_text = self.view_count_text.text();
        VideoItem {
            channel: self.owner_text.owner(),
            thumbnails: self.thumbnail.into_absolute(),
            duration: parse_duration_secs(&duration_text),
            duration_text,
            view_count: parse_view_count(&view_count_text),
            view_count_text,
            title: self.title.text(),
            desc: self
                .detailed_metadata_snippets
                .first()
                .map(|snippet| snippet.snippet_text.text())
                .unwrap_or_default(),
            published_time: self.published_time_text.text(),
            id: self.video_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ChannelRenderer {
    channel_id: String,
    thumbnail: ThumbnailList,
    title: Text,
    navigation_endpoint: NavigationEndpoint,
    short_byline_text: Text,
    video_count_text: Text,
    subscriber_count_text: Text,
    description_snippet: Text,
}

impl ChannelRenderer {
    fn into_item(self) -> ChannelItem {
        let byline = self.short_byline_text.owner();
        let name = if byline.name.is_empty() {
            self.title.text()
        } else {
            byline.name
        };
        let endpoint = match self.navigation_endpoint.browse_endpoint.canonical_base_url {
            url if url.is_empty() => byline.endpoint,
            url => url,
        };
        // Handle-era layouts put the subscriber count in `videoCountText`.
        let subscriber_count_text = match self.video_count_text.text() {
            text if text.is_empty() => self.subscriber_count_text.text(),
            text => text,
        };

        ChannelItem {
            channel: Channel {
                name,
                id: self.channel_id,
                endpoint,
            },
            description: self.description_snippet.text(),
            subscriber_count_text,
            thumbnails: self.thumbnail.into_absolute(),
        }
    }
}

/// Decodes channel search results from API pages and `ytInitialData`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChannelSearchDecoder;

impl ResponseDecoder for ChannelSearchDecoder {
    type Item = ChannelItem;

    fn decode(&self, body: &[u8]) -> Result<DecodedPage<ChannelItem>, DecodeError> {
        let response: SearchResponse = parse_json(body)?;
        let (sections, has_more) = response.into_sections();
        let items = sections
            .into_iter()
            .flat_map(|section| section.contents)
            .filter_map(|result| result.channel_renderer)
            .filter(|renderer| !renderer.channel_id.is_empty())
            .map(ChannelRenderer::into_item)
            .collect();
        Ok(DecodedPage::new(items, has_more))
    }
}

/// Decodes video search results from API pages and `ytInitialData`.
#[derive(Debug, Default, Clone, Copy)]
pub struct VideoSearchDecoder;

impl ResponseDecoder for VideoSearchDecoder {
    type Item = VideoItem;

    fn decode(&self, body: &[u8]) -> Result<DecodedPage<VideoItem>, DecodeError> {
        let response: SearchResponse = parse_json(body)?;
        let (sections, has_more) = response.into_sections();
        let items = sections
            .into_iter()
            .flat_map(|section| section.contents)
            .filter_map(|result| result.video_renderer)
            .filter(|renderer| !renderer.video_id.is_empty())
            .map(VideoRenderer::into_item)
            .collect();
        Ok(DecodedPage::new(items, has_more))
    }
}

// Comments: `youtubei/v1/next`. The first page arrives as a reload command,
// later pages as append actions.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct NextResponse {
    on_response_received_endpoints: Vec<NextEndpoint>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct NextEndpoint {
    reload_continuation_items_command: ContinuationItems<CommentSlot>,
    append_continuation_items_action: ContinuationItems<CommentSlot>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CommentSlot {
    comment_thread_renderer: Option<CommentThread>,
    continuation_item_renderer: Option<ContinuationItemRenderer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommentThread {
    comment: CommentHolder,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CommentHolder {
    comment_renderer: CommentRenderer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CommentRenderer {
    comment_id: String,
    author_text: Text,
    author_endpoint: NavigationEndpoint,
    author_thumbnail: ThumbnailList,
    content_text: Text,
    published_time_text: Text,
    vote_count: Text,
    #[serde(deserialize_with = "lenient::count")]
    reply_count: u64,
}

impl CommentRenderer {
    fn into_item(self) -> CommentItem {
        let like_count_text = self.vote_count.text();
        CommentItem {
            author: Channel {
                name: self.author_text.text(),
                id: self.author_endpoint.browse_endpoint.browse_id,
                endpoint: self.author_endpoint.browse_endpoint.canonical_base_url,
            },
            author_thumbnails: self.author_thumbnail.into_absolute(),
            text: self.content_text.text(),
            published_time: self.published_time_text.text(),
            like_count: parse_view_count(&like_count_text),
            like_count_text,
            reply_count: self.reply_count,
            id: self.comment_id,
        }
    }
}

/// Decodes comment threads and detects the next continuation token.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommentsDecoder;

impl ResponseDecoder for CommentsDecoder {
    type Item = CommentItem;

    fn decode(&self, body: &[u8]) -> Result<DecodedPage<CommentItem>, DecodeError> {
        let response: NextResponse = parse_json(body)?;
        let slots = response
            .on_response_received_endpoints
            .into_iter()
            .flat_map(|endpoint| {
                endpoint
                    .reload_continuation_items_command
                    .continuation_items
                    .into_iter()
                    .chain(endpoint.append_continuation_items_action.continuation_items)
            });

        let mut items = Vec::new();
        let mut has_more = false;
        for slot in slots {
            has_more |= has_token(slot.continuation_item_renderer.as_ref());
            if let Some(thread) = slot.comment_thread_renderer {
                let renderer = thread.comment.comment_renderer;
                if !renderer.comment_id.is_empty() {
                    items.push(renderer.into_item());
                }
            }
        }
        Ok(DecodedPage::new(items, has_more))
    }
}
