//! TikTok web API payloads and the items decoded from them.
//!
//! Field names follow the API. Every struct tolerates missing fields.

use crate::lenient;
use pagewire_engine::{parse_json, DecodeError, DecodedPage, ResponseDecoder};
use serde::{Deserialize, Serialize};

/// One video post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub desc: String,
    /// Unix seconds
    pub create_time: i64,
    pub author: Author,
    pub stats: Stats,
    pub video: Video,
    pub music: Music,
    pub challenges: Vec<Challenge>,
}

impl ContentItem {
    /// Canonical web URL of the post.
    pub fn url(&self) -> String {
        format!("https://www.tiktok.com/@{}/video/{}", self.author.unique_id, self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub unique_id: String,
    pub nickname: String,
    pub signature: String,
    pub avatar_thumb: String,
    pub verified: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Stats {
    #[serde(deserialize_with = "lenient::count")]
    pub digg_count: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub share_count: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub comment_count: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub play_count: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub collect_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub width: u32,
    pub height: u32,
    /// Seconds
    pub duration: u32,
    pub cover: String,
    pub play_addr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Music {
    pub id: String,
    pub title: String,
    pub author_name: String,
    pub duration: u32,
}

/// Hashtag attached to a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Challenge {
    pub id: String,
    pub title: String,
}

/// One account from the user search endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    pub uid: String,
    pub sec_uid: String,
    pub unique_id: String,
    pub nickname: String,
    pub signature: String,
    pub custom_verify: String,
    #[serde(deserialize_with = "lenient::count")]
    pub follower_count: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub total_favorited: u64,
    pub avatar_thumb: ImageUrls,
}

impl UserInfo {
    /// First avatar URL, if any.
    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_thumb.url_list.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageUrls {
    pub uri: String,
    pub url_list: Vec<String>,
}

// `/api/search/general/full/`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeneralSearchResponse {
    data: Vec<GeneralSearchEntry>,
    #[serde(deserialize_with = "lenient::flag")]
    has_more: bool,
}

// Entries without an `item` are users, lives, or banners.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeneralSearchEntry {
    item: Option<ContentItem>,
}

// `/api/post/item_list/`
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ItemListResponse {
    item_list: Vec<ContentItem>,
    #[serde(deserialize_with = "lenient::flag")]
    has_more: bool,
}

// `/api/search/user/full/`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserSearchResponse {
    user_list: Vec<UserSearchEntry>,
    #[serde(deserialize_with = "lenient::flag")]
    has_more: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserSearchEntry {
    user_info: UserInfo,
}

/// Decodes content search results.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchDecoder;

impl ResponseDecoder for SearchDecoder {
    type Item = ContentItem;

    fn decode(&self, body: &[u8]) -> Result<DecodedPage<ContentItem>, DecodeError> {
        let response: GeneralSearchResponse = parse_json(body)?;
        let items = response
            .data
            .into_iter()
            .filter_map(|entry| entry.item)
            .collect();
        Ok(DecodedPage::new(items, response.has_more))
    }
}

/// Decodes a user's post list.
#[derive(Debug, Default, Clone, Copy)]
pub struct UserContentDecoder;

impl ResponseDecoder for UserContentDecoder {
    type Item = ContentItem;

    fn decode(&self, body: &[u8]) -> Result<DecodedPage<ContentItem>, DecodeError> {
        let response: ItemListResponse = parse_json(body)?;
        Ok(DecodedPage::new(response.item_list, response.has_more))
    }
}

/// Decodes user search results.
#[derive(Debug, Default, Clone, Copy)]
pub struct UserSearchDecoder;

impl ResponseDecoder for UserSearchDecoder {
    type Item = UserInfo;

    fn decode(&self, body: &[u8]) -> Result<DecodedPage<UserInfo>, DecodeError> {
        let response: UserSearchResponse = parse_json(body)?;
        let items = response
            .user_list
            .into_iter()
            .map(|entry| entry.user_info)
            .collect();
        Ok(DecodedPage::new(items, response.has_more))
    }
}
