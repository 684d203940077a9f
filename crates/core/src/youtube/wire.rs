//! Subsets of the YouTube Data API v3 response bodies.
//!
//! Only the fields the collector reads are modelled. Everything is optional or
//! defaulted because the API omits parts that were not requested.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{ChannelHit, ChannelInfo, PlaylistEntry, PlaylistPage, VideoItem};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceId {
    pub kind: Option<String>,
    pub channel_id: Option<String>,
    pub video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchListResponse {
    pub items: Vec<SearchResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    pub id: ResourceId,
    pub snippet: Option<TitleSnippet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TitleSnippet {
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChannelListResponse {
    pub items: Vec<Channel>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Channel {
    pub id: String,
    pub snippet: Option<ChannelSnippet>,
    pub content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelSnippet {
    pub title: Option<String>,
    pub custom_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelContentDetails {
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RelatedPlaylists {
    pub uploads: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaylistItemListResponse {
    pub items: Vec<PlaylistItem>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlaylistItem {
    pub snippet: Option<PlaylistItemSnippet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaylistItemSnippet {
    pub title: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub resource_id: ResourceId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VideoListResponse {
    pub items: Vec<Video>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Video {
    pub id: String,
    pub snippet: Option<VideoSnippet>,
    pub statistics: Option<VideoStatistics>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoSnippet {
    pub title: Option<String>,
    pub channel_title: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

// Counts are encoded as decimal strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoStatistics {
    pub view_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentThreadListResponse {
    pub items: Vec<CommentThread>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentThread {
    pub snippet: CommentThreadSnippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommentThreadSnippet {
    pub top_level_comment: Comment,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Comment {
    pub snippet: CommentSnippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommentSnippet {
    pub text_display: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ErrorDetail {
    pub reason: String,
    pub message: String,
}

impl From<SearchListResponse> for Vec<ChannelHit> {
    fn from(response: SearchListResponse) -> Self {
        response
            .items
            .into_iter()
            .filter_map(|item| {
                let channel_id = item.id.channel_id.filter(|id| !id.is_empty())?;
                Some(ChannelHit {
                    channel_id,
                    title: item.snippet.and_then(|s| s.title).unwrap_or_default(),
                })
            })
            .collect()
    }
}

impl From<Channel> for ChannelInfo {
    fn from(channel: Channel) -> Self {
        let (title, custom_url) = channel
            .snippet
            .map(|s| (s.title.unwrap_or_default(), s.custom_url))
            .unwrap_or_default();
        ChannelInfo {
            id: channel.id,
            title,
            custom_url,
            uploads_playlist_id: channel
                .content_details
                .and_then(|d| d.related_playlists.uploads)
                .filter(|id| !id.is_empty()),
        }
    }
}

impl From<PlaylistItemListResponse> for PlaylistPage {
    fn from(response: PlaylistItemListResponse) -> Self {
        PlaylistPage {
            items: response
                .items
                .into_iter()
                .map(|item| {
                    let snippet = item.snippet.unwrap_or_default();
                    PlaylistEntry {
                        video_id: snippet.resource_id.video_id,
                        kind: snippet.resource_id.kind,
                        title: snippet.title.unwrap_or_default(),
                        published_at: snippet.published_at,
                    }
                })
                .collect(),
            next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}

impl From<Video> for VideoItem {
    fn from(video: Video) -> Self {
        let snippet = video.snippet.unwrap_or_default();
        VideoItem {
            id: video.id,
            title: snippet.title,
            channel_title: snippet.channel_title,
            description: snippet.description,
            published_at: snippet.published_at,
            view_count: video
                .statistics
                .and_then(|s| s.view_count)
                .and_then(|v| v.parse().ok()),
        }
    }
}

impl From<CommentThreadListResponse> for Vec<String> {
    fn from(response: CommentThreadListResponse) -> Self {
        response
            .items
            .into_iter()
            .map(|thread| thread.snippet.top_level_comment.snippet.text_display)
            .collect()
    }
}
