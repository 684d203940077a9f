//! Read-only access to the YouTube Data API.
//!
//! [`YoutubeApi`] is the seam the collection code is written against. Every
//! method takes the API key explicitly so that key selection stays with the
//! caller (see [`crate::quota::with_quota_rotation`]).

mod client;
mod wire;

use chrono::{DateTime, Utc};

pub use client::YoutubeClient;

use crate::error::Result;

/// Page size used for playlist listings. 50 is the API maximum.
pub const PAGE_SIZE: u32 = 50;

pub const VIDEO_KIND: &str = "youtube#video";

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelHit {
    pub channel_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelInfo {
    pub id: String,
    pub title: String,
    /// The channel's `@handle`, as reported in `snippet.customUrl`.
    pub custom_url: Option<String>,
    pub uploads_playlist_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaylistEntry {
    pub video_id: Option<String>,
    pub kind: Option<String>,
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl PlaylistEntry {
    /// The video id, if this entry refers to a video.
    pub fn video(&self) -> Option<&str> {
        match self.kind.as_deref() {
            Some(VIDEO_KIND) => self.video_id.as_deref().filter(|id| !id.is_empty()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaylistPage {
    pub items: Vec<PlaylistEntry>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VideoItem {
    pub id: String,
    pub title: Option<String>,
    pub channel_title: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: Option<u64>,
}

#[allow(async_fn_in_trait)]
pub trait YoutubeApi {
    /// `search.list` restricted to channels.
    async fn search_channels(
        &self,
        key: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<ChannelHit>>;

    /// `channels.list` for one id. `None` if the channel does not exist.
    async fn channel(&self, key: &str, channel_id: &str) -> Result<Option<ChannelInfo>>;

    /// One page of `playlistItems.list`.
    async fn playlist_page(
        &self,
        key: &str,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistPage>;

    /// `videos.list` with snippet and statistics for a batch of ids.
    async fn videos(&self, key: &str, ids: &[String]) -> Result<Vec<VideoItem>>;

    /// Top-level comment texts ordered by relevance.
    async fn top_comments(&self, key: &str, video_id: &str, max_results: u32)
    -> Result<Vec<String>>;
}

/// Canonical watch URL for a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}
