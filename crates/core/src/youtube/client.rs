use std::time::Duration;

use log::debug;
use serde::de::DeserializeOwned;

use super::{
    ChannelHit, ChannelInfo, PlaylistPage, VideoItem, YoutubeApi, PAGE_SIZE,
    wire::{
        ChannelListResponse, CommentThreadListResponse, ErrorResponse, PlaylistItemListResponse,
        SearchListResponse, VideoListResponse,
    },
};
use crate::error::{PlotlineError, Result};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// YouTube Data API v3 over HTTPS, authenticated with a developer key.
#[derive(Clone)]
pub struct YoutubeClient {
    http: reqwest::Client,
    base_url: String,
}

impl YoutubeClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: API_BASE.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        resource: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, resource);
        debug!("GET {url} {params:?}");

        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", key)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(remote_error(status.as_u16(), &body));
        }

        Ok(response.json::<T>().await?)
    }
}

/// Builds a [`PlotlineError::Remote`] from a non-2xx response body.
pub(crate) fn remote_error(status: u16, body: &str) -> PlotlineError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => PlotlineError::Remote {
            status,
            message: parsed.error.message,
            reasons: parsed.error.errors.into_iter().map(|e| e.reason).collect(),
        },
        _ => PlotlineError::Remote {
            status,
            message: body.trim().to_string(),
            reasons: Vec::new(),
        },
    }
}

impl YoutubeApi for YoutubeClient {
    async fn search_channels(
        &self,
        key: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<ChannelHit>> {
        let max_results = max_results.to_string();
        let response: SearchListResponse = self
            .get(
                key,
                "search",
                &[
                    ("part", "id,snippet"),
                    ("type", "channel"),
                    ("q", query),
                    ("maxResults", max_results.as_str()),
                ],
            )
            .await?;
        Ok(response.into())
    }

    async fn channel(&self, key: &str, channel_id: &str) -> Result<Option<ChannelInfo>> {
        let response: ChannelListResponse = self
            .get(
                key,
                "channels",
                &[("part", "snippet,contentDetails"), ("id", channel_id)],
            )
            .await?;
        Ok(response.items.into_iter().next().map(Into::into))
    }

    async fn playlist_page(
        &self,
        key: &str,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistPage> {
        let page_size = PAGE_SIZE.to_string();
        let mut params = vec![
            ("part", "snippet"),
            ("playlistId", playlist_id),
            ("maxResults", page_size.as_str()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        let response: PlaylistItemListResponse = self.get(key, "playlistItems", &params).await?;
        Ok(response.into())
    }

    async fn videos(&self, key: &str, ids: &[String]) -> Result<Vec<VideoItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids.join(",");
        let response: VideoListResponse = self
            .get(
                key,
                "videos",
                &[("part", "snippet,statistics"), ("id", joined.as_str())],
            )
            .await?;
        Ok(response.items.into_iter().map(Into::into).collect())
    }

    async fn top_comments(
        &self,
        key: &str,
        video_id: &str,
        max_results: u32,
    ) -> Result<Vec<String>> {
        let max_results = max_results.clamp(1, 100).to_string();
        let response: CommentThreadListResponse = self
            .get(
                key,
                "commentThreads",
                &[
                    ("part", "snippet"),
                    ("videoId", video_id),
                    ("order", "relevance"),
                    ("textFormat", "plainText"),
                    ("maxResults", max_results.as_str()),
                ],
            )
            .await?;
        Ok(response.into())
    }
}
