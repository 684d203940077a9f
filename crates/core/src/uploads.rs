use std::collections::{HashMap, HashSet};

use log::{debug, error, info, warn};

use crate::{
    error::{PlotlineError, Result},
    keys::KeyPool,
    quota::with_quota_rotation,
    types::VideoSummary,
    youtube::{ChannelInfo, PlaylistEntry, VideoItem, YoutubeApi},
};

/// A channel together with its complete upload listing.
#[derive(Debug, Clone)]
pub struct ChannelUploads {
    pub channel: ChannelInfo,
    pub entries: Vec<PlaylistEntry>,
}

async fn channel_info<A: YoutubeApi>(
    api: &A,
    keys: &mut KeyPool,
    channel_id: &str,
) -> Result<Option<ChannelInfo>> {
    with_quota_rotation(keys, move |key| async move { api.channel(&key, channel_id).await }).await
}

/// Walks a channel's uploads, newest first, and returns up to `target`
/// videos with at least `min_views` views that are not in `exclude`.
///
/// Failures while paging are logged and end the walk early with whatever was
/// already accepted. Only [`PlotlineError::EmptyPool`] is returned as an error.
pub async fn collect_uploads<A: YoutubeApi>(
    api: &A,
    keys: &mut KeyPool,
    channel_id: &str,
    target: usize,
    min_views: u64,
    exclude: &HashSet<String>,
) -> Result<Vec<VideoSummary>> {
    let mut collected = Vec::new();
    if target == 0 {
        return Ok(collected);
    }

    let playlist_id = match channel_info(api, keys, channel_id).await {
        Ok(Some(ChannelInfo {
            uploads_playlist_id: Some(playlist_id),
            ..
        })) => playlist_id,
        Ok(_) => {
            warn!("Channel {channel_id} has no uploads listing");
            return Ok(collected);
        }
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            error!("Failed to look up channel {channel_id}: {e}");
            return Ok(collected);
        }
    };

    let mut accepted: HashSet<String> = HashSet::new();
    let mut page_token: Option<String> = None;
    let mut page_number = 0usize;

    loop {
        page_number += 1;
        let playlist = playlist_id.as_str();
        let token = page_token.as_deref();
        let page = match with_quota_rotation(keys, move |key| async move {
            api.playlist_page(&key, playlist, token).await
        })
        .await
        {
            Ok(page) => page,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!("Failed to fetch upload page {page_number} of {channel_id}: {e}");
                break;
            }
        };

        if page.items.is_empty() {
            debug!("Upload page {page_number} of {channel_id} is empty");
            break;
        }

        let titles: HashMap<&str, &str> = page
            .items
            .iter()
            .filter_map(|entry| entry.video().map(|id| (id, entry.title.as_str())))
            .collect();
        let fresh: Vec<String> = page
            .items
            .iter()
            .filter_map(PlaylistEntry::video)
            .filter(|id| !exclude.contains(*id) && !accepted.contains(*id))
            .map(str::to_string)
            .collect();

        if !fresh.is_empty() {
            let ids = fresh.as_slice();
            let stats = match with_quota_rotation(keys, move |key| async move {
                api.videos(&key, ids).await
            })
            .await
            {
                Ok(stats) => stats,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!("Failed to fetch view counts for {channel_id}: {e}");
                    break;
                }
            };

            let by_id: HashMap<&str, &VideoItem> =
                stats.iter().map(|item| (item.id.as_str(), item)).collect();
            for id in &fresh {
                let Some(item) = by_id.get(id.as_str()) else {
                    debug!("No statistics returned for {id}");
                    continue;
                };
                let view_count = item.view_count.unwrap_or(0);
                if view_count < min_views {
                    continue;
                }

                let title = item
                    .title
                    .clone()
                    .or_else(|| titles.get(id.as_str()).map(|t| t.to_string()))
                    .unwrap_or_default();
                accepted.insert(id.clone());
                collected.push(VideoSummary {
                    video_id: id.clone(),
                    title,
                    view_count,
                });
                if collected.len() >= target {
                    break;
                }
            }
        }

        if collected.len() >= target {
            break;
        }
        match page.next_page_token {
            Some(next) => page_token = Some(next),
            None => break,
        }
    }

    info!(
        "Collected {} of {target} requested videos from {channel_id}",
        collected.len()
    );
    Ok(collected)
}

/// Fetches every entry of a channel's upload listing, unfiltered.
pub async fn list_all_uploads<A: YoutubeApi>(
    api: &A,
    keys: &mut KeyPool,
    channel_id: &str,
) -> Result<ChannelUploads> {
    let channel = channel_info(api, keys, channel_id)
        .await?
        .ok_or_else(|| PlotlineError::not_found(format!("channel {channel_id}")))?;
    let Some(playlist) = channel.uploads_playlist_id.as_deref() else {
        return Err(PlotlineError::not_found(format!(
            "uploads listing of {}",
            channel.title
        )));
    };

    let mut entries = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let token = page_token.as_deref();
        let page = with_quota_rotation(keys, move |key| async move {
            api.playlist_page(&key, playlist, token).await
        })
        .await?;

        let done = page.items.is_empty() || page.next_page_token.is_none();
        entries.extend(page.items);
        if done {
            break;
        }
        page_token = page.next_page_token;
    }

    info!("Listed {} uploads of {}", entries.len(), channel.title);
    Ok(ChannelUploads { channel, entries })
}
