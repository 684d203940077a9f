use log::{debug, warn};
use percent_encoding::percent_decode_str;

use crate::{
    error::{PlotlineError, Result},
    keys::KeyPool,
    quota::with_quota_rotation,
    youtube::YoutubeApi,
};

const HANDLE_CANDIDATES: u32 = 5;

/// What a user-supplied input refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Video(String),
    Channel(String),
}

/// Syntactic classification of a raw input, before any remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind<'a> {
    Video(String),
    /// Names a watch or short URL but carries no readable video id.
    MalformedVideoUrl,
    Channel(&'a str),
}

/// Extracts the id from `youtube.com/watch?v=<id>` or `youtu.be/<id>`.
pub fn parse_video_url(url: &str) -> Option<String> {
    let raw = if let Some((_, rest)) = url.split_once("youtube.com/watch?v=") {
        rest.split('&').next()
    } else if let Some((_, rest)) = url.split_once("youtu.be/") {
        rest.split('?').next()
    } else {
        None
    }?;

    let id = raw.trim();
    (!id.is_empty()).then(|| id.to_string())
}

pub fn classify_input(input: &str) -> InputKind<'_> {
    if let Some(id) = parse_video_url(input) {
        return InputKind::Video(id);
    }
    if input.contains("youtube.com/watch") || input.contains("youtu.be/") {
        return InputKind::MalformedVideoUrl;
    }
    InputKind::Channel(input)
}

fn channel_path_id(input: &str) -> Option<&str> {
    let (_, rest) = input.split_once("/channel/")?;
    rest.split(['/', '?']).next().filter(|id| !id.is_empty())
}

fn handle(input: &str) -> Option<String> {
    let raw = match input.split_once("/@") {
        Some((_, rest)) => rest,
        None => input.trim().strip_prefix('@')?,
    };
    let raw = raw.split(['?', '/']).next().unwrap_or(raw);
    if raw.is_empty() {
        return None;
    }
    Some(percent_decode_str(raw).decode_utf8_lossy().into_owned())
}

fn same_handle(candidate: &str, handle: &str) -> bool {
    let candidate = candidate.trim_start_matches('@');
    candidate.to_lowercase() == handle.to_lowercase()
}

/// Maps a channel URL, `@handle` or free-text channel name to a channel id.
pub async fn resolve_channel<A: YoutubeApi>(
    api: &A,
    keys: &mut KeyPool,
    input: &str,
) -> Result<String> {
    if let Some(id) = channel_path_id(input) {
        return Ok(id.to_string());
    }

    let found = match handle(input) {
        Some(handle) => {
            let handle = handle.as_str();
            with_quota_rotation(keys, move |key| async move {
                resolve_handle(api, &key, handle).await
            })
            .await?
        }
        None => {
            let query = input.trim();
            with_quota_rotation(keys, move |key| async move {
                let hits = api.search_channels(&key, query, 1).await?;
                Ok(hits.into_iter().next().map(|hit| hit.channel_id))
            })
            .await?
        }
    };

    found.ok_or_else(|| {
        warn!("Could not find a channel for {input:?}");
        PlotlineError::not_found(format!("channel {input}"))
    })
}

async fn resolve_handle<A: YoutubeApi>(api: &A, key: &str, handle: &str) -> Result<Option<String>> {
    let hits = api.search_channels(key, handle, HANDLE_CANDIDATES).await?;

    // Search ranking is fuzzy; confirm against each candidate's own details.
    for hit in &hits {
        let Some(info) = api.channel(key, &hit.channel_id).await? else {
            continue;
        };
        let custom_matches = info
            .custom_url
            .as_deref()
            .is_some_and(|custom| same_handle(custom, handle));
        if custom_matches || same_handle(&info.title, handle) {
            debug!("Handle @{handle} matched channel {}", hit.channel_id);
            return Ok(Some(hit.channel_id.clone()));
        }
    }

    if !hits.is_empty() {
        debug!("No exact match for @{handle}, using first search result");
    }
    Ok(hits.into_iter().next().map(|hit| hit.channel_id))
}

/// Resolves any input to a video or channel target.
pub async fn resolve<A: YoutubeApi>(api: &A, keys: &mut KeyPool, input: &str) -> Result<Target> {
    match classify_input(input) {
        InputKind::Video(id) => Ok(Target::Video(id)),
        InputKind::MalformedVideoUrl => Err(PlotlineError::MalformedVideoUrl {
            input: input.to_string(),
        }),
        InputKind::Channel(channel) => resolve_channel(api, keys, channel)
            .await
            .map(Target::Channel),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeYoutube;

    #[test]
    fn parses_watch_and_short_urls() {
        assert_eq!(
            parse_video_url("https://www.youtube.com/watch?v=abc123&t=10s").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            parse_video_url("https://youtu.be/xyz789?si=foo").as_deref(),
            Some("xyz789")
        );
        assert_eq!(parse_video_url("https://www.youtube.com/@Example"), None);
        assert_eq!(parse_video_url("some channel"), None);
    }

    #[test]
    fn malformed_video_urls_are_not_channels() {
        assert_eq!(
            classify_input("https://www.youtube.com/watch?feature=share"),
            InputKind::MalformedVideoUrl
        );
        assert_eq!(
            classify_input("https://www.youtube.com/watch?v="),
            InputKind::MalformedVideoUrl
        );
        assert_eq!(classify_input("https://youtu.be/"), InputKind::MalformedVideoUrl);
        assert_eq!(classify_input("@Example"), InputKind::Channel("@Example"));
        // Not a recognised video shape at all: still treated as a channel name.
        assert_eq!(
            classify_input("https://m.youtube.com/shorts/abc"),
            InputKind::Channel("https://m.youtube.com/shorts/abc")
        );
    }

    #[test]
    fn extracts_handles() {
        assert_eq!(handle("@Example").as_deref(), Some("Example"));
        assert_eq!(
            handle("https://www.youtube.com/@%ED%95%9C%EA%B8%80/videos").as_deref(),
            Some("한글")
        );
        assert_eq!(
            handle("https://www.youtube.com/@Example?si=1").as_deref(),
            Some("Example")
        );
        assert_eq!(handle("plain name"), None);
    }

    #[tokio::test]
    async fn channel_path_needs_no_remote_call() {
        let api = FakeYoutube::default();
        let mut keys = KeyPool::from_keys(["k"]);
        let id = resolve_channel(&api, &mut keys, "https://www.youtube.com/channel/UC123/videos")
            .await
            .unwrap();
        assert_eq!(id, "UC123");
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn handle_prefers_exact_title_match() {
        let api = FakeYoutube::default()
            .with_search("Example", &["UC_first", "UC_second", "UC_third"])
            .with_channel("UC_first", "Example Fans", Some("@examplefans"), None)
            .with_channel("UC_second", "example", Some("@someoneelse"), None)
            .with_channel("UC_third", "Example", Some("@example"), None);
        let mut keys = KeyPool::from_keys(["k"]);

        let id = resolve_channel(&api, &mut keys, "@Example").await.unwrap();
        assert_eq!(id, "UC_second");
    }

    #[tokio::test]
    async fn handle_falls_back_to_first_hit() {
        let api = FakeYoutube::default()
            .with_search("Example", &["UC_first", "UC_second"])
            .with_channel("UC_first", "Other", None, None)
            .with_channel("UC_second", "Another", None, None);
        let mut keys = KeyPool::from_keys(["k"]);

        let id = resolve_channel(&api, &mut keys, "https://youtube.com/@Example")
            .await
            .unwrap();
        assert_eq!(id, "UC_first");
    }

    #[tokio::test]
    async fn unknown_names_are_not_found() {
        let api = FakeYoutube::default();
        let mut keys = KeyPool::from_keys(["k"]);

        let err = resolve_channel(&api, &mut keys, "nobody at all")
            .await
            .unwrap_err();
        assert!(matches!(err, PlotlineError::NotFound { .. }));

        let err = resolve_channel(&api, &mut keys, "@nobody").await.unwrap_err();
        assert!(matches!(err, PlotlineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn resolve_dispatches_on_input_shape() {
        let api = FakeYoutube::default().with_search("Some Channel", &["UC9"]);
        let mut keys = KeyPool::from_keys(["k"]);

        assert_eq!(
            resolve(&api, &mut keys, "https://youtu.be/abc").await.unwrap(),
            Target::Video("abc".to_string())
        );
        assert_eq!(
            resolve(&api, &mut keys, "Some Channel").await.unwrap(),
            Target::Channel("UC9".to_string())
        );
        assert!(matches!(
            resolve(&api, &mut keys, "https://www.youtube.com/watch?list=PL1").await,
            Err(PlotlineError::MalformedVideoUrl { .. })
        ));
    }
}
