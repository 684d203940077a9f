use log::{error, warn};

use crate::{
    error::Result,
    keys::KeyPool,
    quota::with_quota_rotation,
    transcript::{CaptionDownloader, TranscriptExtractor},
    types::{CommentsOutcome, NO_DESCRIPTION, VideoRecord},
    youtube::YoutubeApi,
};

/// Fetches up to `limit` top-level comments. A limit of 0 skips the call.
pub async fn fetch_comments<A: YoutubeApi>(
    api: &A,
    keys: &mut KeyPool,
    video_id: &str,
    limit: u32,
) -> Result<CommentsOutcome> {
    if limit == 0 {
        return Ok(CommentsOutcome::Empty);
    }

    match with_quota_rotation(keys, move |key| async move {
        api.top_comments(&key, video_id, limit).await
    })
    .await
    {
        Ok(comments) if comments.is_empty() => Ok(CommentsOutcome::Empty),
        Ok(comments) => Ok(CommentsOutcome::Fetched(comments)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!("Could not fetch comments for {video_id}: {e}");
            Ok(CommentsOutcome::Failed)
        }
    }
}

/// Assembles the full record for one video: metadata, transcript and top
/// comments.
///
/// Returns `Ok(None)` when the video does not exist or its metadata could not
/// be fetched. Transcript and comment problems are recorded in the record
/// instead.
pub async fn fetch_video_details<A, D>(
    api: &A,
    keys: &mut KeyPool,
    transcripts: &TranscriptExtractor<D>,
    video_id: &str,
    comment_limit: u32,
    lang: &str,
) -> Result<Option<VideoRecord>>
where
    A: YoutubeApi,
    D: CaptionDownloader,
{
    let request = [video_id.to_string()];
    let ids = request.as_slice();
    let item = match with_quota_rotation(keys, move |key| async move {
        api.videos(&key, ids).await
    })
    .await
    {
        Ok(items) => items.into_iter().next(),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            error!("Failed to fetch video {video_id}: {e}");
            return Ok(None);
        }
    };
    let Some(item) = item else {
        warn!("Video {video_id} not found");
        return Ok(None);
    };

    let transcript = transcripts.extract(video_id, lang).await;
    let comments = fetch_comments(api, keys, video_id, comment_limit).await?;

    Ok(Some(VideoRecord {
        video_id: video_id.to_string(),
        channel_name: item.channel_title.unwrap_or_default(),
        title: item.title.unwrap_or_default(),
        view_count: item.view_count.unwrap_or(0),
        published_at: item.published_at,
        transcript,
        comments,
        description: item
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::PlotlineError,
        testing::{Download, FakeDownloader, FakeYoutube},
        types::TranscriptOutcome,
        youtube::VideoItem,
    };

    fn extractor(dir: &tempfile::TempDir, behaviour: Download) -> TranscriptExtractor<FakeDownloader> {
        TranscriptExtractor::new(FakeDownloader::new(behaviour), dir.path())
    }

    #[tokio::test]
    async fn builds_full_record() {
        let dir = tempfile::tempdir().unwrap();
        let api = FakeYoutube::default()
            .with_video("abc123", "Channel", 1234)
            .with_comments("abc123", &["first", "second", "third"]);
        let mut keys = KeyPool::from_keys(["k"]);
        let transcripts = extractor(&dir, Download::Lang("WEBVTT\n\nhello\n".into()));

        let record = fetch_video_details(&api, &mut keys, &transcripts, "abc123", 2, "ko")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.channel_name, "Channel");
        assert_eq!(record.title, "Video abc123");
        assert_eq!(record.view_count, 1234);
        assert_eq!(record.url(), "https://www.youtube.com/watch?v=abc123");
        assert_eq!(record.published_display(), "2023-11-14 22:13:20");
        assert_eq!(record.transcript, TranscriptOutcome::Text("hello".into()));
        assert_eq!(
            record.comments,
            CommentsOutcome::Fetched(vec!["first".into(), "second".into()])
        );
        assert_eq!(record.description, "About abc123");
    }

    #[tokio::test]
    async fn missing_fields_get_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let api = FakeYoutube::default().with_video_item(VideoItem {
            id: "bare".into(),
            ..VideoItem::default()
        });
        let mut keys = KeyPool::from_keys(["k"]);
        let transcripts = extractor(&dir, Download::Nothing);

        let record = fetch_video_details(&api, &mut keys, &transcripts, "bare", 5, "ko")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.view_count, 0);
        assert_eq!(record.published_display(), "");
        assert_eq!(record.description, NO_DESCRIPTION);
        assert_eq!(record.transcript, TranscriptOutcome::Unavailable);
        assert_eq!(record.comments, CommentsOutcome::Empty);
    }

    #[tokio::test]
    async fn unknown_video_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let api = FakeYoutube::default();
        let mut keys = KeyPool::from_keys(["k"]);
        let transcripts = extractor(&dir, Download::Nothing);

        let record = fetch_video_details(&api, &mut keys, &transcripts, "nope", 5, "ko")
            .await
            .unwrap();

        assert!(record.is_none());
    }

    #[tokio::test]
    async fn comment_failure_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let api = FakeYoutube::default()
            .with_video("abc123", "Channel", 1)
            .with_failing_comments();
        let mut keys = KeyPool::from_keys(["k"]);
        let transcripts = extractor(&dir, Download::Nothing);

        let record = fetch_video_details(&api, &mut keys, &transcripts, "abc123", 5, "ko")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.comments, CommentsOutcome::Failed);
    }

    #[tokio::test]
    async fn zero_comment_limit_skips_request() {
        let api = FakeYoutube::default().with_comments("abc123", &["hi"]);
        let mut keys = KeyPool::from_keys(["k"]);

        let outcome = fetch_comments(&api, &mut keys, "abc123", 0).await.unwrap();

        assert_eq!(outcome, CommentsOutcome::Empty);
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn empty_pool_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let api = FakeYoutube::default().with_video("abc123", "Channel", 1);
        let mut keys = KeyPool::new();
        let transcripts = extractor(&dir, Download::Nothing);

        let err = fetch_video_details(&api, &mut keys, &transcripts, "abc123", 5, "ko")
            .await
            .unwrap_err();

        assert!(matches!(err, PlotlineError::EmptyPool));
    }
}
