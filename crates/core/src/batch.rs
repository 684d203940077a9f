use std::collections::HashSet;

use log::{debug, info, warn};

use crate::{
    details::fetch_video_details,
    error::{PlotlineError, Result},
    keys::KeyPool,
    resolver::{InputKind, classify_input, resolve_channel},
    transcript::{CaptionDownloader, TranscriptExtractor},
    types::{CommentsOutcome, TranscriptOutcome, VideoRecord},
    uploads::collect_uploads,
    youtube::YoutubeApi,
};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// How many videos to take from each channel input.
    pub videos_per_channel: usize,
    pub min_views: u64,
    pub comment_limit: u32,
    pub number_scripts: bool,
    pub number_comments: bool,
    /// Subtitle language passed to the caption downloader.
    pub language: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            videos_per_channel: 10,
            min_views: 0,
            comment_limit: 20,
            number_scripts: false,
            number_comments: false,
            language: "ko".to_string(),
        }
    }
}

/// Progress notifications emitted while a batch runs.
#[derive(Debug, Clone, Copy)]
pub enum BatchProgress<'a> {
    Input {
        index: usize,
        total: usize,
        input: &'a str,
    },
    Video {
        video_id: &'a str,
        title: &'a str,
    },
}

/// Running counters for script and comment numbering within one batch.
#[derive(Debug)]
struct Numbering {
    scripts: bool,
    comments: bool,
    next_script: usize,
    next_comment_group: usize,
}

impl Numbering {
    fn new(options: &BatchOptions) -> Self {
        Self {
            scripts: options.number_scripts,
            comments: options.number_comments,
            next_script: 1,
            next_comment_group: 1,
        }
    }

    fn apply(&mut self, record: &mut VideoRecord) {
        if self.scripts
            && let TranscriptOutcome::Text(text) = &mut record.transcript
        {
            *text = format!("{}. {text}", self.next_script);
            self.next_script += 1;
        }

        if self.comments
            && let CommentsOutcome::Fetched(comments) = &mut record.comments
        {
            let group = self.next_comment_group;
            for (position, comment) in comments.iter_mut().enumerate() {
                *comment = format!("{group}.{} {comment}", position + 1);
            }
            self.next_comment_group += 1;
        }
    }
}

struct Batch<'a, A, D> {
    api: &'a A,
    keys: &'a mut KeyPool,
    transcripts: &'a TranscriptExtractor<D>,
    options: &'a BatchOptions,
    exclude: &'a mut HashSet<String>,
    numbering: Numbering,
    records: Vec<VideoRecord>,
}

impl<A: YoutubeApi, D: CaptionDownloader> Batch<'_, A, D> {
    async fn add_video(&mut self, video_id: &str) -> Result<()> {
        if self.exclude.contains(video_id) {
            debug!("Skipping {video_id}, already collected");
            return Ok(());
        }

        let record = fetch_video_details(
            self.api,
            self.keys,
            self.transcripts,
            video_id,
            self.options.comment_limit,
            &self.options.language,
        )
        .await?;

        if let Some(mut record) = record {
            self.numbering.apply(&mut record);
            self.exclude.insert(record.video_id.clone());
            self.records.push(record);
        }
        Ok(())
    }

    async fn add_channel(
        &mut self,
        input: &str,
        progress: &mut impl FnMut(BatchProgress<'_>),
    ) -> Result<()> {
        let channel_id = match resolve_channel(self.api, self.keys, input).await {
            Ok(id) => id,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Skipping {input:?}: {e}");
                return Ok(());
            }
        };

        let summaries = collect_uploads(
            self.api,
            self.keys,
            &channel_id,
            self.options.videos_per_channel,
            self.options.min_views,
            &*self.exclude,
        )
        .await?;

        for summary in &summaries {
            progress(BatchProgress::Video {
                video_id: &summary.video_id,
                title: &summary.title,
            });
            self.add_video(&summary.video_id).await?;
        }
        Ok(())
    }
}

/// Collects records for a list of video URLs and channel references.
///
/// Inputs are processed in order. Every record's id is added to `exclude` as
/// soon as it is fetched, so repeated inputs and overlap with earlier
/// sessions are skipped. Per-input failures are logged and skipped; only
/// [`PlotlineError::EmptyPool`] aborts the batch.
pub async fn collect_batch<A, D, S>(
    api: &A,
    keys: &mut KeyPool,
    transcripts: &TranscriptExtractor<D>,
    inputs: &[S],
    options: &BatchOptions,
    exclude: &mut HashSet<String>,
    mut progress: impl FnMut(BatchProgress<'_>),
) -> Result<Vec<VideoRecord>>
where
    A: YoutubeApi,
    D: CaptionDownloader,
    S: AsRef<str>,
{
    let mut batch = Batch {
        api,
        keys,
        transcripts,
        options,
        exclude,
        numbering: Numbering::new(options),
        records: Vec::new(),
    };

    let total = inputs.len();
    for (index, raw) in inputs.iter().enumerate() {
        let input = raw.as_ref().trim();
        if input.is_empty() {
            continue;
        }
        progress(BatchProgress::Input {
            index,
            total,
            input,
        });

        match classify_input(input) {
            InputKind::Video(video_id) => batch.add_video(&video_id).await?,
            InputKind::MalformedVideoUrl => {
                let e = PlotlineError::MalformedVideoUrl {
                    input: input.to_string(),
                };
                warn!("Skipping input: {e}");
            }
            InputKind::Channel(channel) => batch.add_channel(channel, &mut progress).await?,
        }
    }

    info!(
        "Batch finished with {} record(s) from {total} input(s)",
        batch.records.len()
    );
    Ok(batch.records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Download, FakeDownloader, FakeYoutube};

    const WATCH_URL: &str = "https://www.youtube.com/watch?v=abc123";

    fn some_channel() -> FakeYoutube {
        FakeYoutube::default()
            .with_search("SomeChannel", &["UCsome"])
            .with_channel("UCsome", "SomeChannel", Some("@somechannel"), Some("UUsome"))
            .with_uploads("UUsome", &[&["abc123", "v2", "v3", "v4"]])
            .with_video("abc123", "SomeChannel", 100)
            .with_video("v2", "SomeChannel", 200)
            .with_video("v3", "SomeChannel", 300)
            .with_video("v4", "SomeChannel", 400)
            .with_comments("abc123", &["a", "b"])
            .with_comments("v2", &["c"])
    }

    fn extractor(dir: &tempfile::TempDir) -> TranscriptExtractor<FakeDownloader> {
        TranscriptExtractor::new(
            FakeDownloader::new(Download::Lang("WEBVTT\n\nhello\n".into())),
            dir.path(),
        )
    }

    fn options(per_channel: usize) -> BatchOptions {
        BatchOptions {
            videos_per_channel: per_channel,
            comment_limit: 10,
            ..BatchOptions::default()
        }
    }

    fn ids(records: &[VideoRecord]) -> Vec<&str> {
        records.iter().map(|r| r.video_id.as_str()).collect()
    }

    #[tokio::test]
    async fn mixed_inputs_without_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let api = some_channel();
        let mut keys = KeyPool::from_keys(["k"]);
        let mut exclude = HashSet::new();

        let records = collect_batch(
            &api,
            &mut keys,
            &extractor(&dir),
            &[WATCH_URL, "@SomeChannel"],
            &options(2),
            &mut exclude,
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(ids(&records), vec!["abc123", "v2", "v3"]);
        assert_eq!(exclude.len(), 3);
        assert!(exclude.contains("abc123"));
        // The channel walk never re-fetches stats for the video already taken.
        assert_eq!(
            api.stats_requests()
                .iter()
                .filter(|id| *id == "abc123")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn numbering_is_identical_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let api = some_channel();
        let numbered = BatchOptions {
            number_scripts: true,
            number_comments: true,
            ..options(1)
        };

        let mut runs = Vec::new();
        for _ in 0..2 {
            let mut keys = KeyPool::from_keys(["k"]);
            let mut exclude = HashSet::new();
            let records = collect_batch(
                &api,
                &mut keys,
                &extractor(&dir),
                &[WATCH_URL, "@SomeChannel"],
                &numbered,
                &mut exclude,
                |_| {},
            )
            .await
            .unwrap();
            runs.push(records);
        }

        assert_eq!(runs[0], runs[1]);
        let records = &runs[0];
        assert_eq!(ids(records), vec!["abc123", "v2"]);
        assert_eq!(records[0].transcript.text(), Some("1. hello"));
        assert_eq!(records[1].transcript.text(), Some("2. hello"));
        assert_eq!(
            records[0].comments,
            CommentsOutcome::Fetched(vec!["1.1 a".into(), "1.2 b".into()])
        );
        assert_eq!(records[1].comments, CommentsOutcome::Fetched(vec!["2.1 c".into()]));
    }

    #[tokio::test]
    async fn sentinels_are_not_numbered() {
        let dir = tempfile::tempdir().unwrap();
        let api = some_channel();
        let mut keys = KeyPool::from_keys(["k"]);
        let transcripts =
            TranscriptExtractor::new(FakeDownloader::new(Download::Nothing), dir.path());
        let numbered = BatchOptions {
            number_scripts: true,
            number_comments: true,
            ..options(3)
        };

        let records = collect_batch(
            &api,
            &mut keys,
            &transcripts,
            &["@SomeChannel"],
            &numbered,
            &mut HashSet::new(),
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(ids(&records), vec!["abc123", "v2", "v3"]);
        assert!(records.iter().all(|r| r.transcript == TranscriptOutcome::Unavailable));
        assert_eq!(records[1].comments, CommentsOutcome::Fetched(vec!["2.1 c".into()]));
        assert_eq!(records[2].comments, CommentsOutcome::Empty);
    }

    #[tokio::test]
    async fn skips_malformed_unknown_and_known_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let api = some_channel();
        let mut keys = KeyPool::from_keys(["k"]);
        let mut exclude = HashSet::from(["abc123".to_string()]);

        let records = collect_batch(
            &api,
            &mut keys,
            &extractor(&dir),
            &[
                WATCH_URL,
                "https://www.youtube.com/watch?feature=share",
                "   ",
                "nobody at all",
                "https://youtu.be/v4",
            ],
            &options(2),
            &mut exclude,
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(ids(&records), vec!["v4"]);
        assert!(!api.stats_requests().contains(&"abc123".to_string()));
    }

    #[tokio::test]
    async fn reports_progress_per_input_and_video() {
        let dir = tempfile::tempdir().unwrap();
        let api = some_channel();
        let mut keys = KeyPool::from_keys(["k"]);
        let mut seen = Vec::new();

        collect_batch(
            &api,
            &mut keys,
            &extractor(&dir),
            &["@SomeChannel"],
            &options(2),
            &mut HashSet::new(),
            |event| match event {
                BatchProgress::Input { index, total, input } => {
                    seen.push(format!("{}/{total} {input}", index + 1))
                }
                BatchProgress::Video { video_id, .. } => seen.push(video_id.to_string()),
            },
        )
        .await
        .unwrap();

        assert_eq!(seen, vec!["1/1 @SomeChannel", "abc123", "v2"]);
    }

    #[tokio::test]
    async fn empty_pool_aborts_batch() {
        let dir = tempfile::tempdir().unwrap();
        let api = some_channel();
        let mut keys = KeyPool::new();

        let err = collect_batch(
            &api,
            &mut keys,
            &extractor(&dir),
            &["@SomeChannel"],
            &options(2),
            &mut HashSet::new(),
            |_| {},
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PlotlineError::EmptyPool));
    }
}
