use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    sync::LazyLock,
    time::Duration,
};

use chrono::Utc;
use log::{debug, error, warn};
use regex::Regex;
use tokio::{fs, process::Command};

use crate::{
    cache::SUBTITLE_PREFIX,
    error::{PlotlineError, Result},
    types::TranscriptOutcome,
    youtube::watch_url,
};

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("markup tag pattern is valid"));

const HEADER_PREFIXES: [&str; 3] = ["WEBVTT", "KIND:", "LANGUAGE:"];

/// Something that can fetch a video's subtitles into a file.
///
/// Implementations write `<base>.<lang>.vtt` or `<base>.vtt`, where
/// `output_template` is `<base>.%(ext)s`. Finding no file afterwards means the
/// video has no captions in that language; an `Err` means the download itself
/// could not run.
#[allow(async_fn_in_trait)]
pub trait CaptionDownloader {
    async fn download(&self, video_url: &str, lang: &str, output_template: &Path) -> Result<()>;
}

/// Subtitle download via the `yt-dlp` command-line tool.
pub struct YtDlp {
    program: PathBuf,
    timeout: Duration,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl CaptionDownloader for YtDlp {
    async fn download(&self, video_url: &str, lang: &str, output_template: &Path) -> Result<()> {
        let run = Command::new(&self.program)
            .arg("--skip-download")
            .arg("--write-sub")
            .arg("--write-auto-sub")
            .arg("--sub-format")
            .arg("vtt")
            .arg("--sub-lang")
            .arg(lang)
            .arg("-o")
            .arg(output_template)
            .arg(video_url)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| PlotlineError::SubtitleFailed {
                url: video_url.to_string(),
                reason: format!("timed out after {}s", self.timeout.as_secs()),
            })??;

        // A non-zero exit is common when only some languages exist; the
        // presence of the output file decides.
        if !output.status.success() {
            debug!(
                "yt-dlp exited with {} for {video_url}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }
}

/// Subtitle files a single download may produce. Removed on drop.
struct SubtitleFiles {
    candidates: [PathBuf; 2],
}

impl SubtitleFiles {
    fn new(base: &Path, lang: &str) -> Self {
        Self {
            candidates: [
                with_suffix(base, &format!(".{lang}.vtt")),
                with_suffix(base, ".vtt"),
            ],
        }
    }

    fn existing(&self) -> Option<&Path> {
        self.candidates
            .iter()
            .map(PathBuf::as_path)
            .find(|path| path.exists())
    }
}

impl Drop for SubtitleFiles {
    fn drop(&mut self) {
        for path in &self.candidates {
            if path.exists()
                && let Err(e) = std::fs::remove_file(path)
            {
                warn!("Failed to remove {}: {e}", path.display());
            }
        }
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Turns a WebVTT document into plain caption lines.
///
/// Drops cue timings, cue numbers and header lines, strips inline tags, and
/// collapses the consecutive repeats auto-generated captions are full of.
pub fn normalize_vtt(content: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed.contains("-->")
            || trimmed.chars().all(|c| c.is_ascii_digit())
        {
            continue;
        }
        let upper = trimmed.to_uppercase();
        if HEADER_PREFIXES.iter().any(|prefix| upper.starts_with(prefix)) {
            continue;
        }

        let text = MARKUP_TAG.replace_all(trimmed, "");
        let text = text.trim();
        if text.is_empty() || lines.last().is_some_and(|last| last == text) {
            continue;
        }
        lines.push(text.to_string());
    }

    lines.join("\n")
}

pub struct TranscriptExtractor<D> {
    downloader: D,
    work_dir: PathBuf,
}

impl<D: CaptionDownloader> TranscriptExtractor<D> {
    pub fn new(downloader: D, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            downloader,
            work_dir: work_dir.into(),
        }
    }

    /// Fetches the transcript of `video_id` in `lang`. Never fails: problems
    /// are reported and folded into the outcome.
    pub async fn extract(&self, video_id: &str, lang: &str) -> TranscriptOutcome {
        match self.try_extract(video_id, lang).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Transcript extraction failed for {video_id}: {e}");
                TranscriptOutcome::Failed
            }
        }
    }

    async fn try_extract(&self, video_id: &str, lang: &str) -> Result<TranscriptOutcome> {
        fs::create_dir_all(&self.work_dir).await?;

        let base = self.work_dir.join(format!(
            "{SUBTITLE_PREFIX}{video_id}_{}",
            Utc::now().timestamp_millis()
        ));
        let files = SubtitleFiles::new(&base, lang);
        let template = with_suffix(&base, ".%(ext)s");

        self.downloader
            .download(&watch_url(video_id), lang, &template)
            .await?;

        let Some(path) = files.existing() else {
            debug!("No {lang} subtitles for {video_id}");
            return Ok(TranscriptOutcome::Unavailable);
        };

        let content = fs::read_to_string(path).await?;
        let text = normalize_vtt(&content);
        if text.is_empty() {
            return Ok(TranscriptOutcome::Unavailable);
        }
        Ok(TranscriptOutcome::Text(text))
    }
}
