use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NO_TRANSCRIPT: &str = "no transcript";
pub const TRANSCRIPT_ERROR: &str = "extraction error";
pub const NO_COMMENTS: &str = "no comments";
pub const COMMENTS_ERROR: &str = "comment fetch failed";
pub const NO_DESCRIPTION: &str = "no description";

/// Display format for publish timestamps, always in UTC.
pub const PUBLISHED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum TranscriptOutcome {
    Text(String),
    Unavailable,
    Failed,
}

impl TranscriptOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            TranscriptOutcome::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            TranscriptOutcome::Text(text) => text.clone(),
            TranscriptOutcome::Unavailable => NO_TRANSCRIPT.to_string(),
            TranscriptOutcome::Failed => TRANSCRIPT_ERROR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "comments", rename_all = "snake_case")]
pub enum CommentsOutcome {
    Fetched(Vec<String>),
    Empty,
    Failed,
}

impl CommentsOutcome {
    pub fn render(&self) -> String {
        match self {
            CommentsOutcome::Fetched(comments) => comments.join("\n"),
            CommentsOutcome::Empty => NO_COMMENTS.to_string(),
            CommentsOutcome::Failed => COMMENTS_ERROR.to_string(),
        }
    }
}

/// One collected video. Identity is [`VideoRecord::video_id`].
///
/// Serializes with tagged outcomes for session storage; [`ExportRow`] is the
/// flat shape used for exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub channel_name: String,
    pub title: String,
    pub view_count: u64,
    pub published_at: Option<DateTime<Utc>>,
    pub transcript: TranscriptOutcome,
    pub comments: CommentsOutcome,
    pub description: String,
}

impl VideoRecord {
    pub fn url(&self) -> String {
        crate::youtube::watch_url(&self.video_id)
    }

    pub fn published_display(&self) -> String {
        self.published_at
            .map(|at| at.format(PUBLISHED_FORMAT).to_string())
            .unwrap_or_default()
    }
}

/// The flat, string-typed shape records are exported in. Outcomes are
/// rendered to their sentinel strings here and nowhere else.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub channel_name: String,
    pub title: String,
    pub video_url: String,
    pub view_count: u64,
    pub published_at: String,
    pub transcript: String,
    pub comments: String,
    pub description: String,
}

impl From<&VideoRecord> for ExportRow {
    fn from(record: &VideoRecord) -> Self {
        ExportRow {
            channel_name: record.channel_name.clone(),
            title: record.title.clone(),
            video_url: record.url(),
            view_count: record.view_count,
            published_at: record.published_display(),
            transcript: record.transcript.render(),
            comments: record.comments.render(),
            description: record.description.clone(),
        }
    }
}

/// Lightweight result of the upload listing walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub video_id: String,
    pub title: String,
    pub view_count: u64,
}
