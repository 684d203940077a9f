pub mod analysis;
pub mod archetypes;
pub mod batch;
pub mod cache;
pub mod config;
pub mod details;
pub mod error;
pub mod format;
pub mod keys;
pub mod provider;
pub mod quota;
pub mod resolver;
pub mod session;
pub mod stats;
pub mod transcript;
pub mod types;
pub mod uploads;
pub mod youtube;

#[cfg(test)]
mod testing;

pub use analysis::{
    Analyst, DEFAULT_SYSTEM_INSTRUCTION, channel_prompt, channel_scripts, compare_prompt,
    video_prompt,
};
pub use archetypes::{Archetype, ArchetypeCatalogue, ArchetypeStore};
pub use batch::{BatchOptions, BatchProgress, collect_batch};
pub use cache::{
    clean_stale_subtitles, get_archetypes_path, get_config_dir, get_key_store_path,
    get_root_cache_dir, get_session_path, get_subtitles_dir,
};
pub use config::{KeyStore, Settings};
pub use details::fetch_video_details;
pub use error::{PlotlineError, Result};
pub use format::{
    format_daily_views, format_listing, format_record_readable, format_upload_pattern,
    records_to_markdown,
};
pub use keys::KeyPool;
pub use provider::{Provider, ProviderConfig};
pub use quota::with_quota_rotation;
pub use resolver::{Target, resolve, resolve_channel};
pub use session::{CollectionSession, ListKind};
pub use stats::{DailyViewsReport, UploadPattern, daily_average_views};
pub use transcript::{CaptionDownloader, TranscriptExtractor, YtDlp};
pub use types::{CommentsOutcome, ExportRow, TranscriptOutcome, VideoRecord, VideoSummary};
pub use uploads::{ChannelUploads, collect_uploads, list_all_uploads};
pub use youtube::{YoutubeApi, YoutubeClient};
