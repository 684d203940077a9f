use std::path::{Path, PathBuf};

use log::{debug, warn};

const APP_DIR: &str = "plotline";

/// Prefix of the scratch files the transcript extractor writes.
pub const SUBTITLE_PREFIX: &str = "temp_sub_";

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(APP_DIR)
}

pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(APP_DIR)
}

/// Get the path of the persisted collection session
pub fn get_session_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("session.json")
}

/// Get the scratch directory for subtitle downloads
pub fn get_subtitles_dir(cache_dir: &Path) -> PathBuf {
    cache_dir.join("subtitles")
}

pub fn get_key_store_path(config_dir: &Path) -> PathBuf {
    config_dir.join("keys.json")
}

pub fn get_archetypes_path(config_dir: &Path) -> PathBuf {
    config_dir.join("archetypes.json")
}

/// Removes subtitle scratch files left behind by an interrupted run.
/// Returns how many were removed.
pub fn clean_stale_subtitles(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_scratch = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with(SUBTITLE_PREFIX));
        if !is_scratch || !path.is_file() {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed stale {}", path.display());
                removed += 1;
            }
            Err(e) => warn!("Failed to remove {}: {e}", path.display()),
        }
    }
    removed
}
