use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::{
    archetypes::ArchetypeStore,
    cache::{get_archetypes_path, get_config_dir, get_key_store_path, get_root_cache_dir},
    error::{PlotlineError, Result},
    keys::KeyPool,
};

pub const KEYS_VAR: &str = "PLOTLINE_YOUTUBE_KEYS";
pub const YTDLP_VAR: &str = "PLOTLINE_YTDLP";
pub const SUB_LANG_VAR: &str = "PLOTLINE_SUB_LANG";
pub const HTTP_TIMEOUT_VAR: &str = "PLOTLINE_HTTP_TIMEOUT_SECS";
pub const SUBTITLE_TIMEOUT_VAR: &str = "PLOTLINE_SUBTITLE_TIMEOUT_SECS";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SUBTITLE_TIMEOUT_SECS: u64 = 120;

/// Runtime settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Keys from the environment, used in addition to the key store.
    pub env_keys: Vec<String>,
    pub ytdlp: PathBuf,
    pub subtitle_lang: String,
    pub http_timeout: Duration,
    pub subtitle_timeout: Duration,
    pub cache_dir: PathBuf,
    pub config_dir: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let env_keys = get(KEYS_VAR)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            env_keys,
            ytdlp: get(YTDLP_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("yt-dlp")),
            subtitle_lang: get(SUB_LANG_VAR)
                .map(|lang| lang.trim().to_string())
                .unwrap_or_else(|| "ko".to_string()),
            http_timeout: secs(HTTP_TIMEOUT_VAR, get(HTTP_TIMEOUT_VAR), DEFAULT_HTTP_TIMEOUT_SECS)?,
            subtitle_timeout: secs(
                SUBTITLE_TIMEOUT_VAR,
                get(SUBTITLE_TIMEOUT_VAR),
                DEFAULT_SUBTITLE_TIMEOUT_SECS,
            )?,
            cache_dir: get_root_cache_dir(),
            config_dir: get_config_dir(),
        })
    }

    pub fn key_store(&self) -> KeyStore {
        KeyStore::new(get_key_store_path(&self.config_dir))
    }

    pub fn archetype_store(&self) -> ArchetypeStore {
        ArchetypeStore::new(get_archetypes_path(&self.config_dir))
    }

    /// Stored keys followed by environment keys, duplicates dropped.
    pub async fn key_pool(&self) -> Result<KeyPool> {
        let mut pool = self.key_store().load().await?;
        for key in &self.env_keys {
            pool.add_key(key.as_str());
        }
        Ok(pool)
    }
}

fn secs(var: &str, raw: Option<String>, default: u64) -> Result<Duration> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs(default));
    };
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(PlotlineError::Config {
            var: var.to_string(),
            reason: format!("expected a positive number of seconds, got {raw:?}"),
        }),
        Ok(n) => Ok(Duration::from_secs(n)),
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredKeys {
    #[serde(default)]
    youtube_keys: Vec<String>,
}

/// YouTube API keys persisted as JSON.
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<KeyPool> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No key store at {}", self.path.display());
                return Ok(KeyPool::new());
            }
            Err(e) => return Err(self.error(e)),
        };
        let stored: StoredKeys = serde_json::from_str(&json).map_err(|e| self.error(e))?;
        Ok(KeyPool::from_keys(stored.youtube_keys))
    }

    pub async fn save(&self, pool: &KeyPool) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let stored = StoredKeys {
            youtube_keys: pool.keys().to_vec(),
        };
        let pretty_json = serde_json::to_string_pretty(&stored)?;
        fs::write(&self.path, &pretty_json)
            .await
            .map_err(|e| self.error(e))
    }

    fn error(&self, reason: impl ToString) -> PlotlineError {
        PlotlineError::KeyStore {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}
