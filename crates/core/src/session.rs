use std::{collections::HashSet, fmt, path::Path};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::{error::Result, types::VideoRecord};

/// Which of the session's record lists an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Records collected from channel inputs.
    Channel,
    /// Records collected from individual video URLs.
    Individual,
    /// Records moved aside for statistics and analysis.
    Analysis,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Channel => "channel",
            ListKind::Individual => "individual",
            ListKind::Analysis => "analysis",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything collected so far, across runs.
///
/// A video id appears in at most one list. [`CollectionSession::known_ids`]
/// is derived from the lists, so it always covers every stored record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionSession {
    #[serde(default)]
    channel: Vec<VideoRecord>,
    #[serde(default)]
    individual: Vec<VideoRecord>,
    #[serde(default)]
    analysis: Vec<VideoRecord>,
}

impl CollectionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self, kind: ListKind) -> &[VideoRecord] {
        match kind {
            ListKind::Channel => &self.channel,
            ListKind::Individual => &self.individual,
            ListKind::Analysis => &self.analysis,
        }
    }

    fn list_mut(&mut self, kind: ListKind) -> &mut Vec<VideoRecord> {
        match kind {
            ListKind::Channel => &mut self.channel,
            ListKind::Individual => &mut self.individual,
            ListKind::Analysis => &mut self.analysis,
        }
    }

    /// Collected records not yet moved to analysis, channel list first.
    pub fn collected(&self) -> impl Iterator<Item = &VideoRecord> {
        self.channel.iter().chain(self.individual.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty() && self.individual.is_empty() && self.analysis.is_empty()
    }

    /// Ids of every record in every list.
    pub fn known_ids(&self) -> HashSet<String> {
        self.channel
            .iter()
            .chain(&self.individual)
            .chain(&self.analysis)
            .map(|record| record.video_id.clone())
            .collect()
    }

    /// Appends new records to `kind`, skipping ids already present anywhere.
    /// Returns how many were added.
    pub fn extend(&mut self, kind: ListKind, records: Vec<VideoRecord>) -> usize {
        let mut known = self.known_ids();
        let list = self.list_mut(kind);
        let before = list.len();
        for record in records {
            if known.insert(record.video_id.clone()) {
                list.push(record);
            } else {
                debug!("Dropping duplicate record {}", record.video_id);
            }
        }
        list.len() - before
    }

    /// Removes the records at `indices` (0-based) from `kind`. Out-of-range
    /// and repeated indices are ignored. Returns the removed records in list
    /// order.
    pub fn delete(&mut self, kind: ListKind, indices: &[usize]) -> Vec<VideoRecord> {
        let list = self.list_mut(kind);
        let mut selected: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < list.len())
            .collect();
        selected.sort_unstable();
        selected.dedup();

        let mut removed: Vec<VideoRecord> = selected
            .iter()
            .rev()
            .map(|&i| list.remove(i))
            .collect();
        removed.reverse();
        removed
    }

    /// Moves the records at `indices` from `kind` to the analysis list.
    pub fn move_to_analysis(&mut self, kind: ListKind, indices: &[usize]) -> usize {
        if kind == ListKind::Analysis {
            return 0;
        }
        let moved = self.delete(kind, indices);
        let count = moved.len();
        self.analysis.extend(moved);
        info!("Moved {count} record(s) from the {kind} list to analysis");
        count
    }

    /// Empties both collection lists. The analysis list is kept.
    pub fn clear_collected(&mut self) -> usize {
        let cleared = self.channel.len() + self.individual.len();
        self.channel.clear();
        self.individual.clear();
        cleared
    }

    pub fn clear_list(&mut self, kind: ListKind) -> usize {
        let list = self.list_mut(kind);
        let cleared = list.len();
        list.clear();
        cleared
    }

    /// Loads a session file, or starts empty when the file does not exist.
    pub async fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path).await {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session at {}, starting empty", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let pretty_json = serde_json::to_string_pretty(self)?;
        fs::write(path, &pretty_json).await?;
        Ok(())
    }
}
