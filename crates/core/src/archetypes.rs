//! The user-maintained catalogue of narrative archetypes that analysis
//! prompts classify scripts against.

use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{PlotlineError, Result};

/// Rendered in place of the table when the catalogue is empty.
pub const NO_ARCHETYPES: &str = "No archetypes registered.";

const TABLE_HEADERS: [&str; 6] = [
    "번호",
    "기 (문제 제기)",
    "승 (예상 밖 전개)",
    "전 (몰입,긴장 유도)",
    "결 (결론/인사이트)",
    "특징",
];

/// A four-beat story shape: setup, development, turn and conclusion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archetype {
    /// 1-based position in the catalogue, kept in sync on every edit.
    #[serde(default)]
    pub number: usize,
    pub setup: String,
    pub development: String,
    pub turn: String,
    pub conclusion: String,
    #[serde(default)]
    pub traits: String,
}

impl Archetype {
    pub fn new(
        setup: impl Into<String>,
        development: impl Into<String>,
        turn: impl Into<String>,
        conclusion: impl Into<String>,
        traits: impl Into<String>,
    ) -> Self {
        Self {
            number: 0,
            setup: setup.into(),
            development: development.into(),
            turn: turn.into(),
            conclusion: conclusion.into(),
            traits: traits.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchetypeCatalogue {
    archetypes: Vec<Archetype>,
}

impl Default for ArchetypeCatalogue {
    /// The starter catalogue used until the user saves their own.
    fn default() -> Self {
        Self::from_archetypes([Archetype::new(
            "자극적인 욕망 제시 (돈/성/권력)",
            "점점 수상한 흐름",
            "갑작스러운 반전 상황",
            "허무 or 반전 결말",
            "유머 + 반전 + 유머",
        )])
    }
}

impl ArchetypeCatalogue {
    pub fn empty() -> Self {
        Self {
            archetypes: Vec::new(),
        }
    }

    pub fn from_archetypes(archetypes: impl IntoIterator<Item = Archetype>) -> Self {
        let mut catalogue = Self {
            archetypes: archetypes.into_iter().collect(),
        };
        catalogue.renumber();
        catalogue
    }

    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    /// Appends `archetype` and returns the number it was given.
    pub fn add(&mut self, archetype: Archetype) -> usize {
        self.archetypes.push(archetype);
        self.renumber();
        self.archetypes.len()
    }

    /// Removes the archetype numbered `number`; later ones move up.
    pub fn remove(&mut self, number: usize) -> Option<Archetype> {
        let index = number.checked_sub(1).filter(|&i| i < self.archetypes.len())?;
        let removed = self.archetypes.remove(index);
        self.renumber();
        Some(removed)
    }

    fn renumber(&mut self) {
        for (i, archetype) in self.archetypes.iter_mut().enumerate() {
            archetype.number = i + 1;
        }
    }

    /// Markdown table substituted for `{archetypes_table}` in prompts.
    pub fn to_markdown_table(&self) -> String {
        if self.archetypes.is_empty() {
            return NO_ARCHETYPES.to_string();
        }

        let mut output = format!("| {} |\n", TABLE_HEADERS.join(" | "));
        output.push_str(&format!("|{}\n", "---|".repeat(TABLE_HEADERS.len())));
        for archetype in &self.archetypes {
            let cells = [
                archetype.number.to_string(),
                cell(&archetype.setup),
                cell(&archetype.development),
                cell(&archetype.turn),
                cell(&archetype.conclusion),
                cell(&archetype.traits),
            ];
            output.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        output
    }
}

fn cell(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

/// The catalogue persisted as JSON.
#[derive(Debug, Clone)]
pub struct ArchetypeStore {
    path: PathBuf,
}

impl ArchetypeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the catalogue, or the starter catalogue when none was saved yet.
    pub async fn load(&self) -> Result<ArchetypeCatalogue> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No archetypes at {}, using defaults", self.path.display());
                return Ok(ArchetypeCatalogue::default());
            }
            Err(e) => return Err(self.error(e)),
        };
        let archetypes: Vec<Archetype> = serde_json::from_str(&json).map_err(|e| self.error(e))?;
        Ok(ArchetypeCatalogue::from_archetypes(archetypes))
    }

    pub async fn save(&self, catalogue: &ArchetypeCatalogue) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let pretty_json = serde_json::to_string_pretty(catalogue)?;
        fs::write(&self.path, &pretty_json)
            .await
            .map_err(|e| self.error(e))
    }

    fn error(&self, reason: impl ToString) -> PlotlineError {
        PlotlineError::ArchetypeStore {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}
