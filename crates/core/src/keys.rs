use crate::error::{PlotlineError, Result};

/// Ordered set of interchangeable YouTube API keys with one active entry.
///
/// The cursor is always a valid index while the pool is non-empty and is
/// reset to 0 once the pool becomes empty.
#[derive(Debug, Clone, Default)]
pub struct KeyPool {
    keys: Vec<String>,
    cursor: usize,
}

impl KeyPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut pool = Self::new();
        for key in keys {
            pool.add_key(key);
        }
        pool
    }

    /// Appends `key` unless it is blank or already present. Returns whether
    /// the pool changed.
    pub fn add_key(&mut self, key: impl Into<String>) -> bool {
        let key = key.into().trim().to_string();
        if key.is_empty() || self.keys.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    /// Removes the key at `index`, keeping the cursor in bounds.
    pub fn remove_key(&mut self, index: usize) -> Option<String> {
        if index >= self.keys.len() {
            return None;
        }
        let removed = self.keys.remove(index);
        if self.keys.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.keys.len() {
            self.cursor = self.keys.len() - 1;
        }
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.cursor = 0;
    }

    pub fn active_key(&self) -> Result<&str> {
        self.keys
            .get(self.cursor)
            .map(String::as_str)
            .ok_or(PlotlineError::EmptyPool)
    }

    /// Advances to the next key, wrapping around. Returns the new cursor.
    pub fn rotate(&mut self) -> Result<usize> {
        if self.keys.is_empty() {
            return Err(PlotlineError::EmptyPool);
        }
        self.cursor = (self.cursor + 1) % self.keys.len();
        Ok(self.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}
