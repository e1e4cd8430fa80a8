//! High-score persistence
//!
//! The game keeps exactly one number across runs. [`HighScoreStore`] is the
//! seam the state machine talks to; [`FileHighScoreStore`] keeps the value in a
//! small JSON file and [`MemoryHighScoreStore`] keeps it in memory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Storage for the best score ever reached
pub trait HighScoreStore: Send {
    /// Read the stored high score. Unreadable storage counts as zero.
    fn load_high_score(&self) -> u32;

    fn save_high_score(&mut self, score: u32) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct HighScoreRecord {
    high_score: u32,
}

/// High score kept as `{"high_score": N}` in a JSON file
#[derive(Debug, Clone)]
pub struct FileHighScoreStore {
    path: PathBuf,
}

impl FileHighScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<HighScoreRecord> {
        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read high score from {:?}", self.path))?;
        serde_json::from_str(&json).context("Failed to deserialize high score")
    }
}

impl HighScoreStore for FileHighScoreStore {
    fn load_high_score(&self) -> u32 {
        if !self.path.exists() {
            return 0;
        }
        match self.read() {
            Ok(record) => record.high_score,
            Err(err) => {
                tracing::warn!("Ignoring unreadable high score file: {:#}", err);
                0
            }
        }
    }

    fn save_high_score(&mut self, score: u32) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(&HighScoreRecord { high_score: score })
            .context("Failed to serialize high score")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write high score to {:?}", self.path))?;

        tracing::debug!(score, path = ?self.path, "high score saved");
        Ok(())
    }
}

/// In-memory store. Clones share the same value.
#[derive(Debug, Clone, Default)]
pub struct MemoryHighScoreStore {
    value: Arc<Mutex<u32>>,
}

impl MemoryHighScoreStore {
    pub fn new(initial: u32) -> Self {
        Self {
            value: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn get(&self) -> u32 {
        self.value.lock().map(|v| *v).unwrap_or(0)
    }
}

impl HighScoreStore for MemoryHighScoreStore {
    fn load_high_score(&self) -> u32 {
        self.get()
    }

    fn save_high_score(&mut self, score: u32) -> Result<()> {
        let mut value = self
            .value
            .lock()
            .map_err(|_| anyhow::anyhow!("high score lock poisoned"))?;
        *value = score;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_zero() {
        let dir = TempDir::new().unwrap();
        let store = FileHighScoreStore::new(dir.path().join("score.json"));
        assert_eq!(store.load_high_score(), 0);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("score.json");
        let mut store = FileHighScoreStore::new(&path);

        store.save_high_score(120).unwrap();

        assert_eq!(FileHighScoreStore::new(&path).load_high_score(), 120);
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"high_score\": 120"));
    }

    #[test]
    fn test_corrupt_file_loads_zero() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("score.json");
        std::fs::write(&path, "not json").unwrap();

        assert_eq!(FileHighScoreStore::new(&path).load_high_score(), 0);
    }

    #[test]
    fn test_memory_store_clones_share_value() {
        let store = MemoryHighScoreStore::new(5);
        let mut writer = store.clone();

        writer.save_high_score(40).unwrap();

        assert_eq!(store.load_high_score(), 40);
    }
}
