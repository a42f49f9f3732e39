use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::config::Language;
use crate::error::StoreError;

/// What a completed timed run reports to a scoring service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub wpm: u32,
    pub accuracy: u32,
    pub language: Language,
    pub duration: u32,
}

/// Receiver of finished scores. The session never learns whether it succeeded.
pub trait ScoreSink {
    fn submit(&mut self, score: &ScoreSubmission) -> Result<(), StoreError>;

    /// Scores submitted so far, oldest first. Sinks that keep nothing return none.
    fn history(&self) -> Result<Vec<ScoreRecord>, StoreError> {
        Ok(Vec::new())
    }
}

/// A logged score and when it was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreRecord {
    pub logged_at: DateTime<Local>,
    pub score: ScoreSubmission,
}

#[derive(Debug, Serialize, Deserialize)]
struct ScoreRow {
    date: DateTime<Local>,
    wpm: u32,
    accuracy: u32,
    language: Language,
    duration: u32,
}

/// Appends every submitted score to a CSV file, writing the header on first use
#[derive(Debug, Clone)]
pub struct CsvScoreLog {
    path: PathBuf,
}

impl CsvScoreLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every logged score, oldest first
    pub fn read_all(&self) -> Result<Vec<ScoreSubmission>, StoreError> {
        Ok(self
            .read_records()?
            .into_iter()
            .map(|record| record.score)
            .collect())
    }

    /// Every logged score with the time it was logged, oldest first
    pub fn read_records(&self) -> Result<Vec<ScoreRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        for row in reader.deserialize::<ScoreRow>() {
            let row = row?;
            records.push(ScoreRecord {
                logged_at: row.date,
                score: ScoreSubmission {
                    wpm: row.wpm,
                    accuracy: row.accuracy,
                    language: row.language,
                    duration: row.duration,
                },
            });
        }
        Ok(records)
    }
}

impl ScoreSink for CsvScoreLog {
    fn submit(&mut self, score: &ScoreSubmission) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // If the log doesn't exist yet, we need to emit a header
        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);

        writer.serialize(ScoreRow {
            date: Local::now(),
            wpm: score.wpm,
            accuracy: score.accuracy,
            language: score.language,
            duration: score.duration,
        })?;
        writer.flush()?;
        Ok(())
    }

    fn history(&self) -> Result<Vec<ScoreRecord>, StoreError> {
        self.read_records()
    }
}
