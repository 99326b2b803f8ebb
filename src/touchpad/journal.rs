// Sample journal
// Append-only JSONL file of raw samples and interpreted strokes, used for
// recording sessions and replaying them later

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use super::types::Sample;

/// Errors that can occur during journal operations
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// A stroke that went through the interpreter, with what became of it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrokeRecord {
    /// Unique identifier for this stroke
    pub id: Uuid,

    /// ISO 8601 timestamp of when the stroke was interpreted
    pub recorded_at: String,

    /// Interpreter outcome (symbol name, "no_match", "training", ...)
    pub outcome: String,

    /// The raw window as handed to the feature extractor
    pub samples: Vec<Sample>,
}

impl StrokeRecord {
    pub fn new(outcome: impl Into<String>, samples: Vec<Sample>) -> Self {
        StrokeRecord {
            id: Uuid::new_v4(),
            recorded_at: Utc::now().to_rfc3339(),
            outcome: outcome.into(),
            samples,
        }
    }
}

/// One line of the journal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalEntry {
    Sample(Sample),
    Stroke(StrokeRecord),
}

impl JournalEntry {
    /// Serialize to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Journal writer
/// Manages an append-only JSONL file
pub struct JournalWriter {
    file_path: PathBuf,
}

impl JournalWriter {
    pub fn new(file_path: PathBuf) -> Self {
        JournalWriter { file_path }
    }

    /// Append an entry, creating the file if it doesn't exist
    pub fn write(&self, entry: &JournalEntry) -> Result<(), JournalError> {
        let mut file = self.open()?;
        file.write_all(entry.to_json_line()?.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Write multiple entries at once
    pub fn write_batch(&self, entries: &[JournalEntry]) -> Result<(), JournalError> {
        let mut file = self.open()?;
        for entry in entries {
            file.write_all(entry.to_json_line()?.as_bytes())?;
        }
        file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn open(&self) -> Result<File, JournalError> {
        Ok(OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?)
    }
}

/// Streaming reader over a journal file
pub struct JournalReader {
    lines: std::io::Lines<BufReader<File>>,
}

impl JournalReader {
    pub fn open(path: &Path) -> Result<Self, JournalError> {
        let file = File::open(path)?;
        Ok(JournalReader {
            lines: BufReader::new(file).lines(),
        })
    }

    /// Next entry, skipping blank lines. `None` at end of file.
    pub fn next_entry(&mut self) -> Result<Option<JournalEntry>, JournalError> {
        for line in self.lines.by_ref() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(serde_json::from_str(&line)?));
        }
        Ok(None)
    }
}

/// Read every entry of a journal file
pub fn read_journal_file(path: &Path) -> Result<Vec<JournalEntry>, JournalError> {
    let mut reader = JournalReader::open(path)?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry()? {
        entries.push(entry);
    }
    Ok(entries)
}
