// Sample sources
// Anything that yields touchpad samples one at a time, in order

use std::collections::VecDeque;
use std::path::Path;
use thiserror::Error;

use super::journal::{JournalEntry, JournalError, JournalReader};
use super::types::Sample;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("No touchpad device found")]
    NoDevice,

    #[error("Short read from {path}: expected at least {expected} bytes, got {got}")]
    ShortRead {
        path: String,
        expected: usize,
        got: usize,
    },

    #[error("Device already shut down")]
    ShutDown,
}

pub type SourceResult<T> = Result<T, SourceError>;

/// A blocking, ordered stream of samples.
///
/// Timestamps never decrease within a session. `Ok(None)` marks the end of
/// the stream; live devices never return it.
pub trait SampleSource: Send {
    fn next_sample(&mut self) -> SourceResult<Option<Sample>>;
}

/// In-memory source, mostly for tests
#[derive(Debug, Default)]
pub struct VecSource {
    samples: VecDeque<Sample>,
}

impl VecSource {
    pub fn new(samples: Vec<Sample>) -> Self {
        VecSource {
            samples: samples.into(),
        }
    }
}

impl SampleSource for VecSource {
    fn next_sample(&mut self) -> SourceResult<Option<Sample>> {
        Ok(self.samples.pop_front())
    }
}

/// Replays the samples of a recorded journal, ignoring stroke records
pub struct ReplaySource {
    reader: JournalReader,
}

impl ReplaySource {
    pub fn open(path: &Path) -> SourceResult<Self> {
        log::info!("Replaying samples from {}", path.display());
        Ok(ReplaySource {
            reader: JournalReader::open(path)?,
        })
    }
}

impl SampleSource for ReplaySource {
    fn next_sample(&mut self) -> SourceResult<Option<Sample>> {
        while let Some(entry) = self.reader.next_entry()? {
            if let JournalEntry::Sample(sample) = entry {
                return Ok(Some(sample));
            }
        }
        Ok(None)
    }
}
