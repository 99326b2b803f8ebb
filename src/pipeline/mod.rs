// Pipeline execution module
// Producer thread, segmenting consumer loop and stroke interpretation

pub mod interpreter;
pub mod listener;
pub mod runner;

use thiserror::Error;

use crate::classifier::ClassifierError;
use crate::touchpad::{JournalError, SourceError};

pub use interpreter::{Interpreter, Mode, StrokeOutcome};
pub use listener::Listener;
pub use runner::{record, run, split_windows, RunSummary, StopReason};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),
    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
