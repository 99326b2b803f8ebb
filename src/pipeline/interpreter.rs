// Window interpreter
// Turns a closed window into a training stroke or a dispatched symbol

use std::fmt;
use std::sync::Arc;

use super::PipelineResult;
use crate::classifier::{Classifier, TrainingProgress};
use crate::dispatch::Dispatcher;
use crate::features::get_features;
use crate::touchpad::{JournalEntry, JournalWriter, Sample, StrokeRecord};

/// What the interpreter does with each stroke
pub enum Mode {
    /// Feed strokes to the classifier's training session
    Training,
    /// Classify strokes and hand matches to the dispatcher
    Recognition(Arc<dyn Dispatcher>),
}

/// What became of one closed window
#[derive(Debug, Clone, PartialEq)]
pub enum StrokeOutcome {
    /// Empty, or only finger lifts
    Discarded,
    Training(TrainingProgress),
    Recognized { symbol: String, dispatched: bool },
    Unrecognized,
}

impl StrokeOutcome {
    pub fn ends_session(&self) -> bool {
        matches!(self, StrokeOutcome::Training(progress) if progress.is_completed())
    }
}

impl fmt::Display for StrokeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrokeOutcome::Discarded => f.write_str("discarded"),
            StrokeOutcome::Training(TrainingProgress::Collected { .. }) => f.write_str("training"),
            StrokeOutcome::Training(TrainingProgress::Completed { .. }) => {
                f.write_str("training_completed")
            }
            StrokeOutcome::Recognized { symbol, .. } => f.write_str(symbol),
            StrokeOutcome::Unrecognized => f.write_str("no_match"),
        }
    }
}

pub struct Interpreter {
    classifier: Classifier,
    mode: Mode,
    journal: Option<JournalWriter>,
}

impl Interpreter {
    /// Start a training session of `target_count` strokes of `symbol`
    pub fn training(
        mut classifier: Classifier,
        symbol: &str,
        target_count: usize,
    ) -> PipelineResult<Self> {
        classifier.reset_training_set(target_count, symbol)?;
        Ok(Self {
            classifier,
            mode: Mode::Training,
            journal: None,
        })
    }

    pub fn recognition(classifier: Classifier, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            classifier,
            mode: Mode::Recognition(dispatcher),
            journal: None,
        }
    }

    /// Append every interpreted stroke to a journal
    pub fn with_journal(mut self, journal: JournalWriter) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn into_classifier(self) -> Classifier {
        self.classifier
    }

    pub fn interpret(&mut self, window: Vec<Sample>) -> PipelineResult<StrokeOutcome> {
        if !window.iter().any(Sample::is_valid_point) {
            return Ok(StrokeOutcome::Discarded);
        }
        let Some(features) = get_features(&window) else {
            return Ok(StrokeOutcome::Discarded);
        };

        log::debug!(
            "Interpreting stroke of {} samples over {:.3}s",
            window.len(),
            window.last().map_or(0.0, |s| s.time) - window.first().map_or(0.0, |s| s.time)
        );

        let outcome = match &self.mode {
            Mode::Training => {
                StrokeOutcome::Training(self.classifier.add_to_training_set(features)?)
            }
            Mode::Recognition(dispatcher) => match self.classifier.classify(&features) {
                Some(symbol) => {
                    let dispatched = dispatcher.dispatch(&symbol);
                    StrokeOutcome::Recognized { symbol, dispatched }
                }
                None => {
                    log::info!("Stroke not similar to any symbol");
                    StrokeOutcome::Unrecognized
                }
            },
        };

        if let Some(journal) = &self.journal {
            let entry = JournalEntry::Stroke(StrokeRecord::new(outcome.to_string(), window));
            if let Err(e) = journal.write(&entry) {
                log::warn!("Failed to journal stroke: {}", e);
            }
        }

        Ok(outcome)
    }
}
