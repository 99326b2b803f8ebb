// Consumer loop
// Feeds samples into the segmenter and interprets every window it closes

use std::future::Future;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep_until, Duration, Instant};

use super::interpreter::{Interpreter, StrokeOutcome};
use super::PipelineResult;
use crate::gesture::{SegmenterConfig, SignalCollection};
use crate::touchpad::{JournalEntry, JournalWriter, Sample};

/// Why the loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    EndOfStream,
    TrainingComplete,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub strokes: usize,
    pub recognized: usize,
    pub unrecognized: usize,
    pub discarded: usize,
    pub outcomes: Vec<StrokeOutcome>,
}

impl RunSummary {
    fn record(&mut self, outcome: StrokeOutcome) {
        self.strokes += 1;
        match &outcome {
            StrokeOutcome::Recognized { .. } => self.recognized += 1,
            StrokeOutcome::Unrecognized => self.unrecognized += 1,
            StrokeOutcome::Discarded => self.discarded += 1,
            StrokeOutcome::Training(_) => {}
        }
        self.outcomes.push(outcome);
    }
}

/// Segmenter plus the wall-clock arrival of its newest sample. "Now" is
/// the tail's own timestamp advanced by the time since it arrived, which
/// keeps device clocks and replayed timestamps comparable.
struct Window {
    collection: SignalCollection,
    tail_arrival: Option<Instant>,
}

impl Window {
    fn new(config: SegmenterConfig) -> Self {
        Self {
            collection: SignalCollection::new(config),
            tail_arrival: None,
        }
    }

    fn idle_deadline(&self) -> Option<Instant> {
        if self.collection.is_empty() {
            return None;
        }
        let gap = Duration::from_secs_f64(self.collection.config().max_idle_gap);
        self.tail_arrival.map(|arrival| arrival + gap)
    }

    fn take(&mut self) -> Vec<Sample> {
        self.tail_arrival = None;
        self.collection.take()
    }
}

/// Drive the interpreter until the stream ends, `shutdown` resolves or a
/// training session completes. The open window is interpreted before
/// returning.
pub async fn run<F>(
    mut samples: UnboundedReceiver<Sample>,
    interpreter: &mut Interpreter,
    config: SegmenterConfig,
    shutdown: F,
) -> PipelineResult<(StopReason, RunSummary)>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut window = Window::new(config);
    let mut summary = RunSummary::default();

    loop {
        let deadline = window.idle_deadline();

        let closed = tokio::select! {
            biased;

            _ = &mut shutdown => {
                log::info!("Shutting down, interpreting the open window");
                let reason = if flush(&mut window, interpreter, &mut summary)? {
                    StopReason::TrainingComplete
                } else {
                    StopReason::Shutdown
                };
                return Ok((reason, summary));
            }

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                flush(&mut window, interpreter, &mut summary)?
            }

            sample = samples.recv() => match sample {
                None => {
                    let reason = if flush(&mut window, interpreter, &mut summary)? {
                        StopReason::TrainingComplete
                    } else {
                        StopReason::EndOfStream
                    };
                    return Ok((reason, summary));
                }
                Some(sample) => push_sample(&mut window, sample, interpreter, &mut summary)?,
            },
        };

        if closed {
            return Ok((StopReason::TrainingComplete, summary));
        }
    }
}

/// Returns true if a training session ended
fn push_sample(
    window: &mut Window,
    sample: Sample,
    interpreter: &mut Interpreter,
    summary: &mut RunSummary,
) -> PipelineResult<bool> {
    if sample.is_stop() {
        return flush(window, interpreter, summary);
    }

    // The pause before this sample already ended the previous stroke
    if window.collection.should_close(sample.time) && flush(window, interpreter, summary)? {
        return Ok(true);
    }

    if window.collection.add_and_maintain(sample) {
        window.tail_arrival = Some(Instant::now());
    }

    if window.collection.is_finished() {
        return flush(window, interpreter, summary);
    }
    Ok(false)
}

/// Interpret the open window, if any. Returns true if a training session
/// ended.
fn flush(
    window: &mut Window,
    interpreter: &mut Interpreter,
    summary: &mut RunSummary,
) -> PipelineResult<bool> {
    if window.collection.is_empty() {
        return Ok(false);
    }

    let outcome = interpreter.interpret(window.take())?;
    let ends_session = outcome.ends_session();
    if outcome != StrokeOutcome::Discarded {
        log::info!("Stroke {}: {}", summary.strokes + 1, outcome);
    }
    summary.record(outcome);
    Ok(ends_session)
}

/// Split a finite, timestamped sample stream into windows the way the live
/// loop would
pub fn split_windows<I>(samples: I, config: SegmenterConfig) -> Vec<Vec<Sample>>
where
    I: IntoIterator<Item = Sample>,
{
    let mut collection = SignalCollection::new(config);
    let mut windows = Vec::new();

    for sample in samples {
        if sample.is_stop() {
            if !collection.is_empty() {
                windows.push(collection.take());
            }
            continue;
        }
        if collection.should_close(sample.time) {
            windows.push(collection.take());
        }
        collection.add_and_maintain(sample);
        if collection.is_finished() {
            windows.push(collection.take());
        }
    }

    if !collection.is_empty() {
        windows.push(collection.take());
    }
    windows
}

/// Journal every sample until the stream ends or `shutdown` resolves.
/// Returns the number of samples written.
pub async fn record<F>(
    mut samples: UnboundedReceiver<Sample>,
    journal: &JournalWriter,
    shutdown: F,
) -> PipelineResult<usize>
where
    F: Future<Output = ()>,
{
    const BATCH_SIZE: usize = 64;

    tokio::pin!(shutdown);
    let mut batch = Vec::with_capacity(BATCH_SIZE);
    let mut written = 0;

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break,

            sample = samples.recv() => match sample {
                Some(sample) => {
                    batch.push(JournalEntry::Sample(sample));
                    if batch.len() >= BATCH_SIZE {
                        journal.write_batch(&batch)?;
                        written += batch.len();
                        batch.clear();
                    }
                }
                None => break,
            },
        }
    }

    journal.write_batch(&batch)?;
    written += batch.len();
    log::info!("Recorded {} samples to {}", written, journal.path().display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::dispatch::MemoryDispatcher;
    use crate::state::{MemoryStore, Partition};
    use crate::touchpad::read_journal_file;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::mpsc::unbounded_channel;

    fn stroke(x0: i32, dy: i32, t0: f64) -> Vec<Sample> {
        let mut samples: Vec<Sample> = (0..20)
            .map(|i| Sample::new(x0 + i * 10, 100 + i * dy, 40, t0 + i as f64 * 0.01))
            .collect();
        samples.push(Sample::lift(t0 + 0.2));
        samples
    }

    fn feed(samples: Vec<Sample>) -> UnboundedReceiver<Sample> {
        let (tx, rx) = unbounded_channel();
        for sample in samples {
            tx.send(sample).unwrap();
        }
        rx
    }

    fn training_interpreter(target: usize) -> Interpreter {
        let classifier = Classifier::new(Arc::new(MemoryStore::new()), Partition::UserDefined).unwrap();
        Interpreter::training(classifier, "slash", target).unwrap()
    }

    #[test]
    fn test_split_windows_on_idle_gap() {
        let mut samples = stroke(0, 10, 0.0);
        samples.extend(stroke(0, 10, 1.0));
        samples.extend(stroke(0, 10, 1.25));

        let windows = split_windows(samples, SegmenterConfig::default());
        // 1.25 follows the lift at 1.2 within the gap, so it joins the second stroke
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].len(), 21);
        assert_eq!(windows[1].len(), 42);
    }

    #[test]
    fn test_split_windows_on_finger_lift() {
        let mut samples = stroke(0, 10, 0.0);
        samples.extend(stroke(0, 10, 0.25));

        let config = SegmenterConfig {
            end_on_finger_lift: true,
            ..SegmenterConfig::default()
        };
        assert_eq!(split_windows(samples.clone(), config).len(), 2);
        assert_eq!(split_windows(samples, SegmenterConfig::default()).len(), 1);
    }

    #[tokio::test]
    async fn test_training_session_ends_the_loop() {
        let mut samples = Vec::new();
        for i in 0..7 {
            samples.extend(stroke(0, 10 + i, i as f64));
        }

        let mut interpreter = training_interpreter(5);
        let (reason, summary) = run(
            feed(samples),
            &mut interpreter,
            SegmenterConfig::default(),
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(reason, StopReason::TrainingComplete);
        assert_eq!(summary.strokes, 5);
        assert!(summary.outcomes[4].ends_session());
        assert!(interpreter.classifier().registry().contains("slash"));
    }

    #[tokio::test]
    async fn test_last_training_stroke_at_end_of_stream() {
        let mut samples = Vec::new();
        for i in 0..5 {
            samples.extend(stroke(0, 10 + i, i as f64));
        }

        let mut interpreter = training_interpreter(5);
        let (reason, summary) = run(
            feed(samples),
            &mut interpreter,
            SegmenterConfig::default(),
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(reason, StopReason::TrainingComplete);
        assert_eq!(summary.strokes, 5);
    }

    #[tokio::test]
    async fn test_end_of_stream_flushes_last_window() {
        let mut samples = stroke(0, 10, 0.0);
        samples.extend(stroke(0, 10, 1.0));

        let dispatcher = Arc::new(MemoryDispatcher::new());
        let classifier = Classifier::new(Arc::new(MemoryStore::new()), Partition::UserDefined).unwrap();
        let mut interpreter = Interpreter::recognition(classifier, dispatcher);

        let (reason, summary) = run(
            feed(samples),
            &mut interpreter,
            SegmenterConfig::default(),
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(reason, StopReason::EndOfStream);
        assert_eq!(summary.strokes, 2);
        assert_eq!(summary.unrecognized, 2);
    }

    #[tokio::test]
    async fn test_idle_timer_closes_window() {
        let (tx, rx) = unbounded_channel();
        for sample in stroke(0, 10, 0.0) {
            tx.send(sample).unwrap();
        }

        let mut interpreter = training_interpreter(5);
        let config = SegmenterConfig {
            max_idle_gap: 0.05,
            ..SegmenterConfig::default()
        };
        // The sender stays open, only the timer can close the window
        let shutdown = tokio::time::sleep(Duration::from_millis(500));
        let (reason, summary) = run(rx, &mut interpreter, config, shutdown).await.unwrap();

        assert_eq!(reason, StopReason::Shutdown);
        assert_eq!(summary.strokes, 1);
        assert_eq!(interpreter.classifier().session().unwrap().collected(), 1);
        drop(tx);
    }

    #[tokio::test]
    async fn test_shutdown_interprets_open_window() {
        let (tx, rx) = unbounded_channel();
        for sample in stroke(0, 10, 0.0) {
            tx.send(sample).unwrap();
        }

        let mut interpreter = training_interpreter(5);
        let config = SegmenterConfig {
            max_idle_gap: 60.0,
            ..SegmenterConfig::default()
        };
        let shutdown = tokio::time::sleep(Duration::from_millis(50));
        let (reason, summary) = run(rx, &mut interpreter, config, shutdown).await.unwrap();

        assert_eq!(reason, StopReason::Shutdown);
        assert_eq!(summary.strokes, 1);
        drop(tx);
    }

    #[tokio::test]
    async fn test_shutdown_completes_training_on_last_stroke() {
        let (tx, rx) = unbounded_channel();
        for i in 0..5 {
            for sample in stroke(0, 10 + i, i as f64) {
                tx.send(sample).unwrap();
            }
        }

        // Four strokes are closed by the next one's timestamp, the fifth is
        // still open when the shutdown fires
        let mut interpreter = training_interpreter(5);
        let shutdown = tokio::time::sleep(Duration::from_millis(50));
        let (reason, summary) = run(rx, &mut interpreter, SegmenterConfig::default(), shutdown)
            .await
            .unwrap();

        assert_eq!(reason, StopReason::TrainingComplete);
        assert_eq!(summary.strokes, 5);
        assert!(summary.outcomes[4].ends_session());
        assert!(interpreter.classifier().session().is_none());
        assert!(interpreter.classifier().registry().contains("slash"));
        drop(tx);
    }

    #[tokio::test]
    async fn test_shutdown_dispatches_last_stroke() {
        let mut samples = Vec::new();
        for i in 0..5 {
            samples.extend(stroke(0, 10 + i, i as f64));
        }
        let mut trainer = training_interpreter(5);
        run(
            feed(samples),
            &mut trainer,
            SegmenterConfig::default(),
            std::future::pending(),
        )
        .await
        .unwrap();

        let dispatcher = Arc::new(MemoryDispatcher::new());
        let mut interpreter = Interpreter::recognition(trainer.into_classifier(), dispatcher.clone());

        let (tx, rx) = unbounded_channel();
        for sample in stroke(0, 12, 10.0) {
            tx.send(sample).unwrap();
        }
        let config = SegmenterConfig {
            max_idle_gap: 60.0,
            ..SegmenterConfig::default()
        };
        let shutdown = tokio::time::sleep(Duration::from_millis(50));
        let (reason, summary) = run(rx, &mut interpreter, config, shutdown).await.unwrap();

        assert_eq!(reason, StopReason::Shutdown);
        assert_eq!(summary.recognized, 1);
        assert_eq!(dispatcher.dispatched(), vec!["slash"]);
        drop(tx);
    }

    #[tokio::test]
    async fn test_record_writes_samples() {
        let temp_dir = TempDir::new().unwrap();
        let journal = JournalWriter::new(temp_dir.path().join("samples.jsonl"));

        let samples: Vec<Sample> = (0..100).map(|i| Sample::new(i, i, 5, i as f64 * 0.01)).collect();
        let written = record(feed(samples), &journal, std::future::pending())
            .await
            .unwrap();

        assert_eq!(written, 100);
        assert_eq!(read_journal_file(journal.path()).unwrap().len(), 100);
    }
}
