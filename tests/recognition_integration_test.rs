//! Recognition Integration Tests
//!
//! Drives the whole chain the way the CLI does:
//! recorded journal -> listener -> segmenter -> training -> archive -> recognition

use std::path::Path;
use std::sync::Arc;

use glyphpad_lib::classifier::{Classifier, ClassifierError};
use glyphpad_lib::dispatch::MemoryDispatcher;
use glyphpad_lib::gesture::SegmenterConfig;
use glyphpad_lib::pipeline::{self, Interpreter, Listener, StopReason};
use glyphpad_lib::state::{
    export_partition, import_partition, ArtifactKey, ModelStore, Partition, SqliteStore,
};
use glyphpad_lib::touchpad::{JournalEntry, JournalWriter, ReplaySource, Sample};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

/// A straight stroke of `len` samples followed by a finger lift
fn straight(x0: i32, y0: i32, dx: i32, dy: i32, len: i32, t0: f64) -> Vec<Sample> {
    let mut samples: Vec<Sample> = (0..len)
        .map(|i| Sample::new(x0 + i * dx, y0 + i * dy, 40, t0 + i as f64 * 0.01))
        .collect();
    samples.push(Sample::lift(t0 + len as f64 * 0.01));
    samples
}

/// Down-right then up-right, like a "v"
fn vee(t0: f64) -> Vec<Sample> {
    let mut samples: Vec<Sample> = (0..21)
        .map(|k| {
            let depth = if k < 10 { k } else { 20 - k };
            Sample::new(100 + k * 10, 100 + depth * 10, 40, t0 + k as f64 * 0.01)
        })
        .collect();
    samples.push(Sample::lift(t0 + 0.21));
    samples
}

fn write_journal(path: &Path, strokes: Vec<Vec<Sample>>) {
    let entries: Vec<JournalEntry> = strokes
        .into_iter()
        .flatten()
        .map(JournalEntry::Sample)
        .collect();
    JournalWriter::new(path.to_path_buf())
        .write_batch(&entries)
        .unwrap();
}

async fn train_from_journal(store: Arc<dyn ModelStore>, symbol: &str, journal: &Path) {
    let classifier = Classifier::new(store, Partition::UserDefined).unwrap();
    let mut interpreter = Interpreter::training(classifier, symbol, 5).unwrap();

    let (listener, samples) = Listener::spawn(Box::new(ReplaySource::open(journal).unwrap()));
    let (reason, summary) = pipeline::run(
        samples,
        &mut interpreter,
        SegmenterConfig::default(),
        std::future::pending(),
    )
    .await
    .unwrap();
    listener.stop();

    assert_eq!(reason, StopReason::TrainingComplete);
    assert_eq!(summary.strokes, 5);
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_train_export_import_and_recognize() {
    let temp_dir = TempDir::new().unwrap();

    // Five slashes with slopes 1.0 to 1.4, five dashes with slopes 0 to 0.4
    let slash_journal = temp_dir.path().join("slash.jsonl");
    write_journal(
        &slash_journal,
        (0..5)
            .map(|i| straight(100, 100, 10, 10 + i, 20, i as f64))
            .collect(),
    );
    let dash_journal = temp_dir.path().join("dash.jsonl");
    write_journal(
        &dash_journal,
        (0..5)
            .map(|i| straight(100, 300, 10, i, 20, i as f64))
            .collect(),
    );

    let store: Arc<dyn ModelStore> =
        Arc::new(SqliteStore::open(&temp_dir.path().join("models.db")).unwrap());
    train_from_journal(store.clone(), "slash", &slash_journal).await;
    train_from_journal(store.clone(), "dash", &dash_journal).await;

    let archive = temp_dir.path().join("user.glyphs.json");
    let exported = export_partition(store.as_ref(), Partition::UserDefined, &archive).unwrap();
    assert_eq!(exported.symbols, 2);
    assert_eq!(exported.artifacts, 7);

    let fresh: Arc<dyn ModelStore> =
        Arc::new(SqliteStore::open(&temp_dir.path().join("restored.db")).unwrap());
    import_partition(fresh.as_ref(), &archive, None).unwrap();

    let classifier = Classifier::open_for_recognition(fresh, Partition::UserDefined).unwrap();
    let dispatcher = Arc::new(MemoryDispatcher::new());
    let mut interpreter = Interpreter::recognition(classifier, dispatcher.clone());

    let queries = temp_dir.path().join("queries.jsonl");
    write_journal(
        &queries,
        vec![
            straight(400, 400, 20, 24, 15, 0.0),
            straight(50, 50, 5, 1, 30, 1.0),
            straight(200, 200, 0, 10, 20, 2.0),
            vee(3.0),
        ],
    );

    let (listener, samples) = Listener::spawn(Box::new(ReplaySource::open(&queries).unwrap()));
    let (reason, summary) = pipeline::run(
        samples,
        &mut interpreter,
        SegmenterConfig::default(),
        std::future::pending(),
    )
    .await
    .unwrap();
    listener.join();

    assert_eq!(reason, StopReason::EndOfStream);
    assert_eq!(summary.recognized, 2);
    assert_eq!(summary.unrecognized, 2);
    assert_eq!(dispatcher.dispatched(), vec!["slash", "dash"]);
}

#[tokio::test]
async fn test_recognition_refuses_untrained_partition() {
    let temp_dir = TempDir::new().unwrap();
    let store: Arc<dyn ModelStore> =
        Arc::new(SqliteStore::open(&temp_dir.path().join("models.db")).unwrap());

    match Classifier::open_for_recognition(store, Partition::Hardcoded32) {
        Err(ClassifierError::MissingArtifact(key)) => {
            assert_eq!(key, ArtifactKey::joint(Partition::Hardcoded32));
        }
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("recognition started without models"),
    }
}
