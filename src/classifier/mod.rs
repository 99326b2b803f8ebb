// Classifier module
// Nearest-neighbor symbol models, tolerance learning and recognition

pub mod knn;
pub mod model;
pub mod recognizer;
pub mod registry;
pub mod tolerance;

pub use knn::{euclidean_distance, JointModel, NearestNeighbors};
pub use model::{SymbolModel, JOINT_NEIGHBORS, SYMBOL_NEIGHBORS};
pub use recognizer::{
    required_artifacts, Classifier, ClassifierError, ClassifierResult, SymbolSummary,
    TrainingProgress, TrainingSession, MIN_TRAINING_SIZE,
};
pub use registry::SymbolRegistry;
pub use tolerance::compute_tolerance_distance;
