// Feature extraction module
// Normalizes strokes into comparable fixed-length vectors

pub mod extractor;
pub mod geometry;

pub use extractor::{
    get_features, get_new_points, FeatureVector, ANGLE_DOWNSCALE, FEATURE_VECTOR_LEN,
    LIFT_MARKER, NUMBER_OF_POINTS, SCALE,
};
pub use geometry::{Bounds, Curve, Line, Point, Scaler};
