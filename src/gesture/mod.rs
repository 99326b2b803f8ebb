// Gesture segmentation module
// Groups the raw sample stream into bounded windows

pub mod collection;

pub use collection::{
    SegmenterConfig, SignalCollection, DEFAULT_MAX_IDLE_GAP, MAX_DURATION_OF_GROUP,
    MAX_NUMBER_OF_SAMPLES_IN_GROUP,
};
