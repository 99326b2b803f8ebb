// Stroke segmentation
// Buffers the live sample stream into a bounded window and decides when the
// window holds a complete gesture

use std::collections::VecDeque;

use crate::touchpad::Sample;

/// Hard cap on the number of samples in one window
pub const MAX_NUMBER_OF_SAMPLES_IN_GROUP: usize = 3000;

/// Maximum head-to-tail span of a window, in seconds
pub const MAX_DURATION_OF_GROUP: f64 = 4.0;

/// Default pause after which the window counts as a finished gesture
pub const DEFAULT_MAX_IDLE_GAP: f64 = 0.3;

/// Limits and closing rules of the segmenter
#[derive(Debug, Clone, PartialEq)]
pub struct SegmenterConfig {
    /// Windows never hold more samples than this
    pub max_size: usize,

    /// Windows never span more seconds than this
    pub max_duration: f64,

    /// Pause (seconds) after the last sample that closes the window
    pub max_idle_gap: f64,

    /// Also close the window as soon as the finger is lifted
    pub end_on_finger_lift: bool,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        SegmenterConfig {
            max_size: MAX_NUMBER_OF_SAMPLES_IN_GROUP,
            max_duration: MAX_DURATION_OF_GROUP,
            max_idle_gap: DEFAULT_MAX_IDLE_GAP,
            end_on_finger_lift: false,
        }
    }
}

/// The open window of samples
///
/// Owned by a single consumer; every mutation goes through `&mut self`, so
/// `take` cannot interleave with an append.
#[derive(Debug, Default)]
pub struct SignalCollection {
    samples: VecDeque<Sample>,
    config: SegmenterConfig,
    finished: bool,
}

impl SignalCollection {
    pub fn new(config: SegmenterConfig) -> Self {
        SignalCollection {
            samples: VecDeque::new(),
            config,
            finished: false,
        }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Append a sample, evicting from the head to keep the window bounded.
    ///
    /// Samples that are neither a position nor a finger lift are ignored;
    /// returns whether the sample was kept.
    pub fn add_and_maintain(&mut self, sample: Sample) -> bool {
        if !sample.is_relevant() {
            return false;
        }

        while self.need_to_remove_head(&sample) {
            self.samples.pop_front();
        }

        if self.config.end_on_finger_lift && sample.is_lift_marker() && self.has_valid_point() {
            self.finished = true;
        }

        self.samples.push_back(sample);
        true
    }

    fn need_to_remove_head(&self, new_sample: &Sample) -> bool {
        match self.samples.front() {
            None => false,
            Some(head) => {
                self.is_too_big() || new_sample.time - head.time > self.config.max_duration
            }
        }
    }

    fn is_too_big(&self) -> bool {
        self.samples.len() >= self.config.max_size
    }

    /// False once more than the idle gap has passed since the last sample.
    /// An empty window is always recent enough.
    pub fn is_recent_enough(&self, now: f64) -> bool {
        match self.samples.back() {
            None => true,
            Some(tail) => now - tail.time <= self.config.max_idle_gap,
        }
    }

    /// The finger-lift rule fired
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The window is non-empty and should be handed to the extractor
    pub fn should_close(&self, now: f64) -> bool {
        !self.samples.is_empty() && (self.finished || !self.is_recent_enough(now))
    }

    /// Close the window: hand out its samples and start over empty
    pub fn take(&mut self) -> Vec<Sample> {
        self.finished = false;
        std::mem::take(&mut self.samples).into()
    }

    pub fn has_valid_point(&self) -> bool {
        self.samples.iter().any(Sample::is_valid_point)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }
}
