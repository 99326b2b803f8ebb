// Touchpad input module
// Sample type, sample sources (evdev device, journal replay) and the sample journal

pub mod device;
pub mod journal;
pub mod source;
pub mod types;

pub use device::{discover_touchpad, TouchpadDevice};
pub use journal::{read_journal_file, JournalEntry, JournalError, JournalWriter, StrokeRecord};
pub use source::{ReplaySource, SampleSource, SourceError, SourceResult, VecSource};
pub use types::Sample;
