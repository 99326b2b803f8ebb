//! Linux evdev touchpad reader
//! Reads raw `input_event` records from `/dev/input/eventN`, the way evtest does

use std::ffi::c_long;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use super::source::{SampleSource, SourceError, SourceResult};
use super::types::Sample;

const EV_ABS: u16 = 0x03;
const ABS_X: u16 = 0x00;
const ABS_Y: u16 = 0x01;
const ABS_PRESSURE: u16 = 0x18;

/// Maximum number of records consumed by a single read
const EVENTS_PER_READ: usize = 64;

const LONG_SIZE: usize = std::mem::size_of::<c_long>();

/// `struct input_event`: a `timeval` (two longs), type, code, value
pub const INPUT_EVENT_SIZE: usize = 2 * LONG_SIZE + 2 + 2 + 4;

/// One decoded `input_event`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub seconds: i64,
    pub microseconds: i64,
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    /// Decode one record in native byte order.
    /// `bytes` must hold at least `INPUT_EVENT_SIZE` bytes.
    pub fn decode(bytes: &[u8]) -> Self {
        let seconds = read_long(&bytes[0..LONG_SIZE]);
        let microseconds = read_long(&bytes[LONG_SIZE..2 * LONG_SIZE]);
        let rest = &bytes[2 * LONG_SIZE..INPUT_EVENT_SIZE];
        InputEvent {
            seconds,
            microseconds,
            kind: u16::from_ne_bytes([rest[0], rest[1]]),
            code: u16::from_ne_bytes([rest[2], rest[3]]),
            value: i32::from_ne_bytes([rest[4], rest[5], rest[6], rest[7]]),
        }
    }

    /// Encode in native byte order (used by tests and fixtures)
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(INPUT_EVENT_SIZE);
        bytes.extend_from_slice(&(self.seconds as c_long).to_ne_bytes());
        bytes.extend_from_slice(&(self.microseconds as c_long).to_ne_bytes());
        bytes.extend_from_slice(&self.kind.to_ne_bytes());
        bytes.extend_from_slice(&self.code.to_ne_bytes());
        bytes.extend_from_slice(&self.value.to_ne_bytes());
        bytes
    }
}

fn read_long(bytes: &[u8]) -> i64 {
    let mut raw = [0u8; LONG_SIZE];
    raw.copy_from_slice(bytes);
    c_long::from_ne_bytes(raw) as i64
}

/// Fold one read's worth of records into a sample.
///
/// Axes missing from the batch stay at `-1`; the timestamp comes from the
/// first record.
pub fn sample_from_events(events: &[InputEvent]) -> Option<Sample> {
    let first = events.first()?;
    let mut sample = Sample::new(
        -1,
        -1,
        -1,
        Sample::combine_seconds_and_microseconds(first.seconds, first.microseconds),
    );

    for event in events.iter().filter(|e| e.kind == EV_ABS) {
        match event.code {
            ABS_X => sample.x = event.value,
            ABS_Y => sample.y = event.value,
            ABS_PRESSURE => sample.pressure = event.value,
            _ => {}
        }
    }

    Some(sample)
}

/// Process-wide handle on the touchpad event device.
///
/// Created with `initialize`, released by `shutdown` or on drop.
pub struct TouchpadDevice {
    path: PathBuf,
    file: Option<File>,
    buffer: Vec<u8>,
}

impl TouchpadDevice {
    /// Open the given event device, or discover one when `path` is `None`
    pub fn initialize(path: Option<&Path>) -> SourceResult<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => discover_touchpad()?,
        };

        let file = File::open(&path)?;
        log::info!("Opened touchpad device {}", path.display());

        Ok(TouchpadDevice {
            path,
            file: Some(file),
            buffer: vec![0; INPUT_EVENT_SIZE * EVENTS_PER_READ],
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the device. Further reads fail with `SourceError::ShutDown`.
    pub fn shutdown(&mut self) {
        if self.file.take().is_some() {
            log::info!("Closed touchpad device {}", self.path.display());
        }
    }
}

impl SampleSource for TouchpadDevice {
    fn next_sample(&mut self) -> SourceResult<Option<Sample>> {
        let file = self.file.as_mut().ok_or(SourceError::ShutDown)?;
        let read = file.read(&mut self.buffer)?;

        if read < INPUT_EVENT_SIZE {
            return Err(SourceError::ShortRead {
                path: self.path.display().to_string(),
                expected: INPUT_EVENT_SIZE,
                got: read,
            });
        }

        let events: Vec<InputEvent> = self.buffer[..read]
            .chunks_exact(INPUT_EVENT_SIZE)
            .map(InputEvent::decode)
            .collect();

        Ok(sample_from_events(&events))
    }
}

impl Drop for TouchpadDevice {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Find the first event device whose name mentions a touchpad
pub fn discover_touchpad() -> SourceResult<PathBuf> {
    discover_touchpad_in(Path::new("/sys/class/input"), Path::new("/dev/input"))
}

/// Scan `sys_root/eventN/device/name` and map a match to `dev_root/eventN`
pub fn discover_touchpad_in(sys_root: &Path, dev_root: &Path) -> SourceResult<PathBuf> {
    let mut candidates: Vec<(u32, String)> = Vec::new();

    for entry in fs::read_dir(sys_root)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        let Some(number) = name.strip_prefix("event").and_then(|n| n.parse().ok()) else {
            continue;
        };

        let device_name = match fs::read_to_string(entry.path().join("device").join("name")) {
            Ok(device_name) => device_name,
            Err(_) => continue,
        };

        log::debug!("{}: {}", name, device_name.trim());
        if device_name.to_lowercase().contains("touchpad") {
            candidates.push((number, name));
        }
    }

    candidates.sort();
    candidates
        .into_iter()
        .next()
        .map(|(_, name)| dev_root.join(name))
        .ok_or(SourceError::NoDevice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn abs(code: u16, value: i32) -> InputEvent {
        InputEvent {
            seconds: 100,
            microseconds: 250_000,
            kind: EV_ABS,
            code,
            value,
        }
    }

    #[test]
    fn test_input_event_encode_decode() {
        let event = abs(ABS_Y, 1234);
        let bytes = event.encode();
        assert_eq!(bytes.len(), INPUT_EVENT_SIZE);
        assert_eq!(InputEvent::decode(&bytes), event);
    }

    #[test]
    fn test_sample_from_events_missing_axis() {
        let sample = sample_from_events(&[abs(ABS_X, 300), abs(ABS_PRESSURE, 40)]).unwrap();
        assert_eq!(sample.x, 300);
        assert_eq!(sample.y, -1);
        assert_eq!(sample.pressure, 40);
        assert!((sample.time - 100.25).abs() < 1e-9);
        assert!(!sample.is_valid_point());
    }

    #[test]
    fn test_sample_from_events_ignores_other_types() {
        let syn = InputEvent {
            seconds: 1,
            microseconds: 0,
            kind: 0,
            code: 0,
            value: 0,
        };
        let sample = sample_from_events(&[syn]).unwrap();
        assert_eq!(sample.pressure, -1);
        assert!(sample_from_events(&[]).is_none());
    }

    #[test]
    fn test_device_reads_batch_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("event7");
        let mut file = File::create(&path).unwrap();
        for event in [abs(ABS_X, 10), abs(ABS_Y, 20), abs(ABS_PRESSURE, 0)] {
            file.write_all(&event.encode()).unwrap();
        }
        drop(file);

        let mut device = TouchpadDevice::initialize(Some(&path)).unwrap();
        let sample = device.next_sample().unwrap().unwrap();
        assert_eq!((sample.x, sample.y, sample.pressure), (10, 20, 0));

        // Nothing left to read
        assert!(matches!(
            device.next_sample(),
            Err(SourceError::ShortRead { got: 0, .. })
        ));

        device.shutdown();
        assert!(device.file.is_none());
        assert!(matches!(device.next_sample(), Err(SourceError::ShutDown)));
    }

    #[test]
    fn test_discover_touchpad_in() {
        let sys = TempDir::new().unwrap();
        for (event, name) in [
            ("event2", "AT Translated Set 2 keyboard"),
            ("event11", "SynPS/2 Synaptics TouchPad"),
            ("event5", "ELAN Touchpad"),
        ] {
            let dir = sys.path().join(event).join("device");
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("name"), format!("{}\n", name)).unwrap();
        }
        fs::create_dir_all(sys.path().join("mouse0")).unwrap();

        let found = discover_touchpad_in(sys.path(), Path::new("/dev/input")).unwrap();
        assert_eq!(found, PathBuf::from("/dev/input/event5"));
    }

    #[test]
    fn test_discover_touchpad_none() {
        let sys = TempDir::new().unwrap();
        let result = discover_touchpad_in(sys.path(), Path::new("/dev/input"));
        assert!(matches!(result, Err(SourceError::NoDevice)));
    }
}
