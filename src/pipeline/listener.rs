// Sample producer
// Reads the blocking sample source on its own thread and forwards samples to
// the async consumer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::touchpad::{Sample, SampleSource};

/// Handle on the producer thread
pub struct Listener {
    stop_signal: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Listener {
    /// Start reading `source`. The returned receiver yields every sample in
    /// order and closes when the source ends or the listener is stopped.
    pub fn spawn(source: Box<dyn SampleSource>) -> (Self, UnboundedReceiver<Sample>) {
        let (tx, rx) = unbounded_channel();
        let stop_signal = Arc::new(AtomicBool::new(false));

        let thread_stop = Arc::clone(&stop_signal);
        let handle = thread::spawn(move || run_listener(source, tx, thread_stop));

        (
            Self {
                stop_signal,
                handle: Some(handle),
            },
            rx,
        )
    }

    /// Ask the thread to stop after the sample it is waiting for
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop and wait for the thread, only sensible for finite sources
    pub fn join(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Listener thread panicked");
            }
        }
    }
}

fn run_listener(
    mut source: Box<dyn SampleSource>,
    tx: UnboundedSender<Sample>,
    stop_signal: Arc<AtomicBool>,
) {
    let mut forwarded = 0usize;
    while !stop_signal.load(Ordering::SeqCst) {
        match source.next_sample() {
            Ok(Some(sample)) => {
                if tx.send(sample).is_err() {
                    // Consumer is gone
                    break;
                }
                forwarded += 1;
            }
            Ok(None) => {
                log::debug!("Sample source ended");
                break;
            }
            Err(e) => {
                log::error!("Touchpad fetch error: {}", e);
                break;
            }
        }
    }
    log::debug!("Listener stopped after {} samples", forwarded);
}
