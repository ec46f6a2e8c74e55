//! Coalesces bursts of values into the last one per quiet window.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Forwards only the most recent pushed value once no new value has
/// arrived for a full window. Dropping the debouncer flushes whatever
/// is still pending.
pub struct Debouncer<T: Send + 'static> {
    tx: mpsc::Sender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(window: Duration, out: mpsc::Sender<T>) -> Self {
        let (tx, rx) = mpsc::channel::<T>();
        thread::spawn(move || run(window, rx, out));
        Self { tx }
    }

    pub fn push(&self, value: T) {
        let _ = self.tx.send(value);
    }
}

fn run<T>(window: Duration, rx: mpsc::Receiver<T>, out: mpsc::Sender<T>) {
    loop {
        // Block until a burst starts.
        let mut latest = match rx.recv() {
            Ok(value) => value,
            Err(_) => return,
        };

        // Absorb the burst until a full window passes with nothing new.
        loop {
            match rx.recv_timeout(window) {
                Ok(value) => latest = value,
                Err(mpsc::RecvTimeoutError::Timeout) => break,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    let _ = out.send(latest);
                    return;
                }
            }
        }

        if out.send(latest).is_err() {
            return;
        }
    }
}
