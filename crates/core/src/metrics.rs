use crate::BlinkObserver;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct RunWindow {
    start: Instant,
    stop: Option<Instant>,
}

#[derive(Debug)]
pub struct BlinkMetrics {
    data_writes: AtomicU64,
    delay_iterations: AtomicU64,
    last_data: AtomicU64,
    window: Mutex<RunWindow>,
}

impl Default for BlinkMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl BlinkMetrics {
    pub fn new() -> Self {
        Self {
            data_writes: AtomicU64::new(0),
            delay_iterations: AtomicU64::new(0),
            last_data: AtomicU64::new(u64::MAX),
            window: Mutex::new(RunWindow {
                start: Instant::now(),
                stop: None,
            }),
        }
    }

    /// Data-register writes, i.e. toggles.
    pub fn get_toggles(&self) -> u64 {
        self.data_writes.load(Ordering::SeqCst)
    }

    pub fn get_delay_iterations(&self) -> u64 {
        self.delay_iterations.load(Ordering::SeqCst)
    }

    pub fn get_last_data(&self) -> Option<u8> {
        u8::try_from(self.last_data.load(Ordering::SeqCst)).ok()
    }

    /// Time spent in the run loop; frozen once the run stops.
    pub fn get_elapsed(&self) -> Duration {
        match self.window.lock() {
            Ok(w) => match w.stop {
                Some(stop) => stop.duration_since(w.start),
                None => w.start.elapsed(),
            },
            Err(_) => Duration::ZERO,
        }
    }

    pub fn get_toggles_per_sec(&self) -> f64 {
        let elapsed = self.get_elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.get_toggles() as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl BlinkObserver for BlinkMetrics {
    fn on_run_start(&self) {
        if let Ok(mut w) = self.window.lock() {
            w.start = Instant::now();
            w.stop = None;
        }
    }

    fn on_run_stop(&self) {
        if let Ok(mut w) = self.window.lock() {
            w.stop = Some(Instant::now());
        }
    }

    fn on_data_write(&self, value: u8) {
        self.data_writes.fetch_add(1, Ordering::SeqCst);
        self.last_data.store(value as u64, Ordering::SeqCst);
    }

    fn on_delay(&self, iterations: u64) {
        self.delay_iterations.fetch_add(iterations, Ordering::SeqCst);
    }
}
