use portblink_config::{DelayConfig, DelayKind};
use std::hint::black_box;
use std::time::Duration;

/// Strategy used to burn a given number of delay-loop iterations.
pub trait Delay {
    fn wait(&mut self, iterations: u64);
}

impl<D: Delay + ?Sized> Delay for &mut D {
    fn wait(&mut self, iterations: u64) {
        (**self).wait(iterations)
    }
}

impl<D: Delay + ?Sized> Delay for Box<D> {
    fn wait(&mut self, iterations: u64) {
        (**self).wait(iterations)
    }
}

/// Empty counting loop, as run on the target.
#[derive(Debug, Default)]
pub struct BusyWait {
    executed: u64,
}

impl BusyWait {
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterations executed since construction.
    pub fn executed(&self) -> u64 {
        self.executed
    }
}

impl Delay for BusyWait {
    fn wait(&mut self, iterations: u64) {
        let mut i = 0u64;
        while black_box(i) < iterations {
            i += 1;
        }
        self.executed += i;
    }
}

/// Host substitute charging a fixed wall-clock cost per iteration.
#[derive(Debug, Clone)]
pub struct SleepDelay {
    per_iteration: Duration,
}

impl SleepDelay {
    pub fn new(per_iteration: Duration) -> Self {
        Self { per_iteration }
    }

    pub fn duration_for(&self, iterations: u64) -> Duration {
        let nanos = (self.per_iteration.as_nanos() as u64).saturating_mul(iterations);
        Duration::from_nanos(nanos)
    }
}

impl Delay for SleepDelay {
    fn wait(&mut self, iterations: u64) {
        std::thread::sleep(self.duration_for(iterations));
    }
}

/// Returns immediately; keeps count of what was requested.
#[derive(Debug, Default)]
pub struct NoDelay {
    requested: u64,
}

impl NoDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> u64 {
        self.requested
    }
}

impl Delay for NoDelay {
    fn wait(&mut self, iterations: u64) {
        self.requested += iterations;
    }
}

pub fn from_config(config: &DelayConfig) -> Box<dyn Delay + Send> {
    match config.strategy {
        DelayKind::Busy => Box::new(BusyWait::new()),
        DelayKind::Sleep => Box::new(SleepDelay::new(Duration::from_nanos(config.iteration_ns))),
        DelayKind::None => Box::new(NoDelay::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_wait_counts_every_iteration() {
        let mut delay = BusyWait::new();
        delay.wait(1_000);
        delay.wait(0);
        delay.wait(24);
        assert_eq!(delay.executed(), 1_024);
    }

    #[test]
    fn test_sleep_duration_saturates() {
        let delay = SleepDelay::new(Duration::from_nanos(66));
        assert_eq!(delay.duration_for(1_000), Duration::from_nanos(66_000));
        assert_eq!(delay.duration_for(u64::MAX), Duration::from_nanos(u64::MAX));
    }

    #[test]
    fn test_no_delay_records_request() {
        let mut delay = NoDelay::new();
        delay.wait(3_800_000);
        delay.wait(3_800_000);
        assert_eq!(delay.requested(), 7_600_000);
    }
}
