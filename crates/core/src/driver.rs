use crate::cancel::CancellationToken;
use crate::delay::Delay;
use crate::pins::Pins;
use crate::port::Port;
use crate::snapshot::{RunReport, StopReason};
use crate::BlinkObserver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Value written to the direction register: every pin is an output.
pub const DIRECTION: u8 = Pins::ALL_OUTPUT.bits();
/// Data pattern for [`PinState::Low`].
pub const PATTERN_LOW: u8 = Pins::PIN0_LOW.bits();
/// Data pattern for [`PinState::High`].
pub const PATTERN_HIGH: u8 = Pins::ALL_HIGH.bits();

pub const DELAY_OUTER: u64 = 2;
pub const DELAY_INNER: u64 = 3_800_000;
/// Iterations burned by one [`BlinkDriver::delay`] call.
pub const DELAY_ITERATIONS: u64 = DELAY_OUTER * DELAY_INNER;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinState {
    /// Pin 0 driven low, the others high.
    Low,
    /// All pins driven high.
    High,
}

impl PinState {
    pub fn pattern(self) -> u8 {
        match self {
            PinState::Low => PATTERN_LOW,
            PinState::High => PATTERN_HIGH,
        }
    }

    fn next(state: Option<PinState>) -> PinState {
        match state {
            None | Some(PinState::High) => PinState::Low,
            Some(PinState::Low) => PinState::High,
        }
    }
}

/// Drives one port between two fixed patterns with a counted delay in between.
pub struct BlinkDriver<P: Port, D: Delay> {
    port: P,
    delay: D,
    initialized: bool,
    state: Option<PinState>,
    toggles: u64,
    delay_iterations: u64,
    observers: Vec<Arc<dyn BlinkObserver>>,
}

impl<P: Port, D: Delay> BlinkDriver<P, D> {
    pub fn new(port: P, delay: D) -> Self {
        Self {
            port,
            delay,
            initialized: false,
            state: None,
            toggles: 0,
            delay_iterations: 0,
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn BlinkObserver>) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> Option<PinState> {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn toggles(&self) -> u64 {
        self.toggles
    }

    /// Delay iterations requested over the driver's lifetime.
    pub fn delay_iterations(&self) -> u64 {
        self.delay_iterations
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn into_parts(self) -> (P, D) {
        (self.port, self.delay)
    }

    /// Configure every pin of the port as an output.
    pub fn initialize(&mut self) {
        self.port.set_direction(DIRECTION);
        self.initialized = true;
        tracing::info!("Port direction set to {:#04x}", DIRECTION);
        for observer in &self.observers {
            observer.on_initialize(DIRECTION);
        }
    }

    /// Burn `DELAY_OUTER * DELAY_INNER` iterations and return that count.
    pub fn delay(&mut self) -> u64 {
        for _ in 0..DELAY_OUTER {
            self.delay.wait(DELAY_INNER);
        }
        self.delay_iterations += DELAY_ITERATIONS;
        for observer in &self.observers {
            observer.on_delay(DELAY_ITERATIONS);
        }
        DELAY_ITERATIONS
    }

    /// Perform one transition: write the next pattern, then delay.
    pub fn step(&mut self) -> PinState {
        if !self.initialized {
            self.initialize();
        }

        let next = PinState::next(self.state);
        let value = next.pattern();
        self.port.set_data(value);
        tracing::debug!("Data <- {:#04x} ({:?})", value, next);
        for observer in &self.observers {
            observer.on_data_write(value);
        }

        self.state = Some(next);
        self.toggles += 1;
        self.delay();
        next
    }

    /// Toggle until `cancel` is set. The token is checked before every transition.
    pub fn run(&mut self, cancel: &CancellationToken) -> RunReport {
        self.run_inner(cancel, None)
    }

    /// Like [`BlinkDriver::run`], but also stop after `max_toggles` transitions.
    pub fn run_bounded(&mut self, cancel: &CancellationToken, max_toggles: u64) -> RunReport {
        self.run_inner(cancel, Some(max_toggles))
    }

    fn run_inner(&mut self, cancel: &CancellationToken, max_toggles: Option<u64>) -> RunReport {
        if !self.initialized {
            self.initialize();
        }

        for observer in &self.observers {
            observer.on_run_start();
        }
        tracing::info!("Blink loop started");

        let mut performed = 0u64;
        let stop_reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if max_toggles.is_some_and(|max| performed >= max) {
                break StopReason::MaxToggles;
            }
            self.step();
            performed += 1;
        };

        for observer in &self.observers {
            observer.on_run_stop();
        }
        tracing::info!(
            "Blink loop stopped after {} toggles ({:?})",
            performed,
            stop_reason
        );

        RunReport {
            toggles: performed,
            last_state: self.state,
            stop_reason,
            delay_iterations: performed * DELAY_ITERATIONS,
        }
    }
}
