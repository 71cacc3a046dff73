pub mod bus;
pub mod cancel;
pub mod delay;
pub mod driver;
pub mod memory;
pub mod metrics;
pub mod peripherals;
pub mod pins;
pub mod port;
pub mod snapshot;

use std::any::Any;


pub use cancel::CancellationToken;
pub use delay::Delay;
pub use driver::{BlinkDriver, PinState};
pub use pins::Pins;
pub use port::Port;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
    #[error("Port '{0}' is not mapped on the bus")]
    UnmappedPort(String),
    #[error("Address {0:#x} is already mapped")]
    AddressConflict(u64),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Trait for observing blink driver events in a modular way.
pub trait BlinkObserver: std::fmt::Debug + Send + Sync {
    fn on_run_start(&self) {}
    fn on_run_stop(&self) {}
    fn on_initialize(&self, _direction: u8) {}
    fn on_data_write(&self, _value: u8) {}
    fn on_delay(&self, _iterations: u64) {}
}

/// Trait representing a memory-mapped peripheral
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&self, offset: u64) -> SimResult<u8>;
    fn write(&mut self, offset: u64, value: u8) -> SimResult<()>;
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
}

/// Trait representing the system bus
pub trait Bus {
    fn read_u8(&self, addr: u64) -> SimResult<u8>;
    fn write_u8(&mut self, addr: u64, value: u8) -> SimResult<()>;
}
