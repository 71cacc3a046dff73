use crate::pins::Pins;
use crate::{SimResult, SimulationError};
use portblink_config::DEFAULT_HISTORY_LIMIT;
use std::collections::VecDeque;

pub const DDR_OFFSET: u64 = 0x0;
pub const DR_OFFSET: u64 = 0x1;

/// Keeps the most recent `limit` values and a count of everything pushed.
#[derive(Debug)]
pub struct History {
    recent: VecDeque<u8>,
    limit: usize,
    total: u64,
}

impl History {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            recent: VecDeque::with_capacity(limit),
            limit,
            total: 0,
        }
    }

    pub fn push(&mut self, value: u8) {
        if self.recent.len() == self.limit {
            self.recent.pop_front();
        }
        self.recent.push_back(value);
        self.total += 1;
    }

    /// Retained values, oldest first.
    pub fn recent(&self) -> Vec<u8> {
        self.recent.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

/// H8/300H-style 8-bit I/O port.
///
/// Pins whose DDR bit is set drive the DR value; pins configured as inputs
/// read back the externally driven level through DR.
#[derive(Debug)]
pub struct IoPort {
    ddr: u8,
    dr: u8,
    input: u8,
    output: u8,
    dr_writes: History,
    output_history: History,
}

impl Default for IoPort {
    fn default() -> Self {
        Self::new()
    }
}

impl IoPort {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            ddr: 0,
            dr: 0,
            input: 0,
            output: 0,
            dr_writes: History::new(limit),
            output_history: History::new(limit),
        }
    }

    pub fn ddr(&self) -> u8 {
        self.ddr
    }

    pub fn dr(&self) -> u8 {
        self.dr
    }

    /// Level currently driven on the output pins.
    pub fn output(&self) -> Pins {
        Pins::from_bits_retain(self.output)
    }

    /// Most recent values the CPU stored into DR.
    pub fn dr_writes(&self) -> &History {
        &self.dr_writes
    }

    /// Output level after the most recent DDR or DR writes.
    pub fn output_history(&self) -> &History {
        &self.output_history
    }

    /// Change the level applied to the port from outside the chip.
    pub fn drive_input(&mut self, level: u8) {
        self.input = level;
        self.dr = (self.dr & self.ddr) | (!self.ddr & level);
    }

    fn write_ddr(&mut self, ddr: u8) {
        self.ddr = ddr;
        self.dr = (self.dr & ddr) | (!ddr & self.input);
        self.update_output(self.dr & ddr);
    }

    fn write_dr(&mut self, value: u8) {
        self.dr_writes.push(value);
        self.dr = (value & self.ddr) | (!self.ddr & self.input);
        self.update_output(value & self.ddr);
    }

    fn update_output(&mut self, level: u8) {
        if level != self.output {
            tracing::debug!("Port output {:#04x} -> {:#04x}", self.output, level);
        }
        self.output = level;
        self.output_history.push(level);
    }
}

impl crate::Peripheral for IoPort {
    fn read(&self, offset: u64) -> SimResult<u8> {
        match offset {
            DDR_OFFSET => Ok(self.ddr),
            DR_OFFSET => Ok(self.dr),
            _ => Err(SimulationError::MemoryViolation(offset)),
        }
    }

    fn write(&mut self, offset: u64, value: u8) -> SimResult<()> {
        match offset {
            DDR_OFFSET => self.write_ddr(value),
            DR_OFFSET => self.write_dr(value),
            _ => return Err(SimulationError::MemoryViolation(offset)),
        }
        Ok(())
    }

    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
        Some(self)
    }
}
