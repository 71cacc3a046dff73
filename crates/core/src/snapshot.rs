use crate::bus::SystemBus;
use crate::driver::PinState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Cancelled,
    MaxToggles,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunReport {
    pub toggles: u64,
    pub last_state: Option<PinState>,
    pub stop_reason: StopReason,
    pub delay_iterations: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PortSnapshot {
    pub ddr_address: u64,
    pub dr_address: u64,
    pub ddr: u8,
    pub dr: u8,
    pub output: u8,
    /// Most recent DR writes, bounded by the board's history limit.
    pub dr_writes: Vec<u8>,
    pub dr_write_count: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RegisterSnapshot {
    pub address: u64,
    pub value: u8,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RunSnapshot {
    pub report: RunReport,
    pub ports: BTreeMap<String, PortSnapshot>,
    pub registers: BTreeMap<String, RegisterSnapshot>,
}

impl RunSnapshot {
    pub fn capture(report: RunReport, bus: &SystemBus) -> Self {
        let ports = bus
            .ports
            .iter()
            .filter_map(|entry| {
                let port = bus.port(&entry.name)?;
                Some((
                    entry.name.clone(),
                    PortSnapshot {
                        ddr_address: entry.ddr_addr,
                        dr_address: entry.dr_addr,
                        ddr: port.ddr(),
                        dr: port.dr(),
                        output: port.output().bits(),
                        dr_writes: port.dr_writes().recent(),
                        dr_write_count: port.dr_writes().total(),
                    },
                ))
            })
            .collect();
        let registers = bus
            .registers
            .iter()
            .map(|(address, name, value)| (name.to_string(), RegisterSnapshot { address, value }))
            .collect();
        Self {
            report,
            ports,
            registers,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
