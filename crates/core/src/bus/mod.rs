use crate::memory::RegisterFile;
use crate::peripherals::ioport::{IoPort, DDR_OFFSET, DR_OFFSET};
use crate::{Peripheral, SimResult, SimulationError};
use anyhow::Context;
use portblink_config::{BoardManifest, H8_3067_PBDDR, H8_3067_PBDR};

#[derive(Debug)]
pub struct PortEntry {
    pub name: String,
    pub ddr_addr: u64,
    pub dr_addr: u64,
    pub dev: Box<dyn Peripheral>,
}

impl PortEntry {
    fn offset_of(&self, addr: u64) -> Option<u64> {
        if addr == self.ddr_addr {
            Some(DDR_OFFSET)
        } else if addr == self.dr_addr {
            Some(DR_OFFSET)
        } else {
            None
        }
    }
}

/// Byte-addressed bus routing accesses to I/O ports and plain registers.
///
/// On the H8/3067 the DDR and DR of a port live in different register
/// blocks, so each port is mapped at two independent addresses.
#[derive(Debug, Default)]
pub struct SystemBus {
    pub registers: RegisterFile,
    pub ports: Vec<PortEntry>,
}

impl SystemBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus with Port B of the H8/3067 installed at PBDDR/PBDR.
    pub fn h8_3067() -> SimResult<Self> {
        let mut bus = Self::new();
        bus.add_port("port_b", H8_3067_PBDDR, H8_3067_PBDR, Box::new(IoPort::new()))?;
        Ok(bus)
    }

    pub fn from_config(board: &BoardManifest) -> anyhow::Result<Self> {
        let mut bus = Self::new();
        for port in &board.ports {
            bus.add_port(
                &port.id,
                port.ddr_address,
                port.dr_address,
                Box::new(IoPort::with_history_limit(board.history_limit)),
            )
            .with_context(|| format!("Failed to map port '{}'", port.id))?;
            tracing::debug!(
                "Mapped {} (DDR {:#x}, DR {:#x})",
                port.id,
                port.ddr_address,
                port.dr_address
            );
        }
        for reg in &board.registers {
            if bus.is_mapped(reg.address) {
                anyhow::bail!(
                    "Failed to map register '{}': {}",
                    reg.name,
                    SimulationError::AddressConflict(reg.address)
                );
            }
            bus.registers.map(reg.address, &reg.name, reg.reset);
        }
        Ok(bus)
    }

    pub fn is_mapped(&self, addr: u64) -> bool {
        self.registers.is_mapped(addr) || self.ports.iter().any(|p| p.offset_of(addr).is_some())
    }

    pub fn add_port(
        &mut self,
        name: &str,
        ddr_addr: u64,
        dr_addr: u64,
        dev: Box<dyn Peripheral>,
    ) -> SimResult<()> {
        for addr in [ddr_addr, dr_addr] {
            if self.is_mapped(addr) {
                return Err(SimulationError::AddressConflict(addr));
            }
        }
        if ddr_addr == dr_addr {
            return Err(SimulationError::AddressConflict(ddr_addr));
        }
        self.ports.push(PortEntry {
            name: name.to_string(),
            ddr_addr,
            dr_addr,
            dev,
        });
        Ok(())
    }

    pub fn port_entry(&self, name: &str) -> Option<&PortEntry> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn port(&self, name: &str) -> Option<&IoPort> {
        self.port_entry(name)
            .and_then(|p| p.dev.as_any())
            .and_then(|any| any.downcast_ref::<IoPort>())
    }

    pub fn port_mut(&mut self, name: &str) -> Option<&mut IoPort> {
        self.ports
            .iter_mut()
            .find(|p| p.name == name)
            .and_then(|p| p.dev.as_any_mut())
            .and_then(|any| any.downcast_mut::<IoPort>())
    }
}

impl crate::Bus for SystemBus {
    fn read_u8(&self, addr: u64) -> SimResult<u8> {
        for p in &self.ports {
            if let Some(offset) = p.offset_of(addr) {
                return p.dev.read(offset);
            }
        }
        if let Some(byte) = self.registers.read_u8(addr) {
            return Ok(byte);
        }
        Err(SimulationError::MemoryViolation(addr))
    }

    fn write_u8(&mut self, addr: u64, value: u8) -> SimResult<()> {
        for p in &mut self.ports {
            if let Some(offset) = p.offset_of(addr) {
                tracing::trace!("{} [{:#x}] <- {:#04x}", p.name, addr, value);
                return p.dev.write(offset, value);
            }
        }
        if self.registers.write_u8(addr, value) {
            return Ok(());
        }
        Err(SimulationError::MemoryViolation(addr))
    }
}
