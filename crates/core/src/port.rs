use crate::bus::SystemBus;
use crate::{Bus, SimResult, SimulationError};

/// Hardware abstraction over one 8-bit output port.
///
/// Register writes cannot fail: an invalid register address is a hardware
/// fault that software has no way to observe.
pub trait Port {
    fn set_direction(&mut self, value: u8);
    fn set_data(&mut self, value: u8);
}

impl<P: Port + ?Sized> Port for &mut P {
    fn set_direction(&mut self, value: u8) {
        (**self).set_direction(value)
    }

    fn set_data(&mut self, value: u8) {
        (**self).set_data(value)
    }
}

/// In-memory register pair that keeps every write.
#[derive(Debug, Default, Clone)]
pub struct RecordingPort {
    pub direction: Option<u8>,
    pub data: Option<u8>,
    pub direction_writes: Vec<u8>,
    pub data_writes: Vec<u8>,
}

impl RecordingPort {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Port for RecordingPort {
    fn set_direction(&mut self, value: u8) {
        self.direction = Some(value);
        self.direction_writes.push(value);
    }

    fn set_data(&mut self, value: u8) {
        self.data = Some(value);
        self.data_writes.push(value);
    }
}

/// Port whose DDR and DR live at fixed addresses on a simulated bus.
#[derive(Debug)]
pub struct BusPort<B: Bus> {
    bus: B,
    ddr_addr: u64,
    dr_addr: u64,
}

impl<B: Bus> BusPort<B> {
    /// Both addresses must already be mapped; this is the only point where a
    /// bad register map is reported.
    pub fn new(bus: B, ddr_addr: u64, dr_addr: u64) -> SimResult<Self> {
        bus.read_u8(ddr_addr)?;
        bus.read_u8(dr_addr)?;
        Ok(Self {
            bus,
            ddr_addr,
            dr_addr,
        })
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn into_bus(self) -> B {
        self.bus
    }

    fn store(&mut self, addr: u64, value: u8) {
        if let Err(e) = self.bus.write_u8(addr, value) {
            tracing::error!("Bus fault writing {:#04x} to {:#x}: {}", value, addr, e);
        }
    }
}

impl BusPort<SystemBus> {
    /// Attach to the port registered on `bus` under `name`.
    pub fn for_port(bus: SystemBus, name: &str) -> SimResult<Self> {
        let (ddr, dr) = bus
            .port_entry(name)
            .map(|p| (p.ddr_addr, p.dr_addr))
            .ok_or_else(|| SimulationError::UnmappedPort(name.to_string()))?;
        Self::new(bus, ddr, dr)
    }
}

impl<B: Bus> Port for BusPort<B> {
    fn set_direction(&mut self, value: u8) {
        self.store(self.ddr_addr, value);
    }

    fn set_data(&mut self, value: u8) {
        self.store(self.dr_addr, value);
    }
}

/// Real memory-mapped port written with volatile stores.
#[derive(Debug)]
pub struct VolatilePort {
    ddr: *mut u8,
    dr: *mut u8,
}

// The port is only ever driven from the thread that owns it.
unsafe impl Send for VolatilePort {}

impl VolatilePort {
    /// # Safety
    ///
    /// `ddr` and `dr` must be valid, writable, byte-wide registers for the
    /// whole lifetime of the port, and nothing else may write them.
    pub unsafe fn new(ddr: *mut u8, dr: *mut u8) -> Self {
        Self { ddr, dr }
    }

    /// # Safety
    ///
    /// See [`VolatilePort::new`].
    pub unsafe fn from_addresses(ddr: usize, dr: usize) -> Self {
        Self::new(ddr as *mut u8, dr as *mut u8)
    }
}

impl Port for VolatilePort {
    fn set_direction(&mut self, value: u8) {
        // SAFETY: guaranteed by the constructor contract.
        unsafe { core::ptr::write_volatile(self.ddr, value) }
    }

    fn set_data(&mut self, value: u8) {
        // SAFETY: guaranteed by the constructor contract.
        unsafe { core::ptr::write_volatile(self.dr, value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portblink_config::{H8_3067_PBDDR, H8_3067_PBDR};

    #[test]
    fn test_recording_port() {
        let mut port = RecordingPort::new();
        port.set_direction(0xFF);
        port.set_data(0xFE);
        port.set_data(0xFF);
        assert_eq!(port.direction, Some(0xFF));
        assert_eq!(port.data, Some(0xFF));
        assert_eq!(port.data_writes, vec![0xFE, 0xFF]);
    }

    #[test]
    fn test_bus_port_rejects_unmapped() {
        let err = BusPort::new(SystemBus::new(), H8_3067_PBDDR, H8_3067_PBDR).unwrap_err();
        assert_eq!(err, SimulationError::MemoryViolation(H8_3067_PBDDR));

        let err = BusPort::for_port(SystemBus::h8_3067().unwrap(), "port_a").unwrap_err();
        assert_eq!(err, SimulationError::UnmappedPort("port_a".to_string()));
    }

    #[test]
    fn test_bus_port_writes_registers() {
        let mut port = BusPort::for_port(SystemBus::h8_3067().unwrap(), "port_b").unwrap();
        port.set_direction(0xFF);
        port.set_data(0xFE);

        let bus = port.into_bus();
        assert_eq!(bus.read_u8(H8_3067_PBDDR).unwrap(), 0xFF);
        assert_eq!(bus.read_u8(H8_3067_PBDR).unwrap(), 0xFE);
    }

    #[test]
    fn test_volatile_port() {
        let mut regs = [0u8; 2];
        let base = regs.as_mut_ptr();
        let mut port = unsafe { VolatilePort::new(base, base.add(1)) };
        port.set_direction(0xFF);
        port.set_data(0xFE);
        drop(port);
        assert_eq!(regs, [0xFF, 0xFE]);
    }
}
