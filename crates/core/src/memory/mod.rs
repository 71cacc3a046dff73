use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct Register {
    name: String,
    value: u8,
}

/// Sparse store of byte-wide memory-mapped registers.
///
/// Only addresses explicitly mapped with [`RegisterFile::map`] are backed.
#[derive(Debug, Default)]
pub struct RegisterFile {
    registers: BTreeMap<u64, Register>,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&mut self, addr: u64, name: &str, reset: u8) {
        self.registers.insert(
            addr,
            Register {
                name: name.to_string(),
                value: reset,
            },
        );
    }

    pub fn is_mapped(&self, addr: u64) -> bool {
        self.registers.contains_key(&addr)
    }

    pub fn read_u8(&self, addr: u64) -> Option<u8> {
        self.registers.get(&addr).map(|r| r.value)
    }

    pub fn write_u8(&mut self, addr: u64, value: u8) -> bool {
        match self.registers.get_mut(&addr) {
            Some(reg) => {
                reg.value = value;
                true
            }
            None => false,
        }
    }

    /// `(address, name, value)` of every mapped register, by address.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &str, u8)> {
        self.registers
            .iter()
            .map(|(addr, r)| (*addr, r.name.as_str(), r.value))
    }
}
