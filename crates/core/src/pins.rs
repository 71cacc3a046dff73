use bitflags::bitflags;

bitflags! {
    /// One bit per pin of an 8-bit I/O port.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Pins: u8 {
        const PIN0 = 1 << 0;
        const PIN1 = 1 << 1;
        const PIN2 = 1 << 2;
        const PIN3 = 1 << 3;
        const PIN4 = 1 << 4;
        const PIN5 = 1 << 5;
        const PIN6 = 1 << 6;
        const PIN7 = 1 << 7;
    }
}

impl Pins {
    /// Direction value configuring every pin as an output.
    pub const ALL_OUTPUT: Pins = Pins::all();
    /// Data pattern with pin 0 driven low and the rest high.
    pub const PIN0_LOW: Pins = Pins::all().difference(Pins::PIN0);
    /// Data pattern with every pin driven high.
    pub const ALL_HIGH: Pins = Pins::all();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_bits() {
        assert_eq!(Pins::ALL_OUTPUT.bits(), 0xFF);
        assert_eq!(Pins::PIN0_LOW.bits(), 0xFE);
        assert_eq!(Pins::ALL_HIGH.bits(), 0xFF);
        assert!(!Pins::PIN0_LOW.contains(Pins::PIN0));
    }
}
