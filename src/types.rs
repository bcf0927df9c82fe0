use std::fmt;

/// Number of cogs (execution units) on the chip.
pub const TOTAL_COGS: usize = 8;
/// Number of hardware semaphores.
pub const TOTAL_LOCKS: usize = 8;
/// Number of I/O pins across ports A and B.
pub const TOTAL_PINS: usize = 64;
/// Size of the hub address space in bytes.
pub const TOTAL_MEMORY: usize = 0x10000;
/// Size of the writable RAM region at the bottom of the hub.
pub const TOTAL_RAM: usize = 0x8000;

/// 4-bit unsigned integer for the hub ring counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct U4(u8);

impl U4 {
    pub fn new(value: u8) -> Self {
        U4(value & 0xF)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn inc(&mut self) {
        self.0 = (self.0 + 1) & 0xF;
    }

    pub fn set(&mut self, value: u8) {
        self.0 = value & 0xF;
    }

    /// Cog granted hub access at this position, if any.
    ///
    /// Even positions belong to cog `position / 2`; odd positions are idle.
    pub fn hub_slot(&self) -> Option<usize> {
        if self.0 & 1 == 0 {
            Some((self.0 >> 1) as usize)
        } else {
            None
        }
    }
}

impl fmt::Display for U4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

impl From<u8> for U4 {
    fn from(value: u8) -> Self {
        U4::new(value)
    }
}

impl From<U4> for u8 {
    fn from(value: U4) -> Self {
        value.value()
    }
}
