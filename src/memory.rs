//! # Hub Memory
//!
//! The 64 KiB shared memory of the chip. The lower half is RAM loaded from a
//! program image; the upper half holds the firmware ROM (interpreter and
//! font tables). All multi-byte accesses are little-endian and addresses wrap
//! at 16 bits.

use crate::types::{TOTAL_MEMORY, TOTAL_RAM};

#[derive(Clone, PartialEq, Eq)]
pub struct HubMemory {
    bytes: Box<[u8; TOTAL_MEMORY]>,
}

impl HubMemory {
    pub fn new() -> Self {
        Self {
            bytes: Box::new([0; TOTAL_MEMORY]),
        }
    }

    /// Create hub memory with `rom` copied into the top 32 KiB.
    ///
    /// A shorter image is copied from 0x8000 upward and the rest stays zero.
    pub fn with_rom(rom: &[u8]) -> Self {
        let mut memory = Self::new();
        memory.load_rom(rom);
        memory
    }

    pub fn load_rom(&mut self, rom: &[u8]) {
        let len = rom.len().min(TOTAL_MEMORY - TOTAL_RAM);
        self.bytes[TOTAL_RAM..TOTAL_RAM + len].copy_from_slice(&rom[..len]);
    }

    /// Zero the RAM region and copy `program` to address 0.
    ///
    /// The caller checks that `program` fits in RAM.
    pub(crate) fn load_program(&mut self, program: &[u8]) {
        self.bytes[..TOTAL_RAM].fill(0);
        let len = program.len().min(TOTAL_RAM);
        self.bytes[..len].copy_from_slice(&program[..len]);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..]
    }

    /// Overwrite the whole address space from another memory.
    pub fn restore_from(&mut self, snapshot: &HubMemory) {
        self.bytes.copy_from_slice(&snapshot.bytes[..]);
    }

    pub fn read_byte(&self, address: u32) -> u8 {
        self.bytes[Self::index(address)]
    }

    pub fn read_word(&self, address: u32) -> u16 {
        u16::from(self.read_byte(address)) | (u16::from(self.read_byte(address.wrapping_add(1))) << 8)
    }

    pub fn read_long(&self, address: u32) -> u32 {
        u32::from(self.read_word(address)) | (u32::from(self.read_word(address.wrapping_add(2))) << 16)
    }

    pub fn write_byte(&mut self, address: u32, value: u8) {
        self.bytes[Self::index(address)] = value;
    }

    pub fn write_word(&mut self, address: u32, value: u16) {
        self.write_byte(address, value as u8);
        self.write_byte(address.wrapping_add(1), (value >> 8) as u8);
    }

    pub fn write_long(&mut self, address: u32, value: u32) {
        self.write_word(address, value as u16);
        self.write_word(address.wrapping_add(2), (value >> 16) as u16);
    }

    /// Store a byte unless `address` falls in the ROM half.
    pub fn write_ram_byte(&mut self, address: u32, value: u8) {
        if !Self::is_rom(address) {
            self.write_byte(address, value);
        }
    }

    pub fn write_ram_word(&mut self, address: u32, value: u16) {
        self.write_ram_byte(address, value as u8);
        self.write_ram_byte(address.wrapping_add(1), (value >> 8) as u8);
    }

    pub fn write_ram_long(&mut self, address: u32, value: u32) {
        self.write_ram_word(address, value as u16);
        self.write_ram_word(address.wrapping_add(2), (value >> 16) as u16);
    }

    /// Whether `address` falls in the firmware ROM half.
    pub fn is_rom(address: u32) -> bool {
        Self::index(address) >= TOTAL_RAM
    }

    fn index(address: u32) -> usize {
        (address as usize) & (TOTAL_MEMORY - 1)
    }
}

impl Default for HubMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HubMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubMemory")
            .field("size", &TOTAL_MEMORY)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_access() {
        let mut memory = HubMemory::new();
        memory.write_long(0x100, 0x1234_5678);
        assert_eq!(memory.read_byte(0x100), 0x78);
        assert_eq!(memory.read_byte(0x103), 0x12);
        assert_eq!(memory.read_word(0x102), 0x1234);
        assert_eq!(memory.read_long(0x100), 0x1234_5678);
    }

    #[test]
    fn test_address_wraps_at_64k() {
        let mut memory = HubMemory::new();
        memory.write_word(0xFFFF, 0xBEEF);
        assert_eq!(memory.read_byte(0xFFFF), 0xEF);
        assert_eq!(memory.read_byte(0x0000), 0xBE);
        assert_eq!(memory.read_byte(0x1_0010), memory.read_byte(0x0010));
    }

    #[test]
    fn test_rom_lands_in_upper_half() {
        let memory = HubMemory::with_rom(&[0xAA, 0xBB]);
        assert_eq!(memory.read_byte(0x8000), 0xAA);
        assert_eq!(memory.read_byte(0x8001), 0xBB);
        assert_eq!(memory.read_byte(0x7FFF), 0);
        assert!(HubMemory::is_rom(0x8000));
        assert!(!HubMemory::is_rom(0x7FFF));
    }

    #[test]
    fn test_ram_writes_skip_rom() {
        let mut memory = HubMemory::with_rom(&[0x11; 4]);
        memory.write_ram_long(0x7FFE, 0xAABB_CCDD);
        assert_eq!(memory.read_word(0x7FFE), 0xCCDD);
        assert_eq!(memory.read_word(0x8000), 0x1111);

        // wrapping from the top of ROM back into RAM
        memory.write_ram_word(0xFFFF, 0xBEEF);
        assert_eq!(memory.read_byte(0xFFFF), 0);
        assert_eq!(memory.read_byte(0x0000), 0xBE);
    }

    #[test]
    fn test_load_program_clears_ram_only() {
        let mut memory = HubMemory::with_rom(&[0x55]);
        memory.write_byte(0x10, 0xFF);
        memory.load_program(&[1, 2, 3]);
        assert_eq!(memory.read_byte(0x10), 0);
        assert_eq!(memory.read_byte(2), 3);
        assert_eq!(memory.read_byte(0x8000), 0x55);
    }

    #[test]
    fn test_restore_from_snapshot() {
        let mut memory = HubMemory::new();
        memory.write_byte(5, 9);
        let snapshot = memory.clone();
        memory.write_byte(5, 1);
        memory.restore_from(&snapshot);
        assert_eq!(memory, snapshot);
    }
}
