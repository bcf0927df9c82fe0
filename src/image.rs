//! # Program Image
//!
//! A compiled Propeller binary starts with a fixed header that tells the boot
//! loader how to configure the clock and where the top-level object lives.
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | long | clock frequency |
//! | 4 | byte | clock mode |
//! | 6 | word | object base (`pbase`) |
//! | 8 | word | variable base (`vbase`) |
//! | 10 | word | end of binary / initial stack frame (`dbase`) |
//! | 12 | word | initial program counter (`pcurr`) |
//! | 14 | word | initial stack pointer (`dcurr`) |

use thiserror::Error;

use crate::memory::HubMemory;
use crate::types::TOTAL_RAM;

pub const CLOCK_FREQ_OFFSET: u32 = 0;
pub const CLOCK_MODE_OFFSET: u32 = 4;
pub const PBASE_OFFSET: u32 = 6;
pub const VBASE_OFFSET: u32 = 8;
pub const DBASE_OFFSET: u32 = 10;
pub const PCURR_OFFSET: u32 = 12;
pub const DCURR_OFFSET: u32 = 14;

/// Native instruction written twice just below `dbase` so a runaway cog
/// halts instead of executing whatever follows the binary.
pub const TERMINATION_OPCODE: u32 = 0xFFFF_F9FF;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("program image is {size} bytes but only {limit} bytes of RAM are writable")]
    TooLarge { size: usize, limit: usize },
}

pub fn check_size(program: &[u8]) -> Result<(), ImageError> {
    if program.len() > TOTAL_RAM {
        return Err(ImageError::TooLarge {
            size: program.len(),
            limit: TOTAL_RAM,
        });
    }
    Ok(())
}

/// Header fields of a loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageHeader {
    pub clock_freq: u32,
    pub clock_mode: u8,
    pub pbase: u16,
    pub vbase: u16,
    pub dbase: u16,
    pub pcurr: u16,
    pub dcurr: u16,
}

impl ImageHeader {
    pub fn read(memory: &HubMemory) -> Self {
        ImageHeader {
            clock_freq: memory.read_long(CLOCK_FREQ_OFFSET),
            clock_mode: memory.read_byte(CLOCK_MODE_OFFSET),
            pbase: memory.read_word(PBASE_OFFSET),
            vbase: memory.read_word(VBASE_OFFSET),
            dbase: memory.read_word(DBASE_OFFSET),
            pcurr: memory.read_word(PCURR_OFFSET),
            dcurr: memory.read_word(DCURR_OFFSET),
        }
    }

    /// Crystal frequency implied by the header, if the mode uses an external source.
    ///
    /// The stored clock frequency is the post-PLL core rate, so the crystal is
    /// recovered by dividing out the PLL multiplier (1, 2, 4, 8 or 16). A
    /// plain external input passes the frequency through unchanged. Internal
    /// RC modes say nothing about the crystal.
    pub fn xtal_frequency(&self) -> Option<u32> {
        if self.clock_mode & 0x18 == 0 {
            return None;
        }
        match i32::from(self.clock_mode & 0x7) - 3 {
            pll if pll >= 0 => Some(self.clock_freq >> pll),
            -1 => Some(self.clock_freq),
            _ => None,
        }
    }
}

/// Patch the termination opcode pair into the two longs below `dbase`.
///
/// A `dbase` below 8 wraps into the ROM half, which is left untouched.
pub fn write_termination(memory: &mut HubMemory) {
    let address = u32::from(memory.read_word(DBASE_OFFSET)).wrapping_sub(8);
    memory.write_ram_long(address, TERMINATION_OPCODE);
    memory.write_ram_long(address.wrapping_add(4), TERMINATION_OPCODE);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_with(freq: u32, mode: u8) -> ImageHeader {
        ImageHeader {
            clock_freq: freq,
            clock_mode: mode,
            ..ImageHeader::default()
        }
    }

    #[test]
    fn test_reject_oversized_image() {
        let program = vec![0u8; TOTAL_RAM + 1];
        assert_eq!(
            check_size(&program),
            Err(ImageError::TooLarge {
                size: TOTAL_RAM + 1,
                limit: TOTAL_RAM
            })
        );
        assert!(check_size(&vec![0u8; TOTAL_RAM]).is_ok());
    }

    #[test]
    fn test_header_read() {
        let mut memory = HubMemory::new();
        memory.write_long(0, 80_000_000);
        memory.write_byte(4, 0x6F);
        memory.write_word(6, 0x0010);
        memory.write_word(8, 0x0100);
        memory.write_word(10, 0x0108);
        memory.write_word(12, 0x0018);
        memory.write_word(14, 0x010C);

        let header = ImageHeader::read(&memory);
        assert_eq!(header.clock_freq, 80_000_000);
        assert_eq!(header.clock_mode, 0x6F);
        assert_eq!(header.pbase, 0x0010);
        assert_eq!(header.vbase, 0x0100);
        assert_eq!(header.dbase, 0x0108);
        assert_eq!(header.pcurr, 0x0018);
        assert_eq!(header.dcurr, 0x010C);
    }

    #[test]
    fn test_xtal_derivation() {
        // XTAL1 + PLL16X at 80 MHz -> 5 MHz crystal
        assert_eq!(header_with(80_000_000, 0x6F).xtal_frequency(), Some(5_000_000));
        // XTAL1 + PLL1X
        assert_eq!(header_with(5_000_000, 0x6B).xtal_frequency(), Some(5_000_000));
        // XTAL1 + XINPUT pass-through
        assert_eq!(header_with(6_000_000, 0x0A).xtal_frequency(), Some(6_000_000));
        // RCFAST says nothing about the crystal
        assert_eq!(header_with(12_000_000, 0x00).xtal_frequency(), None);
        // XTAL1 with RCSLOW selected
        assert_eq!(header_with(20_000, 0x09).xtal_frequency(), None);
    }

    #[test]
    fn test_termination_patch() {
        let mut memory = HubMemory::new();
        memory.write_word(DBASE_OFFSET, 0x0040);
        write_termination(&mut memory);
        assert_eq!(memory.read_long(0x0038), TERMINATION_OPCODE);
        assert_eq!(memory.read_long(0x003C), TERMINATION_OPCODE);
    }
}
