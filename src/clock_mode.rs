//! # Clock Mode
//!
//! Decoding of the 8-bit `CLKMODE` register written by `CLKSET`.
//!
//! | Bits | Meaning |
//! |---|---|
//! | 7 | reset request |
//! | 6 | PLL enable |
//! | 5 | external oscillator enable |
//! | 4..3 | oscillator gain (`XINPUT`, `XTAL1`, `XTAL2`, `XTAL3`) |
//! | 2..0 | clock source select |

use std::fmt;

/// Internal fast RC oscillator frequency.
pub const RCFAST_HZ: u32 = 12_000_000;
/// Internal slow RC oscillator frequency.
pub const RCSLOW_HZ: u32 = 20_000;

const CLOCK_SELECT: [&str; 8] = [
    "RCFAST", "RCSLOW", "XINPUT", "PLL1X", "PLL2X", "PLL4X", "PLL8X", "PLL16X",
];

const OSCILLATOR: [&str; 4] = ["XINPUT+", "XTAL1+", "XTAL2+", "XTAL3+"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ClockMode(u8);

impl ClockMode {
    pub const RESET: u8 = 0x80;
    pub const PLL_ENABLE: u8 = 0x40;
    pub const OSC_ENABLE: u8 = 0x20;

    pub fn new(mode: u8) -> Self {
        ClockMode(mode)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn is_reset(&self) -> bool {
        self.0 & Self::RESET != 0
    }

    pub fn pll_enabled(&self) -> bool {
        self.0 & Self::PLL_ENABLE != 0
    }

    pub fn oscillator_enabled(&self) -> bool {
        self.0 & Self::OSC_ENABLE != 0
    }

    /// External oscillator variant, bits 4..3.
    pub fn oscillator(&self) -> u8 {
        (self.0 & 0x18) >> 3
    }

    /// Clock source select, bits 2..0.
    pub fn select(&self) -> u8 {
        self.0 & 0x7
    }

    pub fn without_reset(&self) -> Self {
        ClockMode(self.0 & !Self::RESET)
    }

    /// Core frequency produced by this mode from crystal frequency `xtal`.
    ///
    /// PLL selections yield 0 Hz while the PLL enable bit is clear.
    pub fn core_frequency(&self, xtal: u32) -> u32 {
        match self.select() {
            0 => RCFAST_HZ,
            1 => RCSLOW_HZ,
            2 => xtal,
            sel if self.pll_enabled() => xtal.wrapping_mul(1u32 << (sel - 3)),
            _ => 0,
        }
    }
}

impl fmt::Display for ClockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_reset() {
            write!(f, "RESET+")?;
        }
        if self.pll_enabled() {
            write!(f, "PLL+")?;
        }
        if self.oscillator_enabled() {
            write!(f, "{}", OSCILLATOR[self.oscillator() as usize])?;
        }
        write!(f, "{}", CLOCK_SELECT[self.select() as usize])
    }
}

impl From<u8> for ClockMode {
    fn from(mode: u8) -> Self {
        ClockMode::new(mode)
    }
}
