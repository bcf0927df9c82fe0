//! # Pin Bus
//!
//! The chip's 64 I/O pins as seen from outside. Every running cog contributes
//! a direction and an output register; the pin bus ORs those together and
//! combines them with the levels that plugins force onto undriven pins.

use std::fmt;

use crate::types::TOTAL_PINS;

/// Observable state of one pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PinState {
    #[default]
    Floating,
    OutputLo,
    OutputHi,
    InputLo,
    InputHi,
}

impl PinState {
    pub fn to_str(&self) -> &'static str {
        match self {
            PinState::Floating => "Floating",
            PinState::OutputLo => "OutputLo",
            PinState::OutputHi => "OutputHi",
            PinState::InputLo => "InputLo",
            PinState::InputHi => "InputHi",
        }
    }

    /// Single-glyph form: upper case for pins a cog drives, lower case for inputs.
    pub fn to_char(&self) -> char {
        match self {
            PinState::Floating => 'z',
            PinState::OutputLo => 'L',
            PinState::OutputHi => 'H',
            PinState::InputLo => 'l',
            PinState::InputHi => 'h',
        }
    }

    pub fn is_output(&self) -> bool {
        matches!(self, PinState::OutputLo | PinState::OutputHi)
    }

    /// Logic level, or `None` while floating.
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            PinState::OutputHi | PinState::InputHi => Some(true),
            PinState::OutputLo | PinState::InputLo => Some(false),
            PinState::Floating => None,
        }
    }
}

impl fmt::Display for PinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

/// Direction and output registers ORed across every running cog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PinRegisters {
    pub dir: u64,
    pub out: u64,
}

impl PinRegisters {
    /// OR together `(dir, out)` pairs from each contributor.
    pub fn aggregate<I>(registers: I) -> Self
    where
        I: IntoIterator<Item = (u64, u64)>,
    {
        registers
            .into_iter()
            .fold(PinRegisters::default(), |acc, (dir, out)| PinRegisters {
                dir: acc.dir | dir,
                out: acc.out | out,
            })
    }

    /// Levels seen on the pins: driven outputs where a cog owns the
    /// direction, forced-high levels elsewhere.
    pub fn input(&self, drive_hi: u64) -> u64 {
        (self.out & self.dir) | (drive_hi & !self.dir)
    }
}

/// External forcing of pin levels by plugins, independent of any cog.
///
/// Any change marks the bus pending so the next hub step re-propagates pin
/// state even if no clock domain ticked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinDrive {
    hi: u64,
    float: u64,
    pending: bool,
}

impl PinDrive {
    pub fn new() -> Self {
        PinDrive {
            hi: 0,
            float: u64::MAX,
            pending: false,
        }
    }

    /// Force one pin floating or to a level. The pin number wraps modulo 64.
    pub fn drive_pin(&mut self, pin: usize, floating: bool, hi: bool) {
        let mask = 1u64 << (pin % TOTAL_PINS);

        if floating {
            self.float |= mask;
        } else {
            self.float &= !mask;
        }

        if hi {
            self.hi |= mask;
        } else {
            self.hi &= !mask;
        }

        self.pending = true;
    }

    pub fn hi(&self) -> u64 {
        self.hi
    }

    pub fn float(&self) -> u64 {
        self.float
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub(crate) fn clear_pending(&mut self) {
        self.pending = false;
    }
}

impl Default for PinDrive {
    fn default() -> Self {
        Self::new()
    }
}

/// Forced levels plus the last propagated 64-entry state vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinBus {
    pub(crate) drive: PinDrive,
    pub(crate) states: [PinState; TOTAL_PINS],
}

impl PinBus {
    pub fn new() -> Self {
        PinBus {
            drive: PinDrive::new(),
            states: [PinState::Floating; TOTAL_PINS],
        }
    }

    pub fn drive(&self) -> &PinDrive {
        &self.drive
    }

    pub fn states(&self) -> &[PinState; TOTAL_PINS] {
        &self.states
    }

    /// Recompute every pin's state from the aggregated cog registers.
    pub fn resolve(&mut self, registers: PinRegisters) {
        for (pin, state) in self.states.iter_mut().enumerate() {
            let mask = 1u64 << pin;
            *state = if registers.dir & mask == 0 {
                if self.drive.float & mask != 0 {
                    PinState::Floating
                } else if self.drive.hi & mask != 0 {
                    PinState::InputHi
                } else {
                    PinState::InputLo
                }
            } else if registers.out & mask != 0 {
                PinState::OutputHi
            } else {
                PinState::OutputLo
            };
        }
    }

    /// Render the state vector as glyphs, pin 63 first.
    pub fn to_glyphs(&self) -> String {
        self.states.iter().rev().map(PinState::to_char).collect()
    }
}

impl Default for PinBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bus_floats() {
        let mut bus = PinBus::new();
        bus.resolve(PinRegisters::default());
        assert!(bus.states().iter().all(|s| *s == PinState::Floating));
    }

    #[test]
    fn test_unfloated_pin_reads_low_then_high() {
        let mut bus = PinBus::new();
        bus.drive.drive_pin(5, false, false);
        bus.resolve(PinRegisters::default());
        assert_eq!(bus.states()[5], PinState::InputLo);

        bus.drive.drive_pin(5, false, true);
        bus.resolve(PinRegisters::default());
        assert_eq!(bus.states()[5], PinState::InputHi);
    }

    #[test]
    fn test_float_wins_over_hi() {
        let mut bus = PinBus::new();
        bus.drive.drive_pin(9, true, true);
        bus.resolve(PinRegisters::default());
        assert_eq!(bus.states()[9], PinState::Floating);
    }

    #[test]
    fn test_cog_direction_overrides_drive() {
        let mut bus = PinBus::new();
        bus.drive.drive_pin(0, false, true);
        bus.resolve(PinRegisters { dir: 0b11, out: 0b10 });
        assert_eq!(bus.states()[0], PinState::OutputLo);
        assert_eq!(bus.states()[1], PinState::OutputHi);
    }

    #[test]
    fn test_aggregate_ors_contributors() {
        let registers = PinRegisters::aggregate([(0b0001, 0b0001), (0b0100, 0b0000), (0, 0b1000)]);
        assert_eq!(registers.dir, 0b0101);
        assert_eq!(registers.out, 0b1001);
        // output bits without direction do not reach the pins
        assert_eq!(registers.input(0), 0b0001);
        assert_eq!(registers.input(0b1010), 0b1011);
    }

    #[test]
    fn test_drive_marks_pending() {
        let mut drive = PinDrive::new();
        assert!(!drive.is_pending());
        drive.drive_pin(64 + 3, false, true);
        assert!(drive.is_pending());
        assert_eq!(drive.hi(), 1 << 3);
        assert_eq!(drive.float(), !(1u64 << 3));
    }

    #[test]
    fn test_glyphs() {
        let mut bus = PinBus::new();
        bus.drive.drive_pin(0, false, true);
        bus.resolve(PinRegisters { dir: 1 << 63, out: 0 });
        let glyphs = bus.to_glyphs();
        assert_eq!(glyphs.len(), TOTAL_PINS);
        assert!(glyphs.starts_with('L'));
        assert!(glyphs.ends_with('h'));
    }
}
