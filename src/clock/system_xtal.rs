use crate::clock::{frequency_to_period, ClockSource};

/// The system crystal driving the hub.
///
/// Each hub step ends on an edge of this source. A stopped crystal (0 Hz,
/// e.g. a PLL mode selected with the PLL disabled) always reports an edge
/// right now, so steps still run but virtual time stands still.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemXtal {
    frequency: u32,
    remaining: f64,
}

impl SystemXtal {
    pub fn new() -> Self {
        SystemXtal {
            frequency: 0,
            remaining: 0.0,
        }
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    fn period(&self) -> f64 {
        frequency_to_period(f64::from(self.frequency)).unwrap_or(0.0)
    }
}

impl Default for SystemXtal {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for SystemXtal {
    fn time_until_tick(&self) -> f64 {
        self.remaining
    }

    fn advance(&mut self, dt: f64) {
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.remaining += self.period();
            if self.remaining < 0.0 {
                self.remaining = self.period();
            }
        }
    }

    fn set_frequency(&mut self, hz: u32) {
        self.frequency = hz;
        self.remaining = self.period();
    }
}
