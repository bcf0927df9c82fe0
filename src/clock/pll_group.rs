use crate::clock::{frequency_to_period, ClockSource};

/// Selects one of the two counter PLLs in a cog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PllChannel {
    A = 0,
    B = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct PllState {
    frq: u32,
    divider: u8,
    enabled: bool,
    remaining: f64,
    edges: u64,
}

/// The pair of counter PLLs belonging to one cog.
///
/// In PLL mode a counter adds `FRQ` to its phase accumulator every system
/// clock; the accumulator's carry rate is multiplied by 16 in the VCO and then
/// divided by `2^(7 - divider)`. The group reports the earliest pending edge
/// of either enabled channel, or never ticks while both are off.
#[derive(Debug, Clone, PartialEq)]
pub struct PllGroup {
    reference: u32,
    channels: [PllState; 2],
}

impl PllGroup {
    pub fn new(reference: u32) -> Self {
        PllGroup {
            reference,
            channels: [PllState::default(); 2],
        }
    }

    /// Configure a channel for PLL output. `divider` is clamped to 0..=7.
    pub fn set_pll(&mut self, channel: PllChannel, frq: u32, divider: u8) {
        let state = &mut self.channels[channel as usize];
        state.frq = frq;
        state.divider = divider.min(7);
        state.enabled = true;
        self.reload(channel);
    }

    pub fn disable(&mut self, channel: PllChannel) {
        let state = &mut self.channels[channel as usize];
        state.enabled = false;
        state.remaining = f64::INFINITY;
    }

    pub fn is_enabled(&self, channel: PllChannel) -> bool {
        self.channels[channel as usize].enabled
    }

    pub fn reference(&self) -> u32 {
        self.reference
    }

    /// Output frequency of a channel in Hz, zero when disabled.
    pub fn output_frequency(&self, channel: PllChannel) -> f64 {
        let state = &self.channels[channel as usize];
        if !state.enabled {
            return 0.0;
        }
        let carry_rate = f64::from(self.reference) * f64::from(state.frq) / 4_294_967_296.0;
        carry_rate * 16.0 / f64::from(1u32 << (7 - state.divider))
    }

    /// Number of output edges a channel has produced since it was configured.
    pub fn edges(&self, channel: PllChannel) -> u64 {
        self.channels[channel as usize].edges
    }

    fn period(&self, channel: PllChannel) -> Option<f64> {
        frequency_to_period(self.output_frequency(channel))
    }

    fn reload(&mut self, channel: PllChannel) {
        let period = self.period(channel);
        let state = &mut self.channels[channel as usize];
        state.edges = 0;
        state.remaining = period.unwrap_or(f64::INFINITY);
    }
}

impl Default for PllGroup {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ClockSource for PllGroup {
    fn time_until_tick(&self) -> f64 {
        self.channels
            .iter()
            .filter(|state| state.enabled)
            .map(|state| state.remaining)
            .fold(f64::INFINITY, f64::min)
    }

    fn advance(&mut self, dt: f64) {
        for channel in [PllChannel::A, PllChannel::B] {
            let Some(period) = self.period(channel) else {
                continue;
            };
            let state = &mut self.channels[channel as usize];
            state.remaining -= dt;
            if state.remaining <= 0.0 {
                state.edges += 1;
                state.remaining += period;
                if state.remaining <= 0.0 {
                    state.remaining = period;
                }
            }
        }
    }

    fn set_frequency(&mut self, hz: u32) {
        self.reference = hz;
        for channel in [PllChannel::A, PllChannel::B] {
            if self.is_enabled(channel) {
                let edges = self.edges(channel);
                self.reload(channel);
                self.channels[channel as usize].edges = edges;
            }
        }
    }
}
