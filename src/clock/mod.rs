//! # Clock Domains
//!
//! Every oscillator on the chip is modelled as a [`ClockSource`]: something
//! that knows how long until its next edge and can be moved forward in
//! virtual time. The hub converges all sources onto a common instant before
//! any cog executes.

pub mod pll_group;
pub mod system_xtal;

pub use pll_group::{PllChannel, PllGroup};
pub use system_xtal::SystemXtal;

/// An oscillator advancing independently in virtual time.
pub trait ClockSource {
    /// Seconds until the next edge of this source.
    ///
    /// A source that will never tick reports `f64::INFINITY`.
    fn time_until_tick(&self) -> f64;

    /// Move the source forward by `dt` seconds, reloading any edge that falls due.
    fn advance(&mut self, dt: f64);

    /// Change the frequency this source runs from.
    fn set_frequency(&mut self, hz: u32);
}

/// Convert a frequency to a period in seconds, or `None` for a stopped oscillator.
pub(crate) fn frequency_to_period(frequency: f64) -> Option<f64> {
    if frequency > 0.0 {
        Some(1.0 / frequency)
    } else {
        None
    }
}
