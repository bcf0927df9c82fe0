//! # Cogs
//!
//! A cog is one of the eight execution units sharing the hub. Instruction
//! decoding lives outside this crate; the hub only needs the stepping
//! contract below. Two flavours exist on the real chip (the ROM bytecode
//! interpreter and native assembly), and the hub treats both identically
//! once they are running.

use crate::hub::HubAccess;

pub trait Cog {
    /// Advance by one hub step.
    ///
    /// Returns `false` to report a fault or breakpoint; the host should stop
    /// driving the chip.
    fn step(&mut self, hub: &mut HubAccess<'_>) -> bool;

    /// Called when the ring grants this cog its hub slot, once every 16 steps.
    fn hub_accessible(&mut self, hub: &mut HubAccess<'_>);

    /// Run until this cog completes one instruction, for single-step debugging.
    fn step_instruction(&mut self, hub: &mut HubAccess<'_>) -> bool;

    /// The core clock frequency changed.
    fn set_clock(&mut self, freq: u32);

    /// Release any video or signal hooks before the cog is destroyed.
    fn detach_signal_hooks(&mut self) {}

    fn dira(&self) -> u32;
    fn dirb(&self) -> u32;
    fn outa(&self) -> u32;
    fn outb(&self) -> u32;

    /// Combined direction register, port B in the upper half.
    fn dir(&self) -> u64 {
        u64::from(self.dira()) | (u64::from(self.dirb()) << 32)
    }

    /// Combined output register, port B in the upper half.
    fn out(&self) -> u64 {
        u64::from(self.outa()) | (u64::from(self.outb()) << 32)
    }
}

/// How a new cog starts executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CogEntry {
    /// Run the ROM bytecode interpreter on the stack frame at `frame`.
    Interpreted { frame: u16 },
    /// Load native code from hub address `program`, passing `param` in `PAR`.
    Native { program: u16, param: u16 },
}

impl CogEntry {
    pub fn is_interpreted(&self) -> bool {
        matches!(self, CogEntry::Interpreted { .. })
    }
}

/// Builds cogs for the hub when one is started by boot or `COGINIT`.
pub trait CogFactory {
    fn create(&mut self, entry: CogEntry, core_freq: u32) -> Box<dyn Cog>;
}

impl<F> CogFactory for F
where
    F: FnMut(CogEntry, u32) -> Box<dyn Cog>,
{
    fn create(&mut self, entry: CogEntry, core_freq: u32) -> Box<dyn Cog> {
        self(entry, core_freq)
    }
}
