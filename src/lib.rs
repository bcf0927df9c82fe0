//! # Rusty Propeller Library
//!
//! The chip-level core of a Parallax Propeller emulator written in Rust.
//!
//! This library provides:
//! - A deterministic hub step that converges every clock domain before any cog runs
//! - Round-robin hub access for up to eight cogs, one grant per cog every 16 steps
//! - Pin aggregation across cogs with externally forced levels
//! - Hub operations (`CLKSET`, `COGINIT`, locks, ...) and the fake boot sequence
//! - A plugin observer interface, a host run loop and a terminal debugger
//!
//! Instruction decoding is not part of this crate: cogs are supplied through
//! the [`Cog`] and [`CogFactory`] traits.

pub mod clock;
pub mod clock_mode;
pub mod cog;
pub mod config;
pub mod console;
pub mod emulator;
pub mod hub;
pub mod hub_op;
pub mod image;
pub mod locks;
pub mod memory;
pub mod pin;
pub mod plugin;
pub mod types;

// Re-export commonly used items for easier importing
pub use clock::{ClockSource, PllChannel, PllGroup, SystemXtal};
pub use clock_mode::ClockMode;
pub use cog::{Cog, CogEntry, CogFactory};
pub use config::{ConfigError, ConsoleConfig, EmulatorConfig};
pub use emulator::{Emulator, EmulatorError};
pub use hub::{Hub, HubAccess};
pub use hub_op::{HubOpOutcome, HubOperation};
pub use image::{ImageError, ImageHeader};
pub use locks::LockTable;
pub use memory::HubMemory;
pub use pin::{PinBus, PinDrive, PinRegisters, PinState};
pub use plugin::{Plugin, PluginList, PluginRef};
pub use types::U4;
