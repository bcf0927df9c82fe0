//! # Plugins
//!
//! Plugins observe the chip: reset, clock ticks and pin changes. They never
//! control the hub; the only state they may change is the forced pin levels
//! handed to them as a [`PinDrive`].
//!
//! Subscriber lists are snapshotted before dispatch, so the set of plugins
//! notified is fixed for the duration of one notification round.

use std::cell::RefCell;
use std::rc::Rc;

use crate::hub::Hub;
use crate::pin::{PinDrive, PinState};
use crate::types::TOTAL_PINS;

pub trait Plugin {
    fn title(&self) -> &str {
        "Plugin Base"
    }

    /// Called once when a host attaches the plugin to a chip.
    fn present_chip(&mut self, _chip: &Hub) {}

    /// Asked right after [`Plugin::present_chip`]; `true` subscribes the plugin to clock ticks.
    fn wants_clock(&self) -> bool {
        false
    }

    /// Asked right after [`Plugin::present_chip`]; `true` subscribes the plugin to pin changes.
    fn wants_pins(&self) -> bool {
        false
    }

    /// Refresh whatever the plugin displays.
    ///
    /// `force` is set after user actions (load, step, reset, breakpoint) and
    /// clear for the periodic update after each run frame.
    fn repaint(&mut self, _chip: &Hub, _force: bool) {}

    fn on_reset(&mut self) {}

    /// Called once per hub step with the accumulated virtual time in seconds.
    fn on_clock(&mut self, _time: f64, _pins: &mut PinDrive) {}

    /// Called whenever pin state is propagated.
    fn on_pin_change(&mut self, _time: f64, _states: &[PinState; TOTAL_PINS], _pins: &mut PinDrive) {}
}

pub type PluginRef = Rc<RefCell<dyn Plugin>>;

/// Ordered set of plugins compared by identity.
#[derive(Default, Clone)]
pub struct PluginList {
    plugins: Vec<PluginRef>,
}

impl PluginList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plugin unless it is already present. Returns whether it was added.
    pub fn add(&mut self, plugin: PluginRef) -> bool {
        if self.contains(&plugin) {
            return false;
        }
        self.plugins.push(plugin);
        true
    }

    /// Remove a plugin if present. Returns whether it was removed.
    pub fn remove(&mut self, plugin: &PluginRef) -> bool {
        let before = self.plugins.len();
        self.plugins.retain(|p| !Rc::ptr_eq(p, plugin));
        self.plugins.len() != before
    }

    pub fn contains(&self, plugin: &PluginRef) -> bool {
        self.plugins.iter().any(|p| Rc::ptr_eq(p, plugin))
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Copy of the current subscribers, in registration order.
    pub fn snapshot(&self) -> Vec<PluginRef> {
        self.plugins.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginRef> {
        self.plugins.iter()
    }
}

impl std::fmt::Debug for PluginList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|p| p.borrow().title().to_string()))
            .finish()
    }
}
