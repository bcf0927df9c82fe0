//! Mock cogs, factories and plugins for exercising the hub
//!
//! Cogs handed to the hub are boxed and owned by it, so every mock cog shares
//! a `CogTrace` with the test through an `Rc<RefCell<..>>`. Tests inspect the
//! trace after stepping and may script what a cog does on each step.

#![allow(dead_code)]

use rusty_propeller::{Cog, CogEntry, Hub, HubAccess, PinDrive, PinState, Plugin};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Behaviour run on every step of a scripted cog.
pub type StepScript = Box<dyn FnMut(&mut HubAccess<'_>, &mut CogTrace) -> bool>;

/// Box a closure as a `StepScript`.
pub fn scripted<F>(script: F) -> StepScript
where
    F: FnMut(&mut HubAccess<'_>, &mut CogTrace) -> bool + 'static,
{
    Box::new(script)
}

/// Everything a mock cog records about itself
#[derive(Debug, Default)]
pub struct CogTrace {
    pub entry: Option<CogEntry>,
    pub id: Option<usize>,
    pub steps: u32,
    pub instruction_steps: u32,
    /// System counter value at each hub grant
    pub grants: Vec<u32>,
    pub clock: u32,
    pub detached: bool,
    pub dir: u64,
    pub out: u64,
    /// Report a fault from every step
    pub fault: bool,
}

pub type Trace = Rc<RefCell<CogTrace>>;

pub struct MockCog {
    trace: Trace,
    script: Option<StepScript>,
}

impl MockCog {
    pub fn new(trace: Trace, script: Option<StepScript>) -> Self {
        Self { trace, script }
    }
}

impl Cog for MockCog {
    fn step(&mut self, hub: &mut HubAccess<'_>) -> bool {
        let mut trace = self.trace.borrow_mut();
        trace.steps += 1;
        trace.id = Some(hub.cog_id());
        let mut result = !trace.fault;
        if let Some(script) = self.script.as_mut() {
            result &= script(hub, &mut *trace);
        }
        result
    }

    fn hub_accessible(&mut self, hub: &mut HubAccess<'_>) {
        self.trace.borrow_mut().grants.push(hub.counter());
    }

    fn step_instruction(&mut self, hub: &mut HubAccess<'_>) -> bool {
        self.trace.borrow_mut().instruction_steps += 1;
        self.step(hub)
    }

    fn set_clock(&mut self, freq: u32) {
        self.trace.borrow_mut().clock = freq;
    }

    fn detach_signal_hooks(&mut self) {
        self.trace.borrow_mut().detached = true;
    }

    fn dira(&self) -> u32 {
        self.trace.borrow().dir as u32
    }

    fn dirb(&self) -> u32 {
        (self.trace.borrow().dir >> 32) as u32
    }

    fn outa(&self) -> u32 {
        self.trace.borrow().out as u32
    }

    fn outb(&self) -> u32 {
        (self.trace.borrow().out >> 32) as u32
    }
}

/// Shared record of every cog a `MockFactory` built, in creation order.
#[derive(Default)]
pub struct FactoryLog {
    pub created: Vec<Trace>,
    pub scripts: VecDeque<StepScript>,
}

impl FactoryLog {
    pub fn entries(&self) -> Vec<CogEntry> {
        self.created
            .iter()
            .filter_map(|trace| trace.borrow().entry)
            .collect()
    }

    pub fn last(&self) -> Option<Trace> {
        self.created.last().cloned()
    }
}

pub type SharedLog = Rc<RefCell<FactoryLog>>;

/// Build a cog factory whose cogs report into `log`.
///
/// The next queued script, if any, is given to each new cog.
pub fn mock_factory(log: SharedLog) -> impl FnMut(CogEntry, u32) -> Box<dyn Cog> {
    move |entry: CogEntry, freq: u32| -> Box<dyn Cog> {
        let trace = Rc::new(RefCell::new(CogTrace {
            entry: Some(entry),
            clock: freq,
            ..CogTrace::default()
        }));
        let script = {
            let mut log = log.borrow_mut();
            log.created.push(trace.clone());
            log.scripts.pop_front()
        };
        Box::new(MockCog::new(trace, script))
    }
}

/// A chip with an empty ROM and a mock factory, nothing loaded.
pub fn new_hub() -> (Hub, SharedLog) {
    new_hub_with_rom(&[])
}

pub fn new_hub_with_rom(rom: &[u8]) -> (Hub, SharedLog) {
    let log: SharedLog = Rc::new(RefCell::new(FactoryLog::default()));
    let hub = Hub::new(Box::new(mock_factory(log.clone())), rom);
    (hub, log)
}

/// A chip booted from `image`.
pub fn booted_hub(image: &[u8]) -> (Hub, SharedLog) {
    let (mut hub, log) = new_hub();
    hub.initialize(image).expect("image fits in RAM");
    (hub, log)
}

/// Program image builder with a valid header
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    pub clock_freq: u32,
    pub clock_mode: u8,
    pub pbase: u16,
    pub vbase: u16,
    pub dbase: u16,
    pub pcurr: u16,
    pub dcurr: u16,
    pub len: usize,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self {
            clock_freq: 80_000_000,
            clock_mode: 0x6F, // XTAL1 + PLL16X
            pbase: 0x0010,
            vbase: 0x0040,
            dbase: 0x0050,
            pcurr: 0x0018,
            dcurr: 0x0054,
            len: 0x0040,
        }
    }
}

impl ImageBuilder {
    pub fn build(&self) -> Vec<u8> {
        let mut image = vec![0u8; self.len.max(16)];
        image[0..4].copy_from_slice(&self.clock_freq.to_le_bytes());
        image[4] = self.clock_mode;
        image[6..8].copy_from_slice(&self.pbase.to_le_bytes());
        image[8..10].copy_from_slice(&self.vbase.to_le_bytes());
        image[10..12].copy_from_slice(&self.dbase.to_le_bytes());
        image[12..14].copy_from_slice(&self.pcurr.to_le_bytes());
        image[14..16].copy_from_slice(&self.dcurr.to_le_bytes());
        for (i, byte) in image.iter_mut().enumerate().skip(16) {
            *byte = (i & 0xFF) as u8;
        }
        image
    }
}

pub fn default_image() -> Vec<u8> {
    ImageBuilder::default().build()
}

/// Plugin that records every notification it receives
#[derive(Debug, Default)]
pub struct RecordingPlugin {
    pub name: String,
    pub presented: u32,
    pub resets: u32,
    pub clock_times: Vec<f64>,
    pub pin_changes: u32,
    pub last_states: Option<[PinState; 64]>,
    /// Pin forced by the plugin on its first clock tick
    pub drive_on_clock: Option<(usize, bool, bool)>,
    pub subscribe_clock: bool,
    pub subscribe_pins: bool,
    /// `force` flag of every repaint request, with the counter at that time
    pub repaints: Vec<(bool, u32)>,
}

impl RecordingPlugin {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Plugin for RecordingPlugin {
    fn title(&self) -> &str {
        &self.name
    }

    fn present_chip(&mut self, _chip: &Hub) {
        self.presented += 1;
    }

    fn wants_clock(&self) -> bool {
        self.subscribe_clock
    }

    fn wants_pins(&self) -> bool {
        self.subscribe_pins
    }

    fn repaint(&mut self, chip: &Hub, force: bool) {
        self.repaints.push((force, chip.counter()));
    }

    fn on_reset(&mut self) {
        self.resets += 1;
    }

    fn on_clock(&mut self, time: f64, pins: &mut PinDrive) {
        self.clock_times.push(time);
        if let Some((pin, floating, hi)) = self.drive_on_clock.take() {
            pins.drive_pin(pin, floating, hi);
        }
    }

    fn on_pin_change(&mut self, _time: f64, states: &[PinState; 64], _pins: &mut PinDrive) {
        self.pin_changes += 1;
        self.last_states = Some(*states);
    }
}
