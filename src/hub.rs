//! # Hub
//!
//! The chip itself: shared memory, the eight cog slots and their clock
//! domains, the lock table and the pin bus, together with the global step
//! protocol that interleaves them.
//!
//! ## Step protocol
//!
//! Each call to [`Hub::step`] first converges every clock domain onto the
//! next edge of the system crystal, propagating pin changes whenever a cog
//! PLL ticks along the way. Only then does every running cog execute one
//! step, the ring counter hands the hub slot to one cog, and tick
//! subscribers are notified.
//!
//! ## Cog lifecycle
//!
//! A cog slot and its clock slot are always filled and emptied together, by
//! `spawn` (boot or `COGINIT`) and `stop` (`COGSTOP` or reset). While a cog
//! runs it is lifted out of its slot and handed a [`HubAccess`]; if the slot
//! is replaced or stopped during that call the lifted cog is discarded
//! instead of being put back.

use log::{debug, info, warn};

use crate::clock::{ClockSource, PllGroup, SystemXtal};
use crate::clock_mode::ClockMode;
use crate::cog::{Cog, CogEntry, CogFactory};
use crate::hub_op::{HubOpOutcome, HubOperation, COGINIT_NEW, INTERPRETER_ENTRY};
use crate::image::{self, ImageError, ImageHeader};
use crate::locks::LockTable;
use crate::memory::HubMemory;
use crate::pin::{PinBus, PinDrive, PinRegisters, PinState};
use crate::plugin::{PluginList, PluginRef};
use crate::types::{TOTAL_COGS, TOTAL_PINS, U4};

pub struct Hub {
    memory: HubMemory,
    reset_memory: HubMemory,
    cogs: [Option<Box<dyn Cog>>; TOTAL_COGS],
    clocks: [Option<PllGroup>; TOTAL_COGS],
    generations: [u32; TOTAL_COGS],
    core_clock: SystemXtal,
    ring: U4,
    counter: u32,
    time: f64,
    clock_mode: ClockMode,
    xtal_freq: u32,
    core_freq: u32,
    locks: LockTable,
    pins: PinBus,
    tick_handlers: PluginList,
    pin_handlers: PluginList,
    plugins: PluginList,
    factory: Box<dyn CogFactory>,
}

impl Hub {
    /// Create a chip with `rom` in the upper 32 KiB and no program loaded.
    ///
    /// Cogs started later are built by `factory`.
    pub fn new(factory: Box<dyn CogFactory>, rom: &[u8]) -> Self {
        let memory = HubMemory::with_rom(rom);
        Hub {
            reset_memory: memory.clone(),
            memory,
            cogs: Default::default(),
            clocks: Default::default(),
            generations: [0; TOTAL_COGS],
            core_clock: SystemXtal::new(),
            ring: U4::default(),
            counter: 0,
            time: 0.0,
            clock_mode: ClockMode::default(),
            xtal_freq: 0,
            core_freq: 0,
            locks: LockTable::new(),
            pins: PinBus::new(),
            tick_handlers: PluginList::new(),
            pin_handlers: PluginList::new(),
            plugins: PluginList::new(),
            factory,
        }
    }

    /// Load a program image and boot it.
    ///
    /// An image larger than RAM is rejected and the chip is left exactly as it was.
    pub fn initialize(&mut self, program: &[u8]) -> Result<(), ImageError> {
        if let Err(e) = image::check_size(program) {
            warn!("Rejecting program image: {}", e);
            return Err(e);
        }

        self.memory.load_program(program);
        self.reset_memory = self.memory.clone();

        let header = ImageHeader::read(&self.memory);
        self.core_freq = header.clock_freq;
        self.clock_mode = ClockMode::new(header.clock_mode);
        if let Some(xtal) = header.xtal_frequency() {
            self.xtal_freq = xtal;
        }

        image::write_termination(&mut self.memory);

        info!(
            "Loaded {} byte image: clock {} Hz, mode {}, xtal {} Hz",
            program.len(),
            header.clock_freq,
            self.clock_mode,
            self.xtal_freq
        );

        self.reset();
        Ok(())
    }

    /// Return the chip to the state right after the program was loaded and boot cog 0.
    pub fn reset(&mut self) {
        self.memory.restore_from(&self.reset_memory);

        self.counter = 0;
        self.time = 0.0;
        self.ring = U4::default();
        for id in 0..TOTAL_COGS {
            self.clear_slot(id);
        }
        self.locks.reset();

        for plugin in self.plugins.snapshot() {
            plugin.borrow_mut().on_reset();
        }

        self.pin_changed();
        self.set_clock_mode(self.clock_mode.without_reset().bits());

        info!("Chip reset, booting interpreter on cog 0");
        self.boot();
    }

    /// Synthesize what the ROM boot loader leaves behind: the initial stack
    /// frame below `dbase` and an interpreter running on cog 0.
    fn boot(&mut self) {
        let frame = u32::from(self.memory.read_word(image::DBASE_OFFSET));

        let header = [
            (8, image::PBASE_OFFSET),
            (6, image::VBASE_OFFSET),
            (4, image::PCURR_OFFSET),
            (2, image::DCURR_OFFSET),
        ];
        for (below, offset) in header {
            let value = self.memory.read_word(offset);
            self.memory.write_ram_word(frame.wrapping_sub(below), value);
        }

        self.spawn(0, CogEntry::Interpreted { frame: frame as u16 });
    }

    /// Advance the whole chip by one system clock edge.
    ///
    /// Returns `false` if any cog reported a fault or breakpoint during this step.
    pub fn step(&mut self) -> bool {
        let mut pins;
        let mut dir;

        loop {
            let mut minimum = self.core_clock.time_until_tick();
            let mut ticked = None;

            pins = self.input();
            dir = self.dir();

            for (id, clock) in self.clocks.iter().enumerate() {
                if let Some(clock) = clock {
                    let until = clock.time_until_tick();
                    if until < minimum {
                        minimum = until;
                        ticked = Some(id);
                    }
                }
            }

            self.core_clock.advance(minimum);
            for clock in self.clocks.iter_mut().flatten() {
                clock.advance(minimum);
            }
            self.time += minimum;

            if ticked.is_none() {
                break;
            }
            if pins != self.input() || dir != self.dir() || self.pins.drive.is_pending() {
                self.pin_changed();
            }
        }

        self.ring.inc();

        let mut result = true;
        for id in 0..TOTAL_COGS {
            if let Some(ok) = self.with_cog(id, |cog, hub| cog.step(hub)) {
                result &= ok;
            }
        }

        if let Some(id) = self.ring.hub_slot() {
            self.with_cog(id, |cog, hub| cog.hub_accessible(hub));
        }

        if pins != self.input() || dir != self.dir() || self.pins.drive.is_pending() {
            self.pin_changed();
        }

        pins = self.input();
        dir = self.dir();

        self.counter = self.counter.wrapping_add(1);

        let time = self.time;
        for plugin in self.tick_handlers.snapshot() {
            plugin.borrow_mut().on_clock(time, &mut self.pins.drive);
        }

        if pins != self.input() || dir != self.dir() || self.pins.drive.is_pending() {
            self.pin_changed();
        }

        result
    }

    /// Single-step one cog outside the normal run loop.
    ///
    /// Returns `None` if the slot is empty.
    pub fn step_instruction(&mut self, id: usize) -> Option<bool> {
        if id >= TOTAL_COGS {
            warn!("Cannot step instruction on cog {}: no such cog", id);
            return None;
        }

        let pins = self.input();
        let dir = self.dir();
        let result = self.with_cog(id, |cog, hub| cog.step_instruction(hub));

        if pins != self.input() || dir != self.dir() || self.pins.drive.is_pending() {
            self.pin_changed();
        }
        result
    }

    /// Recompute every pin state and notify pin subscribers.
    pub fn pin_changed(&mut self) {
        self.pins.drive.clear_pending();
        let registers = self.registers();
        self.pins.resolve(registers);

        let time = self.time;
        let PinBus { drive, states } = &mut self.pins;
        for plugin in self.pin_handlers.snapshot() {
            plugin.borrow_mut().on_pin_change(time, states, drive);
        }
    }

    /// Force a pin floating or to a level; picked up on the next step.
    pub fn drive_pin(&mut self, pin: usize, floating: bool, hi: bool) {
        self.pins.drive.drive_pin(pin, floating, hi);
    }

    /// Apply a new clock mode. Bit 7 resets the chip instead.
    pub fn set_clock_mode(&mut self, mode: u8) {
        self.clock_mode = ClockMode::new(mode);

        if self.clock_mode.is_reset() {
            self.reset();
            return;
        }

        self.core_freq = self.clock_mode.core_frequency(self.xtal_freq);
        debug!("Clock mode {} -> core {} Hz", self.clock_mode, self.core_freq);

        let freq = self.core_freq;
        for cog in self.cogs.iter_mut().flatten() {
            cog.set_clock(freq);
        }
        for clock in self.clocks.iter_mut().flatten() {
            clock.set_frequency(freq);
        }
        self.core_clock.set_frequency(freq);
    }

    /// Stop a cog. Out-of-range and empty slots are ignored.
    pub fn stop(&mut self, id: usize) {
        if id >= TOTAL_COGS {
            warn!("Cannot stop cog {}: no such cog", id);
            return;
        }
        if self.clear_slot(id) {
            info!("Stopped cog {}", id);
        }
    }

    /// Perform a hub operation on behalf of cog `caller`.
    pub fn hub_op(&mut self, caller: usize, op: HubOperation, argument: u32) -> HubOpOutcome {
        debug!("Cog {} {} {:#010X}", caller, op, argument);

        match op {
            HubOperation::ClkSet => {
                self.set_clock_mode(argument as u8);
                HubOpOutcome::value(0)
            }
            HubOperation::CogId => HubOpOutcome::value(caller as u32),
            HubOperation::CogInit => self.cog_init(argument),
            HubOperation::CogStop => {
                self.stop((argument & 0x7) as usize);
                HubOpOutcome::value(argument)
            }
            HubOperation::LockNew => match self.locks.checkout() {
                Some(id) => HubOpOutcome::with_carry(id as u32, false),
                None => HubOpOutcome::with_carry(0, true),
            },
            HubOperation::LockRet => {
                self.locks.release(argument);
                HubOpOutcome::value(argument)
            }
            HubOperation::LockSet => {
                let previous = self.locks.write(argument, true);
                HubOpOutcome::with_carry(argument, previous)
            }
            HubOperation::LockClr => {
                let previous = self.locks.write(argument, false);
                HubOpOutcome::with_carry(argument, previous)
            }
        }
    }

    /// Perform a hub operation from its raw encoding.
    ///
    /// Unknown codes do nothing and return 0 with `carry` untouched.
    pub fn hub_op_raw(&mut self, caller: usize, code: u32, argument: u32, carry: &mut bool) -> u32 {
        match HubOperation::from_code(code) {
            Some(op) => self.hub_op(caller, op, argument).apply(carry),
            None => {
                warn!("Cog {} issued unknown hub operation {}", caller, code);
                0
            }
        }
    }

    fn cog_init(&mut self, argument: u32) -> HubOpOutcome {
        let param = (argument >> 16) & 0xFFFC;
        let program = (argument >> 2) & 0xFFFC;

        let id = if argument & COGINIT_NEW != 0 {
            match self.clocks.iter().position(Option::is_none) {
                Some(id) => id,
                None => {
                    debug!("COGINIT: no free cog");
                    return HubOpOutcome::with_carry(u32::MAX, true);
                }
            }
        } else {
            (argument & 0x7) as usize
        };

        let entry = if program == INTERPRETER_ENTRY {
            CogEntry::Interpreted { frame: param as u16 }
        } else {
            CogEntry::Native {
                program: program as u16,
                param: param as u16,
            }
        };

        self.spawn(id, entry);
        HubOpOutcome::with_carry(id as u32, false)
    }

    fn spawn(&mut self, id: usize, entry: CogEntry) {
        self.clear_slot(id);

        let cog = self.factory.create(entry, self.core_freq);
        self.clocks[id] = Some(PllGroup::new(self.core_freq));
        self.cogs[id] = Some(cog);
        self.generations[id] = self.generations[id].wrapping_add(1);

        info!("Started cog {} ({:?})", id, entry);
    }

    /// Empty a cog slot and its clock slot. Returns whether it was occupied.
    fn clear_slot(&mut self, id: usize) -> bool {
        let occupied = self.clocks[id].is_some();
        if let Some(mut cog) = self.cogs[id].take() {
            cog.detach_signal_hooks();
        }
        self.clocks[id] = None;
        if occupied {
            self.generations[id] = self.generations[id].wrapping_add(1);
        }
        occupied
    }

    /// Lift cog `id` out of its slot and run `f` with it and a view of the hub.
    ///
    /// The cog goes back only if nothing replaced or stopped its slot
    /// meanwhile; a discarded cog has its signal hooks detached.
    fn with_cog<R>(&mut self, id: usize, f: impl FnOnce(&mut dyn Cog, &mut HubAccess<'_>) -> R) -> Option<R> {
        let mut cog = self.cogs[id].take()?;
        let generation = self.generations[id];
        let freq = self.core_freq;
        let own = PinRegisters {
            dir: cog.dir(),
            out: cog.out(),
        };

        let result = {
            let mut access = HubAccess {
                hub: self,
                cog_id: id,
                own,
            };
            f(&mut *cog, &mut access)
        };

        if self.generations[id] == generation {
            if self.core_freq != freq {
                cog.set_clock(self.core_freq);
            }
            self.cogs[id] = Some(cog);
        } else {
            cog.detach_signal_hooks();
        }
        Some(result)
    }

    fn registers(&self) -> PinRegisters {
        PinRegisters::aggregate(self.cogs.iter().flatten().map(|cog| (cog.dir(), cog.out())))
    }

    // Plugin registration

    pub fn include_plugin(&mut self, plugin: PluginRef) {
        self.plugins.add(plugin);
    }

    pub fn remove_plugin(&mut self, plugin: &PluginRef) {
        self.plugins.remove(plugin);
    }

    pub fn notify_on_clock(&mut self, plugin: PluginRef) {
        self.tick_handlers.add(plugin);
    }

    pub fn remove_on_clock(&mut self, plugin: &PluginRef) {
        self.tick_handlers.remove(plugin);
    }

    pub fn notify_on_pins(&mut self, plugin: PluginRef) {
        self.pin_handlers.add(plugin);
    }

    pub fn remove_on_pins(&mut self, plugin: &PluginRef) {
        self.pin_handlers.remove(plugin);
    }

    pub fn plugins(&self) -> &PluginList {
        &self.plugins
    }

    /// `COGID` outside of a hub operation: the caller's own slot.
    pub fn cog_id(&self, caller: usize) -> u32 {
        caller as u32
    }

    // Direct lock access

    /// Check out a lock, or all-ones if none is free.
    pub fn new_lock(&mut self) -> u32 {
        self.locks.checkout().map_or(u32::MAX, |id| id as u32)
    }

    pub fn lock_return(&mut self, number: u32) {
        self.locks.release(number);
    }

    /// Write a lock's value; all-ones if it was previously set, else 0.
    pub fn lock_set(&mut self, number: u32, set: bool) -> u32 {
        if self.locks.write(number, set) {
            u32::MAX
        } else {
            0
        }
    }

    // Read surface

    pub fn dir(&self) -> u64 {
        self.registers().dir
    }

    pub fn out(&self) -> u64 {
        self.registers().out
    }

    pub fn input(&self) -> u64 {
        self.registers().input(self.pins.drive.hi())
    }

    pub fn dira(&self) -> u32 {
        self.dir() as u32
    }

    pub fn dirb(&self) -> u32 {
        (self.dir() >> 32) as u32
    }

    pub fn ina(&self) -> u32 {
        self.input() as u32
    }

    pub fn inb(&self) -> u32 {
        (self.input() >> 32) as u32
    }

    /// Pins no cog drives that are also not forced to a level.
    pub fn floating(&self) -> u64 {
        self.pins.drive.float() & !self.dir()
    }

    pub fn pin_states(&self) -> &[PinState; TOTAL_PINS] {
        self.pins.states()
    }

    pub fn pin_bus(&self) -> &PinBus {
        &self.pins
    }

    pub fn pin_drive(&self) -> &PinDrive {
        self.pins.drive()
    }

    /// Lock values, bit `n` for lock `n`.
    pub fn locks(&self) -> u8 {
        self.locks.state_bits()
    }

    /// Free locks, bit `n` for lock `n`.
    pub fn locks_free(&self) -> u8 {
        self.locks.available_bits()
    }

    /// Human-readable clock mode, e.g. `PLL+XTAL1+PLL16X`.
    pub fn clock(&self) -> String {
        self.clock_mode.to_string()
    }

    pub fn clock_mode(&self) -> ClockMode {
        self.clock_mode
    }

    pub fn xtal_frequency(&self) -> u32 {
        self.xtal_freq
    }

    pub fn core_frequency(&self) -> u32 {
        self.core_freq
    }

    /// Accumulated virtual time in seconds.
    pub fn emulator_time(&self) -> f64 {
        self.time
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn ring(&self) -> U4 {
        self.ring
    }

    pub fn cog(&self, id: usize) -> Option<&dyn Cog> {
        self.cogs.get(id)?.as_deref()
    }

    pub fn pll(&self, id: usize) -> Option<&PllGroup> {
        self.clocks.get(id)?.as_ref()
    }

    pub fn is_cog_active(&self, id: usize) -> bool {
        self.clocks.get(id).map_or(false, Option::is_some)
    }

    pub fn active_cogs(&self) -> usize {
        self.clocks.iter().flatten().count()
    }

    pub fn memory(&self) -> &HubMemory {
        &self.memory
    }

    pub fn reset_memory(&self) -> &HubMemory {
        &self.reset_memory
    }
}

/// The hub as seen by a stepping cog.
///
/// The calling cog is out of its slot while it runs, so its own direction
/// and output registers are sampled at the start of the call and folded into
/// the pin views. A cog that writes `DIRA`/`OUTA` mid-step reports the new
/// values through [`HubAccess::update_own`] so its next `INA` read sees them.
pub struct HubAccess<'a> {
    hub: &'a mut Hub,
    cog_id: usize,
    own: PinRegisters,
}

impl<'a> HubAccess<'a> {
    pub fn cog_id(&self) -> usize {
        self.cog_id
    }

    pub fn read_byte(&self, address: u32) -> u8 {
        self.hub.memory.read_byte(address)
    }

    pub fn read_word(&self, address: u32) -> u16 {
        self.hub.memory.read_word(address)
    }

    pub fn read_long(&self, address: u32) -> u32 {
        self.hub.memory.read_long(address)
    }

    /// Writes into the ROM half are dropped.
    pub fn write_byte(&mut self, address: u32, value: u8) {
        self.hub.memory.write_ram_byte(address, value);
    }

    pub fn write_word(&mut self, address: u32, value: u16) {
        self.hub.memory.write_ram_word(address, value);
    }

    pub fn write_long(&mut self, address: u32, value: u32) {
        self.hub.memory.write_ram_long(address, value);
    }

    pub fn hub_op(&mut self, op: HubOperation, argument: u32) -> HubOpOutcome {
        self.hub.hub_op(self.cog_id, op, argument)
    }

    pub fn hub_op_raw(&mut self, code: u32, argument: u32, carry: &mut bool) -> u32 {
        self.hub.hub_op_raw(self.cog_id, code, argument, carry)
    }

    /// Replace the caller's own direction and output registers in the pin views.
    pub fn update_own(&mut self, dir: u64, out: u64) {
        self.own = PinRegisters { dir, out };
    }

    fn registers(&self) -> PinRegisters {
        let others = self.hub.registers();
        PinRegisters {
            dir: others.dir | self.own.dir,
            out: others.out | self.own.out,
        }
    }

    pub fn input(&self) -> u64 {
        self.registers().input(self.hub.pins.drive.hi())
    }

    pub fn ina(&self) -> u32 {
        self.input() as u32
    }

    pub fn inb(&self) -> u32 {
        (self.input() >> 32) as u32
    }

    /// The system counter (`CNT`).
    pub fn counter(&self) -> u32 {
        self.hub.counter
    }

    pub fn time(&self) -> f64 {
        self.hub.time
    }

    pub fn core_frequency(&self) -> u32 {
        self.hub.core_freq
    }

    /// This cog's counter PLLs.
    pub fn pll(&mut self) -> Option<&mut PllGroup> {
        self.hub.clocks[self.cog_id].as_mut()
    }

    pub fn drive_pin(&mut self, pin: usize, floating: bool, hi: bool) {
        self.hub.drive_pin(pin, floating, hi);
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("clock", &self.clock())
            .field("core_freq", &self.core_freq)
            .field("xtal_freq", &self.xtal_freq)
            .field("counter", &self.counter)
            .field("ring", &self.ring)
            .field("time", &self.time)
            .field("active_cogs", &self.active_cogs())
            .field("plugins", &self.plugins)
            .finish()
    }
}
