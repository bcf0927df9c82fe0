//! # Emulator Host
//!
//! Drives a [`Hub`] on behalf of a front end: loading binaries from disk,
//! running frames of steps until a cog reports a breakpoint, single stepping
//! and attaching plugins.

use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::EmulatorConfig;
use crate::hub::Hub;
use crate::image::ImageError;
use crate::plugin::PluginRef;

#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error("failed to load program binary {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("no binary has been opened")]
    NoBinary,
}

pub struct Emulator {
    chip: Hub,
    config: EmulatorConfig,
    last_file: Option<PathBuf>,
    running: bool,
}

impl Emulator {
    pub fn new(chip: Hub, config: EmulatorConfig) -> Self {
        Self {
            chip,
            config,
            last_file: None,
            running: false,
        }
    }

    /// Create a host and open the binary named in `config`, if any.
    pub fn with_config(chip: Hub, config: EmulatorConfig) -> Result<Self, EmulatorError> {
        let binary = config.binary.clone();
        let mut emulator = Self::new(chip, config);
        if let Some(path) = binary {
            emulator.open_file(path)?;
        }
        Ok(emulator)
    }

    /// Load and boot a program image from disk.
    pub fn open_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), EmulatorError> {
        self.load(path.as_ref())?;
        self.repaint_plugins(true);
        Ok(())
    }

    /// Re-read the last opened binary from disk and restart it.
    pub fn reload(&mut self) -> Result<(), EmulatorError> {
        let path = self.last_file.clone().ok_or(EmulatorError::NoBinary)?;
        self.load(&path)?;
        self.chip.reset();
        self.repaint_plugins(true);
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<(), EmulatorError> {
        let program = fs::read(path).map_err(|source| EmulatorError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        self.chip.initialize(&program)?;
        self.last_file = Some(path.to_path_buf());
        info!("Opened {}", path.display());
        Ok(())
    }

    pub fn run(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Execute up to `update_each_steps` steps while running.
    ///
    /// A step returning `false` stops the host. Returns the number of steps taken.
    pub fn run_frame(&mut self) -> u32 {
        if !self.running {
            return 0;
        }

        for taken in 1..=self.config.update_each_steps {
            if !self.chip.step() {
                info!("Breakpoint after {} steps at counter {}", taken, self.chip.counter());
                self.running = false;
                self.repaint_plugins(true);
                return taken;
            }
        }
        if self.config.update_each_steps > 0 {
            self.repaint_plugins(false);
        }
        self.config.update_each_steps
    }

    /// Single hub step, regardless of the run state.
    pub fn step(&mut self) -> bool {
        let result = self.chip.step();
        self.repaint_plugins(true);
        result
    }

    pub fn reset(&mut self) {
        self.chip.reset();
        self.repaint_plugins(true);
    }

    pub fn step_instruction(&mut self, cog: usize) -> Option<bool> {
        let result = self.chip.step_instruction(cog);
        if result.is_none() {
            warn!("Cog {} is not running", cog);
        }
        self.repaint_plugins(true);
        result
    }

    /// Register a plugin for lifecycle events and let it inspect the chip.
    ///
    /// The plugin is then subscribed to ticks and pin changes as its
    /// [`wants_clock`](crate::Plugin::wants_clock) and
    /// [`wants_pins`](crate::Plugin::wants_pins) answer. Owners may
    /// also subscribe it directly through [`Hub::notify_on_clock`] and
    /// [`Hub::notify_on_pins`].
    pub fn attach_plugin(&mut self, plugin: PluginRef) {
        self.chip.include_plugin(plugin.clone());
        plugin.borrow_mut().present_chip(&self.chip);

        let (clock, pins) = {
            let plugin = plugin.borrow();
            (plugin.wants_clock(), plugin.wants_pins())
        };
        if clock {
            self.chip.notify_on_clock(plugin.clone());
        }
        if pins {
            self.chip.notify_on_pins(plugin.clone());
        }
        info!("Attached plugin '{}'", plugin.borrow().title());
    }

    /// Ask every attached plugin to refresh its view of the chip.
    pub fn repaint_plugins(&mut self, force: bool) {
        for plugin in self.chip.plugins().snapshot() {
            plugin.borrow_mut().repaint(&self.chip, force);
        }
    }

    /// Remove a plugin from every notification list.
    pub fn detach_plugin(&mut self, plugin: &PluginRef) {
        self.chip.remove_on_pins(plugin);
        self.chip.remove_on_clock(plugin);
        self.chip.remove_plugin(plugin);
    }

    pub fn chip(&self) -> &Hub {
        &self.chip
    }

    pub fn chip_mut(&mut self) -> &mut Hub {
        &mut self.chip
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    pub fn last_file(&self) -> Option<&Path> {
        self.last_file.as_deref()
    }
}
