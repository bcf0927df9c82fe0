//! # Console Interface Module
//!
//! Interactive terminal debugger for the Propeller emulator.
//!
//! ## Features
//! - Live chip status: clock mode, frequencies, virtual time, counter and ring
//! - Per-cog occupancy with DIR/OUT registers
//! - 64-pin state strip and lock table
//! - Scrollable hub memory hex dump
//! - Run/stop, hub step, instruction step of the selected cog, reset and reload
//! - Typed commands after `:`

use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

use crate::config::ConsoleConfig;
use crate::emulator::Emulator;
use crate::types::{TOTAL_COGS, TOTAL_LOCKS, TOTAL_MEMORY};

/// Bytes shown per row of the memory pane.
const MEMORY_ROW: u32 = 16;
/// Rows skipped by PageUp/PageDown.
const MEMORY_PAGE_ROWS: u32 = 16;

/// Console UI application state
pub struct ConsoleApp {
    emulator: Emulator,
    config: ConsoleConfig,
    running: bool,
    command_mode: bool,
    command_buffer: String,
    show_help: bool,
    selected_cog: usize,
    memory_address: u32,
    message: String,
}

impl ConsoleApp {
    pub fn new(emulator: Emulator, config: ConsoleConfig) -> Self {
        Self {
            emulator,
            config,
            running: true,
            command_mode: false,
            command_buffer: String::new(),
            show_help: false,
            selected_cog: 0,
            memory_address: 0,
            message: String::new(),
        }
    }

    pub fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        enable_raw_mode().map_err(|e| format!("Failed to enable raw mode: {}", e))?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)
            .map_err(|e| format!("Failed to enter alternate screen: {}", e))?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        self.running = true;
        let mut last_draw = Instant::now();
        terminal.draw(|f| self.draw_ui(f))?;

        while self.running {
            if event::poll(Duration::from_millis(1))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key_event(key.code);
                }
            }

            self.emulator.run_frame();

            let now = Instant::now();
            if now.duration_since(last_draw) >= Duration::from_millis(self.config.refresh_rate_ms) {
                terminal.draw(|f| self.draw_ui(f))?;
                last_draw = now;
            }
        }

        disable_raw_mode().map_err(|e| format!("Failed to disable raw mode: {}", e))?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)
            .map_err(|e| format!("Failed to leave alternate screen: {}", e))?;
        terminal
            .show_cursor()
            .map_err(|e| format!("Failed to show cursor: {}", e))?;

        Ok(())
    }

    pub fn handle_key_event(&mut self, key: KeyCode) {
        if self.command_mode {
            match key {
                KeyCode::Esc => {
                    self.command_mode = false;
                    self.command_buffer.clear();
                }
                KeyCode::Backspace => {
                    self.command_buffer.pop();
                }
                KeyCode::Enter => {
                    self.command_mode = false;
                    self.execute_command();
                    self.command_buffer.clear();
                }
                KeyCode::Char(c) if c.is_ascii_alphanumeric() || c == ' ' => {
                    self.command_buffer.push(c);
                }
                _ => {}
            }
            return;
        }

        if self.show_help {
            self.show_help = false;
            return;
        }

        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.quit(),
            KeyCode::Char('h') | KeyCode::Char('H') => self.show_help = true,
            KeyCode::Char('r') | KeyCode::Char('R') => {
                if self.emulator.is_running() {
                    self.emulator.stop();
                } else {
                    self.emulator.run();
                }
            }
            KeyCode::Char(' ') => self.step(),
            KeyCode::Char('i') | KeyCode::Char('I') => self.step_instruction(),
            KeyCode::Char('x') | KeyCode::Char('X') => self.reset(),
            KeyCode::Tab => {
                self.selected_cog = (self.selected_cog + 1) % TOTAL_COGS;
            }
            KeyCode::Up => self.scroll_memory(-1),
            KeyCode::Down => self.scroll_memory(1),
            KeyCode::PageUp => self.scroll_memory(-(MEMORY_PAGE_ROWS as i64)),
            KeyCode::PageDown => self.scroll_memory(MEMORY_PAGE_ROWS as i64),
            KeyCode::Char(':') => {
                self.command_mode = true;
                self.command_buffer.clear();
            }
            _ => {}
        }
    }

    fn execute_command(&mut self) {
        let cmd = self.command_buffer.trim().to_lowercase();
        let mut words = cmd.split_whitespace();

        match (words.next(), words.next()) {
            (Some("quit") | Some("exit") | Some("q"), None) => self.quit(),
            (Some("run") | Some("r"), None) => self.emulator.run(),
            (Some("stop") | Some("s"), None) => self.emulator.stop(),
            (Some("step"), None) => self.step(),
            (Some("reset"), None) => self.reset(),
            (Some("reload"), None) => match self.emulator.reload() {
                Ok(()) => self.message = "Reloaded".to_string(),
                Err(e) => self.message = format!("Reload failed: {}", e),
            },
            (Some("help") | Some("h"), None) => self.show_help = true,
            (Some("cog"), Some(n)) => match n.parse::<usize>() {
                Ok(id) if id < TOTAL_COGS => self.selected_cog = id,
                _ => self.message = format!("No such cog: {}", n),
            },
            (Some("mem"), Some(addr)) => {
                let digits = addr.trim_start_matches("0x");
                match u32::from_str_radix(digits, 16) {
                    Ok(address) if (address as usize) < TOTAL_MEMORY => {
                        self.memory_address = address - address % MEMORY_ROW;
                    }
                    _ => self.message = format!("Bad address: {}", addr),
                }
            }
            (None, _) => {}
            _ => {
                self.message = format!(
                    "Unknown command: '{}' (run, stop, step, reset, reload, cog N, mem ADDR, help, quit)",
                    cmd
                );
            }
        }
    }

    /// Move the memory pane by `rows`, wrapping around the 64 KiB address space.
    fn scroll_memory(&mut self, rows: i64) {
        let span = TOTAL_MEMORY as i64;
        let address = i64::from(self.memory_address) + rows * i64::from(MEMORY_ROW);
        self.memory_address = address.rem_euclid(span) as u32;
    }

    fn quit(&mut self) {
        self.emulator.stop();
        self.running = false;
    }

    fn step(&mut self) {
        self.emulator.stop();
        if !self.emulator.step() {
            self.message = "Breakpoint".to_string();
        }
    }

    fn step_instruction(&mut self) {
        self.emulator.stop();
        self.message = match self.emulator.step_instruction(self.selected_cog) {
            Some(true) => String::new(),
            Some(false) => "Breakpoint".to_string(),
            None => format!("Cog {} is not running", self.selected_cog),
        };
    }

    fn reset(&mut self) {
        self.emulator.reset();
        self.message = "Reset".to_string();
    }

    pub fn draw_ui(&self, f: &mut Frame) {
        let size = f.size();

        if self.show_help {
            self.draw_help_screen(f, size);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5),  // Status
                Constraint::Length(10), // Cogs and locks
                Constraint::Min(3),     // Memory
                Constraint::Length(4),  // Pins
                Constraint::Length(3),  // Command bar
            ])
            .split(size);

        self.draw_status(f, chunks[0]);

        let middle = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(chunks[1]);

        if self.config.show_cogs {
            self.draw_cogs(f, middle[0]);
        }
        if self.config.show_locks {
            self.draw_locks(f, middle[1]);
        }
        if self.config.show_memory {
            self.draw_memory(f, chunks[2]);
        }
        if self.config.show_pins {
            self.draw_pins(f, chunks[3]);
        }

        let command_text = if self.command_mode {
            format!(":{}", self.command_buffer)
        } else if !self.message.is_empty() {
            self.message.clone()
        } else {
            "Press ':' to enter a command, 'h' for help".to_string()
        };

        let command_bar = Paragraph::new(command_text)
            .style(Style::default().fg(Color::White))
            .block(Block::default().borders(Borders::ALL).title("Command"));
        f.render_widget(command_bar, chunks[4]);
    }

    fn draw_status(&self, f: &mut Frame, area: Rect) {
        let chip = self.emulator.chip();
        let state = if self.emulator.is_running() {
            Span::styled("RUNNING", Style::default().fg(Color::Green))
        } else {
            Span::styled("STOPPED", Style::default().fg(Color::Red))
        };
        let file = self
            .emulator
            .last_file()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string());

        let lines = vec![
            Line::from(vec![
                Span::styled(
                    "Propeller Emulator ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                state,
                Span::raw(format!("  {}", file)),
            ]),
            Line::from(format!(
                "Clock: {}  Core: {} Hz  Xtal: {} Hz",
                chip.clock(),
                chip.core_frequency(),
                chip.xtal_frequency()
            )),
            Line::from(format!(
                "Time: {:.6} s  Counter: {}  Ring: {}",
                chip.emulator_time(),
                chip.counter(),
                chip.ring()
            )),
        ];

        let status = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .wrap(Wrap { trim: true });
        f.render_widget(status, area);
    }

    fn draw_cogs(&self, f: &mut Frame, area: Rect) {
        let chip = self.emulator.chip();
        let lines: Vec<Line> = (0..TOTAL_COGS)
            .map(|id| {
                let marker = if id == self.selected_cog { ">" } else { " " };
                let style = if id == self.selected_cog {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                };
                let text = match chip.cog(id) {
                    Some(cog) => format!(
                        "{} Cog {}  DIR {:016X}  OUT {:016X}",
                        marker,
                        id,
                        cog.dir(),
                        cog.out()
                    ),
                    None => format!("{} Cog {}  idle", marker, id),
                };
                Line::from(Span::styled(text, style))
            })
            .collect();

        let cogs = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Cogs"));
        f.render_widget(cogs, area);
    }

    fn draw_locks(&self, f: &mut Frame, area: Rect) {
        let chip = self.emulator.chip();
        let lines: Vec<Line> = (0..TOTAL_LOCKS)
            .map(|id| {
                let free = chip.locks_free() & (1 << id) != 0;
                let set = chip.locks() & (1 << id) != 0;
                Line::from(format!(
                    "Lock {}: {} {}",
                    id,
                    if free { "free" } else { "held" },
                    if set { "SET" } else { "clr" }
                ))
            })
            .collect();

        let locks = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Locks"));
        f.render_widget(locks, area);
    }

    fn draw_memory(&self, f: &mut Frame, area: Rect) {
        let memory = self.emulator.chip().memory();
        let rows = u32::from(area.height.saturating_sub(2));

        let lines: Vec<Line> = (0..rows)
            .map(|row| {
                let base = (self.memory_address + row * MEMORY_ROW) % TOTAL_MEMORY as u32;
                let bytes: Vec<u8> = (0..MEMORY_ROW).map(|i| memory.read_byte(base + i)).collect();
                let hex: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();
                let ascii: String = bytes
                    .iter()
                    .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
                    .collect();
                Line::from(format!("{:04X}: {}  {}", base, hex.join(" "), ascii))
            })
            .collect();

        let title = format!("Hub Memory @ {:04X}", self.memory_address);
        let view = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(view, area);
    }

    fn draw_pins(&self, f: &mut Frame, area: Rect) {
        let glyphs = self.emulator.chip().pin_bus().to_glyphs();
        let (port_b, port_a) = glyphs.split_at(glyphs.len() / 2);

        let lines = vec![
            Line::from(format!("P63..P32 {}", port_b)),
            Line::from(format!("P31..P0  {}", port_a)),
        ];

        let pins = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Pins"));
        f.render_widget(pins, area);
    }

    fn draw_help_screen(&self, f: &mut Frame, area: Rect) {
        let key = |k: &'static str, what: &'static str| {
            Line::from(vec![
                Span::styled(k, Style::default().fg(Color::Yellow)),
                Span::raw(what),
            ])
        };

        let help_text = vec![
            Line::from(Span::styled(
                "Propeller Emulator Console Help",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled("Keys:", Style::default().add_modifier(Modifier::BOLD))),
            key("  r", " - Run/stop"),
            key("  space", " - Single hub step"),
            key("  i", " - Step one instruction on the selected cog"),
            key("  tab", " - Select next cog"),
            key("  up/down", " - Scroll hub memory by one row"),
            key("  pgup/pgdn", " - Scroll hub memory by one page"),
            key("  x", " - Reset chip"),
            key("  :", " - Enter a command"),
            key("  q", " - Quit"),
            Line::from(""),
            Line::from(Span::styled("Commands:", Style::default().add_modifier(Modifier::BOLD))),
            key("  run, stop, step, reset", ""),
            key("  reload", " - Reload the last binary from disk"),
            key("  cog N", " - Select cog N"),
            key("  mem ADDR", " - Show hub memory from hex address ADDR"),
            key("  help, quit", ""),
            Line::from(""),
            Line::from("Press any key to return to main view..."),
        ];

        let help = Paragraph::new(help_text)
            .style(Style::default().fg(Color::White))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Help"));
        f.render_widget(help, area);
    }

    pub fn emulator(&self) -> &Emulator {
        &self.emulator
    }

    pub fn emulator_mut(&mut self) -> &mut Emulator {
        &mut self.emulator
    }

    pub fn selected_cog(&self) -> usize {
        self.selected_cog
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// First address shown in the memory pane.
    pub fn memory_address(&self) -> u32 {
        self.memory_address
    }

    pub fn is_showing_help(&self) -> bool {
        self.show_help
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Public interface for launching the console
pub fn run_console(emulator: Emulator, config: ConsoleConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = ConsoleApp::new(emulator, config);
    app.run()
}
