//! Debugger application state and logic.

use crate::asm::disasm::{disassemble_at, disassemble_instruction};
use crate::config::MachineConfig;
use crate::{Cpu, CpuState};
use std::collections::HashSet;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu,
    /// Original program for reference.
    pub program: Vec<u8>,
    /// Machine settings used on reset.
    pub config: MachineConfig,
    /// Everything the program has printed so far.
    pub output: Vec<u8>,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<u8>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset (in 8-byte rows).
    pub mem_scroll: usize,
    /// Let the next tick step off a breakpoint when resuming.
    skip_breakpoint: bool,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Vec<u8>, config: MachineConfig) -> Self {
        let mut app = Self {
            cpu: Cpu::new(),
            program,
            config,
            output: Vec::new(),
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: String::new(),
            mem_scroll: 0,
            skip_breakpoint: false,
        };
        app.reset();
        if app.cpu.is_running() {
            app.status = "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into();
        }
        app
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.cpu.is_running() {
            self.status = format!("CPU stopped: {:?}", self.cpu.state);
            self.running = false;
            return;
        }

        let pc = self.cpu.regs.pc;
        match self.cpu.step(&mut self.output) {
            Ok(instr) => {
                self.status = format!("PC={:02X}: {}", pc, disassemble_instruction(&instr));
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.skip_breakpoint = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.cpu.is_running() {
            self.running = false;
            self.status = format!("{:?} after {} cycles", self.cpu.state, self.cpu.cycles);
            return;
        }

        let pc = self.cpu.regs.pc;
        if self.breakpoints.contains(&pc) && !self.skip_breakpoint {
            self.running = false;
            self.status = format!("Breakpoint at PC={:02X}", pc);
            return;
        }

        self.skip_breakpoint = false;
        self.step();
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:02X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:02X}", pc);
        }
    }

    /// Reset CPU to initial state with the program reloaded.
    ///
    /// On failure the CPU is left stopped and the reason shown in `status`.
    pub fn reset(&mut self) {
        self.output.clear();
        self.running = false;
        self.status = match self.reload() {
            Ok(()) => "Reset. Ready.".into(),
            Err(e) => {
                self.cpu.state = CpuState::Error;
                e
            }
        };
    }

    fn reload(&mut self) -> Result<(), String> {
        let mut cpu = self.config.build_cpu()
            .map_err(|e| format!("Bad configuration: {}", e))?;
        cpu.load_program(&self.program)
            .map_err(|e| format!("Load failed: {}", e))?;
        self.cpu = cpu;
        Ok(())
    }

    /// Disassembly starting at the current PC.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u8, String, bool)> {
        let bytes = self.cpu.mem.as_slice();
        let pc = self.cpu.regs.pc as usize;
        let mut addr = pc;

        let mut listing = Vec::with_capacity(lines);
        while listing.len() < lines && addr < bytes.len() {
            let (text, size) = disassemble_at(bytes, addr);
            listing.push((addr as u8, text, addr == pc));
            addr += size;
        }
        listing
    }

    /// Printed output as display text.
    pub fn output_text(&self) -> String {
        self.output
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Vec<u8>, config: MachineConfig) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(program, config);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => {
                            app.mem_scroll = app.mem_scroll.saturating_sub(1);
                        }
                        KeyCode::Down => {
                            let rows = app.cpu.mem.len() / 8;
                            if app.mem_scroll + 1 < rows {
                                app.mem_scroll += 1;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;

    fn app(source: &str) -> DebuggerApp {
        DebuggerApp::new(assemble(source).unwrap(), MachineConfig::default())
    }

    #[test]
    fn test_step_and_output() {
        let mut app = app("LDI R0, 8\nPRN R0\nHLT");

        app.step();
        app.step();
        assert_eq!(app.output, vec![8]);
        assert!(app.status.contains("PRN R0"));

        app.step();
        assert!(app.cpu.is_halted());
    }

    #[test]
    fn test_run_stops_at_breakpoint() {
        let mut app = app("LDI R0, 1\nINC R0\nINC R0\nHLT");
        app.cpu.regs.pc = 5;
        app.toggle_breakpoint();
        app.cpu.regs.pc = 0;

        app.run();
        for _ in 0..10 {
            app.tick();
        }

        assert!(!app.running);
        assert_eq!(app.cpu.regs.pc, 5);
        assert_eq!(app.cpu.regs.general[0], 2);
    }

    #[test]
    fn test_bad_config_reported() {
        let config = MachineConfig { memory_size: 100, ..MachineConfig::default() };
        let mut app = DebuggerApp::new(vec![1], config);

        assert!(app.status.contains("Bad configuration"));
        assert!(app.status.contains("invalid memory size 100"));
        assert!(app.cpu.is_faulted());

        app.step();
        assert_eq!(app.output, Vec::<u8>::new());
        assert_eq!(app.cpu.cycles, 0);
    }

    #[test]
    fn test_reset_reloads_program() {
        let mut app = app("LDI R0, 8\nPRN R0\nHLT");
        app.run();
        for _ in 0..10 {
            app.tick();
        }
        assert!(app.cpu.is_halted());

        app.reset();
        assert!(app.cpu.is_running());
        assert!(app.output.is_empty());
        assert_eq!(app.get_disassembly(1)[0].1, "LDI R0, 8");
    }
}
