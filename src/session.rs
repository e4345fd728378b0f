use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assembler::{self, Assembly};
use crate::cpu::{Arch, Cpu8051, Cpu8086, Processor, Snapshot};
use crate::disasm::{self, DisasmLine};
use crate::parser::{self, Instruction};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub arch: Arch,
    /// Upper bound on instructions executed by one `run`.
    pub step_limit: Option<usize>,
}

impl SessionConfig {
    pub fn from_json(text: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("{op} needs the {expected} processor, {active} is active")]
    WrongArchitecture {
        op: &'static str,
        expected: Arch,
        active: Arch,
    },
    #[error("invalid session config: {0}")]
    Config(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub executed: usize,
    pub halted: bool,
    /// Cut short by the stop predicate, `stop()` or the step limit.
    pub stopped: bool,
}

/// One simulator: both machines, the source text, run control and the console log.
///
/// Only the selected machine executes; the other keeps its state until an
/// explicit reset.
#[derive(Debug, Clone)]
pub struct Session {
    config: SessionConfig,
    source: String,
    cpu8086: Cpu8086,
    cpu8051: Cpu8051,
    cursor: usize,
    running: bool,
    log: Vec<LogEntry>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            source: String::new(),
            cpu8086: Cpu8086::new(),
            cpu8051: Cpu8051::new(),
            cursor: 0,
            running: false,
            log: Vec::new(),
        }
    }

    pub fn arch(&self) -> Arch {
        self.config.arch
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn push(&mut self, kind: LogKind, message: impl Into<String>) {
        self.log.push(LogEntry {
            kind,
            message: message.into(),
        });
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Select the active machine. Neither machine is reset.
    pub fn set_architecture(&mut self, arch: Arch) {
        info!(%arch, "switch processor");
        self.config.arch = arch;
        self.cursor = 0;
        self.push(LogKind::Info, format!("Switched to {arch} processor"));
    }

    pub fn set_source(&mut self, source: &str) {
        self.source = source.to_string();
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn processor(&self) -> &dyn Processor {
        match self.config.arch {
            Arch::I8086 => &self.cpu8086,
            Arch::I8051 => &self.cpu8051,
        }
    }

    pub fn processor_mut(&mut self) -> &mut dyn Processor {
        match self.config.arch {
            Arch::I8086 => &mut self.cpu8086,
            Arch::I8051 => &mut self.cpu8051,
        }
    }

    pub fn cpu8086(&self) -> &Cpu8086 {
        &self.cpu8086
    }

    pub fn cpu8051(&self) -> &Cpu8051 {
        &self.cpu8051
    }

    fn program(&self) -> Vec<Instruction> {
        parser::parse_source(&self.source)
    }

    pub fn assemble(&mut self) -> Assembly {
        let asm = assembler::assemble(&self.source, self.arch());
        self.push(LogKind::Info, "--- Assembly ---");
        if asm.is_ok() {
            for line in asm.listing().lines() {
                self.push(LogKind::Success, line);
            }
            self.push(
                LogKind::Info,
                format!("Total instructions: {}", asm.instructions.len()),
            );
        } else {
            for err in &asm.errors {
                self.push(LogKind::Error, err.to_string());
            }
        }
        asm
    }

    /// Assemble the source and decode the resulting bytes again.
    pub fn disassemble(&mut self) -> Vec<DisasmLine> {
        let asm = assembler::assemble(&self.source, self.arch());
        let lines = disasm::disassemble(&asm.bytes, self.arch());
        self.push(LogKind::Info, "--- Disassembly ---");
        for line in &lines {
            self.push(LogKind::Info, format!("{:04X}: {}", line.address, line.text()));
        }
        lines
    }

    /// Assemble and copy the bytes into the active machine's memory at 0.
    pub fn load_program(&mut self) -> Assembly {
        let asm = self.assemble();
        self.processor_mut().load_program(&asm.bytes);
        info!(arch = %self.arch(), len = asm.bytes.len(), "program loaded");
        self.push(LogKind::Info, format!("Loaded {} bytes", asm.bytes.len()));
        asm
    }

    pub fn run(&mut self) -> RunOutcome {
        self.run_until(|_| false)
    }

    /// Execute the listing once, top to bottom.
    ///
    /// Before each instruction the halt latch, the step limit and `stop(index)`
    /// are checked. Jumps only update IP/PC; they do not redirect the walk.
    pub fn run_until(&mut self, mut stop: impl FnMut(usize) -> bool) -> RunOutcome {
        info!(arch = %self.arch(), "run");
        self.running = true;
        self.cursor = 0;
        self.push(LogKind::Info, "--- Running Program ---");
        let limit = self.config.step_limit;
        let mut outcome = RunOutcome::default();
        for (idx, inst) in self.program().iter().enumerate() {
            if self.processor().halted() {
                break;
            }
            if !self.running || stop(idx) {
                outcome.stopped = true;
                self.push(LogKind::Info, "Execution stopped");
                break;
            }
            if limit.is_some_and(|l| outcome.executed >= l) {
                outcome.stopped = true;
                self.push(LogKind::Info, "Step limit reached");
                break;
            }
            let trace = self.processor_mut().execute(inst);
            self.push(LogKind::Success, format!("[{idx}] {trace}"));
            outcome.executed += 1;
            self.cursor = idx + 1;
        }
        self.running = false;
        outcome.halted = self.processor().halted();
        self.push(LogKind::Info, "Program execution completed");
        outcome
    }

    /// Execute the instruction under the cursor and advance.
    ///
    /// `None` once the listing is exhausted or the machine has halted.
    pub fn step(&mut self) -> Option<String> {
        let program = self.program();
        let Some(inst) = program.get(self.cursor) else {
            self.push(LogKind::Info, "Program execution completed");
            return None;
        };
        if self.processor().halted() {
            self.push(LogKind::Info, "Processor halted");
            return None;
        }
        let trace = self.processor_mut().execute(inst);
        self.push(LogKind::Success, format!("[{}] {trace}", self.cursor));
        self.cursor += 1;
        Some(trace)
    }

    /// Reset both machines and the run state.
    pub fn reset(&mut self) {
        info!("reset");
        self.cpu8086.reset();
        self.cpu8051.reset();
        self.cursor = 0;
        self.running = false;
        self.push(LogKind::Info, "Simulator reset");
    }

    pub fn stop(&mut self) {
        info!("stop");
        self.running = false;
        self.push(LogKind::Info, "Execution stopped");
    }

    /// Preload 8051 external memory. The program counter is not touched.
    pub fn load_external_memory(&mut self, addr: u16, values: &[u8]) -> Result<(), SessionError> {
        if self.arch() != Arch::I8051 {
            return Err(SessionError::WrongArchitecture {
                op: "load_external_memory",
                expected: Arch::I8051,
                active: self.arch(),
            });
        }
        self.cpu8051.load_external_memory(addr, values);
        self.push(
            LogKind::Info,
            format!("Loaded {} bytes of external memory at {addr:#06X}", values.len()),
        );
        Ok(())
    }

    pub fn read_memory(&self, addr: u32) -> u8 {
        self.processor().read_memory(addr)
    }

    pub fn write_memory(&mut self, addr: u32, val: u8) {
        self.processor_mut().write_memory(addr, val);
    }

    /// `count` bytes from `start`, wrapping at the top of memory.
    pub fn memory(&self, start: u32, count: usize) -> Vec<u8> {
        (0..count as u32)
            .map(|i| self.read_memory(start.wrapping_add(i)))
            .collect()
    }

    /// P0..P3 when the 8051 is active.
    pub fn ports(&self) -> Option<[u8; 4]> {
        (self.arch() == Arch::I8051).then_some(self.cpu8051.ports)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.processor().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_fill_missing_fields() {
        let cfg = SessionConfig::from_json(r#"{"arch":"8051"}"#).unwrap();
        assert_eq!(cfg.arch, Arch::I8051);
        assert_eq!(cfg.step_limit, None);
        assert!(SessionConfig::from_json("{").is_err());
    }

    #[test]
    fn log_kinds_serialize_lowercase() {
        let entry = LogEntry {
            kind: LogKind::Success,
            message: "ok".into(),
        };
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"kind":"success","message":"ok"}"#
        );
    }
}
