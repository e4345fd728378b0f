use serde::Serialize;
use tracing::{debug, warn};

use crate::cpu::Arch;
use crate::parser::{self, Instruction};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AsmErrorKind {
    #[error("unknown instruction")]
    UnknownInstruction,
    #[error("immediate {value} does not fit in {bits}-bit field")]
    ImmediateOverflow { value: i64, bits: u8 },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("line {line}: {text}: {reason}")]
pub struct AssembleError {
    pub line: usize,
    pub text: String,
    pub reason: AsmErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Encoded {
    pub instruction: Instruction,
    pub address: u32,
    pub bytes: Vec<u8>,
}

/// Result of one assemble pass. Bad lines are collected, never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Assembly {
    pub bytes: Vec<u8>,
    pub instructions: Vec<Encoded>,
    pub errors: Vec<AssembleError>,
}

impl Assembly {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// `ADDR  BYTES  TEXT`, one line per encoded instruction.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for enc in &self.instructions {
            let hex: Vec<String> = enc.bytes.iter().map(|b| format!("{b:02X}")).collect();
            out.push_str(&format!(
                "{:04X}  {:<12}  {}\n",
                enc.address,
                hex.join(" "),
                enc.instruction
            ));
        }
        out
    }
}

pub fn assemble(source: &str, arch: Arch) -> Assembly {
    let table = arch.table();
    let mut asm = Assembly::default();
    let mut address = 0u32;
    for inst in parser::parse_source(source) {
        match table.encode(&inst) {
            Ok(bytes) => {
                debug!(%arch, address, %inst, ?bytes, "encoded");
                let at = address;
                address += bytes.len() as u32;
                asm.bytes.extend_from_slice(&bytes);
                asm.instructions.push(Encoded {
                    instruction: inst,
                    address: at,
                    bytes,
                });
            }
            Err(reason) => {
                let line = inst.line.unwrap_or(0);
                warn!(%arch, line, %inst, %reason, "assemble error");
                asm.errors.push(AssembleError {
                    line,
                    text: inst.to_string(),
                    reason,
                });
            }
        }
    }
    asm
}
