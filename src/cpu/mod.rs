use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::instructions::OpcodeTable;
use crate::isa;
use crate::literal;
use crate::parser::Instruction;

pub mod i8051;
pub mod i8086;

pub use i8051::{Cpu8051, Psw};
pub use i8086::{Cpu8086, Flags};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Arch {
    #[default]
    #[serde(rename = "8086")]
    #[value(name = "8086")]
    I8086,
    #[serde(rename = "8051")]
    #[value(name = "8051")]
    I8051,
}

/// Byte order of multi-byte immediates and addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl Arch {
    /// Radix of bare numeric literals.
    pub fn radix(self) -> u32 {
        match self {
            Arch::I8086 => 10,
            Arch::I8051 => 16,
        }
    }

    pub fn byte_order(self) -> ByteOrder {
        match self {
            Arch::I8086 => ByteOrder::Little,
            Arch::I8051 => ByteOrder::Big,
        }
    }

    pub fn addr_bits(self) -> u32 {
        match self {
            Arch::I8086 => 20,
            Arch::I8051 => 16,
        }
    }

    pub fn table(self) -> &'static OpcodeTable {
        match self {
            Arch::I8086 => &isa::i8086::TABLE,
            Arch::I8051 => &isa::i8051::TABLE,
        }
    }

    /// True if `name` is an operand keyword of this architecture rather than a number.
    pub fn is_register(self, name: &str) -> bool {
        let names: &[&str] = match self {
            Arch::I8086 => i8086::REGISTER_NAMES,
            Arch::I8051 => i8051::REGISTER_NAMES,
        };
        names.iter().any(|n| n.eq_ignore_ascii_case(name.trim()))
    }

    pub fn parse_literal(self, operand: &str) -> Option<i64> {
        literal::parse_operand(operand, self.radix())
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Arch::I8086 => "8086",
            Arch::I8051 => "8051",
        })
    }
}

/// Common surface of both CPU state machines.
///
/// `execute` is total: every outcome, including unsupported mnemonics and
/// malformed operands, is reported in the returned trace.
pub trait Processor {
    fn arch(&self) -> Arch;
    fn reset(&mut self);
    fn execute(&mut self, inst: &Instruction) -> String;
    fn halted(&self) -> bool;
    /// Copy `bytes` to address 0 and point the program counter there.
    fn load_program(&mut self, bytes: &[u8]);
    fn read_memory(&self, addr: u32) -> u8;
    fn write_memory(&mut self, addr: u32, val: u8);
    fn snapshot(&self) -> Snapshot;
}

/// `Ok` carries the trace of an executed instruction; `Err` a rejection
/// trace for an instruction that left the machine untouched.
pub type Step = Result<String, String>;
pub type Handler<M> = fn(&mut M, &Instruction) -> Step;

/// Mnemonic table of one machine.
pub trait InstructionSet: Sized {
    fn handler(mnemonic: &str) -> Option<Handler<Self>>;
}

pub fn dispatch<M: InstructionSet>(m: &mut M, inst: &Instruction) -> String {
    let Some(handler) = M::handler(&inst.mnemonic.to_ascii_uppercase()) else {
        debug!(mnemonic = %inst.mnemonic, "unknown instruction");
        return format!("Unknown instruction: {}", inst.mnemonic);
    };
    match handler(m, inst) {
        Ok(trace) => {
            debug!(%inst, %trace, "executed");
            trace
        }
        Err(trace) => {
            debug!(%inst, %trace, "rejected");
            trace
        }
    }
}

/// Exactly `N` trimmed operands, or the usual complaint.
pub(crate) fn operands<const N: usize>(inst: &Instruction) -> Result<[&str; N], String> {
    let ops: Vec<&str> = inst.operands.iter().map(|s| s.trim()).collect();
    ops.try_into().map_err(|_| {
        if N == 1 {
            format!("{} requires 1 operand", inst.mnemonic)
        } else {
            format!("{} requires {N} operands", inst.mnemonic)
        }
    })
}

/// Numeric operand with the silent fallback: anything unparsable reads as 0.
pub(crate) fn value_or_zero(arch: Arch, operand: &str) -> u32 {
    match arch.parse_literal(operand) {
        Some(v) => v as u32,
        None => {
            debug!(%arch, operand, "unparsable operand, using 0");
            0
        }
    }
}

/// Serializable view of a machine for display and comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub arch: Arch,
    pub registers: Vec<(String, u16)>,
    pub flags: Vec<(String, bool)>,
    /// P0..P3 on the 8051, empty otherwise.
    pub ports: Vec<u8>,
    pub halted: bool,
}

impl Snapshot {
    pub fn register(&self, name: &str) -> Option<u16> {
        self.registers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.flags
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = match self.arch {
            Arch::I8086 => 4,
            Arch::I8051 => 2,
        };
        let regs: Vec<String> = self
            .registers
            .iter()
            .map(|(n, v)| {
                let w = if n == "DPTR" || n == "PC" { 4 } else { width };
                format!("{n}={v:0w$X}")
            })
            .collect();
        writeln!(f, "[{}] {}", self.arch, regs.join(" "))?;
        let flags: Vec<String> = self
            .flags
            .iter()
            .map(|(n, v)| format!("{n}={}", u8::from(*v)))
            .collect();
        write!(f, "flags: {}", flags.join(" "))?;
        if !self.ports.is_empty() {
            let ports: Vec<String> = self
                .ports
                .iter()
                .enumerate()
                .map(|(i, p)| format!("P{i}={p:02X}"))
                .collect();
            write!(f, "\nports: {}", ports.join(" "))?;
        }
        if self.halted {
            write!(f, "\nhalted")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arch_names_round_trip_through_serde() {
        assert_eq!(serde_json::to_string(&Arch::I8051).unwrap(), "\"8051\"");
        let a: Arch = serde_json::from_str("\"8086\"").unwrap();
        assert_eq!(a, Arch::I8086);
        assert_eq!(Arch::default(), Arch::I8086);
    }

    #[test]
    fn register_keywords_are_per_architecture() {
        assert!(Arch::I8051.is_register("a"));
        assert!(Arch::I8051.is_register("AB"));
        assert!(!Arch::I8086.is_register("A"));
        assert!(Arch::I8086.is_register("bh"));
    }

    #[test]
    fn operand_count_is_checked() {
        let inst = Instruction::new("MOV", &["AX"]);
        assert_eq!(operands::<2>(&inst), Err("MOV requires 2 operands".to_string()));
        let inst = Instruction::new("INC", &[" AX "]);
        assert_eq!(operands::<1>(&inst), Ok(["AX"]));
    }
}
