pub mod assembler;
pub mod cpu;
pub mod decoder;
pub mod disasm;
pub mod instructions;
pub mod literal;
pub mod memory;
pub mod parser;
pub mod session;

pub mod isa {
    pub mod i8051;
    pub mod i8086;
}

pub use assembler::{assemble, AsmErrorKind, AssembleError, Assembly, Encoded};
pub use cpu::{Arch, Cpu8051, Cpu8086, Processor, Snapshot};
pub use disasm::{disassemble, DisasmLine, Disassembly};
pub use memory::{Bus, LinearMemory};
pub use parser::{parse_line, parse_source, Instruction};
pub use session::{LogEntry, LogKind, RunOutcome, Session, SessionConfig, SessionError};
