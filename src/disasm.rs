use std::fmt;

use serde::Serialize;

use crate::cpu::Arch;
use crate::decoder::Decoder;
use crate::instructions::OpcodeTable;

/// One listing line: a decoded instruction or a single unknown byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisasmLine {
    pub address: u32,
    pub bytes: Vec<u8>,
    pub mnemonic: String,
    pub operands: String,
    pub known: bool,
}

impl DisasmLine {
    pub fn text(&self) -> String {
        if self.operands.is_empty() {
            self.mnemonic.clone()
        } else {
            format!("{} {}", self.mnemonic, self.operands)
        }
    }
}

impl fmt::Display for DisasmLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}: {}", self.address, self.text())
    }
}

/// Lazy walk over a byte slice. Every input byte is covered exactly once.
#[derive(Debug, Clone)]
pub struct Disassembly<'a> {
    table: &'static OpcodeTable,
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Disassembly<'a> {
    pub fn new(bytes: &'a [u8], arch: Arch) -> Self {
        Self::starting_at(bytes, arch, 0)
    }

    pub fn starting_at(bytes: &'a [u8], arch: Arch, offset: usize) -> Self {
        Self {
            table: arch.table(),
            bytes,
            offset,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for Disassembly<'_> {
    type Item = DisasmLine;

    fn next(&mut self) -> Option<DisasmLine> {
        let rest = self.bytes.get(self.offset..).filter(|r| !r.is_empty())?;
        let address = self.offset as u32;
        let line = match self.table.decode(rest) {
            Some(d) => DisasmLine {
                address,
                bytes: rest[..d.length].to_vec(),
                mnemonic: d.mnemonic.to_string(),
                operands: d.operands,
                known: true,
            },
            None => DisasmLine {
                address,
                bytes: vec![rest[0]],
                mnemonic: ".byte".to_string(),
                operands: format!("0x{:02X}", rest[0]),
                known: false,
            },
        };
        self.offset += line.bytes.len();
        Some(line)
    }
}

pub fn disassemble(bytes: &[u8], arch: Arch) -> Vec<DisasmLine> {
    Disassembly::new(bytes, arch).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_bytes_advance_by_one() {
        // 0x0F is not in the 8086 subset, 0xB8 is cut short
        let lines = disassemble(&[0x0F, 0x90, 0xB8, 0x01], Arch::I8086);
        let text: Vec<String> = lines.iter().map(DisasmLine::text).collect();
        assert_eq!(text, vec![".byte 0x0F", "NOP", ".byte 0xB8", ".byte 0x01"]);
        assert_eq!(lines.iter().map(|l| l.bytes.len()).sum::<usize>(), 4);
        assert!(!lines[0].known);
    }

    #[test]
    fn restart_from_offset() {
        let bytes = [0x74, 0x03, 0xA4, 0xA5];
        let tail: Vec<String> = Disassembly::starting_at(&bytes, Arch::I8051, 2)
            .map(|l| l.to_string())
            .collect();
        assert_eq!(tail, vec!["0x0002: MUL AB", "0x0003: HLT"]);
    }
}
