use serde::Serialize;

use crate::cpu::ByteOrder;
use crate::instructions::{Form, Marker, OpcodeEntry, OpcodeTable, Pattern, RegClass};

/// One instruction recovered from a byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decoded {
    pub mnemonic: &'static str,
    pub operands: String,
    pub length: usize,
}

pub trait Decoder {
    /// Decode the instruction at the start of `bytes`, if any entry matches.
    fn decode(&self, bytes: &[u8]) -> Option<Decoded>;
}

impl Decoder for OpcodeTable {
    fn decode(&self, bytes: &[u8]) -> Option<Decoded> {
        let order = self.arch.byte_order();
        self.entries
            .iter()
            .find_map(|e| decode_entry(e, bytes, order))
    }
}

fn decode_entry(e: &'static OpcodeEntry, bytes: &[u8], order: ByteOrder) -> Option<Decoded> {
    if bytes.len() < e.length {
        return None;
    }
    let pats: Vec<Pattern> = e.patterns().collect();
    let classes: Vec<RegClass> = pats
        .iter()
        .filter_map(|p| match p {
            Pattern::Reg(c) => Some(*c),
            _ => None,
        })
        .collect();
    let n = e.opcode.len();
    let (prefix, last) = e.opcode.split_at(n - 1);
    if bytes[..n - 1] != *prefix {
        return None;
    }

    let mut regs: Vec<u8> = Vec::new();
    let mut pos = n;
    match e.form {
        Form::Plain => {
            let base = last[0];
            if classes.is_empty() {
                if bytes[n - 1] != base {
                    return None;
                }
            } else {
                let r = bytes[n - 1].wrapping_sub(base);
                if r > 7 {
                    return None;
                }
                regs.push(r);
            }
        }
        Form::RegRm | Form::Ext(_) => {
            if bytes[n - 1] != last[0] {
                return None;
            }
            let m = bytes[n];
            if m >> 6 != 0b11 {
                return None;
            }
            let reg = (m >> 3) & 7;
            let rm = m & 7;
            match e.form {
                Form::Ext(d) if reg != d => return None,
                Form::Ext(_) => regs.push(rm),
                _ => regs.extend([reg, rm]),
            }
            pos += 1;
        }
    }

    let mut regs = regs.into_iter().zip(classes);
    let mut text = Vec::with_capacity(pats.len());
    for p in &pats {
        match *p {
            Pattern::Exact(s) => text.push(s.to_string()),
            Pattern::Reg(_) => {
                let (r, class) = regs.next()?;
                text.push(class.name(r).to_string());
            }
            Pattern::Field { bits, marker } => {
                let v = read_field(&bytes[pos..], bits, order);
                pos += usize::from(bits / 8);
                let hash = if marker == Marker::Required { "#" } else { "" };
                text.push(format!("{hash}0x{v:X}"));
            }
        }
    }

    Some(Decoded {
        mnemonic: e.mnemonic,
        operands: text.join(", "),
        length: e.length,
    })
}

fn read_field(bytes: &[u8], bits: u8, order: ByteOrder) -> u16 {
    if bits == 8 {
        return u16::from(bytes[0]);
    }
    let pair = [bytes[0], bytes[1]];
    match order {
        ByteOrder::Little => u16::from_le_bytes(pair),
        ByteOrder::Big => u16::from_be_bytes(pair),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{i8051, i8086};

    #[test]
    fn embedded_register_and_immediate() {
        let d = i8086::TABLE.decode(&[0xBB, 0x14, 0x00]).unwrap();
        assert_eq!(d.mnemonic, "MOV");
        assert_eq!(d.operands, "BX, 0x14");
        assert_eq!(d.length, 3);
    }

    #[test]
    fn modrm_extension_digit_selects_mnemonic() {
        let d = i8086::TABLE.decode(&[0x81, 0xE9, 0x34, 0x12]).unwrap();
        assert_eq!(d.mnemonic, "SUB");
        assert_eq!(d.operands, "CX, 0x1234");
        // memory-form ModRM is outside the modelled subset
        assert_eq!(i8086::TABLE.decode(&[0x03, 0x07]), None);
    }

    #[test]
    fn dptr_immediate_is_big_endian() {
        let d = i8051::TABLE.decode(&[0x90, 0x85, 0x00]).unwrap();
        assert_eq!(d.operands, "DPTR, #0x8500");
    }

    #[test]
    fn b_register_forms_win_over_direct() {
        let d = i8051::TABLE.decode(&[0x75, 0xF0, 0x04]).unwrap();
        assert_eq!(d.operands, "B, #0x4");
        let d = i8051::TABLE.decode(&[0x75, 0x30, 0x04]).unwrap();
        assert_eq!(d.operands, "0x30, #0x4");
    }

    #[test]
    fn truncated_input_does_not_match() {
        assert_eq!(i8086::TABLE.decode(&[0xB8, 0x01]), None);
    }
}
