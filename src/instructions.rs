use crate::assembler::AsmErrorKind;
use crate::cpu::{Arch, ByteOrder};
use crate::literal;
use crate::parser::Instruction;

/// How register operands are folded into the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// A register-class operand, if any, is added to the last opcode byte (`B8+r`, `E8+n`).
    Plain,
    /// Register-direct ModRM byte `11 reg rm`: reg is the first operand, rm the second.
    RegRm,
    /// Register-direct ModRM byte `11 d rm` carrying an opcode extension digit.
    Ext(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeEntry {
    pub mnemonic: &'static str,
    /// Fixed leading bytes.
    pub opcode: &'static [u8],
    /// Total encoded length in bytes.
    pub length: usize,
    /// Operand template, e.g. `A, #imm8` or `r16, imm16`.
    pub operands: &'static str,
    pub form: Form,
}

impl OpcodeEntry {
    pub const fn plain(
        mnemonic: &'static str,
        opcode: &'static [u8],
        length: usize,
        operands: &'static str,
    ) -> Self {
        Self { mnemonic, opcode, length, operands, form: Form::Plain }
    }

    pub const fn reg_rm(
        mnemonic: &'static str,
        opcode: &'static [u8],
        length: usize,
        operands: &'static str,
    ) -> Self {
        Self { mnemonic, opcode, length, operands, form: Form::RegRm }
    }

    pub const fn ext(
        mnemonic: &'static str,
        opcode: &'static [u8],
        digit: u8,
        length: usize,
        operands: &'static str,
    ) -> Self {
        Self { mnemonic, opcode, length, operands, form: Form::Ext(digit) }
    }

    pub fn patterns(&self) -> impl Iterator<Item = Pattern> {
        self.operands
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Pattern::parse)
    }

    /// Length implied by the opcode, ModRM byte and numeric fields.
    pub fn computed_length(&self) -> usize {
        let modrm = usize::from(self.form != Form::Plain);
        let fields: usize = self
            .patterns()
            .map(|p| match p {
                Pattern::Field { bits, .. } => usize::from(bits / 8),
                _ => 0,
            })
            .sum();
        self.opcode.len() + modrm + fields
    }
}

/// Register groups whose 3-bit index is encoded into the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegClass {
    /// `r16`: AX CX DX BX SP BP SI DI
    Word,
    /// `r8`: AL CL DL BL AH CH DH BH
    Byte,
    /// `Rn`: R0..R7
    Bank,
}

impl RegClass {
    pub fn names(self) -> &'static [&'static str; 8] {
        match self {
            RegClass::Word => &["AX", "CX", "DX", "BX", "SP", "BP", "SI", "DI"],
            RegClass::Byte => &["AL", "CL", "DL", "BL", "AH", "CH", "DH", "BH"],
            RegClass::Bank => &["R0", "R1", "R2", "R3", "R4", "R5", "R6", "R7"],
        }
    }

    pub fn index(self, name: &str) -> Option<u8> {
        let name = name.trim();
        self.names()
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .map(|i| i as u8)
    }

    pub fn name(self, idx: u8) -> &'static str {
        self.names()[usize::from(idx & 7)]
    }
}

/// Whether an immediate must, may, or must not carry the `#` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Required,
    Optional,
    Forbidden,
}

/// One parsed template token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Operand spelled exactly like this (`A`, `AX`, `@DPTR`, `AB`).
    Exact(&'static str),
    /// Numeric field of `bits` width: `imm8`, `#imm16`, `direct`, `rel8`, `addr16`, ...
    Field { bits: u8, marker: Marker },
    Reg(RegClass),
}

impl Pattern {
    pub fn parse(token: &'static str) -> Self {
        match token {
            "imm8" => Pattern::Field { bits: 8, marker: Marker::Optional },
            "imm16" => Pattern::Field { bits: 16, marker: Marker::Optional },
            "#imm8" => Pattern::Field { bits: 8, marker: Marker::Required },
            "#imm16" => Pattern::Field { bits: 16, marker: Marker::Required },
            "direct" | "rel8" => Pattern::Field { bits: 8, marker: Marker::Forbidden },
            "rel16" | "addr16" => Pattern::Field { bits: 16, marker: Marker::Forbidden },
            "r16" => Pattern::Reg(RegClass::Word),
            "r8" => Pattern::Reg(RegClass::Byte),
            "Rn" => Pattern::Reg(RegClass::Bank),
            other => Pattern::Exact(other),
        }
    }

    /// Exact spellings beat numeric fields, which beat register classes.
    pub fn specificity(&self) -> u32 {
        match self {
            Pattern::Exact(_) => 3,
            Pattern::Field { .. } => 2,
            Pattern::Reg(_) => 1,
        }
    }

    pub fn bind(&self, operand: &str, arch: Arch) -> Option<Bound> {
        let op = operand.trim();
        match *self {
            Pattern::Exact(s) => op.eq_ignore_ascii_case(s).then_some(Bound::Fixed),
            Pattern::Reg(class) => class.index(op).map(Bound::Reg),
            Pattern::Field { marker, .. } => {
                let (hashed, digits) = match op.strip_prefix('#') {
                    Some(rest) => (true, rest.trim()),
                    None => (false, op),
                };
                let ok = match marker {
                    Marker::Required => hashed,
                    Marker::Optional => true,
                    Marker::Forbidden => !hashed,
                };
                if !ok {
                    return None;
                }
                // `#` already marks a number, so `#C` is 0x0C on the 8051
                if !hashed && arch.is_register(digits) {
                    return None;
                }
                literal::parse(digits, arch.radix()).map(Bound::Value)
            }
        }
    }
}

/// What an operand resolved to while matching a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Fixed,
    Reg(u8),
    Value(i64),
}

pub fn fits(bits: u8, v: i64) -> bool {
    let max = (1i64 << bits) - 1;
    let min = -(1i64 << (bits - 1));
    (min..=max).contains(&v)
}

pub(crate) fn push_field(out: &mut Vec<u8>, bits: u8, v: i64, order: ByteOrder) {
    let u = (v as u64) & ((1u64 << bits) - 1);
    if bits == 8 {
        out.push(u as u8);
        return;
    }
    let w = u as u16;
    match order {
        ByteOrder::Little => out.extend_from_slice(&w.to_le_bytes()),
        ByteOrder::Big => out.extend_from_slice(&w.to_be_bytes()),
    }
}

pub(crate) fn modrm(reg: u8, rm: u8) -> u8 {
    0xC0 | ((reg & 7) << 3) | (rm & 7)
}

/// An entry chosen for an instruction, with each operand bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected {
    pub entry: &'static OpcodeEntry,
    pub bound: Vec<Bound>,
}

impl Selected {
    fn fields(&self) -> impl Iterator<Item = (u8, i64)> + '_ {
        self.entry.patterns().zip(&self.bound).filter_map(|(p, b)| match (p, b) {
            (Pattern::Field { bits, .. }, Bound::Value(v)) => Some((bits, *v)),
            _ => None,
        })
    }

    pub fn fits(&self) -> bool {
        self.fields().all(|(bits, v)| fits(bits, v))
    }

    pub fn encode(&self, order: ByteOrder) -> Result<Vec<u8>, AsmErrorKind> {
        let e = self.entry;
        let mut out = e.opcode.to_vec();
        let regs: Vec<u8> = self
            .bound
            .iter()
            .filter_map(|b| match b {
                Bound::Reg(r) => Some(*r),
                _ => None,
            })
            .collect();
        let reg = |i: usize| regs.get(i).copied().unwrap_or(0);
        match e.form {
            Form::Plain => {
                if let (Some(r), Some(last)) = (regs.first(), out.last_mut()) {
                    *last = last.wrapping_add(*r);
                }
            }
            Form::RegRm => out.push(modrm(reg(0), reg(1))),
            Form::Ext(digit) => out.push(modrm(digit, reg(0))),
        }
        for (bits, v) in self.fields() {
            if !fits(bits, v) {
                return Err(AsmErrorKind::ImmediateOverflow { value: v, bits });
            }
            push_field(&mut out, bits, v, order);
        }
        debug_assert_eq!(out.len(), e.length, "{} {}", e.mnemonic, e.operands);
        Ok(out)
    }
}

/// Static opcode map for one architecture, in declaration order.
#[derive(Debug)]
pub struct OpcodeTable {
    pub arch: Arch,
    pub entries: &'static [OpcodeEntry],
}

impl OpcodeTable {
    pub fn by_mnemonic<'a>(&'a self, mnemonic: &'a str) -> impl Iterator<Item = &'static OpcodeEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.mnemonic.eq_ignore_ascii_case(mnemonic))
    }

    /// Forward lookup: the most specific entry whose template accepts every operand.
    ///
    /// Equal scores keep declaration order, preferring the first candidate whose
    /// numeric fields fit.
    pub fn select(&self, inst: &Instruction) -> Result<Selected, AsmErrorKind> {
        let mut candidates: Vec<(u32, Selected)> = Vec::new();
        for entry in self.by_mnemonic(&inst.mnemonic) {
            let pats: Vec<Pattern> = entry.patterns().collect();
            if pats.len() != inst.operands.len() {
                continue;
            }
            let bound: Option<Vec<Bound>> = pats
                .iter()
                .zip(&inst.operands)
                .map(|(p, op)| p.bind(op, self.arch))
                .collect();
            if let Some(bound) = bound {
                let score = pats.iter().map(Pattern::specificity).sum();
                candidates.push((score, Selected { entry, bound }));
            }
        }
        let top = candidates
            .iter()
            .map(|(s, _)| *s)
            .max()
            .ok_or(AsmErrorKind::UnknownInstruction)?;
        let tied: Vec<Selected> = candidates
            .into_iter()
            .filter(|(s, _)| *s == top)
            .map(|(_, sel)| sel)
            .collect();
        let idx = tied.iter().position(Selected::fits).unwrap_or(0);
        tied.into_iter()
            .nth(idx)
            .ok_or(AsmErrorKind::UnknownInstruction)
    }

    pub fn encode(&self, inst: &Instruction) -> Result<Vec<u8>, AsmErrorKind> {
        self.select(inst)?.encode(self.arch.byte_order())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_tokens() {
        assert_eq!(Pattern::parse("#imm8"), Pattern::Field { bits: 8, marker: Marker::Required });
        assert_eq!(Pattern::parse("addr16"), Pattern::Field { bits: 16, marker: Marker::Forbidden });
        assert_eq!(Pattern::parse("Rn"), Pattern::Reg(RegClass::Bank));
        assert_eq!(Pattern::parse("@DPTR"), Pattern::Exact("@DPTR"));
    }

    #[test]
    fn field_ranges() {
        assert!(fits(8, 0xFF));
        assert!(fits(8, -128));
        assert!(!fits(8, 0x100));
        assert!(!fits(8, -129));
        assert!(fits(16, 0xFFFF));
        assert!(!fits(16, 0x1_0000));
    }

    #[test]
    fn register_names_are_not_numbers() {
        // "A" would otherwise read as hex 0x0A on the 8051
        let p = Pattern::parse("direct");
        assert_eq!(p.bind("A", Arch::I8051), None);
        assert_eq!(p.bind("30H", Arch::I8051), Some(Bound::Value(0x30)));
        assert_eq!(p.bind("#30H", Arch::I8051), None);
    }

    #[test]
    fn marked_immediates_may_spell_register_names() {
        let p = Pattern::parse("#imm8");
        assert_eq!(p.bind("#C", Arch::I8051), Some(Bound::Value(0x0C)));
        assert_eq!(p.bind("#A", Arch::I8051), Some(Bound::Value(0x0A)));
        // trailing B is the binary suffix, not a hex digit
        assert_eq!(p.bind("#AB", Arch::I8051), None);
        assert_eq!(Pattern::parse("imm8").bind("AL", Arch::I8086), None);
    }

    #[test]
    fn modrm_register_direct() {
        // ADD AX, BX -> 03 C3
        assert_eq!(modrm(0, 3), 0xC3);
    }
}
