use crate::cpu::Arch;
use crate::instructions::{OpcodeEntry as E, OpcodeTable};

/// Intel 8051 subset.
///
/// `B` is addressed as the direct byte 0xF0, so its forms carry a fixed
/// second byte and are declared ahead of the generic `direct` forms; the
/// decoder tries entries in order. 16-bit fields are big-endian. `HLT` is
/// not a real 8051 opcode and takes the unused byte 0xA5.
pub static TABLE: OpcodeTable = OpcodeTable {
    arch: Arch::I8051,
    entries: ENTRIES,
};

const ENTRIES: &[E] = &[
    E::plain("MOV", &[0x74], 2, "A, #imm8"),
    E::plain("MOV", &[0xE8], 1, "A, Rn"),
    E::plain("MOV", &[0xE5, 0xF0], 2, "A, B"),
    E::plain("MOV", &[0xE6], 1, "A, @R0"),
    E::plain("MOV", &[0xE7], 1, "A, @R1"),
    E::plain("MOV", &[0xE5], 2, "A, direct"),
    E::plain("MOV", &[0x75, 0xF0], 3, "B, #imm8"),
    E::plain("MOV", &[0xF5, 0xF0], 2, "B, A"),
    E::plain("MOV", &[0x78], 2, "Rn, #imm8"),
    E::plain("MOV", &[0xF8], 1, "Rn, A"),
    E::plain("MOV", &[0x90], 3, "DPTR, #imm16"),
    E::plain("MOV", &[0xF5], 2, "direct, A"),
    E::plain("MOV", &[0x75], 3, "direct, #imm8"),
    E::plain("MOVX", &[0xE0], 1, "A, @DPTR"),
    E::plain("MOVX", &[0xF0], 1, "@DPTR, A"),
    E::plain("MOVX", &[0xE2], 1, "A, @R0"),
    E::plain("MOVX", &[0xE3], 1, "A, @R1"),
    E::plain("MOVX", &[0xF2], 1, "@R0, A"),
    E::plain("MOVX", &[0xF3], 1, "@R1, A"),
    E::plain("ADD", &[0x24], 2, "A, #imm8"),
    E::plain("ADD", &[0x25, 0xF0], 2, "A, B"),
    E::plain("ADD", &[0x28], 1, "A, Rn"),
    E::plain("ADD", &[0x25], 2, "A, direct"),
    E::plain("ADDC", &[0x34], 2, "A, #imm8"),
    E::plain("ADDC", &[0x35, 0xF0], 2, "A, B"),
    E::plain("ADDC", &[0x38], 1, "A, Rn"),
    E::plain("ADDC", &[0x35], 2, "A, direct"),
    E::plain("SUBB", &[0x94], 2, "A, #imm8"),
    E::plain("SUBB", &[0x95, 0xF0], 2, "A, B"),
    E::plain("SUBB", &[0x98], 1, "A, Rn"),
    E::plain("SUBB", &[0x95], 2, "A, direct"),
    E::plain("INC", &[0x04], 1, "A"),
    E::plain("INC", &[0x05, 0xF0], 2, "B"),
    E::plain("INC", &[0x08], 1, "Rn"),
    E::plain("INC", &[0xA3], 1, "DPTR"),
    E::plain("INC", &[0x05], 2, "direct"),
    E::plain("DEC", &[0x14], 1, "A"),
    E::plain("DEC", &[0x15, 0xF0], 2, "B"),
    E::plain("DEC", &[0x18], 1, "Rn"),
    E::plain("DEC", &[0x15], 2, "direct"),
    E::plain("MUL", &[0xA4], 1, "AB"),
    E::plain("DIV", &[0x84], 1, "AB"),
    E::plain("ANL", &[0x54], 2, "A, #imm8"),
    E::plain("ANL", &[0x55, 0xF0], 2, "A, B"),
    E::plain("ANL", &[0x58], 1, "A, Rn"),
    E::plain("ANL", &[0x55], 2, "A, direct"),
    E::plain("ORL", &[0x44], 2, "A, #imm8"),
    E::plain("ORL", &[0x45, 0xF0], 2, "A, B"),
    E::plain("ORL", &[0x48], 1, "A, Rn"),
    E::plain("ORL", &[0x45], 2, "A, direct"),
    E::plain("XRL", &[0x64], 2, "A, #imm8"),
    E::plain("XRL", &[0x65, 0xF0], 2, "A, B"),
    E::plain("XRL", &[0x68], 1, "A, Rn"),
    E::plain("XRL", &[0x65], 2, "A, direct"),
    E::plain("RL", &[0x23], 1, "A"),
    E::plain("RLC", &[0x33], 1, "A"),
    E::plain("RR", &[0x03], 1, "A"),
    E::plain("RRC", &[0x13], 1, "A"),
    E::plain("SWAP", &[0xC4], 1, "A"),
    E::plain("CLR", &[0xE4], 1, "A"),
    E::plain("CLR", &[0xC3], 1, "C"),
    E::plain("SETB", &[0xD3], 1, "C"),
    E::plain("CPL", &[0xF4], 1, "A"),
    E::plain("CPL", &[0xB3], 1, "C"),
    E::plain("SJMP", &[0x80], 2, "rel8"),
    E::plain("LJMP", &[0x02], 3, "addr16"),
    E::plain("JZ", &[0x60], 2, "rel8"),
    E::plain("JNZ", &[0x70], 2, "rel8"),
    E::plain("JC", &[0x40], 2, "rel8"),
    E::plain("JNC", &[0x50], 2, "rel8"),
    E::plain("NOP", &[0x00], 1, ""),
    E::plain("HLT", &[0xA5], 1, ""),
];
