use crate::cpu::Arch;
use crate::instructions::{OpcodeEntry as E, OpcodeTable};

/// Intel 8086 subset: register-direct and immediate forms only.
///
/// Immediates and jump targets are little-endian. Register operands are
/// encoded either in the low three bits of the opcode (`B8+r`) or in a
/// register-direct ModRM byte. MUL/DIV, the shifts, CALL/RET and JL/JG
/// assemble and disassemble but have no execution handler.
pub static TABLE: OpcodeTable = OpcodeTable {
    arch: Arch::I8086,
    entries: ENTRIES,
};

const ENTRIES: &[E] = &[
    E::plain("MOV", &[0xB8], 3, "r16, imm16"),
    E::plain("MOV", &[0xB0], 2, "r8, imm8"),
    E::reg_rm("MOV", &[0x8B], 2, "r16, r16"),
    E::reg_rm("MOV", &[0x8A], 2, "r8, r8"),
    // ALU group: accumulator short forms, then 80/81 /digit, then reg,reg
    E::plain("ADD", &[0x05], 3, "AX, imm16"),
    E::plain("ADD", &[0x04], 2, "AL, imm8"),
    E::ext("ADD", &[0x81], 0, 4, "r16, imm16"),
    E::ext("ADD", &[0x80], 0, 3, "r8, imm8"),
    E::reg_rm("ADD", &[0x03], 2, "r16, r16"),
    E::reg_rm("ADD", &[0x02], 2, "r8, r8"),
    E::plain("OR", &[0x0D], 3, "AX, imm16"),
    E::plain("OR", &[0x0C], 2, "AL, imm8"),
    E::ext("OR", &[0x81], 1, 4, "r16, imm16"),
    E::ext("OR", &[0x80], 1, 3, "r8, imm8"),
    E::reg_rm("OR", &[0x0B], 2, "r16, r16"),
    E::reg_rm("OR", &[0x0A], 2, "r8, r8"),
    E::plain("AND", &[0x25], 3, "AX, imm16"),
    E::plain("AND", &[0x24], 2, "AL, imm8"),
    E::ext("AND", &[0x81], 4, 4, "r16, imm16"),
    E::ext("AND", &[0x80], 4, 3, "r8, imm8"),
    E::reg_rm("AND", &[0x23], 2, "r16, r16"),
    E::reg_rm("AND", &[0x22], 2, "r8, r8"),
    E::plain("SUB", &[0x2D], 3, "AX, imm16"),
    E::plain("SUB", &[0x2C], 2, "AL, imm8"),
    E::ext("SUB", &[0x81], 5, 4, "r16, imm16"),
    E::ext("SUB", &[0x80], 5, 3, "r8, imm8"),
    E::reg_rm("SUB", &[0x2B], 2, "r16, r16"),
    E::reg_rm("SUB", &[0x2A], 2, "r8, r8"),
    E::plain("XOR", &[0x35], 3, "AX, imm16"),
    E::plain("XOR", &[0x34], 2, "AL, imm8"),
    E::ext("XOR", &[0x81], 6, 4, "r16, imm16"),
    E::ext("XOR", &[0x80], 6, 3, "r8, imm8"),
    E::reg_rm("XOR", &[0x33], 2, "r16, r16"),
    E::reg_rm("XOR", &[0x32], 2, "r8, r8"),
    E::plain("CMP", &[0x3D], 3, "AX, imm16"),
    E::plain("CMP", &[0x3C], 2, "AL, imm8"),
    E::ext("CMP", &[0x81], 7, 4, "r16, imm16"),
    E::ext("CMP", &[0x80], 7, 3, "r8, imm8"),
    E::reg_rm("CMP", &[0x3B], 2, "r16, r16"),
    E::reg_rm("CMP", &[0x3A], 2, "r8, r8"),
    E::plain("INC", &[0x40], 1, "r16"),
    E::ext("INC", &[0xFE], 0, 2, "r8"),
    E::plain("DEC", &[0x48], 1, "r16"),
    E::ext("DEC", &[0xFE], 1, 2, "r8"),
    E::ext("NOT", &[0xF7], 2, 2, "r16"),
    E::ext("NOT", &[0xF6], 2, 2, "r8"),
    E::ext("NEG", &[0xF7], 3, 2, "r16"),
    E::ext("NEG", &[0xF6], 3, 2, "r8"),
    E::ext("MUL", &[0xF7], 4, 2, "r16"),
    E::ext("IMUL", &[0xF7], 5, 2, "r16"),
    E::ext("DIV", &[0xF7], 6, 2, "r16"),
    E::ext("IDIV", &[0xF7], 7, 2, "r16"),
    // shifts and rotates by one, plus SHL by CL
    E::ext("SHL", &[0xD1], 4, 2, "r16, 1"),
    E::ext("SHL", &[0xD3], 4, 2, "r16, CL"),
    E::ext("SHR", &[0xD1], 5, 2, "r16, 1"),
    E::ext("SAR", &[0xD1], 7, 2, "r16, 1"),
    E::ext("ROL", &[0xD1], 0, 2, "r16, 1"),
    E::ext("ROR", &[0xD1], 1, 2, "r16, 1"),
    E::plain("PUSH", &[0x50], 1, "r16"),
    E::plain("POP", &[0x58], 1, "r16"),
    E::plain("JMP", &[0xEB], 2, "rel8"),
    E::plain("JMP", &[0xE9], 3, "rel16"),
    E::plain("JE", &[0x74], 2, "rel8"),
    E::plain("JZ", &[0x74], 2, "rel8"),
    E::plain("JNE", &[0x75], 2, "rel8"),
    E::plain("JNZ", &[0x75], 2, "rel8"),
    E::plain("JL", &[0x7C], 2, "rel8"),
    E::plain("JG", &[0x7F], 2, "rel8"),
    E::plain("JC", &[0x72], 2, "rel8"),
    E::plain("JNC", &[0x73], 2, "rel8"),
    E::plain("CALL", &[0xE8], 3, "rel16"),
    E::plain("RET", &[0xC3], 1, ""),
    E::plain("NOP", &[0x90], 1, ""),
    E::plain("HLT", &[0xF4], 1, ""),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_lengths_match_templates() {
        for e in ENTRIES {
            assert_eq!(e.length, e.computed_length(), "{} {}", e.mnemonic, e.operands);
        }
    }
}
