use asmsim::{assemble, disassemble, Arch, DisasmLine};
use pretty_assertions::assert_eq;

fn texts(lines: &[DisasmLine]) -> Vec<String> {
    lines.iter().map(DisasmLine::text).collect()
}

#[test]
fn listing_8086() {
    let asm = assemble("MOV AX, 1234H\nPUSH AX\nXOR BX, BX\nADD AL, 5\nJMP 300\nHLT", Arch::I8086);
    let lines = disassemble(&asm.bytes, Arch::I8086);
    assert_eq!(
        texts(&lines),
        vec![
            "MOV AX, 0x1234",
            "PUSH AX",
            "XOR BX, BX",
            "ADD AL, 0x5",
            "JMP 0x12C",
            "HLT",
        ]
    );
    let addrs: Vec<u32> = lines.iter().map(|l| l.address).collect();
    assert_eq!(addrs, vec![0, 3, 4, 6, 8, 11]);
}

#[test]
fn listing_8051() {
    let src = "MOV A, #03H\nMOV B, #04H\nMUL AB\nMOV DPTR, #8500\nMOVX @DPTR, A\nMOV R5, A\nINC DPTR\nSJMP 10\nHLT";
    let asm = assemble(src, Arch::I8051);
    let lines = disassemble(&asm.bytes, Arch::I8051);
    assert_eq!(
        texts(&lines),
        vec![
            "MOV A, #0x3",
            "MOV B, #0x4",
            "MUL AB",
            "MOV DPTR, #0x8500",
            "MOVX @DPTR, A",
            "MOV R5, A",
            "INC DPTR",
            "SJMP 0x10",
            "HLT",
        ]
    );
    assert_eq!(lines[3].to_string(), "0x0006: MOV DPTR, #0x8500");
}

#[test]
fn mnemonics_survive_a_round_trip() {
    let cases = [
        (
            Arch::I8086,
            "MOV CX, 10\nMOV DL, 3\nSUB CX, 1\nCMP CX, DX\nINC BX\nDEC DH\nNOT AX\nNEG BL\nPOP SI\nJNE 4\nNOP\nHLT\n\
             SHL AX, 1\nSHL DX, CL\nSHR BX, 1\nSAR CX, 1\nROL SI, 1\nROR DI, 1\n\
             MUL BX\nIMUL CX\nDIV DX\nIDIV BP\nCALL 1000\nRET\nJL 2\nJG 8",
        ),
        (
            Arch::I8051,
            "MOV A, #5\nADD A, R1\nADDC A, 30\nSUBB A, B\nANL A, #0F\nORL A, R7\nXRL A, #1\nRL A\nRRC A\nCLR C\nCPL A\nLJMP 1234\nJNZ 4\nNOP\nMOV A, @R0\nMOV A, @R1",
        ),
    ];
    for (arch, src) in cases {
        let asm = assemble(src, arch);
        assert!(asm.is_ok(), "{arch}: {:?}", asm.errors);
        let back: Vec<String> = disassemble(&asm.bytes, arch)
            .into_iter()
            .map(|l| l.mnemonic)
            .collect();
        let want: Vec<String> = asm
            .instructions
            .iter()
            .map(|e| e.instruction.mnemonic.clone())
            .collect();
        assert_eq!(back, want, "{arch}");
    }
}

#[test]
fn disassembly_text_reassembles_to_the_same_bytes() {
    for (arch, src) in [
        (Arch::I8086, "MOV AX, 1234H\nADD CX, 300\nAND BL, 0FH\nJMP 5\nJMP 700\nSHL BX, CL\nROR AX, 1\nCALL 5"),
        (Arch::I8051, "MOV A, B\nMOV 30, A\nMOV 31, #2\nINC B\nDEC R3\nMOVX A, @R1"),
    ] {
        let first = assemble(src, arch);
        let text: Vec<String> = disassemble(&first.bytes, arch)
            .iter()
            .map(DisasmLine::text)
            .collect();
        let second = assemble(&text.join("\n"), arch);
        assert!(second.is_ok(), "{arch}: {:?}", second.errors);
        assert_eq!(second.bytes, first.bytes, "{arch}");
    }
}

#[test]
fn unknown_bytes_become_data() {
    let lines = disassemble(&[0x01, 0xA4, 0x90, 0x12], Arch::I8051);
    assert_eq!(texts(&lines), vec![".byte 0x01", "MUL AB", ".byte 0x90", ".byte 0x12"]);
    assert!(!lines[0].known);
    assert!(lines[1].known);
}

#[test]
fn empty_input() {
    assert!(disassemble(&[], Arch::I8086).is_empty());
}
