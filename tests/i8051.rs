use asmsim::cpu::Psw;
use asmsim::parser::parse_line;
use asmsim::{Cpu8051, Processor};
use pretty_assertions::assert_eq;

fn exec(cpu: &mut Cpu8051, line: &str) -> String {
    let inst = parse_line(line).expect("instruction");
    cpu.execute(&inst)
}

fn run(cpu: &mut Cpu8051, src: &str) -> Vec<String> {
    src.lines().map(|l| exec(cpu, l)).collect()
}

#[test]
fn mul_ab() {
    let mut cpu = Cpu8051::new();
    let traces = run(&mut cpu, "MOV A, #03H\nMOV B, #04H\nMUL AB");
    assert_eq!(traces[2], "MUL AB (A: 12, B: 0)");
    assert_eq!(cpu.regs.a, 0x0C);
    assert_eq!(cpu.regs.b, 0);
    assert!(!cpu.flag(Psw::OV));
    assert!(!cpu.flag(Psw::C));

    run(&mut cpu, "MOV A, #20\nMOV B, #10\nMUL AB");
    assert_eq!((cpu.regs.a, cpu.regs.b), (0x00, 0x02));
    assert!(cpu.flag(Psw::OV));
}

#[test]
fn div_ab() {
    let mut cpu = Cpu8051::new();
    let traces = run(&mut cpu, "MOV A, #0D\nMOV B, #4\nDIV AB");
    assert_eq!(traces[2], "DIV AB (13 / 4 = A: 3, B: 1)");
    assert_eq!((cpu.regs.a, cpu.regs.b), (3, 1));
    assert!(!cpu.flag(Psw::OV));
}

#[test]
fn div_by_zero_only_sets_overflow() {
    let mut cpu = Cpu8051::new();
    run(&mut cpu, "MOV A, #9\nMOV B, #0");
    assert_eq!(exec(&mut cpu, "DIV AB"), "DIV AB (Division by zero)");
    assert_eq!((cpu.regs.a, cpu.regs.b), (9, 0));
    assert!(cpu.flag(Psw::OV));
}

#[test]
fn parity_follows_an_odd_count_of_ones() {
    let mut cpu = Cpu8051::new();
    exec(&mut cpu, "MOV A, #07");
    assert!(cpu.flag(Psw::P));
    exec(&mut cpu, "MOV A, #00000011B");
    assert!(!cpu.flag(Psw::P));
    exec(&mut cpu, "INC A");
    assert!(cpu.flag(Psw::P));
}

#[test]
fn bare_literals_are_hex() {
    let mut cpu = Cpu8051::new();
    run(&mut cpu, "MOV DPTR, #8500\nMOV R2, 10\nMOV R3, #15d");
    assert_eq!(cpu.regs.dptr, 0x8500);
    assert_eq!(cpu.regs.r[2], 0x10);
    // "15d" is hex too: 0x15D, masked to the register
    assert_eq!(cpu.regs.r[3], 0x5D);
}

#[test]
fn registers_stay_in_range() {
    let mut cpu = Cpu8051::new();
    run(&mut cpu, "MOV DPTR, #0FFFFH\nINC DPTR\nCLR A\nDEC A\nMOV R7, #1FF");
    assert_eq!(cpu.regs.dptr, 0);
    assert_eq!(cpu.regs.a, 0xFF);
    assert_eq!(cpu.regs.r[7], 0xFF);
    for (name, value) in cpu.snapshot().registers {
        if name != "DPTR" && name != "PC" {
            assert!(value <= 0xFF, "{name} = {value:#X}");
        }
    }
}

#[test]
fn external_memory_through_dptr() {
    let mut cpu = Cpu8051::new();
    cpu.load_external_memory(0x8500, &[3, 4]);
    assert_eq!(cpu.regs.pc, 0);
    let traces = run(&mut cpu, "MOV DPTR, #8500\nMOVX A, @DPTR\nMOV R1, A\nINC DPTR\nMOVX A, @DPTR");
    assert_eq!(traces[1], "MOVX A, @DPTR (A=0x3, DPTR=34048)");
    assert_eq!(cpu.regs.r[1], 3);
    assert_eq!(cpu.regs.a, 4);

    exec(&mut cpu, "ADD A, R1");
    assert_eq!(exec(&mut cpu, "MOVX @DPTR, A"), "MOVX @DPTR, A (Wrote 0x7 to 34049)");
    assert_eq!(cpu.read_memory(0x8501), 7);
    assert_eq!(exec(&mut cpu, "MOVX A, B"), "MOVX: unsupported addressing mode");
}

#[test]
fn logic_on_the_accumulator() {
    let mut cpu = Cpu8051::new();
    exec(&mut cpu, "MOV A, #0F0");
    assert_eq!(exec(&mut cpu, "ANL A, #3C"), "ANL A, #3C (result: 48)");
    exec(&mut cpu, "ORL A, #01");
    assert_eq!(cpu.regs.a, 0x31);
    exec(&mut cpu, "XRL A, #0FF");
    assert_eq!(cpu.regs.a, 0xCE);
    exec(&mut cpu, "CPL A");
    assert_eq!(cpu.regs.a, 0x31);
    exec(&mut cpu, "RL A");
    assert_eq!(cpu.regs.a, 0x62);
    exec(&mut cpu, "RR");
    assert_eq!(cpu.regs.a, 0x31);
}

#[test]
fn carry_bit_instructions() {
    let mut cpu = Cpu8051::new();
    assert_eq!(exec(&mut cpu, "SETB C"), "SETB C (Carry set)");
    assert_eq!(exec(&mut cpu, "CPL C"), "CPL C (Carry: false)");
    exec(&mut cpu, "CPL C");
    assert_eq!(exec(&mut cpu, "JC 20"), "JC 20 (taken, PC: 32)");
    assert_eq!(exec(&mut cpu, "CLR C"), "CLR C (Carry cleared)");
    assert_eq!(exec(&mut cpu, "JC 40"), "JC 40 (not taken)");
    assert_eq!(cpu.regs.pc, 0x20);
}

#[test]
fn jumps_load_the_full_counter() {
    let mut cpu = Cpu8051::new();
    assert_eq!(exec(&mut cpu, "LJMP 1234"), "LJMP 1234 (PC: 4660)");
    assert_eq!(cpu.regs.pc, 0x1234);
    exec(&mut cpu, "MOV PC, #1234");
    assert_eq!(cpu.regs.pc, 0x34);
    exec(&mut cpu, "CLR A");
    assert_eq!(exec(&mut cpu, "JZ 10"), "JZ 10 (taken, PC: 16)");
    assert_eq!(exec(&mut cpu, "JNZ 0"), "JNZ 0 (not taken)");
}

#[test]
fn unknown_and_rejected_instructions() {
    let mut cpu = Cpu8051::new();
    let before = cpu.snapshot();
    assert_eq!(exec(&mut cpu, "PUSH ACC"), "Unknown instruction: PUSH");
    assert_eq!(exec(&mut cpu, "MUL A"), "MUL requires operand AB");
    assert_eq!(exec(&mut cpu, "SUBB R0, #1"), "SUBB destination must be A");
    assert_eq!(exec(&mut cpu, "SETB A"), "SETB A: unsupported operand");
    assert_eq!(cpu.snapshot(), before);
}

#[test]
fn ports_and_reset() {
    let mut cpu = Cpu8051::new();
    assert_eq!(cpu.ports, [0xFF; 4]);
    exec(&mut cpu, "MOV P1, #55");
    assert_eq!(cpu.register("P1"), Some(0x55));
    assert_eq!(cpu.snapshot().ports, vec![0xFF, 0x55, 0xFF, 0xFF]);
    cpu.load_program(&[0x74, 0x03]);
    exec(&mut cpu, "HLT");
    cpu.reset();
    assert_eq!(cpu.ports, [0xFF; 4]);
    assert_eq!(cpu.regs.sp, 0x07);
    assert_eq!(cpu.read_memory(0), 0);
    assert!(!cpu.halted());
}

#[test]
fn marked_hex_agrees_with_the_assembler() {
    let mut cpu = Cpu8051::new();
    exec(&mut cpu, "MOV A, #C");
    assert_eq!(cpu.regs.a, 0x0C);
    exec(&mut cpu, "ADD A, #A");
    assert_eq!(cpu.regs.a, 0x16);
}

#[test]
fn unrelated_instructions_keep_the_psw_flags() {
    let mut cpu = Cpu8051::new();
    run(&mut cpu, "MOV A, #7F\nADD A, #1\nSETB C");
    assert!(cpu.flag(Psw::OV));
    assert!(cpu.flag(Psw::C));
    let before = cpu.psw;
    run(
        &mut cpu,
        "MOV B, #5\nMOV R0, A\nINC R0\nSJMP 10\nMOV DPTR, #100\nMOVX @DPTR, A\nINC DPTR\nNOP",
    );
    assert_eq!(cpu.psw, before);
}
