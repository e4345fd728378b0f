use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::{dispatch, operands, value_or_zero, Arch, Handler, InstructionSet, Processor, Snapshot, Step};
use crate::literal;
use crate::memory::{Bus, LinearMemory};
use crate::parser::Instruction;

pub const REGISTER_NAMES: &[&str] = &[
    "AX", "BX", "CX", "DX", "SI", "DI", "BP", "SP", "IP", "CS", "DS", "SS", "ES", "AL", "AH",
    "BL", "BH", "CL", "CH", "DL", "DH",
];

bitflags! {
    /// FLAGS register, bits at their hardware positions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Flags: u16 {
        const CF = 1 << 0;  // Carry
        const PF = 1 << 2;  // Parity (even)
        const AF = 1 << 4;  // Auxiliary carry
        const ZF = 1 << 6;  // Zero
        const SF = 1 << 7;  // Sign
        const TF = 1 << 8;  // Trap
        const IF = 1 << 9;  // Interrupt enable
        const DF = 1 << 10; // Direction
        const OF = 1 << 11; // Overflow
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub ax: u16,
    pub bx: u16,
    pub cx: u16,
    pub dx: u16,
    pub si: u16,
    pub di: u16,
    pub bp: u16,
    pub sp: u16,
    pub ip: u16,
    pub cs: u16,
    pub ds: u16,
    pub ss: u16,
    pub es: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Width {
    Byte,
    Word,
}

impl Width {
    fn mask(self) -> u32 {
        match self {
            Width::Byte => 0xFF,
            Width::Word => 0xFFFF,
        }
    }

    fn sign(self) -> u32 {
        match self {
            Width::Byte => 0x80,
            Width::Word => 0x8000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Alu {
    Add,
    Sub,
    Cmp,
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cpu8086 {
    pub regs: Registers,
    pub flags: Flags,
    pub mem: LinearMemory,
    pub halted: bool,
}

impl Default for Cpu8086 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu8086 {
    pub fn new() -> Self {
        let mut cpu = Self {
            regs: Registers::default(),
            flags: Flags::empty(),
            mem: LinearMemory::new(Arch::I8086.addr_bits()),
            halted: false,
        };
        cpu.reset_registers();
        cpu
    }

    fn reset_registers(&mut self) {
        self.regs = Registers {
            sp: 0xFFFE,
            ..Registers::default()
        };
        self.flags = Flags::IF;
        self.halted = false;
    }

    fn slot16(&mut self, name: &str) -> Option<&mut u16> {
        let r = &mut self.regs;
        Some(match name.trim().to_ascii_uppercase().as_str() {
            "AX" => &mut r.ax,
            "BX" => &mut r.bx,
            "CX" => &mut r.cx,
            "DX" => &mut r.dx,
            "SI" => &mut r.si,
            "DI" => &mut r.di,
            "BP" => &mut r.bp,
            "SP" => &mut r.sp,
            "IP" => &mut r.ip,
            "CS" => &mut r.cs,
            "DS" => &mut r.ds,
            "SS" => &mut r.ss,
            "ES" => &mut r.es,
            _ => return None,
        })
    }

    /// `AL` -> (`AX`, low), `BH` -> (`BX`, high).
    fn half(name: &str) -> Option<(&'static str, bool)> {
        Some(match name.trim().to_ascii_uppercase().as_str() {
            "AL" => ("AX", false),
            "AH" => ("AX", true),
            "BL" => ("BX", false),
            "BH" => ("BX", true),
            "CL" => ("CX", false),
            "CH" => ("CX", true),
            "DL" => ("DX", false),
            "DH" => ("DX", true),
            _ => return None,
        })
    }

    pub fn reg16(&self, name: &str) -> Option<u16> {
        let r = &self.regs;
        Some(match name.trim().to_ascii_uppercase().as_str() {
            "AX" => r.ax,
            "BX" => r.bx,
            "CX" => r.cx,
            "DX" => r.dx,
            "SI" => r.si,
            "DI" => r.di,
            "BP" => r.bp,
            "SP" => r.sp,
            "IP" => r.ip,
            "CS" => r.cs,
            "DS" => r.ds,
            "SS" => r.ss,
            "ES" => r.es,
            _ => return None,
        })
    }

    pub fn set_reg16(&mut self, name: &str, val: u16) -> bool {
        match self.slot16(name) {
            Some(slot) => {
                *slot = val;
                true
            }
            None => false,
        }
    }

    pub fn reg8(&self, name: &str) -> Option<u8> {
        let (parent, high) = Self::half(name)?;
        let word = self.reg16(parent)?;
        Some(if high { (word >> 8) as u8 } else { word as u8 })
    }

    /// Write one half of AX..DX, leaving the sibling half alone.
    pub fn set_reg8(&mut self, name: &str, val: u8) -> bool {
        let Some((parent, high)) = Self::half(name) else {
            return false;
        };
        let Some(slot) = self.slot16(parent) else {
            return false;
        };
        *slot = if high {
            (*slot & 0x00FF) | (u16::from(val) << 8)
        } else {
            (*slot & 0xFF00) | u16::from(val)
        };
        true
    }

    pub fn flag(&self, f: Flags) -> bool {
        self.flags.contains(f)
    }

    /// Register value, else a numeric literal (decimal by default), else 0.
    fn read(&self, op: &str) -> u32 {
        if let Some(v) = self.reg8(op) {
            return u32::from(v);
        }
        if let Some(v) = self.reg16(op) {
            return u32::from(v);
        }
        value_or_zero(Arch::I8086, op)
    }

    fn write(&mut self, op: &str, val: u32) {
        if !self.set_reg8(op, val as u8) {
            self.set_reg16(op, val as u16);
        }
    }

    fn check_dest(inst: &Instruction, op: &str) -> Result<(), String> {
        if Arch::I8086.is_register(op) {
            Ok(())
        } else {
            Err(format!("{}: destination {op} is not a register", inst.mnemonic))
        }
    }

    fn width(ops: &[&str]) -> Width {
        if ops.iter().all(|op| Self::half(op).is_some()) {
            Width::Byte
        } else {
            Width::Word
        }
    }

    fn set_result_flags(&mut self, result: u32, w: Width) {
        let r = result & w.mask();
        self.flags.set(Flags::ZF, r == 0);
        self.flags.set(Flags::SF, r & w.sign() != 0);
        self.flags.set(Flags::PF, literal::low_byte_ones(r) % 2 == 0);
    }

    fn add_flags(&mut self, a: u32, b: u32, w: Width) -> u32 {
        let sum = a + b;
        let r = sum & w.mask();
        self.set_result_flags(r, w);
        self.flags.set(Flags::CF, sum > w.mask());
        self.flags.set(Flags::OF, (a ^ r) & (b ^ r) & w.sign() != 0);
        self.flags.set(Flags::AF, (a ^ b ^ r) & 0x10 != 0);
        r
    }

    fn sub_flags(&mut self, a: u32, b: u32, w: Width) -> u32 {
        let r = a.wrapping_sub(b) & w.mask();
        self.set_result_flags(r, w);
        self.flags.set(Flags::CF, a < b);
        self.flags.set(Flags::OF, (a ^ b) & (a ^ r) & w.sign() != 0);
        self.flags.set(Flags::AF, (a ^ b ^ r) & 0x10 != 0);
        r
    }

    fn stack_addr(&self) -> u32 {
        (u32::from(self.regs.ss) << 4) + u32::from(self.regs.sp)
    }

    fn mov(&mut self, inst: &Instruction) -> Step {
        let [dest, src] = operands::<2>(inst)?;
        Self::check_dest(inst, dest)?;
        let value = self.read(src) & Self::width(&[dest]).mask();
        self.write(dest, value);
        Ok(format!("MOV {dest}, {src} (value: {value})"))
    }

    fn alu(&mut self, inst: &Instruction, op: Alu) -> Step {
        let [dest, src] = operands::<2>(inst)?;
        if !matches!(op, Alu::Cmp) {
            Self::check_dest(inst, dest)?;
        }
        let w = Self::width(&[dest, src]);
        let a = self.read(dest) & w.mask();
        let b = self.read(src) & w.mask();
        let result = match op {
            Alu::Add => self.add_flags(a, b, w),
            Alu::Sub | Alu::Cmp => self.sub_flags(a, b, w),
            Alu::And | Alu::Or | Alu::Xor => {
                let r = match op {
                    Alu::And => a & b,
                    Alu::Or => a | b,
                    _ => a ^ b,
                };
                self.set_result_flags(r, w);
                self.flags.remove(Flags::CF | Flags::OF);
                r
            }
        };
        if matches!(op, Alu::Cmp) {
            return Ok(format!(
                "CMP {dest}, {src} (ZF: {}, CF: {})",
                self.flag(Flags::ZF),
                self.flag(Flags::CF)
            ));
        }
        self.write(dest, result);
        Ok(format!("{} {dest}, {src} (result: {result})", inst.mnemonic))
    }

    fn add(&mut self, inst: &Instruction) -> Step {
        self.alu(inst, Alu::Add)
    }

    fn sub(&mut self, inst: &Instruction) -> Step {
        self.alu(inst, Alu::Sub)
    }

    fn cmp(&mut self, inst: &Instruction) -> Step {
        self.alu(inst, Alu::Cmp)
    }

    fn and(&mut self, inst: &Instruction) -> Step {
        self.alu(inst, Alu::And)
    }

    fn or(&mut self, inst: &Instruction) -> Step {
        self.alu(inst, Alu::Or)
    }

    fn xor(&mut self, inst: &Instruction) -> Step {
        self.alu(inst, Alu::Xor)
    }

    /// INC/DEC leave CF untouched.
    fn step_by_one(&mut self, inst: &Instruction, up: bool) -> Step {
        let [dest] = operands::<1>(inst)?;
        Self::check_dest(inst, dest)?;
        let w = Self::width(&[dest]);
        let a = self.read(dest) & w.mask();
        let carry = self.flag(Flags::CF);
        let result = if up {
            self.add_flags(a, 1, w)
        } else {
            self.sub_flags(a, 1, w)
        };
        self.flags.set(Flags::CF, carry);
        self.write(dest, result);
        Ok(format!("{} {dest} (result: {result})", inst.mnemonic))
    }

    fn inc(&mut self, inst: &Instruction) -> Step {
        self.step_by_one(inst, true)
    }

    fn dec(&mut self, inst: &Instruction) -> Step {
        self.step_by_one(inst, false)
    }

    fn not(&mut self, inst: &Instruction) -> Step {
        let [dest] = operands::<1>(inst)?;
        Self::check_dest(inst, dest)?;
        let w = Self::width(&[dest]);
        let result = !self.read(dest) & w.mask();
        self.write(dest, result);
        Ok(format!("NOT {dest} (result: {result})"))
    }

    fn neg(&mut self, inst: &Instruction) -> Step {
        let [dest] = operands::<1>(inst)?;
        Self::check_dest(inst, dest)?;
        let w = Self::width(&[dest]);
        let a = self.read(dest) & w.mask();
        let result = self.sub_flags(0, a, w);
        self.write(dest, result);
        Ok(format!("NEG {dest} (result: {result})"))
    }

    fn push(&mut self, inst: &Instruction) -> Step {
        let [src] = operands::<1>(inst)?;
        let Some(value) = self.reg16(src) else {
            return Err(format!("PUSH requires a 16-bit register, got {src}"));
        };
        self.regs.sp = self.regs.sp.wrapping_sub(2);
        let addr = self.stack_addr();
        self.mem.write_u16_le(addr, value);
        Ok(format!("PUSH {src} (value: {value}, SP: {:#06X})", self.regs.sp))
    }

    fn pop(&mut self, inst: &Instruction) -> Step {
        let [dest] = operands::<1>(inst)?;
        if self.reg16(dest).is_none() {
            return Err(format!("POP requires a 16-bit register, got {dest}"));
        }
        let value = self.mem.read_u16_le(self.stack_addr());
        self.regs.sp = self.regs.sp.wrapping_add(2);
        self.set_reg16(dest, value);
        Ok(format!("POP {dest} (value: {value}, SP: {:#06X})", self.regs.sp))
    }

    /// Jump targets are absolute values, not displacements.
    fn jump_if(&mut self, inst: &Instruction, taken: bool) -> Step {
        let [target] = operands::<1>(inst)?;
        if !taken {
            return Ok(format!("{} {target} (not taken)", inst.mnemonic));
        }
        let address = value_or_zero(Arch::I8086, target) as u16;
        self.regs.ip = address;
        Ok(format!("{} {target} (taken, IP: {address})", inst.mnemonic))
    }

    fn jmp(&mut self, inst: &Instruction) -> Step {
        let [target] = operands::<1>(inst)?;
        let address = value_or_zero(Arch::I8086, target) as u16;
        self.regs.ip = address;
        Ok(format!("JMP {target} (IP: {address})"))
    }

    fn je(&mut self, inst: &Instruction) -> Step {
        let zf = self.flag(Flags::ZF);
        self.jump_if(inst, zf)
    }

    fn jne(&mut self, inst: &Instruction) -> Step {
        let zf = self.flag(Flags::ZF);
        self.jump_if(inst, !zf)
    }

    fn jc(&mut self, inst: &Instruction) -> Step {
        let cf = self.flag(Flags::CF);
        self.jump_if(inst, cf)
    }

    fn jnc(&mut self, inst: &Instruction) -> Step {
        let cf = self.flag(Flags::CF);
        self.jump_if(inst, !cf)
    }

    fn nop(&mut self, _inst: &Instruction) -> Step {
        Ok("NOP executed".to_string())
    }

    fn hlt(&mut self, _inst: &Instruction) -> Step {
        self.halted = true;
        Ok("HLT - Program halted".to_string())
    }
}

impl InstructionSet for Cpu8086 {
    fn handler(mnemonic: &str) -> Option<Handler<Self>> {
        let h: Handler<Self> = match mnemonic {
            "MOV" => Self::mov,
            "ADD" => Self::add,
            "SUB" => Self::sub,
            "CMP" => Self::cmp,
            "AND" => Self::and,
            "OR" => Self::or,
            "XOR" => Self::xor,
            "INC" => Self::inc,
            "DEC" => Self::dec,
            "NOT" => Self::not,
            "NEG" => Self::neg,
            "PUSH" => Self::push,
            "POP" => Self::pop,
            "JMP" => Self::jmp,
            "JE" | "JZ" => Self::je,
            "JNE" | "JNZ" => Self::jne,
            "JC" => Self::jc,
            "JNC" => Self::jnc,
            "NOP" => Self::nop,
            "HLT" => Self::hlt,
            _ => return None,
        };
        Some(h)
    }
}

impl Processor for Cpu8086 {
    fn arch(&self) -> Arch {
        Arch::I8086
    }

    fn reset(&mut self) {
        self.reset_registers();
        self.mem.clear();
    }

    fn execute(&mut self, inst: &Instruction) -> String {
        dispatch(self, inst)
    }

    fn halted(&self) -> bool {
        self.halted
    }

    fn load_program(&mut self, bytes: &[u8]) {
        self.mem.load(0, bytes);
        self.regs.ip = 0;
    }

    fn read_memory(&self, addr: u32) -> u8 {
        self.mem.read_u8(addr)
    }

    fn write_memory(&mut self, addr: u32, val: u8) {
        self.mem.write_u8(addr, val);
    }

    fn snapshot(&self) -> Snapshot {
        let r = &self.regs;
        let registers = [
            ("AX", r.ax),
            ("BX", r.bx),
            ("CX", r.cx),
            ("DX", r.dx),
            ("SI", r.si),
            ("DI", r.di),
            ("BP", r.bp),
            ("SP", r.sp),
            ("IP", r.ip),
            ("CS", r.cs),
            ("DS", r.ds),
            ("SS", r.ss),
            ("ES", r.es),
        ];
        let flags = [
            ("CF", Flags::CF),
            ("PF", Flags::PF),
            ("AF", Flags::AF),
            ("ZF", Flags::ZF),
            ("SF", Flags::SF),
            ("OF", Flags::OF),
            ("IF", Flags::IF),
            ("DF", Flags::DF),
            ("TF", Flags::TF),
        ];
        Snapshot {
            arch: Arch::I8086,
            registers: registers.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
            flags: flags
                .iter()
                .map(|(n, f)| (n.to_string(), self.flags.contains(*f)))
                .collect(),
            ports: Vec::new(),
            halted: self.halted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(cpu: &mut Cpu8086, line: &str) -> String {
        let inst = crate::parser::parse_line(line).unwrap();
        cpu.execute(&inst)
    }

    #[test]
    fn half_register_writes_keep_the_sibling() {
        let mut cpu = Cpu8086::new();
        cpu.set_reg16("AX", 0x1234);
        cpu.set_reg8("AL", 0xFF);
        assert_eq!(cpu.reg8("AH"), Some(0x12));
        assert_eq!(cpu.reg16("AX"), Some(0x12FF));
        cpu.set_reg8("AH", 0x00);
        assert_eq!(cpu.reg16("AX"), Some(0x00FF));
    }

    #[test]
    fn byte_width_only_when_every_operand_is_a_byte_register() {
        let mut cpu = Cpu8086::new();
        run(&mut cpu, "MOV AL, 0FFH");
        run(&mut cpu, "MOV BL, 1");
        run(&mut cpu, "ADD AL, BL");
        assert_eq!(cpu.reg16("AX"), Some(0x0000));
        assert!(cpu.flag(Flags::CF));
        assert!(cpu.flag(Flags::ZF));

        run(&mut cpu, "MOV AL, 0FFH");
        run(&mut cpu, "ADD AL, 1");
        // word arithmetic, then the byte write drops the carry-out
        assert_eq!(cpu.reg8("AL"), Some(0x00));
        assert!(!cpu.flag(Flags::CF));
    }

    #[test]
    fn inc_preserves_carry() {
        let mut cpu = Cpu8086::new();
        run(&mut cpu, "MOV AX, 1");
        run(&mut cpu, "SUB AX, 2");
        assert!(cpu.flag(Flags::CF));
        assert!(cpu.flag(Flags::SF));
        run(&mut cpu, "INC AX");
        assert!(cpu.flag(Flags::CF));
        assert!(cpu.flag(Flags::ZF));
    }

    #[test]
    fn signed_overflow() {
        let mut cpu = Cpu8086::new();
        run(&mut cpu, "MOV AX, 7FFFH");
        run(&mut cpu, "ADD AX, 1");
        assert!(cpu.flag(Flags::OF));
        assert!(cpu.flag(Flags::AF));
        run(&mut cpu, "AND AX, AX");
        assert!(!cpu.flag(Flags::OF));
    }

    #[test]
    fn push_pop_through_the_stack_segment() {
        let mut cpu = Cpu8086::new();
        run(&mut cpu, "MOV SS, 1000H");
        run(&mut cpu, "MOV AX, 0BEEFH");
        run(&mut cpu, "PUSH AX");
        assert_eq!(cpu.regs.sp, 0xFFFC);
        assert_eq!(cpu.read_memory(0x1FFFC), 0xEF);
        assert_eq!(cpu.read_memory(0x1FFFD), 0xBE);
        run(&mut cpu, "POP DX");
        assert_eq!(cpu.regs.dx, 0xBEEF);
        assert_eq!(cpu.regs.sp, 0xFFFE);
        assert!(run(&mut cpu, "PUSH AL").starts_with("PUSH requires"));
    }
}
