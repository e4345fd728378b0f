use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::{dispatch, operands, value_or_zero, Arch, Handler, InstructionSet, Processor, Snapshot, Step};
use crate::memory::{Bus, LinearMemory};
use crate::parser::Instruction;

pub const REGISTER_NAMES: &[&str] = &[
    "A", "ACC", "B", "C", "AB", "R0", "R1", "R2", "R3", "R4", "R5", "R6", "R7", "DPTR", "DPL",
    "DPH", "PC", "SP", "PSW", "P0", "P1", "P2", "P3",
];

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Psw: u8 {
        const C = 0x80;   // Carry
        const AC = 0x40;  // Auxiliary carry
        const F0 = 0x20;
        const RS1 = 0x10;
        const RS0 = 0x08;
        const OV = 0x04;  // Overflow
        const F1 = 0x02;
        const P = 0x01;   // Parity, set for an odd count of ones in A
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub a: u8,
    pub b: u8,
    pub r: [u8; 8],
    pub dptr: u16,
    pub pc: u16,
    pub sp: u8,
}

/// Operand names the 8051 resolves to state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reg {
    A,
    B,
    R(usize),
    Dptr,
    Dpl,
    Dph,
    Pc,
    Sp,
    Psw,
    Port(usize),
}

impl Reg {
    fn mask(self) -> u32 {
        if self == Reg::Dptr {
            0xFFFF
        } else {
            0xFF
        }
    }

    fn parse(name: &str) -> Option<Reg> {
        let n = name.trim().to_ascii_uppercase();
        Some(match n.as_str() {
            "A" | "ACC" => Reg::A,
            "B" => Reg::B,
            "DPTR" => Reg::Dptr,
            "DPL" => Reg::Dpl,
            "DPH" => Reg::Dph,
            "PC" => Reg::Pc,
            "SP" => Reg::Sp,
            "PSW" => Reg::Psw,
            _ => {
                let mut chars = n.chars();
                let kind = chars.next()?;
                let idx = chars.as_str();
                let i: usize = idx.parse().ok()?;
                match kind {
                    'R' if idx.len() == 1 && i < 8 => Reg::R(i),
                    'P' if idx.len() == 1 && i < 4 => Reg::Port(i),
                    _ => return None,
                }
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cpu8051 {
    pub regs: Registers,
    pub psw: Psw,
    pub ports: [u8; 4],
    pub mem: LinearMemory,
    pub halted: bool,
}

impl Default for Cpu8051 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu8051 {
    pub fn new() -> Self {
        let mut cpu = Self {
            regs: Registers::default(),
            psw: Psw::empty(),
            ports: [0xFF; 4],
            mem: LinearMemory::new(Arch::I8051.addr_bits()),
            halted: false,
        };
        cpu.reset_registers();
        cpu
    }

    fn reset_registers(&mut self) {
        self.regs = Registers {
            sp: 0x07,
            ..Registers::default()
        };
        self.psw = Psw::empty();
        self.ports = [0xFF; 4];
        self.halted = false;
    }

    pub fn flag(&self, f: Psw) -> bool {
        self.psw.contains(f)
    }

    /// Accumulator write; P follows the new value.
    pub fn set_a(&mut self, val: u8) {
        self.regs.a = val;
        self.psw.set(Psw::P, val.count_ones() % 2 == 1);
    }

    /// Named register read (`A`, `R3`, `DPTR`, `P1`, ...).
    pub fn register(&self, name: &str) -> Option<u16> {
        Reg::parse(name).map(|r| self.get(r))
    }

    /// Named register write, masked to the register's width.
    pub fn set_register(&mut self, name: &str, val: u32) -> bool {
        match Reg::parse(name) {
            Some(r) => {
                self.set(r, val);
                true
            }
            None => false,
        }
    }

    fn get(&self, r: Reg) -> u16 {
        let regs = &self.regs;
        match r {
            Reg::A => u16::from(regs.a),
            Reg::B => u16::from(regs.b),
            Reg::R(i) => u16::from(regs.r[i]),
            Reg::Dptr => regs.dptr,
            Reg::Dpl => regs.dptr & 0xFF,
            Reg::Dph => regs.dptr >> 8,
            Reg::Pc => regs.pc,
            Reg::Sp => u16::from(regs.sp),
            Reg::Psw => u16::from(self.psw.bits()),
            Reg::Port(i) => u16::from(self.ports[i]),
        }
    }

    fn set(&mut self, r: Reg, val: u32) {
        let byte = val as u8;
        match r {
            Reg::A => self.set_a(byte),
            Reg::B => self.regs.b = byte,
            Reg::R(i) => self.regs.r[i] = byte,
            Reg::Dptr => self.regs.dptr = val as u16,
            Reg::Dpl => self.regs.dptr = (self.regs.dptr & 0xFF00) | u16::from(byte),
            Reg::Dph => self.regs.dptr = (self.regs.dptr & 0x00FF) | (u16::from(byte) << 8),
            // named writes see the 8-bit view; jumps load the full counter
            Reg::Pc => self.regs.pc = u16::from(byte),
            Reg::Sp => self.regs.sp = byte,
            Reg::Psw => {
                self.psw = Psw::from_bits_retain(byte);
                let a = self.regs.a;
                self.set_a(a);
            }
            Reg::Port(i) => self.ports[i] = byte,
        }
    }

    /// Register value, else a numeric literal (hex by default), else 0.
    ///
    /// Direct addresses (`MOV A, 30H`) read as the value 30H itself; internal
    /// RAM is not modelled, even though the assembler encodes them as `E5 30`.
    fn read(&self, op: &str) -> u32 {
        match Reg::parse(op) {
            Some(r) => u32::from(self.get(r)),
            None => value_or_zero(Arch::I8051, op),
        }
    }

    fn dest(inst: &Instruction, op: &str) -> Result<Reg, String> {
        Reg::parse(op).ok_or_else(|| format!("{}: destination {op} is not a register", inst.mnemonic))
    }

    fn require_a(inst: &Instruction, op: &str) -> Result<(), String> {
        match Reg::parse(op) {
            Some(Reg::A) => Ok(()),
            _ => Err(format!("{} destination must be A", inst.mnemonic)),
        }
    }

    /// Accumulator-only instructions accept `A` or no operand at all.
    fn accumulator_only(inst: &Instruction) -> Result<(), String> {
        match inst.operands.as_slice() {
            [] => Ok(()),
            [op] if Reg::parse(op) == Some(Reg::A) => Ok(()),
            _ => Err(format!("{}: unsupported operand", inst.mnemonic)),
        }
    }

    pub fn load_external_memory(&mut self, addr: u16, values: &[u8]) {
        self.mem.load(u32::from(addr), values);
    }

    fn mov(&mut self, inst: &Instruction) -> Step {
        let [dest, src] = operands::<2>(inst)?;
        let r = Self::dest(inst, dest)?;
        if src.starts_with('@') {
            return Err(format!("MOV {dest}, {src}: indirect internal RAM is not supported"));
        }
        let value = self.read(src) & r.mask();
        self.set(r, value);
        Ok(format!(
            "MOV {dest}, {src} (value: {value}, registers: A={}, B={})",
            self.regs.a, self.regs.b
        ))
    }

    fn movx(&mut self, inst: &Instruction) -> Step {
        let [dest, src] = operands::<2>(inst)?;
        let indirect = |op: &str| -> Option<Option<usize>> {
            match op.to_ascii_uppercase().as_str() {
                "@DPTR" => Some(None),
                "@R0" => Some(Some(0)),
                "@R1" => Some(Some(1)),
                _ => None,
            }
        };
        match (indirect(src), indirect(dest)) {
            (Some(None), None) => {
                let r = Self::dest(inst, dest)?;
                let addr = self.regs.dptr;
                let val = self.mem.read_u8(u32::from(addr));
                self.set(r, u32::from(val));
                Ok(format!("MOVX {dest}, @DPTR ({dest}=0x{val:X}, DPTR={addr})"))
            }
            (None, Some(None)) => {
                let addr = self.regs.dptr;
                let val = self.read(src) as u8;
                self.mem.write_u8(u32::from(addr), val);
                Ok(format!("MOVX @DPTR, {src} (Wrote 0x{val:X} to {addr})"))
            }
            (Some(Some(i)), None) if Reg::parse(dest) == Some(Reg::A) => {
                let addr = self.regs.r[i];
                let val = self.mem.read_u8(u32::from(addr));
                self.set_a(val);
                Ok(format!("MOVX A, {src} (A=0x{val:X}, R{i}={addr})"))
            }
            (None, Some(Some(i))) if Reg::parse(src) == Some(Reg::A) => {
                let addr = self.regs.r[i];
                let val = self.regs.a;
                self.mem.write_u8(u32::from(addr), val);
                Ok(format!("MOVX {dest}, A (Wrote 0x{val:X} to {addr})"))
            }
            _ => Err("MOVX: unsupported addressing mode".to_string()),
        }
    }

    fn add_with(&mut self, inst: &Instruction, with_carry: bool) -> Step {
        let [dest, src] = operands::<2>(inst)?;
        Self::require_a(inst, dest)?;
        let a = u32::from(self.regs.a);
        let b = self.read(src) & 0xFF;
        let c = u32::from(with_carry && self.flag(Psw::C));
        let sum = a + b + c;
        let r = sum & 0xFF;
        self.psw.set(Psw::C, sum > 0xFF);
        self.psw.set(Psw::AC, (a & 0x0F) + (b & 0x0F) + c > 0x0F);
        self.psw.set(Psw::OV, (a ^ r) & (b ^ r) & 0x80 != 0);
        self.set_a(r as u8);
        Ok(format!("{} A, {src} (result: {r})", inst.mnemonic))
    }

    fn add(&mut self, inst: &Instruction) -> Step {
        self.add_with(inst, false)
    }

    fn addc(&mut self, inst: &Instruction) -> Step {
        self.add_with(inst, true)
    }

    fn subb(&mut self, inst: &Instruction) -> Step {
        let [dest, src] = operands::<2>(inst)?;
        Self::require_a(inst, dest)?;
        let a = i32::from(self.regs.a);
        let b = (self.read(src) & 0xFF) as i32;
        let c = i32::from(self.flag(Psw::C));
        let diff = a - b - c;
        let r = (diff & 0xFF) as u8;
        self.psw.set(Psw::C, diff < 0);
        self.psw.set(Psw::AC, (a & 0x0F) < (b & 0x0F) + c);
        self.psw.set(Psw::OV, (a ^ b) & (a ^ i32::from(r)) & 0x80 != 0);
        self.set_a(r);
        Ok(format!("SUBB A, {src} (result: {r})"))
    }

    fn step_by_one(&mut self, inst: &Instruction, up: bool) -> Step {
        let [dest] = operands::<1>(inst)?;
        let r = Self::dest(inst, dest)?;
        let v = u32::from(self.get(r));
        let result = if up { v.wrapping_add(1) } else { v.wrapping_sub(1) } & r.mask();
        self.set(r, result);
        Ok(format!("{} {dest} (result: {result})", inst.mnemonic))
    }

    fn inc(&mut self, inst: &Instruction) -> Step {
        self.step_by_one(inst, true)
    }

    fn dec(&mut self, inst: &Instruction) -> Step {
        self.step_by_one(inst, false)
    }

    fn ab_only(inst: &Instruction) -> Result<(), String> {
        match inst.operands.as_slice() {
            [op] if op.trim().eq_ignore_ascii_case("AB") => Ok(()),
            _ => Err(format!("{} requires operand AB", inst.mnemonic)),
        }
    }

    fn mul(&mut self, inst: &Instruction) -> Step {
        Self::ab_only(inst)?;
        let product = u16::from(self.regs.a) * u16::from(self.regs.b);
        self.set_a(product as u8);
        self.regs.b = (product >> 8) as u8;
        self.psw.remove(Psw::C);
        self.psw.set(Psw::OV, self.regs.b != 0);
        Ok(format!("MUL AB (A: {}, B: {})", self.regs.a, self.regs.b))
    }

    fn div(&mut self, inst: &Instruction) -> Step {
        Self::ab_only(inst)?;
        let (dividend, divisor) = (self.regs.a, self.regs.b);
        if divisor == 0 {
            self.psw.insert(Psw::OV);
            return Ok("DIV AB (Division by zero)".to_string());
        }
        self.set_a(dividend / divisor);
        self.regs.b = dividend % divisor;
        self.psw.remove(Psw::C | Psw::OV);
        Ok(format!(
            "DIV AB ({dividend} / {divisor} = A: {}, B: {})",
            self.regs.a, self.regs.b
        ))
    }

    fn logic(&mut self, inst: &Instruction, f: fn(u32, u32) -> u32) -> Step {
        let [dest, src] = operands::<2>(inst)?;
        let r = Self::dest(inst, dest)?;
        let result = f(u32::from(self.get(r)), self.read(src));
        self.set(r, result);
        let shown = self.get(r);
        Ok(format!("{} {dest}, {src} (result: {shown})", inst.mnemonic))
    }

    fn anl(&mut self, inst: &Instruction) -> Step {
        self.logic(inst, |a, b| a & b)
    }

    fn orl(&mut self, inst: &Instruction) -> Step {
        self.logic(inst, |a, b| a | b)
    }

    fn xrl(&mut self, inst: &Instruction) -> Step {
        self.logic(inst, |a, b| a ^ b)
    }

    fn rl(&mut self, inst: &Instruction) -> Step {
        Self::accumulator_only(inst)?;
        let r = self.regs.a.rotate_left(1);
        self.set_a(r);
        Ok(format!("RL A (result: {r})"))
    }

    fn rr(&mut self, inst: &Instruction) -> Step {
        Self::accumulator_only(inst)?;
        let r = self.regs.a.rotate_right(1);
        self.set_a(r);
        Ok(format!("RR A (result: {r})"))
    }

    /// 9-bit rotate through C.
    fn rlc(&mut self, inst: &Instruction) -> Step {
        Self::accumulator_only(inst)?;
        let a = self.regs.a;
        let r = (a << 1) | u8::from(self.flag(Psw::C));
        self.psw.set(Psw::C, a & 0x80 != 0);
        self.set_a(r);
        Ok(format!("RLC A (result: {r}, C: {})", self.flag(Psw::C)))
    }

    fn rrc(&mut self, inst: &Instruction) -> Step {
        Self::accumulator_only(inst)?;
        let a = self.regs.a;
        let r = (a >> 1) | (u8::from(self.flag(Psw::C)) << 7);
        self.psw.set(Psw::C, a & 0x01 != 0);
        self.set_a(r);
        Ok(format!("RRC A (result: {r}, C: {})", self.flag(Psw::C)))
    }

    fn swap(&mut self, inst: &Instruction) -> Step {
        Self::accumulator_only(inst)?;
        let r = self.regs.a.rotate_left(4);
        self.set_a(r);
        Ok(format!("SWAP A (result: {r})"))
    }

    fn clr(&mut self, inst: &Instruction) -> Step {
        let [dest] = operands::<1>(inst)?;
        match dest.to_ascii_uppercase().as_str() {
            "A" => {
                self.set_a(0);
                Ok("CLR A (A = 0)".to_string())
            }
            "C" => {
                self.psw.remove(Psw::C);
                Ok("CLR C (Carry cleared)".to_string())
            }
            _ => Err(format!("CLR {dest}: unsupported operand")),
        }
    }

    fn setb(&mut self, inst: &Instruction) -> Step {
        let [dest] = operands::<1>(inst)?;
        if !dest.eq_ignore_ascii_case("C") {
            return Err(format!("SETB {dest}: unsupported operand"));
        }
        self.psw.insert(Psw::C);
        Ok("SETB C (Carry set)".to_string())
    }

    fn cpl(&mut self, inst: &Instruction) -> Step {
        let [dest] = operands::<1>(inst)?;
        match dest.to_ascii_uppercase().as_str() {
            "A" => {
                let r = !self.regs.a;
                self.set_a(r);
                Ok(format!("CPL A (result: {r})"))
            }
            "C" => {
                self.psw.toggle(Psw::C);
                Ok(format!("CPL C (Carry: {})", self.flag(Psw::C)))
            }
            _ => Err(format!("CPL {dest}: unsupported operand")),
        }
    }

    /// Jump targets are absolute values, not displacements.
    fn jump_if(&mut self, inst: &Instruction, taken: bool) -> Step {
        let [target] = operands::<1>(inst)?;
        if !taken {
            return Ok(format!("{} {target} (not taken)", inst.mnemonic));
        }
        let address = value_or_zero(Arch::I8051, target) as u16;
        self.regs.pc = address;
        Ok(format!("{} {target} (taken, PC: {address})", inst.mnemonic))
    }

    fn jump(&mut self, inst: &Instruction) -> Step {
        let [target] = operands::<1>(inst)?;
        let address = value_or_zero(Arch::I8051, target) as u16;
        self.regs.pc = address;
        Ok(format!("{} {target} (PC: {address})", inst.mnemonic))
    }

    fn jz(&mut self, inst: &Instruction) -> Step {
        let zero = self.regs.a == 0;
        self.jump_if(inst, zero)
    }

    fn jnz(&mut self, inst: &Instruction) -> Step {
        let zero = self.regs.a == 0;
        self.jump_if(inst, !zero)
    }

    fn jc(&mut self, inst: &Instruction) -> Step {
        let c = self.flag(Psw::C);
        self.jump_if(inst, c)
    }

    fn jnc(&mut self, inst: &Instruction) -> Step {
        let c = self.flag(Psw::C);
        self.jump_if(inst, !c)
    }

    fn nop(&mut self, _inst: &Instruction) -> Step {
        Ok("NOP executed".to_string())
    }

    fn hlt(&mut self, _inst: &Instruction) -> Step {
        self.halted = true;
        Ok("HLT - Program halted".to_string())
    }
}

impl InstructionSet for Cpu8051 {
    fn handler(mnemonic: &str) -> Option<Handler<Self>> {
        let h: Handler<Self> = match mnemonic {
            "MOV" => Self::mov,
            "MOVX" => Self::movx,
            "ADD" => Self::add,
            "ADDC" => Self::addc,
            "SUBB" => Self::subb,
            "INC" => Self::inc,
            "DEC" => Self::dec,
            "MUL" => Self::mul,
            "DIV" => Self::div,
            "ANL" => Self::anl,
            "ORL" => Self::orl,
            "XRL" => Self::xrl,
            "RL" => Self::rl,
            "RLC" => Self::rlc,
            "RR" => Self::rr,
            "RRC" => Self::rrc,
            "SWAP" => Self::swap,
            "CLR" => Self::clr,
            "SETB" => Self::setb,
            "CPL" => Self::cpl,
            "SJMP" | "LJMP" => Self::jump,
            "JZ" => Self::jz,
            "JNZ" => Self::jnz,
            "JC" => Self::jc,
            "JNC" => Self::jnc,
            "NOP" => Self::nop,
            "HLT" => Self::hlt,
            _ => return None,
        };
        Some(h)
    }
}

impl Processor for Cpu8051 {
    fn arch(&self) -> Arch {
        Arch::I8051
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
        self.regs.pc = 0;
    }

    fn read_memory(&self, addr: u32) -> u8 {
        self.mem.read_u8(addr)
    }

    fn write_memory(&mut self, addr: u32, val: u8) {
        self.mem.write_u8(addr, val);
    }

    fn snapshot(&self) -> Snapshot {
        let r = &self.regs;
        let mut registers = vec![("A".to_string(), u16::from(r.a)), ("B".to_string(), u16::from(r.b))];
        registers.extend(r.r.iter().enumerate().map(|(i, v)| (format!("R{i}"), u16::from(*v))));
        registers.extend([
            ("DPTR".to_string(), r.dptr),
            ("PC".to_string(), r.pc),
            ("SP".to_string(), u16::from(r.sp)),
            ("PSW".to_string(), u16::from(self.psw.bits())),
        ]);
        let flags = [("C", Psw::C), ("AC", Psw::AC), ("OV", Psw::OV), ("P", Psw::P)];
        Snapshot {
            arch: Arch::I8051,
            registers,
            flags: flags
                .iter()
                .map(|(n, f)| (n.to_string(), self.psw.contains(*f)))
                .collect(),
            ports: self.ports.to_vec(),
            halted: self.halted,
        }
    }
}
