use serde::{Deserialize, Serialize};

/// Byte-addressable storage seen by a CPU. Addresses wrap, accesses never fail.
pub trait Bus {
    fn read_u8(&self, addr: u32) -> u8;
    fn write_u8(&mut self, addr: u32, val: u8);

    fn read_u16_le(&self, addr: u32) -> u16 {
        u16::from_le_bytes([self.read_u8(addr), self.read_u8(addr.wrapping_add(1))])
    }
    fn write_u16_le(&mut self, addr: u32, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.write_u8(addr, lo);
        self.write_u8(addr.wrapping_add(1), hi);
    }
}

/// Flat memory whose size is a power of two; the address is masked on access.
#[derive(Clone, Serialize, Deserialize)]
pub struct LinearMemory {
    pub mem: Vec<u8>,
    mask: u32,
}

impl LinearMemory {
    /// `addr_bits` is the architecture's address width (20 for the 8086, 16 for the 8051).
    pub fn new(addr_bits: u32) -> Self {
        let size = 1usize << addr_bits;
        Self {
            mem: vec![0; size],
            mask: (size - 1) as u32,
        }
    }

    pub fn len(&self) -> usize {
        self.mem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mem.is_empty()
    }

    /// Zero every byte in place.
    pub fn clear(&mut self) {
        self.mem.fill(0);
    }

    /// Copy `bytes` starting at `addr`, wrapping past the top of memory.
    pub fn load(&mut self, addr: u32, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            self.write_u8(addr.wrapping_add(i as u32), *b);
        }
    }
}

impl std::fmt::Debug for LinearMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearMemory")
            .field("len", &self.mem.len())
            .finish()
    }
}

impl Bus for LinearMemory {
    fn read_u8(&self, addr: u32) -> u8 {
        self.mem[(addr & self.mask) as usize]
    }
    fn write_u8(&mut self, addr: u32, val: u8) {
        self.mem[(addr & self.mask) as usize] = val;
    }
}
