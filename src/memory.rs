//! The 64KB byte-addressable memory shared by code, data, stack and I/O
//! ports. All multi-byte values are little-endian; 16-bit addressing wraps
//! at the 0xFFFF boundary instead of faulting.

use serde::{Deserialize, Serialize};

use crate::decoder::MAX_INSTR_BYTES;

pub const MEMORY_SIZE: usize = 1 << 16;

/// Memory-mapped port addresses. These are a driver convention only; the VM
/// core reads and writes them like any other byte.
pub mod ports {
    /// Signed movement control, -127..127 (VM writes, driver reads).
    pub const MOVE: u16 = 0xF000;
    /// Signed rotation control, -127..127 (VM writes, driver reads).
    pub const TURN: u16 = 0xF001;
    /// Unsigned weapon-fire intensity, 0..255 (VM writes, driver reads).
    pub const FIRE: u16 = 0xF002;
    /// Sensor direction control, 0..255 mapping to 0..2pi (VM writes, driver reads).
    pub const SENSOR_DIR: u16 = 0xF003;
    /// Scaled sensor distance reading, 0..255 (driver writes, VM reads).
    pub const SENSOR_DIST: u16 = 0xE000;
    /// Sensor hit kind: 0=none, 1=agent, 2=boundary/obstacle (driver writes).
    pub const SENSOR_KIND: u16 = 0xE001;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    mem: Vec<u8>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        Self { mem: vec![0; MEMORY_SIZE] }
    }

    /// Seed memory from an image prefix; anything past `image` stays zero.
    /// Images longer than 64KB are truncated.
    pub fn from_image(image: &[u8]) -> Self {
        let mut m = Self::new();
        let n = image.len().min(MEMORY_SIZE);
        m.mem[..n].copy_from_slice(&image[..n]);
        m
    }

    pub fn read_u8(&self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    pub fn write_u8(&mut self, addr: u16, val: u8) {
        self.mem[addr as usize] = val;
    }

    pub fn read_u16(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.read_u8(addr), self.read_u8(addr.wrapping_add(1))])
    }

    pub fn write_u16(&mut self, addr: u16, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.write_u8(addr, lo);
        self.write_u8(addr.wrapping_add(1), hi);
    }

    /// A fetch window starting at `addr`, wrapping at the address-space end.
    pub fn read_window(&self, addr: u16) -> [u8; MAX_INSTR_BYTES] {
        let mut w = [0u8; MAX_INSTR_BYTES];
        for (i, b) in w.iter_mut().enumerate() {
            *b = self.read_u8(addr.wrapping_add(i as u16));
        }
        w
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.mem
    }
}
