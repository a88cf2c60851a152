//! Register file and the fetch/decode/execute loop.

use serde::{Deserialize, Serialize};

use crate::decoder::Instr;
use crate::exec;
use crate::memory::Memory;
use crate::reg::Reg;

/// The sixteen 16-bit register slots. All access goes through [`Regs::get`]
/// and [`Regs::set`], which enforce the `nl` null-register semantics: reads
/// always yield zero, writes are discarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Regs {
    slots: [u16; 16],
}

impl Regs {
    pub fn get(&self, r: Reg) -> u16 {
        match r {
            Reg::Nl => 0,
            _ => self.slots[r.nibble() as usize],
        }
    }

    pub fn set(&mut self, r: Reg, val: u16) {
        if r != Reg::Nl {
            self.slots[r.nibble() as usize] = val;
        }
    }
}

/// One agent's machine: a register file plus its own 64KB memory. There is
/// no run mode or halt state; the machine is always ready to fetch, and
/// `step` is total. Cross-agent interaction happens outside the VM, through
/// the embedding driver's port convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessState {
    pub regs: Regs,
    pub mem: Memory,
}

impl Default for ProcessState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessState {
    /// Zeroed registers, zeroed memory.
    pub fn new() -> Self {
        Self { regs: Regs::default(), mem: Memory::new() }
    }

    /// Program load: registers zeroed, memory seeded with the image bytes.
    pub fn load(image: &[u8]) -> Self {
        Self { regs: Regs::default(), mem: Memory::from_image(image) }
    }

    /// Decode the instruction at the current IP without executing it.
    pub fn peek(&self) -> Instr {
        Instr::decode(&self.mem.read_window(self.regs.get(Reg::Ip)))
    }

    /// Execute exactly one instruction. IP is advanced by the full encoded
    /// length before the semantic function runs, so a jump's written target
    /// is not advanced past afterwards.
    pub fn step(&mut self) {
        let ip = self.regs.get(Reg::Ip);
        let instr = Instr::decode(&self.mem.read_window(ip));
        self.regs
            .set(Reg::Ip, ip.wrapping_add(instr.num_bytes() as u16));
        exec::execute(self, &instr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::Opcode;

    #[test]
    fn nl_reads_zero_even_after_write() {
        let mut regs = Regs::default();
        regs.set(Reg::Nl, 0xFFFF);
        assert_eq!(regs.get(Reg::Nl), 0);
        regs.set(Reg::X5, 7);
        assert_eq!(regs.get(Reg::X5), 7);
    }

    #[test]
    fn step_advances_ip_by_encoded_length() {
        let mut st = ProcessState::new();
        // Zeroed memory decodes as an endless nop stream.
        st.step();
        assert_eq!(st.regs.get(Reg::Ip), 1);
        st.mem.write_u8(1, Opcode::SetI as u8);
        st.step();
        assert_eq!(st.regs.get(Reg::Ip), 5);
    }
}
