//! Bit-exact instruction encode/decode against the [`crate::isa`] layouts.

use serde::{Deserialize, Serialize};

use crate::isa::{ImmWidth, Opcode};
use crate::reg::Reg;

/// Longest possible encoding.
pub const MAX_INSTR_BYTES: usize = 5;

/// A decoded instruction: opcode plus every operand field its layout can
/// carry. Fields absent from the layout stay at their zero values.
/// Immediates are raw 16-bit patterns; signedness is the executing opcode's
/// business, never the codec's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Instr {
    pub op: Opcode,
    pub reg_a: Reg,
    pub reg_b: Reg,
    pub reg_c: Reg,
    pub imm_a: u16,
    pub imm_b: u16,
}

impl Instr {
    pub fn new(op: Opcode) -> Self {
        Self { op, ..Self::default() }
    }

    /// Encoded length in bytes.
    pub fn num_bytes(&self) -> usize {
        self.op.layout().num_bytes()
    }

    /// Encode into a fixed window; returns the window and the live length.
    /// Immediates are masked to their field width.
    pub fn encode(&self) -> ([u8; MAX_INSTR_BYTES], usize) {
        let lay = self.op.layout();
        let mut out = [0u8; MAX_INSTR_BYTES];
        out[0] = self.op.into();
        let mut at = 1;
        match lay.imm_a {
            ImmWidth::None => {}
            ImmWidth::B4 => {
                out[at] = (self.imm_a & 0xF) as u8;
                at += 1;
            }
            ImmWidth::B8 => {
                out[at] = (self.imm_a & 0xFF) as u8;
                at += 1;
            }
            ImmWidth::B16 => {
                out[at..at + 2].copy_from_slice(&self.imm_a.to_le_bytes());
                at += 2;
            }
        }
        if lay.imm_b {
            out[at..at + 2].copy_from_slice(&self.imm_b.to_le_bytes());
            at += 2;
        }
        if lay.reg_c {
            out[at] = self.reg_c.nibble() << 4;
            at += 1;
        }
        if lay.reg_a || lay.reg_b {
            out[at] = (self.reg_a.nibble() << 4) | self.reg_b.nibble();
            at += 1;
        }
        debug_assert_eq!(at, lay.num_bytes());
        (out, at)
    }

    /// Total decode of a raw byte window. The window must be at least
    /// [`MAX_INSTR_BYTES`] long; only the layout's prefix is consumed.
    pub fn decode(raw: &[u8; MAX_INSTR_BYTES]) -> Self {
        let op = Opcode::from_byte(raw[0]);
        let lay = op.layout();
        let mut i = Instr::new(op);
        let mut at = 1;
        match lay.imm_a {
            ImmWidth::None => {}
            ImmWidth::B4 => {
                i.imm_a = (raw[at] & 0xF) as u16;
                at += 1;
            }
            ImmWidth::B8 => {
                i.imm_a = raw[at] as u16;
                at += 1;
            }
            ImmWidth::B16 => {
                i.imm_a = u16::from_le_bytes([raw[at], raw[at + 1]]);
                at += 2;
            }
        }
        if lay.imm_b {
            i.imm_b = u16::from_le_bytes([raw[at], raw[at + 1]]);
            at += 2;
        }
        if lay.reg_c {
            i.reg_c = Reg::from_nibble(raw[at] >> 4);
            at += 1;
        }
        if lay.reg_a || lay.reg_b {
            i.reg_a = Reg::from_nibble(raw[at] >> 4);
            i.reg_b = Reg::from_nibble(raw[at] & 0xF);
        }
        i
    }
}
