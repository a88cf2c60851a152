//! Instruction set definition: opcode table, byte layouts, mnemonic
//! overloads.
//!
//! Every overload of a mnemonic is its own opcode (e.g. `sub` has three:
//! register-register, register-immediate, immediate-register), so the layout
//! and the semantics of an instruction are both selected by a single byte.
//! Encodings are 1-5 bytes: `[opcode][imm-A][imm-B][regC<<4][regA<<4|regB]`
//! with immediates little-endian and leading, register nibbles trailing.

use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Width of the first immediate field. 4- and 8-bit immediates occupy one
/// byte, 16-bit immediates two (little-endian).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmWidth {
    None,
    B4,
    B8,
    B16,
}

impl ImmWidth {
    pub const fn num_bytes(self) -> usize {
        match self {
            ImmWidth::None => 0,
            ImmWidth::B4 | ImmWidth::B8 => 1,
            ImmWidth::B16 => 2,
        }
    }

    /// Legal encodable range, as an inclusive signed interval. Negative
    /// values are stored two's-complement in the field width.
    pub const fn range(self) -> (i64, i64) {
        match self {
            ImmWidth::None => (0, 0),
            ImmWidth::B4 => (0, 15),
            ImmWidth::B8 => (-128, 255),
            ImmWidth::B16 => (-32768, 65535),
        }
    }
}

/// Field placement for one opcode. The second immediate, when present, is
/// always 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub reg_a: bool,
    pub reg_b: bool,
    pub reg_c: bool,
    pub imm_a: ImmWidth,
    pub imm_b: bool,
}

impl Layout {
    /// Total encoded length including the opcode byte.
    pub const fn num_bytes(&self) -> usize {
        let regs = (self.reg_c as usize) + ((self.reg_a || self.reg_b) as usize);
        1 + self.imm_a.num_bytes() + if self.imm_b { 2 } else { 0 } + regs
    }
}

const fn layout(reg_a: bool, reg_b: bool, reg_c: bool, imm_a: ImmWidth, imm_b: bool) -> Layout {
    Layout { reg_a, reg_b, reg_c, imm_a, imm_b }
}

pub const L_NONE: Layout = layout(false, false, false, ImmWidth::None, false);
pub const L_A: Layout = layout(true, false, false, ImmWidth::None, false);
pub const L_AB: Layout = layout(true, true, false, ImmWidth::None, false);
pub const L_ABC: Layout = layout(true, true, true, ImmWidth::None, false);
pub const L_A_I16: Layout = layout(true, false, false, ImmWidth::B16, false);
pub const L_A_I8: Layout = layout(true, false, false, ImmWidth::B8, false);
pub const L_AB_I16: Layout = layout(true, true, false, ImmWidth::B16, false);
pub const L_AB_I4: Layout = layout(true, true, false, ImmWidth::B4, false);
pub const L_I8: Layout = layout(false, false, false, ImmWidth::B8, false);
pub const L_I16: Layout = layout(false, false, false, ImmWidth::B16, false);
pub const L_I8_I16: Layout = layout(false, false, false, ImmWidth::B8, true);
pub const L_I16_I16: Layout = layout(false, false, false, ImmWidth::B16, true);

/// The full opcode space. Unknown bytes decode as `Nop` via the catch-all
/// default, so malformed bytecode runs as a no-op sequence instead of
/// faulting.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Default,
    FromPrimitive,
    IntoPrimitive,
)]
#[repr(u8)]
pub enum Opcode {
    #[default]
    Nop = 0,
    Slp,

    SetR,
    SetI,

    LdbR,
    LdbI,
    LdwR,
    LdwI,

    StbRr,
    StbRi,
    StbIr,
    StbIi,
    StwRr,
    StwRi,
    StwIr,
    StwIi,

    PshbR,
    PshbI,
    PshwR,
    PshwI,
    Popb,
    Popw,

    AddRrr,
    AddRri,
    SubRrr,
    SubRri,
    SubRir,
    MulRrr,
    MulRri,

    DivsRrr,
    DivsRri,
    DivsRir,
    DivuRrr,
    DivuRri,
    DivuRir,
    RemsRrr,
    RemsRri,
    RemsRir,
    RemuRrr,
    RemuRri,
    RemuRir,

    AndRrr,
    AndRri,
    IorRrr,
    IorRri,
    XorRrr,
    XorRri,

    LshRrr,
    LshRri,
    LshRir,
    RshsRrr,
    RshsRri,
    RshsRir,
    RshuRrr,
    RshuRri,
    RshuRir,

    CeqRrr,
    CeqRri,
    CneRrr,
    CneRri,
    CltsRrr,
    CltsRri,
    CltsRir,
    CltuRrr,
    CltuRri,
    CltuRir,
    CgesRrr,
    CgesRri,
    CgesRir,
    CgeuRrr,
    CgeuRri,
    CgeuRir,

    JmpR,
    JmpI,
    JmzRr,
    JmzRi,
}

impl Opcode {
    /// Total decode of a raw opcode byte.
    pub fn from_byte(b: u8) -> Self {
        Self::from(b)
    }

    /// The byte layout for this opcode. O(1), fixed at compile time.
    pub const fn layout(self) -> Layout {
        use Opcode::*;
        match self {
            Nop => L_NONE,
            Slp | JmpI => L_I16,
            PshbR | PshwR | Popb | Popw | JmpR => L_A,
            PshbI => L_I8,
            PshwI => L_I16,
            SetR | LdbR | LdwR | StbRr | StwRr | JmzRr => L_AB,
            SetI | LdbI | LdwI | StbRi | StwRi | StwIr | JmzRi => L_A_I16,
            StbIr => L_A_I8,
            StbIi => L_I8_I16,
            StwIi => L_I16_I16,
            AddRrr | SubRrr | MulRrr | DivsRrr | DivuRrr | RemsRrr | RemuRrr | AndRrr
            | IorRrr | XorRrr | LshRrr | RshsRrr | RshuRrr | CeqRrr | CneRrr | CltsRrr
            | CltuRrr | CgesRrr | CgeuRrr => L_ABC,
            AddRri | SubRri | SubRir | MulRri | DivsRri | DivsRir | DivuRri | DivuRir
            | RemsRri | RemsRir | RemuRri | RemuRir | AndRri | IorRri | XorRri | LshRir
            | RshsRir | RshuRir | CeqRri | CneRri | CltsRri | CltsRir | CltuRri | CltuRir
            | CgesRri | CgesRir | CgeuRri | CgeuRir => L_AB_I16,
            LshRri | RshsRri | RshuRri => L_AB_I4,
        }
    }

    /// Mnemonic and operand shape for this opcode, from the overload table.
    /// Used by the disassembler; assembly goes the other way via
    /// [`overloads`].
    pub fn signature(self) -> (Mnemonic, &'static [OperandSlot]) {
        for &(m, shape, op) in OVERLOADS {
            if op == self {
                return (m, shape);
            }
        }
        // Every opcode has exactly one table row; checked by test below.
        (Mnemonic::Nop, &[])
    }
}

/// Assembly-level mnemonics. One mnemonic covers all operand-shape overloads
/// of an operation; matching a shape to a concrete opcode happens in the
/// assembler against [`overloads`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Mnemonic {
    Nop,
    Slp,
    Set,
    Ldb,
    Ldw,
    Stb,
    Stw,
    Pshb,
    Pshw,
    Popb,
    Popw,
    Add,
    Sub,
    Mul,
    Divs,
    Divu,
    Rems,
    Remu,
    And,
    Ior,
    Xor,
    Lsh,
    Rshs,
    Rshu,
    Ceq,
    Cne,
    Clts,
    Cltu,
    Cges,
    Cgeu,
    Jmp,
    Jmz,
}

/// One position in an operand shape. A label operand is accepted wherever a
/// 16-bit immediate is, since it resolves to a 16-bit address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandSlot {
    Reg,
    Imm(ImmWidth),
}

const R: OperandSlot = OperandSlot::Reg;
const I4: OperandSlot = OperandSlot::Imm(ImmWidth::B4);
const I8: OperandSlot = OperandSlot::Imm(ImmWidth::B8);
const I16: OperandSlot = OperandSlot::Imm(ImmWidth::B16);

/// Mnemonic overload table. Within one mnemonic, the first row whose shape
/// matches the parsed operand kinds is selected.
pub static OVERLOADS: &[(Mnemonic, &[OperandSlot], Opcode)] = &[
    (Mnemonic::Nop, &[], Opcode::Nop),
    (Mnemonic::Slp, &[I16], Opcode::Slp),
    (Mnemonic::Set, &[R, R], Opcode::SetR),
    (Mnemonic::Set, &[R, I16], Opcode::SetI),
    (Mnemonic::Ldb, &[R, R], Opcode::LdbR),
    (Mnemonic::Ldb, &[R, I16], Opcode::LdbI),
    (Mnemonic::Ldw, &[R, R], Opcode::LdwR),
    (Mnemonic::Ldw, &[R, I16], Opcode::LdwI),
    (Mnemonic::Stb, &[R, R], Opcode::StbRr),
    (Mnemonic::Stb, &[R, I16], Opcode::StbRi),
    (Mnemonic::Stb, &[I8, R], Opcode::StbIr),
    (Mnemonic::Stb, &[I8, I16], Opcode::StbIi),
    (Mnemonic::Stw, &[R, R], Opcode::StwRr),
    (Mnemonic::Stw, &[R, I16], Opcode::StwRi),
    (Mnemonic::Stw, &[I16, R], Opcode::StwIr),
    (Mnemonic::Stw, &[I16, I16], Opcode::StwIi),
    (Mnemonic::Pshb, &[R], Opcode::PshbR),
    (Mnemonic::Pshb, &[I8], Opcode::PshbI),
    (Mnemonic::Pshw, &[R], Opcode::PshwR),
    (Mnemonic::Pshw, &[I16], Opcode::PshwI),
    (Mnemonic::Popb, &[R], Opcode::Popb),
    (Mnemonic::Popw, &[R], Opcode::Popw),
    (Mnemonic::Add, &[R, R, R], Opcode::AddRrr),
    (Mnemonic::Add, &[R, R, I16], Opcode::AddRri),
    (Mnemonic::Sub, &[R, R, R], Opcode::SubRrr),
    (Mnemonic::Sub, &[R, R, I16], Opcode::SubRri),
    (Mnemonic::Sub, &[R, I16, R], Opcode::SubRir),
    (Mnemonic::Mul, &[R, R, R], Opcode::MulRrr),
    (Mnemonic::Mul, &[R, R, I16], Opcode::MulRri),
    (Mnemonic::Divs, &[R, R, R], Opcode::DivsRrr),
    (Mnemonic::Divs, &[R, R, I16], Opcode::DivsRri),
    (Mnemonic::Divs, &[R, I16, R], Opcode::DivsRir),
    (Mnemonic::Divu, &[R, R, R], Opcode::DivuRrr),
    (Mnemonic::Divu, &[R, R, I16], Opcode::DivuRri),
    (Mnemonic::Divu, &[R, I16, R], Opcode::DivuRir),
    (Mnemonic::Rems, &[R, R, R], Opcode::RemsRrr),
    (Mnemonic::Rems, &[R, R, I16], Opcode::RemsRri),
    (Mnemonic::Rems, &[R, I16, R], Opcode::RemsRir),
    (Mnemonic::Remu, &[R, R, R], Opcode::RemuRrr),
    (Mnemonic::Remu, &[R, R, I16], Opcode::RemuRri),
    (Mnemonic::Remu, &[R, I16, R], Opcode::RemuRir),
    (Mnemonic::And, &[R, R, R], Opcode::AndRrr),
    (Mnemonic::And, &[R, R, I16], Opcode::AndRri),
    (Mnemonic::Ior, &[R, R, R], Opcode::IorRrr),
    (Mnemonic::Ior, &[R, R, I16], Opcode::IorRri),
    (Mnemonic::Xor, &[R, R, R], Opcode::XorRrr),
    (Mnemonic::Xor, &[R, R, I16], Opcode::XorRri),
    (Mnemonic::Lsh, &[R, R, R], Opcode::LshRrr),
    (Mnemonic::Lsh, &[R, R, I4], Opcode::LshRri),
    (Mnemonic::Lsh, &[R, I16, R], Opcode::LshRir),
    (Mnemonic::Rshs, &[R, R, R], Opcode::RshsRrr),
    (Mnemonic::Rshs, &[R, R, I4], Opcode::RshsRri),
    (Mnemonic::Rshs, &[R, I16, R], Opcode::RshsRir),
    (Mnemonic::Rshu, &[R, R, R], Opcode::RshuRrr),
    (Mnemonic::Rshu, &[R, R, I4], Opcode::RshuRri),
    (Mnemonic::Rshu, &[R, I16, R], Opcode::RshuRir),
    (Mnemonic::Ceq, &[R, R, R], Opcode::CeqRrr),
    (Mnemonic::Ceq, &[R, R, I16], Opcode::CeqRri),
    (Mnemonic::Cne, &[R, R, R], Opcode::CneRrr),
    (Mnemonic::Cne, &[R, R, I16], Opcode::CneRri),
    (Mnemonic::Clts, &[R, R, R], Opcode::CltsRrr),
    (Mnemonic::Clts, &[R, R, I16], Opcode::CltsRri),
    (Mnemonic::Clts, &[R, I16, R], Opcode::CltsRir),
    (Mnemonic::Cltu, &[R, R, R], Opcode::CltuRrr),
    (Mnemonic::Cltu, &[R, R, I16], Opcode::CltuRri),
    (Mnemonic::Cltu, &[R, I16, R], Opcode::CltuRir),
    (Mnemonic::Cges, &[R, R, R], Opcode::CgesRrr),
    (Mnemonic::Cges, &[R, R, I16], Opcode::CgesRri),
    (Mnemonic::Cges, &[R, I16, R], Opcode::CgesRir),
    (Mnemonic::Cgeu, &[R, R, R], Opcode::CgeuRrr),
    (Mnemonic::Cgeu, &[R, R, I16], Opcode::CgeuRri),
    (Mnemonic::Cgeu, &[R, I16, R], Opcode::CgeuRir),
    (Mnemonic::Jmp, &[R], Opcode::JmpR),
    (Mnemonic::Jmp, &[I16], Opcode::JmpI),
    (Mnemonic::Jmz, &[R, R], Opcode::JmzRr),
    (Mnemonic::Jmz, &[R, I16], Opcode::JmzRi),
];

/// All overload rows for a mnemonic, in declaration (match-priority) order.
pub fn overloads(m: Mnemonic) -> impl Iterator<Item = (&'static [OperandSlot], Opcode)> {
    OVERLOADS
        .iter()
        .filter(move |(om, _, _)| *om == m)
        .map(|&(_, shape, op)| (shape, op))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_fit_five_bytes() {
        for op in (0u8..=0xFF).map(Opcode::from_byte) {
            let n = op.layout().num_bytes();
            assert!((1..=5).contains(&n), "{op:?} is {n} bytes");
        }
    }

    #[test]
    fn unknown_bytes_decode_as_nop() {
        assert_eq!(Opcode::from_byte(0xFE), Opcode::Nop);
        assert_eq!(Opcode::from_byte(0x00), Opcode::Nop);
    }

    #[test]
    fn every_opcode_has_one_overload_row() {
        let last = Opcode::JmzRi as u8;
        for b in 0..=last {
            let op = Opcode::from_byte(b);
            let rows = OVERLOADS.iter().filter(|(_, _, o)| *o == op).count();
            assert_eq!(rows, 1, "{op:?}");
        }
        assert_eq!(OVERLOADS.len() as u8, last + 1);
    }

    #[test]
    fn shapes_agree_with_layouts() {
        for &(_, shape, op) in OVERLOADS {
            let lay = op.layout();
            let regs = shape.iter().filter(|s| **s == OperandSlot::Reg).count();
            let imms: Vec<ImmWidth> = shape
                .iter()
                .filter_map(|s| match s {
                    OperandSlot::Imm(w) => Some(*w),
                    OperandSlot::Reg => None,
                })
                .collect();
            let lay_regs =
                lay.reg_a as usize + lay.reg_b as usize + lay.reg_c as usize;
            assert_eq!(regs, lay_regs, "{op:?}");
            assert_eq!(imms.first().copied().unwrap_or(ImmWidth::None), lay.imm_a, "{op:?}");
            assert_eq!(imms.len() > 1, lay.imm_b, "{op:?}");
        }
    }

    #[test]
    fn mnemonics_parse_case_insensitively() {
        assert_eq!("DIVS".parse::<Mnemonic>().unwrap(), Mnemonic::Divs);
        assert_eq!("jmz".parse::<Mnemonic>().unwrap(), Mnemonic::Jmz);
        assert!("call".parse::<Mnemonic>().is_err());
    }
}
