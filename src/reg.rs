use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One of the sixteen 4-bit register codes.
///
/// `Nl` is hard-wired to zero: reads yield 0 and writes are discarded by the
/// register file. `Rt` receives the prior instruction pointer on `jmp`, which
/// gives call/return idioms without a dedicated call opcode.
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
    EnumString,
    Display,
)]
#[repr(u8)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Reg {
    #[default]
    Nl = 0,
    Ip = 1,
    Sp = 2,
    // `ac` is the historical name for the link register; both parse.
    #[strum(to_string = "rt", serialize = "ac")]
    Rt = 3,
    X0 = 4,
    X1 = 5,
    X2 = 6,
    X3 = 7,
    X4 = 8,
    X5 = 9,
    X6 = 10,
    X7 = 11,
    X8 = 12,
    X9 = 13,
    X10 = 14,
    X11 = 15,
}

impl Reg {
    /// Decode a register from a nibble. Total: the register set covers the
    /// whole 4-bit space, so any byte maps to some register.
    pub fn from_nibble(n: u8) -> Self {
        Self::from(n & 0xF)
    }

    pub fn nibble(self) -> u8 {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nibble_space_is_closed() {
        for n in 0u8..=0xFF {
            let r = Reg::from_nibble(n);
            assert_eq!(r.nibble(), n & 0xF);
        }
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("sp".parse::<Reg>().unwrap(), Reg::Sp);
        assert_eq!("X11".parse::<Reg>().unwrap(), Reg::X11);
        assert_eq!("NL".parse::<Reg>().unwrap(), Reg::Nl);
        assert!("x12".parse::<Reg>().is_err());
    }

    #[test]
    fn link_register_answers_to_both_names() {
        assert_eq!("rt".parse::<Reg>().unwrap(), Reg::Rt);
        assert_eq!("AC".parse::<Reg>().unwrap(), Reg::Rt);
        assert_eq!(Reg::Rt.to_string(), "rt");
    }
}
