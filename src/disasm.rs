//! Textual rendering of decoded instructions, mainly for `--trace` output
//! and listings. The output round-trips through the assembler: registers as
//! `$name`, immediates as hex.

use std::fmt::Write;

use crate::decoder::Instr;
use crate::isa::OperandSlot;

/// Render one instruction in assembly syntax, e.g. `add $x0, $x1, 0x10`.
pub fn fmt_instr(i: &Instr) -> String {
    let (mnemonic, shape) = i.op.signature();
    let mut out = mnemonic.to_string();
    let mut regs = 0usize;
    let mut imms = 0usize;
    for (n, slot) in shape.iter().enumerate() {
        out.push_str(if n == 0 { " " } else { ", " });
        match slot {
            OperandSlot::Reg => {
                let r = match regs {
                    0 => i.reg_a,
                    1 => i.reg_b,
                    _ => i.reg_c,
                };
                let _ = write!(out, "${r}");
                regs += 1;
            }
            OperandSlot::Imm(_) => {
                let v = if imms == 0 { i.imm_a } else { i.imm_b };
                let _ = write!(out, "0x{v:X}");
                imms += 1;
            }
        }
    }
    out
}
