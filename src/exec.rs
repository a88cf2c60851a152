//! Per-opcode execution semantics. One closed match over the whole opcode
//! space; the compiler checks exhaustiveness. Nothing in here can fail: the
//! numeric edge cases (division by zero, oversized shifts) all have defined
//! results.

use crate::cpu::ProcessState;
use crate::decoder::Instr;
use crate::isa::Opcode;
use crate::reg::Reg;

/// Signed division sentinels: by zero, a positive dividend saturates to
/// i16::MAX, a negative one to i16::MIN, zero stays zero. i16::MIN / -1
/// wraps instead of trapping.
fn div_s(n: u16, d: u16) -> u16 {
    let (n, d) = (n as i16, d as i16);
    if d == 0 {
        match n {
            1.. => 0x7FFF,
            0 => 0x0000,
            _ => 0x8000,
        }
    } else {
        n.wrapping_div(d) as u16
    }
}

fn div_u(n: u16, d: u16) -> u16 {
    if d == 0 {
        if n != 0 { 0xFFFF } else { 0x0000 }
    } else {
        n / d
    }
}

/// Remainder by zero yields the dividend unchanged, signed and unsigned.
fn rem_s(n: u16, d: u16) -> u16 {
    let (n, d) = (n as i16, d as i16);
    if d == 0 { n as u16 } else { n.wrapping_rem(d) as u16 }
}

fn rem_u(n: u16, d: u16) -> u16 {
    if d == 0 { n } else { n % d }
}

/// Shift amounts of 16 or more drain the value instead of wrapping the
/// amount, matching hardware-barrel behaviour.
fn lsh(v: u16, amt: u16) -> u16 {
    if amt >= 16 { 0 } else { v << amt }
}

fn rsh_u(v: u16, amt: u16) -> u16 {
    if amt >= 16 { 0 } else { v >> amt }
}

fn rsh_s(v: u16, amt: u16) -> u16 {
    ((v as i16) >> amt.min(15)) as u16
}

fn push(st: &mut ProcessState, bytes: u16, write: impl FnOnce(&mut ProcessState, u16)) {
    let sp = st.regs.get(Reg::Sp).wrapping_sub(bytes);
    st.regs.set(Reg::Sp, sp);
    write(st, sp);
}

fn pop(st: &mut ProcessState, bytes: u16, read: impl FnOnce(&ProcessState, u16) -> u16) -> u16 {
    let sp = st.regs.get(Reg::Sp);
    let val = read(st, sp);
    st.regs.set(Reg::Sp, sp.wrapping_add(bytes));
    val
}

/// Jump with link: the link register receives the already-advanced IP, so a
/// `jmp $rt` at the target returns to the instruction after the call site.
fn jump(st: &mut ProcessState, target: u16) {
    let ip = st.regs.get(Reg::Ip);
    st.regs.set(Reg::Rt, ip);
    st.regs.set(Reg::Ip, target);
}

pub(crate) fn execute(st: &mut ProcessState, i: &Instr) {
    use Opcode::*;

    let a = st.regs.get(i.reg_a);
    let b = st.regs.get(i.reg_b);
    let c = st.regs.get(i.reg_c);
    let (im, im2) = (i.imm_a, i.imm_b);

    match i.op {
        Nop => {}
        // Wired into the tables upstream with no defined behaviour; runs as
        // a plain length advance.
        Slp => {}

        SetR => st.regs.set(i.reg_a, b),
        SetI => st.regs.set(i.reg_a, im),

        LdbR => {
            let v = st.mem.read_u8(b) as u16;
            st.regs.set(i.reg_a, v);
        }
        LdbI => {
            let v = st.mem.read_u8(im) as u16;
            st.regs.set(i.reg_a, v);
        }
        LdwR => {
            let v = st.mem.read_u16(b);
            st.regs.set(i.reg_a, v);
        }
        LdwI => {
            let v = st.mem.read_u16(im);
            st.regs.set(i.reg_a, v);
        }

        StbRr => st.mem.write_u8(b, a as u8),
        StbRi => st.mem.write_u8(im, a as u8),
        StbIr => st.mem.write_u8(a, im as u8),
        StbIi => st.mem.write_u8(im2, im as u8),
        StwRr => st.mem.write_u16(b, a),
        StwRi => st.mem.write_u16(im, a),
        StwIr => st.mem.write_u16(a, im),
        StwIi => st.mem.write_u16(im2, im),

        PshbR => push(st, 1, |st, sp| st.mem.write_u8(sp, a as u8)),
        PshbI => push(st, 1, |st, sp| st.mem.write_u8(sp, im as u8)),
        PshwR => push(st, 2, |st, sp| st.mem.write_u16(sp, a)),
        PshwI => push(st, 2, |st, sp| st.mem.write_u16(sp, im)),
        Popb => {
            let v = pop(st, 1, |st, sp| st.mem.read_u8(sp) as u16);
            st.regs.set(i.reg_a, v);
        }
        Popw => {
            let v = pop(st, 2, |st, sp| st.mem.read_u16(sp));
            st.regs.set(i.reg_a, v);
        }

        AddRrr => st.regs.set(i.reg_a, b.wrapping_add(c)),
        AddRri => st.regs.set(i.reg_a, b.wrapping_add(im)),
        SubRrr => st.regs.set(i.reg_a, b.wrapping_sub(c)),
        SubRri => st.regs.set(i.reg_a, b.wrapping_sub(im)),
        SubRir => st.regs.set(i.reg_a, im.wrapping_sub(b)),
        MulRrr => st.regs.set(i.reg_a, b.wrapping_mul(c)),
        MulRri => st.regs.set(i.reg_a, b.wrapping_mul(im)),

        DivsRrr => st.regs.set(i.reg_a, div_s(b, c)),
        DivsRri => st.regs.set(i.reg_a, div_s(b, im)),
        DivsRir => st.regs.set(i.reg_a, div_s(im, b)),
        DivuRrr => st.regs.set(i.reg_a, div_u(b, c)),
        DivuRri => st.regs.set(i.reg_a, div_u(b, im)),
        DivuRir => st.regs.set(i.reg_a, div_u(im, b)),
        RemsRrr => st.regs.set(i.reg_a, rem_s(b, c)),
        RemsRri => st.regs.set(i.reg_a, rem_s(b, im)),
        RemsRir => st.regs.set(i.reg_a, rem_s(im, b)),
        RemuRrr => st.regs.set(i.reg_a, rem_u(b, c)),
        RemuRri => st.regs.set(i.reg_a, rem_u(b, im)),
        RemuRir => st.regs.set(i.reg_a, rem_u(im, b)),

        AndRrr => st.regs.set(i.reg_a, b & c),
        AndRri => st.regs.set(i.reg_a, b & im),
        IorRrr => st.regs.set(i.reg_a, b | c),
        IorRri => st.regs.set(i.reg_a, b | im),
        XorRrr => st.regs.set(i.reg_a, b ^ c),
        XorRri => st.regs.set(i.reg_a, b ^ im),

        LshRrr => st.regs.set(i.reg_a, lsh(b, c)),
        LshRri => st.regs.set(i.reg_a, lsh(b, im)),
        LshRir => st.regs.set(i.reg_a, lsh(im, b)),
        RshsRrr => st.regs.set(i.reg_a, rsh_s(b, c)),
        RshsRri => st.regs.set(i.reg_a, rsh_s(b, im)),
        RshsRir => st.regs.set(i.reg_a, rsh_s(im, b)),
        RshuRrr => st.regs.set(i.reg_a, rsh_u(b, c)),
        RshuRri => st.regs.set(i.reg_a, rsh_u(b, im)),
        RshuRir => st.regs.set(i.reg_a, rsh_u(im, b)),

        CeqRrr => st.regs.set(i.reg_a, (b == c) as u16),
        CeqRri => st.regs.set(i.reg_a, (b == im) as u16),
        CneRrr => st.regs.set(i.reg_a, (b != c) as u16),
        CneRri => st.regs.set(i.reg_a, (b != im) as u16),
        CltsRrr => st.regs.set(i.reg_a, ((b as i16) < (c as i16)) as u16),
        CltsRri => st.regs.set(i.reg_a, ((b as i16) < (im as i16)) as u16),
        CltsRir => st.regs.set(i.reg_a, ((im as i16) < (b as i16)) as u16),
        CltuRrr => st.regs.set(i.reg_a, (b < c) as u16),
        CltuRri => st.regs.set(i.reg_a, (b < im) as u16),
        CltuRir => st.regs.set(i.reg_a, (im < b) as u16),
        CgesRrr => st.regs.set(i.reg_a, ((b as i16) >= (c as i16)) as u16),
        CgesRri => st.regs.set(i.reg_a, ((b as i16) >= (im as i16)) as u16),
        CgesRir => st.regs.set(i.reg_a, ((im as i16) >= (b as i16)) as u16),
        CgeuRrr => st.regs.set(i.reg_a, (b >= c) as u16),
        CgeuRri => st.regs.set(i.reg_a, (b >= im) as u16),
        CgeuRir => st.regs.set(i.reg_a, (im >= b) as u16),

        JmpR => jump(st, a),
        JmpI => jump(st, im),
        JmzRr => {
            if a == 0 {
                st.regs.set(Reg::Ip, b);
            }
        }
        JmzRi => {
            if a == 0 {
                st.regs.set(Reg::Ip, im);
            }
        }
    }
}
