//! Assembler: walks parsed lines, assigns addresses, matches operand shapes
//! to concrete opcodes, encodes, and back-patches label references.
//!
//! Unlike the parser, assembly is all-or-nothing: the first semantic error
//! aborts the run. Labels are compared by character content and rejected as
//! duplicates at definition time; a name only becomes visible once a
//! code/data line actually marks its byte position.

use thiserror::Error;

use crate::decoder::Instr;
use crate::isa::{self, ImmWidth, Mnemonic, Opcode, OperandSlot};
use crate::memory::{Memory, MEMORY_SIZE};
use crate::parser::{AsmLine, AssemblyProgram, Operand};
use crate::text::Span;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssembleError {
    #[error("{span}: label `{name}` already defined")]
    DuplicateLabel { name: String, span: Span },
    #[error("{span}: undefined label `{name}`")]
    UndefinedLabel { name: String, span: Span },
    #[error("{span}: label address 0x{addr:04X} is below the write cursor 0x{cursor:04X}")]
    AddressTooLow { addr: u16, cursor: u16, span: Span },
    #[error("{span}: consecutive labels with no code or data between them")]
    MultipleLabels { span: Span },
    #[error("{span}: label `{name}` never marks a byte position")]
    DanglingLabel { name: String, span: Span },
    #[error("{span}: program exceeds the 64KB address space")]
    MemoryOverflow { span: Span },
    #[error("{span}: no `{mnemonic}` overload matches these operands")]
    NoMatchingOverload { mnemonic: Mnemonic, span: Span },
    #[error("{span}: immediate {value} does not fit in {bits} bits")]
    ImmOutOfRange { value: i64, bits: u8, span: Span },
}

/// Sorted memory-address to source-line mapping for the emitted bytes.
#[derive(Debug, Default, Clone)]
pub struct SourceMap {
    entries: Vec<(u16, u32)>,
}

impl SourceMap {
    fn push(&mut self, addr: u16, line: u32) {
        self.entries.push((addr, line));
    }

    /// The source line whose emission covers `addr`, if any.
    pub fn line_at(&self, addr: u16) -> Option<u32> {
        let idx = self.entries.partition_point(|&(a, _)| a <= addr);
        idx.checked_sub(1).map(|i| self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, u32)> + '_ {
        self.entries.iter().copied()
    }
}

/// A finished program image: the full 64KB memory plus its source map.
#[derive(Debug, Clone)]
pub struct AssembledImage {
    pub memory: Memory,
    pub source_map: SourceMap,
}

struct LabelDef {
    name: String,
    addr: u16,
}

struct LabelRef {
    name: String,
    patch_at: u16,
    span: Span,
}

struct Assembler {
    mem: Memory,
    cursor: u32,
    // A named label binds to the next emitted byte, not to its own line.
    pending: Option<(String, Span)>,
    labels: Vec<LabelDef>,
    refs: Vec<LabelRef>,
    map: SourceMap,
}

pub fn assemble(prog: &AssemblyProgram) -> Result<AssembledImage, AssembleError> {
    let mut asm = Assembler {
        mem: Memory::new(),
        cursor: 0,
        pending: None,
        labels: Vec::new(),
        refs: Vec::new(),
        map: SourceMap::default(),
    };

    for line in &prog.lines {
        match line {
            AsmLine::Label { name, addr, span } => asm.label_line(name, *addr, *span)?,
            AsmLine::Instr { mnemonic, operands, span } => {
                asm.instr_line(*mnemonic, operands, *span)?
            }
            AsmLine::Data { bytes, span } => asm.data_line(bytes, *span)?,
        }
    }

    if let Some((name, span)) = asm.pending.take() {
        return Err(AssembleError::DanglingLabel { name, span });
    }
    asm.patch_refs()?;

    tracing::debug!(
        labels = asm.labels.len(),
        refs = asm.refs.len(),
        end = asm.cursor,
        "assembly complete"
    );
    Ok(AssembledImage { memory: asm.mem, source_map: asm.map })
}

impl Assembler {
    fn label_line(
        &mut self,
        name: &Option<String>,
        addr: Option<u16>,
        span: Span,
    ) -> Result<(), AssembleError> {
        if let Some(addr) = addr {
            // Explicit addresses may only move the cursor forward.
            if (addr as u32) < self.cursor {
                return Err(AssembleError::AddressTooLow {
                    addr,
                    cursor: self.cursor as u16,
                    span,
                });
            }
            self.cursor = addr as u32;
        }
        if let Some(name) = name {
            if self.labels.iter().any(|l| l.name == *name)
                || self.pending.as_ref().is_some_and(|(p, _)| p == name)
            {
                return Err(AssembleError::DuplicateLabel { name: name.clone(), span });
            }
            if self.pending.is_some() {
                return Err(AssembleError::MultipleLabels { span });
            }
            self.pending = Some((name.clone(), span));
        } else if self.pending.is_some() && addr.is_some() {
            // A pending name followed by a bare address line would leave the
            // name ambiguously placed.
            return Err(AssembleError::MultipleLabels { span });
        }
        Ok(())
    }

    fn bind_pending(&mut self) {
        if let Some((name, _)) = self.pending.take() {
            tracing::trace!(%name, addr = self.cursor, "label bound");
            self.labels.push(LabelDef { name, addr: self.cursor as u16 });
        }
    }

    fn instr_line(
        &mut self,
        mnemonic: Mnemonic,
        operands: &[Operand],
        span: Span,
    ) -> Result<(), AssembleError> {
        self.bind_pending();
        let (shape, opcode) = isa::overloads(mnemonic)
            .find(|(shape, _)| shape_matches(shape, operands))
            .ok_or(AssembleError::NoMatchingOverload { mnemonic, span })?;
        let instr = self.build_instr(opcode, shape, operands)?;
        let (bytes, n) = instr.encode();
        self.emit(&bytes[..n], span)
    }

    fn data_line(&mut self, bytes: &[u8], span: Span) -> Result<(), AssembleError> {
        self.bind_pending();
        self.emit(bytes, span)
    }

    fn emit(&mut self, bytes: &[u8], span: Span) -> Result<(), AssembleError> {
        if self.cursor + bytes.len() as u32 > MEMORY_SIZE as u32 {
            return Err(AssembleError::MemoryOverflow { span });
        }
        self.map.push(self.cursor as u16, span.start.line);
        for &b in bytes {
            self.mem.write_u8(self.cursor as u16, b);
            self.cursor += 1;
        }
        Ok(())
    }

    /// Fill the instruction fields from the operands: registers land in
    /// A, B, C in textual order, immediates in imm-A then imm-B. Label
    /// operands leave a zero placeholder and queue a patch entry.
    fn build_instr(
        &mut self,
        opcode: Opcode,
        shape: &[OperandSlot],
        operands: &[Operand],
    ) -> Result<Instr, AssembleError> {
        let lay = opcode.layout();
        let mut instr = Instr::new(opcode);
        let mut regs = 0usize;
        let mut imms = 0usize;
        for (operand, slot) in operands.iter().zip(shape) {
            match (operand, slot) {
                (Operand::Reg(r, _), OperandSlot::Reg) => {
                    match regs {
                        0 => instr.reg_a = *r,
                        1 => instr.reg_b = *r,
                        _ => instr.reg_c = *r,
                    }
                    regs += 1;
                }
                (Operand::Imm(value, span), OperandSlot::Imm(width)) => {
                    let (lo, hi) = width.range();
                    if *value < lo || *value > hi {
                        return Err(AssembleError::ImmOutOfRange {
                            value: *value,
                            bits: match width {
                                ImmWidth::B4 => 4,
                                ImmWidth::B8 => 8,
                                _ => 16,
                            },
                            span: *span,
                        });
                    }
                    let encoded = match width {
                        ImmWidth::B4 => (*value as u16) & 0xF,
                        ImmWidth::B8 => (*value as u16) & 0xFF,
                        _ => *value as u16,
                    };
                    if imms == 0 {
                        instr.imm_a = encoded;
                    } else {
                        instr.imm_b = encoded;
                    }
                    imms += 1;
                }
                (Operand::Label(name, span), OperandSlot::Imm(_)) => {
                    // shape_matches only lets labels into 16-bit slots.
                    let field_off = if imms == 0 {
                        1
                    } else {
                        1 + lay.imm_a.num_bytes() as u32
                    };
                    self.refs.push(LabelRef {
                        name: name.clone(),
                        patch_at: (self.cursor + field_off) as u16,
                        span: *span,
                    });
                    imms += 1;
                }
                // shape_matches already vetted kind against slot.
                _ => unreachable!("operand/slot mismatch after shape match"),
            }
        }
        Ok(instr)
    }

    fn patch_refs(&mut self) -> Result<(), AssembleError> {
        for r in &self.refs {
            let def = self
                .labels
                .iter()
                .find(|l| l.name == r.name)
                .ok_or_else(|| AssembleError::UndefinedLabel {
                    name: r.name.clone(),
                    span: r.span,
                })?;
            self.mem.write_u16(r.patch_at, def.addr);
        }
        Ok(())
    }
}

fn shape_matches(shape: &[OperandSlot], operands: &[Operand]) -> bool {
    shape.len() == operands.len()
        && shape.iter().zip(operands).all(|(slot, op)| match (slot, op) {
            (OperandSlot::Reg, Operand::Reg(..)) => true,
            (OperandSlot::Imm(_), Operand::Imm(..)) => true,
            // A label resolves to a 16-bit address, so it can only stand in
            // for a full-width immediate.
            (OperandSlot::Imm(ImmWidth::B16), Operand::Label(..)) => true,
            _ => false,
        })
}
