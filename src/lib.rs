pub mod asm;
pub mod cpu;
pub mod decoder;
pub mod disasm;
pub mod exec;
pub mod isa;
pub mod memory;
pub mod parser;
pub mod reg;
pub mod text;

pub use asm::{assemble, AssembleError, AssembledImage, SourceMap};
pub use cpu::{ProcessState, Regs};
pub use decoder::Instr;
pub use isa::{Mnemonic, Opcode};
pub use memory::{Memory, MEMORY_SIZE};
pub use parser::{parse, AssemblyProgram, Diagnostics};
pub use reg::Reg;
pub use text::SourceText;
