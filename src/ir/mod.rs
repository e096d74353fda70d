//! Register-based bytecode IR
//!
//! The IR layer the optimizer consumes: opcodes with their register
//! field widths, the instruction model, interned string/type/method
//! tables, basic blocks, and the class/method scope walker.

pub mod block;
pub mod instruction;
pub mod interner;
pub mod mutf8;
pub mod opcodes;
pub mod scope;

pub use block::{BasicBlock, MethodCode};
pub use instruction::IrInstruction;
pub use interner::{IrContext, MethodId, MethodRef, StringId, TypeId};
pub use opcodes::Opcode;
pub use scope::{walk_code, DexClass, DexMethod};
