//! IR instruction model
//!
//! A decoded dex instruction with a symbolic opcode and operand fields.
//! This is the view the pattern engine works against: opcode, at most one
//! destination register, ordered source registers, a signed 64-bit
//! literal, and at most one embedded string/type/method handle.
//! Cloning yields an equivalent new instruction.

use std::fmt;

use smallvec::SmallVec;

use super::interner::{MethodId, StringId, TypeId};
use super::opcodes::Opcode;

/// A single IR instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrInstruction {
    opcode: Opcode,
    dest: Option<u16>,
    srcs: SmallVec<[u16; 4]>,
    literal: i64,
    string: Option<StringId>,
    ty: Option<TypeId>,
    method: Option<MethodId>,
}

impl IrInstruction {
    /// Create a bare instruction with no operands
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            dest: None,
            srcs: SmallVec::new(),
            literal: 0,
            string: None,
            ty: None,
            method: None,
        }
    }

    /// Set the destination register
    pub fn with_dest(mut self, reg: u16) -> Self {
        self.dest = Some(reg);
        self
    }

    /// Set the source registers
    pub fn with_srcs(mut self, regs: &[u16]) -> Self {
        self.srcs = SmallVec::from_slice(regs);
        self
    }

    /// Set the literal value
    pub fn with_literal(mut self, literal: i64) -> Self {
        self.literal = literal;
        self
    }

    /// Set the embedded string handle
    pub fn with_string(mut self, string: StringId) -> Self {
        self.string = Some(string);
        self
    }

    /// Set the embedded type handle
    pub fn with_type(mut self, ty: TypeId) -> Self {
        self.ty = Some(ty);
        self
    }

    /// Set the embedded method handle
    pub fn with_method(mut self, method: MethodId) -> Self {
        self.method = Some(method);
        self
    }

    /// The instruction's opcode
    #[inline]
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Number of destination registers (0 or 1)
    #[inline]
    pub fn dests_size(&self) -> usize {
        usize::from(self.dest.is_some())
    }

    /// The destination register, if any
    #[inline]
    pub fn dest(&self) -> Option<u16> {
        self.dest
    }

    /// Number of source registers
    #[inline]
    pub fn srcs_size(&self) -> usize {
        self.srcs.len()
    }

    /// Source register `i`
    #[inline]
    pub fn src(&self, i: usize) -> u16 {
        self.srcs[i]
    }

    /// All source registers
    #[inline]
    pub fn srcs(&self) -> &[u16] {
        &self.srcs
    }

    /// The signed 64-bit literal operand
    #[inline]
    pub fn literal(&self) -> i64 {
        self.literal
    }

    /// The embedded string handle, if any
    #[inline]
    pub fn string(&self) -> Option<StringId> {
        self.string
    }

    /// The embedded type handle, if any
    #[inline]
    pub fn type_id(&self) -> Option<TypeId> {
        self.ty
    }

    /// The embedded method handle, if any
    #[inline]
    pub fn method(&self) -> Option<MethodId> {
        self.method
    }

    /// Overwrite the destination register
    #[inline]
    pub fn set_dest(&mut self, reg: u16) {
        self.dest = Some(reg);
    }

    /// Append a source register
    #[inline]
    pub fn push_src(&mut self, reg: u16) {
        self.srcs.push(reg);
    }

    /// Overwrite the literal operand
    #[inline]
    pub fn set_literal(&mut self, literal: i64) {
        self.literal = literal;
    }

    /// Overwrite the embedded string handle
    #[inline]
    pub fn set_string(&mut self, string: StringId) {
        self.string = Some(string);
    }

    /// Overwrite the embedded type handle
    #[inline]
    pub fn set_type(&mut self, ty: TypeId) {
        self.ty = Some(ty);
    }
}

impl fmt::Display for IrInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        let mut sep = " ";
        if let Some(dest) = self.dest {
            write!(f, "{}v{}", sep, dest)?;
            sep = ", ";
        }
        for src in &self.srcs {
            write!(f, "{}v{}", sep, src)?;
            sep = ", ";
        }
        if self.literal != 0 || matches!(self.opcode, Opcode::Const4 | Opcode::Const16 | Opcode::Const | Opcode::ConstWide16 | Opcode::ConstWide32 | Opcode::ConstWide) {
            write!(f, "{}#{}", sep, self.literal)?;
            sep = ", ";
        }
        if let Some(s) = self.string {
            write!(f, "{}string@{:?}", sep, s)?;
            sep = ", ";
        }
        if let Some(t) = self.ty {
            write!(f, "{}type@{:?}", sep, t)?;
            sep = ", ";
        }
        if let Some(m) = self.method {
            write!(f, "{}method@{:?}", sep, m)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_accessors() {
        let insn = IrInstruction::new(Opcode::MulIntLit8)
            .with_dest(3)
            .with_srcs(&[7])
            .with_literal(-1);
        assert_eq!(insn.opcode(), Opcode::MulIntLit8);
        assert_eq!(insn.dest(), Some(3));
        assert_eq!(insn.dests_size(), 1);
        assert_eq!(insn.srcs_size(), 1);
        assert_eq!(insn.src(0), 7);
        assert_eq!(insn.literal(), -1);
    }

    #[test]
    fn test_clone_is_equivalent() {
        let insn = IrInstruction::new(Opcode::InvokeVirtual).with_srcs(&[1, 2]);
        let copy = insn.clone();
        assert_eq!(insn, copy);
    }

    #[test]
    fn test_display_shape() {
        let insn = IrInstruction::new(Opcode::Move).with_dest(0).with_srcs(&[1]);
        assert_eq!(insn.to_string(), "move v0, v1");
        let c = IrInstruction::new(Opcode::Const4).with_dest(2).with_literal(0);
        assert_eq!(c.to_string(), "const/4 v2, #0");
    }
}
