//! Streaming pattern matcher
//!
//! One `Matcher` holds the in-progress state of one rule against the
//! instruction stream of the current basic block. Instructions arrive
//! one at a time through `try_match`; placeholders bind on first sight
//! and must agree on every later occurrence.
//!
//! On a mismatch the matcher resets, with one concession borrowed from
//! ProGuard's sweep: if the failure happened on the *second* element, the
//! same instruction is retried against the first element. In the stream
//! `a a b c` against `[a b c]`, `a a` fails at position 1 and the second
//! `a` restarts the match, so `a b c` is still found. The trade-off is
//! that `a b a b c` against `[a b c]` finds nothing (no rescan, search
//! just resumes at the next instruction); that miss is intentional, the
//! scan stays linear with a single-instruction retry.

use tracing::trace;

use crate::ir::{IrContext, IrInstruction, StringId, TypeId};

use super::pattern::{
    DexPattern, Pattern, Payload, SymLit, SymReg, SymStr, SymType, LITERAL_SLOTS, REGISTER_SLOTS,
    STRING_SLOTS, TYPE_SLOTS,
};

/// Matching state for one rule
#[derive(Debug)]
pub struct Matcher<'a> {
    pattern: &'a Pattern,
    ctx: &'a IrContext,
    match_index: usize,
    matched_instructions: Vec<IrInstruction>,
    regs: [Option<u16>; REGISTER_SLOTS],
    strings: [Option<StringId>; STRING_SLOTS],
    literals: [Option<i64>; LITERAL_SLOTS],
    types: [Option<TypeId>; TYPE_SLOTS],
}

impl<'a> Matcher<'a> {
    /// Create a matcher for a rule
    pub fn new(pattern: &'a Pattern, ctx: &'a IrContext) -> Self {
        Self {
            pattern,
            ctx,
            match_index: 0,
            matched_instructions: Vec::new(),
            regs: [None; REGISTER_SLOTS],
            strings: [None; STRING_SLOTS],
            literals: [None; LITERAL_SLOTS],
            types: [None; TYPE_SLOTS],
        }
    }

    /// The rule this matcher runs
    #[inline]
    pub fn pattern(&self) -> &'a Pattern {
        self.pattern
    }

    /// The interner context
    #[inline]
    pub fn context(&self) -> &'a IrContext {
        self.ctx
    }

    /// Instructions matched so far, in match order
    #[inline]
    pub fn matched_instructions(&self) -> &[IrInstruction] {
        &self.matched_instructions
    }

    /// Number of elements matched so far
    #[inline]
    pub fn match_index(&self) -> usize {
        self.match_index
    }

    /// Clear all matching state
    pub fn reset(&mut self) {
        self.match_index = 0;
        self.matched_instructions.clear();
        self.regs = [None; REGISTER_SLOTS];
        self.strings = [None; STRING_SLOTS];
        self.literals = [None; LITERAL_SLOTS];
        self.types = [None; TYPE_SLOTS];
    }

    /// Feed one instruction; true iff it completes the whole match
    pub fn try_match(&mut self, insn: &IrInstruction) -> bool {
        debug_assert!(self.match_index < self.pattern.match_seq.len());

        if !self.match_element(self.match_index, insn) {
            // Retry only when the failure occurs on the second element.
            let retry = self.match_index == 1;
            trace!(
                target: "dexopt::peephole",
                rule = self.pattern.name,
                position = self.match_index,
                insn = %insn,
                "element mismatch"
            );
            self.reset();
            if !retry || !self.match_element(0, insn) {
                return false;
            }
        }

        trace!(
            target: "dexopt::peephole",
            rule = self.pattern.name,
            matched = self.match_index + 1,
            total = self.pattern.match_seq.len(),
            insn = %insn,
            "element matched"
        );
        self.matched_instructions.push(insn.clone());
        self.match_index += 1;

        let done = self.match_index == self.pattern.match_seq.len();

        // A completed match may still be vetoed by the rule's predicate.
        if done {
            if let Some(predicate) = self.pattern.predicate {
                if !predicate(self) {
                    self.reset();
                    return false;
                }
            }
        }
        done
    }

    /// The concrete register bound to a placeholder
    #[inline]
    pub fn bound_reg(&self, reg: SymReg) -> Option<u16> {
        self.regs[reg.index()]
    }

    /// The interned string bound to a placeholder
    #[inline]
    pub fn bound_string(&self, string: SymStr) -> Option<StringId> {
        string.bind_index().and_then(|i| self.strings[i])
    }

    /// The literal bound to a placeholder
    #[inline]
    pub fn bound_literal(&self, literal: SymLit) -> Option<i64> {
        literal.bind_index().and_then(|i| self.literals[i])
    }

    /// The type bound to a placeholder
    #[inline]
    pub fn bound_type(&self, ty: SymType) -> Option<TypeId> {
        self.types[ty.bind_index()]
    }

    /// Match `insn` against one element, binding as a side effect
    fn match_element(&mut self, index: usize, insn: &IrInstruction) -> bool {
        let pattern = self.pattern;
        let element: &DexPattern = &pattern.match_seq[index];

        if !element.opcodes.contains(&insn.opcode())
            || element.srcs.len() != insn.srcs_size()
            || usize::from(element.dest.is_some()) != insn.dests_size()
        {
            return false;
        }

        if let Some(dest_sym) = element.dest {
            let dest = insn.dest().expect("dest count checked above");
            if !self.match_reg(dest_sym, dest) {
                return false;
            }
        }
        for (i, &src_sym) in element.srcs.iter().enumerate() {
            if !self.match_reg(src_sym, insn.src(i)) {
                return false;
            }
        }

        match element.payload {
            Payload::None => true,
            Payload::String(sym) => match insn.string() {
                Some(id) => self.match_string(sym, id),
                None => false,
            },
            Payload::Literal(sym) => self.match_literal(sym, insn.literal()),
            Payload::Method(method) => insn.method() == Some(method),
            Payload::Type(sym) => match insn.type_id() {
                Some(id) => self.match_type(sym, id),
                None => false,
            },
            Payload::Copy(_) => {
                panic!(
                    "rule {}: copy elements are replacement-only, not matchable",
                    self.pattern.name
                )
            }
        }
    }

    fn match_reg(&mut self, sym: SymReg, value: u16) -> bool {
        // Already observed: the occurrences must agree.
        if let Some(bound) = self.regs[sym.index()] {
            return bound == value;
        }

        // A pair register is the high half of its base's wide value.
        if let Some(base) = sym.pair_base() {
            match self.regs[base.index()] {
                Some(low) => {
                    if u32::from(value) != u32::from(low) + 1 {
                        return false;
                    }
                }
                None => return false,
            }
        }

        // Refuse values the replacement encoding could not hold.
        if !self.pattern.register_fits(sym, value) {
            return false;
        }

        self.regs[sym.index()] = Some(value);
        true
    }

    fn match_literal(&mut self, sym: SymLit, value: i64) -> bool {
        let index = sym.bind_index().unwrap_or_else(|| {
            panic!(
                "rule {}: literal directive {:?} cannot appear in a match element",
                self.pattern.name, sym
            )
        });
        match self.literals[index] {
            Some(bound) => bound == value,
            None => {
                self.literals[index] = Some(value);
                true
            }
        }
    }

    fn match_string(&mut self, sym: SymStr, id: StringId) -> bool {
        if sym == SymStr::Empty {
            return id == self.ctx.empty_string();
        }
        let index = sym.bind_index().unwrap_or_else(|| {
            panic!(
                "rule {}: string directive {:?} cannot appear in a match element",
                self.pattern.name, sym
            )
        });
        match self.strings[index] {
            Some(bound) => bound == id,
            None => {
                self.strings[index] = Some(id);
                true
            }
        }
    }

    fn match_type(&mut self, sym: SymType, id: TypeId) -> bool {
        let index = sym.bind_index();
        match self.types[index] {
            Some(bound) => bound == id,
            None => {
                self.types[index] = Some(id);
                true
            }
        }
    }
}
