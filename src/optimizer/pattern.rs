//! Pattern rule data model
//!
//! A rule pairs a match sequence with a replace sequence of pattern
//! elements. Elements name their operands through small closed
//! placeholder enumerations; a placeholder bound during matching keeps
//! its concrete value for the rest of the attempt, and the replace
//! sequence reuses those bindings. The model is pure data; the matcher
//! and synthesizer interpret it.
//!
//! Building a rule precomputes, per symbolic register, the smallest
//! register field width among the replacement opcodes that mention it.
//! The matcher refuses to bind a register number that would not fit that
//! encoding.

use smallvec::SmallVec;

use crate::ir::{MethodId, Opcode};

use super::matcher::Matcher;

/// Number of slots needed to index bindings by `SymReg` discriminant
pub(crate) const REGISTER_SLOTS: usize = 9;

/// Symbolic register placeholders
///
/// Only A-D bind freely. The pair variants name the high half of a wide
/// (64-bit) value whose low half is the base register; a pair binds only
/// to base + 1. Discriminants interleave so that `pair of X == X + 1`,
/// mirroring the consecutive-register encoding of wide values.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymReg {
    A = 1,
    PairA = 2,
    B = 3,
    PairB = 4,
    C = 5,
    PairC = 6,
    D = 7,
    PairD = 8,
}

impl SymReg {
    /// Binding-array slot for this placeholder
    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// The pair register holding the high half of a wide value in `self`
    pub fn pair(self) -> SymReg {
        match self {
            SymReg::A => SymReg::PairA,
            SymReg::B => SymReg::PairB,
            SymReg::C => SymReg::PairC,
            SymReg::D => SymReg::PairD,
            _ => panic!("{:?} is already a pair register", self),
        }
    }

    /// The base register this pair belongs to, `None` for A-D
    pub fn pair_base(self) -> Option<SymReg> {
        match self {
            SymReg::PairA => Some(SymReg::A),
            SymReg::PairB => Some(SymReg::B),
            SymReg::PairC => Some(SymReg::C),
            SymReg::PairD => Some(SymReg::D),
            _ => None,
        }
    }
}

/// Symbolic literal placeholders
///
/// `A` binds to an arbitrary literal during matching. The other variants
/// are replacement directives computed from prior bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymLit {
    /// An arbitrary bindable literal
    A,
    /// Directive: 1 if strings A and B are the same interned handle, else 0
    CompareStringsAB,
    /// Directive: the UTF-16 length of string A
    LengthStringA,
}

impl SymLit {
    /// Binding-array slot, `None` for directives
    #[inline]
    pub(crate) fn bind_index(self) -> Option<usize> {
        match self {
            SymLit::A => Some(0),
            _ => None,
        }
    }
}

/// Number of bindable literal placeholders
pub(crate) const LITERAL_SLOTS: usize = 1;

/// Symbolic string placeholders
///
/// `A` and `B` bind to arbitrary interned strings; `Empty` matches only
/// the interned empty string. Everything else is a replacement directive
/// that synthesizes a new string from prior bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymStr {
    /// An arbitrary bindable string
    A,
    /// A second arbitrary bindable string
    B,
    /// Matches only the empty interned string
    Empty,
    /// Directive: literal A rendered as "true" or "false"
    BooleanAToString,
    /// Directive: literal A as one UTF-16 code unit, in Modified UTF-8
    CharAToString,
    /// Directive: literal A rendered as a decimal i32
    IntAToString,
    /// Directive: literal A rendered as a decimal i64
    LongIntAToString,
    /// Directive: literal A's low 32 bits as an IEEE-754 binary32
    FloatAToString,
    /// Directive: literal A reinterpreted as an IEEE-754 binary64
    DoubleAToString,
    /// Directive: string A followed by string B
    ConcatAB,
    /// Directive: string A followed by literal A as a boolean
    ConcatStringABooleanA,
    /// Directive: string A followed by literal A as a char
    ConcatStringACharA,
    /// Directive: string A followed by literal A as a decimal i32
    ConcatStringAIntA,
    /// Directive: string A followed by literal A as a decimal i64
    ConcatStringALongIntA,
    /// Directive: the simple class name of type A
    TypeASimpleName,
}

impl SymStr {
    /// Binding-array slot, `None` for `Empty` and directives
    #[inline]
    pub(crate) fn bind_index(self) -> Option<usize> {
        match self {
            SymStr::A => Some(0),
            SymStr::B => Some(1),
            _ => None,
        }
    }
}

/// Number of bindable string placeholders
pub(crate) const STRING_SLOTS: usize = 2;

/// Symbolic type placeholders, both bindable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymType {
    A,
    B,
}

impl SymType {
    /// Binding-array slot
    #[inline]
    pub(crate) fn bind_index(self) -> usize {
        self as usize
    }
}

/// Number of bindable type placeholders
pub(crate) const TYPE_SLOTS: usize = 2;

/// The payload a pattern element carries besides its register operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// No payload
    None,
    /// A concrete interned method the instruction must reference
    Method(MethodId),
    /// A symbolic string argument or directive
    String(SymStr),
    /// A symbolic literal argument or directive
    Literal(SymLit),
    /// A symbolic type argument
    Type(SymType),
    /// Replacement-only: clone the matched instruction at this index
    Copy(usize),
}

/// One element of a match or replace sequence
///
/// When matching, any opcode in `opcodes` is accepted; a replacement
/// element must carry exactly one opcode.
#[derive(Debug, Clone)]
pub struct DexPattern {
    /// Accepted opcodes
    pub opcodes: SmallVec<[Opcode; 4]>,
    /// Source register placeholders in operand order
    pub srcs: SmallVec<[SymReg; 4]>,
    /// Destination register placeholder, if the instruction has one
    pub dest: Option<SymReg>,
    /// The element's payload
    pub payload: Payload,
}

impl DexPattern {
    /// Element with no payload
    pub fn new(opcodes: &[Opcode], srcs: &[SymReg], dest: Option<SymReg>) -> Self {
        Self {
            opcodes: SmallVec::from_slice(opcodes),
            srcs: SmallVec::from_slice(srcs),
            dest,
            payload: Payload::None,
        }
    }

    /// Attach a concrete method payload
    pub fn with_method(mut self, method: MethodId) -> Self {
        self.payload = Payload::Method(method);
        self
    }

    /// Attach a symbolic string payload
    pub fn with_string(mut self, string: SymStr) -> Self {
        self.payload = Payload::String(string);
        self
    }

    /// Attach a symbolic literal payload
    pub fn with_literal(mut self, literal: SymLit) -> Self {
        self.payload = Payload::Literal(literal);
        self
    }

    /// Attach a symbolic type payload
    pub fn with_type(mut self, ty: SymType) -> Self {
        self.payload = Payload::Type(ty);
        self
    }

    /// Replacement-only element that re-emits a matched instruction verbatim
    pub fn copy_matched(index: usize) -> Self {
        Self {
            opcodes: SmallVec::new(),
            srcs: SmallVec::new(),
            dest: None,
            payload: Payload::Copy(index),
        }
    }
}

/// Predicate over a completed match, able to veto it
pub type Predicate = fn(&Matcher<'_>) -> bool;

/// A named match/replace rule
#[derive(Debug)]
pub struct Pattern {
    /// Stable rule name; the disable key and statistics label
    pub name: &'static str,
    /// Elements the instruction stream must satisfy in order
    pub match_seq: Vec<DexPattern>,
    /// Elements synthesized on a successful match
    pub replace_seq: Vec<DexPattern>,
    /// Optional veto predicate evaluated once the match completes
    pub predicate: Option<Predicate>,
    /// Whether the rule is in the default enabled set
    pub on_by_default: bool,
    width_limits: [u8; REGISTER_SLOTS],
}

impl Pattern {
    /// Create a rule without a predicate
    pub fn new(
        name: &'static str,
        match_seq: Vec<DexPattern>,
        replace_seq: Vec<DexPattern>,
    ) -> Self {
        let width_limits = compute_width_limits(&replace_seq);
        Self {
            name,
            match_seq,
            replace_seq,
            predicate: None,
            on_by_default: true,
            width_limits,
        }
    }

    /// Create a rule with a veto predicate
    pub fn with_predicate(
        name: &'static str,
        match_seq: Vec<DexPattern>,
        replace_seq: Vec<DexPattern>,
        predicate: Predicate,
    ) -> Self {
        let mut pattern = Self::new(name, match_seq, replace_seq);
        pattern.predicate = Some(predicate);
        pattern
    }

    /// Exclude the rule from the default enabled set
    pub fn off_by_default(mut self) -> Self {
        self.on_by_default = false;
        self
    }

    /// Whether a concrete register number fits every replacement encoding
    /// that mentions the placeholder
    #[inline]
    pub fn register_fits(&self, reg: SymReg, value: u16) -> bool {
        (value as u32) < (1u32 << self.width_limits[reg.index()])
    }

    /// The precomputed width limit for a placeholder, in bits
    #[inline]
    pub fn width_limit(&self, reg: SymReg) -> u8 {
        self.width_limits[reg.index()]
    }
}

/// Fold the replacement opcodes' register field widths into per-register
/// limits; registers not mentioned keep the unrestricted 16
fn compute_width_limits(replace_seq: &[DexPattern]) -> [u8; REGISTER_SLOTS] {
    let mut limits = [16u8; REGISTER_SLOTS];
    for element in replace_seq {
        for &opcode in &element.opcodes {
            let width = opcode.min_reg_bit_width();
            for &reg in &element.srcs {
                let slot = &mut limits[reg.index()];
                *slot = (*slot).min(width);
            }
            if let Some(reg) = element.dest {
                let slot = &mut limits[reg.index()];
                *slot = (*slot).min(width);
            }
        }
    }
    limits
}
