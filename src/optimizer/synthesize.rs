//! Replacement synthesis
//!
//! Once a matcher reports a full match, this module materializes the
//! rule's replace sequence: a skeleton instruction per element, operands
//! substituted from the bindings, and directive payloads evaluated at
//! compile time (string concatenation, number rendering, interned string
//! comparison). `copy` elements re-emit a matched instruction verbatim.
//!
//! Every failure mode here is a defect in a rule declaration, not a
//! runtime condition, so this module panics instead of returning errors.

use crate::ir::{mutf8, IrContext, IrInstruction, Opcode, StringId, TypeId};

use super::matcher::Matcher;
use super::pattern::{DexPattern, Payload, SymLit, SymStr, SymType};

/// Build the replacement instructions for a completed match
pub fn synthesize(matcher: &Matcher<'_>) -> Vec<IrInstruction> {
    let pattern = matcher.pattern();
    assert_eq!(
        matcher.match_index(),
        pattern.match_seq.len(),
        "rule {}: synthesis requires a completed match",
        pattern.name
    );

    let mut replacements = Vec::with_capacity(pattern.replace_seq.len());
    for element in &pattern.replace_seq {
        // Copy elements clone the matched instruction unchanged.
        if let Payload::Copy(index) = element.payload {
            let matched = matcher.matched_instructions().get(index).unwrap_or_else(|| {
                panic!(
                    "rule {}: copy index {} out of range",
                    pattern.name, index
                )
            });
            replacements.push(matched.clone());
            continue;
        }

        let mut insn = skeleton(pattern.name, element);

        if let Some(dest_sym) = element.dest {
            let dest = matcher.bound_reg(dest_sym).unwrap_or_else(|| {
                panic!(
                    "rule {}: replacement references unbound register {:?}",
                    pattern.name, dest_sym
                )
            });
            insn.set_dest(dest);
        }
        for &src_sym in &element.srcs {
            let src = matcher.bound_reg(src_sym).unwrap_or_else(|| {
                panic!(
                    "rule {}: replacement references unbound register {:?}",
                    pattern.name, src_sym
                )
            });
            insn.push_src(src);
        }

        match element.payload {
            Payload::None | Payload::Method(_) => {}
            Payload::String(sym) => {
                let id = eval_string_directive(matcher, sym);
                insn.set_string(id);
            }
            Payload::Literal(sym) => {
                let value = eval_literal_directive(matcher, sym);
                insn.set_literal(value);
            }
            Payload::Type(sym) => {
                let id = bound_type(matcher, sym);
                insn.set_type(id);
            }
            Payload::Copy(_) => unreachable!("handled above"),
        }
        replacements.push(insn);
    }
    replacements
}

/// Construct the bare instruction for a replacement element
fn skeleton(rule: &str, element: &DexPattern) -> IrInstruction {
    assert_eq!(
        element.opcodes.len(),
        1,
        "rule {}: replacement element must have a unique opcode",
        rule
    );
    let opcode = element.opcodes[0];
    match opcode {
        Opcode::InvokeDirect | Opcode::InvokeStatic | Opcode::InvokeVirtual => {
            let Payload::Method(method) = element.payload else {
                panic!("rule {}: {} replacement needs a method payload", rule, opcode);
            };
            IrInstruction::new(opcode).with_method(method)
        }
        Opcode::Move16 | Opcode::MoveResult | Opcode::MoveResultObject | Opcode::NegInt => {
            assert!(
                matches!(element.payload, Payload::None),
                "rule {}: {} replacement takes no payload",
                rule,
                opcode
            );
            IrInstruction::new(opcode)
        }
        Opcode::ConstString => {
            assert!(
                matches!(element.payload, Payload::String(_)),
                "rule {}: const-string replacement needs a string payload",
                rule
            );
            IrInstruction::new(opcode)
        }
        Opcode::Const4 | Opcode::Const16 | Opcode::Const => {
            assert!(
                matches!(element.payload, Payload::Literal(_)),
                "rule {}: {} replacement needs a literal payload",
                rule,
                opcode
            );
            IrInstruction::new(opcode)
        }
        other => panic!("rule {}: unsupported replacement opcode {}", rule, other),
    }
}

fn bound_string(matcher: &Matcher<'_>, sym: SymStr) -> StringId {
    matcher.bound_string(sym).unwrap_or_else(|| {
        panic!(
            "rule {}: replacement references unbound string {:?}",
            matcher.pattern().name,
            sym
        )
    })
}

fn bound_literal(matcher: &Matcher<'_>) -> i64 {
    matcher.bound_literal(SymLit::A).unwrap_or_else(|| {
        panic!(
            "rule {}: replacement references unbound literal A",
            matcher.pattern().name
        )
    })
}

fn bound_type(matcher: &Matcher<'_>, sym: SymType) -> TypeId {
    matcher.bound_type(sym).unwrap_or_else(|| {
        panic!(
            "rule {}: replacement references unbound type {:?}",
            matcher.pattern().name,
            sym
        )
    })
}

/// Render literal A the way the boolean directives do
fn render_boolean(literal: i64) -> &'static str {
    if literal != 0 {
        "true"
    } else {
        "false"
    }
}

/// Evaluate a string payload into an interned string
fn eval_string_directive(matcher: &Matcher<'_>, sym: SymStr) -> StringId {
    let ctx = matcher.context();
    match sym {
        SymStr::A | SymStr::B => bound_string(matcher, sym),
        SymStr::Empty => panic!(
            "rule {}: Empty is a match-only placeholder",
            matcher.pattern().name
        ),
        SymStr::BooleanAToString => ctx.make_string(render_boolean(bound_literal(matcher))),
        SymStr::CharAToString => {
            let mut bytes = Vec::with_capacity(3);
            mutf8::encode_code_unit(bound_literal(matcher) as u16, &mut bytes);
            ctx.make_string_from_mutf8(bytes)
        }
        SymStr::IntAToString => ctx.make_string(&(bound_literal(matcher) as i32).to_string()),
        SymStr::LongIntAToString => ctx.make_string(&bound_literal(matcher).to_string()),
        SymStr::FloatAToString => {
            let value = f32::from_bits(bound_literal(matcher) as u32);
            ctx.make_string(&format!("{:.6}", value))
        }
        SymStr::DoubleAToString => {
            let value = f64::from_bits(bound_literal(matcher) as u64);
            ctx.make_string(&format!("{:.6}", value))
        }
        SymStr::ConcatAB => {
            let a = ctx.string_data(bound_string(matcher, SymStr::A));
            let b = ctx.string_data(bound_string(matcher, SymStr::B));
            let mut bytes = Vec::with_capacity(a.len() + b.len());
            bytes.extend_from_slice(&a);
            bytes.extend_from_slice(&b);
            ctx.make_string_from_mutf8(bytes)
        }
        SymStr::ConcatStringABooleanA => {
            concat_with(ctx, matcher, render_boolean(bound_literal(matcher)).as_bytes())
        }
        SymStr::ConcatStringACharA => {
            let mut suffix = Vec::with_capacity(3);
            mutf8::encode_code_unit(bound_literal(matcher) as u16, &mut suffix);
            concat_with(ctx, matcher, &suffix)
        }
        SymStr::ConcatStringAIntA => {
            concat_with(ctx, matcher, (bound_literal(matcher) as i32).to_string().as_bytes())
        }
        SymStr::ConcatStringALongIntA => {
            concat_with(ctx, matcher, bound_literal(matcher).to_string().as_bytes())
        }
        SymStr::TypeASimpleName => ctx.type_simple_name(bound_type(matcher, SymType::A)),
    }
}

/// Concatenate string A's bytes with a rendered suffix
fn concat_with(ctx: &IrContext, matcher: &Matcher<'_>, suffix: &[u8]) -> StringId {
    let a = ctx.string_data(bound_string(matcher, SymStr::A));
    let mut bytes = Vec::with_capacity(a.len() + suffix.len());
    bytes.extend_from_slice(&a);
    bytes.extend_from_slice(suffix);
    ctx.make_string_from_mutf8(bytes)
}

/// Evaluate a literal payload into a concrete value
fn eval_literal_directive(matcher: &Matcher<'_>, sym: SymLit) -> i64 {
    let ctx = matcher.context();
    match sym {
        SymLit::A => bound_literal(matcher),
        // Interning makes handle equality string equality.
        SymLit::CompareStringsAB => {
            let a = bound_string(matcher, SymStr::A);
            let b = bound_string(matcher, SymStr::B);
            i64::from(a == b)
        }
        SymLit::LengthStringA => {
            ctx.string_code_units(bound_string(matcher, SymStr::A)) as i64
        }
    }
}
