//! The optimization rule catalog
//!
//! Four fixed rule families, declared once at startup and never mutated:
//!
//! | Family | Rules | Effect |
//! |--------|-------|--------|
//! | Nop    | 1     | drop self-moves |
//! | String | 16    | coalesce StringBuilder chains, fold String.valueOf / length / equals over constants |
//! | Arith  | 3     | `x * 1`, `x / 1`, `x + 0` to moves; `x * -1`, `x / -1` to neg-int |
//! | Func   | 1     | fold `Class.getSimpleName()` on a const-class |
//!
//! Rule names are stable: they key the per-rule disable flags and the
//! statistics report. `Remove_AppendEmptyString` ships off by default;
//! enabling it on app packages produced verifier rejections.

use crate::ir::{IrContext, Opcode};

use super::matcher::Matcher;
use super::pattern::{DexPattern, Pattern, SymLit, SymReg, SymStr, SymType};

const JAVA_STRING: &str = "Ljava/lang/String;";
const JAVA_STRING_BUILDER: &str = "Ljava/lang/StringBuilder;";
const JAVA_OBJECT: &str = "Ljava/lang/Object;";
const JAVA_CLASS: &str = "Ljava/lang/Class;";

const ANY_INVOKE: &[Opcode] = &[
    Opcode::InvokeVirtual,
    Opcode::InvokeSuper,
    Opcode::InvokeDirect,
    Opcode::InvokeStatic,
    Opcode::InvokeInterface,
    Opcode::InvokeVirtualRange,
    Opcode::InvokeSuperRange,
    Opcode::InvokeDirectRange,
    Opcode::InvokeStaticRange,
    Opcode::InvokeInterfaceRange,
];

/// Whether a method descriptor names a wide (64-bit) primitive
fn is_wide_param(param_type: &str) -> bool {
    param_type == "J" || param_type == "D"
}

// invoke-direct {instance}, Ljava/lang/StringBuilder;.<init>:()V
fn invoke_string_builder_init(ctx: &IrContext, instance: SymReg) -> DexPattern {
    DexPattern::new(&[Opcode::InvokeDirect], &[instance], None)
        .with_method(ctx.make_method(JAVA_STRING_BUILDER, "<init>", "V", &[]))
}

// invoke-direct {instance, argument},
// Ljava/lang/StringBuilder;.<init>:(Ljava/lang/String;)V
fn invoke_string_builder_init_string(
    ctx: &IrContext,
    instance: SymReg,
    argument: SymReg,
) -> DexPattern {
    DexPattern::new(&[Opcode::InvokeDirect], &[instance, argument], None)
        .with_method(ctx.make_method(JAVA_STRING_BUILDER, "<init>", "V", &[JAVA_STRING]))
}

// invoke-virtual {instance, argument},
// Ljava/lang/StringBuilder;.append:(param_type)Ljava/lang/StringBuilder;
fn invoke_string_builder_append(
    ctx: &IrContext,
    instance: SymReg,
    argument: SymReg,
    param_type: &str,
) -> DexPattern {
    let mut srcs = vec![instance, argument];
    if is_wide_param(param_type) {
        srcs.push(argument.pair());
    }
    DexPattern::new(&[Opcode::InvokeVirtual], &srcs, None).with_method(ctx.make_method(
        JAVA_STRING_BUILDER,
        "append",
        JAVA_STRING_BUILDER,
        &[param_type],
    ))
}

fn invoke_string_value_of(ctx: &IrContext, argument: SymReg, param_type: &str) -> DexPattern {
    let mut srcs = vec![argument];
    if is_wide_param(param_type) {
        srcs.push(argument.pair());
    }
    DexPattern::new(&[Opcode::InvokeStatic], &srcs, None).with_method(ctx.make_method(
        JAVA_STRING,
        "valueOf",
        JAVA_STRING,
        &[param_type],
    ))
}

fn invoke_string_equals(ctx: &IrContext, instance: SymReg, argument: SymReg) -> DexPattern {
    DexPattern::new(&[Opcode::InvokeVirtual], &[instance, argument], None)
        .with_method(ctx.make_method(JAVA_STRING, "equals", "Z", &[JAVA_OBJECT]))
}

fn invoke_string_length(ctx: &IrContext, instance: SymReg) -> DexPattern {
    DexPattern::new(&[Opcode::InvokeVirtual], &[instance], None)
        .with_method(ctx.make_method(JAVA_STRING, "length", "I", &[]))
}

fn invoke_class_get_simple_name(ctx: &IrContext, instance: SymReg) -> DexPattern {
    DexPattern::new(ANY_INVOKE, &[instance], None)
        .with_method(ctx.make_method(JAVA_CLASS, "getSimpleName", JAVA_STRING, &[]))
}

fn const_string(dest: SymReg, string: SymStr) -> DexPattern {
    DexPattern::new(&[Opcode::ConstString], &[], Some(dest)).with_string(string)
}

fn const_class(dest: SymReg, ty: SymType) -> DexPattern {
    DexPattern::new(&[Opcode::ConstClass], &[], Some(dest)).with_type(ty)
}

fn move_result_object(dest: SymReg) -> DexPattern {
    DexPattern::new(&[Opcode::MoveResultObject], &[], Some(dest))
}

fn move_result(dest: SymReg) -> DexPattern {
    DexPattern::new(&[Opcode::MoveResult], &[], Some(dest))
}

fn const_literal(opcode: Opcode, dest: SymReg, literal: SymLit) -> DexPattern {
    DexPattern::new(&[opcode], &[], Some(dest)).with_literal(literal)
}

fn const_wide(dest: SymReg, literal: SymLit) -> DexPattern {
    DexPattern::new(
        &[Opcode::ConstWide16, Opcode::ConstWide32, Opcode::ConstWide],
        &[],
        Some(dest),
    )
    .with_literal(literal)
}

fn const_integer(dest: SymReg, literal: SymLit) -> DexPattern {
    DexPattern::new(&[Opcode::Const4, Opcode::Const16, Opcode::Const], &[], Some(dest))
        .with_literal(literal)
}

fn const_float(dest: SymReg, literal: SymLit) -> DexPattern {
    DexPattern::new(&[Opcode::Const4, Opcode::Const], &[], Some(dest)).with_literal(literal)
}

fn const_char(dest: SymReg, literal: SymLit) -> DexPattern {
    // dx loads the null character with const/4 and other chars with
    // const/16 or const, so a char constant is any integer constant.
    const_integer(dest, literal)
}

fn move_ops(dest: SymReg, src: SymReg) -> DexPattern {
    DexPattern::new(&[Opcode::Move, Opcode::MoveObject], &[src], Some(dest))
}

fn mul_or_div_lit(src: SymReg, dest: SymReg) -> DexPattern {
    DexPattern::new(
        &[
            Opcode::MulIntLit8,
            Opcode::MulIntLit16,
            Opcode::DivIntLit8,
            Opcode::DivIntLit16,
        ],
        &[src],
        Some(dest),
    )
}

fn add_lit(src: SymReg, dest: SymReg) -> DexPattern {
    DexPattern::new(&[Opcode::AddIntLit8, Opcode::AddIntLit16], &[src], Some(dest))
}

/// True when the first matched instruction carries exactly this literal
///
/// The comparison is on the raw signed 64-bit value, so matching -1
/// means -1 and not its unsigned bit pattern.
fn first_literal_is<const VALUE: i64>(m: &Matcher<'_>) -> bool {
    m.matched_instructions()
        .first()
        .is_some_and(|insn| insn.literal() == VALUE)
}

/// Self-move removal
pub fn nop_patterns() -> Vec<Pattern> {
    vec![
        // Remove redundant move and move-object instructions,
        // e.g. move v0, v0
        Pattern::new(
            "Remove_Redundant_Move",
            vec![move_ops(SymReg::A, SymReg::A)],
            vec![],
        ),
    ]
}

/// StringBuilder coalescing and constant String folding
pub fn string_patterns(ctx: &IrContext) -> Vec<Pattern> {
    vec![
        // new StringBuilder().append("...") = new StringBuilder("...")
        Pattern::new(
            "Coalesce_InitVoid_AppendString",
            vec![
                invoke_string_builder_init(ctx, SymReg::A),
                const_string(SymReg::B, SymStr::A),
                invoke_string_builder_append(ctx, SymReg::A, SymReg::B, JAVA_STRING),
                move_result_object(SymReg::A),
            ],
            vec![
                // (3 + 2 + 3 + 1) - (2 + 3) = 4 code unit saving
                const_string(SymReg::B, SymStr::A),
                invoke_string_builder_init_string(ctx, SymReg::A, SymReg::B),
            ],
        ),
        // StringBuilder.append("A").append("B") = StringBuilder.append("AB")
        Pattern::new(
            "Coalesce_AppendString_AppendString",
            vec![
                const_string(SymReg::B, SymStr::A),
                invoke_string_builder_append(ctx, SymReg::A, SymReg::B, JAVA_STRING),
                move_result_object(SymReg::C),
                const_string(SymReg::D, SymStr::B),
                invoke_string_builder_append(ctx, SymReg::C, SymReg::D, JAVA_STRING),
            ],
            vec![
                // 6 code unit saving
                const_string(SymReg::B, SymStr::ConcatAB),
                invoke_string_builder_append(ctx, SymReg::A, SymReg::B, JAVA_STRING),
            ],
        ),
        // "stringA".length() evaluated at compile time
        Pattern::new(
            "CompileTime_StringLength",
            vec![
                const_string(SymReg::A, SymStr::A),
                invoke_string_length(ctx, SymReg::A),
                move_result(SymReg::B),
            ],
            vec![
                // 2 code unit saving; the const-string may become dead code
                const_string(SymReg::A, SymStr::A),
                const_literal(Opcode::Const16, SymReg::B, SymLit::LengthStringA),
            ],
        ),
        // StringBuilder.append("") = nothing. Off by default: the removal
        // produced VerifyErrors in the field.
        Pattern::new(
            "Remove_AppendEmptyString",
            vec![
                const_string(SymReg::B, SymStr::Empty),
                invoke_string_builder_append(ctx, SymReg::A, SymReg::B, JAVA_STRING),
            ],
            vec![],
        )
        .off_by_default(),
        // new StringBuilder().append(char) = new StringBuilder("...")
        Pattern::new(
            "Coalesce_Init_AppendChar",
            vec![
                invoke_string_builder_init(ctx, SymReg::A),
                const_char(SymReg::B, SymLit::A),
                invoke_string_builder_append(ctx, SymReg::A, SymReg::B, "C"),
                move_result_object(SymReg::A),
            ],
            vec![
                // (3 + [1, 2, 3] + 3 + 1) - (2 + 3) = [3, 4, 5] code unit saving
                const_string(SymReg::B, SymStr::CharAToString),
                invoke_string_builder_init_string(ctx, SymReg::A, SymReg::B),
            ],
        ),
        // StringBuilder.append("...").append(int) = StringBuilder.append("...")
        Pattern::new(
            "Coalesce_AppendString_AppendInt",
            vec![
                const_string(SymReg::B, SymStr::A),
                invoke_string_builder_append(ctx, SymReg::A, SymReg::B, JAVA_STRING),
                move_result_object(SymReg::C),
                const_integer(SymReg::D, SymLit::A),
                invoke_string_builder_append(ctx, SymReg::C, SymReg::D, "I"),
            ],
            vec![
                // (2 + 3 + 1 + [1, 2, 3] + 3) - (2 + 3) = [5, 6, 7] code unit saving
                const_string(SymReg::B, SymStr::ConcatStringAIntA),
                invoke_string_builder_append(ctx, SymReg::A, SymReg::B, JAVA_STRING),
            ],
        ),
        // StringBuilder.append("...").append(char) = StringBuilder.append("...")
        Pattern::new(
            "Coalesce_AppendString_AppendChar",
            vec![
                const_string(SymReg::B, SymStr::A),
                invoke_string_builder_append(ctx, SymReg::A, SymReg::B, JAVA_STRING),
                move_result_object(SymReg::C),
                const_char(SymReg::D, SymLit::A),
                invoke_string_builder_append(ctx, SymReg::C, SymReg::D, "C"),
            ],
            vec![
                // (2 + 3 + 1 + [1, 2, 3] + 3) - (2 + 3) = [5, 6, 7] code unit saving
                const_string(SymReg::B, SymStr::ConcatStringACharA),
                invoke_string_builder_append(ctx, SymReg::A, SymReg::B, JAVA_STRING),
            ],
        ),
        // StringBuilder.append("...").append(boolean) = StringBuilder.append("...")
        Pattern::new(
            "Coalesce_AppendString_AppendBoolean",
            vec![
                const_string(SymReg::B, SymStr::A),
                invoke_string_builder_append(ctx, SymReg::A, SymReg::B, JAVA_STRING),
                move_result_object(SymReg::C),
                const_literal(Opcode::Const4, SymReg::D, SymLit::A),
                invoke_string_builder_append(ctx, SymReg::C, SymReg::D, "Z"),
            ],
            vec![
                // (2 + 3 + 1 + 1 + 3) - (2 + 3) = 5 code unit saving
                const_string(SymReg::B, SymStr::ConcatStringABooleanA),
                invoke_string_builder_append(ctx, SymReg::A, SymReg::B, JAVA_STRING),
            ],
        ),
        // StringBuilder.append("...").append(long) = StringBuilder.append("...")
        Pattern::new(
            "Coalesce_AppendString_AppendLongInt",
            vec![
                const_string(SymReg::B, SymStr::A),
                invoke_string_builder_append(ctx, SymReg::A, SymReg::B, JAVA_STRING),
                move_result_object(SymReg::C),
                const_wide(SymReg::D, SymLit::A),
                invoke_string_builder_append(ctx, SymReg::C, SymReg::D, "J"),
            ],
            vec![
                // (2 + 3 + 1 + [2, 3, 5] + 3) - (2 + 3) = [6, 7, 9] code unit saving
                const_string(SymReg::B, SymStr::ConcatStringALongIntA),
                invoke_string_builder_append(ctx, SymReg::A, SymReg::B, JAVA_STRING),
            ],
        ),
        // "stringA".equals("stringB") evaluated at compile time
        Pattern::new(
            "CompileTime_StringCompare",
            vec![
                const_string(SymReg::A, SymStr::A),
                const_string(SymReg::B, SymStr::B),
                invoke_string_equals(ctx, SymReg::A, SymReg::B),
                move_result(SymReg::C),
            ],
            vec![
                // (2 + 2 + 3 + 1) - 1 = 7 code unit saving
                const_literal(Opcode::Const4, SymReg::C, SymLit::CompareStringsAB),
            ],
        ),
        // String.valueOf(true/false) becomes "true" or "false"
        Pattern::new(
            "Replace_ValueOfBoolean",
            vec![
                const_literal(Opcode::Const4, SymReg::A, SymLit::A),
                invoke_string_value_of(ctx, SymReg::A, "Z"),
                move_result_object(SymReg::B),
            ],
            vec![
                // (1 + 3 + 1) - 2 = 3 code unit saving
                const_string(SymReg::B, SymStr::BooleanAToString),
            ],
        ),
        // String.valueOf(char) becomes the character itself
        Pattern::new(
            "Replace_ValueOfChar",
            vec![
                const_char(SymReg::A, SymLit::A),
                invoke_string_value_of(ctx, SymReg::A, "C"),
                move_result_object(SymReg::B),
            ],
            vec![
                // ([1, 2, 3] + 3 + 1) - 2 = [3, 4, 5] code unit saving
                const_string(SymReg::B, SymStr::CharAToString),
            ],
        ),
        // String.valueOf(int) becomes the rendered integer
        Pattern::new(
            "Replace_ValueOfInt",
            vec![
                const_integer(SymReg::A, SymLit::A),
                invoke_string_value_of(ctx, SymReg::A, "I"),
                move_result_object(SymReg::B),
            ],
            vec![
                // ([1, 2, 3] + 3 + 1) - 2 = [3, 4, 5] code unit saving
                const_string(SymReg::B, SymStr::IntAToString),
            ],
        ),
        // String.valueOf(long) becomes the rendered long
        Pattern::new(
            "Replace_ValueOfLongInt",
            vec![
                const_wide(SymReg::A, SymLit::A),
                invoke_string_value_of(ctx, SymReg::A, "J"),
                move_result_object(SymReg::B),
            ],
            vec![
                // ([2, 3, 5] + 3 + 1) - 2 = [4, 5, 7] code unit saving
                const_string(SymReg::B, SymStr::LongIntAToString),
            ],
        ),
        // String.valueOf(float) becomes the rendered float
        Pattern::new(
            "Replace_ValueOfFloat",
            vec![
                const_float(SymReg::A, SymLit::A),
                invoke_string_value_of(ctx, SymReg::A, "F"),
                move_result_object(SymReg::B),
            ],
            vec![
                // ([1, 3] + 3 + 1) - 2 = [3, 5] code unit saving
                const_string(SymReg::B, SymStr::FloatAToString),
            ],
        ),
        // String.valueOf(double) becomes the rendered double
        Pattern::new(
            "Replace_ValueOfDouble",
            vec![
                const_wide(SymReg::A, SymLit::A),
                invoke_string_value_of(ctx, SymReg::A, "D"),
                move_result_object(SymReg::B),
            ],
            vec![
                // ([2, 3, 5] + 3 + 1) - 2 = [4, 5, 7] code unit saving
                const_string(SymReg::B, SymStr::DoubleAToString),
            ],
        ),
    ]
}

/// Identity and negation arithmetic on literal operands
///
/// These emit full 16-bit register moves; a later pass re-tightens the
/// encodings where possible.
pub fn arith_patterns() -> Vec<Pattern> {
    vec![
        // x = y * 1 and x = y / 1 become x = y
        Pattern::with_predicate(
            "Arith_MulDivLit_Pos1",
            vec![mul_or_div_lit(SymReg::A, SymReg::B)],
            vec![DexPattern::new(&[Opcode::Move16], &[SymReg::A], Some(SymReg::B))],
            first_literal_is::<1>,
        ),
        // x = y * -1 and x = y / -1 become x = -y
        Pattern::with_predicate(
            "Arith_MulDivLit_Neg1",
            vec![mul_or_div_lit(SymReg::A, SymReg::B)],
            vec![DexPattern::new(&[Opcode::NegInt], &[SymReg::A], Some(SymReg::B))],
            first_literal_is::<{ -1 }>,
        ),
        // x = y + 0 becomes x = y
        Pattern::with_predicate(
            "Arith_AddLit_0",
            vec![add_lit(SymReg::A, SymReg::B)],
            vec![DexPattern::new(&[Opcode::Move16], &[SymReg::A], Some(SymReg::B))],
            first_literal_is::<0>,
        ),
    ]
}

/// Reflection folding
pub fn func_patterns(ctx: &IrContext) -> Vec<Pattern> {
    vec![
        // const-class + Class.getSimpleName() becomes the name as a
        // const-string. The const-class is re-emitted verbatim: other code
        // may still read its register, and dead code elimination cleans it
        // up later if nothing does.
        Pattern::new(
            "Remove_LangClass_GetSimpleName",
            vec![
                const_class(SymReg::A, SymType::A),
                invoke_class_get_simple_name(ctx, SymReg::A),
                move_result_object(SymReg::B),
            ],
            vec![
                DexPattern::copy_matched(0),
                const_string(SymReg::B, SymStr::TypeASimpleName),
            ],
        ),
    ]
}

/// The whole catalog in matching priority order
pub fn all_patterns(ctx: &IrContext) -> Vec<Pattern> {
    let mut patterns = nop_patterns();
    patterns.extend(string_patterns(ctx));
    patterns.extend(arith_patterns());
    patterns.extend(func_patterns(ctx));
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::pattern::Payload;

    #[test]
    fn test_catalog_names_are_unique() {
        let ctx = IrContext::new();
        let patterns = all_patterns(&ctx);
        let mut names: Vec<_> = patterns.iter().map(|p| p.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), patterns.len());
    }

    #[test]
    fn test_replacements_never_grow() {
        let ctx = IrContext::new();
        for pattern in all_patterns(&ctx) {
            assert!(
                pattern.replace_seq.len() <= pattern.match_seq.len(),
                "{} grows code",
                pattern.name
            );
        }
    }

    #[test]
    fn test_replacement_opcode_sets_are_singletons() {
        let ctx = IrContext::new();
        for pattern in all_patterns(&ctx) {
            for element in &pattern.replace_seq {
                if matches!(element.payload, Payload::Copy(_)) {
                    continue;
                }
                assert_eq!(
                    element.opcodes.len(),
                    1,
                    "{} has a non-singleton replacement opcode set",
                    pattern.name
                );
            }
        }
    }

    #[test]
    fn test_append_empty_string_is_off_by_default() {
        let ctx = IrContext::new();
        let patterns = all_patterns(&ctx);
        let rule = patterns
            .iter()
            .find(|p| p.name == "Remove_AppendEmptyString")
            .expect("rule should stay in the catalog");
        assert!(!rule.on_by_default);
        assert!(patterns
            .iter()
            .filter(|p| p.name != "Remove_AppendEmptyString")
            .all(|p| p.on_by_default));
    }

    #[test]
    fn test_wide_append_binds_pair_register() {
        let ctx = IrContext::new();
        let element = invoke_string_builder_append(&ctx, SymReg::A, SymReg::B, "J");
        assert_eq!(element.srcs.as_slice(), &[SymReg::A, SymReg::B, SymReg::PairB]);
        let narrow = invoke_string_builder_append(&ctx, SymReg::A, SymReg::B, "I");
        assert_eq!(narrow.srcs.as_slice(), &[SymReg::A, SymReg::B]);
    }
}
