//! End-to-end scenarios through the public optimizer API
//!
//! Each scenario builds a small scope with literal IR, runs the passes,
//! and checks the rewritten method bodies and the reported statistics.

use dexopt::config::OptimizerConfig;
use dexopt::ir::{DexClass, DexMethod, IrContext, IrInstruction, MethodCode, Opcode};
use dexopt::optimizer::{run_optimizers, RedundantCheckCastRemover};

const JAVA_STRING: &str = "Ljava/lang/String;";
const JAVA_STRING_BUILDER: &str = "Ljava/lang/StringBuilder;";
const JAVA_OBJECT: &str = "Ljava/lang/Object;";

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn scope_with(code: MethodCode) -> Vec<DexClass> {
    vec![DexClass::new(
        "LExample;",
        vec![DexMethod::with_code("test", code)],
    )]
}

fn method_body(scope: &[DexClass]) -> Vec<IrInstruction> {
    scope[0].methods[0].code.as_ref().unwrap().flatten()
}

fn const_str(ctx: &IrContext, dest: u16, value: &str) -> IrInstruction {
    IrInstruction::new(Opcode::ConstString)
        .with_dest(dest)
        .with_string(ctx.make_string(value))
}

#[test]
fn coalesce_init_void_append_string() {
    init_logging();
    let ctx = IrContext::new();
    let init = IrInstruction::new(Opcode::InvokeDirect)
        .with_srcs(&[1])
        .with_method(ctx.make_method(JAVA_STRING_BUILDER, "<init>", "V", &[]));
    let append = IrInstruction::new(Opcode::InvokeVirtual)
        .with_srcs(&[1, 2])
        .with_method(ctx.make_method(
            JAVA_STRING_BUILDER,
            "append",
            JAVA_STRING_BUILDER,
            &[JAVA_STRING],
        ));
    let mut scope = scope_with(MethodCode::from_instructions(vec![
        init,
        const_str(&ctx, 2, "hi"),
        append,
        IrInstruction::new(Opcode::MoveResultObject).with_dest(1),
    ]));

    let stats = run_optimizers(&ctx, &mut scope, &OptimizerConfig::default());

    let init_string = IrInstruction::new(Opcode::InvokeDirect)
        .with_srcs(&[1, 2])
        .with_method(ctx.make_method(JAVA_STRING_BUILDER, "<init>", "V", &[JAVA_STRING]));
    assert_eq!(method_body(&scope), vec![const_str(&ctx, 2, "hi"), init_string]);
    assert_eq!(stats.fires_for("Coalesce_InitVoid_AppendString"), 1);
    assert_eq!(stats.instructions_removed(), 4);
    assert_eq!(stats.instructions_inserted(), 2);
    assert_eq!(stats.net_change(), -2);
}

#[test]
fn compile_time_string_compare() {
    init_logging();
    let ctx = IrContext::new();
    let equals = IrInstruction::new(Opcode::InvokeVirtual)
        .with_srcs(&[0, 1])
        .with_method(ctx.make_method(JAVA_STRING, "equals", "Z", &[JAVA_OBJECT]));
    let mut scope = scope_with(MethodCode::from_instructions(vec![
        const_str(&ctx, 0, "x"),
        const_str(&ctx, 1, "x"),
        equals,
        IrInstruction::new(Opcode::MoveResult).with_dest(2),
    ]));

    run_optimizers(&ctx, &mut scope, &OptimizerConfig::default());

    assert_eq!(
        method_body(&scope),
        vec![IrInstruction::new(Opcode::Const4).with_dest(2).with_literal(1)]
    );
}

#[test]
fn arith_mul_by_minus_one_negates() {
    init_logging();
    let ctx = IrContext::new();
    let mut scope = scope_with(MethodCode::from_instructions(vec![
        IrInstruction::new(Opcode::MulIntLit8)
            .with_dest(3)
            .with_srcs(&[7])
            .with_literal(-1),
        IrInstruction::new(Opcode::Return).with_srcs(&[3]),
    ]));

    let stats = run_optimizers(&ctx, &mut scope, &OptimizerConfig::default());

    assert_eq!(
        method_body(&scope),
        vec![
            IrInstruction::new(Opcode::NegInt).with_dest(3).with_srcs(&[7]),
            IrInstruction::new(Opcode::Return).with_srcs(&[3]),
        ]
    );
    assert_eq!(stats.fires_for("Arith_MulDivLit_Neg1"), 1);
}

#[test]
fn redundant_move_is_deleted() {
    init_logging();
    let ctx = IrContext::new();
    let mut scope = scope_with(MethodCode::from_instructions(vec![
        IrInstruction::new(Opcode::Move).with_dest(4).with_srcs(&[4]),
        IrInstruction::new(Opcode::ReturnVoid),
    ]));

    let stats = run_optimizers(&ctx, &mut scope, &OptimizerConfig::default());

    assert_eq!(
        method_body(&scope),
        vec![IrInstruction::new(Opcode::ReturnVoid)]
    );
    assert_eq!(stats.fires_for("Remove_Redundant_Move"), 1);
}

#[test]
fn disabled_rule_never_fires() {
    init_logging();
    let ctx = IrContext::new();
    let insns = vec![
        IrInstruction::new(Opcode::Move).with_dest(4).with_srcs(&[4]),
        IrInstruction::new(Opcode::ReturnVoid),
    ];
    let mut scope = scope_with(MethodCode::from_instructions(insns.clone()));
    let config = OptimizerConfig::default().disable("Remove_Redundant_Move");

    let stats = run_optimizers(&ctx, &mut scope, &config);

    assert_eq!(method_body(&scope), insns);
    assert_eq!(stats.fires_for("Remove_Redundant_Move"), 0);
    assert_eq!(stats.total_fires(), 0);
}

#[test]
fn abstract_methods_are_skipped() {
    init_logging();
    let ctx = IrContext::new();
    let mut scope = vec![DexClass::new(
        "LExample;",
        vec![DexMethod::abstract_method("todo")],
    )];

    let stats = run_optimizers(&ctx, &mut scope, &OptimizerConfig::default());
    assert_eq!(stats.total_fires(), 0);
}

#[test]
fn check_cast_remover_runs_after_peephole() {
    init_logging();
    let ctx = IrContext::new();
    let ty = ctx.make_type("Ljava/lang/String;");
    let cast = IrInstruction::new(Opcode::CheckCast)
        .with_srcs(&[0])
        .with_type(ty);
    let mut scope = scope_with(MethodCode::from_instructions(vec![
        cast.clone(),
        cast.clone(),
        IrInstruction::new(Opcode::ReturnVoid),
    ]));

    run_optimizers(&ctx, &mut scope, &OptimizerConfig::default());

    assert_eq!(
        method_body(&scope),
        vec![cast, IrInstruction::new(Opcode::ReturnVoid)]
    );
}

#[test]
fn check_cast_remover_can_be_disabled_by_flag_or_name() {
    init_logging();
    let ctx = IrContext::new();
    let ty = ctx.make_type("Ljava/lang/String;");
    let cast = IrInstruction::new(Opcode::CheckCast)
        .with_srcs(&[0])
        .with_type(ty);
    let insns = vec![cast.clone(), cast, IrInstruction::new(Opcode::ReturnVoid)];

    let mut scope = scope_with(MethodCode::from_instructions(insns.clone()));
    let mut config = OptimizerConfig::default();
    config.run_redundant_cast_remover = false;
    run_optimizers(&ctx, &mut scope, &config);
    assert_eq!(method_body(&scope), insns);

    let mut scope = scope_with(MethodCode::from_instructions(insns.clone()));
    let config = OptimizerConfig::default().disable(RedundantCheckCastRemover::NAME);
    run_optimizers(&ctx, &mut scope, &config);
    assert_eq!(method_body(&scope), insns);
}

#[test]
fn firings_accumulate_across_methods() {
    init_logging();
    let ctx = IrContext::new();
    let self_move = || {
        MethodCode::from_instructions(vec![
            IrInstruction::new(Opcode::Move).with_dest(0).with_srcs(&[0]),
            IrInstruction::new(Opcode::ReturnVoid),
        ])
    };
    let mut scope = vec![
        DexClass::new(
            "LAlpha;",
            vec![
                DexMethod::with_code("a", self_move()),
                DexMethod::with_code("b", self_move()),
            ],
        ),
        DexClass::new("LBeta;", vec![DexMethod::with_code("c", self_move())]),
    ];

    let stats = run_optimizers(&ctx, &mut scope, &OptimizerConfig::default());

    assert_eq!(stats.fires_for("Remove_Redundant_Move"), 3);
    assert_eq!(stats.instructions_removed(), 3);
    assert_eq!(stats.instructions_inserted(), 0);
}

#[test]
fn config_from_json_drives_the_pass() {
    init_logging();
    let ctx = IrContext::new();
    let config = OptimizerConfig::from_json(
        r#"{"disabled": ["Remove_Redundant_Move", "Not_A_Rule"]}"#,
    )
    .unwrap();
    let insns = vec![
        IrInstruction::new(Opcode::Move).with_dest(1).with_srcs(&[1]),
        IrInstruction::new(Opcode::ReturnVoid),
    ];
    let mut scope = scope_with(MethodCode::from_instructions(insns.clone()));

    let stats = run_optimizers(&ctx, &mut scope, &config);

    // The unknown name is ignored; the known one disables its rule.
    assert_eq!(method_body(&scope), insns);
    assert_eq!(stats.total_fires(), 0);
}
