use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use dexopt::config::OptimizerConfig;
use dexopt::ir::{IrContext, IrInstruction, MethodCode, Opcode};
use dexopt::optimizer::PeepholeOptimizer;

const JAVA_STRING: &str = "Ljava/lang/String;";
const JAVA_STRING_BUILDER: &str = "Ljava/lang/StringBuilder;";

/// Generate a method body with `n` repetitions of a mixed workload:
/// one coalescible StringBuilder chain, one self-move, one foldable
/// multiply, and some instructions nothing matches.
fn generate_body(ctx: &IrContext, n: usize) -> Vec<IrInstruction> {
    let init = ctx.make_method(JAVA_STRING_BUILDER, "<init>", "V", &[]);
    let append = ctx.make_method(
        JAVA_STRING_BUILDER,
        "append",
        JAVA_STRING_BUILDER,
        &[JAVA_STRING],
    );
    let mut insns = Vec::with_capacity(n * 9);
    for i in 0..n {
        insns.push(IrInstruction::new(Opcode::InvokeDirect).with_srcs(&[1]).with_method(init));
        insns.push(
            IrInstruction::new(Opcode::ConstString)
                .with_dest(2)
                .with_string(ctx.make_string(&format!("chunk-{}", i))),
        );
        insns.push(IrInstruction::new(Opcode::InvokeVirtual).with_srcs(&[1, 2]).with_method(append));
        insns.push(IrInstruction::new(Opcode::MoveResultObject).with_dest(1));
        insns.push(IrInstruction::new(Opcode::Move).with_dest(4).with_srcs(&[4]));
        insns.push(
            IrInstruction::new(Opcode::MulIntLit8)
                .with_dest(5)
                .with_srcs(&[6])
                .with_literal(1),
        );
        insns.push(IrInstruction::new(Opcode::Const16).with_dest(7).with_literal(i as i64));
        insns.push(IrInstruction::new(Opcode::Move).with_dest(8).with_srcs(&[7]));
        insns.push(IrInstruction::new(Opcode::AddIntLit8).with_dest(7).with_srcs(&[8]).with_literal(3));
    }
    insns
}

fn bench_optimize_method(c: &mut Criterion) {
    let mut group = c.benchmark_group("peephole_optimize_method");
    let ctx = IrContext::new();
    let config = OptimizerConfig::default();
    let optimizer = PeepholeOptimizer::new(&ctx, &config);

    for size in [16, 128, 1024].iter() {
        let body = generate_body(&ctx, *size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut code = MethodCode::from_instructions(black_box(body.clone()));
                optimizer.optimize_code(&mut code);
                black_box(code.instruction_count())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_optimize_method);
criterion_main!(benches);
