//! dexopt - a peephole optimizer for register-based dex bytecode
//!
//! This library post-processes the IR of compiled app packages,
//! shrinking method bodies by rewriting short instruction sequences:
//! StringBuilder chains are coalesced, `String.valueOf`/`length`/`equals`
//! over constants fold at compile time, self-moves disappear, and
//! multiplications by ±1 become moves or negations.
//!
//! # Architecture
//!
//! - [`ir`] - the instruction model the passes consume: opcodes with
//!   their register field widths, interned string/type/method tables,
//!   basic blocks, and the class/method scope walker.
//! - [`optimizer`] - the pattern engine (rule DSL, streaming matcher,
//!   replacement synthesizer), the fixed rule catalog, the per-method
//!   driver, and the follow-up check-cast remover.
//! - [`config`] - per-rule disable flags and pass selection.
//!
//! # Example
//!
//! ```
//! use dexopt::config::OptimizerConfig;
//! use dexopt::ir::{DexClass, DexMethod, IrContext, IrInstruction, MethodCode, Opcode};
//! use dexopt::optimizer::run_optimizers;
//!
//! let ctx = IrContext::new();
//! // move v4, v4 is a self-move; the pass deletes it.
//! let code = MethodCode::from_instructions(vec![
//!     IrInstruction::new(Opcode::Move).with_dest(4).with_srcs(&[4]),
//!     IrInstruction::new(Opcode::ReturnVoid),
//! ]);
//! let mut scope = vec![DexClass::new(
//!     "LExample;",
//!     vec![DexMethod::with_code("test", code)],
//! )];
//!
//! let stats = run_optimizers(&ctx, &mut scope, &OptimizerConfig::default());
//! assert_eq!(stats.instructions_removed(), 1);
//! ```

pub mod config;
pub mod ir;
pub mod optimizer;

pub use config::OptimizerConfig;
pub use ir::{DexClass, DexMethod, IrContext, IrInstruction, MethodCode, Opcode};
pub use optimizer::{run_optimizers, PeepholeOptimizer, PeepholeStats};
