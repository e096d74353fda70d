//! Peephole optimization over the bytecode IR
//!
//! The pattern engine scans each basic block and replaces short,
//! locally-recognizable instruction sequences with shorter equivalents.
//!
//! # Rule families
//!
//! | Family | Example |
//! |--------|---------|
//! | Nop    | `move v0, v0` → (removed) |
//! | String | `new StringBuilder().append("hi")` → `new StringBuilder("hi")` |
//! | Arith  | `mul-int/lit8 v3, v7, #-1` → `neg-int v3, v7` |
//! | Func   | `const-class` + `Class.getSimpleName()` → the name as a `const-string` |
//!
//! A rule is data: a match sequence and a replace sequence of pattern
//! elements over symbolic placeholders, plus an optional predicate. One
//! `Matcher` per rule streams over each block; the replacement
//! synthesizer materializes instructions from the bindings, evaluating
//! compile-time directives such as string concatenation.
//!
//! Matching is deliberately a single sweep. The only backtrack is a
//! one-instruction retry when a match fails on the second element, which
//! keeps the scan linear at the cost of missing some overlapping
//! matches.

pub mod checkcast;
pub mod matcher;
pub mod pattern;
pub mod peephole;
pub mod rules;
pub mod synthesize;
pub mod types;


pub use checkcast::RedundantCheckCastRemover;
pub use matcher::Matcher;
pub use pattern::{DexPattern, Pattern, Payload, SymLit, SymReg, SymStr, SymType};
pub use peephole::PeepholeOptimizer;
pub use synthesize::synthesize;
pub use types::PeepholeStats;

use tracing::trace;

use crate::config::OptimizerConfig;
use crate::ir::{DexClass, IrContext};

/// Run the peephole pass and, when configured, the check-cast remover
///
/// Returns a snapshot of the peephole statistics.
pub fn run_optimizers(
    ctx: &IrContext,
    scope: &mut [DexClass],
    config: &OptimizerConfig,
) -> PeepholeStats {
    let optimizer = PeepholeOptimizer::new(ctx, config);
    optimizer.run(scope);

    let cast_disabled = config
        .disabled
        .iter()
        .any(|name| name == RedundantCheckCastRemover::NAME);
    if config.run_redundant_cast_remover && !cast_disabled {
        RedundantCheckCastRemover::new().run(scope);
    } else {
        trace!(
            target: "dexopt::checkcast",
            "not running redundant check-cast remover"
        );
    }

    optimizer.stats().clone()
}
