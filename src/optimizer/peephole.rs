//! The per-method peephole driver
//!
//! For every method body: reset all matchers at each block boundary,
//! feed the block's instructions in program order to every enabled
//! matcher in catalog order, and let the first full match win. Edits are
//! queued during traversal and applied back-to-front after the block
//! loop so instruction indices stay valid.
//!
//! Matchers are built per method invocation, so a caller may shard
//! methods across threads over one shared optimizer: the only shared
//! state is the interner and the atomic statistics.

use tracing::{debug, trace};

use crate::config::OptimizerConfig;
use crate::ir::{walk_code, BasicBlock, DexClass, IrContext, IrInstruction, MethodCode};

use super::matcher::Matcher;
use super::pattern::Pattern;
use super::rules;
use super::synthesize::synthesize;
use super::types::PeepholeStats;

/// One queued block edit: delete the matched range, insert the
/// replacement in its place
struct BlockEdit {
    start: usize,
    len: usize,
    replacement: Vec<IrInstruction>,
}

/// The peephole optimization pass
pub struct PeepholeOptimizer<'c> {
    ctx: &'c IrContext,
    patterns: Vec<Pattern>,
    stats: PeepholeStats,
}

impl<'c> PeepholeOptimizer<'c> {
    /// Build the pass with the catalog filtered by the configuration
    pub fn new(ctx: &'c IrContext, config: &OptimizerConfig) -> Self {
        let mut patterns = rules::all_patterns(ctx);

        for name in &config.disabled {
            if name != super::checkcast::RedundantCheckCastRemover::NAME
                && !patterns.iter().any(|p| p.name == name)
            {
                trace!(
                    target: "dexopt::peephole",
                    rule = %name,
                    "ignoring unknown disabled rule name"
                );
            }
        }

        patterns.retain(|pattern| {
            let wanted = pattern.on_by_default
                || config.enabled.iter().any(|name| name == pattern.name);
            let enabled = wanted && !config.disabled.iter().any(|name| name == pattern.name);
            if !enabled {
                trace!(
                    target: "dexopt::peephole",
                    rule = pattern.name,
                    "not running disabled rule"
                );
            }
            enabled
        });

        let stats = PeepholeStats::new(patterns.iter().map(|p| p.name).collect());
        Self {
            ctx,
            patterns,
            stats,
        }
    }

    /// Statistics collected so far
    pub fn stats(&self) -> &PeepholeStats {
        &self.stats
    }

    /// Run the pass over every method in the scope, then report
    pub fn run(&self, scope: &mut [DexClass]) {
        walk_code(scope, |name, code| {
            trace!(target: "dexopt::peephole", method = name, "optimizing method");
            self.optimize_code(code);
        });
        self.report_stats();
    }

    /// Optimize a single method body
    pub fn optimize_code(&self, code: &mut MethodCode) {
        let mut matchers: Vec<Matcher<'_>> = self
            .patterns
            .iter()
            .map(|pattern| Matcher::new(pattern, self.ctx))
            .collect();

        for block in code.blocks_mut() {
            self.optimize_block(&mut matchers, block);
        }
    }

    fn optimize_block(&self, matchers: &mut [Matcher<'_>], block: &mut BasicBlock) {
        // Patterns never span blocks; every block starts from scratch.
        for matcher in matchers.iter_mut() {
            matcher.reset();
        }

        let mut edits: Vec<BlockEdit> = Vec::new();
        for index in 0..block.len() {
            let insn = &block.instructions()[index];
            for (rule_index, matcher) in matchers.iter_mut().enumerate() {
                if !matcher.try_match(insn) {
                    continue;
                }

                let matched_len = matcher.match_index();
                let replacement = synthesize(matcher);
                trace!(
                    target: "dexopt::peephole",
                    rule = matcher.pattern().name,
                    removed = matched_len,
                    inserted = replacement.len(),
                    "rule fired"
                );
                self.stats
                    .record(rule_index, matched_len as u64, replacement.len() as u64);
                edits.push(BlockEdit {
                    start: index + 1 - matched_len,
                    len: matched_len,
                    replacement,
                });

                // The instruction is consumed: no other matcher sees it,
                // and every matcher starts over.
                for m in matchers.iter_mut() {
                    m.reset();
                }
                break;
            }
        }

        // Matched ranges are disjoint and recorded in ascending order;
        // splicing back-to-front keeps earlier indices valid.
        for edit in edits.into_iter().rev() {
            block.splice_range(edit.start, edit.len, edit.replacement);
        }
    }

    /// Emit the pass totals and the per-rule detail
    pub fn report_stats(&self) {
        debug!(
            target: "dexopt::peephole",
            removed = self.stats.instructions_removed(),
            inserted = self.stats.instructions_inserted(),
            net_change = self.stats.net_change(),
            fires = self.stats.total_fires(),
            "peephole pass finished"
        );
        for (name, fires) in self.stats.rule_fires() {
            trace!(target: "dexopt::peephole", rule = name, fires, "rule statistics");
        }
    }
}
