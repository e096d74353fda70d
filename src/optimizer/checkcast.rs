//! Redundant check-cast removal
//!
//! An independent pass run after the peephole pass: a `check-cast` that
//! re-casts a register to the exact type the previous instruction just
//! cast it to can never throw and is deleted. The pass is block-local
//! and keys on interned type identity.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::ir::{walk_code, DexClass, MethodCode, Opcode};

/// The redundant cast remover
#[derive(Debug, Default)]
pub struct RedundantCheckCastRemover {
    removed: AtomicU64,
}

impl RedundantCheckCastRemover {
    /// Stable name used as this pass's disable key
    pub const NAME: &'static str = "Remove_Redundant_CheckCast";

    /// Create the pass
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of casts removed so far
    pub fn removed(&self) -> u64 {
        self.removed.load(Ordering::Relaxed)
    }

    /// Run over every method in the scope
    pub fn run(&self, scope: &mut [DexClass]) {
        walk_code(scope, |_, code| self.visit_code(code));
        debug!(
            target: "dexopt::checkcast",
            removed = self.removed(),
            "redundant check-cast pass finished"
        );
    }

    fn visit_code(&self, code: &mut MethodCode) {
        for block in code.blocks_mut() {
            let insns = block.instructions();
            let mut dead = Vec::new();
            for i in 1..insns.len() {
                let prev = &insns[i - 1];
                let cur = &insns[i];
                if cur.opcode() == Opcode::CheckCast
                    && prev.opcode() == Opcode::CheckCast
                    && cur.srcs_size() == 1
                    && prev.srcs_size() == 1
                    && cur.src(0) == prev.src(0)
                    && cur.type_id() == prev.type_id()
                {
                    dead.push(i);
                }
            }
            // All duplicates equal the first cast, so deleting every one
            // of them after the first is safe even for runs longer than two.
            for &i in dead.iter().rev() {
                block.splice_range(i, 1, Vec::new());
            }
            self.removed.fetch_add(dead.len() as u64, Ordering::Relaxed);
        }
    }
}
