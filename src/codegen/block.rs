//! Block wrapper emission.
//!
//! Classes and functions register the block signatures they pass callbacks
//! into; each owning module then emits one wrapper per signature. The wrapper
//! symbol is derived from the signature alone, so any member needing
//! `void (^)(BOOL)` in a module lands on the same export.

use crate::codegen::{
    context::GenerationContext,
    marshal::{plan_block, render_block, BlockPlan},
};

/// The rendered block wrappers for one module.
#[derive(Debug, Clone, Default)]
pub struct BlockWrappers {
    /// Marshal plans in first-use order
    pub plans: Vec<BlockPlan>,
    /// Rendered export statements, one per plan
    pub rendered: Vec<String>,
}

impl BlockWrappers {
    /// Number of wrappers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// `true` when the module registered no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

/// Plan and render every block wrapper registered for `module`.
#[must_use]
pub fn wrappers_for_module(context: &GenerationContext<'_>, module: &str) -> BlockWrappers {
    let Some(blocks) = context.blocks_for(module) else {
        return BlockWrappers::default();
    };
    let mut wrappers = BlockWrappers::default();
    for block in blocks.values() {
        let plan = plan_block(block);
        wrappers.rendered.push(render_block(&plan));
        wrappers.plans.push(plan);
    }
    wrappers
}
