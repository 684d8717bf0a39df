//! Per-block search entry point.

use crate::{
    bitmap::{get_bitmap, PooledBitmap},
    block::{BlockData, BlockSearch},
    config::SearchConfig,
    filter::Filter,
    observability::log_trace,
};

/// Evaluate `filter` over every row of `block`.
///
/// The returned bitmap comes from the process-wide pool and goes back to it
/// when dropped.
///
/// # Panics
///
/// Panics with a `FATAL` message when the block data is corrupted.
pub fn search_block(filter: &Filter, block: &dyn BlockData, config: &SearchConfig) -> PooledBitmap {
    let bs = BlockSearch::new(block, config);
    let mut bm = get_bitmap(bs.rows_count());
    bm.set_bits();
    filter.apply(&bs, &mut bm);
    log_trace!(
        component = "search",
        event = "block_searched",
        part = %bs.part_path(),
        filter_kind = filter.kind(),
        rows = bs.rows_count(),
        matched = bm.ones_count(),
    );
    bm
}
