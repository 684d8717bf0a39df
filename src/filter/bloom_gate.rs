//! Block-level rejection through per-column bloom filters.
//!
//! A negative answer here only ever means "no row of this column can match";
//! a positive answer still requires the row scan. Columns without a bloom
//! filter, and searches with gating disabled, always answer positively.

use crate::{
    block::{BlockSearch, ColumnHeader},
    observability::log_trace,
};

/// Returns false when the column's bloom filter proves some token absent.
pub(crate) fn match_bloom_filter_all_tokens(
    bs: &BlockSearch<'_>,
    ch: &ColumnHeader,
    tokens: &[u64],
) -> bool {
    if tokens.is_empty() || !bs.config().bloom_filters {
        return true;
    }
    let Some(bloom) = bs.bloom_filter(ch) else {
        return true;
    };
    let matched = bloom.contains_all(tokens);
    if !matched {
        log_trace!(
            component = "bloom",
            event = "block_skipped",
            part = %bs.part_path(),
            column = %ch.name(),
            tokens = tokens.len(),
        );
    }
    matched
}

/// Returns false when none of `token_sets` can be fully present in the column.
///
/// Probing is skipped, answering true, when there are too many sets relative
/// to the configured limits; a row scan is cheaper then.
pub(crate) fn match_bloom_filter_any_token_set(
    bs: &BlockSearch<'_>,
    ch: &ColumnHeader,
    token_sets: &[Vec<u64>],
) -> bool {
    let config = bs.config();
    if token_sets.is_empty() || !config.bloom_filters {
        return true;
    }
    if token_sets.len() > config.max_in_token_sets
        || token_sets.len() as u64 > config.in_token_sets_per_row.saturating_mul(bs.rows_count() as u64)
    {
        return true;
    }
    let Some(bloom) = bs.bloom_filter(ch) else {
        return true;
    };
    let matched = token_sets.iter().any(|tokens| bloom.contains_all(tokens));
    if !matched {
        log_trace!(
            component = "bloom",
            event = "block_skipped",
            part = %bs.part_path(),
            column = %ch.name(),
            token_sets = token_sets.len(),
        );
    }
    matched
}
