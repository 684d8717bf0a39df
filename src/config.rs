//! Tunables for block evaluation.
//!
//! None of these values change which rows match; they only decide when the
//! bloom-filter gate is worth consulting.

use crate::{error::FilterError, observability::log_debug};

/// Maximum number of `in(...)` token sets probed against a bloom filter.
pub const DEFAULT_MAX_IN_TOKEN_SETS: usize = 1000;

/// Bloom probing for `in(...)` is skipped once token sets exceed this many per block row.
pub const DEFAULT_IN_TOKEN_SETS_PER_ROW: u64 = 10;

/// A float64 literal never spans more than two tokens (`123.456`).
pub const DEFAULT_FLOAT64_EXACT_PREFIX_MAX_TOKENS: usize = 2;

/// An IPv4 prefix holds at most three complete tokens before the trailing one.
pub const DEFAULT_IPV4_EXACT_PREFIX_MAX_TOKENS: usize = 3;

/// Configuration shared by every evaluation of a block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchConfig {
    /// Consult per-column bloom filters before scanning rows.
    pub bloom_filters: bool,
    /// Upper bound on token sets probed by `in(...)` filters.
    pub max_in_token_sets: usize,
    /// `in(...)` probing is skipped when token sets exceed `rows * in_token_sets_per_row`.
    pub in_token_sets_per_row: u64,
    /// Exact-prefix literals with more complete tokens cannot match a float64 column.
    pub float64_exact_prefix_max_tokens: usize,
    /// Exact-prefix literals with more complete tokens cannot match an IPv4 column.
    pub ipv4_exact_prefix_max_tokens: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            bloom_filters: true,
            max_in_token_sets: DEFAULT_MAX_IN_TOKEN_SETS,
            in_token_sets_per_row: DEFAULT_IN_TOKEN_SETS_PER_ROW,
            float64_exact_prefix_max_tokens: DEFAULT_FLOAT64_EXACT_PREFIX_MAX_TOKENS,
            ipv4_exact_prefix_max_tokens: DEFAULT_IPV4_EXACT_PREFIX_MAX_TOKENS,
        }
    }
}

impl SearchConfig {
    /// Toggle bloom-filter gating.
    #[must_use]
    pub fn with_bloom_filters(mut self, enabled: bool) -> Self {
        if !enabled {
            log_debug!(component = "config", event = "bloom_disabled");
        }
        self.bloom_filters = enabled;
        self
    }

    /// Override the `in(...)` token-set limits.
    #[must_use]
    pub fn with_in_token_set_limits(mut self, max_sets: usize, per_row: u64) -> Self {
        self.max_in_token_sets = max_sets;
        self.in_token_sets_per_row = per_row;
        self
    }

    /// Override the exact-prefix token limits for float64 and IPv4 columns.
    #[must_use]
    pub fn with_exact_prefix_token_limits(mut self, float64: usize, ipv4: usize) -> Self {
        self.float64_exact_prefix_max_tokens = float64;
        self.ipv4_exact_prefix_max_tokens = ipv4;
        self
    }

    /// Check the limits for values that would make a filter reject valid rows.
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.in_token_sets_per_row == 0 {
            return Err(FilterError::InvalidConfig(
                "in_token_sets_per_row must be positive".to_string(),
            ));
        }
        if self.float64_exact_prefix_max_tokens < DEFAULT_FLOAT64_EXACT_PREFIX_MAX_TOKENS {
            return Err(FilterError::InvalidConfig(format!(
                "float64_exact_prefix_max_tokens must be at least {}",
                DEFAULT_FLOAT64_EXACT_PREFIX_MAX_TOKENS
            )));
        }
        if self.ipv4_exact_prefix_max_tokens < DEFAULT_IPV4_EXACT_PREFIX_MAX_TOKENS {
            return Err(FilterError::InvalidConfig(format!(
                "ipv4_exact_prefix_max_tokens must be at least {}",
                DEFAULT_IPV4_EXACT_PREFIX_MAX_TOKENS
            )));
        }
        Ok(())
    }
}
