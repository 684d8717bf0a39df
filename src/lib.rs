#![deny(missing_docs)]
//! Row matching for columnar log blocks.
//!
//! A query is compiled upstream into a [`Filter`] tree. For each block a
//! worker builds a [`BlockSearch`] over the block's data and calls
//! [`search_block`], which returns a [`Bitmap`] of the matching rows. Blocks
//! are independent, so many blocks can be searched concurrently against one
//! shared filter tree.
//!
//! Block storage stays outside this crate; it plugs in through the
//! [`BlockData`] trait. [`MemBlock`] implements it in memory.

/// Dense row bitmaps and their run-length encoding.
pub mod bitmap;

/// Block view consumed by filters.
pub mod block;

/// Per-column token bloom filters.
pub mod bloom;

/// Search tuning knobs.
pub mod config;

/// Error types.
pub mod error;

/// Filter tree and per-type matchers.
pub mod filter;

/// Object pools for scratch buffers.
pub mod pool;

/// Per-block search driver.
pub mod search;

/// Word tokenizer shared by bloom filters and matchers.
pub mod tokenizer;

/// Typed value parsing, formatting and encodings.
pub mod values;

mod observability;

pub use crate::{
    bitmap::{get_bitmap, Bitmap, BoolRle, PooledBitmap},
    block::{BlockData, BlockSearch, ColumnHeader, MemBlock, MemBlockBuilder, ValueType},
    bloom::BloomFilter,
    config::SearchConfig,
    error::{BlockBuildError, FilterError, ValueParseError},
    filter::Filter,
    search::search_block,
};
