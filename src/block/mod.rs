//! Read-only view of one block consumed by filters.
//!
//! The physical part format and its loader live elsewhere; they expose a block
//! through [`BlockData`]. [`MemBlock`] is an in-memory implementation used by
//! tests and benchmarks.

mod mem;

use std::fmt;

pub use mem::{MemBlock, MemBlockBuilder};

use crate::{bloom::BloomFilter, config::SearchConfig};

/// Maximum number of distinct values in a dict-encoded column.
pub const MAX_DICT_VALUES: usize = 256;

/// Physical encoding of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Raw UTF-8 strings.
    String,
    /// One-byte indices into the column's values dictionary.
    Dict,
    /// Big-endian u8.
    Uint8,
    /// Big-endian u16.
    Uint16,
    /// Big-endian u32.
    Uint32,
    /// Big-endian u64.
    Uint64,
    /// Big-endian IEEE-754 bits.
    Float64,
    /// Big-endian u32 address.
    Ipv4,
    /// Big-endian i64 nanoseconds, rendered as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
    TimestampIso8601,
}

impl ValueType {
    /// On-disk tag of the encoding.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            ValueType::String => 1,
            ValueType::Dict => 2,
            ValueType::Uint8 => 3,
            ValueType::Uint16 => 4,
            ValueType::Uint32 => 5,
            ValueType::Uint64 => 6,
            ValueType::Float64 => 7,
            ValueType::Ipv4 => 8,
            ValueType::TimestampIso8601 => 9,
        }
    }

    /// Decode an on-disk tag read from the part at `part_path`.
    ///
    /// # Panics
    ///
    /// Panics on an unknown tag: the part was written by an incompatible
    /// version or is corrupted, and no filter result over it can be trusted.
    #[must_use]
    pub fn from_tag(part_path: &str, tag: u8) -> ValueType {
        match tag {
            1 => ValueType::String,
            2 => ValueType::Dict,
            3 => ValueType::Uint8,
            4 => ValueType::Uint16,
            5 => ValueType::Uint32,
            6 => ValueType::Uint64,
            7 => ValueType::Float64,
            8 => ValueType::Ipv4,
            9 => ValueType::TimestampIso8601,
            _ => panic!("FATAL: {part_path}: unknown value type tag {tag}"),
        }
    }

    /// Encoded width in bytes for fixed-width types.
    #[must_use]
    pub fn width(self) -> Option<usize> {
        match self {
            ValueType::String => None,
            ValueType::Dict | ValueType::Uint8 => Some(1),
            ValueType::Uint16 => Some(2),
            ValueType::Uint32 | ValueType::Ipv4 => Some(4),
            ValueType::Uint64 | ValueType::Float64 | ValueType::TimestampIso8601 => Some(8),
        }
    }

    /// Returns true for the four unsigned integer encodings.
    #[must_use]
    pub fn is_uint(self) -> bool {
        matches!(
            self,
            ValueType::Uint8 | ValueType::Uint16 | ValueType::Uint32 | ValueType::Uint64
        )
    }

    /// Short lowercase name used in messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Dict => "dict",
            ValueType::Uint8 => "uint8",
            ValueType::Uint16 => "uint16",
            ValueType::Uint32 => "uint32",
            ValueType::Uint64 => "uint64",
            ValueType::Float64 => "float64",
            ValueType::Ipv4 => "ipv4",
            ValueType::TimestampIso8601 => "iso8601",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-block metadata of one column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnHeader {
    name: String,
    value_type: ValueType,
    min_value: u64,
    max_value: u64,
    values_dict: Vec<String>,
}

impl ColumnHeader {
    /// Create a header without min/max bounds or dictionary.
    #[must_use]
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            min_value: 0,
            max_value: 0,
            values_dict: Vec::new(),
        }
    }

    /// Attach the encoded min/max bounds of the column.
    #[must_use]
    pub fn with_min_max(mut self, min_value: u64, max_value: u64) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self
    }

    /// Attach the values dictionary of a dict-encoded column.
    #[must_use]
    pub fn with_values_dict(mut self, values: Vec<String>) -> Self {
        self.values_dict = values;
        self
    }

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical encoding.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Encoded lower bound of the column values.
    #[must_use]
    pub fn min_value(&self) -> u64 {
        self.min_value
    }

    /// Encoded upper bound of the column values.
    #[must_use]
    pub fn max_value(&self) -> u64 {
        self.max_value
    }

    /// Lower bound of a float64 column.
    #[must_use]
    pub fn min_float64(&self) -> f64 {
        f64::from_bits(self.min_value)
    }

    /// Upper bound of a float64 column.
    #[must_use]
    pub fn max_float64(&self) -> f64 {
        f64::from_bits(self.max_value)
    }

    /// Lower bound of a timestamp column.
    #[must_use]
    pub fn min_timestamp(&self) -> i64 {
        self.min_value as i64
    }

    /// Upper bound of a timestamp column.
    #[must_use]
    pub fn max_timestamp(&self) -> i64 {
        self.max_value as i64
    }

    /// Distinct values of a dict-encoded column, indexed by the row byte.
    #[must_use]
    pub fn values_dict(&self) -> &[String] {
        &self.values_dict
    }
}

/// Block data as exposed by the storage layer.
///
/// Every slice returned is parallel to row indices.
pub trait BlockData: Send + Sync {
    /// Path of the part holding the block, used in fatal messages.
    fn part_path(&self) -> &str;

    /// Number of rows in the block.
    fn rows_count(&self) -> usize;

    /// Header of `field`, or `None` when the field does not occur in the block.
    fn column_header(&self, field: &str) -> Option<&ColumnHeader>;

    /// Value of `field` when it is constant across the block, else `""`.
    fn const_column_value(&self, field: &str) -> &str;

    /// Row timestamps in nanoseconds.
    fn timestamps(&self) -> &[i64];

    /// Raw encoded values of the column, one per row.
    fn column_values(&self, ch: &ColumnHeader) -> &[Vec<u8>];

    /// Bloom filter of the column, when the block carries one.
    fn bloom_filter(&self, ch: &ColumnHeader) -> Option<&BloomFilter>;
}

/// Everything a filter needs to evaluate one block.
#[derive(Clone, Copy)]
pub struct BlockSearch<'a> {
    block: &'a dyn BlockData,
    config: &'a SearchConfig,
}

impl<'a> BlockSearch<'a> {
    /// Bind a block to the configuration used to evaluate it.
    ///
    /// # Panics
    ///
    /// Panics when the block does not hold one timestamp per row.
    #[must_use]
    pub fn new(block: &'a dyn BlockData, config: &'a SearchConfig) -> Self {
        let timestamps = block.timestamps().len();
        if timestamps != block.rows_count() {
            panic!(
                "FATAL: {}: block holds {} timestamps; want {}",
                block.part_path(),
                timestamps,
                block.rows_count()
            );
        }
        Self { block, config }
    }

    /// Search configuration.
    #[must_use]
    pub fn config(&self) -> &'a SearchConfig {
        self.config
    }

    /// Path of the part holding the block.
    #[must_use]
    pub fn part_path(&self) -> &'a str {
        self.block.part_path()
    }

    /// Number of rows in the block.
    #[must_use]
    pub fn rows_count(&self) -> usize {
        self.block.rows_count()
    }

    /// Header of `field`, if present.
    #[must_use]
    pub fn column_header(&self, field: &str) -> Option<&'a ColumnHeader> {
        self.block.column_header(field)
    }

    /// Constant value of `field`, or `""`.
    #[must_use]
    pub fn const_column_value(&self, field: &str) -> &'a str {
        self.block.const_column_value(field)
    }

    /// Row timestamps.
    #[must_use]
    pub fn timestamps(&self) -> &'a [i64] {
        self.block.timestamps()
    }

    /// Encoded values of `ch`.
    ///
    /// # Panics
    ///
    /// Panics when the column does not hold one value per row.
    #[must_use]
    pub fn column_values(&self, ch: &ColumnHeader) -> &'a [Vec<u8>] {
        let values = self.block.column_values(ch);
        if values.len() != self.rows_count() {
            panic!(
                "FATAL: {}: column {:?} holds {} values; want {}",
                self.part_path(),
                ch.name(),
                values.len(),
                self.rows_count()
            );
        }
        values
    }

    /// Bloom filter of `ch`, if any.
    #[must_use]
    pub fn bloom_filter(&self, ch: &ColumnHeader) -> Option<&'a BloomFilter> {
        self.block.bloom_filter(ch)
    }
}

impl fmt::Debug for BlockSearch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockSearch")
            .field("part_path", &self.part_path())
            .field("rows", &self.rows_count())
            .field("config", self.config)
            .finish()
    }
}
