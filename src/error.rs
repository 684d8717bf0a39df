//! Recoverable error types.
//!
//! Only construction-time problems surface as errors. Corrupted block data is
//! never reported through these types; it aborts evaluation with a panic that
//! names the offending part and column.

use thiserror::Error;

/// Failure to parse a filter literal into a typed column encoding.
///
/// Filters treat these as "cannot match" rather than propagating them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueParseError {
    /// The literal is not a plain decimal unsigned integer.
    #[error("cannot parse {0:?} as unsigned integer")]
    Uint(String),
    /// The literal is not a floating-point number.
    #[error("cannot parse {0:?} as floating-point number")]
    Float(String),
    /// The literal is not a dotted-quad IPv4 address.
    #[error("cannot parse {0:?} as IPv4 address")]
    Ipv4(String),
    /// The literal is not a `YYYY-MM-DDTHH:MM:SS.mmmZ` timestamp.
    #[error("cannot parse {0:?} as ISO8601 timestamp")]
    Timestamp(String),
}

/// Errors raised while constructing filters or search configuration.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The regular expression of a regexp filter does not compile.
    #[error("invalid regexp for field {field:?}: {source}")]
    InvalidRegex {
        /// Field the regexp filter targets.
        field: String,
        /// Compilation failure reported by the regex engine.
        #[source]
        source: regex::Error,
    },
    /// A search configuration value is out of range.
    #[error("invalid search config: {0}")]
    InvalidConfig(String),
}

/// Errors raised by [`crate::block::MemBlockBuilder`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockBuildError {
    /// A column holds a different number of values than the block has rows.
    #[error("column {column:?} has {got} values; want {want}")]
    RowsMismatch {
        /// Column name.
        column: String,
        /// Number of values supplied.
        got: usize,
        /// Number of rows in the block.
        want: usize,
    },
    /// A dictionary column holds more distinct values than one byte can index.
    #[error("dict column {column:?} has {got} distinct values; at most {max} are allowed")]
    TooManyDictValues {
        /// Column name.
        column: String,
        /// Number of distinct values found.
        got: usize,
        /// Upper bound on distinct values.
        max: usize,
    },
    /// An integer does not fit the width of its column.
    #[error("value {value} does not fit column {column:?} of type {value_type}")]
    ValueOutOfRange {
        /// Column name.
        column: String,
        /// Offending value.
        value: u64,
        /// Declared column type.
        value_type: &'static str,
    },
    /// The same column name was added twice.
    #[error("duplicate column {0:?}")]
    DuplicateColumn(String),
    /// Const columns must carry a non-empty value.
    #[error("const column {0:?} must have a non-empty value")]
    EmptyConstValue(String),
}
