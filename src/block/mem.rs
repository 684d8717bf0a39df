//! In-memory block, encoded the same way a loaded part block is.

use std::collections::{HashMap, HashSet};

use super::{BlockData, ColumnHeader, ValueType, MAX_DICT_VALUES};
use crate::{
    bloom::BloomFilter,
    error::BlockBuildError,
    observability::log_debug,
    values::{
        float64_string, ipv4_string, marshal_float64, marshal_ipv4, marshal_timestamp_iso8601,
        marshal_uint, timestamp_iso8601_string,
    },
};

#[derive(Debug)]
struct MemColumn {
    header: ColumnHeader,
    values: Vec<Vec<u8>>,
    bloom: Option<BloomFilter>,
}

/// Fully materialized block.
#[derive(Debug)]
pub struct MemBlock {
    part_path: String,
    timestamps: Vec<i64>,
    columns: Vec<MemColumn>,
    const_columns: HashMap<String, String>,
}

impl MemBlock {
    /// Start building a block with the given row timestamps.
    #[must_use]
    pub fn builder(part_path: impl Into<String>, timestamps: Vec<i64>) -> MemBlockBuilder {
        MemBlockBuilder {
            part_path: part_path.into(),
            timestamps,
            columns: Vec::new(),
            const_columns: HashMap::new(),
            names: HashSet::new(),
            error: None,
        }
    }

    fn column(&self, name: &str) -> Option<&MemColumn> {
        self.columns.iter().find(|c| c.header.name() == name)
    }
}

impl BlockData for MemBlock {
    fn part_path(&self) -> &str {
        &self.part_path
    }

    fn rows_count(&self) -> usize {
        self.timestamps.len()
    }

    fn column_header(&self, field: &str) -> Option<&ColumnHeader> {
        self.column(field).map(|c| &c.header)
    }

    fn const_column_value(&self, field: &str) -> &str {
        self.const_columns.get(field).map_or("", String::as_str)
    }

    fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    fn column_values(&self, ch: &ColumnHeader) -> &[Vec<u8>] {
        self.column(ch.name()).map_or(&[], |c| c.values.as_slice())
    }

    fn bloom_filter(&self, ch: &ColumnHeader) -> Option<&BloomFilter> {
        self.column(ch.name()).and_then(|c| c.bloom.as_ref())
    }
}

/// Builder encoding typed columns into a [`MemBlock`].
///
/// Errors are deferred to [`MemBlockBuilder::build`] so calls can be chained.
#[derive(Debug)]
pub struct MemBlockBuilder {
    part_path: String,
    timestamps: Vec<i64>,
    columns: Vec<MemColumn>,
    const_columns: HashMap<String, String>,
    names: HashSet<String>,
    error: Option<BlockBuildError>,
}

impl MemBlockBuilder {
    /// Add a raw string column.
    #[must_use]
    pub fn string_column<S: AsRef<str>>(mut self, name: &str, values: &[S]) -> Self {
        if !self.check(name, values.len()) {
            return self;
        }
        let bloom = BloomFilter::from_values(values.iter().map(AsRef::as_ref));
        let encoded = values.iter().map(|v| v.as_ref().as_bytes().to_vec()).collect();
        self.push(ColumnHeader::new(name, ValueType::String), encoded, Some(bloom));
        self
    }

    /// Add a dict-encoded string column; dict columns carry no bloom filter.
    #[must_use]
    pub fn dict_column<S: AsRef<str>>(mut self, name: &str, values: &[S]) -> Self {
        if !self.check(name, values.len()) {
            return self;
        }
        let mut dict: Vec<String> = Vec::new();
        let mut encoded = Vec::with_capacity(values.len());
        for value in values {
            let value = value.as_ref();
            let idx = match dict.iter().position(|v| v == value) {
                Some(idx) => idx,
                None => {
                    dict.push(value.to_string());
                    dict.len() - 1
                }
            };
            if idx >= MAX_DICT_VALUES {
                self.error = Some(BlockBuildError::TooManyDictValues {
                    column: name.to_string(),
                    got: idx + 1,
                    max: MAX_DICT_VALUES,
                });
                return self;
            }
            encoded.push(vec![idx as u8]);
        }
        let header = ColumnHeader::new(name, ValueType::Dict).with_values_dict(dict);
        self.push(header, encoded, None);
        self
    }

    /// Add an unsigned integer column of the given width.
    ///
    /// # Panics
    ///
    /// Panics when `value_type` is not one of the uint types.
    #[must_use]
    pub fn uint_column(mut self, name: &str, value_type: ValueType, values: &[u64]) -> Self {
        assert!(value_type.is_uint(), "uint_column requires a uint value type");
        if !self.check(name, values.len()) {
            return self;
        }
        let mut encoded = Vec::with_capacity(values.len());
        for &n in values {
            let Some(bytes) = marshal_uint(value_type, n) else {
                self.error = Some(BlockBuildError::ValueOutOfRange {
                    column: name.to_string(),
                    value: n,
                    value_type: value_type.as_str(),
                });
                return self;
            };
            encoded.push(bytes);
        }
        let (min, max) = min_max(values.iter().copied());
        let texts: Vec<String> = values.iter().map(u64::to_string).collect();
        let bloom = BloomFilter::from_values(texts.iter().map(String::as_str));
        let header = ColumnHeader::new(name, value_type).with_min_max(min, max);
        self.push(header, encoded, Some(bloom));
        self
    }

    /// Add a float64 column.
    #[must_use]
    pub fn float64_column(mut self, name: &str, values: &[f64]) -> Self {
        if !self.check(name, values.len()) {
            return self;
        }
        let encoded = values.iter().map(|&f| marshal_float64(f)).collect();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let texts: Vec<String> = values.iter().map(|&f| float64_string(f)).collect();
        let bloom = BloomFilter::from_values(texts.iter().map(String::as_str));
        let header =
            ColumnHeader::new(name, ValueType::Float64).with_min_max(min.to_bits(), max.to_bits());
        self.push(header, encoded, Some(bloom));
        self
    }

    /// Add an IPv4 column of big-endian u32 addresses.
    #[must_use]
    pub fn ipv4_column(mut self, name: &str, values: &[u32]) -> Self {
        if !self.check(name, values.len()) {
            return self;
        }
        let encoded = values.iter().map(|&n| marshal_ipv4(n)).collect();
        let (min, max) = min_max(values.iter().map(|&n| u64::from(n)));
        let texts: Vec<String> = values.iter().map(|&n| ipv4_string(n)).collect();
        let bloom = BloomFilter::from_values(texts.iter().map(String::as_str));
        let header = ColumnHeader::new(name, ValueType::Ipv4).with_min_max(min, max);
        self.push(header, encoded, Some(bloom));
        self
    }

    /// Add a timestamp column of Unix nanoseconds.
    #[must_use]
    pub fn timestamp_iso8601_column(mut self, name: &str, values: &[i64]) -> Self {
        if !self.check(name, values.len()) {
            return self;
        }
        let encoded = values.iter().map(|&n| marshal_timestamp_iso8601(n)).collect();
        let min = values.iter().copied().min().unwrap_or(0);
        let max = values.iter().copied().max().unwrap_or(0);
        let texts: Vec<String> = values.iter().map(|&n| timestamp_iso8601_string(n)).collect();
        let bloom = BloomFilter::from_values(texts.iter().map(String::as_str));
        let header = ColumnHeader::new(name, ValueType::TimestampIso8601)
            .with_min_max(min as u64, max as u64);
        self.push(header, encoded, Some(bloom));
        self
    }

    /// Add a column whose value is the same for every row.
    #[must_use]
    pub fn const_column(mut self, name: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        if value.is_empty() {
            self.error = Some(BlockBuildError::EmptyConstValue(name.to_string()));
            return self;
        }
        if !self.names.insert(name.to_string()) {
            self.error = Some(BlockBuildError::DuplicateColumn(name.to_string()));
            return self;
        }
        self.const_columns.insert(name.to_string(), value.to_string());
        self
    }

    /// Finish the block, reporting the first error any column call hit.
    pub fn build(self) -> Result<MemBlock, BlockBuildError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        log_debug!(
            component = "block",
            event = "built",
            part = %self.part_path,
            rows = self.timestamps.len(),
            columns = self.columns.len(),
            const_columns = self.const_columns.len(),
        );
        Ok(MemBlock {
            part_path: self.part_path,
            timestamps: self.timestamps,
            columns: self.columns,
            const_columns: self.const_columns,
        })
    }

    fn check(&mut self, name: &str, values_len: usize) -> bool {
        if self.error.is_some() {
            return false;
        }
        if values_len != self.timestamps.len() {
            self.error = Some(BlockBuildError::RowsMismatch {
                column: name.to_string(),
                got: values_len,
                want: self.timestamps.len(),
            });
            return false;
        }
        if !self.names.insert(name.to_string()) {
            self.error = Some(BlockBuildError::DuplicateColumn(name.to_string()));
            return false;
        }
        true
    }

    fn push(&mut self, header: ColumnHeader, values: Vec<Vec<u8>>, bloom: Option<BloomFilter>) {
        self.columns.push(MemColumn {
            header,
            values,
            bloom,
        });
    }
}

fn min_max(values: impl Iterator<Item = u64>) -> (u64, u64) {
    values.fold((u64::MAX, 0), |(min, max), v| (min.min(v), max.max(v)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_typed_columns() {
        let block = MemBlock::builder("part-0", vec![1, 2, 3])
            .string_column("msg", &["a b", "c", ""])
            .dict_column("level", &["info", "warn", "info"])
            .uint_column("code", ValueType::Uint16, &[200, 404, 500])
            .ipv4_column("ip", &[1, 2, 3])
            .const_column("host", "h1")
            .build()
            .expect("block");

        assert_eq!(block.rows_count(), 3);
        let level = block.column_header("level").expect("level");
        assert_eq!(level.values_dict(), ["info", "warn"]);
        assert_eq!(block.column_values(level), &[vec![0u8], vec![1u8], vec![0u8]]);
        assert!(block.bloom_filter(level).is_none());

        let code = block.column_header("code").expect("code");
        assert_eq!((code.min_value(), code.max_value()), (200, 500));
        assert_eq!(block.column_values(code)[1], vec![0x01u8, 0x94]);
        assert!(block.bloom_filter(code).is_some());

        assert_eq!(block.const_column_value("host"), "h1");
        assert_eq!(block.const_column_value("msg"), "");
        assert!(block.column_header("host").is_none());
    }

    #[test]
    fn reports_first_error() {
        let err = MemBlock::builder("p", vec![1, 2])
            .string_column("a", &["x"])
            .string_column("a", &["x", "y"])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            BlockBuildError::RowsMismatch {
                column: "a".to_string(),
                got: 1,
                want: 2
            }
        );

        let err = MemBlock::builder("p", vec![1])
            .string_column("a", &["x"])
            .const_column("a", "y")
            .build()
            .unwrap_err();
        assert_eq!(err, BlockBuildError::DuplicateColumn("a".to_string()));
    }

    #[test]
    fn uint_overflow_is_an_error() {
        let err = MemBlock::builder("p", vec![0, 0])
            .uint_column("n", ValueType::Uint8, &[1, 256])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            BlockBuildError::ValueOutOfRange {
                column: "n".to_string(),
                value: 256,
                value_type: "uint8"
            }
        );
    }

    #[test]
    fn dict_overflow_is_an_error() {
        let values: Vec<String> = (0..300).map(|i| i.to_string()).collect();
        let err = MemBlock::builder("p", vec![0; 300])
            .dict_column("d", &values)
            .build()
            .unwrap_err();
        assert!(matches!(err, BlockBuildError::TooManyDictValues { got: 257, .. }));
    }
}
