use std::fmt;

use crate::{
    bitmap::Bitmap,
    block::{BlockSearch, ValueType},
    filter::{
        field_name,
        matchers::{leaf_column, match_dict_by, match_len_range, visit_text},
        prefix::MAX_IPV4_TEXT_LEN,
        quote_field_name,
    },
    values::ISO8601_TIMESTAMP_LEN,
};

const MIN_IPV4_TEXT_LEN: u64 = "0.0.0.0".len() as u64;

/// `field:len_range(min, max)`: the value has between `min` and `max` characters.
#[derive(Debug)]
pub struct LenRangeFilter {
    field_name: String,
    min_len: u64,
    max_len: u64,
}

impl LenRangeFilter {
    /// Match values whose rune count is in `[min_len, max_len]`.
    pub fn new(field: &str, min_len: u64, max_len: u64) -> Self {
        Self {
            field_name: field_name(field),
            min_len,
            max_len,
        }
    }

    /// Target field.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Narrow `bm` to rows with a matching length.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        let (min, max) = (self.min_len, self.max_len);
        if min > max {
            bm.reset_bits();
            return;
        }
        let Some(ch) = leaf_column(bs, &self.field_name, bm, |v| match_len_range(v, min, max))
        else {
            return;
        };
        match ch.value_type() {
            ValueType::Dict => match_dict_by(bs, ch, bm, |v| match_len_range(v, min, max)),
            ValueType::Uint8 | ValueType::Uint16 | ValueType::Uint32 | ValueType::Uint64 => {
                // digit counts are monotonic in the value
                let shortest = decimal_len(ch.min_value());
                let longest = decimal_len(ch.max_value());
                if max < shortest || min > longest {
                    bm.reset_bits();
                    return;
                }
                visit_text(bs, ch, bm, |v| match_len_range(v, min, max));
            }
            ValueType::Ipv4 => {
                if min > MAX_IPV4_TEXT_LEN as u64 || max < MIN_IPV4_TEXT_LEN {
                    bm.reset_bits();
                    return;
                }
                visit_text(bs, ch, bm, |v| match_len_range(v, min, max));
            }
            ValueType::TimestampIso8601 => {
                let len = ISO8601_TIMESTAMP_LEN as u64;
                if len < min || len > max {
                    bm.reset_bits();
                }
            }
            ValueType::String | ValueType::Float64 => {
                visit_text(bs, ch, bm, |v| match_len_range(v, min, max));
            }
        }
    }
}

impl fmt::Display for LenRangeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}len_range({}, {})",
            quote_field_name(&self.field_name),
            self.min_len,
            self.max_len
        )
    }
}

fn decimal_len(n: u64) -> u64 {
    n.checked_ilog10().map_or(1, |d| u64::from(d) + 1)
}
