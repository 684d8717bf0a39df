use std::fmt;

use crate::{
    bitmap::Bitmap,
    block::{BlockSearch, ValueType},
    filter::{
        field_name,
        matchers::{leaf_column, match_dict_by, match_string_range, visit_text},
        quote_field_name, quote_token_if_needed,
    },
};

/// `field:string_range(min, max)`: `min <= value < max`, compared bytewise.
#[derive(Debug)]
pub struct StringRangeFilter {
    field_name: String,
    min_value: String,
    max_value: String,
}

impl StringRangeFilter {
    /// Match values in `[min_value, max_value)`.
    pub fn new(field: &str, min_value: impl Into<String>, max_value: impl Into<String>) -> Self {
        Self {
            field_name: field_name(field),
            min_value: min_value.into(),
            max_value: max_value.into(),
        }
    }

    /// Target field.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Narrow `bm` to rows within the range.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        let (min, max) = (self.min_value.as_str(), self.max_value.as_str());
        let Some(ch) = leaf_column(bs, &self.field_name, bm, |v| match_string_range(v, min, max))
        else {
            return;
        };
        match ch.value_type() {
            ValueType::Dict => match_dict_by(bs, ch, bm, |v| match_string_range(v, min, max)),
            ValueType::Uint8
            | ValueType::Uint16
            | ValueType::Uint32
            | ValueType::Uint64
            | ValueType::Ipv4
            | ValueType::TimestampIso8601 => {
                // the text of these types always starts with a digit
                if min >= ":" || max <= "0" {
                    bm.reset_bits();
                    return;
                }
                visit_text(bs, ch, bm, |v| match_string_range(v, min, max));
            }
            ValueType::String | ValueType::Float64 => {
                visit_text(bs, ch, bm, |v| match_string_range(v, min, max));
            }
        }
    }
}

impl fmt::Display for StringRangeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}string_range({}, {})",
            quote_field_name(&self.field_name),
            quote_token_if_needed(&self.min_value),
            quote_token_if_needed(&self.max_value)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        block::MemBlock,
        filter::tests::{apply_to_all, bits},
    };

    #[test]
    fn half_open_interval() {
        let values = ["a", "abc", "b", "c"];
        let block = MemBlock::builder("p", vec![0; 4])
            .string_column("s", &values)
            .dict_column("d", &values)
            .uint_column("n", ValueType::Uint16, &[9, 10, 100, 2])
            .build()
            .expect("block");

        assert_eq!(apply_to_all(StringRangeFilter::new("s", "a", "c"), &block), bits("1110"));
        assert_eq!(apply_to_all(StringRangeFilter::new("d", "ab", "b"), &block), bits("0100"));
        // numbers compare as text
        assert_eq!(apply_to_all(StringRangeFilter::new("n", "10", "9"), &block), bits("0111"));
        assert_eq!(apply_to_all(StringRangeFilter::new("n", "a", "z"), &block), bits("0000"));
        assert_eq!(apply_to_all(StringRangeFilter::new("missing", "", "a"), &block), bits("1111"));
    }

    #[test]
    fn display() {
        assert_eq!(StringRangeFilter::new("", "a", "b c").to_string(), "string_range(a, \"b c\")");
    }
}
