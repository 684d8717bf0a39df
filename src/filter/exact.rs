use std::fmt;

use once_cell::sync::OnceCell;

use crate::{
    bitmap::Bitmap,
    block::{BlockSearch, ColumnHeader, ValueType},
    filter::{
        bloom_gate::match_bloom_filter_all_tokens,
        field_name,
        matchers::{leaf_column, match_binary_value, match_dict_by, string_value, visit_encoded},
        quote_field_name, quote_token_if_needed,
    },
    tokenizer::hash_tokens,
    values::{
        float64_string, ipv4_string, marshal_float64, marshal_ipv4, marshal_timestamp_iso8601,
        marshal_uint, timestamp_iso8601_string, try_parse_float64, try_parse_ipv4,
        try_parse_timestamp_iso8601, try_parse_uint64,
    },
};

/// `field:exact("value")`: the whole value equals the literal.
#[derive(Debug)]
pub struct ExactFilter {
    field_name: String,
    value: String,
    tokens: OnceCell<Vec<u64>>,
}

impl ExactFilter {
    /// Match rows of `field` equal to `value`.
    pub fn new(field: &str, value: impl Into<String>) -> Self {
        Self {
            field_name: field_name(field),
            value: value.into(),
            tokens: OnceCell::new(),
        }
    }

    /// Target field.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub(crate) fn tokens(&self) -> &[u64] {
        self.tokens.get_or_init(|| hash_tokens(&self.value))
    }

    /// Narrow `bm` to rows whose value equals the literal.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        let value = self.value.as_str();
        let Some(ch) = leaf_column(bs, &self.field_name, bm, |v| v == value) else {
            return;
        };
        match ch.value_type() {
            ValueType::String => {
                if !match_bloom_filter_all_tokens(bs, ch, self.tokens()) {
                    bm.reset_bits();
                    return;
                }
                let part_path = bs.part_path();
                visit_encoded(bs, ch, bm, |v| string_value(part_path, ch, v) == value);
            }
            ValueType::Dict => match_dict_by(bs, ch, bm, |v| v == value),
            ValueType::Uint8 | ValueType::Uint16 | ValueType::Uint32 | ValueType::Uint64 => {
                match_uint_by_exact_value(bs, ch, bm, value);
            }
            ValueType::Float64 => match_float64_by_exact_value(bs, ch, bm, value),
            ValueType::Ipv4 => match_ipv4_by_exact_value(bs, ch, bm, value),
            ValueType::TimestampIso8601 => match_timestamp_by_exact_value(bs, ch, bm, value),
        }
    }
}

impl fmt::Display for ExactFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}exact({})",
            quote_field_name(&self.field_name),
            quote_token_if_needed(&self.value)
        )
    }
}

// The typed matchers below parse the literal into the column encoding and
// compare bytes. The bloom filter is probed with the tokens of the canonical
// text of the parsed value, which is what the column's bloom filter holds.

pub(super) fn match_uint_by_exact_value(
    bs: &BlockSearch<'_>,
    ch: &ColumnHeader,
    bm: &mut Bitmap,
    literal: &str,
) {
    let Ok(n) = try_parse_uint64(literal) else {
        bm.reset_bits();
        return;
    };
    if n < ch.min_value() || n > ch.max_value() {
        bm.reset_bits();
        return;
    }
    let Some(needle) = marshal_uint(ch.value_type(), n) else {
        bm.reset_bits();
        return;
    };
    let tokens = hash_tokens(&n.to_string());
    match_binary_value(bs, ch, bm, &needle, &tokens);
}

pub(super) fn match_float64_by_exact_value(
    bs: &BlockSearch<'_>,
    ch: &ColumnHeader,
    bm: &mut Bitmap,
    literal: &str,
) {
    let Ok(f) = try_parse_float64(literal) else {
        bm.reset_bits();
        return;
    };
    if f < ch.min_float64() || f > ch.max_float64() {
        bm.reset_bits();
        return;
    }
    let tokens = hash_tokens(&float64_string(f));
    match_binary_value(bs, ch, bm, &marshal_float64(f), &tokens);
}

pub(super) fn match_ipv4_by_exact_value(
    bs: &BlockSearch<'_>,
    ch: &ColumnHeader,
    bm: &mut Bitmap,
    literal: &str,
) {
    let Ok(n) = try_parse_ipv4(literal) else {
        bm.reset_bits();
        return;
    };
    if u64::from(n) < ch.min_value() || u64::from(n) > ch.max_value() {
        bm.reset_bits();
        return;
    }
    let tokens = hash_tokens(&ipv4_string(n));
    match_binary_value(bs, ch, bm, &marshal_ipv4(n), &tokens);
}

pub(super) fn match_timestamp_by_exact_value(
    bs: &BlockSearch<'_>,
    ch: &ColumnHeader,
    bm: &mut Bitmap,
    literal: &str,
) {
    let Ok(nsecs) = try_parse_timestamp_iso8601(literal) else {
        bm.reset_bits();
        return;
    };
    if nsecs < ch.min_timestamp() || nsecs > ch.max_timestamp() {
        bm.reset_bits();
        return;
    }
    let tokens = hash_tokens(&timestamp_iso8601_string(nsecs));
    match_binary_value(bs, ch, bm, &marshal_timestamp_iso8601(nsecs), &tokens);
}
