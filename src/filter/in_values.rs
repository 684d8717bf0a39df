use std::{collections::HashSet, fmt};

use once_cell::sync::OnceCell;

use crate::{
    bitmap::Bitmap,
    block::{BlockSearch, ColumnHeader, ValueType},
    filter::{
        bloom_gate::{match_bloom_filter_all_tokens, match_bloom_filter_any_token_set},
        field_name,
        matchers::{leaf_column, match_dict_by, visit_encoded},
        quote_field_name, quote_token_if_needed,
    },
    tokenizer::hash_tokens,
    values::{
        float64_string, ipv4_string, marshal_float64, marshal_ipv4, marshal_timestamp_iso8601,
        marshal_uint, timestamp_iso8601_string, try_parse_float64, try_parse_ipv4,
        try_parse_timestamp_iso8601, try_parse_uint64,
    },
};

/// Candidate values in one column encoding, with the bloom tokens of their
/// canonical text.
#[derive(Debug, Default)]
struct EncodedValues {
    values: HashSet<Vec<u8>>,
    common_tokens: Vec<u64>,
    token_sets: Vec<Vec<u64>>,
}

impl EncodedValues {
    fn build<I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = (Vec<u8>, String)>,
    {
        let mut out = EncodedValues::default();
        for (encoded, text) in candidates {
            if out.values.insert(encoded) {
                out.token_sets.push(hash_tokens(&text));
            }
        }
        if let Some((first, rest)) = out.token_sets.split_first() {
            out.common_tokens = first
                .iter()
                .copied()
                .filter(|h| rest.iter().all(|set| set.contains(h)))
                .collect();
        }
        out
    }
}

const ENCODINGS: usize = 8;

fn encoding_slot(value_type: ValueType) -> usize {
    match value_type {
        ValueType::String | ValueType::Dict => 0,
        ValueType::Uint8 => 1,
        ValueType::Uint16 => 2,
        ValueType::Uint32 => 3,
        ValueType::Uint64 => 4,
        ValueType::Float64 => 5,
        ValueType::Ipv4 => 6,
        ValueType::TimestampIso8601 => 7,
    }
}

/// `field:in("a", "b")`: the value equals one of the literals.
///
/// Literals are converted once per column encoding on first use. A literal
/// that does not parse as the column type is left out of that encoding's set.
#[derive(Debug)]
pub struct InFilter {
    field_name: String,
    values: Vec<String>,
    encoded: [OnceCell<EncodedValues>; ENCODINGS],
}

impl InFilter {
    /// Match rows of `field` equal to any of `values`.
    pub fn new<I, S>(field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field_name: field_name(field),
            values: values.into_iter().map(Into::into).collect(),
            encoded: Default::default(),
        }
    }

    /// Target field.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    fn encoded(&self, value_type: ValueType) -> &EncodedValues {
        self.encoded[encoding_slot(value_type)].get_or_init(|| self.encode(value_type))
    }

    fn encode(&self, value_type: ValueType) -> EncodedValues {
        let values = self.values.iter().map(String::as_str);
        match value_type {
            ValueType::String | ValueType::Dict => {
                EncodedValues::build(values.map(|v| (v.as_bytes().to_vec(), v.to_string())))
            }
            ValueType::Uint8 | ValueType::Uint16 | ValueType::Uint32 | ValueType::Uint64 => {
                EncodedValues::build(values.filter_map(|v| {
                    let n = try_parse_uint64(v).ok()?;
                    Some((marshal_uint(value_type, n)?, n.to_string()))
                }))
            }
            ValueType::Float64 => EncodedValues::build(values.filter_map(|v| {
                let f = try_parse_float64(v).ok()?;
                Some((marshal_float64(f), float64_string(f)))
            })),
            ValueType::Ipv4 => EncodedValues::build(values.filter_map(|v| {
                let n = try_parse_ipv4(v).ok()?;
                Some((marshal_ipv4(n), ipv4_string(n)))
            })),
            ValueType::TimestampIso8601 => EncodedValues::build(values.filter_map(|v| {
                let n = try_parse_timestamp_iso8601(v).ok()?;
                Some((marshal_timestamp_iso8601(n), timestamp_iso8601_string(n)))
            })),
        }
    }

    /// Narrow `bm` to rows equal to one of the literals.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        if self.values.is_empty() {
            bm.reset_bits();
            return;
        }
        let strings = &self.encoded(ValueType::String).values;
        let Some(ch) = leaf_column(bs, &self.field_name, bm, |v| strings.contains(v.as_bytes()))
        else {
            return;
        };
        match ch.value_type() {
            ValueType::Dict => match_dict_by(bs, ch, bm, |v| strings.contains(v.as_bytes())),
            value_type => match_any_value(bs, ch, bm, self.encoded(value_type)),
        }
    }
}

fn match_any_value(bs: &BlockSearch<'_>, ch: &ColumnHeader, bm: &mut Bitmap, set: &EncodedValues) {
    if set.values.is_empty()
        || !match_bloom_filter_all_tokens(bs, ch, &set.common_tokens)
        || !match_bloom_filter_any_token_set(bs, ch, &set.token_sets)
    {
        bm.reset_bits();
        return;
    }
    visit_encoded(bs, ch, bm, |v| set.values.contains(v));
}

impl fmt::Display for InFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}in(", quote_field_name(&self.field_name))?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", quote_token_if_needed(value))?;
        }
        f.write_str(")")
    }
}
