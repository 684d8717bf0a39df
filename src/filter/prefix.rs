use std::fmt;

use once_cell::sync::OnceCell;

use crate::{
    bitmap::Bitmap,
    block::{BlockSearch, ColumnHeader, ValueType},
    filter::{
        field_name,
        matchers::{leaf_column, match_dict_by, match_prefix, match_text_by},
        quote_field_name, quote_token_if_needed,
    },
    tokenizer::{hash_token_list, tokenize_skip_last},
    values::{try_parse_float64, try_parse_uint64, ISO8601_TIMESTAMP_LEN},
};

/// Longest dotted-quad text.
pub(super) const MAX_IPV4_TEXT_LEN: usize = "255.255.255.255".len();

/// `field:prefix*`: some token-aligned substring of the value starts with the prefix.
#[derive(Debug)]
pub struct PrefixFilter {
    field_name: String,
    prefix: String,
    tokens: OnceCell<Vec<u64>>,
}

impl PrefixFilter {
    /// Match rows of `field` containing a word starting with `prefix`.
    pub fn new(field: &str, prefix: impl Into<String>) -> Self {
        Self {
            field_name: field_name(field),
            prefix: prefix.into(),
            tokens: OnceCell::new(),
        }
    }

    /// Target field.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Hashes of the complete tokens of the prefix; the last one may be partial and is dropped.
    pub(crate) fn tokens(&self) -> &[u64] {
        self.tokens
            .get_or_init(|| hash_token_list(&tokenize_skip_last(&self.prefix)))
    }

    /// Narrow `bm` to rows matching the prefix.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        let prefix = self.prefix.as_str();
        let Some(ch) = leaf_column(bs, &self.field_name, bm, |v| match_prefix(v, prefix)) else {
            return;
        };
        let tokens = self.tokens();
        match ch.value_type() {
            ValueType::String => match_text_by(bs, ch, bm, tokens, |v| match_prefix(v, prefix)),
            ValueType::Dict => match_dict_by(bs, ch, bm, |v| match_prefix(v, prefix)),
            ValueType::Uint8 | ValueType::Uint16 | ValueType::Uint32 | ValueType::Uint64 => {
                match_uint_by_prefix(bs, ch, bm, prefix);
            }
            ValueType::Float64 => match_float64_by_prefix(bs, ch, bm, prefix, tokens),
            ValueType::Ipv4 => match_ipv4_by_prefix(bs, ch, bm, prefix, tokens),
            ValueType::TimestampIso8601 => match_timestamp_by_prefix(bs, ch, bm, prefix, tokens),
        }
    }
}

impl fmt::Display for PrefixFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = quote_field_name(&self.field_name);
        if self.prefix.is_empty() {
            return write!(f, "{field}*");
        }
        write!(f, "{field}{}*", quote_token_if_needed(&self.prefix))
    }
}

// Every typed value has non-empty text, so an empty prefix keeps every row.

/// `12*` matches `12` and `123`, so numbers are compared as text once the
/// prefix is known to be a number no larger than the column maximum.
pub(super) fn match_uint_by_prefix(
    bs: &BlockSearch<'_>,
    ch: &ColumnHeader,
    bm: &mut Bitmap,
    prefix: &str,
) {
    if prefix.is_empty() {
        return;
    }
    match try_parse_uint64(prefix) {
        Ok(n) if n <= ch.max_value() => {}
        _ => {
            bm.reset_bits();
            return;
        }
    }
    match_text_by(bs, ch, bm, &[], |v| match_prefix(v, prefix));
}

pub(super) fn match_float64_by_prefix(
    bs: &BlockSearch<'_>,
    ch: &ColumnHeader,
    bm: &mut Bitmap,
    prefix: &str,
    tokens: &[u64],
) {
    if prefix.is_empty() {
        return;
    }
    if try_parse_float64(prefix).is_err() && !matches!(prefix, "." | "+" | "-") {
        bm.reset_bits();
        return;
    }
    match_text_by(bs, ch, bm, tokens, |v| match_prefix(v, prefix));
}

pub(super) fn match_ipv4_by_prefix(
    bs: &BlockSearch<'_>,
    ch: &ColumnHeader,
    bm: &mut Bitmap,
    prefix: &str,
    tokens: &[u64],
) {
    if prefix.is_empty() {
        return;
    }
    if prefix.len() > MAX_IPV4_TEXT_LEN {
        bm.reset_bits();
        return;
    }
    match_text_by(bs, ch, bm, tokens, |v| match_prefix(v, prefix));
}

pub(super) fn match_timestamp_by_prefix(
    bs: &BlockSearch<'_>,
    ch: &ColumnHeader,
    bm: &mut Bitmap,
    prefix: &str,
    tokens: &[u64],
) {
    if prefix.is_empty() {
        return;
    }
    if prefix.len() > ISO8601_TIMESTAMP_LEN {
        bm.reset_bits();
        return;
    }
    match_text_by(bs, ch, bm, tokens, |v| match_prefix(v, prefix));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        block::MemBlock,
        filter::tests::{apply_to_all, bits},
        values::try_parse_timestamp_iso8601,
    };

    #[test]
    fn strings() {
        let values = ["category", "concatenate", "a cat", ""];
        let block = MemBlock::builder("p", vec![0; 4])
            .string_column("msg", &values)
            .dict_column("d", &values)
            .build()
            .expect("block");

        assert_eq!(apply_to_all(PrefixFilter::new("msg", "cat"), &block), bits("1010"));
        assert_eq!(apply_to_all(PrefixFilter::new("d", "cat"), &block), bits("1010"));
        assert_eq!(apply_to_all(PrefixFilter::new("msg", ""), &block), bits("1110"));
        assert_eq!(apply_to_all(PrefixFilter::new("msg", "a ca"), &block), bits("0010"));
        assert_eq!(apply_to_all(PrefixFilter::new("missing", ""), &block), bits("0000"));
    }

    #[test]
    fn typed_columns() {
        let ts = try_parse_timestamp_iso8601("2024-01-02T03:04:05.678Z").expect("ts");
        let block = MemBlock::builder("p", vec![0; 3])
            .uint_column("n", ValueType::Uint64, &[12, 123, 45])
            .float64_column("f", &[1.25, -1.5, 31.0])
            .ipv4_column("ip", &[0x0a00_0001, 0x0a0a_0a0a, 0x0b00_0001])
            .timestamp_iso8601_column("ts", &[ts, 0, ts])
            .build()
            .expect("block");

        assert_eq!(apply_to_all(PrefixFilter::new("n", "12"), &block), bits("110"));
        assert_eq!(apply_to_all(PrefixFilter::new("n", "999"), &block), bits("000"));
        assert_eq!(apply_to_all(PrefixFilter::new("n", ""), &block), bits("111"));

        assert_eq!(apply_to_all(PrefixFilter::new("f", "1."), &block), bits("110"));
        assert_eq!(apply_to_all(PrefixFilter::new("f", "-"), &block), bits("010"));
        assert_eq!(apply_to_all(PrefixFilter::new("f", "x"), &block), bits("000"));

        assert_eq!(apply_to_all(PrefixFilter::new("ip", "10."), &block), bits("110"));
        assert_eq!(apply_to_all(PrefixFilter::new("ip", "10.0.0.1"), &block), bits("100"));

        assert_eq!(apply_to_all(PrefixFilter::new("ts", "2024-01-0"), &block), bits("101"));
        assert_eq!(apply_to_all(PrefixFilter::new("ts", "1970"), &block), bits("010"));
    }

    #[test]
    fn display() {
        assert_eq!(PrefixFilter::new("", "foo").to_string(), "foo*");
        assert_eq!(PrefixFilter::new("x", "").to_string(), "x:*");
    }
}
