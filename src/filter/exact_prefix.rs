use std::fmt;

use once_cell::sync::OnceCell;

use crate::{
    bitmap::Bitmap,
    block::{BlockSearch, ColumnHeader, ValueType},
    filter::{
        field_name,
        matchers::{leaf_column, match_dict_by, match_text_by},
        prefix::MAX_IPV4_TEXT_LEN,
        quote_field_name, quote_token_if_needed,
    },
    tokenizer::{hash_token_list, tokenize_skip_last},
    values::{try_parse_uint64, ISO8601_TIMESTAMP_LEN},
};

/// `field:exact("prefix"*)`: the value starts with the literal, ignoring token boundaries.
#[derive(Debug)]
pub struct ExactPrefixFilter {
    field_name: String,
    prefix: String,
    tokens: OnceCell<Vec<u64>>,
}

impl ExactPrefixFilter {
    /// Match rows of `field` starting with `prefix`.
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

    pub(crate) fn tokens(&self) -> &[u64] {
        self.tokens
            .get_or_init(|| hash_token_list(&tokenize_skip_last(&self.prefix)))
    }

    /// Narrow `bm` to rows starting with the prefix.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        let prefix = self.prefix.as_str();
        let Some(ch) = leaf_column(bs, &self.field_name, bm, |v| v.starts_with(prefix)) else {
            return;
        };
        let tokens = self.tokens();
        let config = bs.config();
        match ch.value_type() {
            ValueType::String => match_text_by(bs, ch, bm, tokens, |v| v.starts_with(prefix)),
            ValueType::Dict => match_dict_by(bs, ch, bm, |v| v.starts_with(prefix)),
            ValueType::Uint8 | ValueType::Uint16 | ValueType::Uint32 | ValueType::Uint64 => {
                if match_min_max_exact_prefix(ch, bm, prefix, tokens) {
                    match_text_by(bs, ch, bm, &[], |v| v.starts_with(prefix));
                }
            }
            ValueType::Float64 => {
                if prefix.is_empty() {
                    return;
                }
                if tokens.len() > config.float64_exact_prefix_max_tokens {
                    bm.reset_bits();
                    return;
                }
                match_text_by(bs, ch, bm, tokens, |v| v.starts_with(prefix));
            }
            ValueType::Ipv4 => {
                if prefix.is_empty() {
                    return;
                }
                if prefix.len() > MAX_IPV4_TEXT_LEN
                    || tokens.len() > config.ipv4_exact_prefix_max_tokens
                {
                    bm.reset_bits();
                    return;
                }
                match_text_by(bs, ch, bm, tokens, |v| v.starts_with(prefix));
            }
            ValueType::TimestampIso8601 => {
                if prefix.is_empty() {
                    return;
                }
                if prefix.len() > ISO8601_TIMESTAMP_LEN {
                    bm.reset_bits();
                    return;
                }
                match_text_by(bs, ch, bm, tokens, |v| v.starts_with(prefix));
            }
        }
    }
}

impl fmt::Display for ExactPrefixFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = quote_field_name(&self.field_name);
        if self.prefix.is_empty() {
            return write!(f, "{field}exact(*)");
        }
        write!(f, "{field}exact({}*)", quote_token_if_needed(&self.prefix))
    }
}

/// Cheap rejection for uint columns; returns true when rows still need a scan.
///
/// Decimal text is a single token, so a prefix holding a complete token
/// followed by more text can never match.
fn match_min_max_exact_prefix(
    ch: &ColumnHeader,
    bm: &mut Bitmap,
    prefix: &str,
    tokens: &[u64],
) -> bool {
    if prefix.is_empty() {
        return false;
    }
    if !tokens.is_empty() {
        bm.reset_bits();
        return false;
    }
    match try_parse_uint64(prefix) {
        Ok(n) if n <= ch.max_value() => true,
        _ => {
            bm.reset_bits();
            false
        }
    }
}
