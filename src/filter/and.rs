use std::fmt;

use once_cell::sync::OnceCell;

use crate::{
    bitmap::Bitmap,
    block::{BlockSearch, ValueType},
    filter::{bloom_gate::match_bloom_filter_all_tokens, Filter},
    tokenizer::hash_tokens,
};

/// Tokens every row must carry in one field for the AND node to match.
#[derive(Debug)]
struct FieldTokens {
    field: String,
    tokens: Vec<u64>,
}

/// Rows matching every child.
///
/// Children narrow the same bitmap in order and evaluation stops once it is
/// empty, so cheap selective children should come first.
#[derive(Debug)]
pub struct AndFilter {
    filters: Vec<Filter>,
    by_field_tokens: OnceCell<Vec<FieldTokens>>,
}

impl AndFilter {
    /// Conjunction of `filters`; an empty conjunction matches every row.
    pub fn new(filters: Vec<Filter>) -> Self {
        Self {
            filters,
            by_field_tokens: OnceCell::new(),
        }
    }

    /// Children in evaluation order.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Narrow `bm` to rows matching all children.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        if !self.match_by_field_tokens(bs) {
            bm.reset_bits();
            return;
        }
        for filter in &self.filters {
            filter.apply(bs, bm);
            if bm.is_zero() {
                return;
            }
        }
    }

    fn by_field_tokens(&self) -> &[FieldTokens] {
        self.by_field_tokens.get_or_init(|| {
            let mut out: Vec<FieldTokens> = Vec::new();
            for filter in &self.filters {
                let Some((field, tokens)) = filter.field_tokens() else {
                    continue;
                };
                if tokens.is_empty() {
                    continue;
                }
                match out.iter_mut().find(|ft| ft.field == field) {
                    Some(ft) => {
                        for &h in tokens {
                            if !ft.tokens.contains(&h) {
                                ft.tokens.push(h);
                            }
                        }
                    }
                    None => out.push(FieldTokens {
                        field: field.to_string(),
                        tokens: tokens.to_vec(),
                    }),
                }
            }
            out
        })
    }

    /// Block-level check of the tokens gathered from all children.
    ///
    /// Only string columns are probed: typed columns index the canonical
    /// text of their values, which a literal's tokens need not match.
    fn match_by_field_tokens(&self, bs: &BlockSearch<'_>) -> bool {
        for ft in self.by_field_tokens() {
            let v = bs.const_column_value(&ft.field);
            if !v.is_empty() {
                if !contains_all_tokens(v, &ft.tokens) {
                    return false;
                }
                continue;
            }
            let Some(ch) = bs.column_header(&ft.field) else {
                continue;
            };
            match ch.value_type() {
                ValueType::String => {
                    if !match_bloom_filter_all_tokens(bs, ch, &ft.tokens) {
                        return false;
                    }
                }
                ValueType::Dict => {
                    let found = ch
                        .values_dict()
                        .iter()
                        .any(|v| contains_all_tokens(v, &ft.tokens));
                    if !found {
                        return false;
                    }
                }
                _ => {}
            }
        }
        true
    }
}

fn contains_all_tokens(s: &str, tokens: &[u64]) -> bool {
    let have = hash_tokens(s);
    tokens.iter().all(|h| have.contains(h))
}

impl fmt::Display for AndFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match filter {
                Filter::Or(_) => write!(f, "({filter})")?,
                _ => write!(f, "{filter}")?,
            }
        }
        Ok(())
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
    fn narrows_and_short_circuits() {
        let block = MemBlock::builder("p", vec![0; 4])
            .string_column("msg", &["a b", "a", "b", "c"])
            .build()
            .expect("block");

        let f = Filter::and([Filter::phrase("msg", "a"), Filter::phrase("msg", "b")]);
        assert_eq!(apply_to_all(f, &block), bits("1000"));
        let f = Filter::and([Filter::phrase("msg", "zzz"), Filter::phrase("msg", "a")]);
        assert_eq!(apply_to_all(f, &block), bits("0000"));
        assert_eq!(apply_to_all(Filter::and([]), &block), bits("1111"));
    }

    #[test]
    fn field_tokens_reject_dicts_and_consts() {
        let block = MemBlock::builder("p", vec![0; 2])
            .dict_column("level", &["foo x", "bar y"])
            .const_column("host", "web 1")
            .build()
            .expect("block");

        let f = AndFilter::new(vec![
            Filter::phrase("level", "foo"),
            Filter::exact_prefix("level", "bar y"),
        ]);
        assert!(!f.match_by_field_tokens(&BlockSearch::new(&block, &Default::default())));
        assert_eq!(apply_to_all(f, &block), bits("00"));

        let f = AndFilter::new(vec![Filter::phrase("host", "web"), Filter::phrase("level", "x")]);
        assert_eq!(apply_to_all(f, &block), bits("10"));
        let f = AndFilter::new(vec![Filter::phrase("host", "db")]);
        assert_eq!(apply_to_all(f, &block), bits("00"));
    }

    #[test]
    fn typed_columns_are_not_probed() {
        let block = MemBlock::builder("p", vec![0; 2])
            .uint_column("n", ValueType::Uint8, &[7, 8])
            .build()
            .expect("block");
        // "007" is not a token of the column text, yet the row matches
        let f = AndFilter::new(vec![Filter::exact("n", "007")]);
        assert_eq!(apply_to_all(f, &block), bits("10"));
    }

    #[test]
    fn display_wraps_or_children() {
        let f = Filter::and([
            Filter::phrase("", "a"),
            Filter::or([Filter::phrase("", "b"), Filter::phrase("", "c")]),
        ]);
        assert_eq!(f.to_string(), "a (b or c)");
    }
}
