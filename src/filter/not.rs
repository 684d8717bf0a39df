use std::fmt;

use crate::{
    bitmap::{get_bitmap, Bitmap},
    block::BlockSearch,
    filter::Filter,
};

/// Rows the child does not match.
#[derive(Debug)]
pub struct NotFilter {
    filter: Box<Filter>,
}

impl NotFilter {
    /// Negation of `filter`.
    pub fn new(filter: Filter) -> Self {
        Self {
            filter: Box::new(filter),
        }
    }

    /// Negated child.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Remove from `bm` the rows the child matches.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        let mut matched = get_bitmap(bm.len());
        matched.copy_from(bm);
        self.filter.apply(bs, &mut matched);
        bm.and_not(&matched);
    }
}

impl fmt::Display for NotFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.filter.as_ref() {
            Filter::And(_) | Filter::Or(_) => write!(f, "!({})", self.filter),
            _ => write!(f, "!{}", self.filter),
        }
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
    fn complements_within_input() {
        let block = MemBlock::builder("p", vec![0; 3])
            .string_column("level", &["error", "warn", "error"])
            .build()
            .expect("block");

        let f = Filter::not(Filter::exact("level", "error"));
        assert_eq!(apply_to_all(f, &block), bits("010"));

        let config = Default::default();
        let bs = BlockSearch::new(&block, &config);
        let mut bm = bits("100");
        Filter::not(Filter::exact("level", "warn")).apply(&bs, &mut bm);
        assert_eq!(bm, bits("100"));
    }

    #[test]
    fn display() {
        assert_eq!(Filter::not(Filter::phrase("", "a")).to_string(), "!a");
        let f = Filter::not(Filter::or([Filter::phrase("", "a"), Filter::phrase("", "b")]));
        assert_eq!(f.to_string(), "!(a or b)");
    }
}
