use std::fmt;

use crate::{
    bitmap::{get_bitmap, Bitmap},
    block::BlockSearch,
    filter::Filter,
};

/// Rows matching at least one child.
///
/// Each child only sees rows no earlier child has matched yet, so rows are
/// never re-proven and evaluation stops once every candidate row matched.
#[derive(Debug)]
pub struct OrFilter {
    filters: Vec<Filter>,
}

impl OrFilter {
    /// Disjunction of `filters`; an empty disjunction matches no rows.
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    /// Children in evaluation order.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Narrow `bm` to rows matching any child.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        let mut result = get_bitmap(bm.len());
        let mut pending = get_bitmap(bm.len());
        for filter in &self.filters {
            pending.copy_from(bm);
            pending.and_not(&result);
            if pending.is_zero() {
                break;
            }
            filter.apply(bs, &mut pending);
            result.or(&pending);
        }
        bm.copy_from(&result);
    }
}

impl fmt::Display for OrFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(" or ")?;
            }
            write!(f, "{filter}")?;
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
    fn unions_children() {
        let block = MemBlock::builder("p", vec![0; 4])
            .string_column("msg", &["a", "b", "c", "a b"])
            .build()
            .expect("block");

        let f = Filter::or([Filter::phrase("msg", "a"), Filter::phrase("msg", "b")]);
        assert_eq!(apply_to_all(f, &block), bits("1101"));
        assert_eq!(apply_to_all(Filter::or([]), &block), bits("0000"));
    }

    #[test]
    fn restricted_to_input_rows() {
        let block = MemBlock::builder("p", vec![0; 3])
            .string_column("msg", &["a", "a", "b"])
            .build()
            .expect("block");
        let f = Filter::or([Filter::phrase("msg", "a"), Filter::phrase("msg", "b")]);
        let config = Default::default();
        let bs = BlockSearch::new(&block, &config);
        let mut bm = bits("011");
        f.apply(&bs, &mut bm);
        assert_eq!(bm, bits("011"));
    }

    #[test]
    fn stops_once_everything_matched() {
        let block = MemBlock::builder("p", vec![0; 2])
            .string_column("msg", &["a", "a"])
            .build()
            .expect("block");
        // the regexp child would match nothing, but it is never reached
        let f = Filter::or([
            Filter::phrase("msg", "a"),
            Filter::regexp("msg", "^$").expect("regexp"),
        ]);
        assert_eq!(apply_to_all(f, &block), bits("11"));
    }
}
