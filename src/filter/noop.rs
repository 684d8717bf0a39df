use std::fmt;

use crate::{bitmap::Bitmap, block::BlockSearch};

/// `*`: matches every row.
#[derive(Debug, Default)]
pub struct NoopFilter;

impl NoopFilter {
    /// Leaves `bm` untouched.
    pub fn apply(&self, _bs: &BlockSearch<'_>, _bm: &mut Bitmap) {}
}

impl fmt::Display for NoopFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("*")
    }
}
