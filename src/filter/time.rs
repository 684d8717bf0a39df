use std::fmt;

use crate::{bitmap::Bitmap, block::BlockSearch, values::timestamp_iso8601_string};

/// `_time:[min, max]`: the row timestamp lies within inclusive nanosecond bounds.
#[derive(Debug)]
pub struct TimeFilter {
    min_timestamp: i64,
    max_timestamp: i64,
}

impl TimeFilter {
    /// Match rows with timestamps in `[min_timestamp, max_timestamp]`.
    pub fn new(min_timestamp: i64, max_timestamp: i64) -> Self {
        Self {
            min_timestamp,
            max_timestamp,
        }
    }

    /// Narrow `bm` to rows within the time range.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        let (min, max) = (self.min_timestamp, self.max_timestamp);
        if min > max {
            bm.reset_bits();
            return;
        }
        let timestamps = bs.timestamps();
        let Some((lo, hi)) = min_max(timestamps) else {
            return;
        };
        if hi < min || lo > max {
            bm.reset_bits();
            return;
        }
        if lo >= min && hi <= max {
            return;
        }
        bm.for_each_set_bit(|idx| {
            let ts = timestamps[idx];
            ts >= min && ts <= max
        });
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "_time:[{}, {}]",
            timestamp_iso8601_string(self.min_timestamp),
            timestamp_iso8601_string(self.max_timestamp)
        )
    }
}

fn min_max(timestamps: &[i64]) -> Option<(i64, i64)> {
    let first = *timestamps.first()?;
    Some(
        timestamps
            .iter()
            .fold((first, first), |(lo, hi), &ts| (lo.min(ts), hi.max(ts))),
    )
}
