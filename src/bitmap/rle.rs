//! Run-length encoded boolean masks.
//!
//! A stream is a sequence of unsigned LEB128 run lengths alternating between
//! zero-runs and one-runs, always starting with a (possibly empty) zero-run.
//! Encoders emit the full bit length, so the trailing zero-run is explicit
//! whenever the source ended with zeros. Operations here walk runs directly and
//! never materialize a dense bitmap.

use super::Bitmap;

/// Run-length encoded bit mask.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoolRle {
    buf: Vec<u8>,
}

impl BoolRle {
    /// Wrap raw encoded bytes.
    #[must_use]
    pub fn from_bytes(buf: Vec<u8>) -> Self {
        Self { buf }
    }

    /// Encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Iterate over `(bit, run_len)` pairs, skipping nothing.
    #[must_use]
    pub fn runs(&self) -> RleRuns<'_> {
        RleRuns {
            src: &self.buf,
            next_bit: false,
        }
    }

    /// Total number of bits described by the stream.
    #[must_use]
    pub fn bits_len(&self) -> u64 {
        self.runs().map(|(_, len)| len).sum()
    }

    /// Number of one bits described by the stream.
    #[must_use]
    pub fn ones_count(&self) -> u64 {
        self.runs()
            .filter_map(|(bit, len)| bit.then_some(len))
            .sum()
    }

    /// Union of two streams, computed by walking both run sequences in lockstep.
    ///
    /// The shorter stream reads as zeros past its end; the result spans the
    /// longer of the two.
    #[must_use]
    pub fn union(&self, other: &BoolRle) -> BoolRle {
        let mut dst = Vec::with_capacity(self.buf.len().max(other.buf.len()));
        let mut writer = RunWriter::new(&mut dst);
        let mut lhs = RunCursor::new(self.runs());
        let mut rhs = RunCursor::new(other.runs());
        loop {
            let step = match (lhs.remaining(), rhs.remaining()) {
                (None, None) => break,
                (Some(n), None) | (None, Some(n)) => n,
                (Some(a), Some(b)) => a.min(b),
            };
            writer.push(lhs.bit() || rhs.bit(), step);
            lhs.advance(step);
            rhs.advance(step);
        }
        writer.finish();
        BoolRle { buf: dst }
    }

    /// Clear the bits of `dst` covered by one-runs.
    ///
    /// Runs extending past `dst.len()` are clamped.
    pub fn and_not_rle(&self, dst: &mut Bitmap) {
        let mut offset = 0u64;
        for (bit, len) in self.runs() {
            let end = offset.saturating_add(len);
            if bit {
                dst.clear_range(clamp_usize(offset), clamp_usize(end));
            }
            offset = end;
            if offset >= dst.len() as u64 {
                break;
            }
        }
    }

    /// Call `f` with the index of every zero bit, in ascending order.
    pub fn for_each_zero_bit<F>(&self, mut f: F)
    where
        F: FnMut(u64),
    {
        let mut offset = 0u64;
        for (bit, len) in self.runs() {
            if !bit {
                for idx in offset..offset + len {
                    f(idx);
                }
            }
            offset += len;
        }
    }
}

/// Iterator over `(bit, run_len)` pairs of a [`BoolRle`].
#[derive(Clone, Debug)]
pub struct RleRuns<'a> {
    src: &'a [u8],
    next_bit: bool,
}

impl Iterator for RleRuns<'_> {
    type Item = (bool, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.src.is_empty() {
            return None;
        }
        let (len, consumed) = decode_varint(self.src);
        self.src = &self.src[consumed..];
        let bit = self.next_bit;
        self.next_bit = !bit;
        Some((bit, len))
    }
}

// Tracks the run under the read head of one stream during a merge.
struct RunCursor<'a> {
    runs: RleRuns<'a>,
    bit: bool,
    remaining: u64,
}

impl<'a> RunCursor<'a> {
    fn new(runs: RleRuns<'a>) -> Self {
        let mut cursor = Self {
            runs,
            bit: false,
            remaining: 0,
        };
        cursor.refill();
        cursor
    }

    fn refill(&mut self) {
        while self.remaining == 0 {
            match self.runs.next() {
                Some((bit, len)) => {
                    self.bit = bit;
                    self.remaining = len;
                }
                None => return,
            }
        }
    }

    fn remaining(&self) -> Option<u64> {
        (self.remaining > 0).then_some(self.remaining)
    }

    // Exhausted streams read as zeros.
    fn bit(&self) -> bool {
        self.remaining > 0 && self.bit
    }

    fn advance(&mut self, step: u64) {
        if self.remaining == 0 {
            return;
        }
        self.remaining -= step;
        self.refill();
    }
}

/// Accumulates runs, merging neighbours of equal polarity before writing.
pub(crate) struct RunWriter<'a> {
    dst: &'a mut Vec<u8>,
    bit: bool,
    len: u64,
    written: bool,
}

impl<'a> RunWriter<'a> {
    pub(crate) fn new(dst: &'a mut Vec<u8>) -> Self {
        Self {
            dst,
            bit: false,
            len: 0,
            written: false,
        }
    }

    pub(crate) fn push(&mut self, bit: bool, len: u64) {
        if len == 0 {
            return;
        }
        if bit == self.bit {
            self.len += len;
            return;
        }
        self.flush();
        self.bit = bit;
        self.len = len;
    }

    pub(crate) fn finish(mut self) {
        if self.len > 0 || !self.written {
            self.flush();
        }
    }

    fn flush(&mut self) {
        encode_varint(self.dst, self.len);
        self.written = true;
    }
}

fn encode_varint(dst: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        dst.push((v as u8) | 0x80);
        v >>= 7;
    }
    dst.push(v as u8);
}

fn decode_varint(src: &[u8]) -> (u64, usize) {
    let mut value = 0u64;
    for (i, &byte) in src.iter().enumerate() {
        let shift = 7 * i as u32;
        if shift >= 64 {
            break;
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return (value, i + 1);
        }
    }
    panic!("FATAL: truncated or oversized varint in run-length encoded mask");
}

fn clamp_usize(v: u64) -> usize {
    usize::try_from(v).unwrap_or(usize::MAX)
}
