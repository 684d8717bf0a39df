//! Dense bit vector over the rows of one block.
//!
//! Bit `i` lives in `words[i / 64]` at position `i % 64`. Bits at or past
//! `bits_len` in the tail word are kept zero by every operation that could set
//! them, so emptiness and fullness checks never need to mask.

mod rle;

use std::fmt;

use once_cell::sync::Lazy;

pub use rle::{BoolRle, RleRuns};

use crate::pool::{Pool, Pooled, Reusable};

static BITMAP_POOL: Lazy<Pool<Bitmap>> = Lazy::new(Pool::default);

/// Bitmap borrowed from the process-wide pool.
pub type PooledBitmap = Pooled<'static, Bitmap>;

/// Take a bitmap sized to `bits_len` from the process-wide pool.
///
/// Bitmaps are cleared on release, so a freshly acquired bitmap reads as all
/// zeros; callers that need a specific start state still call
/// [`Bitmap::reset_bits`] or [`Bitmap::set_bits`].
pub fn get_bitmap(bits_len: usize) -> PooledBitmap {
    let mut bm = BITMAP_POOL.acquire();
    bm.resize(bits_len);
    bm
}

/// Dense bitmap with word-level set algebra.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Bitmap {
    words: Vec<u64>,
    bits_len: usize,
}

impl Reusable for Bitmap {
    fn clear_for_reuse(&mut self) {
        self.words.clear();
        self.bits_len = 0;
    }
}

impl Bitmap {
    /// Create a zeroed bitmap of `bits_len` bits.
    #[must_use]
    pub fn new(bits_len: usize) -> Self {
        Self {
            words: vec![0; words_for(bits_len)],
            bits_len,
        }
    }

    /// Number of addressable bits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits_len
    }

    /// Returns true when the bitmap addresses no bits at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits_len == 0
    }

    /// Reallocate storage for `bits_len` bits.
    ///
    /// Previous contents carry no guarantees afterwards.
    pub fn resize(&mut self, bits_len: usize) {
        self.words.resize(words_for(bits_len), 0);
        self.bits_len = bits_len;
    }

    /// Make `self` an exact copy of `src`, reusing storage.
    pub fn copy_from(&mut self, src: &Bitmap) {
        self.words.clear();
        self.words.extend_from_slice(&src.words);
        self.bits_len = src.bits_len;
    }

    /// Clear every bit.
    pub fn reset_bits(&mut self) {
        self.words.fill(0);
    }

    /// Set every bit below `len()`, leaving the tail of the last word zero.
    pub fn set_bits(&mut self) {
        self.words.fill(u64::MAX);
        self.clear_tail();
    }

    /// Returns true when no bit is set.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// Returns true when every bit below `len()` is set.
    #[must_use]
    pub fn are_all_bits_set(&self) -> bool {
        let full_words = self.bits_len / 64;
        if self.words[..full_words].iter().any(|&word| word != u64::MAX) {
            return false;
        }
        let tail_bits = self.bits_len % 64;
        if tail_bits == 0 {
            return true;
        }
        let mask = (1u64 << tail_bits) - 1;
        self.words[full_words] & mask == mask
    }

    /// Clear every bit that is set in `other`.
    ///
    /// # Panics
    ///
    /// Panics when the bitmaps have different lengths.
    pub fn and_not(&mut self, other: &Bitmap) {
        assert_same_len("and_not", self, other);
        for (word, &mask) in self.words.iter_mut().zip(&other.words) {
            *word &= !mask;
        }
    }

    /// Set every bit that is set in `other`.
    ///
    /// # Panics
    ///
    /// Panics when the bitmaps have different lengths.
    pub fn or(&mut self, other: &Bitmap) {
        assert_same_len("or", self, other);
        for (word, &mask) in self.words.iter_mut().zip(&other.words) {
            *word |= mask;
        }
    }

    /// Set bit `i`; the caller guarantees `i < len()`.
    pub fn set_bit(&mut self, i: usize) {
        self.words[i / 64] |= 1u64 << (i % 64);
    }

    /// Clear bit `i`; the caller guarantees `i < len()`.
    pub fn clear_bit(&mut self, i: usize) {
        self.words[i / 64] &= !(1u64 << (i % 64));
    }

    /// Returns whether bit `i` is set; the caller guarantees `i < len()`.
    #[must_use]
    pub fn is_set_bit(&self, i: usize) -> bool {
        self.words[i / 64] & (1u64 << (i % 64)) != 0
    }

    /// Number of set bits.
    #[must_use]
    pub fn ones_count(&self) -> usize {
        self.words
            .iter()
            .map(|word| word.count_ones() as usize)
            .sum()
    }

    /// Clear bits in `[start, end)`, clamped to `len()`.
    pub(crate) fn clear_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.bits_len);
        if start >= end {
            return;
        }
        let (first_word, last_word) = (start / 64, (end - 1) / 64);
        for word_idx in first_word..=last_word {
            let lo = if word_idx == first_word { start % 64 } else { 0 };
            let hi = if word_idx == last_word {
                (end - 1) % 64 + 1
            } else {
                64
            };
            self.words[word_idx] &= !range_mask(lo, hi);
        }
    }

    /// Visit set bits in ascending order, clearing those for which `f` returns false.
    pub fn for_each_set_bit<F>(&mut self, mut f: F)
    where
        F: FnMut(usize) -> bool,
    {
        for (word_idx, word) in self.words.iter_mut().enumerate() {
            let mut pending = *word;
            while pending != 0 {
                let bit = pending.trailing_zeros() as usize;
                let mask = 1u64 << bit;
                pending &= !mask;
                if !f(word_idx * 64 + bit) {
                    *word &= !mask;
                }
            }
        }
    }

    /// Visit set bits in ascending order without modifying the bitmap.
    pub fn for_each_set_bit_readonly<F>(&self, mut f: F)
    where
        F: FnMut(usize),
    {
        if self.are_all_bits_set() {
            for idx in 0..self.bits_len {
                f(idx);
            }
            return;
        }
        for (word_idx, &word) in self.words.iter().enumerate() {
            let mut pending = word;
            while pending != 0 {
                let bit = pending.trailing_zeros() as usize;
                pending &= pending - 1;
                f(word_idx * 64 + bit);
            }
        }
    }

    /// Serialize the bitmap as alternating zero/one run lengths.
    #[must_use]
    pub fn to_rle(&self) -> BoolRle {
        let mut dst = Vec::new();
        self.marshal_rle(&mut dst);
        BoolRle::from_bytes(dst)
    }

    /// Append the run-length encoding of the bitmap to `dst`.
    pub fn marshal_rle(&self, dst: &mut Vec<u8>) {
        let mut writer = rle::RunWriter::new(dst);
        let mut idx = 0;
        while idx < self.bits_len {
            let bit = self.is_set_bit(idx);
            let run_end = self.run_end(idx, bit);
            writer.push(bit, (run_end - idx) as u64);
            idx = run_end;
        }
        writer.finish();
    }

    // First index at or after `start` whose bit differs from `bit`, capped at `len()`.
    fn run_end(&self, start: usize, bit: bool) -> usize {
        let mut word_idx = start / 64;
        let mut offset = start % 64;
        while word_idx < self.words.len() {
            let word = if bit {
                !self.words[word_idx]
            } else {
                self.words[word_idx]
            };
            let remaining = word >> offset;
            if remaining != 0 {
                let idx = word_idx * 64 + offset + remaining.trailing_zeros() as usize;
                return idx.min(self.bits_len);
            }
            word_idx += 1;
            offset = 0;
        }
        self.bits_len
    }

    fn clear_tail(&mut self) {
        let tail_bits = self.bits_len % 64;
        if tail_bits != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << tail_bits) - 1;
            }
        }
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits: String = (0..self.bits_len)
            .map(|i| if self.is_set_bit(i) { '1' } else { '0' })
            .collect();
        write!(f, "Bitmap({bits})")
    }
}

fn words_for(bits_len: usize) -> usize {
    bits_len.div_ceil(64)
}

fn range_mask(lo: usize, hi: usize) -> u64 {
    let upper = if hi == 64 { u64::MAX } else { (1u64 << hi) - 1 };
    upper & !((1u64 << lo) - 1)
}

fn assert_same_len(op: &str, lhs: &Bitmap, rhs: &Bitmap) {
    if lhs.bits_len != rhs.bits_len {
        panic!(
            "FATAL: cannot apply {op} to bitmaps of different lengths; {} vs {}",
            lhs.bits_len, rhs.bits_len
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pattern(pattern: &[bool]) -> Bitmap {
        let mut bm = Bitmap::new(pattern.len());
        for (i, &bit) in pattern.iter().enumerate() {
            if bit {
                bm.set_bit(i);
            }
        }
        bm
    }

    fn random_pattern(rng: &mut fastrand::Rng, len: usize) -> Vec<bool> {
        let density = rng.u8(0..=4);
        (0..len).map(|_| rng.u8(0..4) < density).collect()
    }

    #[test]
    fn set_bits_masks_tail() {
        for len in [0, 1, 63, 64, 65, 127, 128, 200] {
            let mut bm = Bitmap::new(len);
            bm.set_bits();
            assert_eq!(bm.ones_count(), len, "len={len}");
            assert!(bm.are_all_bits_set());
            assert_eq!(bm.is_zero(), len == 0);
            bm.reset_bits();
            assert!(bm.is_zero());
            assert_eq!(bm.are_all_bits_set(), len == 0);
        }
    }

    #[test]
    fn set_bits_then_and_not_is_complement() {
        let mut rng = fastrand::Rng::with_seed(7);
        for len in [1, 5, 63, 64, 65, 130, 1000] {
            for _ in 0..20 {
                let pattern = random_pattern(&mut rng, len);
                let x = from_pattern(&pattern);
                let mut bm = Bitmap::new(len);
                bm.set_bits();
                bm.and_not(&x);
                for (i, &bit) in pattern.iter().enumerate() {
                    assert_eq!(bm.is_set_bit(i), !bit);
                }
                assert_eq!(bm.ones_count(), len - x.ones_count());
                assert_eq!(bm.is_zero(), bm.ones_count() == 0);
            }
        }
    }

    #[test]
    fn or_merges_bits() {
        let mut a = from_pattern(&[true, false, false, true]);
        let b = from_pattern(&[false, false, true, true]);
        a.or(&b);
        assert_eq!(a, from_pattern(&[true, false, true, true]));
    }

    #[test]
    #[should_panic(expected = "different lengths")]
    fn and_not_rejects_length_mismatch() {
        let mut a = Bitmap::new(10);
        a.and_not(&Bitmap::new(11));
    }

    #[test]
    fn for_each_set_bit_clears_only_rejected_bits() {
        let mut rng = fastrand::Rng::with_seed(11);
        for len in [3, 64, 100, 257] {
            let pattern = random_pattern(&mut rng, len);
            let mut bm = from_pattern(&pattern);
            let mut visited = Vec::new();
            bm.for_each_set_bit(|idx| {
                visited.push(idx);
                idx % 3 != 0
            });
            let expected: Vec<usize> = (0..len).filter(|&i| pattern[i]).collect();
            assert_eq!(visited, expected);
            for (i, &bit) in pattern.iter().enumerate() {
                assert_eq!(bm.is_set_bit(i), bit && i % 3 != 0, "bit {i}");
            }
        }
    }

    #[test]
    fn readonly_visit_matches_mutating_visit() {
        let mut rng = fastrand::Rng::with_seed(3);
        for len in [1, 64, 65, 300] {
            let mut full = Bitmap::new(len);
            full.set_bits();
            let mut seen = Vec::new();
            full.for_each_set_bit_readonly(|idx| seen.push(idx));
            assert_eq!(seen, (0..len).collect::<Vec<_>>());

            let sparse = from_pattern(&random_pattern(&mut rng, len));
            let mut readonly = Vec::new();
            sparse.for_each_set_bit_readonly(|idx| readonly.push(idx));
            let mut copy = sparse.clone();
            let mut mutating = Vec::new();
            copy.for_each_set_bit(|idx| {
                mutating.push(idx);
                true
            });
            assert_eq!(readonly, mutating);
            assert_eq!(copy, sparse);
        }
    }

    #[test]
    fn clear_range_spans_words() {
        let mut bm = Bitmap::new(200);
        bm.set_bits();
        bm.clear_range(60, 130);
        for i in 0..200 {
            assert_eq!(bm.is_set_bit(i), !(60..130).contains(&i), "bit {i}");
        }
        bm.clear_range(190, 500);
        assert_eq!(bm.ones_count(), 200 - 70 - 10);
    }

    #[test]
    fn pooled_bitmaps_come_back_zeroed() {
        {
            let mut bm = get_bitmap(130);
            bm.set_bits();
            assert_eq!(bm.ones_count(), 130);
        }
        let bm = get_bitmap(70);
        assert_eq!(bm.len(), 70);
        assert!(bm.is_zero());
    }
}
