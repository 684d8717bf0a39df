//! Per-column token bloom filters.
//!
//! Filters hold token hashes produced by [`crate::tokenizer`]. A negative
//! answer is definitive; a positive one may be a false positive.

use xxhash_rust::xxh64::xxh64;

use crate::tokenizer::tokenize_hashes;

/// Number of probes per token.
pub const BLOOM_HASHES_COUNT: u64 = 6;

/// Bits allocated per distinct token.
pub const BLOOM_BITS_PER_ITEM: usize = 16;

/// Bloom filter over token hashes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BloomFilter {
    bits: Vec<u64>,
}

impl BloomFilter {
    /// Build a filter holding the given token hashes.
    #[must_use]
    pub fn from_hashes(hashes: &[u64]) -> Self {
        let bits_count = (hashes.len() * BLOOM_BITS_PER_ITEM).max(64);
        let mut bits = vec![0u64; bits_count.div_ceil(64)];
        let max_bits = (bits.len() * 64) as u64;
        for &h in hashes {
            for seed in 0..BLOOM_HASHES_COUNT {
                let idx = probe(h, seed) % max_bits;
                bits[(idx / 64) as usize] |= 1u64 << (idx % 64);
            }
        }
        Self { bits }
    }

    /// Build a filter from the tokens of `values`.
    #[must_use]
    pub fn from_values<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut hashes = Vec::new();
        tokenize_hashes(&mut hashes, values);
        Self::from_hashes(&hashes)
    }

    /// Returns false when at least one of `hashes` is definitely absent.
    #[must_use]
    pub fn contains_all(&self, hashes: &[u64]) -> bool {
        if self.bits.is_empty() {
            return hashes.is_empty();
        }
        let max_bits = (self.bits.len() * 64) as u64;
        hashes.iter().all(|&h| {
            (0..BLOOM_HASHES_COUNT).all(|seed| {
                let idx = probe(h, seed) % max_bits;
                self.bits[(idx / 64) as usize] & (1u64 << (idx % 64)) != 0
            })
        })
    }

    /// Size of the bit array in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.bits.len() * 8
    }
}

#[inline]
fn probe(hash: u64, seed: u64) -> u64 {
    xxh64(&hash.to_le_bytes(), seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{hash_tokens, token_hash};

    #[test]
    fn no_false_negatives() {
        let values: Vec<String> = (0..500).map(|i| format!("user_{i} logged in")).collect();
        let bf = BloomFilter::from_values(values.iter().map(String::as_str));
        for value in &values {
            assert!(bf.contains_all(&hash_tokens(value)), "{value}");
        }
        assert!(bf.contains_all(&[]));
    }

    #[test]
    fn rejects_most_absent_tokens() {
        let bf = BloomFilter::from_values(["error connecting to db", "warn slow query"]);
        let absent = (0..1000)
            .filter(|i| !bf.contains_all(&[token_hash(&format!("absent{i}"))]))
            .count();
        assert!(absent > 900, "only {absent} of 1000 absent tokens rejected");
        assert!(!bf.contains_all(&[token_hash("error"), token_hash("missing")]));
    }

    #[test]
    fn empty_filter_contains_nothing() {
        let bf = BloomFilter::default();
        assert!(!bf.contains_all(&[token_hash("x")]));
        assert!(bf.contains_all(&[]));
        assert_eq!(bf.size_bytes(), 0);
    }
}
