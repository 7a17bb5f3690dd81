//! Fixed-width word decomposition of big integers.
//!
//! RSA signatures and moduli are far wider than a circuit field element, so the
//! circuit consumes them as `count` little-endian words of `bits` bits each.

use num_bigint::BigUint;
use num_traits::{One, Zero};

/// Result type for word operations.
pub type WordResult<T> = Result<T, WordError>;

/// Errors that can occur while splitting integers into words.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WordError {
    #[error("value of {value_bits} bits does not fit in {word_count} words of {word_bits} bits")]
    Overflow {
        value_bits: u64,
        word_bits: u32,
        word_count: usize,
    },

    #[error("word geometry must be non-zero (got {word_bits} bits x {word_count} words)")]
    InvalidGeometry { word_bits: u32, word_count: usize },
}

/// Little-endian sequence of fixed-width words (least-significant word first).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WordArray {
    words: Vec<BigUint>,
    word_bits: u32,
}

impl WordArray {
    /// The words, least-significant first.
    pub fn words(&self) -> &[BigUint] {
        &self.words
    }

    /// Width of each word in bits.
    pub fn word_bits(&self) -> u32 {
        self.word_bits
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Reassemble the integer these words encode.
    pub fn combine(&self) -> BigUint {
        combine(&self.words, self.word_bits)
    }

    pub fn into_words(self) -> Vec<BigUint> {
        self.words
    }
}

/// Split `value` into exactly `word_count` words of `word_bits` bits.
///
/// Fails with [`WordError::Overflow`] instead of truncating when
/// `value >= 2^(word_bits * word_count)`.
pub fn split(value: &BigUint, word_bits: u32, word_count: usize) -> WordResult<WordArray> {
    if word_bits == 0 || word_count == 0 {
        return Err(WordError::InvalidGeometry {
            word_bits,
            word_count,
        });
    }

    let capacity = u64::from(word_bits) * word_count as u64;
    if value.bits() > capacity {
        return Err(WordError::Overflow {
            value_bits: value.bits(),
            word_bits,
            word_count,
        });
    }

    let mask = (BigUint::one() << word_bits) - BigUint::one();
    let mut rest = value.clone();
    let mut words = Vec::with_capacity(word_count);
    for _ in 0..word_count {
        words.push(&rest & &mask);
        rest >>= word_bits;
    }
    debug_assert!(rest.is_zero());

    Ok(WordArray { words, word_bits })
}

/// Inverse of [`split`]: `sum(words[i] * 2^(word_bits * i))`.
pub fn combine(words: &[BigUint], word_bits: u32) -> BigUint {
    words
        .iter()
        .rev()
        .fold(BigUint::zero(), |acc, word| (acc << word_bits) + word)
}
