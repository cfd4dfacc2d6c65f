//! Word-size backends.
//!
//! Big integers are sequences of machine words. This module selects the
//! word type (`Word`) and the matching double-width type (`DWord`) and
//! exposes the few carrying primitives that everything else is built
//! upon. Two backends are provided:
//!
//!  - `w64`: 64-bit words, products computed over `u128`.
//!
//!  - `w32`: 32-bit words, products computed over `u64`.
//!
//! The backend is selected from the target pointer width, unless one of
//! the `w32_backend` or `w64_backend` features is set. The two features
//! are mutually exclusive.
//!
//! All primitives are constant-time: carries and borrows are returned as
//! values (0 or 1, in a `u8`), never turned into conditional jumps.
//! Functions that need a secret Boolean use a full-width `Word` mask,
//! with the convention that all-ones means "true" and zero means "false".

#[cfg(all(feature = "w32_backend", feature = "w64_backend"))]
compile_error!("cannot use the 32-bit and 64-bit backends simultaneously");

#[cfg(not(any(
    feature = "w32_backend",
    feature = "w64_backend",
    target_pointer_width = "32",
    target_pointer_width = "64",
)))]
compile_error!("no backend specified; cannot infer from pointer size");

#[cfg(any(
    feature = "w32_backend",
    all(not(feature = "w64_backend"), target_pointer_width = "32"),
))]
mod w32;

#[cfg(any(
    feature = "w32_backend",
    all(not(feature = "w64_backend"), target_pointer_width = "32"),
))]
pub use w32::{Word, DWord};

#[cfg(any(
    feature = "w32_backend",
    all(not(feature = "w64_backend"), target_pointer_width = "32"),
))]
pub(crate) use w32::{addcarry, subborrow, umull, umull_add, umull_add2, sgnw, divword_vartime};

#[cfg(any(
    feature = "w64_backend",
    all(not(feature = "w32_backend"), target_pointer_width = "64"),
))]
mod w64;

#[cfg(any(
    feature = "w64_backend",
    all(not(feature = "w32_backend"), target_pointer_width = "64"),
))]
pub use w64::{Word, DWord};

#[cfg(any(
    feature = "w64_backend",
    all(not(feature = "w32_backend"), target_pointer_width = "64"),
))]
pub(crate) use w64::{addcarry, subborrow, umull, umull_add, umull_add2, sgnw, divword_vartime};

/// Size of a word, in bits.
pub const WORD_BITS: usize = Word::BITS as usize;

/// Size of a word, in bytes.
pub const WORD_BYTES: usize = WORD_BITS >> 3;

/// Largest word value.
pub const WORD_MAX: Word = Word::MAX;

// Expand a carry/borrow (0 or 1) into a full-width mask.
#[inline(always)]
pub(crate) const fn cc_mask(cc: u8) -> Word {
    (cc as Word).wrapping_neg()
}

// Return an all-ones mask if x == 0, zero otherwise.
#[inline(always)]
pub(crate) const fn zero_mask(x: Word) -> Word {
    // x | -x has its top bit set iff x != 0.
    sgnw(x | x.wrapping_neg()) ^ WORD_MAX
}

// Split 64-bit limbs (least significant first) into backend words.
pub(crate) fn words_from_u64le(limbs: &[u64]) -> alloc::vec::Vec<Word> {
    let per = 64 / WORD_BITS;
    let mut d = alloc::vec::Vec::with_capacity(limbs.len() * per);
    for &w in limbs {
        for j in 0..per {
            d.push((w >> (j * WORD_BITS)) as Word);
        }
    }
    d
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn carries() {
        let (d, cc) = addcarry(WORD_MAX, 1, 0);
        assert_eq!((d, cc), (0, 1));
        let (d, cc) = addcarry(WORD_MAX, WORD_MAX, 1);
        assert_eq!((d, cc), (WORD_MAX, 1));
        let (d, cc) = subborrow(0, 1, 0);
        assert_eq!((d, cc), (WORD_MAX, 1));
        let (d, cc) = subborrow(5, 3, 1);
        assert_eq!((d, cc), (1, 0));
        assert_eq!(cc_mask(1), WORD_MAX);
        assert_eq!(cc_mask(0), 0);
        assert_eq!(zero_mask(0), WORD_MAX);
        assert_eq!(zero_mask(1), 0);
        assert_eq!(zero_mask(WORD_MAX), 0);
    }

    #[test]
    fn products() {
        let (lo, hi) = umull(WORD_MAX, WORD_MAX);
        assert_eq!((lo, hi), (1, WORD_MAX - 1));
        let (lo, hi) = umull_add2(WORD_MAX, WORD_MAX, WORD_MAX, WORD_MAX);
        assert_eq!((lo, hi), (WORD_MAX, WORD_MAX));
        let (lo, hi) = umull_add(3, 5, 7);
        assert_eq!((lo, hi), (22, 0));
        assert_eq!(divword_vartime(1, 0, 2), (1 as Word) << (WORD_BITS - 1));
    }

    #[test]
    fn limb_split() {
        let d = words_from_u64le(&[0x0123456789ABCDEF, 0xFEDCBA9876543210]);
        assert_eq!(d.len(), 128 / WORD_BITS);
        assert_eq!(d[0] as u64 & 0xFFFFFFFF, 0x89ABCDEF);
        assert_eq!(d[d.len() - 1] as u64 >> (WORD_BITS - 32), 0xFEDCBA98);
    }
}
