//! Multi-precision arithmetic on word buffers.
//!
//! The functions in this module and its submodules operate on slices of
//! `Word`, interpreted as unsigned integers in little-endian word order
//! (least significant word first). They never allocate: the caller
//! provides the output buffer and, for the recursive algorithms, a
//! scratch workspace.
//!
//! Public functions check their buffer sizes and return
//! `Error::InvalidArgument` before writing anything if a buffer is too
//! small. Crate-internal helpers assume their preconditions (a violation
//! there is a bug in this crate and panics through slice indexing).
//!
//! All primitives are constant-time with regard to the _values_ of the
//! words; only buffer lengths may influence the sequence of executed
//! instructions.

use crate::backend::{Word, addcarry, subborrow, umull_add, umull_add2, cc_mask};
use crate::{Error, Result};

pub mod basecase;
pub mod comba;
pub mod karatsuba;
pub mod dispatch;
pub mod monty;

pub use basecase::{basecase_mul, basecase_sqr};
pub use comba::{COMBA_SIZES, comba_mul_n, comba_sqr_n};
pub use karatsuba::{karatsuba_mul, karatsuba_sqr,
    KARATSUBA_MUL_THRESHOLD, KARATSUBA_SQR_THRESHOLD};
pub use dispatch::{mul, sqr, karatsuba_size, workspace_len};
pub use monty::{monty_redc, word_neg_inverse};

/// Adds `x` and `y` into `z`.
///
/// `z` must be at least as long as the longer of `x` and `y`. The sum
/// is written into the low words of `z`; extra words of `z`, if any,
/// are cleared. The carry out of the top of the longer input (0 or 1) is
/// returned.
pub fn add(z: &mut [Word], x: &[Word], y: &[Word]) -> Result<Word> {
    let n = core::cmp::max(x.len(), y.len());
    if z.len() < n {
        return Err(Error::InvalidArgument("sum output shorter than operands"));
    }
    let (x, y) = if x.len() >= y.len() { (x, y) } else { (y, x) };
    let cc = add3(&mut z[..n], x, y);
    z[n..].fill(0);
    Ok(cc as Word)
}

/// Subtracts `y` from `x` into `z`.
///
/// `z` must be at least as long as the longer of `x` and `y`. The
/// difference, modulo 2^(w*len), is written into the low words of `z`;
/// extra words are cleared. The final borrow (0 or 1) is returned.
pub fn sub(z: &mut [Word], x: &[Word], y: &[Word]) -> Result<Word> {
    let n = core::cmp::max(x.len(), y.len());
    if z.len() < n {
        return Err(Error::InvalidArgument("difference output shorter than operands"));
    }
    let cc = sub3(&mut z[..n], x, y);
    z[n..].fill(0);
    Ok(cc as Word)
}

/// Computes `|x - y|` into `z`.
///
/// `z` must be at least as long as the longer of `x` and `y`. Returned
/// value is an all-ones word if `x < y` (the difference was negated),
/// zero otherwise. The same instruction sequence is executed in both
/// cases.
pub fn abs_sub(z: &mut [Word], x: &[Word], y: &[Word]) -> Result<Word> {
    let n = core::cmp::max(x.len(), y.len());
    if z.len() < n {
        return Err(Error::InvalidArgument("difference output shorter than operands"));
    }
    let s = abs_sub3(&mut z[..n], x, y);
    z[n..].fill(0);
    Ok(s)
}

/// Adds `x*y` to the accumulator `z`.
///
/// `z` must be at least as long as `x`. The carry is propagated over
/// the whole of `z`, including the words beyond the length of `x`; the
/// carry out of the top word of `z` is returned.
pub fn mul_add(z: &mut [Word], x: &[Word], y: Word) -> Result<Word> {
    let n = x.len();
    if z.len() < n {
        return Err(Error::InvalidArgument("accumulator shorter than operand"));
    }
    let hi = mul_add_words(&mut z[..n], x, y);
    Ok(add_word(&mut z[n..], hi))
}

/// Sets `z` to `x*y`.
///
/// `z` must have length at least `x.len() + 1`; words above the product
/// are cleared.
pub fn linmul(z: &mut [Word], x: &[Word], y: Word) -> Result<()> {
    if z.len() < x.len() + 1 {
        return Err(Error::InvalidArgument("product output too small"));
    }
    linmul3(z, x, y);
    Ok(())
}

// ========================================================================
// Unchecked internal helpers.

// z <- x + y, with len(z) = len(x) >= len(y); returns the carry.
#[inline]
pub(crate) fn add3(z: &mut [Word], x: &[Word], y: &[Word]) -> u8 {
    let mut cc = 0;
    for i in 0..z.len() {
        let yw = if i < y.len() { y[i] } else { 0 };
        (z[i], cc) = addcarry(x[i], yw, cc);
    }
    cc
}

// x <- x + y, with len(x) >= len(y); carry is propagated over all of x.
#[inline]
pub(crate) fn add2(x: &mut [Word], y: &[Word]) -> u8 {
    let mut cc = 0;
    for i in 0..x.len() {
        let yw = if i < y.len() { y[i] } else { 0 };
        (x[i], cc) = addcarry(x[i], yw, cc);
    }
    cc
}

// x <- x + w; the carry ripples through all of x (every word is
// processed, regardless of where the carry stops).
#[inline]
pub(crate) fn add_word(x: &mut [Word], w: Word) -> Word {
    let mut r = w;
    for i in 0..x.len() {
        let (d, cc) = addcarry(x[i], r, 0);
        x[i] = d;
        r = cc as Word;
    }
    r
}

// z <- x - y, over max(len(x), len(y)) = len(z) words; returns the borrow.
#[inline]
pub(crate) fn sub3(z: &mut [Word], x: &[Word], y: &[Word]) -> u8 {
    let mut cc = 0;
    for i in 0..z.len() {
        let xw = if i < x.len() { x[i] } else { 0 };
        let yw = if i < y.len() { y[i] } else { 0 };
        (z[i], cc) = subborrow(xw, yw, cc);
    }
    cc
}

// x <- x - y, with len(x) >= len(y); returns the borrow.
#[inline]
pub(crate) fn sub2(x: &mut [Word], y: &[Word]) -> u8 {
    let mut cc = 0;
    for i in 0..x.len() {
        let yw = if i < y.len() { y[i] } else { 0 };
        (x[i], cc) = subborrow(x[i], yw, cc);
    }
    cc
}

// z <- |x - y|; returns -1 (all-ones) if x < y, 0 otherwise.
pub(crate) fn abs_sub3(z: &mut [Word], x: &[Word], y: &[Word]) -> Word {
    let cc = sub3(z, x, y);
    let s = cc_mask(cc);

    // Conditional negation: (z ^ s) - s.
    let mut cc = 0;
    for i in 0..z.len() {
        (z[i], cc) = subborrow(z[i] ^ s, s, cc);
    }
    s
}

// z <- z + x (if ctl = 0) or z - x (if ctl = -1), with x implicitly
// sign-extended to the length of z. The final carry is dropped: callers
// use this only when the exact result fits in z.
pub(crate) fn cnd_add_or_sub(z: &mut [Word], x: &[Word], ctl: Word) {
    let mut cc = (ctl & 1) as u8;
    for i in 0..z.len() {
        let xw = if i < x.len() { x[i] } else { 0 };
        (z[i], cc) = addcarry(z[i], xw ^ ctl, cc);
    }
}

// d <- a (if ctl = 0) or b (if ctl = -1); all three have the same length.
#[inline]
pub(crate) fn cnd_select(d: &mut [Word], a: &[Word], b: &[Word], ctl: Word) {
    for i in 0..d.len() {
        d[i] = a[i] ^ (ctl & (a[i] ^ b[i]));
    }
}

// z[0..n] <- z[0..n] + x*y, with n = len(x) = len(z); returns the high word.
#[inline]
pub(crate) fn mul_add_words(z: &mut [Word], x: &[Word], y: Word) -> Word {
    let mut hi = 0;
    for i in 0..x.len() {
        (z[i], hi) = umull_add2(x[i], y, z[i], hi);
    }
    hi
}

// z <- x*y, with len(z) > len(x); words above x.len() + 1 are cleared.
#[inline]
pub(crate) fn linmul3(z: &mut [Word], x: &[Word], y: Word) {
    let n = x.len();
    let mut hi = 0;
    for i in 0..n {
        (z[i], hi) = umull_add(x[i], y, hi);
    }
    z[n] = hi;
    z[(n + 1)..].fill(0);
}

// Number of significant words (index of the top non-zero word, plus one).
// This leaks the position of the top non-zero word.
#[inline]
pub(crate) fn sig_words(x: &[Word]) -> usize {
    let mut n = x.len();
    while n > 0 && x[n - 1] == 0 {
        n -= 1;
    }
    n
}

// Compare two equal-length buffers; returns -1, 0 or +1. NOT constant-time.
pub(crate) fn cmp_vartime(x: &[Word], y: &[Word]) -> i32 {
    let xn = sig_words(x);
    let yn = sig_words(y);
    if xn != yn {
        return if xn < yn { -1 } else { 1 };
    }
    for i in (0..xn).rev() {
        if x[i] != y[i] {
            return if x[i] < y[i] { -1 } else { 1 };
        }
    }
    0
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::backend::WORD_MAX;

    #[test]
    fn add_sub() {
        let x = [WORD_MAX, WORD_MAX, 1];
        let y = [1];
        let mut z = [7; 4];
        assert_eq!(add(&mut z, &x, &y).unwrap(), 0);
        assert_eq!(z, [0, 0, 2, 0]);
        let mut z = [0; 3];
        assert_eq!(add(&mut z, &[WORD_MAX; 3], &[1]).unwrap(), 1);
        assert_eq!(z, [0; 3]);
        let mut z = [0; 2];
        assert_eq!(add(&mut z, &x, &y), Err(Error::InvalidArgument("sum output shorter than operands")));
        assert_eq!(z, [0; 2]);

        let mut z = [0; 3];
        assert_eq!(sub(&mut z, &[0, 0, 2], &[1]).unwrap(), 0);
        assert_eq!(z, [WORD_MAX, WORD_MAX, 1]);
        assert_eq!(sub(&mut z, &[1], &[2, 0, 0]).unwrap(), 1);
        assert_eq!(z, [WORD_MAX, WORD_MAX, WORD_MAX]);
    }

    #[test]
    fn abs_difference() {
        let mut z = [0; 2];
        let s = abs_sub(&mut z, &[5, 1], &[7, 0]).unwrap();
        assert_eq!(s, 0);
        assert_eq!(z, [WORD_MAX - 1, 0]);
        let s = abs_sub(&mut z, &[7, 0], &[5, 1]).unwrap();
        assert_eq!(s, WORD_MAX);
        assert_eq!(z, [WORD_MAX - 1, 0]);
        let s = abs_sub(&mut z, &[3, 3], &[3, 3]).unwrap();
        assert_eq!(s, 0);
        assert_eq!(z, [0, 0]);
    }

    #[test]
    fn mul_accumulate() {
        // (2^w - 1) * (2^w - 1) added to an accumulator that already
        // holds 2^w - 1 in every word: the carry must run to the top.
        let mut z = [WORD_MAX; 4];
        let c = mul_add(&mut z, &[WORD_MAX], WORD_MAX).unwrap();
        assert_eq!(c, 1);
        assert_eq!(z, [0, WORD_MAX - 1, 0, 0]);

        let mut z = [0; 3];
        assert!(mul_add(&mut z, &[1, 2, 3, 4], 5).is_err());

        let mut z = [9; 4];
        linmul(&mut z, &[WORD_MAX, 1], 2).unwrap();
        assert_eq!(z, [WORD_MAX - 1, 3, 0, 0]);
        assert!(linmul(&mut z[..2], &[1, 1], 2).is_err());
    }

    #[test]
    fn conditional_ops() {
        let mut z = [10, 0, 0];
        cnd_add_or_sub(&mut z, &[3], 0);
        assert_eq!(z, [13, 0, 0]);
        cnd_add_or_sub(&mut z, &[3], WORD_MAX);
        assert_eq!(z, [10, 0, 0]);
        let mut z = [0, 1, 0];
        cnd_add_or_sub(&mut z, &[1], WORD_MAX);
        assert_eq!(z, [WORD_MAX, 0, 0]);

        let mut d = [0; 2];
        cnd_select(&mut d, &[1, 2], &[3, 4], 0);
        assert_eq!(d, [1, 2]);
        cnd_select(&mut d, &[1, 2], &[3, 4], WORD_MAX);
        assert_eq!(d, [3, 4]);

        assert_eq!(cmp_vartime(&[1, 2], &[2, 1]), 1);
        assert_eq!(cmp_vartime(&[1, 0], &[1, 0]), 0);
        assert_eq!(cmp_vartime(&[0, 0], &[1, 0]), -1);
        assert_eq!(sig_words(&[1, 0, 0]), 1);
        assert_eq!(sig_words(&[0, 0]), 0);
    }
}
