//! Montgomery reduction.
//!
//! For an odd modulus `p` of `n` words, let `R = 2^(w*n)`. Given
//! `T < p*R`, Montgomery reduction computes `T/R mod p` with only
//! multiplications and additions: for each word, a multiple of `p` is
//! added that clears the lowest remaining word, and the result is then
//! shifted down by `n` words. The final conditional subtraction of `p` is
//! done with a mask, so that the whole operation is constant-time.

use crate::backend::Word;
use crate::{Error, Result};
use super::{add_word, cnd_select, mul_add_words, sub3};
use crate::backend::cc_mask;

/// Computes `-1/x mod 2^w` for an odd word `x`.
pub fn word_neg_inverse(x: Word) -> Result<Word> {
    if (x & 1) == 0 {
        return Err(Error::InvalidArgument("word inverse of an even value"));
    }
    Ok(ninv(x))
}

// -1/x mod 2^w, for odd x. Each Newton iteration doubles the number of
// correct low bits; x*(2 - x) = 1 mod 4 gives the first two.
#[inline]
pub(crate) const fn ninv(x: Word) -> Word {
    let y = (2 as Word).wrapping_sub(x);
    let y = y.wrapping_mul((2 as Word).wrapping_sub(y.wrapping_mul(x)));
    let y = y.wrapping_mul((2 as Word).wrapping_sub(y.wrapping_mul(x)));
    let y = y.wrapping_mul((2 as Word).wrapping_sub(y.wrapping_mul(x)));
    let y = y.wrapping_mul((2 as Word).wrapping_sub(y.wrapping_mul(x)));
    let y = y.wrapping_mul((2 as Word).wrapping_sub(y.wrapping_mul(x)));
    y.wrapping_neg()
}

/// Montgomery reduction of `z` modulo `p`.
///
/// `z` holds the input value `T`, which must be lower than `p*R`; it
/// must have length at least `2*n + 1` where `n = p.len()`. On output,
/// `z[0..n]` contains `T/R mod p` (fully reduced) and all other words of
/// `z` are zero. `p_dash` must be `-1/p mod 2^w` (see
/// `word_neg_inverse()`). `ws` is a scratch area of at least `n + 1`
/// words.
pub fn monty_redc(z: &mut [Word], p: &[Word], p_dash: Word, ws: &mut [Word])
    -> Result<()>
{
    let n = p.len();
    if n == 0 || (p[0] & 1) == 0 {
        return Err(Error::InvalidArgument("Montgomery modulus must be odd"));
    }
    if z.len() < 2 * n + 1 {
        return Err(Error::InvalidArgument("reduction input too small"));
    }
    if ws.len() < n + 1 {
        return Err(Error::InvalidArgument("reduction workspace too small"));
    }
    redc(z, p, p_dash, ws);
    Ok(())
}

// Unchecked version of monty_redc().
pub(crate) fn redc(z: &mut [Word], p: &[Word], p_dash: Word, ws: &mut [Word]) {
    let n = p.len();
    let zz = &mut z[..(2 * n + 1)];
    for i in 0..n {
        let u = zz[i].wrapping_mul(p_dash);
        let hi = mul_add_words(&mut zz[i..(i + n)], p, u);
        add_word(&mut zz[(i + n)..], hi);
    }

    // t = zz[n..2n+1] < 2*p; compute t - p and keep it if there was no
    // borrow.
    let (lo, t) = zz.split_at_mut(n);
    let cc = sub3(&mut ws[..(n + 1)], t, p);
    cnd_select(lo, &ws[..n], &t[..n], cc_mask(cc));
    z[n..].fill(0);
}
