//! Schoolbook multiplication and squaring.
//!
//! These are the always-applicable fallbacks: any operand lengths are
//! supported, and the cost is quadratic. Running time depends only on the
//! operand lengths.

use crate::backend::Word;
use crate::{Error, Result};
use super::mul_add_words;

/// Sets `z` to `x*y`.
///
/// `z` must have length at least `x.len() + y.len()`; extra words are
/// cleared.
pub fn basecase_mul(z: &mut [Word], x: &[Word], y: &[Word]) -> Result<()> {
    if z.len() < x.len() + y.len() {
        return Err(Error::InvalidArgument("product output too small"));
    }
    simple_mul(z, x, y);
    Ok(())
}

/// Sets `z` to `x^2`.
///
/// `z` must have length at least `2*x.len()`; extra words are cleared.
pub fn basecase_sqr(z: &mut [Word], x: &[Word]) -> Result<()> {
    if z.len() < 2 * x.len() {
        return Err(Error::InvalidArgument("square output too small"));
    }
    simple_sqr(z, x);
    Ok(())
}

// z <- x*y. Row i accumulates x*y[i] at offset i; the top word of each
// row lands in a not-yet-written position, so no carry propagation is
// needed.
pub(crate) fn simple_mul(z: &mut [Word], x: &[Word], y: &[Word]) {
    let m = x.len();
    z.fill(0);
    if m == 0 {
        return;
    }
    for (i, &yi) in y.iter().enumerate() {
        z[m + i] = mul_add_words(&mut z[i..(i + m)], x, yi);
    }
}

// z <- x^2, computed as a plain product: symmetry is deliberately not
// exploited here, so that this function can serve as a reference for the
// optimized squarings.
pub(crate) fn simple_sqr(z: &mut [Word], x: &[Word]) {
    simple_mul(z, x, x)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::backend::WORD_MAX;

    #[test]
    fn small() {
        let mut z = [5; 4];
        basecase_mul(&mut z, &[3], &[7, 1]).unwrap();
        assert_eq!(z, [21, 3, 0, 0]);

        let mut z = [0; 4];
        basecase_mul(&mut z, &[WORD_MAX, WORD_MAX], &[WORD_MAX, WORD_MAX]).unwrap();
        // (2^2w - 1)^2 = 2^4w - 2^(2w+1) + 1
        assert_eq!(z, [1, 0, WORD_MAX - 1, WORD_MAX]);

        let mut z2 = [0; 4];
        basecase_sqr(&mut z2, &[WORD_MAX, WORD_MAX]).unwrap();
        assert_eq!(z, z2);

        let mut z = [0; 3];
        assert!(basecase_mul(&mut z, &[1, 1], &[1, 1]).is_err());
        assert!(basecase_sqr(&mut z, &[1, 1]).is_err());
        assert_eq!(z, [0; 3]);
    }
}
