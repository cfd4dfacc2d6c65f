//! Comba (column-wise) multiplication and squaring for a few fixed sizes.
//!
//! The output is produced one column at a time: all partial products
//! `x[i]*y[j]` with `i + j = k` are summed in a three-word accumulator,
//! the low word is emitted as `z[k]`, and the accumulator is shifted down
//! by one word. Squarings compute each off-diagonal product once and add
//! it twice.
//!
//! Sizes are const generic parameters, so that loops are fully bounded at
//! compile time; only the sizes listed in `COMBA_SIZES` are dispatched to.

use crate::backend::{Word, WORD_BITS, addcarry, umull};
use crate::{Error, Result};

/// Operand sizes (in words) for which a Comba routine is used.
pub const COMBA_SIZES: [usize; 6] = [4, 6, 8, 9, 16, 24];

/// Sets `z` to `x*y` with a Comba routine of size `n`.
///
/// `n` must be one of `COMBA_SIZES`; `x` and `y` must have length at
/// least `n` (only the first `n` words are read), and `z` at least `2*n`
/// (only the first `2*n` words are written).
pub fn comba_mul_n(n: usize, z: &mut [Word], x: &[Word], y: &[Word])
    -> Result<()>
{
    check_sizes(n, z.len(), x.len(), y.len())?;
    mul_fixed(n, z, x, y);
    Ok(())
}

/// Sets `z` to `x^2` with a Comba routine of size `n`.
///
/// Size requirements are as for `comba_mul_n()`.
pub fn comba_sqr_n(n: usize, z: &mut [Word], x: &[Word]) -> Result<()> {
    check_sizes(n, z.len(), x.len(), x.len())?;
    sqr_fixed(n, z, x);
    Ok(())
}

fn check_sizes(n: usize, z_len: usize, x_len: usize, y_len: usize)
    -> Result<()>
{
    if !COMBA_SIZES.contains(&n) {
        return Err(Error::InvalidArgument("unsupported Comba size"));
    }
    if x_len < n || y_len < n || z_len < 2 * n {
        return Err(Error::InvalidArgument("buffer too small for Comba size"));
    }
    Ok(())
}

// Dispatch to the fixed-size routine. Caller guarantees that n is one of
// the supported sizes and that buffers are large enough.
pub(crate) fn mul_fixed(n: usize, z: &mut [Word], x: &[Word], y: &[Word]) {
    match n {
        4 => comba_mul::<4>(z, x, y),
        6 => comba_mul::<6>(z, x, y),
        8 => comba_mul::<8>(z, x, y),
        9 => comba_mul::<9>(z, x, y),
        16 => comba_mul::<16>(z, x, y),
        24 => comba_mul::<24>(z, x, y),
        _ => unreachable!(),
    }
}

pub(crate) fn sqr_fixed(n: usize, z: &mut [Word], x: &[Word]) {
    match n {
        4 => comba_sqr::<4>(z, x),
        6 => comba_sqr::<6>(z, x),
        8 => comba_sqr::<8>(z, x),
        9 => comba_sqr::<9>(z, x),
        16 => comba_sqr::<16>(z, x),
        24 => comba_sqr::<24>(z, x),
        _ => unreachable!(),
    }
}

// Three-word accumulator (c0, c1, c2) += x*y.
#[inline(always)]
fn word3_muladd(c: &mut [Word; 3], x: Word, y: Word) {
    let (lo, hi) = umull(x, y);
    let (d0, cc) = addcarry(c[0], lo, 0);
    let (d1, cc) = addcarry(c[1], hi, cc);
    c[0] = d0;
    c[1] = d1;
    c[2] = c[2].wrapping_add(cc as Word);
}

// Three-word accumulator (c0, c1, c2) += 2*x*y.
#[inline(always)]
fn word3_muladd_2(c: &mut [Word; 3], x: Word, y: Word) {
    let (lo, hi) = umull(x, y);
    let top = hi >> (WORD_BITS - 1);
    let hi = (hi << 1) | (lo >> (WORD_BITS - 1));
    let lo = lo << 1;
    let (d0, cc) = addcarry(c[0], lo, 0);
    let (d1, cc) = addcarry(c[1], hi, cc);
    c[0] = d0;
    c[1] = d1;
    c[2] = c[2].wrapping_add(top).wrapping_add(cc as Word);
}

#[inline(always)]
fn emit(c: &mut [Word; 3]) -> Word {
    let w = c[0];
    c[0] = c[1];
    c[1] = c[2];
    c[2] = 0;
    w
}

pub(crate) fn comba_mul<const N: usize>(z: &mut [Word], x: &[Word], y: &[Word]) {
    let x = &x[..N];
    let y = &y[..N];
    let z = &mut z[..(2 * N)];
    let mut c = [0 as Word; 3];
    for k in 0..(2 * N - 1) {
        let lo = if k < N { 0 } else { k + 1 - N };
        let hi = if k < N { k } else { N - 1 };
        for i in lo..=hi {
            word3_muladd(&mut c, x[i], y[k - i]);
        }
        z[k] = emit(&mut c);
    }
    z[2 * N - 1] = c[0];
}

pub(crate) fn comba_sqr<const N: usize>(z: &mut [Word], x: &[Word]) {
    let x = &x[..N];
    let z = &mut z[..(2 * N)];
    let mut c = [0 as Word; 3];
    for k in 0..(2 * N - 1) {
        let mut i = if k < N { 0 } else { k + 1 - N };
        while i < k - i {
            word3_muladd_2(&mut c, x[i], x[k - i]);
            i += 1;
        }
        if (k & 1) == 0 {
            word3_muladd(&mut c, x[k >> 1], x[k >> 1]);
        }
        z[k] = emit(&mut c);
    }
    z[2 * N - 1] = c[0];
}
