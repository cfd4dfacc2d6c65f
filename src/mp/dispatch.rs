//! Multiplication and squaring dispatch.
//!
//! Operands are given as buffers with a _capacity_ (the buffer length)
//! and a _significant length_ (number of low words that may be non-zero;
//! words above it are zero). The dispatcher picks, in order:
//!
//!  1. a linear (single-word) multiplication, if either operand has one
//!     significant word;
//!
//!  2. the smallest Comba size that covers both significant lengths and
//!     fits the capacities and the output;
//!
//!  3. the basecase multiplication, if an operand is shorter than the
//!     Karatsuba threshold or no workspace is provided;
//!
//!  4. Karatsuba on the size chosen by `karatsuba_size()`, if the
//!     workspace is large enough for it;
//!
//!  5. the basecase multiplication otherwise.
//!
//! The choice depends only on lengths. A caller that needs constant-time
//! behaviour passes the full capacity as significant length (this is
//! what the recursive Karatsuba calls and the field arithmetic do).

use crate::backend::{Word, umull};
use crate::{Error, Result};
use super::linmul3;
use super::basecase::{simple_mul, simple_sqr};
use super::comba::{COMBA_SIZES, mul_fixed, sqr_fixed};
use super::karatsuba::{karatsuba_mul_n, karatsuba_sqr_n,
    KARATSUBA_MUL_THRESHOLD, KARATSUBA_SQR_THRESHOLD};

/// Sets `z` to `x*y`.
///
/// `x_sw` and `y_sw` are the significant lengths of `x` and `y`; they
/// must not exceed the buffer lengths, and all words of `x` (resp. `y`)
/// at index `x_sw` (resp. `y_sw`) or above must be zero. `z` must have
/// length at least `x_sw + y_sw`; it is entirely overwritten (words
/// above the product are cleared). `ws` is a scratch area; Karatsuba
/// is used only if it is large enough (see `workspace_len()`), and an
/// empty workspace is acceptable.
///
/// Sizes are checked before anything is written; on error, `z` is
/// untouched.
pub fn mul(z: &mut [Word], x: &[Word], x_sw: usize, y: &[Word], y_sw: usize,
    ws: &mut [Word]) -> Result<()>
{
    if x_sw > x.len() || y_sw > y.len() {
        return Err(Error::InvalidArgument("significant length exceeds buffer"));
    }
    if z.len() < x_sw + y_sw {
        return Err(Error::InvalidArgument("product output too small"));
    }
    debug_assert!(x[x_sw..].iter().all(|&w| w == 0));
    debug_assert!(y[y_sw..].iter().all(|&w| w == 0));
    mul_core(z, x, x_sw, y, y_sw, ws);
    Ok(())
}

/// Sets `z` to `x^2`.
///
/// Conventions are as for `mul()`; `z` must have length at least
/// `2*x_sw`.
pub fn sqr(z: &mut [Word], x: &[Word], x_sw: usize, ws: &mut [Word])
    -> Result<()>
{
    if x_sw > x.len() {
        return Err(Error::InvalidArgument("significant length exceeds buffer"));
    }
    if z.len() < 2 * x_sw {
        return Err(Error::InvalidArgument("square output too small"));
    }
    debug_assert!(x[x_sw..].iter().all(|&w| w == 0));
    sqr_core(z, x, x_sw, ws);
    Ok(())
}

/// Returns the workspace length (in words) that allows Karatsuba on any
/// operands with capacities `x_len` and `y_len`.
pub const fn workspace_len(x_len: usize, y_len: usize) -> usize {
    if x_len > y_len { 2 * x_len } else { 2 * y_len }
}

/// Selects the operand size for Karatsuba multiplication.
///
/// This is the smallest even `j` such that both significant lengths are
/// at most `j`, both capacities are at least `j`, and `2*j` words fit in
/// both the output and the workspace. When `j = 2 mod 4` and `j + 2`
/// also fits, `j + 2` is preferred, so that the next recursion level
/// still splits evenly. If no size qualifies, 0 is returned.
pub fn karatsuba_size(z_size: usize, x_size: usize, x_sw: usize,
    y_size: usize, y_sw: usize, ws_size: usize) -> usize
{
    let room = core::cmp::min(z_size, ws_size);
    if x_sw > x_size || x_sw > y_size || y_sw > x_size || y_sw > y_size {
        return 0;
    }

    let start = core::cmp::max(x_sw, y_sw);
    let end = core::cmp::min(x_size, y_size);

    if start == end {
        if (start & 1) != 0 || 2 * start > room {
            return 0;
        }
        return start;
    }

    for j in start..=end {
        if (j & 1) != 0 {
            continue;
        }
        if 2 * j > room {
            return 0;
        }
        if (j & 3) == 2 && j + 2 <= end && 2 * (j + 2) <= room {
            return j + 2;
        }
        return j;
    }
    0
}

// Smallest Comba size covering both significant lengths, or 0.
fn comba_size(z_size: usize, x_size: usize, x_sw: usize,
    y_size: usize, y_sw: usize) -> usize
{
    for &n in COMBA_SIZES.iter() {
        if x_sw <= n && y_sw <= n && x_size >= n && y_size >= n
            && z_size >= 2 * n
        {
            return n;
        }
    }
    0
}

pub(crate) fn mul_core(z: &mut [Word], x: &[Word], x_sw: usize,
    y: &[Word], y_sw: usize, ws: &mut [Word])
{
    z.fill(0);
    if x_sw == 0 || y_sw == 0 {
        return;
    }

    if x_sw == 1 {
        linmul3(z, &y[..y_sw], x[0]);
        return;
    }
    if y_sw == 1 {
        linmul3(z, &x[..x_sw], y[0]);
        return;
    }

    let n = comba_size(z.len(), x.len(), x_sw, y.len(), y_sw);
    if n != 0 {
        mul_fixed(n, z, x, y);
        return;
    }

    if x_sw < KARATSUBA_MUL_THRESHOLD || y_sw < KARATSUBA_MUL_THRESHOLD
        || ws.is_empty()
    {
        simple_mul(z, &x[..x_sw], &y[..y_sw]);
        return;
    }

    let n = karatsuba_size(z.len(), x.len(), x_sw, y.len(), y_sw, ws.len());
    if n != 0 {
        karatsuba_mul_n(z, x, y, n, ws);
    } else {
        simple_mul(z, &x[..x_sw], &y[..y_sw]);
    }
}

pub(crate) fn sqr_core(z: &mut [Word], x: &[Word], x_sw: usize,
    ws: &mut [Word])
{
    z.fill(0);
    if x_sw == 0 {
        return;
    }

    if x_sw == 1 {
        let (lo, hi) = umull(x[0], x[0]);
        z[0] = lo;
        z[1] = hi;
        return;
    }

    let n = comba_size(z.len(), x.len(), x_sw, x.len(), x_sw);
    if n != 0 {
        sqr_fixed(n, z, x);
        return;
    }

    if x_sw < KARATSUBA_SQR_THRESHOLD || ws.is_empty() {
        simple_sqr(z, &x[..x_sw]);
        return;
    }

    let n = karatsuba_size(z.len(), x.len(), x_sw, x.len(), x_sw, ws.len());
    if n != 0 {
        karatsuba_sqr_n(z, x, n, ws);
    } else {
        simple_sqr(z, &x[..x_sw]);
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::backend::{WORD_BITS, WORD_BYTES};
    use alloc::vec::Vec;
    use num_bigint::BigUint;
    use sha2::{Sha512, Digest};

    fn mkrndw(seed: u64, n: usize) -> Vec<Word> {
        let mut sh = Sha512::new();
        let mut d = Vec::with_capacity(n);
        let mut ctr = 0u64;
        while d.len() < n {
            sh.update(seed.to_le_bytes());
            sh.update(ctr.to_le_bytes());
            let v = sh.finalize_reset();
            for ch in v.chunks_exact(WORD_BYTES) {
                let mut w: Word = 0;
                for (j, &b) in ch.iter().enumerate() {
                    w |= (b as Word) << (8 * j);
                }
                d.push(w);
            }
            ctr += 1;
        }
        d.truncate(n);
        // Top word is forced non-zero so that the significant length is
        // exactly n.
        if n > 0 && d[n - 1] == 0 {
            d[n - 1] = 1;
        }
        d
    }

    fn to_big(x: &[Word]) -> BigUint {
        let mut b = Vec::with_capacity(x.len() * WORD_BYTES);
        for &w in x {
            b.extend_from_slice(&w.to_le_bytes());
        }
        BigUint::from_bytes_le(&b)
    }

    const SIZES: [usize; 14] = [1, 2, 3, 4, 6, 8, 9, 16, 24, 32, 48, 64, 96, 128];

    #[test]
    fn mul_matrix() {
        let mut seed = 0;
        for &xn in SIZES.iter() {
            for &yn in SIZES.iter() {
                // Exact capacities, then capacities padded with zeros.
                for &pad in [0usize, 2, 7].iter() {
                    let mut x = mkrndw(seed, xn);
                    let mut y = mkrndw(seed + 1, yn);
                    seed += 2;
                    x.resize(xn + pad, 0);
                    y.resize(yn + pad, 0);
                    let zn = xn + yn + 2 * pad;
                    let mut z = vec![0xA5 as Word; zn];
                    let mut ws = vec![0; workspace_len(x.len(), y.len())];
                    mul(&mut z, &x, xn, &y, yn, &mut ws).unwrap();
                    let mut zb = vec![0; xn + yn];
                    simple_mul(&mut zb, &x[..xn], &y[..yn]);
                    assert_eq!(&z[..(xn + yn)], &zb[..]);
                    assert!(z[(xn + yn)..].iter().all(|&w| w == 0));
                    if pad == 0 && (xn == yn || xn == 1 || yn == 3) {
                        assert_eq!(to_big(&z), to_big(&x) * to_big(&y));
                    }

                    // No workspace: same result through basecase.
                    let mut z2 = vec![0; zn];
                    mul(&mut z2, &x, xn, &y, yn, &mut []).unwrap();
                    assert_eq!(z, z2);
                }
            }
        }
    }

    #[test]
    fn sqr_matrix() {
        for (k, &xn) in SIZES.iter().enumerate() {
            for &pad in [0usize, 2, 8].iter() {
                let mut x = mkrndw(500 + k as u64, xn);
                x.resize(xn + pad, 0);
                let zn = 2 * (xn + pad);
                let mut z = vec![0x5A as Word; zn];
                let mut ws = vec![0; workspace_len(x.len(), x.len())];
                sqr(&mut z, &x, xn, &mut ws).unwrap();
                let xb = to_big(&x);
                assert_eq!(to_big(&z), &xb * &xb);
                let mut z2 = vec![0; zn];
                mul(&mut z2, &x, xn, &x, xn, &mut ws).unwrap();
                assert_eq!(z, z2);
            }
        }
    }

    #[test]
    fn threshold_boundaries() {
        for &n in [31usize, 32, 33, 34, 35, 127, 128, 129, 130].iter() {
            for &cap in [n, n + 1, n + 2, n + 6].iter() {
                let mut x = mkrndw(900 + n as u64, n);
                let mut y = mkrndw(901 + cap as u64, n);
                x.resize(cap, 0);
                y.resize(cap, 0);
                let mut z = vec![0; 2 * cap];
                let mut ws = vec![0; workspace_len(cap, cap)];
                mul(&mut z, &x, n, &y, n, &mut ws).unwrap();
                assert_eq!(to_big(&z), to_big(&x) * to_big(&y));
                sqr(&mut z, &x, n, &mut ws).unwrap();
                let xb = to_big(&x);
                assert_eq!(to_big(&z), &xb * &xb);
            }
        }
    }

    #[test]
    fn unbalanced() {
        // One operand much longer than the other, including lengths
        // straddling the threshold.
        for &(xn, yn) in [(2usize, 130usize), (31, 64), (33, 128), (64, 40), (5, 17)].iter() {
            let x = mkrndw(77 + xn as u64, xn);
            let y = mkrndw(78 + yn as u64, yn);
            let mut z = vec![0; xn + yn];
            let mut ws = vec![0; workspace_len(xn, yn)];
            mul(&mut z, &x, xn, &y, yn, &mut ws).unwrap();
            assert_eq!(to_big(&z), to_big(&x) * to_big(&y));
        }
    }

    #[test]
    fn zero_and_errors() {
        let x = [0 as Word; 4];
        let y = mkrndw(3, 4);
        let mut z = [7 as Word; 8];
        mul(&mut z, &x, 0, &y, 4, &mut []).unwrap();
        assert_eq!(z, [0; 8]);

        let mut z = [7 as Word; 8];
        assert!(mul(&mut z, &y, 5, &y, 4, &mut []).is_err());
        assert!(mul(&mut z[..7], &y, 4, &y, 4, &mut []).is_err());
        assert!(sqr(&mut z[..7], &y, 4, &mut []).is_err());
        assert!(sqr(&mut z, &y, 5, &mut []).is_err());
        assert_eq!(z, [7; 8]);

        // Single-word operand on either side.
        let w = [(1 as Word) << (WORD_BITS - 1)];
        let mut z = [0 as Word; 5];
        mul(&mut z, &y, 4, &w, 1, &mut []).unwrap();
        assert_eq!(to_big(&z), to_big(&y) * to_big(&w));
        mul(&mut z, &w, 1, &y, 4, &mut []).unwrap();
        assert_eq!(to_big(&z), to_big(&y) * to_big(&w));
    }

    #[test]
    fn tight_workspace() {
        // 34 significant words in 40-word buffers, with a workspace that
        // fits size 34 but not 36.
        let mut x = mkrndw(11, 34);
        let mut y = mkrndw(12, 34);
        x.resize(40, 0);
        y.resize(40, 0);
        let mut z = vec![0 as Word; 80];
        let mut ws = vec![0 as Word; 70];
        mul(&mut z, &x, 34, &y, 34, &mut ws).unwrap();
        assert_eq!(to_big(&z), to_big(&x) * to_big(&y));
        sqr(&mut z, &x, 34, &mut ws).unwrap();
        assert_eq!(to_big(&z), to_big(&x) * to_big(&x));
    }

    #[test]
    fn karatsuba_sizes() {
        assert_eq!(karatsuba_size(68, 34, 34, 34, 34, 68), 34);
        assert_eq!(karatsuba_size(66, 34, 34, 34, 34, 68), 0);
        assert_eq!(karatsuba_size(100, 33, 33, 33, 33, 100), 0);
        assert_eq!(karatsuba_size(200, 40, 34, 40, 34, 200), 36);
        assert_eq!(karatsuba_size(70, 40, 34, 40, 34, 200), 34);
        assert_eq!(karatsuba_size(200, 40, 33, 40, 32, 200), 36);
        assert_eq!(karatsuba_size(200, 40, 35, 40, 32, 200), 36);
        assert_eq!(karatsuba_size(200, 40, 36, 40, 32, 200), 36);
        assert_eq!(karatsuba_size(200, 40, 38, 40, 32, 200), 40);
        assert_eq!(karatsuba_size(200, 32, 33, 40, 32, 200), 0);
        assert_eq!(karatsuba_size(200, 64, 48, 35, 32, 200), 0);

        // The workspace bounds the size like the output does: a workspace
        // of 70 words keeps size 34 rather than 36.
        assert_eq!(karatsuba_size(200, 40, 34, 40, 34, 70), 34);
        assert_eq!(karatsuba_size(200, 40, 34, 40, 34, 66), 0);
        assert_eq!(karatsuba_size(200, 34, 34, 34, 34, 66), 0);
        assert_eq!(workspace_len(10, 12), 24);
    }
}
