//! Karatsuba multiplication and squaring.
//!
//! For operands of even size `N = 2*h`, split as `x = x0 + x1*B^h` and
//! `y = y0 + y1*B^h` (with `B = 2^w`):
//!
//! ```text
//!   x*y = z0 + (z0 + z1 + d)*B^h + z1*B^N
//! ```
//!
//! where `z0 = x0*y0`, `z1 = x1*y1`, and `d = (x0 - x1)*(y1 - y0)`. The
//! middle product `d` is computed from the absolute differences, and its
//! sign (the XOR of the signs of the two differences) selects between
//! addition and subtraction through a mask, not a branch. The half-size
//! products go back through the main dispatcher, which picks Comba,
//! basecase or a further Karatsuba level as appropriate; since these
//! recursive calls declare their full capacity as significant, the
//! algorithm choice depends only on the sizes, never on the values.
//!
//! Workspace layout at one level: `ws[0..N]` receives the middle
//! product; `ws[N..]` (at least `N` more words) is handed to the
//! recursive calls and then reused for `z0 + z1`.

use crate::backend::Word;
use crate::{Error, Result};
use super::{abs_sub3, add2, add3, add_word, cnd_add_or_sub, sub2};
use super::basecase::{simple_mul, simple_sqr};
use super::comba::{COMBA_SIZES, mul_fixed, sqr_fixed};
use super::dispatch::{mul_core, sqr_core};

/// Below this operand size (in words), multiplication does not use
/// Karatsuba.
pub const KARATSUBA_MUL_THRESHOLD: usize = 32;

/// Below this operand size (in words), squaring does not use Karatsuba.
pub const KARATSUBA_SQR_THRESHOLD: usize = 32;

/// Sets `z` to `x*y` using Karatsuba on size `N = x.len()`.
///
/// `x` and `y` must have the same length `N`, and `z` must have length
/// at least `2*N`. If `N` is odd, below `KARATSUBA_MUL_THRESHOLD`, or
/// `ws` is shorter than `2*N` words, then this falls back to a Comba
/// routine (when `N` is one of the Comba sizes) or to the basecase
/// multiplication.
pub fn karatsuba_mul(z: &mut [Word], x: &[Word], y: &[Word], ws: &mut [Word])
    -> Result<()>
{
    let n = x.len();
    if y.len() != n {
        return Err(Error::InvalidArgument("Karatsuba operands differ in size"));
    }
    if z.len() < 2 * n {
        return Err(Error::InvalidArgument("product output too small"));
    }
    z[(2 * n)..].fill(0);
    karatsuba_mul_n(&mut z[..(2 * n)], x, y, n, ws);
    Ok(())
}

/// Sets `z` to `x^2` using Karatsuba on size `N = x.len()`.
///
/// Size requirements and fallbacks are as for `karatsuba_mul()`, with
/// `KARATSUBA_SQR_THRESHOLD`.
pub fn karatsuba_sqr(z: &mut [Word], x: &[Word], ws: &mut [Word])
    -> Result<()>
{
    let n = x.len();
    if z.len() < 2 * n {
        return Err(Error::InvalidArgument("square output too small"));
    }
    z[(2 * n)..].fill(0);
    karatsuba_sqr_n(&mut z[..(2 * n)], x, n, ws);
    Ok(())
}

// z[0..2n] <- x[0..n] * y[0..n].
pub(crate) fn karatsuba_mul_n(z: &mut [Word], x: &[Word], y: &[Word],
    n: usize, ws: &mut [Word])
{
    if n < KARATSUBA_MUL_THRESHOLD || (n & 1) != 0 || ws.len() < 2 * n {
        if COMBA_SIZES.contains(&n) {
            mul_fixed(n, z, x, y);
        } else {
            simple_mul(&mut z[..(2 * n)], &x[..n], &y[..n]);
        }
        return;
    }

    let h = n >> 1;
    let (x0, x1) = (&x[..h], &x[h..n]);
    let (y0, y1) = (&y[..h], &y[h..n]);
    let z = &mut z[..(2 * n)];
    let (ws0, ws1) = ws.split_at_mut(n);

    // |x0 - x1| into z[0..h], |y1 - y0| into z[n..n+h]; the middle
    // product d = |x0 - x1|*|y1 - y0| goes to ws0.
    let s0 = abs_sub3(&mut z[..h], x0, x1);
    let s1 = abs_sub3(&mut z[n..(n + h)], y1, y0);
    mul_core(ws0, &z[..h], h, &z[n..(n + h)], h, ws1);

    // z0 and z1 into the two halves of z.
    {
        let (zlo, zhi) = z.split_at_mut(n);
        mul_core(zlo, x0, h, y0, h, ws1);
        mul_core(zhi, x1, h, y1, h, ws1);
    }

    // Add z0 + z1 at offset h.
    let c1 = add3(&mut ws1[..n], &z[..n], &z[n..]);
    let c2 = add2(&mut z[h..(h + n)], &ws1[..n]);
    add_word(&mut z[(n + h)..], (c1 + c2) as Word);

    // Same signs: d is positive and must be added; otherwise subtract.
    cnd_add_or_sub(&mut z[h..], ws0, s0 ^ s1);
}

// z[0..2n] <- x[0..n]^2. The middle term is -(x0 - x1)^2, hence always
// subtracted.
pub(crate) fn karatsuba_sqr_n(z: &mut [Word], x: &[Word], n: usize,
    ws: &mut [Word])
{
    if n < KARATSUBA_SQR_THRESHOLD || (n & 1) != 0 || ws.len() < 2 * n {
        if COMBA_SIZES.contains(&n) {
            sqr_fixed(n, z, x);
        } else {
            simple_sqr(&mut z[..(2 * n)], &x[..n]);
        }
        return;
    }

    let h = n >> 1;
    let (x0, x1) = (&x[..h], &x[h..n]);
    let z = &mut z[..(2 * n)];
    let (ws0, ws1) = ws.split_at_mut(n);

    abs_sub3(&mut z[..h], x0, x1);
    sqr_core(ws0, &z[..h], h, ws1);

    {
        let (zlo, zhi) = z.split_at_mut(n);
        sqr_core(zlo, x0, h, ws1);
        sqr_core(zhi, x1, h, ws1);
    }

    let c1 = add3(&mut ws1[..n], &z[..n], &z[n..]);
    let c2 = add2(&mut z[h..(h + n)], &ws1[..n]);
    add_word(&mut z[(n + h)..], (c1 + c2) as Word);

    sub2(&mut z[h..], ws0);
}
