//! Points on short Weierstrass curves, in Jacobian coordinates.
//!
//! A point `(X:Y:Z)` with `Z != 0` stands for the affine point
//! `(X/Z^2, Y/Z^3)`; the point at infinity (the neutral element) has
//! `Z = 0`, and is normalized to `(0:1:0)`. Points built from affine
//! coordinates have `Z = 1` until they are combined with other points.
//!
//! Each point caches `Z^2`, `Z^3` and `a*Z^4`, computed on first use and
//! discarded whenever `Z` changes; doubling computes the new `a*Z^4`
//! directly from the previous one, so that runs of doublings need no
//! extra multiplication by `a`.
//!
//! Two scalar multiplications are provided:
//!
//!  - `mul_vartime()` (and the `*` operator) is a plain double-and-add
//!    over the bits of the scalar. Its timing depends on the scalar
//!    value: it MUST NOT be used with secret scalars.
//!
//!  - `mult_this_secure()` runs a fixed number of iterations derived
//!    from public bounds, and in each iteration computes both a doubling
//!    and an addition, then keeps or discards the sum with a
//!    constant-time selection. It uses separate, complete formulas that
//!    neither branch on coordinate values nor use the cached powers.
//!
//! Point encoding follows the usual conventions (SEC 1): uncompressed
//! (`0x04 || x || y`), compressed (`0x02` or `0x03` depending on the
//! parity of `y`, then `x`), and hybrid (`0x06` or `0x07`, then `x` and
//! `y`). The point at infinity is encoded as a single byte of value
//! `0x00`, in all formats.

use core::fmt;
use core::ops::{Add, AddAssign, Sub, SubAssign, Mul, MulAssign, Neg};
use once_cell::unsync::OnceCell;

use crate::backend::{Word, WORD_BITS};
use crate::bigint::BigInt;
use crate::curve::CurveGFp;
use crate::gfp::GFpElement;
use crate::mp;
use crate::{Error, Result, Vec};

/// A point on a `CurveGFp`.
pub struct PointGFp {
    curve: CurveGFp,
    x: GFpElement,
    y: GFpElement,
    z: GFpElement,
    z2: OnceCell<GFpElement>,
    z3: OnceCell<GFpElement>,
    az4: OnceCell<GFpElement>,
}

/// Point encoding formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointFormat {
    Uncompressed,
    Compressed,
    Hybrid,
}

impl PointGFp {

    fn from_coords(curve: &CurveGFp, x: GFpElement, y: GFpElement, z: GFpElement)
        -> Self
    {
        Self {
            curve: curve.clone(),
            x, y, z,
            z2: OnceCell::new(),
            z3: OnceCell::new(),
            az4: OnceCell::new(),
        }
    }

    /// Returns the point at infinity on the provided curve.
    pub fn zero(curve: &CurveGFp) -> Self {
        Self::from_coords(curve, curve.elem_zero(), curve.elem_one(), curve.elem_zero())
    }

    /// Creates a point from its affine coordinates. The coordinates are
    /// reduced modulo `p`; curve membership is not verified (see
    /// `check_invariants()`).
    pub fn from_affine(curve: &CurveGFp, x: &BigInt, y: &BigInt) -> Self {
        Self::from_coords(curve, curve.elem(x), curve.elem(y), curve.elem_one())
    }

    /// Creates a point from its Jacobian coordinates. If `z` is zero
    /// modulo `p`, the point at infinity is returned. Curve membership
    /// is not verified.
    pub fn from_projective(curve: &CurveGFp, x: &BigInt, y: &BigInt, z: &BigInt)
        -> Self
    {
        let z = curve.elem(z);
        if z.is_zero() {
            return Self::zero(curve);
        }
        Self::from_coords(curve, curve.elem(x), curve.elem(y), z)
    }

    /// Gets the curve of this point.
    pub fn get_curve(&self) -> &CurveGFp {
        &self.curve
    }

    /// Returns `true` if this point is the point at infinity.
    pub fn is_zero(&self) -> bool {
        self.z.is_zero()
    }

    pub fn get_jac_proj_x(&self) -> &GFpElement {
        &self.x
    }

    pub fn get_jac_proj_y(&self) -> &GFpElement {
        &self.y
    }

    pub fn get_jac_proj_z(&self) -> &GFpElement {
        &self.z
    }

    fn z2(&self) -> &GFpElement {
        self.z2.get_or_init(|| self.z.square())
    }

    fn z3(&self) -> &GFpElement {
        self.z3.get_or_init(|| self.z2() * &self.z)
    }

    fn az4(&self) -> &GFpElement {
        self.az4.get_or_init(|| self.curve.get_a() * &self.z2().square())
    }

    fn set_coords(&mut self, x: GFpElement, y: GFpElement, z: GFpElement) {
        self.x = x;
        self.y = y;
        self.z = z;
        self.z2 = OnceCell::new();
        self.z3 = OnceCell::new();
        self.az4 = OnceCell::new();
    }

    fn set_zero(&mut self) {
        let (x, y, z) = (self.curve.elem_zero(), self.curve.elem_one(), self.curve.elem_zero());
        self.set_coords(x, y, z);
    }

    // Affine coordinates, with a single inversion.
    fn affine_coords(&self) -> Result<(GFpElement, GFpElement)> {
        if self.is_zero() {
            return Err(Error::IllegalTransformation("point at infinity has no affine coordinates"));
        }
        let zi = self.z.invert()?;
        let zi2 = zi.square();
        let x = &self.x * &zi2;
        let y = &(&self.y * &zi2) * &zi;
        Ok((x, y))
    }

    /// Gets the affine x coordinate.
    pub fn get_affine_x(&self) -> Result<BigInt> {
        Ok(self.affine_coords()?.0.get_value())
    }

    /// Gets the affine y coordinate.
    pub fn get_affine_y(&self) -> Result<BigInt> {
        Ok(self.affine_coords()?.1.get_value())
    }

    /// Normalizes this point to `Z = 1`. This fails on the point at
    /// infinity.
    pub fn get_z_to_one(&mut self) -> Result<()> {
        let (x, y) = self.affine_coords()?;
        let one = self.curve.elem_one();
        self.set_coords(x, y, one);
        Ok(())
    }

    /// Negates this point.
    pub fn negate(&mut self) {
        if !self.is_zero() {
            self.y.set_neg();
        }
    }

    /// Doubles this point.
    pub fn mult2_in_place(&mut self) {
        if self.is_zero() {
            return;
        }
        if self.y.is_zero() {
            // Point of order 2.
            self.set_zero();
            return;
        }

        // S = 4*X*Y^2
        // M = 3*X^2 + a*Z^4
        // X' = M^2 - 2*S
        // Y' = M*(S - X') - 8*Y^4
        // Z' = 2*Y*Z
        // a*Z'^4 = 2*(8*Y^4)*(a*Z^4)
        let y2 = self.y.square();
        let s = &self.x * &y2 * 4u32;
        let y4_8 = y2.square() * 8u32;
        let mut m = self.x.square() * 3u32;
        m += self.az4();
        let mut x3 = m.square();
        x3 -= &s.mul2();
        let mut y3 = &s - &x3;
        y3 *= &m;
        y3 -= &y4_8;
        let z3 = (&self.y * &self.z).mul2();
        let az4 = (&y4_8 * self.az4()).mul2();
        self.set_coords(x3, y3, z3);
        let _ = self.az4.set(az4);
    }

    /// Adds point `rhs` to this point. Both must be on the same curve.
    pub fn set_add(&mut self, rhs: &Self) -> Result<()> {
        self.curve.check_same(&rhs.curve)?;
        if rhs.is_zero() {
            return Ok(());
        }
        if self.is_zero() {
            self.set_coords(rhs.x.clone(), rhs.y.clone(), rhs.z.clone());
            return Ok(());
        }

        // U1 = X1*Z2^2   S1 = Y1*Z2^3
        // U2 = X2*Z1^2   S2 = Y2*Z1^3
        // Affine operands skip the multiplications.
        let (u1, s1) = if rhs.z.is_one() {
            (self.x.clone(), self.y.clone())
        } else {
            (&self.x * rhs.z2(), &self.y * rhs.z3())
        };
        let (u2, s2) = if self.z.is_one() {
            (rhs.x.clone(), rhs.y.clone())
        } else {
            (&rhs.x * self.z2(), &rhs.y * self.z3())
        };
        let h = &u2 - &u1;
        let r = &s2 - &s1;
        if h.is_zero() {
            if r.is_zero() {
                self.mult2_in_place();
            } else {
                self.set_zero();
            }
            return Ok(());
        }

        // X3 = r^2 - H^3 - 2*U1*H^2
        // Y3 = r*(U1*H^2 - X3) - S1*H^3
        // Z3 = Z1*Z2*H
        let h2 = h.square();
        let h3 = &h2 * &h;
        let u1h2 = &u1 * &h2;
        let mut x3 = r.square();
        x3 -= &h3;
        x3 -= &u1h2.mul2();
        let mut y3 = &u1h2 - &x3;
        y3 *= &r;
        y3 -= &(&s1 * &h3);
        let z3 = &(&self.z * &rhs.z) * &h;
        self.set_coords(x3, y3, z3);
        Ok(())
    }

    /// Subtracts point `rhs` from this point.
    pub fn set_sub(&mut self, rhs: &Self) -> Result<()> {
        self.set_add(&-rhs)
    }

    /// Multiplies this point by an integer (negative values are
    /// accepted).
    ///
    /// This function is NOT constant-time: the sequence of operations
    /// depends on the bits of `k`. Use `mult_this_secure()` for secret
    /// scalars.
    pub fn mul_vartime(&self, k: &BigInt) -> Self {
        let mut r = Self::zero(&self.curve);
        for i in (0..k.bits()).rev() {
            r.mult2_in_place();
            if k.get_bit(i) {
                r += self;
            }
        }
        if k.is_negative() {
            r.negate();
        }
        r
    }

    /// Multiplies this point by a secret scalar `k`.
    ///
    /// `order_multiple` must be a positive multiple of the order of this
    /// point, and `max_secret` an upper bound on `k`; both are public.
    /// The point is multiplied by `e = k + c*order_multiple`, where the
    /// public factor `c` is chosen so that the top bit of `e` is always
    /// at the same index `t = max(bits(max_secret), bits(order_multiple)) + 1`.
    /// The accumulator starts at this point (for that top bit), then
    /// each of the `t` iterations doubles it, adds this point, and keeps
    /// the sum or not with a constant-time selection. Doublings and
    /// additions use complete formulas with masked selections for the
    /// exceptional cases, and never consult the cached `Z` powers; the
    /// sequence of field operations depends only on the public bounds.
    pub fn mult_this_secure(&self, k: &BigInt, order_multiple: &BigInt,
        max_secret: &BigInt) -> Result<Self>
    {
        if k.is_negative() || max_secret.is_negative() {
            return Err(Error::InvalidArgument("negative scalar or bound"));
        }
        if order_multiple.is_negative() || order_multiple.is_zero() {
            return Err(Error::InvalidArgument("order multiple must be positive"));
        }
        if k > max_secret {
            return Err(Error::InvalidArgument("scalar exceeds its declared maximum"));
        }

        // k < 2^(t-1) and order_multiple < 2^(t-1); with
        // c = ceil(2^t / order_multiple), 2^t <= e < 2^(t+1).
        let t = core::cmp::max(max_secret.bits(), order_multiple.bits()) + 1;
        let pt = BigInt::one() << t;
        let c = (&pt + order_multiple - BigInt::one()) / order_multiple;
        let offset = &c * order_multiple;
        let len = (t + WORD_BITS) / WORD_BITS;
        let mut e = vec![0 as Word; len];
        mp::add(&mut e, &k.to_words_padded(len), &offset.to_words_padded(len))?;

        let mut h = self.clone();
        for i in (0..t).rev() {
            h = h.double_ct();
            let s = h.add_ct(self)?;
            let ctl = ((e[i / WORD_BITS] >> (i % WORD_BITS)) & 1).wrapping_neg();
            h.set_cond(&s, ctl)?;
        }

        // Normalize the point at infinity to (0:1:0).
        let z = Self::zero(&self.curve);
        let ctl = h.z.iszero_mask();
        h.set_cond(&z, ctl)?;
        Ok(h)
    }

    // Doubling with a fixed sequence of field operations. A point with
    // Y = 0 or Z = 0 yields Z' = 0, i.e. the point at infinity (not
    // normalized).
    fn double_ct(&self) -> Self {
        let z2 = self.z.square();
        let az4 = self.curve.get_a() * &z2.square();
        let y2 = self.y.square();
        let s = &self.x * &y2 * 4u32;
        let y4_8 = y2.square() * 8u32;
        let mut m = self.x.square() * 3u32;
        m += &az4;
        let mut x3 = m.square();
        x3 -= &s.mul2();
        let mut y3 = &s - &x3;
        y3 *= &m;
        y3 -= &y4_8;
        let z3 = (&self.y * &self.z).mul2();
        Self::from_coords(&self.curve, x3, y3, z3)
    }

    // Addition with a fixed sequence of field operations. Operands at
    // infinity and equal operands are handled by masked selections; for
    // opposite operands, the general formulas already give Z3 = 0.
    fn add_ct(&self, rhs: &Self) -> Result<Self> {
        self.curve.check_same(&rhs.curve)?;
        let z1s = self.z.square();
        let z2s = rhs.z.square();
        let u1 = &self.x * &z2s;
        let s1 = &(&self.y * &z2s) * &rhs.z;
        let u2 = &rhs.x * &z1s;
        let s2 = &(&rhs.y * &z1s) * &self.z;
        let h = &u2 - &u1;
        let r = &s2 - &s1;
        let h2 = h.square();
        let h3 = &h2 * &h;
        let u1h2 = &u1 * &h2;
        let mut x3 = r.square();
        x3 -= &h3;
        x3 -= &u1h2.mul2();
        let mut y3 = &u1h2 - &x3;
        y3 *= &r;
        y3 -= &(&s1 * &h3);
        let z3 = &(&self.z * &rhs.z) * &h;
        let mut sum = Self::from_coords(&self.curve, x3, y3, z3);

        let dbl = self.double_ct();
        let inf1 = self.z.iszero_mask();
        let inf2 = rhs.z.iszero_mask();
        let same = h.iszero_mask() & r.iszero_mask() & !inf1 & !inf2;
        sum.set_cond(&dbl, same)?;
        sum.set_cond(rhs, inf1)?;
        sum.set_cond(self, inf2)?;
        Ok(sum)
    }

    /// Verifies that this point is on its curve, i.e. that
    /// `Y^2 = X^3 + a*X*Z^4 + b*Z^6`. The point at infinity passes.
    pub fn check_invariants(&self) -> Result<()> {
        if self.is_zero() {
            return Ok(());
        }
        let z4 = self.z2().square();
        let z6 = self.z2() * &z4;
        let lhs = self.y.square();
        let mut rhs = self.x.square();
        rhs += &(self.curve.get_a() * &z4);
        rhs *= &self.x;
        rhs += &(self.curve.get_b() * &z6);
        if lhs.equals(&rhs) {
            Ok(())
        } else {
            Err(Error::IllegalPoint("point is not on the curve"))
        }
    }

    /// Compares this point with another. Points on distinct curves are
    /// never equal.
    pub fn equals(&self, rhs: &Self) -> bool {
        if self.curve != rhs.curve {
            return false;
        }
        match (self.is_zero(), rhs.is_zero()) {
            (true, true) => return true,
            (false, false) => (),
            _ => return false,
        }
        (&self.x * rhs.z2()).equals(&(&rhs.x * self.z2()))
            && (&self.y * rhs.z3()).equals(&(&rhs.y * self.z3()))
    }

    /// Sets this point to `a` if `ctl` is all-ones, leaves it unchanged
    /// if `ctl` is zero.
    pub fn set_cond(&mut self, a: &Self, ctl: Word) -> Result<()> {
        self.curve.check_same(&a.curve)?;
        let mut x = self.x.clone();
        let mut y = self.y.clone();
        let mut z = self.z.clone();
        x.set_cond(&a.x, ctl)?;
        y.set_cond(&a.y, ctl)?;
        z.set_cond(&a.z, ctl)?;
        self.set_coords(x, y, z);
        Ok(())
    }

    /// Returns `a0` if `ctl` is zero, `a1` if `ctl` is all-ones.
    pub fn select(a0: &Self, a1: &Self, ctl: Word) -> Result<Self> {
        let mut r = a0.clone();
        r.set_cond(a1, ctl)?;
        Ok(r)
    }

    /// Encodes this point (EC2OSP).
    pub fn encode(&self, format: PointFormat) -> Result<Vec<u8>> {
        if self.is_zero() {
            return Ok(vec![0x00]);
        }
        let (x, y) = self.affine_coords()?;
        let odd = y.get_value().is_odd() as u8;
        let mut d = Vec::with_capacity(1 + 2 * self.curve.coord_len());
        match format {
            PointFormat::Uncompressed => {
                d.push(0x04);
                d.extend_from_slice(&x.encode());
                d.extend_from_slice(&y.encode());
            }
            PointFormat::Compressed => {
                d.push(0x02 | odd);
                d.extend_from_slice(&x.encode());
            }
            PointFormat::Hybrid => {
                d.push(0x06 | odd);
                d.extend_from_slice(&x.encode());
                d.extend_from_slice(&y.encode());
            }
        }
        Ok(d)
    }

    /// Decodes a point (OS2ECP). All formats are accepted; the decoded
    /// point is verified to be on the curve.
    pub fn decode(buf: &[u8], curve: &CurveGFp) -> Result<Self> {
        let clen = curve.coord_len();
        let m = curve.modulus();
        let tag = match buf.first() {
            Some(&t) => t,
            None => return Err(Error::Decoding("empty point encoding")),
        };
        match tag {
            0x00 => {
                if buf.len() != 1 {
                    return Err(Error::Decoding("trailing bytes after point at infinity"));
                }
                Ok(Self::zero(curve))
            }
            0x02 | 0x03 => {
                if buf.len() != 1 + clen {
                    return Err(Error::Decoding("bad compressed point length"));
                }
                let x = GFpElement::decode(&buf[1..], m, true)?;
                let mut y = match curve.rhs(&x)?.sqrt_vartime() {
                    Some(y) => y,
                    None => {
                        tracing::debug!("compressed point: x is not on the curve");
                        return Err(Error::IllegalPoint("no curve point with this x"));
                    }
                };
                if y.get_value().is_odd() != ((tag & 1) != 0) {
                    y.set_neg();
                }
                // y = 0 has no odd root.
                if y.get_value().is_odd() != ((tag & 1) != 0) {
                    tracing::debug!(tag, "compressed point: parity mismatch");
                    return Err(Error::IllegalPoint("compressed point parity mismatch"));
                }
                Ok(Self::from_coords(curve, x, y, curve.elem_one()))
            }
            0x04 | 0x06 | 0x07 => {
                if buf.len() != 1 + 2 * clen {
                    return Err(Error::Decoding("bad uncompressed point length"));
                }
                let x = GFpElement::decode(&buf[1..(1 + clen)], m, true)?;
                let y = GFpElement::decode(&buf[(1 + clen)..], m, true)?;
                if tag != 0x04 && y.get_value().is_odd() != ((tag & 1) != 0) {
                    tracing::debug!(tag, "hybrid point: parity mismatch");
                    return Err(Error::IllegalPoint("hybrid point parity mismatch"));
                }
                let p = Self::from_coords(curve, x, y, curve.elem_one());
                if let Err(e) = p.check_invariants() {
                    tracing::debug!(tag, "decoded point is not on the curve");
                    return Err(e);
                }
                Ok(p)
            }
            _ => {
                tracing::debug!(tag, "unknown point format");
                Err(Error::Decoding("unknown point format"))
            }
        }
    }
}

/// Encodes a point (EC2OSP).
pub fn encode_point(p: &PointGFp, format: PointFormat) -> Result<Vec<u8>> {
    p.encode(format)
}

/// Decodes a point on the provided curve (OS2ECP).
pub fn decode_point(buf: &[u8], curve: &CurveGFp) -> Result<PointGFp> {
    PointGFp::decode(buf, curve)
}

impl Clone for PointGFp {
    fn clone(&self) -> Self {
        Self {
            curve: self.curve.clone(),
            x: self.x.clone(),
            y: self.y.clone(),
            z: self.z.clone(),
            z2: self.z2.clone(),
            z3: self.z3.clone(),
            az4: self.az4.clone(),
        }
    }
}

impl PartialEq for PointGFp {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Debug for PointGFp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "PointGFp(infinity)");
        }
        f.debug_struct("PointGFp")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("z", &self.z)
            .finish()
    }
}

// Operators panic on points from different curves.
impl AddAssign<&PointGFp> for PointGFp {
    #[inline]
    fn add_assign(&mut self, other: &PointGFp) {
        if let Err(e) = self.set_add(other) {
            panic!("{}", e);
        }
    }
}

impl AddAssign<PointGFp> for PointGFp {
    #[inline]
    fn add_assign(&mut self, other: PointGFp) {
        *self += &other;
    }
}

impl Add<&PointGFp> for &PointGFp {
    type Output = PointGFp;

    #[inline]
    fn add(self, other: &PointGFp) -> PointGFp {
        let mut r = self.clone();
        r += other;
        r
    }
}

impl Add<PointGFp> for PointGFp {
    type Output = PointGFp;

    #[inline]
    fn add(mut self, other: PointGFp) -> PointGFp {
        self += &other;
        self
    }
}

impl SubAssign<&PointGFp> for PointGFp {
    #[inline]
    fn sub_assign(&mut self, other: &PointGFp) {
        if let Err(e) = self.set_sub(other) {
            panic!("{}", e);
        }
    }
}

impl SubAssign<PointGFp> for PointGFp {
    #[inline]
    fn sub_assign(&mut self, other: PointGFp) {
        *self -= &other;
    }
}

impl Sub<&PointGFp> for &PointGFp {
    type Output = PointGFp;

    #[inline]
    fn sub(self, other: &PointGFp) -> PointGFp {
        let mut r = self.clone();
        r -= other;
        r
    }
}

impl Sub<PointGFp> for PointGFp {
    type Output = PointGFp;

    #[inline]
    fn sub(mut self, other: PointGFp) -> PointGFp {
        self -= &other;
        self
    }
}

impl Neg for &PointGFp {
    type Output = PointGFp;

    #[inline]
    fn neg(self) -> PointGFp {
        let mut r = self.clone();
        r.negate();
        r
    }
}

impl Neg for PointGFp {
    type Output = PointGFp;

    #[inline]
    fn neg(mut self) -> PointGFp {
        self.negate();
        self
    }
}

// Scalar multiplication with the operator is NOT constant-time.
impl MulAssign<&BigInt> for PointGFp {
    #[inline]
    fn mul_assign(&mut self, k: &BigInt) {
        *self = self.mul_vartime(k);
    }
}

impl Mul<&BigInt> for &PointGFp {
    type Output = PointGFp;

    #[inline]
    fn mul(self, k: &BigInt) -> PointGFp {
        self.mul_vartime(k)
    }
}

impl Mul<&BigInt> for PointGFp {
    type Output = PointGFp;

    #[inline]
    fn mul(self, k: &BigInt) -> PointGFp {
        self.mul_vartime(k)
    }
}
