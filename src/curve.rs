//! Short Weierstrass curves over GF(p).

use core::fmt;

use crate::bigint::BigInt;
use crate::gfp::{GFpElement, PrimeModulus, ModulusHandle};
use crate::{Error, Result};

/// A curve `y^2 = x^3 + a*x + b` over GF(p), for a prime `p > 3`.
///
/// The curve holds `a` and `b` as field elements that use the Montgomery
/// representation, and the modulus descriptor they share. Points on the
/// curve reuse that descriptor for their coordinates.
#[derive(Clone)]
pub struct CurveGFp {
    a: GFpElement,
    b: GFpElement,
    modulus: ModulusHandle,
}

impl CurveGFp {

    /// Creates a curve from its coefficients and the field modulus. The
    /// coefficients are reduced modulo `p`.
    pub fn new(a: &BigInt, b: &BigInt, p: &BigInt) -> Result<Self> {
        Ok(Self::new_shared(a, b, &PrimeModulus::shared(p)?))
    }

    /// Creates a curve over an existing (shared) modulus descriptor.
    pub fn new_shared(a: &BigInt, b: &BigInt, modulus: &ModulusHandle) -> Self {
        // Points rely on the Montgomery constants for every operation.
        modulus.compute_derived_constants();
        Self {
            a: GFpElement::with_modulus(modulus, a, true),
            b: GFpElement::with_modulus(modulus, b, true),
            modulus: modulus.clone(),
        }
    }

    /// Gets the `a` coefficient.
    pub fn get_a(&self) -> &GFpElement {
        &self.a
    }

    /// Gets the `b` coefficient.
    pub fn get_b(&self) -> &GFpElement {
        &self.b
    }

    /// Gets the field modulus.
    pub fn get_p(&self) -> &BigInt {
        self.modulus.p()
    }

    /// Gets a new shared reference to the modulus descriptor.
    pub fn get_shared_modulus(&self) -> ModulusHandle {
        self.modulus.clone()
    }

    pub(crate) fn modulus(&self) -> &ModulusHandle {
        &self.modulus
    }

    /// Gets the length, in bytes, of an encoded coordinate.
    pub fn coord_len(&self) -> usize {
        self.modulus.byte_len()
    }

    // Lifts a value into the field, with the curve conventions.
    pub(crate) fn elem(&self, v: &BigInt) -> GFpElement {
        GFpElement::with_modulus(&self.modulus, v, true)
    }

    pub(crate) fn elem_zero(&self) -> GFpElement {
        GFpElement::zero(&self.modulus, true)
    }

    pub(crate) fn elem_one(&self) -> GFpElement {
        GFpElement::one(&self.modulus, true)
    }

    /// Returns `x^3 + a*x + b` for an affine `x`.
    pub fn rhs(&self, x: &GFpElement) -> Result<GFpElement> {
        let mut t = x.square();
        t.set_add(&self.a)?;
        t.set_mul(x)?;
        t.set_add(&self.b)?;
        Ok(t)
    }

    pub(crate) fn check_same(&self, other: &Self) -> Result<()> {
        if self == other {
            Ok(())
        } else {
            Err(Error::IllegalPoint("points are on different curves"))
        }
    }
}

impl PartialEq for CurveGFp {
    fn eq(&self, other: &Self) -> bool {
        self.modulus.p() == other.modulus.p()
            && self.a.equals(&other.a)
            && self.b.equals(&other.b)
    }
}

impl fmt::Debug for CurveGFp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurveGFp")
            .field("p", self.modulus.p())
            .field("a", &self.a)
            .field("b", &self.b)
            .finish()
    }
}
