//! Elements of GF(p) for a runtime prime `p`.
//!
//! A `GFpElement` holds a residue modulo `p` and a shared reference to
//! the modulus descriptor. The residue is kept either in _ordinary_
//! representation (the value `v` itself) or in _Montgomery_
//! representation (`v*R mod p`, called an "m-residue"). Elements created
//! with `use_special_reduction` set switch to the Montgomery
//! representation on their first multiplication and stay there, so that
//! chains of multiplications need only Montgomery reductions; the value
//! is converted back when it is read out (`get_value()`, `encode()`).
//!
//! The representation is a cache, not part of the value: methods that
//! take `&self` may change it (it is held in a `RefCell`), and equality
//! and encoding are defined on the mathematical value only. Conversely,
//! the `use_special_reduction` flag is configuration: it is changed only
//! through `turn_on_sp_red_mul()` and `turn_off_sp_red_mul()`.
//!
//! Additions, subtractions, negations, Montgomery multiplications and
//! squarings are constant-time. Multiplications of elements that do not
//! use special reduction are reduced with a long division, which is
//! NOT constant-time. Conversions from and to byte strings leak nothing
//! beyond lengths, except that out-of-range inputs are rejected.

use core::cell::RefCell;
use core::fmt;
use core::ops::{Add, AddAssign, Sub, SubAssign, Mul, MulAssign};
use core::ops::{Div, DivAssign, Neg};
use alloc::sync::Arc;
use rand_core::{CryptoRng, RngCore};

use crate::backend::{Word, WORD_BITS, addcarry, subborrow, cc_mask, zero_mask};
use crate::bigint::{BigInt, divrem_words_vartime};
use crate::mp::{cmp_vartime, cnd_select};
use crate::mp::dispatch::{mul_core, sqr_core};
use crate::mp::monty::redc;
use crate::{Error, Result, Vec};

mod modulus;

pub use modulus::{PrimeModulus, ModulusHandle};

/// An element of GF(p).
pub struct GFpElement {
    modulus: ModulusHandle,
    use_special_reduction: bool,
    state: RefCell<Residue>,
}

// Representation cache: the residue words (exactly n words, value < p),
// whether they hold an m-residue, and a scratch area for products.
struct Residue {
    v: Vec<Word>,
    mres: bool,
    ws: Vec<Word>,
}

// Scratch length for one product and its reduction: 2n+1 words for the
// product, n+1 for the final subtraction, 2n for Karatsuba.
const fn scratch_len(n: usize) -> usize {
    5 * n + 2
}

// ========================================================================
// Word-level field arithmetic over exactly n words.

// d <- d + b mod p
fn fadd(d: &mut [Word], b: &[Word], p: &[Word]) {
    let mut cc1 = 0;
    for i in 0..d.len() {
        (d[i], cc1) = addcarry(d[i], b[i], cc1);
    }
    let mut cc2 = 0;
    for i in 0..d.len() {
        (d[i], cc2) = subborrow(d[i], p[i], cc2);
    }
    let m = cc_mask(cc2) & !cc_mask(cc1);
    let mut cc3 = 0;
    for i in 0..d.len() {
        (d[i], cc3) = addcarry(d[i], m & p[i], cc3);
    }
}

// d <- 2*d mod p
fn fdbl(d: &mut [Word], p: &[Word]) {
    let mut top: Word = 0;
    for i in 0..d.len() {
        let w = d[i];
        d[i] = (w << 1) | top;
        top = w >> (WORD_BITS - 1);
    }
    let mut cc2 = 0;
    for i in 0..d.len() {
        (d[i], cc2) = subborrow(d[i], p[i], cc2);
    }
    let m = cc_mask(cc2) & !top.wrapping_neg();
    let mut cc3 = 0;
    for i in 0..d.len() {
        (d[i], cc3) = addcarry(d[i], m & p[i], cc3);
    }
}

// d <- d - b mod p
fn fsub(d: &mut [Word], b: &[Word], p: &[Word]) {
    let mut cc1 = 0;
    for i in 0..d.len() {
        (d[i], cc1) = subborrow(d[i], b[i], cc1);
    }
    let m = cc_mask(cc1);
    let mut cc2 = 0;
    for i in 0..d.len() {
        (d[i], cc2) = addcarry(d[i], m & p[i], cc2);
    }
}

// d <- -d mod p
fn fneg(d: &mut [Word], p: &[Word]) {
    let mut cc1 = 0;
    for i in 0..d.len() {
        (d[i], cc1) = subborrow(0, d[i], cc1);
    }
    let m = cc_mask(cc1);
    let mut cc2 = 0;
    for i in 0..d.len() {
        (d[i], cc2) = addcarry(d[i], m & p[i], cc2);
    }
}

// d <- d/2 mod p (p odd)
fn fhalf(d: &mut [Word], p: &[Word]) {
    let m = (d[0] & 1).wrapping_neg();
    let mut cc = 0;
    for i in 0..d.len() {
        (d[i], cc) = addcarry(d[i], m & p[i], cc);
    }
    let n = d.len();
    for i in 0..(n - 1) {
        d[i] = (d[i] >> 1) | (d[i + 1] << (WORD_BITS - 1));
    }
    d[n - 1] = (d[n - 1] >> 1) | ((cc as Word) << (WORD_BITS - 1));
}


// All-ones if d is zero, 0 otherwise.
fn fiszero(d: &[Word]) -> Word {
    let mut r = 0;
    for &w in d {
        r |= w;
    }
    zero_mask(r)
}

// ws[0..n] <- a*b/R mod p. Constant-time.
fn monty_mul_ws(ws: &mut [Word], a: &[Word], b: &[Word], m: &PrimeModulus) {
    let n = a.len();
    let p_dash = m.monty().p_dash;
    let (t, rest) = ws.split_at_mut(2 * n + 1);
    let (rs, kws) = rest.split_at_mut(n + 1);
    mul_core(&mut t[..(2 * n)], a, n, b, n, kws);
    t[2 * n] = 0;
    redc(t, m.words(), p_dash, rs);
}

// ws[0..n] <- a^2/R mod p. Constant-time.
fn monty_sqr_ws(ws: &mut [Word], a: &[Word], m: &PrimeModulus) {
    let n = a.len();
    let p_dash = m.monty().p_dash;
    let (t, rest) = ws.split_at_mut(2 * n + 1);
    let (rs, kws) = rest.split_at_mut(n + 1);
    sqr_core(&mut t[..(2 * n)], a, n, kws);
    t[2 * n] = 0;
    redc(t, m.words(), p_dash, rs);
}

// ws[0..n] <- a/R mod p (conversion out of Montgomery representation).
fn monty_out_ws(ws: &mut [Word], a: &[Word], m: &PrimeModulus) {
    let n = a.len();
    let p_dash = m.monty().p_dash;
    let (t, rest) = ws.split_at_mut(2 * n + 1);
    t[..n].copy_from_slice(a);
    t[n..].fill(0);
    redc(t, m.words(), p_dash, &mut rest[..(n + 1)]);
}

// ws[0..n] <- a*b mod p, with a long division. NOT constant-time.
fn plain_mul_ws(ws: &mut [Word], a: &[Word], b: &[Word], sqr: bool, m: &PrimeModulus) {
    let n = a.len();
    let (t, kws) = ws.split_at_mut(2 * n + 1);
    if sqr {
        sqr_core(&mut t[..(2 * n)], a, n, kws);
    } else {
        mul_core(&mut t[..(2 * n)], a, n, b, n, kws);
    }
    let (_, r) = divrem_words_vartime(&t[..(2 * n)], m.words());
    t[..r.len()].copy_from_slice(&r);
    t[r.len()..n].fill(0);
}

// Reduces an arbitrary integer into [0, p), over exactly n words.
// NOT constant-time.
fn residue_words(value: &BigInt, m: &PrimeModulus) -> Vec<Word> {
    let n = m.word_len();
    let (_, mut r) = divrem_words_vartime(value.words(), m.words());
    r.resize(n, 0);
    if value.is_negative() && fiszero(&r) == 0 {
        let mut d = m.words().to_vec();
        let mut cc = 0;
        for i in 0..n {
            (d[i], cc) = subborrow(d[i], r[i], cc);
        }
        r = d;
    }
    r
}

impl Residue {

    fn new(v: Vec<Word>) -> Self {
        Self { v, mres: false, ws: Vec::new() }
    }

    fn scratch(&mut self) -> &mut [Word] {
        let len = scratch_len(self.v.len());
        if self.ws.len() < len {
            self.ws.resize(len, 0);
        }
        &mut self.ws[..]
    }

    fn to_mres(&mut self, m: &PrimeModulus) {
        if self.mres {
            return;
        }
        let n = self.v.len();
        let r2 = &m.monty().r2;
        self.scratch();
        monty_mul_ws(&mut self.ws, &self.v, r2, m);
        self.v.copy_from_slice(&self.ws[..n]);
        self.mres = true;
    }

    fn to_ordres(&mut self, m: &PrimeModulus) {
        if !self.mres {
            return;
        }
        let n = self.v.len();
        self.scratch();
        monty_out_ws(&mut self.ws, &self.v, m);
        self.v.copy_from_slice(&self.ws[..n]);
        self.mres = false;
    }
}

impl GFpElement {

    /// Creates an element of GF(p) with the provided value, and a new
    /// modulus descriptor for `p`.
    ///
    /// The value is reduced modulo `p` (negative values are accepted).
    /// If `use_special_reduction` is true, multiplications use the
    /// Montgomery representation.
    pub fn new(p: &BigInt, value: &BigInt, use_special_reduction: bool)
        -> Result<Self>
    {
        let m = PrimeModulus::shared(p)?;
        Ok(Self::with_modulus(&m, value, use_special_reduction))
    }

    /// Creates an element with the provided value over an existing
    /// (shared) modulus descriptor.
    pub fn with_modulus(modulus: &ModulusHandle, value: &BigInt,
        use_special_reduction: bool) -> Self
    {
        Self::from_words(modulus, residue_words(value, modulus), use_special_reduction)
    }

    fn from_words(modulus: &ModulusHandle, v: Vec<Word>,
        use_special_reduction: bool) -> Self
    {
        Self {
            modulus: modulus.clone(),
            use_special_reduction,
            state: RefCell::new(Residue::new(v)),
        }
    }

    /// Returns zero in the field of the provided modulus.
    pub fn zero(modulus: &ModulusHandle, use_special_reduction: bool) -> Self {
        Self::from_words(modulus, vec![0; modulus.word_len()], use_special_reduction)
    }

    /// Returns one in the field of the provided modulus.
    pub fn one(modulus: &ModulusHandle, use_special_reduction: bool) -> Self {
        let mut v = vec![0; modulus.word_len()];
        v[0] = 1;
        Self::from_words(modulus, v, use_special_reduction)
    }

    /// Returns a uniformly random element.
    pub fn random<T: CryptoRng + RngCore>(rng: &mut T, modulus: &ModulusHandle,
        use_special_reduction: bool) -> Self
    {
        let nbits = modulus.bits();
        let mut buf = vec![0u8; modulus.byte_len()];
        loop {
            rng.fill_bytes(&mut buf);
            buf[0] &= 0xFFu8 >> (8 * buf.len() - nbits);
            let x = BigInt::from_bytes_be(&buf);
            if x < *modulus.p() {
                return Self::with_modulus(modulus, &x, use_special_reduction);
            }
        }
    }

    /// Decodes an element from its fixed-length big-endian encoding
    /// (OS2FEP). The input length must be exactly the byte length of
    /// `p`, and the value must be lower than `p`.
    pub fn decode(buf: &[u8], modulus: &ModulusHandle,
        use_special_reduction: bool) -> Result<Self>
    {
        if buf.len() != modulus.byte_len() {
            return Err(Error::Decoding("field element has wrong length"));
        }
        let x = BigInt::from_bytes_be(buf);
        let n = modulus.word_len();
        let v = x.to_words_padded(n);
        if cmp_vartime(&v, modulus.words()) >= 0 {
            return Err(Error::Decoding("field element not lower than modulus"));
        }
        Ok(Self::from_words(modulus, v, use_special_reduction))
    }

    /// Encodes this element as a big-endian byte string whose length is
    /// the byte length of `p` (FE2OSP).
    pub fn encode(&self) -> Vec<u8> {
        let x = BigInt::from_words(&self.ordinary_words());
        // The value is lower than p, hence always fits.
        match x.encode_padded(self.modulus.byte_len()) {
            Ok(d) => d,
            Err(_) => unreachable!(),
        }
    }

    /// Gets the modulus descriptor.
    pub fn modulus(&self) -> &ModulusHandle {
        &self.modulus
    }

    /// Gets a new shared reference to the modulus descriptor.
    pub fn get_shared_modulus(&self) -> ModulusHandle {
        self.modulus.clone()
    }

    /// Replaces the modulus descriptor with another one for the same
    /// prime. The value is unchanged.
    pub fn set_shared_modulus(&mut self, modulus: &ModulusHandle) -> Result<()> {
        if modulus.p() != self.modulus.p() {
            return Err(Error::InvalidArgument("modulus descriptor is for another prime"));
        }
        self.modulus = modulus.clone();
        Ok(())
    }

    /// Gets the modulus.
    pub fn get_p(&self) -> &BigInt {
        self.modulus.p()
    }

    pub fn uses_special_reduction(&self) -> bool {
        self.use_special_reduction
    }

    /// Returns `true` if the element is currently held in Montgomery
    /// representation.
    pub fn is_trf_to_mres(&self) -> bool {
        self.state.borrow().mres
    }

    /// Enables Montgomery multiplication for this element.
    pub fn turn_on_sp_red_mul(&mut self) {
        self.use_special_reduction = true;
    }

    /// Disables Montgomery multiplication for this element; if the value
    /// is currently an m-residue, it is first converted back.
    pub fn turn_off_sp_red_mul(&mut self) {
        self.trf_to_ordres();
        self.use_special_reduction = false;
    }

    // Converts the cached representation to an m-residue.
    fn trf_to_mres(&self) -> Result<()> {
        if !self.use_special_reduction {
            return Err(Error::IllegalTransformation(
                "Montgomery representation disabled for this element"));
        }
        self.state.borrow_mut().to_mres(&self.modulus);
        Ok(())
    }

    // Converts the cached representation to an ordinary residue.
    fn trf_to_ordres(&self) {
        self.state.borrow_mut().to_ordres(&self.modulus);
    }

    // Ordinary residue words, without touching the cache.
    fn ordinary_words(&self) -> Vec<Word> {
        let st = self.state.borrow();
        if !st.mres {
            return st.v.clone();
        }
        let n = st.v.len();
        let mut ws = vec![0; scratch_len(n)];
        monty_out_ws(&mut ws, &st.v, &self.modulus);
        ws.truncate(n);
        ws
    }

    /// Gets the value as an ordinary residue in `[0, p)`. If the element
    /// is held as an m-residue, it is converted back.
    pub fn get_value(&self) -> BigInt {
        self.trf_to_ordres();
        BigInt::from_words(&self.state.borrow().v)
    }

    /// Gets the m-residue `v*R mod p` of this element, converting it if
    /// necessary. This fails if the element does not use special
    /// reduction.
    pub fn get_mres(&self) -> Result<BigInt> {
        self.trf_to_mres()?;
        Ok(BigInt::from_words(&self.state.borrow().v))
    }

    fn same_field(&self, rhs: &Self) -> bool {
        Arc::ptr_eq(&self.modulus, &rhs.modulus)
            || self.modulus.p() == rhs.modulus.p()
    }

    fn check_field(&self, rhs: &Self) -> Result<()> {
        if self.same_field(rhs) {
            Ok(())
        } else {
            Err(Error::InvalidArgument("operands belong to different fields"))
        }
    }

    /// Brings two elements into the same representation.
    ///
    /// Both are converted to m-residues if both use special reduction and
    /// at least one of them is already an m-residue; otherwise, both are
    /// converted to ordinary residues. Returned value is `true` for the
    /// Montgomery representation. The `use_special_reduction` flags are
    /// not modified.
    pub fn align_operands(lhs: &Self, rhs: &Self) -> Result<bool> {
        lhs.check_field(rhs)?;
        if lhs.use_special_reduction && rhs.use_special_reduction
            && (lhs.is_trf_to_mres() || rhs.is_trf_to_mres())
        {
            lhs.trf_to_mres()?;
            rhs.trf_to_mres()?;
            Ok(true)
        } else {
            lhs.trf_to_ordres();
            rhs.trf_to_ordres();
            Ok(false)
        }
    }

    // Representation for a product: Montgomery if both operands allow it.
    fn align_for_mul(lhs: &Self, rhs: &Self) -> Result<bool> {
        lhs.check_field(rhs)?;
        if lhs.use_special_reduction && rhs.use_special_reduction {
            lhs.trf_to_mres()?;
            rhs.trf_to_mres()?;
            Ok(true)
        } else {
            lhs.trf_to_ordres();
            rhs.trf_to_ordres();
            Ok(false)
        }
    }

    /// Makes this element an independent copy of `other`: the value, the
    /// configuration, and a private copy of the modulus descriptor.
    pub fn assign(&mut self, other: &Self) {
        let st = other.state.borrow();
        self.modulus = Arc::new((*other.modulus).clone());
        self.use_special_reduction = other.use_special_reduction;
        *self.state.get_mut() = Residue { v: st.v.clone(), mres: st.mres, ws: Vec::new() };
    }

    /// Makes this element a copy of `other` that shares its modulus
    /// descriptor. Values remain independent.
    pub fn share_assign(&mut self, other: &Self) {
        let st = other.state.borrow();
        self.modulus = other.modulus.clone();
        self.use_special_reduction = other.use_special_reduction;
        *self.state.get_mut() = Residue { v: st.v.clone(), mres: st.mres, ws: Vec::new() };
    }

    /// Adds `rhs` to this element.
    pub fn set_add(&mut self, rhs: &Self) -> Result<()> {
        Self::align_operands(self, rhs)?;
        let rv = rhs.state.borrow();
        fadd(&mut self.state.get_mut().v, &rv.v, self.modulus.words());
        Ok(())
    }

    /// Subtracts `rhs` from this element.
    pub fn set_sub(&mut self, rhs: &Self) -> Result<()> {
        Self::align_operands(self, rhs)?;
        let rv = rhs.state.borrow();
        fsub(&mut self.state.get_mut().v, &rv.v, self.modulus.words());
        Ok(())
    }

    /// Multiplies this element by `rhs`.
    pub fn set_mul(&mut self, rhs: &Self) -> Result<()> {
        let mres = Self::align_for_mul(self, rhs)?;
        let rv = rhs.state.borrow();
        let m = &*self.modulus;
        let st = self.state.get_mut();
        let n = st.v.len();
        st.scratch();
        #[cfg(all(test, feature = "std"))]
        opcount::bump();
        if mres {
            monty_mul_ws(&mut st.ws, &st.v, &rv.v, m);
        } else {
            plain_mul_ws(&mut st.ws, &st.v, &rv.v, false, m);
        }
        st.v.copy_from_slice(&st.ws[..n]);
        Ok(())
    }

    /// Squares this element.
    pub fn set_square(&mut self) {
        let m = &*self.modulus;
        let usr = self.use_special_reduction;
        let st = self.state.get_mut();
        let n = st.v.len();
        st.scratch();
        #[cfg(all(test, feature = "std"))]
        opcount::bump();
        if usr {
            st.to_mres(m);
            monty_sqr_ws(&mut st.ws, &st.v, m);
        } else {
            plain_mul_ws(&mut st.ws, &st.v, &[], true, m);
        }
        st.v.copy_from_slice(&st.ws[..n]);
    }

    /// Divides this element by `rhs`. Division by zero is an
    /// `IllegalTransformation` error.
    pub fn set_div(&mut self, rhs: &Self) -> Result<()> {
        self.check_field(rhs)?;
        let inv = rhs.invert()?;
        self.set_mul(&inv)
    }

    /// Multiplies this element by a small integer.
    pub fn set_mul_word(&mut self, k: u32) {
        // Double-and-add over the bits of k; both representations are
        // linear, so this works on either.
        let p = self.modulus.words();
        let st = self.state.get_mut();
        let x = st.v.clone();
        st.v.fill(0);
        for i in (0..32).rev() {
            fdbl(&mut st.v, p);
            if ((k >> i) & 1) != 0 {
                fadd(&mut st.v, &x, p);
            }
        }
    }

    /// Negates this element.
    pub fn set_neg(&mut self) {
        let p = self.modulus.words();
        fneg(&mut self.state.get_mut().v, p);
    }

    /// Doubles this element.
    pub fn set_mul2(&mut self) {
        let p = self.modulus.words();
        fdbl(&mut self.state.get_mut().v, p);
    }

    /// Halves this element.
    pub fn set_half(&mut self) {
        let p = self.modulus.words();
        fhalf(&mut self.state.get_mut().v, p);
    }

    /// Inverts this element in place.
    ///
    /// The inverse is computed as `v^(p-2)` with a fixed sequence of
    /// squarings and multiplications (in Montgomery representation,
    /// whatever the element configuration), then verified. Inverting
    /// zero, or a failed verification (the modulus is not prime), is an
    /// `IllegalTransformation` error; the element is then unmodified.
    pub fn set_invert(&mut self) -> Result<()> {
        if self.is_zero() {
            tracing::debug!("inversion of zero");
            return Err(Error::IllegalTransformation("inverse of zero"));
        }
        let m = &*self.modulus;
        let mp = m.monty();
        let st = self.state.get_mut();
        let n = st.v.len();
        st.scratch();

        // x <- self as an m-residue
        let x = if st.mres {
            st.v.clone()
        } else {
            monty_mul_ws(&mut st.ws, &st.v, &mp.r2, m);
            st.ws[..n].to_vec()
        };

        // e = p - 2
        let mut e = m.words().to_vec();
        let mut cc = 0;
        for i in 0..n {
            (e[i], cc) = subborrow(e[i], if i == 0 { 2 } else { 0 }, cc);
        }
        let ebits = BigInt::from_words(&e).bits();

        let mut r = mp.r.clone();
        let mut t = vec![0 as Word; n];
        for i in (0..ebits).rev() {
            monty_sqr_ws(&mut st.ws, &r, m);
            r.copy_from_slice(&st.ws[..n]);
            monty_mul_ws(&mut st.ws, &r, &x, m);
            t.copy_from_slice(&st.ws[..n]);
            let bit = (e[i / WORD_BITS] >> (i % WORD_BITS)) & 1;
            let rc = r.clone();
            cnd_select(&mut r, &rc, &t, bit.wrapping_neg());
        }

        // Verify: x*r = 1 (i.e. R in Montgomery representation).
        monty_mul_ws(&mut st.ws, &r, &x, m);
        if st.ws[..n] != mp.r[..] {
            tracing::debug!(bits = m.bits(), "inversion check failed");
            return Err(Error::IllegalTransformation("modulus is not prime"));
        }

        if st.mres {
            st.v.copy_from_slice(&r);
        } else {
            monty_out_ws(&mut st.ws, &r, m);
            st.v.copy_from_slice(&st.ws[..n]);
        }
        Ok(())
    }

    /// Returns the inverse of this element.
    pub fn invert(&self) -> Result<Self> {
        let mut r = self.clone();
        r.set_invert()?;
        Ok(r)
    }

    /// Returns the square of this element.
    pub fn square(&self) -> Self {
        let mut r = self.clone();
        r.set_square();
        r
    }

    /// Returns twice this element.
    pub fn mul2(&self) -> Self {
        let mut r = self.clone();
        r.set_mul2();
        r
    }

    /// Returns this element divided by 2.
    pub fn half(&self) -> Self {
        let mut r = self.clone();
        r.set_half();
        r
    }

    /// Raises this element to the power `e`. A negative exponent inverts
    /// the element first. The exponent is assumed public: this function
    /// is NOT constant-time with regard to `e`.
    pub fn pow_vartime(&self, e: &BigInt) -> Result<Self> {
        let base = if e.is_negative() { self.invert()? } else { self.clone() };
        let mut r = Self::one(&self.modulus, self.use_special_reduction);
        for i in (0..e.bits()).rev() {
            r.set_square();
            if e.get_bit(i) {
                r.set_mul(&base)?;
            }
        }
        Ok(r)
    }

    /// Returns a square root of this element, or `None` if it is not a
    /// quadratic residue. Which of the two roots is returned is not
    /// specified. This function is NOT constant-time.
    pub fn sqrt_vartime(&self) -> Option<Self> {
        if self.is_zero() {
            return Some(self.clone());
        }
        let p = self.get_p();
        let one = BigInt::one();
        let pm1 = p - &one;
        let e = &pm1 >> 1;
        if !self.pow_vartime(&e).ok()?.is_one() {
            return None;
        }

        // p = 3 mod 4: the root is v^((p+1)/4).
        if p.get_bit(1) {
            let r = self.pow_vartime(&((p + &one) >> 2)).ok()?;
            return if r.square().equals(self) { Some(r) } else { None };
        }

        // Tonelli-Shanks: p - 1 = q*2^s with q odd.
        let mut s = 0;
        while !pm1.get_bit(s) {
            s += 1;
        }
        let q = &pm1 >> s;

        let mut k = 2u32;
        let z = loop {
            let z = Self::with_modulus(&self.modulus, &BigInt::from(k),
                self.use_special_reduction);
            if !z.pow_vartime(&e).ok()?.is_one() {
                break z;
            }
            k += 1;
        };

        let mut m = s;
        let mut c = z.pow_vartime(&q).ok()?;
        let mut t = self.pow_vartime(&q).ok()?;
        let mut r = self.pow_vartime(&((&q + &one) >> 1)).ok()?;
        while !t.is_one() {
            let mut i = 0;
            let mut tt = t.clone();
            while !tt.is_one() {
                tt.set_square();
                i += 1;
                if i == m {
                    return None;
                }
            }
            let mut b = c;
            for _ in 0..(m - i - 1) {
                b.set_square();
            }
            m = i;
            c = b.square();
            t.set_mul(&c).ok()?;
            r.set_mul(&b).ok()?;
        }
        Some(r)
    }

    /// Returns `true` if this element is zero.
    pub fn is_zero(&self) -> bool {
        // Zero is represented by zero in both representations.
        fiszero(&self.state.borrow().v) != 0
    }

    // All-ones if this element is zero, 0 otherwise.
    pub(crate) fn iszero_mask(&self) -> Word {
        fiszero(&self.state.borrow().v)
    }

    /// Returns `true` if this element is one.
    pub fn is_one(&self) -> bool {
        let st = self.state.borrow();
        if st.mres {
            st.v == self.modulus.monty().r
        } else {
            st.v[0] == 1 && fiszero(&st.v[1..]) != 0
        }
    }

    /// Compares this element with another. Elements of distinct fields
    /// are never equal.
    pub fn equals(&self, rhs: &Self) -> bool {
        if Self::align_operands(self, rhs).is_err() {
            return false;
        }
        let a = self.state.borrow();
        let b = rhs.state.borrow();
        let mut r = 0;
        for i in 0..a.v.len() {
            r |= a.v[i] ^ b.v[i];
        }
        zero_mask(r) != 0
    }

    /// Sets this element to `a` if `ctl` is all-ones, leaves it unchanged
    /// if `ctl` is zero. Both elements are first brought to the same
    /// representation; the selection itself is constant-time.
    pub fn set_cond(&mut self, a: &Self, ctl: Word) -> Result<()> {
        Self::align_operands(self, a)?;
        let av = a.state.borrow();
        let st = self.state.get_mut();
        let cur = st.v.clone();
        cnd_select(&mut st.v, &cur, &av.v, ctl);
        Ok(())
    }

    /// Returns `a0` if `ctl` is zero, `a1` if `ctl` is all-ones.
    pub fn select(a0: &Self, a1: &Self, ctl: Word) -> Result<Self> {
        let mut r = a0.clone();
        r.set_cond(a1, ctl)?;
        Ok(r)
    }
}

/// Encodes a field element (FE2OSP).
pub fn fe2osp(e: &GFpElement) -> Vec<u8> {
    e.encode()
}

/// Decodes a field element modulo `p` (OS2FEP). A new modulus descriptor
/// is created; the element does not use special reduction.
pub fn os2fep(buf: &[u8], p: &BigInt) -> Result<GFpElement> {
    let m = PrimeModulus::shared(p)?;
    GFpElement::decode(buf, &m, false)
}

impl Clone for GFpElement {
    /// Copies the value and configuration; the clone shares the modulus
    /// descriptor.
    fn clone(&self) -> Self {
        let st = self.state.borrow();
        Self {
            modulus: self.modulus.clone(),
            use_special_reduction: self.use_special_reduction,
            state: RefCell::new(Residue { v: st.v.clone(), mres: st.mres, ws: Vec::new() }),
        }
    }
}

impl PartialEq for GFpElement {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Debug for GFpElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GFpElement({:#x} mod {:#x})",
            BigInt::from_words(&self.ordinary_words()), self.modulus.p())
    }
}

// Operators panic where the corresponding set_*() method would return
// an error: operands from different fields, or division by zero.
macro_rules! gfp_binop {
    ($tr:ident, $f:ident, $tra:ident, $fa:ident, $set:ident) => {
        impl $tra<&GFpElement> for GFpElement {
            #[inline]
            fn $fa(&mut self, other: &GFpElement) {
                if let Err(e) = self.$set(other) {
                    panic!("{}", e);
                }
            }
        }

        impl $tra<GFpElement> for GFpElement {
            #[inline]
            fn $fa(&mut self, other: GFpElement) {
                $tra::$fa(self, &other);
            }
        }

        impl $tr<&GFpElement> for &GFpElement {
            type Output = GFpElement;

            #[inline]
            fn $f(self, other: &GFpElement) -> GFpElement {
                let mut r = self.clone();
                $tra::$fa(&mut r, other);
                r
            }
        }

        impl $tr<GFpElement> for &GFpElement {
            type Output = GFpElement;

            #[inline]
            fn $f(self, other: GFpElement) -> GFpElement {
                let mut r = self.clone();
                $tra::$fa(&mut r, &other);
                r
            }
        }

        impl $tr<&GFpElement> for GFpElement {
            type Output = GFpElement;

            #[inline]
            fn $f(mut self, other: &GFpElement) -> GFpElement {
                $tra::$fa(&mut self, other);
                self
            }
        }

        impl $tr<GFpElement> for GFpElement {
            type Output = GFpElement;

            #[inline]
            fn $f(mut self, other: GFpElement) -> GFpElement {
                $tra::$fa(&mut self, &other);
                self
            }
        }
    };
}

gfp_binop!(Add, add, AddAssign, add_assign, set_add);
gfp_binop!(Sub, sub, SubAssign, sub_assign, set_sub);
gfp_binop!(Mul, mul, MulAssign, mul_assign, set_mul);
gfp_binop!(Div, div, DivAssign, div_assign, set_div);

impl MulAssign<u32> for GFpElement {
    #[inline]
    fn mul_assign(&mut self, k: u32) {
        self.set_mul_word(k);
    }
}

impl Mul<u32> for &GFpElement {
    type Output = GFpElement;

    #[inline]
    fn mul(self, k: u32) -> GFpElement {
        let mut r = self.clone();
        r.set_mul_word(k);
        r
    }
}

impl Mul<u32> for GFpElement {
    type Output = GFpElement;

    #[inline]
    fn mul(mut self, k: u32) -> GFpElement {
        self.set_mul_word(k);
        self
    }
}

impl Neg for &GFpElement {
    type Output = GFpElement;

    #[inline]
    fn neg(self) -> GFpElement {
        let mut r = self.clone();
        r.set_neg();
        r
    }
}

impl Neg for GFpElement {
    type Output = GFpElement;

    #[inline]
    fn neg(mut self) -> GFpElement {
        self.set_neg();
        self
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use num_bigint::{BigInt as NBigInt, Sign as NSign};
    use sha2::{Sha256, Digest};

    fn mkrnd(seed: u64, len: usize) -> BigInt {
        let mut sh = Sha256::new();
        let mut b = Vec::new();
        let mut ctr = 0u64;
        while b.len() < len {
            sh.update(seed.to_le_bytes());
            sh.update(ctr.to_le_bytes());
            b.extend_from_slice(&sh.finalize_reset());
            ctr += 1;
        }
        b.truncate(len);
        BigInt::from_bytes_be(&b)
    }

    fn to_n(x: &BigInt) -> NBigInt {
        let s = if x.is_negative() { NSign::Minus } else { NSign::Plus };
        NBigInt::from_bytes_be(s, &x.to_bytes_be())
    }

    fn mersenne(e: usize) -> BigInt {
        (BigInt::one() << e) - BigInt::one()
    }

    fn p25519() -> BigInt {
        (BigInt::one() << 255usize) - BigInt::from_u64(19)
    }

    fn p256() -> BigInt {
        BigInt::from_hex("ffffffff00000001000000000000000000000000ffffffffffffffffffffffff")
            .unwrap()
    }

    fn p224() -> BigInt {
        (BigInt::one() << 224usize) - (BigInt::one() << 96usize) + BigInt::one()
    }

    #[test]
    fn small_product() {
        let p = p25519();
        for &usr in [false, true].iter() {
            let mut a = GFpElement::new(&p, &BigInt::from_u64(12345), usr).unwrap();
            let b = GFpElement::with_modulus(a.modulus(), &BigInt::from_u64(67890), usr);
            a.set_mul(&b).unwrap();
            assert_eq!(a.is_trf_to_mres(), usr);
            assert_eq!(a.get_value(), BigInt::from_u64(838102050));
            assert!(!a.is_trf_to_mres());
        }
    }

    #[test]
    fn arithmetic() {
        let primes = [p25519(), p256(), p224(), mersenne(521), mersenne(2203)];
        let mut seed = 0;
        for p in primes.iter() {
            let m = PrimeModulus::shared(p).unwrap();
            let np = to_n(p);
            let iters = if p.bits() > 1000 { 3 } else { 12 };
            for j in 0..iters {
                let a = mkrnd(seed, m.byte_len() + 3);
                let b = mkrnd(seed + 1, m.byte_len());
                seed += 2;
                let (na, nb) = (to_n(&a) % &np, to_n(&b) % &np);
                let usr = (j & 1) != 0;
                let ea = GFpElement::with_modulus(&m, &a, usr);
                let eb = GFpElement::with_modulus(&m, &b, (j & 2) != 0);
                assert_eq!(to_n(&ea.get_value()), na);

                assert_eq!(to_n(&(&ea + &eb).get_value()), (&na + &nb) % &np);
                assert_eq!(to_n(&(&ea - &eb).get_value()), (&na - &nb + &np) % &np);
                assert_eq!(to_n(&(&ea * &eb).get_value()), (&na * &nb) % &np);
                assert_eq!(to_n(&ea.square().get_value()), (&na * &na) % &np);
                assert_eq!(to_n(&(-&ea).get_value()), (&np - &na) % &np);
                assert_eq!(to_n(&ea.mul2().get_value()), (&na * 2u32) % &np);
                assert_eq!(to_n(&(&ea * 1000003u32).get_value()), (&na * 1000003u32) % &np);
                assert_eq!(to_n(&ea.half().mul2().get_value()), na.clone());

                // Products chained in Montgomery representation, then
                // mixed with additions.
                let mut c = ea.clone();
                c.set_mul(&eb).unwrap();
                c.set_square();
                c.set_add(&ea).unwrap();
                c.set_mul(&eb).unwrap();
                let nc = ((&na * &nb % &np) * (&na * &nb % &np) + &na) * &nb % &np;
                assert_eq!(to_n(&c.get_value()), nc);

                let ia = ea.invert().unwrap();
                assert_eq!(to_n(&ia.get_value()) * &na % &np, NBigInt::from(1u32));
                let q = &eb / &ea;
                assert_eq!(to_n(&(&q * &ea).get_value()), nb.clone());
            }
        }
    }

    #[test]
    fn negative_values() {
        let p = p256();
        let m = PrimeModulus::shared(&p).unwrap();
        let a = GFpElement::with_modulus(&m, &BigInt::from_i64(-1), false);
        assert_eq!(a.get_value(), &p - &BigInt::one());
        let b = GFpElement::with_modulus(&m, &(-&p), true);
        assert!(b.is_zero());
        let c = GFpElement::with_modulus(&m, &(&p + &BigInt::from_u64(5)), true);
        assert_eq!(c.get_value(), BigInt::from_u64(5));
    }

    #[test]
    fn inversion_errors() {
        let p = p25519();
        let m = PrimeModulus::shared(&p).unwrap();
        for &usr in [false, true].iter() {
            let mut z = GFpElement::zero(&m, usr);
            match z.set_invert() {
                Err(Error::IllegalTransformation(_)) => (),
                r => panic!("unexpected: {:?}", r),
            }
            assert!(z.is_zero());
            let one = GFpElement::one(&m, usr);
            assert!(one.clone().set_div(&z).is_err());
        }

        // 15 is odd but not prime: 2^13 = 2 mod 15, which is not an
        // inverse of 2.
        let m = PrimeModulus::shared(&BigInt::from_u64(15)).unwrap();
        let mut x = GFpElement::with_modulus(&m, &BigInt::from_u64(2), true);
        match x.set_invert() {
            Err(Error::IllegalTransformation(_)) => (),
            r => panic!("unexpected: {:?}", r),
        }
        assert_eq!(x.get_value(), BigInt::from_u64(2));
    }

    #[test]
    #[should_panic]
    fn division_by_zero_panics() {
        let m = PrimeModulus::shared(&p256()).unwrap();
        let one = GFpElement::one(&m, false);
        let z = GFpElement::zero(&m, false);
        let _ = one / z;
    }

    #[test]
    fn montgomery_state() {
        let p = p256();
        let m = PrimeModulus::shared(&p).unwrap();
        let v = mkrnd(100, 31);
        let a = GFpElement::with_modulus(&m, &v, true);
        assert!(!a.is_trf_to_mres());
        let r = BigInt::one() << 256usize;
        let mr = a.get_mres().unwrap();
        assert!(a.is_trf_to_mres());
        assert_eq!(mr, (&v * &r) % &p);
        // Idempotent in both directions.
        assert_eq!(a.get_mres().unwrap(), mr);
        assert_eq!(a.get_value(), v);
        assert_eq!(a.get_value(), v);
        assert!(!a.is_trf_to_mres());

        let b = GFpElement::with_modulus(&m, &v, false);
        match b.get_mres() {
            Err(Error::IllegalTransformation(_)) => (),
            r => panic!("unexpected: {:?}", r),
        }

        let mut c = GFpElement::with_modulus(&m, &v, false);
        c.turn_on_sp_red_mul();
        c.set_square();
        assert!(c.is_trf_to_mres());
        c.turn_off_sp_red_mul();
        assert!(!c.is_trf_to_mres());
        assert!(!c.uses_special_reduction());
        assert_eq!(c.get_value(), (&v * &v) % &p);
        assert!(c.equals(&a.square()));
    }

    #[test]
    fn operand_alignment() {
        let m = PrimeModulus::shared(&p25519()).unwrap();
        let a = GFpElement::with_modulus(&m, &BigInt::from_u64(7), true);
        let b = GFpElement::with_modulus(&m, &BigInt::from_u64(9), true);
        let c = GFpElement::with_modulus(&m, &BigInt::from_u64(11), false);

        // Neither is an m-residue: both stay ordinary.
        assert!(!GFpElement::align_operands(&a, &b).unwrap());
        assert!(!a.is_trf_to_mres() && !b.is_trf_to_mres());

        a.get_mres().unwrap();
        assert!(GFpElement::align_operands(&a, &b).unwrap());
        assert!(a.is_trf_to_mres() && b.is_trf_to_mres());

        // One operand without special reduction: back to ordinary.
        assert!(!GFpElement::align_operands(&a, &c).unwrap());
        assert!(!a.is_trf_to_mres() && !c.is_trf_to_mres());
        assert!(a.uses_special_reduction() && !c.uses_special_reduction());
        assert!(b.is_trf_to_mres());

        let mut s = a.clone();
        s.set_add(&b).unwrap();
        assert_eq!(s.get_value(), BigInt::from_u64(16));
        s.set_sub(&c).unwrap();
        assert_eq!(s.get_value(), BigInt::from_u64(5));
    }

    #[test]
    fn different_fields() {
        let a = GFpElement::new(&p25519(), &BigInt::from_u64(3), false).unwrap();
        let mut b = GFpElement::new(&p256(), &BigInt::from_u64(3), false).unwrap();
        match b.set_add(&a) {
            Err(Error::InvalidArgument(_)) => (),
            r => panic!("unexpected: {:?}", r),
        }
        assert!(b.set_mul(&a).is_err());
        assert!(!a.equals(&b));
        assert!(GFpElement::align_operands(&a, &b).is_err());

        // Distinct descriptors for the same prime are compatible.
        let c = GFpElement::new(&p256(), &BigInt::from_u64(3), true).unwrap();
        assert!(!Arc::ptr_eq(b.modulus(), c.modulus()));
        assert!(b.equals(&c));
        b.set_add(&c).unwrap();
        assert_eq!(b.get_value(), BigInt::from_u64(6));
        assert!(b.set_shared_modulus(a.modulus()).is_err());
        b.set_shared_modulus(c.modulus()).unwrap();
        assert!(Arc::ptr_eq(b.modulus(), c.modulus()));
    }

    #[test]
    fn copies() {
        let m = PrimeModulus::shared(&p256()).unwrap();
        let a = GFpElement::with_modulus(&m, &BigInt::from_u64(42), true);
        a.get_mres().unwrap();
        let mut b = GFpElement::zero(&m, false);
        b.share_assign(&a);
        assert!(Arc::ptr_eq(b.modulus(), a.modulus()));
        assert!(b.uses_special_reduction() && b.is_trf_to_mres());
        let mut c = GFpElement::zero(&m, false);
        c.assign(&a);
        assert!(!Arc::ptr_eq(c.modulus(), a.modulus()));
        assert_eq!(c.modulus(), a.modulus());
        assert!(c.equals(&a));
        b.set_neg();
        assert!(!b.equals(&a));
        assert_eq!(a.get_value(), BigInt::from_u64(42));
    }

    #[test]
    fn codec() {
        let p = p256();
        let m = PrimeModulus::shared(&p).unwrap();
        let v = mkrnd(7, 32) % &p;
        let a = GFpElement::with_modulus(&m, &v, true);
        a.get_mres().unwrap();
        let buf = a.encode();
        assert_eq!(buf.len(), 32);
        assert_eq!(buf, v.encode_padded(32).unwrap());
        // Encoding does not change the representation.
        assert!(a.is_trf_to_mres());
        let b = GFpElement::decode(&buf, &m, false).unwrap();
        assert!(b.equals(&a));
        assert!(os2fep(&fe2osp(&a), &p).unwrap().equals(&b));

        let small = GFpElement::with_modulus(&m, &BigInt::from_u64(1), false);
        assert_eq!(small.encode()[..31], [0u8; 31]);
        assert_eq!(small.encode()[31], 1);

        assert!(matches!(GFpElement::decode(&buf[1..], &m, false), Err(Error::Decoding(_))));
        let mut long = vec![0u8];
        long.extend_from_slice(&buf);
        assert!(matches!(GFpElement::decode(&long, &m, false), Err(Error::Decoding(_))));
        let pb = p.encode_padded(32).unwrap();
        assert!(matches!(GFpElement::decode(&pb, &m, false), Err(Error::Decoding(_))));
        let pm1 = (&p - &BigInt::one()).encode_padded(32).unwrap();
        assert!(GFpElement::decode(&pm1, &m, false).is_ok());
    }

    #[test]
    fn square_roots() {
        let primes = [p256(), p25519(), p224(), mersenne(521)];
        let mut seed = 1000;
        for p in primes.iter() {
            let m = PrimeModulus::shared(p).unwrap();
            for j in 0..5 {
                let x = GFpElement::with_modulus(&m, &mkrnd(seed, 40), (j & 1) != 0);
                seed += 1;
                let x2 = x.square();
                let r = x2.sqrt_vartime().unwrap();
                assert!(r.square().equals(&x2));
                assert!(r.equals(&x) || r.equals(&-&x));
            }
            assert!(GFpElement::zero(&m, false).sqrt_vartime().unwrap().is_zero());
        }

        // -1 is not a square modulo a prime p = 3 mod 4; 2 is not a square
        // modulo a prime p = 5 mod 8.
        let m = PrimeModulus::shared(&p256()).unwrap();
        assert!(GFpElement::with_modulus(&m, &BigInt::from_i64(-1), false)
            .sqrt_vartime().is_none());
        let m = PrimeModulus::shared(&p25519()).unwrap();
        assert!(GFpElement::with_modulus(&m, &BigInt::from_u64(2), true)
            .sqrt_vartime().is_none());
    }

    #[test]
    fn powers() {
        let p = p25519();
        let m = PrimeModulus::shared(&p).unwrap();
        let a = GFpElement::with_modulus(&m, &BigInt::from_u64(3), true);
        let a5 = a.pow_vartime(&BigInt::from_u64(5)).unwrap();
        assert_eq!(a5.get_value(), BigInt::from_u64(243));
        assert!(a.pow_vartime(&BigInt::zero()).unwrap().is_one());
        let ainv = a.pow_vartime(&BigInt::from_i64(-1)).unwrap();
        assert!((&ainv * &a).is_one());
        assert!(a.pow_vartime(&(&p - &BigInt::one())).unwrap().is_one());
    }

    #[test]
    fn selection() {
        let m = PrimeModulus::shared(&p256()).unwrap();
        let a = GFpElement::with_modulus(&m, &BigInt::from_u64(5), true);
        let b = GFpElement::with_modulus(&m, &BigInt::from_u64(6), true);
        b.get_mres().unwrap();
        assert!(GFpElement::select(&a, &b, 0).unwrap().equals(&a));
        assert!(GFpElement::select(&a, &b, Word::MAX).unwrap().equals(&b));
        let mut c = a.clone();
        c.set_cond(&b, 0).unwrap();
        assert_eq!(c.get_value(), BigInt::from_u64(5));
        c.set_cond(&b, Word::MAX).unwrap();
        assert_eq!(c.get_value(), BigInt::from_u64(6));
    }

    #[test]
    fn random_elements() {
        struct Ctr(u64);
        impl RngCore for Ctr {
            fn next_u32(&mut self) -> u32 { self.next_u64() as u32 }
            fn next_u64(&mut self) -> u64 {
                self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                self.0
            }
            fn fill_bytes(&mut self, dest: &mut [u8]) {
                for b in dest.iter_mut() {
                    *b = (self.next_u64() >> 56) as u8;
                }
            }
            fn try_fill_bytes(&mut self, dest: &mut [u8]) -> core::result::Result<(), rand_core::Error> {
                self.fill_bytes(dest);
                Ok(())
            }
        }
        impl CryptoRng for Ctr { }

        let p = p25519();
        let m = PrimeModulus::shared(&p).unwrap();
        let mut rng = Ctr(5);
        let x = GFpElement::random(&mut rng, &m, true);
        let y = GFpElement::random(&mut rng, &m, true);
        assert!(x.get_value() < p);
        assert!(!x.equals(&y));
    }
}
