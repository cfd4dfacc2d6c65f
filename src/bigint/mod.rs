//! Signed big integers.
//!
//! `BigInt` holds a sign and a magnitude. The magnitude is a vector of
//! words (least significant first) whose length, the _capacity_, may
//! exceed the number of significant words; capacities are kept at
//! multiples of 8 words so that multiplications of similar-sized values
//! can use the fixed-size and Karatsuba routines. Words above the
//! significant length are always zero.
//!
//! Additions, subtractions, multiplications and squarings run in time
//! that depends on the operand lengths only; everything that has to
//! look at the top non-zero word (comparisons, divisions, shifts,
//! encoding to minimal length) is variable-time.

use core::cmp::Ordering;
use core::fmt;
use core::ops::{Add, AddAssign, Sub, SubAssign, Mul, MulAssign};
use core::ops::{Div, DivAssign, Rem, RemAssign, Neg};
use core::ops::{Shl, ShlAssign, Shr, ShrAssign};
use rand_core::{CryptoRng, RngCore};

use crate::backend::{Word, WORD_BITS, WORD_BYTES, words_from_u64le};
use crate::mp::{add3, sub3, linmul3, sig_words, cmp_vartime};
use crate::mp::dispatch::{mul_core, sqr_core, workspace_len};
use crate::mp::{KARATSUBA_MUL_THRESHOLD, KARATSUBA_SQR_THRESHOLD};
use crate::{Error, Result, Vec};

mod divide;

pub(crate) use divide::{divrem_words_vartime, divrem_word_vartime};

/// Sign of a big integer. Zero is always `Positive`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sign {
    Negative,
    Positive,
}

impl Sign {
    fn flip(self) -> Sign {
        match self {
            Sign::Negative => Sign::Positive,
            Sign::Positive => Sign::Negative,
        }
    }
}

/// A signed big integer.
#[derive(Clone)]
pub struct BigInt {
    sign: Sign,
    reg: Vec<Word>,
}

const fn round_up8(n: usize) -> usize {
    (n + 7) & !7
}

impl BigInt {

    /// Returns zero.
    pub const fn zero() -> Self {
        Self { sign: Sign::Positive, reg: Vec::new() }
    }

    /// Returns one.
    pub fn one() -> Self {
        Self::from_u64(1)
    }

    pub fn from_u64(v: u64) -> Self {
        Self::from_mag(Sign::Positive, words_from_u64le(&[v]))
    }

    pub fn from_i64(v: i64) -> Self {
        let sign = if v < 0 { Sign::Negative } else { Sign::Positive };
        Self::from_mag(sign, words_from_u64le(&[v.unsigned_abs()]))
    }

    /// Creates a non-negative integer from its words (least significant
    /// first).
    pub fn from_words(w: &[Word]) -> Self {
        Self::from_mag(Sign::Positive, w.to_vec())
    }

    /// Creates a non-negative integer from 64-bit limbs in little-endian
    /// order (least significant limb first). This works identically with
    /// both backends.
    pub fn from_w64le(limbs: &[u64]) -> Self {
        Self::from_mag(Sign::Positive, words_from_u64le(limbs))
    }

    /// Creates a non-negative integer from 64-bit limbs in big-endian
    /// order (most significant limb first, as the value would be written
    /// in hexadecimal).
    pub fn from_w64be(limbs: &[u64]) -> Self {
        let mut le = limbs.to_vec();
        le.reverse();
        Self::from_w64le(&le)
    }

    /// Decodes a non-negative integer from unsigned big-endian bytes. An
    /// empty slice decodes to zero.
    pub fn from_bytes_be(b: &[u8]) -> Self {
        let n = (b.len() + WORD_BYTES - 1) / WORD_BYTES;
        let mut reg = vec![0 as Word; n];
        for (i, &v) in b.iter().rev().enumerate() {
            reg[i / WORD_BYTES] |= (v as Word) << (8 * (i % WORD_BYTES));
        }
        Self::from_mag(Sign::Positive, reg)
    }

    /// Parses a hexadecimal string, with an optional leading minus sign
    /// and an optional `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        let (sign, s) = match s.strip_prefix('-') {
            Some(r) => (Sign::Negative, r),
            None => (Sign::Positive, s),
        };
        let s = s.strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if s.is_empty() {
            return Err(Error::Decoding("empty hexadecimal string"));
        }
        let mut reg = vec![0 as Word; (4 * s.len() + WORD_BITS - 1) / WORD_BITS];
        for (i, c) in s.bytes().rev().enumerate() {
            let d = match c {
                b'0'..=b'9' => c - b'0',
                b'a'..=b'f' => c - (b'a' - 10),
                b'A'..=b'F' => c - (b'A' - 10),
                _ => return Err(Error::Decoding("invalid hexadecimal digit")),
            };
            reg[(4 * i) / WORD_BITS] |= (d as Word) << ((4 * i) % WORD_BITS);
        }
        Ok(Self::from_mag(sign, reg))
    }

    // Builds a value from a sign and a magnitude, normalizing the
    // capacity and the sign of zero.
    pub(crate) fn from_mag(sign: Sign, mut reg: Vec<Word>) -> Self {
        let sw = sig_words(&reg);
        reg.resize(round_up8(sw), 0);
        let sign = if sw == 0 { Sign::Positive } else { sign };
        Self { sign, reg }
    }

    /// Gets the number of significant words in the magnitude.
    pub fn sig_words(&self) -> usize {
        sig_words(&self.reg)
    }

    /// Gets the significant words of the magnitude (least significant
    /// first).
    pub fn words(&self) -> &[Word] {
        &self.reg[..self.sig_words()]
    }

    /// Gets word `i` of the magnitude (zero beyond the capacity).
    pub fn word_at(&self, i: usize) -> Word {
        if i < self.reg.len() { self.reg[i] } else { 0 }
    }

    /// Gets the low 64 bits of the magnitude.
    pub fn to_u64(&self) -> u64 {
        let mut r = 0u64;
        for i in 0..(64 / WORD_BITS) {
            r |= (self.word_at(i) as u64) << (i * WORD_BITS);
        }
        r
    }

    /// Copies the magnitude into exactly `n` words. Caller guarantees
    /// that it fits.
    pub(crate) fn to_words_padded(&self, n: usize) -> Vec<Word> {
        let sw = self.sig_words();
        assert!(sw <= n);
        let mut d = vec![0 as Word; n];
        d[..sw].copy_from_slice(&self.reg[..sw]);
        d
    }

    /// Gets the bit length of the magnitude (0 for zero).
    pub fn bits(&self) -> usize {
        let sw = self.sig_words();
        if sw == 0 {
            return 0;
        }
        sw * WORD_BITS - (self.reg[sw - 1].leading_zeros() as usize)
    }

    /// Gets the byte length of the magnitude (0 for zero).
    pub fn bytes(&self) -> usize {
        (self.bits() + 7) >> 3
    }

    /// Gets bit `i` of the magnitude.
    pub fn get_bit(&self, i: usize) -> bool {
        ((self.word_at(i / WORD_BITS) >> (i % WORD_BITS)) & 1) != 0
    }

    pub fn sign(&self) -> Sign {
        self.sign
    }

    pub fn is_zero(&self) -> bool {
        self.reg.iter().all(|&w| w == 0)
    }

    pub fn is_negative(&self) -> bool {
        self.sign == Sign::Negative
    }

    pub fn is_odd(&self) -> bool {
        (self.word_at(0) & 1) != 0
    }

    pub fn is_even(&self) -> bool {
        !self.is_odd()
    }

    /// Returns the absolute value.
    pub fn abs(&self) -> Self {
        Self { sign: Sign::Positive, reg: self.reg.clone() }
    }

    /// Compares the magnitudes of `self` and `rhs`.
    pub fn cmp_abs(&self, rhs: &Self) -> Ordering {
        cmp_vartime(&self.reg, &rhs.reg).cmp(&0)
    }

    /// Encodes the magnitude in unsigned big-endian, over the minimal
    /// number of bytes (zero yields an empty vector).
    pub fn to_bytes_be(&self) -> Vec<u8> {
        let len = self.bytes();
        let mut d = vec![0u8; len];
        for i in 0..len {
            d[len - 1 - i] = (self.reg[i / WORD_BYTES] >> (8 * (i % WORD_BYTES))) as u8;
        }
        d
    }

    /// Encodes the magnitude in unsigned big-endian over exactly `len`
    /// bytes (with leading zeros as needed). An error is returned if the
    /// value does not fit.
    pub fn encode_padded(&self, len: usize) -> Result<Vec<u8>> {
        let blen = self.bytes();
        if blen > len {
            return Err(Error::InvalidArgument("value too large for encoding length"));
        }
        let mut d = vec![0u8; len];
        d[(len - blen)..].copy_from_slice(&self.to_bytes_be());
        Ok(d)
    }

    // self + (rhs with sign rs)
    fn add_signed(&self, rhs: &Self, rs: Sign) -> Self {
        if self.sign == rs {
            let (x, y) = if self.reg.len() >= rhs.reg.len() {
                (&self.reg, &rhs.reg)
            } else {
                (&rhs.reg, &self.reg)
            };
            let n = x.len();
            let mut z = vec![0 as Word; n + 1];
            let cc = add3(&mut z[..n], x, y);
            z[n] = cc as Word;
            return Self::from_mag(self.sign, z);
        }
        let (x, y, sign) = match self.cmp_abs(rhs) {
            Ordering::Less => (&rhs.reg, &self.reg, rs),
            _ => (&self.reg, &rhs.reg, self.sign),
        };
        let mut z = vec![0 as Word; x.len()];
        sub3(&mut z, x, y);
        Self::from_mag(sign, z)
    }

    fn mul_impl(&self, rhs: &Self) -> Self {
        let xs = self.sig_words();
        let ys = rhs.sig_words();
        if xs == 0 || ys == 0 {
            return Self::zero();
        }
        let mut z = vec![0 as Word; self.reg.len() + rhs.reg.len()];
        let mut ws = if xs >= KARATSUBA_MUL_THRESHOLD && ys >= KARATSUBA_MUL_THRESHOLD {
            vec![0 as Word; workspace_len(self.reg.len(), rhs.reg.len())]
        } else {
            Vec::new()
        };
        mul_core(&mut z, &self.reg, xs, &rhs.reg, ys, &mut ws);
        let sign = if self.sign == rhs.sign { Sign::Positive } else { Sign::Negative };
        Self::from_mag(sign, z)
    }

    /// Returns the square of this value.
    pub fn square(&self) -> Self {
        let xs = self.sig_words();
        if xs == 0 {
            return Self::zero();
        }
        let mut z = vec![0 as Word; 2 * self.reg.len()];
        let mut ws = if xs >= KARATSUBA_SQR_THRESHOLD {
            vec![0 as Word; workspace_len(self.reg.len(), self.reg.len())]
        } else {
            Vec::new()
        };
        sqr_core(&mut z, &self.reg, xs, &mut ws);
        Self::from_mag(Sign::Positive, z)
    }

    /// Multiplies this value by a single word.
    pub fn mul_word(&self, w: Word) -> Self {
        let sw = self.sig_words();
        let mut z = vec![0 as Word; sw + 1];
        linmul3(&mut z, &self.reg[..sw], w);
        Self::from_mag(self.sign, z)
    }

    /// Divides by `d`, returning `(quotient, remainder)`.
    ///
    /// The quotient is truncated toward zero; the remainder has the sign
    /// of the dividend (or is zero). A zero divisor is reported as an
    /// `InvalidArgument` error. This function is NOT constant-time.
    pub fn divrem_vartime(&self, d: &Self) -> Result<(Self, Self)> {
        if d.is_zero() {
            return Err(Error::InvalidArgument("division by zero"));
        }
        let (q, r) = divrem_words_vartime(&self.reg, &d.reg);
        let qs = if self.sign == d.sign { Sign::Positive } else { Sign::Negative };
        Ok((Self::from_mag(qs, q), Self::from_mag(self.sign, r)))
    }

    /// Returns the residue of this value modulo `|m|`, in `[0, |m|)`.
    /// This function is NOT constant-time.
    pub fn rem_euclid_vartime(&self, m: &Self) -> Result<Self> {
        let (_, r) = self.divrem_vartime(m)?;
        if r.is_negative() {
            Ok(r.add_signed(m, Sign::Positive))
        } else {
            Ok(r)
        }
    }

    /// Returns a uniformly random integer in `[0, bound)`. The bound must
    /// be positive. Rejection sampling is used: execution time depends
    /// on the number of rejected candidates, not on the returned value.
    pub fn random_below<T: CryptoRng + RngCore>(rng: &mut T, bound: &Self)
        -> Result<Self>
    {
        if bound.is_negative() || bound.is_zero() {
            return Err(Error::InvalidArgument("random bound must be positive"));
        }
        let nbits = bound.bits();
        let nbytes = (nbits + 7) >> 3;
        let mut buf = vec![0u8; nbytes];
        loop {
            rng.fill_bytes(&mut buf);
            buf[0] &= 0xFFu8 >> (8 * nbytes - nbits);
            let r = Self::from_bytes_be(&buf);
            if r.cmp_abs(bound) == Ordering::Less {
                return Ok(r);
            }
        }
    }

    fn shl_impl(&self, k: usize) -> Self {
        let ws = k / WORD_BITS;
        let bs = k % WORD_BITS;
        let n = self.sig_words();
        if n == 0 {
            return Self::zero();
        }
        let mut z = vec![0 as Word; n + ws + 1];
        for i in 0..n {
            z[i + ws] |= self.reg[i] << bs;
            if bs != 0 {
                z[i + ws + 1] |= self.reg[i] >> (WORD_BITS - bs);
            }
        }
        Self::from_mag(self.sign, z)
    }

    // Shifts the magnitude right (the result is truncated toward zero).
    fn shr_impl(&self, k: usize) -> Self {
        let ws = k / WORD_BITS;
        let bs = k % WORD_BITS;
        let n = self.sig_words();
        if ws >= n {
            return Self::zero();
        }
        let mut z = vec![0 as Word; n - ws];
        for i in 0..(n - ws) {
            z[i] = self.reg[i + ws] >> bs;
            if bs != 0 && i + ws + 1 < n {
                z[i] |= self.reg[i + ws + 1] << (WORD_BITS - bs);
            }
        }
        Self::from_mag(self.sign, z)
    }

    fn fmt_hex(&self, f: &mut fmt::Formatter<'_>, upper: bool) -> fmt::Result {
        if self.is_negative() {
            f.write_str("-")?;
        }
        if f.alternate() {
            f.write_str("0x")?;
        }
        let sw = self.sig_words();
        if sw == 0 {
            return f.write_str("0");
        }
        let width = WORD_BYTES * 2;
        if upper {
            write!(f, "{:X}", self.reg[sw - 1])?;
            for i in (0..(sw - 1)).rev() {
                write!(f, "{:0w$X}", self.reg[i], w = width)?;
            }
        } else {
            write!(f, "{:x}", self.reg[sw - 1])?;
            for i in (0..(sw - 1)).rev() {
                write!(f, "{:0w$x}", self.reg[i], w = width)?;
            }
        }
        Ok(())
    }
}

// Largest power of 10 that fits in a word, and its exponent.
const DEC_CHUNK: (Word, usize) = if WORD_BITS == 64 {
    (10_000_000_000_000_000_000u64 as Word, 19)
} else {
    (1_000_000_000, 9)
};

impl fmt::Display for BigInt {

    /// Formats the value in decimal. This is NOT constant-time.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut mag = self.words().to_vec();
        if mag.is_empty() {
            return f.write_str("0");
        }
        let mut chunks = Vec::new();
        while !mag.is_empty() {
            let (q, r) = divrem_word_vartime(&mag, DEC_CHUNK.0);
            chunks.push(r);
            mag = q;
            mag.truncate(sig_words(&mag));
        }
        if self.is_negative() {
            f.write_str("-")?;
        }
        let last = chunks.len() - 1;
        write!(f, "{}", chunks[last])?;
        for i in (0..last).rev() {
            write!(f, "{:0w$}", chunks[i], w = DEC_CHUNK.1)?;
        }
        Ok(())
    }
}

impl fmt::Debug for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BigInt(")?;
        self.fmt_hex(f, false)?;
        f.write_str(")")
    }
}

impl fmt::LowerHex for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_hex(f, false)
    }
}

impl fmt::UpperHex for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_hex(f, true)
    }
}

impl Default for BigInt {
    fn default() -> Self {
        Self::zero()
    }
}

impl Ord for BigInt {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_negative(), other.is_negative()) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => self.cmp_abs(other),
            (true, true) => other.cmp_abs(self),
        }
    }
}

impl PartialOrd for BigInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for BigInt {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BigInt { }

impl From<u64> for BigInt {
    fn from(v: u64) -> Self {
        Self::from_u64(v)
    }
}

impl From<u32> for BigInt {
    fn from(v: u32) -> Self {
        Self::from_u64(v as u64)
    }
}

impl From<i64> for BigInt {
    fn from(v: i64) -> Self {
        Self::from_i64(v)
    }
}

impl From<i32> for BigInt {
    fn from(v: i32) -> Self {
        Self::from_i64(v as i64)
    }
}

macro_rules! bigint_binop {
    ($tr:ident, $f:ident, $tra:ident, $fa:ident, |$a:ident, $b:ident| $e:expr) => {
        impl $tr<BigInt> for BigInt {
            type Output = BigInt;

            #[inline(always)]
            fn $f(self, other: BigInt) -> BigInt {
                let ($a, $b) = (&self, &other);
                $e
            }
        }

        impl $tr<&BigInt> for BigInt {
            type Output = BigInt;

            #[inline(always)]
            fn $f(self, other: &BigInt) -> BigInt {
                let ($a, $b) = (&self, other);
                $e
            }
        }

        impl $tr<BigInt> for &BigInt {
            type Output = BigInt;

            #[inline(always)]
            fn $f(self, other: BigInt) -> BigInt {
                let ($a, $b) = (self, &other);
                $e
            }
        }

        impl $tr<&BigInt> for &BigInt {
            type Output = BigInt;

            #[inline(always)]
            fn $f(self, other: &BigInt) -> BigInt {
                let ($a, $b) = (self, other);
                $e
            }
        }

        impl $tra<BigInt> for BigInt {
            #[inline(always)]
            fn $fa(&mut self, other: BigInt) {
                let r = {
                    let ($a, $b) = (&*self, &other);
                    $e
                };
                *self = r;
            }
        }

        impl $tra<&BigInt> for BigInt {
            #[inline(always)]
            fn $fa(&mut self, other: &BigInt) {
                let r = {
                    let ($a, $b) = (&*self, other);
                    $e
                };
                *self = r;
            }
        }
    };
}

bigint_binop!(Add, add, AddAssign, add_assign, |a, b| a.add_signed(b, b.sign));
bigint_binop!(Sub, sub, SubAssign, sub_assign, |a, b| a.add_signed(b, b.sign.flip()));
bigint_binop!(Mul, mul, MulAssign, mul_assign, |a, b| a.mul_impl(b));

// Division and remainder operators panic on a zero divisor; use
// divrem_vartime() for a fallible version.
bigint_binop!(Div, div, DivAssign, div_assign, |a, b| {
    match a.divrem_vartime(b) {
        Ok((q, _)) => q,
        Err(e) => panic!("{}", e),
    }
});
bigint_binop!(Rem, rem, RemAssign, rem_assign, |a, b| {
    match a.divrem_vartime(b) {
        Ok((_, r)) => r,
        Err(e) => panic!("{}", e),
    }
});

impl Neg for BigInt {
    type Output = BigInt;

    #[inline(always)]
    fn neg(self) -> BigInt {
        -&self
    }
}

impl Neg for &BigInt {
    type Output = BigInt;

    #[inline(always)]
    fn neg(self) -> BigInt {
        BigInt::from_mag(self.sign.flip(), self.reg.clone())
    }
}

impl Shl<usize> for BigInt {
    type Output = BigInt;

    #[inline(always)]
    fn shl(self, k: usize) -> BigInt {
        self.shl_impl(k)
    }
}

impl Shl<usize> for &BigInt {
    type Output = BigInt;

    #[inline(always)]
    fn shl(self, k: usize) -> BigInt {
        self.shl_impl(k)
    }
}

impl ShlAssign<usize> for BigInt {
    #[inline(always)]
    fn shl_assign(&mut self, k: usize) {
        *self = self.shl_impl(k);
    }
}

impl Shr<usize> for BigInt {
    type Output = BigInt;

    #[inline(always)]
    fn shr(self, k: usize) -> BigInt {
        self.shr_impl(k)
    }
}

impl Shr<usize> for &BigInt {
    type Output = BigInt;

    #[inline(always)]
    fn shr(self, k: usize) -> BigInt {
        self.shr_impl(k)
    }
}

impl ShrAssign<usize> for BigInt {
    #[inline(always)]
    fn shr_assign(&mut self, k: usize) {
        *self = self.shr_impl(k);
    }
}
