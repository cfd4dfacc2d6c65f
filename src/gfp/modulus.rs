use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt;
use once_cell::race::OnceBox;

use crate::backend::Word;
use crate::bigint::{BigInt, divrem_words_vartime};
use crate::mp::monty::ninv;
use crate::{Error, Result, Vec};

/// A shared reference to a prime modulus descriptor.
pub type ModulusHandle = Arc<PrimeModulus>;

/// Descriptor of a prime modulus `p`.
///
/// The descriptor holds `p` and, once computed, the Montgomery constants
/// for `R = 2^(w*n)` where `n` is the length of `p` in words:
///
///  - `p' = -1/p mod 2^w`
///  - `R mod p` (the Montgomery representation of 1)
///  - `R^2 mod p` (used to convert values into Montgomery representation)
///
/// These constants are computed at most once, on first use (or eagerly
/// with `compute_derived_constants()`), and never change afterwards. The
/// computation is lock-free; if two threads race on the first use, both
/// compute the same values and only one copy is kept. A descriptor can
/// thus be shared through a `ModulusHandle` among any number of field
/// elements, including across threads.
pub struct PrimeModulus {
    p: BigInt,
    pw: Vec<Word>,
    monty: OnceBox<MontyParams>,
}

#[derive(Clone, Debug)]
pub(crate) struct MontyParams {
    pub(crate) p_dash: Word,
    pub(crate) r: Vec<Word>,
    pub(crate) r2: Vec<Word>,
}

impl MontyParams {

    fn compute(pw: &[Word]) -> Self {
        let n = pw.len();
        let mut t = vec![0 as Word; 2 * n + 1];
        t[n] = 1;
        let r = reduce_padded(&t[..(n + 1)], pw);
        t[n] = 0;
        t[2 * n] = 1;
        let r2 = reduce_padded(&t, pw);
        tracing::debug!(words = n, "computed Montgomery constants");
        Self { p_dash: ninv(pw[0]), r, r2 }
    }
}

// x mod p, over exactly p.len() words. NOT constant-time.
fn reduce_padded(x: &[Word], pw: &[Word]) -> Vec<Word> {
    let (_, mut r) = divrem_words_vartime(x, pw);
    r.resize(pw.len(), 0);
    r
}

impl PrimeModulus {

    /// Creates a descriptor for modulus `p`.
    ///
    /// `p` must be odd and greater than 2. Primality is not verified
    /// here; operations that rely on it (inversion, square roots) detect
    /// inconsistent results and report them.
    pub fn new(p: &BigInt) -> Result<Self> {
        if p.is_negative() || p.is_even() || p.bits() < 2 {
            return Err(Error::InvalidArgument("modulus must be odd and greater than 2"));
        }
        let pw = p.words().to_vec();
        tracing::debug!(bits = p.bits(), words = pw.len(), "new prime modulus");
        Ok(Self { p: p.clone(), pw, monty: OnceBox::new() })
    }

    /// Creates a shareable descriptor for modulus `p`.
    pub fn shared(p: &BigInt) -> Result<ModulusHandle> {
        Ok(Arc::new(Self::new(p)?))
    }

    /// Gets the modulus.
    pub fn p(&self) -> &BigInt {
        &self.p
    }

    /// Gets the modulus length, in words.
    pub fn word_len(&self) -> usize {
        self.pw.len()
    }

    /// Gets the modulus length, in bits.
    pub fn bits(&self) -> usize {
        self.p.bits()
    }

    /// Gets the length, in bytes, of encoded field elements.
    pub fn byte_len(&self) -> usize {
        self.p.bytes()
    }

    pub(crate) fn words(&self) -> &[Word] {
        &self.pw
    }

    /// Computes the Montgomery constants now, if not already done.
    pub fn compute_derived_constants(&self) {
        self.monty();
    }

    /// Returns `true` if the Montgomery constants have been computed.
    pub fn has_derived_constants(&self) -> bool {
        self.monty.get().is_some()
    }

    pub(crate) fn monty(&self) -> &MontyParams {
        self.monty.get_or_init(|| Box::new(MontyParams::compute(&self.pw)))
    }

    /// Gets `-1/p mod 2^w`.
    pub fn get_p_dash(&self) -> Word {
        self.monty().p_dash
    }

    /// Gets `R mod p`.
    pub fn get_r(&self) -> BigInt {
        BigInt::from_words(&self.monty().r)
    }

    /// Gets `R^2 mod p`.
    pub fn get_r2(&self) -> BigInt {
        BigInt::from_words(&self.monty().r2)
    }
}

impl Clone for PrimeModulus {
    fn clone(&self) -> Self {
        let monty = OnceBox::new();
        if let Some(mp) = self.monty.get() {
            let _ = monty.set(Box::new(mp.clone()));
        }
        Self { p: self.p.clone(), pw: self.pw.clone(), monty }
    }
}

impl PartialEq for PrimeModulus {
    fn eq(&self, other: &Self) -> bool {
        self.p == other.p
    }
}

impl Eq for PrimeModulus { }

impl fmt::Debug for PrimeModulus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimeModulus")
            .field("p", &self.p)
            .field("derived", &self.has_derived_constants())
            .finish()
    }
}
