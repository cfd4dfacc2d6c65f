// Long division on magnitudes (schoolbook, Knuth's algorithm D).
//
// These functions are NOT constant-time: quotient digit estimation and
// correction loops depend on the operand values. They are used for
// reductions modulo public values (moduli, curve orders) and for
// conversions between representations.

use crate::backend::{Word, DWord, WORD_BITS, WORD_MAX};
use crate::backend::{addcarry, subborrow, umull_add, divword_vartime};
use crate::mp::{cmp_vartime, sig_words};
use crate::Vec;

// Divide a by the single non-zero word d; returns (quotient, remainder).
// The quotient has the same length as the significant part of a.
pub(crate) fn divrem_word_vartime(a: &[Word], d: Word) -> (Vec<Word>, Word) {
    debug_assert!(d != 0);
    let m = sig_words(a);
    let mut q = vec![0; m];
    let mut r: Word = 0;
    for i in (0..m).rev() {
        let qw = divword_vartime(r, a[i], d);
        let num = ((r as DWord) << WORD_BITS) | (a[i] as DWord);
        r = (num - (qw as DWord) * (d as DWord)) as Word;
        q[i] = qw;
    }
    (q, r)
}

// Divide a by b (b must be non-zero); returns (quotient, remainder).
pub(crate) fn divrem_words_vartime(a: &[Word], b: &[Word]) -> (Vec<Word>, Vec<Word>) {
    let n = sig_words(b);
    assert!(n > 0, "division by zero");
    let m = sig_words(a);
    if m < n || cmp_vartime(&a[..m], &b[..n]) < 0 {
        return (Vec::new(), a[..m].to_vec());
    }
    if n == 1 {
        let (q, r) = divrem_word_vartime(&a[..m], b[0]);
        return (q, vec![r]);
    }

    // Normalize so that the top bit of the divisor is set.
    let s = b[n - 1].leading_zeros() as usize;
    let mut bn = vec![0; n];
    shl_small(&mut bn, &b[..n], s);
    let mut an = vec![0; m + 1];
    shl_small(&mut an, &a[..m], s);

    let d1 = bn[n - 1];
    let d2 = bn[n - 2];
    let mut q = vec![0; m - n + 1];
    for j in (0..=(m - n)).rev() {
        let hi = an[j + n];
        let lo = an[j + n - 1];
        let num = ((hi as DWord) << WORD_BITS) | (lo as DWord);

        // Estimate the quotient word from the top two words of the
        // current remainder, then correct it with the second divisor
        // word; the estimate is then off by at most one.
        let mut qhat: DWord = if hi >= d1 {
            WORD_MAX as DWord
        } else {
            divword_vartime(hi, lo, d1) as DWord
        };
        let mut rhat = num - qhat * (d1 as DWord);
        while rhat <= (WORD_MAX as DWord)
            && qhat * (d2 as DWord) > ((rhat << WORD_BITS) | (an[j + n - 2] as DWord))
        {
            qhat -= 1;
            rhat += d1 as DWord;
        }

        // an[j..j+n+1] -= qhat*bn
        let mut qw = qhat as Word;
        let mut carry: Word = 0;
        let mut cc = 0;
        for i in 0..n {
            let (plo, phi) = umull_add(bn[i], qw, carry);
            carry = phi;
            (an[j + i], cc) = subborrow(an[j + i], plo, cc);
        }
        (an[j + n], cc) = subborrow(an[j + n], carry, cc);

        // Overshoot: add the divisor back.
        if cc != 0 {
            qw = qw.wrapping_sub(1);
            let mut c = 0;
            for i in 0..n {
                (an[j + i], c) = addcarry(an[j + i], bn[i], c);
            }
            an[j + n] = an[j + n].wrapping_add(c as Word);
        }
        q[j] = qw;
    }

    let mut r = vec![0; n];
    shr_small(&mut r, &an[..(n + 1)], s);
    (q, r)
}

// d <- x << s, for 0 <= s < WORD_BITS; d must be at least as long as x.
// If d is longer than x, the bits shifted out of the top word of x go to
// d[x.len()].
fn shl_small(d: &mut [Word], x: &[Word], s: usize) {
    if s == 0 {
        d[..x.len()].copy_from_slice(x);
        return;
    }
    let mut prev: Word = 0;
    for i in 0..x.len() {
        d[i] = (x[i] << s) | prev;
        prev = x[i] >> (WORD_BITS - s);
    }
    if d.len() > x.len() {
        d[x.len()] = prev;
    }
}

// d <- x >> s (truncated to the length of d), for 0 <= s < WORD_BITS.
fn shr_small(d: &mut [Word], x: &[Word], s: usize) {
    for i in 0..d.len() {
        let mut w = x[i] >> s;
        if s != 0 && i + 1 < x.len() {
            w |= x[i + 1] << (WORD_BITS - s);
        }
        d[i] = w;
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::backend::WORD_BYTES;
    use num_bigint::BigUint;
    use sha2::{Sha512, Digest};

    fn to_big(x: &[Word]) -> BigUint {
        let mut b = Vec::with_capacity(x.len() * WORD_BYTES);
        for &w in x {
            b.extend_from_slice(&w.to_le_bytes());
        }
        BigUint::from_bytes_le(&b)
    }

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
        d
    }

    fn check(a: &[Word], b: &[Word]) {
        let (q, r) = divrem_words_vartime(a, b);
        let (ab, bb) = (to_big(a), to_big(b));
        assert_eq!(to_big(&q), &ab / &bb);
        assert_eq!(to_big(&r), &ab % &bb);
    }

    #[test]
    fn random_sizes() {
        let mut seed = 0;
        for &m in [1usize, 2, 3, 5, 8, 9, 17].iter() {
            for &n in [1usize, 2, 3, 4, 8].iter() {
                for _ in 0..10 {
                    let a = mkrndw(seed, m);
                    let mut b = mkrndw(seed + 1, n);
                    seed += 2;
                    if sig_words(&b) == 0 {
                        b[0] = 1;
                    }
                    check(&a, &b);
                    // Divisor with a small top word: maximal normalization
                    // shift.
                    b[n - 1] = 1;
                    check(&a, &b);
                }
            }
        }
    }

    #[test]
    fn edge_cases() {
        // Quotient digit estimates equal to the word maximum, and the
        // add-back correction.
        let a = [0, 0, WORD_MAX, WORD_MAX - 1];
        let b = [WORD_MAX, WORD_MAX];
        check(&a, &b);
        let a = [WORD_MAX, 0, 0, (1 as Word) << (WORD_BITS - 1)];
        let b = [1, 0, (1 as Word) << (WORD_BITS - 1)];
        check(&a, &b);
        let a = [0, 0, 0, (1 as Word) << (WORD_BITS - 1)];
        let b = [1, 0, (1 as Word) << (WORD_BITS - 1)];
        check(&a, &b);
        check(&[5, 0, 0], &[7, 0]);
        check(&[7, 0], &[7]);
        check(&[0, 0], &[3]);
        check(&[WORD_MAX; 6], &[WORD_MAX; 3]);

        let (q, r) = divrem_word_vartime(&[WORD_MAX, WORD_MAX], WORD_MAX);
        assert_eq!(q, [1, 1]);
        assert_eq!(r, 0);
    }
}
