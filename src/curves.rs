//! Standard named curves.
//!
//! Each call builds a fresh set of parameters; all field elements of one
//! curve (coefficients and generator coordinates) share a single modulus
//! descriptor, whose Montgomery constants are computed upfront.

use crate::bigint::BigInt;
use crate::curve::CurveGFp;
use crate::gfp::PrimeModulus;
use crate::point::PointGFp;
use crate::Result;

/// Parameters of a named curve: the curve itself, a conventional
/// generator, and the (prime) order of that generator.
#[derive(Clone, Debug)]
pub struct NamedCurve {
    pub name: &'static str,
    pub curve: CurveGFp,
    pub generator: PointGFp,
    pub order: BigInt,
}

impl NamedCurve {

    fn build(name: &'static str, p: &[u64], a: &[u64], b: &[u64],
        gx: &[u64], gy: &[u64], n: &[u64]) -> Result<Self>
    {
        let m = PrimeModulus::shared(&BigInt::from_w64be(p))?;
        let curve = CurveGFp::new_shared(&BigInt::from_w64be(a), &BigInt::from_w64be(b), &m);
        let generator = PointGFp::from_affine(&curve,
            &BigInt::from_w64be(gx), &BigInt::from_w64be(gy));
        generator.check_invariants()?;
        tracing::debug!(name, "named curve parameters");
        Ok(Self { name, curve, generator, order: BigInt::from_w64be(n) })
    }

    /// Returns the order of the generator multiplied by the cofactor
    /// (here, 1), i.e. a multiple of the order of every curve point,
    /// suitable for `PointGFp::mult_this_secure()`.
    pub fn order_multiple(&self) -> &BigInt {
        &self.order
    }
}

/// NIST P-256 (secp256r1).
pub fn secp256r1() -> Result<NamedCurve> {
    NamedCurve::build("secp256r1",
        &[0xFFFFFFFF00000001, 0x0000000000000000,
          0x00000000FFFFFFFF, 0xFFFFFFFFFFFFFFFF],
        &[0xFFFFFFFF00000001, 0x0000000000000000,
          0x00000000FFFFFFFF, 0xFFFFFFFFFFFFFFFC],
        &[0x5AC635D8AA3A93E7, 0xB3EBBD55769886BC,
          0x651D06B0CC53B0F6, 0x3BCE3C3E27D2604B],
        &[0x6B17D1F2E12C4247, 0xF8BCE6E563A440F2,
          0x77037D812DEB33A0, 0xF4A13945D898C296],
        &[0x4FE342E2FE1A7F9B, 0x8EE7EB4A7C0F9E16,
          0x2BCE33576B315ECE, 0xCBB6406837BF51F5],
        &[0xFFFFFFFF00000000, 0xFFFFFFFFFFFFFFFF,
          0xBCE6FAADA7179E84, 0xF3B9CAC2FC632551])
}

/// secp256k1.
pub fn secp256k1() -> Result<NamedCurve> {
    NamedCurve::build("secp256k1",
        &[0xFFFFFFFFFFFFFFFF, 0xFFFFFFFFFFFFFFFF,
          0xFFFFFFFFFFFFFFFF, 0xFFFFFFFEFFFFFC2F],
        &[0],
        &[7],
        &[0x79BE667EF9DCBBAC, 0x55A06295CE870B07,
          0x029BFCDB2DCE28D9, 0x59F2815B16F81798],
        &[0x483ADA7726A3C465, 0x5DA4FBFC0E1108A8,
          0xFD17B448A6855419, 0x9C47D08FFB10D4B8],
        &[0xFFFFFFFFFFFFFFFF, 0xFFFFFFFFFFFFFFFE,
          0xBAAEDCE6AF48A03B, 0xBFD25E8CD0364141])
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::point::PointFormat;
    use alloc::sync::Arc;
    use crate::Vec;
    use sha2::{Sha256, Digest};

    fn scalar(seed: u64, order: &BigInt) -> BigInt {
        let mut sh = Sha256::new();
        sh.update(seed.to_le_bytes());
        BigInt::from_bytes_be(&sh.finalize()) % order
    }

    fn group_laws(nc: &NamedCurve) {
        let g = &nc.generator;
        let n = &nc.order;
        assert!(g.mul_vartime(n).is_zero());
        assert!(g.mult_this_secure(&BigInt::zero(), n, n).unwrap().is_zero());

        for i in 0..4 {
            let k1 = scalar(2 * i, n);
            let k2 = scalar(2 * i + 1, n);
            let p = g.mul_vartime(&k1);
            let q = g.mul_vartime(&k2);
            p.check_invariants().unwrap();
            assert!((&p + &(-&p)).is_zero());
            assert!((&p + &q).equals(&(&q + &p)));
            assert!((&p + &q).equals(&g.mul_vartime(&(&k1 + &k2))));
            assert!((&p - &q).equals(&g.mul_vartime(&(&k1 - &k2))));
            let mut d = p.clone();
            d.mult2_in_place();
            assert!(d.equals(&(&p + &p)));
            assert!(d.equals(&g.mul_vartime(&(&k1 << 1usize))));

            let s = g.mult_this_secure(&k1, n, n).unwrap();
            assert!(s.equals(&p));
            let s = q.mult_this_secure(&k1, nc.order_multiple(), n).unwrap();
            assert!(s.equals(&p.mul_vartime(&k2)));

            for fmt in [PointFormat::Uncompressed, PointFormat::Compressed, PointFormat::Hybrid] {
                let buf = p.encode(fmt).unwrap();
                let r = PointGFp::decode(&buf, &nc.curve).unwrap();
                assert!(r.equals(&p));
                assert_eq!(r.get_affine_x().unwrap(), p.get_affine_x().unwrap());
                assert_eq!(r.get_affine_y().unwrap(), p.get_affine_y().unwrap());
            }
        }
    }

    #[test]
    fn p256() {
        let nc = secp256r1().unwrap();
        assert_eq!(nc.name, "secp256r1");
        group_laws(&nc);

        // 2*G, known answer.
        let g2 = nc.generator.mul_vartime(&BigInt::from_u64(2));
        assert_eq!(g2.get_affine_x().unwrap(), BigInt::from_hex(
            "7cf27b188d034f7e8a52380304b51ac3c08969e277f21b35a60b48fc47669978").unwrap());
        assert_eq!(g2.get_affine_y().unwrap(), BigInt::from_hex(
            "07775510db8ed040293d9ac69f7430dbba7dade63ce982299e04b79d227873d1").unwrap());

        let buf = nc.generator.encode(PointFormat::Compressed).unwrap();
        assert_eq!(hex::encode(&buf),
            "036b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296");
    }

    #[test]
    fn k256() {
        let nc = secp256k1().unwrap();
        group_laws(&nc);
        let buf = nc.generator.encode(PointFormat::Compressed).unwrap();
        assert_eq!(hex::encode(&buf),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798");
    }

    #[cfg(feature = "std")]
    #[test]
    fn secure_schedule_p256() {
        use crate::gfp::opcount;

        let nc = secp256r1().unwrap();
        let n = &nc.order;
        let g = &nc.generator;
        let mut counts = Vec::new();
        for k in [BigInt::one(), n - BigInt::one(), BigInt::zero()] {
            let before = opcount::muls();
            let r = g.mult_this_secure(&k, n, &(n - BigInt::one())).unwrap();
            counts.push(opcount::muls() - before);
            assert!(r.equals(&g.mul_vartime(&k)));
        }
        assert_eq!(counts[0], counts[1]);
        assert_eq!(counts[0], counts[2]);
    }

    #[test]
    fn shared_descriptor() {
        let nc = secp256k1().unwrap();
        let m = nc.curve.get_shared_modulus();
        assert!(Arc::ptr_eq(&m, nc.curve.get_a().modulus()));
        assert!(Arc::ptr_eq(&m, nc.generator.get_jac_proj_x().modulus()));
        assert!(m.has_derived_constants());
        assert!(nc.curve != secp256r1().unwrap().curve);
    }
}
