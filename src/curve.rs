//! Scalar and curve-point types fixed to secp256k1.
//!
//! [`Scalar`] is a thin wrapper around an arbitrary-precision integer
//! that is always kept reduced modulo the secp256k1 group order `q`;
//! the generic arithmetic in [`crate::field`] does the actual work.
//! [`CurvePoint`] wraps `ark_secp256k1`'s projective group element so
//! callers get cheap point addition, with affine conversion only at
//! the boundaries (equality, encoding) where it is actually needed --
//! the same discipline the rest of the `ark_ec` ecosystem uses.

use core::ops::{Add, Mul, Sub};

use ark_ec::{CurveGroup, Group};
use ark_ff::{BigInteger, Field, PrimeField, UniformRand, Zero};
use ark_secp256k1::{Affine, Fq, Fr, Projective};
use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::error::{CoreError, CoreResult};
use crate::field;

/// The order of the secp256k1 elliptic curve group, i.e. `n` in most
/// references: `FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFE BAAEDCE6 AF48A03B
/// BFD25E8C D0364141`.
pub fn secp256k1_order() -> BigUint {
    BigUint::from_bytes_be(&[
        0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFE, 0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36,
        0x41, 0x41,
    ])
}

fn biguint_to_fr(v: &BigUint) -> Fr {
    Fr::from_le_bytes_mod_order(&v.to_bytes_le())
}

fn fr_to_biguint(v: &Fr) -> BigUint {
    BigUint::from_bytes_be(&v.into_bigint().to_bytes_be())
}

fn fq_to_biguint(v: &Fq) -> BigUint {
    BigUint::from_bytes_be(&v.into_bigint().to_bytes_be())
}

/// A scalar modulo the secp256k1 group order `q`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Scalar(BigUint);

impl Zeroize for Scalar {
    fn zeroize(&mut self) {
        // `BigUint` carries no `Zeroize` impl of its own (its backing
        // limb vector is private), so the best we can do is drop the
        // old value and replace it with a fresh zero allocation.
        self.0 = BigUint::default();
    }
}

impl Drop for Scalar {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl Scalar {
    /// The additive identity.
    pub fn zero() -> Self {
        Scalar(BigUint::default())
    }

    /// The multiplicative identity.
    pub fn one() -> Self {
        Scalar(BigUint::from(1u32))
    }

    /// Wrap a raw big integer, reducing it modulo `q` first.
    pub fn from_biguint(v: BigUint) -> Self {
        Scalar(v % secp256k1_order())
    }

    /// Construct a `Scalar` from a small integer, for ordinals and tests.
    pub fn from_u32(v: u32) -> Self {
        Scalar(BigUint::from(v))
    }

    /// Access the underlying big integer.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == BigUint::default()
    }

    /// Uniform random sampling in `[min, max)`.
    pub fn rand_in_range(min: &Scalar, max: &Scalar, rng: impl RngCore + CryptoRng) -> Self {
        Scalar(field::rand_scalar(&min.0, &max.0, rng))
    }

    /// A uniform random scalar in `[0, q)`, via `ark_ff`'s field sampler.
    pub fn random(mut rng: impl RngCore + CryptoRng) -> Self {
        Scalar(fr_to_biguint(&Fr::rand(&mut rng)))
    }

    pub fn inv(&self) -> CoreResult<Self> {
        field::mod_inv(&self.0, &secp256k1_order()).map(Scalar)
    }

    /// `self * generator`.
    pub fn mul_by_generator(&self) -> CurvePoint {
        CurvePoint(Projective::generator() * biguint_to_fr(&self.0))
    }

    /// The minimal big-endian byte representation of this scalar (0
    /// bytes for zero, up to 32 bytes otherwise).
    pub fn to_bytes_be(&self) -> Vec<u8> {
        let bytes = self.0.to_bytes_be();
        if bytes == [0u8] {
            Vec::new()
        } else {
            bytes
        }
    }

    pub fn from_bytes_be(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() > 32 {
            return Err(CoreError::WrongSize {
                expected: 32,
                actual: bytes.len(),
            });
        }
        Ok(Scalar::from_biguint(BigUint::from_bytes_be(bytes)))
    }
}

impl Add for &Scalar {
    type Output = Scalar;
    fn add(self, rhs: Self) -> Scalar {
        Scalar(field::mod_add(&self.0, &rhs.0, &secp256k1_order()))
    }
}

impl Sub for &Scalar {
    type Output = Scalar;
    fn sub(self, rhs: Self) -> Scalar {
        // `q` is always the (non-zero) secp256k1 order for `Scalar`, so
        // `mod_sub` cannot hit its `q == 0` error path here.
        Scalar(field::mod_sub(&self.0, &rhs.0, &secp256k1_order()).expect("q is never zero"))
    }
}

impl Mul for &Scalar {
    type Output = Scalar;
    fn mul(self, rhs: Self) -> Scalar {
        Scalar(field::mod_mul(&self.0, &rhs.0, &secp256k1_order()))
    }
}

/// A point on the secp256k1 curve, including the identity.
#[derive(Clone, Copy, Debug)]
pub struct CurvePoint(Projective);

impl CurvePoint {
    /// The point at infinity.
    pub fn identity() -> Self {
        CurvePoint(Projective::zero())
    }

    pub fn generator() -> Self {
        CurvePoint(Projective::generator())
    }

    /// Construct a point from raw affine coordinates, verifying that it
    /// satisfies the curve equation `y^2 = x^3 + 7`.
    pub fn from_xy(x: BigUint, y: BigUint) -> CoreResult<Self> {
        let fx = Fq::from_le_bytes_mod_order(&x.to_bytes_le());
        let fy = Fq::from_le_bytes_mod_order(&y.to_bytes_le());

        let lhs = fy * fy;
        let rhs = fx * fx * fx + Fq::from(7u64);
        if lhs != rhs {
            return Err(CoreError::NotOnCurve);
        }

        Ok(CurvePoint(Affine::new_unchecked(fx, fy).into()))
    }

    pub fn x(&self) -> BigUint {
        fq_to_biguint(&self.0.into_affine().x)
    }

    pub fn y(&self) -> BigUint {
        fq_to_biguint(&self.0.into_affine().y)
    }

    pub fn is_identity(&self) -> bool {
        self.0.into_affine().is_zero()
    }

    /// `self` is a valid point on the curve by construction (every
    /// arithmetic operation in this module stays within the group), so
    /// this only needs to re-check points built from raw coordinates.
    pub fn is_on_curve(&self) -> bool {
        if self.is_identity() {
            return true;
        }
        let affine = self.0.into_affine();
        let lhs = affine.y * affine.y;
        let rhs = affine.x * affine.x * affine.x + Fq::from(7u64);
        lhs == rhs
    }

    pub fn mul_scalar(&self, s: &Scalar) -> Self {
        CurvePoint(self.0 * biguint_to_fr(s.as_biguint()))
    }
}

impl PartialEq for CurvePoint {
    fn eq(&self, other: &Self) -> bool {
        self.0.into_affine() == other.0.into_affine()
    }
}
impl Eq for CurvePoint {}

impl Add for CurvePoint {
    type Output = CurvePoint;
    fn add(self, rhs: Self) -> CurvePoint {
        CurvePoint(self.0 + rhs.0)
    }
}

impl core::ops::AddAssign for CurvePoint {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn generator_times_one_is_generator() {
        let g = Scalar::one().mul_by_generator();
        assert_eq!(g, CurvePoint::generator());
    }

    #[test]
    fn generator_is_on_curve() {
        assert!(CurvePoint::generator().is_on_curve());
    }

    #[test]
    fn scalar_add_sub_roundtrip() {
        let a = Scalar::random(OsRng);
        let b = Scalar::random(OsRng);
        let sum = &a + &b;
        let back = &sum - &b;
        assert_eq!(back, a);
    }

    #[test]
    fn from_xy_rejects_off_curve_points() {
        let x = BigUint::from(1u32);
        let y = BigUint::from(2u32);
        assert!(CurvePoint::from_xy(x, y).is_err());
    }
}
