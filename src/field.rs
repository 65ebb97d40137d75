//! Big-integer modular arithmetic over an arbitrary modulus.
//!
//! These free functions are intentionally generic over the modulus `q`
//! rather than hard-wired to the secp256k1 group order: a sentinel
//! `q == 0` bypasses reduction entirely and is used by a handful of
//! non-cryptographic helpers elsewhere in the crate. Every other caller
//! threads in [`crate::curve::SECP256K1_ORDER`].

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};

use crate::error::{CoreError, CoreResult};

/// `a + b`, reduced mod `q` unless `q == 0`.
pub fn mod_add(a: &BigUint, b: &BigUint, q: &BigUint) -> BigUint {
    let sum = a + b;
    if q.is_zero() {
        sum
    } else {
        sum % q
    }
}

/// `a - b`, reduced mod `q` unless `q == 0`.
///
/// If `a >= b` this returns `a - b` directly; otherwise it returns
/// `q - (b - a)`, so the result is always non-negative and never
/// observable as a negative intermediate. When `q == 0`, `a` must be
/// `>= b` or this returns [`CoreError::InvalidInput`].
pub fn mod_sub(a: &BigUint, b: &BigUint, q: &BigUint) -> CoreResult<BigUint> {
    if q.is_zero() {
        return a
            .checked_sub(b)
            .ok_or_else(|| CoreError::InvalidInput("subtraction underflow with q=0".into()));
    }
    if a >= b {
        Ok(a - b)
    } else {
        Ok(q - (b - a))
    }
}

/// `a * b`, reduced mod `q` unless `q == 0`.
pub fn mod_mul(a: &BigUint, b: &BigUint, q: &BigUint) -> BigUint {
    let prod = a * b;
    if q.is_zero() {
        prod
    } else {
        prod % q
    }
}

/// The extended-Euclidean inverse of `a` mod `q`.
///
/// Fails with [`CoreError::InvalidInput`] when `a ≡ 0 (mod q)` or when
/// `q == 0` (there is no modulus to invert against).
pub fn mod_inv(a: &BigUint, q: &BigUint) -> CoreResult<BigUint> {
    if q.is_zero() {
        return Err(CoreError::InvalidInput("cannot invert with q=0".into()));
    }
    let a = a % q;
    if a.is_zero() {
        return Err(CoreError::InvalidInput("cannot invert zero".into()));
    }

    // Extended Euclidean algorithm over signed BigInt, mapped back into
    // BigUint at the end.
    use num_bigint::BigInt;
    use num_traits::Signed;

    let (mut old_r, mut r) = (BigInt::from(q.clone()), BigInt::from(a));
    let (mut old_s, mut s) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let quotient = &old_r / &r;
        let new_r = &old_r - &quotient * &r;
        old_r = std::mem::replace(&mut r, new_r);
        let new_s = &old_s - &quotient * &s;
        old_s = std::mem::replace(&mut s, new_s);
    }

    if old_r != BigInt::one() {
        return Err(CoreError::InvalidInput(
            "value is not invertible mod q".into(),
        ));
    }

    let q_signed = BigInt::from(q.clone());
    let mut result = old_s % &q_signed;
    if result.is_negative() {
        result += &q_signed;
    }

    Ok(result
        .to_biguint()
        .expect("reduced mod a positive modulus is always non-negative"))
}

/// `a / b = a * mod_inv(b, q)`, mod `q`.
pub fn mod_div(a: &BigUint, b: &BigUint, q: &BigUint) -> CoreResult<BigUint> {
    let inv = mod_inv(b, q)?;
    Ok(mod_mul(a, &inv, q))
}

/// Cryptographically strong uniform sampling in `[min, max)`.
///
/// Uses rejection sampling against the smallest power-of-two byte width
/// covering the range, so the result is exactly uniform rather than
/// merely approximately so.
pub fn rand_scalar(min: &BigUint, max: &BigUint, mut rng: impl RngCore + CryptoRng) -> BigUint {
    assert!(max > min, "rand_scalar requires max > min");
    let range = max - min;
    let byte_len = ((range.bits() + 7) / 8).max(1) as usize;
    let mut buf = vec![0u8; byte_len];

    loop {
        rng.fill_bytes(&mut buf);
        let candidate = BigUint::from_bytes_be(&buf);
        if candidate < range {
            return min + candidate;
        }
    }
}
