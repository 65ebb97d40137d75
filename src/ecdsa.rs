//! Verification of the assembled, canonical ECDSA signature.
//!
//! This crate never needs to *produce* an ECDSA signature the ordinary
//! way (a single party holding `k` and the private key); it only needs
//! to confirm, after Lagrange-interpolating the participants'
//! signature shares, that the result is a standard signature any
//! off-the-shelf verifier would accept.

use crate::curve::{CurvePoint, Scalar};
use crate::error::{CoreError, CoreResult};

/// Verify `(r, s)` over message scalar `h` under `public_key`.
///
/// Standard textbook ECDSA verification: computes
/// `u1 = h * s^-1`, `u2 = r * s^-1`, and checks that
/// `(u1 * G + u2 * public_key).x mod q == r`.
pub fn verify(r: &Scalar, s: &Scalar, h: &Scalar, public_key: &CurvePoint) -> CoreResult<()> {
    if r.is_zero() || s.is_zero() {
        return Err(CoreError::InvalidShares);
    }

    let s_inv = s.inv().map_err(|_| CoreError::InvalidShares)?;
    let u1 = h * &s_inv;
    let u2 = r * &s_inv;

    let candidate = u1.mul_by_generator() + public_key.mul_scalar(&u2);
    if candidate.is_identity() {
        return Err(CoreError::InvalidShares);
    }

    let recovered_r = Scalar::from_biguint(candidate.x());
    if &recovered_r == r {
        Ok(())
    } else {
        Err(CoreError::InvalidShares)
    }
}
