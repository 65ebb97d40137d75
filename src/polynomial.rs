//! Random polynomials, Horner evaluation, and Lagrange interpolation
//! over the secp256k1 scalar field.

use rand::{CryptoRng, RngCore};

use crate::curve::{CurvePoint, Scalar};
use crate::error::{CoreError, CoreResult};

/// A polynomial of degree `d`, stored as its `d + 1` coefficients
/// `c_0 ..= c_d`, lowest degree first.
#[derive(Clone, Debug)]
pub struct Polynomial {
    coefficients: Vec<Scalar>,
}

impl Polynomial {
    /// Sample a degree-`t` polynomial with coefficients drawn uniformly
    /// from `[min, max)`, resampling until `c_0 >= 1` and `c_d != 0`.
    ///
    /// All other coefficients are accepted as drawn on the first try.
    pub fn random(
        t: usize,
        min: &Scalar,
        max: &Scalar,
        mut rng: impl RngCore + CryptoRng,
    ) -> Self {
        let one = Scalar::one();

        let mut c0 = Scalar::rand_in_range(min, max, &mut rng);
        while c0.as_biguint() < one.as_biguint() {
            c0 = Scalar::rand_in_range(min, max, &mut rng);
        }

        let mut coefficients = Vec::with_capacity(t + 1);
        coefficients.push(c0);

        // c_0 >= 1 already makes it a valid, nonzero top coefficient for
        // the degree-0 case, so there's nothing left to sample.
        if t > 0 {
            for _ in 1..t {
                coefficients.push(Scalar::rand_in_range(min, max, &mut rng));
            }

            let mut cd = Scalar::rand_in_range(min, max, &mut rng);
            while cd.is_zero() {
                cd = Scalar::rand_in_range(min, max, &mut rng);
            }
            coefficients.push(cd);
        }

        Polynomial { coefficients }
    }

    /// Construct a polynomial from explicit coefficients (lowest degree
    /// first). Used by tests that need deterministic, fixed-literal
    /// polynomials.
    pub fn from_coefficients(coefficients: Vec<Scalar>) -> Self {
        Polynomial { coefficients }
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn coefficients(&self) -> &[Scalar] {
        &self.coefficients
    }

    /// Evaluate this polynomial at `x` using Horner's method.
    pub fn evaluate(&self, x: &Scalar) -> Scalar {
        let mut result = Scalar::zero();
        for c in self.coefficients.iter().rev() {
            result = &(&result * x) + c;
        }
        result
    }

    /// The Pedersen-style commitment `[c_0 G, c_1 G, ..., c_d G]`.
    pub fn hide(&self) -> Vec<CurvePoint> {
        self.coefficients.iter().map(Scalar::mul_by_generator).collect()
    }
}

/// Compute the Lagrange coefficient at `x` for the participant indexed
/// by `my_index` within `all_indices`.
fn lagrange_coefficient(my_index: &Scalar, all_indices: &[Scalar], x: &Scalar) -> CoreResult<Scalar> {
    let mut numerator = Scalar::one();
    let mut denominator = Scalar::one();

    for other in all_indices {
        if other == my_index {
            continue;
        }
        numerator = &numerator * &(x - other);
        denominator = &denominator * &(my_index - other);
    }

    let denom_inv = denominator.inv().map_err(|_| {
        CoreError::InvalidInput("duplicate ordinal in lagrange interpolation".into())
    })?;
    Ok(&numerator * &denom_inv)
}

/// Standard Lagrange interpolation of `(x_j, y_j)` scalar points at `x`.
///
/// Requires at least 2 points, all with distinct `x`-coordinates.
pub fn lagrange_scalar(points: &[(Scalar, Scalar)], x: &Scalar) -> CoreResult<Scalar> {
    if points.len() < 2 {
        return Err(CoreError::ThresholdNotMet {
            needed: 2,
            have: points.len(),
        });
    }
    let indices: Vec<Scalar> = points.iter().map(|(x, _)| x.clone()).collect();
    assert_distinct(&indices)?;

    let mut acc = Scalar::zero();
    for (xj, yj) in points.iter() {
        let coeff = lagrange_coefficient(xj, &indices, x)?;
        acc = &acc + &(yj * &coeff);
    }
    Ok(acc)
}

/// Elliptic-curve analogue of [`lagrange_scalar`]: the `y`-coordinates
/// are curve points, and the basis coefficient multiplies a point
/// instead of a scalar.
pub fn lagrange_point(points: &[(Scalar, CurvePoint)], x: &Scalar) -> CoreResult<CurvePoint> {
    if points.len() < 2 {
        return Err(CoreError::ThresholdNotMet {
            needed: 2,
            have: points.len(),
        });
    }
    let indices: Vec<Scalar> = points.iter().map(|(x, _)| x.clone()).collect();
    assert_distinct(&indices)?;

    let mut acc = CurvePoint::identity();
    for (xj, yj) in points.iter() {
        let coeff = lagrange_coefficient(xj, &indices, x)?;
        acc += yj.mul_scalar(&coeff);
    }
    Ok(acc)
}

fn assert_distinct(indices: &[Scalar]) -> CoreResult<()> {
    for i in 0..indices.len() {
        for j in (i + 1)..indices.len() {
            if indices[i] == indices[j] {
                return Err(CoreError::InvalidInput(
                    "duplicate x-coordinate in interpolation input".into(),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn naive_evaluate(p: &Polynomial, x: &Scalar) -> Scalar {
        let mut acc = Scalar::zero();
        let mut power = Scalar::one();
        for c in p.coefficients() {
            acc = &acc + &(c * &power);
            power = &power * x;
        }
        acc
    }

    #[test]
    fn horner_matches_naive_evaluation() {
        let min = Scalar::one();
        let max = Scalar::from_u32(1_000_000);
        let poly = Polynomial::random(4, &min, &max, OsRng);
        let x = Scalar::rand_in_range(&min, &max, OsRng);
        assert_eq!(poly.evaluate(&x), naive_evaluate(&poly, &x));
    }

    #[test]
    fn random_polynomial_respects_rejection_rules() {
        let min = Scalar::one();
        let max = Scalar::from_u32(5);
        for _ in 0..20 {
            let poly = Polynomial::random(2, &min, &max, OsRng);
            assert!(poly.coefficients()[0].as_biguint() >= Scalar::one().as_biguint());
            assert!(!poly.coefficients().last().unwrap().is_zero());
        }
    }

    #[test]
    fn lagrange_scalar_recovers_polynomial() {
        let min = Scalar::one();
        let max = Scalar::from_u32(1_000_000);
        let poly = Polynomial::random(2, &min, &max, OsRng);

        let xs = [Scalar::from_u32(1), Scalar::from_u32(2), Scalar::from_u32(3)];
        let points: Vec<(Scalar, Scalar)> = xs
            .iter()
            .map(|x| (x.clone(), poly.evaluate(x)))
            .collect();

        let target = Scalar::from_u32(42);
        assert_eq!(
            lagrange_scalar(&points, &target).unwrap(),
            poly.evaluate(&target)
        );
    }

    #[test]
    fn lagrange_point_recovers_polynomial() {
        let min = Scalar::one();
        let max = Scalar::from_u32(1_000_000);
        let poly = Polynomial::random(2, &min, &max, OsRng);

        let xs = [Scalar::from_u32(1), Scalar::from_u32(2), Scalar::from_u32(3)];
        let points: Vec<(Scalar, CurvePoint)> = xs
            .iter()
            .map(|x| (x.clone(), poly.evaluate(x).mul_by_generator()))
            .collect();

        let target = Scalar::from_u32(42);
        assert_eq!(
            lagrange_point(&points, &target).unwrap(),
            poly.evaluate(&target).mul_by_generator()
        );
    }

    #[test]
    fn same_seed_reproduces_the_same_polynomial() {
        let min = Scalar::one();
        let max = Scalar::from_u32(1_000_000);

        let a = Polynomial::random(3, &min, &max, ChaCha8Rng::seed_from_u64(42));
        let b = Polynomial::random(3, &min, &max, ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a.coefficients(), b.coefficients());

        let c = Polynomial::random(3, &min, &max, ChaCha8Rng::seed_from_u64(43));
        assert_ne!(a.coefficients(), c.coefficients());
    }

    #[test]
    fn duplicate_x_coordinates_are_rejected() {
        let points = vec![
            (Scalar::from_u32(1), Scalar::from_u32(1)),
            (Scalar::from_u32(1), Scalar::from_u32(2)),
        ];
        assert!(lagrange_scalar(&points, &Scalar::from_u32(0)).is_err());
    }
}
