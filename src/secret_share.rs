//! One round of Joint Verifiable Random Secret Sharing (JVRSS).
//!
//! A [`SecretShare`] carries all of one participant's state for a
//! single round: their own secret polynomial, what they have
//! broadcast, and what every peer has sent back. [`SecretShare::new`]
//! starts the round; [`SecretShare::add_share`] and
//! [`SecretShare::add_eval_share`] record peer contributions as they
//! arrive (in any order, any interleaving); once
//! [`SecretShare::shares_complete`] is `true`,
//! [`SecretShare::create_secret`] verifies and aggregates.

use rand::{CryptoRng, RngCore};
use tracing::{instrument, trace, warn};

use crate::curve::{CurvePoint, Scalar};
use crate::error::{CoreError, CoreResult};
use crate::polynomial::{self, Polynomial};

/// What a [`SecretShare`] round is producing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShareKind {
    /// The long-term private-key share, round id is always 0.
    PrivateKeyShare,
    /// The per-signature ephemeral scalar `k`.
    LittleK,
    /// The per-signature blinding value `alpha`.
    Alpha,
}

/// One JVRSS round's worth of local state.
#[derive(Clone, Debug)]
pub struct SecretShare {
    /// 0 for the long-term round, otherwise the owning `EphemeralKey`'s id.
    pub id: u64,
    pub kind: ShareKind,

    ordinals: Vec<Scalar>,
    own_index: usize,

    poly: Polynomial,
    /// `evals[j] = f(O_j)`, this participant's own plaintext view.
    evals: Vec<Scalar>,
    hidden_evals: Vec<CurvePoint>,
    hidden_poly: Vec<CurvePoint>,

    shared: Vec<bool>,
    shared_poly: Vec<Option<Vec<CurvePoint>>>,
    shared_evals: Vec<Option<Vec<CurvePoint>>>,

    actual_eval_shared: Vec<bool>,
    actual_evals: Vec<Option<Scalar>>,
}

impl SecretShare {
    /// Start a new round. `ordinals` must already be the group's sorted
    /// ordinal set, and `own_index` this participant's position in it.
    #[instrument(skip(rng), fields(id, ?kind, own_index))]
    pub fn new(
        id: u64,
        kind: ShareKind,
        degree: usize,
        ordinals: &[Scalar],
        own_index: usize,
        rng: impl RngCore + CryptoRng,
    ) -> Self {
        let poly = Polynomial::random(degree, &Scalar::one(), &secp_order_scalar(), rng);
        Self::from_polynomial(id, kind, ordinals, own_index, poly)
    }

    /// Test-only hook: start a round with a caller-supplied polynomial,
    /// for reference vectors with fixed literal coefficients.
    pub fn from_polynomial(
        id: u64,
        kind: ShareKind,
        ordinals: &[Scalar],
        own_index: usize,
        poly: Polynomial,
    ) -> Self {
        let n = ordinals.len();
        let evals: Vec<Scalar> = ordinals.iter().map(|o| poly.evaluate(o)).collect();
        let hidden_evals: Vec<CurvePoint> = evals.iter().map(Scalar::mul_by_generator).collect();
        let hidden_poly = poly.hide();

        let mut shared = vec![false; n];
        let mut shared_poly = vec![None; n];
        let mut shared_evals = vec![None; n];
        shared[own_index] = true;
        shared_poly[own_index] = Some(hidden_poly.clone());
        shared_evals[own_index] = Some(hidden_evals.clone());

        let mut actual_eval_shared = vec![false; n];
        let mut actual_evals = vec![None; n];
        actual_eval_shared[own_index] = true;
        actual_evals[own_index] = Some(evals[own_index].clone());

        trace!("started secret share round");

        SecretShare {
            id,
            kind,
            ordinals: ordinals.to_vec(),
            own_index,
            poly,
            evals,
            hidden_evals,
            hidden_poly,
            shared,
            shared_poly,
            shared_evals,
            actual_eval_shared,
            actual_evals,
        }
    }

    pub fn kind(&self) -> ShareKind {
        self.kind
    }

    pub fn ordinals(&self) -> &[Scalar] {
        &self.ordinals
    }

    pub fn own_index(&self) -> usize {
        self.own_index
    }

    pub fn evals(&self) -> &[Scalar] {
        &self.evals
    }

    /// This participant's own hidden polynomial commitment, to broadcast.
    pub fn hidden_poly(&self) -> &[CurvePoint] {
        &self.hidden_poly
    }

    /// This participant's own hidden evaluations, to broadcast.
    pub fn hidden_evals(&self) -> &[CurvePoint] {
        &self.hidden_evals
    }

    pub(crate) fn shared(&self) -> &[bool] {
        &self.shared
    }

    pub(crate) fn shared_poly(&self) -> &[Option<Vec<CurvePoint>>] {
        &self.shared_poly
    }

    pub(crate) fn shared_evals(&self) -> &[Option<Vec<CurvePoint>>] {
        &self.shared_evals
    }

    pub(crate) fn actual_eval_shared(&self) -> &[bool] {
        &self.actual_eval_shared
    }

    pub(crate) fn actual_evals(&self) -> &[Option<Scalar>] {
        &self.actual_evals
    }

    /// Rebuild a round from its decoded parts. Used only by the binary
    /// codec; does not re-run any validation beyond field shapes.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_raw_parts(
        id: u64,
        kind: ShareKind,
        ordinals: Vec<Scalar>,
        own_index: usize,
        evals: Vec<Scalar>,
        hidden_evals: Vec<CurvePoint>,
        hidden_poly: Vec<CurvePoint>,
        shared: Vec<bool>,
        shared_poly: Vec<Option<Vec<CurvePoint>>>,
        shared_evals: Vec<Option<Vec<CurvePoint>>>,
        actual_eval_shared: Vec<bool>,
        actual_evals: Vec<Option<Scalar>>,
    ) -> Self {
        // `poly` itself is not part of the wire format (only its
        // public commitment and evaluations are); a decoded round
        // therefore carries a zero polynomial as a placeholder. It is
        // never evaluated again once decoded -- every consumer of
        // `poly` participates only as the producing side of a round.
        SecretShare {
            id,
            kind,
            ordinals,
            own_index,
            poly: Polynomial::from_coefficients(vec![Scalar::zero()]),
            evals,
            hidden_evals,
            hidden_poly,
            shared,
            shared_poly,
            shared_evals,
            actual_eval_shared,
            actual_evals,
        }
    }

    /// The plaintext evaluation to privately deliver to the holder of
    /// ordinal index `j`.
    pub fn eval_share(&self, j: usize) -> CoreResult<Scalar> {
        self.evals
            .get(j)
            .cloned()
            .ok_or(CoreError::OrdinalNotFound(j as u32))
    }

    /// Record peer `from_index`'s broadcast `(hidden_poly, hidden_evals)`.
    #[instrument(skip(self, poly, evals), fields(id = self.id, from_index))]
    pub fn add_share(
        &mut self,
        from_index: usize,
        poly: Vec<CurvePoint>,
        evals: Vec<CurvePoint>,
    ) -> CoreResult<()> {
        if from_index >= self.ordinals.len() {
            return Err(CoreError::OrdinalNotFound(from_index as u32));
        }
        if self.shared[from_index] {
            if self.shared_poly[from_index].as_ref() == Some(&poly)
                && self.shared_evals[from_index].as_ref() == Some(&evals)
            {
                return Ok(());
            }
            warn!(from_index, "conflicting broadcast for same round");
            return Err(CoreError::ProtocolViolation(format!(
                "conflicting broadcast from participant {from_index}"
            )));
        }

        self.shared[from_index] = true;
        self.shared_poly[from_index] = Some(poly);
        self.shared_evals[from_index] = Some(evals);
        Ok(())
    }

    /// Record peer `from_index`'s private unhidden evaluation of *our*
    /// ordinal on their polynomial.
    #[instrument(skip(self, value), fields(id = self.id, from_index))]
    pub fn add_eval_share(&mut self, from_index: usize, value: Scalar) -> CoreResult<()> {
        if from_index >= self.ordinals.len() {
            return Err(CoreError::OrdinalNotFound(from_index as u32));
        }
        if self.actual_eval_shared[from_index] {
            if self.actual_evals[from_index].as_ref() == Some(&value) {
                return Ok(());
            }
            warn!(from_index, "conflicting eval share for same round");
            return Err(CoreError::ProtocolViolation(format!(
                "conflicting eval share from participant {from_index}"
            )));
        }

        self.actual_eval_shared[from_index] = true;
        self.actual_evals[from_index] = Some(value);
        Ok(())
    }

    /// `true` once every peer has broadcast and every peer has
    /// privately delivered their evaluation.
    pub fn shares_complete(&self) -> bool {
        self.shared.iter().all(|&b| b) && self.actual_eval_shared.iter().all(|&b| b)
    }

    /// Run the correctness and honesty checks of the round and, on
    /// success, return the aggregated secret scalar.
    #[instrument(skip(self), fields(id = self.id, kind = ?self.kind))]
    pub fn create_secret(&self) -> CoreResult<Scalar> {
        if !self.shares_complete() {
            return Err(CoreError::ProtocolViolation(
                "create_secret called before shares_complete".into(),
            ));
        }

        let n = self.ordinals.len();

        // a. Correctness: for each peer i, interpolating their
        //    broadcast hidden evaluations at x = 0 must reproduce the
        //    constant term of their broadcast hidden polynomial.
        for i in 0..n {
            let evals_i = self.shared_evals[i].as_ref().expect("complete");
            let poly_i = self.shared_poly[i].as_ref().expect("complete");

            let points: Vec<(Scalar, CurvePoint)> = self
                .ordinals
                .iter()
                .cloned()
                .zip(evals_i.iter().cloned())
                .collect();

            let interpolated = polynomial::lagrange_point(&points, &Scalar::zero())
                .map_err(|_| CoreError::NotCorrect(i as u32))?;

            if interpolated != poly_i[0] {
                warn!(participant = i, "correctness check failed");
                return Err(CoreError::NotCorrect(i as u32));
            }
        }

        // b. Honesty: the unhidden evaluation peer i privately sent us
        //    must agree with the hidden evaluation they broadcast for
        //    our ordinal ...
        for i in 0..n {
            let claimed = self.actual_evals[i].as_ref().expect("complete");
            let broadcast = &self.shared_evals[i].as_ref().expect("complete")[self.own_index];

            if &claimed.mul_by_generator() != broadcast {
                warn!(from = i, to = self.own_index, "honesty check failed");
                return Err(CoreError::Dishonest {
                    from: i as u32,
                    to: self.own_index as u32,
                });
            }
        }

        // ... and every peer's broadcast hidden evaluations must
        // themselves reconcile against their broadcast hidden
        // polynomial, for every ordinal (not just our own), so that a
        // dishonest broadcast is caught even if it targets someone else.
        for from in 0..n {
            let poly_from = self.shared_poly[from].as_ref().expect("complete");
            let evals_from = self.shared_evals[from].as_ref().expect("complete");

            for (to, ordinal_to) in self.ordinals.iter().enumerate() {
                let expected = evaluate_hidden_poly(poly_from, ordinal_to);
                if expected != evals_from[to] {
                    warn!(from, to, "cross-participant reconciliation failed");
                    return Err(CoreError::Dishonest {
                        from: from as u32,
                        to: to as u32,
                    });
                }
            }
        }

        // c. Aggregate.
        let mut secret = Scalar::zero();
        for i in 0..n {
            secret = &secret + self.actual_evals[i].as_ref().expect("complete");
        }
        trace!("secret share round complete");
        Ok(secret)
    }

    /// The group public key, `Σ_j shared_poly[j][0]`. Only meaningful
    /// for [`ShareKind::PrivateKeyShare`] rounds.
    pub fn create_public_key(&self) -> CoreResult<CurvePoint> {
        if !self.shares_complete() {
            return Err(CoreError::ProtocolViolation(
                "create_public_key called before shares_complete".into(),
            ));
        }
        let mut key = CurvePoint::identity();
        for poly in self.shared_poly.iter() {
            key += poly.as_ref().expect("complete")[0];
        }
        Ok(key)
    }
}

/// Evaluate a hidden polynomial (`[c_0 G, ..., c_d G]`) at `x` on the
/// curve, via `Σ_k (c_k G) · x^k`.
fn evaluate_hidden_poly(hidden_poly: &[CurvePoint], x: &Scalar) -> CurvePoint {
    let mut acc = CurvePoint::identity();
    let mut power = Scalar::one();
    for term in hidden_poly {
        acc += term.mul_scalar(&power);
        power = &power * x;
    }
    acc
}

fn secp_order_scalar() -> Scalar {
    Scalar::from_biguint(crate::curve::secp256k1_order())
}
