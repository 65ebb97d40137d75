//! The ephemeral per-signature key: the distributed nonce `k`, its
//! blinding factor `alpha`, the `v`/`W` exchange that derives `R`
//! without ever reconstructing `k` in one place, and the signature
//! shares issued against it.
//!
//! The state below is intentionally never stored as an explicit enum
//! field; [`EphemeralKey::state`] derives it on demand from whichever
//! pieces have actually arrived, so there is exactly one source of
//! truth for "what have we got so far".

use num_bigint::BigUint;
use tracing::{instrument, trace};

use crate::curve::{secp256k1_order, CurvePoint, Scalar};
use crate::ecdsa;
use crate::error::{CoreError, CoreResult};
use crate::polynomial;

/// The derived lifecycle of an [`EphemeralKey`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EphemeralKeyState {
    /// Allocated, nothing received yet.
    Fresh,
    /// At least one `v`/`W` share has arrived, but `k` and `alpha`
    /// have not both completed their JVRSS rounds locally.
    AwaitingKAlpha,
    /// `k` and `alpha` are both known locally; waiting on enough peer
    /// `v`/`W` shares to interpolate `R`.
    AwaitingVW,
    /// `R` is known and unused; ready to sign.
    Ready,
    /// Already bound to a message hash.
    Used,
}

/// One peer's `(v, W)` contribution towards deriving `R`.
#[derive(Clone, Debug, PartialEq, Eq)]
struct VwShare {
    ordinal: Scalar,
    v: Scalar,
    w: CurvePoint,
}

/// Local state for a single ephemeral signing key.
#[derive(Clone, Debug)]
pub struct EphemeralKey {
    id: u64,
    degree: u32,

    little_k: Option<Scalar>,
    alpha: Option<Scalar>,

    vw_shares: Vec<VwShare>,
    key: Option<Scalar>,

    sig_hash: Option<Scalar>,
    is_used: bool,
    signature_shares: Vec<(Scalar, Scalar)>,
}

impl EphemeralKey {
    pub fn new(id: u64, degree: u32) -> Self {
        EphemeralKey {
            id,
            degree,
            little_k: None,
            alpha: None,
            vw_shares: Vec::new(),
            key: None,
            sig_hash: None,
            is_used: false,
            signature_shares: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> EphemeralKeyState {
        if self.is_used {
            return EphemeralKeyState::Used;
        }
        if self.key.is_some() {
            return EphemeralKeyState::Ready;
        }
        if self.little_k.is_some() && self.alpha.is_some() {
            return EphemeralKeyState::AwaitingVW;
        }
        if self.vw_shares.is_empty() {
            EphemeralKeyState::Fresh
        } else {
            EphemeralKeyState::AwaitingKAlpha
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == EphemeralKeyState::Ready
    }

    pub fn is_used(&self) -> bool {
        self.is_used
    }

    pub fn key(&self) -> Option<&Scalar> {
        self.key.as_ref()
    }

    pub(crate) fn set_little_k(&mut self, value: Scalar) {
        self.little_k = Some(value);
    }

    pub(crate) fn set_alpha(&mut self, value: Scalar) {
        self.alpha = Some(value);
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }

    pub(crate) fn little_k(&self) -> Option<&Scalar> {
        self.little_k.as_ref()
    }

    pub(crate) fn alpha(&self) -> Option<&Scalar> {
        self.alpha.as_ref()
    }

    /// Exposed as plain tuples rather than the private `VwShare` type
    /// so the codec doesn't need visibility into this module.
    pub(crate) fn vw_shares(&self) -> Vec<(Scalar, Scalar, CurvePoint)> {
        self.vw_shares
            .iter()
            .map(|s| (s.ordinal.clone(), s.v.clone(), s.w))
            .collect()
    }

    pub(crate) fn sig_hash(&self) -> Option<&Scalar> {
        self.sig_hash.as_ref()
    }

    pub(crate) fn signature_shares(&self) -> &[(Scalar, Scalar)] {
        &self.signature_shares
    }

    /// Rebuild an ephemeral key from its decoded parts. Used only by
    /// the binary codec.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_raw_parts(
        id: u64,
        degree: u32,
        little_k: Option<Scalar>,
        alpha: Option<Scalar>,
        vw_shares: Vec<(Scalar, Scalar, CurvePoint)>,
        key: Option<Scalar>,
        sig_hash: Option<Scalar>,
        is_used: bool,
        signature_shares: Vec<(Scalar, Scalar)>,
    ) -> Self {
        EphemeralKey {
            id,
            degree,
            little_k,
            alpha,
            vw_shares: vw_shares
                .into_iter()
                .map(|(ordinal, v, w)| VwShare { ordinal, v, w })
                .collect(),
            key,
            sig_hash,
            is_used,
            signature_shares,
        }
    }

    /// Produce this participant's own `(v, W)` contribution, recording
    /// it into the local share set as a side effect.
    #[instrument(skip(self), fields(id = self.id))]
    pub fn get_vw_share(&mut self, own_ordinal: &Scalar) -> CoreResult<(Scalar, CurvePoint)> {
        let k = self
            .little_k
            .clone()
            .ok_or_else(|| CoreError::ProtocolViolation("k not ready".into()))?;
        let alpha = self
            .alpha
            .clone()
            .ok_or_else(|| CoreError::ProtocolViolation("alpha not ready".into()))?;

        let v = &k * &alpha;
        let w = alpha.mul_by_generator();

        self.add_vw_share(own_ordinal.clone(), v.clone(), w)?;
        Ok((v, w))
    }

    fn add_vw_share(&mut self, ordinal: Scalar, v: Scalar, w: CurvePoint) -> CoreResult<()> {
        if let Some(existing) = self.vw_shares.iter().find(|s| s.ordinal == ordinal) {
            if existing.v == v && existing.w == w {
                return Ok(());
            }
            return Err(CoreError::ProtocolViolation(format!(
                "conflicting v/W share from ordinal {:?}",
                ordinal.as_biguint()
            )));
        }
        self.vw_shares.push(VwShare { ordinal, v, w });
        Ok(())
    }

    /// Accept a peer's `(v, Wx, Wy)` contribution, verifying `W` lies
    /// on the curve before trusting it.
    pub fn add_vw_share_raw(
        &mut self,
        ordinal: Scalar,
        v: Scalar,
        w_x: BigUint,
        w_y: BigUint,
    ) -> CoreResult<()> {
        let w = CurvePoint::from_xy(w_x, w_y)?;
        self.add_vw_share(ordinal, v, w)
    }

    pub fn vw_shares_complete(&self) -> bool {
        self.vw_shares.len() >= 2 * self.degree as usize + 1
    }

    /// Interpolate `v(0)` and `W(0)` from the collected shares and set
    /// `R = v(0)^-1 . W(0)`.
    #[instrument(skip(self), fields(id = self.id))]
    pub fn calculate_key(&mut self) -> CoreResult<()> {
        if !self.vw_shares_complete() {
            return Err(CoreError::ThresholdNotMet {
                needed: 2 * self.degree as usize + 1,
                have: self.vw_shares.len(),
            });
        }

        let v_points: Vec<(Scalar, Scalar)> = self
            .vw_shares
            .iter()
            .map(|s| (s.ordinal.clone(), s.v.clone()))
            .collect();
        let w_points: Vec<(Scalar, CurvePoint)> = self
            .vw_shares
            .iter()
            .map(|s| (s.ordinal.clone(), s.w))
            .collect();

        let v0 = polynomial::lagrange_scalar(&v_points, &Scalar::zero())?;
        let w0 = polynomial::lagrange_point(&w_points, &Scalar::zero())?;

        let v0_inv = v0.inv()?;
        let r_point = w0.mul_scalar(&v0_inv);
        if !r_point.is_on_curve() {
            return Err(CoreError::NotOnCurve);
        }

        self.key = Some(Scalar::from_biguint(r_point.x()));
        trace!("ephemeral key derived");
        Ok(())
    }

    /// Issue this participant's signature share for message scalar
    /// `h` against their long-term `private_key_share`, binding this
    /// ephemeral key to `h` for every future call.
    #[instrument(skip(self, private_key_share, h), fields(id = self.id))]
    pub fn issue_signature_share(
        &mut self,
        own_ordinal: &Scalar,
        private_key_share: &Scalar,
        h: &Scalar,
    ) -> CoreResult<Scalar> {
        let r = self
            .key
            .clone()
            .ok_or_else(|| CoreError::ProtocolViolation("R not calculated yet".into()))?;
        let k = self
            .little_k
            .clone()
            .ok_or_else(|| CoreError::ProtocolViolation("k not ready".into()))?;

        let d_r = private_key_share * &r;
        let s = &k * &(h + &d_r);

        self.add_signature_share(h, own_ordinal.clone(), s.clone())?;
        Ok(s)
    }

    /// Accept a peer's signature share, binding this ephemeral key to
    /// `h` on first use. Duplicate deliveries from the same ordinal
    /// are a no-op; a different `h` is rejected.
    pub fn add_signature_share(
        &mut self,
        h: &Scalar,
        from_ordinal: Scalar,
        s: Scalar,
    ) -> CoreResult<()> {
        match &self.sig_hash {
            None => {
                self.sig_hash = Some(h.clone());
                self.is_used = true;
            }
            Some(existing) if existing != h => return Err(CoreError::SigHashMismatch),
            _ => {}
        }

        if self
            .signature_shares
            .iter()
            .any(|(o, _)| o == &from_ordinal)
        {
            return Ok(());
        }
        self.signature_shares.push((from_ordinal, s));
        Ok(())
    }

    /// Interpolate the collected signature shares into a canonical,
    /// low-`s` ECDSA signature and verify it against `public_key`.
    #[instrument(skip(self, public_key), fields(id = self.id))]
    pub fn create_signature(&self, public_key: &CurvePoint) -> CoreResult<(Scalar, Scalar)> {
        let needed = 2 * self.degree as usize + 1;
        if self.signature_shares.len() < needed {
            return Err(CoreError::ThresholdNotMet {
                needed,
                have: self.signature_shares.len(),
            });
        }
        let r = self
            .key
            .clone()
            .ok_or_else(|| CoreError::ProtocolViolation("R not calculated yet".into()))?;
        let h = self
            .sig_hash
            .clone()
            .ok_or_else(|| CoreError::ProtocolViolation("no message bound yet".into()))?;

        let mut s = polynomial::lagrange_scalar(&self.signature_shares, &Scalar::zero())?;

        let order = secp256k1_order();
        let half_order = &order / &BigUint::from(2u32);
        if s.as_biguint() > &half_order {
            let negated = crate::field::mod_sub(&order, s.as_biguint(), &order)
                .expect("s < q, so q - s never underflows");
            s = Scalar::from_biguint(negated);
        }

        ecdsa::verify(&r, &s, &h, public_key)?;
        trace!("signature assembled and verified");
        Ok((r, s))
    }
}
