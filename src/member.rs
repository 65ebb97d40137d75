//! A single participant's view of the group: its static parameters,
//! long-term key material, and the JVRSS rounds / ephemeral keys it
//! currently has in flight.

use rand::{CryptoRng, RngCore};
use tracing::{instrument, trace};

use crate::curve::{CurvePoint, Scalar};
use crate::ephemeral::EphemeralKey;
use crate::error::{CoreError, CoreResult};
use crate::polynomial;
use crate::secret_share::{SecretShare, ShareKind};

/// The static, agreed-upon shape of the group: how many ordinals are
/// needed to reconstruct a degree-`degree` polynomial, and the sorted
/// set of ordinals themselves.
///
/// Validated once at construction so every later lookup can assume
/// `ordinals` is sorted, duplicate-free, and large enough for
/// `degree`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupParameters {
    degree: u32,
    ordinals: Vec<Scalar>,
}

impl GroupParameters {
    pub fn new(degree: u32, mut ordinals: Vec<Scalar>) -> CoreResult<Self> {
        ordinals.sort_by(|a, b| a.as_biguint().cmp(b.as_biguint()));
        for pair in ordinals.windows(2) {
            if pair[0] == pair[1] {
                return Err(CoreError::InvalidInput(
                    "duplicate ordinal in group parameters".into(),
                ));
            }
        }
        if ordinals.len() < degree as usize + 1 {
            return Err(CoreError::ThresholdNotMet {
                needed: degree as usize + 1,
                have: ordinals.len(),
            });
        }
        Ok(GroupParameters { degree, ordinals })
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }

    pub fn ordinals(&self) -> &[Scalar] {
        &self.ordinals
    }

    pub fn index_of(&self, ordinal: &Scalar) -> CoreResult<usize> {
        self.ordinals
            .iter()
            .position(|o| o == ordinal)
            .ok_or_else(|| CoreError::InvalidInput("ordinal is not a member of this group".into()))
    }
}

/// One participant's full local state.
pub struct Member {
    params: GroupParameters,
    ordinal_index: usize,

    private_key_share: Option<Scalar>,
    public_key: Option<CurvePoint>,

    private_key_shared: Vec<bool>,
    private_key_shares: Vec<Option<Scalar>>,

    pending_secret_shares: Vec<SecretShare>,
    ephemeral_keys: Vec<EphemeralKey>,
    next_ephemeral_id: u64,
}

impl Member {
    /// Join a group, immediately starting the long-term private-key
    /// share round (id `0`, [`ShareKind::PrivateKeyShare`]).
    pub fn new(
        own_ordinal: Scalar,
        params: GroupParameters,
        rng: impl RngCore + CryptoRng,
    ) -> CoreResult<Self> {
        let ordinal_index = params.index_of(&own_ordinal)?;
        let n = params.ordinals().len();

        let round = SecretShare::new(
            0,
            ShareKind::PrivateKeyShare,
            params.degree() as usize,
            params.ordinals(),
            ordinal_index,
            rng,
        );

        Ok(Member {
            params,
            ordinal_index,
            private_key_share: None,
            public_key: None,
            private_key_shared: vec![false; n],
            private_key_shares: vec![None; n],
            pending_secret_shares: vec![round],
            ephemeral_keys: Vec::new(),
            next_ephemeral_id: 1,
        })
    }

    pub fn params(&self) -> &GroupParameters {
        &self.params
    }

    pub fn ordinal_index(&self) -> usize {
        self.ordinal_index
    }

    pub fn ordinal(&self) -> &Scalar {
        &self.params.ordinals()[self.ordinal_index]
    }

    pub fn private_key_share(&self) -> Option<&Scalar> {
        self.private_key_share.as_ref()
    }

    pub fn public_key(&self) -> Option<&CurvePoint> {
        self.public_key.as_ref()
    }

    pub fn get_secret_share(&self, id: u64, kind: ShareKind) -> Option<&SecretShare> {
        self.pending_secret_shares
            .iter()
            .find(|s| s.id == id && s.kind == kind)
    }

    pub fn get_secret_share_mut(&mut self, id: u64, kind: ShareKind) -> Option<&mut SecretShare> {
        self.pending_secret_shares
            .iter_mut()
            .find(|s| s.id == id && s.kind == kind)
    }

    /// Test-only hook: replace whichever round matches `round`'s `(id,
    /// kind)` with `round` itself, for reference vectors built from
    /// fixed literal polynomials instead of fresh randomness.
    pub fn overwrite_secret_share(&mut self, round: SecretShare) {
        match self
            .pending_secret_shares
            .iter()
            .position(|s| s.id == round.id && s.kind == round.kind)
        {
            Some(idx) => self.pending_secret_shares[idx] = round,
            None => self.pending_secret_shares.push(round),
        }
    }

    /// Run the correctness/honesty checks and aggregation of a
    /// complete round, routing the resulting scalar to wherever it
    /// belongs (the long-term share, or the owning ephemeral key), and
    /// drop the round from the pending set.
    #[instrument(skip(self), fields(id, kind = ?kind))]
    pub fn finish_secret_share(&mut self, id: u64, kind: ShareKind) -> CoreResult<()> {
        let idx = self
            .pending_secret_shares
            .iter()
            .position(|s| s.id == id && s.kind == kind)
            .ok_or_else(|| {
                CoreError::ProtocolViolation(format!("no pending {kind:?} round with id {id}"))
            })?;

        let round = &self.pending_secret_shares[idx];
        if !round.shares_complete() {
            return Err(CoreError::ProtocolViolation(
                "finish_secret_share called before shares_complete".into(),
            ));
        }

        let secret = round.create_secret()?;

        match kind {
            ShareKind::PrivateKeyShare => {
                let public_key = round.create_public_key()?;
                self.private_key_share = Some(secret);
                self.public_key = Some(public_key);
                trace!("long-term private key share established");
            }
            ShareKind::LittleK => {
                self.find_ephemeral_key_mut(id)?.set_little_k(secret);
            }
            ShareKind::Alpha => {
                self.find_ephemeral_key_mut(id)?.set_alpha(secret);
            }
        }

        self.pending_secret_shares.remove(idx);
        Ok(())
    }

    pub fn private_key_share_set(&self) -> bool {
        self.private_key_share.is_some()
    }

    pub(crate) fn private_key_shared(&self) -> &[bool] {
        &self.private_key_shared
    }

    pub(crate) fn private_key_shares(&self) -> &[Option<Scalar>] {
        &self.private_key_shares
    }

    pub(crate) fn pending_secret_shares(&self) -> &[SecretShare] {
        &self.pending_secret_shares
    }

    pub(crate) fn ephemeral_keys(&self) -> &[EphemeralKey] {
        &self.ephemeral_keys
    }

    pub fn next_ephemeral_id(&self) -> u64 {
        self.next_ephemeral_id
    }

    /// Rebuild a member from its decoded parts. Used only by the
    /// binary codec.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_raw_parts(
        params: GroupParameters,
        ordinal_index: usize,
        private_key_share: Option<Scalar>,
        public_key: Option<CurvePoint>,
        private_key_shared: Vec<bool>,
        private_key_shares: Vec<Option<Scalar>>,
        pending_secret_shares: Vec<SecretShare>,
        ephemeral_keys: Vec<EphemeralKey>,
        next_ephemeral_id: u64,
    ) -> Self {
        Member {
            params,
            ordinal_index,
            private_key_share,
            public_key,
            private_key_shared,
            private_key_shares,
            pending_secret_shares,
            ephemeral_keys,
            next_ephemeral_id,
        }
    }

    /// Begin a fresh ephemeral key: allocates an id, starts its two
    /// JVRSS rounds (`k` and `alpha`), and returns the id together with
    /// both rounds for the caller to broadcast.
    pub fn start_ephemeral_key(
        &mut self,
        mut rng: impl RngCore + CryptoRng,
    ) -> (u64, SecretShare, SecretShare) {
        let id = self.next_ephemeral_id;
        self.next_ephemeral_id += 1;
        let degree = self.params.degree() as usize;

        let k_round = SecretShare::new(
            id,
            ShareKind::LittleK,
            degree,
            self.params.ordinals(),
            self.ordinal_index,
            &mut rng,
        );
        let a_round = SecretShare::new(
            id,
            ShareKind::Alpha,
            degree,
            self.params.ordinals(),
            self.ordinal_index,
            &mut rng,
        );

        self.ephemeral_keys.push(EphemeralKey::new(id, self.params.degree()));
        self.pending_secret_shares.push(k_round.clone());
        self.pending_secret_shares.push(a_round.clone());

        (id, k_round, a_round)
    }

    pub fn find_ephemeral_key(&self, id: u64) -> CoreResult<&EphemeralKey> {
        self.ephemeral_keys
            .iter()
            .find(|e| e.id() == id)
            .ok_or_else(|| CoreError::ProtocolViolation(format!("no ephemeral key with id {id}")))
    }

    pub fn find_ephemeral_key_mut(&mut self, id: u64) -> CoreResult<&mut EphemeralKey> {
        self.ephemeral_keys
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or_else(|| CoreError::ProtocolViolation(format!("no ephemeral key with id {id}")))
    }

    /// The first ephemeral key that is ready to sign and has not yet
    /// been bound to a message.
    pub fn find_unused_ephemeral_key(&self) -> Option<&EphemeralKey> {
        self.ephemeral_keys
            .iter()
            .find(|e| e.is_ready() && !e.is_used())
    }

    pub fn remove_ephemeral_key(&mut self, id: u64) {
        self.ephemeral_keys.retain(|e| e.id() != id);
        self.pending_secret_shares
            .retain(|s| !(s.id == id && s.kind != ShareKind::PrivateKeyShare));
    }

    /// Record a peer's long-term private-key share, for optional
    /// private-key reconstruction.
    pub fn add_private_key_share(&mut self, from_index: usize, value: Scalar) -> CoreResult<()> {
        if from_index >= self.params.ordinals().len() {
            return Err(CoreError::OrdinalNotFound(from_index as u32));
        }
        if self.private_key_shared[from_index] {
            if self.private_key_shares[from_index].as_ref() == Some(&value) {
                return Ok(());
            }
            return Err(CoreError::ProtocolViolation(format!(
                "conflicting private key share from participant {from_index}"
            )));
        }
        self.private_key_shared[from_index] = true;
        self.private_key_shares[from_index] = Some(value);
        Ok(())
    }

    /// Reconstruct the full group private key from `degree + 1`
    /// long-term shares (this participant's own share plus whichever
    /// peers' shares have been collected), verifying the result
    /// against the known group public key.
    pub fn generate_private_key(&self) -> CoreResult<Scalar> {
        let mut points: Vec<(Scalar, Scalar)> = Vec::new();
        if let Some(own) = &self.private_key_share {
            points.push((self.ordinal().clone(), own.clone()));
        }
        for (i, shared) in self.private_key_shared.iter().enumerate() {
            if *shared && i != self.ordinal_index {
                let value = self.private_key_shares[i]
                    .clone()
                    .expect("shared implies present");
                points.push((self.params.ordinals()[i].clone(), value));
            }
        }

        let needed = self.params.degree() as usize + 1;
        if points.len() < needed {
            return Err(CoreError::ThresholdNotMet {
                needed,
                have: points.len(),
            });
        }
        points.truncate(needed);

        let recovered = polynomial::lagrange_scalar(&points, &Scalar::zero())?;
        let public_key = self
            .public_key
            .ok_or_else(|| CoreError::ProtocolViolation("public key not yet known".into()))?;

        if recovered.mul_by_generator() == public_key {
            Ok(recovered)
        } else {
            Err(CoreError::InvalidShares)
        }
    }

    /// Drop every pending round and ephemeral key, retaining the
    /// long-term private-key share, public key, and collected peer
    /// shares.
    pub fn reset(&mut self) {
        self.pending_secret_shares.clear();
        self.ephemeral_keys.clear();
    }
}
