//! Deterministic binary encoding for every persistent structure.
//!
//! This is not `ark_serialize`'s canonical compressed point encoding:
//! §6 of the protocol prescribes a length-prefixed, self-describing
//! format so a `Member` snapshot can be written and later parsed back
//! without any curve-library-specific framing. Every type below
//! follows the same `to_bytes`/`from_bytes` shape used for the
//! cryptographic key types elsewhere in the crate.

use crate::curve::{CurvePoint, Scalar};
use crate::error::{CoreError, CoreResult};
use crate::member::{GroupParameters, Member};
use crate::secret_share::{SecretShare, ShareKind};

/// A cursor over a byte slice, tracking the current read offset.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> CoreResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .ok_or_else(|| CoreError::DeserializationError("length overflow".into()))?;
        if end > self.buf.len() {
            return Err(CoreError::DeserializationError(
                "buffer truncated".into(),
            ));
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> CoreResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> CoreResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes(b.try_into().expect("length checked")))
    }

    fn u64(&mut self) -> CoreResult<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes(b.try_into().expect("length checked")))
    }

    fn bool(&mut self) -> CoreResult<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CoreError::DeserializationError(format!(
                "invalid bool byte {other}"
            ))),
        }
    }

    fn scalar(&mut self) -> CoreResult<Scalar> {
        let len = self.u8()? as usize;
        let bytes = self.take(len)?;
        Scalar::from_bytes_be(bytes)
    }

    fn curve_point(&mut self) -> CoreResult<CurvePoint> {
        let x = self.scalar()?;
        let y = self.scalar()?;
        CurvePoint::from_xy(x.as_biguint().clone(), y.as_biguint().clone())
    }

    fn at_end(&self) -> bool {
        self.pos == self.buf.len()
    }
}

fn write_scalar(out: &mut Vec<u8>, s: &Scalar) {
    let bytes = s.to_bytes_be();
    out.push(bytes.len() as u8);
    out.extend_from_slice(&bytes);
}

fn write_curve_point(out: &mut Vec<u8>, p: &CurvePoint) {
    write_scalar(out, &Scalar::from_biguint(p.x()));
    write_scalar(out, &Scalar::from_biguint(p.y()));
}

fn write_bool(out: &mut Vec<u8>, b: bool) {
    out.push(if b { 1 } else { 0 });
}

fn write_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn write_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

impl Scalar {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_scalar(&mut out, self);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let mut r = Reader::new(bytes);
        let s = r.scalar()?;
        if !r.at_end() {
            return Err(CoreError::DeserializationError("trailing bytes".into()));
        }
        Ok(s)
    }
}

impl CurvePoint {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_curve_point(&mut out, self);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let mut r = Reader::new(bytes);
        let p = r.curve_point()?;
        if !r.at_end() {
            return Err(CoreError::DeserializationError("trailing bytes".into()));
        }
        Ok(p)
    }
}

impl ShareKind {
    fn tag(self) -> u8 {
        match self {
            ShareKind::PrivateKeyShare => 0,
            ShareKind::LittleK => 1,
            ShareKind::Alpha => 2,
        }
    }

    fn from_tag(tag: u8) -> CoreResult<Self> {
        match tag {
            0 => Ok(ShareKind::PrivateKeyShare),
            1 => Ok(ShareKind::LittleK),
            2 => Ok(ShareKind::Alpha),
            other => Err(CoreError::DeserializationError(format!(
                "invalid ShareKind tag {other}"
            ))),
        }
    }
}

impl SecretShare {
    /// Encode this round's full local state, field order matching §3.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_u64(&mut out, self.id);
        out.push(self.kind().tag());

        write_u32(&mut out, self.ordinals().len() as u32);
        for o in self.ordinals() {
            write_scalar(&mut out, o);
        }
        write_u32(&mut out, self.own_index() as u32);

        write_u32(&mut out, self.evals().len() as u32);
        for e in self.evals() {
            write_scalar(&mut out, e);
        }
        write_u32(&mut out, self.hidden_evals().len() as u32);
        for e in self.hidden_evals() {
            write_curve_point(&mut out, e);
        }
        write_u32(&mut out, self.hidden_poly().len() as u32);
        for c in self.hidden_poly() {
            write_curve_point(&mut out, c);
        }

        write_bool_slice(&mut out, self.shared());
        write_opt_curve_vec_slice(&mut out, self.shared_poly());
        write_opt_curve_vec_slice(&mut out, self.shared_evals());

        write_bool_slice(&mut out, self.actual_eval_shared());
        write_opt_scalar_slice(&mut out, self.actual_evals());

        out
    }

    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let mut r = Reader::new(bytes);
        let id = r.u64()?;
        let kind = ShareKind::from_tag(r.u8()?)?;

        let n = r.u32()? as usize;
        let mut ordinals = Vec::with_capacity(n);
        for _ in 0..n {
            ordinals.push(r.scalar()?);
        }
        let own_index = r.u32()? as usize;

        let evals_len = r.u32()? as usize;
        let mut evals = Vec::with_capacity(evals_len);
        for _ in 0..evals_len {
            evals.push(r.scalar()?);
        }
        let hidden_evals_len = r.u32()? as usize;
        let mut hidden_evals = Vec::with_capacity(hidden_evals_len);
        for _ in 0..hidden_evals_len {
            hidden_evals.push(r.curve_point()?);
        }
        let hidden_poly_len = r.u32()? as usize;
        let mut hidden_poly = Vec::with_capacity(hidden_poly_len);
        for _ in 0..hidden_poly_len {
            hidden_poly.push(r.curve_point()?);
        }

        let shared = read_bool_vec(&mut r)?;
        let shared_poly = read_opt_curve_vec_vec(&mut r)?;
        let shared_evals = read_opt_curve_vec_vec(&mut r)?;

        let actual_eval_shared = read_bool_vec(&mut r)?;
        let actual_evals = read_opt_scalar_vec(&mut r)?;

        if !r.at_end() {
            return Err(CoreError::DeserializationError("trailing bytes".into()));
        }

        Ok(SecretShare::from_raw_parts(
            id,
            kind,
            ordinals,
            own_index,
            evals,
            hidden_evals,
            hidden_poly,
            shared,
            shared_poly,
            shared_evals,
            actual_eval_shared,
            actual_evals,
        ))
    }
}

fn write_bool_slice(out: &mut Vec<u8>, bools: &[bool]) {
    out.push(bools.len() as u8);
    for b in bools {
        write_bool(out, *b);
    }
}

fn read_bool_vec(r: &mut Reader) -> CoreResult<Vec<bool>> {
    let n = r.u8()? as usize;
    let mut v = Vec::with_capacity(n);
    for _ in 0..n {
        v.push(r.bool()?);
    }
    Ok(v)
}

fn write_opt_curve_vec_slice(out: &mut Vec<u8>, slots: &[Option<Vec<CurvePoint>>]) {
    write_u32(out, slots.len() as u32);
    for slot in slots {
        match slot {
            None => write_bool(out, false),
            Some(points) => {
                write_bool(out, true);
                write_u32(out, points.len() as u32);
                for p in points {
                    write_curve_point(out, p);
                }
            }
        }
    }
}

fn read_opt_curve_vec_vec(r: &mut Reader) -> CoreResult<Vec<Option<Vec<CurvePoint>>>> {
    let n = r.u32()? as usize;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        if r.bool()? {
            let len = r.u32()? as usize;
            let mut points = Vec::with_capacity(len);
            for _ in 0..len {
                points.push(r.curve_point()?);
            }
            out.push(Some(points));
        } else {
            out.push(None);
        }
    }
    Ok(out)
}

fn write_opt_scalar_slice(out: &mut Vec<u8>, slots: &[Option<Scalar>]) {
    write_u32(out, slots.len() as u32);
    for slot in slots {
        match slot {
            None => write_bool(out, false),
            Some(s) => {
                write_bool(out, true);
                write_scalar(out, s);
            }
        }
    }
}

fn read_opt_scalar_vec(r: &mut Reader) -> CoreResult<Vec<Option<Scalar>>> {
    let n = r.u32()? as usize;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        if r.bool()? {
            out.push(Some(r.scalar()?));
        } else {
            out.push(None);
        }
    }
    Ok(out)
}

impl Member {
    /// Encode this participant's full local state, field order per §6:
    /// `degree, ordinal_index, ordinals[], private_key_share_set,
    /// [private_key_share, public_key], private_key_shared[],
    /// private_key_shares[], pending_secret_shares[], ephemeral_keys[],
    /// next_ephemeral_id`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_u32(&mut out, self.params().degree());
        write_u32(&mut out, self.ordinal_index() as u32);

        write_u32(&mut out, self.params().ordinals().len() as u32);
        for o in self.params().ordinals() {
            write_scalar(&mut out, o);
        }

        write_bool(&mut out, self.private_key_share_set());
        if let Some(share) = self.private_key_share() {
            write_scalar(&mut out, share);
            write_curve_point(&mut out, self.public_key().expect("share implies public key"));
        }

        write_bool_slice(&mut out, self.private_key_shared());
        write_opt_scalar_slice(&mut out, self.private_key_shares());

        write_u32(&mut out, self.pending_secret_shares().len() as u32);
        for round in self.pending_secret_shares() {
            let bytes = round.to_bytes();
            write_u32(&mut out, bytes.len() as u32);
            out.extend_from_slice(&bytes);
        }

        write_u32(&mut out, self.ephemeral_keys().len() as u32);
        for ek in self.ephemeral_keys() {
            let bytes = ek.to_bytes();
            write_u32(&mut out, bytes.len() as u32);
            out.extend_from_slice(&bytes);
        }

        write_u64(&mut out, self.next_ephemeral_id());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let mut r = Reader::new(bytes);
        let degree = r.u32()?;
        let ordinal_index = r.u32()? as usize;

        let n = r.u32()? as usize;
        let mut ordinals = Vec::with_capacity(n);
        for _ in 0..n {
            ordinals.push(r.scalar()?);
        }
        let params = GroupParameters::new(degree, ordinals)
            .map_err(|e| CoreError::DeserializationError(e.to_string()))?;

        let private_key_share_set = r.bool()?;
        let (private_key_share, public_key) = if private_key_share_set {
            (Some(r.scalar()?), Some(r.curve_point()?))
        } else {
            (None, None)
        };

        let private_key_shared = read_bool_vec(&mut r)?;
        let private_key_shares = read_opt_scalar_vec(&mut r)?;

        let pending_len = r.u32()? as usize;
        let mut pending_secret_shares = Vec::with_capacity(pending_len);
        for _ in 0..pending_len {
            let len = r.u32()? as usize;
            let bytes = r.take(len)?;
            pending_secret_shares.push(SecretShare::from_bytes(bytes)?);
        }

        let eph_len = r.u32()? as usize;
        let mut ephemeral_keys = Vec::with_capacity(eph_len);
        for _ in 0..eph_len {
            let len = r.u32()? as usize;
            let bytes = r.take(len)?;
            ephemeral_keys.push(crate::ephemeral::EphemeralKey::from_bytes(bytes)?);
        }

        let next_ephemeral_id = r.u64()?;

        if !r.at_end() {
            return Err(CoreError::DeserializationError("trailing bytes".into()));
        }

        Ok(Member::from_raw_parts(
            params,
            ordinal_index,
            private_key_share,
            public_key,
            private_key_shared,
            private_key_shares,
            pending_secret_shares,
            ephemeral_keys,
            next_ephemeral_id,
        ))
    }
}

impl crate::ephemeral::EphemeralKey {
    /// Encode this nonce's local state: `id, degree, [little_k],
    /// [alpha], vw_shares[], [key], [sig_hash], is_used,
    /// signature_shares[]`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_u64(&mut out, self.id());
        write_u32(&mut out, self.degree());

        write_bool(&mut out, self.little_k().is_some());
        if let Some(k) = self.little_k() {
            write_scalar(&mut out, k);
        }
        write_bool(&mut out, self.alpha().is_some());
        if let Some(a) = self.alpha() {
            write_scalar(&mut out, a);
        }

        let vw = self.vw_shares();
        write_u32(&mut out, vw.len() as u32);
        for (ordinal, v, w) in &vw {
            write_scalar(&mut out, ordinal);
            write_scalar(&mut out, v);
            write_curve_point(&mut out, w);
        }

        write_bool(&mut out, self.key().is_some());
        if let Some(k) = self.key() {
            write_scalar(&mut out, k);
        }
        write_bool(&mut out, self.sig_hash().is_some());
        if let Some(h) = self.sig_hash() {
            write_scalar(&mut out, h);
        }

        write_bool(&mut out, self.is_used());

        let sigs = self.signature_shares();
        write_u32(&mut out, sigs.len() as u32);
        for (ordinal, s) in sigs {
            write_scalar(&mut out, ordinal);
            write_scalar(&mut out, s);
        }

        out
    }

    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let mut r = Reader::new(bytes);
        let id = r.u64()?;
        let degree = r.u32()?;

        let little_k = if r.bool()? { Some(r.scalar()?) } else { None };
        let alpha = if r.bool()? { Some(r.scalar()?) } else { None };

        let vw_len = r.u32()? as usize;
        let mut vw_shares = Vec::with_capacity(vw_len);
        for _ in 0..vw_len {
            let ordinal = r.scalar()?;
            let v = r.scalar()?;
            let w = r.curve_point()?;
            vw_shares.push((ordinal, v, w));
        }

        let key = if r.bool()? { Some(r.scalar()?) } else { None };
        let sig_hash = if r.bool()? { Some(r.scalar()?) } else { None };
        let is_used = r.bool()?;

        let sig_len = r.u32()? as usize;
        let mut signature_shares = Vec::with_capacity(sig_len);
        for _ in 0..sig_len {
            let ordinal = r.scalar()?;
            let s = r.scalar()?;
            signature_shares.push((ordinal, s));
        }

        if !r.at_end() {
            return Err(CoreError::DeserializationError("trailing bytes".into()));
        }

        Ok(crate::ephemeral::EphemeralKey::from_raw_parts(
            id,
            degree,
            little_k,
            alpha,
            vw_shares,
            key,
            sig_hash,
            is_used,
            signature_shares,
        ))
    }
}

/// A full group snapshot: the shared parameters plus every member's
/// state, keyed by ordinal. Used to persist or transmit the result of
/// an out-of-band group-formation ceremony (e.g. in test fixtures and
/// reference vectors); not a type the protocol itself constructs.
pub struct Group {
    pub params: GroupParameters,
    pub members: Vec<Member>,
}

impl Group {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_u32(&mut out, self.params.degree());
        write_u32(&mut out, self.params.ordinals().len() as u32);
        for o in self.params.ordinals() {
            write_scalar(&mut out, o);
        }
        write_u32(&mut out, self.members.len() as u32);
        for m in &self.members {
            let bytes = m.to_bytes();
            write_u32(&mut out, bytes.len() as u32);
            out.extend_from_slice(&bytes);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let mut r = Reader::new(bytes);
        let degree = r.u32()?;
        let n = r.u32()? as usize;
        let mut ordinals = Vec::with_capacity(n);
        for _ in 0..n {
            ordinals.push(r.scalar()?);
        }
        let params = GroupParameters::new(degree, ordinals)
            .map_err(|e| CoreError::DeserializationError(e.to_string()))?;

        let member_count = r.u32()? as usize;
        let mut members = Vec::with_capacity(member_count);
        for _ in 0..member_count {
            let len = r.u32()? as usize;
            let bytes = r.take(len)?;
            members.push(Member::from_bytes(bytes)?);
        }

        if !r.at_end() {
            return Err(CoreError::DeserializationError("trailing bytes".into()));
        }

        Ok(Group { params, members })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Scalar;
    use rand::rngs::OsRng;

    #[test]
    fn scalar_round_trips() {
        let s = Scalar::from_u32(123_456);
        assert_eq!(Scalar::from_bytes(&s.to_bytes()).unwrap(), s);

        let zero = Scalar::zero();
        assert_eq!(Scalar::from_bytes(&zero.to_bytes()).unwrap(), zero);
    }

    #[test]
    fn curve_point_round_trips() {
        let p = Scalar::from_u32(7).mul_by_generator();
        assert_eq!(CurvePoint::from_bytes(&p.to_bytes()).unwrap(), p);
    }

    #[test]
    fn truncated_buffer_is_a_deserialization_error() {
        let s = Scalar::from_u32(999);
        let mut bytes = s.to_bytes();
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(
            Scalar::from_bytes(&bytes),
            Err(CoreError::DeserializationError(_))
        ));
    }

    #[test]
    fn member_round_trips_before_key_share() {
        use crate::member::{GroupParameters, Member};

        let ords: Vec<Scalar> = (1..=4u32).map(Scalar::from_u32).collect();
        let params = GroupParameters::new(1, ords.clone()).unwrap();
        let m = Member::new(ords[0].clone(), params, OsRng).unwrap();

        let bytes = m.to_bytes();
        let back = Member::from_bytes(&bytes).unwrap();
        assert_eq!(back.to_bytes(), bytes);
    }

    #[test]
    fn secret_share_round_trips_with_partial_state() {
        let ords: Vec<Scalar> = (1..=3u32).map(Scalar::from_u32).collect();
        let mut rounds: Vec<SecretShare> = (0..3)
            .map(|i| SecretShare::new(0, ShareKind::PrivateKeyShare, 1, &ords, i, OsRng))
            .collect();

        // Only participant 0 has broadcast to, and privately delivered
        // to, participant 1 -- the round is not `shares_complete()`.
        let poly0 = rounds[0].hidden_poly().to_vec();
        let evals0 = rounds[0].hidden_evals().to_vec();
        rounds[1].add_share(0, poly0, evals0).unwrap();
        let v = rounds[0].eval_share(1).unwrap();
        rounds[1].add_eval_share(0, v).unwrap();

        let bytes = rounds[1].to_bytes();
        let decoded = SecretShare::from_bytes(&bytes).unwrap();
        assert!(!decoded.shares_complete());
        assert_eq!(decoded.to_bytes(), bytes);
    }

    #[test]
    fn ephemeral_key_round_trips_with_signature_state() {
        use crate::ephemeral::EphemeralKey;

        let mut key = EphemeralKey::new(7, 0);
        key.set_little_k(Scalar::from_u32(11));
        key.set_alpha(Scalar::from_u32(13));

        let own_ordinal = Scalar::from_u32(1);
        let (v, w) = key.get_vw_share(&own_ordinal).unwrap();
        key.add_vw_share_raw(Scalar::from_u32(2), v, w.x(), w.y())
            .unwrap();
        key.calculate_key().unwrap();

        let h = Scalar::from_u32(42);
        let private_key_share = Scalar::from_u32(5);
        let s = key
            .issue_signature_share(&own_ordinal, &private_key_share, &h)
            .unwrap();
        key.add_signature_share(&h, Scalar::from_u32(2), s).unwrap();

        let bytes = key.to_bytes();
        let decoded = EphemeralKey::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.to_bytes(), bytes);
    }

    #[test]
    fn member_round_trips_with_populated_state() {
        use crate::member::{GroupParameters, Member};

        let ords: Vec<Scalar> = (1..=3u32).map(Scalar::from_u32).collect();
        let mut members: Vec<Member> = ords
            .iter()
            .map(|o| {
                let params = GroupParameters::new(1, ords.clone()).unwrap();
                Member::new(o.clone(), params, OsRng).unwrap()
            })
            .collect();

        let n = members.len();
        for i in 0..n {
            let (poly, evals) = {
                let round = members[i].get_secret_share(0, ShareKind::PrivateKeyShare).unwrap();
                (round.hidden_poly().to_vec(), round.hidden_evals().to_vec())
            };
            for j in 0..n {
                if j != i {
                    members[j]
                        .get_secret_share_mut(0, ShareKind::PrivateKeyShare)
                        .unwrap()
                        .add_share(i, poly.clone(), evals.clone())
                        .unwrap();
                }
            }
        }
        for i in 0..n {
            for j in 0..n {
                if j != i {
                    let v = members[i]
                        .get_secret_share(0, ShareKind::PrivateKeyShare)
                        .unwrap()
                        .eval_share(j)
                        .unwrap();
                    members[j]
                        .get_secret_share_mut(0, ShareKind::PrivateKeyShare)
                        .unwrap()
                        .add_eval_share(i, v)
                        .unwrap();
                }
            }
        }
        for m in members.iter_mut() {
            m.finish_secret_share(0, ShareKind::PrivateKeyShare).unwrap();
        }

        // A recorded peer long-term share, and a started ephemeral key,
        // so `private_key_shares[]`, `pending_secret_shares[]`, and
        // `ephemeral_keys[]` are all non-empty too.
        let peer_share = members[1].private_key_share().unwrap().clone();
        members[0].add_private_key_share(1, peer_share).unwrap();
        members[0].start_ephemeral_key(OsRng);

        let bytes = members[0].to_bytes();
        let decoded = Member::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.to_bytes(), bytes);
    }

    #[test]
    fn group_round_trips() {
        use crate::member::{GroupParameters, Member};

        let ords: Vec<Scalar> = (1..=3u32).map(Scalar::from_u32).collect();
        let params = GroupParameters::new(1, ords.clone()).unwrap();
        let members: Vec<Member> = ords
            .iter()
            .map(|o| Member::new(o.clone(), params.clone(), OsRng).unwrap())
            .collect();

        let group = Group { params, members };
        let bytes = group.to_bytes();
        let decoded = Group::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.to_bytes(), bytes);
    }
}
