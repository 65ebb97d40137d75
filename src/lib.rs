//! A threshold-ECDSA engine over secp256k1: joint key generation via
//! Joint Verifiable Random Secret Sharing (JVRSS), optional
//! reconstruction of the full private key from a threshold of shares,
//! and distributed assembly of a single, standard ECDSA signature
//! without any participant ever learning the private key or the
//! per-signature nonce.
//!
//! The moving pieces, leaves first:
//! - [`field`] / [`curve`]: modular arithmetic over the secp256k1
//!   scalar field and thin wrappers over curve points.
//! - [`polynomial`]: random polynomial sampling, Horner evaluation,
//!   and Lagrange interpolation (scalar and elliptic-curve).
//! - [`secret_share`]: one JVRSS round -- the correctness and honesty
//!   checks that let a group of participants jointly agree on a
//!   random secret without any one of them learning it.
//! - [`member`]: a single participant's persistent state: its
//!   long-term key share, pending rounds, and ephemeral-key registry.
//! - [`ephemeral`]: a per-signature nonce's lifecycle, from the k/α
//!   JVRSS rounds through the VW exchange to a verified signature.
//! - [`ecdsa`]: verification of the assembled signature.
//! - [`codec`]: deterministic binary encoding of every persistent type.

pub mod codec;
pub mod curve;
pub mod ecdsa;
pub mod ephemeral;
pub mod error;
pub mod field;
pub mod member;
pub mod polynomial;
pub mod secret_share;

pub use codec::Group;
pub use curve::{CurvePoint, Scalar};
pub use ephemeral::{EphemeralKey, EphemeralKeyState};
pub use error::{CoreError, CoreResult};
pub use member::{GroupParameters, Member};
pub use polynomial::Polynomial;
pub use secret_share::{SecretShare, ShareKind};
