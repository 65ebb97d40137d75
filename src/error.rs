//! Error taxonomy for the threshold-ECDSA core.
//!
//! Every fallible operation in this crate returns one of these variants
//! unmodified to its caller; none are retried internally. A round or
//! ephemeral key on which an error is raised is considered poisoned by
//! the caller and must be discarded (the type system does not enforce
//! this, since the core has no notion of "this value must never be
//! touched again").

use thiserror::Error;

/// Errors produced by the JVRSS / threshold-signing core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A byte buffer did not have the length a primitive expected.
    #[error("wrong size: expected {expected}, got {actual}")]
    WrongSize {
        /// The size the caller expected.
        expected: usize,
        /// The size actually observed.
        actual: usize,
    },

    /// Malformed input to a low-level primitive (e.g. an inverse of zero).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Not enough ordinals, key shares, or signature shares were supplied.
    #[error("threshold not met: need {needed}, have {have}")]
    ThresholdNotMet {
        /// The number of contributions required.
        needed: usize,
        /// The number actually available.
        have: usize,
    },

    /// An ordinal supplied by a peer is not a member of this group.
    #[error("ordinal {0} is not a member of this group")]
    OrdinalNotFound(u32),

    /// Peer `peer`'s hidden evaluations disagree with its hidden polynomial.
    #[error("participant {0} failed the correctness check")]
    NotCorrect(u32),

    /// Peer `from`'s unhidden evaluation delivered to `to` disagrees with
    /// its hidden broadcast, or a cross-participant eval/poly pair does
    /// not reconcile.
    #[error("participant {from} is dishonest towards participant {to}")]
    Dishonest {
        /// The index of the peer whose contribution failed to reconcile.
        from: u32,
        /// The index of the peer who detected the mismatch.
        to: u32,
    },

    /// A derived or reconstructed curve point fails the curve equation.
    #[error("point is not on the secp256k1 curve")]
    NotOnCurve,

    /// An ephemeral key was reused for a different message.
    #[error("ephemeral key already bound to a different message hash")]
    SigHashMismatch,

    /// A reconstructed private key or assembled signature failed its
    /// final public-key verification.
    #[error("reconstructed key material failed verification")]
    InvalidShares,

    /// Inconsistent repeat delivery, or an operation invoked while the
    /// round or ephemeral key is in the wrong state.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The binary codec of the persistence layer failed to encode a value.
    #[error("failed to serialize value")]
    SerializationError,

    /// The binary codec of the persistence layer failed to decode a value.
    #[error("failed to deserialize value: {0}")]
    DeserializationError(String),
}

/// Convenience alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;
