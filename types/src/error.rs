use thiserror::Error as ThisError;

/// Failure returned by every `sign` and `verify` call.
///
/// Deliberately coarse: the first failure found (innermost embedded structure first) aborts
/// the call, and callers apply one policy per kind.
#[derive(Debug, ThisError, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A recomputed header or payload digest does not match the stored one.
    #[error("digest verification failed")]
    DigestVerification,
    /// The signature does not validate, or a signing precondition was not met.
    #[error("signature verification failed")]
    SignatureVerification,
    /// A field is longer than its decoder accepts. Only returned when signing.
    #[error("{0} exceeds its encoding limit")]
    LimitExceeded(&'static str),
}
