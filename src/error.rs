//! # Errors
//!
//! Every fallible operation in the crate returns [`Result`]. Validation
//! failures are not errors: a failed validation is reported through a
//! [`crate::schema::ValidationResult`].

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while loading schemas, decoding reports, or processing
/// tokens.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema location could not be loaded by the schema source.
    #[error("schema resource not found at `{location}`: {reason}")]
    ResourceNotFound {
        /// Logical location requested.
        location: String,
        /// Underlying cause.
        reason: String,
    },

    /// The schema document is not JSON, not a valid schema, or lacks a
    /// required member such as `$id`.
    #[error("schema at `{location}` is malformed: {reason}")]
    SchemaMalformed {
        /// Logical location of the offending schema.
        location: String,
        /// Underlying cause.
        reason: String,
    },

    /// A `subjectRef` is present but its type cannot be determined from
    /// `subjectRefType`. `None` when the hint is missing altogether.
    #[error("unknown subject type: {}", .0.as_deref().unwrap_or("<missing subjectRefType>"))]
    UnknownSubjectType(Option<String>),

    /// The certificate's public key has no matching algorithm.
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// A signature was requested but no private key was configured.
    #[error("no private key available for signing")]
    SigningKeyMissing,

    /// An encrypted token was received but no private key was configured.
    #[error("no private key available for decryption")]
    DecryptionKeyMissing,

    /// The token signature does not verify against the certificate.
    #[error("signature is invalid: {0}")]
    SignatureInvalid(String),

    /// The token is not a well-formed compact JWS or JWE.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// `levelOfAssurance` holds a value outside the closed set.
    #[error("unrecognized level of assurance: `{0}`")]
    LevelOfAssuranceUnrecognized(String),

    /// Key or certificate material could not be parsed or used.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The content encryption key could not be unwrapped or the ciphertext
    /// failed authentication.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// JSON (de)serialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed_token(reason: impl std::fmt::Display) -> Self {
        Self::MalformedToken(reason.to_string())
    }

    pub(crate) fn invalid_key(reason: impl std::fmt::Display) -> Self {
        Self::InvalidKey(reason.to_string())
    }
}
