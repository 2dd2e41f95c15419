//! # JSON Object Signing and Encryption (JOSE)
//!
//! Compact JWS [RFC7515] and JWE [RFC7516] tokens for transporting reports
//! between two parties identified by X.509 certificates.
//!
//! Algorithms are selected from the counterparty certificate's key (see
//! [`jwa`]) and every header carries the certificate's SHA-256 thumbprint in
//! `x5t#S256`.
//!
//! ```json
//! {
//!   "alg": "ES256",
//!   "x5t#S256": "Kf6x0Yv5ZUQ1P2Y3dH3n1u6Lz3qWqgRa5o7GvGm7H0k"
//! }
//! ```
//!
//! [RFC7515]: https://www.rfc-editor.org/rfc/rfc7515
//! [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516

pub mod jwa;
pub mod jwe;
pub mod jws;
pub mod jwt;
pub mod key;

pub use jwa::{Algorithm, ContentAlgorithm, KeyAlgorithm, KeyDescriptor, KeyFamily};
pub use jwe::Jwe;
pub use jws::Jws;
pub use jwt::{Header, JwtHandler, Operation, PlainJwt};
pub use key::{Certificate, Curve, PrivateKey, PublicKey};

use crate::error::{Error, Result};

/// The compact serialization a token uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenFormat {
    /// Three segments: header, payload, signature.
    Jws,

    /// Five segments: header, encrypted key, iv, ciphertext, tag.
    Jwe,
}

impl TokenFormat {
    /// Detect the format of a compact token from its number of dot-separated
    /// segments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] for any count other than three or
    /// five.
    pub fn detect(token: &str) -> Result<Self> {
        match token.split('.').count() {
            3 => Ok(Self::Jws),
            5 => Ok(Self::Jwe),
            n => Err(Error::MalformedToken(format!("compact token has {n} segments"))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detect() {
        assert_eq!(TokenFormat::detect("a.b.c").expect("jws"), TokenFormat::Jws);
        assert_eq!(TokenFormat::detect("a..c").expect("jws"), TokenFormat::Jws);
        assert_eq!(TokenFormat::detect("a.b.c.d.e").expect("jwe"), TokenFormat::Jwe);

        for token in ["", "abc", "a.b", "a.b.c.d", "a.b.c.d.e.f"] {
            assert!(matches!(TokenFormat::detect(token), Err(Error::MalformedToken(_))));
        }
    }
}
