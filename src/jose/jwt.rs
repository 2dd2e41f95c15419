//! # JSON Web Token (JWT)
//!
//! JSON Web Token (JWT) is a compact, URL-safe means of representing
//! claims to be transferred between two parties.  The claims in a JWT
//! are encoded as a JSON object that is used as the payload of a JSON
//! Web Signature (JWS) structure or as the plaintext of a JSON Web
//! Encryption (JWE) structure, enabling the claims to be digitally
//! signed or integrity protected and/or encrypted.
//!
//! A [`JwtHandler`] is bound to one counterparty certificate and, optionally,
//! the local private key. Algorithms are chosen from the certificate's key;
//! callers never name them.

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::jose::key::{Certificate, PrivateKey};
use crate::jose::{TokenFormat, jwa, jwe, jws};

/// Creates and unwraps compact JWS and JWE tokens.
///
/// Signing uses the private key and advertises the certificate's thumbprint.
/// Encryption targets the certificate's public key.
#[derive(Clone, Debug)]
pub struct JwtHandler {
    private_key: Option<PrivateKey>,
    certificate: Certificate,
}

impl JwtHandler {
    /// Create a handler. Without a private key the handler can only verify
    /// and encrypt.
    #[must_use]
    pub const fn new(private_key: Option<PrivateKey>, certificate: Certificate) -> Self {
        Self {
            private_key,
            certificate,
        }
    }

    /// The certificate the handler is bound to.
    #[must_use]
    pub const fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Sign `payload` as a compact JWS.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SigningKeyMissing`] if the handler has no private key
    /// and [`Error::UnsupportedKeyType`] if no algorithm suits the
    /// certificate's key.
    pub fn create_signed(&self, payload: &[u8]) -> Result<String> {
        let Some(private_key) = &self.private_key else {
            return Err(Error::SigningKeyMissing);
        };

        let alg = jwa::signing_algorithm(&self.certificate.descriptor())?;
        tracing::debug!(%alg, "sign");

        let protected = jws::Protected::new(alg, self.certificate.thumbprint());
        jws::sign(&protected, payload, private_key)
    }

    /// Encrypt `payload` as a compact JWE for the certificate's key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedKeyType`] if no algorithm suits the
    /// certificate's key.
    pub fn create_encrypted(&self, payload: &[u8]) -> Result<String> {
        let alg = jwa::key_wrap_algorithm(&self.certificate.descriptor())?;
        let enc = jwa::content_algorithm();
        tracing::debug!(%alg, "encrypt");

        let protected = jwe::Protected::new(alg, enc, self.certificate.thumbprint());
        let jwe = jwe::encrypt(protected, payload, self.certificate.public_key())?;
        Ok(jwe.to_string())
    }

    /// Verify a compact JWS or decrypt a compact JWE, detected by its number
    /// of segments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] if the token is neither,
    /// [`Error::SignatureInvalid`] if a signature does not verify against the
    /// certificate, [`Error::DecryptionKeyMissing`] if a JWE arrives at a
    /// handler without a private key, and [`Error::DecryptionFailed`] if it
    /// cannot be decrypted.
    pub fn unwrap(&self, token: &str) -> Result<PlainJwt> {
        match TokenFormat::detect(token)? {
            TokenFormat::Jws => {
                tracing::debug!("unwrap signed token");
                let jws = token.parse::<jws::Jws>()?;
                jws.verify(self.certificate.public_key())?;

                Ok(PlainJwt {
                    operation: Operation::SignatureVerified,
                    payload: jws.payload()?,
                    header: Header::Jws(jws.protected),
                })
            }
            TokenFormat::Jwe => {
                tracing::debug!("unwrap encrypted token");
                let Some(private_key) = &self.private_key else {
                    return Err(Error::DecryptionKeyMissing);
                };
                let jwe = token.parse::<jwe::Jwe>()?;
                let payload = jwe::decrypt(&jwe, private_key)?;

                Ok(PlainJwt {
                    operation: Operation::Decrypted,
                    payload,
                    header: Header::Jwe(jwe.protected),
                })
            }
        }
    }
}

/// How the payload of a [`PlainJwt`] was recovered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// The token was a JWS whose signature verified.
    SignatureVerified,

    /// The token was a JWE that decrypted.
    Decrypted,
}

/// The protected header of an unwrapped token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Header {
    /// JWS header.
    Jws(jws::Protected),

    /// JWE header.
    Jwe(jwe::Protected),
}

/// The result of unwrapping a token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlainJwt {
    /// How the payload was recovered.
    pub operation: Operation,

    /// The token's protected header.
    pub header: Header,

    /// The recovered payload.
    pub payload: Vec<u8>,
}

impl PlainJwt {
    /// The payload as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] if the payload is not UTF-8.
    pub fn payload_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.payload).map_err(Error::malformed_token)
    }

    /// Deserialize the payload as JSON claims.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the payload does not deserialize to `T`.
    pub fn claims<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}
