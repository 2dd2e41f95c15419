//! # JSON Web Signature (JWS)
//!
//! JWS ([RFC7515]) represents content secured with digital signatures using
//! JSON-based data structures. Cryptographic algorithms and identifiers for use
//! with this specification are described in the JWA ([RFC7518]) specification.
//!
//! Only the compact serialization is supported:
//!
//! ```text
//! base64url(header) '.' base64url(payload) '.' base64url(signature)
//! ```
//!
//! [RFC7515]: https://www.rfc-editor.org/rfc/rfc7515
//! [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518

use std::str::FromStr;

use base64ct::{Base64UrlUnpadded, Encoding};
use ecdsa::signature::{
    RandomizedSigner as _, SignatureEncoding as _, Signer as _, Verifier as _,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};

use crate::error::{Error, Result};
use crate::jose::jwa::Algorithm;
use crate::jose::key::{Curve, PrivateKey, PublicKey};

/// JWS protected header.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Protected {
    /// Digital signature algorithm identifier as per IANA "JSON Web Signature
    /// and Encryption Algorithms" registry.
    pub alg: Algorithm,

    /// Base64url encoded SHA-256 thumbprint of the signer's certificate.
    #[serde(rename = "x5t#S256", skip_serializing_if = "Option::is_none")]
    pub x5t_s256: Option<String>,

    /// Media type of the complete JWS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl Protected {
    /// Create a header for `alg` identifying the signer by certificate
    /// thumbprint.
    #[must_use]
    pub fn new(alg: Algorithm, thumbprint: impl Into<String>) -> Self {
        Self {
            alg,
            x5t_s256: Some(thumbprint.into()),
            typ: None,
        }
    }
}

/// Sign `payload` with `key`, returning a compact JWS.
///
/// # Errors
///
/// Returns [`Error::InvalidKey`] if `key` cannot produce `protected.alg`
/// signatures.
pub fn sign(protected: &Protected, payload: &[u8], key: &PrivateKey) -> Result<String> {
    tracing::debug!(alg = %protected.alg, "sign");

    let header = Base64UrlUnpadded::encode_string(&serde_json::to_vec(protected)?);
    let payload = Base64UrlUnpadded::encode_string(payload);
    let signature = signature(protected.alg, key, format!("{header}.{payload}").as_bytes())?;
    let signature = Base64UrlUnpadded::encode_string(&signature);

    Ok(format!("{header}.{payload}.{signature}"))
}

/// A compact JWS, parsed but not yet verified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Jws {
    /// The decoded protected header.
    pub protected: Protected,
    header: String,
    payload: String,
    signature: Vec<u8>,
}

impl Jws {
    /// Verify the signature with `public_key` using the header's algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SignatureInvalid`] if the signature does not verify
    /// or `public_key` cannot verify the header's algorithm.
    pub fn verify(&self, public_key: &PublicKey) -> Result<()> {
        tracing::debug!(alg = %self.protected.alg, "verify");

        let msg = format!("{}.{}", self.header, self.payload);
        verify(self.protected.alg, public_key, msg.as_bytes(), &self.signature)
    }

    /// The decoded payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedToken`] if the payload is not base64url.
    pub fn payload(&self) -> Result<Vec<u8>> {
        Base64UrlUnpadded::decode_vec(&self.payload)
            .map_err(|e| Error::malformed_token(format!("issue decoding payload: {e}")))
    }
}

impl FromStr for Jws {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts = s.split('.').collect::<Vec<&str>>();
        let [header, payload, signature] = parts.as_slice() else {
            return Err(Error::malformed_token("invalid Compact JWS format"));
        };

        let decoded = Base64UrlUnpadded::decode_vec(header)
            .map_err(|e| Error::malformed_token(format!("issue decoding header: {e}")))?;
        let protected = serde_json::from_slice(&decoded)
            .map_err(|e| Error::malformed_token(format!("issue deserializing header: {e}")))?;
        let signature = Base64UrlUnpadded::decode_vec(signature)
            .map_err(|e| Error::malformed_token(format!("issue decoding signature: {e}")))?;

        Ok(Self {
            protected,
            header: (*header).to_string(),
            payload: (*payload).to_string(),
            signature,
        })
    }
}

fn signature(alg: Algorithm, key: &PrivateKey, msg: &[u8]) -> Result<Vec<u8>> {
    let signature = match (alg, key) {
        (Algorithm::Rs256, PrivateKey::Rsa(key)) => {
            rsa::pkcs1v15::SigningKey::<Sha256>::new((**key).clone()).sign(msg).to_vec()
        }
        (Algorithm::Rs384, PrivateKey::Rsa(key)) => {
            rsa::pkcs1v15::SigningKey::<Sha384>::new((**key).clone()).sign(msg).to_vec()
        }
        (Algorithm::Rs512, PrivateKey::Rsa(key)) => {
            rsa::pkcs1v15::SigningKey::<Sha512>::new((**key).clone()).sign(msg).to_vec()
        }
        (Algorithm::Ps256, PrivateKey::Rsa(key)) => {
            let signing_key = rsa::pss::SigningKey::<Sha256>::new((**key).clone());
            signing_key.sign_with_rng(&mut OsRng, msg).to_vec()
        }
        (Algorithm::Ps384, PrivateKey::Rsa(key)) => {
            let signing_key = rsa::pss::SigningKey::<Sha384>::new((**key).clone());
            signing_key.sign_with_rng(&mut OsRng, msg).to_vec()
        }
        (Algorithm::Ps512, PrivateKey::Rsa(key)) => {
            let signing_key = rsa::pss::SigningKey::<Sha512>::new((**key).clone());
            signing_key.sign_with_rng(&mut OsRng, msg).to_vec()
        }
        (Algorithm::Es256, PrivateKey::P256(secret)) => {
            let signature: p256::ecdsa::Signature =
                p256::ecdsa::SigningKey::from(secret).sign(msg);
            signature.to_vec()
        }
        (Algorithm::Es384, PrivateKey::P384(secret)) => {
            let signature: p384::ecdsa::Signature =
                p384::ecdsa::SigningKey::from(secret).sign(msg);
            signature.to_vec()
        }
        (Algorithm::Es512, PrivateKey::P521(secret)) => {
            let signing_key = p521::ecdsa::SigningKey::from_bytes(&secret.to_bytes())
                .map_err(Error::invalid_key)?;
            let signature: p521::ecdsa::Signature = signing_key.sign(msg);
            signature.to_vec()
        }
        (Algorithm::Es256K, PrivateKey::Secp256k1(secret)) => {
            let signature: k256::ecdsa::Signature =
                k256::ecdsa::SigningKey::from(secret).sign(msg);
            signature.to_vec()
        }
        (alg, key) => {
            return Err(Error::InvalidKey(format!("{key:?} cannot sign {alg}")));
        }
    };
    Ok(signature)
}

fn verify(alg: Algorithm, public_key: &PublicKey, msg: &[u8], sig: &[u8]) -> Result<()> {
    let invalid = |e: ecdsa::signature::Error| Error::SignatureInvalid(e.to_string());

    match (alg, public_key) {
        (Algorithm::Rs256 | Algorithm::Rs384 | Algorithm::Rs512, PublicKey::Rsa(key)) => {
            let signature = rsa::pkcs1v15::Signature::try_from(sig).map_err(invalid)?;
            match alg {
                Algorithm::Rs256 => rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key.clone())
                    .verify(msg, &signature),
                Algorithm::Rs384 => rsa::pkcs1v15::VerifyingKey::<Sha384>::new(key.clone())
                    .verify(msg, &signature),
                _ => rsa::pkcs1v15::VerifyingKey::<Sha512>::new(key.clone())
                    .verify(msg, &signature),
            }
            .map_err(invalid)
        }
        (Algorithm::Ps256 | Algorithm::Ps384 | Algorithm::Ps512, PublicKey::Rsa(key)) => {
            let signature = rsa::pss::Signature::try_from(sig).map_err(invalid)?;
            match alg {
                Algorithm::Ps256 => {
                    rsa::pss::VerifyingKey::<Sha256>::new(key.clone()).verify(msg, &signature)
                }
                Algorithm::Ps384 => {
                    rsa::pss::VerifyingKey::<Sha384>::new(key.clone()).verify(msg, &signature)
                }
                _ => rsa::pss::VerifyingKey::<Sha512>::new(key.clone()).verify(msg, &signature),
            }
            .map_err(invalid)
        }
        (Algorithm::Es256, PublicKey::Ec { curve: Curve::P256, point }) => {
            let verifying_key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point).map_err(invalid)?;
            let signature = p256::ecdsa::Signature::from_slice(sig).map_err(invalid)?;
            verifying_key.verify(msg, &signature).map_err(invalid)
        }
        (Algorithm::Es384, PublicKey::Ec { curve: Curve::P384, point }) => {
            let verifying_key = p384::ecdsa::VerifyingKey::from_sec1_bytes(point).map_err(invalid)?;
            let signature = p384::ecdsa::Signature::from_slice(sig).map_err(invalid)?;
            verifying_key.verify(msg, &signature).map_err(invalid)
        }
        (Algorithm::Es512, PublicKey::Ec { curve: Curve::P521, point }) => {
            let verifying_key = p521::ecdsa::VerifyingKey::from_sec1_bytes(point).map_err(invalid)?;
            let signature = p521::ecdsa::Signature::from_slice(sig).map_err(invalid)?;
            verifying_key.verify(msg, &signature).map_err(invalid)
        }
        (Algorithm::Es256K, PublicKey::Ec { curve: Curve::Secp256k1, point }) => {
            let verifying_key = k256::ecdsa::VerifyingKey::from_sec1_bytes(point).map_err(invalid)?;
            let signature = k256::ecdsa::Signature::from_slice(sig).map_err(invalid)?;
            let normalized = signature.normalize_s().unwrap_or(signature);
            verifying_key.verify(msg, &normalized).map_err(invalid)
        }
        (alg, _) => {
            let key = public_key.descriptor();
            Err(Error::SignatureInvalid(format!(
                "{alg} cannot be verified with a {} key of {} bits",
                key.family, key.bits
            )))
        }
    }
}
