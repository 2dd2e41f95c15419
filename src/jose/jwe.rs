//! # JSON Web Encryption (JWE)
//!
//! JWE ([RFC7516]) specifies how encrypted content can be represented using
//! JSON. See JWA ([RFC7518]) for more on the cyptographic algorithms and
//! identifiers used.
//!
//! Supported key management algorithms are `RSA-OAEP-512` for RSA recipients
//! and `ECDH-ES+A256KW` for EC recipients on P-256, P-384, and P-521. Content
//! is always encrypted with `A256GCM`.
//!
//! ## Example
//!
//! A protected header for an EC recipient:
//!
//!```json
//! {
//!     "alg":"ECDH-ES+A256KW",
//!     "enc":"A256GCM",
//!     "x5t#S256":"Kf6x0Yv5ZUQ1P2Y3dH3n1u6Lz3qWqgRa5o7GvGm7H0k",
//!     "epk": {
//!          "kty":"EC",
//!          "crv":"P-256",
//!          "x":"gI0GAILBdu7T53akrFmMyGcsF3n5dO7MmwNBHKW5SV0",
//!          "y":"SLW_xSffzlPWrHEVI30DHM_4egVwt3NQqeUD7nMFpps"
//!     }
//! }
//! ```
//!
//! [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516
//! [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518

mod decrypt;
mod encrypt;

use std::fmt::{self, Display};
use std::str::FromStr;

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

pub use self::decrypt::decrypt;
pub use self::encrypt::encrypt;
use crate::error::{Error, Result};
use crate::jose::jwa::{ContentAlgorithm, KeyAlgorithm};
use crate::jose::key::Curve;

/// JWE protected header.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Protected {
    /// Identifies the algorithm used to encrypt or determine the value of the
    /// content encryption key (CEK).
    pub alg: KeyAlgorithm,

    /// The algorithm used to perform authenticated encryption on the plaintext
    /// to produce the ciphertext and the Authentication Tag.
    pub enc: ContentAlgorithm,

    /// Base64url encoded SHA-256 thumbprint of the recipient's certificate.
    #[serde(rename = "x5t#S256", skip_serializing_if = "Option::is_none")]
    pub x5t_s256: Option<String>,

    /// The ephemeral public key created by the originator for use in key
    /// agreement algorithms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epk: Option<EphemeralKey>,
}

impl Protected {
    /// Create a header for `alg` and `enc` identifying the recipient by
    /// certificate thumbprint.
    #[must_use]
    pub fn new(alg: KeyAlgorithm, enc: ContentAlgorithm, thumbprint: impl Into<String>) -> Self {
        Self {
            alg,
            enc,
            x5t_s256: Some(thumbprint.into()),
            epk: None,
        }
    }
}

/// Ephemeral EC public key, as a JWK.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct EphemeralKey {
    /// Key type. Always `EC`.
    pub kty: String,

    /// Curve of the key.
    pub crv: Curve,

    /// Base64url encoded x coordinate.
    pub x: String,

    /// Base64url encoded y coordinate.
    pub y: String,
}

/// A compact JWE.
///
/// ```text
/// base64url(header) '.' base64url(encrypted key) '.' base64url(iv)
///     '.' base64url(ciphertext) '.' base64url(tag)
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Jwe {
    /// The decoded protected header.
    pub protected: Protected,

    // the header segment exactly as received; it is the AAD
    header: String,
    encrypted_key: Vec<u8>,
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    tag: Vec<u8>,
}

impl Display for Jwe {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let header = &self.header;
        let encrypted_key = Base64UrlUnpadded::encode_string(&self.encrypted_key);
        let iv = Base64UrlUnpadded::encode_string(&self.iv);
        let ciphertext = Base64UrlUnpadded::encode_string(&self.ciphertext);
        let tag = Base64UrlUnpadded::encode_string(&self.tag);

        write!(f, "{header}.{encrypted_key}.{iv}.{ciphertext}.{tag}")
    }
}

impl FromStr for Jwe {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts = s.split('.').collect::<Vec<&str>>();
        let [header, encrypted_key, iv, ciphertext, tag] = parts.as_slice() else {
            return Err(Error::malformed_token("invalid Compact JWE format"));
        };

        let decode = |name: &str, segment: &str| {
            Base64UrlUnpadded::decode_vec(segment)
                .map_err(|e| Error::malformed_token(format!("issue decoding `{name}`: {e}")))
        };

        let protected = serde_json::from_slice(&decode("header", header)?)
            .map_err(|e| Error::malformed_token(format!("issue deserializing header: {e}")))?;

        Ok(Self {
            protected,
            header: (*header).to_string(),
            encrypted_key: decode("encrypted_key", encrypted_key)?,
            iv: decode("iv", iv)?,
            ciphertext: decode("ciphertext", ciphertext)?,
            tag: decode("tag", tag)?,
        })
    }
}

// Concat KDF ([RFC7518] section 4.6.2) with SHA-256, deriving a 256-bit key
// for `alg` with empty PartyUInfo and PartyVInfo.
fn concat_kdf(shared_secret: &[u8], alg: KeyAlgorithm) -> Zeroizing<[u8; 32]> {
    let alg = alg.to_string();
    let alg_len = u32::try_from(alg.len()).unwrap_or(u32::MAX);

    let mut hasher = Sha256::new();
    hasher.update(1u32.to_be_bytes());
    hasher.update(shared_secret);
    hasher.update(alg_len.to_be_bytes());
    hasher.update(alg.as_bytes());
    hasher.update(0u32.to_be_bytes());
    hasher.update(0u32.to_be_bytes());
    hasher.update(256u32.to_be_bytes());

    Zeroizing::new(hasher.finalize().into())
}

#[cfg(test)]
mod test {
    use rand::rngs::OsRng;
    use rsa::{RsaPrivateKey, RsaPublicKey};

    use super::*;
    use crate::jose::key::{PrivateKey, PublicKey};

    const PLAINTEXT: &[u8] = b"The true sign of intelligence is not knowledge but imagination.";

    fn ec_pair(curve: Curve) -> (PrivateKey, PublicKey) {
        let (private, point) = match curve {
            Curve::P256 => {
                let secret = p256::SecretKey::random(&mut OsRng);
                let point = secret.public_key().to_sec1_bytes().to_vec();
                (PrivateKey::P256(secret), point)
            }
            Curve::P384 => {
                let secret = p384::SecretKey::random(&mut OsRng);
                let point = secret.public_key().to_sec1_bytes().to_vec();
                (PrivateKey::P384(secret), point)
            }
            Curve::P521 => {
                let secret = p521::SecretKey::random(&mut OsRng);
                let point = secret.public_key().to_sec1_bytes().to_vec();
                (PrivateKey::P521(secret), point)
            }
            Curve::Secp256k1 => {
                let secret = k256::SecretKey::random(&mut OsRng);
                let point = secret.public_key().to_sec1_bytes().to_vec();
                (PrivateKey::Secp256k1(secret), point)
            }
        };
        (private, PublicKey::Ec { curve, point })
    }

    // round trip: encrypt and then decrypt
    #[test]
    fn ec_round_trip() {
        for curve in [Curve::P256, Curve::P384, Curve::P521] {
            let (private, public) = ec_pair(curve);
            let protected =
                Protected::new(KeyAlgorithm::EcdhEsA256Kw, ContentAlgorithm::A256Gcm, "thumb");

            let jwe = encrypt(protected, PLAINTEXT, &public).expect("should encrypt");
            assert_eq!(jwe.protected.epk.as_ref().map(|epk| epk.crv), Some(curve));

            let parsed: Jwe = jwe.to_string().parse().expect("should parse");
            assert_eq!(parsed, jwe);

            let decrypted = decrypt(&parsed, &private).expect("should decrypt");
            assert_eq!(decrypted.as_slice(), PLAINTEXT);
        }
    }

    #[test]
    fn rsa_round_trip() {
        let private = RsaPrivateKey::new(&mut OsRng, 2048).expect("should generate");
        let public = PublicKey::Rsa(RsaPublicKey::from(&private));
        let protected =
            Protected::new(KeyAlgorithm::RsaOaep512, ContentAlgorithm::A256Gcm, "thumb");

        let jwe = encrypt(protected, PLAINTEXT, &public).expect("should encrypt");
        assert!(jwe.protected.epk.is_none());

        let decrypted =
            decrypt(&jwe, &PrivateKey::Rsa(Box::new(private))).expect("should decrypt");
        assert_eq!(decrypted.as_slice(), PLAINTEXT);
    }

    #[test]
    fn secp256k1_agreement_unsupported() {
        let (_, public) = ec_pair(Curve::Secp256k1);
        let protected =
            Protected::new(KeyAlgorithm::EcdhEsA256Kw, ContentAlgorithm::A256Gcm, "thumb");
        let err = encrypt(protected, PLAINTEXT, &public).expect_err("should fail");
        assert!(matches!(err, Error::UnsupportedKeyType(_)));
    }

    #[test]
    fn wrong_key() {
        let (_, public) = ec_pair(Curve::P256);
        let (other, _) = ec_pair(Curve::P256);
        let protected =
            Protected::new(KeyAlgorithm::EcdhEsA256Kw, ContentAlgorithm::A256Gcm, "thumb");

        let jwe = encrypt(protected, PLAINTEXT, &public).expect("should encrypt");
        assert!(matches!(decrypt(&jwe, &other), Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn tampered_header() {
        let (private, public) = ec_pair(Curve::P256);
        let protected =
            Protected::new(KeyAlgorithm::EcdhEsA256Kw, ContentAlgorithm::A256Gcm, "thumb");
        let mut jwe = encrypt(protected, PLAINTEXT, &public).expect("should encrypt");

        // same header semantics, different AAD
        let mut header = jwe.protected.clone();
        header.x5t_s256 = Some("other".into());
        jwe.header = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&header).expect("json"));

        assert!(matches!(decrypt(&jwe, &private), Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn malformed() {
        assert!(matches!("a.b.c".parse::<Jwe>(), Err(Error::MalformedToken(_))));
        assert!(matches!("!!.a.b.c.d".parse::<Jwe>(), Err(Error::MalformedToken(_))));
    }
}
