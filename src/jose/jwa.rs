//! # JSON Web Algorithms (JWA)
//!
//! Algorithm identifiers from [RFC7518] and the rules for choosing one from
//! the shape of a key. Selection works on a [`KeyDescriptor`] rather than on
//! key material so it can be reasoned about without certificates.
//!
//! [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::jose::key::Curve;

/// Digital signature algorithms (`alg` of a JWS).
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256.
    #[serde(rename = "RS256")]
    Rs256,

    /// RSASSA-PKCS1-v1_5 using SHA-384.
    #[serde(rename = "RS384")]
    Rs384,

    /// RSASSA-PKCS1-v1_5 using SHA-512.
    #[serde(rename = "RS512")]
    Rs512,

    /// RSASSA-PSS using SHA-256 and MGF1 with SHA-256.
    #[serde(rename = "PS256")]
    Ps256,

    /// RSASSA-PSS using SHA-384 and MGF1 with SHA-384.
    #[serde(rename = "PS384")]
    Ps384,

    /// RSASSA-PSS using SHA-512 and MGF1 with SHA-512.
    #[serde(rename = "PS512")]
    Ps512,

    /// ECDSA using P-256 and SHA-256.
    #[serde(rename = "ES256")]
    Es256,

    /// ECDSA using secp256k1 and SHA-256.
    #[serde(rename = "ES256K")]
    Es256K,

    /// ECDSA using P-384 and SHA-384.
    #[serde(rename = "ES384")]
    Es384,

    /// ECDSA using P-521 and SHA-512.
    #[serde(rename = "ES512")]
    Es512,
}

impl Algorithm {
    /// The key family able to produce and verify this algorithm.
    #[must_use]
    pub const fn family(self) -> KeyFamily {
        match self {
            Self::Rs256
            | Self::Rs384
            | Self::Rs512
            | Self::Ps256
            | Self::Ps384
            | Self::Ps512 => KeyFamily::Rsa,
            Self::Es256 | Self::Es256K | Self::Es384 | Self::Es512 => KeyFamily::Ec,
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
            Self::Es256 => "ES256",
            Self::Es256K => "ES256K",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
        };
        f.write_str(s)
    }
}

/// The algorithm used to encrypt or agree upon the content encryption key
/// (`alg` of a JWE).
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    /// RSAES OAEP using SHA-512 and MGF1 with SHA-512.
    #[serde(rename = "RSA-OAEP-512")]
    RsaOaep512,

    /// ECDH-ES using Concat KDF and CEK wrapped with "A256KW".
    #[serde(rename = "ECDH-ES+A256KW")]
    EcdhEsA256Kw,
}

impl Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::RsaOaep512 => f.write_str("RSA-OAEP-512"),
            Self::EcdhEsA256Kw => f.write_str("ECDH-ES+A256KW"),
        }
    }
}

/// The algorithm used to perform authenticated encryption of the payload
/// (`enc` of a JWE).
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum ContentAlgorithm {
    /// AES GCM using a 256-bit key.
    #[default]
    #[serde(rename = "A256GCM")]
    A256Gcm,
}

/// Broad class of a public key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    /// RSA.
    Rsa,

    /// Elliptic curve.
    Ec,

    /// Anything else, named by its algorithm.
    Other(String),
}

impl Display for KeyFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Rsa => f.write_str("RSA"),
            Self::Ec => f.write_str("EC"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// The properties of a public key that drive algorithm selection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyDescriptor {
    /// Key family.
    pub family: KeyFamily,

    /// Key size in bits: the modulus for RSA, the field for EC.
    pub bits: usize,

    /// Named curve, for EC keys.
    pub curve: Option<Curve>,
}

/// Select the JWS algorithm for a key.
///
/// RSA keys always sign with RS512. EC keys select by size: 256 bits is
/// ES256, or ES256K on secp256k1; 384 bits is ES384; 521 bits is ES512.
///
/// # Errors
///
/// Returns [`Error::UnsupportedKeyType`] for any other key.
pub fn signing_algorithm(key: &KeyDescriptor) -> Result<Algorithm> {
    match (&key.family, key.bits) {
        (KeyFamily::Rsa, _) => Ok(Algorithm::Rs512),
        (KeyFamily::Ec, 256) if key.curve == Some(Curve::Secp256k1) => Ok(Algorithm::Es256K),
        (KeyFamily::Ec, 256) => Ok(Algorithm::Es256),
        (KeyFamily::Ec, 384) => Ok(Algorithm::Es384),
        (KeyFamily::Ec, 521) => Ok(Algorithm::Es512),
        (KeyFamily::Ec, bits) => Err(Error::UnsupportedKeyType(format!("EC key of {bits} bits"))),
        (KeyFamily::Other(name), _) => Err(Error::UnsupportedKeyType(name.clone())),
    }
}

/// Select the JWE key management algorithm for a key: RSA-OAEP-512 for RSA,
/// ECDH-ES+A256KW for EC.
///
/// secp256k1 keys are not rejected here even though key agreement over that
/// curve is not supported; encryption to such a key fails later.
///
/// # Errors
///
/// Returns [`Error::UnsupportedKeyType`] for any other key family.
pub fn key_wrap_algorithm(key: &KeyDescriptor) -> Result<KeyAlgorithm> {
    match &key.family {
        KeyFamily::Rsa => Ok(KeyAlgorithm::RsaOaep512),
        KeyFamily::Ec => Ok(KeyAlgorithm::EcdhEsA256Kw),
        KeyFamily::Other(name) => Err(Error::UnsupportedKeyType(name.clone())),
    }
}

/// The JWE content encryption algorithm. Always A256GCM.
#[must_use]
pub const fn content_algorithm() -> ContentAlgorithm {
    ContentAlgorithm::A256Gcm
}

#[cfg(test)]
mod test {
    use super::*;

    fn ec(bits: usize, curve: Option<Curve>) -> KeyDescriptor {
        KeyDescriptor {
            family: KeyFamily::Ec,
            bits,
            curve,
        }
    }

    #[test]
    fn rsa_signs_with_rs512() {
        for bits in [2048, 3072, 4096] {
            let key = KeyDescriptor {
                family: KeyFamily::Rsa,
                bits,
                curve: None,
            };
            assert_eq!(signing_algorithm(&key).expect("should select"), Algorithm::Rs512);
            assert_eq!(key_wrap_algorithm(&key).expect("should select"), KeyAlgorithm::RsaOaep512);
        }
    }

    #[test]
    fn ec_by_size() {
        let cases = [
            (ec(256, Some(Curve::P256)), Algorithm::Es256),
            (ec(256, None), Algorithm::Es256),
            (ec(256, Some(Curve::Secp256k1)), Algorithm::Es256K),
            (ec(384, Some(Curve::P384)), Algorithm::Es384),
            (ec(521, Some(Curve::P521)), Algorithm::Es512),
        ];
        for (key, expected) in cases {
            assert_eq!(signing_algorithm(&key).expect("should select"), expected);
            let wrap = key_wrap_algorithm(&key).expect("should select");
            assert_eq!(wrap, KeyAlgorithm::EcdhEsA256Kw);
        }
    }

    #[test]
    fn unsupported() {
        let err = signing_algorithm(&ec(512, None)).expect_err("should fail");
        assert!(matches!(err, Error::UnsupportedKeyType(_)));

        let dsa = KeyDescriptor {
            family: KeyFamily::Other("DSA".into()),
            bits: 2048,
            curve: None,
        };
        let err = signing_algorithm(&dsa).expect_err("should fail");
        assert!(matches!(err, Error::UnsupportedKeyType(name) if name == "DSA"));
        assert!(matches!(key_wrap_algorithm(&dsa), Err(Error::UnsupportedKeyType(_))));
    }

    #[test]
    fn wire_names() {
        assert_eq!(serde_json::to_value(Algorithm::Es256K).expect("should serialize"), "ES256K");
        assert_eq!(
            serde_json::to_value(KeyAlgorithm::EcdhEsA256Kw).expect("should serialize"),
            "ECDH-ES+A256KW"
        );
        let enc = serde_json::to_value(ContentAlgorithm::A256Gcm).expect("should serialize");
        assert_eq!(enc, "A256GCM");
        assert_eq!(Algorithm::Rs512.to_string(), "RS512");
        let alg: Algorithm = serde_json::from_value("PS384".into()).expect("should deserialize");
        assert_eq!((alg, alg.family()), (Algorithm::Ps384, KeyFamily::Rsa));
    }
}
