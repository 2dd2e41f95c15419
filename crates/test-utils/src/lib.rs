//! # Test Utilities
//!
//! Key pairs and X.509 certificates for each supported key type. Each
//! certificate is issued by a throwaway P-256 key; nothing validates the
//! chain.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Result, anyhow};
use rand::rngs::OsRng;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use x509_cert::builder::{Builder, CertificateBuilder, Profile};
use x509_cert::der::{Encode, EncodePem};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::Validity;

const ISSUER: &str = "CN=Test Issuer,O=Identification Report,C=DE";
const VALIDITY: Duration = Duration::from_secs(60 * 60 * 24);

static FIXTURES: LazyLock<HashMap<KeyType, Fixture>> = LazyLock::new(|| {
    KeyType::ALL
        .into_iter()
        .map(|key_type| (key_type, generate(key_type).expect("should generate fixture")))
        .collect()
});

/// Key types with fixtures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// RSA, 2048 bits.
    Rsa,

    /// EC on P-256.
    P256,

    /// EC on P-384.
    P384,

    /// EC on P-521.
    P521,

    /// EC on secp256k1.
    Secp256k1,
}

impl KeyType {
    /// Every key type.
    pub const ALL: [Self; 5] = [Self::Rsa, Self::P256, Self::P384, Self::P521, Self::Secp256k1];
}

/// A private key and the certificate for its public key.
#[derive(Clone, Debug)]
pub struct Fixture {
    /// The key type.
    pub key_type: KeyType,

    /// PKCS#8 DER encoded private key.
    pub pkcs8_der: Vec<u8>,

    /// PKCS#8 PEM encoded private key.
    pub pkcs8_pem: String,

    /// DER encoded certificate.
    pub certificate_der: Vec<u8>,

    /// PEM encoded certificate.
    pub certificate_pem: String,
}

/// The shared fixture for `key_type`, generated on first use.
#[must_use]
pub fn fixture(key_type: KeyType) -> &'static Fixture {
    &FIXTURES[&key_type]
}

/// Generate a fresh fixture for `key_type`.
///
/// # Errors
///
/// Returns an error if key generation or certificate issuance fails.
pub fn generate(key_type: KeyType) -> Result<Fixture> {
    let (pkcs8_der, pkcs8_pem, public_der) = match key_type {
        KeyType::Rsa => {
            let key = rsa::RsaPrivateKey::new(&mut OsRng, 2048)?;
            let public = key.to_public_key();
            encode(&key, &public)?
        }
        KeyType::P256 => {
            let key = p256::SecretKey::random(&mut OsRng);
            encode(&key, &key.public_key())?
        }
        KeyType::P384 => {
            let key = p384::SecretKey::random(&mut OsRng);
            encode(&key, &key.public_key())?
        }
        KeyType::P521 => {
            let key = p521::SecretKey::random(&mut OsRng);
            encode(&key, &key.public_key())?
        }
        KeyType::Secp256k1 => {
            let key = k256::SecretKey::random(&mut OsRng);
            encode(&key, &key.public_key())?
        }
    };

    let subject = format!("CN={key_type:?} Subject,O=Identification Report,C=DE");
    let certificate = issue(&subject, &public_der)?;

    Ok(Fixture {
        key_type,
        pkcs8_der,
        pkcs8_pem,
        certificate_der: certificate.to_der().map_err(der_error)?,
        certificate_pem: certificate.to_pem(LineEnding::LF).map_err(der_error)?,
    })
}

// PKCS#8 DER and PEM for the private key, SPKI DER for the public key.
fn encode(
    private: &impl EncodePrivateKey, public: &impl EncodePublicKey,
) -> Result<(Vec<u8>, String, Vec<u8>)> {
    let der = private.to_pkcs8_der().map_err(|e| anyhow!("issue encoding key: {e}"))?;
    let pem =
        private.to_pkcs8_pem(LineEnding::LF).map_err(|e| anyhow!("issue encoding key: {e}"))?;
    let public = public.to_public_key_der().map_err(|e| anyhow!("issue encoding key: {e}"))?;
    Ok((der.as_bytes().to_vec(), pem.as_str().to_owned(), public.as_bytes().to_vec()))
}

// Issue a leaf certificate for the SPKI, signed by a throwaway P-256 issuer.
fn issue(subject: &str, public_der: &[u8]) -> Result<x509_cert::Certificate> {
    let issuer_key = p256::ecdsa::SigningKey::random(&mut OsRng);

    let profile = Profile::Leaf {
        issuer: Name::from_str(ISSUER).map_err(der_error)?,
        enable_key_agreement: true,
        enable_key_encipherment: true,
    };
    let serial_number = SerialNumber::new(&[0x01, 0x42]).map_err(der_error)?;
    let validity = Validity::from_now(VALIDITY).map_err(der_error)?;
    let subject = Name::from_str(subject).map_err(der_error)?;
    let spki = SubjectPublicKeyInfoOwned::try_from(public_der)
        .map_err(|e| anyhow!("issue decoding public key: {e}"))?;

    let builder =
        CertificateBuilder::new(profile, serial_number, validity, subject, spki, &issuer_key)
            .map_err(|e| anyhow!("issue creating certificate builder: {e}"))?;
    builder
        .build::<p256::ecdsa::DerSignature>()
        .map_err(|e| anyhow!("issue building certificate: {e}"))
}

fn der_error(e: x509_cert::der::Error) -> anyhow::Error {
    anyhow!("issue encoding certificate: {e}")
}
