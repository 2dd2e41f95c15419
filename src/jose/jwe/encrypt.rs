//! # JWE Encryption

use aes_gcm::aead::KeyInit;
use aes_gcm::{AeadCore, AeadInPlace, Aes256Gcm, Key};
use aes_kw::KekAes256;
use base64ct::{Base64UrlUnpadded, Encoding};
use elliptic_curve::ecdh::EphemeralSecret;
use elliptic_curve::sec1::{FromEncodedPoint, ModulusSize, ToEncodedPoint};
use elliptic_curve::{AffinePoint, CurveArithmetic, FieldBytesSize};
use rand::RngCore;
use rand::rngs::OsRng;
use rsa::{Oaep, RsaPublicKey};
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::jose::jwa::{ContentAlgorithm, KeyAlgorithm};
use crate::jose::jwe::{EphemeralKey, Jwe, Protected, concat_kdf};
use crate::jose::key::{Curve, PublicKey};

/// Encrypt `payload` for the holder of `public_key`.
///
/// The header's `alg` must suit the key: `RSA-OAEP-512` for RSA keys and
/// `ECDH-ES+A256KW` for EC keys. Any `epk` in `protected` is replaced.
///
/// # Errors
///
/// Returns [`Error::UnsupportedKeyType`] if the key cannot be used with the
/// header's `alg`, including EC keys on secp256k1, and [`Error::InvalidKey`]
/// if the key material is unusable.
pub fn encrypt(mut protected: Protected, payload: &[u8], public_key: &PublicKey) -> Result<Jwe> {
    match (protected.alg, public_key) {
        (KeyAlgorithm::RsaOaep512, PublicKey::Rsa(key)) => {
            encrypt_with(protected, payload, &RsaOaep512::new(key))
        }
        (KeyAlgorithm::EcdhEsA256Kw, PublicKey::Ec { curve, point }) => {
            let alg = EcdhEsA256Kw::new(*curve, point)?;
            protected.epk = Some(alg.epk.clone());
            encrypt_with(protected, payload, &alg)
        }
        (alg, key) => {
            let family = key.descriptor().family;
            Err(Error::UnsupportedKeyType(format!("{family} key cannot be used with {alg}")))
        }
    }
}

fn encrypt_with(protected: Protected, payload: &[u8], alg: &impl Algorithm) -> Result<Jwe> {
    let header = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&protected)?);

    let mut cek = Zeroizing::new([0u8; 32]);
    OsRng.fill_bytes(cek.as_mut());
    let encrypted_key = alg.wrap(&cek[..])?;

    // the ASCII header segment is the additional authenticated data
    let mut buffer = payload.to_vec();
    let (iv, tag) = match protected.enc {
        ContentAlgorithm::A256Gcm => {
            let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
            let tag = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(cek.as_ref()))
                .encrypt_in_place_detached(&nonce, header.as_bytes(), &mut buffer)
                .map_err(|e| Error::InvalidKey(format!("issue encrypting: {e}")))?;
            (nonce.to_vec(), tag.to_vec())
        }
    };

    Ok(Jwe {
        protected,
        header,
        encrypted_key,
        iv,
        ciphertext: buffer,
        tag,
    })
}

// Trait to allow for differences in the encryption process for different Key
// Management Algorithms ("alg" parameter).
trait Algorithm {
    // Encrypt (wrap) the Content Encryption Key (CEK) for the recipient.
    fn wrap(&self, cek: &[u8]) -> Result<Vec<u8>>;
}

// ----------------
// RSA-OAEP-512
// ----------------
struct RsaOaep512<'a> {
    public_key: &'a RsaPublicKey,
}

impl<'a> RsaOaep512<'a> {
    const fn new(public_key: &'a RsaPublicKey) -> Self {
        Self { public_key }
    }
}

impl Algorithm for RsaOaep512<'_> {
    fn wrap(&self, cek: &[u8]) -> Result<Vec<u8>> {
        self.public_key
            .encrypt(&mut OsRng, Oaep::new::<Sha512>(), cek)
            .map_err(|e| Error::InvalidKey(format!("issue encrypting cek: {e}")))
    }
}

// ----------------
// ECDH-ES+A256KW
// ----------------
struct EcdhEsA256Kw {
    epk: EphemeralKey,
    kek: Zeroizing<[u8; 32]>,
}

impl EcdhEsA256Kw {
    fn new(curve: Curve, point: &[u8]) -> Result<Self> {
        let (shared_secret, epk) = match curve {
            Curve::P256 => agree::<p256::NistP256>(curve, point)?,
            Curve::P384 => agree::<p384::NistP384>(curve, point)?,
            Curve::P521 => agree::<p521::NistP521>(curve, point)?,
            Curve::Secp256k1 => {
                return Err(Error::UnsupportedKeyType(format!(
                    "{} key agreement over {curve}",
                    KeyAlgorithm::EcdhEsA256Kw
                )));
            }
        };

        Ok(Self {
            epk,
            kek: concat_kdf(&shared_secret, KeyAlgorithm::EcdhEsA256Kw),
        })
    }
}

impl Algorithm for EcdhEsA256Kw {
    fn wrap(&self, cek: &[u8]) -> Result<Vec<u8>> {
        KekAes256::from(*self.kek)
            .wrap_vec(cek)
            .map_err(|e| Error::InvalidKey(format!("issue wrapping cek: {e}")))
    }
}

// Ephemeral-static Diffie-Hellman with the recipient's key. Returns the shared
// secret and the ephemeral public key.
fn agree<C>(curve: Curve, point: &[u8]) -> Result<(Zeroizing<Vec<u8>>, EphemeralKey)>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let recipient =
        elliptic_curve::PublicKey::<C>::from_sec1_bytes(point).map_err(Error::invalid_key)?;

    let ephemeral_secret = EphemeralSecret::<C>::random(&mut OsRng);
    let shared_secret = ephemeral_secret.diffie_hellman(&recipient);
    let ephemeral_public = ephemeral_secret.public_key().to_encoded_point(false);

    let (Some(x), Some(y)) = (ephemeral_public.x(), ephemeral_public.y()) else {
        return Err(Error::InvalidKey("ephemeral key is the identity".into()));
    };

    let epk = EphemeralKey {
        kty: "EC".into(),
        crv: curve,
        x: Base64UrlUnpadded::encode_string(x),
        y: Base64UrlUnpadded::encode_string(y),
    };

    Ok((Zeroizing::new(shared_secret.raw_secret_bytes().to_vec()), epk))
}
