//! # JWE Decryption

use aes_gcm::aead::KeyInit;
use aes_gcm::{AeadInPlace, Aes256Gcm, Key, Nonce, Tag};
use aes_kw::KekAes256;
use base64ct::{Base64UrlUnpadded, Encoding};
use elliptic_curve::sec1::{FromEncodedPoint, ModulusSize, ToEncodedPoint};
use elliptic_curve::{AffinePoint, CurveArithmetic, FieldBytesSize, SecretKey};
use rsa::Oaep;
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::jose::jwa::{ContentAlgorithm, KeyAlgorithm};
use crate::jose::jwe::{EphemeralKey, Jwe, concat_kdf};
use crate::jose::key::PrivateKey;

const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;

/// Decrypt the JWE and return the plaintext.
///
/// # Errors
///
/// Returns [`Error::DecryptionFailed`] if the key does not suit the header's
/// `alg`, the content encryption key cannot be recovered, or the
/// authentication tag does not match. Returns [`Error::MalformedToken`] if a
/// required header parameter or segment is missing or has the wrong length.
pub fn decrypt(jwe: &Jwe, private_key: &PrivateKey) -> Result<Vec<u8>> {
    let cek = unwrap_cek(jwe, private_key)?;

    if jwe.iv.len() != NONCE_LENGTH {
        return Err(Error::malformed_token(format!("`iv` must be {NONCE_LENGTH} bytes")));
    }
    if jwe.tag.len() != TAG_LENGTH {
        return Err(Error::malformed_token(format!("`tag` must be {TAG_LENGTH} bytes")));
    }
    if cek.len() != 32 {
        return Err(Error::DecryptionFailed("content encryption key must be 32 bytes".into()));
    }

    // decrypt ciphertext using CEK, iv, aad, and tag
    let mut buffer = jwe.ciphertext.clone();
    match jwe.protected.enc {
        ContentAlgorithm::A256Gcm => Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&cek))
            .decrypt_in_place_detached(
                Nonce::from_slice(&jwe.iv),
                jwe.header.as_bytes(),
                &mut buffer,
                Tag::from_slice(&jwe.tag),
            )
            .map_err(|e| Error::DecryptionFailed(format!("issue decrypting: {e}")))?,
    }

    Ok(buffer)
}

fn unwrap_cek(jwe: &Jwe, private_key: &PrivateKey) -> Result<Zeroizing<Vec<u8>>> {
    let alg = jwe.protected.alg;

    let shared_secret = match (alg, private_key) {
        (KeyAlgorithm::RsaOaep512, PrivateKey::Rsa(key)) => {
            let cek = key
                .decrypt(Oaep::new::<Sha512>(), &jwe.encrypted_key)
                .map_err(|e| Error::DecryptionFailed(format!("issue decrypting cek: {e}")))?;
            return Ok(Zeroizing::new(cek));
        }
        (KeyAlgorithm::EcdhEsA256Kw, PrivateKey::P256(secret)) => agree(jwe, secret)?,
        (KeyAlgorithm::EcdhEsA256Kw, PrivateKey::P384(secret)) => agree(jwe, secret)?,
        (KeyAlgorithm::EcdhEsA256Kw, PrivateKey::P521(secret)) => agree(jwe, secret)?,
        (alg, key) => {
            return Err(Error::DecryptionFailed(format!("{key:?} cannot be used with {alg}")));
        }
    };

    // unwrap CEK with the key derived from the shared secret
    let kek = concat_kdf(&shared_secret, alg);
    let cek = KekAes256::from(*kek)
        .unwrap_vec(&jwe.encrypted_key)
        .map_err(|e| Error::DecryptionFailed(format!("issue unwrapping cek: {e}")))?;

    Ok(Zeroizing::new(cek))
}

// Static-ephemeral Diffie-Hellman with the sender's `epk`.
fn agree<C>(jwe: &Jwe, secret: &SecretKey<C>) -> Result<Zeroizing<Vec<u8>>>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let Some(epk) = &jwe.protected.epk else {
        return Err(Error::malformed_token("missing `epk` header parameter"));
    };
    let sender_public = sender_public::<C>(epk)?;

    let shared_secret =
        elliptic_curve::ecdh::diffie_hellman(secret.to_nonzero_scalar(), sender_public.as_affine());
    Ok(Zeroizing::new(shared_secret.raw_secret_bytes().to_vec()))
}

// Rebuild the sender's ephemeral public key from its JWK coordinates.
fn sender_public<C>(epk: &EphemeralKey) -> Result<elliptic_curve::PublicKey<C>>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let decode = |name: &str, coord: &str| {
        Base64UrlUnpadded::decode_vec(coord)
            .map_err(|e| Error::malformed_token(format!("issue decoding `epk.{name}`: {e}")))
    };

    // uncompressed SEC1 point: 0x04 || x || y
    let mut point = vec![0x04];
    point.extend(decode("x", &epk.x)?);
    point.extend(decode("y", &epk.y)?);

    elliptic_curve::PublicKey::<C>::from_sec1_bytes(&point)
        .map_err(|e| Error::DecryptionFailed(format!("invalid `epk` for {}: {e}", epk.crv)))
}
