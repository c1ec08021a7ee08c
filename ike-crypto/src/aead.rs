//! AES-GCM authenticated encryption, RFC 7296 section 3.14 combined with
//! RFC 4106's salt/explicit-IV nonce construction and short-ICV variants.

use aes_gcm::aead::consts::{U12, U16, U8};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::AesGcm;

use ike_wire::params::EncryptionAlgorithm;

use crate::CryptoError;

/// Length in bytes of the explicit per-message IV carried on the wire
pub const EXPLICIT_IV_LEN: usize = 8;
/// Length in bytes of the salt taken from the tail of the derived encryption key
pub const SALT_LEN: usize = 4;

/// ICV length in bytes for one of the AES-GCM variants
pub fn tag_len(algorithm: EncryptionAlgorithm) -> usize {
    match algorithm {
        EncryptionAlgorithm::AesGcm8 => 8,
        EncryptionAlgorithm::AesGcm12 => 12,
        EncryptionAlgorithm::AesGcm16 => 16,
        _ => 0,
    }
}

/// Split a derived AEAD encryption key into its cipher key and 4-byte salt
pub fn split_key_and_salt(key_with_salt: &[u8]) -> Result<(&[u8], &[u8]), CryptoError> {
    if key_with_salt.len() <= SALT_LEN {
        return Err(CryptoError::InvalidKeyLength {
            expected: SALT_LEN + 16,
            actual: key_with_salt.len(),
        });
    }
    let split = key_with_salt.len() - SALT_LEN;
    Ok((&key_with_salt[..split], &key_with_salt[split..]))
}

fn build_nonce(salt: &[u8], explicit_iv: &[u8]) -> Vec<u8> {
    let mut nonce = Vec::with_capacity(SALT_LEN + EXPLICIT_IV_LEN);
    nonce.extend_from_slice(salt);
    nonce.extend_from_slice(explicit_iv);
    nonce
}

macro_rules! gcm_dispatch {
    ($algorithm:expr, $key:expr, $nonce:expr, $aad:expr, $input:expr, $op:ident) => {{
        let tag = tag_len($algorithm);
        match ($key.len(), tag) {
            (16, 8) => $op::<AesGcm<aes::Aes128, U12, U8>>($key, $nonce, $aad, $input),
            (16, 12) => $op::<AesGcm<aes::Aes128, U12, U12>>($key, $nonce, $aad, $input),
            (16, 16) => $op::<AesGcm<aes::Aes128, U12, U16>>($key, $nonce, $aad, $input),
            (24, 8) => $op::<AesGcm<aes::Aes192, U12, U8>>($key, $nonce, $aad, $input),
            (24, 12) => $op::<AesGcm<aes::Aes192, U12, U12>>($key, $nonce, $aad, $input),
            (24, 16) => $op::<AesGcm<aes::Aes192, U12, U16>>($key, $nonce, $aad, $input),
            (32, 8) => $op::<AesGcm<aes::Aes256, U12, U8>>($key, $nonce, $aad, $input),
            (32, 12) => $op::<AesGcm<aes::Aes256, U12, U12>>($key, $nonce, $aad, $input),
            (32, 16) => $op::<AesGcm<aes::Aes256, U12, U16>>($key, $nonce, $aad, $input),
            (len, _) => Err(CryptoError::InvalidKeyLength {
                expected: 16,
                actual: len,
            }),
        }
    }};
}

fn seal_with<C>(key: &[u8], nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    C: KeyInit + Aead,
{
    let cipher = C::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: key.len(),
        actual: key.len(),
    })?;
    cipher
        .encrypt(
            nonce.into(),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CryptoError::UnsupportedAlgorithm("AEAD seal failed"))
}

fn open_with<C>(key: &[u8], nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    C: KeyInit + Aead,
{
    let cipher = C::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: key.len(),
        actual: key.len(),
    })?;
    cipher
        .decrypt(
            nonce.into(),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::DecryptionFailure)
}

/// Seal `plaintext` under `algorithm`, returning ciphertext with the AEAD
/// tag appended (truncated to the algorithm's ICV length)
pub fn seal(
    algorithm: EncryptionAlgorithm,
    key_with_salt: &[u8],
    explicit_iv: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let (key, salt) = split_key_and_salt(key_with_salt)?;
    let nonce = build_nonce(salt, explicit_iv);
    gcm_dispatch!(algorithm, key, &nonce, aad, plaintext, seal_with)
}

/// Open `ciphertext` (with its appended tag) under `algorithm`, verifying
/// the tag before returning the plaintext
pub fn open(
    algorithm: EncryptionAlgorithm,
    key_with_salt: &[u8],
    explicit_iv: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let (key, salt) = split_key_and_salt(key_with_salt)?;
    let nonce = build_nonce(salt, explicit_iv);
    gcm_dispatch!(algorithm, key, &nonce, aad, ciphertext, open_with)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aes_gcm_16_round_trips() {
        let key_with_salt = [0x42u8; 20]; // 16 byte key + 4 byte salt
        let iv = [0x01u8; EXPLICIT_IV_LEN];
        let aad = b"IKE header bytes";
        let plaintext = b"inner payload chain";
        let sealed = seal(EncryptionAlgorithm::AesGcm16, &key_with_salt, &iv, aad, plaintext).unwrap();
        let opened = open(EncryptionAlgorithm::AesGcm16, &key_with_salt, &iv, aad, &sealed).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn aes_gcm_8_tag_is_truncated() {
        let key_with_salt = [0x11u8; 20];
        let iv = [0x02u8; EXPLICIT_IV_LEN];
        let plaintext = b"short tag variant";
        let sealed = seal(EncryptionAlgorithm::AesGcm8, &key_with_salt, &iv, b"", plaintext).unwrap();
        assert_eq!(sealed.len(), plaintext.len() + 8);
    }

    #[test]
    fn aes_gcm_rejects_tampered_ciphertext() {
        let key_with_salt = [0x33u8; 20];
        let iv = [0x03u8; EXPLICIT_IV_LEN];
        let plaintext = b"tamper check";
        let mut sealed = seal(EncryptionAlgorithm::AesGcm16, &key_with_salt, &iv, b"", plaintext).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(open(EncryptionAlgorithm::AesGcm16, &key_with_salt, &iv, b"", &sealed).is_err());
    }
}
