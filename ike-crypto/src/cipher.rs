//! Non-AEAD encryption: 3DES-CBC and AES-CBC, RFC 7296 section 3.14 combined
//! with RFC 4303's pad-length-only validation rule.

use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use ike_wire::params::EncryptionAlgorithm;

use crate::CryptoError;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes192CbcEnc = cbc::Encryptor<aes::Aes192>;
type Aes192CbcDec = cbc::Decryptor<aes::Aes192>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Des3CbcEnc = cbc::Encryptor<des::TdesEde3>;
type Des3CbcDec = cbc::Decryptor<des::TdesEde3>;

/// Block size in bytes for `algorithm`
pub fn block_size(algorithm: EncryptionAlgorithm) -> usize {
    match algorithm {
        EncryptionAlgorithm::TripleDesCbc => 8,
        _ => 16,
    }
}

/// IV length in bytes for `algorithm`, equal to the block size for CBC modes
pub fn iv_len(algorithm: EncryptionAlgorithm) -> usize {
    block_size(algorithm)
}

/// Pad `plaintext` to a block boundary, appending arbitrary-valued padding
/// octets and a final pad-length octet, RFC 7296 section 3.14. `block_size`
/// of `1` yields RFC 5282 section 3's zero-length combined-mode padding: no
/// padding octets, just the trailing Pad Length byte itself.
pub(crate) fn pad(plaintext: &[u8], block_size: usize) -> Vec<u8> {
    let mut padded = plaintext.to_vec();
    let remainder = (padded.len() + 1) % block_size;
    let pad_len = if remainder == 0 { 0 } else { block_size - remainder };
    padded.extend(std::iter::repeat(0u8).take(pad_len));
    padded.push(pad_len as u8);
    padded
}

/// Strip padding, trusting only the final pad-length octet per RFC 4303
pub(crate) fn unpad(padded: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let &pad_len_byte = padded.last().ok_or(CryptoError::DecryptionFailure)?;
    let pad_len = pad_len_byte as usize;
    let total_trim = pad_len + 1;
    if total_trim > padded.len() {
        return Err(CryptoError::DecryptionFailure);
    }
    Ok(padded[..padded.len() - total_trim].to_vec())
}

/// Encrypt `plaintext` under `algorithm`, returning the padded ciphertext
/// (same length as the padded plaintext, no IV or ICV attached)
pub fn encrypt(
    algorithm: EncryptionAlgorithm,
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let padded = pad(plaintext, block_size(algorithm));
    let key_len_error = || CryptoError::InvalidKeyLength {
        expected: key.len(),
        actual: key.len(),
    };

    let ciphertext = match algorithm {
        EncryptionAlgorithm::TripleDesCbc => Des3CbcEnc::new_from_slices(key, iv)
            .map_err(|_| key_len_error())?
            .encrypt_padded_vec_mut::<NoPadding>(&padded),
        EncryptionAlgorithm::AesCbc => match key.len() {
            16 => Aes128CbcEnc::new_from_slices(key, iv)
                .map_err(|_| key_len_error())?
                .encrypt_padded_vec_mut::<NoPadding>(&padded),
            24 => Aes192CbcEnc::new_from_slices(key, iv)
                .map_err(|_| key_len_error())?
                .encrypt_padded_vec_mut::<NoPadding>(&padded),
            32 => Aes256CbcEnc::new_from_slices(key, iv)
                .map_err(|_| key_len_error())?
                .encrypt_padded_vec_mut::<NoPadding>(&padded),
            _ => return Err(key_len_error()),
        },
        _ => return Err(CryptoError::UnsupportedAlgorithm("not a CBC encryption transform")),
    };

    Ok(ciphertext)
}

/// Decrypt `ciphertext` under `algorithm` and strip padding
pub fn decrypt(
    algorithm: EncryptionAlgorithm,
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() || ciphertext.len() % block_size(algorithm) != 0 {
        return Err(CryptoError::DecryptionFailure);
    }
    let key_len_error = || CryptoError::InvalidKeyLength {
        expected: key.len(),
        actual: key.len(),
    };

    let padded = match algorithm {
        EncryptionAlgorithm::TripleDesCbc => Des3CbcDec::new_from_slices(key, iv)
            .map_err(|_| key_len_error())?
            .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
            .map_err(|_| CryptoError::DecryptionFailure)?,
        EncryptionAlgorithm::AesCbc => match key.len() {
            16 => Aes128CbcDec::new_from_slices(key, iv)
                .map_err(|_| key_len_error())?
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .map_err(|_| CryptoError::DecryptionFailure)?,
            24 => Aes192CbcDec::new_from_slices(key, iv)
                .map_err(|_| key_len_error())?
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .map_err(|_| CryptoError::DecryptionFailure)?,
            32 => Aes256CbcDec::new_from_slices(key, iv)
                .map_err(|_| key_len_error())?
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .map_err(|_| CryptoError::DecryptionFailure)?,
            _ => return Err(key_len_error()),
        },
        _ => return Err(CryptoError::UnsupportedAlgorithm("not a CBC encryption transform")),
    };

    unpad(&padded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aes_cbc_round_trips() {
        let key = [0x11u8; 16];
        let iv = [0x22u8; 16];
        let plaintext = b"IKE_AUTH inner payload chain bytes go here";
        let ciphertext = encrypt(EncryptionAlgorithm::AesCbc, &key, &iv, plaintext).unwrap();
        let decrypted = decrypt(EncryptionAlgorithm::AesCbc, &key, &iv, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn triple_des_cbc_round_trips() {
        let key = [0x33u8; 24];
        let iv = [0x44u8; 8];
        let plaintext = b"legacy gateway payload";
        let ciphertext = encrypt(EncryptionAlgorithm::TripleDesCbc, &key, &iv, plaintext).unwrap();
        let decrypted = decrypt(EncryptionAlgorithm::TripleDesCbc, &key, &iv, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn decrypt_rejects_non_block_aligned_ciphertext() {
        let key = [0u8; 16];
        let iv = [0u8; 16];
        assert!(decrypt(EncryptionAlgorithm::AesCbc, &key, &iv, &[0u8; 5]).is_err());
    }
}
