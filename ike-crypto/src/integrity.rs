//! Integrity checksum computation and verification, RFC 7296 section 3.10's
//! transform IDs bound to actual MAC algorithms.

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use hmac::Mac;
use subtle::ConstantTimeEq;

use ike_wire::params::IntegrityAlgorithm;

use crate::CryptoError;

type HmacSha1 = hmac::Hmac<sha1::Sha1>;
type HmacSha256 = hmac::Hmac<sha2::Sha256>;
type HmacSha384 = hmac::Hmac<sha2::Sha384>;
type HmacSha512 = hmac::Hmac<sha2::Sha512>;

fn hmac_digest<D: Mac>(mac: Result<D, hmac::digest::InvalidLength>, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut mac = mac.map_err(|_| CryptoError::UnsupportedAlgorithm("hmac key"))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Compute the full (untruncated) checksum for `algorithm` over `data` with `key`
pub fn compute_full(algorithm: IntegrityAlgorithm, key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match algorithm {
        IntegrityAlgorithm::None => Ok(Vec::new()),
        IntegrityAlgorithm::HmacSha1_96 => hmac_digest(HmacSha1::new_from_slice(key), data),
        IntegrityAlgorithm::HmacSha2_256_128 => hmac_digest(HmacSha256::new_from_slice(key), data),
        IntegrityAlgorithm::HmacSha2_384_192 => hmac_digest(HmacSha384::new_from_slice(key), data),
        IntegrityAlgorithm::HmacSha2_512_256 => hmac_digest(HmacSha512::new_from_slice(key), data),
        IntegrityAlgorithm::AesXcbc96 => {
            let key16: [u8; 16] = key.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: 16,
                actual: key.len(),
            })?;
            Ok(xcbc_mac_128(&key16, data).to_vec())
        }
    }
}

/// Compute the algorithm-specific truncated checksum used on the wire
pub fn compute(algorithm: IntegrityAlgorithm, key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let full = compute_full(algorithm, key, data)?;
    Ok(full[..algorithm.checksum_len()].to_vec())
}

/// Verify a received checksum in constant time
pub fn verify(
    algorithm: IntegrityAlgorithm,
    key: &[u8],
    data: &[u8],
    expected: &[u8],
) -> Result<(), CryptoError> {
    if expected.len() != algorithm.checksum_len() {
        return Err(CryptoError::IntegrityFailure);
    }
    let computed = compute(algorithm, key, data)?;
    if computed.ct_eq(expected).into() {
        Ok(())
    } else {
        Err(CryptoError::IntegrityFailure)
    }
}

/// AES-XCBC-MAC-128 core, RFC 3566, returning the full 128-bit MAC
///
/// `AUTH_AES_XCBC_96` truncates this to 96 bits; `PRF_AES128_XCBC` (see
/// [crate::prf]) uses the full output and its own key-adjustment rule.
pub(crate) fn xcbc_mac_128(key: &[u8; 16], message: &[u8]) -> [u8; 16] {
    let cipher = aes::Aes128::new(GenericArray::from_slice(key));

    let derive = |byte: u8| {
        let mut block = GenericArray::clone_from_slice(&[byte; 16]);
        cipher.encrypt_block(&mut block);
        block
    };
    let k1 = derive(0x01);
    let k2 = derive(0x02);
    let k3 = derive(0x03);

    let cipher1 = aes::Aes128::new(&k1);

    let mut blocks: Vec<[u8; 16]> = message.chunks(16).map(|c| {
        let mut b = [0u8; 16];
        b[..c.len()].copy_from_slice(c);
        b
    }).collect();
    let last_was_full = !message.is_empty() && message.len() % 16 == 0;

    if blocks.is_empty() {
        blocks.push([0u8; 16]);
    }

    let last_index = blocks.len() - 1;
    let last_block = &mut blocks[last_index];
    let pad_key = if last_was_full { k2 } else { k3 };
    if !last_was_full {
        let used = message.len() % 16;
        last_block[used] = 0x80;
        for b in last_block.iter_mut().skip(used + 1) {
            *b = 0;
        }
    }
    for (byte, pad) in last_block.iter_mut().zip(pad_key.iter()) {
        *byte ^= pad;
    }

    let mut state = [0u8; 16];
    for block in &blocks {
        let mut input = GenericArray::clone_from_slice(block);
        for (i, b) in input.iter_mut().enumerate() {
            *b ^= state[i];
        }
        cipher1.encrypt_block(&mut input);
        state.copy_from_slice(input.as_slice());
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sha1_96_truncates_to_12_bytes() {
        let checksum = compute(IntegrityAlgorithm::HmacSha1_96, &[0u8; 20], b"hello").unwrap();
        assert_eq!(checksum.len(), 12);
    }

    #[test]
    fn verify_rejects_flipped_bit() {
        let key = [1u8; 20];
        let data = b"IKE_SA_INIT body bytes";
        let mut checksum = compute(IntegrityAlgorithm::HmacSha1_96, &key, data).unwrap();
        checksum[0] ^= 0x01;
        assert!(verify(IntegrityAlgorithm::HmacSha1_96, &key, data, &checksum).is_err());
    }

    #[test]
    fn verify_accepts_correct_checksum() {
        let key = [1u8; 32];
        let data = b"SA2 payload bytes";
        let checksum = compute(IntegrityAlgorithm::HmacSha2_256_128, &key, data).unwrap();
        assert!(verify(IntegrityAlgorithm::HmacSha2_256_128, &key, data, &checksum).is_ok());
    }

    #[test]
    fn xcbc_mac_is_deterministic() {
        let key = [0x2bu8; 16];
        let a = xcbc_mac_128(&key, b"some message body");
        let b = xcbc_mac_128(&key, b"some message body");
        assert_eq!(a, b);
    }
}
