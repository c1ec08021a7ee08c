//! Pseudorandom Function bindings and the PRF+ key-expansion construction,
//! RFC 7296 section 2.13.

use hmac::Mac;

use ike_wire::params::PseudorandomFunction;

use crate::integrity::xcbc_mac_128;
use crate::CryptoError;

type HmacSha1 = hmac::Hmac<sha1::Sha1>;
type HmacSha256 = hmac::Hmac<sha2::Sha256>;
type HmacSha384 = hmac::Hmac<sha2::Sha384>;
type HmacSha512 = hmac::Hmac<sha2::Sha512>;

/// Output length in bytes of a single application of `prf`
pub fn output_len(prf: PseudorandomFunction) -> usize {
    match prf {
        PseudorandomFunction::HmacSha1 => 20,
        PseudorandomFunction::Aes128Xcbc => 16,
        PseudorandomFunction::HmacSha2_256 => 32,
        PseudorandomFunction::HmacSha2_384 => 48,
        PseudorandomFunction::HmacSha2_512 => 64,
    }
}

/// Adjust an arbitrary-length key to the 128-bit key `PRF_AES128_XCBC` needs,
/// per RFC 4434 section 2.
fn adjust_aes128_xcbc_key(key: &[u8]) -> [u8; 16] {
    if key.len() == 16 {
        let mut out = [0u8; 16];
        out.copy_from_slice(key);
        out
    } else if key.len() < 16 {
        let mut out = [0u8; 16];
        out[..key.len()].copy_from_slice(key);
        out
    } else {
        xcbc_mac_128(&[0u8; 16], key)
    }
}

/// A single application of `PRF(key, data)`
pub fn prf(algorithm: PseudorandomFunction, key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match algorithm {
        PseudorandomFunction::HmacSha1 => {
            let mut mac = HmacSha1::new_from_slice(key)
                .map_err(|_| CryptoError::UnsupportedAlgorithm("hmac-sha1 key"))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        PseudorandomFunction::HmacSha2_256 => {
            let mut mac = HmacSha256::new_from_slice(key)
                .map_err(|_| CryptoError::UnsupportedAlgorithm("hmac-sha2-256 key"))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        PseudorandomFunction::HmacSha2_384 => {
            let mut mac = HmacSha384::new_from_slice(key)
                .map_err(|_| CryptoError::UnsupportedAlgorithm("hmac-sha2-384 key"))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        PseudorandomFunction::HmacSha2_512 => {
            let mut mac = HmacSha512::new_from_slice(key)
                .map_err(|_| CryptoError::UnsupportedAlgorithm("hmac-sha2-512 key"))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        PseudorandomFunction::Aes128Xcbc => {
            let adjusted = adjust_aes128_xcbc_key(key);
            Ok(xcbc_mac_128(&adjusted, data).to_vec())
        }
    }
}

/// PRF+ per RFC 7296 section 2.13: `T1 = PRF(K, S | 0x01)`,
/// `Tn = PRF(K, T(n-1) | S | n)`, concatenated until `length` bytes are available.
pub fn prf_plus(
    algorithm: PseudorandomFunction,
    key: &[u8],
    seed: &[u8],
    length: usize,
) -> Result<Vec<u8>, CryptoError> {
    let mut output = Vec::with_capacity(length + output_len(algorithm));
    let mut t_prev: Vec<u8> = Vec::new();
    let mut counter: u8 = 1;

    while output.len() < length {
        let mut input = Vec::with_capacity(t_prev.len() + seed.len() + 1);
        input.extend_from_slice(&t_prev);
        input.extend_from_slice(seed);
        input.push(counter);

        let t_n = prf(algorithm, key, &input)?;
        output.extend_from_slice(&t_n);
        t_prev = t_n;
        counter = counter.checked_add(1).ok_or(CryptoError::UnsupportedAlgorithm(
            "PRF+ counter overflowed 255 iterations",
        ))?;
    }

    output.truncate(length);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prf_plus_produces_requested_length() {
        let out = prf_plus(PseudorandomFunction::HmacSha2_256, &[0u8; 32], b"seed", 100).unwrap();
        assert_eq!(out.len(), 100);
    }

    #[test]
    fn prf_plus_is_deterministic() {
        let a = prf_plus(PseudorandomFunction::HmacSha1, &[1u8; 20], b"Ni|Nr|SPIi|SPIr", 64).unwrap();
        let b = prf_plus(PseudorandomFunction::HmacSha1, &[1u8; 20], b"Ni|Nr|SPIi|SPIr", 64).unwrap();
        assert_eq!(a, b);
    }
}
