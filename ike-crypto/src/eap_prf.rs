//! EAP-AKA/AKA' master key and exported key material, RFC 4187 section 7:
//! MK = SHA1(Identity | IK | CK), then the FIPS 186-2 (change notice 1)
//! SHA-1 pseudorandom generator keyed by MK produces K_encr | K_aut | MSK | EMSK.

use sha1::{Digest, Sha1};

use crate::CryptoError;

const SEED_LEN: usize = 20;
const BLOCK_LEN: usize = 20;

/// One round of the SHA-1 compression function, RFC 3174 section 6.1,
/// applied here directly to a single block with no Merkle-Damgard length
/// suffix, per the FIPS 186-2 Appendix 3.3 definition of `G(t, c)`.
fn sha1_compress(state: &mut [u32; 5], block: &[u8; 64]) {
    let mut w = [0u32; 80];
    for (i, word) in w.iter_mut().take(16).enumerate() {
        *word = u32::from_be_bytes([block[4 * i], block[4 * i + 1], block[4 * i + 2], block[4 * i + 3]]);
    }
    for i in 16..80 {
        w[i] = (w[i - 3] ^ w[i - 8] ^ w[i - 14] ^ w[i - 16]).rotate_left(1);
    }

    let (mut a, mut b, mut c, mut d, mut e) = (state[0], state[1], state[2], state[3], state[4]);

    for (i, word) in w.iter().enumerate() {
        let (f, k) = match i {
            0..=19 => ((b & c) | ((!b) & d), 0x5A827999u32),
            20..=39 => (b ^ c ^ d, 0x6ED9EBA1),
            40..=59 => ((b & c) | (b & d) | (c & d), 0x8F1BBCDC),
            _ => (b ^ c ^ d, 0xCA62C1D6),
        };
        let temp = a
            .rotate_left(5)
            .wrapping_add(f)
            .wrapping_add(e)
            .wrapping_add(k)
            .wrapping_add(*word);
        e = d;
        d = c;
        c = b.rotate_left(30);
        b = a;
        a = temp;
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
    state[4] = state[4].wrapping_add(e);
}

/// `G(XVAL)`: one SHA-1 block transform over `XVAL` zero-padded to a full
/// 64-byte block, with no `0x80` bit and no 64-bit length field appended.
fn g(xval: &[u8; SEED_LEN]) -> [u8; BLOCK_LEN] {
    const SHA1_IV: [u32; 5] = [0x67452301, 0xEFCDAB89, 0x98BADCFE, 0x10325476, 0xC3D2E1F0];
    let mut state = SHA1_IV;
    let mut block = [0u8; 64];
    block[..SEED_LEN].copy_from_slice(xval);
    sha1_compress(&mut state, &block);

    let mut out = [0u8; BLOCK_LEN];
    for (i, word) in state.iter().enumerate() {
        out[i * 4..i * 4 + 4].copy_from_slice(&word.to_be_bytes());
    }
    out
}

fn add_mod_2_160(xkey: &[u8; SEED_LEN], w: &[u8; BLOCK_LEN]) -> [u8; SEED_LEN] {
    let mut result = [0u8; SEED_LEN];
    let mut carry: u16 = 1;
    for i in (0..SEED_LEN).rev() {
        let sum = carry + xkey[i] as u16 + w[i] as u16;
        result[i] = sum as u8;
        carry = sum >> 8;
    }
    result
}

/// Expand `seed` into `length` bytes of pseudorandom output via the FIPS
/// 186-2 general purpose generator: `XKEY_0 = seed`,
/// `x_t = G(XKEY_t)`, `XKEY_(t+1) = (1 + XKEY_t + x_t) mod 2^160`.
pub fn fips186_2_prf(seed: &[u8], length: usize) -> Vec<u8> {
    let mut xkey = [0u8; SEED_LEN];
    let take = seed.len().min(SEED_LEN);
    xkey[..take].copy_from_slice(&seed[..take]);

    let blocks_needed = length.div_ceil(BLOCK_LEN);
    let mut output = Vec::with_capacity(blocks_needed * BLOCK_LEN);

    for _ in 0..blocks_needed {
        let w = g(&xkey);
        output.extend_from_slice(&w);
        xkey = add_mod_2_160(&xkey, &w);
    }

    output.truncate(length);
    output
}

/// The four keys an EAP-AKA/AKA' full-authentication exchange derives from
/// its master key
pub struct AkaKeys {
    /// Encrypts AT_ENCR_DATA attributes
    pub k_encr: [u8; 16],
    /// Keys the AT_MAC covering an EAP-AKA message
    pub k_aut: [u8; 16],
    /// Master Session Key, exported to IKE AUTH as the shared secret proof
    pub msk: [u8; 64],
    /// Extended Master Session Key
    pub emsk: [u8; 64],
}

/// Derive the EAP-AKA/AKA' key set from the peer identity and the
/// authentication vector's IK/CK pair
pub fn derive_aka_keys(identity: &[u8], ik: &[u8], ck: &[u8]) -> Result<AkaKeys, CryptoError> {
    if ik.len() != 16 || ck.len() != 16 {
        return Err(CryptoError::InvalidKeyLength {
            expected: 16,
            actual: ik.len().max(ck.len()),
        });
    }

    let mut hasher = Sha1::new();
    hasher.update(identity);
    hasher.update(ik);
    hasher.update(ck);
    let mk = hasher.finalize();

    let keymat = fips186_2_prf(&mk, 16 + 16 + 64 + 64);

    let mut k_encr = [0u8; 16];
    let mut k_aut = [0u8; 16];
    let mut msk = [0u8; 64];
    let mut emsk = [0u8; 64];
    let mut cursor = 0usize;
    k_encr.copy_from_slice(&keymat[cursor..cursor + 16]);
    cursor += 16;
    k_aut.copy_from_slice(&keymat[cursor..cursor + 16]);
    cursor += 16;
    msk.copy_from_slice(&keymat[cursor..cursor + 64]);
    cursor += 64;
    emsk.copy_from_slice(&keymat[cursor..cursor + 64]);

    Ok(AkaKeys { k_encr, k_aut, msk, emsk })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prf_output_length_matches_request() {
        let out = fips186_2_prf(&[0x42u8; 20], 160);
        assert_eq!(out.len(), 160);
    }

    #[test]
    fn prf_is_deterministic() {
        let a = fips186_2_prf(b"master key material", 64);
        let b = fips186_2_prf(b"master key material", 64);
        assert_eq!(a, b);
    }

    #[test]
    fn aka_keys_are_deterministic_for_fixed_inputs() {
        let identity = b"0208930000000001";
        let ik = [0x11u8; 16];
        let ck = [0x22u8; 16];
        let a = derive_aka_keys(identity, &ik, &ck).unwrap();
        let b = derive_aka_keys(identity, &ik, &ck).unwrap();
        assert_eq!(a.msk, b.msk);
        assert_eq!(a.emsk, b.emsk);
        assert_eq!(a.k_encr, b.k_encr);
        assert_eq!(a.k_aut, b.k_aut);
    }

    #[test]
    fn aka_keys_rejects_wrong_length_ik() {
        assert!(derive_aka_keys(b"identity", &[0u8; 15], &[0u8; 16]).is_err());
    }
}
