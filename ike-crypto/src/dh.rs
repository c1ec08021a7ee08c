//! Diffie-Hellman key agreement over the MODP groups this client supports,
//! RFC 7296 section 3.3.2 combined with RFC 2409/RFC 3526's named groups.

use num_bigint_dig::BigUint;
use num_traits::{One, Zero};
use rand::RngCore;

use ike_wire::params::DiffieHellmanGroup;

use crate::CryptoError;

const GROUP_2_PRIME_HEX: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1",
    "29024E088A67CC74020BBEA63B139B22514A08798E3404DD",
    "EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245",
    "E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED",
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D",
    "C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F",
    "83655D23DCA3AD961C62F356208552BB9ED529077096966D",
    "670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B",
    "E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9",
    "DE2BCBF6955817183995497CEA956AE515D2261898FA0510",
    "15728E5A8AACAA68FFFFFFFFFFFFFFFF",
);

const GROUP_14_PRIME_HEX: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1",
    "29024E088A67CC74020BBEA63B139B22514A08798E3404DD",
    "EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245",
    "E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED",
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D",
    "C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F",
    "83655D23DCA3AD961C62F356208552BB9ED529077096966D",
    "670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B",
    "E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9",
    "DE2BCBF6955817183995497CEA956AE515D2261898FA0510",
    "15728E5A8AAAC42DAD33170D04507A33A85521ABDF1CBA64",
    "ECFB850458DBEF0A8AEA71575D060C7DB3970F85A6E1E4C7",
    "ABF5AE8CDB0933D71E8C94E04A25619DCEE3D2261AD2EE6B",
    "F12FFA06D98A0864D87602733EC86A64521F2B18177B200C",
    "BBE117577A615D6C770988C0BAD946E208E24FA074E5AB31",
    "43DB5BFCE0FD108E4B82D120A93AD2CAFFFFFFFFFFFFFFFF",
);

fn strip_spaces(hex: &str) -> String {
    hex.chars().filter(|c| !c.is_whitespace()).collect()
}

fn prime(group: DiffieHellmanGroup) -> Result<BigUint, CryptoError> {
    let hex = match group {
        DiffieHellmanGroup::Modp1024 => strip_spaces(GROUP_2_PRIME_HEX),
        DiffieHellmanGroup::Modp2048 => strip_spaces(GROUP_14_PRIME_HEX),
        DiffieHellmanGroup::None => {
            return Err(CryptoError::UnsupportedAlgorithm("DH group NONE has no modulus"))
        }
    };
    BigUint::parse_bytes(hex.as_bytes(), 16)
        .ok_or(CryptoError::UnsupportedAlgorithm("malformed MODP prime constant"))
}

/// A freshly generated private exponent for a single key exchange
pub struct DhPrivateKey {
    group: DiffieHellmanGroup,
    private: BigUint,
    prime: BigUint,
}

impl DhPrivateKey {
    /// Generate a new private exponent for `group`
    pub fn generate(group: DiffieHellmanGroup, rng: &mut impl RngCore) -> Result<Self, CryptoError> {
        let prime = prime(group)?;
        let len = group.public_value_len();
        let mut bytes = vec![0u8; len];
        rng.fill_bytes(&mut bytes);
        // the MODP primes used here begin with many set bits, so a uniformly
        // random same-width value is below the modulus with overwhelming
        // probability; the rare oversized draw is folded back in with a mask.
        bytes[0] &= 0x7F;
        let private = BigUint::from_bytes_be(&bytes);
        Ok(Self { group, private, prime })
    }

    /// The DH group this key was generated for
    pub fn group(&self) -> DiffieHellmanGroup {
        self.group
    }

    /// This side's public value `g^private mod p`, encoded to the group's fixed width
    pub fn public_value(&self) -> Vec<u8> {
        let generator = BigUint::from(2u32);
        let public = generator.modpow(&self.private, &self.prime);
        to_fixed_width(&public, self.group.public_value_len())
    }

    /// Validate the peer's public value and compute the shared secret
    ///
    /// Validation per RFC 7296 section 3.3.2 / RFC 2631: `1 < y < p - 1`.
    pub fn shared_secret(&self, peer_public_value: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if peer_public_value.len() != self.group.public_value_len() {
            return Err(CryptoError::InvalidKeyExchange);
        }
        let y = BigUint::from_bytes_be(peer_public_value);
        let one = BigUint::one();
        let p_minus_one = &self.prime - &one;
        if y <= one || y >= p_minus_one || y.is_zero() {
            return Err(CryptoError::InvalidKeyExchange);
        }
        let shared = y.modpow(&self.private, &self.prime);
        Ok(to_fixed_width(&shared, self.group.public_value_len()))
    }
}

fn to_fixed_width(value: &BigUint, width: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    let mut out = vec![0u8; width];
    let offset = width.saturating_sub(bytes.len());
    out[offset..].copy_from_slice(&bytes[bytes.len().saturating_sub(width)..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modp2048_agreement_matches_both_sides() {
        let mut rng = rand::rng();
        let alice = DhPrivateKey::generate(DiffieHellmanGroup::Modp2048, &mut rng).unwrap();
        let bob = DhPrivateKey::generate(DiffieHellmanGroup::Modp2048, &mut rng).unwrap();

        let alice_public = alice.public_value();
        let bob_public = bob.public_value();

        let shared_a = alice.shared_secret(&bob_public).unwrap();
        let shared_b = bob.shared_secret(&alice_public).unwrap();
        assert_eq!(shared_a, shared_b);
    }

    #[test]
    fn rejects_public_value_of_one() {
        let mut rng = rand::rng();
        let alice = DhPrivateKey::generate(DiffieHellmanGroup::Modp1024, &mut rng).unwrap();
        let mut bogus = vec![0u8; DiffieHellmanGroup::Modp1024.public_value_len()];
        bogus[bogus.len() - 1] = 1;
        assert!(alice.shared_secret(&bogus).is_err());
    }
}
