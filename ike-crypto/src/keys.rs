//! SKEYSEED/KEYMAT derivation and the [IkeSaKeys] material it produces,
//! RFC 7296 section 2.14.

use zeroize::{Zeroize, ZeroizeOnDrop};

use ike_wire::params::{EncryptionAlgorithm, IntegrityAlgorithm, PseudorandomFunction};

use crate::prf::{output_len, prf, prf_plus};
use crate::CryptoError;

/// Key length in bytes for an encryption transform, given its optional
/// negotiated Key Length attribute (bits)
fn encryption_key_len(algorithm: EncryptionAlgorithm, key_length_bits: Option<u16>) -> usize {
    match algorithm {
        EncryptionAlgorithm::TripleDesCbc => 24,
        EncryptionAlgorithm::AesCbc
        | EncryptionAlgorithm::AesGcm8
        | EncryptionAlgorithm::AesGcm12
        | EncryptionAlgorithm::AesGcm16 => (key_length_bits.unwrap_or(128) / 8) as usize,
    }
}

/// Length of the salt appended to the AEAD encryption key, RFC 7296 section 3.3.5
fn aead_salt_len(algorithm: EncryptionAlgorithm) -> usize {
    if algorithm.is_aead() {
        4
    } else {
        0
    }
}

/// Key length in bytes an integrity algorithm's MAC key naturally takes,
/// i.e. the underlying hash's digest size (or 16 for AES-XCBC)
fn integrity_key_len(algorithm: IntegrityAlgorithm) -> usize {
    match algorithm {
        IntegrityAlgorithm::None => 0,
        IntegrityAlgorithm::HmacSha1_96 => 20,
        IntegrityAlgorithm::AesXcbc96 => 16,
        IntegrityAlgorithm::HmacSha2_256_128 => 32,
        IntegrityAlgorithm::HmacSha2_384_192 => 48,
        IntegrityAlgorithm::HmacSha2_512_256 => 64,
    }
}

/// The negotiated algorithm set that determines each derived key's length
#[derive(Debug, Clone, Copy)]
pub struct KeySchedule {
    /// PRF used throughout the derivation
    pub prf: PseudorandomFunction,
    /// Negotiated encryption transform and its Key Length attribute, if any
    pub encryption: EncryptionAlgorithm,
    /// Negotiated Key Length attribute, bits
    pub encryption_key_bits: Option<u16>,
    /// Negotiated integrity transform; `None` (the enum variant) for an AEAD cipher
    pub integrity: IntegrityAlgorithm,
}

/// The full set of derived IKE SA keys, RFC 7296 section 2.14
///
/// Zeroized on drop; the session owns this for the SA's lifetime and never
/// clones it out to a longer-lived structure.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct IkeSaKeys {
    /// Used to derive further keying material for Child SAs and IKE SA rekeys
    pub sk_d: Vec<u8>,
    /// Integrity key, initiator to responder direction
    pub sk_ai: Vec<u8>,
    /// Integrity key, responder to initiator direction
    pub sk_ar: Vec<u8>,
    /// Encryption key (with AEAD salt appended, if applicable), initiator to responder
    pub sk_ei: Vec<u8>,
    /// Encryption key (with AEAD salt appended, if applicable), responder to initiator
    pub sk_er: Vec<u8>,
    /// Authentication key, initiator to responder, used in the AUTH payload
    pub sk_pi: Vec<u8>,
    /// Authentication key, responder to initiator, used in the AUTH payload
    pub sk_pr: Vec<u8>,
}

impl std::fmt::Debug for IkeSaKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IkeSaKeys").finish_non_exhaustive()
    }
}

/// Encryption and integrity keys for one direction of a Child SA
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DirectionalKeys {
    /// Encryption key, including any AEAD salt
    pub encr: Vec<u8>,
    /// Integrity key, empty for an AEAD transform
    pub integ: Vec<u8>,
}

impl std::fmt::Debug for DirectionalKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectionalKeys").finish_non_exhaustive()
    }
}

/// A Child SA's full KEYMAT split, RFC 7296 section 2.17
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ChildSaKeyMaterial {
    /// Keys for traffic the initiator sends
    pub initiator_to_responder: DirectionalKeys,
    /// Keys for traffic the responder sends
    pub responder_to_initiator: DirectionalKeys,
}

impl std::fmt::Debug for ChildSaKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildSaKeyMaterial").finish_non_exhaustive()
    }
}

/// Derive a Child SA's KEYMAT, RFC 7296 section 2.17:
/// `KEYMAT = prf+(SK_d, [g^ir (new) |] Ni | Nr)`, split into an
/// initiator-to-responder then responder-to-initiator pair of (encryption
/// key, integrity key), in that order. `dh_shared_secret` is `Some` only
/// when the Child SA negotiation carried a KEi/KEr pair (PFS).
pub fn derive_child_sa_keys(
    schedule: KeySchedule,
    sk_d: &[u8],
    ni: &[u8],
    nr: &[u8],
    dh_shared_secret: Option<&[u8]>,
) -> Result<ChildSaKeyMaterial, CryptoError> {
    let mut seed = Vec::with_capacity(dh_shared_secret.map_or(0, <[u8]>::len) + ni.len() + nr.len());
    if let Some(g_ir) = dh_shared_secret {
        seed.extend_from_slice(g_ir);
    }
    seed.extend_from_slice(ni);
    seed.extend_from_slice(nr);

    let encr_len = encryption_key_len(schedule.encryption, schedule.encryption_key_bits)
        + aead_salt_len(schedule.encryption);
    let integ_len = integrity_key_len(schedule.integrity);

    let total = 2 * (encr_len + integ_len);
    let keymat = prf_plus(schedule.prf, sk_d, &seed, total)?;

    let mut cursor = 0usize;
    let mut take = |len: usize| {
        let slice = keymat[cursor..cursor + len].to_vec();
        cursor += len;
        slice
    };

    Ok(ChildSaKeyMaterial {
        initiator_to_responder: DirectionalKeys {
            encr: take(encr_len),
            integ: take(integ_len),
        },
        responder_to_initiator: DirectionalKeys {
            encr: take(encr_len),
            integ: take(integ_len),
        },
    })
}

/// Derive SKEYSEED from the two nonces and the DH shared secret, then expand
/// into the full [IkeSaKeys] set via PRF+, in the fixed order SK_d, SK_ai,
/// SK_ar, SK_ei, SK_er, SK_pi, SK_pr.
pub fn derive_keys(
    schedule: KeySchedule,
    ni: &[u8],
    nr: &[u8],
    shared_secret: &[u8],
    spi_i: u64,
    spi_r: u64,
) -> Result<IkeSaKeys, CryptoError> {
    let mut nonces = Vec::with_capacity(ni.len() + nr.len());
    nonces.extend_from_slice(ni);
    nonces.extend_from_slice(nr);

    let skeyseed = prf(schedule.prf, &nonces, shared_secret)?;
    expand_ike_sa_keys(schedule, &skeyseed, ni, nr, spi_i, spi_r)
}

/// Derive fresh [IkeSaKeys] for an IKE SA rekey, RFC 7296 section 2.18:
/// `SKEYSEED = prf(SK_d (old), g^ir (new) | Ni | Nr)`. The PRF's key/data
/// operands are swapped relative to the initial derivation's `prf(Ni | Nr,
/// g^ir)`; the PRF+ expansion into SK_d..SK_pr that follows is identical.
pub fn derive_rekeyed_keys(
    schedule: KeySchedule,
    old_sk_d: &[u8],
    ni: &[u8],
    nr: &[u8],
    shared_secret: &[u8],
    spi_i: u64,
    spi_r: u64,
) -> Result<IkeSaKeys, CryptoError> {
    let mut data = Vec::with_capacity(shared_secret.len() + ni.len() + nr.len());
    data.extend_from_slice(shared_secret);
    data.extend_from_slice(ni);
    data.extend_from_slice(nr);
    let skeyseed = prf(schedule.prf, old_sk_d, &data)?;
    expand_ike_sa_keys(schedule, &skeyseed, ni, nr, spi_i, spi_r)
}

fn expand_ike_sa_keys(
    schedule: KeySchedule,
    skeyseed: &[u8],
    ni: &[u8],
    nr: &[u8],
    spi_i: u64,
    spi_r: u64,
) -> Result<IkeSaKeys, CryptoError> {
    let mut seed = Vec::with_capacity(ni.len() + nr.len() + 16);
    seed.extend_from_slice(ni);
    seed.extend_from_slice(nr);
    seed.extend_from_slice(&spi_i.to_be_bytes());
    seed.extend_from_slice(&spi_r.to_be_bytes());

    let d_len = output_len(schedule.prf);
    let integ_len = integrity_key_len(schedule.integrity);
    let encr_len = encryption_key_len(schedule.encryption, schedule.encryption_key_bits)
        + aead_salt_len(schedule.encryption);
    let auth_len = output_len(schedule.prf);

    let total = d_len + 2 * integ_len + 2 * encr_len + 2 * auth_len;
    let keymat = prf_plus(schedule.prf, skeyseed, &seed, total)?;

    let mut cursor = 0usize;
    let mut take = |len: usize| {
        let slice = keymat[cursor..cursor + len].to_vec();
        cursor += len;
        slice
    };

    Ok(IkeSaKeys {
        sk_d: take(d_len),
        sk_ai: take(integ_len),
        sk_ar: take(integ_len),
        sk_ei: take(encr_len),
        sk_er: take(encr_len),
        sk_pi: take(auth_len),
        sk_pr: take(auth_len),
    })
}
