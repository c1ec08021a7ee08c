//! [SecuredChannel] binds a negotiated [KeySchedule] and [IkeSaKeys] together
//! into the open/seal operations an Encrypted payload's body needs, RFC 7296
//! section 3.14. The wire codec decodes the header and payload chain; once an
//! `EncryptedAndAuthenticated` payload is found, its body is handed here
//! before the inner chain can be parsed.

use ike_wire::params::EncryptionAlgorithm;

use crate::keys::{IkeSaKeys, KeySchedule};
use crate::{aead, cipher, integrity};
use crate::CryptoError;

/// Which side of the exchange produced the Encrypted payload, selecting the
/// `i`/`r` suffixed half of the derived key set, RFC 7296 section 2.14
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Keys SK_ei/SK_ai, used by messages the initiator sends
    InitiatorToResponder,
    /// Keys SK_er/SK_ar, used by messages the responder sends
    ResponderToInitiator,
}

/// Ties a negotiated algorithm set to the derived key material for one IKE
/// SA, exposing the open/seal operations the session layer drives
pub struct SecuredChannel<'a> {
    schedule: KeySchedule,
    keys: &'a IkeSaKeys,
}

impl<'a> SecuredChannel<'a> {
    /// Build a channel over `keys` for the algorithms in `schedule`
    pub fn new(schedule: KeySchedule, keys: &'a IkeSaKeys) -> Self {
        Self { schedule, keys }
    }

    fn keys_for(&self, direction: Direction) -> (&'a [u8], &'a [u8]) {
        match direction {
            Direction::InitiatorToResponder => (&self.keys.sk_ei, &self.keys.sk_ai),
            Direction::ResponderToInitiator => (&self.keys.sk_er, &self.keys.sk_ar),
        }
    }

    fn iv_len(&self) -> usize {
        if self.schedule.encryption.is_aead() {
            aead::EXPLICIT_IV_LEN
        } else {
            cipher::iv_len(self.schedule.encryption)
        }
    }

    /// Authenticate then decrypt an Encrypted payload's body (`IV ||
    /// ciphertext || [ICV]`), returning the inner payload-chain bytes ready
    /// to be re-parsed with `ike_wire::parser::parse_message`'s payload loop
    ///
    /// `associated_data` is the unencrypted IKE header followed by the
    /// Encrypted payload's generic payload header, RFC 7296 section 5.3.
    pub fn open(&self, direction: Direction, associated_data: &[u8], body: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let (encryption_key, integrity_key) = self.keys_for(direction);
        let iv_len = self.iv_len();
        if body.len() < iv_len {
            return Err(CryptoError::DecryptionFailure);
        }
        let (iv, rest) = body.split_at(iv_len);

        if self.schedule.encryption.is_aead() {
            let padded = aead::open(self.schedule.encryption, encryption_key, iv, associated_data, rest)?;
            cipher::unpad(&padded)
        } else {
            let checksum_len = self.schedule.integrity.checksum_len();
            if rest.len() < checksum_len {
                return Err(CryptoError::DecryptionFailure);
            }
            let (ciphertext, icv) = rest.split_at(rest.len() - checksum_len);
            let covered = covered_bytes(associated_data, iv, ciphertext);
            integrity::verify(self.schedule.integrity, integrity_key, &covered, icv)?;
            cipher::decrypt(self.schedule.encryption, encryption_key, iv, ciphertext)
        }
    }

    /// Encrypt then authenticate `plaintext` (an inner payload chain),
    /// returning the full Encrypted payload body
    ///
    /// `iv` must be freshly generated by the caller, per-message, with
    /// [EncryptionAlgorithm]'s required width ([Self::iv_len]).
    pub fn seal(
        &self,
        direction: Direction,
        associated_data: &[u8],
        iv: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        if iv.len() != self.iv_len() {
            return Err(CryptoError::InvalidKeyLength {
                expected: self.iv_len(),
                actual: iv.len(),
            });
        }
        let (encryption_key, integrity_key) = self.keys_for(direction);

        if self.schedule.encryption.is_aead() {
            // RFC 5282 section 3: combined-mode ciphers need no block-aligned
            // padding, but the Pad Length octet itself still belongs inside
            // the encrypted plaintext.
            let padded = cipher::pad(plaintext, 1);
            let sealed = aead::seal(self.schedule.encryption, encryption_key, iv, associated_data, &padded)?;
            let mut body = Vec::with_capacity(iv.len() + sealed.len());
            body.extend_from_slice(iv);
            body.extend_from_slice(&sealed);
            Ok(body)
        } else {
            let ciphertext = cipher::encrypt(self.schedule.encryption, encryption_key, iv, plaintext)?;
            let covered = covered_bytes(associated_data, iv, &ciphertext);
            let icv = integrity::compute(self.schedule.integrity, integrity_key, &covered)?;

            let mut body = Vec::with_capacity(iv.len() + ciphertext.len() + icv.len());
            body.extend_from_slice(iv);
            body.extend_from_slice(&ciphertext);
            body.extend_from_slice(&icv);
            Ok(body)
        }
    }

    /// Length in bytes the IV must be for [Self::seal] under this channel's negotiated transform
    pub fn required_iv_len(&self) -> usize {
        self.iv_len()
    }

    /// Total length the sealed Encrypted payload body (`IV || ciphertext
    /// [|| ICV]`) will occupy for a plaintext of `plaintext_len` bytes.
    ///
    /// Needed before [Self::seal] runs: RFC 7296 section 5.3's associated
    /// data for the non-AEAD MAC (and the message as actually sent) includes
    /// the outer header's `Length` field, which in turn depends on this
    /// value, so a caller assembling the header must compute it up front
    /// rather than after sealing.
    pub fn sealed_body_len(&self, plaintext_len: usize) -> usize {
        let iv_len = self.iv_len();
        if self.schedule.encryption.is_aead() {
            // +1 for the Pad Length octet `seal` adds ahead of the AEAD call.
            iv_len + plaintext_len + 1 + aead::tag_len(self.schedule.encryption)
        } else {
            let block = cipher::block_size(self.schedule.encryption);
            let remainder = (plaintext_len + 1) % block;
            let pad_len = if remainder == 0 { 0 } else { block - remainder };
            let padded_len = plaintext_len + pad_len + 1;
            iv_len + padded_len + self.schedule.integrity.checksum_len()
        }
    }

    /// The negotiated encryption transform
    pub fn encryption(&self) -> EncryptionAlgorithm {
        self.schedule.encryption
    }
}

fn covered_bytes(associated_data: &[u8], iv: &[u8], ciphertext: &[u8]) -> Vec<u8> {
    let mut covered = Vec::with_capacity(associated_data.len() + iv.len() + ciphertext.len());
    covered.extend_from_slice(associated_data);
    covered.extend_from_slice(iv);
    covered.extend_from_slice(ciphertext);
    covered
}

#[cfg(test)]
mod tests {
    use super::*;
    use ike_wire::params::{IntegrityAlgorithm, PseudorandomFunction};

    fn schedule() -> KeySchedule {
        KeySchedule {
            prf: PseudorandomFunction::HmacSha2_256,
            encryption: EncryptionAlgorithm::AesCbc,
            encryption_key_bits: Some(128),
            integrity: IntegrityAlgorithm::HmacSha2_256_128,
        }
    }

    fn keys() -> IkeSaKeys {
        IkeSaKeys {
            sk_d: vec![0u8; 32],
            sk_ai: vec![1u8; 32],
            sk_ar: vec![2u8; 32],
            sk_ei: vec![3u8; 16],
            sk_er: vec![4u8; 16],
            sk_pi: vec![5u8; 32],
            sk_pr: vec![6u8; 32],
        }
    }

    #[test]
    fn cbc_channel_round_trips() {
        let k = keys();
        let channel = SecuredChannel::new(schedule(), &k);
        let aad = b"ike header + sk payload header";
        let iv = [0x7fu8; 16];
        let plaintext = b"inner payload chain bytes";

        let body = channel.seal(Direction::InitiatorToResponder, aad, &iv, plaintext).unwrap();
        let opened = channel.open(Direction::InitiatorToResponder, aad, &body).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn cbc_channel_rejects_tampered_icv() {
        let k = keys();
        let channel = SecuredChannel::new(schedule(), &k);
        let aad = b"aad";
        let iv = [0x11u8; 16];
        let mut body = channel
            .seal(Direction::InitiatorToResponder, aad, &iv, b"payload")
            .unwrap();
        let last = body.len() - 1;
        body[last] ^= 0x01;
        assert!(channel.open(Direction::InitiatorToResponder, aad, &body).is_err());
    }

    #[test]
    fn aead_channel_round_trips() {
        let mut k = keys();
        k.sk_ei = vec![0x22u8; 20]; // 16 byte key + 4 byte salt
        k.sk_er = vec![0x33u8; 20];
        let mut gcm_schedule = schedule();
        gcm_schedule.encryption = EncryptionAlgorithm::AesGcm16;
        gcm_schedule.integrity = IntegrityAlgorithm::None;

        let channel = SecuredChannel::new(gcm_schedule, &k);
        let aad = b"ike header";
        let iv = [0x01u8; 8];
        let plaintext = b"inner payload chain bytes for aead";

        let body = channel.seal(Direction::InitiatorToResponder, aad, &iv, plaintext).unwrap();
        let opened = channel.open(Direction::InitiatorToResponder, aad, &body).unwrap();
        assert_eq!(opened, plaintext);
    }
}
