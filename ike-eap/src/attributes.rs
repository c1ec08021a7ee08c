//! EAP-AKA/AKA'/SIM attribute TLV codec, RFC 4187 section 10, RFC 4186
//! section 10, RFC 5448 section 4. Each attribute: 1-byte type, 1-byte
//! length in 4-byte words, value. Attribute types below 128 are
//! non-skippable: an unrecognized one is a decode error; 128 and above are
//! skippable and silently ignored when unrecognized.

use crate::error::EapError;

/// Recognized attribute type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttributeType {
    /// AT_RAND
    Rand = 1,
    /// AT_AUTN
    Autn = 2,
    /// AT_RES
    Res = 3,
    /// AT_AUTS
    Auts = 4,
    /// AT_PADDING
    Padding = 6,
    /// AT_NONCE_MT (EAP-SIM)
    NonceMt = 7,
    /// AT_PERMANENT_ID_REQ
    PermanentIdReq = 10,
    /// AT_MAC
    Mac = 11,
    /// AT_NOTIFICATION
    Notification = 12,
    /// AT_ANY_ID_REQ
    AnyIdReq = 13,
    /// AT_IDENTITY
    Identity = 14,
    /// AT_VERSION_LIST (EAP-SIM)
    VersionList = 15,
    /// AT_SELECTED_VERSION (EAP-SIM)
    SelectedVersion = 16,
    /// AT_FULLAUTH_ID_REQ
    FullauthIdReq = 17,
    /// AT_CLIENT_ERROR_CODE
    ClientErrorCode = 22,
    /// AT_KDF_INPUT (AKA')
    KdfInput = 23,
    /// AT_KDF (AKA')
    Kdf = 24,
    /// AT_IV
    Iv = 129,
    /// AT_ENCR_DATA
    EncrData = 130,
}

impl TryFrom<u8> for AttributeType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AttributeType::Rand),
            2 => Ok(AttributeType::Autn),
            3 => Ok(AttributeType::Res),
            4 => Ok(AttributeType::Auts),
            6 => Ok(AttributeType::Padding),
            7 => Ok(AttributeType::NonceMt),
            10 => Ok(AttributeType::PermanentIdReq),
            11 => Ok(AttributeType::Mac),
            12 => Ok(AttributeType::Notification),
            13 => Ok(AttributeType::AnyIdReq),
            14 => Ok(AttributeType::Identity),
            15 => Ok(AttributeType::VersionList),
            16 => Ok(AttributeType::SelectedVersion),
            17 => Ok(AttributeType::FullauthIdReq),
            22 => Ok(AttributeType::ClientErrorCode),
            23 => Ok(AttributeType::KdfInput),
            24 => Ok(AttributeType::Kdf),
            129 => Ok(AttributeType::Iv),
            130 => Ok(AttributeType::EncrData),
            _ => Err(()),
        }
    }
}

/// A decoded attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// One RAND per authentication vector (1 for AKA, 2-3 for SIM)
    Rand(Vec<[u8; 16]>),
    /// AUTN (AKA/AKA' only)
    Autn([u8; 16]),
    /// RES/SRES bytes, exact length as returned by the authentication algorithm
    Res(Vec<u8>),
    /// AUTS, resynchronization token
    Auts([u8; 14]),
    /// Padding byte count
    Padding(usize),
    /// NONCE_MT (EAP-SIM)
    NonceMt([u8; 16]),
    PermanentIdReq,
    AnyIdReq,
    FullauthIdReq,
    /// Version list (EAP-SIM), each entry a 2-byte version number
    VersionList(Vec<u16>),
    /// Selected version (EAP-SIM)
    SelectedVersion(u16),
    /// Truncated HMAC-SHA1-128 over the message with this field zeroed
    Mac([u8; 16]),
    Notification(u16),
    /// Identity bytes (prefixed permanent/pseudonym identity)
    Identity(Vec<u8>),
    ClientErrorCode(u16),
    /// Network name (AKA')
    KdfInput(Vec<u8>),
    /// Key derivation function indicator, must equal 1 (AKA')
    Kdf(u16),
    Iv([u8; 16]),
    /// Encrypted attribute payload
    EncrData(Vec<u8>),
}

fn require(cond: bool, message: &'static str) -> Result<(), EapError> {
    if cond {
        Ok(())
    } else {
        Err(EapError::InvalidSyntax(message))
    }
}

/// Decode a contiguous run of attributes (the bytes following an AKA/SIM
/// message's Subtype + Reserved fields)
pub fn parse_attributes(data: &[u8]) -> Result<Vec<Attribute>, EapError> {
    let mut attrs = Vec::new();
    let mut cursor = 0usize;

    while cursor < data.len() {
        require(cursor + 2 <= data.len(), "truncated attribute header")?;
        let raw_type = data[cursor];
        let length_words = data[cursor + 1];
        require(length_words != 0, "zero-length attribute")?;
        let total_len = length_words as usize * 4;
        require(cursor + total_len <= data.len(), "attribute overruns buffer")?;
        let body = &data[cursor + 2..cursor + total_len];

        match AttributeType::try_from(raw_type) {
            Ok(attribute_type) => attrs.push(parse_one(attribute_type, body)?),
            Err(()) if raw_type >= 128 => {} // skippable, unrecognized
            Err(()) => return Err(EapError::UnsupportedAttribute(raw_type)),
        }

        cursor += total_len;
    }

    Ok(attrs)
}

fn parse_one(attribute_type: AttributeType, body: &[u8]) -> Result<Attribute, EapError> {
    match attribute_type {
        AttributeType::Rand => {
            require(body.len() >= 2 && (body.len() - 2) % 16 == 0, "malformed AT_RAND")?;
            let rands = body[2..]
                .chunks(16)
                .map(|chunk| {
                    let mut rand = [0u8; 16];
                    rand.copy_from_slice(chunk);
                    rand
                })
                .collect();
            Ok(Attribute::Rand(rands))
        }
        AttributeType::Autn => {
            require(body.len() == 18, "malformed AT_AUTN")?;
            let mut autn = [0u8; 16];
            autn.copy_from_slice(&body[2..18]);
            Ok(Attribute::Autn(autn))
        }
        AttributeType::Res => {
            require(body.len() >= 2, "malformed AT_RES")?;
            let bit_len = u16::from_be_bytes([body[0], body[1]]) as usize;
            let byte_len = bit_len.div_ceil(8);
            require(byte_len <= body.len() - 2, "AT_RES length exceeds attribute")?;
            Ok(Attribute::Res(body[2..2 + byte_len].to_vec()))
        }
        AttributeType::Auts => {
            require(body.len() == 14, "malformed AT_AUTS")?;
            let mut auts = [0u8; 14];
            auts.copy_from_slice(body);
            Ok(Attribute::Auts(auts))
        }
        AttributeType::Padding => Ok(Attribute::Padding(body.len())),
        AttributeType::NonceMt => {
            require(body.len() == 16, "malformed AT_NONCE_MT")?;
            let mut nonce = [0u8; 16];
            nonce.copy_from_slice(body);
            Ok(Attribute::NonceMt(nonce))
        }
        AttributeType::PermanentIdReq => Ok(Attribute::PermanentIdReq),
        AttributeType::AnyIdReq => Ok(Attribute::AnyIdReq),
        AttributeType::FullauthIdReq => Ok(Attribute::FullauthIdReq),
        AttributeType::Mac => {
            require(body.len() == 18, "malformed AT_MAC")?;
            let mut mac = [0u8; 16];
            mac.copy_from_slice(&body[2..18]);
            Ok(Attribute::Mac(mac))
        }
        AttributeType::Notification => {
            require(body.len() == 2, "malformed AT_NOTIFICATION")?;
            Ok(Attribute::Notification(u16::from_be_bytes([body[0], body[1]])))
        }
        AttributeType::Identity => {
            require(body.len() >= 2, "malformed AT_IDENTITY")?;
            let len = u16::from_be_bytes([body[0], body[1]]) as usize;
            require(len <= body.len() - 2, "AT_IDENTITY length exceeds attribute")?;
            Ok(Attribute::Identity(body[2..2 + len].to_vec()))
        }
        AttributeType::VersionList => {
            require(body.len() >= 2, "malformed AT_VERSION_LIST")?;
            let len = u16::from_be_bytes([body[0], body[1]]) as usize;
            require(len % 2 == 0 && len <= body.len() - 2, "AT_VERSION_LIST length exceeds attribute")?;
            let versions = body[2..2 + len].chunks(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
            Ok(Attribute::VersionList(versions))
        }
        AttributeType::SelectedVersion => {
            require(body.len() == 2, "malformed AT_SELECTED_VERSION")?;
            Ok(Attribute::SelectedVersion(u16::from_be_bytes([body[0], body[1]])))
        }
        AttributeType::ClientErrorCode => {
            require(body.len() == 2, "malformed AT_CLIENT_ERROR_CODE")?;
            Ok(Attribute::ClientErrorCode(u16::from_be_bytes([body[0], body[1]])))
        }
        AttributeType::KdfInput => {
            require(body.len() >= 2, "malformed AT_KDF_INPUT")?;
            let len = u16::from_be_bytes([body[0], body[1]]) as usize;
            require(len <= body.len() - 2, "AT_KDF_INPUT length exceeds attribute")?;
            Ok(Attribute::KdfInput(body[2..2 + len].to_vec()))
        }
        AttributeType::Kdf => {
            require(body.len() == 2, "malformed AT_KDF")?;
            Ok(Attribute::Kdf(u16::from_be_bytes([body[0], body[1]])))
        }
        AttributeType::Iv => {
            require(body.len() == 18, "malformed AT_IV")?;
            let mut iv = [0u8; 16];
            iv.copy_from_slice(&body[2..18]);
            Ok(Attribute::Iv(iv))
        }
        AttributeType::EncrData => {
            require(body.len() >= 2, "malformed AT_ENCR_DATA")?;
            Ok(Attribute::EncrData(body[2..].to_vec()))
        }
    }
}

fn push_tlv(out: &mut Vec<u8>, attribute_type: u8, body: &[u8]) {
    out.push(attribute_type);
    out.push(((2 + body.len()) / 4) as u8);
    out.extend_from_slice(body);
}

fn pad_to_4(body: &mut Vec<u8>) {
    while body.len() % 4 != 0 {
        body.push(0);
    }
}

/// Encode a run of attributes back to wire bytes
pub fn encode_attributes(attrs: &[Attribute]) -> Vec<u8> {
    let mut out = Vec::new();
    for attr in attrs {
        encode_one(attr, &mut out);
    }
    out
}

fn encode_one(attr: &Attribute, out: &mut Vec<u8>) {
    match attr {
        Attribute::Rand(rands) => {
            let mut body = vec![0u8, 0u8];
            for rand in rands {
                body.extend_from_slice(rand);
            }
            push_tlv(out, AttributeType::Rand as u8, &body);
        }
        Attribute::Autn(autn) => {
            let mut body = vec![0u8, 0u8];
            body.extend_from_slice(autn);
            push_tlv(out, AttributeType::Autn as u8, &body);
        }
        Attribute::Res(res) => {
            let bit_len = (res.len() * 8) as u16;
            let mut body = bit_len.to_be_bytes().to_vec();
            body.extend_from_slice(res);
            pad_to_4(&mut body);
            push_tlv(out, AttributeType::Res as u8, &body);
        }
        Attribute::Auts(auts) => push_tlv(out, AttributeType::Auts as u8, auts),
        Attribute::Padding(len) => push_tlv(out, AttributeType::Padding as u8, &vec![0u8; *len]),
        Attribute::NonceMt(nonce) => push_tlv(out, AttributeType::NonceMt as u8, nonce),
        Attribute::PermanentIdReq => push_tlv(out, AttributeType::PermanentIdReq as u8, &[0u8, 0u8]),
        Attribute::AnyIdReq => push_tlv(out, AttributeType::AnyIdReq as u8, &[0u8, 0u8]),
        Attribute::FullauthIdReq => push_tlv(out, AttributeType::FullauthIdReq as u8, &[0u8, 0u8]),
        Attribute::VersionList(versions) => {
            let mut body = ((versions.len() * 2) as u16).to_be_bytes().to_vec();
            for version in versions {
                body.extend_from_slice(&version.to_be_bytes());
            }
            pad_to_4(&mut body);
            push_tlv(out, AttributeType::VersionList as u8, &body);
        }
        Attribute::SelectedVersion(version) => push_tlv(out, AttributeType::SelectedVersion as u8, &version.to_be_bytes()),
        Attribute::Mac(mac) => {
            let mut body = vec![0u8, 0u8];
            body.extend_from_slice(mac);
            push_tlv(out, AttributeType::Mac as u8, &body);
        }
        Attribute::Notification(code) => push_tlv(out, AttributeType::Notification as u8, &code.to_be_bytes()),
        Attribute::Identity(identity) => {
            let mut body = (identity.len() as u16).to_be_bytes().to_vec();
            body.extend_from_slice(identity);
            pad_to_4(&mut body);
            push_tlv(out, AttributeType::Identity as u8, &body);
        }
        Attribute::ClientErrorCode(code) => push_tlv(out, AttributeType::ClientErrorCode as u8, &code.to_be_bytes()),
        Attribute::KdfInput(name) => {
            let mut body = (name.len() as u16).to_be_bytes().to_vec();
            body.extend_from_slice(name);
            pad_to_4(&mut body);
            push_tlv(out, AttributeType::KdfInput as u8, &body);
        }
        Attribute::Kdf(value) => push_tlv(out, AttributeType::Kdf as u8, &value.to_be_bytes()),
        Attribute::Iv(iv) => {
            let mut body = vec![0u8, 0u8];
            body.extend_from_slice(iv);
            push_tlv(out, AttributeType::Iv as u8, &body);
        }
        Attribute::EncrData(data) => {
            let mut body = vec![0u8, 0u8];
            body.extend_from_slice(data);
            pad_to_4(&mut body);
            push_tlv(out, AttributeType::EncrData as u8, &body);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rand_round_trips() {
        let attrs = vec![Attribute::Rand(vec![[0x11u8; 16]])];
        let encoded = encode_attributes(&attrs);
        assert_eq!(parse_attributes(&encoded).unwrap(), attrs);
    }

    #[test]
    fn identity_round_trips_with_padding() {
        let attrs = vec![Attribute::Identity(b"0208930000000001".to_vec())];
        let encoded = encode_attributes(&attrs);
        assert_eq!(encoded.len() % 4, 0);
        assert_eq!(parse_attributes(&encoded).unwrap(), attrs);
    }

    #[test]
    fn unknown_non_skippable_attribute_is_rejected() {
        let bytes = vec![99u8, 1, 0, 0];
        assert!(parse_attributes(&bytes).is_err());
    }

    #[test]
    fn unknown_skippable_attribute_is_ignored() {
        let bytes = vec![200u8, 1, 0, 0];
        assert_eq!(parse_attributes(&bytes).unwrap(), Vec::new());
    }

    #[test]
    fn zero_length_attribute_is_rejected() {
        let bytes = vec![1u8, 0, 0, 0];
        assert!(parse_attributes(&bytes).is_err());
    }
}
