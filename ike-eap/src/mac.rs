//! AT_MAC computation, RFC 4187 section 10.15 / RFC 4186 section 10.14:
//! HMAC-SHA1, truncated to 128 bits, over the full EAP packet with the
//! AT_MAC attribute's value field zeroed.

use hmac::Mac;

use crate::error::EapError;

type HmacSha1 = hmac::Hmac<sha1::Sha1>;

/// Compute the truncated HMAC-SHA1-128 AT_MAC value
pub fn compute_mac(k_aut: &[u8; 16], message_with_mac_zeroed: &[u8]) -> Result<[u8; 16], EapError> {
    let mut mac = HmacSha1::new_from_slice(k_aut).map_err(|_| EapError::Internal("hmac-sha1 key"))?;
    mac.update(message_with_mac_zeroed);
    let full = mac.finalize().into_bytes();
    let mut out = [0u8; 16];
    out.copy_from_slice(&full[..16]);
    Ok(out)
}

/// Write `value` into the 16-byte AT_MAC value field inside an encoded
/// type-data buffer in place (the attribute's value starts 4 bytes into its
/// TLV: type, length, 2 reserved bytes)
///
/// Used both to zero the field before computing a MAC and to patch in the
/// computed value afterwards.
pub fn write_mac_value(type_data: &mut [u8], value: &[u8; 16]) -> Result<(), EapError> {
    let mut cursor = 3usize; // skip Subtype + Reserved(2)
    while cursor + 2 <= type_data.len() {
        let attribute_type = type_data[cursor];
        let length_words = type_data[cursor + 1];
        if length_words == 0 {
            return Err(EapError::InvalidSyntax("zero-length attribute while scanning for AT_MAC"));
        }
        let total_len = length_words as usize * 4;
        if cursor + total_len > type_data.len() {
            return Err(EapError::InvalidSyntax("attribute overruns buffer while scanning for AT_MAC"));
        }
        if attribute_type == crate::attributes::AttributeType::Mac as u8 {
            let value_start = cursor + 4;
            let value_end = cursor + total_len;
            type_data[value_start..value_end].copy_from_slice(value);
            return Ok(());
        }
        cursor += total_len;
    }
    Err(EapError::InvalidSyntax("AT_MAC not present"))
}

/// Zero the AT_MAC value field, see [write_mac_value]
pub fn zero_mac_attribute(type_data: &mut [u8]) -> Result<(), EapError> {
    write_mac_value(type_data, &[0u8; 16])
}

/// Compute and write this message's AT_MAC value in one step: zero the
/// field, encode, compute the MAC over the zeroed encoding, then patch the
/// real value back in
pub fn sign_message(message: &mut crate::message::EapMessage, k_aut: &[u8; 16]) -> Result<(), EapError> {
    zero_mac_attribute(&mut message.type_data)?;
    let encoded = message.encode();
    let computed = compute_mac(k_aut, &encoded)?;
    write_mac_value(&mut message.type_data, &computed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{encode_attributes, Attribute};

    #[test]
    fn zeroing_mac_attribute_preserves_length() {
        let attrs = vec![Attribute::Mac([0xAAu8; 16])];
        let mut type_data = vec![1u8, 0, 0]; // subtype + reserved
        type_data.extend_from_slice(&encode_attributes(&attrs));
        let before_len = type_data.len();
        zero_mac_attribute(&mut type_data).unwrap();
        assert_eq!(type_data.len(), before_len);
        assert!(type_data[7..23].iter().all(|&b| b == 0));
    }

    #[test]
    fn mac_is_deterministic() {
        let k_aut = [0x2bu8; 16];
        let a = compute_mac(&k_aut, b"some eap message bytes").unwrap();
        let b = compute_mac(&k_aut, b"some eap message bytes").unwrap();
        assert_eq!(a, b);
    }
}
