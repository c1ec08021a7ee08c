//! Encoding of the [crate::message::IkeMessage] data model into wire bytes

mod payload;
mod sa;

use zerocopy::AsBytes;
use zerocopy::network_endian::{U32, U64};

use crate::header::Header;
use crate::message::IkeMessage;
use crate::params::{FLAG_INITIATOR, FLAG_RESPONSE, IKE_2_VERSION_VALUE};

/// Everything that can go wrong turning an [IkeMessage] into wire bytes
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// A variable-length field would overflow the wire format's length prefix
    #[error("{field} of length {length} does not fit in its {width} bit wire length field")]
    FieldTooLarge {
        /// Name of the field that overflowed
        field: &'static str,
        /// The length that did not fit
        length: usize,
        /// Bit width of the wire length field
        width: u8,
    },
    /// The message has no payloads to encode, which every exchange this
    /// client drives requires at least one of
    #[error("message has no payloads")]
    EmptyMessage,
}

fn checked_u16(field: &'static str, length: usize) -> Result<u16, GeneratorError> {
    u16::try_from(length).map_err(|_| GeneratorError::FieldTooLarge {
        field,
        length,
        width: 16,
    })
}

/// Encode an ordered list of payloads into a bare chain (no message header),
/// returning the first payload's type alongside the bytes.
///
/// Used both for the outer chain (by [encode_message]) and, once a session
/// has negotiated keys, for the inner chain embedded in an Encrypted
/// payload's plaintext: `ike-session` builds the inner payload list, calls
/// this to get `(first_inner_payload_type, plaintext)`, seals the plaintext
/// with `ike-crypto`, and stores the returned type on
/// [crate::message::EncryptedPayload::first_inner_payload_type].
pub fn encode_payload_chain(payloads: &[crate::message::Payload]) -> Result<(u8, Vec<u8>), GeneratorError> {
    if payloads.is_empty() {
        return Err(GeneratorError::EmptyMessage);
    }

    let mut body = Vec::new();
    for (index, current) in payloads.iter().enumerate() {
        let next_payload_type = payloads
            .get(index + 1)
            .map(|p| p.payload_type() as u8)
            .unwrap_or(0);
        body.extend(payload::encode_payload(current, next_payload_type)?);
    }

    let first_payload_type = payloads[0].payload_type() as u8;
    Ok((first_payload_type, body))
}

/// Encode a full message: header followed by its payload chain
pub fn encode_message(message: &IkeMessage) -> Result<Vec<u8>, GeneratorError> {
    let (first_payload_type, body) = encode_payload_chain(&message.payloads)?;

    let total_length = 28 + body.len();
    let total_length_u32 = u32::try_from(total_length).map_err(|_| GeneratorError::FieldTooLarge {
        field: "message",
        length: total_length,
        width: 32,
    })?;

    let mut flags = 0u8;
    if message.initiator_flag {
        flags |= FLAG_INITIATOR;
    }
    if message.response_flag {
        flags |= FLAG_RESPONSE;
    }

    let header = Header {
        initiator_spi: U64::new(message.initiator_spi),
        responder_spi: U64::new(message.responder_spi),
        next_payload: first_payload_type,
        version: IKE_2_VERSION_VALUE,
        exchange_type: message.exchange_type as u8,
        flags,
        message_id: U32::new(message.message_id),
        length: U32::new(total_length_u32),
    };

    let mut out = Vec::with_capacity(total_length);
    out.extend_from_slice(header.as_bytes());
    out.extend(body);
    Ok(out)
}
