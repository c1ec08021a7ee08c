//! Decoding of wire bytes into the [crate::message::IkeMessage] data model

mod payload;
mod sa;

use zerocopy::FromBytes;

use crate::header::{GenericPayloadHeader, Header};
use crate::message::{IkeMessage, Payload};
use crate::params::{ExchangeType, PayloadType, FLAG_INITIATOR, FLAG_RESPONSE};
use crate::UnparseableParameter;

/// Everything that can go wrong turning bytes into an [IkeMessage]
#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    /// Fewer bytes remain than the structure being decoded requires
    #[error("buffer too small, need at least {needed} bytes, have {have}")]
    BufferTooSmall {
        /// Bytes required
        needed: usize,
        /// Bytes actually available
        have: usize,
    },
    /// The header's major/minor version field was not 2.0
    #[error("unsupported IKE version {0:#04x}, only 2.0 is supported")]
    UnsupportedVersion(u8),
    /// An IANA-registered numeric parameter could not be decoded
    #[error("unparseable parameter: {0}")]
    UnparseableParameter(#[from] UnparseableParameter),
    /// A length field disagreed with the number of bytes actually present
    #[error("length mismatch: header claims {claimed}, buffer has {actual}")]
    LengthMismatch {
        /// Length claimed by the header
        claimed: usize,
        /// Length actually available
        actual: usize,
    },
    /// A structural invariant the RFC requires was violated
    #[error("invalid syntax: {0}")]
    InvalidSyntax(&'static str),
    /// A payload of a type not valid in the current context was encountered
    #[error("unexpected payload type {0:?}")]
    UnexpectedPayload(PayloadType),
}

/// A parsed piece of data plus the number of bytes consumed to produce it
pub type ParserResult<T> = Result<(T, usize), ParserError>;

fn require(buf: &[u8], needed: usize) -> Result<(), ParserError> {
    if buf.len() < needed {
        Err(ParserError::BufferTooSmall {
            needed,
            have: buf.len(),
        })
    } else {
        Ok(())
    }
}

/// Parse a full message, header and payload chain, from raw bytes
pub fn parse_message(buf: &[u8]) -> Result<IkeMessage, ParserError> {
    require(buf, 28)?;
    let (header, _) =
        Header::ref_from_prefix(buf).ok_or(ParserError::BufferTooSmall { needed: 28, have: buf.len() })?;

    if header.version != crate::params::IKE_2_VERSION_VALUE {
        return Err(ParserError::UnsupportedVersion(header.version));
    }

    let total_length = header.length.get() as usize;
    if total_length > buf.len() {
        return Err(ParserError::LengthMismatch {
            claimed: total_length,
            actual: buf.len(),
        });
    }

    let exchange_type = ExchangeType::try_from(header.exchange_type)?;
    let flags = header.flags;

    let mut message = IkeMessage::new(
        header.initiator_spi.get(),
        header.responder_spi.get(),
        exchange_type,
        flags & FLAG_INITIATOR != 0,
        flags & FLAG_RESPONSE != 0,
        header.message_id.get(),
    );

    message.payloads = parse_payload_chain(header.next_payload, &buf[28..total_length])?;

    Ok(message)
}

/// Walk a bare payload chain (no message header), starting from
/// `first_payload_type` (the enclosing header's Next Payload field), until
/// `NoNextPayload` or the buffer is exhausted.
///
/// Used both for the outer chain (by [parse_message], given the IKE
/// header's own Next Payload field) and, once a session holds keys, for the
/// inner chain embedded in a decrypted Encrypted payload: `ike-session`
/// calls this with [crate::message::EncryptedPayload::first_inner_payload_type]
/// and the plaintext `ike_crypto::SecuredChannel::open` returned.
pub fn parse_payload_chain(first_payload_type: u8, buf: &[u8]) -> Result<Vec<Payload>, ParserError> {
    let mut payloads = Vec::new();
    let mut next_payload = first_payload_type;
    let mut cursor = 0usize;
    let total_length = buf.len();

    while next_payload != PayloadType::NoNextPayload as u8 && cursor < total_length {
        require(&buf[cursor..total_length], 4)?;
        let (generic, _) = GenericPayloadHeader::ref_from_prefix(&buf[cursor..total_length])
            .ok_or(ParserError::BufferTooSmall { needed: 4, have: total_length - cursor })?;
        let payload_length = generic.payload_length.get() as usize;
        if payload_length < 4 || cursor + payload_length > total_length {
            return Err(ParserError::InvalidSyntax(
                "payload length field out of bounds",
            ));
        }

        let this_next_payload = generic.next_payload;
        let body = &buf[cursor + 4..cursor + payload_length];
        let payload_type = PayloadType::try_from(next_payload)?;

        // The Encrypted payload consumes the rest of the chain as ciphertext,
        // including any payloads that would normally follow; it is always last.
        if payload_type == PayloadType::EncryptedAndAuthenticated {
            let encrypted_body = &buf[cursor + 4..total_length];
            payloads.push(payload::parse_encrypted(encrypted_body, this_next_payload)?);
            break;
        }

        payloads.push(payload::parse_payload(payload_type, body)?);

        next_payload = this_next_payload;
        cursor += payload_length;
    }

    if next_payload != PayloadType::NoNextPayload as u8 {
        return Err(ParserError::InvalidSyntax(
            "payload chain ended before its next-payload field reached NoNextPayload",
        ));
    }

    Ok(payloads)
}
