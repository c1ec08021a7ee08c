//! Decoding of the Security Association payload: Proposals, Transforms, Attributes

use zerocopy::FromBytes;

use super::ParserError;
use crate::header::{AttributeHeaderTv, ProposalHeader, TransformHeader};
use crate::params::{
    DiffieHellmanGroup, EncryptionAlgorithm, ExtendedSequenceNumbers, IntegrityAlgorithm,
    PseudorandomFunction, SecurityProtocol, TransformType, FLAG_ATTRIBUTE_FORMAT,
};
use crate::sa::{Proposal, SecurityAssociation, Transform};

/// Key Length attribute type, see RFC 7296 section 3.3.5
const ATTRIBUTE_TYPE_KEY_LENGTH: u16 = 14;

fn parse_transform(buf: &[u8]) -> Result<(Transform, usize), ParserError> {
    super::require(buf, 8)?;
    let (header, _) = TransformHeader::ref_from_prefix(buf)
        .ok_or(ParserError::BufferTooSmall { needed: 8, have: buf.len() })?;
    let transform_length = header.transform_length.get() as usize;
    if transform_length < 8 || transform_length > buf.len() {
        return Err(ParserError::InvalidSyntax("transform length out of bounds"));
    }
    let transform_type = TransformType::try_from(header.transform_type)?;
    let transform_id = header.transform_id.get();

    let mut key_length: Option<u16> = None;
    let mut cursor = 8usize;
    while cursor < transform_length {
        super::require(&buf[cursor..transform_length], 4)?;
        let (attr, _) = AttributeHeaderTv::ref_from_prefix(&buf[cursor..transform_length])
            .ok_or(ParserError::BufferTooSmall { needed: 4, have: transform_length - cursor })?;
        let raw_type = attr.attribute_type.get();
        if raw_type & FLAG_ATTRIBUTE_FORMAT == 0 {
            return Err(ParserError::InvalidSyntax(
                "only TV-form transform attributes are supported",
            ));
        }
        if raw_type & !FLAG_ATTRIBUTE_FORMAT == ATTRIBUTE_TYPE_KEY_LENGTH {
            key_length = Some(attr.attribute_value.get());
        }
        cursor += 4;
    }

    let transform = match transform_type {
        TransformType::EncryptionAlgorithm => {
            Transform::Encryption(EncryptionAlgorithm::try_from(transform_id)?, key_length)
        }
        TransformType::PseudoRandomFunction => {
            Transform::PseudoRandomFunction(PseudorandomFunction::try_from(transform_id)?)
        }
        TransformType::IntegrityAlgorithm => {
            Transform::Integrity(IntegrityAlgorithm::try_from(transform_id)?)
        }
        TransformType::DiffieHellmanGroup => {
            Transform::KeyExchange(DiffieHellmanGroup::try_from(transform_id)?)
        }
        TransformType::ExtendedSequenceNumbers => {
            Transform::SequenceNumber(ExtendedSequenceNumbers::try_from(transform_id)?)
        }
    };

    Ok((transform, transform_length))
}

fn parse_proposal(buf: &[u8]) -> Result<(Proposal, usize, bool), ParserError> {
    super::require(buf, 8)?;
    let (header, _) = ProposalHeader::ref_from_prefix(buf)
        .ok_or(ParserError::BufferTooSmall { needed: 8, have: buf.len() })?;
    let proposal_length = header.proposal_length.get() as usize;
    if proposal_length < 8 || proposal_length > buf.len() {
        return Err(ParserError::InvalidSyntax("proposal length out of bounds"));
    }
    let is_last = header.last_substruct == 0;
    let protocol = SecurityProtocol::try_from(header.protocol_id)?;
    let spi_size = header.spi_size as usize;
    let num_transforms = header.num_transforms as usize;

    let mut cursor = 8usize;
    super::require(&buf[cursor..proposal_length], spi_size)?;
    let spi = buf[cursor..cursor + spi_size].to_vec();
    cursor += spi_size;

    let mut proposal = Proposal::new_empty(protocol, Some(spi));
    for _ in 0..num_transforms {
        let (transform, consumed) = parse_transform(&buf[cursor..proposal_length])?;
        proposal.add([transform]);
        cursor += consumed;
    }

    if cursor != proposal_length {
        return Err(ParserError::InvalidSyntax(
            "proposal transforms did not exactly fill the declared proposal length",
        ));
    }

    Ok((proposal, proposal_length, is_last))
}

/// Decode a full Security Association payload body (the part after the
/// generic 4 byte payload header)
pub fn parse_security_association(buf: &[u8]) -> Result<SecurityAssociation, ParserError> {
    let mut proposals = Vec::new();
    let mut cursor = 0usize;
    let mut expected_num = 1u8;

    loop {
        let (proposal, consumed, is_last) = parse_proposal(&buf[cursor..])?;
        proposals.push(proposal);
        cursor += consumed;
        expected_num += 1;
        if is_last {
            break;
        }
        if cursor >= buf.len() {
            return Err(ParserError::InvalidSyntax(
                "proposal chain ended without a last_substruct of 0",
            ));
        }
    }
    let _ = expected_num;

    if cursor != buf.len() {
        return Err(ParserError::InvalidSyntax(
            "security association proposals did not exactly fill the payload",
        ));
    }

    Ok(SecurityAssociation { proposals })
}
