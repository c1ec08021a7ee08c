//! Encoding of the Security Association payload: Proposals, Transforms, Attributes

use zerocopy::network_endian::U16;
use zerocopy::AsBytes;

use super::{checked_u16, GeneratorError};
use crate::header::{AttributeHeaderTv, ProposalHeader, TransformHeader};
use crate::params::FLAG_ATTRIBUTE_FORMAT;
use crate::sa::{Proposal, SecurityAssociation, Transform};

const ATTRIBUTE_TYPE_KEY_LENGTH: u16 = 14;

fn encode_transform(transform: &Transform) -> Result<Vec<u8>, GeneratorError> {
    let (transform_id, key_length) = match *transform {
        Transform::Encryption(algorithm, key_length) => (algorithm as u16, key_length),
        Transform::PseudoRandomFunction(prf) => (prf as u16, None),
        Transform::Integrity(integrity) => (integrity as u16, None),
        Transform::KeyExchange(group) => (group as u16, None),
        Transform::SequenceNumber(esn) => (esn as u16, None),
    };

    let attribute = key_length.map(|bits| AttributeHeaderTv {
        attribute_type: U16::new(FLAG_ATTRIBUTE_FORMAT | ATTRIBUTE_TYPE_KEY_LENGTH),
        attribute_value: U16::new(bits),
    });

    let length = 8 + attribute.map(|_| 4).unwrap_or(0);
    let header = TransformHeader {
        last_substruct: 0, // patched by the caller, which knows position in the list
        reserved: 0,
        transform_length: U16::new(checked_u16("transform_length", length)?),
        transform_type: transform.transform_type() as u8,
        reserved2: 0,
        transform_id: U16::new(transform_id),
    };

    let mut out = Vec::with_capacity(length);
    out.extend_from_slice(header.as_bytes());
    if let Some(attribute) = attribute {
        out.extend_from_slice(attribute.as_bytes());
    }
    Ok(out)
}

fn encode_proposal(proposal_num: u8, proposal: &Proposal, is_last: bool) -> Result<Vec<u8>, GeneratorError> {
    let transforms = proposal.transforms();
    let mut encoded_transforms = Vec::with_capacity(transforms.len());
    for transform in &transforms {
        encoded_transforms.push(encode_transform(transform)?);
    }
    // last_substruct on a Transform is 0 for the last transform, 3 otherwise.
    if let Some(last) = encoded_transforms.last_mut() {
        last[0] = 0;
    }
    for chunk in encoded_transforms.iter_mut().rev().skip(1) {
        chunk[0] = 3;
    }

    let body_length: usize =
        8 + proposal.spi.len() + encoded_transforms.iter().map(Vec::len).sum::<usize>();

    let header = ProposalHeader {
        last_substruct: if is_last { 0 } else { 2 },
        reserved: 0,
        proposal_length: U16::new(checked_u16("proposal_length", body_length)?),
        proposal_num,
        protocol_id: proposal
            .protocol
            .map(|p| p as u8)
            .unwrap_or(1),
        spi_size: proposal.spi.len() as u8,
        num_transforms: transforms.len() as u8,
    };

    let mut out = Vec::with_capacity(body_length);
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(&proposal.spi);
    for transform in encoded_transforms {
        out.extend(transform);
    }
    Ok(out)
}

/// Encode a full Security Association payload body (the part after the
/// generic 4 byte payload header)
pub fn encode_security_association(sa: &SecurityAssociation) -> Result<Vec<u8>, GeneratorError> {
    let mut out = Vec::new();
    let last_index = sa.proposals.len().saturating_sub(1);
    for (index, proposal) in sa.proposals.iter().enumerate() {
        out.extend(encode_proposal(
            (index + 1) as u8,
            proposal,
            index == last_index,
        )?);
    }
    Ok(out)
}
