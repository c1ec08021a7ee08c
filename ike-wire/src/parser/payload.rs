//! Decoding of everything except the Security Association payload, which
//! lives in [super::sa] given its nested Proposal/Transform/Attribute structure.

use std::net::{Ipv4Addr, Ipv6Addr};

use zerocopy::FromBytes;

use super::{require, ParserError};
use crate::config::{ConfigAttribute, ConfigurationPayload};
use crate::delete::DeletePayload;
use crate::header::{
    AuthenticationHeader, CertificateHeader, ConfigAttributeHeader, ConfigurationHeader,
    DeleteHeader, IdentificationHeader, KeyExchangeHeader, NotifyHeader, TrafficSelectorHeader,
    TrafficSelectorPayloadHeader,
};
use crate::identification::IkeIdentification;
use crate::message::{EncryptedPayload, Payload};
use crate::notify::{NotifyMessageType, NotifyPayload};
use crate::params::{
    AuthenticationMethod, CertificateEncoding, ConfigAttributeType, ConfigType, DiffieHellmanGroup,
    IdentificationType, NotifyErrorType, NotifyStatusType, PayloadType, SecurityProtocol,
    TrafficSelectorType,
};
use crate::traffic_selector::IkeTrafficSelector;

/// Dispatch a payload body to the decoder matching its declared type
pub fn parse_payload(payload_type: PayloadType, body: &[u8]) -> Result<Payload, ParserError> {
    match payload_type {
        PayloadType::SecurityAssociation => Ok(Payload::SecurityAssociation(
            super::sa::parse_security_association(body)?,
        )),
        PayloadType::KeyExchange => parse_key_exchange(body),
        PayloadType::IdentificationInitiator => {
            Ok(Payload::IdentificationInitiator(parse_identification(body)?))
        }
        PayloadType::IdentificationResponder => {
            Ok(Payload::IdentificationResponder(parse_identification(body)?))
        }
        PayloadType::Certificate => parse_certificate(body),
        PayloadType::CertificateRequest => parse_certificate_request(body),
        PayloadType::Authentication => parse_authentication(body),
        PayloadType::Nonce => Ok(Payload::Nonce(body.to_vec())),
        PayloadType::Notify => parse_notify(body),
        PayloadType::Delete => parse_delete(body),
        PayloadType::VendorID => Ok(Payload::VendorId(body.to_vec())),
        PayloadType::TrafficSelectorInitiator => {
            Ok(Payload::TrafficSelectorInitiator(parse_traffic_selectors(body)?))
        }
        PayloadType::TrafficSelectorResponder => {
            Ok(Payload::TrafficSelectorResponder(parse_traffic_selectors(body)?))
        }
        PayloadType::Configuration => parse_configuration(body),
        PayloadType::ExtensibleAuthentication => Ok(Payload::ExtensibleAuthentication(body.to_vec())),
        // The generic header's own next-payload field (the type of the
        // payload that would follow SK, always `NoNextPayload` since SK is
        // terminal) does not carry the inner chain's first payload type;
        // `parse_message` reads that off the *preceding* generic header
        // before dispatch and threads it through `parse_encrypted` directly.
        PayloadType::EncryptedAndAuthenticated => parse_encrypted(body, 0),
        PayloadType::NoNextPayload => Err(ParserError::UnexpectedPayload(payload_type)),
    }
}

/// Decode an Encrypted payload's IV/ciphertext framing without attempting
/// decryption, see RFC 7296 section 3.14
///
/// `first_inner_payload_type` is the SK payload's own generic-header Next
/// Payload field, which the caller (`parser::parse_message`) reads before
/// dispatching here, since that field names the first inner payload type.
pub fn parse_encrypted(body: &[u8], first_inner_payload_type: u8) -> Result<Payload, ParserError> {
    // The IV length depends on the negotiated transform and is not known at
    // this layer; callers with key material re-slice `ciphertext` themselves
    // once the transform is known. Here the whole body is kept as ciphertext
    // with an empty IV so no assumption about transform is baked in.
    Ok(Payload::Encrypted(EncryptedPayload {
        iv: Vec::new(),
        ciphertext: body.to_vec(),
        first_inner_payload_type,
    }))
}

fn parse_key_exchange(body: &[u8]) -> Result<Payload, ParserError> {
    require(body, 4)?;
    let (header, _) = KeyExchangeHeader::ref_from_prefix(body)
        .ok_or(ParserError::BufferTooSmall { needed: 4, have: body.len() })?;
    let group = DiffieHellmanGroup::try_from(header.dh_group_num.get())?;
    Ok(Payload::KeyExchange {
        group,
        public_value: body[4..].to_vec(),
    })
}

fn parse_identification(body: &[u8]) -> Result<IkeIdentification, ParserError> {
    require(body, 4)?;
    let (header, _) = IdentificationHeader::ref_from_prefix(body)
        .ok_or(ParserError::BufferTooSmall { needed: 4, have: body.len() })?;
    let id_type = IdentificationType::try_from(header.id_type)?;
    let data = &body[4..];
    match id_type {
        IdentificationType::Ipv4Addr => {
            require(data, 4)?;
            let octets: [u8; 4] = data[..4].try_into().map_err(|_| {
                ParserError::InvalidSyntax("ID_IPV4_ADDR must be exactly 4 octets")
            })?;
            Ok(IkeIdentification::Ipv4Addr(Ipv4Addr::from(octets)))
        }
        IdentificationType::Ipv6Addr => {
            require(data, 16)?;
            let octets: [u8; 16] = data[..16].try_into().map_err(|_| {
                ParserError::InvalidSyntax("ID_IPV6_ADDR must be exactly 16 octets")
            })?;
            Ok(IkeIdentification::Ipv6Addr(Ipv6Addr::from(octets)))
        }
        IdentificationType::Fqdn => Ok(IkeIdentification::Fqdn(
            String::from_utf8(data.to_vec())
                .map_err(|_| ParserError::InvalidSyntax("ID_FQDN is not valid UTF-8"))?,
        )),
        IdentificationType::Rfc822Addr => Ok(IkeIdentification::Rfc822Addr(
            String::from_utf8(data.to_vec())
                .map_err(|_| ParserError::InvalidSyntax("ID_RFC822_ADDR is not valid UTF-8"))?,
        )),
        IdentificationType::KeyId => Ok(IkeIdentification::KeyId(data.to_vec())),
        IdentificationType::DerAsn1Dn => Err(ParserError::InvalidSyntax(
            "ID_DER_ASN1_DN identities are not supported",
        )),
    }
}

fn parse_certificate(body: &[u8]) -> Result<Payload, ParserError> {
    require(body, 1)?;
    let (header, _) = CertificateHeader::ref_from_prefix(body)
        .ok_or(ParserError::BufferTooSmall { needed: 1, have: body.len() })?;
    Ok(Payload::Certificate {
        encoding: CertificateEncoding::try_from(header.cert_encoding)?,
        data: body[1..].to_vec(),
    })
}

fn parse_certificate_request(body: &[u8]) -> Result<Payload, ParserError> {
    require(body, 1)?;
    let (header, _) = CertificateHeader::ref_from_prefix(body)
        .ok_or(ParserError::BufferTooSmall { needed: 1, have: body.len() })?;
    Ok(Payload::CertificateRequest {
        encoding: CertificateEncoding::try_from(header.cert_encoding)?,
        certificate_authority: body[1..].to_vec(),
    })
}

fn parse_authentication(body: &[u8]) -> Result<Payload, ParserError> {
    require(body, 4)?;
    let (header, _) = AuthenticationHeader::ref_from_prefix(body)
        .ok_or(ParserError::BufferTooSmall { needed: 4, have: body.len() })?;
    Ok(Payload::Authentication {
        method: AuthenticationMethod::try_from(header.auth_method)?,
        data: body[4..].to_vec(),
    })
}

fn parse_notify(body: &[u8]) -> Result<Payload, ParserError> {
    require(body, 4)?;
    let (header, _) = NotifyHeader::ref_from_prefix(body)
        .ok_or(ParserError::BufferTooSmall { needed: 4, have: body.len() })?;
    let spi_size = header.spi_size as usize;
    let protocol = if header.protocol_id == 0 {
        None
    } else {
        Some(SecurityProtocol::try_from(header.protocol_id)?)
    };
    require(&body[4..], spi_size)?;
    let spi = body[4..4 + spi_size].to_vec();
    let data = body[4 + spi_size..].to_vec();
    let raw_type = header.notify_message_type.get();
    let message_type = if header.is_error() {
        NotifyMessageType::Error(NotifyErrorType::try_from(raw_type)?)
    } else {
        NotifyMessageType::Status(NotifyStatusType::try_from(raw_type)?)
    };
    Ok(Payload::Notify(NotifyPayload {
        protocol,
        spi,
        message_type,
        data,
    }))
}

fn parse_delete(body: &[u8]) -> Result<Payload, ParserError> {
    require(body, 4)?;
    let (header, _) = DeleteHeader::ref_from_prefix(body)
        .ok_or(ParserError::BufferTooSmall { needed: 4, have: body.len() })?;
    let protocol = SecurityProtocol::try_from(header.protocol_id)?;
    let spi_size = header.spi_size as usize;
    let num_spis = header.num_spis.get() as usize;
    let mut spis = Vec::with_capacity(num_spis);
    let mut cursor = 4usize;
    for _ in 0..num_spis {
        require(&body[cursor..], spi_size)?;
        spis.push(body[cursor..cursor + spi_size].to_vec());
        cursor += spi_size;
    }
    if cursor != body.len() {
        return Err(ParserError::InvalidSyntax(
            "delete payload SPIs did not exactly fill the payload",
        ));
    }
    Ok(Payload::Delete(DeletePayload {
        protocol,
        spi_size: spi_size as u8,
        spis,
    }))
}

fn parse_traffic_selectors(body: &[u8]) -> Result<Vec<IkeTrafficSelector>, ParserError> {
    require(body, 4)?;
    let (header, _) = TrafficSelectorPayloadHeader::ref_from_prefix(body)
        .ok_or(ParserError::BufferTooSmall { needed: 4, have: body.len() })?;
    let num_ts = header.num_ts as usize;
    let mut selectors = Vec::with_capacity(num_ts);
    let mut cursor = 4usize;
    for _ in 0..num_ts {
        require(&body[cursor..], 8)?;
        let (ts_header, _) = TrafficSelectorHeader::ref_from_prefix(&body[cursor..])
            .ok_or(ParserError::BufferTooSmall { needed: 8, have: body.len() - cursor })?;
        let selector_length = ts_header.selector_length.get() as usize;
        let ts_type = TrafficSelectorType::try_from(ts_header.ts_type)?;
        if ts_type != TrafficSelectorType::Ipv4AddrRange {
            return Err(ParserError::InvalidSyntax(
                "only IPv4 traffic selectors are supported",
            ));
        }
        if selector_length != 16 {
            return Err(ParserError::InvalidSyntax(
                "IPv4 traffic selector must be exactly 16 octets",
            ));
        }
        require(&body[cursor..], selector_length)?;
        let addr_bytes = &body[cursor + 8..cursor + 16];
        let start: [u8; 4] = addr_bytes[0..4].try_into().map_err(|_| {
            ParserError::InvalidSyntax("traffic selector start address malformed")
        })?;
        let end: [u8; 4] = addr_bytes[4..8].try_into().map_err(|_| {
            ParserError::InvalidSyntax("traffic selector end address malformed")
        })?;
        let selector = IkeTrafficSelector::new(
            ts_header.ip_protocol_id,
            ts_header.start_port.get(),
            ts_header.end_port.get(),
            Ipv4Addr::from(start),
            Ipv4Addr::from(end),
        )
        .map_err(|_| ParserError::InvalidSyntax("traffic selector range is reversed"))?;
        selectors.push(selector);
        cursor += selector_length;
    }
    if cursor != body.len() {
        return Err(ParserError::InvalidSyntax(
            "traffic selectors did not exactly fill the payload",
        ));
    }
    Ok(selectors)
}

fn parse_configuration(body: &[u8]) -> Result<Payload, ParserError> {
    require(body, 4)?;
    let (header, _) = ConfigurationHeader::ref_from_prefix(body)
        .ok_or(ParserError::BufferTooSmall { needed: 4, have: body.len() })?;
    let cfg_type = ConfigType::try_from(header.cfg_type)?;
    let mut attributes = Vec::new();
    let mut cursor = 4usize;
    while cursor < body.len() {
        require(&body[cursor..], 4)?;
        let (attr_header, _) = ConfigAttributeHeader::ref_from_prefix(&body[cursor..])
            .ok_or(ParserError::BufferTooSmall { needed: 4, have: body.len() - cursor })?;
        let length = attr_header.length.get() as usize;
        let raw_type = attr_header.attribute_type.get();
        require(&body[cursor + 4..], length)?;
        let value = &body[cursor + 4..cursor + 4 + length];

        if let Ok(attribute_type) = ConfigAttributeType::try_from(raw_type) {
            let address = if value.len() == 4 {
                let octets: [u8; 4] = value.try_into().map_err(|_| {
                    ParserError::InvalidSyntax("configuration attribute value malformed")
                })?;
                Some(Ipv4Addr::from(octets))
            } else {
                None
            };
            let attribute = match attribute_type {
                ConfigAttributeType::InternalIp4Address => ConfigAttribute::InternalIp4Address(address),
                ConfigAttributeType::InternalIp4Netmask => ConfigAttribute::InternalIp4Netmask(address),
                ConfigAttributeType::InternalIp4Dns => ConfigAttribute::InternalIp4Dns(address),
                ConfigAttributeType::InternalIp6Address | ConfigAttributeType::InternalIp6Dns => {
                    log::trace!("skipping unsupported IPv6 configuration attribute {raw_type}");
                    cursor += 4 + length;
                    continue;
                }
            };
            attributes.push(attribute);
        } else {
            log::trace!("skipping unrecognized configuration attribute type {raw_type}");
        }
        cursor += 4 + length;
    }
    Ok(Payload::Configuration(ConfigurationPayload {
        cfg_type,
        attributes,
    }))
}
