//! Encoding of everything except the Security Association payload, which
//! lives in [super::sa] given its nested Proposal/Transform/Attribute structure.

use zerocopy::network_endian::U16;
use zerocopy::AsBytes;

use super::{checked_u16, GeneratorError};
use crate::config::ConfigurationPayload;
use crate::delete::DeletePayload;
use crate::header::{
    AuthenticationHeader, CertificateHeader, ConfigAttributeHeader, ConfigurationHeader,
    DeleteHeader, GenericPayloadHeader, IdentificationHeader, KeyExchangeHeader, NotifyHeader,
    TrafficSelectorHeader, TrafficSelectorPayloadHeader,
};
use crate::identification::IkeIdentification;
use crate::message::{EncryptedPayload, Payload};
use crate::notify::{NotifyMessageType, NotifyPayload};
use crate::traffic_selector::IkeTrafficSelector;

fn wrap(next_payload_type: u8, body: Vec<u8>) -> Result<Vec<u8>, GeneratorError> {
    let payload_length = checked_u16("payload_length", 4 + body.len())?;
    let header = GenericPayloadHeader {
        next_payload: next_payload_type,
        reserved: 0,
        payload_length: U16::new(payload_length),
    };
    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(header.as_bytes());
    out.extend(body);
    Ok(out)
}

/// Encode a payload, including its generic 4 byte header
///
/// For every payload type except [Payload::Encrypted], `next_payload_type`
/// is the type of the payload that follows in the outer chain. The
/// Encrypted payload is always last in the outer chain (RFC 7296 section
/// 3.14), so its generic header's Next Payload field is repurposed by the
/// RFC to instead name the first payload type of its *inner* chain; that
/// value lives on [EncryptedPayload::first_inner_payload_type] rather than
/// being taken from `next_payload_type`.
pub fn encode_payload(payload: &Payload, next_payload_type: u8) -> Result<Vec<u8>, GeneratorError> {
    if let Payload::Encrypted(encrypted) = payload {
        return wrap(encrypted.first_inner_payload_type, encode_encrypted(encrypted));
    }

    let body = match payload {
        Payload::SecurityAssociation(sa) => super::sa::encode_security_association(sa)?,
        Payload::KeyExchange { group, public_value } => encode_key_exchange(*group, public_value),
        Payload::IdentificationInitiator(id) | Payload::IdentificationResponder(id) => {
            encode_identification(id)
        }
        Payload::Certificate { encoding, data } => encode_certificate(*encoding, data),
        Payload::CertificateRequest {
            encoding,
            certificate_authority,
        } => encode_certificate(*encoding, certificate_authority),
        Payload::Authentication { method, data } => encode_authentication(*method, data),
        Payload::Nonce(data) => data.clone(),
        Payload::Notify(notify) => encode_notify(notify),
        Payload::Delete(delete) => encode_delete(delete)?,
        Payload::VendorId(data) => data.clone(),
        Payload::TrafficSelectorInitiator(selectors) | Payload::TrafficSelectorResponder(selectors) => {
            encode_traffic_selectors(selectors)?
        }
        Payload::Encrypted(_) => unreachable!("handled above"),
        Payload::Configuration(config) => encode_configuration(config)?,
        Payload::ExtensibleAuthentication(data) => data.clone(),
    };
    wrap(next_payload_type, body)
}

fn encode_key_exchange(group: crate::params::DiffieHellmanGroup, public_value: &[u8]) -> Vec<u8> {
    let header = KeyExchangeHeader {
        dh_group_num: U16::new(group as u16),
        reserved: U16::new(0),
    };
    let mut out = Vec::with_capacity(4 + public_value.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(public_value);
    out
}

fn encode_identification(id: &IkeIdentification) -> Vec<u8> {
    let header = IdentificationHeader {
        id_type: id.id_type() as u8,
        reserved: [0; 3],
    };
    let body = id.body();
    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(header.as_bytes());
    out.extend(body);
    out
}

fn encode_certificate(encoding: crate::params::CertificateEncoding, data: &[u8]) -> Vec<u8> {
    let header = CertificateHeader {
        cert_encoding: encoding as u8,
    };
    let mut out = Vec::with_capacity(1 + data.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(data);
    out
}

fn encode_authentication(method: crate::params::AuthenticationMethod, data: &[u8]) -> Vec<u8> {
    let header = AuthenticationHeader {
        auth_method: method as u8,
        reserved: [0; 3],
    };
    let mut out = Vec::with_capacity(4 + data.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(data);
    out
}

fn encode_notify(notify: &NotifyPayload) -> Vec<u8> {
    let raw_type = match notify.message_type {
        NotifyMessageType::Error(e) => e as u16,
        NotifyMessageType::Status(s) => s as u16,
    };
    let header = NotifyHeader {
        protocol_id: notify.protocol.map(|p| p as u8).unwrap_or(0),
        spi_size: notify.spi.len() as u8,
        notify_message_type: U16::new(raw_type),
    };
    let mut out = Vec::with_capacity(4 + notify.spi.len() + notify.data.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(&notify.spi);
    out.extend_from_slice(&notify.data);
    out
}

fn encode_delete(delete: &DeletePayload) -> Result<Vec<u8>, GeneratorError> {
    let header = DeleteHeader {
        protocol_id: delete.protocol as u8,
        spi_size: delete.spi_size,
        num_spis: U16::new(checked_u16("num_spis", delete.spis.len())?),
    };
    let mut out = Vec::with_capacity(4 + delete.spis.len() * delete.spi_size as usize);
    out.extend_from_slice(header.as_bytes());
    for spi in &delete.spis {
        out.extend_from_slice(spi);
    }
    Ok(out)
}

fn encode_traffic_selectors(selectors: &[IkeTrafficSelector]) -> Result<Vec<u8>, GeneratorError> {
    let header = TrafficSelectorPayloadHeader {
        num_ts: selectors.len() as u8,
        reserved: [0; 3],
    };
    let mut out = Vec::with_capacity(4 + selectors.len() * 16);
    out.extend_from_slice(header.as_bytes());
    for selector in selectors {
        let ts_header = TrafficSelectorHeader {
            ts_type: crate::params::TrafficSelectorType::Ipv4AddrRange as u8,
            ip_protocol_id: selector.ip_protocol_id,
            selector_length: U16::new(16),
            start_port: U16::new(selector.start_port),
            end_port: U16::new(selector.end_port),
        };
        out.extend_from_slice(ts_header.as_bytes());
        out.extend_from_slice(&selector.start_address.octets());
        out.extend_from_slice(&selector.end_address.octets());
    }
    Ok(out)
}

fn encode_encrypted(encrypted: &EncryptedPayload) -> Vec<u8> {
    let mut out = Vec::with_capacity(encrypted.iv.len() + encrypted.ciphertext.len());
    out.extend_from_slice(&encrypted.iv);
    out.extend_from_slice(&encrypted.ciphertext);
    out
}

fn encode_configuration(config: &ConfigurationPayload) -> Result<Vec<u8>, GeneratorError> {
    let header = ConfigurationHeader {
        cfg_type: config.cfg_type as u8,
        reserved: [0; 3],
    };
    let mut out = vec![];
    out.extend_from_slice(header.as_bytes());
    for attribute in &config.attributes {
        let value = attribute.value();
        let attr_header = ConfigAttributeHeader {
            attribute_type: U16::new(attribute.attribute_type() as u16),
            length: U16::new(checked_u16("config attribute length", value.len())?),
        };
        out.extend_from_slice(attr_header.as_bytes());
        out.extend_from_slice(&value);
    }
    Ok(out)
}
