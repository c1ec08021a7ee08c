//! EAP message framing, RFC 3748 section 4: `Code | Identifier | Length |
//! [Type | Type-Data]`. Success and Failure carry no Type/Type-Data.

use crate::error::EapError;

/// EAP Code field, RFC 3748 section 4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EapCode {
    /// Request
    Request = 1,
    /// Response
    Response = 2,
    /// Success (no Type/Type-Data, no further exchange for this EAP run)
    Success = 3,
    /// Failure (no Type/Type-Data)
    Failure = 4,
}

impl TryFrom<u8> for EapCode {
    type Error = EapError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EapCode::Request),
            2 => Ok(EapCode::Response),
            3 => Ok(EapCode::Success),
            4 => Ok(EapCode::Failure),
            _ => Err(EapError::MalformedMessage),
        }
    }
}

/// EAP Type field for Request/Response messages (the methods this crate implements)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EapType {
    /// RFC 3748 section 5.1
    Identity = 1,
    /// RFC 3748 section 5.2
    Notification = 2,
    /// RFC 4186
    Sim = 18,
    /// RFC 4187
    Aka = 23,
    /// RFC 2759, carried over EAP per RFC 2548
    MsChapV2 = 26,
    /// RFC 5448
    AkaPrime = 50,
}

impl TryFrom<u8> for EapType {
    type Error = EapError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EapType::Identity),
            2 => Ok(EapType::Notification),
            18 => Ok(EapType::Sim),
            23 => Ok(EapType::Aka),
            26 => Ok(EapType::MsChapV2),
            50 => Ok(EapType::AkaPrime),
            _ => Err(EapError::MalformedMessage),
        }
    }
}

/// A single EAP message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EapMessage {
    /// Code
    pub code: EapCode,
    /// Identifier, echoed between a Request and its Response
    pub identifier: u8,
    /// Type, `None` for Success/Failure
    pub eap_type: Option<EapType>,
    /// Type-Data, empty for Success/Failure
    pub type_data: Vec<u8>,
}

impl EapMessage {
    /// Decode a full EAP message (the `ExtensibleAuthentication` payload body)
    pub fn decode(bytes: &[u8]) -> Result<Self, EapError> {
        if bytes.len() < 4 {
            return Err(EapError::MalformedMessage);
        }
        let code = EapCode::try_from(bytes[0])?;
        let identifier = bytes[1];
        let length = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        if length != bytes.len() {
            return Err(EapError::MalformedMessage);
        }

        match code {
            EapCode::Success | EapCode::Failure => {
                if length != 4 {
                    return Err(EapError::MalformedMessage);
                }
                Ok(EapMessage { code, identifier, eap_type: None, type_data: Vec::new() })
            }
            EapCode::Request | EapCode::Response => {
                if length < 5 {
                    return Err(EapError::MalformedMessage);
                }
                let eap_type = EapType::try_from(bytes[4])?;
                Ok(EapMessage {
                    code,
                    identifier,
                    eap_type: Some(eap_type),
                    type_data: bytes[5..].to_vec(),
                })
            }
        }
    }

    /// Encode this message back to wire bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(5 + self.type_data.len());
        out.push(self.code as u8);
        out.push(self.identifier);
        out.extend_from_slice(&[0u8, 0u8]); // length, patched below
        if let Some(eap_type) = self.eap_type {
            out.push(eap_type as u8);
            out.extend_from_slice(&self.type_data);
        }
        let length = out.len() as u16;
        out[2..4].copy_from_slice(&length.to_be_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_round_trips() {
        let msg = EapMessage { code: EapCode::Success, identifier: 7, eap_type: None, type_data: Vec::new() };
        let encoded = msg.encode();
        assert_eq!(encoded, vec![3, 7, 0, 4]);
        assert_eq!(EapMessage::decode(&encoded).unwrap(), msg);
    }

    #[test]
    fn request_round_trips() {
        let msg = EapMessage {
            code: EapCode::Request,
            identifier: 1,
            eap_type: Some(EapType::Aka),
            type_data: vec![1, 0, 0],
        };
        let encoded = msg.encode();
        assert_eq!(EapMessage::decode(&encoded).unwrap(), msg);
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut bytes = vec![2, 1, 0, 5, 1];
        bytes[2] = 0;
        bytes[3] = 99;
        assert!(EapMessage::decode(&bytes).is_err());
    }
}
