//! Security Association, Proposal, Transform and Attribute data model
//!
//! See RFC 7296 section 3.3. A [SecurityAssociation] carries an ordered list
//! of [Proposal]s; each proposal groups its [Transform]s by
//! [crate::params::TransformType] rather than keeping one flat ordered list,
//! which makes the "exactly one transform of each required type" validation
//! in [crate::negotiation] a direct field check instead of a linear scan.

use crate::params::{
    DiffieHellmanGroup, EncryptionAlgorithm, ExtendedSequenceNumbers, IntegrityAlgorithm,
    PseudorandomFunction, SecurityProtocol, TransformType,
};

/// A single Transform inside a Proposal, tagged by the type it belongs to
///
/// The encryption variant carries an optional Key Length attribute (bits);
/// it is the only transform type with an attribute, per RFC 7296 section 3.3.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// ENCR
    Encryption(EncryptionAlgorithm, Option<u16>),
    /// PRF
    PseudoRandomFunction(PseudorandomFunction),
    /// INTEG
    Integrity(IntegrityAlgorithm),
    /// D-H / KE
    KeyExchange(DiffieHellmanGroup),
    /// ESN
    SequenceNumber(ExtendedSequenceNumbers),
}

impl Transform {
    /// The [TransformType] this transform belongs to
    pub fn transform_type(&self) -> TransformType {
        match self {
            Transform::Encryption(..) => TransformType::EncryptionAlgorithm,
            Transform::PseudoRandomFunction(_) => TransformType::PseudoRandomFunction,
            Transform::Integrity(_) => TransformType::IntegrityAlgorithm,
            Transform::KeyExchange(_) => TransformType::DiffieHellmanGroup,
            Transform::SequenceNumber(_) => TransformType::ExtendedSequenceNumbers,
        }
    }
}

/// One offered or selected Proposal, see RFC 7296 section 3.3.1
///
/// Transforms are grouped by type rather than kept in one flat `Vec<Transform>`;
/// [Proposal::transforms] reconstructs the wire ordering (ENCR, PRF, INTEG, D-H, ESN)
/// on demand for encoding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Proposal {
    /// Protocol this proposal negotiates
    pub protocol: Option<SecurityProtocol>,
    /// Sending entity's SPI; empty for the first IKE_SA_INIT proposal
    pub spi: Vec<u8>,
    /// Offered/selected encryption transforms with an optional key length in bits
    pub encryption_algorithms: Vec<(EncryptionAlgorithm, Option<u16>)>,
    /// Offered/selected PRFs
    pub pseudo_random_functions: Vec<PseudorandomFunction>,
    /// Offered/selected integrity algorithms
    pub integrity_algorithms: Vec<IntegrityAlgorithm>,
    /// Offered/selected DH groups
    pub key_exchange_methods: Vec<DiffieHellmanGroup>,
    /// Offered/selected ESN settings
    pub sequence_numbers: Vec<ExtendedSequenceNumbers>,
}

impl Proposal {
    /// Construct a new empty proposal for the given protocol and SPI
    pub fn new_empty(protocol: SecurityProtocol, spi: Option<Vec<u8>>) -> Self {
        Self {
            protocol: Some(protocol),
            spi: spi.unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Number of transforms across all types
    pub fn len(&self) -> usize {
        self.encryption_algorithms.len()
            + self.pseudo_random_functions.len()
            + self.integrity_algorithms.len()
            + self.key_exchange_methods.len()
            + self.sequence_numbers.len()
    }

    /// Whether this proposal carries no transforms at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add transforms to the proposal, grouping each by its [TransformType]
    pub fn add(&mut self, transforms: impl IntoIterator<Item = Transform>) {
        for transform in transforms {
            match transform {
                Transform::Encryption(a, kl) => self.encryption_algorithms.push((a, kl)),
                Transform::PseudoRandomFunction(p) => self.pseudo_random_functions.push(p),
                Transform::Integrity(i) => self.integrity_algorithms.push(i),
                Transform::KeyExchange(k) => self.key_exchange_methods.push(k),
                Transform::SequenceNumber(s) => self.sequence_numbers.push(s),
            }
        }
    }

    /// Reconstruct the wire-order flat list of transforms: ENCR, PRF, INTEG, D-H, ESN
    pub fn transforms(&self) -> Vec<Transform> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(
            self.encryption_algorithms
                .iter()
                .map(|(a, kl)| Transform::Encryption(*a, *kl)),
        );
        out.extend(
            self.pseudo_random_functions
                .iter()
                .map(|p| Transform::PseudoRandomFunction(*p)),
        );
        out.extend(
            self.integrity_algorithms
                .iter()
                .map(|i| Transform::Integrity(*i)),
        );
        out.extend(
            self.key_exchange_methods
                .iter()
                .map(|k| Transform::KeyExchange(*k)),
        );
        out.extend(
            self.sequence_numbers
                .iter()
                .map(|s| Transform::SequenceNumber(*s)),
        );
        out
    }

    /// Whether any of the offered encryption transforms is an AEAD (combined) mode
    ///
    /// A proposal that mixes AEAD and non-AEAD encryption transforms is unusual but
    /// not itself invalid at the offer stage; see [crate::negotiation] for the
    /// combined-mode consistency check applied to the *selected* proposal.
    pub fn offers_any_aead(&self) -> bool {
        self.encryption_algorithms
            .iter()
            .any(|(a, _)| a.is_aead())
    }
}

/// An ordered list of [Proposal]s, see RFC 7296 section 3.3
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecurityAssociation {
    /// Proposals in preference order; proposal numbers are assigned 1.. at encode time
    pub proposals: Vec<Proposal>,
}
