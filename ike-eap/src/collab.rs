//! Collaborator interfaces the EAP method state machines call out to.
//!
//! These are synchronous traits: the embedding application (which holds the
//! actual telephony stack, credential store, and async runtime) awaits
//! whatever I/O it needs and hands the resolved bytes to the method state
//! machine, rather than this crate driving async calls itself. `ike-session`
//! re-exports these alongside its own `DatagramTransport`/`Clock` traits so
//! callers see one collaborator module.

/// Which algorithm a UICC challenge is being run for, and so which wire
/// format [UiccOracle::authenticate] speaks for that call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AkaAuthType {
    /// RFC 4187 USIM AKA: `[len|RAND|len|AUTN]` challenge, `0xDB`/`0xDC`
    /// tagged `[resLen|RES|ikLen|IK|ckLen|CK]` / `[autsLen|AUTS]` response
    Aka,
    /// RFC 5448 USIM AKA': same wire format as [Self::Aka]
    AkaPrime,
    /// RFC 4186 GSM A3/A8: a bare 16-byte RAND challenge (no AUTN, no
    /// tag/length framing), `0xDB`-tagged `[4|SRES|8|Kc]` response (SIM never
    /// reports synchronization failure, so no `0xDC` case applies here)
    Gsm,
}

/// Error returned by a [UiccOracle] call
#[derive(Debug, thiserror::Error)]
pub enum UiccError {
    /// No SIM/USIM identity is available
    #[error("identity unavailable")]
    IdentityUnavailable,
    /// The UICC call itself failed (card removed, APDU error, etc.)
    #[error("UICC call failed: {0}")]
    Failed(String),
}

/// Error returned by an [IdentityStore] call
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// No identity/credential is configured
    #[error("identity unavailable")]
    Unavailable,
    /// A signing or hashing operation the store performs failed
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

/// Resolves the local permanent identity and runs AKA/AKA' challenges
/// against the SIM/USIM, RFC 4187 section 9 / RFC 4186 section 9
pub trait UiccOracle {
    /// The subscriber's IMSI, or `None` if unavailable
    fn imsi(&self) -> Option<String>;

    /// Run the UICC algorithm `auth_type` names. For [AkaAuthType::Aka]/
    /// [AkaAuthType::AkaPrime], `challenge` is `[len|RAND|len|AUTN]` and the
    /// tagged response is `0xDB` success, `[resLen|RES|ikLen|IK|ckLen|CK]`,
    /// or `0xDC` synchronization failure, `[autsLen|AUTS]`. For
    /// [AkaAuthType::Gsm], `challenge` is the bare 16-byte RAND and the
    /// response is always `0xDB`-tagged `[4|SRES|8|Kc]`.
    fn authenticate(&self, auth_type: AkaAuthType, challenge: &[u8]) -> Result<Vec<u8>, UiccError>;
}

/// Supplies the material EAP-MSCHAPv2 needs. The NtPasswordHash, not the raw
/// password, crosses this boundary.
pub trait IdentityStore {
    /// The MS-CHAPv2 UserName field, RFC 2759 section 8.1
    fn username(&self) -> String;

    /// 16-byte NtPasswordHash (MD4 of the UTF-16LE password)
    fn nt_password_hash(&self) -> Result<[u8; 16], IdentityError>;

    /// Fresh random bytes for the PeerChallenge field, RFC 2759 section 8.1
    fn peer_challenge(&self) -> [u8; 16];
}
