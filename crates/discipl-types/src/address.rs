use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

const DELIMITER: char = ':';
const PLATFORM: &str = "discipl";
const LINK_SCHEME: &str = "link";
const DID_SCHEME: &str = "did";

/// Key-derivation context for peppered claim hashes.
const HASH_CONTEXT: &str = "discipl-core 2019 peppered claim reference";

/// Address of exactly one claim.
///
/// Format: `link:discipl:<connector>:<reference>`. The reference is opaque and
/// may itself contain `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Link {
    connector: String,
    reference: String,
}

impl Link {
    /// Create a link from its components.
    pub fn new(connector: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            connector: connector.into(),
            reference: reference.into(),
        }
    }

    /// Parse a link string, keeping everything after the connector name as
    /// the reference.
    pub fn parse(s: &str) -> CoreResult<Self> {
        let mut fields = s.splitn(4, DELIMITER);
        if fields.next() != Some(LINK_SCHEME) || fields.next() != Some(PLATFORM) {
            return Err(CoreError::MalformedAddress(format!(
                "link must start with 'link:discipl:', got: {}",
                s
            )));
        }
        match (fields.next(), fields.next()) {
            (Some(connector), Some(reference)) if !connector.is_empty() && !reference.is_empty() => {
                Ok(Self::new(connector, reference))
            }
            _ => Err(CoreError::MalformedAddress(format!(
                "link must have format 'link:discipl:<connector>:<reference>', got: {}",
                s
            ))),
        }
    }

    /// Name of the connector holding the claim.
    pub fn connector(&self) -> &str {
        &self.connector
    }

    /// Connector-specific reference to the claim.
    pub fn reference(&self) -> &str {
        &self.reference
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            LINK_SCHEME, PLATFORM, self.connector, self.reference
        )
    }
}

impl FromStr for Link {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Link {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Link> for String {
    fn from(link: Link) -> Self {
        link.to_string()
    }
}

/// Address of one identity's channel.
///
/// Format: `did:discipl:<connector>:<pubkey>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did {
    connector: String,
    pubkey: String,
}

impl Did {
    /// Create a DID from connector name and public key.
    pub fn new(connector: impl Into<String>, pubkey: impl Into<String>) -> Self {
        Self {
            connector: connector.into(),
            pubkey: pubkey.into(),
        }
    }

    /// Parse a DID string. Exactly four `:`-separated fields are accepted.
    pub fn parse(s: &str) -> CoreResult<Self> {
        let fields: Vec<&str> = s.split(DELIMITER).collect();
        if fields.len() != 4 || fields[0] != DID_SCHEME || fields[1] != PLATFORM {
            return Err(CoreError::MalformedAddress(format!(
                "DID must have format 'did:discipl:<connector>:<pubkey>', got: {}",
                s
            )));
        }
        if fields[2].is_empty() || fields[3].is_empty() {
            return Err(CoreError::MalformedAddress(format!(
                "DID has an empty connector or pubkey: {}",
                s
            )));
        }
        Ok(Self::new(fields[2], fields[3]))
    }

    /// Name of the connector holding the channel.
    pub fn connector(&self) -> &str {
        &self.connector
    }

    /// Connector-specific public key of the identity.
    pub fn pubkey(&self) -> &str {
        &self.pubkey
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", DID_SCHEME, PLATFORM, self.connector, self.pubkey)
    }
}

impl FromStr for Did {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Did {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.to_string()
    }
}

/// Syntactic check for a link string. Does not resolve the connector.
pub fn is_link(s: &str) -> bool {
    Link::parse(s).is_ok()
}

/// Syntactic check for a DID string. Does not resolve the connector.
pub fn is_did(s: &str) -> bool {
    Did::parse(s).is_ok()
}

/// What a connector hands back after appending a claim.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimRef {
    /// A complete link, used as is.
    Link(Link),
    /// A connector-specific reference to be prefixed into a link.
    Reference(String),
    /// Claim content that is addressed by its peppered hash.
    Content(serde_json::Value),
}

impl From<Link> for ClaimRef {
    fn from(link: Link) -> Self {
        Self::Link(link)
    }
}

impl From<String> for ClaimRef {
    fn from(reference: String) -> Self {
        Self::Reference(reference)
    }
}

/// Keyed BLAKE3 hash of the canonical JSON form of `data`, peppered with the
/// owning identity's DID, base64 encoded.
pub fn peppered_hash(did: &Did, data: &serde_json::Value) -> CoreResult<String> {
    // serde_json maps are key-sorted, so this serialization is canonical.
    let canonical = serde_json::to_vec(data)?;
    let key = blake3::derive_key(HASH_CONTEXT, did.to_string().as_bytes());
    Ok(BASE64.encode(blake3::keyed_hash(&key, &canonical).as_bytes()))
}

/// Build a link for a claim on `connector`.
///
/// Returns `None` when there is no claim to address.
pub fn format_link(connector: &str, claim: Option<ClaimRef>, did: &Did) -> CoreResult<Option<Link>> {
    let link = match claim {
        None => return Ok(None),
        Some(ClaimRef::Link(link)) => link,
        Some(ClaimRef::Reference(reference)) => Link::new(connector, reference),
        Some(ClaimRef::Content(data)) => Link::new(connector, peppered_hash(did, &data)?),
    };
    Ok(Some(link))
}
