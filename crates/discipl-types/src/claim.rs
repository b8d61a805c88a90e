use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::address::{Did, Link};

/// Predicate of an attestation that revokes the referenced claim.
pub const REVOKE_PREDICATE: &str = "revoke";

/// Data key of an allow-scope claim.
pub const ALLOW_KEY: &str = "DISCIPL_ALLOW";

/// Value exported in place of a claim that was not expanded because the
/// export depth was exhausted or the claim is already being expanded.
pub const MAX_DEPTH_REACHED: &str = "MAX_DEPTH_REACHED";

/// Value exported in place of a claim the connector could not find.
pub const NOT_FOUND: &str = "NOT_FOUND";

/// Key under which a nested export failure is reported.
pub const EXPORT_ERROR_KEY: &str = "export-error";

/// A single appended claim together with the link to its predecessor in the
/// same channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Caller-chosen structured data.
    pub data: Value,
    /// Previous claim in the channel; `None` for the first claim.
    pub previous: Option<Link>,
}

impl Claim {
    pub fn new(data: Value, previous: Option<Link>) -> Self {
        Self { data, previous }
    }
}

/// Opaque credential of an identity. Only meaningful to its own connector.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Expose the raw credential to a connector.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// An identity: public DID plus the credential that lets it append claims.
#[derive(Debug, Clone)]
pub struct Ssid {
    pub did: Did,
    pub privkey: PrivateKey,
}

impl Ssid {
    pub fn new(did: Did, privkey: PrivateKey) -> Self {
        Self { did, privkey }
    }
}

/// Claim data of an attestation: `{ predicate: link }`.
pub fn attestation(predicate: &str, link: &Link) -> Value {
    let mut data = Map::new();
    data.insert(predicate.to_string(), Value::String(link.to_string()));
    Value::Object(data)
}

/// Access scope carried by an allow claim. Interpretation is up to the
/// connector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did: Option<Did>,
}

/// Claim data of an allow claim: `{ DISCIPL_ALLOW: { scope?, did? } }`.
pub fn allow_claim(scope: &AllowScope) -> Value {
    let mut inner = Map::new();
    if let Some(scope) = &scope.scope {
        inner.insert("scope".into(), Value::String(scope.clone()));
    }
    if let Some(did) = &scope.did {
        inner.insert("did".into(), Value::String(did.to_string()));
    }
    let mut data = Map::new();
    data.insert(ALLOW_KEY.to_string(), Value::Object(inner));
    Value::Object(data)
}

/// Predicate filter over claim data.
///
/// Each entry either requires an exact value or, when the value is `None`,
/// only requires the predicate to be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimFilter(BTreeMap<String, Option<Value>>);

impl ClaimFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `predicate` to equal `value`.
    pub fn require(mut self, predicate: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(predicate.into(), Some(value.into()));
        self
    }

    /// Require `predicate` to be present with any value.
    pub fn present(mut self, predicate: impl Into<String>) -> Self {
        self.0.insert(predicate.into(), None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn predicates(&self) -> impl Iterator<Item = (&String, Option<&Value>)> {
        self.0.iter().map(|(k, v)| (k, v.as_ref()))
    }

    /// Whether claim data passes every entry of this filter.
    pub fn matches(&self, data: &Value) -> bool {
        self.0.iter().all(|(predicate, expected)| {
            match data.get(predicate) {
                None | Some(Value::Null) => false,
                Some(actual) => expected.as_ref().map_or(true, |e| e == actual),
            }
        })
    }
}

/// A claim delivered by an observation subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedClaim {
    pub claim: Claim,
    /// Author of the claim.
    pub did: Did,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

/// A request by some verifier to have an attestation checked in the
/// channel of `did`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRequest {
    /// Channel the verifier wants searched.
    pub did: Did,
    /// Who is asking, if they identified themselves.
    pub verifier: Option<Did>,
    /// The `{ predicate: link }` attestation being looked for.
    pub attestation: Value,
}
