//! Revocation-aware verification of attestations.

use futures::future::BoxFuture;
use futures::FutureExt;

use discipl_types::{attestation, CoreResult, Did, Link, Ssid, REVOKE_PREDICATE};

use crate::discipl::DisciplCore;

/// One entry of the candidate list handed to [`DisciplCore::verify`].
///
/// Placeholders and strings that are not DIDs are skipped during
/// verification rather than failing it.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    Did(Did),
    Address(String),
    Placeholder,
}

impl Candidate {
    fn resolve(&self) -> Option<Did> {
        match self {
            Self::Did(did) => Some(did.clone()),
            Self::Address(s) => match Did::parse(s) {
                Ok(did) => Some(did),
                Err(e) => {
                    tracing::warn!(candidate = %s, error = %e, "skipping verification candidate");
                    None
                }
            },
            Self::Placeholder => None,
        }
    }
}

impl From<&Ssid> for Candidate {
    fn from(ssid: &Ssid) -> Self {
        Self::Did(ssid.did.clone())
    }
}

impl From<&Did> for Candidate {
    fn from(did: &Did) -> Self {
        Self::Did(did.clone())
    }
}

impl From<Did> for Candidate {
    fn from(did: Did) -> Self {
        Self::Did(did)
    }
}

impl From<&str> for Candidate {
    fn from(s: &str) -> Self {
        Self::Address(s.to_string())
    }
}

impl From<String> for Candidate {
    fn from(s: String) -> Self {
        Self::Address(s)
    }
}

impl<T: Into<Candidate>> From<Option<T>> for Candidate {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Placeholder, Into::into)
    }
}

impl DisciplCore {
    /// Find the first candidate whose channel holds a live `{predicate: link}`
    /// attestation of a claim that its author has not revoked.
    ///
    /// Returns `None` when no candidate qualifies.
    pub async fn verify(
        &self,
        predicate: &str,
        link: &Link,
        candidates: &[Candidate],
        verifier: Option<&Ssid>,
    ) -> CoreResult<Option<Did>> {
        let dids: Vec<Did> = candidates.iter().filter_map(Candidate::resolve).collect();
        let found = self.verify_dids(predicate, link, &dids, verifier, true).await?;
        Ok(found.into_iter().next())
    }

    /// Like [`DisciplCore::verify`], but returns every qualifying candidate in
    /// candidate order.
    pub async fn verify_all(
        &self,
        predicate: &str,
        link: &Link,
        candidates: &[Candidate],
        verifier: Option<&Ssid>,
    ) -> CoreResult<Vec<Did>> {
        let dids: Vec<Did> = candidates.iter().filter_map(Candidate::resolve).collect();
        self.verify_dids(predicate, link, &dids, verifier, false).await
    }

    fn verify_dids<'a>(
        &'a self,
        predicate: &'a str,
        link: &'a Link,
        dids: &'a [Did],
        verifier: Option<&'a Ssid>,
        first_only: bool,
    ) -> BoxFuture<'a, CoreResult<Vec<Did>>> {
        async move {
            let mut verified = Vec::new();
            for did in dids {
                let conn = match self.registry().connector_for_did(did) {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(did = %did, error = %e, "skipping verification candidate");
                        continue;
                    }
                };

                let wanted = attestation(predicate, link);
                let found = conn
                    .verify(
                        did,
                        &wanted,
                        verifier.map(|v| &v.did),
                        verifier.map(|v| &v.privkey),
                    )
                    .await?;
                let Some(attestation_link) = found else {
                    continue;
                };

                if self.is_revoked(&attestation_link, did, verifier).await? {
                    tracing::debug!(did = %did, link = %attestation_link, "attestation revoked");
                    continue;
                }

                if predicate != REVOKE_PREDICATE {
                    if let Some(author) = self.get_did_of_claim(link).await? {
                        if self.is_revoked(link, &author, verifier).await? {
                            tracing::debug!(did = %author, link = %link, "claim revoked by author");
                            continue;
                        }
                    }
                }

                verified.push(did.clone());
                if first_only {
                    break;
                }
            }
            Ok(verified)
        }
        .boxed()
    }

    async fn is_revoked(&self, link: &Link, by: &Did, verifier: Option<&Ssid>) -> CoreResult<bool> {
        let revokers = std::slice::from_ref(by);
        let live = self
            .verify_dids(REVOKE_PREDICATE, link, revokers, verifier, true)
            .await?;
        Ok(!live.is_empty())
    }
}
