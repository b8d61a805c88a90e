//! Claim graph API: identities, claims, attestations and reads.

use serde_json::Value;

use discipl_types::{
    allow_claim, attestation, format_link, AllowScope, Claim, CoreError, CoreResult, Did, Link,
    Ssid, REVOKE_PREDICATE,
};

use crate::discipl::DisciplCore;

impl DisciplCore {
    /// Create a new identity on the connector registered as `connector`.
    pub async fn new_ssid(&self, connector: &str) -> CoreResult<Ssid> {
        let conn = self.get_connector(connector)?;
        let ssid = conn.new_identity().await?;
        tracing::debug!(did = %ssid.did, connector, "new identity");
        Ok(ssid)
    }

    /// Append `data` to the channel of `ssid`, optionally naming the identity
    /// expected to attest it. Returns the link to the new claim.
    pub async fn claim(&self, ssid: &Ssid, data: Value, attester: Option<&Ssid>) -> CoreResult<Link> {
        let conn = self.registry().connector_for_did(&ssid.did)?;
        let reference = conn
            .claim(&ssid.did, &ssid.privkey, &data, attester.map(|a| &a.did))
            .await?;
        let link = format_link(conn.name(), Some(reference), &ssid.did)?
            .ok_or_else(|| CoreError::backend(conn.name(), "claim produced no reference"))?;
        tracing::debug!(did = %ssid.did, link = %link, "claim appended");
        Ok(link)
    }

    /// Attest the claim behind `link` with `predicate` in the channel of `ssid`.
    pub async fn attest(&self, ssid: &Ssid, predicate: &str, link: &Link) -> CoreResult<Link> {
        self.claim(ssid, attestation(predicate, link), None).await
    }

    /// Revoke the claim (or attestation) behind `link`. Only effective for
    /// verification when `ssid` authored the revoked claim.
    pub async fn revoke(&self, ssid: &Ssid, link: &Link) -> CoreResult<Link> {
        self.attest(ssid, REVOKE_PREDICATE, link).await
    }

    /// Append an allow claim opening (part of) the channel of `ssid`, to
    /// everyone or to `did` only.
    pub async fn allow(&self, ssid: &Ssid, scope: Option<&str>, did: Option<&Did>) -> CoreResult<Link> {
        let scope = AllowScope {
            scope: scope.map(str::to_string),
            did: did.cloned(),
        };
        self.claim(ssid, allow_claim(&scope), None).await
    }

    /// Read the claim behind `link`, identifying as `ssid` when given.
    pub async fn get(&self, link: &Link, ssid: Option<&Ssid>) -> CoreResult<Option<Claim>> {
        let conn = self.registry().connector_for_link(link)?;
        conn.get(link, ssid.map(|s| &s.did), ssid.map(|s| &s.privkey))
            .await
    }

    /// Author of the claim behind `link`.
    pub async fn get_did_of_claim(&self, link: &Link) -> CoreResult<Option<Did>> {
        let conn = self.registry().connector_for_link(link)?;
        conn.get_did_of_claim(link).await
    }

    /// Newest claim in the channel of `did`.
    pub async fn get_latest_claim(&self, did: &Did) -> CoreResult<Option<Link>> {
        let conn = self.registry().connector_for_did(did)?;
        conn.get_latest_claim(did).await
    }
}
