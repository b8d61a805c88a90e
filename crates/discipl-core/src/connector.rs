use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use tokio::sync::oneshot;

use discipl_types::{
    ClaimFilter, ClaimRef, Claim, CoreError, CoreResult, Did, Link, ObservedClaim, PrivateKey,
    Ssid, VerificationRequest,
};

/// A live feed opened on a connector.
///
/// `ready` resolves once the backend subscription is attached; events
/// appended after that point are guaranteed to show up on `events`.
pub struct Feed<T> {
    pub events: BoxStream<'static, T>,
    pub ready: oneshot::Receiver<()>,
}

impl<T> Feed<T> {
    pub fn new(events: BoxStream<'static, T>, ready: oneshot::Receiver<()>) -> Self {
        Self { events, ready }
    }

    /// A feed whose subscription is attached before it is returned.
    pub fn attached(events: BoxStream<'static, T>) -> Self {
        let (tx, ready) = oneshot::channel();
        let _ = tx.send(());
        Self { events, ready }
    }
}

/// Storage/network backend of the Discipl core.
///
/// Implementations address claims and channels through `Link` and `Did`
/// values whose connector name is [`Connector::name`].
#[async_trait]
pub trait Connector: Send + Sync {
    /// Backend name, as used in link and DID strings.
    fn name(&self) -> &str;

    /// Create a fresh identity on this backend.
    async fn new_identity(&self) -> CoreResult<Ssid>;

    /// Append `data` to the channel of `did`.
    async fn claim(
        &self,
        did: &Did,
        privkey: &PrivateKey,
        data: &Value,
        attester: Option<&Did>,
    ) -> CoreResult<ClaimRef>;

    /// Read a claim, optionally identifying the requester.
    async fn get(
        &self,
        link: &Link,
        did: Option<&Did>,
        privkey: Option<&PrivateKey>,
    ) -> CoreResult<Option<Claim>>;

    /// Search the channel of `did` for a claim equal to `attestation`.
    async fn verify(
        &self,
        did: &Did,
        attestation: &Value,
        verifier_did: Option<&Did>,
        verifier_privkey: Option<&PrivateKey>,
    ) -> CoreResult<Option<Link>>;

    /// Author of the claim behind `link`.
    async fn get_did_of_claim(&self, link: &Link) -> CoreResult<Option<Did>>;

    /// Newest claim in the channel of `did`.
    async fn get_latest_claim(&self, did: &Did) -> CoreResult<Option<Link>>;

    /// Open a live feed of new claims in the channel of `did`, or of every
    /// channel on this backend when `did` is `None`.
    async fn observe(
        &self,
        did: Option<&Did>,
        filter: Option<&ClaimFilter>,
        observer_did: Option<&Did>,
        observer_privkey: Option<&PrivateKey>,
    ) -> CoreResult<Feed<ObservedClaim>>;

    /// Open a feed of verification requests aimed at `did`.
    async fn observe_verification_requests(
        &self,
        did: &Did,
        filter: Option<&ClaimFilter>,
        observer_did: Option<&Did>,
        observer_privkey: Option<&PrivateKey>,
    ) -> CoreResult<Feed<VerificationRequest>> {
        let _ = (did, filter, observer_did, observer_privkey);
        Err(CoreError::unsupported(
            "observeVerificationRequests",
            self.name(),
        ))
    }

    /// Bulk-load a claim under an existing link. `None` means the backend
    /// rejected it.
    async fn import(
        &self,
        did: &Did,
        link: &Link,
        data: &Value,
        importer: Option<&Did>,
    ) -> CoreResult<Option<Link>> {
        let _ = (did, link, data, importer);
        Err(CoreError::unsupported("import", self.name()))
    }
}
