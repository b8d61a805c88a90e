use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use rand::RngCore;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};

use discipl_core::{
    Claim, ClaimFilter, ClaimRef, Connector, CoreError, CoreResult, Did, Feed, Link,
    ObservedClaim, PrivateKey, Ssid, VerificationRequest,
};

use crate::store::Store;

pub const DEFAULT_NAME: &str = "ephemeral";
const DEFAULT_CAPACITY: usize = 256;

/// Connector keeping every channel in memory.
///
/// Reads are not access-gated: allow claims are stored like any other
/// claim. Appending requires the private key handed out by
/// [`Connector::new_identity`]; channels created through import have no
/// key and only accept further imports.
pub struct EphemeralConnector {
    name: String,
    store: RwLock<Store>,
    claims: broadcast::Sender<ObservedClaim>,
    requests: broadcast::Sender<VerificationRequest>,
}

impl EphemeralConnector {
    pub fn new() -> Self {
        Self::with_name(DEFAULT_NAME)
    }

    /// A connector addressed as `name` in links and DIDs.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self::with_capacity(name, DEFAULT_CAPACITY)
    }

    /// `capacity` bounds how far a live observer may lag behind before
    /// events are dropped for it.
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        let (claims, _) = broadcast::channel(capacity.max(1));
        let (requests, _) = broadcast::channel(capacity.max(1));
        Self {
            name: name.into(),
            store: RwLock::new(Store::default()),
            claims,
            requests,
        }
    }

    fn owns_link(&self, link: &Link) -> bool {
        link.connector() == self.name
    }

    fn publish(&self, did: &Did, link: Link, data: &Value, previous: Option<String>) {
        let event = ObservedClaim {
            claim: Claim::new(
                data.clone(),
                previous.map(|p| Link::new(self.name.clone(), p)),
            ),
            did: did.clone(),
            link: Some(link),
        };
        // No receivers is not an error.
        let _ = self.claims.send(event);
    }
}

impl Default for EphemeralConnector {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a broadcast receiver into a stream, skipping over lag.
fn receiver_stream<T: Clone + Send + 'static>(rx: broadcast::Receiver<T>) -> BoxStream<'static, T> {
    stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((event, rx)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(missed = n, "observer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}

fn random_hex() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[async_trait]
impl Connector for EphemeralConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn new_identity(&self) -> CoreResult<Ssid> {
        let did = Did::new(self.name.clone(), random_hex());
        let privkey = PrivateKey::new(random_hex());
        self.store
            .write()
            .await
            .add_identity(did.clone(), privkey.clone());
        tracing::debug!(did = %did, "identity created");
        Ok(Ssid::new(did, privkey))
    }

    async fn claim(
        &self,
        did: &Did,
        privkey: &PrivateKey,
        data: &Value,
        attester: Option<&Did>,
    ) -> CoreResult<ClaimRef> {
        let mut store = self.store.write().await;
        match store.owns(did, privkey) {
            Some(true) => {}
            Some(false) => return Err(CoreError::backend(&self.name, "private key does not match")),
            None => return Err(CoreError::backend(&self.name, format!("unknown identity {}", did))),
        }

        let reference = store.next_reference(did);
        let previous = store.append(did, reference.clone(), data.clone());
        let link = Link::new(self.name.clone(), reference.clone());
        tracing::debug!(did = %did, link = %link, attester = ?attester.map(ToString::to_string), "claim stored");
        self.publish(did, link, data, previous);
        Ok(ClaimRef::Reference(reference))
    }

    async fn get(
        &self,
        link: &Link,
        _did: Option<&Did>,
        _privkey: Option<&PrivateKey>,
    ) -> CoreResult<Option<Claim>> {
        if !self.owns_link(link) {
            return Ok(None);
        }
        Ok(self.store.read().await.get(&self.name, link.reference()))
    }

    async fn verify(
        &self,
        did: &Did,
        attestation: &Value,
        verifier_did: Option<&Did>,
        _verifier_privkey: Option<&PrivateKey>,
    ) -> CoreResult<Option<Link>> {
        if let Some(verifier) = verifier_did {
            let _ = self.requests.send(VerificationRequest {
                did: did.clone(),
                verifier: Some(verifier.clone()),
                attestation: attestation.clone(),
            });
        }
        let store = self.store.read().await;
        Ok(store
            .find(did, attestation)
            .map(|reference| Link::new(self.name.clone(), reference)))
    }

    async fn get_did_of_claim(&self, link: &Link) -> CoreResult<Option<Did>> {
        if !self.owns_link(link) {
            return Ok(None);
        }
        Ok(self.store.read().await.author(link.reference()).cloned())
    }

    async fn get_latest_claim(&self, did: &Did) -> CoreResult<Option<Link>> {
        let store = self.store.read().await;
        Ok(store
            .latest(did)
            .map(|reference| Link::new(self.name.clone(), reference)))
    }

    async fn observe(
        &self,
        did: Option<&Did>,
        filter: Option<&ClaimFilter>,
        _observer_did: Option<&Did>,
        _observer_privkey: Option<&PrivateKey>,
    ) -> CoreResult<Feed<ObservedClaim>> {
        let did = did.cloned();
        let filter = filter.cloned();
        let events = receiver_stream(self.claims.subscribe()).filter(move |event| {
            let wanted = did.as_ref().map_or(true, |d| d == &event.did)
                && filter.as_ref().map_or(true, |f| f.matches(&event.claim.data));
            futures::future::ready(wanted)
        });
        Ok(Feed::attached(events.boxed()))
    }

    async fn observe_verification_requests(
        &self,
        did: &Did,
        filter: Option<&ClaimFilter>,
        _observer_did: Option<&Did>,
        _observer_privkey: Option<&PrivateKey>,
    ) -> CoreResult<Feed<VerificationRequest>> {
        let did = did.clone();
        let filter = filter.cloned();
        let events = receiver_stream(self.requests.subscribe()).filter(move |request| {
            let wanted = request.did == did
                && filter.as_ref().map_or(true, |f| f.matches(&request.attestation));
            futures::future::ready(wanted)
        });
        Ok(Feed::attached(events.boxed()))
    }

    async fn import(
        &self,
        did: &Did,
        link: &Link,
        data: &Value,
        importer: Option<&Did>,
    ) -> CoreResult<Option<Link>> {
        if !self.owns_link(link) || did.connector() != self.name {
            tracing::warn!(did = %did, link = %link, "import addressed to another connector");
            return Ok(None);
        }

        let mut store = self.store.write().await;
        if let Some(author) = store.author(link.reference()) {
            // Re-importing the same claim is a no-op.
            return Ok((author == did).then(|| link.clone()));
        }
        let previous = store.append(did, link.reference().to_string(), data.clone());
        tracing::debug!(did = %did, link = %link, importer = ?importer.map(ToString::to_string), "claim imported");
        self.publish(did, link.clone(), data, previous);
        Ok(Some(link.clone()))
    }
}
