//! Observation of channels: live feeds, historical replay and filtering.

use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use discipl_types::{
    ClaimFilter, CoreError, CoreResult, Did, Link, ObservedClaim, Ssid, VerificationRequest,
};

use crate::connector::Feed;
use crate::discipl::DisciplCore;

/// Options for [`DisciplCore::observe`].
#[derive(Debug, Clone, Default)]
pub struct ObserveOptions {
    pub observer: Option<Ssid>,
    pub filter: Option<ClaimFilter>,
    pub historical: bool,
    /// Connector to watch platform-wide when no DID is given.
    pub connector: Option<String>,
}

impl ObserveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observer(mut self, ssid: &Ssid) -> Self {
        self.observer = Some(ssid.clone());
        self
    }

    pub fn filter(mut self, filter: ClaimFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Replay the channel from its first claim before live events.
    pub fn historical(mut self) -> Self {
        self.historical = true;
        self
    }

    pub fn connector(mut self, name: impl Into<String>) -> Self {
        self.connector = Some(name.into());
        self
    }
}

/// An open observation.
///
/// Await [`Subscription::ready`] before relying on events appended after
/// subscribing: nothing appended after readiness is missed.
pub struct Subscription<T> {
    events: BoxStream<'static, T>,
    ready: Option<oneshot::Receiver<()>>,
}

impl<T: Send + 'static> Subscription<T> {
    fn from_feed(feed: Feed<T>) -> Self {
        Self {
            events: feed.events,
            ready: Some(feed.ready),
        }
    }

    /// Resolves once the backend feed is attached. Also resolves if the
    /// backend dropped the feed before attaching.
    pub async fn ready(&mut self) {
        if let Some(ready) = self.ready.take() {
            let _ = ready.await;
        }
    }

    pub async fn next(&mut self) -> Option<T> {
        self.events.next().await
    }

    /// The first event, then close the subscription.
    pub async fn take_one(mut self) -> Option<T> {
        self.events.next().await
    }

    /// Up to `n` events, then close the subscription. Fewer are returned
    /// only if the feed ends.
    pub async fn take(self, n: usize) -> Vec<T> {
        self.events.take(n).collect().await
    }

    pub fn into_stream(self) -> BoxStream<'static, T> {
        self.events
    }

    /// Close the subscription and release the backend feed.
    pub fn cancel(self) {
        drop(self);
    }

    /// Deliver every event to `callback` on a background task until the
    /// returned handle is cancelled or dropped.
    pub fn subscribe<F>(self, mut callback: F) -> SubscriptionHandle
    where
        F: FnMut(T) + Send + 'static,
    {
        let cancelled = Arc::new(Mutex::new(false));
        let flag = cancelled.clone();
        let mut events = self.events;

        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                // Held while the callback runs so cancel() waits for it.
                let delivered = match flag.lock() {
                    Ok(cancelled) if !*cancelled => {
                        callback(event);
                        true
                    }
                    _ => false,
                };
                if !delivered {
                    break;
                }
            }
        });

        SubscriptionHandle { cancelled, task }
    }
}

/// Background delivery started by [`Subscription::subscribe`].
///
/// Once `cancel` returns the callback is never invoked again. Must not be
/// cancelled from inside its own callback.
pub struct SubscriptionHandle {
    cancelled: Arc<Mutex<bool>>,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub fn cancel(&self) {
        match self.cancelled.lock() {
            Ok(mut cancelled) => *cancelled = true,
            Err(poisoned) => *poisoned.into_inner() = true,
        }
        self.task.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.lock().map(|c| *c).unwrap_or(true)
    }

    /// Whether delivery has stopped, through cancellation or because the
    /// feed ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl DisciplCore {
    /// Observe new claims in the channel of `did`, or platform-wide on
    /// `options.connector` when `did` is `None`.
    ///
    /// With `historical`, the existing claims of the channel are delivered
    /// oldest first before any live event. Historical replay is ignored for
    /// platform-wide observation.
    pub async fn observe(
        &self,
        did: Option<&Did>,
        options: ObserveOptions,
    ) -> CoreResult<Subscription<ObservedClaim>> {
        let conn = match (did, options.connector.as_deref()) {
            (Some(did), _) => self.registry().connector_for_did(did)?,
            (None, Some(name)) => self.get_connector(name)?,
            (None, None) => return Err(CoreError::UnsupportedObservation),
        };

        let observer = options.observer.as_ref();
        let feed = conn
            .observe(
                did,
                options.filter.as_ref(),
                observer.map(|o| &o.did),
                observer.map(|o| &o.privkey),
            )
            .await?;
        tracing::info!(
            did = ?did.map(ToString::to_string),
            connector = conn.name(),
            historical = options.historical,
            "subscription opened"
        );

        let filter = options.filter.clone();
        let passes = move |event: &ObservedClaim| {
            filter
                .as_ref()
                .map_or(true, |f| f.matches(&event.claim.data))
        };

        let did = match did {
            Some(did) if options.historical => did,
            _ => {
                let live = feed.events.filter(move |e| futures::future::ready(passes(e)));
                return Ok(Subscription::from_feed(Feed::new(live.boxed(), feed.ready)));
            }
        };

        // Replay only once the live feed is attached, so nothing falls in
        // between.
        let _ = feed.ready.await;
        let history = self.channel_history(did, observer).await?;
        let replayed: HashSet<Link> = history.iter().filter_map(|e| e.link.clone()).collect();
        tracing::debug!(did = %did, replayed = history.len(), "historical replay loaded");

        let history: Vec<ObservedClaim> = history.into_iter().filter(|e| passes(e)).collect();
        let live = feed.events.filter(move |e| {
            let fresh = e.link.as_ref().map_or(true, |l| !replayed.contains(l));
            futures::future::ready(fresh && passes(e))
        });

        Ok(Subscription::from_feed(Feed::attached(
            stream::iter(history).chain(live).boxed(),
        )))
    }

    /// Observe verification requests aimed at the channel of `did`.
    ///
    /// Fails with `UnsupportedCapability` when the connector cannot report
    /// them. `options.filter` applies to the requested attestation.
    pub async fn observe_verification_requests(
        &self,
        did: &Did,
        options: ObserveOptions,
    ) -> CoreResult<Subscription<VerificationRequest>> {
        let conn = self.registry().connector_for_did(did)?;
        let observer = options.observer.as_ref();
        let feed = conn
            .observe_verification_requests(
                did,
                options.filter.as_ref(),
                observer.map(|o| &o.did),
                observer.map(|o| &o.privkey),
            )
            .await?;
        tracing::info!(did = %did, connector = conn.name(), "verification request subscription opened");

        let Some(filter) = options.filter else {
            return Ok(Subscription::from_feed(feed));
        };
        let events = feed
            .events
            .filter(move |r| futures::future::ready(filter.matches(&r.attestation)))
            .boxed();
        Ok(Subscription::from_feed(Feed::new(events, feed.ready)))
    }

    /// Existing claims of a channel, oldest first.
    async fn channel_history(&self, did: &Did, observer: Option<&Ssid>) -> CoreResult<Vec<ObservedClaim>> {
        let mut history = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = self.get_latest_claim(did).await?;
        while let Some(link) = cursor {
            if !seen.insert(link.clone()) {
                tracing::warn!(did = %did, link = %link, "cyclic channel, stopping replay");
                break;
            }
            let Some(claim) = self.get(&link, observer).await? else {
                break;
            };
            cursor = claim.previous.clone();
            history.push(ObservedClaim {
                claim,
                did: did.clone(),
                link: Some(link),
            });
        }
        history.reverse();
        Ok(history)
    }
}
