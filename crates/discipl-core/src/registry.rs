use dashmap::DashMap;
use std::sync::Arc;

use discipl_types::{CoreError, CoreResult, Did, Link};

use crate::connector::Connector;

/// Constructs a connector the first time its name is asked for.
pub type ConnectorFactory = Arc<dyn Fn() -> Arc<dyn Connector> + Send + Sync>;

/// Connector cache of one core instance, keyed by backend name.
///
/// Connectors are either registered directly or built lazily from a
/// registered factory. A factory runs at most once per name, even under
/// concurrent first use.
pub struct ConnectorRegistry {
    connectors: DashMap<String, Arc<dyn Connector>>,
    factories: DashMap<String, ConnectorFactory>,
}

impl ConnectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connectors: DashMap::new(),
            factories: DashMap::new(),
        }
    }

    /// Seed or replace the connector cached under `name`.
    pub fn register_connector(&self, name: &str, connector: Arc<dyn Connector>) {
        tracing::debug!(connector = name, "connector registered");
        self.connectors.insert(name.to_string(), connector);
    }

    /// Install a loader for `name`. An already cached connector is kept.
    ///
    /// The factory runs while the cache entry is locked and must not call
    /// back into this registry.
    pub fn register_factory<F>(&self, name: &str, factory: F)
    where
        F: Fn() -> Arc<dyn Connector> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    /// Get the connector for `name`, loading it on first use.
    pub fn get_connector(&self, name: &str) -> CoreResult<Arc<dyn Connector>> {
        if let Some(connector) = self.connectors.get(name) {
            return Ok(connector.value().clone());
        }

        let factory = self
            .factories
            .get(name)
            .map(|f| f.value().clone())
            .ok_or_else(|| CoreError::UnknownConnector(name.to_string()))?;

        let entry = self.connectors.entry(name.to_string()).or_insert_with(|| {
            tracing::info!(connector = name, "loading connector");
            factory()
        });
        Ok(entry.value().clone())
    }

    /// Connector holding the claim behind `link`.
    pub fn connector_for_link(&self, link: &Link) -> CoreResult<Arc<dyn Connector>> {
        self.get_connector(link.connector())
    }

    /// Connector holding the channel of `did`.
    pub fn connector_for_did(&self, did: &Did) -> CoreResult<Arc<dyn Connector>> {
        self.get_connector(did.connector())
    }

    /// Connector for a link or DID string.
    pub fn connector_for_address(&self, address: &str) -> CoreResult<Arc<dyn Connector>> {
        if let Ok(link) = Link::parse(address) {
            return self.connector_for_link(&link);
        }
        let did = Did::parse(address).map_err(|_| {
            CoreError::MalformedAddress(format!("neither a link nor a DID: {}", address))
        })?;
        self.connector_for_did(&did)
    }

    /// Whether `s` is a link whose connector can be resolved.
    pub fn is_valid_link(&self, s: &str) -> bool {
        Link::parse(s)
            .map(|link| self.connector_for_link(&link).is_ok())
            .unwrap_or(false)
    }

    /// Whether a connector is cached or loadable under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.connectors.contains_key(name) || self.factories.contains_key(name)
    }

    /// Names of the connectors loaded so far.
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.connectors.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
