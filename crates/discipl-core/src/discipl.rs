use std::sync::Arc;

use discipl_types::{CoreConfig, CoreResult};

use crate::connector::Connector;
use crate::registry::ConnectorRegistry;

/// One Discipl core instance: a connector registry plus configuration.
///
/// The claim graph, verification, export and observation operations are
/// implemented on this type in their own modules.
#[derive(Clone)]
pub struct DisciplCore {
    registry: Arc<ConnectorRegistry>,
    config: CoreConfig,
}

impl DisciplCore {
    /// Create a core with an empty registry and default configuration.
    pub fn new() -> Self {
        Self::with_config(CoreConfig::default())
    }

    /// Create a core with an empty registry.
    pub fn with_config(config: CoreConfig) -> Self {
        Self::with_registry(Arc::new(ConnectorRegistry::new()), config)
    }

    /// Create a core sharing an existing registry.
    pub fn with_registry(registry: Arc<ConnectorRegistry>, config: CoreConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Get (loading on first use) the connector registered under `name`.
    pub fn get_connector(&self, name: &str) -> CoreResult<Arc<dyn Connector>> {
        self.registry.get_connector(name)
    }

    /// Register or replace the connector used for `name`.
    pub fn register_connector(&self, name: &str, connector: Arc<dyn Connector>) {
        self.registry.register_connector(name, connector);
    }
}

impl Default for DisciplCore {
    fn default() -> Self {
        Self::new()
    }
}
