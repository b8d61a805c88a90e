//! Shared fixtures for the Discipl integration tests.

use serde_json::Value;
use std::sync::Arc;

use discipl_core::DisciplCore;
use discipl_ephemeral::{EphemeralConnector, DEFAULT_NAME};

/// A core with a fresh in-memory connector registered as `ephemeral`.
pub fn ephemeral_core() -> DisciplCore {
    let core = DisciplCore::new();
    reset_ephemeral(&core);
    core
}

/// Replace the `ephemeral` connector with an empty one.
pub fn reset_ephemeral(core: &DisciplCore) {
    core.register_connector(DEFAULT_NAME, Arc::new(EphemeralConnector::new()));
}

/// The `(link, data)` pair of one exported record.
pub fn record(entry: &Value) -> (&str, &Value) {
    let map = entry.as_object().expect("record is an object");
    assert_eq!(map.len(), 1, "record has a single link");
    let (link, data) = map.iter().next().expect("record has a single link");
    (link.as_str(), data)
}
