//! In-memory Discipl connector.
//!
//! Channels live for as long as the connector does. Used by tests and by
//! the CLI to mirror exported bundles for offline verification.

mod connector;
mod store;

pub use connector::{EphemeralConnector, DEFAULT_NAME};
