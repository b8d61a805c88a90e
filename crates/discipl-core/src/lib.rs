//! Discipl Core
//!
//! Backend-agnostic trust layer for self-sovereign identities:
//! - connector contract and per-instance connector registry
//! - claim graph API (identities, claims, attestations, allow scopes)
//! - revocation-aware verification of attestations
//! - cycle-safe linked-data export and bulk import
//! - verifiable presentation export
//! - observation of channels with historical replay

pub mod connector;
pub mod discipl;
pub mod export;
pub mod graph;
pub mod observe;
pub mod presentation;
pub mod registry;
pub mod verify;


pub use connector::{Connector, Feed};
pub use discipl::DisciplCore;
pub use observe::{ObserveOptions, Subscription, SubscriptionHandle};
pub use presentation::{CredentialProof, VerifiableCredential, VerifiablePresentation};
pub use registry::{ConnectorFactory, ConnectorRegistry};
pub use verify::Candidate;

pub use discipl_types::*;
