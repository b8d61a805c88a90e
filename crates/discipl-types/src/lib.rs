//! Discipl Types: addressing, claim model, errors and configuration shared
//! by the Discipl core and its connectors.

pub mod address;
pub mod claim;
pub mod config;
pub mod error;

pub use address::{format_link, is_did, is_link, peppered_hash, ClaimRef, Did, Link};
pub use claim::{
    allow_claim, attestation, AllowScope, Claim, ClaimFilter, ObservedClaim, PrivateKey, Ssid,
    VerificationRequest, ALLOW_KEY, EXPORT_ERROR_KEY, MAX_DEPTH_REACHED, NOT_FOUND,
    REVOKE_PREDICATE,
};
pub use config::CoreConfig;
pub use error::{CoreError, CoreResult};
