use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use discipl_types::{CoreResult, Ssid};

use crate::discipl::DisciplCore;
use crate::export::{classify_exported, single_entry, Exported};

const CREDENTIALS_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
const PROOF_TYPE: &str = "DisciplLinkProof2019";

/// Proof binding a credential to the claim it was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialProof {
    #[serde(rename = "type")]
    pub proof_type: String,
    pub created: DateTime<Utc>,
    /// `<did>#channel`: the channel the claim sits in.
    pub verification_method: String,
    /// Link of the claim.
    pub proof_value: String,
}

/// One exported claim in verifiable-credential form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiableCredential {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// Link of the claim.
    pub id: String,
    #[serde(rename = "type")]
    pub credential_type: Vec<String>,
    /// DID of the claim's author.
    pub issuer: String,
    pub issuance_date: DateTime<Utc>,
    /// `{ id: <issuer did>, claim: <data> }`, nested claims replaced by
    /// their address.
    pub credential_subject: Value,
    pub proof: CredentialProof,
}

impl VerifiableCredential {
    fn for_claim(did: &str, link: &str, data: Value, issued: DateTime<Utc>) -> Self {
        Self {
            context: vec![CREDENTIALS_CONTEXT.to_string()],
            id: link.to_string(),
            credential_type: vec!["VerifiableCredential".into(), "DisciplClaim".into()],
            issuer: did.to_string(),
            issuance_date: issued,
            credential_subject: json!({ "id": did, "claim": data }),
            proof: CredentialProof {
                proof_type: PROOF_TYPE.to_string(),
                created: issued,
                verification_method: format!("{}#channel", did),
                proof_value: link.to_string(),
            },
        }
    }
}

/// Envelope around the credentials of one export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiablePresentation {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    #[serde(rename = "type")]
    pub presentation_type: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,
    /// Referenced claims come before the claims referencing them.
    pub verifiable_credential: Vec<VerifiableCredential>,
}

impl VerifiablePresentation {
    pub fn new(holder: Option<String>, credentials: Vec<VerifiableCredential>) -> Self {
        Self {
            context: vec![CREDENTIALS_CONTEXT.to_string()],
            id: format!("urn:uuid:{}", uuid::Uuid::now_v7()),
            presentation_type: vec!["VerifiablePresentation".into()],
            holder,
            verifiable_credential: credentials,
        }
    }
}

impl DisciplCore {
    /// Export `address` like [`DisciplCore::export_ld`] and wrap every
    /// exported claim as a verifiable credential.
    pub async fn export_vp(
        &self,
        address: &str,
        exporter: Option<&Ssid>,
    ) -> CoreResult<VerifiablePresentation> {
        let tree = self.export_ld(address, exporter).await?;
        let mut credentials = Vec::new();
        collect_credentials(&tree, Utc::now(), &mut credentials);

        let holder = exporter.map(|s| s.did.to_string());
        tracing::debug!(address, credentials = credentials.len(), "presentation exported");
        Ok(VerifiablePresentation::new(holder, credentials))
    }
}

fn collect_credentials(tree: &Value, issued: DateTime<Utc>, out: &mut Vec<VerifiableCredential>) {
    let Some(channels) = tree.as_object() else {
        return;
    };
    for (did, records) in channels {
        let Some(records) = records.as_array() else {
            continue;
        };
        for record in records {
            let Some((link, data)) = single_entry(record) else {
                continue;
            };
            let subject = subject_data(data, issued, out);
            out.push(VerifiableCredential::for_claim(did, link, subject, issued));
        }
    }
}

fn subject_data(data: &Value, issued: DateTime<Utc>, out: &mut Vec<VerifiableCredential>) -> Value {
    if classify_exported(data) != Exported::Plain {
        return subject_value(data, issued, out);
    }
    match data {
        Value::Object(map) => {
            let mut subject = Map::new();
            for (key, value) in map {
                subject.insert(key.clone(), subject_value(value, issued, out));
            }
            Value::Object(subject)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|value| subject_value(value, issued, out))
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}

fn subject_value(value: &Value, issued: DateTime<Utc>, out: &mut Vec<VerifiableCredential>) -> Value {
    match classify_exported(value) {
        Exported::Tree(address) => {
            collect_credentials(value, issued, out);
            Value::String(address)
        }
        Exported::Stub(address) => Value::String(address.to_string()),
        Exported::Plain => value.clone(),
    }
}
