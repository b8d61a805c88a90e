//! Linked-data export and import.
//!
//! An export is a nested mapping `{ did: [ { link: data }, ... ] }` where
//! every link or DID found in claim data is itself expanded in place, up to
//! a maximum depth of foreign-claim descent. The channel exported at the
//! top level does not count as a descent.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::collections::HashSet;

use discipl_types::{
    is_did, is_link, CoreError, CoreResult, Did, Link, Ssid, EXPORT_ERROR_KEY, MAX_DEPTH_REACHED,
    NOT_FOUND,
};

use crate::discipl::DisciplCore;

/// What an exported value turns out to be when read back.
#[derive(Debug, PartialEq)]
pub(crate) enum Exported<'a> {
    /// An expanded `{ did: [ { link: data }, ... ] }` tree, with the address
    /// it collapses back to.
    Tree(String),
    /// A depth marker or export error standing in for `address`.
    Stub(&'a str),
    /// Anything else.
    Plain,
}

/// The single `(key, value)` entry of an object, if it has exactly one.
pub(crate) fn single_entry(value: &Value) -> Option<(&String, &Value)> {
    match value {
        Value::Object(map) if map.len() == 1 => map.iter().next(),
        _ => None,
    }
}

/// Classify an exported value.
///
/// A tree holding exactly one record collapses to that record's link (it
/// was exported from a link); any other tree collapses to its DID.
pub(crate) fn classify_exported(value: &Value) -> Exported<'_> {
    let Some((key, inner)) = single_entry(value) else {
        return Exported::Plain;
    };

    let marker = matches!(inner.as_str(), Some(MAX_DEPTH_REACHED) | Some(NOT_FOUND));
    if marker && (is_link(key) || is_did(key)) {
        return Exported::Stub(key);
    }
    if single_entry(inner).is_some_and(|(k, _)| k == EXPORT_ERROR_KEY) {
        return Exported::Stub(key);
    }

    if !is_did(key) {
        return Exported::Plain;
    }
    let Some(records) = inner.as_array() else {
        return Exported::Plain;
    };
    let links: Option<Vec<&String>> = records
        .iter()
        .map(|r| single_entry(r).map(|(k, _)| k).filter(|k| is_link(k)))
        .collect();
    match links {
        Some(links) if links.len() == 1 => Exported::Tree(links[0].clone()),
        Some(_) => Exported::Tree(key.clone()),
        None => Exported::Plain,
    }
}

fn record(key: String, data: Value) -> Value {
    let mut map = Map::new();
    map.insert(key, data);
    Value::Object(map)
}

impl DisciplCore {
    /// Export the channel of a DID (oldest claim first), or the single claim
    /// behind a link, expanding referenced claims up to the configured depth.
    ///
    /// Values that are neither a link nor a DID are returned unchanged.
    pub async fn export_ld(&self, address: &str, exporter: Option<&Ssid>) -> CoreResult<Value> {
        self.export_ld_with_depth(address, exporter, self.config().max_export_depth)
            .await
    }

    /// [`DisciplCore::export_ld`] with an explicit depth limit.
    pub async fn export_ld_with_depth(
        &self,
        address: &str,
        exporter: Option<&Ssid>,
        max_depth: usize,
    ) -> CoreResult<Value> {
        let mut visited = Vec::new();
        let value = Value::String(address.to_string());
        self.export_value(&value, exporter, max_depth, 0, &mut visited)
            .await
    }

    /// Depth-first export of one value. `visited` holds the links currently
    /// being expanded above this frame (for a DID, its latest claim): pushed
    /// before descending and popped on return. `depth` counts descents into
    /// referenced claims and is tracked apart from `visited`.
    fn export_value<'a>(
        &'a self,
        value: &'a Value,
        exporter: Option<&'a Ssid>,
        max_depth: usize,
        depth: usize,
        visited: &'a mut Vec<Link>,
    ) -> BoxFuture<'a, CoreResult<Value>> {
        async move {
            let Some(address) = value.as_str() else {
                return Ok(value.clone());
            };

            let (did, start, with_previous) = if let Ok(link) = Link::parse(address) {
                let author = self.get_did_of_claim(&link).await?;
                let Some(did) = author else {
                    return Ok(record(address.to_string(), Value::from(NOT_FOUND)));
                };
                (did, link, false)
            } else if let Ok(did) = Did::parse(address) {
                let latest = self.get_latest_claim(&did).await?;
                let Some(latest) = latest else {
                    return Ok(record(did.to_string(), Value::Array(Vec::new())));
                };
                (did, latest, true)
            } else {
                return Ok(value.clone());
            };

            if depth >= max_depth || visited.contains(&start) {
                tracing::debug!(address, depth, "export depth reached");
                return Ok(record(address.to_string(), Value::from(MAX_DEPTH_REACHED)));
            }

            // Walking a channel backwards from here does not consume depth,
            // and neither does the top-level channel itself.
            let next_depth = if with_previous && visited.is_empty() {
                depth
            } else {
                depth + 1
            };
            visited.push(start.clone());
            let result = self
                .export_claims(&did, start, with_previous, exporter, max_depth, next_depth, visited)
                .await;
            visited.pop();
            result
        }
        .boxed()
    }

    #[allow(clippy::too_many_arguments)]
    async fn export_claims(
        &self,
        did: &Did,
        start: Link,
        with_previous: bool,
        exporter: Option<&Ssid>,
        max_depth: usize,
        depth: usize,
        visited: &mut Vec<Link>,
    ) -> CoreResult<Value> {
        let mut chain = Vec::new();
        let mut walked = HashSet::new();
        let mut cursor = Some(start);
        while let Some(link) = cursor {
            if !walked.insert(link.clone()) {
                tracing::warn!(did = %did, link = %link, "cyclic channel, stopping walk");
                break;
            }
            let claim = self.get(&link, exporter).await?;
            cursor = match &claim {
                Some(claim) if with_previous => claim.previous.clone(),
                _ => None,
            };
            chain.push((link, claim));
        }

        let mut records = Vec::with_capacity(chain.len());
        for (link, claim) in chain.into_iter().rev() {
            let data = match claim {
                Some(claim) => {
                    self.export_data(&claim.data, exporter, max_depth, depth, visited)
                        .await
                }
                None => Value::from(NOT_FOUND),
            };
            records.push(record(link.to_string(), data));
        }
        Ok(record(did.to_string(), Value::Array(records)))
    }

    async fn export_data(
        &self,
        data: &Value,
        exporter: Option<&Ssid>,
        max_depth: usize,
        depth: usize,
        visited: &mut Vec<Link>,
    ) -> Value {
        match data {
            Value::Object(map) => {
                let mut out = Map::new();
                for (key, value) in map {
                    let exported = self.export_entry(value, exporter, max_depth, depth, visited).await;
                    out.insert(key.clone(), exported);
                }
                Value::Object(out)
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for value in items {
                    out.push(self.export_entry(value, exporter, max_depth, depth, visited).await);
                }
                Value::Array(out)
            }
            scalar => self.export_entry(scalar, exporter, max_depth, depth, visited).await,
        }
    }

    async fn export_entry(
        &self,
        value: &Value,
        exporter: Option<&Ssid>,
        max_depth: usize,
        depth: usize,
        visited: &mut Vec<Link>,
    ) -> Value {
        match self.export_value(value, exporter, max_depth, depth, visited).await {
            Ok(exported) => exported,
            Err(e) => {
                tracing::warn!(value = %value, error = %e, "nested export failed");
                let key = value.as_str().map_or_else(|| value.to_string(), str::to_string);
                record(key, record(EXPORT_ERROR_KEY.to_string(), Value::String(e.to_string())))
            }
        }
    }

    /// Load an export back into the connectors named by its DIDs.
    ///
    /// Referenced claims nested in claim data are imported before the claim
    /// that references them and collapse back to their address. Returns
    /// `false` as soon as a connector rejects a claim.
    pub async fn import_ld(&self, data: &Value, importer: Option<&Did>) -> CoreResult<bool> {
        self.import_tree(data, importer).await
    }

    fn import_tree<'a>(
        &'a self,
        tree: &'a Value,
        importer: Option<&'a Did>,
    ) -> BoxFuture<'a, CoreResult<bool>> {
        async move {
            let channels = tree.as_object().ok_or_else(|| {
                CoreError::InvalidLinkedData("expected an object keyed by DID".into())
            })?;

            for (did_key, records) in channels {
                let did = Did::parse(did_key)?;
                let records = records.as_array().ok_or_else(|| {
                    CoreError::InvalidLinkedData(format!("records of {} are not a list", did_key))
                })?;
                let conn = self.registry().connector_for_did(&did)?;

                for entry in records {
                    let (link_key, data) = single_entry(entry).ok_or_else(|| {
                        CoreError::InvalidLinkedData(format!("malformed record in {}", did_key))
                    })?;
                    let link = Link::parse(link_key)?;
                    if data.as_str() == Some(NOT_FOUND) || data.as_str() == Some(MAX_DEPTH_REACHED) {
                        tracing::debug!(link = %link, "skipping unexpanded record");
                        continue;
                    }

                    let Some(claim) = self.collapse(data, importer).await? else {
                        return Ok(false);
                    };
                    if conn.import(&did, &link, &claim, importer).await?.is_none() {
                        tracing::warn!(did = %did, link = %link, "connector rejected import");
                        return Ok(false);
                    }
                    tracing::debug!(did = %did, link = %link, "claim imported");
                }
            }
            Ok(true)
        }
        .boxed()
    }

    /// Import the trees nested in exported claim data and return the data
    /// with each tree replaced by its address. `None` if a nested import
    /// was rejected.
    async fn collapse(&self, data: &Value, importer: Option<&Did>) -> CoreResult<Option<Value>> {
        if classify_exported(data) != Exported::Plain {
            return self.collapse_value(data, importer).await;
        }
        match data {
            Value::Object(map) => {
                let mut out = Map::new();
                for (key, value) in map {
                    let Some(value) = self.collapse_value(value, importer).await? else {
                        return Ok(None);
                    };
                    out.insert(key.clone(), value);
                }
                Ok(Some(Value::Object(out)))
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for value in items {
                    let Some(value) = self.collapse_value(value, importer).await? else {
                        return Ok(None);
                    };
                    out.push(value);
                }
                Ok(Some(Value::Array(out)))
            }
            scalar => Ok(Some(scalar.clone())),
        }
    }

    async fn collapse_value(&self, value: &Value, importer: Option<&Did>) -> CoreResult<Option<Value>> {
        match classify_exported(value) {
            Exported::Tree(address) => {
                if !self.import_tree(value, importer).await? {
                    return Ok(None);
                }
                Ok(Some(Value::String(address)))
            }
            Exported::Stub(address) => Ok(Some(Value::String(address.to_string()))),
            Exported::Plain => Ok(Some(value.clone())),
        }
    }
}
