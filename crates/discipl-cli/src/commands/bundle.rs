//! Exported linked-data bundles mirrored into in-memory connectors.

use anyhow::Context;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use discipl_core::{Did, DisciplCore};
use discipl_ephemeral::EphemeralConnector;

use crate::config::DisciplConfig;

pub fn read(path: &Path) -> anyhow::Result<Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading bundle {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing bundle {}", path.display()))
}

/// Connector names of every DID keyed anywhere in `bundle`.
pub fn connector_names(bundle: &Value) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect_names(bundle, &mut names);
    names
}

fn collect_names(value: &Value, names: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                if let Ok(did) = Did::parse(key) {
                    names.insert(did.connector().to_string());
                }
                collect_names(inner, names);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_names(item, names)),
        _ => {}
    }
}

/// A core whose connectors are in-memory mirrors loaded with `bundle`.
///
/// One mirror is registered per connector named in the bundle, plus the
/// configured autoload names.
pub async fn mirror(bundle: &Value, config: &DisciplConfig) -> anyhow::Result<DisciplCore> {
    let core = DisciplCore::with_config(config.core.clone());
    let names: BTreeSet<String> = connector_names(bundle)
        .into_iter()
        .chain(config.core.autoload.iter().cloned())
        .collect();
    for name in &names {
        let mirror = EphemeralConnector::with_capacity(name.clone(), config.core.observe_buffer);
        core.register_connector(name, Arc::new(mirror));
    }
    tracing::info!(connectors = ?names, "bundle mirrors registered");

    if !core.import_ld(bundle, None).await? {
        anyhow::bail!("bundle was rejected on import");
    }
    Ok(core)
}

/// [`mirror`] for the bundle stored at `path`.
pub async fn mirror_file(path: &Path, config: &DisciplConfig) -> anyhow::Result<DisciplCore> {
    let bundle = read(path)?;
    mirror(&bundle, config)
        .await
        .with_context(|| format!("loading bundle {}", path.display()))
}
