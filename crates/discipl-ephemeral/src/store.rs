use serde_json::Value;
use std::collections::HashMap;

use discipl_core::{Claim, Did, Link, PrivateKey};

struct Entry {
    reference: String,
    data: Value,
}

/// Append-only channels keyed by DID, plus the reverse index from link
/// reference to its position.
#[derive(Default)]
pub(crate) struct Store {
    keys: HashMap<Did, PrivateKey>,
    channels: HashMap<Did, Vec<Entry>>,
    positions: HashMap<String, (Did, usize)>,
}

impl Store {
    pub fn add_identity(&mut self, did: Did, privkey: PrivateKey) {
        self.channels.entry(did.clone()).or_default();
        self.keys.insert(did, privkey);
    }

    /// `None` if the identity is unknown, otherwise whether `privkey` owns it.
    pub fn owns(&self, did: &Did, privkey: &PrivateKey) -> Option<bool> {
        self.keys.get(did).map(|key| key == privkey)
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.positions.contains_key(reference)
    }

    /// Append `data` under `reference`. Returns the reference of the claim
    /// before it, if any.
    pub fn append(&mut self, did: &Did, reference: String, data: Value) -> Option<String> {
        let channel = self.channels.entry(did.clone()).or_default();
        let previous = channel.last().map(|e| e.reference.clone());
        self.positions
            .insert(reference.clone(), (did.clone(), channel.len()));
        channel.push(Entry { reference, data });
        previous
    }

    /// Next unused reference in the channel of `did`.
    pub fn next_reference(&self, did: &Did) -> String {
        let mut index = self.channels.get(did).map_or(0, Vec::len);
        loop {
            let reference = format!("{}:{}", did.pubkey(), index);
            if !self.contains(&reference) {
                return reference;
            }
            index += 1;
        }
    }

    pub fn get(&self, connector: &str, reference: &str) -> Option<Claim> {
        let (did, index) = self.positions.get(reference)?;
        let channel = self.channels.get(did)?;
        let entry = channel.get(*index)?;
        let previous = index
            .checked_sub(1)
            .and_then(|i| channel.get(i))
            .map(|e| Link::new(connector, e.reference.clone()));
        Some(Claim::new(entry.data.clone(), previous))
    }

    pub fn author(&self, reference: &str) -> Option<&Did> {
        self.positions.get(reference).map(|(did, _)| did)
    }

    pub fn latest(&self, did: &Did) -> Option<&str> {
        self.channels
            .get(did)
            .and_then(|c| c.last())
            .map(|e| e.reference.as_str())
    }

    /// Oldest claim in the channel of `did` equal to `data`.
    pub fn find(&self, did: &Did, data: &Value) -> Option<&str> {
        self.channels
            .get(did)?
            .iter()
            .find(|e| &e.data == data)
            .map(|e| e.reference.as_str())
    }
}
