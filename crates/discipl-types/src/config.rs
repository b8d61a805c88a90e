use serde::{Deserialize, Serialize};

/// Tunables of a Discipl core instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// How many foreign claims deep a linked-data export descends.
    #[serde(default = "default_max_export_depth")]
    pub max_export_depth: usize,
    /// Capacity hint for connector live feeds.
    #[serde(default = "default_observe_buffer")]
    pub observe_buffer: usize,
    /// Connector names the host registers at startup.
    #[serde(default)]
    pub autoload: Vec<String>,
}

fn default_max_export_depth() -> usize {
    3
}
fn default_observe_buffer() -> usize {
    256
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_export_depth: default_max_export_depth(),
            observe_buffer: default_observe_buffer(),
            autoload: Vec::new(),
        }
    }
}
