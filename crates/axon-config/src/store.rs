use serde::Deserialize;

/// Response store configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Keep responses that were created with `store: true`
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Upper bound on stored responses; the oldest are evicted first
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_max_entries(),
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_enabled() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_max_entries() -> usize {
    10_000
}
