//! Environment-driven settings for map persistence.
//!
//! Every knob has a default, so an empty environment is a valid one.

pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 1000;
pub const DEFAULT_COLLECTION: &str = "maps";
pub const DEFAULT_STATE_FIELD: &str = "mapState";
pub const DEFAULT_SAVE_QUEUE_CAPACITY: usize = 64;

/// Where and how often map scenes are saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistConfig {
    /// Quiet period before the latest pending scene is written, in milliseconds.
    pub debounce_ms: u64,
    /// Document collection holding one document per map.
    pub collection: String,
    /// Field of the map document that carries the serialized scene.
    pub state_field: String,
    /// Bounded channel capacity between sessions and the save worker.
    pub queue_capacity: usize,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_SAVE_DEBOUNCE_MS,
            collection: DEFAULT_COLLECTION.to_owned(),
            state_field: DEFAULT_STATE_FIELD.to_owned(),
            queue_capacity: DEFAULT_SAVE_QUEUE_CAPACITY,
        }
    }
}

impl PersistConfig {
    pub fn from_env() -> Self {
        Self {
            debounce_ms: env_parse("MAP_SAVE_DEBOUNCE_MS", DEFAULT_SAVE_DEBOUNCE_MS),
            collection: env_string("MAP_COLLECTION", DEFAULT_COLLECTION),
            state_field: env_string("MAP_STATE_FIELD", DEFAULT_STATE_FIELD),
            queue_capacity: env_parse("MAP_SAVE_QUEUE_CAPACITY", DEFAULT_SAVE_QUEUE_CAPACITY).max(1),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Non-empty, trimmed string value of `key`, or `default`.
pub(crate) fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_owned())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
