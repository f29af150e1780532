//! World configuration.

use serde::Deserialize;

const DEFAULT_CAPACITY: usize = 512;

/// Initial sizes for a [`World`](crate::World)'s arrays.
///
/// Every array grows on demand, so these only decide how much is
/// pre-allocated. A capacity of `0` falls back to the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Entity slots allocated up front.
    pub entity_capacity: usize,
    /// Room reserved on the recycled-entity list.
    pub recycled_capacity: usize,
    /// Room reserved in the query cache.
    pub query_capacity: usize,
}

impl WorldConfig {
    /// Replaces zero capacities with the defaults.
    #[must_use]
    pub fn normalized(self) -> Self {
        let or_default = |value: usize| if value == 0 { DEFAULT_CAPACITY } else { value };
        Self {
            entity_capacity: or_default(self.entity_capacity),
            recycled_capacity: or_default(self.recycled_capacity),
            query_capacity: or_default(self.query_capacity),
        }
    }

    /// Sets the initial entity capacity.
    #[must_use]
    pub fn with_entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            entity_capacity: DEFAULT_CAPACITY,
            recycled_capacity: DEFAULT_CAPACITY,
            query_capacity: DEFAULT_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_falls_back_to_default() {
        let config = WorldConfig {
            entity_capacity: 0,
            recycled_capacity: 16,
            query_capacity: 0,
        }
        .normalized();
        assert_eq!(config.entity_capacity, DEFAULT_CAPACITY);
        assert_eq!(config.recycled_capacity, 16);
        assert_eq!(config.query_capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: WorldConfig = serde_json::from_str(r#"{ "entity_capacity": 64 }"#).unwrap();
        assert_eq!(config.entity_capacity, 64);
        assert_eq!(config.query_capacity, DEFAULT_CAPACITY);
    }
}
