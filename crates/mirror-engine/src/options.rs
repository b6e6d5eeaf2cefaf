//! Engine configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Accessor cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Pre-allocated entry slots
    pub initial_capacity: usize,

    /// Maximum number of cached dispatchers (0 disables retention)
    pub max_capacity: usize,

    /// Expected number of concurrently writing threads
    pub concurrency_level: usize,

    /// Entries idle for longer than this are dropped
    #[serde(with = "duration_secs")]
    pub idle_timeout: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            max_capacity: 256,
            concurrency_level: 10,
            idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl CacheOptions {
    /// Options with a custom capacity bound
    pub fn with_max_capacity(max_capacity: usize) -> Self {
        Self {
            max_capacity,
            ..Self::default()
        }
    }

    /// Options with a custom idle timeout
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            ..Self::default()
        }
    }

    /// Shard count for the concurrent maps (power of two, at least 2)
    pub fn shard_amount(&self) -> usize {
        self.concurrency_level.max(2).next_power_of_two()
    }
}

/// Reflector settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectorOptions {
    /// Dispatcher cache settings
    pub cache: CacheOptions,
}

impl ReflectorOptions {
    /// Options with the given cache settings
    pub fn with_cache(cache: CacheOptions) -> Self {
        Self { cache }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
