use std::path::Path;
use std::time::Duration;

use config::{Config, File};
use serde::{Deserialize, Serialize};

use crate::error::PulseError;

/// Tuning knobs for a [`crate::manager::ConnectionManager`], exactly the
/// fields this crate exposes for tuning. Unknown fields in
/// a deserialized source are rejected rather than silently ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ManagerConfig {
    /// Period between scheduled recycles of the live connection.
    #[serde(with = "humantime_duration")]
    pub recycle_interval: Duration,
    /// Grace period a retiring connection is kept open to drain in-flight work.
    #[serde(with = "humantime_duration")]
    pub retirement_delay: Duration,
    /// Minimum gap enforced between two successive dial attempts.
    #[serde(with = "humantime_duration")]
    pub min_reconnection_interval: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            recycle_interval: Duration::from_secs(3600),
            retirement_delay: Duration::from_secs(30),
            min_reconnection_interval: Duration::from_secs(15),
        }
    }
}

/// Tuning knobs for a [`crate::consumer::Consumer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ConsumerConfig {
    /// Per-channel in-flight delivery cap (AMQP QoS prefetch).
    pub prefetch: u16,
    /// Forwarded verbatim to the queue declaration, if set.
    pub max_length: Option<u32>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        ConsumerConfig {
            prefetch: 5,
            max_length: None,
        }
    }
}

/// Loads a [`ManagerConfig`] by layering the given paths (first existing
/// one wins, later paths are not merged). Absent paths are skipped rather
/// than treated as errors; a config file found but failing to parse is a
/// `PulseError::Configuration`.
pub fn load_manager_config(paths: &[&str]) -> Result<ManagerConfig, PulseError> {
    let mut builder = Config::builder();
    for path in paths {
        let expanded = shellexpand::full(path)
            .map_err(|e| PulseError::Configuration(e.to_string()))?
            .into_owned();
        if Path::new(&expanded).exists() {
            builder = builder.add_source(File::with_name(&expanded));
        }
    }

    builder
        .build()
        .map_err(|e| PulseError::Configuration(e.to_string()))?
        .try_deserialize()
        .map_err(|e| PulseError::Configuration(e.to_string()))
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs_f64().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
