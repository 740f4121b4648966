//! (De)serializes a [`Duration`] as a number of whole seconds, which is how
//! all timeouts and intervals are written in the configuration file.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// Serializes a [`Duration`] as seconds.
pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    duration.as_secs().serialize(serializer)
}

/// Deserializes seconds into a [`Duration`].
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}
