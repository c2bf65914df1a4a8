//! Tolerant decoding of provider news lists.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::debug;

/// `null` decodes to the type's default, like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode each list entry on its own. Entries that do not fit are skipped.
pub(crate) fn decode_items<T: DeserializeOwned>(
    provider: &str,
    items: Vec<serde_json::Value>,
) -> Vec<T> {
    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                debug!(provider, "Skipping malformed news item: {}", e);
                None
            }
        })
        .collect();

    if decoded.len() < total {
        debug!(provider, skipped = total - decoded.len(), "Malformed news items skipped");
    }
    decoded
}
