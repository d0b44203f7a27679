//! Decoding for fields the task server may send as `null`
//!
//! `#[serde(default)]` only covers a missing field. The task server also
//! sends explicit `null` for empty values, which must decode to the same
//! zero value.

use serde::{Deserialize, Deserializer};

/// Decodes `null` as `T::default()`
pub(crate) fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
