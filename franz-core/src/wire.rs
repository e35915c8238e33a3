//! Field-level leniency for JSON written by other programs
//!
//! The executor's stdout and old `state.json` files come from code franz does
//! not control. One bad field must not cost the rest of the record, so each
//! field is decoded on its own and falls back to its default.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decode the field as `T`, or use `T::default()` if it is `null` or of the
/// wrong type.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Free text: strings as-is, `null` as absent, anything else in its JSON form.
pub(crate) fn text_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}
