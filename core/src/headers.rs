//! Header name normalization.
//!
//! Names are lower-cased; when two names collide after lower-casing, the
//! first one in input order is kept.

use std::collections::HashSet;

use serde_json::Value;

/// Lower-case header names, keeping the first value seen for each name.
pub fn normalize_headers<I, K, V>(headers: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (key, value) in headers {
        let key = key.as_ref().to_lowercase();
        if seen.insert(key.clone()) {
            out.push((key, value.into()));
        }
    }
    out
}

/// Normalize headers held in a dynamic value. Anything other than an object
/// yields no headers.
pub fn headers_from_value(value: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = value else {
        return Vec::new();
    };
    normalize_headers(
        map.iter()
            .filter_map(|(key, value)| header_value(value).map(|value| (key, value))),
    )
}

fn header_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Serde adapter for header pairs stored as a JSON object, in document order.
pub(crate) mod ordered {
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(headers: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(headers.len()))?;
        for (key, value) in headers {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let Value::Object(map) = value else {
            return Ok(Vec::new());
        };
        Ok(map
            .into_iter()
            .filter_map(|(key, value)| super::header_value(&value).map(|value| (key, value)))
            .collect())
    }
}
