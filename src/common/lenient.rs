// Adapter for records whose field names and value types drift between
// backend versions. Every model reads its fields through `Fields`, listing
// all known spellings in one place, and missing or mistyped values map to
// `None`/defaults instead of errors.
use serde_json::Value;

/// Integer id from a number or a numeric string.
pub fn value_to_id(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Text from a string or a scalar. Null and containers give `None`.
pub fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `true`, `"true"`, `1` and `"1"` are truthy.
pub fn value_to_flag(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true" || s == "1",
        Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    }
}

/// Loose truthiness: null, `false`, `0` and `""` are false, anything else true.
pub fn value_is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Read-only view over one JSON record.
///
/// Keys are tried in order and the first non-null value wins. A key starting
/// with `/` is a JSON pointer into nested objects.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a>(pub &'a Value);

impl<'a> Fields<'a> {
    pub fn new(record: &'a Value) -> Self {
        Self(record)
    }

    pub fn get(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter()
            .filter_map(|k| if k.starts_with('/') { self.0.pointer(k) } else { self.0.get(*k) })
            .find(|v| !v.is_null())
    }

    pub fn id(&self, keys: &[&str]) -> Option<i64> {
        self.get(keys).and_then(value_to_id)
    }

    pub fn string(&self, keys: &[&str]) -> Option<String> {
        self.get(keys).and_then(value_to_string)
    }

    /// Like [`string`](Self::string) but blank text counts as missing.
    pub fn text(&self, keys: &[&str]) -> Option<String> {
        self.string(keys).filter(|s| !s.trim().is_empty())
    }

    pub fn flag(&self, keys: &[&str]) -> bool {
        self.get(keys).map(value_to_flag).unwrap_or(false)
    }

    pub fn count(&self, keys: &[&str]) -> Option<u32> {
        self.id(keys).and_then(|n| u32::try_from(n).ok())
    }

    pub fn list(&self, keys: &[&str]) -> Vec<Value> {
        match self.get(keys) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }
}

/// Implements `Deserialize` through the type's `from_json` adapter, so a
/// record never fails to deserialize because of a drifting field.
macro_rules! deserialize_via_adapter {
    ($ty:ty) => {
        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let value = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;
                Ok(<$ty>::from_json(&value))
            }
        }
    };
}

pub(crate) use deserialize_via_adapter;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_accept_numbers_and_numeric_strings() {
        assert_eq!(value_to_id(&json!(7)), Some(7));
        assert_eq!(value_to_id(&json!("42")), Some(42));
        assert_eq!(value_to_id(&json!(3.0)), Some(3));
        assert_eq!(value_to_id(&json!("abc")), None);
        assert_eq!(value_to_id(&Value::Null), None);
    }

    #[test]
    fn flags_accept_string_true() {
        assert!(value_to_flag(&json!(true)));
        assert!(value_to_flag(&json!("true")));
        assert!(!value_to_flag(&json!("yes")));
        assert!(!value_to_flag(&Value::Null));
    }

    #[test]
    fn first_non_null_key_wins() {
        let v = json!({ "user_id": null, "userId": "12", "creator": { "nickname": "lee" } });
        let f = Fields::new(&v);
        assert_eq!(f.id(&["user_id", "userId"]), Some(12));
        assert_eq!(f.string(&["/creator/nickname", "/creator/name"]).as_deref(), Some("lee"));
        assert_eq!(f.string(&["missing"]), None);
        assert!(f.list(&["participants"]).is_empty());
    }
}
