// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Asset descriptors
//!
//! A descriptor is the consumer-supplied configuration of an asset: a JSON
//! object that always carries a `path` field. The stringified `path` is the
//! cache key, so two descriptors with the same path share one cache entry.
//!
//! Descriptors are merged with a type-specific defaults object on the way in
//! and diffed against it on the way out, which keeps persisted forms minimal:
//!
//! ```
//! use asset_cache::descriptor::{diff, merge, Descriptor};
//! use serde_json::json;
//!
//! let defaults = json!({ "scale": 1.0, "lod": { "bias": 0 } });
//! let descriptor = Descriptor::new("/models/a.json").with("scale", 2.0);
//!
//! let merged = descriptor.with_defaults(defaults.as_object().unwrap());
//! assert_eq!(merged.get("lod"), Some(&json!({ "bias": 0 })));
//!
//! let stored = diff(&defaults, &merged.to_value());
//! assert_eq!(stored, json!({ "path": "/models/a.json", "scale": 2.0 }));
//! assert_eq!(merge(&defaults, &stored), merged.to_value());
//! ```

use crate::error::{AssetError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Field every descriptor must carry
pub const PATH_FIELD: &str = "path";

/// Type-specific default fields merged under a descriptor
pub type Defaults = Map<String, Value>;

/// Consumer-supplied asset configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Descriptor {
    fields: Map<String, Value>,
}

impl Descriptor {
    /// Create a descriptor holding only a path
    pub fn new(path: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(PATH_FIELD.to_string(), Value::String(path.into()));
        Self { fields }
    }

    /// Build a descriptor from arbitrary JSON. Fails unless `value` is an
    /// object with a non-null `path`.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(fields) = value else {
            return Err(AssetError::InvalidDescriptor(format!(
                "expected an object, got {value}"
            )));
        };

        match fields.get(PATH_FIELD) {
            None | Some(Value::Null) => Err(AssetError::MissingPath),
            Some(_) => Ok(Self { fields }),
        }
    }

    /// Builder-style field insertion
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Insert or replace a field. Replacing `path` with `null` is ignored.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let field = field.into();
        let value = value.into();
        if field == PATH_FIELD && value.is_null() {
            return None;
        }
        self.fields.insert(field, value)
    }

    /// Raw `path` value
    pub fn path(&self) -> &Value {
        self.fields.get(PATH_FIELD).unwrap_or(&Value::Null)
    }

    /// Cache key: the stringified path
    pub fn key(&self) -> String {
        match self.path() {
            Value::String(path) => path.clone(),
            other => other.to_string(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Decode a field into a concrete type. `Ok(None)` when the field is absent.
    pub fn get_as<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>> {
        self.fields
            .get(field)
            .map(|value| {
                T::deserialize(value).map_err(|e| {
                    AssetError::InvalidDescriptor(format!("field `{field}`: {e}"))
                })
            })
            .transpose()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// New descriptor with `defaults` filled in wherever this one omits a
    /// field. `self` is left untouched.
    pub fn with_defaults(&self, defaults: &Defaults) -> Self {
        let mut fields = defaults.clone();
        merge_into(&mut fields, &self.fields);
        Self { fields }
    }

    /// Minimal storable form: fields equal to `defaults` are omitted
    pub fn diff_from(&self, defaults: Option<&Defaults>) -> Value {
        match defaults {
            Some(defaults) => Value::Object(diff_maps(defaults, &self.fields)),
            None => self.to_value(),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl TryFrom<Value> for Descriptor {
    type Error = AssetError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

impl<'de> Deserialize<'de> for Descriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Deep merge: `overlay` wins wherever it defines a field, nested objects are
/// merged recursively. Neither input is modified.
pub fn merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            let mut merged = base.clone();
            merge_into(&mut merged, overlay);
            Value::Object(merged)
        }
        _ => overlay.clone(),
    }
}

/// Structural difference of `value` against `base`. For objects, fields equal
/// to `base` are dropped and nested objects are diffed recursively; any other
/// value is returned whole.
pub fn diff(base: &Value, value: &Value) -> Value {
    match (base, value) {
        (Value::Object(base), Value::Object(value)) => Value::Object(diff_maps(base, value)),
        _ => value.clone(),
    }
}

fn merge_into(target: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (field, value) in overlay {
        match (target.get_mut(field), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => merge_into(existing, nested),
            _ => {
                target.insert(field.clone(), value.clone());
            }
        }
    }
}

fn diff_maps(base: &Map<String, Value>, value: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (field, current) in value {
        match base.get(field) {
            Some(default) if default == current => {}
            Some(Value::Object(default)) => {
                if let Value::Object(nested) = current {
                    let nested = diff_maps(default, nested);
                    if !nested.is_empty() {
                        out.insert(field.clone(), Value::Object(nested));
                    }
                } else {
                    out.insert(field.clone(), current.clone());
                }
            }
            _ => {
                out.insert(field.clone(), current.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_is_stringified_path() {
        assert_eq!(Descriptor::new("/models/a.json").key(), "/models/a.json");

        let numeric = Descriptor::from_value(json!({ "path": 42 })).unwrap();
        assert_eq!(numeric.key(), "42");
    }

    #[test]
    fn test_from_value_requires_path() {
        assert_eq!(
            Descriptor::from_value(json!({ "scale": 1 })),
            Err(AssetError::MissingPath)
        );
        assert_eq!(
            Descriptor::from_value(json!({ "path": null })),
            Err(AssetError::MissingPath)
        );
        assert!(matches!(
            Descriptor::from_value(json!("nope")),
            Err(AssetError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Descriptor = serde_json::from_str(r#"{ "path": "a.json", "lod": 2 }"#).unwrap();
        assert_eq!(ok.get_as::<u32>("lod").unwrap(), Some(2));
        assert!(serde_json::from_str::<Descriptor>(r#"{ "lod": 2 }"#).is_err());
    }

    #[test]
    fn test_get_as_wrong_type() {
        let descriptor = Descriptor::new("a.json").with("lod", "high");
        assert!(descriptor.get_as::<u32>("lod").is_err());
        assert_eq!(descriptor.get_as::<u32>("missing").unwrap(), None);
    }

    #[test]
    fn test_defaults_only_fill_gaps() {
        let defaults = json!({ "path": "default.json", "scale": 1.0, "tint": [1, 1, 1] });
        let descriptor = Descriptor::new("a.json").with("scale", 3.0);

        let merged = descriptor.with_defaults(defaults.as_object().unwrap());
        assert_eq!(merged.key(), "a.json");
        assert_eq!(merged.get("scale"), Some(&json!(3.0)));
        assert_eq!(merged.get("tint"), Some(&json!([1, 1, 1])));
        // caller's descriptor is not touched
        assert!(descriptor.get("tint").is_none());
    }

    #[test]
    fn test_nested_merge() {
        let base = json!({ "material": { "roughness": 0.5, "metal": false } });
        let overlay = json!({ "material": { "metal": true } });
        assert_eq!(
            merge(&base, &overlay),
            json!({ "material": { "roughness": 0.5, "metal": true } })
        );
    }

    #[test]
    fn test_diff_omits_defaults() {
        let defaults = json!({ "scale": 1.0, "material": { "roughness": 0.5, "metal": false } });
        let value = json!({
            "path": "a.json",
            "scale": 1.0,
            "material": { "roughness": 0.5, "metal": true }
        });
        assert_eq!(
            diff(&defaults, &value),
            json!({ "path": "a.json", "material": { "metal": true } })
        );
    }

    #[test]
    fn test_diff_merge_round_trip() {
        let defaults = json!({ "scale": 1.0, "tags": ["a"], "material": { "roughness": 0.5 } });
        let cases = [
            json!({ "path": "a", "scale": 1.0, "tags": ["a"], "material": { "roughness": 0.5 } }),
            json!({
                "path": "b",
                "scale": 2.0,
                "tags": [],
                "material": { "roughness": 0.5, "metal": true },
            }),
            json!({ "path": "c", "scale": 1.0, "tags": ["a"], "material": "flat" }),
        ];

        for descriptor in cases {
            let stored = diff(&defaults, &descriptor);
            assert_eq!(merge(&defaults, &stored), descriptor, "stored form: {stored}");
        }
    }

    #[test]
    fn test_diff_without_defaults_is_identity() {
        let descriptor = Descriptor::new("a.json").with("scale", 2);
        assert_eq!(descriptor.diff_from(None), descriptor.to_value());
    }
}
