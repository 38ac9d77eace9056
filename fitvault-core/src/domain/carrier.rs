//! Model carrier domain type
//!
//! A carrier is the fitted detector object held in a step's carrier slot.
//! Its plain attributes serialize as JSON. Its native handles never do: the
//! serialized form writes every handle field as `null`, and serializing a
//! carrier that still has a handle attached is an error.

use crate::native::NativeHandle;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A fitted detector object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Carrier {
    /// Fully qualified detector type, e.g. `fitvault.detectors.vae.VAE`
    pub type_path: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default, with = "detached")]
    handles: BTreeMap<String, Option<NativeHandle>>,
}

impl Carrier {
    pub fn new(type_path: impl Into<String>) -> Self {
        Self {
            type_path: type_path.into(),
            attributes: BTreeMap::new(),
            handles: BTreeMap::new(),
        }
    }

    /// Carrier type id: the last segment of the type path
    pub fn type_name(&self) -> &str {
        self.type_path
            .rsplit('.')
            .next()
            .unwrap_or(self.type_path.as_str())
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Typed view of an attribute; `None` if absent or of another shape
    pub fn attribute_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn with_handle(mut self, field: impl Into<String>, handle: NativeHandle) -> Self {
        self.handles.insert(field.into(), Some(handle));
        self
    }

    /// Declares a handle field without attaching anything to it
    pub fn with_empty_handle(mut self, field: impl Into<String>) -> Self {
        self.handles.insert(field.into(), None);
        self
    }

    pub fn handle(&self, field: &str) -> Option<&NativeHandle> {
        self.handles.get(field).and_then(Option::as_ref)
    }

    /// Every declared handle field, attached or not
    pub fn handle_fields(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }

    /// A plain carrier declares no handle fields at all
    pub fn is_plain(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Capability to have native handles detached and reattached by field name
pub trait HandleHost {
    /// Takes the handle out of `field`, leaving the field declared but empty
    fn detach_handle(&mut self, field: &str) -> Option<NativeHandle>;

    fn attach_handle(&mut self, field: &str, handle: NativeHandle);

    /// Names of the fields that currently hold a handle
    fn attached_fields(&self) -> Vec<String>;
}

impl HandleHost for Carrier {
    fn detach_handle(&mut self, field: &str) -> Option<NativeHandle> {
        self.handles.get_mut(field).and_then(Option::take)
    }

    fn attach_handle(&mut self, field: &str, handle: NativeHandle) {
        self.handles.insert(field.to_string(), Some(handle));
    }

    fn attached_fields(&self) -> Vec<String> {
        self.handles
            .iter()
            .filter(|(_, h)| h.is_some())
            .map(|(field, _)| field.clone())
            .collect()
    }
}

/// Serde adapter that writes handle fields as `null` and refuses attached ones
mod detached {
    use crate::native::NativeHandle;
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;
    use std::collections::BTreeMap;

    pub fn serialize<S>(
        handles: &BTreeMap<String, Option<NativeHandle>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if let Some((field, _)) = handles.iter().find(|(_, h)| h.is_some()) {
            return Err(S::Error::custom(format!(
                "native handle '{}' is still attached",
                field
            )));
        }
        serializer.collect_map(handles.keys().map(|field| (field, Option::<()>::None)))
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Option<NativeHandle>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Option<Value>>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(field, value)| match value {
                None => Ok((field, None)),
                Some(_) => Err(D::Error::custom(format!(
                    "handle field '{}' must be null in serialized form",
                    field
                ))),
            })
            .collect()
    }
}
