//! Content-type driven request serialization and response deserialization.
//!
//! # Design
//! The format is picked from the declared content type alone, by
//! case-insensitive substring so suffixed media types such as
//! `application/json;charset=UTF-8` still match. Response bodies are only
//! transformed into a typed value when the caller names a result type; the
//! names are resolved through a `ResultTypeRegistry` populated when the
//! handler is configured, never by reflection.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::RestError;

/// Wire format selected from a content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Json,
    Xml,
}

impl ContentFormat {
    pub fn detect(content_type: &str) -> Option<Self> {
        let lower = content_type.to_ascii_lowercase();
        if lower.contains("application/json") {
            Some(ContentFormat::Json)
        } else if lower.contains("application/xml") {
            Some(ContentFormat::Xml)
        } else {
            None
        }
    }
}

/// Encode a structured request body for `content_type`.
///
/// XML needs a value that maps onto a document: an object with a single
/// key, which becomes the root element.
pub fn serialize(value: &Value, content_type: &str) -> Result<Vec<u8>, RestError> {
    let fail = |reason: String| RestError::Serialization {
        content_type: content_type.to_string(),
        reason,
    };
    match ContentFormat::detect(content_type) {
        Some(ContentFormat::Json) => serde_json::to_vec(value).map_err(|e| fail(e.to_string())),
        Some(ContentFormat::Xml) => match value {
            Value::Object(map) if map.len() == 1 => {
                let Some((root, inner)) = map.iter().next() else {
                    return Err(fail("empty document".to_string()));
                };
                quick_xml::se::to_string_with_root(root, inner)
                    .map(String::into_bytes)
                    .map_err(|e| fail(e.to_string()))
            }
            other => Err(fail(format!(
                "value is not mappable to an XML document (expected an object with one root element): {other}"
            ))),
        },
        None => Err(RestError::UnsupportedContentType(content_type.to_string())),
    }
}

/// Decode `body` into the registered type `target`.
///
/// No target means no transformation: the raw text comes back unchanged. A
/// content type with no transformer also yields the raw text, with a warning.
pub fn deserialize(
    body: &str,
    content_type: &str,
    target: Option<&str>,
    registry: &ResultTypeRegistry,
) -> Result<ResultValue, RestError> {
    let Some(target) = target.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(ResultValue::Text(body.to_string()));
    };
    let decode = registry
        .decoders
        .get(target)
        .ok_or_else(|| RestError::UnknownResultType(target.to_string()))?;
    let Some(format) = ContentFormat::detect(content_type) else {
        warn!(content_type, result_type = target, "no transformer for content type, returning raw text");
        return Ok(ResultValue::Text(body.to_string()));
    };
    decode(body, format).map_err(|reason| RestError::Deserialization {
        result_type: target.to_string(),
        reason,
    })
}

type DecodeFn = Box<dyn Fn(&str, ContentFormat) -> Result<ResultValue, String> + Send + Sync>;

/// Logical result type names mapped to their deserializers.
pub struct ResultTypeRegistry {
    decoders: HashMap<String, DecodeFn>,
}

impl ResultTypeRegistry {
    /// Registry with the built-in `json` type, decoding into `serde_json::Value`.
    pub fn new() -> Self {
        Self::empty().with::<Value>("json")
    }

    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    pub fn with<T>(mut self, type_id: &str) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.register::<T>(type_id);
        self
    }

    pub fn register<T>(&mut self, type_id: &str)
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let decode: DecodeFn = Box::new(|body: &str, format: ContentFormat| -> Result<ResultValue, String> {
            let value: T = match format {
                ContentFormat::Json => serde_json::from_str(body).map_err(|e| e.to_string())?,
                ContentFormat::Xml => quick_xml::de::from_str(body).map_err(|e| e.to_string())?,
            };
            Ok(ResultValue::Typed(TypedValue::new(value)))
        });
        self.decoders.insert(type_id.to_string(), decode);
    }
}

impl Default for ResultTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResultTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ResultTypeRegistry").field("types", &names).finish()
    }
}

/// The `Result` entry handed back to the workflow.
#[derive(Debug)]
pub enum ResultValue {
    Text(String),
    Typed(TypedValue),
}

impl ResultValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResultValue::Text(s) => Some(s),
            ResultValue::Typed(_) => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            ResultValue::Typed(v) => v.downcast_ref(),
            ResultValue::Text(_) => None,
        }
    }
}

/// A deserialized value of a registered result type.
pub struct TypedValue {
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

impl TypedValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            value: Box::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        let type_name = self.type_name;
        match self.value.downcast::<T>() {
            Ok(v) => Ok(*v),
            Err(value) => Err(Self { type_name, value }),
        }
    }
}

impl fmt::Debug for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedValue({})", self.type_name)
    }
}
