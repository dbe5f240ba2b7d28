//! Bindable parameter values.

use chrono::{DateTime, SecondsFormat, Utc};

/// A value bound as a query parameter.
///
/// Compiled queries carry their parameters as `Value`s in placeholder order;
/// an adapter converts them into whatever its driver binds.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer that fits in 64 bits.
    Int(i64),
    /// Wider integer (`u64`, `i128`).
    BigInt(i128),
    /// Floating point.
    Float(f64),
    /// Text.
    Text(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Point in time, UTC.
    Timestamp(DateTime<Utc>),
    /// Structured JSON document.
    Json(serde_json::Value),
    /// Array of values.
    Array(Vec<Value>),
}

impl Value {
    /// Short name of the value's kind, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) | Self::BigInt(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Timestamp(_) => "timestamp",
            Self::Json(serde_json::Value::Object(_)) => "object",
            Self::Json(serde_json::Value::Array(_)) | Self::Array(_) => "array",
            Self::Json(_) => "json",
        }
    }

    /// Check if the value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Json(serde_json::Value::Null))
    }

    /// Render as JSON. Timestamps become RFC 3339 strings and integers too
    /// wide for JSON numbers become strings.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::BigInt(i) => match (i64::try_from(*i), u64::try_from(*i)) {
                (Ok(v), _) => Json::from(v),
                (_, Ok(v)) => Json::from(v),
                _ => Json::String(i.to_string()),
            },
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Self::Text(s) => Json::String(s.clone()),
            Self::Bytes(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
            Self::Timestamp(ts) => Json::String(format_timestamp(ts)),
            Self::Json(json) => json.clone(),
            Self::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
        }
    }

    /// The value as literal text, for scalars only.
    ///
    /// Returns `None` for NULL, bytes, arrays and JSON objects/arrays.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::BigInt(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::Timestamp(ts) => Some(format_timestamp(ts)),
            Self::Json(serde_json::Value::String(s)) => Some(s.clone()),
            Self::Json(json @ (serde_json::Value::Bool(_) | serde_json::Value::Number(_))) => {
                Some(json.to_string())
            }
            Self::Null | Self::Bytes(_) | Self::Json(_) | Self::Array(_) => None,
        }
    }
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

macro_rules! impl_from_int {
    ($variant:ident: $($ty:ty),+) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )+
    };
}

impl_from_int!(Int: i8, i16, i32, i64, u8, u16, u32);
impl_from_int!(BigInt: u64, i128);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// Scalars map onto the matching variant; arrays and objects stay JSON.
impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::BigInt(u.into())
                } else {
                    n.as_f64().map_or(Self::Null, Self::Float)
                }
            }
            Json::String(s) => Self::Text(s),
            json @ (Json::Array(_) | Json::Object(_)) => Self::Json(json),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::Array(value.into_iter().map(Into::into).collect())
    }
}
