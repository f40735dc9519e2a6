use std::collections::BTreeMap;

/// A D-Bus property value converted to plain Rust data.
///
/// Produced by property reads and property-change notifications; no zbus/zvariant types leak
/// through this type.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[non_exhaustive]
pub enum PropertyValue {
    Bool(bool),
    /// Any signed integer width.
    Int(i64),
    /// Any unsigned integer width (including bytes outside of byte arrays).
    UInt(u64),
    Double(f64),
    /// Strings, object paths and signatures.
    String(String),
    /// A non-empty `ay` array.
    Bytes(Vec<u8>),
    List(Vec<PropertyValue>),
    Struct(Vec<PropertyValue>),
    /// Dictionaries; keys are rendered as strings.
    Map(BTreeMap<String, PropertyValue>),
    /// A value this crate does not model (e.g. file descriptors).
    Unsupported,
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of `Int`/`UInt` values when they fit in `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            PropertyValue::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Integer view of `Int`/`UInt` values when they are non-negative.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            PropertyValue::UInt(v) => Some(*v),
            PropertyValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Fields of a struct value (e.g. `Job.Unit`, which is `(so)`).
    pub fn as_struct(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::Struct(fields) => Some(fields.as_slice()),
            _ => None,
        }
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::UInt(v) => write!(f, "{v}"),
            PropertyValue::Double(v) => write!(f, "{v}"),
            PropertyValue::String(v) => f.write_str(v),
            PropertyValue::Bytes(v) => write!(f, "{v:?}"),
            PropertyValue::List(items) | PropertyValue::Struct(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            PropertyValue::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            PropertyValue::Unsupported => f.write_str("<unsupported>"),
        }
    }
}
