//! Conversion of `zvariant` values into [`PropertyValue`].

use crate::PropertyValue;

use std::collections::BTreeMap;

use zbus::zvariant::{OwnedValue, Value};

/// Convert a D-Bus value into plain data, recursing into containers and nested variants.
pub(crate) fn decode(value: &Value<'_>) -> PropertyValue {
    match value {
        Value::Bool(v) => PropertyValue::Bool(*v),
        Value::U8(v) => PropertyValue::UInt(u64::from(*v)),
        Value::U16(v) => PropertyValue::UInt(u64::from(*v)),
        Value::U32(v) => PropertyValue::UInt(u64::from(*v)),
        Value::U64(v) => PropertyValue::UInt(*v),
        Value::I16(v) => PropertyValue::Int(i64::from(*v)),
        Value::I32(v) => PropertyValue::Int(i64::from(*v)),
        Value::I64(v) => PropertyValue::Int(*v),
        Value::F64(v) => PropertyValue::Double(*v),
        Value::Str(s) => PropertyValue::String(s.as_str().to_string()),
        Value::ObjectPath(p) => PropertyValue::String(p.as_str().to_string()),
        Value::Signature(s) => PropertyValue::String(s.to_string()),
        Value::Value(inner) => decode(inner),
        Value::Array(array) => {
            let bytes: Option<Vec<u8>> = array
                .iter()
                .map(|v| match v {
                    Value::U8(b) => Some(*b),
                    _ => None,
                })
                .collect();
            match bytes {
                Some(bytes) if !bytes.is_empty() => PropertyValue::Bytes(bytes),
                _ => PropertyValue::List(array.iter().map(decode).collect()),
            }
        }
        Value::Dict(dict) => {
            let mut out = BTreeMap::new();
            for (k, v) in dict.iter() {
                out.insert(key_string(k), decode(v));
            }
            PropertyValue::Map(out)
        }
        Value::Structure(s) => PropertyValue::Struct(s.fields().iter().map(decode).collect()),
        #[allow(unreachable_patterns)]
        _ => PropertyValue::Unsupported,
    }
}

pub(crate) fn decode_owned(value: &OwnedValue) -> PropertyValue {
    decode(value)
}

fn key_string(key: &Value<'_>) -> String {
    match key {
        Value::Str(s) => s.as_str().to_string(),
        other => decode(other).to_string(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::collections::HashMap;
    use zbus::zvariant::{ObjectPath, Structure};

    #[test]
    fn scalars_are_widened() {
        assert_eq!(decode(&Value::from(7u32)), PropertyValue::UInt(7));
        assert_eq!(decode(&Value::from(-3i32)), PropertyValue::Int(-3));
        assert_eq!(decode(&Value::from(-5i16)), PropertyValue::Int(-5));
        assert_eq!(decode(&Value::from(9u64)), PropertyValue::UInt(9));
        assert_eq!(decode(&Value::from(true)), PropertyValue::Bool(true));
        assert_eq!(decode(&Value::from(1.5f64)), PropertyValue::Double(1.5));
    }

    #[test]
    fn strings_and_object_paths_become_strings() {
        assert_eq!(
            decode(&Value::from("active")),
            PropertyValue::String("active".to_string())
        );
        let p = ObjectPath::try_from("/org/freedesktop/systemd1/job/7").expect("path");
        assert_eq!(
            decode(&Value::from(p)),
            PropertyValue::String("/org/freedesktop/systemd1/job/7".to_string())
        );
    }

    #[test]
    fn nested_variant_is_unwrapped() {
        let inner = Value::from("dead");
        let outer = Value::Value(Box::new(inner));
        assert_eq!(decode(&outer), PropertyValue::String("dead".to_string()));
    }

    #[test]
    fn byte_arrays_become_bytes_and_other_arrays_lists() {
        let bytes = Value::from(vec![1u8, 2, 3]);
        assert_eq!(decode(&bytes), PropertyValue::Bytes(vec![1, 2, 3]));

        let strs = Value::from(vec!["a", "b"]);
        assert_eq!(
            decode(&strs),
            PropertyValue::List(vec![
                PropertyValue::String("a".to_string()),
                PropertyValue::String("b".to_string()),
            ])
        );
    }

    #[test]
    fn dicts_become_string_keyed_maps() {
        let mut m: HashMap<&str, u32> = HashMap::new();
        m.insert("b", 2);
        m.insert("a", 1);
        let v = Value::from(m);

        let PropertyValue::Map(map) = decode(&v) else {
            panic!("expected map");
        };
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&PropertyValue::UInt(1)));
    }

    #[test]
    fn structures_become_structs() {
        let path =
            ObjectPath::try_from("/org/freedesktop/systemd1/unit/ssh_2eservice").expect("path");
        let s = Structure::from(("ssh.service", path));
        let decoded = decode(&Value::from(s));
        let fields = decoded.as_struct().expect("struct");
        assert_eq!(fields[0].as_str(), Some("ssh.service"));
        assert_eq!(
            fields[1].as_str(),
            Some("/org/freedesktop/systemd1/unit/ssh_2eservice")
        );
    }
}
