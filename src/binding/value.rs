//! Bound argument values.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use thiserror::Error;

/// An entry of an aggregated parameter map: one value, or every value of a
/// repeated name in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Multi(Vec<String>),
}

impl ParamValue {
    /// The first value, which is what a scalar lookup of the same name sees.
    pub fn first(&self) -> &str {
        match self {
            Self::Single(v) => v,
            Self::Multi(vs) => vs.first().map_or("", String::as_str),
        }
    }

    fn to_json(&self) -> Json {
        match self {
            Self::Single(v) => Json::String(v.clone()),
            Self::Multi(vs) => Json::Array(vs.iter().cloned().map(Json::String).collect()),
        }
    }
}

/// A record bound field by field, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: String,
    fields: Vec<(String, Value)>,
}

impl Record {
    pub(crate) fn new(type_name: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A typed argument produced by the binder.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An optional parameter that was not supplied.
    Absent,
    String(String),
    Int(i32),
    Long(i64),
    Float(f64),
    Map(BTreeMap<String, ParamValue>),
    Record(Record),
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// JSON form: absent becomes `null`, maps and records become objects and
    /// repeated map entries become arrays.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Absent => Json::Null,
            Self::String(s) => Json::String(s.clone()),
            Self::Int(n) => Json::from(*n),
            Self::Long(n) => Json::from(*n),
            Self::Float(n) => Json::from(*n),
            Self::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Record(record) => Json::Object(
                record
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("null"),
            Self::String(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Long(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Map(_) => write!(f, "{}", self.to_json()),
            Self::Record(record) => {
                write!(f, "{}(", record.type_name)?;
                for (i, (name, value)) in record.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}={value}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Errors when reading a bound record back into a Rust type.
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("no record argument named '{name}'")]
    NotFound { name: String },

    #[error("record argument '{name}' does not fit the requested type: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The successful outcome of binding: one value per declared parameter, in
/// declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Vec<(String, Value)>,
}

impl Arguments {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: Value) {
        self.values.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_i32(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn get_map(&self, name: &str) -> Option<&BTreeMap<String, ParamValue>> {
        match self.get(name)? {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Deserialize a bound record into `T`.
    ///
    /// # Errors
    ///
    /// [`ArgumentError::NotFound`] if `name` is not a record argument,
    /// [`ArgumentError::Decode`] if its fields do not fit `T`.
    pub fn get_record<T: DeserializeOwned>(&self, name: &str) -> Result<T, ArgumentError> {
        match self.get(name) {
            Some(value @ Value::Record(_)) => {
                serde_json::from_value(value.to_json()).map_err(|source| ArgumentError::Decode {
                    name: name.to_owned(),
                    source,
                })
            }
            _ => Err(ArgumentError::NotFound {
                name: name.to_owned(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct HelloData {
        username: Option<String>,
        age: i32,
    }

    fn hello(username: Value, age: Value) -> Arguments {
        let mut args = Arguments::default();
        args.push(
            "helloData",
            Value::Record(Record::new(
                "HelloData",
                vec![("username".into(), username), ("age".into(), age)],
            )),
        );
        args
    }

    #[test]
    fn record_deserializes_into_struct() {
        let args = hello(Value::String("kim".into()), Value::Int(20));
        let data: HelloData = args.get_record("helloData").unwrap();
        assert_eq!(
            data,
            HelloData {
                username: Some("kim".into()),
                age: 20
            }
        );
    }

    #[test]
    fn absent_record_field_is_null() {
        let args = hello(Value::Absent, Value::Int(0));
        let data: HelloData = args.get_record("helloData").unwrap();
        assert_eq!(data.username, None);
    }

    #[test]
    fn record_lookup_errors() {
        let args = hello(Value::Absent, Value::Absent);
        assert!(matches!(
            args.get_record::<HelloData>("other"),
            Err(ArgumentError::NotFound { .. })
        ));
        assert!(matches!(
            args.get_record::<HelloData>("helloData"),
            Err(ArgumentError::Decode { .. })
        ));
    }

    #[test]
    fn record_display_lists_fields() {
        let value = Value::Record(Record::new(
            "HelloData",
            vec![
                ("username".into(), Value::String("kim".into())),
                ("age".into(), Value::Absent),
            ],
        ));
        assert_eq!(value.to_string(), "HelloData(username=kim, age=null)");
    }

    #[test]
    fn map_json_uses_arrays_for_repeats() {
        let mut map = BTreeMap::new();
        map.insert("id".to_owned(), ParamValue::Multi(vec!["1".into(), "2".into()]));
        map.insert("name".to_owned(), ParamValue::Single("x".into()));
        assert_eq!(
            Value::Map(map).to_json(),
            serde_json::json!({ "id": ["1", "2"], "name": "x" })
        );
    }

    #[test]
    fn typed_accessors_check_the_variant() {
        let mut args = Arguments::default();
        args.push("age", Value::Int(3));
        args.push("orderId", Value::Long(7));
        assert_eq!(args.get_i32("age"), Some(3));
        assert_eq!(args.get_i64("age"), None);
        assert_eq!(args.get_i64("orderId"), Some(7));
        assert_eq!(args.get_str("missing"), None);
        assert_eq!(args.len(), 2);
    }
}
