//! Parameter binding: turn raw request strings into typed handler arguments.
//!
//! [`bind`] walks a handler's [`ParameterSpec`]s in declaration order and
//! resolves each one against a [`RequestView`]:
//!
//! | Source      | Raw value                                   | Missing                         |
//! |-------------|---------------------------------------------|---------------------------------|
//! | `Path`      | the `{name}` capture                        | [`BindingError::MissingPathVariable`] |
//! | `Aggregate` | every query/form parameter                  | never fails                     |
//! | `Query`     | first value of the named parameter          | default → absent → error        |
//!
//! A configured default replaces the candidate whenever it is missing *or*
//! empty. A present-but-empty value still satisfies `required`.
//!
//! Binding is all-or-nothing: the first error stops the walk and no partial
//! argument list is returned.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::handler::HandlerDescriptor;
use crate::http::{ParamMap, RequestView};

pub mod spec;
pub mod value;

pub use spec::{ParamSource, ParamType, ParameterSpec, RecordSpec, SpecError};
pub use value::{ArgumentError, Arguments, ParamValue, Record, Value};

/// Why a handler's arguments could not be produced.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("required parameter '{name}' is not present")]
    MissingRequired { name: String },

    #[error("failed to convert value '{raw}' of parameter '{name}' to {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        raw: String,
    },

    #[error("path variable '{name}' was not captured by the matched route")]
    MissingPathVariable { name: String },
}

impl BindingError {
    /// Name of the parameter that failed.
    pub fn parameter(&self) -> &str {
        match self {
            Self::MissingRequired { name }
            | Self::TypeMismatch { name, .. }
            | Self::MissingPathVariable { name } => name,
        }
    }

    /// `true` for faults caused by the client's request rather than by a
    /// mismatch between the route table and the handler declaration.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::MissingPathVariable { .. })
    }
}

/// Bind every declared parameter of `handler` from `view`.
///
/// # Errors
///
/// The first [`BindingError`] encountered; later parameters are not evaluated.
///
/// # Examples
///
/// ```
/// use reqbind::binding::{self, ParamType, ParameterSpec};
/// use reqbind::handler::HandlerDescriptor;
/// use reqbind::http::{Method, RequestView};
///
/// let handler = HandlerDescriptor::raw_body("requestParamDefault")
///     .param(ParameterSpec::query("username", ParamType::String).default_value("guest"))
///     .param(ParameterSpec::query("age", ParamType::int()).optional().default_value("-1"));
///
/// let view = RequestView::new(Method::Get, "/request-param-default").param("username", "");
/// let args = binding::bind(&handler, &view).unwrap();
///
/// assert_eq!(args.get_str("username"), Some("guest"));
/// assert_eq!(args.get_i32("age"), Some(-1));
/// ```
pub fn bind(handler: &HandlerDescriptor, view: &RequestView) -> Result<Arguments, BindingError> {
    let mut arguments = Arguments::with_capacity(handler.params().len());
    for spec in handler.params() {
        let value = resolve(spec, view)?;
        arguments.push(spec.name(), value);
    }
    debug!(handler = handler.name(), count = arguments.len(), "arguments bound");
    Ok(arguments)
}

fn resolve(spec: &ParameterSpec, view: &RequestView) -> Result<Value, BindingError> {
    match spec.source() {
        ParamSource::Path => {
            let raw = view.path_variables().get(spec.name()).ok_or_else(|| {
                BindingError::MissingPathVariable {
                    name: spec.name().to_owned(),
                }
            })?;
            coerce(spec.name(), spec.ty(), raw)
        }
        ParamSource::Aggregate => Ok(aggregate(view.params())),
        ParamSource::Query => match spec.ty() {
            ParamType::Record(record) => {
                let fields = record
                    .fields()
                    .iter()
                    .map(|field| Ok((field.name().to_owned(), resolve(field, view)?)))
                    .collect::<Result<Vec<_>, BindingError>>()?;
                Ok(Value::Record(Record::new(record.type_name(), fields)))
            }
            _ => resolve_scalar(spec, view.params()),
        },
    }
}

fn resolve_scalar(spec: &ParameterSpec, params: &ParamMap) -> Result<Value, BindingError> {
    let name = spec.name();
    match (params.first(name), spec.default()) {
        (Some(""), Some(default)) | (None, Some(default)) => coerce(name, spec.ty(), default),
        (Some(raw), _) => coerce(name, spec.ty(), raw),
        (None, None) if !spec.is_required() && spec.ty().can_be_absent() => Ok(Value::Absent),
        (None, None) => Err(BindingError::MissingRequired {
            name: name.to_owned(),
        }),
    }
}

/// Every parameter, single-valued names as `Single`, repeated names as `Multi`.
fn aggregate(params: &ParamMap) -> Value {
    let map = params
        .names()
        .into_iter()
        .map(|name| {
            let mut values: Vec<String> = params.all(name).map(str::to_owned).collect();
            let value = if values.len() == 1 {
                ParamValue::Single(values.remove(0))
            } else {
                ParamValue::Multi(values)
            };
            (name.to_owned(), value)
        })
        .collect::<BTreeMap<_, _>>();
    Value::Map(map)
}

/// Convert a raw string to a scalar target type.
///
/// Numbers are parsed base 10 after trimming surrounding whitespace. An empty
/// string becomes [`Value::Absent`] for nullable numerics and a type mismatch
/// for non-nullable ones.
pub(crate) fn coerce(name: &str, ty: &ParamType, raw: &str) -> Result<Value, BindingError> {
    let mismatch = || BindingError::TypeMismatch {
        name: name.to_owned(),
        expected: ty.name(),
        raw: raw.to_owned(),
    };

    let trimmed = raw.trim();
    match ty {
        ParamType::String => Ok(Value::String(raw.to_owned())),
        ParamType::Int { nullable } | ParamType::Long { nullable } | ParamType::Float { nullable }
            if trimmed.is_empty() =>
        {
            if *nullable {
                Ok(Value::Absent)
            } else {
                Err(mismatch())
            }
        }
        ParamType::Int { .. } => trimmed.parse().map(Value::Int).map_err(|_| mismatch()),
        ParamType::Long { .. } => trimmed.parse().map(Value::Long).map_err(|_| mismatch()),
        ParamType::Float { .. } => trimmed
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Value::Float)
            .ok_or_else(mismatch),
        ParamType::Map | ParamType::Record(_) => Err(mismatch()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use crate::http::view::PathVariables;

    fn view(query: &str) -> RequestView {
        ParamMap::parse(query)
            .iter()
            .fold(RequestView::new(Method::Get, "/"), |v, (k, val)| v.param(k, val))
    }

    fn hello_data() -> RecordSpec {
        RecordSpec::new("HelloData")
            .field(ParameterSpec::query("username", ParamType::String).optional())
            .field(ParameterSpec::query("age", ParamType::int()).default_value("0"))
    }

    // ── scalar parameters ─────────────────────────────────────────────────────

    #[test]
    fn binds_string_and_int() {
        let handler = HandlerDescriptor::raw_body("v2")
            .param(ParameterSpec::query("username", ParamType::String))
            .param(ParameterSpec::query("age", ParamType::int()));
        let args = bind(&handler, &view("username=kim&age=20")).unwrap();
        assert_eq!(args.get_str("username"), Some("kim"));
        assert_eq!(args.get_i32("age"), Some(20));
    }

    #[test]
    fn first_value_wins_for_scalars() {
        let handler =
            HandlerDescriptor::raw_body("h").param(ParameterSpec::query("id", ParamType::long()));
        let args = bind(&handler, &view("id=1&id=2")).unwrap();
        assert_eq!(args.get_i64("id"), Some(1));
    }

    #[test]
    fn missing_required_stops_binding() {
        // `age` would fail with a type error if it were evaluated.
        let handler = HandlerDescriptor::raw_body("required")
            .param(ParameterSpec::query("username", ParamType::String))
            .param(ParameterSpec::query("age", ParamType::int()));
        let err = bind(&handler, &view("age=abc")).unwrap_err();
        assert_eq!(
            err,
            BindingError::MissingRequired {
                name: "username".into()
            }
        );
        assert!(err.is_client_error());
    }

    #[test]
    fn empty_value_satisfies_required_and_optional_stays_absent() {
        let handler = HandlerDescriptor::raw_body("required")
            .param(ParameterSpec::query("username", ParamType::String))
            .param(ParameterSpec::query("age", ParamType::nullable_int()).optional());
        let args = bind(&handler, &view("username=")).unwrap();
        assert_eq!(args.get_str("username"), Some(""));
        assert_eq!(args.get("age"), Some(&Value::Absent));
    }

    #[test]
    fn default_replaces_missing_and_empty_values() {
        let handler = HandlerDescriptor::raw_body("default")
            .param(ParameterSpec::query("username", ParamType::String).default_value("guest"))
            .param(
                ParameterSpec::query("age", ParamType::int())
                    .optional()
                    .default_value("-1"),
            );

        let args = bind(&handler, &view("username=")).unwrap();
        assert_eq!(args.get_str("username"), Some("guest"));
        assert_eq!(args.get_i32("age"), Some(-1));

        let args = bind(&handler, &view("username=kim&age=30")).unwrap();
        assert_eq!(args.get_str("username"), Some("kim"));
        assert_eq!(args.get_i32("age"), Some(30));
    }

    #[test]
    fn non_numeric_value_is_a_type_mismatch() {
        let handler =
            HandlerDescriptor::raw_body("h").param(ParameterSpec::query("age", ParamType::int()));
        let err = bind(&handler, &view("age=twenty")).unwrap_err();
        assert_eq!(
            err,
            BindingError::TypeMismatch {
                name: "age".into(),
                expected: "int",
                raw: "twenty".into()
            }
        );
        assert_eq!(err.parameter(), "age");
    }

    #[test]
    fn optional_primitive_without_default_is_missing_when_absent() {
        let handler = HandlerDescriptor::raw_body("h")
            .param(ParameterSpec::query("age", ParamType::int()).optional());
        assert_eq!(
            bind(&handler, &view("")).unwrap_err(),
            BindingError::MissingRequired { name: "age".into() }
        );
    }

    // ── coercion ──────────────────────────────────────────────────────────────

    #[test]
    fn coerce_numbers() {
        assert_eq!(coerce("n", &ParamType::int(), " 42 "), Ok(Value::Int(42)));
        assert_eq!(coerce("n", &ParamType::long(), "-7"), Ok(Value::Long(-7)));
        assert_eq!(coerce("n", &ParamType::float(), "1.5"), Ok(Value::Float(1.5)));
        assert!(coerce("n", &ParamType::int(), "3000000000").is_err());
        assert!(coerce("n", &ParamType::long(), "0x10").is_err());
        assert!(coerce("n", &ParamType::float(), "NaN").is_err());
    }

    #[test]
    fn coerce_empty_numbers() {
        assert_eq!(coerce("n", &ParamType::nullable_int(), ""), Ok(Value::Absent));
        assert!(matches!(
            coerce("n", &ParamType::int(), ""),
            Err(BindingError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn coerce_string_is_verbatim() {
        assert_eq!(
            coerce("s", &ParamType::String, " a "),
            Ok(Value::String(" a ".into()))
        );
    }

    // ── path variables ────────────────────────────────────────────────────────

    #[test]
    fn path_variables_are_coerced() {
        let handler = HandlerDescriptor::raw_body("mappingPath")
            .param(ParameterSpec::path("userId", ParamType::String))
            .param(ParameterSpec::path("orderId", ParamType::long()));
        let mut vars = PathVariables::new();
        vars.insert("userId", "42");
        vars.insert("orderId", "7");
        let view = RequestView::new(Method::Get, "/mapping/users/42/orders/7").with_path_variables(vars);

        let args = bind(&handler, &view).unwrap();
        assert_eq!(args.get_str("userId"), Some("42"));
        assert_eq!(args.get_i64("orderId"), Some(7));
    }

    #[test]
    fn missing_path_variable_is_an_internal_fault() {
        let handler = HandlerDescriptor::raw_body("mappingPath")
            .param(ParameterSpec::path("userId", ParamType::String));
        let err = bind(&handler, &view("userId=1")).unwrap_err();
        assert_eq!(
            err,
            BindingError::MissingPathVariable {
                name: "userId".into()
            }
        );
        assert!(!err.is_client_error());
    }

    // ── maps and records ──────────────────────────────────────────────────────

    #[test]
    fn map_keeps_repeats_as_sequences() {
        let handler = HandlerDescriptor::raw_body("requestParamMap").param(ParameterSpec::map("paramMap"));
        let args = bind(&handler, &view("id=1&username=kim&id=2")).unwrap();
        let map = args.get_map("paramMap").unwrap();
        assert_eq!(
            map.get("id"),
            Some(&ParamValue::Multi(vec!["1".into(), "2".into()]))
        );
        assert_eq!(map.get("username"), Some(&ParamValue::Single("kim".into())));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn map_of_empty_request_is_empty() {
        let handler = HandlerDescriptor::raw_body("requestParamMap").param(ParameterSpec::map("paramMap"));
        let args = bind(&handler, &view("")).unwrap();
        assert!(args.get_map("paramMap").unwrap().is_empty());
    }

    #[test]
    fn record_binds_fields_by_name() {
        let handler = HandlerDescriptor::raw_body("modelAttributeV1")
            .param(ParameterSpec::record("helloData", hello_data()));
        let args = bind(&handler, &view("username=kim&age=20")).unwrap();
        let Some(Value::Record(record)) = args.get("helloData") else {
            panic!("expected a record");
        };
        assert_eq!(record.type_name(), "HelloData");
        assert_eq!(record.field("username"), Some(&Value::String("kim".into())));
        assert_eq!(record.field("age"), Some(&Value::Int(20)));
    }

    #[test]
    fn record_missing_fields_use_absent_and_defaults() {
        let handler = HandlerDescriptor::raw_body("modelAttributeV1")
            .param(ParameterSpec::record("helloData", hello_data()));
        let args = bind(&handler, &view("")).unwrap();
        let Some(Value::Record(record)) = args.get("helloData") else {
            panic!("expected a record");
        };
        assert_eq!(record.field("username"), Some(&Value::Absent));
        assert_eq!(record.field("age"), Some(&Value::Int(0)));
    }

    #[test]
    fn record_field_type_error_names_the_field() {
        let handler = HandlerDescriptor::raw_body("modelAttributeV1")
            .param(ParameterSpec::record("helloData", hello_data()));
        let err = bind(&handler, &view("age=old")).unwrap_err();
        assert_eq!(err.parameter(), "age");
    }

    #[test]
    fn binding_is_deterministic() {
        let handler = HandlerDescriptor::raw_body("h")
            .param(ParameterSpec::map("all"))
            .param(ParameterSpec::query("a", ParamType::String));
        let v = view("b=2&a=1&b=3");
        assert_eq!(bind(&handler, &v), bind(&handler, &v));
    }
}
