//! Declared handler parameters.

use std::fmt;

use thiserror::Error;

use super::{BindingError, coerce};

/// Where a parameter's raw value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    /// A query or form parameter looked up by name. Records read each of their
    /// fields this way.
    Query,
    /// A `{name}` capture of the matched route pattern.
    Path,
    /// Every query/form parameter, collected into one map.
    Aggregate,
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "query",
            Self::Path => "path",
            Self::Aggregate => "aggregate",
        })
    }
}

/// Target type of a parameter.
///
/// Numeric types carry whether they can hold "no value"; a non-nullable
/// numeric is the equivalent of a primitive and must always end up with a
/// number (from the request or from a default).
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    String,
    Int { nullable: bool },
    Long { nullable: bool },
    Float { nullable: bool },
    Map,
    Record(RecordSpec),
}

impl ParamType {
    pub fn int() -> Self {
        Self::Int { nullable: false }
    }

    pub fn nullable_int() -> Self {
        Self::Int { nullable: true }
    }

    pub fn long() -> Self {
        Self::Long { nullable: false }
    }

    pub fn nullable_long() -> Self {
        Self::Long { nullable: true }
    }

    pub fn float() -> Self {
        Self::Float { nullable: false }
    }

    pub fn nullable_float() -> Self {
        Self::Float { nullable: true }
    }

    /// Whether an absent argument can be represented for this type.
    pub fn can_be_absent(&self) -> bool {
        match self {
            Self::String => true,
            Self::Int { nullable } | Self::Long { nullable } | Self::Float { nullable } => {
                *nullable
            }
            Self::Map | Self::Record(_) => false,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::Map | Self::Record(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int { .. } => "int",
            Self::Long { .. } => "long",
            Self::Float { .. } => "float",
            Self::Map => "map",
            Self::Record(_) => "record",
        }
    }
}

/// Field layout of a structured record (a model attribute).
///
/// Each field is an ordinary [`ParameterSpec`] bound from the query/form
/// parameters under the field's own name.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSpec {
    type_name: String,
    fields: Vec<ParameterSpec>,
}

impl RecordSpec {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, field: ParameterSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> &[ParameterSpec] {
        &self.fields
    }
}

/// One declared handler parameter.
///
/// Parameters are required by default; [`optional`](Self::optional) and
/// [`default_value`](Self::default_value) relax that.
///
/// # Examples
///
/// ```
/// use reqbind::binding::{ParamType, ParameterSpec};
///
/// let username = ParameterSpec::query("username", ParamType::String).default_value("guest");
/// let age = ParameterSpec::query("age", ParamType::nullable_int()).optional();
///
/// assert!(username.is_required());
/// assert_eq!(username.default(), Some("guest"));
/// assert!(!age.is_required());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    name: String,
    ty: ParamType,
    required: bool,
    default: Option<String>,
    source: ParamSource,
}

impl ParameterSpec {
    fn new(name: impl Into<String>, ty: ParamType, source: ParamSource) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            default: None,
            source,
        }
    }

    /// A scalar query/form parameter.
    pub fn query(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, ty, ParamSource::Query)
    }

    /// A path variable.
    pub fn path(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, ty, ParamSource::Path)
    }

    /// All query/form parameters as a map.
    pub fn map(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Map, ParamSource::Aggregate)
    }

    /// A structured record bound field by field.
    pub fn record(name: impl Into<String>, record: RecordSpec) -> Self {
        Self::new(name, ParamType::Record(record), ParamSource::Query)
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Value used when the parameter is missing or present but empty.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &ParamType {
        &self.ty
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn source(&self) -> ParamSource {
        self.source
    }

    /// Registration-time consistency check.
    ///
    /// `path_variables` are the captures declared by the route the parameter's
    /// handler is being registered on.
    ///
    /// # Errors
    ///
    /// See [`SpecError`].
    pub fn validate(&self, path_variables: &[&str]) -> Result<(), SpecError> {
        let name = || self.name.clone();

        let consistent = match (&self.ty, self.source) {
            (ParamType::Map, source) => source == ParamSource::Aggregate,
            (_, ParamSource::Aggregate) => false,
            (ParamType::Record(_), source) => source == ParamSource::Query,
            _ => true,
        };
        if !consistent {
            return Err(SpecError::SourceMismatch {
                name: name(),
                origin: self.source,
                expected: self.ty.name(),
            });
        }

        if let Some(default) = &self.default {
            if !self.ty.is_scalar() {
                return Err(SpecError::InvalidDefault {
                    name: name(),
                    expected: self.ty.name(),
                    raw: default.clone(),
                });
            }
            let converted = coerce(&self.name, &self.ty, default);
            if matches!(converted, Err(BindingError::TypeMismatch { .. })) {
                return Err(SpecError::InvalidDefault {
                    name: name(),
                    expected: self.ty.name(),
                    raw: default.clone(),
                });
            }
        }

        if self.source == ParamSource::Path && !path_variables.contains(&self.name.as_str()) {
            return Err(SpecError::UnknownPathVariable { name: name() });
        }

        if self.source == ParamSource::Query
            && self.ty.is_scalar()
            && !self.required
            && self.default.is_none()
            && !self.ty.can_be_absent()
        {
            return Err(SpecError::OptionalPrimitive {
                name: name(),
                expected: self.ty.name(),
            });
        }

        if let ParamType::Record(record) = &self.ty {
            for field in record.fields() {
                if field.source != ParamSource::Query || field.ty == ParamType::Map {
                    return Err(SpecError::UnsupportedField {
                        record: record.type_name.clone(),
                        field: field.name.clone(),
                    });
                }
                field.validate(path_variables)?;
            }
        }

        Ok(())
    }
}

/// A parameter declaration that can never bind correctly.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error(
        "parameter '{name}' is optional but its {expected} type cannot be absent; \
         make it nullable or give it a default value"
    )]
    OptionalPrimitive { name: String, expected: &'static str },

    #[error("parameter '{name}' reads a path variable the route pattern does not declare")]
    UnknownPathVariable { name: String },

    #[error("default value '{raw}' of parameter '{name}' is not a valid {expected}")]
    InvalidDefault {
        name: String,
        expected: &'static str,
        raw: String,
    },

    #[error("parameter '{name}' of type {expected} cannot be read from the {origin} source")]
    SourceMismatch {
        name: String,
        origin: ParamSource,
        expected: &'static str,
    },

    #[error("field '{field}' of record {record} must be a query parameter")]
    UnsupportedField { record: String, field: String },
}
