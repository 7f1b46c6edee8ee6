use std::fmt;

use gml_syntax::SyntaxError;

use crate::reflect::ReflectError;

/// A construction failure. The first one aborts the whole build.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    UnknownType(String),
    UnknownProperty { type_name: String, property: String },
    /// A literal that cannot be converted to the property's type, or an
    /// unknown enum nick / qualified enum type.
    Coercion { property: String, message: String },
    /// No converter is registered anywhere on the property type's ancestry.
    UnsupportedType { property: String, type_name: String },
    /// A reference still unresolved once every object exists.
    UnresolvedReference { property: String, reference: String },
    UnregisteredHandler { signal: String, handler: String },
    UnknownModule(String),
    DuplicateId(String),
    /// A child property on an object that has no structural parent.
    OrphanChildProperty { type_name: String, property: String },
    /// Any other refusal reported by the provider.
    Provider(String),
}

impl BuildError {
    pub(crate) fn coercion(property: &str, message: impl Into<String>) -> Self {
        BuildError::Coercion { property: property.to_string(), message: message.into() }
    }

    pub(crate) fn unresolved(property: &str, reference: &str) -> Self {
        BuildError::UnresolvedReference {
            property: property.to_string(),
            reference: reference.to_string(),
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::UnknownType(name) => write!(f, "unknown type `{name}`"),
            BuildError::UnknownProperty { type_name, property } => {
                write!(f, "type `{type_name}` has no property `{property}`")
            }
            BuildError::Coercion { property, message } => {
                write!(f, "invalid value for `{property}`: {message}")
            }
            BuildError::UnsupportedType { property, type_name } => {
                write!(f, "no converter for `{property}` of type `{type_name}`")
            }
            BuildError::UnresolvedReference { property, reference } => {
                write!(f, "`{property}` refers to `{reference}`, which is never declared")
            }
            BuildError::UnregisteredHandler { signal, handler } => {
                write!(f, "signal `{signal}` names unregistered handler `{handler}`")
            }
            BuildError::UnknownModule(name) => write!(f, "unknown module `{name}`"),
            BuildError::DuplicateId(id) => write!(f, "id `{id}` is declared more than once"),
            BuildError::OrphanChildProperty { type_name, property } => {
                write!(f, "child property `{property}` on `{type_name}`, which has no parent")
            }
            BuildError::Provider(msg) => write!(f, "provider error: {msg}"),
        }
    }
}

impl std::error::Error for BuildError {}

impl From<ReflectError> for BuildError {
    fn from(e: ReflectError) -> Self {
        match e {
            ReflectError::UnknownType(name) => BuildError::UnknownType(name),
            ReflectError::UnknownProperty { type_name, property } => {
                BuildError::UnknownProperty { type_name, property }
            }
            other => BuildError::Provider(other.to_string()),
        }
    }
}

/// Failure of [`compile`](crate::compile): either stage.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    Syntax(SyntaxError),
    Build(BuildError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Syntax(e) => e.fmt(f),
            CompileError::Build(e) => write!(f, "gml build error: {e}"),
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Syntax(e) => Some(e),
            CompileError::Build(e) => Some(e),
        }
    }
}

impl From<SyntaxError> for CompileError {
    fn from(e: SyntaxError) -> Self {
        CompileError::Syntax(e)
    }
}

impl From<BuildError> for CompileError {
    fn from(e: BuildError) -> Self {
        CompileError::Build(e)
    }
}
