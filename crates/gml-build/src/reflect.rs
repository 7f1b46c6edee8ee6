//! The capability interface the construction engine drives.
//!
//! The engine never creates objects itself. It asks a [`ReflectionProvider`]
//! for type metadata, new instances, property access and structural wiring.
//! Instances live in the provider's object space and are referred to by
//! [`InstanceId`] handles.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

// ── Handles ───────────────────────────────────────────────────────────────

/// Identity of a type known to the provider. Two handles are the same type
/// iff their names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeHandle(Rc<str>);

impl TypeHandle {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Rc::from(name.as_ref()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Names of the fundamental types every provider roots its hierarchy in.
/// The default converters are registered under these.
pub mod fundamental {
    pub const BOOLEAN: &str = "bool";
    pub const INT: &str = "int";
    pub const UINT: &str = "uint";
    pub const DOUBLE: &str = "double";
    pub const STRING: &str = "string";
    pub const ENUM: &str = "enum";
    pub const OBJECT: &str = "object";
    pub const INTERFACE: &str = "interface";
}

/// Handle to an instance owned by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u32);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance#{}", self.0)
    }
}

// ── Values ────────────────────────────────────────────────────────────────

/// One member of an enumerated type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub enum_type: TypeHandle,
    pub nick: String,
    pub value: i64,
}

/// A value of a provider-specific type produced by a custom converter
/// (a color, a font description, ...).
#[derive(Clone)]
pub struct Boxed {
    pub type_handle: TypeHandle,
    pub data: Rc<dyn Any>,
}

impl Boxed {
    pub fn new<T: Any>(type_handle: TypeHandle, data: T) -> Self {
        Self { type_handle, data: Rc::new(data) }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref()
    }
}

impl fmt::Debug for Boxed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Boxed({})", self.type_handle)
    }
}

impl PartialEq for Boxed {
    fn eq(&self, other: &Self) -> bool {
        self.type_handle == other.type_handle && Rc::ptr_eq(&self.data, &other.data)
    }
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An object-typed property that holds nothing.
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    Str(String),
    Enum(EnumValue),
    Object(InstanceId),
    Boxed(Boxed),
}

impl Value {
    pub fn as_object(&self) -> Option<InstanceId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }
}

// ── Property metadata ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    pub name: String,
    pub value_type: TypeHandle,
    /// True for specs describing a parent/child relationship.
    pub is_child_property: bool,
}

impl PropertySpec {
    pub fn new(name: impl Into<String>, value_type: TypeHandle) -> Self {
        Self { name: name.into(), value_type, is_child_property: false }
    }

    pub fn child(name: impl Into<String>, value_type: TypeHandle) -> Self {
        Self { name: name.into(), value_type, is_child_property: true }
    }
}

// ── Signals ───────────────────────────────────────────────────────────────

/// Callback connected to a signal. Receives the emitting instance and the
/// signal arguments.
pub type SignalHandler = Rc<dyn Fn(InstanceId, &[Value])>;

// ── Errors ────────────────────────────────────────────────────────────────

/// Failure reported by a provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ReflectError {
    UnknownType(String),
    UnknownProperty { type_name: String, property: String },
    UnknownSignal { type_name: String, signal: String },
    /// The provider refused the operation (wrong value type, abstract type, ...).
    Rejected(String),
}

impl fmt::Display for ReflectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReflectError::UnknownType(name) => write!(f, "unknown type `{name}`"),
            ReflectError::UnknownProperty { type_name, property } => {
                write!(f, "type `{type_name}` has no property `{property}`")
            }
            ReflectError::UnknownSignal { type_name, signal } => {
                write!(f, "type `{type_name}` has no signal `{signal}`")
            }
            ReflectError::Rejected(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ReflectError {}

// ── ReflectionProvider ────────────────────────────────────────────────────

/// The object system being targeted.
///
/// All calls are synchronous. Failures are explicit [`ReflectError`] values;
/// a provider must not panic on unknown names.
pub trait ReflectionProvider {
    fn type_from_name(&self, name: &str) -> Result<TypeHandle, ReflectError>;

    /// Runtime type of an instance.
    fn type_of(&self, instance: InstanceId) -> Result<TypeHandle, ReflectError>;

    fn lookup_property_spec(&self, ty: &TypeHandle, name: &str) -> Result<PropertySpec, ReflectError>;

    /// Create an instance with its construct-time properties applied in order.
    fn instantiate(
        &mut self,
        ty: &TypeHandle,
        properties: Vec<(String, Value)>,
    ) -> Result<InstanceId, ReflectError>;

    fn set_property(&mut self, instance: InstanceId, name: &str, value: Value) -> Result<(), ReflectError>;

    fn get_property(&self, instance: InstanceId, name: &str) -> Result<Value, ReflectError>;

    /// The type followed by its ancestors, most specific first.
    fn supertypes(&self, ty: &TypeHandle) -> Vec<TypeHandle>;

    /// `(nick, value)` pairs of an enumerated type.
    fn enum_nicks(&self, enum_type: &TypeHandle) -> Result<Vec<(String, i64)>, ReflectError>;

    fn attach_child(
        &mut self,
        parent: InstanceId,
        child: InstanceId,
        child_type_hint: Option<&str>,
    ) -> Result<(), ReflectError>;

    /// Child-property specs the parent offers for its children.
    fn list_child_property_specs(&self, parent: InstanceId) -> Result<Vec<PropertySpec>, ReflectError>;

    fn set_child_property(
        &mut self,
        parent: InstanceId,
        child: InstanceId,
        name: &str,
        value: Value,
    ) -> Result<(), ReflectError>;

    fn connect_signal(
        &mut self,
        instance: InstanceId,
        signal: &str,
        handler: SignalHandler,
    ) -> Result<(), ReflectError>;

    /// Whether structural children may be attached to the instance.
    fn is_container(&self, instance: InstanceId) -> bool;

    /// Whether `ty` is `ancestor` or derives from it.
    fn is_a(&self, ty: &TypeHandle, ancestor: &str) -> bool {
        self.supertypes(ty).iter().any(|t| t.name() == ancestor)
    }

    /// Whether values of `ty` are object references.
    fn is_object_type(&self, ty: &TypeHandle) -> bool {
        self.supertypes(ty)
            .iter()
            .any(|t| t.name() == fundamental::OBJECT || t.name() == fundamental::INTERFACE)
    }
}
