//! An in-memory [`ReflectionProvider`].
//!
//! `ObjectSpace` keeps a declarative type registry and a flat arena of
//! objects. It is small enough to read as documentation of the provider
//! contract and complete enough to drive the engine in tests and tools:
//! single inheritance, enums, containers with child properties, sub-objects
//! created with their owner, value type checking and signal emission.

use std::collections::HashMap;

use crate::reflect::{
    InstanceId, PropertySpec, ReflectError, ReflectionProvider, SignalHandler, TypeHandle, Value,
    fundamental,
};

// ── TypeInfo ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum TypeKind {
    /// Value type without instances (`bool`, `string`, a boxed `Color`, ...).
    Value,
    Enum(Vec<(String, i64)>),
    Object { container: bool },
}

/// Declaration of one type.
///
/// ```rust
/// use gml_build::space::TypeInfo;
///
/// let button = TypeInfo::object("Button")
///     .extends("Widget")
///     .property("label", "string")
///     .signal("clicked");
/// ```
#[derive(Debug, Clone)]
pub struct TypeInfo {
    name: String,
    parent: Option<String>,
    kind: TypeKind,
    properties: Vec<PropertySpec>,
    child_properties: Vec<PropertySpec>,
    signals: Vec<String>,
    /// Object-typed properties filled with a fresh instance on creation.
    owned: Vec<(String, String)>,
}

impl TypeInfo {
    fn with_kind(name: &str, parent: Option<&str>, kind: TypeKind) -> Self {
        Self {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            kind,
            properties: Vec::new(),
            child_properties: Vec::new(),
            signals: Vec::new(),
            owned: Vec::new(),
        }
    }

    /// An instantiable class deriving from `object`.
    pub fn object(name: &str) -> Self {
        Self::with_kind(name, Some(fundamental::OBJECT), TypeKind::Object { container: false })
    }

    /// An interface type; properties of this type hold objects.
    pub fn interface(name: &str) -> Self {
        Self::with_kind(name, Some(fundamental::INTERFACE), TypeKind::Value)
    }

    pub fn enumeration(name: &str, values: &[(&str, i64)]) -> Self {
        let values = values.iter().map(|(nick, v)| (nick.to_string(), *v)).collect();
        Self::with_kind(name, Some(fundamental::ENUM), TypeKind::Enum(values))
    }

    /// A value type with no fundamental ancestor; needs its own converter.
    pub fn boxed(name: &str) -> Self {
        Self::with_kind(name, None, TypeKind::Value)
    }

    pub fn extends(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    /// Accept structural children.
    pub fn container(mut self) -> Self {
        self.kind = TypeKind::Object { container: true };
        self
    }

    pub fn property(mut self, name: &str, value_type: &str) -> Self {
        self.properties.push(PropertySpec::new(name, TypeHandle::new(value_type)));
        self
    }

    /// A property this type offers for each of its children.
    pub fn child_property(mut self, name: &str, value_type: &str) -> Self {
        self.child_properties.push(PropertySpec::child(name, TypeHandle::new(value_type)));
        self
    }

    pub fn signal(mut self, name: &str) -> Self {
        self.signals.push(name.to_string());
        self
    }

    /// Create an instance of `type_name` into `property` whenever an object
    /// of this type is created.
    pub fn owns(mut self, property: &str, type_name: &str) -> Self {
        self.owned.push((property.to_string(), type_name.to_string()));
        self
    }
}

// ── Objects ───────────────────────────────────────────────────────────────

struct Object {
    type_name: String,
    properties: HashMap<String, Value>,
    parent: Option<InstanceId>,
    children: Vec<(InstanceId, Option<String>)>,
    /// Child properties this object holds for its children.
    child_values: HashMap<(InstanceId, String), Value>,
    handlers: Vec<(String, SignalHandler)>,
}

// ── ObjectSpace ───────────────────────────────────────────────────────────

pub struct ObjectSpace {
    types: HashMap<String, TypeInfo>,
    objects: Vec<Object>,
}

impl ObjectSpace {
    /// A space knowing only the fundamental types.
    pub fn new() -> Self {
        let mut space = Self { types: HashMap::new(), objects: Vec::new() };
        for name in [
            fundamental::BOOLEAN,
            fundamental::INT,
            fundamental::UINT,
            fundamental::DOUBLE,
            fundamental::STRING,
            fundamental::ENUM,
            fundamental::INTERFACE,
        ] {
            space.register(TypeInfo::with_kind(name, None, TypeKind::Value));
        }
        space.register(TypeInfo::with_kind(fundamental::OBJECT, None, TypeKind::Object { container: false }));
        space
    }

    pub fn register(&mut self, info: TypeInfo) -> &mut Self {
        self.types.insert(info.name.clone(), info);
        self
    }

    pub fn with_type(mut self, info: TypeInfo) -> Self {
        self.register(info);
        self
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn type_name(&self, id: InstanceId) -> Option<&str> {
        self.objects.get(id.0 as usize).map(|o| o.type_name.as_str())
    }

    /// A property that has been set, directly or as an owned sub-object.
    pub fn property(&self, id: InstanceId, name: &str) -> Option<&Value> {
        self.objects.get(id.0 as usize)?.properties.get(name)
    }

    pub fn parent(&self, id: InstanceId) -> Option<InstanceId> {
        self.objects.get(id.0 as usize)?.parent
    }

    pub fn children(&self, id: InstanceId) -> Vec<InstanceId> {
        self.objects
            .get(id.0 as usize)
            .map(|o| o.children.iter().map(|(c, _)| *c).collect())
            .unwrap_or_default()
    }

    /// The hint `child` was attached with.
    pub fn child_type_hint(&self, parent: InstanceId, child: InstanceId) -> Option<&str> {
        self.objects
            .get(parent.0 as usize)?
            .children
            .iter()
            .find(|(c, _)| *c == child)?
            .1
            .as_deref()
    }

    pub fn child_property(&self, parent: InstanceId, child: InstanceId, name: &str) -> Option<&Value> {
        self.objects.get(parent.0 as usize)?.child_values.get(&(child, name.to_string()))
    }

    /// Invoke every handler connected to `signal` on `id`. Returns how many
    /// ran.
    pub fn emit(&self, id: InstanceId, signal: &str, args: &[Value]) -> usize {
        let Some(obj) = self.objects.get(id.0 as usize) else {
            return 0;
        };
        let mut count = 0;
        for (name, handler) in &obj.handlers {
            if name == signal {
                handler(id, args);
                count += 1;
            }
        }
        count
    }

    // ── internal ──────────────────────────────────────────────────────────

    fn info(&self, name: &str) -> Result<&TypeInfo, ReflectError> {
        self.types.get(name).ok_or_else(|| ReflectError::UnknownType(name.to_string()))
    }

    /// `name` and its ancestors, most specific first.
    fn chain(&self, name: &str) -> Vec<&TypeInfo> {
        let mut out = Vec::new();
        let mut next = self.types.get(name);
        while let Some(info) = next {
            // guards against a cyclic `extends`
            if out.iter().any(|seen: &&TypeInfo| seen.name == info.name) {
                break;
            }
            out.push(info);
            next = info.parent.as_deref().and_then(|p| self.types.get(p));
        }
        out
    }

    fn is_a_name(&self, ty: &str, ancestor: &str) -> bool {
        self.chain(ty).iter().any(|t| t.name == ancestor)
    }

    fn object(&self, id: InstanceId) -> Result<&Object, ReflectError> {
        self.objects
            .get(id.0 as usize)
            .ok_or_else(|| ReflectError::Rejected(format!("no such instance {id}")))
    }

    fn object_mut(&mut self, id: InstanceId) -> Result<&mut Object, ReflectError> {
        self.objects
            .get_mut(id.0 as usize)
            .ok_or_else(|| ReflectError::Rejected(format!("no such instance {id}")))
    }

    fn find_spec<'a>(
        chain: &[&'a TypeInfo],
        name: &str,
        pick: fn(&TypeInfo) -> &[PropertySpec],
    ) -> Option<&'a PropertySpec> {
        chain.iter().find_map(|t| pick(*t).iter().find(|p| p.name == name))
    }

    /// Whether `value` may be stored in a property of type `ty`.
    fn accepts(&self, ty: &TypeHandle, value: &Value) -> bool {
        let ty = ty.name();
        match value {
            Value::Null => self.is_a_name(ty, fundamental::OBJECT) || self.is_a_name(ty, fundamental::INTERFACE),
            Value::Bool(_) => self.is_a_name(ty, fundamental::BOOLEAN),
            Value::Int(_) => self.is_a_name(ty, fundamental::INT),
            Value::UInt(_) => self.is_a_name(ty, fundamental::UINT),
            Value::Double(_) => self.is_a_name(ty, fundamental::DOUBLE),
            Value::Str(_) => self.is_a_name(ty, fundamental::STRING),
            Value::Enum(e) => self.is_a_name(e.enum_type.name(), ty),
            Value::Boxed(b) => self.is_a_name(b.type_handle.name(), ty),
            Value::Object(id) => match self.type_name(*id) {
                Some(actual) => {
                    self.is_a_name(actual, ty)
                        // interfaces are not tracked per class
                        || self.is_a_name(ty, fundamental::INTERFACE)
                }
                None => false,
            },
        }
    }

    fn create(&mut self, type_name: &str) -> Result<InstanceId, ReflectError> {
        let chain = self.chain(type_name);
        if chain.is_empty() {
            return Err(ReflectError::UnknownType(type_name.to_string()));
        }
        if !matches!(chain[0].kind, TypeKind::Object { .. }) || type_name == fundamental::OBJECT {
            return Err(ReflectError::Rejected(format!("`{type_name}` cannot be instantiated")));
        }
        let owned: Vec<(String, String)> = chain.iter().flat_map(|t| t.owned.iter().cloned()).collect();

        let id = next_instance_id(self.objects.len())?;
        self.objects.push(Object {
            type_name: type_name.to_string(),
            properties: HashMap::new(),
            parent: None,
            children: Vec::new(),
            child_values: HashMap::new(),
            handlers: Vec::new(),
        });

        for (property, sub_type) in owned {
            let sub = self.create(&sub_type)?;
            self.object_mut(id)?.properties.insert(property, Value::Object(sub));
        }
        Ok(id)
    }
}

/// Handle for the object stored at index `len`.
fn next_instance_id(len: usize) -> Result<InstanceId, ReflectError> {
    u32::try_from(len)
        .map(InstanceId)
        .map_err(|_| ReflectError::Rejected(format!("object space is full ({len} objects)")))
}

impl Default for ObjectSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl ReflectionProvider for ObjectSpace {
    fn type_from_name(&self, name: &str) -> Result<TypeHandle, ReflectError> {
        self.info(name).map(|t| TypeHandle::new(&t.name))
    }

    fn type_of(&self, instance: InstanceId) -> Result<TypeHandle, ReflectError> {
        Ok(TypeHandle::new(&self.object(instance)?.type_name))
    }

    fn lookup_property_spec(&self, ty: &TypeHandle, name: &str) -> Result<PropertySpec, ReflectError> {
        let chain = self.chain(ty.name());
        Self::find_spec(&chain, name, |t| t.properties.as_slice())
            .cloned()
            .ok_or_else(|| ReflectError::UnknownProperty {
                type_name: ty.name().to_string(),
                property: name.to_string(),
            })
    }

    fn instantiate(
        &mut self,
        ty: &TypeHandle,
        properties: Vec<(String, Value)>,
    ) -> Result<InstanceId, ReflectError> {
        let id = self.create(ty.name())?;
        for (name, value) in properties {
            self.set_property(id, &name, value)?;
        }
        Ok(id)
    }

    fn set_property(&mut self, instance: InstanceId, name: &str, value: Value) -> Result<(), ReflectError> {
        let ty = self.type_of(instance)?;
        let spec = self.lookup_property_spec(&ty, name)?;
        if !self.accepts(&spec.value_type, &value) {
            return Err(ReflectError::Rejected(format!(
                "`{ty}.{name}` of type `{}` cannot hold {value:?}",
                spec.value_type
            )));
        }
        self.object_mut(instance)?.properties.insert(name.to_string(), value);
        Ok(())
    }

    fn get_property(&self, instance: InstanceId, name: &str) -> Result<Value, ReflectError> {
        let ty = self.type_of(instance)?;
        self.lookup_property_spec(&ty, name)?;
        Ok(self.object(instance)?.properties.get(name).cloned().unwrap_or(Value::Null))
    }

    fn supertypes(&self, ty: &TypeHandle) -> Vec<TypeHandle> {
        self.chain(ty.name()).iter().map(|t| TypeHandle::new(&t.name)).collect()
    }

    fn enum_nicks(&self, enum_type: &TypeHandle) -> Result<Vec<(String, i64)>, ReflectError> {
        match &self.info(enum_type.name())?.kind {
            TypeKind::Enum(values) => Ok(values.clone()),
            _ => Err(ReflectError::Rejected(format!("`{enum_type}` is not an enum"))),
        }
    }

    fn attach_child(
        &mut self,
        parent: InstanceId,
        child: InstanceId,
        child_type_hint: Option<&str>,
    ) -> Result<(), ReflectError> {
        if !self.is_container(parent) {
            return Err(ReflectError::Rejected(format!("{parent} is not a container")));
        }
        if let Some(previous) = self.object(child)?.parent {
            return Err(ReflectError::Rejected(format!("{child} already has parent {previous}")));
        }

        self.object_mut(parent)?.children.push((child, child_type_hint.map(str::to_string)));
        self.object_mut(child)?.parent = Some(parent);

        let child_ty = self.type_of(child)?;
        if self.lookup_property_spec(&child_ty, "parent").is_ok() {
            self.set_property(child, "parent", Value::Object(parent))?;
        }
        Ok(())
    }

    fn list_child_property_specs(&self, parent: InstanceId) -> Result<Vec<PropertySpec>, ReflectError> {
        let ty = self.type_of(parent)?;
        Ok(self.chain(ty.name()).iter().flat_map(|t| t.child_properties.iter().cloned()).collect())
    }

    fn set_child_property(
        &mut self,
        parent: InstanceId,
        child: InstanceId,
        name: &str,
        value: Value,
    ) -> Result<(), ReflectError> {
        if !self.object(parent)?.children.iter().any(|(c, _)| *c == child) {
            return Err(ReflectError::Rejected(format!("{child} is not a child of {parent}")));
        }
        let specs = self.list_child_property_specs(parent)?;
        let Some(spec) = specs.iter().find(|s| s.name == name) else {
            return Err(ReflectError::UnknownProperty {
                type_name: self.type_of(parent)?.name().to_string(),
                property: name.to_string(),
            });
        };
        if !self.accepts(&spec.value_type, &value) {
            return Err(ReflectError::Rejected(format!(
                "child property `{name}` of type `{}` cannot hold {value:?}",
                spec.value_type
            )));
        }
        self.object_mut(parent)?.child_values.insert((child, name.to_string()), value);
        Ok(())
    }

    fn connect_signal(
        &mut self,
        instance: InstanceId,
        signal: &str,
        handler: SignalHandler,
    ) -> Result<(), ReflectError> {
        let ty = self.type_of(instance)?;
        if !self.chain(ty.name()).iter().any(|t| t.signals.iter().any(|s| s == signal)) {
            return Err(ReflectError::UnknownSignal {
                type_name: ty.name().to_string(),
                signal: signal.to_string(),
            });
        }
        self.object_mut(instance)?.handlers.push((signal.to_string(), handler));
        Ok(())
    }

    fn is_container(&self, instance: InstanceId) -> bool {
        let Some(type_name) = self.type_name(instance) else {
            return false;
        };
        self.chain(type_name)
            .iter()
            .any(|t| matches!(t.kind, TypeKind::Object { container: true }))
    }
}

/// A small widget toolkit used throughout the crate's tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub fn toolkit() -> ObjectSpace {
        ObjectSpace::new()
            .with_type(TypeInfo::enumeration("PolicyType", &[("automatic", 0), ("always", 1), ("never", 2)]))
            .with_type(TypeInfo::enumeration("ReliefStyle", &[("normal", 0), ("none", 1)]))
            .with_type(TypeInfo::boxed("Color"))
            .with_type(
                TypeInfo::object("Widget")
                    .property("name", "string")
                    .property("parent", "Widget")
                    .property("visible", "bool")
                    .property("width", "int")
                    .signal("destroy"),
            )
            .with_type(
                TypeInfo::object("Image")
                    .extends("Widget")
                    .property("stock", "string")
                    .property("pixel_size", "int"),
            )
            .with_type(
                TypeInfo::object("Button")
                    .extends("Widget")
                    .property("label", "string")
                    .property("use_underline", "bool")
                    .property("relief", "ReliefStyle")
                    .property("image", "Image")
                    .owns("image", "Image")
                    .signal("clicked"),
            )
            .with_type(
                TypeInfo::object("Label")
                    .extends("Widget")
                    .property("label", "string")
                    .property("mnemonic_widget", "Widget"),
            )
            .with_type(
                TypeInfo::object("Box")
                    .extends("Widget")
                    .container()
                    .property("spacing", "uint")
                    .child_property("expand", "bool")
                    .child_property("fill", "bool")
                    .child_property("padding", "uint"),
            )
            .with_type(
                TypeInfo::object("Window")
                    .extends("Widget")
                    .container()
                    .property("title", "string")
                    .property("default_widget", "Widget")
                    .property("opacity", "double")
                    .property("background", "Color"),
            )
            .with_type(
                TypeInfo::object("ScrolledWindow")
                    .extends("Widget")
                    .container()
                    .property("hscrollbar_policy", "PolicyType"),
            )
            .with_type(TypeInfo::object("Action").property("label", "string").signal("activate"))
    }
}
