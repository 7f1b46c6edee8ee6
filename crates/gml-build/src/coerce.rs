//! Literal-to-value conversion keyed by property type.
//!
//! A [`Dispatcher`] maps type handles to converters. Coercing a value walks
//! the expected type's ancestry, most specific first, and runs the first
//! converter found, so a converter registered for a concrete type overrides
//! the fundamental one it derives from.

use std::collections::HashMap;
use std::rc::Rc;

use gml_syntax::Literal;

use crate::error::BuildError;
use crate::objects::Objects;
use crate::reflect::{
    EnumValue, InstanceId, PropertySpec, ReflectionProvider, TypeHandle, Value, fundamental,
};

// ── Operand ───────────────────────────────────────────────────────────────

/// What a property was given in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Literal),
    /// An object declared inline as the value, already constructed.
    Instance(InstanceId),
}

impl Operand {
    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Operand::Literal(Literal::Str(s)) => format!("string {s}"),
            Operand::Literal(Literal::Number(n)) => format!("number `{n}`"),
            Operand::Literal(Literal::Bool(b)) => format!("boolean `{b}`"),
            Operand::Literal(Literal::Ident(i)) => format!("identifier `{i}`"),
            Operand::Instance(id) => format!("inline object {id}"),
        }
    }
}

// ── Coercion ──────────────────────────────────────────────────────────────

/// Outcome of a successful conversion attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Coercion {
    Resolved(Value),
    /// The value names an object that may not exist yet; retry once every
    /// object has been constructed.
    Deferred,
}

/// Everything a converter may consult.
pub struct Coerce<'a> {
    pub spec: &'a PropertySpec,
    pub operand: &'a Operand,
    pub provider: &'a dyn ReflectionProvider,
    pub objects: &'a Objects,
    pub pending: &'a Pending,
}

impl Coerce<'_> {
    pub fn error(&self, message: impl Into<String>) -> BuildError {
        BuildError::coercion(&self.spec.name, message)
    }

    fn expected(&self, what: &str) -> BuildError {
        self.error(format!("expected {what}, found {}", self.operand.describe()))
    }
}

/// Properties still queued for the second pass, keyed by owner and
/// (possibly dotted) property name. Their current value is not the one the
/// source gives them, so references must not read it yet.
#[derive(Debug, Default)]
pub struct Pending {
    entries: HashMap<(InstanceId, String), usize>,
}

impl Pending {
    pub fn contains(&self, owner: InstanceId, name: &str) -> bool {
        self.entries.contains_key(&(owner, name.to_string()))
    }

    pub(crate) fn insert(&mut self, owner: InstanceId, name: &str) {
        *self.entries.entry((owner, name.to_string())).or_default() += 1;
    }

    pub(crate) fn remove(&mut self, owner: InstanceId, name: &str) {
        let key = (owner, name.to_string());
        if let Some(count) = self.entries.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                self.entries.remove(&key);
            }
        }
    }
}

pub type Converter = Rc<dyn Fn(&Coerce<'_>) -> Result<Coercion, BuildError>>;

// ── Dispatcher ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Dispatcher {
    converters: HashMap<TypeHandle, Converter>,
}

impl Dispatcher {
    /// A dispatcher with no converters at all.
    pub fn empty() -> Self {
        Self { converters: HashMap::new() }
    }

    /// A dispatcher with the converters for every fundamental type.
    pub fn new() -> Self {
        let mut d = Self::empty();
        d.register(TypeHandle::new(fundamental::BOOLEAN), convert_bool);
        d.register(TypeHandle::new(fundamental::INT), convert_int);
        d.register(TypeHandle::new(fundamental::UINT), convert_uint);
        d.register(TypeHandle::new(fundamental::DOUBLE), convert_double);
        d.register(TypeHandle::new(fundamental::STRING), convert_string);
        d.register(TypeHandle::new(fundamental::ENUM), convert_enum);
        d.register(TypeHandle::new(fundamental::OBJECT), convert_object);
        d.register(TypeHandle::new(fundamental::INTERFACE), convert_object);
        d
    }

    /// Register (or replace) the converter for `ty`.
    pub fn register<F>(&mut self, ty: TypeHandle, converter: F)
    where
        F: Fn(&Coerce<'_>) -> Result<Coercion, BuildError> + 'static,
    {
        self.converters.insert(ty, Rc::new(converter));
    }

    pub fn register_shared(&mut self, ty: TypeHandle, converter: Converter) {
        self.converters.insert(ty, converter);
    }

    pub fn has_converter(&self, ty: &TypeHandle) -> bool {
        self.converters.contains_key(ty)
    }

    pub fn coerce(&self, input: &Coerce<'_>) -> Result<Coercion, BuildError> {
        let expected = &input.spec.value_type;
        for ty in input.provider.supertypes(expected) {
            if let Some(converter) = self.converters.get(&ty) {
                return converter(input);
            }
        }
        Err(BuildError::UnsupportedType {
            property: input.spec.name.clone(),
            type_name: expected.name().to_string(),
        })
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

// ── References ────────────────────────────────────────────────────────────

/// Resolve `name.attr.attr...` by looking `name` up in the registry and then
/// reading each attribute through the provider.
///
/// Returns `Ok(None)` when `name` is not registered yet, or when the path
/// reads a property that is still pending: either one of its attributes, or
/// a dotted property such as `image.stock` queued on an object it passes
/// through.
pub fn resolve_reference(
    provider: &dyn ReflectionProvider,
    objects: &Objects,
    pending: &Pending,
    property: &str,
    path: &str,
) -> Result<Option<Value>, BuildError> {
    let segments: Vec<&str> = path.split('.').collect();
    let Some(root) = objects.get(segments[0]) else {
        return Ok(None);
    };

    // objects passed through, with the index of the segment read from each
    let mut visited: Vec<(InstanceId, usize)> = Vec::new();
    let mut value = Value::Object(root);
    for (i, segment) in segments.iter().enumerate().skip(1) {
        let Value::Object(id) = value else {
            return Err(BuildError::coercion(
                property,
                format!("`{path}`: cannot read `{segment}` from a non-object value"),
            ));
        };
        visited.push((id, i));
        if visited.iter().any(|(owner, start)| pending.contains(*owner, &segments[*start..=i].join("."))) {
            return Ok(None);
        }
        let ty = provider.type_of(id)?;
        provider.lookup_property_spec(&ty, segment)?;
        value = provider.get_property(id, segment)?;
    }
    Ok(Some(value))
}

// ── Default converters ────────────────────────────────────────────────────

fn convert_bool(c: &Coerce<'_>) -> Result<Coercion, BuildError> {
    match c.operand {
        Operand::Literal(Literal::Bool(b)) => Ok(Coercion::Resolved(Value::Bool(*b))),
        _ => Err(c.expected("`true` or `false`")),
    }
}

fn convert_int(c: &Coerce<'_>) -> Result<Coercion, BuildError> {
    match c.operand {
        Operand::Literal(Literal::Number(n)) => n
            .parse::<i64>()
            .map(|v| Coercion::Resolved(Value::Int(v)))
            .map_err(|_| c.expected("an integer")),
        _ => Err(c.expected("an integer")),
    }
}

fn convert_uint(c: &Coerce<'_>) -> Result<Coercion, BuildError> {
    match c.operand {
        Operand::Literal(Literal::Number(n)) => n
            .parse::<u64>()
            .map(|v| Coercion::Resolved(Value::UInt(v)))
            .map_err(|_| c.expected("an unsigned integer")),
        _ => Err(c.expected("an unsigned integer")),
    }
}

fn convert_double(c: &Coerce<'_>) -> Result<Coercion, BuildError> {
    match c.operand {
        Operand::Literal(Literal::Number(n)) => n
            .parse::<f64>()
            .map(|v| Coercion::Resolved(Value::Double(v)))
            .map_err(|_| c.expected("a number")),
        _ => Err(c.expected("a number")),
    }
}

/// Quoted literals are taken verbatim; identifiers are attribute paths into
/// other objects (`b1.label`, `b1.parent.name`). A path that cannot be read
/// yet is deferred.
fn convert_string(c: &Coerce<'_>) -> Result<Coercion, BuildError> {
    match c.operand {
        Operand::Literal(lit @ Literal::Str(_)) => {
            let text = lit.unquoted().unwrap_or_default();
            Ok(Coercion::Resolved(Value::Str(text.to_string())))
        }
        Operand::Literal(Literal::Ident(path)) => {
            match resolve_reference(c.provider, c.objects, c.pending, &c.spec.name, path)? {
                Some(Value::Str(s)) => Ok(Coercion::Resolved(Value::Str(s))),
                Some(_) => Err(c.error(format!("`{path}` does not name a string value"))),
                None => Ok(Coercion::Deferred),
            }
        }
        _ => Err(c.expected("a string or a reference")),
    }
}

/// `automatic` resolves against the property's own enum type;
/// `PolicyType.automatic` names the enum type explicitly.
fn convert_enum(c: &Coerce<'_>) -> Result<Coercion, BuildError> {
    let Operand::Literal(Literal::Ident(text)) = c.operand else {
        return Err(c.expected("an enum nick"));
    };

    let expected = &c.spec.value_type;
    let (enum_type, nick) = match text.split_once('.') {
        Some((type_name, nick)) => {
            let ty = c
                .provider
                .type_from_name(type_name)
                .map_err(|_| c.error(format!("unknown enum type `{type_name}`")))?;
            if !c.provider.is_a(&ty, expected.name()) {
                return Err(c.error(format!("`{ty}` is not a `{expected}`")));
            }
            (ty, nick)
        }
        None => (expected.clone(), text.as_str()),
    };

    let nicks = c.provider.enum_nicks(&enum_type)?;
    match nicks.into_iter().find(|(n, _)| n == nick) {
        Some((nick, value)) => Ok(Coercion::Resolved(Value::Enum(EnumValue { enum_type, nick, value }))),
        None => Err(c.error(format!("`{nick}` is not a value of `{enum_type}`"))),
    }
}

fn convert_object(c: &Coerce<'_>) -> Result<Coercion, BuildError> {
    match c.operand {
        Operand::Instance(id) => Ok(Coercion::Resolved(Value::Object(*id))),
        Operand::Literal(Literal::Ident(_)) => Ok(Coercion::Deferred),
        _ => Err(c.expected("an object or a reference to one")),
    }
}
