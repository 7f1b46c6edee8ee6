// ── Literal ───────────────────────────────────────────────────────────────

/// A scalar property value as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Quoted string, still carrying its surrounding quotes: `"hello"`.
    Str(String),
    /// Numeric literal text: `32`, `-5`, `0.75`.
    Number(String),
    /// `true` or `false`.
    Bool(bool),
    /// Bare or dotted name: `automatic`, `b1.label`, `PolicyType.never`.
    Ident(String),
}

impl Literal {
    pub fn kind(&self) -> ValueKind {
        match self {
            Literal::Str(_) => ValueKind::String,
            Literal::Number(_) => ValueKind::Number,
            Literal::Bool(_) => ValueKind::Boolean,
            Literal::Ident(_) => ValueKind::Identifier,
        }
    }

    /// The literal as it appears in source.
    pub fn text(&self) -> &str {
        match self {
            Literal::Str(s) | Literal::Number(s) | Literal::Ident(s) => s,
            Literal::Bool(true) => "true",
            Literal::Bool(false) => "false",
        }
    }

    /// String content with the quotes removed. `None` for non-strings.
    pub fn unquoted(&self) -> Option<&str> {
        match self {
            Literal::Str(s) if s.len() >= 2 => Some(&s[1..s.len() - 1]),
            _ => None,
        }
    }
}

/// Classification of a property value, decided at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Identifier,
    Object,
}

// ── PropertyDecl ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Literal(Literal),
    /// `image: Image { stock: "edit" }`
    Object(Box<ObjectDecl>),
}

/// `name: value`, where `name` may be dotted (`image.pixel_size`) or carry
/// the child-property marker (`_expand`).
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub name: String,
    pub value: PropertyValue,
}

impl PropertyDecl {
    pub fn kind(&self) -> ValueKind {
        match &self.value {
            PropertyValue::Literal(lit) => lit.kind(),
            PropertyValue::Object(_) => ValueKind::Object,
        }
    }

    pub fn is_dotted(&self) -> bool {
        self.name.contains('.')
    }

    /// The property name without the child-property marker, if it has one.
    pub fn child_property_name(&self) -> Option<&str> {
        self.name.strip_prefix(CHILD_PROPERTY_MARKER)
    }
}

/// Prefix marking a property that configures the parent/child relationship.
pub const CHILD_PROPERTY_MARKER: char = '_';

// ── SignalDecl ────────────────────────────────────────────────────────────

/// `clicked:: on_clicked`
#[derive(Debug, Clone, PartialEq)]
pub struct SignalDecl {
    pub signal: String,
    pub handler: String,
}

// ── ObjectDecl ────────────────────────────────────────────────────────────

/// A typed object declaration.
///
/// ```gml
/// Window {
///     id: main
///     title: "Hello"
///     destroy:: quit
///     Button { label: "OK" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDecl {
    /// Type name, or the name of an object-typed property of the parent when
    /// the declaration configures an existing sub-object.
    pub type_name: String,
    /// Properties in source order, reserved names included.
    pub properties: Vec<PropertyDecl>,
    pub signals: Vec<SignalDecl>,
    pub children: Vec<ObjectDecl>,
    /// Set when the declaration is the value of a property rather than a
    /// structural child.
    pub is_property_value: bool,
}

impl ObjectDecl {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: Vec::new(),
            signals: Vec::new(),
            children: Vec::new(),
            is_property_value: false,
        }
    }

    /// Look up a property by name. The last declaration wins.
    pub fn property(&self, name: &str) -> Option<&PropertyDecl> {
        self.properties.iter().rev().find(|p| p.name == name)
    }

    /// The explicit `id`, if any. Quoted ids have their quotes stripped.
    pub fn id(&self) -> Option<&str> {
        self.reserved_text(ID_PROPERTY)
    }

    /// The `child_type` hint passed along when attaching to the parent.
    pub fn child_type(&self) -> Option<&str> {
        self.reserved_text(CHILD_TYPE_PROPERTY)
    }

    fn reserved_text(&self, name: &str) -> Option<&str> {
        match &self.property(name)?.value {
            PropertyValue::Literal(lit @ Literal::Str(_)) => lit.unquoted(),
            PropertyValue::Literal(lit) => Some(lit.text()),
            PropertyValue::Object(_) => None,
        }
    }
}

/// Reserved property naming the object in the registry.
pub const ID_PROPERTY: &str = "id";
/// Reserved property carrying the attach hint for the parent.
pub const CHILD_TYPE_PROPERTY: &str = "child_type";

// ── Namespace ─────────────────────────────────────────────────────────────

/// `import Toolkit`
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module: String,
}

/// A parsed source file: imports and top-level objects in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Namespace {
    pub imports: Vec<Import>,
    pub objects: Vec<ObjectDecl>,
}
