use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, trace, warn};

use gml_syntax::ast::{CHILD_TYPE_PROPERTY, ID_PROPERTY};
use gml_syntax::{Literal, Namespace, ObjectDecl, PropertyValue};

use crate::coerce::{Coerce, Coercion, Converter, Dispatcher, Operand, Pending, resolve_reference};
use crate::error::{BuildError, CompileError};
use crate::module::Module;
use crate::objects::Objects;
use crate::reflect::{InstanceId, PropertySpec, ReflectionProvider, Value};
use crate::signals::SignalHandlers;

/// Child declaration whose properties configure the enclosing object's
/// relationship with its parent instead of creating an object:
/// `Button { packing { expand: true } }`.
pub const PACKING_BLOCK: &str = "packing";

/// Distinguishes synthesized names of different compilations.
static COMPILATIONS: AtomicU64 = AtomicU64::new(0);

// ── Worklist entries ──────────────────────────────────────────────────────

/// A property applied in the second pass, once every object exists.
#[derive(Debug)]
struct DeferredProperty {
    owner: InstanceId,
    /// Possibly dotted: `image.pixel_size`.
    name: String,
    operand: Operand,
}

impl DeferredProperty {
    fn unresolved(&self) -> BuildError {
        let reference = match &self.operand {
            Operand::Literal(lit) => lit.text().to_string(),
            other => other.describe(),
        };
        BuildError::unresolved(&self.name, &reference)
    }
}

/// Outcome of one attempt at a deferred property.
enum Step {
    Applied,
    /// It reads a property that is itself still pending.
    Waiting,
}

/// A child property waiting for its object to be attached to the parent.
#[derive(Debug)]
struct ChildProperty {
    name: String,
    operand: Operand,
}

// ── Builder ───────────────────────────────────────────────────────────────

/// One compilation: turns a [`Namespace`] into objects of a
/// [`ReflectionProvider`].
///
/// Construction runs in two passes. The first creates every object in
/// declaration order and sets what it can; properties naming objects that may
/// not exist yet, and dotted property paths, go onto a worklist. The second
/// pass applies the worklist against the complete registry, so references may
/// point forward in the source. Entries that read another pending entry wait
/// for it, which makes chains of references independent of declaration
/// order.
///
/// ```rust,ignore
/// let handlers = SignalHandlers::new().with_handler("quit", |_, _| std::process::exit(0));
/// let objects = Builder::new(&mut toolkit)
///     .with_handlers(handlers)
///     .with_module(colors)
///     .compile(include_str!("main.gml"))?;
/// let window = objects.get("main_window");
/// ```
pub struct Builder<'p> {
    provider: &'p mut dyn ReflectionProvider,
    dispatcher: Dispatcher,
    extra_converters: Vec<(String, Converter)>,
    handlers: SignalHandlers,
    modules: HashMap<String, Module>,
    objects: Objects,
    deferred: Vec<DeferredProperty>,
    pending: Pending,
    compilation: u64,
    anonymous: u64,
}

impl<'p> Builder<'p> {
    pub fn new(provider: &'p mut dyn ReflectionProvider) -> Self {
        Self {
            provider,
            dispatcher: Dispatcher::new(),
            extra_converters: Vec::new(),
            handlers: SignalHandlers::new(),
            modules: HashMap::new(),
            objects: Objects::default(),
            deferred: Vec::new(),
            pending: Pending::default(),
            compilation: COMPILATIONS.fetch_add(1, Ordering::Relaxed),
            anonymous: 0,
        }
    }

    /// Add handlers; entries already present are replaced.
    pub fn with_handlers(mut self, handlers: SignalHandlers) -> Self {
        let mut merged = handlers;
        merged.merge_missing(&self.handlers);
        self.handlers = merged;
        self
    }

    pub fn with_handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(InstanceId, &[Value]) + 'static,
    {
        self.handlers.insert(name, handler);
        self
    }

    /// Make `import <module.name()>` available to the source.
    pub fn with_module(mut self, module: Module) -> Self {
        self.modules.insert(module.name().to_string(), module);
        self
    }

    /// Converter for properties whose type is (or derives from) `type_name`,
    /// available without any import.
    pub fn with_converter<F>(mut self, type_name: impl Into<String>, converter: F) -> Self
    where
        F: Fn(&Coerce<'_>) -> Result<Coercion, BuildError> + 'static,
    {
        self.extra_converters.push((type_name.into(), Rc::new(converter)));
        self
    }

    /// Parse `src` and build it.
    pub fn compile(self, src: &str) -> Result<Objects, CompileError> {
        let ns = gml_syntax::parse(src)?;
        Ok(self.build(&ns)?)
    }

    /// Build every object of `ns`. On success the registry of named objects
    /// is returned; the instances themselves belong to the provider.
    pub fn build(mut self, ns: &Namespace) -> Result<Objects, BuildError> {
        for (type_name, converter) in std::mem::take(&mut self.extra_converters) {
            let ty = self.provider.type_from_name(&type_name)?;
            self.dispatcher.register_shared(ty, converter);
        }

        for import in &ns.imports {
            self.import(&import.module)?;
        }

        for decl in &ns.objects {
            self.construct(decl, None)?;
        }

        self.apply_deferred()?;

        debug!("compilation {} built {} objects", self.compilation, self.objects.len());
        Ok(self.objects)
    }

    // ── Imports ───────────────────────────────────────────────────────────

    fn import(&mut self, name: &str) -> Result<(), BuildError> {
        let module = self
            .modules
            .get(name)
            .cloned()
            .ok_or_else(|| BuildError::UnknownModule(name.to_string()))?;

        debug!("importing module {name}");
        self.handlers.merge_missing(module.handlers());
        for (type_name, converter) in module.converters() {
            let ty = self.provider.type_from_name(type_name)?;
            if self.dispatcher.has_converter(&ty) {
                debug!("module {name} replaces the converter for {ty}");
            }
            self.dispatcher.register_shared(ty, Rc::clone(converter));
        }
        Ok(())
    }

    // ── Pass 1 ────────────────────────────────────────────────────────────

    /// Construct `decl` and its subtree. Returns the instance and the child
    /// properties it declared, which the caller applies once it is attached.
    fn construct(
        &mut self,
        decl: &ObjectDecl,
        parent: Option<InstanceId>,
    ) -> Result<(InstanceId, Vec<ChildProperty>), BuildError> {
        let existing = match parent {
            Some(parent) if !decl.is_property_value => self.existing_slot(parent, &decl.type_name)?,
            _ => None,
        };
        let ty = match existing {
            Some(inst) => self.provider.type_of(inst)?,
            None => self.provider.type_from_name(&decl.type_name)?,
        };

        let mut resolved = Vec::new();
        let mut deferred = Vec::new();
        let mut child_props = Vec::new();

        for prop in &decl.properties {
            if prop.name == ID_PROPERTY || prop.name == CHILD_TYPE_PROPERTY {
                continue;
            }

            let operand = match &prop.value {
                PropertyValue::Literal(lit) => Operand::Literal(lit.clone()),
                PropertyValue::Object(nested) => Operand::Instance(self.construct_value(nested)?),
            };

            if let Some(name) = prop.child_property_name() {
                child_props.push(ChildProperty { name: name.to_string(), operand });
            } else if prop.is_dotted() {
                deferred.push((prop.name.clone(), operand));
            } else {
                let spec = self.provider.lookup_property_spec(&ty, &prop.name)?;
                match self.coerce(&spec, &operand)? {
                    Coercion::Resolved(value) => resolved.push((prop.name.clone(), value)),
                    Coercion::Deferred => {
                        trace!("deferring {}.{} = {}", decl.type_name, prop.name, operand.describe());
                        deferred.push((prop.name.clone(), operand));
                    }
                }
            }
        }

        for packing in decl.children.iter().filter(|c| c.type_name == PACKING_BLOCK) {
            for prop in &packing.properties {
                let name = prop.child_property_name().unwrap_or(&prop.name).to_string();
                let operand = match &prop.value {
                    PropertyValue::Literal(lit) => Operand::Literal(lit.clone()),
                    PropertyValue::Object(nested) => Operand::Instance(self.construct_value(nested)?),
                };
                child_props.push(ChildProperty { name, operand });
            }
        }

        if parent.is_none() {
            if let Some(orphan) = child_props.first() {
                return Err(BuildError::OrphanChildProperty {
                    type_name: decl.type_name.clone(),
                    property: orphan.name.clone(),
                });
            }
        }

        let inst = match existing {
            Some(inst) => {
                for (name, value) in resolved {
                    self.provider.set_property(inst, &name, value)?;
                }
                if let Some(id) = decl.id() {
                    self.objects.insert(id.to_string(), inst)?;
                }
                inst
            }
            None => {
                let inst = self.provider.instantiate(&ty, resolved)?;
                let name = match decl.id() {
                    Some(id) => id.to_string(),
                    None => self.anonymous_name(&decl.type_name),
                };
                self.objects.insert(name, inst)?;

                if let Some(parent) = parent {
                    if !decl.is_property_value {
                        self.provider.attach_child(parent, inst, decl.child_type())?;
                    }
                }
                inst
            }
        };
        debug!("constructed {} as {}", decl.type_name, inst);

        for signal in &decl.signals {
            let handler = self.handlers.get(&signal.handler).cloned().ok_or_else(|| {
                BuildError::UnregisteredHandler {
                    signal: signal.signal.clone(),
                    handler: signal.handler.clone(),
                }
            })?;
            self.provider.connect_signal(inst, &signal.signal, handler)?;
        }

        // queued before the children so that their references wait for these
        for (name, operand) in deferred {
            self.pending.insert(inst, &name);
            self.deferred.push(DeferredProperty { owner: inst, name, operand });
        }

        // Slots are configured on any object; new children need a container.
        let container = self.provider.is_container(inst);
        let mut skipped = 0;
        for child in decl.children.iter().filter(|c| c.type_name != PACKING_BLOCK) {
            if !container && self.existing_slot(inst, &child.type_name)?.is_none() {
                skipped += 1;
                continue;
            }
            let (child_inst, buffered) = self.construct(child, Some(inst))?;
            self.apply_child_properties(inst, child_inst, buffered)?;
        }
        if skipped > 0 {
            warn!("{} is not a container; skipped {skipped} child declaration(s)", decl.type_name);
        }

        Ok((inst, child_props))
    }

    /// An object declared as a property value: built without a structural
    /// parent.
    fn construct_value(&mut self, decl: &ObjectDecl) -> Result<InstanceId, BuildError> {
        let (inst, _) = self.construct(decl, None)?;
        Ok(inst)
    }

    /// The instance already held by an object-typed property of `parent`
    /// named `name`, if there is one.
    fn existing_slot(&self, parent: InstanceId, name: &str) -> Result<Option<InstanceId>, BuildError> {
        let ty = self.provider.type_of(parent)?;
        let Ok(spec) = self.provider.lookup_property_spec(&ty, name) else {
            return Ok(None);
        };
        if !self.provider.is_object_type(&spec.value_type) {
            return Ok(None);
        }
        Ok(self.provider.get_property(parent, name)?.as_object())
    }

    /// Set child properties through the parent, using the parent's specs.
    fn apply_child_properties(
        &mut self,
        parent: InstanceId,
        child: InstanceId,
        buffered: Vec<ChildProperty>,
    ) -> Result<(), BuildError> {
        if buffered.is_empty() {
            return Ok(());
        }

        let specs = self.provider.list_child_property_specs(parent)?;
        for prop in buffered {
            let Some(spec) = specs.iter().find(|s| s.name == prop.name) else {
                return Err(BuildError::UnknownProperty {
                    type_name: self.provider.type_of(parent)?.name().to_string(),
                    property: prop.name,
                });
            };
            match self.coerce(spec, &prop.operand)? {
                Coercion::Resolved(value) => {
                    self.provider.set_child_property(parent, child, &prop.name, value)?
                }
                Coercion::Deferred => {
                    return Err(BuildError::unresolved(&prop.name, &prop.operand.describe()));
                }
            }
        }
        Ok(())
    }

    fn coerce(&self, spec: &PropertySpec, operand: &Operand) -> Result<Coercion, BuildError> {
        self.dispatcher.coerce(&Coerce {
            spec,
            operand,
            provider: &*self.provider,
            objects: &self.objects,
            pending: &self.pending,
        })
    }

    /// Registry name for an object without an `id`. `#` cannot appear in a
    /// source identifier, so these never shadow a declared name.
    fn anonymous_name(&mut self, type_name: &str) -> String {
        self.anonymous += 1;
        format!("{type_name}#{}-{}", self.compilation, self.anonymous)
    }

    // ── Pass 2 ────────────────────────────────────────────────────────────

    /// Sweep the worklist until it is empty. An entry waiting on another is
    /// retried in the next sweep; a sweep that applies nothing leaves only
    /// entries that wait on each other or on nothing that will ever be set.
    fn apply_deferred(&mut self) -> Result<(), BuildError> {
        let mut queue = std::mem::take(&mut self.deferred);
        debug!("applying {} deferred properties", queue.len());

        let mut sweep = 0;
        while !queue.is_empty() {
            sweep += 1;
            let before = queue.len();
            let mut waiting = Vec::new();
            for prop in queue {
                match self.apply_deferred_property(&prop)? {
                    Step::Applied => self.pending.remove(prop.owner, &prop.name),
                    Step::Waiting => waiting.push(prop),
                }
            }
            if waiting.len() == before {
                return Err(waiting[0].unresolved());
            }
            trace!("sweep {sweep}: {} deferred properties still waiting", waiting.len());
            queue = waiting;
        }
        Ok(())
    }

    fn apply_deferred_property(&mut self, prop: &DeferredProperty) -> Result<Step, BuildError> {
        // `image.stock` waits while `image` itself is pending
        let mut prefix = prop.name.as_str();
        while let Some((head, _)) = prefix.rsplit_once('.') {
            if self.pending.contains(prop.owner, head) {
                return Ok(Step::Waiting);
            }
            prefix = head;
        }

        let (target, name) = self.navigate(prop.owner, &prop.name)?;

        let ty = self.provider.type_of(target)?;
        let spec = self.provider.lookup_property_spec(&ty, name)?;

        let value = if self.provider.is_object_type(&spec.value_type) {
            match self.resolve_object(prop)? {
                Some(value) => value,
                None => return Ok(Step::Waiting),
            }
        } else {
            match self.coerce(&spec, &prop.operand)? {
                Coercion::Resolved(value) => value,
                Coercion::Deferred => return Ok(Step::Waiting),
            }
        };

        trace!("applying deferred {} on {}", prop.name, target);
        self.provider.set_property(target, name, value)?;
        Ok(Step::Applied)
    }

    /// Follow `a.b.c` from `owner` through the object-typed properties `a`
    /// and `b`. Returns the instance holding `c`, and `c`.
    fn navigate<'n>(&self, owner: InstanceId, path: &'n str) -> Result<(InstanceId, &'n str), BuildError> {
        let Some((intermediate, last)) = path.rsplit_once('.') else {
            return Ok((owner, path));
        };

        let mut target = owner;
        for segment in intermediate.split('.') {
            let ty = self.provider.type_of(target)?;
            let spec = self.provider.lookup_property_spec(&ty, segment)?;
            if !self.provider.is_object_type(&spec.value_type) {
                return Err(BuildError::coercion(
                    path,
                    format!("`{segment}` of `{ty}` is not an object-typed property"),
                ));
            }
            target = self
                .provider
                .get_property(target, segment)?
                .as_object()
                .ok_or_else(|| BuildError::unresolved(path, segment))?;
        }
        Ok((target, last))
    }

    /// Value for an object-typed property: an inline object, or a name (or
    /// dotted path) into the registry. `None` while the path cannot be read.
    fn resolve_object(&self, prop: &DeferredProperty) -> Result<Option<Value>, BuildError> {
        match &prop.operand {
            Operand::Instance(inst) => Ok(Some(Value::Object(*inst))),
            Operand::Literal(Literal::Ident(reference)) => {
                match resolve_reference(&*self.provider, &self.objects, &self.pending, &prop.name, reference)? {
                    Some(value @ (Value::Object(_) | Value::Null)) => Ok(Some(value)),
                    Some(_) => Err(BuildError::coercion(
                        &prop.name,
                        format!("`{reference}` does not name an object"),
                    )),
                    None => Ok(None),
                }
            }
            other => Err(BuildError::coercion(
                &prop.name,
                format!("expected an object or a reference to one, found {}", other.describe()),
            )),
        }
    }
}

// ── Entry points ──────────────────────────────────────────────────────────

/// Build `ns` against `provider` with the given handler table.
pub fn build(
    ns: &Namespace,
    provider: &mut dyn ReflectionProvider,
    handlers: &SignalHandlers,
) -> Result<Objects, BuildError> {
    Builder::new(provider).with_handlers(handlers.clone()).build(ns)
}

/// Parse `src` and build it against `provider`.
pub fn compile(
    src: &str,
    provider: &mut dyn ReflectionProvider,
    handlers: &SignalHandlers,
) -> Result<Objects, CompileError> {
    let ns = gml_syntax::parse(src)?;
    Ok(build(&ns, provider, handlers)?)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::reflect::{Boxed, EnumValue, TypeHandle};
    use crate::space::ObjectSpace;
    use crate::space::testing::toolkit;

    fn ok(space: &mut ObjectSpace, src: &str) -> Objects {
        Builder::new(space).compile(src).unwrap()
    }

    fn err(space: &mut ObjectSpace, src: &str) -> BuildError {
        match Builder::new(space).compile(src).unwrap_err() {
            CompileError::Build(e) => e,
            CompileError::Syntax(e) => panic!("unexpected syntax error: {e}"),
        }
    }

    fn id(objects: &Objects, name: &str) -> InstanceId {
        objects.get(name).unwrap_or_else(|| panic!("`{name}` not registered"))
    }

    fn str_value(s: &str) -> Value {
        Value::Str(s.to_string())
    }

    // ── Registration ──────────────────────────────────────────────────────

    #[test]
    fn empty_and_comment_only_sources() {
        let mut space = toolkit();
        assert!(ok(&mut space, "").is_empty());
        assert!(ok(&mut space, "# nothing here\n\n").is_empty());
        assert!(space.is_empty());
    }

    #[test]
    fn every_declaration_is_registered() {
        let mut space = toolkit();
        let objects = ok(&mut space, "Button {}\nButton\nButton {}");
        assert_eq!(objects.len(), 3);
        for inst in objects.instances() {
            assert_eq!(space.type_name(inst), Some("Button"));
        }
        let names: Vec<&str> = objects.iter().map(|(name, _)| name).collect();
        assert!(names.iter().all(|n| n.starts_with("Button#")));
        assert_ne!(names[0], names[1]);
        assert_ne!(names[1], names[2]);
    }

    #[test]
    fn anonymous_names_differ_between_compilations() {
        let mut first = toolkit();
        let mut second = toolkit();
        let a = ok(&mut first, "Button {}");
        let b = ok(&mut second, "Button {}");
        let name_a = a.iter().next().unwrap().0.to_string();
        let name_b = b.iter().next().unwrap().0.to_string();
        assert_ne!(name_a, name_b);
    }

    #[test]
    fn ids_and_nesting() {
        let mut space = toolkit();
        let objects = ok(
            &mut space,
            r#"
            Window {
                id: main
                title: "Main"
                Box {
                    id: row
                    Button { id: ok; label: "OK" }
                    Button { id: cancel; label: "Cancel" }
                }
            }
            "#,
        );
        assert_eq!(objects.len(), 4);
        let (main, row) = (id(&objects, "main"), id(&objects, "row"));
        let (ok_btn, cancel) = (id(&objects, "ok"), id(&objects, "cancel"));

        assert_eq!(space.children(main), vec![row]);
        assert_eq!(space.children(row), vec![ok_btn, cancel]);
        assert_eq!(space.parent(cancel), Some(row));
        assert_eq!(space.property(main, "title"), Some(&str_value("Main")));
        assert_eq!(space.property(cancel, "label"), Some(&str_value("Cancel")));
        // attaching fills the child's own `parent` property
        assert_eq!(space.property(ok_btn, "parent"), Some(&Value::Object(row)));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut space = toolkit();
        assert_eq!(
            err(&mut space, "Button { id: a }\nLabel { id: a }"),
            BuildError::DuplicateId("a".into())
        );
    }

    #[test]
    fn quoted_id_is_unquoted() {
        let mut space = toolkit();
        let objects = ok(&mut space, r#"Button { id: "quoted" }"#);
        assert!(objects.contains("quoted"));
    }

    // ── Literal properties ────────────────────────────────────────────────

    #[test]
    fn numbers_and_booleans() {
        let mut space = toolkit();
        let objects = ok(
            &mut space,
            "Button { id: b; use_underline: true; width: -3 }\nWindow { id: w; opacity: 0.5 }\nBox { id: x; spacing: 6 }",
        );
        let b = id(&objects, "b");
        assert_eq!(space.property(b, "use_underline"), Some(&Value::Bool(true)));
        assert_eq!(space.property(b, "width"), Some(&Value::Int(-3)));
        assert_eq!(space.property(id(&objects, "w"), "opacity"), Some(&Value::Double(0.5)));
        assert_eq!(space.property(id(&objects, "x"), "spacing"), Some(&Value::UInt(6)));
    }

    #[test]
    fn boolean_needs_boolean_literal() {
        let mut space = toolkit();
        assert!(matches!(
            err(&mut space, "Button { use_underline: yes }"),
            BuildError::Coercion { property, .. } if property == "use_underline"
        ));
        assert!(matches!(err(&mut space, r#"Button { visible: "true" }"#), BuildError::Coercion { .. }));
    }

    #[test]
    fn integer_range_and_form() {
        let mut space = toolkit();
        assert!(matches!(err(&mut space, "Button { width: 1.5 }"), BuildError::Coercion { .. }));
        assert!(matches!(err(&mut space, "Box { spacing: -1 }"), BuildError::Coercion { .. }));
    }

    #[test]
    fn enums_bare_and_qualified() {
        let mut space = toolkit();
        let objects = ok(
            &mut space,
            "ScrolledWindow { id: a; hscrollbar_policy: automatic }\n\
             ScrolledWindow { id: b; hscrollbar_policy: PolicyType.never }\n\
             Button { id: c; relief: none }",
        );
        let policy = |nick: &str, value| {
            Value::Enum(EnumValue { enum_type: TypeHandle::new("PolicyType"), nick: nick.into(), value })
        };
        assert_eq!(space.property(id(&objects, "a"), "hscrollbar_policy"), Some(&policy("automatic", 0)));
        assert_eq!(space.property(id(&objects, "b"), "hscrollbar_policy"), Some(&policy("never", 2)));
        let Some(Value::Enum(relief)) = space.property(id(&objects, "c"), "relief") else {
            panic!("relief not set");
        };
        assert_eq!((relief.nick.as_str(), relief.value), ("none", 1));
    }

    #[test]
    fn enum_errors() {
        let mut space = toolkit();
        assert!(matches!(
            err(&mut space, "ScrolledWindow { hscrollbar_policy: sometimes }"),
            BuildError::Coercion { .. }
        ));
        assert!(matches!(
            err(&mut space, "ScrolledWindow { hscrollbar_policy: ReliefStyle.none }"),
            BuildError::Coercion { .. }
        ));
    }

    #[test]
    fn unknown_names() {
        let mut space = toolkit();
        assert_eq!(err(&mut space, "Nope {}"), BuildError::UnknownType("Nope".into()));
        assert_eq!(
            err(&mut space, r#"Button { colour: "red" }"#),
            BuildError::UnknownProperty { type_name: "Button".into(), property: "colour".into() }
        );
    }

    // ── String references ─────────────────────────────────────────────────

    #[test]
    fn string_reference_backward() {
        let mut space = toolkit();
        let objects = ok(&mut space, "Button { id: b1; label: \"Hello\" }\nLabel { id: l1; label: b1.label }");
        assert_eq!(space.property(id(&objects, "l1"), "label"), Some(&str_value("Hello")));
    }

    #[test]
    fn string_reference_forward() {
        let mut space = toolkit();
        let objects = ok(&mut space, "Label { id: l1; label: b1.label }\nButton { id: b1; label: \"Hello\" }");
        assert_eq!(space.property(id(&objects, "l1"), "label"), Some(&str_value("Hello")));
    }

    #[test]
    fn string_reference_through_parent() {
        let mut space = toolkit();
        let objects = ok(
            &mut space,
            "Box { id: row; name: \"toolbar\"; Button { id: b1 } }\nLabel { id: l; label: b1.parent.name }",
        );
        assert_eq!(space.property(id(&objects, "l"), "label"), Some(&str_value("toolbar")));
    }

    #[test]
    fn string_reference_into_nested_object() {
        let mut space = toolkit();
        let objects = ok(
            &mut space,
            "Button { id: b1; image: Image { stock: \"gtk-ok\" } }\nLabel { id: l; label: b1.image.stock }",
        );
        assert_eq!(space.property(id(&objects, "l"), "label"), Some(&str_value("gtk-ok")));
    }

    #[test]
    fn string_reference_to_missing_object() {
        let mut space = toolkit();
        assert_eq!(
            err(&mut space, "Label { label: nobody.label }"),
            BuildError::UnresolvedReference { property: "label".into(), reference: "nobody.label".into() }
        );
    }

    #[test]
    fn string_reference_to_non_string() {
        let mut space = toolkit();
        assert!(matches!(
            err(&mut space, "Button { id: b1; width: 3 }\nLabel { label: b1.width }"),
            BuildError::Coercion { .. }
        ));
    }

    #[test]
    fn chained_string_references_in_any_order() {
        let c = "Label { id: c; label: \"x\" }";
        let b = "Label { id: b; label: c.label }";
        let a = "Label { id: a; label: b.label }";
        for order in [[c, b, a], [a, b, c], [b, c, a]] {
            let mut space = toolkit();
            let objects = ok(&mut space, &order.join("\n"));
            assert_eq!(space.property(id(&objects, "a"), "label"), Some(&str_value("x")), "order {order:?}");
            assert_eq!(space.property(id(&objects, "b"), "label"), Some(&str_value("x")), "order {order:?}");
        }
    }

    #[test]
    fn string_reference_cycle_is_unresolved() {
        let mut space = toolkit();
        assert_eq!(
            err(&mut space, "Label { id: a; label: b.label }\nLabel { id: b; label: a.label }"),
            BuildError::UnresolvedReference { property: "label".into(), reference: "b.label".into() }
        );
    }

    #[test]
    fn child_reads_parent_property_set_later() {
        let mut space = toolkit();
        let objects = ok(
            &mut space,
            "Box {\n    id: row\n    name: other.label\n    Label { id: inner; label: row.name }\n}\nLabel { id: other; label: \"hi\" }",
        );
        assert_eq!(space.property(id(&objects, "row"), "name"), Some(&str_value("hi")));
        assert_eq!(space.property(id(&objects, "inner"), "label"), Some(&str_value("hi")));
    }

    #[test]
    fn string_reference_waits_for_dotted_property() {
        let mut space = toolkit();
        let objects = ok(&mut space, "Button { id: b; image.stock: \"gtk-ok\" }\nLabel { id: l; label: b.image.stock }");
        assert_eq!(space.property(id(&objects, "l"), "label"), Some(&str_value("gtk-ok")));
    }

    // ── Object references ─────────────────────────────────────────────────

    #[test]
    fn object_reference_forward() {
        let mut space = toolkit();
        let objects = ok(
            &mut space,
            "Window {\n    id: w\n    default_widget: ok\n    Button { id: ok }\n}\nLabel { id: l; mnemonic_widget: later }\nButton { id: later }",
        );
        assert_eq!(space.property(id(&objects, "w"), "default_widget"), Some(&Value::Object(id(&objects, "ok"))));
        assert_eq!(
            space.property(id(&objects, "l"), "mnemonic_widget"),
            Some(&Value::Object(id(&objects, "later")))
        );
    }

    #[test]
    fn object_reference_through_attribute() {
        let mut space = toolkit();
        let objects = ok(&mut space, "Label { id: l; mnemonic_widget: b1.image }\nButton { id: b1 }");
        let image = space.property(id(&objects, "b1"), "image").cloned().unwrap();
        assert!(matches!(image, Value::Object(_)));
        assert_eq!(space.property(id(&objects, "l"), "mnemonic_widget"), Some(&image));
    }

    #[test]
    fn dotted_property_waits_for_its_object() {
        let mut space = toolkit();
        let objects = ok(
            &mut space,
            "Label { id: l; mnemonic_widget.name: \"target\"; mnemonic_widget: later }\nButton { id: later }",
        );
        assert_eq!(space.property(id(&objects, "later"), "name"), Some(&str_value("target")));
    }

    #[test]
    fn object_reference_to_undeclared() {
        let mut space = toolkit();
        assert_eq!(
            err(&mut space, "Window { default_widget: ghost }"),
            BuildError::UnresolvedReference { property: "default_widget".into(), reference: "ghost".into() }
        );
    }

    #[test]
    fn object_reference_must_name_an_object() {
        let mut space = toolkit();
        assert!(matches!(
            err(&mut space, "Button { id: b; label: \"x\" }\nLabel { mnemonic_widget: b.label }"),
            BuildError::Coercion { .. }
        ));
        assert!(matches!(err(&mut space, "Label { mnemonic_widget: 3 }"), BuildError::Coercion { .. }));
    }

    #[test]
    fn nested_object_value_replaces_default() {
        let mut space = toolkit();
        let objects = ok(&mut space, "Button { id: b; image: Image { id: custom; stock: \"gtk-quit\" } }");
        let custom = id(&objects, "custom");
        assert_eq!(space.property(id(&objects, "b"), "image"), Some(&Value::Object(custom)));
        assert_eq!(space.property(custom, "stock"), Some(&str_value("gtk-quit")));
        // a property value is not a structural child
        assert_eq!(space.parent(custom), None);
    }

    // ── Dotted properties and slots ───────────────────────────────────────

    #[test]
    fn dotted_property_sets_nested_attribute() {
        let mut space = toolkit();
        let objects = ok(&mut space, "Button { id: b; image.pixel_size: 32 }");
        let image = space.property(id(&objects, "b"), "image").and_then(Value::as_object).unwrap();
        assert_eq!(space.property(image, "pixel_size"), Some(&Value::Int(32)));
    }

    #[test]
    fn dotted_property_through_non_object() {
        let mut space = toolkit();
        assert!(matches!(err(&mut space, "Button { label.size: 3 }"), BuildError::Coercion { .. }));
    }

    #[test]
    fn existing_slot_is_configured_in_place() {
        let mut space = toolkit();
        let objects = ok(&mut space, "Button { id: b; image { id: icon; pixel_size: 64; stock: \"gtk-ok\" } }");
        let b = id(&objects, "b");
        let icon = id(&objects, "icon");
        assert_eq!(space.property(b, "image"), Some(&Value::Object(icon)));
        assert_eq!(space.property(icon, "pixel_size"), Some(&Value::Int(64)));
        assert!(space.children(b).is_empty());
        assert_eq!(objects.len(), 2);
    }

    // ── Children ──────────────────────────────────────────────────────────

    #[test]
    fn child_properties_and_packing_blocks() {
        let mut space = toolkit();
        let objects = ok(
            &mut space,
            "Box {\n    id: row\n    Button { id: a; _expand: true; _padding: 4 }\n    Button {\n        id: b\n        packing { fill: false }\n    }\n}",
        );
        let (row, a, b) = (id(&objects, "row"), id(&objects, "a"), id(&objects, "b"));
        assert_eq!(space.child_property(row, a, "expand"), Some(&Value::Bool(true)));
        assert_eq!(space.child_property(row, a, "padding"), Some(&Value::UInt(4)));
        assert_eq!(space.child_property(row, b, "fill"), Some(&Value::Bool(false)));
        assert!(!objects.iter().any(|(name, _)| name.starts_with("packing")));
    }

    #[test]
    fn unknown_child_property() {
        let mut space = toolkit();
        assert_eq!(
            err(&mut space, "Box { Button { _bogus: 1 } }"),
            BuildError::UnknownProperty { type_name: "Box".into(), property: "bogus".into() }
        );
    }

    #[test]
    fn child_property_without_parent() {
        let mut space = toolkit();
        assert_eq!(
            err(&mut space, "Button { _expand: true }"),
            BuildError::OrphanChildProperty { type_name: "Button".into(), property: "expand".into() }
        );
    }

    #[test]
    fn child_type_hint_reaches_provider() {
        let mut space = toolkit();
        let objects = ok(&mut space, "Box { id: row; Button { id: b; child_type: center } }");
        assert_eq!(space.child_type_hint(id(&objects, "row"), id(&objects, "b")), Some("center"));
    }

    #[test]
    fn children_of_non_container_are_skipped() {
        let mut space = toolkit();
        let objects = ok(&mut space, "Button { id: b; Label { id: inner } }");
        assert!(!objects.contains("inner"));
        assert!(space.children(id(&objects, "b")).is_empty());
    }

    // ── Signals ───────────────────────────────────────────────────────────

    #[test]
    fn signal_bound_to_registered_handler() {
        let mut space = toolkit();
        let clicks = Rc::new(Cell::new(0));
        let counter = Rc::clone(&clicks);
        let objects = Builder::new(&mut space)
            .with_handler("on_click", move |_, _| counter.set(counter.get() + 1))
            .compile("Button { id: b; clicked:: on_click }")
            .unwrap();
        let b = id(&objects, "b");
        assert_eq!(space.emit(b, "clicked", &[]), 1);
        assert_eq!(space.emit(b, "destroy", &[]), 0);
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn signal_with_unregistered_handler() {
        let mut space = toolkit();
        assert_eq!(
            err(&mut space, "Button { clicked:: on_click }"),
            BuildError::UnregisteredHandler { signal: "clicked".into(), handler: "on_click".into() }
        );
    }

    #[test]
    fn unknown_signal_is_a_provider_error() {
        let mut space = toolkit();
        let result = Builder::new(&mut space).with_handler("h", |_, _| {}).compile("Button { activate:: h }");
        assert!(matches!(result, Err(CompileError::Build(BuildError::Provider(_)))));
    }

    // ── Imports and converters ────────────────────────────────────────────

    #[derive(Debug, PartialEq)]
    struct Rgb(u8, u8, u8);

    fn parse_color(c: &Coerce<'_>) -> Result<Coercion, BuildError> {
        let Operand::Literal(lit) = c.operand else {
            return Err(c.error("expected a color name"));
        };
        match lit.unquoted() {
            Some("red") => Ok(Coercion::Resolved(Value::Boxed(Boxed::new(TypeHandle::new("Color"), Rgb(255, 0, 0))))),
            _ => Err(c.error(format!("unknown color {}", lit.text()))),
        }
    }

    fn colors() -> Module {
        Module::new("Colors").with_converter("Color", parse_color).with_handler("on_reset", |_, _| {})
    }

    #[test]
    fn unknown_module() {
        let mut space = toolkit();
        assert_eq!(err(&mut space, "import Colors\nWindow {}"), BuildError::UnknownModule("Colors".into()));
    }

    #[test]
    fn imported_module_supplies_converter_and_handlers() {
        let mut space = toolkit();
        let objects = Builder::new(&mut space)
            .with_module(colors())
            .compile("import Colors\nWindow { id: w; background: \"red\"; destroy:: on_reset }")
            .unwrap();
        let Some(Value::Boxed(color)) = space.property(id(&objects, "w"), "background") else {
            panic!("background not set");
        };
        assert_eq!(color.downcast_ref::<Rgb>(), Some(&Rgb(255, 0, 0)));
    }

    #[test]
    fn module_is_inert_until_imported() {
        let mut space = toolkit();
        let result = Builder::new(&mut space).with_module(colors()).compile("Window { background: \"red\" }");
        assert_eq!(
            result.unwrap_err(),
            CompileError::Build(BuildError::UnsupportedType {
                property: "background".into(),
                type_name: "Color".into()
            })
        );
    }

    #[test]
    fn builder_converter_needs_no_import() {
        let mut space = toolkit();
        let result = Builder::new(&mut space).with_converter("Color", parse_color).compile("Window { background: \"blue\" }");
        assert!(matches!(result, Err(CompileError::Build(BuildError::Coercion { .. }))));
    }

    // ── Entry points ──────────────────────────────────────────────────────

    #[test]
    fn free_functions() {
        let mut space = toolkit();
        let handlers = SignalHandlers::new().with_handler("on_click", |_, _| {});
        let objects = compile("Button { id: b; clicked:: on_click }", &mut space, &handlers).unwrap();
        assert!(objects.contains("b"));

        let ns = gml_syntax::parse("Label { id: l }").unwrap();
        let objects = build(&ns, &mut space, &handlers).unwrap();
        assert_eq!(objects.len(), 1);
    }

    #[test]
    fn syntax_errors_pass_through() {
        let mut space = toolkit();
        let result = Builder::new(&mut space).compile("Button { label: }");
        assert!(matches!(result, Err(CompileError::Syntax(_))));
        assert!(space.is_empty());
    }
}
