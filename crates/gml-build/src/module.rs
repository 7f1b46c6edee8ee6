use std::rc::Rc;

use crate::coerce::{Coerce, Coercion, Converter};
use crate::error::BuildError;
use crate::reflect::{InstanceId, Value};
use crate::signals::SignalHandlers;

/// What an `import Name` statement brings into a compilation: extra signal
/// handlers and converters for toolkit-specific value types.
///
/// ```rust,ignore
/// let colors = Module::new("Colors")
///     .with_converter("Color", parse_color)
///     .with_handler("colors_reset", |_, _| reset_palette());
/// builder.with_module(colors);
/// ```
#[derive(Clone)]
pub struct Module {
    name: String,
    handlers: SignalHandlers,
    converters: Vec<(String, Converter)>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), handlers: SignalHandlers::new(), converters: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(InstanceId, &[Value]) + 'static,
    {
        self.handlers.insert(name, handler);
        self
    }

    /// Converter for properties whose type is (or derives from) `type_name`.
    pub fn with_converter<F>(mut self, type_name: impl Into<String>, converter: F) -> Self
    where
        F: Fn(&Coerce<'_>) -> Result<Coercion, BuildError> + 'static,
    {
        self.converters.push((type_name.into(), Rc::new(converter)));
        self
    }

    pub fn handlers(&self) -> &SignalHandlers {
        &self.handlers
    }

    pub fn converters(&self) -> &[(String, Converter)] {
        &self.converters
    }
}
