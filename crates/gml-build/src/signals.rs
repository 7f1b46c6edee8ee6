use std::collections::HashMap;
use std::rc::Rc;

use crate::reflect::{InstanceId, SignalHandler, Value};

/// Handler table supplied by the application. Signal bindings in the source
/// (`clicked:: on_save`) name entries of this table.
#[derive(Clone, Default)]
pub struct SignalHandlers {
    handlers: HashMap<String, SignalHandler>,
}

impl SignalHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(InstanceId, &[Value]) + 'static,
    {
        self.insert(name, handler);
        self
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(InstanceId, &[Value]) + 'static,
    {
        self.handlers.insert(name.into(), Rc::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<&SignalHandler> {
        self.handlers.get(name)
    }

    /// Add every handler of `other` whose name is not taken yet.
    pub(crate) fn merge_missing(&mut self, other: &SignalHandlers) {
        for (name, handler) in &other.handlers {
            self.handlers.entry(name.clone()).or_insert_with(|| Rc::clone(handler));
        }
    }
}
