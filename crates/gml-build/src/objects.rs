use std::collections::HashMap;

use crate::error::BuildError;
use crate::reflect::InstanceId;

/// Name registry of one compilation: every constructed object under its
/// `id`, or under a synthesized name when it has none.
#[derive(Debug, Clone, Default)]
pub struct Objects {
    by_name: HashMap<String, InstanceId>,
    order: Vec<(String, InstanceId)>,
}

impl Objects {
    pub fn get(&self, name: &str) -> Option<InstanceId> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `(name, instance)` pairs in construction order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, InstanceId)> + '_ {
        self.order.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn instances(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.order.iter().map(|(_, id)| *id)
    }

    pub(crate) fn insert(&mut self, name: String, id: InstanceId) -> Result<(), BuildError> {
        if self.by_name.contains_key(&name) {
            return Err(BuildError::DuplicateId(name));
        }
        self.by_name.insert(name.clone(), id);
        self.order.push((name, id));
        Ok(())
    }
}
