//! Modules: ordered collections of type descriptors.

use std::collections::HashMap;
use std::sync::Arc;

use crate::type_info::TypeInfo;

/// A frozen module: descriptors in insertion order with O(1) lookup by
/// unqualified name.
#[derive(Debug, Default, Clone)]
pub struct ModuleInfo {
    types: Vec<Arc<TypeInfo>>,
    index: HashMap<String, usize>,
}

impl ModuleInfo {
    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the module holds no descriptors.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The descriptor with the given unqualified name.
    pub fn get(&self, unqualified_name: &str) -> Option<&Arc<TypeInfo>> {
        self.index
            .get(unqualified_name)
            .and_then(|&i| self.types.get(i))
    }

    /// Whether a descriptor with the given unqualified name exists.
    pub fn contains(&self, unqualified_name: &str) -> bool {
        self.index.contains_key(unqualified_name)
    }

    /// Descriptors in insertion order.
    pub fn types(&self) -> impl Iterator<Item = &Arc<TypeInfo>> {
        self.types.iter()
    }
}

/// Append-only builder of a [`ModuleInfo`].
///
/// `done()` consumes the factory, so a finished module can never grow.
/// Re-adding a name replaces the earlier descriptor.
#[derive(Debug, Default)]
pub struct ModuleFactory {
    module: ModuleInfo,
}

impl ModuleFactory {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a descriptor.
    pub fn add(&mut self, info: TypeInfo) -> &mut Self {
        let name = info.unqualified_name().to_string();
        if let Some(&i) = self.module.index.get(&name) {
            self.module.types[i] = Arc::new(info);
        } else {
            self.module.index.insert(name, self.module.types.len());
            self.module.types.push(Arc::new(info));
        }
        self
    }

    /// Freezes and returns the module.
    pub fn done(self) -> ModuleInfo {
        self.module
    }
}
