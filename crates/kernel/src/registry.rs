use std::sync::Arc;

use crate::module::Module;
use crate::plan::CollectionSpec;

/// Module registry; registration order is creation order
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Register a module with the registry
    pub fn register(&mut self, module: Arc<dyn Module>) {
        tracing::debug!(module = module.name(), "registering module");
        self.modules.push(module);
    }

    /// Collect collection contributions from all modules, in registration order
    pub fn collect_collections(&self) -> Vec<CollectionSpec> {
        self.modules
            .iter()
            .flat_map(|module| module.collections())
            .collect()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestModule {
        name: &'static str,
        collections: &'static [&'static str],
    }

    impl Module for TestModule {
        fn name(&self) -> &'static str {
            self.name
        }

        fn collections(&self) -> Vec<CollectionSpec> {
            self.collections
                .iter()
                .map(|c| CollectionSpec::new(*c, self.name))
                .collect()
        }
    }

    #[test]
    fn test_module_registry_creation() {
        let registry = ModuleRegistry::new();
        assert!(registry.collect_collections().is_empty()); // No modules registered yet
    }

    #[test]
    fn test_collections_follow_registration_order() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule {
            name: "posts",
            collections: &["posts"],
        }));
        registry.register(Arc::new(TestModule {
            name: "files",
            collections: &["files", "file_chunks"],
        }));

        let collections = registry.collect_collections();
        let names: Vec<&str> = collections.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["posts", "files", "file_chunks"]);
        assert_eq!(collections[2].owner, "files");
    }

    #[test]
    fn test_module_without_collections_contributes_nothing() {
        struct Empty;
        impl Module for Empty {
            fn name(&self) -> &'static str {
                "empty"
            }
        }

        let mut registry = ModuleRegistry::default();
        registry.register(Arc::new(Empty));
        assert!(registry.collect_collections().is_empty());
    }
}
