pub mod files;
pub mod posts;

use mongoseed_kernel::ModuleRegistry;

/// Register all application modules with the registry.
///
/// Order matters: collections are created in registration order.
pub fn register_all(registry: &mut ModuleRegistry) {
    registry.register(posts::create_module());
    registry.register(files::create_module());
}
