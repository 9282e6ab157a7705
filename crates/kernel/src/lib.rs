pub mod module;
pub mod plan;
pub mod registry;
pub mod secret;
pub mod settings;

pub use module::Module;
pub use plan::{BootstrapPlan, CollectionSpec, ExistingPolicy, PlanError, RoleGrant, UserSpec};
pub use registry::ModuleRegistry;
pub use secret::Secret;
