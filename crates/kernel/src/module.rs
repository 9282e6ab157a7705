use crate::plan::CollectionSpec;

/// Application component that contributes objects to the bootstrap plan
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Return collections this module needs in the target database
    /// Collections are created in the order returned
    fn collections(&self) -> Vec<CollectionSpec> {
        vec![]
    }
}
