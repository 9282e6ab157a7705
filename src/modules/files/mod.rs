use mongoseed_kernel::{CollectionSpec, Module};

pub const COLLECTION: &str = "files";

/// Metadata of uploaded files; the blobs themselves live in object storage.
pub struct FilesModule;

impl FilesModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Module for FilesModule {
    fn name(&self) -> &'static str {
        "files"
    }

    fn collections(&self) -> Vec<CollectionSpec> {
        vec![CollectionSpec::new(COLLECTION, self.name())]
    }
}

/// Create a new instance of the files module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(FilesModule::new())
}
