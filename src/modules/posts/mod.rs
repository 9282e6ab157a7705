use mongoseed_kernel::{CollectionSpec, Module};

pub const COLLECTION: &str = "posts";

/// Blog posts written by the application.
pub struct PostsModule;

impl PostsModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Module for PostsModule {
    fn name(&self) -> &'static str {
        "posts"
    }

    fn collections(&self) -> Vec<CollectionSpec> {
        vec![CollectionSpec::new(COLLECTION, self.name())]
    }
}

/// Create a new instance of the posts module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(PostsModule::new())
}
