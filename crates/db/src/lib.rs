//! MongoDB client factory, admin operations and the bootstrap procedure.

pub mod admin;
pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod procedure;
pub mod verify;

pub use admin::{AdminApi, DatabaseAdmin, MongoAdmin};
pub use client::connect;
pub use error::{BootstrapError, DbError};
pub use procedure::{run_bootstrap, BootstrapReport, Outcome, COMPLETION_MESSAGE};
pub use verify::{verify, Finding, VerifyReport};
