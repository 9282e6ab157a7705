//! mongoseed application library
//!
//! Application modules and the bootstrap flow shared by the init entrypoint
//! and the `mongoseed-cli` front end.

pub mod bootstrap;
pub mod modules;

pub use bootstrap::{build_plan, run, run_with};
