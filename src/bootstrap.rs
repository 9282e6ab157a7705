//! Settings → plan → server, in the order the init hook expects.

use anyhow::Context;
use mongoseed_db::{run_bootstrap, AdminApi, BootstrapReport, VerifyReport};
use mongoseed_kernel::settings::Settings;
use mongoseed_kernel::{BootstrapPlan, ModuleRegistry};

use crate::modules;

/// Register the application modules, then resolve the plan.
///
/// Fails on configuration problems before any connection is attempted.
pub fn build_plan(settings: &Settings) -> anyhow::Result<BootstrapPlan> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry);

    BootstrapPlan::resolve(&settings.bootstrap, &registry)
        .with_context(|| "invalid bootstrap configuration")
}

/// Build the plan, connect and run the procedure.
pub async fn run(settings: &Settings) -> anyhow::Result<BootstrapReport> {
    let plan = build_plan(settings)?;
    let admin = mongoseed_db::connect(&settings.mongo)
        .await
        .with_context(|| "failed to create MongoDB client")?;

    run_with(&admin, &plan).await
}

/// Run an already resolved plan against `admin`.
pub async fn run_with<A: AdminApi>(admin: &A, plan: &BootstrapPlan) -> anyhow::Result<BootstrapReport> {
    let report = run_bootstrap(admin, plan)
        .await
        .with_context(|| format!("bootstrap of database '{}' failed", plan.database))?;

    tracing::info!(
        database = %report.database,
        created = report.created_anything(),
        "database bootstrap finished"
    );
    Ok(report)
}

/// Build the plan, connect and compare the server against it.
pub async fn check(settings: &Settings) -> anyhow::Result<VerifyReport> {
    let plan = build_plan(settings)?;
    let admin = mongoseed_db::connect(&settings.mongo)
        .await
        .with_context(|| "failed to create MongoDB client")?;

    mongoseed_db::verify(&admin, &plan)
        .await
        .with_context(|| format!("verification of database '{}' failed", plan.database))
}
