use anyhow::Context;
use mongoseed_app::bootstrap;
use mongoseed_db::COMPLETION_MESSAGE;
use mongoseed_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load mongoseed settings")?;
    mongoseed_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        database = %settings.bootstrap.database,
        "database bootstrap starting"
    );

    bootstrap::run(&settings).await?;

    println!("{COMPLETION_MESSAGE}");
    Ok(())
}
