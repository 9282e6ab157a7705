use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use mongoseed_app::bootstrap;
use mongoseed_db::COMPLETION_MESSAGE;
use mongoseed_kernel::settings::Settings;

#[derive(Parser)]
#[command(name = "mongoseed-cli")]
#[command(about = "Provision a MongoDB database: application user, role grant and collections")]
struct Args {
    /// Skip the user and collections that already exist instead of failing
    #[arg(long, global = true)]
    idempotent: bool,

    /// MongoDB connection URI (overrides mongo.uri)
    #[arg(long, global = true)]
    uri: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    /// Create the user and collections (default)
    Run,
    /// Print the resolved plan as JSON without connecting
    Plan,
    /// Check that the server matches the plan
    Verify,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load().with_context(|| "failed to load mongoseed settings")?;
    if args.idempotent {
        settings.bootstrap.idempotent = true;
    }
    if let Some(uri) = args.uri {
        settings.mongo.uri = uri;
    }

    mongoseed_telemetry::init(&settings.telemetry)?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            tracing::info!(
                env = ?settings.environment,
                database = %settings.bootstrap.database,
                idempotent = settings.bootstrap.idempotent,
                "database bootstrap starting"
            );
            bootstrap::run(&settings).await?;
            println!("{COMPLETION_MESSAGE}");
        }
        Command::Plan => {
            let plan = bootstrap::build_plan(&settings)?;
            let rendered =
                serde_json::to_string_pretty(&plan).with_context(|| "failed to render plan")?;
            println!("{rendered}");
        }
        Command::Verify => {
            let report = bootstrap::check(&settings).await?;
            for finding in &report.findings {
                println!("{finding}");
            }
            if !report.is_ok() {
                bail!("{} verification finding(s)", report.findings.len());
            }
            println!("database '{}' matches the plan", settings.bootstrap.database);
        }
    }

    Ok(())
}
