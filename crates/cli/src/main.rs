use alicia_kernel::Settings;
use anyhow::Context;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "alicia", version, about = "Alicia Libros marketplace")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Print the merged OpenAPI document.
    Openapi,
    /// Print the resolved configuration, secrets omitted.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().with_context(|| "failed to load Alicia settings")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            alicia_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "alicia serve");
            alicia_app::run(settings).await
        }
        Command::Openapi => {
            let application = alicia_app::build(settings)?;
            let document = alicia_http::openapi_document(&application.registry);
            println!("{}", serde_json::to_string_pretty(&document)?);
            Ok(())
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}
