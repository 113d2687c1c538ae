use alicia_kernel::Settings;
use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load Alicia settings")?;
    alicia_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        port = settings.server.port,
        "alicia-app bootstrap starting"
    );

    alicia_app::run(settings).await
}
