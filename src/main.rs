use anyhow::Context;
use hotelpress::modules;
use hotelpress_kernel::{InitCtx, ModuleRegistry, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load hotelpress settings")?;
    hotelpress_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        host = %settings.server.host,
        port = settings.server.port,
        "hotelpress starting"
    );

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &settings)?;

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    let served = hotelpress_http::start_server(&registry, &settings).await;

    registry.stop_modules().await?;
    served
}
