use anyhow::Context;
use delivery_dash::app::DeliveryDashboard;
use delivery_dash::{AppConfig, DeliveryApi, TransportClient, UploadCoordinator};
use eframe::CreationContext;
use tokio::runtime::Runtime;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let runtime = Runtime::new().context("Failed to start async runtime")?;
    let handle = runtime.handle().clone();

    let client = TransportClient::http(&config.api).context("Failed to create HTTP client")?;
    let api = DeliveryApi::new(client);
    let coordinator = UploadCoordinator::new(
        api.clone(),
        config.policy.clone(),
        config.upload.clone(),
        handle.clone(),
    );

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([900.0, 700.0])
            .with_min_inner_size([500.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Delivery Operations Dashboard",
        options,
        Box::new(move |cc: &CreationContext| {
            Box::new(DeliveryDashboard::new(cc, config, api, coordinator, handle))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run dashboard: {}", e))?;

    drop(runtime);
    Ok(())
}
