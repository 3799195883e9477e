use anyhow::Context;
use donut_field::{AppConfig, DonutApp};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();
    log::info!(
        "Starting with {} donuts, assets from {}",
        config.field.count,
        config.asset_root.display()
    );

    let app = DonutApp::new(config).context("Failed to create event loop")?;
    app.run().context("Donut field exited with an error")?;
    Ok(())
}
