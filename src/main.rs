use promptcanvas::{logger, Gateway, GatewayConfig};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();

    logger::init_with_config(logger::LoggerConfig::from_env())?;
    if env_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = GatewayConfig::from_env();
    logger::log_startup_info(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        config.bind_host(),
        config.bind_port(),
    );
    logger::log_config_info(&config);

    let gateway = match Gateway::from_config(&config) {
        Ok(gateway) => gateway,
        Err(e) => {
            log::error!("❌ Failed to build gateway: {}", e);
            return Err(e.into());
        }
    };

    log::info!("🖼️  fal.ai fallback chain:");
    for (position, name) in gateway.fal_chain().names().iter().enumerate() {
        log::info!("  {}. {}", position + 1, name);
    }

    promptcanvas::server::run(&config, gateway).await?;
    Ok(())
}
