pub mod routes;

use crate::{config::GatewayConfig, gateway::Gateway};
use actix_web::{middleware, web, App, HttpServer};

pub use routes::configure;

/// Serves the gateway until the process is stopped.
pub async fn run(config: &GatewayConfig, gateway: Gateway) -> std::io::Result<()> {
    let gateway = web::Data::new(gateway);
    let bind = (config.bind_host().to_string(), config.bind_port());

    log::info!("🌐 Listening on http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(gateway.clone())
            .wrap(middleware::Logger::new("%r -> %s in %Dms"))
            .configure(configure)
    })
    .bind(bind)?
    .run()
    .await
}
