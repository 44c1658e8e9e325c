use crate::{
    error::GatewayError,
    gateway::Gateway,
    logger,
    models::{BackendMode, GenerationRequest},
};
use actix_web::{get, post, web, HttpResponse};
use serde_json::json;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(generate_local)
        .service(generate_fal)
        .service(generate_fal_direct)
        .service(generate_replicate)
        .service(health);
}

async fn handle(
    gateway: &Gateway,
    mode: BackendMode,
    body: &[u8],
) -> Result<HttpResponse, GatewayError> {
    let request_id = logger::request_id();

    let request = GenerationRequest::from_json_body(body).map_err(|e| {
        log::warn!("[req:{}] {} rejected: {}", request_id, mode, e);
        e
    })?;
    log::info!(
        "[req:{}] {} generation for prompt: {}",
        request_id,
        mode,
        request.prompt()
    );

    let _timer = logger::timer(&format!("[req:{}] {} generation", request_id, mode));
    match gateway.generate(mode, &request).await {
        Ok(outcome) => {
            log::info!(
                "[req:{}] {} image(s) from {}",
                request_id,
                outcome.response.len(),
                outcome.provider
            );
            Ok(HttpResponse::Ok().json(outcome.response))
        }
        Err(e) => {
            log::error!("[req:{}] Error generating image: {:?}", request_id, e);
            Err(e)
        }
    }
}

#[post("/api/local/generate-image")]
async fn generate_local(
    gateway: web::Data<Gateway>,
    body: web::Bytes,
) -> Result<HttpResponse, GatewayError> {
    handle(&gateway, BackendMode::Local, &body).await
}

#[post("/api/fal/generate-image")]
async fn generate_fal(
    gateway: web::Data<Gateway>,
    body: web::Bytes,
) -> Result<HttpResponse, GatewayError> {
    handle(&gateway, BackendMode::Fal, &body).await
}

#[post("/api/fal-direct/generate-image")]
async fn generate_fal_direct(
    gateway: web::Data<Gateway>,
    body: web::Bytes,
) -> Result<HttpResponse, GatewayError> {
    handle(&gateway, BackendMode::FalDirect, &body).await
}

#[post("/api/replicate/generate-image")]
async fn generate_replicate(
    gateway: web::Data<Gateway>,
    body: web::Bytes,
) -> Result<HttpResponse, GatewayError> {
    handle(&gateway, BackendMode::Replicate, &body).await
}

#[get("/api/health")]
async fn health() -> HttpResponse {
    let modes: Vec<_> = BackendMode::ALL
        .iter()
        .map(|mode| json!({"mode": mode, "endpoint": mode.endpoint()}))
        .collect();
    HttpResponse::Ok().json(json!({"status": "ok", "modes": modes}))
}
