pub mod auth;
pub mod datasets;
pub mod error;

use actix_cors::Cors;
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{dev::Server, get, web, App, HttpResponse, HttpServer, Responder};
use serde_json::json;
use std::net::TcpListener;
use std::sync::Arc;
use tracing::info;

use crate::application::DatasetService;
use crate::domain::error::AppError;
use crate::infrastructure::config::{AppConfig, AuthConfig};

pub struct HttpState {
    pub service: Arc<DatasetService>,
    pub auth: Option<AuthConfig>,
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Routes under `/api`. Ids that do not parse are treated as unknown datasets.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::NotFound(format!("Dataset not found: {}", err)).into()
    }))
    .service(
        web::scope("/api")
            .service(health)
            .configure(datasets::configure),
    );
}

pub fn start_server(config: &AppConfig, service: Arc<DatasetService>) -> std::io::Result<Server> {
    let listener = TcpListener::bind(config.bind_address())?;
    start_server_on(listener, config, service)
}

/// Serve on an already bound listener; tests bind port 0 and read it back.
pub fn start_server_on(
    listener: TcpListener,
    config: &AppConfig,
    service: Arc<DatasetService>,
) -> std::io::Result<Server> {
    let state = web::Data::new(HttpState {
        service,
        auth: config.auth.clone(),
    });
    let cors_permissive = config.server.cors_permissive;

    info!(
        address = %listener.local_addr()?,
        auth = state.auth.is_some(),
        "Starting HTTP server"
    );

    let server = HttpServer::new(move || {
        let cors = if cors_permissive {
            Cors::permissive()
        } else {
            Cors::default()
        };

        App::new()
            .wrap(NormalizePath::trim())
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .listen(listener)?
    .run();

    Ok(server)
}
