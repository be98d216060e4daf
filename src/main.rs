use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer};
use env_logger::Env;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::config::Config;
use crate::error::ApiError;

mod app_state;
mod balance_handler;
mod cache;
mod config;
mod error;
mod metrics;
mod portfolio;
mod upstream;

#[derive(Deserialize)]
struct BalanceQuery {
    address: String,
}

#[actix_web::get("/api/sol/total_balance")]
async fn total_balance(
    query: web::Query<BalanceQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let portfolio = data.handler.total_balance(&query.address).await?;

    Ok(HttpResponse::Ok().json(portfolio))
}

fn query_error(err: actix_web::error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!("rejecting query string: {err}");
    ApiError::InvalidInput("address is required".to_string()).into()
}

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(query_error))
        .service(total_balance)
        .service(metrics::metrics);
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let cfg = Config::from_env()?;
    let app_state = web::Data::new(AppState::new(&cfg)?);

    tracing::info!("Server listening on {}:{}", cfg.bind, cfg.port);

    {
        let app_state = app_state.clone();

        HttpServer::new(move || {
            App::new()
                .wrap(Cors::permissive())
                .wrap(middleware::Logger::default())
                .app_data(app_state.clone())
                .configure(configure)
        })
        .bind((cfg.bind.as_str(), cfg.port))?
        .run()
        .await?;
    }

    // last handle to the upstream client; dropping it closes pooled connections
    drop(app_state);
    tracing::info!("Server stopped");

    Ok(())
}
