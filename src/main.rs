use std::sync::Arc;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use dual_ledger::config::DashboardConfig;
use dual_ledger::dashboard::Dashboard;
use dual_ledger::server::{routes, AppState};
use dual_ledger::yahoo_finance::YahooProvider;

fn init_tracing() {
    let log_format = std::env::var("LEDGER_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing();
    let config = DashboardConfig::load()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let listen_addr = config.listen_addr;
    let dashboard = Dashboard::new(Arc::new(config), Arc::new(YahooProvider::new()));
    let state = web::Data::new(AppState::new(dashboard));

    tracing::info!("Listening on {}", listen_addr);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes)
    })
    .bind(listen_addr)?
    .run()
    .await
}
