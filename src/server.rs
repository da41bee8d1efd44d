//! HTTP surface
//!
//! `GET /` renders the dashboard, `/api/...` serves the same data as JSON and
//! CSV. Every handler re-runs the pipeline; the price cache keeps that cheap.

use actix_web::http::{header, StatusCode};
use actix_web::{get, web, HttpResponse, Responder, ResponseError};
use chrono::NaiveDate;
use serde_json::json;

use crate::dashboard::{Dashboard, Outcome};
use crate::errors::LedgerError;
use crate::export::{self, CSV_CONTENT_TYPE};
use crate::render;

/// Shared by every worker
pub struct AppState {
    pub dashboard: Dashboard,
    pub today: Box<dyn Fn() -> NaiveDate + Send + Sync>,
}

impl AppState {
    pub fn new(dashboard: Dashboard) -> Self {
        AppState {
            dashboard,
            today: Box::new(|| chrono::Local::now().date_naive()),
        }
    }

    fn today(&self) -> NaiveDate {
        (self.today)()
    }
}

impl ResponseError for LedgerError {
    fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::UnknownPortfolio(_) => StatusCode::NOT_FOUND,
            LedgerError::Provider(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "kind": self.kind(),
            "message": self.to_string(),
        }))
    }
}

/// Same body as `/api/portfolios` while awaiting data; not an error
fn awaiting(start: NaiveDate) -> HttpResponse {
    HttpResponse::Ok().json(Outcome::AwaitingData { start })
}

#[get("/")]
async fn index(state: web::Data<AppState>) -> impl Responder {
    let today = state.today();
    let title = &state.dashboard.config().title;
    match state.dashboard.render_view(today).await {
        Ok(Outcome::Ready(view)) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(render::page(&view, today)),
        Ok(Outcome::AwaitingData { start }) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(render::awaiting_page(title, start)),
        Err(e) => {
            tracing::error!(kind = e.kind(), error = %e, "render failed");
            HttpResponse::build(e.status_code())
                .content_type("text/html; charset=utf-8")
                .body(render::error_page(title, &e))
        }
    }
}

#[get("/api/portfolios")]
async fn portfolios(state: web::Data<AppState>) -> Result<HttpResponse, LedgerError> {
    let outcome = state.dashboard.render_view(state.today()).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[get("/api/portfolios/{id}/ledger.csv")]
async fn ledger_csv(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, LedgerError> {
    let id = path.into_inner();
    let today = state.today();
    let Some(report) = state.dashboard.portfolio_report(&id, today).await? else {
        return Ok(awaiting(state.dashboard.config().window_start));
    };
    let body = export::to_csv(&report.ledger)?;
    Ok(HttpResponse::Ok()
        .content_type(CSV_CONTENT_TYPE)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export::file_name(&id, today)),
        ))
        .body(body))
}

#[get("/api/chart")]
async fn chart(state: web::Data<AppState>) -> Result<HttpResponse, LedgerError> {
    match state.dashboard.render_view(state.today()).await? {
        Outcome::Ready(view) => Ok(HttpResponse::Ok().json(view.chart)),
        Outcome::AwaitingData { start } => Ok(awaiting(start)),
    }
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(portfolios)
        .service(ledger_csv)
        .service(chart)
        .service(health);
}
