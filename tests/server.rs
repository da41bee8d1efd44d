mod common;

use std::sync::Arc;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use chrono::NaiveDate;
use common::{config, day, Mode, StubProvider};
use dual_ledger::dashboard::Dashboard;
use dual_ledger::server::{routes, AppState};
use serde_json::Value;

fn state(mode: Mode, today: NaiveDate) -> web::Data<AppState> {
    let dashboard = Dashboard::new(Arc::new(config()), Arc::new(StubProvider::new(mode)));
    web::Data::new(AppState {
        dashboard,
        today: Box::new(move || today),
    })
}

#[actix_web::test]
async fn health_is_ok() {
    let app = test::init_service(App::new().app_data(state(Mode::Prices, day(14))).configure(routes)).await;
    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn portfolios_json_reports_ready_status() {
    let app = test::init_service(App::new().app_data(state(Mode::Prices, day(14))).configure(routes)).await;
    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/portfolios").to_request(),
    )
    .await;

    assert_eq!(body["status"], "ready");
    assert_eq!(body["portfolios"][0]["portfolio"]["id"], "stocks");
    assert_eq!(body["portfolios"][0]["summary"]["current_value"], 203000.0);
    assert_eq!(body["portfolios"][1]["summary"]["current_value"], 240000.0);
}

#[actix_web::test]
async fn csv_download_is_named_with_today() {
    let app = test::init_service(App::new().app_data(state(Mode::Prices, day(14))).configure(routes)).await;
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/portfolios/options/ledger.csv")
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("options_2026-01-14.csv"));
    let body = test::read_body(resp).await;
    let text = std::str::from_utf8(&body).unwrap();
    assert!(text.starts_with(",QQQ,QQQ,MSFT,MSFT,"));
    assert!(text.contains("Date,Price,Contracts,Price,Contracts"));
}

#[actix_web::test]
async fn unknown_portfolio_is_not_found() {
    let app = test::init_service(App::new().app_data(state(Mode::Prices, day(14))).configure(routes)).await;
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/portfolios/bonds/ledger.csv")
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "unknown_portfolio");
}

#[actix_web::test]
async fn provider_failure_is_bad_gateway() {
    let app = test::init_service(App::new().app_data(state(Mode::Failing, day(14))).configure(routes)).await;
    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/chart").to_request()).await;

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "provider");
}

#[actix_web::test]
async fn index_shows_awaiting_before_the_window() {
    let before = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
    let app = test::init_service(App::new().app_data(state(Mode::Prices, before)).configure(routes)).await;
    let body = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
    let html = std::str::from_utf8(&body).unwrap();

    assert!(html.contains("Awaiting start date: 2026-01-12"));
}

#[actix_web::test]
async fn api_routes_report_awaiting_with_ok_status() {
    let before = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
    let app = test::init_service(App::new().app_data(state(Mode::Prices, before)).configure(routes)).await;

    for uri in ["/api/portfolios", "/api/chart", "/api/portfolios/stocks/ledger.csv"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "awaiting_data", "{uri}");
        assert_eq!(body["start"], "2026-01-12", "{uri}");
    }
}

#[actix_web::test]
async fn index_renders_cards_tables_and_charts() {
    let app = test::init_service(App::new().app_data(state(Mode::Prices, day(14))).configure(routes)).await;
    let body = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
    let html = std::str::from_utf8(&body).unwrap();

    assert!(html.contains("$203,000.00"));
    assert!(html.contains("Stock Portfolio Performance Ledger"));
    assert!(html.contains("<td>240000.00</td>"));
    assert!(html.contains("/api/portfolios/options/ledger.csv"));
    assert_eq!(html.matches("<svg").count(), 2);
}

#[actix_web::test]
async fn index_shows_a_single_error_block() {
    let app = test::init_service(App::new().app_data(state(Mode::Failing, day(14))).configure(routes)).await;
    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body = test::read_body(resp).await;
    let html = std::str::from_utf8(&body).unwrap();
    assert_eq!(html.matches("class=\"error\"").count(), 1);
    assert!(!html.contains("<table"));
}
