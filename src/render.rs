//! HTML rendering of a dashboard view

use std::fmt::Write;

use chrono::NaiveDate;

use crate::chart::Metric;
use crate::dashboard::{DashboardView, PortfolioReport};
use crate::errors::LedgerError;
use crate::export;

const STYLE: &str = "body{font-family:sans-serif;margin:2rem}\
.cards{display:flex;gap:1rem}\
.card{border:1px solid #ddd;border-radius:6px;padding:.75rem 1rem;min-width:14rem}\
.card .label{color:#666;font-size:.85rem}.card .value{font-size:1.5rem}\
.up{color:#2a7}.down{color:#c33}\
table{border-collapse:collapse;font-size:.85rem;margin:1rem 0}\
th,td{border:1px solid #ddd;padding:.25rem .5rem;text-align:right}\
.info{background:#eef5ff;padding:1rem}.error{background:#fdecea;padding:1rem}";

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `-1234567.891` at precision 2 -> `-$1,234,567.89`
pub fn money(value: f64, precision: u32) -> String {
    let text = format!("{:.*}", precision as usize, value.abs());
    let (whole, fraction) = match text.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (text.as_str(), None),
    };
    let mut grouped = String::new();
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 && text.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(f) => format!("{sign}${grouped}.{f}"),
        None => format!("{sign}${grouped}"),
    }
}

fn shell(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{t}</title><style>{STYLE}</style></head>\
         <body><h1>{t}</h1>{body}</body></html>",
        t = escape(title)
    )
}

fn card(out: &mut String, label: &str, value: &str, delta: Option<(f64, String)>) {
    let _ = write!(
        out,
        r#"<div class="card"><div class="label">{}</div><div class="value">{}</div>"#,
        escape(label),
        escape(value)
    );
    if let Some((sign, text)) = delta {
        let class = if sign < 0.0 { "down" } else { "up" };
        let _ = write!(out, r#"<div class="{class}">{}</div>"#, escape(&text));
    }
    out.push_str("</div>");
}

fn summary_cards(out: &mut String, report: &PortfolioReport) {
    let p = &report.portfolio;
    let s = &report.summary;
    let precision = p.precision;
    let _ = write!(
        out,
        "<h2>{} Summary ({} Basis)</h2><div class=\"cards\">",
        escape(&p.title),
        escape(&money(p.total_budget, 0))
    );
    card(
        out,
        "Value",
        &money(s.current_value, precision),
        Some((s.daily_gl_dollars, money(s.daily_gl_dollars, precision))),
    );
    card(
        out,
        "Total P/L",
        &money(s.total_gl_dollars, precision),
        Some((
            s.total_gl_dollars,
            format!("{:.*}%", precision as usize, s.total_gl_pct),
        )),
    );
    card(
        out,
        "Daily %",
        &format!("{:.*}%", precision as usize, s.daily_gl_pct),
        None,
    );
    out.push_str("</div>");
}

fn ledger_table(out: &mut String, report: &PortfolioReport) {
    let ledger = &report.ledger;
    out.push_str("<table><thead><tr><th></th>");
    for (group, span) in ledger.groups() {
        let _ = write!(out, r#"<th colspan="{span}">{}</th>"#, escape(group));
    }
    out.push_str("</tr><tr><th>Date</th>");
    for column in &ledger.columns {
        let _ = write!(out, "<th>{}</th>", escape(&column.attribute));
    }
    out.push_str("</tr></thead><tbody>");
    for (date, cells) in ledger.formatted_rows() {
        let _ = write!(out, "<tr><td>{date}</td>");
        for cell in cells {
            let _ = write!(out, "<td>{cell}</td>");
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
}

/// The full dashboard
pub fn page(view: &DashboardView, today: NaiveDate) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        "<p>Window: <b>{}</b> to <b>{}</b> | data through <b>{}</b></p>",
        view.window_start, view.window_end, view.fetched_through
    );
    for report in &view.portfolios {
        summary_cards(&mut body, report);
        body.push_str("<hr>");
    }
    body.push_str("<h2>Total Value</h2>");
    body.push_str(&view.chart.to_svg(Metric::TotalValue, 900, 280));
    body.push_str("<h2>Daily G/L ($)</h2>");
    body.push_str(&view.chart.to_svg(Metric::DailyGlDollars, 900, 280));
    for report in &view.portfolios {
        let id = &report.portfolio.id;
        let _ = write!(
            body,
            r#"<h2>{} Performance Ledger</h2><p><a href="/api/portfolios/{}/ledger.csv" download="{}">Download CSV</a></p>"#,
            escape(&report.portfolio.title),
            escape(id),
            escape(&export::file_name(id, today))
        );
        ledger_table(&mut body, report);
    }
    shell(&view.title, &body)
}

pub fn awaiting_page(title: &str, start: NaiveDate) -> String {
    shell(
        title,
        &format!(r#"<div class="info">Awaiting start date: {start}</div>"#),
    )
}

pub fn error_page(title: &str, error: &LedgerError) -> String {
    shell(
        title,
        &format!(
            r#"<div class="error">Error: {}</div>"#,
            escape(&error.to_string())
        ),
    )
}
