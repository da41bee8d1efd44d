//! Date-aligned series for plotting several portfolios together

use std::collections::BTreeSet;
use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::engine::PortfolioTimeline;
use crate::render::escape;

const PALETTE: [&str; 6] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    TotalValue,
    DailyGlDollars,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub total_value: Vec<Option<f64>>,
    pub daily_gl_dollars: Vec<Option<f64>>,
}

impl ChartSeries {
    fn metric(&self, metric: Metric) -> &[Option<f64>] {
        match metric {
            Metric::TotalValue => &self.total_value,
            Metric::DailyGlDollars => &self.daily_gl_dollars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub dates: Vec<NaiveDate>,
    pub series: Vec<ChartSeries>,
}

impl ChartData {
    /// Puts every timeline on the union of their dates; a portfolio without a
    /// row for some date gets `None` there.
    pub fn align(timelines: &[(&str, &PortfolioTimeline)]) -> Self {
        let dates: Vec<NaiveDate> = timelines
            .iter()
            .flat_map(|(_, t)| t.rows.iter().map(|r| r.date))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let series = timelines
            .iter()
            .map(|(name, timeline)| {
                let (total_value, daily_gl_dollars): (Vec<_>, Vec<_>) = dates
                    .iter()
                    .map(|date| match timeline.row(*date) {
                        Some(row) => (Some(row.total_value), Some(row.daily_gl_dollars)),
                        None => (None, None),
                    })
                    .unzip();
                ChartSeries {
                    name: name.to_string(),
                    total_value,
                    daily_gl_dollars,
                }
            })
            .collect();
        ChartData { dates, series }
    }

    fn bounds(&self, metric: Metric) -> Option<(f64, f64)> {
        self.series
            .iter()
            .flat_map(|s| s.metric(metric).iter().flatten())
            .fold(None, |acc, v| match acc {
                None => Some((*v, *v)),
                Some((lo, hi)) => Some((lo.min(*v), hi.max(*v))),
            })
    }

    /// Inline SVG with one polyline per portfolio; gaps break the line
    pub fn to_svg(&self, metric: Metric, width: u32, height: u32) -> String {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}" width="{width}" height="{height}">"#
        );
        let Some((mut lo, mut hi)) = self.bounds(metric) else {
            svg.push_str("</svg>");
            return svg;
        };
        if hi - lo < f64::EPSILON {
            lo -= 1.0;
            hi += 1.0;
        }
        let (w, h) = (width as f64, height as f64);
        let pad = 24.0;
        let step = if self.dates.len() > 1 {
            (w - 2.0 * pad) / (self.dates.len() - 1) as f64
        } else {
            0.0
        };
        let y = |v: f64| pad + (hi - v) / (hi - lo) * (h - 2.0 * pad);

        if lo < 0.0 && hi > 0.0 {
            let _ = write!(
                svg,
                r##"<line x1="{pad}" x2="{:.1}" y1="{:.1}" y2="{:.1}" stroke="#ccc"/>"##,
                w - pad,
                y(0.0),
                y(0.0)
            );
        }
        for (k, series) in self.series.iter().enumerate() {
            let color = PALETTE[k % PALETTE.len()];
            for run in series
                .metric(metric)
                .iter()
                .enumerate()
                .collect::<Vec<_>>()
                .split(|(_, v)| v.is_none())
                .filter(|run| !run.is_empty())
            {
                let points: Vec<String> = run
                    .iter()
                    .filter_map(|(i, v)| v.map(|v| format!("{:.1},{:.1}", pad + *i as f64 * step, y(v))))
                    .collect();
                let _ = write!(
                    svg,
                    r#"<polyline fill="none" stroke="{color}" stroke-width="2" points="{}"/>"#,
                    points.join(" ")
                );
            }
            let _ = write!(
                svg,
                r#"<text x="{pad}" y="{:.1}" fill="{color}" font-size="12">{}</text>"#,
                14.0 + 14.0 * k as f64,
                escape(&series.name)
            );
        }
        svg.push_str("</svg>");
        svg
    }
}
