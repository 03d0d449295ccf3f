//! Prometheus text exposition format (version 0.0.4).

use std::fmt::Write;
use std::sync::Arc;

use crate::metrics::registry::{MetricFamily, MetricKind};
use crate::metrics::series::Series;

/// Content type for the rendered output.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v == f64::INFINITY {
        "+Inf".into()
    } else if v == f64::NEG_INFINITY {
        "-Inf".into()
    } else {
        v.to_string()
    }
}

pub(crate) fn render_families(families: &[Arc<MetricFamily>]) -> String {
    let mut out = String::new();
    for family in families {
        render_family(family, &mut out);
    }
    out
}

fn render_family(family: &MetricFamily, out: &mut String) {
    let desc = &family.desc;
    let _ = writeln!(out, "# HELP {} {}", desc.name, escape_help(&desc.help));
    let _ = writeln!(out, "# TYPE {} {}", desc.name, desc.kind.as_str());

    let mut rows: Vec<(Vec<String>, Arc<Series>)> = family
        .series
        .iter()
        .map(|r| (r.key().clone(), r.value().clone()))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    for (values, series) in rows {
        let label_str = desc
            .label_names
            .iter()
            .zip(&values)
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
            .collect::<Vec<_>>()
            .join(",");

        match desc.kind {
            MetricKind::Counter | MetricKind::Gauge => {
                let v = series.get().unwrap_or_default();
                let _ = writeln!(out, "{}{} {}", desc.name, braces(&label_str), fmt_value(v));
            }
            MetricKind::Histogram => {
                // Count, sum and buckets are separate relaxed atomics. A scrape
                // racing an observe may see `_count` ahead of the buckets, or a
                // lower bucket that lags a higher one; the next scrape settles.
                let Some(hist) = series.histogram() else {
                    continue;
                };
                let prefix = if label_str.is_empty() {
                    String::new()
                } else {
                    format!("{},", label_str)
                };
                for (le, count) in &hist.buckets {
                    let _ = writeln!(
                        out,
                        "{}_bucket{{{}le=\"{}\"}} {}",
                        desc.name,
                        prefix,
                        fmt_value(*le),
                        count
                    );
                }
                let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", desc.name, prefix, hist.count);
                let _ = writeln!(out, "{}_sum{} {}", desc.name, braces(&label_str), fmt_value(hist.sum));
                let _ = writeln!(out, "{}_count{} {}", desc.name, braces(&label_str), hist.count);
            }
        }
    }
}

fn braces(label_str: &str) -> String {
    if label_str.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", label_str)
    }
}
