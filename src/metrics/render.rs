//! Prometheus text exposition.
//!
//! Output per metric, in registration order:
//!
//! ```text
//! # HELP <name> <description>
//! # TYPE <name> <counter|gauge|histogram>
//! <name>{l1="v1",...} <value>
//! <name>_bucket{l1="v1",...,le="<bound>"} <cumulative count>
//! <name>_sum{l1="v1",...} <sum>
//! <name>_count{l1="v1",...} <count>
//! ```

use super::definition::{MetricDefinition, MetricKind, BUCKET_LABEL};
use super::histogram::HistogramEntry;
use super::labels::{self, LabelKey};
use super::store::{MetricStore, StoreEntry};
use crate::utils::errors::{MetricError, Result};

/// Formats a sample value the way the exposition format expects.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

/// Escapes backslash, double quote and newline in a label value.
pub fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escapes backslash and newline in HELP text.
pub fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Builds `{name="value",...}`, or an empty string when there are no pairs.
fn format_labels(names: &[String], values: &[String], extra: Option<(&str, &str)>) -> String {
    let mut pairs: Vec<String> = names
        .iter()
        .zip(values)
        .map(|(n, v)| format!("{}=\"{}\"", n, escape_label_value(v)))
        .collect();
    if let Some((n, v)) = extra {
        pairs.push(format!("{}=\"{}\"", n, escape_label_value(v)));
    }

    if pairs.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", pairs.join(","))
    }
}

fn render_histogram(
    def: &MetricDefinition,
    values: &[String],
    entry: &HistogramEntry,
) -> Result<String> {
    if !entry.is_consistent(def.buckets.len()) {
        return Err(MetricError::TypeMismatch {
            metric: def.name.clone(),
            expected: "consistent histogram entry",
            actual: "entry with mismatched buckets",
        });
    }

    let mut out = String::new();
    let bounds = def
        .buckets
        .iter()
        .copied()
        .chain(std::iter::once(f64::INFINITY));
    for (bound, count) in bounds.zip(&entry.buckets) {
        let le = format_value(bound);
        out.push_str(&format!(
            "{}_bucket{} {}\n",
            def.name,
            format_labels(&def.label_names, values, Some((BUCKET_LABEL, le.as_str()))),
            count
        ));
    }

    let labels = format_labels(&def.label_names, values, None);
    out.push_str(&format!(
        "{}_sum{} {}\n",
        def.name,
        labels,
        format_value(entry.sum)
    ));
    out.push_str(&format!("{}_count{} {}\n", def.name, labels, entry.count));
    Ok(out)
}

/// Renders one series, or reports why it cannot be rendered.
fn render_series(def: &MetricDefinition, key: &LabelKey, entry: &StoreEntry) -> Result<String> {
    let values = labels::decode(&def.name, key, def.arity())?;
    match (def.kind, entry) {
        (MetricKind::Counter | MetricKind::Gauge, StoreEntry::Scalar(value)) => Ok(format!(
            "{}{} {}\n",
            def.name,
            format_labels(&def.label_names, &values, None),
            format_value(*value)
        )),
        (MetricKind::Histogram, StoreEntry::Histogram(h)) => render_histogram(def, &values, h),
        (kind, _) => Err(MetricError::TypeMismatch {
            metric: def.name.clone(),
            expected: kind.as_str(),
            actual: "entry of another kind",
        }),
    }
}

/// Appends one metric block to `out`, returning how many series were skipped.
pub fn render_metric(def: &MetricDefinition, store: &MetricStore, out: &mut String) -> usize {
    if let Some(help) = &def.description {
        out.push_str(&format!("# HELP {} {}\n", def.name, escape_help(help)));
    }
    out.push_str(&format!("# TYPE {} {}\n", def.name, def.kind));

    let mut skipped = 0;
    store.for_each(&def.name, |key, entry| match render_series(def, key, entry) {
        Ok(text) => out.push_str(&text),
        Err(_) => skipped += 1,
    });
    skipped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(kind: MetricKind, labels: &[&str], buckets: &[f64]) -> MetricDefinition {
        MetricDefinition {
            name: "m".to_string(),
            kind,
            description: Some("Help \\ with\nnewline".to_string()),
            label_names: labels.iter().map(|s| s.to_string()).collect(),
            buckets: buckets.to_vec(),
        }
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(2.0), "2");
        assert_eq!(format_value(2.35), "2.35");
        assert_eq!(format_value(0.005), "0.005");
        assert_eq!(format_value(-1.5), "-1.5");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_value(f64::NAN), "NaN");
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_label_value(r#"a\b"c"#), r#"a\\b\"c"#);
        assert_eq!(escape_label_value("x\ny"), "x\\ny");
        assert_eq!(escape_help("a\\b\nc\"d"), "a\\\\b\\nc\"d");
    }

    #[test]
    fn test_scalar_block() {
        let def = definition(MetricKind::Gauge, &["path"], &[]);
        let mut store = MetricStore::new();
        *store.get_or_create("m", &labels::encode(&[r#"C:\tmp "x""#]), || {
            StoreEntry::Scalar(0.0)
        }) = StoreEntry::Scalar(1.5);

        let mut out = String::new();
        assert_eq!(render_metric(&def, &store, &mut out), 0);
        assert_eq!(
            out,
            "# HELP m Help \\\\ with\\nnewline\n\
             # TYPE m gauge\n\
             m{path=\"C:\\\\tmp \\\"x\\\"\"} 1.5\n"
        );
    }

    #[test]
    fn test_histogram_block_with_labels() {
        let def = definition(MetricKind::Histogram, &["op"], &[0.5]);
        let mut store = MetricStore::new();
        let mut entry = HistogramEntry::new(1);
        entry.observe(&[0.5], 0.25);
        entry.observe(&[0.5], 4.0);
        *store.get_or_create("m", &labels::encode(&["read"]), || StoreEntry::Scalar(0.0)) =
            StoreEntry::Histogram(entry);

        let mut out = String::new();
        render_metric(&def, &store, &mut out);
        assert!(out.ends_with(
            "m_bucket{op=\"read\",le=\"0.5\"} 1\n\
             m_bucket{op=\"read\",le=\"+Inf\"} 2\n\
             m_sum{op=\"read\"} 4.25\n\
             m_count{op=\"read\"} 2\n"
        ));
    }

    #[test]
    fn test_no_description_no_help_line() {
        let mut def = definition(MetricKind::Counter, &[], &[]);
        def.description = None;
        let mut out = String::new();
        render_metric(&def, &MetricStore::new(), &mut out);
        assert_eq!(out, "# TYPE m counter\n");
    }

    #[test]
    fn test_mismatched_entries_are_skipped() {
        let def = definition(MetricKind::Histogram, &[], &[1.0, 2.0]);
        let mut store = MetricStore::new();
        *store.get_or_create("m", &LabelKey::empty(), || StoreEntry::Scalar(0.0)) =
            StoreEntry::Histogram(HistogramEntry::new(5));

        let mut out = String::new();
        assert_eq!(render_metric(&def, &store, &mut out), 1);
        assert!(!out.contains("m_count"));

        let def = definition(MetricKind::Counter, &["a"], &[]);
        let mut store = MetricStore::new();
        store.get_or_create("m", &labels::encode(&["x", "y"]), || StoreEntry::Scalar(1.0));
        store.get_or_create("m", &labels::encode(&["ok"]), || StoreEntry::Scalar(1.0));
        let mut out = String::new();
        assert_eq!(render_metric(&def, &store, &mut out), 1);
        assert!(out.contains("m{a=\"ok\"} 1\n"));
    }
}
