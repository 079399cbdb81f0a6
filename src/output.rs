//! Output formatting and persistence for survey reports.
//!
//! Supports the sectioned console report, JSON serialization, and a CSV
//! export of the attendant ranking.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::aggregate::{Group, GroupBy};
use crate::analyzers::rank::Ranked;
use crate::analyzers::risk::RiskBand;
use crate::analyzers::types::Report;
use crate::stats::{GroupStats, Metric, round2};

const BANNER_WIDTH: usize = 80;

fn banner(out: &mut String, title: &str) {
    let rule = "=".repeat(BANNER_WIDTH);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{rule}");
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "n/a".to_string(),
    }
}

fn width<'a>(header: &str, keys: impl Iterator<Item = &'a str>) -> usize {
    keys.map(|k| k.chars().count())
        .max()
        .unwrap_or(0)
        .max(header.chars().count())
}

/// Renders the full console report. Contains nothing run-dependent, so the
/// same table always yields the same text.
pub fn format_report(report: &Report) -> String {
    let mut out = String::new();

    banner(&mut out, "PREVIEW");
    let w = width(
        "attendant",
        report.dataset.preview.iter().map(|r| r.attendant.as_str()),
    );
    let cw = width(
        "contact type",
        report.dataset.preview.iter().map(|r| r.contact_type.as_str()),
    );
    let ow = width(
        "opportunity",
        report
            .dataset
            .preview
            .iter()
            .filter_map(|r| r.opportunity.as_deref()),
    );
    let _ = writeln!(
        out,
        "{:<w$}  {:<cw$}  {:<ow$}  {:>6}",
        "attendant", "contact type", "opportunity", "csat"
    );
    for r in &report.dataset.preview {
        let _ = writeln!(
            out,
            "{:<w$}  {:<cw$}  {:<ow$}  {:>6}",
            r.attendant,
            r.contact_type,
            r.opportunity.as_deref().unwrap_or("-"),
            fmt_opt(r.csat)
        );
    }
    let _ = writeln!(out);

    banner(&mut out, "DATASET INFO");
    let _ = writeln!(out, "Total records: {}", report.dataset.total_records);
    let _ = writeln!(out, "Scored records: {}", report.dataset.scored_records);
    let _ = writeln!(out, "Columns: {:?}", report.dataset.columns);
    let _ = writeln!(out);

    banner(&mut out, "MEAN CSAT BY ATTENDANT");
    let w = width(
        "attendant",
        report.by_attendant.iter().map(|r| r.item.key.as_str()),
    );
    let _ = writeln!(
        out,
        "{:>4}  {:<w$}  {:>10}  {:>11}  {:>10}",
        "rank", "attendant", "mean csat", "evaluations", "sum csat"
    );
    for r in &report.by_attendant {
        let _ = writeln!(
            out,
            "{:>4}  {:<w$}  {:>10.2}  {:>11}  {:>10.2}",
            r.rank, r.item.key, r.item.stats.mean, r.item.stats.count, r.item.stats.sum
        );
    }
    let _ = writeln!(out);

    banner(&mut out, "OVERALL STATISTICS");
    match &report.overall {
        Some(o) => {
            let _ = writeln!(out, "Mean CSAT: {:.2}", o.mean);
            let _ = writeln!(out, "Median CSAT: {:.2}", o.median);
            let _ = writeln!(out, "Standard deviation: {}", fmt_opt(o.std));
            let _ = writeln!(out, "Minimum score: {:.2}", o.min);
            let _ = writeln!(out, "Maximum score: {:.2}", o.max);
        }
        None => {
            let _ = writeln!(out, "No scored records.");
        }
    }
    let _ = writeln!(out);

    banner(&mut out, "MEAN CSAT BY CONTACT TYPE");
    write_mean_table(&mut out, "contact type", &report.by_contact_type);
    let _ = writeln!(out);

    banner(&mut out, "MEAN CSAT BY OPPORTUNITY");
    write_mean_table(&mut out, "opportunity", &report.by_opportunity);
    if report.missing_opportunity > 0 {
        let _ = writeln!(
            out,
            "({} scored records without an opportunity)",
            report.missing_opportunity
        );
    }
    let _ = writeln!(out);

    banner(&mut out, "ATTENDANT DISPERSION");
    let w = width(
        "attendant",
        report.dispersion.iter().map(|r| r.item.key.as_str()),
    );
    let _ = writeln!(
        out,
        "{:>4}  {:<w$}  {:>6}  {:>8}  {:>8}  {:>8}  {:>8}  {:>8}",
        "rank", "attendant", "count", "mean", "median", "std", "min", "max"
    );
    for r in &report.dispersion {
        let s = &r.item.stats;
        let _ = writeln!(
            out,
            "{:>4}  {:<w$}  {:>6}  {:>8.2}  {:>8.2}  {:>8}  {:>8.2}  {:>8.2}",
            r.rank,
            r.item.key,
            s.count,
            s.mean,
            s.median,
            fmt_opt(s.std),
            s.min,
            s.max
        );
    }
    let _ = writeln!(out);

    banner(&mut out, "CSAT BY ATTENDANT AND CONTACT TYPE");
    let tab = &report.crosstab;
    let w = width("attendant", tab.attendants.iter().map(String::as_str));
    let _ = write!(out, "{:<w$}", "attendant");
    for c in &tab.contact_types {
        let cw = c.chars().count().max(6);
        let _ = write!(out, "  {c:>cw$}");
    }
    let _ = writeln!(out);
    for a in &tab.attendants {
        let _ = write!(out, "{a:<w$}");
        for c in &tab.contact_types {
            let cw = c.chars().count().max(6);
            let cell = match tab.get(a, c) {
                Some(cell) => format!("{:.2}", cell.mean),
                None => "-".to_string(),
            };
            let _ = write!(out, "  {cell:>cw$}");
        }
        let _ = writeln!(out);
    }
    let _ = writeln!(out);

    banner(&mut out, "BEST / WORST CONTACT TYPE PER ATTENDANT");
    if report.extremes.is_empty() {
        let _ = writeln!(out, "No scored records.");
    }
    for e in &report.extremes {
        let _ = writeln!(out, "{}", e.attendant);
        let _ = writeln!(
            out,
            "  best:  {} (mean {:.2}, {} evaluations)",
            e.best.contact_type, e.best.mean, e.best.count
        );
        let _ = writeln!(
            out,
            "  worst: {} (mean {:.2}, {} evaluations)",
            e.worst.contact_type, e.worst.mean, e.worst.count
        );
    }
    let _ = writeln!(out);

    banner(&mut out, "LOW SCORE PROBABILITY (CSAT < 3)");
    let w = width(
        "attendant",
        report.low_scores.iter().map(|r| r.item.attendant.as_str()),
    );
    let _ = writeln!(
        out,
        "{:>4}  {:<w$}  {:>6}  {:>6}  {:>12}",
        "rank", "attendant", "total", "below", "probability"
    );
    for r in &report.low_scores {
        let _ = writeln!(
            out,
            "{:>4}  {:<w$}  {:>6}  {:>6}  {:>11.2}%",
            r.rank, r.item.attendant, r.item.total, r.item.below, r.item.percentage
        );
    }
    let _ = writeln!(out);

    banner(&mut out, "RECOMMENDATIONS");
    for band in RiskBand::ALL {
        let members: Vec<_> = report
            .recommendations
            .iter()
            .filter(|r| r.band == band)
            .collect();
        let _ = writeln!(out, "{} risk ({}):", band, members.len());
        if members.is_empty() {
            let _ = writeln!(out, "  none");
        }
        for r in members {
            let focus = r.focus_contact_type.as_deref().unwrap_or("-");
            let _ = writeln!(
                out,
                "  {} - {:.2}% low scores, focus on {}",
                r.attendant, r.percentage, focus
            );
        }
    }
    let _ = writeln!(out);

    out
}

fn write_mean_table(out: &mut String, header: &str, groups: &[Group<String>]) {
    let w = width(header, groups.iter().map(|g| g.key.as_str()));
    let _ = writeln!(out, "{:<w$}  {:>10}  {:>11}", header, "mean csat", "evaluations");
    for g in groups {
        let _ = writeln!(
            out,
            "{:<w$}  {:>10.2}  {:>11}",
            g.key, g.stats.mean, g.stats.count
        );
    }
}

/// Renders a single ranked aggregate table.
pub fn format_summary(by: GroupBy, metric: Metric, ranked: &[Ranked<Group<String>>]) -> String {
    let mut out = String::new();
    banner(
        &mut out,
        &format!(
            "CSAT BY {} (RANKED BY {:?})",
            by.label().to_uppercase(),
            metric
        )
        .to_uppercase(),
    );

    let w = width(by.label(), ranked.iter().map(|r| r.item.key.as_str()));
    let _ = writeln!(
        out,
        "{:>4}  {:<w$}  {:>6}  {:>8}  {:>8}  {:>8}  {:>8}  {:>8}  {:>8}",
        "rank",
        by.label(),
        "count",
        "mean",
        "median",
        "std",
        "min",
        "max",
        "sum"
    );
    for r in ranked {
        let GroupStats {
            count,
            mean,
            median,
            std,
            min,
            max,
            sum,
        } = &r.item.stats;
        let _ = writeln!(
            out,
            "{:>4}  {:<w$}  {:>6}  {:>8.2}  {:>8.2}  {:>8}  {:>8.2}  {:>8.2}  {:>8.2}",
            r.rank,
            r.item.key,
            count,
            mean,
            median,
            fmt_opt(*std),
            min,
            max,
            sum
        );
    }
    out
}

/// Writes the report as pretty-printed JSON, replacing any existing file.
pub fn write_json(path: &Path, report: &Report) -> Result<()> {
    let body = serde_json::to_string_pretty(report)?;
    std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "JSON report written");
    Ok(())
}

/// One attendant line of the CSV export.
#[derive(Debug, Serialize)]
struct RankingRow<'a> {
    rank: usize,
    attendant: &'a str,
    count: usize,
    mean: f64,
    median: f64,
    std: Option<f64>,
    min: f64,
    max: f64,
    sum: f64,
    low_score_pct: Option<f64>,
    risk_band: Option<RiskBand>,
}

/// Writes the attendant ranking to a CSV file, replacing any existing file.
pub fn write_ranking_csv(path: &Path, report: &Report) -> Result<()> {
    debug!(path = %path.display(), rows = report.by_attendant.len(), "Writing ranking CSV");

    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    for r in &report.by_attendant {
        let rec = report
            .recommendations
            .iter()
            .find(|rec| rec.attendant == r.item.key);
        let s = &r.item.stats;
        writer.serialize(RankingRow {
            rank: r.rank,
            attendant: &r.item.key,
            count: s.count,
            mean: s.mean,
            median: s.median,
            std: s.std,
            min: s.min,
            max: s.max,
            sum: s.sum,
            low_score_pct: rec.map(|rec| round2(rec.percentage)),
            risk_band: rec.map(|rec| rec.band),
        })?;
    }
    writer.flush()?;

    info!(path = %path.display(), "Ranking CSV written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::aggregate::aggregate;
    use crate::analyzers::analyzer::analyze;
    use crate::analyzers::rank::{Direction, rank_groups};
    use crate::loader::{Response, ResponseTable};
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(name)
    }

    fn sample_table() -> ResponseTable {
        ResponseTable::new(
            vec!["attendant".into(), "contact type".into(), "opportunity".into(), "csat".into()],
            vec![
                Response::new("A", "chat", Some("billing"), Some(2.0)),
                Response::new("A", "phone", None, Some(4.0)),
                Response::new("A", "chat", Some("delay"), Some(5.0)),
                Response::new("B", "chat", Some("billing"), Some(1.0)),
                Response::new("B", "email", None, Some(2.0)),
                Response::new("C", "phone", Some("delay"), Some(4.0)),
            ],
        )
    }

    #[test]
    fn test_report_is_deterministic() {
        let table = sample_table();
        let first = format_report(&analyze(&table));
        let second = format_report(&analyze(&table));
        assert_eq!(first, second);
    }

    #[test]
    fn test_report_sections_and_values() {
        let text = format_report(&analyze(&sample_table()));

        assert_eq!(text.lines().filter(|l| *l == "=".repeat(80)).count(), 22);
        assert!(text.contains("MEAN CSAT BY ATTENDANT"));
        assert!(text.contains("3.67"));
        assert!(text.contains("33.33%"));
        assert!(text.contains("100.00%"));
        assert!(text.contains("(2 scored records without an opportunity)"));
        // C has one record, so no std.
        assert!(text.contains("n/a"));
    }

    #[test]
    fn test_format_summary() {
        let ranked = rank_groups(
            aggregate(&sample_table(), GroupBy::ContactType),
            Metric::Count,
            Direction::Descending,
        );
        let text = format_summary(GroupBy::ContactType, Metric::Count, &ranked);
        let first_row = text.lines().nth(4).unwrap();
        assert!(first_row.contains("chat"));
    }

    #[test]
    fn test_write_ranking_csv() {
        let path = temp_path("csat_report_test_ranking.csv");
        let _ = fs::remove_file(&path);

        write_ranking_csv(&path, &analyze(&sample_table())).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("rank,attendant"));
        assert!(lines[1].starts_with("1,C,1,"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_json() {
        let path = temp_path("csat_report_test_report.json");
        let _ = fs::remove_file(&path);

        write_json(&path, &analyze(&sample_table())).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["dataset"]["total_records"], 6);
        assert_eq!(value["by_attendant"][0]["key"], "C");
        assert_eq!(value["by_attendant"][0]["rank"], 1);

        fs::remove_file(&path).unwrap();
    }
}
