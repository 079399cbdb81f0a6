use crate::analyzers::aggregate::{Group, GroupBy, aggregate};
use crate::analyzers::crosstab::{contact_extremes, cross_tabulate};
use crate::analyzers::probability::low_score_rates;
use crate::analyzers::rank::{Direction, rank_by, rank_groups};
use crate::analyzers::risk::{RiskBand, recommend};
use crate::analyzers::types::{ChartKind, ChartSpec, DatasetInfo, Report, ScoreBucket};
use crate::loader::ResponseTable;
use crate::stats::{GroupStats, Metric};
use chrono::Utc;
use tracing::{debug, info};

const PREVIEW_ROWS: usize = 5;
const CSAT_AXIS_MAX: f64 = 5.5;

/// Runs every analysis over `table`.
#[tracing::instrument(skip(table), fields(records = table.len()))]
pub fn analyze(table: &ResponseTable) -> Report {
    let scores: Vec<f64> = table.scored().map(|(_, s)| s).collect();
    let overall = GroupStats::from_scores(&scores);

    let by_attendant = rank_groups(
        aggregate(table, GroupBy::Attendant),
        Metric::Mean,
        Direction::Descending,
    );
    debug!(groups = by_attendant.len(), "Attendant ranking built");

    let by_contact_type = aggregate(table, GroupBy::ContactType);
    let by_opportunity = aggregate(table, GroupBy::Opportunity);
    let missing_opportunity = table
        .scored()
        .filter(|(r, _)| r.opportunity.is_none())
        .count();

    let dispersion = rank_groups(
        aggregate(table, GroupBy::Attendant),
        Metric::Std,
        Direction::Ascending,
    );

    let crosstab = cross_tabulate(table);
    let extremes = contact_extremes(&crosstab);
    debug!(cells = crosstab.cells.len(), "Cross-tab built");

    let rates = low_score_rates(table);
    let recommendations = recommend(&rates, &extremes);
    let low_scores = rank_by(rates, |r| Some(r.percentage), Direction::Descending);

    info!(
        attendants = by_attendant.len(),
        contact_types = by_contact_type.len(),
        opportunities = by_opportunity.len(),
        "Analysis complete"
    );

    Report {
        generated_at: Utc::now(),
        dataset: DatasetInfo {
            total_records: table.len(),
            scored_records: scores.len(),
            columns: table.columns.clone(),
            preview: table.records.iter().take(PREVIEW_ROWS).cloned().collect(),
        },
        overall,
        by_attendant,
        by_contact_type,
        by_opportunity,
        missing_opportunity,
        dispersion,
        score_distribution: score_distribution(&scores),
        crosstab,
        extremes,
        low_scores,
        recommendations,
    }
}

/// Counts scores per rounded value 1..=5. Out-of-range scores are not counted.
pub fn score_distribution(scores: &[f64]) -> Vec<ScoreBucket> {
    (1u8..=5)
        .map(|score| ScoreBucket {
            score,
            count: scores
                .iter()
                .filter(|s| s.round() == f64::from(score))
                .count(),
        })
        .collect()
}

/// Describes the nine report charts.
pub fn chart_specs(report: &Report) -> Vec<ChartSpec> {
    let attendants: Vec<_> = report.by_attendant.iter().map(|r| r.item.clone()).collect();
    let max_count = attendants
        .iter()
        .map(|g| g.stats.count)
        .max()
        .unwrap_or(0);

    let distribution_max = report
        .score_distribution
        .iter()
        .map(|b| b.count)
        .max()
        .unwrap_or(0);

    let heatmap_cells = report
        .crosstab
        .attendants
        .iter()
        .map(|a| {
            report
                .crosstab
                .contact_types
                .iter()
                .map(|c| report.crosstab.get(a, c).map(|cell| cell.mean))
                .collect()
        })
        .collect();

    let band_counts = RiskBand::ALL
        .iter()
        .map(|band| {
            report
                .recommendations
                .iter()
                .filter(|r| r.band == *band)
                .count() as f64
        })
        .collect::<Vec<_>>();

    vec![
        ChartSpec {
            file_name: "01_mean_csat_by_attendant.png",
            title: "Mean CSAT by attendant".into(),
            x_label: "Attendant".into(),
            y_label: "Mean CSAT".into(),
            y_max: CSAT_AXIS_MAX,
            kind: ChartKind::Bars {
                labels: labels_of(&attendants),
                values: means_of(&attendants),
                guides: report.overall.as_ref().map(|o| vec![o.mean]).unwrap_or_default(),
            },
        },
        ChartSpec {
            file_name: "02_evaluations_by_attendant.png",
            title: "Evaluations by attendant".into(),
            x_label: "Attendant".into(),
            y_label: "Evaluations".into(),
            y_max: headroom(max_count as f64),
            kind: ChartKind::Bars {
                labels: labels_of(&attendants),
                values: attendants.iter().map(|g| g.stats.count as f64).collect(),
                guides: vec![],
            },
        },
        ChartSpec {
            file_name: "03_mean_csat_by_contact_type.png",
            title: "Mean CSAT by contact type".into(),
            x_label: "Contact type".into(),
            y_label: "Mean CSAT".into(),
            y_max: CSAT_AXIS_MAX,
            kind: ChartKind::Bars {
                labels: labels_of(&report.by_contact_type),
                values: means_of(&report.by_contact_type),
                guides: vec![],
            },
        },
        ChartSpec {
            file_name: "04_mean_csat_by_opportunity.png",
            title: "Mean CSAT by opportunity".into(),
            x_label: "Opportunity".into(),
            y_label: "Mean CSAT".into(),
            y_max: CSAT_AXIS_MAX,
            kind: ChartKind::Bars {
                labels: labels_of(&report.by_opportunity),
                values: means_of(&report.by_opportunity),
                guides: vec![],
            },
        },
        ChartSpec {
            file_name: "05_csat_distribution.png",
            title: "CSAT distribution".into(),
            x_label: "Score".into(),
            y_label: "Evaluations".into(),
            y_max: headroom(distribution_max as f64),
            kind: ChartKind::Bars {
                labels: report
                    .score_distribution
                    .iter()
                    .map(|b| b.score.to_string())
                    .collect(),
                values: report
                    .score_distribution
                    .iter()
                    .map(|b| b.count as f64)
                    .collect(),
                guides: vec![],
            },
        },
        ChartSpec {
            file_name: "06_csat_heatmap.png",
            title: "Mean CSAT by attendant and contact type".into(),
            x_label: "Contact type".into(),
            y_label: "Attendant".into(),
            y_max: 5.0,
            kind: ChartKind::Heatmap {
                rows: report.crosstab.attendants.clone(),
                columns: report.crosstab.contact_types.clone(),
                cells: heatmap_cells,
            },
        },
        ChartSpec {
            file_name: "07_best_worst_contact_type.png",
            title: "Best and worst contact type per attendant".into(),
            x_label: "Attendant".into(),
            y_label: "Mean CSAT".into(),
            y_max: CSAT_AXIS_MAX,
            kind: ChartKind::GroupedBars {
                labels: report.extremes.iter().map(|e| e.attendant.clone()).collect(),
                series: vec![
                    (
                        "best".to_string(),
                        report.extremes.iter().map(|e| e.best.mean).collect(),
                    ),
                    (
                        "worst".to_string(),
                        report.extremes.iter().map(|e| e.worst.mean).collect(),
                    ),
                ],
            },
        },
        ChartSpec {
            file_name: "08_low_score_probability.png",
            title: "Probability of a score below 3".into(),
            x_label: "Attendant".into(),
            y_label: "Low scores (%)".into(),
            y_max: 105.0,
            kind: ChartKind::Bars {
                labels: report
                    .low_scores
                    .iter()
                    .map(|r| r.item.attendant.clone())
                    .collect(),
                values: report.low_scores.iter().map(|r| r.item.percentage).collect(),
                guides: vec![20.0, 30.0],
            },
        },
        ChartSpec {
            file_name: "09_risk_bands.png",
            title: "Attendants per risk band".into(),
            x_label: "Risk band".into(),
            y_label: "Attendants".into(),
            y_max: headroom(band_counts.iter().copied().fold(0.0, f64::max)),
            kind: ChartKind::Bars {
                labels: RiskBand::ALL.iter().map(|b| b.to_string()).collect(),
                values: band_counts,
                guides: vec![],
            },
        },
    ]
}

fn labels_of(groups: &[Group<String>]) -> Vec<String> {
    groups.iter().map(|g| g.key.clone()).collect()
}

fn means_of(groups: &[Group<String>]) -> Vec<f64> {
    groups.iter().map(|g| g.stats.mean).collect()
}

fn headroom(max: f64) -> f64 {
    (max * 1.1).max(1.0)
}
