//! Data types produced by the analysis pipeline.

use crate::analyzers::aggregate::Group;
use crate::analyzers::crosstab::{ContactExtremes, CrossTab};
use crate::analyzers::probability::LowScoreRate;
use crate::analyzers::rank::Ranked;
use crate::analyzers::risk::Recommendation;
use crate::loader::Response;
use crate::stats::GroupStats;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Size and shape of the input table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetInfo {
    pub total_records: usize,
    pub scored_records: usize,
    pub columns: Vec<String>,
    pub preview: Vec<Response>,
}

/// Number of records whose score rounds to `score`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBucket {
    pub score: u8,
    pub count: usize,
}

/// Every analysis over one survey table.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub dataset: DatasetInfo,
    /// `None` when no record has a score.
    pub overall: Option<GroupStats>,
    pub by_attendant: Vec<Ranked<Group<String>>>,
    pub by_contact_type: Vec<Group<String>>,
    pub by_opportunity: Vec<Group<String>>,
    /// Scored records left out of `by_opportunity`.
    pub missing_opportunity: usize,
    pub dispersion: Vec<Ranked<Group<String>>>,
    pub score_distribution: Vec<ScoreBucket>,
    pub crosstab: CrossTab,
    pub extremes: Vec<ContactExtremes>,
    pub low_scores: Vec<Ranked<LowScoreRate>>,
    pub recommendations: Vec<Recommendation>,
}

/// How a chart lays out its data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartKind {
    /// One bar per label. `guides` are horizontal reference lines.
    Bars {
        labels: Vec<String>,
        values: Vec<f64>,
        guides: Vec<f64>,
    },
    /// One cluster per label, one bar per series.
    GroupedBars {
        labels: Vec<String>,
        series: Vec<(String, Vec<f64>)>,
    },
    /// Row × column grid of optional values.
    Heatmap {
        rows: Vec<String>,
        columns: Vec<String>,
        cells: Vec<Vec<Option<f64>>>,
    },
}

/// A chart to render, decoupled from any drawing backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub file_name: &'static str,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Upper bound of the value axis.
    pub y_max: f64,
    pub kind: ChartKind,
}
