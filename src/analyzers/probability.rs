use crate::loader::{Response, ResponseTable};
use crate::stats::pct;
use serde::Serialize;

/// Scores strictly below this are low scores.
pub const LOW_SCORE_THRESHOLD: f64 = 3.0;

pub fn is_low_score(score: f64) -> bool {
    score < LOW_SCORE_THRESHOLD
}

/// A scored record paired with its low-score flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlaggedResponse<'a> {
    pub record: &'a Response,
    pub score: f64,
    pub low: bool,
}

/// Flags every scored record of `table`, leaving the table untouched.
pub fn flag_low_scores(table: &ResponseTable) -> Vec<FlaggedResponse<'_>> {
    table
        .scored()
        .map(|(record, score)| FlaggedResponse {
            record,
            score,
            low: is_low_score(score),
        })
        .collect()
}

/// Empirical low-score rate of one attendant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowScoreRate {
    pub attendant: String,
    pub total: usize,
    pub below: usize,
    /// `100 * below / total` at full precision. Round only for display.
    pub percentage: f64,
}

/// Computes the low-score rate of each attendant with at least one scored
/// record, in first-appearance order.
pub fn low_score_rates(table: &ResponseTable) -> Vec<LowScoreRate> {
    let mut rates: Vec<LowScoreRate> = Vec::new();

    for flagged in flag_low_scores(table) {
        let attendant = &flagged.record.attendant;
        let idx = match rates.iter().position(|r| &r.attendant == attendant) {
            Some(i) => i,
            None => {
                rates.push(LowScoreRate {
                    attendant: attendant.clone(),
                    total: 0,
                    below: 0,
                    percentage: 0.0,
                });
                rates.len() - 1
            }
        };

        let rate = &mut rates[idx];
        rate.total += 1;
        if flagged.low {
            rate.below += 1;
        }
    }

    for rate in &mut rates {
        rate.percentage = pct(rate.below, rate.total);
    }

    rates
}
