use crate::analyzers::crosstab::ContactExtremes;
use crate::analyzers::probability::LowScoreRate;
use serde::Serialize;
use std::fmt;

/// Risk band of an attendant, from their low-score percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    High,
    Medium,
    Low,
}

impl RiskBand {
    pub const ALL: [RiskBand; 3] = [RiskBand::High, RiskBand::Medium, RiskBand::Low];
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskBand::High => "high",
            RiskBand::Medium => "medium",
            RiskBand::Low => "low",
        };
        f.write_str(label)
    }
}

/// Converts an unrounded low-score percentage (0–100) into a risk band.
///
/// | Range         | Band   |
/// |---------------|--------|
/// | > 30          | high   |
/// | 20 ..= 30     | medium |
/// | < 20          | low    |
pub fn risk_band(percentage: f64) -> RiskBand {
    match percentage {
        p if p > 30.0 => RiskBand::High,
        p if p >= 20.0 => RiskBand::Medium,
        _ => RiskBand::Low,
    }
}

/// Risk classification of one attendant with a suggested focus area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub attendant: String,
    pub band: RiskBand,
    pub percentage: f64,
    /// The attendant's worst contact type, when known.
    pub focus_contact_type: Option<String>,
}

pub fn recommend(rates: &[LowScoreRate], extremes: &[ContactExtremes]) -> Vec<Recommendation> {
    rates
        .iter()
        .map(|rate| Recommendation {
            attendant: rate.attendant.clone(),
            band: risk_band(rate.percentage),
            percentage: rate.percentage,
            focus_contact_type: extremes
                .iter()
                .find(|e| e.attendant == rate.attendant)
                .map(|e| e.worst.contact_type.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::crosstab::ContactPick;
    use crate::analyzers::probability::low_score_rates;
    use crate::loader::{Response, ResponseTable};
    use crate::stats::round2;

    fn pick(contact_type: &str, mean: f64) -> ContactPick {
        ContactPick {
            contact_type: contact_type.to_string(),
            mean,
            count: 1,
        }
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(risk_band(100.0), RiskBand::High);
        assert_eq!(risk_band(30.01), RiskBand::High);
        assert_eq!(risk_band(30.0), RiskBand::Medium);
        assert_eq!(risk_band(20.0), RiskBand::Medium);
        assert_eq!(risk_band(19.99), RiskBand::Low);
        assert_eq!(risk_band(0.0), RiskBand::Low);
    }

    #[test]
    fn test_band_uses_unrounded_rate() {
        let mut records = vec![Response::new("A", "chat", None, Some(1.0)); 6001];
        records.extend(vec![Response::new("A", "chat", None, Some(5.0)); 14000]);
        let rates = low_score_rates(&ResponseTable::new(vec![], records));

        // 6001 / 20001 displays as 30.00 but lies above the cut point.
        assert_eq!(round2(rates[0].percentage), 30.0);
        assert!(rates[0].percentage > 30.0);

        let recs = recommend(&rates, &[]);
        assert_eq!(recs[0].band, RiskBand::High);
    }

    #[test]
    fn test_recommend_attaches_worst_type() {
        let rates = vec![
            LowScoreRate {
                attendant: "A".into(),
                total: 3,
                below: 1,
                percentage: 33.33,
            },
            LowScoreRate {
                attendant: "C".into(),
                total: 1,
                below: 0,
                percentage: 0.0,
            },
        ];
        let extremes = vec![ContactExtremes {
            attendant: "A".into(),
            best: pick("chat", 5.0),
            worst: pick("phone", 2.0),
        }];

        let recs = recommend(&rates, &extremes);
        assert_eq!(recs[0].band, RiskBand::High);
        assert_eq!(recs[0].focus_contact_type.as_deref(), Some("phone"));
        assert_eq!(recs[1].band, RiskBand::Low);
        assert_eq!(recs[1].focus_contact_type, None);
    }
}
