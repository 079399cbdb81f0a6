use crate::loader::{Response, ResponseTable};
use crate::stats::GroupStats;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;

/// Statistics of the records sharing one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group<K> {
    pub key: K,
    #[serde(flatten)]
    pub stats: GroupStats,
}

/// Columns a table can be grouped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Attendant,
    ContactType,
    Opportunity,
}

impl GroupBy {
    /// Key of `record` for this column. Missing opportunities have no key.
    pub fn key_of(self, record: &Response) -> Option<String> {
        match self {
            GroupBy::Attendant => Some(record.attendant.clone()),
            GroupBy::ContactType => Some(record.contact_type.clone()),
            GroupBy::Opportunity => record.opportunity.clone(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GroupBy::Attendant => "attendant",
            GroupBy::ContactType => "contact type",
            GroupBy::Opportunity => "opportunity",
        }
    }
}

/// Groups the scored records of `table` by `key` and summarizes each group.
///
/// Groups come out in the order their key first appears in the table.
/// Records whose key is `None` are left out, as are records without a
/// score. A key seen only on unscored records yields no group.
pub fn group_by<K, F>(table: &ResponseTable, key: F) -> Vec<Group<K>>
where
    K: Eq + Hash + Clone,
    F: Fn(&Response) -> Option<K>,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut series: Vec<(K, Vec<f64>)> = Vec::new();

    for record in &table.records {
        let Some(k) = key(record) else {
            continue;
        };

        let slot = *slots.entry(k.clone()).or_insert_with(|| {
            series.push((k, Vec::new()));
            series.len() - 1
        });

        if let Some(score) = record.csat {
            series[slot].1.push(score);
        }
    }

    series
        .into_iter()
        .filter_map(|(key, scores)| {
            GroupStats::from_scores(&scores).map(|stats| Group { key, stats })
        })
        .collect()
}

/// Groups `table` on a single named column.
pub fn aggregate(table: &ResponseTable, by: GroupBy) -> Vec<Group<String>> {
    group_by(table, |r| by.key_of(r))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ResponseTable {
        ResponseTable::new(
            vec![],
            vec![
                Response::new("A", "chat", Some("billing"), Some(2.0)),
                Response::new("B", "phone", None, Some(1.0)),
                Response::new("A", "phone", Some("delay"), Some(4.0)),
                Response::new("B", "chat", Some("billing"), Some(2.0)),
                Response::new("A", "chat", None, Some(5.0)),
                Response::new("D", "chat", None, None),
                Response::new("A", "email", Some("billing"), None),
            ],
        )
    }

    #[test]
    fn test_group_by_attendant() {
        let groups = aggregate(&sample_table(), GroupBy::Attendant);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "A");
        assert_eq!(groups[0].stats.count, 3);
        assert!((groups[0].stats.mean - 11.0 / 3.0).abs() < 1e-12);
        assert_eq!(groups[0].stats.min, 2.0);
        assert_eq!(groups[0].stats.max, 5.0);
        assert_eq!(groups[1].key, "B");
        assert_eq!(groups[1].stats.count, 2);
        assert_eq!(groups[1].stats.mean, 1.5);
    }

    #[test]
    fn test_groups_keep_first_appearance_order() {
        let keys: Vec<_> = aggregate(&sample_table(), GroupBy::ContactType)
            .into_iter()
            .map(|g| g.key)
            .collect();
        assert_eq!(keys, vec!["chat", "phone"]);
    }

    #[test]
    fn test_counts_sum_to_scored_records() {
        let table = sample_table();
        for by in [GroupBy::Attendant, GroupBy::ContactType] {
            let total: usize = aggregate(&table, by).iter().map(|g| g.stats.count).sum();
            assert_eq!(total, table.scored_len());
        }
    }

    #[test]
    fn test_missing_opportunity_is_not_grouped() {
        let groups = aggregate(&sample_table(), GroupBy::Opportunity);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "billing");
        assert_eq!(groups[0].stats.count, 2);
        assert_eq!(groups[1].key, "delay");
    }

    #[test]
    fn test_mean_within_min_and_max() {
        for group in aggregate(&sample_table(), GroupBy::Attendant) {
            assert!(group.stats.min <= group.stats.mean);
            assert!(group.stats.mean <= group.stats.max);
        }
    }

    #[test]
    fn test_composite_key() {
        let groups = group_by(&sample_table(), |r| {
            Some((r.attendant.clone(), r.contact_type.clone()))
        });
        assert_eq!(groups[0].key, ("A".to_string(), "chat".to_string()));
        assert_eq!(groups[0].stats.count, 2);
        assert_eq!(groups.len(), 4);
    }
}
