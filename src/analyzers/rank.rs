use crate::analyzers::aggregate::Group;
use crate::stats::Metric;
use serde::Serialize;
use std::cmp::Ordering;

/// Sort direction for a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
}

/// An item with its 1-based position in a ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked<T> {
    pub rank: usize,
    #[serde(flatten)]
    pub item: T,
}

/// Sorts `items` by `value` and numbers them from 1.
///
/// The sort is stable, so equal values keep their input order. Items whose
/// value is undefined go last whatever the direction.
pub fn rank_by<T, F>(mut items: Vec<T>, value: F, direction: Direction) -> Vec<Ranked<T>>
where
    F: Fn(&T) -> Option<f64>,
{
    items.sort_by(|a, b| match (value(a), value(b)) {
        (Some(x), Some(y)) => match direction {
            Direction::Ascending => x.total_cmp(&y),
            Direction::Descending => y.total_cmp(&x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| Ranked { rank: i + 1, item })
        .collect()
}

/// Ranks aggregate groups on one of their statistics.
pub fn rank_groups<K>(
    groups: Vec<Group<K>>,
    metric: Metric,
    direction: Direction,
) -> Vec<Ranked<Group<K>>> {
    rank_by(groups, |g| g.stats.metric(metric), direction)
}
