//! Mean CSAT per (attendant, contact type) pair and the extremes per attendant.

use crate::analyzers::aggregate::group_by;
use crate::loader::ResponseTable;
use serde::Serialize;

/// One populated cell of the attendant × contact type matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossCell {
    pub attendant: String,
    pub contact_type: String,
    pub mean: f64,
    pub count: usize,
}

/// Sparse attendant × contact type matrix. Pairs without scored records
/// have no cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrossTab {
    /// Row labels, in first-appearance order.
    pub attendants: Vec<String>,
    /// Column labels, in first-appearance order.
    pub contact_types: Vec<String>,
    pub cells: Vec<CrossCell>,
}

impl CrossTab {
    pub fn get(&self, attendant: &str, contact_type: &str) -> Option<&CrossCell> {
        self.cells
            .iter()
            .find(|c| c.attendant == attendant && c.contact_type == contact_type)
    }

    /// Cells of one attendant, in the order that attendant first handled each type.
    pub fn row<'a>(&'a self, attendant: &'a str) -> impl Iterator<Item = &'a CrossCell> + 'a {
        self.cells.iter().filter(move |c| c.attendant == attendant)
    }
}

/// Builds the cross-tab from the scored records of `table`.
pub fn cross_tabulate(table: &ResponseTable) -> CrossTab {
    let groups = group_by(table, |r| {
        Some((r.attendant.clone(), r.contact_type.clone()))
    });

    let mut tab = CrossTab::default();
    for group in groups {
        let (attendant, contact_type) = group.key;
        if !tab.attendants.contains(&attendant) {
            tab.attendants.push(attendant.clone());
        }
        if !tab.contact_types.contains(&contact_type) {
            tab.contact_types.push(contact_type.clone());
        }
        tab.cells.push(CrossCell {
            attendant,
            contact_type,
            mean: group.stats.mean,
            count: group.stats.count,
        });
    }

    tab
}

/// A contact type picked as an extreme for an attendant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactPick {
    pub contact_type: String,
    pub mean: f64,
    pub count: usize,
}

impl From<&CrossCell> for ContactPick {
    fn from(cell: &CrossCell) -> Self {
        ContactPick {
            contact_type: cell.contact_type.clone(),
            mean: cell.mean,
            count: cell.count,
        }
    }
}

/// Best and worst contact type of one attendant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactExtremes {
    pub attendant: String,
    pub best: ContactPick,
    pub worst: ContactPick,
}

/// Picks, per attendant, the contact types with the highest and lowest mean.
///
/// On a tie the type the attendant handled first in the table wins.
pub fn contact_extremes(tab: &CrossTab) -> Vec<ContactExtremes> {
    let mut out = Vec::with_capacity(tab.attendants.len());

    for attendant in &tab.attendants {
        let mut best: Option<&CrossCell> = None;
        let mut worst: Option<&CrossCell> = None;

        for cell in tab.row(attendant) {
            if best.is_none_or(|b| cell.mean > b.mean) {
                best = Some(cell);
            }
            if worst.is_none_or(|w| cell.mean < w.mean) {
                worst = Some(cell);
            }
        }

        if let (Some(best), Some(worst)) = (best, worst) {
            out.push(ContactExtremes {
                attendant: attendant.clone(),
                best: best.into(),
                worst: worst.into(),
            });
        }
    }

    out
}
