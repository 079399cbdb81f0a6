//! CSAT aggregation, ranking and risk classification.
//!
//! This module groups survey responses by attendant, contact type and
//! opportunity, ranks the groups, cross-tabulates attendants against
//! contact types, estimates low-score rates and sorts attendants into
//! risk bands.

pub mod aggregate;
pub mod analyzer;
pub mod crosstab;
pub mod probability;
pub mod rank;
pub mod risk;
pub mod types;
pub mod utility;
