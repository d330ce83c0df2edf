use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::GradeError;
use crate::models::{AssignmentGroupKey, NormalizedRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveStats {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub objectives_count: usize,
}

impl ObjectiveStats {
    /// Rows with a blank objective do not count as an objective.
    pub fn from_records<'a>(
        key: &AssignmentGroupKey,
        records: impl IntoIterator<Item = &'a NormalizedRecord>,
    ) -> ObjectiveStats {
        let mut worth_by_objective: BTreeMap<&str, f64> = BTreeMap::new();
        let mut inconsistent = false;

        for normalized in records {
            let objective = normalized.record.objective.trim();
            if objective.is_empty() {
                continue;
            }
            let worth = normalized.record.worth_points;
            worth_by_objective
                .entry(objective)
                .and_modify(|existing| {
                    if *existing != worth {
                        inconsistent = true;
                        *existing = existing.max(worth);
                    }
                })
                .or_insert(worth);
        }

        if inconsistent {
            warn!(group = %key, "objective listed with different worth points; using the largest");
        }

        let values: Vec<f64> = worth_by_objective.into_values().collect();
        ObjectiveStats {
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            sum: values.iter().sum(),
            objectives_count: values.len(),
        }
    }

    pub fn adjust(&self, worth_points: f64) -> f64 {
        if self.objectives_count == 0 {
            worth_points
        } else if self.max == self.min {
            worth_points / self.objectives_count as f64
        } else {
            worth_points / self.sum
        }
    }
}

/// Rescales each row's worth points by its assignment's objective layout.
///
/// A rescaled weight that is negative or not finite (objective worths that
/// cancel out, for instance) aborts the run.
pub fn redistribute(records: &[NormalizedRecord]) -> Result<Vec<NormalizedRecord>, GradeError> {
    let mut groups: BTreeMap<AssignmentGroupKey, Vec<&NormalizedRecord>> = BTreeMap::new();
    for normalized in records {
        groups
            .entry(normalized.record.group_key())
            .or_default()
            .push(normalized);
    }

    let stats: BTreeMap<AssignmentGroupKey, ObjectiveStats> = groups
        .iter()
        .map(|(key, rows)| {
            let stats = ObjectiveStats::from_records(key, rows.iter().copied());
            (key.clone(), stats)
        })
        .collect();

    debug!(groups = stats.len(), "computed objective stats");

    records
        .iter()
        .map(|normalized| {
            let group = normalized.record.group_key();
            let worth_points = normalized.record.worth_points;
            let adjusted = stats
                .get(&group)
                .map(|s| s.adjust(worth_points))
                .unwrap_or(worth_points);
            if !adjusted.is_finite() || adjusted < 0.0 {
                return Err(GradeError::Redistribution {
                    group,
                    objective: normalized.record.objective.clone(),
                    adjusted,
                });
            }
            Ok(NormalizedRecord {
                adjusted_worth_points: adjusted,
                ..normalized.clone()
            })
        })
        .collect()
}
