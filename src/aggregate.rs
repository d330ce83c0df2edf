use std::collections::BTreeMap;

use tracing::info;

use crate::config::AggregationStrategy;
use crate::error::GradeError;
use crate::models::{NormalizedRecord, StudentCourseKey};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CategoryKey {
    pub student: StudentCourseKey,
    pub category: String,
    /// Bit pattern of the category weight so the key stays `Ord`.
    weight_bits: u64,
}

impl CategoryKey {
    pub fn weight(&self) -> f64 {
        f64::from_bits(self.weight_bits)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CategoryRollup {
    pub numerator: f64,
    pub denominator: f64,
}

fn category_key(normalized: &NormalizedRecord) -> CategoryKey {
    CategoryKey {
        student: normalized.record.student_key(),
        category: normalized.record.category.trim().to_string(),
        weight_bits: normalized.record.category_weight.to_bits(),
    }
}

fn category_label(key: &CategoryKey) -> String {
    if key.category.is_empty() {
        "uncategorized".to_string()
    } else {
        key.category.clone()
    }
}

pub fn category_rollups(records: &[NormalizedRecord]) -> BTreeMap<CategoryKey, CategoryRollup> {
    let mut rollups: BTreeMap<CategoryKey, CategoryRollup> = BTreeMap::new();
    for normalized in records {
        let entry = rollups.entry(category_key(normalized)).or_default();
        entry.numerator += normalized.adjusted_worth_points * normalized.fraction;
        entry.denominator += normalized.adjusted_worth_points;
    }
    rollups
}

fn usable(total: &CategoryRollup) -> Option<f64> {
    let fraction = total.numerator / total.denominator;
    if total.denominator == 0.0 || !total.denominator.is_finite() || !fraction.is_finite() {
        None
    } else {
        Some(fraction)
    }
}

/// Folds per-student totals into fractions; an unusable total is fatal.
fn resolve_totals(
    totals: BTreeMap<StudentCourseKey, CategoryRollup>,
) -> Result<BTreeMap<StudentCourseKey, f64>, GradeError> {
    totals
        .into_iter()
        .map(|(key, total)| match usable(&total) {
            Some(fraction) => Ok((key, fraction)),
            None => Err(GradeError::AggregationInvariant {
                key,
                category: "all categories".to_string(),
                weight: total.denominator,
            }),
        })
        .collect()
}

/// Two-pass rollup: average each category, then weight the category averages.
///
/// The weighted sum is divided by the weights of the categories present, so a
/// student with no graded work yet in some category is not marked down for it.
pub fn redistributed_fractions(
    records: &[NormalizedRecord],
) -> Result<BTreeMap<StudentCourseKey, f64>, GradeError> {
    let mut totals: BTreeMap<StudentCourseKey, CategoryRollup> = BTreeMap::new();

    for (key, rollup) in category_rollups(records) {
        let Some(category_fraction) = usable(&rollup) else {
            return Err(GradeError::AggregationInvariant {
                category: category_label(&key),
                weight: key.weight(),
                key: key.student,
            });
        };
        let entry = totals.entry(key.student.clone()).or_default();
        entry.numerator += category_fraction * key.weight();
        entry.denominator += key.weight();
    }

    resolve_totals(totals)
}

/// Single-pass rollup weighting every row by category weight times worth points.
pub fn flat_fractions(
    records: &[NormalizedRecord],
) -> Result<BTreeMap<StudentCourseKey, f64>, GradeError> {
    let mut totals: BTreeMap<StudentCourseKey, CategoryRollup> = BTreeMap::new();
    for normalized in records {
        let weight = normalized.record.category_weight * normalized.record.worth_points;
        let entry = totals.entry(normalized.record.student_key()).or_default();
        entry.numerator += weight * normalized.fraction;
        entry.denominator += weight;
    }

    resolve_totals(totals)
}

pub fn final_fractions(
    records: &[NormalizedRecord],
    strategy: AggregationStrategy,
) -> Result<BTreeMap<StudentCourseKey, f64>, GradeError> {
    let finals = match strategy {
        AggregationStrategy::Redistributed => redistributed_fractions(records)?,
        AggregationStrategy::Flat => flat_fractions(records)?,
    };
    info!(
        students = finals.len(),
        strategy = ?strategy,
        "aggregated course marks"
    );
    Ok(finals)
}
