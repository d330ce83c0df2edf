use tracing::{debug, info};

use crate::error::GradeError;
use crate::models::{AssignmentRecord, NormalizedRecord};

/// Percents that teachers enter from the standard band menu.
pub const CANONICAL_PERCENTS: [f64; 7] = [100.0, 95.0, 85.0, 75.0, 65.0, 50.0, 45.0];

/// Legacy raw-score codes and the fraction each one stands for.
pub const CORRECTIONS: [(&str, f64); 5] = [
    ("9!", 0.50),
    ("3!!", 0.85),
    ("1", 0.65),
    ("41", 0.95),
    ("21", 0.75),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentClass {
    Canonical(f64),
    /// A zero percent is recorded as the 50 band, not as a zero score.
    Zero,
    InRange(f64),
    /// Missing or outside (45, 100); the raw score code decides.
    Unresolved,
}

pub fn classify(percent: Option<f64>) -> PercentClass {
    let Some(percent) = percent else {
        return PercentClass::Unresolved;
    };

    if CANONICAL_PERCENTS.contains(&percent) {
        PercentClass::Canonical(percent)
    } else if percent == 0.0 {
        PercentClass::Zero
    } else if percent > 45.0 && percent < 100.0 {
        PercentClass::InRange(percent)
    } else {
        PercentClass::Unresolved
    }
}

pub fn correction(raw_score: &str) -> Option<f64> {
    CORRECTIONS
        .iter()
        .find(|(code, _)| *code == raw_score.trim())
        .map(|(_, fraction)| *fraction)
}

/// Maps a record's percent (or, failing that, its raw score code) to a fraction in [0, 1].
pub fn fraction(percent: Option<f64>, raw_score: &str) -> Option<f64> {
    match classify(percent) {
        PercentClass::Canonical(value) | PercentClass::InRange(value) => Some(value / 100.0),
        PercentClass::Zero => Some(0.5),
        PercentClass::Unresolved => correction(raw_score),
    }
}

pub fn normalize_record(record: &AssignmentRecord) -> Result<NormalizedRecord, GradeError> {
    let fraction =
        fraction(record.percent, &record.raw_score).ok_or_else(|| GradeError::Normalization {
            key: record.student_key(),
            assignment: record.assignment.clone(),
            raw_score: record.raw_score.clone(),
            percent: record
                .percent
                .map(|p| p.to_string())
                .unwrap_or_else(|| "missing".to_string()),
        })?;

    if classify(record.percent) == PercentClass::Unresolved {
        debug!(
            student = %record.student_id,
            assignment = %record.assignment,
            raw_score = %record.raw_score,
            fraction,
            "percent corrected from raw score code"
        );
    }

    Ok(NormalizedRecord {
        record: record.clone(),
        fraction,
        adjusted_worth_points: record.worth_points,
    })
}

/// Fails on the first record no rule can place.
pub fn normalize_all(records: &[AssignmentRecord]) -> Result<Vec<NormalizedRecord>, GradeError> {
    let normalized = records
        .iter()
        .map(normalize_record)
        .collect::<Result<Vec<_>, _>>()?;
    info!(records = normalized.len(), "normalized percents");
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(percent: Option<f64>, raw_score: &str) -> AssignmentRecord {
        AssignmentRecord {
            student_id: "1001".to_string(),
            term: "S1-MP1".to_string(),
            teacher: "Rivera".to_string(),
            course: "MATH".to_string(),
            section: "A".to_string(),
            assignment: "Quiz 3".to_string(),
            due_date: "2026-09-30".to_string(),
            objective: "Fractions".to_string(),
            category: String::new(),
            category_weight: 0.4,
            worth_points: 10.0,
            raw_score: raw_score.to_string(),
            percent,
        }
    }

    #[test]
    fn canonical_percents_scale_directly() {
        for percent in CANONICAL_PERCENTS {
            assert_eq!(fraction(Some(percent), "anything"), Some(percent / 100.0));
        }
    }

    #[test]
    fn zero_percent_is_the_fifty_band() {
        assert_eq!(fraction(Some(0.0), "0"), Some(0.5));
        assert_eq!(fraction(Some(0.0), "9!"), Some(0.5));
    }

    #[test]
    fn open_range_percents_scale_directly() {
        for percent in [45.5, 60.0, 72.25, 88.0, 99.9] {
            assert_eq!(fraction(Some(percent), "x"), Some(percent / 100.0));
        }
    }

    #[test]
    fn missing_percent_uses_correction_table() {
        assert_eq!(fraction(None, "9!"), Some(0.50));
        assert_eq!(fraction(None, "3!!"), Some(0.85));
        assert_eq!(fraction(None, "1"), Some(0.65));
        assert_eq!(fraction(None, "41"), Some(0.95));
        assert_eq!(fraction(None, "21"), Some(0.75));
    }

    #[test]
    fn out_of_range_percent_uses_correction_table() {
        assert_eq!(fraction(Some(110.0), "41"), Some(0.95));
        assert_eq!(fraction(Some(30.0), "1"), Some(0.65));
        assert_eq!(fraction(Some(30.0), "B+"), None);
    }

    #[test]
    fn unknown_code_is_a_normalization_error() {
        let err = normalize_record(&record(None, "B+")).unwrap_err();
        match err {
            GradeError::Normalization {
                key,
                assignment,
                raw_score,
                percent,
            } => {
                assert_eq!(key.student_id, "1001");
                assert_eq!(key.course, "MATH");
                assert_eq!(assignment, "Quiz 3");
                assert_eq!(raw_score, "B+");
                assert_eq!(percent, "missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn normalize_all_stops_at_first_failure() {
        let records = vec![record(Some(85.0), "85"), record(None, "??")];
        assert!(normalize_all(&records).is_err());
    }

    #[test]
    fn normalized_record_keeps_listed_worth_points() {
        let normalized = normalize_record(&record(Some(75.0), "75")).unwrap();
        assert_eq!(normalized.fraction, 0.75);
        assert_eq!(normalized.adjusted_worth_points, 10.0);
    }
}
