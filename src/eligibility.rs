use std::collections::BTreeSet;

use tracing::debug;

use crate::models::AssignmentRecord;

/// Raw scores meaning "not graded", "excused", or a completion checkmark.
const SKIPPED_SCORES: [&str; 4] = ["NG", "EX", "ES", "✓"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    OtherTerm,
    NoCourse,
    ZeroWorth,
    NotScored,
}

pub fn exclusion(record: &AssignmentRecord, terms: &BTreeSet<String>) -> Option<Exclusion> {
    if !terms.contains(&record.term) {
        return Some(Exclusion::OtherTerm);
    }
    if record.course.trim().is_empty() {
        return Some(Exclusion::NoCourse);
    }
    if record.worth_points == 0.0 {
        return Some(Exclusion::ZeroWorth);
    }

    let raw_score = record.raw_score.trim();
    if raw_score.is_empty()
        || SKIPPED_SCORES
            .iter()
            .any(|code| code.eq_ignore_ascii_case(raw_score))
    {
        return Some(Exclusion::NotScored);
    }

    None
}

pub fn filter_eligible(
    records: &[AssignmentRecord],
    terms: &BTreeSet<String>,
) -> Vec<AssignmentRecord> {
    let mut dropped = [0usize; 4];
    let mut kept = Vec::with_capacity(records.len());

    for record in records {
        match exclusion(record, terms) {
            None => kept.push(record.clone()),
            Some(reason) => dropped[reason as usize] += 1,
        }
    }

    debug!(
        kept = kept.len(),
        other_term = dropped[Exclusion::OtherTerm as usize],
        no_course = dropped[Exclusion::NoCourse as usize],
        zero_worth = dropped[Exclusion::ZeroWorth as usize],
        not_scored = dropped[Exclusion::NotScored as usize],
        "filtered assignment records"
    );

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms() -> BTreeSet<String> {
        ["S1-MP1".to_string()].into_iter().collect()
    }

    fn record(term: &str, course: &str, worth_points: f64, raw_score: &str) -> AssignmentRecord {
        AssignmentRecord {
            student_id: "1001".to_string(),
            term: term.to_string(),
            teacher: "Okafor".to_string(),
            course: course.to_string(),
            section: "2".to_string(),
            assignment: "Lab report".to_string(),
            due_date: "2026-10-02".to_string(),
            objective: String::new(),
            category: String::new(),
            category_weight: 0.3,
            worth_points,
            raw_score: raw_score.to_string(),
            percent: Some(85.0),
        }
    }

    #[test]
    fn keeps_scored_records_in_listed_terms() {
        assert_eq!(exclusion(&record("S1-MP1", "BIO", 10.0, "85"), &terms()), None);
        assert_eq!(exclusion(&record("S1-MP1", "BIO", 10.0, "9!"), &terms()), None);
    }

    #[test]
    fn drops_records_outside_terms() {
        assert_eq!(
            exclusion(&record("S1-MP2", "BIO", 10.0, "85"), &terms()),
            Some(Exclusion::OtherTerm)
        );
    }

    #[test]
    fn drops_blank_course_and_zero_worth() {
        assert_eq!(
            exclusion(&record("S1-MP1", "", 10.0, "85"), &terms()),
            Some(Exclusion::NoCourse)
        );
        assert_eq!(
            exclusion(&record("S1-MP1", "BIO", 0.0, "85"), &terms()),
            Some(Exclusion::ZeroWorth)
        );
    }

    #[test]
    fn drops_sentinels_in_any_case() {
        for raw in ["NG", "Ng", "ng", "EX", "Ex", "ex", "ES", "es", "", "✓"] {
            assert_eq!(
                exclusion(&record("S1-MP1", "BIO", 10.0, raw), &terms()),
                Some(Exclusion::NotScored),
                "raw score {raw:?}"
            );
        }
    }

    #[test]
    fn filtering_preserves_order_and_is_idempotent() {
        let records = vec![
            record("S1-MP1", "BIO", 10.0, "85"),
            record("S1-MP1", "BIO", 10.0, "NG"),
            record("S1-MP1", "CHEM", 5.0, "41"),
            record("S1-MP2", "BIO", 10.0, "85"),
        ];
        let once = filter_eligible(&records, &terms());
        assert_eq!(once.len(), 2);
        assert_eq!(once[0].course, "BIO");
        assert_eq!(once[1].course, "CHEM");

        let twice = filter_eligible(&once, &terms());
        assert_eq!(once, twice);
    }
}
