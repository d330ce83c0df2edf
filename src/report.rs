use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::config::RunConfig;
use crate::models::{BandSummary, ComputedGrade, Mark, MarkSource};
use crate::pipeline::GradeRun;
use crate::reconcile::Reconciliation;

const BANDS: [(&str, i64, i64); 6] = [
    ("45 (below 50)", 45, 45),
    ("55 (50-64)", 55, 55),
    ("65-69", 65, 69),
    ("70-79", 70, 79),
    ("80-89", 80, 89),
    ("90-100", 90, 100),
];

pub fn summarize_bands(grades: &[ComputedGrade]) -> Vec<BandSummary> {
    BANDS
        .iter()
        .map(|&(label, low, high)| {
            let members: Vec<&ComputedGrade> = grades
                .iter()
                .filter(|g| g.final_mark >= low && g.final_mark <= high)
                .collect();
            let count = members.len();
            BandSummary {
                label,
                count,
                avg_raw_mark: if count == 0 {
                    0.0
                } else {
                    members.iter().map(|g| g.raw_mark).sum::<f64>() / count as f64
                },
            }
        })
        .collect()
}

pub fn build_report(
    config: &RunConfig,
    run: &GradeRun,
    reconciliation: &Reconciliation,
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();
    let terms: Vec<&str> = config.terms.iter().map(String::as_str).collect();

    let _ = writeln!(output, "# Gradebook Reconciliation Report");
    let _ = writeln!(
        output,
        "Generated {} for {} ({:?} aggregation)",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        terms.join(", "),
        config.strategy
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Computed Marks");
    let _ = writeln!(
        output,
        "{} assignment rows loaded, {} eligible, {} student sections graded.",
        run.loaded,
        run.eligible,
        run.grades.len()
    );

    if run.grades.is_empty() {
        let _ = writeln!(output, "No marks computed for these terms.");
    } else {
        for summary in summarize_bands(&run.grades) {
            if summary.count == 0 {
                continue;
            }
            let _ = writeln!(
                output,
                "- {}: {} students (avg unbanded {:.1})",
                summary.label, summary.count, summary.avg_raw_mark
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Reconciliation");
    let _ = writeln!(
        output,
        "- {} gradebook rows: {} teacher overrides, {} computed, {} without a mark",
        reconciliation.records.len(),
        reconciliation.count(MarkSource::Override),
        reconciliation.count(MarkSource::Computed),
        reconciliation.count(MarkSource::Unresolved)
    );
    if reconciliation.unmapped > 0 {
        let _ = writeln!(
            output,
            "- {} computed marks had no crossover entry",
            reconciliation.unmapped
        );
    }

    let mut disagreements: Vec<(&str, &str, &str, i64, f64)> = reconciliation
        .records
        .iter()
        .filter(|r| r.source == MarkSource::Override)
        .filter_map(|r| match (&r.reconciled_mark, r.computed_mark) {
            (Some(Mark::Numeric(entered)), Some(computed)) if *entered != computed as f64 => {
                Some((
                    r.external.student_id.as_str(),
                    r.external.course.as_str(),
                    r.external.section.as_str(),
                    computed,
                    *entered,
                ))
            }
            _ => None,
        })
        .collect();
    disagreements.sort_by(|a, b| {
        let gap_a = (a.4 - a.3 as f64).abs();
        let gap_b = (b.4 - b.3 as f64).abs();
        gap_b
            .partial_cmp(&gap_a)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let _ = writeln!(output);
    let _ = writeln!(output, "## Largest Override Gaps");
    if disagreements.is_empty() {
        let _ = writeln!(output, "No overrides differ from the computed mark.");
    } else {
        for (student, course, section, computed, entered) in disagreements.iter().take(10) {
            let _ = writeln!(
                output,
                "- {student} in {course}/{section}: entered {entered}, computed {computed}"
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AggregationStrategy;
    use crate::models::{ExternalGradeRecord, ReconciledRecord};
    use chrono::TimeZone;

    fn grade(student: &str, raw_mark: f64, final_mark: i64) -> ComputedGrade {
        ComputedGrade {
            student_id: student.to_string(),
            course: "MATH".to_string(),
            section: "A".to_string(),
            raw_mark,
            final_mark,
        }
    }

    fn reconciled(
        student: &str,
        computed: Option<i64>,
        mark: Option<Mark>,
        source: MarkSource,
    ) -> ReconciledRecord {
        ReconciledRecord {
            external: ExternalGradeRecord {
                student_id: student.to_string(),
                course: "M101".to_string(),
                section: "01".to_string(),
                mark: mark.clone(),
                values: Vec::new(),
            },
            computed_mark: computed,
            reconciled_mark: mark,
            source,
        }
    }

    #[test]
    fn bands_group_final_marks() {
        let grades = vec![
            grade("1", 31.0, 45),
            grade("2", 58.0, 55),
            grade("3", 84.6, 85),
            grade("4", 88.0, 88),
        ];
        let summaries = summarize_bands(&grades);
        let counts: Vec<usize> = summaries.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![1, 1, 0, 0, 2, 0]);
        assert!((summaries[4].avg_raw_mark - 86.3).abs() < 1e-9);
    }

    #[test]
    fn report_lists_bands_and_override_gaps() {
        let config = RunConfig {
            terms: ["S1-MP1".to_string()].into_iter().collect(),
            strategy: AggregationStrategy::Redistributed,
        };
        let run = GradeRun {
            loaded: 12,
            eligible: 9,
            grades: vec![grade("1", 84.6, 85), grade("2", 71.0, 71)],
        };
        let reconciliation = Reconciliation {
            records: vec![
                reconciled("1", Some(85), Some(Mark::Numeric(85.0)), MarkSource::Computed),
                reconciled("2", Some(71), Some(Mark::Numeric(90.0)), MarkSource::Override),
                reconciled("3", None, None, MarkSource::Unresolved),
            ],
            unmapped: 1,
        };
        let generated_at = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();

        let report = build_report(&config, &run, &reconciliation, generated_at);
        assert!(report.contains("Generated 2026-10-16 09:30 UTC for S1-MP1 (Redistributed aggregation)"));
        assert!(report.contains("12 assignment rows loaded, 9 eligible, 2 student sections graded."));
        assert!(report.contains("- 70-79: 1 students"));
        assert!(report.contains("3 gradebook rows: 1 teacher overrides, 1 computed, 1 without a mark"));
        assert!(report.contains("1 computed marks had no crossover entry"));
        assert!(report.contains("- 2 in M101/01: entered 90, computed 71"));
    }

    #[test]
    fn empty_run_says_so() {
        let config = RunConfig {
            terms: ["S1-MP2".to_string()].into_iter().collect(),
            strategy: AggregationStrategy::Flat,
        };
        let run = GradeRun {
            loaded: 0,
            eligible: 0,
            grades: Vec::new(),
        };
        let reconciliation = Reconciliation {
            records: Vec::new(),
            unmapped: 0,
        };
        let report = build_report(&config, &run, &reconciliation, Utc::now());
        assert!(report.contains("No marks computed for these terms."));
        assert!(report.contains("No overrides differ from the computed mark."));
    }
}
