use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::banding::band_mark;
use crate::models::{
    ComputedGrade, CrossoverEntry, ExternalGradebook, Mark, MarkSource, ReconciledRecord,
    StudentCourseKey,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub records: Vec<ReconciledRecord>,
    /// Computed grades whose course/section has no crossover entry.
    pub unmapped: usize,
}

impl Reconciliation {
    pub fn count(&self, source: MarkSource) -> usize {
        self.records.iter().filter(|r| r.source == source).count()
    }
}

/// A hand-entered mark wins; otherwise the computed mark (if any) stands.
pub fn reconcile_mark(
    external: Option<&Mark>,
    computed: Option<i64>,
) -> (Option<Mark>, MarkSource) {
    match external {
        Some(mark) if mark.is_entered() => (Some(band_mark(mark)), MarkSource::Override),
        _ => match computed {
            Some(final_mark) => (Some(Mark::Numeric(final_mark as f64)), MarkSource::Computed),
            None => (None, MarkSource::Unresolved),
        },
    }
}

/// Re-keys computed grades onto the gradebook export's course and section identifiers.
pub fn map_computed(
    grades: &[ComputedGrade],
    crossover: &[CrossoverEntry],
) -> (BTreeMap<StudentCourseKey, i64>, usize) {
    let mut sections: BTreeMap<(&str, &str), (&str, &str)> = BTreeMap::new();
    for entry in crossover {
        let target = (entry.external_course.as_str(), entry.external_section.as_str());
        let kept = *sections
            .entry((entry.course.as_str(), entry.section.as_str()))
            .or_insert(target);
        if kept != target {
            warn!(
                course = %entry.course,
                section = %entry.section,
                kept = %format!("{}/{}", kept.0, kept.1),
                ignored = %format!("{}/{}", target.0, target.1),
                "crossover lists one section under several gradebook sections; keeping the first"
            );
        }
    }

    let mut sorted: Vec<&ComputedGrade> = grades.iter().collect();
    sorted.sort_by_key(|g| g.key());

    let mut mapped: BTreeMap<StudentCourseKey, i64> = BTreeMap::new();
    let mut unmapped = 0usize;

    for grade in sorted {
        let Some((course, section)) = sections.get(&(grade.course.as_str(), grade.section.as_str()))
        else {
            debug!(key = %grade.key(), "no crossover entry; skipping computed mark");
            unmapped += 1;
            continue;
        };

        let external_key = StudentCourseKey {
            student_id: grade.student_id.clone(),
            course: course.to_string(),
            section: section.to_string(),
        };

        if let Some(existing) = mapped.get(&external_key) {
            warn!(
                key = %external_key,
                kept = existing,
                dropped = grade.final_mark,
                "several sections map onto one gradebook section; keeping the first"
            );
            continue;
        }
        mapped.insert(external_key, grade.final_mark);
    }

    (mapped, unmapped)
}

pub fn reconcile(
    grades: &[ComputedGrade],
    crossover: &[CrossoverEntry],
    gradebook: &ExternalGradebook,
) -> Reconciliation {
    let (mapped, unmapped) = map_computed(grades, crossover);

    let records: Vec<ReconciledRecord> = gradebook
        .records
        .iter()
        .map(|external| {
            let key = StudentCourseKey {
                student_id: external.student_id.clone(),
                course: external.course.clone(),
                section: external.section.clone(),
            };
            let computed_mark = mapped.get(&key).copied();
            let (reconciled_mark, source) = reconcile_mark(external.mark.as_ref(), computed_mark);
            ReconciledRecord {
                external: external.clone(),
                computed_mark,
                reconciled_mark,
                source,
            }
        })
        .collect();

    let reconciliation = Reconciliation { records, unmapped };
    info!(
        rows = reconciliation.records.len(),
        overrides = reconciliation.count(MarkSource::Override),
        computed = reconciliation.count(MarkSource::Computed),
        unresolved = reconciliation.count(MarkSource::Unresolved),
        unmapped,
        "reconciled gradebook"
    );
    reconciliation
}
