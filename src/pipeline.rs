use tracing::{info, instrument};

use crate::aggregate::final_fractions;
use crate::banding::band;
use crate::config::{AggregationStrategy, RunConfig};
use crate::eligibility::filter_eligible;
use crate::error::GradeError;
use crate::models::{AssignmentRecord, ComputedGrade};
use crate::normalize::normalize_all;
use crate::redistribute::redistribute;

#[derive(Debug, Clone, PartialEq)]
pub struct GradeRun {
    pub loaded: usize,
    pub eligible: usize,
    pub grades: Vec<ComputedGrade>,
}

#[instrument(skip_all, fields(records = records.len(), strategy = ?config.strategy))]
pub fn compute_grades(
    records: &[AssignmentRecord],
    config: &RunConfig,
) -> Result<GradeRun, GradeError> {
    let eligible = filter_eligible(records, &config.terms);
    let normalized = normalize_all(&eligible)?;
    let weighted = match config.strategy {
        AggregationStrategy::Redistributed => redistribute(&normalized)?,
        AggregationStrategy::Flat => normalized,
    };

    let grades: Vec<ComputedGrade> = final_fractions(&weighted, config.strategy)?
        .into_iter()
        .map(|(key, fraction)| {
            let raw_mark = fraction * 100.0;
            ComputedGrade {
                student_id: key.student_id,
                course: key.course,
                section: key.section,
                raw_mark,
                final_mark: band(raw_mark),
            }
        })
        .collect();

    info!(
        loaded = records.len(),
        eligible = eligible.len(),
        grades = grades.len(),
        "computed final marks"
    );

    Ok(GradeRun {
        loaded: records.len(),
        eligible: eligible.len(),
        grades,
    })
}
