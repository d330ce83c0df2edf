use thiserror::Error;

use crate::models::{AssignmentGroupKey, StudentCourseKey};

/// Data-integrity failures that abort a grading run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradeError {
    #[error(
        "cannot normalize score for {key}, assignment '{assignment}': raw score '{raw_score}' with percent {percent} has no correction"
    )]
    Normalization {
        key: StudentCourseKey,
        assignment: String,
        raw_score: String,
        percent: String,
    },

    #[error(
        "worth points for {group}, objective '{objective}' rescale to {adjusted}, which is not a usable weight"
    )]
    Redistribution {
        group: AssignmentGroupKey,
        objective: String,
        adjusted: f64,
    },

    #[error("category '{category}' (weight {weight}) for {key} has no usable total weight")]
    AggregationInvariant {
        key: StudentCourseKey,
        category: String,
        weight: f64,
    },
}

/// Failures reading or writing the gradebook tables.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{path}: missing column '{column}'")]
    MissingColumn { path: String, column: String },

    #[error("{path} line {line}: field '{field}' is not a number: '{value}'")]
    BadNumber {
        path: String,
        line: u64,
        field: String,
        value: String,
    },

    #[error("unsupported file format '{0}' (expected .csv or .xlsx)")]
    UnsupportedFormat(String),

    #[error("{path}: workbook has no worksheets")]
    EmptyWorkbook { path: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Xlsx(#[from] calamine::XlsxError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
