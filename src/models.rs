use std::fmt;

use serde::Serialize;

/// One student's score on one objective of one assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentRecord {
    pub student_id: String,
    pub term: String,
    pub teacher: String,
    pub course: String,
    pub section: String,
    pub assignment: String,
    pub due_date: String,
    pub objective: String,
    pub category: String,
    pub category_weight: f64,
    pub worth_points: f64,
    pub raw_score: String,
    pub percent: Option<f64>,
}

impl AssignmentRecord {
    pub fn group_key(&self) -> AssignmentGroupKey {
        AssignmentGroupKey {
            teacher: self.teacher.clone(),
            assignment: self.assignment.clone(),
            course: self.course.clone(),
            due_date: self.due_date.clone(),
        }
    }

    pub fn student_key(&self) -> StudentCourseKey {
        StudentCourseKey {
            student_id: self.student_id.clone(),
            course: self.course.clone(),
            section: self.section.clone(),
        }
    }
}

/// Identifies every objective-row of one physical assignment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssignmentGroupKey {
    pub teacher: String,
    pub assignment: String,
    pub course: String,
    pub due_date: String,
}

impl fmt::Display for AssignmentGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {} due {}",
            self.teacher, self.course, self.assignment, self.due_date
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StudentCourseKey {
    pub student_id: String,
    pub course: String,
    pub section: String,
}

impl fmt::Display for StudentCourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "student {} in {} section {}",
            self.student_id, self.course, self.section
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub record: AssignmentRecord,
    pub fraction: f64,
    pub adjusted_worth_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputedGrade {
    #[serde(rename = "StudentID")]
    pub student_id: String,
    #[serde(rename = "Course")]
    pub course: String,
    #[serde(rename = "Section")]
    pub section: String,
    #[serde(skip)]
    pub raw_mark: f64,
    #[serde(rename = "FinalMark")]
    pub final_mark: i64,
}

impl ComputedGrade {
    pub fn key(&self) -> StudentCourseKey {
        StudentCourseKey {
            student_id: self.student_id.clone(),
            course: self.course.clone(),
            section: self.section.clone(),
        }
    }
}

/// Translates an internal course/section to the gradebook export's identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossoverEntry {
    pub course: String,
    pub section: String,
    pub external_course: String,
    pub external_section: String,
}

/// A mark as entered by a person: usually a number, sometimes a placeholder like "INC".
#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    Numeric(f64),
    Text(String),
}

impl Mark {
    /// Blank cells carry no mark at all.
    pub fn parse(value: &str) -> Option<Mark> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        match value.parse::<f64>() {
            Ok(number) if number.is_finite() => Some(Mark::Numeric(number)),
            _ => Some(Mark::Text(value.to_string())),
        }
    }

    /// Zero and blank text count as "nothing entered".
    pub fn is_entered(&self) -> bool {
        match self {
            Mark::Numeric(number) => *number != 0.0,
            Mark::Text(text) => !text.is_empty(),
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mark::Numeric(number) => write!(f, "{number}"),
            Mark::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalGradeRecord {
    pub student_id: String,
    pub course: String,
    pub section: String,
    pub mark: Option<Mark>,
    /// Every cell of the source row, aligned with `ExternalGradebook::headers`.
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalGradebook {
    pub headers: Vec<String>,
    pub records: Vec<ExternalGradeRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledRecord {
    pub external: ExternalGradeRecord,
    pub computed_mark: Option<i64>,
    pub reconciled_mark: Option<Mark>,
    pub source: MarkSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MarkSource {
    Override,
    Computed,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandSummary {
    pub label: &'static str,
    pub count: usize,
    pub avg_raw_mark: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_marks_from_cells() {
        assert_eq!(Mark::parse(""), None);
        assert_eq!(Mark::parse("   "), None);
        assert_eq!(Mark::parse("78"), Some(Mark::Numeric(78.0)));
        assert_eq!(Mark::parse(" 81.5 "), Some(Mark::Numeric(81.5)));
        assert_eq!(Mark::parse("INC"), Some(Mark::Text("INC".to_string())));
        assert_eq!(Mark::parse("NaN"), Some(Mark::Text("NaN".to_string())));
    }

    #[test]
    fn zero_mark_is_not_entered() {
        assert!(!Mark::Numeric(0.0).is_entered());
        assert!(Mark::Numeric(45.0).is_entered());
        assert!(Mark::Text("INC".to_string()).is_entered());
    }

    #[test]
    fn numeric_marks_display_without_trailing_zero() {
        assert_eq!(Mark::Numeric(78.0).to_string(), "78");
        assert_eq!(Mark::Text("INC".to_string()).to_string(), "INC");
    }
}
