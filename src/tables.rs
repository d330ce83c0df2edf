use std::fs::File;
use std::io::Write;
use std::path::Path;

use calamine::{open_workbook, Reader, Xlsx};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::LoadError;
use crate::models::{
    AssignmentRecord, ComputedGrade, CrossoverEntry, ExternalGradeRecord, ExternalGradebook, Mark,
};
use crate::reconcile::Reconciliation;

fn csv_reader(path: &Path) -> Result<csv::Reader<File>, LoadError> {
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?)
}

fn parse_number(path: &Path, line: u64, field: &str, value: &str) -> Result<f64, LoadError> {
    value.parse::<f64>().map_err(|_| LoadError::BadNumber {
        path: path.display().to_string(),
        line,
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Blank or non-numeric percents are left for the raw score code to resolve.
fn parse_percent(value: &str) -> Option<f64> {
    if value.is_empty() {
        return None;
    }
    match value.parse::<f64>() {
        Ok(percent) if percent.is_finite() => Some(percent),
        _ => {
            debug!(value, "non-numeric percent");
            None
        }
    }
}

pub fn load_assignments(path: &Path) -> Result<Vec<AssignmentRecord>, LoadError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct AssignmentRow {
        #[serde(rename = "StudentID")]
        student_id: String,
        term: String,
        teacher: String,
        course: String,
        section: String,
        assignment: String,
        due_date: String,
        #[serde(default)]
        objective: String,
        #[serde(default)]
        category: String,
        category_weight: String,
        worth_points: String,
        #[serde(default)]
        raw_score: String,
        #[serde(default)]
        percent: String,
    }

    let mut reader = csv_reader(path)?;
    let headers = reader.headers()?.clone();
    let mut records = Vec::new();

    for result in reader.records() {
        let raw = result?;
        if raw.iter().all(str::is_empty) {
            continue;
        }
        let line = raw.position().map(|p| p.line()).unwrap_or(0);
        let row: AssignmentRow = raw.deserialize(Some(&headers))?;

        records.push(AssignmentRecord {
            category_weight: parse_number(path, line, "CategoryWeight", &row.category_weight)?,
            worth_points: parse_number(path, line, "WorthPoints", &row.worth_points)?,
            percent: parse_percent(&row.percent),
            student_id: row.student_id,
            term: row.term,
            teacher: row.teacher,
            course: row.course,
            section: row.section,
            assignment: row.assignment,
            due_date: row.due_date,
            objective: row.objective,
            category: row.category,
            raw_score: row.raw_score,
        });
    }

    info!(path = %path.display(), records = records.len(), "loaded assignments");
    Ok(records)
}

pub fn load_crossover(path: &Path) -> Result<Vec<CrossoverEntry>, LoadError> {
    #[derive(Deserialize)]
    struct CrossoverRow {
        #[serde(rename = "JupiterCourse")]
        jupiter_course: String,
        #[serde(rename = "JupiterSection")]
        jupiter_section: String,
        #[serde(rename = "Course")]
        course: String,
        #[serde(rename = "Section")]
        section: String,
    }

    let mut reader = csv_reader(path)?;
    let mut entries = Vec::new();
    for result in reader.deserialize::<CrossoverRow>() {
        let row = result?;
        entries.push(CrossoverEntry {
            course: row.jupiter_course,
            section: row.jupiter_section,
            external_course: row.course,
            external_section: row.section,
        });
    }

    info!(path = %path.display(), entries = entries.len(), "loaded crossover mapping");
    Ok(entries)
}

/// Header row plus data rows of a `.csv` or `.xlsx` table; blank rows are skipped.
pub fn read_table(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>), LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let (headers, rows) = match ext.as_str() {
        "csv" => {
            let mut reader = csv_reader(path)?;
            let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
            let mut rows = Vec::new();
            for result in reader.records() {
                rows.push(result?.iter().map(str::to_string).collect::<Vec<_>>());
            }
            (headers, rows)
        }
        "xlsx" => {
            let mut workbook: Xlsx<_> = open_workbook(path)?;
            let sheet = workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| LoadError::EmptyWorkbook {
                    path: path.display().to_string(),
                })?;
            let range = workbook.worksheet_range(&sheet)?;
            let mut cells = range.rows().map(|row| {
                row.iter()
                    .map(|cell| cell.to_string().trim().to_string())
                    .collect::<Vec<String>>()
            });
            let headers: Vec<String> = cells.next().unwrap_or_default();
            (headers, cells.collect::<Vec<Vec<String>>>())
        }
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };

    let rows = rows
        .into_iter()
        .filter(|row| row.iter().any(|value| !value.is_empty()))
        .collect();
    Ok((headers, rows))
}

fn column(path: &Path, headers: &[String], names: &[&str]) -> Result<usize, LoadError> {
    names
        .iter()
        .find_map(|name| headers.iter().position(|h| h == name))
        .ok_or_else(|| LoadError::MissingColumn {
            path: path.display().to_string(),
            column: names.join("/"),
        })
}

pub fn load_external_gradebook(path: &Path) -> Result<ExternalGradebook, LoadError> {
    let (headers, rows) = read_table(path)?;
    let student_col = column(path, &headers, &["StudentID"])?;
    let course_col = column(path, &headers, &["Course"])?;
    let section_col = column(path, &headers, &["Sec", "Section"])?;
    let mark_col = column(path, &headers, &["Mark"])?;

    let cell = |row: &[String], idx: usize| row.get(idx).cloned().unwrap_or_default();

    let records: Vec<ExternalGradeRecord> = rows
        .into_iter()
        .map(|mut values| {
            values.resize(headers.len(), String::new());
            ExternalGradeRecord {
                student_id: cell(&values, student_col),
                course: cell(&values, course_col),
                section: cell(&values, section_col),
                mark: Mark::parse(&cell(&values, mark_col)),
                values,
            }
        })
        .collect();

    info!(path = %path.display(), records = records.len(), "loaded gradebook export");
    Ok(ExternalGradebook { headers, records })
}

pub fn write_grades_csv<W: Write>(writer: W, grades: &[ComputedGrade]) -> Result<(), LoadError> {
    let mut writer = csv::Writer::from_writer(writer);
    for grade in grades {
        writer.serialize(grade)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_grades_json<W: Write>(writer: W, grades: &[ComputedGrade]) -> Result<(), LoadError> {
    serde_json::to_writer_pretty(writer, grades)?;
    Ok(())
}

pub fn write_reconciled_csv<W: Write>(
    writer: W,
    headers: &[String],
    reconciliation: &Reconciliation,
) -> Result<(), LoadError> {
    let mut writer = csv::Writer::from_writer(writer);

    let mut header_row: Vec<&str> = headers.iter().map(String::as_str).collect();
    header_row.extend(["ComputedMark", "ReconciledMark"]);
    writer.write_record(&header_row)?;

    for record in &reconciliation.records {
        let mut row = record.external.values.clone();
        row.push(record.computed_mark.map(|m| m.to_string()).unwrap_or_default());
        row.push(
            record
                .reconciled_mark
                .as_ref()
                .map(Mark::to_string)
                .unwrap_or_default(),
        );
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}
