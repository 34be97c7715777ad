//! Text report builder for CLI output.
//!
//! Formats the two classified collections as plain-text tables. Column
//! headers come from the FIRST record of each collection only; records whose
//! key sets differ from the first render ragged (blank or dropped cells).
//! That mirrors the service's reporting conventions and is intentional.

use crate::model::{Record, ResultPayload};

const TITLE_WITH: &str = "Leads COM Parcelamento Ativo";
const TITLE_WITHOUT: &str = "Leads SEM Parcelamento Identificado";
const EMPTY_TABLE_MSG: &str = "Nenhum registro encontrado.";

/// Pre-formatted lines for text output.
pub struct TextReport {
    pub lines: Vec<String>,
}

/// Column headers for a collection: the first record's keys, in order.
pub fn headers_of(records: &[Record]) -> Vec<String> {
    records
        .first()
        .map(|r| r.keys().cloned().collect())
        .unwrap_or_default()
}

/// Render one scalar cell the way the reports have always shown it: strings
/// bare, numbers and booleans via their display form, null as empty.
pub fn format_cell(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn push_table(lines: &mut Vec<String>, title: &str, records: &[Record]) {
    lines.push(format!("{} ({} registros)", title, records.len()));

    if records.is_empty() {
        lines.push(EMPTY_TABLE_MSG.to_string());
        lines.push(String::new());
        return;
    }

    let headers = headers_of(records);
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|rec| {
            headers
                .iter()
                .map(|h| format_cell(rec.get(h)))
                .collect::<Vec<_>>()
        })
        .collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let fmt_row = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    lines.push(fmt_row(&headers));
    lines.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
    for row in &rows {
        lines.push(fmt_row(row));
    }
    lines.push(String::new());
}

/// Build the full analysis report: both tables, fixed titles, record counts.
pub fn build_report(payload: &ResultPayload) -> TextReport {
    let mut lines = Vec::new();
    lines.push("Resultados da Análise".to_string());
    lines.push(String::new());
    push_table(&mut lines, TITLE_WITH, &payload.com_parcelamento);
    push_table(&mut lines, TITLE_WITHOUT, &payload.sem_parcelamento);
    TextReport { lines }
}
