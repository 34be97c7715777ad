//! Workbook and JSON export of a completed analysis.
//!
//! Export is a pure function of the stored payload: calling it twice with the
//! same payload writes two independent files with identical sheet contents.

use crate::model::{Record, ResultPayload};
use crate::render::headers_of;
use anyhow::{Context, Result};
use rust_xlsxwriter::Workbook;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const SHEET_WITH: &str = "Com Parcelamento";
pub const SHEET_WITHOUT: &str = "Sem Parcelamento";
pub const DEFAULT_WORKBOOK_NAME: &str = "relatorio_analise_pgfn.xlsx";

/// Flatten a collection into a header row plus one value row per record.
/// Columns follow the first record's keys; extra keys on later records are
/// dropped and missing keys become null cells, same as the rendered tables.
pub fn sheet_rows(records: &[Record]) -> (Vec<String>, Vec<Vec<serde_json::Value>>) {
    let headers = headers_of(records);
    let rows = records
        .iter()
        .map(|rec| {
            headers
                .iter()
                .map(|h| rec.get(h).cloned().unwrap_or(serde_json::Value::Null))
                .collect()
        })
        .collect();
    (headers, rows)
}

fn write_sheet(
    workbook: &mut Workbook,
    name: &str,
    records: &[Record],
) -> Result<(), rust_xlsxwriter::XlsxError> {
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(name)?;

    let (headers, rows) = sheet_rows(records);
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, header)?;
    }
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            let (row_idx, col_idx) = (r as u32 + 1, c as u16);
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::Bool(b) => {
                    worksheet.write_boolean(row_idx, col_idx, *b)?;
                }
                serde_json::Value::Number(n) => match n.as_f64() {
                    Some(f) => {
                        worksheet.write_number(row_idx, col_idx, f)?;
                    }
                    None => {
                        worksheet.write_string(row_idx, col_idx, n.to_string())?;
                    }
                },
                serde_json::Value::String(s) => {
                    worksheet.write_string(row_idx, col_idx, s)?;
                }
                other => {
                    worksheet.write_string(row_idx, col_idx, other.to_string())?;
                }
            }
        }
    }
    Ok(())
}

/// Assemble one workbook with both collections, one sheet per collection,
/// and write it to `path`. Returns the path written.
pub fn export_workbook(payload: &ResultPayload, path: &Path) -> Result<PathBuf> {
    let mut workbook = Workbook::new();
    write_sheet(&mut workbook, SHEET_WITH, &payload.com_parcelamento)
        .context("build installment-plan sheet")?;
    write_sheet(&mut workbook, SHEET_WITHOUT, &payload.sem_parcelamento)
        .context("build no-installment-plan sheet")?;
    workbook
        .save(path)
        .with_context(|| format!("write workbook {}", path.display()))?;
    Ok(path.to_path_buf())
}

#[derive(Serialize)]
struct ExportedRun<'a> {
    timestamp_utc: String,
    resultado: &'a ResultPayload,
}

/// Write the payload as pretty-printed JSON alongside a run timestamp.
pub fn export_json(payload: &ResultPayload, path: &Path) -> Result<PathBuf> {
    let exported = ExportedRun {
        timestamp_utc: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        resultado: payload,
    };
    let json = serde_json::to_string_pretty(&exported).context("serialize result payload")?;
    std::fs::write(path, json).with_context(|| format!("write JSON {}", path.display()))?;
    Ok(path.to_path_buf())
}
