//! Spreadsheet export and import of a single rate table.
//!
//! Export layout: six metadata rows (client, table, category, service mode,
//! export date, blank), a header row `Origin, Destination, <lo>-<limit>...`,
//! then one row per route with blank cells for absent rates.
//!
//! Import looks for the header within the first ten rows and reads every
//! column whose header ends in a number as a rate column; that number becomes
//! the bracket limit.

use crate::domain::editor::parse_rate_cell;
use crate::domain::rate_table::{Profile, Route};
use crate::ports::confirm_port::ConfirmPort;
use chrono::NaiveDateTime;

/// Rows of cells, top to bottom.
pub type SheetGrid = Vec<Vec<String>>;

pub const HEADER_SCAN_ROWS: usize = 10;
pub const ORIGIN_HEADER: &str = "Origin";
pub const DEST_HEADER: &str = "Destination";

pub const STRUCTURE_QUESTION: &str =
    "The spreadsheet has different weight columns. Update table structure?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error("header row 'Origin' not found in the first 10 rows")]
    HeaderNotFound,

    #[error("no rate columns found in header")]
    NoRateColumns,

    #[error("bracket structure differs and the change was declined")]
    StructureMismatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportMeta {
    pub client: String,
    pub table: String,
    pub category: String,
    pub service_mode: String,
    pub exported_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedTable {
    pub limits: Vec<f64>,
    pub rows: Vec<Route>,
}

fn format_number(value: f64) -> String {
    value.to_string()
}

/// Header label for bracket `index`: lower bound is 1 for the first bracket,
/// otherwise one above the previous limit.
pub fn bracket_label(limits: &[f64], index: usize) -> String {
    let lower = if index == 0 {
        1.0
    } else {
        limits[index - 1] + 1.0
    };
    format!("{}-{}", format_number(lower), format_number(limits[index]))
}

pub fn export_profile(meta: &ExportMeta, profile: &Profile) -> SheetGrid {
    let mut grid: SheetGrid = vec![
        vec![format!("Client: {}", meta.client)],
        vec![format!("Table: {}", meta.table)],
        vec![format!("Category: {}", meta.category)],
        vec![format!("Service Mode: {}", meta.service_mode)],
        vec![format!(
            "Export Date: {}",
            meta.exported_at.format("%Y-%m-%d %H:%M:%S")
        )],
        Vec::new(),
    ];

    let mut header = vec![ORIGIN_HEADER.to_string(), DEST_HEADER.to_string()];
    header.extend((0..profile.limits.len()).map(|i| bracket_label(&profile.limits, i)));
    grid.push(header);

    for route in &profile.rows {
        let mut row = vec![route.origin.clone(), route.dest.clone()];
        row.extend(
            route
                .rates
                .iter()
                .map(|r| r.map(format_number).unwrap_or_default()),
        );
        grid.push(row);
    }
    grid
}

/// Limit encoded in a rate column header such as `rate_50`, `1-50` or
/// `air_100`. Headers without a separator or a non-negative number are
/// skipped.
pub fn rate_column_limit(header: &str) -> Option<f64> {
    let trimmed = header.trim();
    let prefixed = trimmed.to_ascii_lowercase().starts_with("rate_");
    let body = if prefixed { &trimmed[5..] } else { trimmed };
    let normalized = body.replace('-', "_");
    if !prefixed && !normalized.contains('_') {
        return None;
    }
    let token = normalized.rsplit('_').next()?.trim();
    let limit: f64 = token.parse().ok()?;
    (limit.is_finite() && limit >= 0.0).then_some(limit)
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

pub fn parse_import(grid: &SheetGrid) -> Result<ImportedTable, ImportError> {
    let header_index = grid
        .iter()
        .take(HEADER_SCAN_ROWS)
        .position(|row| cell(row, 0).trim() == ORIGIN_HEADER)
        .ok_or(ImportError::HeaderNotFound)?;

    let mut limits = Vec::new();
    let mut rate_columns = Vec::new();
    for (column, header) in grid[header_index].iter().enumerate() {
        if let Some(limit) = rate_column_limit(header) {
            limits.push(limit);
            rate_columns.push(column);
        }
    }
    if limits.is_empty() {
        return Err(ImportError::NoRateColumns);
    }

    let rows = grid[header_index + 1..]
        .iter()
        .filter_map(|row| {
            let origin = cell(row, 0).trim();
            let dest = cell(row, 1).trim();
            if origin.is_empty() && dest.is_empty() {
                return None;
            }
            Some(Route {
                origin: origin.to_string(),
                dest: dest.to_string(),
                rates: rate_columns
                    .iter()
                    .map(|&c| parse_rate_cell(cell(row, c)))
                    .collect(),
            })
        })
        .collect();

    Ok(ImportedTable { limits, rows })
}

/// Replaces the table's rows with the imported ones. A different bracket
/// structure is only taken over once the operator confirms it. A sheet
/// without data rows leaves one empty row, since a table is never rowless.
pub fn apply_import(
    profile: &Profile,
    imported: ImportedTable,
    confirm: &dyn ConfirmPort,
) -> Result<Profile, ImportError> {
    let mut next = profile.clone();
    if imported.limits != profile.limits {
        if !confirm.confirm(STRUCTURE_QUESTION) {
            return Err(ImportError::StructureMismatch);
        }
        next.limits = imported.limits;
    }
    next.rows = imported.rows;
    if next.rows.is_empty() {
        next.rows.push(Route::empty(next.limits.len()));
    }
    Ok(next)
}
