//! CSV spreadsheet adapter.
//!
//! Rows may have different lengths (metadata rows carry a single cell), so
//! both reader and writer run in flexible mode.

use crate::domain::error::RatesheetError;
use crate::domain::sheet::SheetGrid;
use crate::ports::sheet_port::SheetPort;
use std::path::Path;

#[derive(Debug, Default)]
pub struct CsvSheetAdapter;

impl CsvSheetAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl SheetPort for CsvSheetAdapter {
    fn read_sheet(&self, path: &Path) -> Result<SheetGrid, RatesheetError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| RatesheetError::Sheet {
                reason: format!("failed to open {}: {}", path.display(), e),
            })?;

        let mut grid = SheetGrid::new();
        for result in rdr.records() {
            let record = result.map_err(|e| RatesheetError::Sheet {
                reason: format!("CSV parse error: {}", e),
            })?;
            grid.push(record.iter().map(str::to_string).collect());
        }
        Ok(grid)
    }

    fn write_sheet(&self, path: &Path, grid: &SheetGrid) -> Result<(), RatesheetError> {
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| RatesheetError::Sheet {
                reason: format!("failed to create {}: {}", path.display(), e),
            })?;

        for row in grid {
            // An empty record would be dropped on read; keep the blank line.
            let record: Vec<&str> = if row.is_empty() {
                vec![""]
            } else {
                row.iter().map(String::as_str).collect()
            };
            wtr.write_record(&record).map_err(|e| RatesheetError::Sheet {
                reason: format!("CSV write error: {}", e),
            })?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rate_table::{Profile, Route};
    use crate::domain::sheet::{export_profile, parse_import, ExportMeta};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn profile() -> Profile {
        Profile {
            name: "Air, Express".into(),
            limits: vec![45.0, 100.0],
            rows: vec![
                Route {
                    origin: "Manila".into(),
                    dest: "Cebu, Lapu-Lapu".into(),
                    rates: vec![Some(120.5), None],
                },
                Route {
                    origin: "Manila".into(),
                    dest: "Davao".into(),
                    rates: vec![Some(99.0), Some(80.0)],
                },
            ],
        }
    }

    #[test]
    fn exported_table_survives_csv_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rates.csv");
        let meta = ExportMeta {
            client: "Acme".into(),
            table: "Air, Express".into(),
            category: "General".into(),
            service_mode: "Port to Port".into(),
            exported_at: NaiveDate::from_ymd_opt(2024, 5, 2)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        };
        let adapter = CsvSheetAdapter::new();
        adapter
            .write_sheet(&path, &export_profile(&meta, &profile()))
            .unwrap();

        let grid = adapter.read_sheet(&path).unwrap();
        assert_eq!(grid[1], vec!["Table: Air, Express".to_string()]);
        let imported = parse_import(&grid).unwrap();
        assert_eq!(imported.limits, profile().limits);
        assert_eq!(imported.rows, profile().rows);
    }

    #[test]
    fn read_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = CsvSheetAdapter::new().read_sheet(&dir.path().join("missing.csv"));
        assert!(matches!(result, Err(RatesheetError::Sheet { .. })));
    }
}
