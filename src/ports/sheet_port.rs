//! Spreadsheet port: reads and writes a single sheet as a grid of cells.

use crate::domain::error::RatesheetError;
use crate::domain::sheet::SheetGrid;
use std::path::Path;

pub trait SheetPort {
    fn read_sheet(&self, path: &Path) -> Result<SheetGrid, RatesheetError>;

    fn write_sheet(&self, path: &Path, grid: &SheetGrid) -> Result<(), RatesheetError>;
}
