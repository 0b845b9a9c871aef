//! Concrete adapter implementations for ports.

pub mod console_confirm_adapter;
pub mod csv_sheet_adapter;
pub mod file_config_adapter;
pub mod json_store_adapter;
