//! Core domain types and logic.

pub mod model_key;
pub mod rate_table;
pub mod bracket;
pub mod tariff;
pub mod calculation;
pub mod editor;
pub mod sheet;
pub mod backup;
pub mod session;
pub mod settings;
pub mod workspace;
pub mod error;
