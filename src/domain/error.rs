//! Top-level error type.
//!
//! Calculation failures are not errors here: they travel inside
//! [`CalcResult`](crate::domain::calculation::CalcResult) as a
//! [`CalcErrorKind`](crate::domain::calculation::CalcErrorKind).

use crate::domain::backup::BackupError;
use crate::domain::editor::EditError;
use crate::domain::model_key::ModelKey;
use crate::domain::rate_table::TableInvariantError;
use crate::domain::sheet::ImportError;

#[derive(Debug, thiserror::Error)]
pub enum RatesheetError {
    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("spreadsheet error: {reason}")]
    Sheet { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    Table(#[from] TableInvariantError),

    #[error("unknown client: {id}")]
    UnknownClient { id: String },

    #[error("cannot delete the last client")]
    LastClient,

    #[error("client name must not be empty")]
    EmptyClientName,

    #[error("no active {model} table")]
    NoActiveProfile { model: ModelKey },

    #[error("editing session is closed")]
    SessionClosed,

    #[error("unsaved changes kept; navigation cancelled")]
    NavigationCancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&RatesheetError> for std::process::ExitCode {
    fn from(err: &RatesheetError) -> Self {
        let code: u8 = match err {
            RatesheetError::Io(_) => 1,
            RatesheetError::ConfigParse { .. } | RatesheetError::ConfigInvalid { .. } => 2,
            RatesheetError::Storage { .. } | RatesheetError::Table(_) => 3,
            RatesheetError::Edit(_)
            | RatesheetError::UnknownClient { .. }
            | RatesheetError::LastClient
            | RatesheetError::EmptyClientName
            | RatesheetError::NoActiveProfile { .. }
            | RatesheetError::SessionClosed => 4,
            RatesheetError::Sheet { .. }
            | RatesheetError::Import(_)
            | RatesheetError::Backup(_) => 5,
            RatesheetError::NavigationCancelled => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_keep_their_message() {
        let err = RatesheetError::from(EditError::LastRow);
        assert_eq!(err.to_string(), "cannot delete the last row of a table");
        let err = RatesheetError::from(ImportError::NoRateColumns);
        assert_eq!(err.to_string(), "no rate columns found in header");
    }

    #[test]
    fn no_active_profile_names_model() {
        let err = RatesheetError::NoActiveProfile {
            model: ModelKey::MinCumulative,
        };
        assert_eq!(err.to_string(), "no active minCumulative table");
    }

    #[test]
    fn config_error_message() {
        let err = RatesheetError::ConfigInvalid {
            section: "calculation".into(),
            key: "volumetric_divisor".into(),
            reason: "must be positive".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value [calculation] volumetric_divisor: must be positive"
        );
    }
}
