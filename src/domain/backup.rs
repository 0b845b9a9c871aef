//! Single-client JSON backups.

use crate::domain::rate_table::{Client, TableInvariantError};
use serde::{Deserialize, Serialize};

pub const BACKUP_TAG: &str = "ratrix_v3_client_backup";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientBackup {
    pub app_version: String,
    pub client_data: Client,
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("not a client backup (app_version '{0}')")]
    TagMismatch(String),

    #[error("malformed backup file: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("backup contains an invalid table: {0}")]
    InvalidTable(#[from] TableInvariantError),
}

pub fn to_json(client: &Client) -> Result<String, BackupError> {
    let backup = ClientBackup {
        app_version: BACKUP_TAG.to_string(),
        client_data: client.clone(),
    };
    Ok(serde_json::to_string_pretty(&backup)?)
}

/// Parses and checks a backup. The tag is checked before the payload so a
/// foreign JSON file reports a tag mismatch rather than a schema error.
pub fn parse(json: &str) -> Result<Client, BackupError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let tag = value
        .get("app_version")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    if tag != BACKUP_TAG {
        return Err(BackupError::TagMismatch(tag.to_string()));
    }
    let mut backup: ClientBackup = serde_json::from_value(value)?;
    backup.client_data.store.repair_active_profiles();
    backup.client_data.store.check_alignment()?;
    Ok(backup.client_data)
}
