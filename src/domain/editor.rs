//! Rate table edits.
//!
//! Every operation takes the current value and returns a new one, leaving the
//! input untouched. A rejected edit returns an [`EditError`] and the caller
//! keeps its previous value, so a refused edit never changes state.
//!
//! Bracket columns are added and removed from `limits` and from every row's
//! `rates` in the same step, which keeps the alignment invariant.

use crate::domain::rate_table::{generate_id, ModelBucket, Profile, Route, DEFAULT_LIMITS};

/// Width of the bracket appended by [`add_column`].
pub const COLUMN_STEP: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("cannot delete the last row of a table")]
    LastRow,

    #[error("cannot delete the last weight bracket of a table")]
    LastColumn,

    #[error("cannot delete the last table; create a new one first")]
    LastProfile,

    #[error("table name must not be empty")]
    EmptyName,

    #[error("row {index} out of range (table has {len} rows)")]
    RowOutOfRange { index: usize, len: usize },

    #[error("bracket {index} out of range (table has {len} brackets)")]
    ColumnOutOfRange { index: usize, len: usize },

    #[error("no active table")]
    NoActiveProfile,

    #[error("table not found: {0}")]
    ProfileNotFound(String),

    #[error("invalid bracket limit: {0}")]
    InvalidLimit(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteField {
    Origin,
    Dest,
}

/// Empty text is an absent rate; so is text that does not parse.
pub fn parse_rate_cell(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn check_row(profile: &Profile, index: usize) -> Result<(), EditError> {
    if index >= profile.rows.len() {
        return Err(EditError::RowOutOfRange {
            index,
            len: profile.rows.len(),
        });
    }
    Ok(())
}

fn check_column(profile: &Profile, index: usize) -> Result<(), EditError> {
    if index >= profile.limits.len() {
        return Err(EditError::ColumnOutOfRange {
            index,
            len: profile.limits.len(),
        });
    }
    Ok(())
}

pub fn add_row(profile: &Profile) -> Profile {
    let mut next = profile.clone();
    next.rows.push(Route::empty(next.limits.len()));
    next
}

pub fn delete_row(profile: &Profile, index: usize) -> Result<Profile, EditError> {
    if profile.rows.len() <= 1 {
        return Err(EditError::LastRow);
    }
    check_row(profile, index)?;
    let mut next = profile.clone();
    next.rows.remove(index);
    Ok(next)
}

pub fn add_column(profile: &Profile) -> Profile {
    let mut next = profile.clone();
    let last = next.limits.last().copied().unwrap_or(0.0);
    next.limits.push(last + COLUMN_STEP);
    for row in &mut next.rows {
        row.rates.push(None);
    }
    next
}

pub fn delete_column(profile: &Profile, index: usize) -> Result<Profile, EditError> {
    if profile.limits.len() <= 1 {
        return Err(EditError::LastColumn);
    }
    check_column(profile, index)?;
    let mut next = profile.clone();
    next.limits.remove(index);
    for row in &mut next.rows {
        row.rates.remove(index);
    }
    Ok(next)
}

/// Replaces one limit. Ordering against neighbouring limits is not enforced;
/// limits must be finite and non-negative.
pub fn set_limit(profile: &Profile, index: usize, value: f64) -> Result<Profile, EditError> {
    check_column(profile, index)?;
    if !value.is_finite() || value < 0.0 {
        return Err(EditError::InvalidLimit(value));
    }
    let mut next = profile.clone();
    next.limits[index] = value;
    Ok(next)
}

pub fn set_rate(
    profile: &Profile,
    row: usize,
    column: usize,
    text: &str,
) -> Result<Profile, EditError> {
    check_row(profile, row)?;
    check_column(profile, column)?;
    let mut next = profile.clone();
    next.rows[row].rates[column] = parse_rate_cell(text);
    Ok(next)
}

pub fn set_route_field(
    profile: &Profile,
    row: usize,
    field: RouteField,
    value: &str,
) -> Result<Profile, EditError> {
    check_row(profile, row)?;
    let mut next = profile.clone();
    let route = &mut next.rows[row];
    match field {
        RouteField::Origin => route.origin = value.to_string(),
        RouteField::Dest => route.dest = value.to_string(),
    }
    Ok(next)
}

/// Adds a table with the default brackets and makes it active.
pub fn add_profile(bucket: &ModelBucket, name: &str) -> Result<(ModelBucket, String), EditError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EditError::EmptyName);
    }
    let id = generate_id("p_");
    let mut next = bucket.clone();
    next.profiles
        .insert(id.clone(), Profile::new(name, DEFAULT_LIMITS.to_vec()));
    next.active_profile_id = Some(id.clone());
    Ok((next, id))
}

pub fn rename_profile(bucket: &ModelBucket, name: &str) -> Result<ModelBucket, EditError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EditError::EmptyName);
    }
    let mut next = bucket.clone();
    let id = next
        .active_profile_id
        .clone()
        .ok_or(EditError::NoActiveProfile)?;
    let profile = next
        .profiles
        .get_mut(&id)
        .ok_or_else(|| EditError::ProfileNotFound(id.clone()))?;
    profile.name = name.to_string();
    Ok(next)
}

/// Removes the active table; the oldest remaining table becomes active.
pub fn delete_profile(bucket: &ModelBucket) -> Result<ModelBucket, EditError> {
    let id = bucket
        .active_profile_id
        .clone()
        .ok_or(EditError::NoActiveProfile)?;
    if !bucket.profiles.contains_key(&id) {
        return Err(EditError::ProfileNotFound(id));
    }
    if bucket.profiles.len() <= 1 {
        return Err(EditError::LastProfile);
    }
    let mut next = bucket.clone();
    next.profiles.remove(&id);
    next.active_profile_id = next.profiles.keys().next().cloned();
    Ok(next)
}

pub fn select_profile(bucket: &ModelBucket, id: &str) -> Result<ModelBucket, EditError> {
    if !bucket.profiles.contains_key(id) {
        return Err(EditError::ProfileNotFound(id.to_string()));
    }
    let mut next = bucket.clone();
    next.active_profile_id = Some(id.to_string());
    Ok(next)
}
