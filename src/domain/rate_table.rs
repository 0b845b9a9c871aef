//! Rate table data model.
//!
//! A [`Client`] owns a [`RateStore`], which holds one [`ModelBucket`] per
//! pricing model. Each bucket holds named [`Profile`]s (the rate tables
//! proper): an ordered list of bracket upper limits and one [`Route`] row per
//! origin/destination pair.
//!
//! Invariant: every `Route::rates` has exactly `Profile::limits.len()` entries,
//! index-aligned with the limits. The editor keeps this in lockstep; data
//! coming from outside is checked with [`RateStore::check_alignment`].

use crate::domain::model_key::ModelKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// Bracket set given to tables created through "add table".
pub const DEFAULT_LIMITS: [f64; 4] = [50.0, 100.0, 150.0, 500.0];

/// Base + excess bracket pair seeded for the excess models.
pub const EXCESS_DEFAULT_LIMITS: [f64; 2] = [50.0, 999_999.0];

pub const DEFAULT_PROFILE_NAME: &str = "Default";

static LAST_TICK: AtomicI64 = AtomicI64::new(0);

/// Ids sort in creation order: a fixed-width hex timestamp, strictly
/// increasing within the process, then a random suffix.
pub fn generate_id(prefix: &str) -> String {
    let now = chrono::Utc::now().timestamp_micros();
    let previous = LAST_TICK
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or_else(|last| last);
    let tick = now.max(previous + 1);
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{:014x}{}", prefix, tick, &suffix[..8])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub origin: String,
    pub dest: String,
    /// `None` marks a bracket that is not priced for this route.
    pub rates: Vec<Option<f64>>,
}

impl Route {
    pub fn empty(bracket_count: usize) -> Self {
        Self {
            origin: String::new(),
            dest: String::new(),
            rates: vec![None; bracket_count],
        }
    }

    pub fn matches(&self, origin: &str, dest: &str) -> bool {
        self.origin == origin && self.dest == dest
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub limits: Vec<f64>,
    pub rows: Vec<Route>,
}

impl Profile {
    /// A table with the given brackets and a single empty row.
    pub fn new(name: impl Into<String>, limits: Vec<f64>) -> Self {
        let rows = vec![Route::empty(limits.len())];
        Self {
            name: name.into(),
            limits,
            rows,
        }
    }

    pub fn find_route(&self, origin: &str, dest: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.matches(origin, dest))
    }

    pub fn check_alignment(&self) -> Result<(), TableInvariantError> {
        for (row, route) in self.rows.iter().enumerate() {
            if route.rates.len() != self.limits.len() {
                return Err(TableInvariantError::MisalignedRow {
                    profile: self.name.clone(),
                    row,
                    rates: route.rates.len(),
                    limits: self.limits.len(),
                });
            }
        }
        Ok(())
    }

    /// Distinct non-empty origins in row order.
    pub fn origins(&self) -> Vec<&str> {
        distinct(self.rows.iter().map(|r| r.origin.as_str()))
    }

    pub fn destinations(&self) -> Vec<&str> {
        distinct(self.rows.iter().map(|r| r.dest.as_str()))
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for v in values {
        if !v.is_empty() && !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelBucket {
    #[serde(rename = "activeId")]
    pub active_profile_id: Option<String>,
    pub profiles: BTreeMap<String, Profile>,
}

impl ModelBucket {
    pub fn with_profile(id: String, profile: Profile) -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(id.clone(), profile);
        Self {
            active_profile_id: Some(id),
            profiles,
        }
    }

    pub fn active_profile(&self) -> Option<&Profile> {
        self.active_profile_id
            .as_ref()
            .and_then(|id| self.profiles.get(id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateStore {
    buckets: BTreeMap<ModelKey, ModelBucket>,
}

impl RateStore {
    /// One "Default" table per pricing model.
    pub fn fresh() -> Self {
        let buckets = ModelKey::ALL
            .iter()
            .map(|&model| {
                let limits = if model.is_excess() {
                    EXCESS_DEFAULT_LIMITS.to_vec()
                } else {
                    DEFAULT_LIMITS.to_vec()
                };
                let bucket = ModelBucket::with_profile(
                    generate_id("p_"),
                    Profile::new(DEFAULT_PROFILE_NAME, limits),
                );
                (model, bucket)
            })
            .collect();
        Self { buckets }
    }

    pub fn bucket(&self, model: ModelKey) -> Option<&ModelBucket> {
        self.buckets.get(&model)
    }

    pub fn bucket_mut(&mut self, model: ModelKey) -> &mut ModelBucket {
        self.buckets.entry(model).or_default()
    }

    pub fn active_profile(&self, model: ModelKey) -> Option<&Profile> {
        self.bucket(model).and_then(ModelBucket::active_profile)
    }

    /// Points buckets that have tables but no active one at their oldest
    /// table. Returns whether anything changed.
    pub fn repair_active_profiles(&mut self) -> bool {
        let mut repaired = false;
        for (model, bucket) in self.buckets.iter_mut() {
            if bucket.active_profile_id.is_none() && !bucket.profiles.is_empty() {
                bucket.active_profile_id = bucket.profiles.keys().next().cloned();
                log::warn!("{} tables had no active table; selected the first", model);
                repaired = true;
            }
        }
        repaired
    }

    pub fn check_alignment(&self) -> Result<(), TableInvariantError> {
        for (model, bucket) in &self.buckets {
            if let Some(id) = &bucket.active_profile_id {
                if !bucket.profiles.contains_key(id) {
                    return Err(TableInvariantError::DanglingActiveProfile {
                        model: *model,
                        id: id.clone(),
                    });
                }
            }
            for profile in bucket.profiles.values() {
                profile.check_alignment()?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "data_store")]
    pub store: RateStore,
}

impl Client {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id("c_"),
            name: name.into(),
            description: String::new(),
            store: RateStore::fresh(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootState {
    #[serde(rename = "activeClientId")]
    pub active_client_id: Option<String>,
    pub clients: BTreeMap<String, Client>,
}

impl RootState {
    pub fn active_client(&self) -> Option<&Client> {
        self.active_client_id
            .as_ref()
            .and_then(|id| self.clients.get(id))
    }

    pub fn check_alignment(&self) -> Result<(), TableInvariantError> {
        self.clients
            .values()
            .try_for_each(|c| c.store.check_alignment())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableInvariantError {
    #[error("table '{profile}' row {row} has {rates} rates for {limits} brackets")]
    MisalignedRow {
        profile: String,
        row: usize,
        rates: usize,
        limits: usize,
    },

    #[error("{model} tables point at missing active table {id}")]
    DanglingActiveProfile { model: ModelKey, id: String },
}
