//! Pricing model identifiers.
//!
//! Each rate table belongs to exactly one of seven pricing models. The key is
//! stored on disk as its camelCase name (`fixed`, `minFixed`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModelKey {
    Fixed,
    MinFixed,
    Flat,
    Cumulative,
    MinCumulative,
    Excess,
    MinExcess,
}

impl ModelKey {
    pub const ALL: [ModelKey; 7] = [
        ModelKey::Fixed,
        ModelKey::MinFixed,
        ModelKey::Flat,
        ModelKey::Cumulative,
        ModelKey::MinCumulative,
        ModelKey::Excess,
        ModelKey::MinExcess,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ModelKey::Fixed => "fixed",
            ModelKey::MinFixed => "minFixed",
            ModelKey::Flat => "flat",
            ModelKey::Cumulative => "cumulative",
            ModelKey::MinCumulative => "minCumulative",
            ModelKey::Excess => "excess",
            ModelKey::MinExcess => "minExcess",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModelKey::Fixed => "Fixed Bracket Pricing",
            ModelKey::MinFixed => "Minimum Fixed Bracket Pricing",
            ModelKey::Flat => "Flat Bracket Pricing",
            ModelKey::Cumulative => "Cumulative Bracket Pricing",
            ModelKey::MinCumulative => "Minimum Cumulative Bracket Pricing",
            ModelKey::Excess => "Excess Bracket Pricing",
            ModelKey::MinExcess => "Minimum Excess Bracket Pricing",
        }
    }

    /// Models priced as a base bracket plus a single excess bracket.
    pub fn is_excess(&self) -> bool {
        matches!(self, ModelKey::Excess | ModelKey::MinExcess)
    }

    /// Lenient lookup for untyped input: unknown keys fall back to `Fixed`.
    pub fn from_key_or_fixed(key: &str) -> ModelKey {
        key.parse().unwrap_or_else(|_| {
            log::warn!("unknown pricing model '{}', falling back to fixed", key);
            ModelKey::Fixed
        })
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown pricing model: {0}")]
pub struct UnknownModelKey(pub String);

impl FromStr for ModelKey {
    type Err = UnknownModelKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ModelKey::ALL
            .iter()
            .copied()
            .find(|m| m.key().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownModelKey(s.to_string()))
    }
}
