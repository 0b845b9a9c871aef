//! Tariff strategies: the seven pricing formulas.
//!
//! Every strategy takes `(weight, rates, limits)` and returns `None` when the
//! price cannot be computed. An absent rate is never read as zero.
//!
//! | model           | price                                                    |
//! |-----------------|----------------------------------------------------------|
//! | `fixed`         | `weight * rate[bracket]`                                 |
//! | `flat`          | `rate[bracket]`                                          |
//! | `minFixed`      | first bracket flat, otherwise `weight * rate[bracket]`   |
//! | `cumulative`    | each bracket's slice of the weight at its own rate       |
//! | `minCumulative` | as cumulative, first bracket charged flat                |
//! | `excess`        | `base * rate[0] + (weight - base) * rate[1]`             |
//! | `minExcess`     | `rate[0] + (weight - base) * rate[1]`                    |

use crate::domain::bracket;
use crate::domain::model_key::ModelKey;

/// Weight left over after the last cumulative bracket that is still accepted.
pub const DEFAULT_OVERFLOW_TOLERANCE: f64 = 0.001;

/// Strategy dispatcher carrying the cumulative overflow tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tariff {
    pub overflow_tolerance: f64,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            overflow_tolerance: DEFAULT_OVERFLOW_TOLERANCE,
        }
    }
}

impl Tariff {
    /// Rejects any weight left unconsumed by the cumulative strategies.
    pub fn strict() -> Self {
        Self {
            overflow_tolerance: 0.0,
        }
    }

    pub fn price(
        &self,
        model: ModelKey,
        weight: f64,
        rates: &[Option<f64>],
        limits: &[f64],
    ) -> Option<f64> {
        match model {
            ModelKey::Fixed => fixed(weight, rates, limits),
            ModelKey::MinFixed => min_fixed(weight, rates, limits),
            ModelKey::Flat => flat(weight, rates, limits),
            ModelKey::Cumulative => cumulative(weight, rates, limits, self.overflow_tolerance),
            ModelKey::MinCumulative => {
                min_cumulative(weight, rates, limits, self.overflow_tolerance)
            }
            ModelKey::Excess => excess(weight, rates, limits),
            ModelKey::MinExcess => min_excess(weight, rates, limits),
        }
    }
}

fn rate_at(rates: &[Option<f64>], index: usize) -> Option<f64> {
    rates
        .get(index)
        .copied()
        .flatten()
        .filter(|r| !r.is_nan())
}

fn bracket_rate(weight: f64, rates: &[Option<f64>], limits: &[f64]) -> Option<(usize, f64)> {
    let index = bracket::resolve(weight, limits)?;
    rate_at(rates, index).map(|rate| (index, rate))
}

pub fn fixed(weight: f64, rates: &[Option<f64>], limits: &[f64]) -> Option<f64> {
    bracket_rate(weight, rates, limits).map(|(_, rate)| weight * rate)
}

pub fn flat(weight: f64, rates: &[Option<f64>], limits: &[f64]) -> Option<f64> {
    bracket_rate(weight, rates, limits).map(|(_, rate)| rate)
}

/// The flat first-bracket charge applies whenever the floored weight lands in
/// bracket 0, so 50.5 kg against a first limit of 50 is still flat.
pub fn min_fixed(weight: f64, rates: &[Option<f64>], limits: &[f64]) -> Option<f64> {
    match bracket_rate(weight, rates, limits)? {
        (0, rate) => Some(rate),
        (_, rate) => Some(weight * rate),
    }
}

/// How a weight is split across brackets by the cumulative strategies.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketFill {
    /// Weight consumed by each traversed bracket, lowest first.
    pub fills: Vec<f64>,
    /// Weight left after the last traversed bracket.
    pub remaining: f64,
}

/// Bracket `i` holds `limits[i] - limits[i-1]` (with `limits[-1] = 0`).
/// Traversal stops at the bracket that exhausts the weight.
pub fn fill_brackets(weight: f64, limits: &[f64]) -> BracketFill {
    let mut fills = Vec::with_capacity(limits.len());
    let mut remaining = weight;
    let mut previous = 0.0;

    for &limit in limits {
        let capacity = limit - previous;
        let fill = remaining.min(capacity).max(0.0);
        fills.push(fill);
        remaining -= fill;
        previous = limit;
        if remaining <= 0.0 {
            break;
        }
    }

    BracketFill { fills, remaining }
}

pub fn cumulative(
    weight: f64,
    rates: &[Option<f64>],
    limits: &[f64],
    overflow_tolerance: f64,
) -> Option<f64> {
    let split = fill_brackets(weight, limits);
    let mut total = 0.0;
    for (i, fill) in split.fills.iter().enumerate() {
        total += fill * rate_at(rates, i)?;
    }
    if split.remaining > overflow_tolerance {
        return None;
    }
    Some(total)
}

pub fn min_cumulative(
    weight: f64,
    rates: &[Option<f64>],
    limits: &[f64],
    overflow_tolerance: f64,
) -> Option<f64> {
    let split = fill_brackets(weight, limits);
    let mut total = 0.0;
    for (i, &fill) in split.fills.iter().enumerate() {
        let rate = rate_at(rates, i)?;
        if i == 0 {
            if fill > 0.0 {
                total += rate;
            }
        } else {
            total += fill * rate;
        }
    }
    if split.remaining > overflow_tolerance {
        return None;
    }
    Some(total)
}

fn base_and_excess(rates: &[Option<f64>], limits: &[f64]) -> Option<(f64, f64, f64)> {
    let base_rate = rate_at(rates, 0)?;
    let excess_rate = rate_at(rates, 1)?;
    let base_limit = *limits.first()?;
    Some((base_limit, base_rate, excess_rate))
}

pub fn excess(weight: f64, rates: &[Option<f64>], limits: &[f64]) -> Option<f64> {
    let (base_limit, base_rate, excess_rate) = base_and_excess(rates, limits)?;
    if weight <= base_limit {
        Some(weight * base_rate)
    } else {
        Some(base_limit * base_rate + (weight - base_limit) * excess_rate)
    }
}

pub fn min_excess(weight: f64, rates: &[Option<f64>], limits: &[f64]) -> Option<f64> {
    let (base_limit, base_rate, excess_rate) = base_and_excess(rates, limits)?;
    if weight <= base_limit {
        Some(base_rate)
    } else {
        Some(base_rate + (weight - base_limit) * excess_rate)
    }
}
