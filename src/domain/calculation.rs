//! Freight charge calculation.
//!
//! Derives actual/volumetric weight and CBM from the shipment inputs, picks
//! the chargeable weight, looks up the route row and prices it with the
//! model's tariff strategy.

use crate::domain::model_key::ModelKey;
use crate::domain::rate_table::Profile;
use crate::domain::tariff::Tariff;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_VOLUMETRIC_DIVISOR: f64 = 6000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChargeBasis {
    #[default]
    Actual,
    Volumetric,
}

impl FromStr for ChargeBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "actual" => Ok(ChargeBasis::Actual),
            "volumetric" => Ok(ChargeBasis::Volumetric),
            other => Err(format!("unknown charge basis: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalcInputs {
    pub origin: String,
    pub dest: String,
    pub service_mode: String,
    pub category: String,
    /// Dimensions in centimetres.
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub volumetric_divisor: f64,
    pub actual_weight: f64,
    pub charge_basis: ChargeBasis,
}

impl Default for CalcInputs {
    fn default() -> Self {
        Self {
            origin: String::new(),
            dest: String::new(),
            service_mode: String::new(),
            category: String::new(),
            length: 0.0,
            width: 0.0,
            height: 0.0,
            volumetric_divisor: DEFAULT_VOLUMETRIC_DIVISOR,
            actual_weight: 0.0,
            charge_basis: ChargeBasis::Actual,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CalcErrorKind {
    #[error("Invalid Weight")]
    InvalidWeight,
    #[error("Route Not Found")]
    RouteNotFound,
    #[error("Invalid/Over Limit")]
    InvalidOrOverLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalcResult {
    pub price: f64,
    pub error: Option<CalcErrorKind>,
    pub actual_weight: f64,
    pub volumetric_weight: f64,
    pub cbm: f64,
    /// Row used for pricing, for highlighting by the caller.
    pub matched_route: Option<usize>,
}

impl CalcResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn chargeable_weight(&self, basis: ChargeBasis) -> f64 {
        match basis {
            ChargeBasis::Actual => self.actual_weight,
            ChargeBasis::Volumetric => self.volumetric_weight,
        }
    }
}

impl fmt::Display for CalcResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error {
            Some(kind) => write!(f, "{kind}"),
            None => write!(f, "{:.2}", self.price),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn volumetric_weight(inputs: &CalcInputs) -> f64 {
    if inputs.volumetric_divisor <= 0.0 {
        return 0.0;
    }
    round2(inputs.length * inputs.width * inputs.height / inputs.volumetric_divisor)
}

pub fn cbm(inputs: &CalcInputs) -> f64 {
    inputs.length * inputs.width * inputs.height / 1_000_000.0
}

pub fn calculate(
    profile: &Profile,
    model: ModelKey,
    inputs: &CalcInputs,
    tariff: &Tariff,
) -> CalcResult {
    let mut result = CalcResult {
        price: 0.0,
        error: None,
        actual_weight: inputs.actual_weight,
        volumetric_weight: volumetric_weight(inputs),
        cbm: cbm(inputs),
        matched_route: None,
    };

    let chargeable = result.chargeable_weight(inputs.charge_basis);
    // NaN falls through this check as well
    if !(chargeable > 0.0) {
        result.error = Some(CalcErrorKind::InvalidWeight);
        return result;
    }

    let Some(index) = profile.find_route(&inputs.origin, &inputs.dest) else {
        result.error = Some(CalcErrorKind::RouteNotFound);
        return result;
    };
    result.matched_route = Some(index);

    let route = &profile.rows[index];
    assert_eq!(
        route.rates.len(),
        profile.limits.len(),
        "table '{}' row {} is out of step with its brackets",
        profile.name,
        index
    );

    match tariff.price(model, chargeable, &route.rates, &profile.limits) {
        Some(price) => result.price = price,
        None => result.error = Some(CalcErrorKind::InvalidOrOverLimit),
    }
    result
}
