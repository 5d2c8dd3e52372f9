//! Shipping cost computation from distance, a carrier's base rate and the
//! cargo type.

use crate::round2;

/// Floor applied to every shipping cost, in the marketplace's currency unit.
pub const MINIMUM_CHARGE: f64 = 50.0;

/// Kind of cargo being moved, scaling the base cost.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CargoType {
    Refrigerated,
    Perishable,
    Livestock,
    Fragile,
    Bulk,
    #[default]
    General,
}

impl CargoType {
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Refrigerated | Self::Perishable => 1.5,
            Self::Livestock => 1.8,
            Self::Fragile => 1.3,
            Self::Bulk => 0.8,
            Self::General => 1.0,
        }
    }
}

/// Malformed numeric input to a pricing computation.
///
/// The computation fails loudly instead of silently producing a zero cost;
/// callers that reach this have fed in an unvalidated distance or rate.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum InvalidInput {
    #[error("distance must be a finite, non-negative number of kilometres")]
    Distance,
    #[error("base rate must be a finite, non-negative amount per kilometre")]
    BaseRate,
}

/// Cost of moving `cargo` over `distance_km` at `base_rate_per_km`:
/// `max(base_rate * distance * multiplier, MINIMUM_CHARGE)`, rounded to 2
/// decimal places.
pub fn shipping_cost(
    distance_km: f64,
    base_rate_per_km: f64,
    cargo: CargoType,
) -> Result<f64, InvalidInput> {
    if !distance_km.is_finite() || distance_km < 0.0 {
        return Err(InvalidInput::Distance);
    }
    if !base_rate_per_km.is_finite() || base_rate_per_km < 0.0 {
        return Err(InvalidInput::BaseRate);
    }

    let cost = base_rate_per_km * distance_km * cargo.multiplier();
    Ok(round2(cost.max(MINIMUM_CHARGE)))
}

/// [`shipping_cost`] at the carrier's own rate card.
pub fn carrier_shipping_cost(
    carrier: &model::TruckingCompany,
    distance_km: f64,
    cargo: CargoType,
) -> Result<f64, InvalidInput> {
    shipping_cost(distance_km, carrier.base_rate_per_km(), cargo)
}
