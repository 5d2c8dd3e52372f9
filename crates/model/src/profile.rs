//! Profiles of the three marketplace parties.
//!
//! Profile entities are owned by the surrounding application (registration,
//! editing, geocoding); the core receives them fully resolved and never
//! mutates them.

use {
    crate::location::Location,
    bigdecimal::{BigDecimal, ToPrimitive},
    serde::{Deserialize, Serialize},
};

/// Rate applied when no `per_km` entry is configured for a carrier.
pub const DEFAULT_RATE_PER_KM: f64 = 2.0;

macro_rules! party_id {
    ($name:ident) => {
        #[derive(
            Clone,
            Copy,
            Debug,
            Eq,
            PartialEq,
            Hash,
            PartialOrd,
            Ord,
            Serialize,
            Deserialize,
            derive_more::Display,
            derive_more::From,
            derive_more::Into,
        )]
        pub struct $name(pub i64);
    };
}

party_id!(FarmerId);
party_id!(MarketId);
party_id!(CarrierId);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FarmerProfile {
    pub id: FarmerId,
    pub farm_name: String,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketProfile {
    pub id: MarketId,
    pub market_name: String,
    pub preferred_produces: Vec<String>,
    pub location: Location,
}

impl MarketProfile {
    pub fn prefers(&self, produce_type: &str) -> bool {
        self.preferred_produces.iter().any(|p| p == produce_type)
    }
}

/// A single entry of a carrier's rate card, e.g. `per_km` or `per_ton`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub rate: BigDecimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TruckingCompany {
    pub id: CarrierId,
    pub company_name: String,
    pub rates: Vec<RateEntry>,
}

impl TruckingCompany {
    /// The carrier's configured `per_km` rate, falling back to
    /// [`DEFAULT_RATE_PER_KM`] when none is configured.
    pub fn base_rate_per_km(&self) -> f64 {
        self.rates
            .iter()
            .find(|entry| entry.kind == "per_km")
            .and_then(|entry| entry.rate.to_f64())
            .unwrap_or(DEFAULT_RATE_PER_KM)
    }
}
