//! Pure matching computations: great-circle distance, shipping cost and the
//! listing match score.
//!
//! Everything in this crate is deterministic and side-effect free, safe to
//! call from any number of concurrent readers. Persistence-backed candidate
//! generation and orchestration live in the `marketplace` crate.

pub mod geo;
pub mod pricing;
pub mod scorer;

pub use {
    geo::{BoundingBox, bounding_box, distance, within_radius},
    pricing::{CargoType, InvalidInput, carrier_shipping_cost, shipping_cost},
    scorer::{Ranked, match_score, rank},
};

/// Round to 2 decimal places, the precision used for distances, prices and
/// scores throughout.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
