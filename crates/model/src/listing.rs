use {
    crate::{location::Location, profile::FarmerId},
    bigdecimal::BigDecimal,
    chrono::{DateTime, NaiveDate, Utc},
    serde::{Deserialize, Serialize},
};

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
pub struct ListingId(pub i64);

/// Lifecycle state of a produce listing.
///
/// `Available` listings may receive requests; acceptance of a request drives
/// the listing to `Reserved`/`Sold`, a periodic sweep drives listings whose
/// availability window has passed to `Expired`.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ListingStatus {
    Available,
    Reserved,
    Sold,
    Expired,
}

/// A farmer's offer of a quantity of produce at a price, valid within a date
/// window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProduceListing {
    pub id: ListingId,
    pub farmer: FarmerId,
    pub title: String,
    pub produce_type: String,
    pub quantity: BigDecimal,
    pub unit: String,
    pub price_per_unit: BigDecimal,
    pub available_from: NaiveDate,
    pub available_until: NaiveDate,
    pub status: ListingStatus,
    pub organic: bool,
    pub location: Location,
    pub created_at: DateTime<Utc>,
}

impl ProduceListing {
    /// Whether the listing can receive purchase requests today.
    pub fn is_available_now(&self, today: NaiveDate) -> bool {
        self.status == ListingStatus::Available
            && self.available_from <= today
            && self.available_until >= today
    }

    /// Whole days until the availability window closes, 0 once it has passed.
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        if self.available_until < today {
            return 0;
        }
        (self.available_until - today).num_days()
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.available_until < today
    }

    pub fn total_value(&self) -> BigDecimal {
        &self.quantity * &self.price_per_unit
    }
}
