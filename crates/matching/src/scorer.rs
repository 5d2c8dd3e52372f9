//! Weighted match score ranking produce listings against a market's stated
//! preferences.

use {
    crate::{geo, round2},
    bigdecimal::{BigDecimal, ToPrimitive},
    chrono::NaiveDate,
    model::{MarketProfile, ProduceListing},
    std::collections::HashMap,
};

const TYPE_MATCH_POINTS: f64 = 10.0;
const ORGANIC_BONUS: f64 = 3.0;

/// A listing together with its market-specific score.
#[derive(Clone, Debug, PartialEq)]
pub struct Ranked {
    pub listing: ProduceListing,
    pub score: f64,
}

/// Score `listing` against `market`'s preferences, higher is better.
///
/// Additive terms: +10 for a preferred produce type, up to 10 for proximity
/// (only when both parties have coordinates), up to 5 for pricing at or
/// below the produce type's average, up to 5 for a long remaining
/// availability window, +3 for organic produce. Rounded to 2 decimal places.
///
/// `average_price` is the mean `price_per_unit` over all listings of the
/// same produce type; pass `None` when there is no comparison set, which
/// scores the listing as exactly average.
pub fn match_score(
    market: &MarketProfile,
    listing: &ProduceListing,
    average_price: Option<&BigDecimal>,
    today: NaiveDate,
) -> f64 {
    let mut score = 0.0;

    if market.prefers(&listing.produce_type) {
        score += TYPE_MATCH_POINTS;
    }

    // Proximity contributes only when the distance is actually known.
    if let (Some(_), Some(_)) = (
        market.location.coordinates,
        listing.location.coordinates,
    ) {
        let km = geo::distance(market.location.coordinates, listing.location.coordinates);
        score += (10.0 - km / 10.0).max(0.0);
    }

    score += price_competitiveness(&listing.price_per_unit, average_price);

    // Whole-day granularity: a window of 9 days scores the same as 8.
    let days = listing.days_until_expiry(today);
    score += ((days / 2) as f64).min(5.0);

    if listing.organic {
        score += ORGANIC_BONUS;
    }

    round2(score)
}

/// `max(5 - (ratio - 1) * 5, 0)` where ratio is the listing's price over the
/// produce type's average. An unknown or degenerate average counts as the
/// listing's own price, making the listing exactly average.
fn price_competitiveness(price: &BigDecimal, average: Option<&BigDecimal>) -> f64 {
    let ratio = match (price.to_f64(), average.and_then(BigDecimal::to_f64)) {
        (Some(price), Some(average)) if average > 0.0 => price / average,
        _ => 1.0,
    };
    (5.0 - (ratio - 1.0) * 5.0).max(0.0)
}

/// Rank `candidates` for `market` by descending match score.
///
/// `average_prices` maps produce types to their average `price_per_unit`
/// over the comparison set; types missing from the map fall back to the
/// exactly-average policy of [`match_score`].
pub fn rank(
    market: &MarketProfile,
    candidates: Vec<ProduceListing>,
    average_prices: &HashMap<String, BigDecimal>,
    today: NaiveDate,
) -> Vec<Ranked> {
    let mut ranked: Vec<_> = candidates
        .into_iter()
        .map(|listing| {
            let score = match_score(
                market,
                &listing,
                average_prices.get(&listing.produce_type),
                today,
            );
            Ranked { listing, score }
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}
