//! Haversine great-circle distance and the approximate bounding box used for
//! candidate pre-filtering.

use {crate::round2, model::Coordinates};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres per degree of latitude, also used for longitude after
/// adjusting by the cosine of the latitude.
const KM_PER_DEGREE: f64 = 111.0;

/// Great-circle distance between two points in kilometres, rounded to 2
/// decimal places.
///
/// Returns 0.0 when either endpoint is unknown. Callers must treat that as
/// "distance unknown", not "co-located", and gate on coordinate presence
/// before feeding the result into ranking or pricing decisions.
pub fn distance(from: Option<Coordinates>, to: Option<Coordinates>) -> f64 {
    let (Some(from), Some(to)) = (from, to) else {
        return 0.0;
    };

    let rlat1 = from.lat.to_radians();
    let rlat2 = to.lat.to_radians();
    let dlat = rlat2 - rlat1;
    let dlng = (to.lng - from.lng).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + rlat1.cos() * rlat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    round2(EARTH_RADIUS_KM * c)
}

pub fn within_radius(center: Coordinates, point: Coordinates, radius_km: f64) -> bool {
    distance(Some(center), Some(point)) <= radius_km
}

/// Latitude/longitude ranges enclosing a circle around `center`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lng..=self.max_lng).contains(&point.lng)
    }
}

/// Approximate bounding box of the circle of `radius_km` around `center`,
/// converting kilometres to degrees at 111 km/degree latitude and adjusting
/// longitude by cos(latitude).
///
/// This trades precision for an indexable range filter. It does not handle
/// the antimeridian and degrades towards the poles; candidates it admits are
/// re-checked with [`distance`] during scoring.
pub fn bounding_box(center: Coordinates, radius_km: f64) -> BoundingBox {
    let lat_range = radius_km / KM_PER_DEGREE;
    let lng_range = radius_km / (KM_PER_DEGREE * center.lat.to_radians().cos());

    BoundingBox {
        min_lat: center.lat - lat_range,
        max_lat: center.lat + lat_range,
        min_lng: center.lng - lng_range,
        max_lng: center.lng + lng_range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAIROBI: Coordinates = Coordinates {
        lat: -1.2921,
        lng: 36.8219,
    };
    const MOMBASA: Coordinates = Coordinates {
        lat: -4.0435,
        lng: 39.6682,
    };

    #[test]
    fn distance_is_symmetric() {
        assert_eq!(
            distance(Some(NAIROBI), Some(MOMBASA)),
            distance(Some(MOMBASA), Some(NAIROBI)),
        );
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(distance(Some(NAIROBI), Some(NAIROBI)), 0.0);
    }

    #[test]
    fn known_distance() {
        // Nairobi to Mombasa is roughly 440 km great-circle.
        let km = distance(Some(NAIROBI), Some(MOMBASA));
        assert!((435.0..445.0).contains(&km), "got {km}");
    }

    #[test]
    fn missing_endpoint_reports_zero() {
        assert_eq!(distance(None, Some(MOMBASA)), 0.0);
        assert_eq!(distance(Some(NAIROBI), None), 0.0);
        assert_eq!(distance(None, None), 0.0);
    }

    #[test]
    fn within_radius_matches_distance() {
        assert!(within_radius(NAIROBI, MOMBASA, 500.0));
        assert!(!within_radius(NAIROBI, MOMBASA, 400.0));
    }

    #[test]
    fn bounding_box_encloses_the_radius() {
        let bbox = bounding_box(NAIROBI, 100.0);
        assert!(bbox.contains(NAIROBI));

        // A point straight north at ~99 km is inside.
        let north = Coordinates {
            lat: NAIROBI.lat + 0.89,
            lng: NAIROBI.lng,
        };
        assert!(bbox.contains(north));

        // Mombasa at ~440 km is not.
        assert!(!bbox.contains(MOMBASA));
    }

    #[test]
    fn bounding_box_widens_longitude_away_from_equator() {
        let equator = bounding_box(Coordinates { lat: 0.0, lng: 10.0 }, 100.0);
        let north = bounding_box(
            Coordinates {
                lat: 60.0,
                lng: 10.0,
            },
            100.0,
        );
        let equator_width = equator.max_lng - equator.min_lng;
        let north_width = north.max_lng - north.min_lng;
        assert!(north_width > equator_width * 1.5);
    }
}
