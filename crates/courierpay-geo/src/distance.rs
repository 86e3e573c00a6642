//! Haversine great-circle distance.

use courierpay_types::{constants::EARTH_RADIUS_KM, Coordinates};

/// Distance between `a` and `b` in kilometres.
///
/// ```text
/// a = sin²(Δφ/2) + cos φ1 · cos φ2 · sin²(Δλ/2)
/// d = 2R · atan2(√a, √(1−a))
/// ```
#[must_use]
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(lat, lon).unwrap()
    }

    #[test]
    fn same_point_is_zero() {
        assert!(haversine_km(at(25.2, 55.3), at(25.2, 55.3)).abs() < 1e-9);
    }

    #[test]
    fn one_degree_of_longitude_on_equator() {
        let d = haversine_km(at(0.0, 0.0), at(0.0, 1.0));
        assert!((d - 111.19).abs() < 0.5, "got {d}");
    }

    #[test]
    fn symmetric() {
        let dubai = at(25.2048, 55.2708);
        let abu_dhabi = at(24.4539, 54.3773);
        let there = haversine_km(dubai, abu_dhabi);
        let back = haversine_km(abu_dhabi, dubai);
        assert!((there - back).abs() < 1e-9);
        // Roughly 125 km apart.
        assert!((110.0..140.0).contains(&there), "got {there}");
    }

    #[test]
    fn antipodes_are_half_circumference() {
        let d = haversine_km(at(0.0, 0.0), at(0.0, 180.0));
        let half = std::f64::consts::PI * EARTH_RADIUS_KM;
        assert!((d - half).abs() < 1e-6, "got {d}");
    }
}
