//! Geographic coordinates and courier positions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AgentRef, CourierpayError, Result};

/// A WGS-84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build validated coordinates.
    ///
    /// # Errors
    /// Returns `Validation` if latitude is outside [-90, 90], longitude is
    /// outside [-180, 180], or either is not finite.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let coords = Self {
            latitude,
            longitude,
        };
        if coords.is_valid() {
            Ok(coords)
        } else {
            Err(CourierpayError::validation(format!(
                "coordinates out of range: ({latitude}, {longitude})"
            )))
        }
    }

    /// Range check, usable on values that bypassed [`Coordinates::new`]
    /// (e.g. deserialized input).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Last reported position of a delivery agent. Overwritten on every report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentLocation {
    pub agent: AgentRef,
    pub position: Coordinates,
    pub updated_at: DateTime<Utc>,
}

impl AgentLocation {
    #[must_use]
    pub fn now(agent: AgentRef, position: Coordinates) -> Self {
        Self {
            agent,
            position,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_boundaries() {
        assert!(Coordinates::new(90.0, 180.0).is_ok());
        assert!(Coordinates::new(-90.0, -180.0).is_ok());
        assert!(Coordinates::new(25.2048, 55.2708).is_ok());
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(Coordinates::new(90.5, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.1).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
        assert!(Coordinates::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn deserialized_values_can_be_checked() {
        let c: Coordinates = serde_json::from_str(r#"{"latitude":120.0,"longitude":0.0}"#).unwrap();
        assert!(!c.is_valid());
    }
}
