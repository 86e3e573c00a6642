//! Last known courier positions.
//!
//! One entry per courier, overwritten on every report. Reads take a shared
//! lock for the duration of a snapshot copy only; a courier whose report
//! lands mid-selection may be seen at its old or new position.

use std::collections::BTreeMap;

use courierpay_types::{AgentLocation, AgentRef, Coordinates, CourierpayError, Result};
use parking_lot::RwLock;

/// Concurrent map `agent → last location`, enumerated in agent-id order.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    locations: RwLock<BTreeMap<AgentRef, AgentLocation>>,
}

impl AgentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a courier's position, replacing any previous one.
    ///
    /// # Errors
    /// Returns `Validation` for out-of-range coordinates.
    pub fn upsert(&self, agent: AgentRef, position: Coordinates) -> Result<AgentLocation> {
        if !position.is_valid() {
            return Err(CourierpayError::validation(format!(
                "coordinates out of range: {position}"
            )));
        }
        let location = AgentLocation::now(agent, position);
        self.locations.write().insert(agent, location);
        tracing::trace!(agent = %agent, position = %position, "Courier location updated");
        Ok(location)
    }

    /// Last known position of one courier.
    #[must_use]
    pub fn get(&self, agent: &AgentRef) -> Option<AgentLocation> {
        self.locations.read().get(agent).copied()
    }

    /// Copy of every known location, in store order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AgentLocation> {
        self.locations.read().values().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use courierpay_types::UserId;

    use super::*;

    #[test]
    fn upsert_overwrites() {
        let reg = AgentRegistry::new();
        let agent = UserId::new();
        reg.upsert(agent, Coordinates::new(1.0, 1.0).unwrap()).unwrap();
        reg.upsert(agent, Coordinates::new(2.0, 3.0).unwrap()).unwrap();

        assert_eq!(reg.len(), 1);
        let loc = reg.get(&agent).unwrap();
        assert!((loc.position.latitude - 2.0).abs() < f64::EPSILON);
        assert!((loc.position.longitude - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_invalid_position() {
        let reg = AgentRegistry::new();
        let bad = Coordinates {
            latitude: -91.0,
            longitude: 0.0,
        };
        let err = reg.upsert(UserId::new(), bad).unwrap_err();
        assert!(matches!(err, CourierpayError::Validation { .. }));
        assert!(reg.is_empty());
    }

    #[test]
    fn snapshot_is_in_agent_order() {
        let reg = AgentRegistry::new();
        let first = UserId::new();
        let second = UserId::new();
        // Insert out of order; ids are time-ordered.
        reg.upsert(second, Coordinates::new(0.0, 0.0).unwrap()).unwrap();
        reg.upsert(first, Coordinates::new(0.0, 0.0).unwrap()).unwrap();
        let snap = reg.snapshot();
        assert_eq!(snap[0].agent, first);
        assert_eq!(snap[1].agent, second);
    }

    #[test]
    fn concurrent_upserts_from_many_agents() {
        let reg = std::sync::Arc::new(AgentRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let reg = reg.clone();
                std::thread::spawn(move || {
                    let agent = UserId::new();
                    for step in 0..50 {
                        let lat = f64::from(i) + f64::from(step) * 0.01;
                        reg.upsert(agent, Coordinates::new(lat, 0.0).unwrap()).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(reg.len(), 8);
    }
}
