//! Nearest eligible courier selection.

use courierpay_types::{AgentRef, Coordinates};

use crate::distance::haversine_km;

/// A courier considered for assignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub agent: AgentRef,
    pub position: Coordinates,
    /// The courier's verification status is `Verified`.
    pub eligible: bool,
}

/// The selected courier and how far it is from the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestAgent {
    pub agent: AgentRef,
    pub distance_km: f64,
}

/// Pick the eligible candidate closest to `target`.
///
/// Returns `None` when the target is absent or out of range, or when no
/// eligible candidate has a valid position. Never errors.
///
/// Uses strict `<` while scanning, so among equidistant candidates the first
/// one enumerated wins. Callers must not depend on which one that is.
#[must_use]
pub fn nearest_eligible_agent<I>(target: Option<Coordinates>, candidates: I) -> Option<NearestAgent>
where
    I: IntoIterator<Item = Candidate>,
{
    let target = target.filter(Coordinates::is_valid)?;

    let mut best: Option<NearestAgent> = None;
    for candidate in candidates {
        if !candidate.eligible || !candidate.position.is_valid() {
            continue;
        }
        let distance_km = haversine_km(target, candidate.position);
        if best.is_none_or(|b| distance_km < b.distance_km) {
            best = Some(NearestAgent {
                agent: candidate.agent,
                distance_km,
            });
        }
    }

    if let Some(found) = &best {
        tracing::debug!(
            agent = %found.agent,
            distance_km = found.distance_km,
            target = %target,
            "Nearest courier selected"
        );
    }
    best
}
