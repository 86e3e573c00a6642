//! # courierpay-geo
//!
//! **Geo Index**: great-circle distance and nearest-courier selection.
//!
//! This crate is pure computation plus one small registry:
//! - [`haversine_km`]: distance between two coordinates on a 6371 km sphere
//! - [`nearest_eligible_agent`]: linear scan for the closest verified courier
//! - [`AgentRegistry`]: last known courier positions, upserted per agent
//!
//! ## Determinism
//!
//! For the same candidate sequence the scan always returns the same agent.
//! When two candidates are exactly equidistant the first one enumerated
//! wins; which one that is depends on the store's ordering and is **not**
//! part of the contract.

pub mod distance;
pub mod nearest;
pub mod registry;

pub use distance::haversine_km;
pub use nearest::{nearest_eligible_agent, Candidate, NearestAgent};
pub use registry::AgentRegistry;
