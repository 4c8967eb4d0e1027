//! # Core Models Module
//!
//! Data structures describing what the coupling engine operates on: the static
//! topology handed over by the classical engine, the per-layer QM subsystem, the
//! point-charge MM environment and the per-step frame of positions and charges.
//!
//! ## Key Components
//!
//! - [`atom`] - Topology-level atom description (element, charges, QM group, charge group)
//! - [`topology`] - The atom table plus two-atom virtual sites
//! - [`layer`] - One QM layer: fixed membership plus per-step shifts and coordinates
//! - [`environment`] - The MM atoms electrostatically visible to the QM subsystem
//! - [`frame`] - Positions, box and charges for the current step
//!
//! Membership data (which atoms are QM, in which layer) is fixed at setup; only the
//! per-step fields (shifts, shifted coordinates, environment membership) change.

pub mod atom;
pub mod environment;
pub mod frame;
pub mod layer;
pub mod topology;
