//! # Core Module
//!
//! The stateless foundation of the QM/MM coupling engine: data models, periodic-box
//! math, the QM solver vocabulary and the neighbor list the classical engine provides.
//!
//! ## Overview
//!
//! Nothing in this module keeps state across simulation steps. The types here describe
//! what a step operates on; the per-step logic that mutates them lives in
//! [`crate::engine`].
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Topology atoms, QM layers, the MM point-charge environment and the per-step frame
//! - **Periodic Boundaries** ([`pbc`]) - Simulation box, minimum image and shift indices
//! - **Quantum Interface** ([`qm`]) - Levels of theory, backend selection and the QM engine trait
//! - **Neighbor Search** ([`neighbors`]) - The QM/MM short-range neighbor list
//! - **File I/O** ([`io`]) - TOML system snapshots
//!
//! ## Units
//!
//! Lengths are in nanometres and charges in elementary charges, matching the classical
//! engine that drives the coupling.

pub mod io;
pub mod models;
pub mod neighbors;
pub mod pbc;
pub mod qm;
