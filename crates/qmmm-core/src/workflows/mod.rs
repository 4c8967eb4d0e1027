//! # Workflows Module
//!
//! The public entry point of the coupling engine for a surrounding integrator.
//!
//! ## Overview
//!
//! [`coupling::QmmmCoupling`] is created once at simulation setup and then driven once
//! per dynamics step. Setup classifies atoms, zeroes double-counted charges, checks the
//! requested levels of theory against the registered QM engines and, for single-layer
//! runs, initializes the QM engine. Each step refreshes the MM environment from the
//! classical neighbor list and adds the QM energy, forces and shift forces.

pub mod coupling;
