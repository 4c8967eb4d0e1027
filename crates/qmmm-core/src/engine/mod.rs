//! # Engine Module
//!
//! The stateful machinery of the QM/MM coupling: everything that runs at setup or
//! once per dynamics step.
//!
//! ## Overview
//!
//! At setup the [`classifier::AtomClassifier`] validates the run, partitions atoms into
//! QM groups and layers, and removes classical charges that the QM solver would double
//! count. Every step the [`updater::EnvironmentUpdater`] refreshes periodic shifts and the
//! MM point-charge environment from the classical neighbor list, and the
//! [`combiner::OniomCombiner`] evaluates the QM engines and scatters the result into the
//! classical force arrays.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Coupling scheme, QM group settings, run parameters and builders
//! - **Classification** ([`classifier`]) - QM group membership and layer construction
//! - **Environment Update** ([`updater`]) - Per-step shifts and MM environment
//! - **Combination** ([`combiner`]) - Single-layer evaluation and ONIOM extrapolation
//! - **Force Accumulation** ([`forces`]) - Force and shift-force arrays shared with the classical engine
//! - **Error Handling** ([`error`]) - Configuration, consistency and solver failures

pub mod classifier;
pub mod combiner;
pub mod config;
pub mod error;
pub mod forces;
pub mod updater;
