//! # QMMM++ Core Library
//!
//! A QM/MM coupling engine: it lets a classical molecular-dynamics engine treat a small
//! region of a system with an external quantum-mechanics solver while the rest stays
//! classical, either as a single QM region embedded in MM point charges or as nested
//! ONIOM layers.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Topology`, `QmLayer`,
//!   `MmEnvironment`), periodic-box math, the QM engine contract and file I/O.
//!
//! - **[`engine`]: The Logic Core.** The stateful per-step machinery. The
//!   `AtomClassifier` partitions atoms into layers once at setup, the
//!   `EnvironmentUpdater` rebuilds shifts and the MM environment every step, and the
//!   `OniomCombiner` turns per-layer QM results into one energy plus force and
//!   shift-force contributions.
//!
//! - **[`workflows`]: The Public API.** `QmmmCoupling` ties setup and the per-step
//!   update/combine cycle together for the surrounding integrator.
//!
//! Execution is strictly sequential and single-process; QM calls block until the
//! solver returns.

pub mod core;
pub mod engine;
pub mod workflows;
