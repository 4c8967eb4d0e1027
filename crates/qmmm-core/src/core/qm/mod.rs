//! # Quantum-Mechanics Interface Module
//!
//! The vocabulary the coupling engine uses to talk about external QM solvers:
//! levels of theory, the backend families that can evaluate them, and the two-phase
//! `initialize`/`evaluate` engine contract.
//!
//! - [`method`] - QM methods, basis sets and levels of theory
//! - [`backend`] - Backend families and static backend selection
//! - [`engine`] - The [`engine::QmEngine`] trait, evaluation results and the engine registry

pub mod backend;
pub mod engine;
pub mod method;
