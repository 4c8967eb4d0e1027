//! # Periodic Boundary Module
//!
//! Periodic-box geometry and the shift-index bookkeeping shared with the classical
//! force engine. Every periodic translation used by the coupling engine is expressed
//! as a [`shift::ShiftIndex`] into a fixed 5×3×3 lattice of box translations, so that
//! force contributions can be attributed to a translation and later folded into the
//! virial by the classical engine.
//!
//! - [`cell`] - The simulation box and minimum-image computations
//! - [`shift`] - Shift indices, lattice cells and shift composition

use thiserror::Error;

pub mod cell;
pub mod shift;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PbcError {
    #[error("Box vector {index} is degenerate or not in lower-triangular form: {vector:?}")]
    InvalidBoxVector { index: usize, vector: [f64; 3] },

    #[error("Periodic cell ({x}, {y}, {z}) lies outside the representable shift lattice")]
    ShiftOutOfRange { x: i32, y: i32, z: i32 },

    #[error("Non-finite coordinate encountered in minimum-image computation")]
    NonFiniteCoordinate,
}
