use super::PbcError;
use nalgebra::Vector3;
use std::fmt;

/// Half-extent of the shift lattice along x.
pub const HALF_BOX_X: i32 = 2;
/// Half-extent of the shift lattice along y.
pub const HALF_BOX_Y: i32 = 1;
/// Half-extent of the shift lattice along z.
pub const HALF_BOX_Z: i32 = 1;

const BOX_X: i32 = 2 * HALF_BOX_X + 1;
const BOX_Y: i32 = 2 * HALF_BOX_Y + 1;
const BOX_Z: i32 = 2 * HALF_BOX_Z + 1;

/// Total number of periodic translations addressable by a [`ShiftIndex`].
pub const NUM_SHIFTS: usize = (BOX_X * BOX_Y * BOX_Z) as usize;

/// Index of a periodic translation in the classical engine's shift-vector table.
///
/// A shift index encodes an integer lattice cell `(x, y, z)` with
/// `x ∈ [-2, 2]`, `y ∈ [-1, 1]` and `z ∈ [-1, 1]`. The corresponding translation is
/// `x·a + y·b + z·c` for the box vectors `a`, `b`, `c`. Shifted coordinates are always
/// formed as `position - shift_vector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShiftIndex(u8);

impl ShiftIndex {
    /// The zero translation.
    pub const CENTRAL: ShiftIndex = ShiftIndex(
        (BOX_X * (BOX_Y * HALF_BOX_Z + HALF_BOX_Y) + HALF_BOX_X) as u8,
    );

    /// Builds the shift index for an integer lattice cell.
    ///
    /// # Errors
    ///
    /// Returns [`PbcError::ShiftOutOfRange`] if the cell lies outside the lattice.
    pub fn from_cell(cell: Vector3<i32>) -> Result<Self, PbcError> {
        let (x, y, z) = (cell.x, cell.y, cell.z);
        if x.abs() > HALF_BOX_X || y.abs() > HALF_BOX_Y || z.abs() > HALF_BOX_Z {
            return Err(PbcError::ShiftOutOfRange { x, y, z });
        }
        let index = BOX_X * (BOX_Y * (z + HALF_BOX_Z) + y + HALF_BOX_Y) + x + HALF_BOX_X;
        Ok(Self(index as u8))
    }

    /// Builds a shift index from its raw table position.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < NUM_SHIFTS).then_some(Self(index as u8))
    }

    /// The integer lattice cell this index encodes.
    pub fn cell(self) -> Vector3<i32> {
        let raw = self.0 as i32;
        let x = raw % BOX_X - HALF_BOX_X;
        let rest = raw / BOX_X;
        let y = rest % BOX_Y - HALF_BOX_Y;
        let z = rest / BOX_Y - HALF_BOX_Z;
        Vector3::new(x, y, z)
    }

    /// Position of this shift in a shift-vector or shift-force table.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Composes two translations by adding their lattice cells.
    ///
    /// # Errors
    ///
    /// Returns [`PbcError::ShiftOutOfRange`] if the summed cell is not representable.
    pub fn compose(self, other: ShiftIndex) -> Result<Self, PbcError> {
        Self::from_cell(self.cell() + other.cell())
    }

    pub fn is_central(self) -> bool {
        self == Self::CENTRAL
    }
}

impl Default for ShiftIndex {
    fn default() -> Self {
        Self::CENTRAL
    }
}

impl fmt::Display for ShiftIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = self.cell();
        write!(f, "({:+}, {:+}, {:+})", cell.x, cell.y, cell.z)
    }
}
