//! The six faces of a cubesphere and the corners of their root patches.

use glam::DVec3;

/// Sign pattern of the eight unit-cube corners. Normalized, these become the
/// canonical corner directions every root patch is built from.
const CUBE_CORNER_SIGNS: [[f64; 3]; 8] = [
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
];

/// The six faces of the cube that forms the cubesphere.
///
/// Each variant corresponds to a face whose outward normal points
/// along the named axis direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CubeFace {
    /// +X face
    PosX = 0,
    /// −X face
    NegX = 1,
    /// +Y face
    PosY = 2,
    /// −Y face
    NegY = 3,
    /// +Z face
    PosZ = 4,
    /// −Z face
    NegZ = 5,
}

impl CubeFace {
    /// All six faces in canonical order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    /// Face for a packed index, or `None` if `index >= 6`.
    #[must_use]
    pub fn from_index(index: u8) -> Option<CubeFace> {
        Self::ALL.get(index as usize).copied()
    }

    /// Packed index of this face (its discriminant).
    #[must_use]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Outward-pointing unit normal for this face.
    #[must_use]
    pub fn normal(self) -> DVec3 {
        match self {
            CubeFace::PosX => DVec3::X,
            CubeFace::NegX => DVec3::NEG_X,
            CubeFace::PosY => DVec3::Y,
            CubeFace::NegY => DVec3::NEG_Y,
            CubeFace::PosZ => DVec3::Z,
            CubeFace::NegZ => DVec3::NEG_Z,
        }
    }

    /// Indices into the cube-corner table for this face's root patch,
    /// ordered `v0..v3` so that `(v1 - v0) × (v3 - v0)` points outward.
    fn corner_indices(self) -> [usize; 4] {
        match self {
            CubeFace::PosZ => [0, 1, 2, 3],
            CubeFace::NegY => [3, 2, 6, 7],
            CubeFace::PosX => [0, 3, 7, 4],
            CubeFace::PosY => [1, 0, 4, 5],
            CubeFace::NegX => [2, 1, 5, 6],
            CubeFace::NegZ => [7, 6, 5, 4],
        }
    }

    /// The four unit-sphere corner directions of this face's root patch.
    ///
    /// Neighbouring faces share corners bit-for-bit because both read the
    /// same normalized cube corner.
    #[must_use]
    pub fn root_corners(self) -> [DVec3; 4] {
        self.corner_indices().map(cube_corner)
    }
}

/// Normalized direction of cube corner `index` (0..8).
///
/// # Panics
///
/// Panics if `index >= 8`.
#[must_use]
pub fn cube_corner(index: usize) -> DVec3 {
    let [x, y, z] = CUBE_CORNER_SIGNS[index];
    DVec3::new(x, y, z).normalize()
}
