//! Bit-packed quadtree path identifying one patch on the cubesphere.

use std::fmt;

use crate::CubeFace;

/// Uniquely identifies a patch in the six per-face quadtrees.
///
/// Packed into a single `u64`:
///
/// | Bits    | Field                                          |
/// |---------|------------------------------------------------|
/// | 61..64  | root face index                                |
/// | 56..61  | depth (0 = root patch)                         |
/// | 0..56   | 2-bit quadrant selector per level, level 1 at bits 0..2 |
///
/// A child's address is its parent's address with one more selector
/// appended at `depth + 1`, so addresses are strict prefix-extensions
/// of their ancestors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchAddress(u64);

impl PatchAddress {
    /// Deepest representable level: 56 path bits / 2 bits per level.
    pub const MAX_DEPTH: u8 = 28;

    const FACE_SHIFT: u32 = 61;
    const DEPTH_SHIFT: u32 = 56;
    const DEPTH_MASK: u64 = 0x1f;
    const PATH_MASK: u64 = (1 << Self::DEPTH_SHIFT) - 1;

    /// Address of the root patch covering `face`.
    #[must_use]
    pub fn root(face: CubeFace) -> Self {
        Self((face.index() as u64) << Self::FACE_SHIFT)
    }

    /// Rebuild an address from its packed bits, validating every field.
    #[must_use]
    pub fn from_bits(bits: u64) -> Option<Self> {
        let face = (bits >> Self::FACE_SHIFT) as u8;
        let depth = ((bits >> Self::DEPTH_SHIFT) & Self::DEPTH_MASK) as u8;
        CubeFace::from_index(face)?;
        if depth > Self::MAX_DEPTH {
            return None;
        }
        // Selector bits beyond `depth` must be clear.
        let used = Self::path_mask(depth);
        if bits & Self::PATH_MASK & !used != 0 {
            return None;
        }
        Some(Self(bits))
    }

    /// The packed representation.
    #[must_use]
    pub fn to_bits(self) -> u64 {
        self.0
    }

    /// Root face this patch descends from.
    #[must_use]
    pub fn face(self) -> CubeFace {
        let index = (self.0 >> Self::FACE_SHIFT) as usize;
        CubeFace::ALL[index]
    }

    /// Depth below the root patch (0 for the root).
    #[must_use]
    pub fn depth(self) -> u8 {
        ((self.0 >> Self::DEPTH_SHIFT) & Self::DEPTH_MASK) as u8
    }

    /// Whether this is one of the six root patches.
    #[must_use]
    pub fn is_root(self) -> bool {
        self.depth() == 0
    }

    /// Address of child `quadrant` (0..4), one level deeper.
    ///
    /// # Panics
    ///
    /// Panics if `quadrant >= 4` or the address is already at [`Self::MAX_DEPTH`].
    #[must_use]
    pub fn child(self, quadrant: u8) -> Self {
        assert!(quadrant < 4, "quadrant {quadrant} out of range");
        let depth = self.depth();
        assert!(
            depth < Self::MAX_DEPTH,
            "cannot address below MAX_DEPTH {}",
            Self::MAX_DEPTH
        );
        let path = (self.0 & Self::PATH_MASK) | ((quadrant as u64) << (2 * depth as u32));
        let face_bits = self.0 & !(Self::PATH_MASK | (Self::DEPTH_MASK << Self::DEPTH_SHIFT));
        Self(face_bits | ((depth as u64 + 1) << Self::DEPTH_SHIFT) | path)
    }

    /// Addresses of all four children in quadrant order.
    #[must_use]
    pub fn children(self) -> [Self; 4] {
        [0, 1, 2, 3].map(|q| self.child(q))
    }

    /// The parent address, or `None` for a root patch.
    #[must_use]
    pub fn parent(self) -> Option<Self> {
        let depth = self.depth();
        if depth == 0 {
            return None;
        }
        let parent_depth = depth - 1;
        let path = self.0 & Self::path_mask(parent_depth);
        let face_bits = self.0 & !(Self::PATH_MASK | (Self::DEPTH_MASK << Self::DEPTH_SHIFT));
        Some(Self(
            face_bits | ((parent_depth as u64) << Self::DEPTH_SHIFT) | path,
        ))
    }

    /// Quadrant selected at `level` (1-based; level 1 is the root's child).
    ///
    /// # Panics
    ///
    /// Panics if `level` is 0 or deeper than this address.
    #[must_use]
    pub fn quadrant_at(self, level: u8) -> u8 {
        assert!(
            level >= 1 && level <= self.depth(),
            "level {level} outside 1..={}",
            self.depth()
        );
        ((self.0 >> (2 * (level as u32 - 1))) & 0b11) as u8
    }

    /// Quadrant selectors from the root downwards.
    pub fn path(self) -> impl Iterator<Item = u8> {
        (1..=self.depth()).map(move |level| self.quadrant_at(level))
    }

    /// True if `other` lies strictly beneath this patch.
    #[must_use]
    pub fn is_ancestor_of(self, other: PatchAddress) -> bool {
        let depth = self.depth();
        other.face() == self.face()
            && other.depth() > depth
            && other.0 & Self::path_mask(depth) == self.0 & Self::PATH_MASK
    }

    fn path_mask(depth: u8) -> u64 {
        if depth == 0 {
            0
        } else {
            (1u64 << (2 * depth as u32)) - 1
        }
    }
}

impl fmt::Display for PatchAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/", self.face())?;
        if self.is_root() {
            return write!(f, "root");
        }
        for quadrant in self.path() {
            write!(f, "{quadrant}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_root_addresses_are_distinct() {
        let roots: HashSet<_> = CubeFace::ALL.iter().map(|f| PatchAddress::root(*f)).collect();
        assert_eq!(roots.len(), 6);
        for face in CubeFace::ALL {
            let root = PatchAddress::root(face);
            assert_eq!(root.face(), face);
            assert_eq!(root.depth(), 0);
            assert!(root.is_root());
            assert!(root.parent().is_none());
        }
    }

    #[test]
    fn test_child_extends_parent_by_one_selector() {
        let parent = PatchAddress::root(CubeFace::NegY).child(2).child(1);
        for q in 0..4 {
            let child = parent.child(q);
            assert_eq!(child.depth(), parent.depth() + 1);
            assert_eq!(child.face(), parent.face());
            assert_eq!(child.quadrant_at(child.depth()), q);
            assert_eq!(child.parent(), Some(parent));
            assert!(parent.is_ancestor_of(child));
            for level in 1..=parent.depth() {
                assert_eq!(child.quadrant_at(level), parent.quadrant_at(level));
            }
        }
    }

    #[test]
    fn test_siblings_are_unique() {
        let parent = PatchAddress::root(CubeFace::PosZ).child(3);
        let kids: HashSet<_> = parent.children().into_iter().collect();
        assert_eq!(kids.len(), 4);
    }

    #[test]
    fn test_path_round_trips_through_descent() {
        let selectors = [3u8, 0, 2, 1, 1, 3, 0];
        let mut addr = PatchAddress::root(CubeFace::PosX);
        for &q in &selectors {
            addr = addr.child(q);
        }
        let path: Vec<u8> = addr.path().collect();
        assert_eq!(path, selectors);
    }

    #[test]
    fn test_ancestor_relation_is_strict() {
        let a = PatchAddress::root(CubeFace::PosY).child(1);
        let b = a.child(0).child(3);
        assert!(a.is_ancestor_of(b));
        assert!(!b.is_ancestor_of(a));
        assert!(!a.is_ancestor_of(a));
        let cousin = PatchAddress::root(CubeFace::PosY).child(2).child(0);
        assert!(!a.is_ancestor_of(cousin));
        let other_face = PatchAddress::root(CubeFace::NegY).child(1).child(0);
        assert!(!a.is_ancestor_of(other_face));
    }

    #[test]
    fn test_max_depth_is_reachable() {
        let mut addr = PatchAddress::root(CubeFace::NegZ);
        for i in 0..PatchAddress::MAX_DEPTH {
            addr = addr.child(i % 4);
        }
        assert_eq!(addr.depth(), PatchAddress::MAX_DEPTH);
        assert_eq!(addr.face(), CubeFace::NegZ);
        assert_eq!(addr.quadrant_at(PatchAddress::MAX_DEPTH), 3);
    }

    #[test]
    #[should_panic(expected = "MAX_DEPTH")]
    fn test_child_below_max_depth_panics() {
        let mut addr = PatchAddress::root(CubeFace::PosX);
        for _ in 0..=PatchAddress::MAX_DEPTH {
            addr = addr.child(0);
        }
    }

    #[test]
    fn test_from_bits_validates() {
        let addr = PatchAddress::root(CubeFace::NegX).child(2).child(3);
        assert_eq!(PatchAddress::from_bits(addr.to_bits()), Some(addr));
        // Face index 7 does not exist.
        assert_eq!(PatchAddress::from_bits(7 << 61), None);
        // Selector bits set beyond the encoded depth.
        assert_eq!(PatchAddress::from_bits(addr.to_bits() | (1 << 10)), None);
    }

    #[test]
    fn test_display() {
        let addr = PatchAddress::root(CubeFace::PosX).child(0).child(3);
        assert_eq!(format!("{addr}"), "PosX/03");
        assert_eq!(format!("{}", PatchAddress::root(CubeFace::NegZ)), "NegZ/root");
    }
}
