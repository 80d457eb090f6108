//! Split policy: how close the camera must be before a patch is refined,
//! and how deep a body may be refined at all.

/// Patch edge length (vertices per side, excluding the skirt ring) for each
/// detail level.
pub const DETAIL_EDGE_LENGTHS: [u32; 5] = [7, 15, 25, 35, 55];

/// Edge length for a detail level, or `None` if the level does not exist.
#[must_use]
pub fn edge_length_for_detail(detail: u8) -> Option<u32> {
    DETAIL_EDGE_LENGTHS.get(detail as usize).copied()
}

/// Distance-based refinement thresholds for one body.
///
/// Distances are measured in unit-sphere radii. The threshold halves with
/// every level, matching the halving of the patch size.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitPolicy {
    subdivide_at_camdist: f64,
    depth_limit: u8,
}

impl SplitPolicy {
    /// Create a policy.
    ///
    /// `depth_limit` is the lesser of the global ceiling and the body's own
    /// maximum (see [`body_max_depth`]).
    ///
    /// # Panics
    ///
    /// Panics if `subdivide_at_camdist` is not positive.
    pub fn new(subdivide_at_camdist: f64, global_max_depth: u8, body_max_depth: u8) -> Self {
        assert!(
            subdivide_at_camdist > 0.0,
            "subdivide_at_camdist must be positive, got {subdivide_at_camdist}"
        );
        Self {
            subdivide_at_camdist,
            depth_limit: global_max_depth.min(body_max_depth),
        }
    }

    /// Camera distance below which a patch at `depth` wants more detail.
    #[must_use]
    pub fn rough_length(&self, depth: u8) -> f64 {
        self.subdivide_at_camdist / f64::powi(2.0, depth as i32)
    }

    /// Deepest level a patch may be split to.
    #[must_use]
    pub fn depth_limit(&self) -> u8 {
        self.depth_limit
    }

    /// Whether a patch at `depth` is allowed to gain children at all.
    #[must_use]
    pub fn can_refine(&self, depth: u8) -> bool {
        depth < self.depth_limit
    }

    /// Whether the camera is close enough for the patch's error to show.
    ///
    /// The boundary is inclusive: a camera exactly at the rough length
    /// triggers the split.
    #[must_use]
    pub fn exceeds_error(&self, depth: u8, distance: f64) -> bool {
        distance <= self.rough_length(depth)
    }
}

/// Depth at which a patch triangle edge first becomes no longer than
/// `target_triangle_length` on a body of the given circumference.
///
/// The four root patches around a great circle contribute
/// `4 * (edge_len - 1)` triangle edges; every level halves their length.
/// The result is capped at `ceiling`.
#[must_use]
pub fn body_max_depth(
    circumference: f64,
    edge_len: u32,
    target_triangle_length: f64,
    ceiling: u8,
) -> u8 {
    let segments = 4.0 * (edge_len.max(2) - 1) as f64;
    let mut edge_length = circumference / segments;
    let mut depth = 0;
    while edge_length > target_triangle_length && depth < ceiling {
        edge_length *= 0.5;
        depth += 1;
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;

    const EARTH_CIRCUMFERENCE: f64 = 2.0 * std::f64::consts::PI * 6_371_000.0;

    #[test]
    fn test_rough_length_halves_per_level() {
        let policy = SplitPolicy::new(5.0, 20, 20);
        assert_eq!(policy.rough_length(0), 5.0);
        assert_eq!(policy.rough_length(1), 2.5);
        assert_eq!(policy.rough_length(3), 0.625);
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let policy = SplitPolicy::new(5.0, 20, 20);
        let threshold = policy.rough_length(3);
        assert!(policy.exceeds_error(3, threshold));
        assert!(policy.exceeds_error(3, threshold * 0.5));
        assert!(!policy.exceeds_error(3, threshold * 1.000_001));
    }

    #[test]
    fn test_depth_limit_is_lesser_of_global_and_body() {
        assert_eq!(SplitPolicy::new(5.0, 20, 13).depth_limit(), 13);
        assert_eq!(SplitPolicy::new(5.0, 9, 13).depth_limit(), 9);
        let policy = SplitPolicy::new(5.0, 9, 13);
        assert!(policy.can_refine(8));
        assert!(!policy.can_refine(9));
    }

    #[test]
    fn test_body_max_depth_earth() {
        let depth = body_max_depth(EARTH_CIRCUMFERENCE, 15, 100.0, 28);
        // 40,030 km / 56 segments ~ 715 km; halving 13 times reaches ~87 m.
        assert_eq!(depth, 13);
    }

    #[test]
    fn test_body_max_depth_grows_with_body_size() {
        let small = body_max_depth(EARTH_CIRCUMFERENCE * 0.01, 15, 100.0, 28);
        let large = body_max_depth(EARTH_CIRCUMFERENCE, 15, 100.0, 28);
        assert!(small < large, "small={small}, large={large}");
    }

    #[test]
    fn test_body_max_depth_respects_ceiling() {
        assert_eq!(body_max_depth(EARTH_CIRCUMFERENCE, 7, 0.001, 10), 10);
    }

    #[test]
    fn test_finer_detail_needs_less_depth() {
        let coarse = body_max_depth(EARTH_CIRCUMFERENCE, 7, 100.0, 28);
        let fine = body_max_depth(EARTH_CIRCUMFERENCE, 55, 100.0, 28);
        assert!(fine < coarse, "fine={fine}, coarse={coarse}");
    }

    #[test]
    fn test_edge_length_for_detail() {
        assert_eq!(edge_length_for_detail(0), Some(7));
        assert_eq!(edge_length_for_detail(4), Some(55));
        assert_eq!(edge_length_for_detail(5), None);
    }

    #[test]
    #[should_panic(expected = "must be positive")]
    fn test_non_positive_threshold_panics() {
        let _ = SplitPolicy::new(0.0, 20, 20);
    }
}
