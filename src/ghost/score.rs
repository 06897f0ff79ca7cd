use crate::pose::{KeypointIndex, Pose};

/// Max joint distance counted as a match, in source pixels.
pub const DEFAULT_DISTANCE_THRESHOLD: f32 = 40.0;

/// Joints below this confidence on either side are left out of the score.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    /// Percentage of comparable joints within the threshold, 0..=100.
    pub score: u8,
    /// Per-joint match flag. Joints that were not compared are `false`.
    pub matched: [bool; KeypointIndex::COUNT],
}

impl MatchResult {
    /// Score 0, nothing matched. Used when either pose is missing.
    pub fn empty() -> Self {
        Self {
            score: 0,
            matched: [false; KeypointIndex::COUNT],
        }
    }

    pub fn matched_count(&self) -> usize {
        self.matched.iter().filter(|&&m| m).count()
    }

    pub fn is_matched(&self, index: KeypointIndex) -> bool {
        self.matched[index as usize]
    }
}

impl Default for MatchResult {
    fn default() -> Self {
        Self::empty()
    }
}

/// Compares two poses joint by joint.
///
/// A joint is comparable when both sides have a score of at least
/// `min_confidence`; it matches when the XY distance is at most
/// `distance_threshold`. The score is the rounded share of matching joints
/// among comparable ones, or 0 when nothing is comparable.
pub fn score(
    user: &Pose,
    reference: &Pose,
    distance_threshold: f32,
    min_confidence: f32,
) -> MatchResult {
    let mut matched = [false; KeypointIndex::COUNT];
    let mut comparable = 0u32;
    let mut good = 0u32;

    for (i, (u, r)) in user.keypoints.iter().zip(reference.keypoints.iter()).enumerate() {
        if !u.is_valid(min_confidence) || !r.is_valid(min_confidence) {
            continue;
        }
        comparable += 1;
        if u.distance(r) <= distance_threshold {
            matched[i] = true;
            good += 1;
        }
    }

    let score = if comparable == 0 {
        0
    } else {
        (good as f32 / comparable as f32 * 100.0).round() as u8
    };
    MatchResult { score, matched }
}
