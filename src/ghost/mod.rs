//! Reference-vs-user comparison: fit the reference skeleton onto the user's
//! body, mirror it, and score how closely the two agree.

pub mod feedback;
pub mod mirror;
pub mod normalize;
pub mod score;
pub mod settings;

pub use feedback::{FeedbackEvent, FeedbackTracker};
pub use mirror::{mirror, MIRROR_MAP};
pub use normalize::{normalize, torso_length, MIN_TORSO_LENGTH};
pub use score::{score, MatchResult, DEFAULT_DISTANCE_THRESHOLD, DEFAULT_MIN_CONFIDENCE};
pub use settings::{GhostSettings, PracticeSettings, MAX_GHOST_OPACITY};
