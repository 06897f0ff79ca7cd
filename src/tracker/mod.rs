pub mod buffer;
pub mod lerp;
pub mod scheduler;
pub mod smooth;

pub use buffer::DetectionBuffer;
pub use lerp::{interpolate, lerp_pose};
pub use scheduler::{
    DetectionLoop, DetectionRate, DetectionStats, LoopHandle, StreamKind, TickOutcome,
};
pub use smooth::smooth;
