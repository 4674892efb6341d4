//! Shared data types for multi-view capture.
//!
//! This crate contains pure data structures and projection math with no I/O.
//! It is a dependency for all other crates in the workspace.

pub mod camera;
pub mod episode;
pub mod error;
#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;
pub mod frame;
pub mod layout;
pub mod params;

// Re-export camera types
pub use camera::{
    CameraMount, CameraView, CameraViewSpec, Resolution, DEFAULT_FAR_PLANE, DEFAULT_FOV,
    DEFAULT_NEAR_PLANE, DEFAULT_RESOLUTION,
};

// Re-export error types
pub use error::{FrameError, ViewError};

// Re-export frame types
pub use frame::{DepthFrame, DepthUnits, MaskFrame, PointCloud, RgbFrame};

// Re-export params types
pub use params::{intrinsics_matrix, look_at_rotation, pose_matrix, CameraParams};

// Re-export episode types
pub use episode::{
    EpisodeRecord, LowDimState, StepObservation, ViewObservation, DEFAULT_STEP_INTERVAL,
};

// Re-export layout helpers
pub use layout::{episode_dir_name, frame_file_name, VIDEOS_DIR};
