//! Camera configuration errors.

use thiserror::Error;

/// Errors raised while constructing or registering a camera view.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    /// Camera name was empty or whitespace
    #[error("camera name must not be empty")]
    EmptyName,
    /// Name cannot be used as a directory inside an episode
    #[error("camera name '{name}' {reason}")]
    InvalidName { name: String, reason: &'static str },
    /// Width or height was zero
    #[error("camera '{name}' has invalid resolution {width}x{height}")]
    InvalidResolution {
        name: String,
        width: u32,
        height: u32,
    },
    /// Field of view outside (0, 180) degrees
    #[error("camera '{name}' has invalid field of view {fov} (expected 0 < fov < 180)")]
    InvalidFov { name: String, fov: f64 },
    /// Clip planes not ordered 0 < near < far
    #[error("camera '{name}' has invalid clip planes near={near} far={far}")]
    InvalidClipPlanes { name: String, near: f64, far: f64 },
    /// Position or orientation contained NaN or infinity
    #[error("camera '{name}' has a non-finite pose")]
    NonFinitePose { name: String },
    /// Two views share a name within one extractor
    #[error("camera '{0}' is already registered")]
    DuplicateName(String),
}

/// Errors raised when frame dimensions and buffer sizes disagree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Buffer length does not match width x height x channels
    #[error("frame buffer has {actual} elements, expected {expected} for {width}x{height}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    /// Width or height was zero
    #[error("frame dimensions must be positive, got {width}x{height}")]
    EmptyFrame { width: u32, height: u32 },
}
