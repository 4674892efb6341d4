//! Errors for dataset reading, writing and video assembly.

use std::path::{Path, PathBuf};

use capture_types::{FrameError, Resolution};
use thiserror::Error;

/// Errors that can occur while writing or reading episode files.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem operation failed
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// JSON (de)serialization failed
    #[error("JSON error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// PNG encoding or decoding failed
    #[error("image error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// Writing a `.npy` array failed
    #[error("npy write error at {path}: {source}")]
    NpyWrite {
        path: PathBuf,
        #[source]
        source: ndarray_npy::WriteNpyError,
    },
    /// Reading a `.npy` array failed
    #[error("npy read error at {path}: {source}")]
    NpyRead {
        path: PathBuf,
        #[source]
        source: ndarray_npy::ReadNpyError,
    },
    /// Pickle (de)serialization failed
    #[error("pickle error at {path}: {source}")]
    Pickle {
        path: PathBuf,
        #[source]
        source: serde_pickle::Error,
    },
    /// Array shape did not match the frame it came from
    #[error("shape error at {path}: {source}")]
    Shape {
        path: PathBuf,
        #[source]
        source: ndarray::ShapeError,
    },
    /// Decoded data did not form a valid frame
    #[error("invalid frame at {path}: {source}")]
    Frame {
        path: PathBuf,
        #[source]
        source: FrameError,
    },
    /// Directory did not follow the episode layout
    #[error("unexpected layout at {path}: {reason}")]
    Layout { path: PathBuf, reason: String },
}

impl IoError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        IoError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        IoError::Json {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn layout(path: &Path, reason: impl Into<String>) -> Self {
        IoError::Layout {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while assembling a video.
#[derive(Debug, Error)]
pub enum VideoError {
    /// Frame sequence was empty
    #[error("cannot assemble a video from zero frames")]
    NoFrames,
    /// A frame's size differs from the first frame
    #[error("frame {index} is {found}, expected {expected}")]
    ResolutionMismatch {
        index: usize,
        expected: Resolution,
        found: Resolution,
    },
    /// Frame rate was zero
    #[error("frame rate must be positive")]
    InvalidFrameRate,
    /// External encoder binary could not be started
    #[error("video encoder '{program}' is unavailable: {source}")]
    EncoderUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// External encoder exited unsuccessfully
    #[error("video encoder failed with {status}: {stderr}")]
    EncoderFailed { status: String, stderr: String },
    /// In-process GIF encoding failed
    #[error("GIF encoding failed: {0}")]
    Gif(#[from] image::ImageError),
    /// Filesystem operation failed
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
