//! Dataset I/O for multi-view capture.
//!
//! Turns in-memory episodes into files on disk and back again, and stitches
//! colour frames into per-camera videos.
//!
//! # Layout
//!
//! ```text
//! <save_dir>/<task>/
//! ├── manifest.json
//! └── episode_000/
//!     ├── descriptions.json
//!     ├── timestamps.json
//!     ├── episode.json / episode.pkl
//!     ├── <camera>/
//!     │   ├── rgb/frame_000000.png
//!     │   ├── depth/frame_000000.npy
//!     │   ├── mask/frame_000000.png
//!     │   ├── point_cloud/frame_000000.npy
//!     │   └── camera_params.json
//!     └── videos/<camera>.mp4
//! ```
//!
//! # Modules
//!
//! - [`serializer`]: Episode writer and per-format file writers
//! - [`reader`]: Episode reader for written directories
//! - [`video`]: MP4/GIF assembly from frame sequences
//! - [`manifest`]: Per-task run manifest
//! - [`atomic`]: Write-then-rename helper used by every writer

pub mod atomic;
pub mod error;
pub mod manifest;
pub mod reader;
pub mod serializer;
pub mod video;

// Re-export error types
pub use error::{IoError, VideoError};

// Re-export writer types
pub use serializer::{
    write_depth_npy, write_json, write_mask_png, write_pickle, write_point_cloud_npy,
    write_rgb_png, CameraParamsRecord, EpisodeSummary, EpisodeWriter, WriteOptions,
};

// Re-export reader types
pub use reader::{read_depth_npy, read_json, read_rgb_png, EpisodeReader, FrameCounts};

// Re-export video types
pub use video::{VideoAssembler, VideoFormat, VideoOutput, VideoSettings, DEFAULT_FPS};

// Re-export manifest types
pub use manifest::{generate_run_id, TaskManifest};

pub use atomic::write_atomic;
