//! Multi-view capture: simulator seam, extraction and configuration.
//!
//! Plays scripted task demonstrations in a [`Simulator`], records every
//! configured camera at every step, and hands the episodes to `capture-io`
//! for serialization and video assembly.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐  Capture per view  ┌───────────────────┐  EpisodeRecord  ┌────────────┐
//! │ Simulator     │ ─────────────────▶ │ MultiViewExtractor│ ──────────────▶ │ capture-io │
//! │ (synthetic)   │                    └───────────────────┘                 └────────────┘
//! └───────────────┘
//! ```
//!
//! # Modules
//!
//! - [`sim`]: Simulator trait and the built-in synthetic tabletop scene
//! - [`extractor`]: Quick, enhanced and custom multi-view extraction
//! - [`motion`]: Camera paths and fly-around recording
//! - [`pointcloud`]: Depth back-projection
//! - [`config`]: TOML configuration

pub mod config;
pub mod error;
pub mod extractor;
pub mod motion;
pub mod pointcloud;
pub mod sim;

// Re-export config types
pub use config::{
    default_config_toml, CameraEntry, CaptureConfig, CaptureSettings, ConfigError,
    ExtractionMode, SceneConfig, VideoConfig,
};

// Re-export error types
pub use error::{CaptureError, SimError};

// Re-export extractor types
pub use extractor::{ExtractorOptions, MultiViewExtractor, TaskOutcome};

// Re-export motion types
pub use motion::{record_motion, CameraMotion, MotionPlan};

pub use pointcloud::point_cloud_from_depth;

// Re-export simulator types
pub use sim::{Capture, Simulator, SyntheticScene, TaskKind};
