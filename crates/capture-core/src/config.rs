//! Configuration loading for capture runs.
//!
//! All settings are loaded from a TOML configuration file. Every section is
//! optional and falls back to its defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use capture_io::{VideoFormat, VideoSettings, WriteOptions, DEFAULT_FPS};
use capture_types::{
    CameraMount, CameraView, CameraViewSpec, DepthUnits, Resolution, ViewError,
    DEFAULT_FAR_PLANE, DEFAULT_FOV, DEFAULT_NEAR_PLANE, DEFAULT_STEP_INTERVAL,
};

/// Complete capture configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// What to extract and where to put it
    #[serde(default)]
    pub capture: CaptureSettings,
    /// Which files to write per episode
    #[serde(default)]
    pub dump: WriteOptions,
    /// Demonstration video settings
    #[serde(default)]
    pub video: VideoConfig,
    /// Built-in synthetic scene settings
    #[serde(default)]
    pub scene: SceneConfig,
    /// Custom camera views added on top of the defaults in enhanced mode
    #[serde(default)]
    pub cameras: Vec<CameraEntry>,
}

impl CaptureConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks settings that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.max_steps == 0 {
            return Err(ConfigError::Invalid("capture.max_steps must be positive".into()));
        }
        if self.video.fps == 0 {
            return Err(ConfigError::Invalid("video.fps must be positive".into()));
        }
        if !self.scene.resolution.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "scene.resolution {} must be non-zero",
                self.scene.resolution
            )));
        }
        if self.scene.step_interval.is_nan() || self.scene.step_interval <= 0.0 {
            return Err(ConfigError::Invalid("scene.step_interval must be positive".into()));
        }
        self.custom_views().map(|_| ())
    }

    /// Builds the `[[cameras]]` entries into validated views.
    ///
    /// Entries without a resolution use the scene resolution.
    pub fn custom_views(&self) -> Result<Vec<CameraView>, ConfigError> {
        let mut seen = HashSet::new();
        let mut views = Vec::with_capacity(self.cameras.len());
        for entry in &self.cameras {
            let view = entry.to_view(self.scene.resolution)?;
            if !seen.insert(view.name().to_string()) {
                return Err(ViewError::DuplicateName(view.name().to_string()).into());
            }
            views.push(view);
        }
        Ok(views)
    }
}

/// Extraction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Default simulator cameras only
    #[default]
    Quick,
    /// Default cameras plus the configured custom cameras
    Enhanced,
}

/// What to extract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Root output directory; each task gets a subdirectory
    pub save_dir: PathBuf,
    /// Tasks to extract
    pub tasks: Vec<String>,
    /// Episodes per task
    pub episodes_per_task: usize,
    pub mode: ExtractionMode,
    /// Upper bound on recorded steps per episode
    pub max_steps: usize,
    /// Back-project depth into world-space point clouds
    pub compute_point_clouds: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("./multiview_data"),
            tasks: vec!["ReachTarget".to_string(), "PickUpCup".to_string()],
            episodes_per_task: 2,
            mode: ExtractionMode::Quick,
            max_steps: 200,
            compute_point_clouds: false,
        }
    }
}

/// Video output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Write one video per camera per episode
    pub enabled: bool,
    pub fps: u32,
    pub format: VideoFormat,
    pub ffmpeg_path: String,
    /// Write GIF when ffmpeg is missing
    pub fallback_to_gif: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        let settings = VideoSettings::default();
        Self {
            enabled: true,
            fps: DEFAULT_FPS,
            format: settings.format,
            ffmpeg_path: settings.ffmpeg_path,
            fallback_to_gif: settings.fallback_to_gif,
        }
    }
}

impl VideoConfig {
    /// Encoder settings, or `None` when videos are disabled.
    pub fn settings(&self) -> Option<VideoSettings> {
        self.enabled.then(|| VideoSettings {
            fps: self.fps,
            format: self.format,
            ffmpeg_path: self.ffmpeg_path.clone(),
            fallback_to_gif: self.fallback_to_gif,
        })
    }
}

/// Synthetic scene settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Base seed; each episode derives its own
    pub seed: u64,
    /// Steps in one scripted demonstration
    pub demo_steps: usize,
    /// Seconds between demonstration steps
    pub step_interval: f64,
    /// Image size of the default cameras
    pub resolution: Resolution,
    pub depth_units: DepthUnits,
    /// Render segmentation masks
    pub masks: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            demo_steps: 40,
            step_interval: DEFAULT_STEP_INTERVAL,
            resolution: Resolution::new(128, 128),
            depth_units: DepthUnits::Normalized,
            masks: true,
        }
    }
}

/// One `[[cameras]]` entry.
///
/// Either `orientation` or `look_at` sets where the camera points; `look_at`
/// wins when both are given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraEntry {
    pub name: String,
    pub position: [f64; 3],
    /// (roll, pitch, yaw) in degrees
    #[serde(default)]
    pub orientation: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub look_at: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(default = "default_fov")]
    pub fov: f64,
    #[serde(default = "default_near_plane")]
    pub near_plane: f64,
    #[serde(default = "default_far_plane")]
    pub far_plane: f64,
    #[serde(default)]
    pub mount: CameraMount,
}

fn default_fov() -> f64 {
    DEFAULT_FOV
}

fn default_near_plane() -> f64 {
    DEFAULT_NEAR_PLANE
}

fn default_far_plane() -> f64 {
    DEFAULT_FAR_PLANE
}

impl CameraEntry {
    /// Validates the entry into a view.
    pub fn to_view(&self, default_resolution: Resolution) -> Result<CameraView, ViewError> {
        let resolution = self.resolution.unwrap_or(default_resolution);
        let orientation = match self.look_at {
            Some(target) => {
                CameraView::looking_at(self.name.clone(), self.position, target, resolution)?
                    .orientation()
            }
            None => self.orientation,
        };
        CameraViewSpec::new(self.name.clone(), self.position, orientation)
            .resolution(resolution.width, resolution.height)
            .fov(self.fov)
            .clip_planes(self.near_plane, self.far_plane)
            .mount(self.mount)
            .build()
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("invalid camera: {0}")]
    View(#[from] ViewError),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Generates a default configuration file content.
pub fn default_config_toml() -> String {
    r#"# Multi-view capture configuration

[capture]
save_dir = "./multiview_data"
tasks = ["ReachTarget", "PickUpCup"]
episodes_per_task = 2
# "quick" uses the default cameras, "enhanced" adds [[cameras]]
mode = "quick"
max_steps = 200
compute_point_clouds = false

[dump]
json_dump = true
pickle_dump = true
masks = true
point_clouds = true

[video]
enabled = true
fps = 30
# "mp4" needs ffmpeg on PATH; "gif" is encoded in-process
format = "mp4"
ffmpeg_path = "ffmpeg"
fallback_to_gif = true

[scene]
seed = 42
demo_steps = 40
step_interval = 0.1
resolution = [128, 128]
depth_units = "normalized"
masks = true

# Custom cameras, used in enhanced mode
[[cameras]]
name = "side_camera"
position = [0.8, 0.0, 0.5]
look_at = [0.0, 0.0, 0.05]
fov = 55.0

[[cameras]]
name = "low_angle_camera"
position = [0.0, -0.9, 0.15]
look_at = [0.0, 0.0, 0.1]
resolution = [160, 120]
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CaptureConfig::default();

        assert_eq!(config.capture.episodes_per_task, 2);
        assert_eq!(config.capture.mode, ExtractionMode::Quick);
        assert_eq!(config.scene.seed, 42);
        assert_eq!(config.video.fps, 30);
        assert!(config.dump.json_dump);
        assert!(config.cameras.is_empty());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
            [capture]
            episodes_per_task = 5

            [scene]
            seed = 7
        "#;

        let config = CaptureConfig::from_str(toml).unwrap();

        // Specified values
        assert_eq!(config.capture.episodes_per_task, 5);
        assert_eq!(config.scene.seed, 7);
        // Defaults
        assert_eq!(config.capture.max_steps, 200);
        assert_eq!(config.scene.demo_steps, 40);
        assert_eq!(config.video.format, VideoFormat::Mp4);
    }

    #[test]
    fn test_default_config_toml_parses() {
        let config = CaptureConfig::from_str(&default_config_toml()).unwrap();

        assert_eq!(config.capture, CaptureSettings::default());
        assert_eq!(config.dump, WriteOptions::default());
        assert_eq!(config.video, VideoConfig::default());
        assert_eq!(config.scene, SceneConfig::default());
        assert_eq!(config.cameras.len(), 2);

        let views = config.custom_views().unwrap();
        assert_eq!(views[0].name(), "side_camera");
        assert_eq!(views[0].resolution(), Resolution::new(128, 128));
        assert_eq!(views[0].fov(), 55.0);
        assert_eq!(views[1].resolution(), Resolution::new(160, 120));
    }

    #[test]
    fn test_config_to_toml_roundtrip() {
        let config = CaptureConfig::from_str(&default_config_toml()).unwrap();
        let toml = config.to_toml().unwrap();

        assert!(toml.contains("[capture]"));
        assert!(toml.contains("[[cameras]]"));
        assert_eq!(CaptureConfig::from_str(&toml).unwrap(), config);
    }

    #[test]
    fn test_duplicate_camera_rejected() {
        let toml = r#"
            [[cameras]]
            name = "side"
            position = [1.0, 0.0, 0.5]

            [[cameras]]
            name = "side"
            position = [0.0, 1.0, 0.5]
        "#;

        let err = CaptureConfig::from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::View(ViewError::DuplicateName(ref n)) if n == "side"));
    }

    #[test]
    fn test_invalid_camera_rejected() {
        let toml = r#"
            [[cameras]]
            name = "tiny"
            position = [1.0, 0.0, 0.5]
            resolution = [0, 10]
        "#;

        assert!(matches!(
            CaptureConfig::from_str(toml),
            Err(ConfigError::View(ViewError::InvalidResolution { .. }))
        ));
    }

    #[test]
    fn test_zero_fps_rejected() {
        let toml = r#"
            [video]
            fps = 0
        "#;

        assert!(matches!(
            CaptureConfig::from_str(toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_look_at_entry_points_at_target() {
        let entry = CameraEntry {
            name: "side".to_string(),
            position: [1.0, 0.0, 0.0],
            orientation: [0.0; 3],
            look_at: Some([0.0, 0.0, 0.0]),
            resolution: None,
            fov: DEFAULT_FOV,
            near_plane: DEFAULT_NEAR_PLANE,
            far_plane: DEFAULT_FAR_PLANE,
            mount: CameraMount::World,
        };
        let view = entry.to_view(Resolution::new(32, 32)).unwrap();
        let axis = view.rotation() * nalgebra::Vector3::z();

        assert!((axis.x + 1.0).abs() < 1e-9);
        assert_eq!(view.resolution(), Resolution::new(32, 32));
    }

    #[test]
    fn test_video_config_disabled() {
        let video = VideoConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(video.settings().is_none());
        assert_eq!(VideoConfig::default().settings(), Some(VideoSettings::default()));
    }

    #[test]
    fn test_extraction_mode_serialization() {
        assert_eq!(
            serde_json::to_string(&ExtractionMode::Quick).unwrap(),
            r#""quick""#
        );
        assert_eq!(
            serde_json::to_string(&ExtractionMode::Enhanced).unwrap(),
            r#""enhanced""#
        );
    }
}
