//! Dataset directory naming.
//!
//! ```text
//! <task_name>/episode_NNN/<camera_name>/rgb/frame_NNNNNN.png
//! <task_name>/episode_NNN/<camera_name>/depth/frame_NNNNNN.npy
//! <task_name>/episode_NNN/<camera_name>/camera_params.json
//! <task_name>/episode_NNN/videos/<camera_name>.mp4
//! ```

/// Per-camera colour frames.
pub const RGB_DIR: &str = "rgb";
/// Per-camera depth arrays.
pub const DEPTH_DIR: &str = "depth";
/// Per-camera segmentation masks.
pub const MASK_DIR: &str = "mask";
/// Per-camera point clouds.
pub const POINT_CLOUD_DIR: &str = "point_cloud";
/// Per-episode videos.
pub const VIDEOS_DIR: &str = "videos";

pub const CAMERA_PARAMS_FILE: &str = "camera_params.json";
pub const DESCRIPTIONS_FILE: &str = "descriptions.json";
pub const TIMESTAMPS_FILE: &str = "timestamps.json";
pub const EPISODE_JSON_FILE: &str = "episode.json";
pub const EPISODE_PICKLE_FILE: &str = "episode.pkl";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Names the episode directory already uses for its own entries.
pub const RESERVED_NAMES: &[&str] = &[
    VIDEOS_DIR,
    DESCRIPTIONS_FILE,
    TIMESTAMPS_FILE,
    EPISODE_JSON_FILE,
    EPISODE_PICKLE_FILE,
    MANIFEST_FILE,
];

/// Checks that `name` can be a camera directory directly under an episode.
///
/// Returns the reason it cannot, if any.
pub fn camera_dir_problem(name: &str) -> Option<&'static str> {
    if name.contains(['/', '\\', '\0']) {
        Some("contains a path separator or NUL")
    } else if name.starts_with('.') {
        Some("starts with '.'")
    } else if RESERVED_NAMES.contains(&name) {
        Some("is reserved by the episode layout")
    } else {
        None
    }
}

/// Directory name of an episode, e.g. `episode_003`.
pub fn episode_dir_name(index: usize) -> String {
    format!("episode_{:03}", index)
}

/// File name of one frame, e.g. `frame_000042.png`.
pub fn frame_file_name(step: usize, extension: &str) -> String {
    format!("frame_{:06}.{}", step, extension)
}

/// Parses the step number out of a frame file name.
pub fn parse_frame_step(file_name: &str) -> Option<usize> {
    let stem = file_name.strip_prefix("frame_")?;
    let (digits, ext) = stem.split_once('.')?;
    if ext.is_empty() || ext.contains('.') {
        return None;
    }
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_dir_name() {
        assert_eq!(episode_dir_name(0), "episode_000");
        assert_eq!(episode_dir_name(42), "episode_042");
        assert_eq!(episode_dir_name(1234), "episode_1234");
    }

    #[test]
    fn test_frame_file_name() {
        assert_eq!(frame_file_name(0, "png"), "frame_000000.png");
        assert_eq!(frame_file_name(17, "npy"), "frame_000017.npy");
    }

    #[test]
    fn test_camera_dir_problem() {
        assert_eq!(camera_dir_problem("left_shoulder_camera"), None);
        assert_eq!(camera_dir_problem("cam.v2"), None);
        assert!(camera_dir_problem("a/b").is_some());
        assert!(camera_dir_problem("..\\up").is_some());
        assert!(camera_dir_problem("..").is_some());
        assert!(camera_dir_problem(".hidden").is_some());
        assert!(camera_dir_problem(VIDEOS_DIR).is_some());
        assert!(camera_dir_problem("episode.json").is_some());
    }

    #[test]
    fn test_parse_frame_step() {
        assert_eq!(parse_frame_step("frame_000017.npy"), Some(17));
        assert_eq!(parse_frame_step(&frame_file_name(99, "png")), Some(99));
        assert_eq!(parse_frame_step("frame_.png"), None);
        assert_eq!(parse_frame_step("frame_12a.png"), None);
        assert_eq!(parse_frame_step("image_000001.png"), None);
        assert_eq!(parse_frame_step("frame_000001.png.partial"), None);
    }
}
