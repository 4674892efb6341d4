//! Episode directory reader.
//!
//! The inverse of [`EpisodeWriter`](crate::EpisodeWriter): lists the cameras
//! and frames of a written episode and decodes them back into frame types.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use capture_types::layout::{
    parse_frame_step, CAMERA_PARAMS_FILE, DEPTH_DIR, DESCRIPTIONS_FILE, EPISODE_JSON_FILE,
    EPISODE_PICKLE_FILE, MASK_DIR, POINT_CLOUD_DIR, RGB_DIR, TIMESTAMPS_FILE, VIDEOS_DIR,
};
use capture_types::{frame_file_name, DepthFrame, DepthUnits, EpisodeRecord, RgbFrame};
use ndarray::Array2;
use ndarray_npy::ReadNpyExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::atomic::PARTIAL_SUFFIX;
use crate::error::IoError;
use crate::serializer::CameraParamsRecord;

/// Number of frame files per modality for one camera.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameCounts {
    pub rgb: usize,
    pub depth: usize,
    pub mask: usize,
    pub point_cloud: usize,
}

/// Read access to one `episode_NNN` directory.
#[derive(Debug, Clone)]
pub struct EpisodeReader {
    dir: PathBuf,
}

impl EpisodeReader {
    /// Opens an episode directory. Fails if it does not exist.
    pub fn open(dir: &Path) -> Result<Self, IoError> {
        if !dir.is_dir() {
            return Err(IoError::layout(dir, "episode directory does not exist"));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Camera directories (those holding an `rgb/` folder), sorted.
    pub fn cameras(&self) -> Result<Vec<String>, IoError> {
        let mut cameras = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(|e| IoError::io(&self.dir, e))? {
            let entry = entry.map_err(|e| IoError::io(&self.dir, e))?;
            let path = entry.path();
            if !path.is_dir() || !path.join(RGB_DIR).is_dir() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name != VIDEOS_DIR {
                    cameras.push(name.to_string());
                }
            }
        }
        cameras.sort();
        Ok(cameras)
    }

    /// Sorted step indices present in one modality folder of a camera.
    ///
    /// Missing folders yield an empty list. Partial files are ignored.
    pub fn frame_steps(&self, camera: &str, modality: &str) -> Result<Vec<usize>, IoError> {
        let dir = self.dir.join(camera).join(modality);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut steps = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| IoError::io(&dir, e))? {
            let entry = entry.map_err(|e| IoError::io(&dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.ends_with(PARTIAL_SUFFIX) {
                continue;
            }
            if let Some(step) = parse_frame_step(name) {
                steps.push(step);
            }
        }
        steps.sort_unstable();
        Ok(steps)
    }

    /// Frame counts for every camera.
    pub fn frame_counts(&self) -> Result<BTreeMap<String, FrameCounts>, IoError> {
        let mut counts = BTreeMap::new();
        for camera in self.cameras()? {
            let c = FrameCounts {
                rgb: self.frame_steps(&camera, RGB_DIR)?.len(),
                depth: self.frame_steps(&camera, DEPTH_DIR)?.len(),
                mask: self.frame_steps(&camera, MASK_DIR)?.len(),
                point_cloud: self.frame_steps(&camera, POINT_CLOUD_DIR)?.len(),
            };
            counts.insert(camera, c);
        }
        Ok(counts)
    }

    pub fn read_camera_params(&self, camera: &str) -> Result<CameraParamsRecord, IoError> {
        read_json(&self.dir.join(camera).join(CAMERA_PARAMS_FILE))
    }

    pub fn read_descriptions(&self) -> Result<Vec<String>, IoError> {
        read_json(&self.dir.join(DESCRIPTIONS_FILE))
    }

    pub fn read_timestamps(&self) -> Result<Vec<f64>, IoError> {
        read_json(&self.dir.join(TIMESTAMPS_FILE))
    }

    /// Decodes one colour frame.
    pub fn read_rgb(&self, camera: &str, step: usize) -> Result<RgbFrame, IoError> {
        let path = self
            .dir
            .join(camera)
            .join(RGB_DIR)
            .join(frame_file_name(step, "png"));
        read_rgb_png(&path)
    }

    /// Loads one depth array. The file does not record units, so the caller
    /// states them.
    pub fn read_depth(
        &self,
        camera: &str,
        step: usize,
        units: DepthUnits,
    ) -> Result<DepthFrame, IoError> {
        let path = self
            .dir
            .join(camera)
            .join(DEPTH_DIR)
            .join(frame_file_name(step, "npy"));
        read_depth_npy(&path, units)
    }

    /// Loads the full JSON dump.
    pub fn read_episode_json(&self) -> Result<EpisodeRecord, IoError> {
        read_json(&self.dir.join(EPISODE_JSON_FILE))
    }

    /// Loads the full pickle dump.
    pub fn read_episode_pickle(&self) -> Result<EpisodeRecord, IoError> {
        let path = self.dir.join(EPISODE_PICKLE_FILE);
        let file = File::open(&path).map_err(|e| IoError::io(&path, e))?;
        serde_pickle::from_reader(BufReader::new(file), serde_pickle::DeOptions::new()).map_err(
            |source| IoError::Pickle {
                path: path.clone(),
                source,
            },
        )
    }

    /// Video files in `videos/`, sorted.
    pub fn videos(&self) -> Result<Vec<PathBuf>, IoError> {
        let dir = self.dir.join(VIDEOS_DIR);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut videos: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(|e| IoError::io(&dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        videos.sort();
        Ok(videos)
    }
}

/// Reads a JSON file into `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, IoError> {
    let file = File::open(path).map_err(|e| IoError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| IoError::json(path, e))
}

/// Decodes a PNG into an RGB frame, converting other colour types.
pub fn read_rgb_png(path: &Path) -> Result<RgbFrame, IoError> {
    let image = image::open(path)
        .map_err(|source| IoError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();
    let (width, height) = image.dimensions();
    RgbFrame::new(width, height, image.into_raw()).map_err(|source| IoError::Frame {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads a `(height, width)` float32 `.npy` array as a depth frame.
pub fn read_depth_npy(path: &Path, units: DepthUnits) -> Result<DepthFrame, IoError> {
    let file = File::open(path).map_err(|e| IoError::io(path, e))?;
    let array = Array2::<f32>::read_npy(BufReader::new(file)).map_err(|source| {
        IoError::NpyRead {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let (height, width) = array.dim();
    let values = array.iter().copied().collect();
    DepthFrame::new(width as u32, height as u32, units, values).map_err(|source| {
        IoError::Frame {
            path: path.to_path_buf(),
            source,
        }
    })
}
