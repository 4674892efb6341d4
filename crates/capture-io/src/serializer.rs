//! Episode serialization.
//!
//! Writes one [`EpisodeRecord`] to a directory following the dataset layout:
//! PNG colour frames, `.npy` depth arrays, optional masks and point clouds,
//! `camera_params.json` per camera, and the full episode dumped as JSON and
//! pickle. Every file goes through [`write_atomic`], so each one is either
//! complete or absent, and the episode directory itself is staged and
//! renamed so a rewrite never mixes frames from two runs.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use capture_types::layout::{
    camera_dir_problem, CAMERA_PARAMS_FILE, DEPTH_DIR, DESCRIPTIONS_FILE, EPISODE_JSON_FILE,
    EPISODE_PICKLE_FILE, MASK_DIR, POINT_CLOUD_DIR, RGB_DIR, TIMESTAMPS_FILE,
};
use capture_types::{
    frame_file_name, CameraParams, DepthFrame, EpisodeRecord, MaskFrame, PointCloud, RgbFrame,
};
use image::{GrayImage, ImageFormat, RgbImage};
use ndarray::{Array2, Array3};
use ndarray_npy::WriteNpyExt;
use serde::{Deserialize, Serialize};

use crate::atomic::{partial_path, write_atomic};
use crate::error::IoError;

/// Contents of `camera_params.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraParamsRecord {
    /// Parameters at the first step
    #[serde(flatten)]
    pub params: CameraParams,
    /// Extrinsics at every step, present only when the camera moved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extrinsics_per_step: Option<Vec<[[f64; 4]; 4]>>,
}

/// Which optional outputs to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Write `episode.json` with every frame inlined
    pub json_dump: bool,
    /// Write `episode.pkl` with every frame inlined
    pub pickle_dump: bool,
    /// Write `mask/` frames when observations carry masks
    pub masks: bool,
    /// Write `point_cloud/` arrays when observations carry point clouds
    pub point_clouds: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            json_dump: true,
            pickle_dump: true,
            masks: true,
            point_clouds: true,
        }
    }
}

/// What was written for one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub episode_id: String,
    pub path: PathBuf,
    pub steps: usize,
    pub cameras: Vec<String>,
    pub files_written: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub videos: Vec<PathBuf>,
}

/// Writes episodes under a task directory.
#[derive(Debug, Clone, Default)]
pub struct EpisodeWriter {
    options: WriteOptions,
}

impl EpisodeWriter {
    pub fn new(options: WriteOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Writes `episode` to `task_dir/episode_NNN/`.
    ///
    /// The episode is staged in `episode_NNN.partial/` and renamed into
    /// place, replacing any earlier output for the same episode. On failure
    /// the staging directory is removed and earlier output is left as it was.
    pub fn write_episode(
        &self,
        episode: &EpisodeRecord,
        task_dir: &Path,
    ) -> Result<EpisodeSummary, IoError> {
        let episode_dir = task_dir.join(episode.episode_id());
        for camera in episode.camera_names() {
            if let Some(reason) = camera_dir_problem(&camera) {
                return Err(IoError::layout(
                    &episode_dir,
                    format!("camera name '{}' {}", camera, reason),
                ));
            }
        }
        let staging = partial_path(&episode_dir);
        remove_dir(&staging)?;

        let files = match self.write_contents(episode, &staging) {
            Ok(files) => files,
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                return Err(e);
            }
        };
        if remove_dir(&episode_dir)? {
            tracing::debug!("Replacing existing output in {:?}", episode_dir);
        }
        fs::rename(&staging, &episode_dir).map_err(|e| IoError::io(&episode_dir, e))?;

        let cameras = episode.camera_names();
        tracing::info!(
            "Wrote {} ({} steps, {} cameras, {} files) to {:?}",
            episode.episode_id(),
            episode.len(),
            cameras.len(),
            files,
            episode_dir
        );

        Ok(EpisodeSummary {
            episode_id: episode.episode_id(),
            path: episode_dir,
            steps: episode.len(),
            cameras,
            files_written: files,
            videos: Vec::new(),
        })
    }

    /// Writes every file of `episode` under `dir`. Returns the file count.
    fn write_contents(&self, episode: &EpisodeRecord, dir: &Path) -> Result<usize, IoError> {
        create_dir(dir)?;

        let mut files = 0;
        write_json(&dir.join(DESCRIPTIONS_FILE), &episode.descriptions)?;
        write_json(&dir.join(TIMESTAMPS_FILE), &episode.timestamps())?;
        files += 2;

        for camera in &episode.camera_names() {
            files += self.write_camera(episode, camera, &dir.join(camera))?;
        }

        if self.options.json_dump {
            write_json(&dir.join(EPISODE_JSON_FILE), episode)?;
            files += 1;
        }
        if self.options.pickle_dump {
            write_pickle(&dir.join(EPISODE_PICKLE_FILE), episode)?;
            files += 1;
        }
        Ok(files)
    }

    /// Writes every frame of one camera plus its parameters. Returns the file count.
    fn write_camera(
        &self,
        episode: &EpisodeRecord,
        camera: &str,
        camera_dir: &Path,
    ) -> Result<usize, IoError> {
        let rgb_dir = camera_dir.join(RGB_DIR);
        let depth_dir = camera_dir.join(DEPTH_DIR);
        let mask_dir = camera_dir.join(MASK_DIR);
        let cloud_dir = camera_dir.join(POINT_CLOUD_DIR);
        create_dir(&rgb_dir)?;
        create_dir(&depth_dir)?;

        let mut files = 0;
        for step in &episode.steps {
            let Some(view) = step.views.get(camera) else {
                continue;
            };
            write_rgb_png(&rgb_dir.join(frame_file_name(step.step, "png")), &view.rgb)?;
            write_depth_npy(&depth_dir.join(frame_file_name(step.step, "npy")), &view.depth)?;
            files += 2;

            if let (true, Some(mask)) = (self.options.masks, &view.mask) {
                create_dir(&mask_dir)?;
                write_mask_png(&mask_dir.join(frame_file_name(step.step, "png")), mask)?;
                files += 1;
            }
            if let (true, Some(cloud)) = (self.options.point_clouds, &view.point_cloud) {
                create_dir(&cloud_dir)?;
                write_point_cloud_npy(&cloud_dir.join(frame_file_name(step.step, "npy")), cloud)?;
                files += 1;
            }
        }

        let trajectory = episode.camera_trajectory(camera);
        if let Some(first) = trajectory.first() {
            let extrinsics_per_step = episode
                .camera_moved(camera)
                .then(|| trajectory.iter().map(|p| p.extrinsics).collect());
            let record = CameraParamsRecord {
                params: (*first).clone(),
                extrinsics_per_step,
            };
            write_json(&camera_dir.join(CAMERA_PARAMS_FILE), &record)?;
            files += 1;
        }

        tracing::debug!("Wrote {} files for camera {}", files, camera);
        Ok(files)
    }
}

fn create_dir(path: &Path) -> Result<(), IoError> {
    fs::create_dir_all(path).map_err(|e| IoError::io(path, e))
}

/// Removes `path` and everything below it. Returns whether it existed.
fn remove_dir(path: &Path) -> Result<bool, IoError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(IoError::io(path, e)),
    }
}

/// Writes `value` as pretty-printed JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), IoError> {
    write_atomic(path, |w, p| {
        serde_json::to_writer_pretty(&mut *w, value).map_err(|e| IoError::json(p, e))?;
        w.write_all(b"\n").map_err(|e| IoError::io(p, e))
    })
}

/// Writes `value` as a pickle (protocol 3).
pub fn write_pickle<T: Serialize>(path: &Path, value: &T) -> Result<(), IoError> {
    write_atomic(path, |w, p| {
        serde_pickle::to_writer(w, value, serde_pickle::SerOptions::new()).map_err(|source| {
            IoError::Pickle {
                path: p.to_path_buf(),
                source,
            }
        })
    })
}

fn image_error(path: &Path, source: image::ImageError) -> IoError {
    IoError::Image {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes a colour frame as an 8-bit RGB PNG.
pub fn write_rgb_png(path: &Path, frame: &RgbFrame) -> Result<(), IoError> {
    let image = RgbImage::from_raw(frame.width(), frame.height(), frame.as_bytes().to_vec())
        .ok_or_else(|| IoError::layout(path, "colour buffer does not match its dimensions"))?;
    write_atomic(path, |w, p| {
        image
            .write_to(w, ImageFormat::Png)
            .map_err(|e| image_error(p, e))
    })
}

/// Writes a mask as an 8-bit greyscale PNG of object handles.
pub fn write_mask_png(path: &Path, mask: &MaskFrame) -> Result<(), IoError> {
    let image = GrayImage::from_raw(mask.width(), mask.height(), mask.as_bytes().to_vec())
        .ok_or_else(|| IoError::layout(path, "mask buffer does not match its dimensions"))?;
    write_atomic(path, |w, p| {
        image
            .write_to(w, ImageFormat::Png)
            .map_err(|e| image_error(p, e))
    })
}

/// Writes a depth frame as a `(height, width)` float32 `.npy` array.
pub fn write_depth_npy(path: &Path, depth: &DepthFrame) -> Result<(), IoError> {
    let array = Array2::from_shape_vec(
        (depth.height() as usize, depth.width() as usize),
        depth.values().to_vec(),
    )
    .map_err(|source| IoError::Shape {
        path: path.to_path_buf(),
        source,
    })?;
    write_npy(path, |w| array.write_npy(w))
}

/// Writes a point cloud as a `(height, width, 3)` float32 `.npy` array.
pub fn write_point_cloud_npy(path: &Path, cloud: &PointCloud) -> Result<(), IoError> {
    let array = Array3::from_shape_vec(
        (cloud.height() as usize, cloud.width() as usize, 3),
        cloud.flat(),
    )
    .map_err(|source| IoError::Shape {
        path: path.to_path_buf(),
        source,
    })?;
    write_npy(path, |w| array.write_npy(w))
}

fn write_npy<F>(path: &Path, write: F) -> Result<(), IoError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), ndarray_npy::WriteNpyError>,
{
    write_atomic(path, |w, p| {
        write(w).map_err(|source| IoError::NpyWrite {
            path: p.to_path_buf(),
            source,
        })
    })
}
