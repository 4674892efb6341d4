//! Video assembly.
//!
//! Stitches an ordered sequence of equally sized colour frames into a video
//! file at a fixed frame rate. MP4 output pipes raw RGB24 frames into an
//! external `ffmpeg` process; GIF output is encoded in-process with `image`.
//! Frames are validated before any encoder starts.

use std::borrow::Borrow;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use capture_types::{Resolution, RgbFrame};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::atomic::partial_path;
use crate::error::VideoError;

/// Default frames per second.
pub const DEFAULT_FPS: u32 = 30;

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoFormat {
    /// H.264 in MP4, encoded by ffmpeg
    #[default]
    Mp4,
    /// Animated GIF, encoded in-process
    Gif,
}

impl VideoFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "mp4",
            VideoFormat::Gif => "gif",
        }
    }
}

impl std::fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Video encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    /// Frames per second
    pub fps: u32,
    /// Requested container
    pub format: VideoFormat,
    /// ffmpeg executable used for MP4 output
    pub ffmpeg_path: String,
    /// Write a GIF instead when ffmpeg cannot be started
    pub fallback_to_gif: bool,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            format: VideoFormat::Mp4,
            ffmpeg_path: "ffmpeg".to_string(),
            fallback_to_gif: true,
        }
    }
}

/// Result of a successful assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoOutput {
    pub path: PathBuf,
    pub format: VideoFormat,
    pub frame_count: usize,
    pub resolution: Resolution,
    pub fps: u32,
}

/// Encodes frame sequences into video files.
#[derive(Debug, Clone, Default)]
pub struct VideoAssembler {
    settings: VideoSettings,
}

impl VideoAssembler {
    pub fn new(settings: VideoSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &VideoSettings {
        &self.settings
    }

    /// Checks that there is at least one frame and all share the first
    /// frame's resolution. Returns that resolution.
    pub fn validate<F: Borrow<RgbFrame>>(frames: &[F]) -> Result<Resolution, VideoError> {
        let first = frames.first().ok_or(VideoError::NoFrames)?.borrow();
        let expected = first.resolution();
        for (index, frame) in frames.iter().enumerate().skip(1) {
            let found = frame.borrow().resolution();
            if found != expected {
                return Err(VideoError::ResolutionMismatch {
                    index,
                    expected,
                    found,
                });
            }
        }
        Ok(expected)
    }

    /// Writes `frames` to `dir/<stem>.<ext>`.
    ///
    /// The extension follows the format actually produced, which is GIF when
    /// MP4 was requested but ffmpeg is unavailable and fallback is enabled.
    pub fn assemble<F: Borrow<RgbFrame>>(
        &self,
        frames: &[F],
        dir: &Path,
        stem: &str,
    ) -> Result<VideoOutput, VideoError> {
        let resolution = Self::validate(frames)?;
        if self.settings.fps == 0 {
            return Err(VideoError::InvalidFrameRate);
        }
        fs::create_dir_all(dir).map_err(|source| VideoError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let format = match self.settings.format {
            VideoFormat::Mp4 => {
                let path = dir.join(format!("{}.{}", stem, VideoFormat::Mp4.extension()));
                match self.encode_mp4(frames, resolution, &path) {
                    Ok(()) => VideoFormat::Mp4,
                    Err(VideoError::EncoderUnavailable { program, source })
                        if self.settings.fallback_to_gif =>
                    {
                        tracing::warn!(
                            "Video encoder '{}' unavailable ({}), writing GIF instead",
                            program,
                            source
                        );
                        let path = dir.join(format!("{}.{}", stem, VideoFormat::Gif.extension()));
                        self.encode_gif(frames, &path)?;
                        VideoFormat::Gif
                    }
                    Err(e) => return Err(e),
                }
            }
            VideoFormat::Gif => {
                let path = dir.join(format!("{}.{}", stem, VideoFormat::Gif.extension()));
                self.encode_gif(frames, &path)?;
                VideoFormat::Gif
            }
        };

        let path = dir.join(format!("{}.{}", stem, format.extension()));
        tracing::info!(
            "Video saved: {:?} ({} frames, {}, {} fps)",
            path,
            frames.len(),
            resolution,
            self.settings.fps
        );

        Ok(VideoOutput {
            path,
            format,
            frame_count: frames.len(),
            resolution,
            fps: self.settings.fps,
        })
    }

    /// Pipes frames as raw RGB24 into ffmpeg.
    fn encode_mp4<F: Borrow<RgbFrame>>(
        &self,
        frames: &[F],
        resolution: Resolution,
        path: &Path,
    ) -> Result<(), VideoError> {
        let mut cmd = Command::new(&self.settings.ffmpeg_path);
        cmd.args(["-y", "-loglevel", "error", "-f", "rawvideo", "-pix_fmt", "rgb24"])
            .arg("-s")
            .arg(resolution.to_string())
            .arg("-r")
            .arg(self.settings.fps.to_string())
            .args(["-i", "-"])
            // yuv420p needs even dimensions
            .args(["-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2"])
            .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        tracing::debug!("Starting video encoder: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|source| VideoError::EncoderUnavailable {
            program: self.settings.ffmpeg_path.clone(),
            source,
        })?;

        let write_result = match child.stdin.take() {
            Some(stdin) => {
                let mut writer = BufWriter::new(stdin);
                frames
                    .iter()
                    .try_for_each(|f| writer.write_all(f.borrow().as_bytes()))
                    .and_then(|_| writer.flush())
            }
            None => Ok(()),
        };

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }
        let status = child.wait().map_err(|source| VideoError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if !status.success() {
            let _ = fs::remove_file(path);
            return Err(VideoError::EncoderFailed {
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        write_result.map_err(|source| VideoError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Encodes through a `.partial` file so a failed run leaves no GIF behind.
    fn encode_gif<F: Borrow<RgbFrame>>(&self, frames: &[F], path: &Path) -> Result<(), VideoError> {
        let tmp = partial_path(path);
        let result = self.write_gif(frames, &tmp).and_then(|()| {
            fs::rename(&tmp, path).map_err(|source| VideoError::Io {
                path: path.to_path_buf(),
                source,
            })
        });
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    fn write_gif<F: Borrow<RgbFrame>>(&self, frames: &[F], path: &Path) -> Result<(), VideoError> {
        let io_error = |source| VideoError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
        {
            let mut encoder = GifEncoder::new_with_speed(&mut writer, 10);
            encoder.set_repeat(Repeat::Infinite)?;

            let delay = Delay::from_numer_denom_ms(1000, self.settings.fps);
            let gif_frames = frames.iter().map(|f| {
                let f = f.borrow();
                let rgba = RgbaImage::from_fn(f.width(), f.height(), |x, y| {
                    let [r, g, b] = f.pixel(x, y);
                    image::Rgba([r, g, b, 255])
                });
                Frame::from_parts(rgba, 0, 0, delay)
            });
            encoder.encode_frames(gif_frames)?;
        }
        writer.flush().map_err(io_error)
    }
}
