//! Multi-view extraction.
//!
//! [`MultiViewExtractor`] plays task demonstrations in a [`Simulator`] and
//! records every configured camera at every step. It covers three usage
//! levels:
//!
//! - quick: the simulator's default cameras only ([`MultiViewExtractor::quick`])
//! - enhanced: default cameras plus extra views ([`MultiViewExtractor::enhanced`])
//! - custom: [`add_custom_cameras`](MultiViewExtractor::add_custom_cameras) at
//!   any point, and [`get_camera_data`](MultiViewExtractor::get_camera_data)
//!   for one-off captures
//!
//! Saved output goes through [`EpisodeWriter`], [`VideoAssembler`] and a
//! per-task [`TaskManifest`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use capture_io::{EpisodeWriter, TaskManifest, VideoAssembler, VideoSettings, WriteOptions};
use capture_types::{
    CameraView, EpisodeRecord, StepObservation, ViewError, ViewObservation, VIDEOS_DIR,
};
use serde::{Deserialize, Serialize};

use crate::config::{CaptureConfig, ExtractionMode};
use crate::error::CaptureError;
use crate::pointcloud::point_cloud_from_depth;
use crate::sim::Simulator;

/// Per-step capture options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorOptions {
    /// Upper bound on recorded steps per episode
    pub max_steps: usize,
    /// Attach a world-space point cloud to every observation
    pub point_clouds: bool,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            max_steps: 200,
            point_clouds: false,
        }
    }
}

/// Result of one task in [`MultiViewExtractor::extract_all_tasks`].
#[derive(Debug)]
pub struct TaskOutcome {
    pub task: String,
    pub result: Result<TaskManifest, CaptureError>,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Drives a simulator and records multi-view episodes.
pub struct MultiViewExtractor<S: Simulator> {
    sim: S,
    views: Vec<CameraView>,
    options: ExtractorOptions,
    writer: EpisodeWriter,
    video: Option<VideoAssembler>,
    current_task: Option<String>,
}

impl<S: Simulator> MultiViewExtractor<S> {
    /// Launches `sim` and records its default cameras.
    pub fn quick(mut sim: S, options: ExtractorOptions) -> Result<Self, CaptureError> {
        sim.launch()?;
        let views = sim.default_views()?;
        let mut extractor = Self {
            sim,
            views: Vec::new(),
            options,
            writer: EpisodeWriter::default(),
            video: Some(VideoAssembler::default()),
            current_task: None,
        };
        extractor.add_custom_cameras(views)?;
        Ok(extractor)
    }

    /// Launches `sim` and records its default cameras plus `custom`.
    pub fn enhanced(
        sim: S,
        custom: Vec<CameraView>,
        options: ExtractorOptions,
    ) -> Result<Self, CaptureError> {
        let mut extractor = Self::quick(sim, options)?;
        extractor.add_custom_cameras(custom)?;
        Ok(extractor)
    }

    /// Builds an extractor from a loaded configuration.
    pub fn from_config(sim: S, config: &CaptureConfig) -> Result<Self, CaptureError> {
        let options = ExtractorOptions {
            max_steps: config.capture.max_steps,
            point_clouds: config.capture.compute_point_clouds,
        };
        let extractor = match config.capture.mode {
            ExtractionMode::Quick => Self::quick(sim, options)?,
            ExtractionMode::Enhanced => Self::enhanced(sim, config.custom_views()?, options)?,
        };
        Ok(extractor
            .with_write_options(config.dump)
            .with_video(config.video.settings()))
    }

    pub fn with_write_options(mut self, options: WriteOptions) -> Self {
        self.writer = EpisodeWriter::new(options);
        self
    }

    /// Sets video settings; `None` disables videos.
    pub fn with_video(mut self, settings: Option<VideoSettings>) -> Self {
        self.video = settings.map(VideoAssembler::new);
        self
    }

    pub fn views(&self) -> &[CameraView] {
        &self.views
    }

    pub fn camera_names(&self) -> Vec<&str> {
        self.views.iter().map(|v| v.name()).collect()
    }

    pub fn options(&self) -> &ExtractorOptions {
        &self.options
    }

    pub fn simulator(&self) -> &S {
        &self.sim
    }

    /// Adds views to the recorded set.
    ///
    /// Fails without adding anything if a name is already taken or repeated
    /// within `views`.
    pub fn add_custom_cameras(&mut self, views: Vec<CameraView>) -> Result<(), CaptureError> {
        let mut names: HashSet<&str> = self.views.iter().map(|v| v.name()).collect();
        for view in &views {
            if !names.insert(view.name()) {
                return Err(ViewError::DuplicateName(view.name().to_string()).into());
            }
        }
        for view in &views {
            tracing::debug!(
                "Added camera {} at {:?} ({})",
                view.name(),
                view.position(),
                view.resolution()
            );
        }
        self.views.extend(views);
        Ok(())
    }

    /// Captures one view at the simulator's current state.
    pub fn get_camera_data(&self, name: &str) -> Result<ViewObservation, CaptureError> {
        let view = self
            .views
            .iter()
            .find(|v| v.name() == name)
            .ok_or_else(|| CaptureError::UnknownCamera(name.to_string()))?;
        self.observe(view)
    }

    fn observe(&self, view: &CameraView) -> Result<ViewObservation, CaptureError> {
        let capture = self.sim.capture(view)?;
        let point_cloud = if self.options.point_clouds {
            Some(point_cloud_from_depth(&capture.depth, &capture.params)?)
        } else {
            None
        };
        Ok(ViewObservation {
            rgb: capture.rgb,
            depth: capture.depth,
            mask: capture.mask,
            point_cloud,
            params: capture.params,
        })
    }

    fn ensure_task(&mut self, task: &str) -> Result<(), CaptureError> {
        if self.current_task.as_deref() != Some(task) {
            self.current_task = None;
            self.sim.load_task(task)?;
            self.current_task = Some(task.to_string());
        }
        Ok(())
    }

    /// Plays one demonstration of `task` and records every view at every step.
    pub fn extract_episode(
        &mut self,
        task: &str,
        episode_index: usize,
    ) -> Result<EpisodeRecord, CaptureError> {
        self.ensure_task(task)?;
        let descriptions = self.sim.reset(episode_index)?;
        let interval = self.sim.step_interval();
        let mut record = EpisodeRecord::new(task, episode_index).with_descriptions(descriptions);

        while record.len() < self.options.max_steps {
            let Some(low_dim) = self.sim.advance_demo()? else {
                break;
            };
            let mut step = StepObservation::new(record.len(), interval).with_low_dim(low_dim);
            for view in &self.views {
                step.insert_view(view.name(), self.observe(view)?);
            }
            record.push_step(step);
        }

        if record.is_empty() {
            return Err(CaptureError::EmptyEpisode {
                task: task.to_string(),
                episode: episode_index,
            });
        }
        tracing::info!(
            "Extracted {} {} ({} steps, {} cameras)",
            task,
            record.episode_id(),
            record.len(),
            self.views.len()
        );
        Ok(record)
    }

    /// Records `episodes` episodes of `task` in memory.
    pub fn extract_task(
        &mut self,
        task: &str,
        episodes: usize,
    ) -> Result<Vec<EpisodeRecord>, CaptureError> {
        (0..episodes)
            .map(|index| self.extract_episode(task, index))
            .collect()
    }

    /// Records `episodes` episodes of `task` and writes them under
    /// `save_dir/<task>/`, with one video per camera per episode when videos
    /// are enabled and a `manifest.json` for the task.
    ///
    /// Each episode is written before the next is recorded.
    pub fn extract_and_save(
        &mut self,
        task: &str,
        episodes: usize,
        save_dir: &Path,
    ) -> Result<TaskManifest, CaptureError> {
        let task_dir = save_dir.join(task);
        let mut manifest = TaskManifest::new(task, self.views.clone());
        tracing::info!(
            "Extracting {} episodes of {} into {:?} (run {})",
            episodes,
            task,
            task_dir,
            manifest.run_id
        );

        for index in 0..episodes {
            let record = self.extract_episode(task, index)?;
            let mut summary = self.writer.write_episode(&record, &task_dir)?;
            summary.videos = self.write_videos(&record, &summary.path)?;
            manifest.episodes.push(summary);
        }

        manifest.write(&task_dir)?;
        tracing::info!(
            "Saved {} episodes of {} ({} steps total)",
            manifest.episodes.len(),
            task,
            manifest.total_steps()
        );
        Ok(manifest)
    }

    fn write_videos(
        &self,
        record: &EpisodeRecord,
        episode_dir: &Path,
    ) -> Result<Vec<PathBuf>, CaptureError> {
        let Some(assembler) = &self.video else {
            return Ok(Vec::new());
        };
        let videos_dir = episode_dir.join(VIDEOS_DIR);
        let mut videos = Vec::with_capacity(self.views.len());
        for view in &self.views {
            let frames = record.rgb_frames(view.name());
            let output = assembler.assemble(&frames, &videos_dir, view.name())?;
            videos.push(output.path);
        }
        Ok(videos)
    }

    /// Runs [`extract_and_save`](Self::extract_and_save) for every task.
    ///
    /// A failing task is logged and reported in its outcome; the remaining
    /// tasks still run.
    pub fn extract_all_tasks(
        &mut self,
        tasks: &[String],
        episodes: usize,
        save_dir: &Path,
    ) -> Vec<TaskOutcome> {
        let mut outcomes = Vec::with_capacity(tasks.len());
        for task in tasks {
            let result = self.extract_and_save(task, episodes, save_dir);
            if let Err(e) = &result {
                tracing::error!("Task {} failed: {}", task, e);
            }
            outcomes.push(TaskOutcome {
                task: task.clone(),
                result,
            });
        }

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        tracing::info!("Finished {}/{} tasks", succeeded, outcomes.len());
        outcomes
    }

    /// Shuts the simulator down and hands it back.
    pub fn shutdown(mut self) -> S {
        self.sim.shutdown();
        self.sim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use crate::sim::Capture;
    use capture_types::fixtures::{self, FIXTURE_HEIGHT, FIXTURE_WIDTH};
    use capture_types::{
        DepthFrame, DepthUnits, LowDimState, MaskFrame, RgbFrame, DEFAULT_STEP_INTERVAL,
    };
    use nalgebra::Matrix4;
    use tempfile::tempdir;

    /// Scripted simulator: a fixed number of steps, flat frames whose red
    /// channel is the step index.
    struct StubSim {
        running: bool,
        task: Option<String>,
        steps: usize,
        step: Option<usize>,
    }

    impl StubSim {
        fn new(steps: usize) -> Self {
            Self {
                running: false,
                task: None,
                steps,
                step: None,
            }
        }
    }

    impl Simulator for StubSim {
        fn launch(&mut self) -> Result<(), SimError> {
            self.running = true;
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.running
        }

        fn default_views(&self) -> Result<Vec<CameraView>, SimError> {
            Ok(fixtures::sample_views())
        }

        fn available_tasks(&self) -> Vec<String> {
            vec!["ReachTarget".to_string()]
        }

        fn load_task(&mut self, task: &str) -> Result<(), SimError> {
            if task != "ReachTarget" {
                return Err(SimError::UnknownTask(task.to_string()));
            }
            self.task = Some(task.to_string());
            Ok(())
        }

        fn reset(&mut self, _episode: usize) -> Result<Vec<String>, SimError> {
            self.task.as_ref().ok_or(SimError::NoTask)?;
            self.step = Some(0);
            Ok(vec!["reach the red target".to_string()])
        }

        fn advance_demo(&mut self) -> Result<Option<LowDimState>, SimError> {
            let step = self.step.as_mut().ok_or(SimError::NotReset)?;
            if *step >= self.steps {
                return Ok(None);
            }
            *step += 1;
            Ok(Some(LowDimState {
                gripper_open: Some(1.0),
                ..Default::default()
            }))
        }

        fn capture(&self, view: &CameraView) -> Result<Capture, SimError> {
            let step = self.step.ok_or(SimError::NotReset)?;
            let mut gripper = Matrix4::identity();
            gripper[(0, 3)] = 0.01 * step as f64;
            Ok(Capture {
                rgb: RgbFrame::filled(FIXTURE_WIDTH, FIXTURE_HEIGHT, [step as u8, 0, 0])?,
                depth: DepthFrame::filled(
                    FIXTURE_WIDTH,
                    FIXTURE_HEIGHT,
                    DepthUnits::Normalized,
                    0.5,
                )?,
                mask: Some(MaskFrame::filled(FIXTURE_WIDTH, FIXTURE_HEIGHT, 1)?),
                params: view.params(&gripper),
            })
        }

        fn shutdown(&mut self) {
            self.running = false;
        }
    }

    fn extractor(steps: usize) -> MultiViewExtractor<StubSim> {
        MultiViewExtractor::quick(StubSim::new(steps), ExtractorOptions::default())
            .unwrap()
            .with_video(None)
    }

    fn side_camera(name: &str) -> CameraView {
        CameraView::new(name, [1.0, 0.0, 0.5], [0.0, 0.0, 0.0]).unwrap()
    }

    #[test]
    fn test_quick_uses_default_views() {
        let extractor = extractor(3);
        assert!(extractor.simulator().is_running());
        assert_eq!(extractor.camera_names(), vec!["front_camera", "wrist_camera"]);
    }

    #[test]
    fn test_enhanced_adds_custom_views() {
        let extractor = MultiViewExtractor::enhanced(
            StubSim::new(3),
            vec![side_camera("side_camera")],
            ExtractorOptions::default(),
        )
        .unwrap();
        assert_eq!(
            extractor.camera_names(),
            vec!["front_camera", "wrist_camera", "side_camera"]
        );
    }

    #[test]
    fn test_duplicate_camera_rejected_atomically() {
        let mut extractor = extractor(3);
        let err = extractor
            .add_custom_cameras(vec![side_camera("side_camera"), side_camera("front_camera")])
            .unwrap_err();

        assert!(matches!(
            err,
            CaptureError::View(ViewError::DuplicateName(ref n)) if n == "front_camera"
        ));
        assert_eq!(extractor.views().len(), 2);

        let err = extractor
            .add_custom_cameras(vec![side_camera("a"), side_camera("a")])
            .unwrap_err();
        assert!(matches!(err, CaptureError::View(ViewError::DuplicateName(_))));
        assert_eq!(extractor.views().len(), 2);
    }

    #[test]
    fn test_extract_episode_records_every_view_every_step() {
        let mut extractor = extractor(4);
        let record = extractor.extract_episode("ReachTarget", 2).unwrap();

        assert_eq!(record.len(), 4);
        assert_eq!(record.episode_id(), "episode_002");
        assert_eq!(record.descriptions, vec!["reach the red target"]);
        for (i, step) in record.steps.iter().enumerate() {
            assert_eq!(step.step, i);
            assert!((step.timestamp - i as f64 * DEFAULT_STEP_INTERVAL).abs() < 1e-12);
            assert_eq!(step.views.len(), 2);
            assert_eq!(step.views["front_camera"].rgb.pixel(0, 0)[0], i as u8 + 1);
        }
        assert!(record.camera_moved("wrist_camera"));
        assert!(!record.camera_moved("front_camera"));
    }

    #[test]
    fn test_max_steps_caps_episode() {
        let mut extractor = MultiViewExtractor::quick(
            StubSim::new(10),
            ExtractorOptions {
                max_steps: 3,
                point_clouds: false,
            },
        )
        .unwrap();
        assert_eq!(extractor.extract_episode("ReachTarget", 0).unwrap().len(), 3);
    }

    #[test]
    fn test_empty_demo_is_an_error() {
        let mut extractor = extractor(0);
        assert!(matches!(
            extractor.extract_episode("ReachTarget", 0),
            Err(CaptureError::EmptyEpisode { .. })
        ));
    }

    #[test]
    fn test_point_clouds_attached_when_enabled() {
        let mut extractor = MultiViewExtractor::quick(
            StubSim::new(1),
            ExtractorOptions {
                max_steps: 10,
                point_clouds: true,
            },
        )
        .unwrap();
        let record = extractor.extract_episode("ReachTarget", 0).unwrap();
        let cloud = record.steps[0].views["front_camera"]
            .point_cloud
            .as_ref()
            .unwrap();
        assert_eq!(cloud.width(), FIXTURE_WIDTH);
        assert_eq!(cloud.points().len(), (FIXTURE_WIDTH * FIXTURE_HEIGHT) as usize);
    }

    #[test]
    fn test_get_camera_data() {
        let mut extractor = extractor(2);
        assert!(matches!(
            extractor.get_camera_data("front_camera"),
            Err(CaptureError::Sim(SimError::NotReset))
        ));

        extractor.extract_episode("ReachTarget", 0).unwrap();
        let data = extractor.get_camera_data("wrist_camera").unwrap();
        assert_eq!(data.rgb.pixel(0, 0), [2, 0, 0]);
        assert!(matches!(
            extractor.get_camera_data("nope"),
            Err(CaptureError::UnknownCamera(_))
        ));
    }

    #[test]
    fn test_extract_task() {
        let mut extractor = extractor(2);
        let episodes = extractor.extract_task("ReachTarget", 3).unwrap();
        let ids: Vec<String> = episodes.iter().map(|e| e.episode_id()).collect();
        assert_eq!(ids, vec!["episode_000", "episode_001", "episode_002"]);
    }

    #[test]
    fn test_extract_all_tasks_continues_past_failure() {
        let dir = tempdir().unwrap();
        let mut extractor = extractor(2);
        let tasks = vec![
            "MakeCoffee".to_string(),
            "ReachTarget".to_string(),
        ];
        let outcomes = extractor.extract_all_tasks(&tasks, 1, dir.path());

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            outcomes[0].result,
            Err(CaptureError::Sim(SimError::UnknownTask(_)))
        ));
        assert!(outcomes[1].is_success());
        assert!(dir.path().join("ReachTarget").join("manifest.json").is_file());
        assert!(!dir.path().join("MakeCoffee").exists());
    }

    #[test]
    fn test_shutdown_returns_stopped_simulator() {
        let sim = extractor(1).shutdown();
        assert!(!sim.is_running());
    }
}
