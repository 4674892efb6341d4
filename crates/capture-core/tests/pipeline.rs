//! End-to-end extraction tests.
//!
//! Runs the synthetic scene through the extractor into a temporary
//! directory and checks the written dataset with the episode reader.

use capture_core::{
    record_motion, CameraMotion, CaptureConfig, ExtractionMode, MotionPlan, MultiViewExtractor,
    SyntheticScene,
};
use capture_io::{EpisodeReader, TaskManifest, VideoAssembler, VideoFormat, VideoSettings};
use capture_types::layout::POINT_CLOUD_DIR;
use capture_types::{DepthUnits, Resolution};
use tempfile::tempdir;

const STEPS: usize = 4;

/// Small, fast configuration: GIF videos, one custom camera, point clouds.
fn test_config(save_dir: &std::path::Path) -> CaptureConfig {
    let toml = format!(
        r#"
        [capture]
        save_dir = "{}"
        tasks = ["ReachTarget"]
        episodes_per_task = 2
        mode = "enhanced"
        compute_point_clouds = true

        [video]
        format = "gif"
        fps = 10

        [scene]
        demo_steps = {}
        resolution = [20, 16]

        [[cameras]]
        name = "side_camera"
        position = [0.8, 0.0, 0.5]
        look_at = [0.0, 0.0, 0.05]
        "#,
        save_dir.display(),
        STEPS
    );
    CaptureConfig::from_str(&toml).unwrap()
}

#[test]
fn test_extract_and_save_layout() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let mut extractor =
        MultiViewExtractor::from_config(SyntheticScene::new(config.scene.clone()), &config)
            .unwrap();
    assert_eq!(extractor.views().len(), 6);

    let manifest = extractor
        .extract_and_save("ReachTarget", 2, dir.path())
        .unwrap();
    assert_eq!(manifest.episodes.len(), 2);
    assert_eq!(manifest.total_steps(), 2 * STEPS);

    let task_dir = dir.path().join("ReachTarget");
    assert_eq!(TaskManifest::read(&task_dir).unwrap(), manifest);

    let reader = EpisodeReader::open(&task_dir.join("episode_001")).unwrap();
    let counts = reader.frame_counts().unwrap();
    assert_eq!(counts.len(), 6);
    for (camera, c) in &counts {
        assert_eq!(c.rgb, STEPS, "{}", camera);
        assert_eq!(c.depth, STEPS, "{}", camera);
        assert_eq!(c.mask, STEPS, "{}", camera);
        assert_eq!(c.point_cloud, STEPS, "{}", camera);
    }
    assert_eq!(reader.read_timestamps().unwrap().len(), STEPS);

    let videos = reader.videos().unwrap();
    assert_eq!(videos.len(), 6);
    assert!(videos
        .iter()
        .all(|v| v.extension().and_then(|e| e.to_str()) == Some("gif")));
    let mut listed = manifest.episodes[1].videos.clone();
    listed.sort();
    assert_eq!(listed, videos);
}

#[test]
fn test_static_camera_params_match_view() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let mut extractor =
        MultiViewExtractor::from_config(SyntheticScene::new(config.scene.clone()), &config)
            .unwrap();
    extractor
        .extract_and_save("ReachTarget", 1, dir.path())
        .unwrap();

    let reader = EpisodeReader::open(&dir.path().join("ReachTarget").join("episode_000")).unwrap();
    for view in extractor.views() {
        let record = reader.read_camera_params(view.name()).unwrap();
        if view.name() == "wrist_camera" {
            assert_eq!(record.extrinsics_per_step.map(|e| e.len()), Some(STEPS));
        } else {
            assert_eq!(record.params, view.world_params(), "{}", view.name());
            assert!(record.extrinsics_per_step.is_none());
        }
    }
}

#[test]
fn test_written_frames_match_memory() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let mut extractor =
        MultiViewExtractor::from_config(SyntheticScene::new(config.scene.clone()), &config)
            .unwrap();

    let record = extractor.extract_episode("ReachTarget", 0).unwrap();
    let summary = capture_io::EpisodeWriter::default()
        .write_episode(&record, dir.path())
        .unwrap();
    let reader = EpisodeReader::open(&summary.path).unwrap();

    let last = STEPS - 1;
    let observed = &record.steps[last].views["overhead_camera"];
    assert_eq!(reader.read_rgb("overhead_camera", last).unwrap(), observed.rgb);
    assert_eq!(
        reader
            .read_depth("overhead_camera", last, DepthUnits::Normalized)
            .unwrap(),
        observed.depth
    );
    assert_eq!(
        reader
            .frame_steps("overhead_camera", POINT_CLOUD_DIR)
            .unwrap()
            .len(),
        STEPS
    );
    assert_eq!(reader.read_episode_pickle().unwrap(), record);
}

#[test]
fn test_quick_mode_skips_custom_cameras() {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.capture.mode = ExtractionMode::Quick;

    let extractor =
        MultiViewExtractor::from_config(SyntheticScene::new(config.scene.clone()), &config)
            .unwrap();
    assert_eq!(extractor.views().len(), 5);
    assert!(!extractor.camera_names().contains(&"side_camera"));
}

#[test]
fn test_extract_all_tasks_reports_each_task() {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.video.enabled = false;

    let mut extractor =
        MultiViewExtractor::from_config(SyntheticScene::new(config.scene.clone()), &config)
            .unwrap();
    let tasks = vec![
        "PickUpCup".to_string(),
        "NotATask".to_string(),
        "OpenDoor".to_string(),
    ];
    let outcomes = extractor.extract_all_tasks(&tasks, 1, dir.path());

    let ok: Vec<bool> = outcomes.iter().map(|o| o.is_success()).collect();
    assert_eq!(ok, vec![true, false, true]);
    assert!(dir.path().join("OpenDoor").join("episode_000").is_dir());
    let reader =
        EpisodeReader::open(&dir.path().join("PickUpCup").join("episode_000")).unwrap();
    assert!(reader.videos().unwrap().is_empty());
}

#[test]
fn test_record_orbit_gif() {
    let dir = tempdir().unwrap();
    let config = CaptureConfig::default();
    let mut scene = SyntheticScene::new(config.scene.clone());
    let plan = MotionPlan {
        motion: CameraMotion::full_orbit(0.9, 0.5),
        target: [0.0, 0.0, 0.05],
        resolution: Resolution::new(24, 18),
        frames: 6,
    };
    let assembler = VideoAssembler::new(VideoSettings {
        format: VideoFormat::Gif,
        fps: 12,
        ..Default::default()
    });

    let video = record_motion(
        &mut scene,
        "StackBlocks",
        0,
        &plan,
        &assembler,
        dir.path(),
        "stack_orbit",
    )
    .unwrap();

    assert_eq!(video.frame_count, 6);
    assert_eq!(video.resolution, Resolution::new(24, 18));
    assert!(dir.path().join("stack_orbit.gif").is_file());
}
