//! Multi-view capture command line.
//!
//! Records task demonstrations from several simultaneous camera viewpoints
//! and writes them as a per-camera image, depth and video dataset.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use capture_core::{
    default_config_toml, record_motion, CameraMotion, CaptureConfig, CaptureError,
    ExtractionMode, MotionPlan, MultiViewExtractor, SyntheticScene,
};
use capture_io::{EpisodeReader, VideoAssembler, VideoFormat};
use capture_types::{CameraMount, DepthUnits, Resolution};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "multiview_capture")]
#[command(about = "Multi-view camera capture for robotic task demonstrations")]
struct Args {
    /// TOML configuration file; defaults are used when omitted
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract episodes for the configured tasks
    Extract {
        /// Record the default cameras only
        #[arg(long)]
        quick: bool,

        /// Task to extract; repeat for several. Overrides the config
        #[arg(long = "task")]
        tasks: Vec<String>,

        /// Episodes per task
        #[arg(long)]
        episodes: Option<usize>,

        /// Output root directory
        #[arg(long)]
        save_dir: Option<PathBuf>,

        /// Scene seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the configured camera views and their projection matrices
    Views,
    /// Print or write the default configuration
    InitConfig {
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Render a camera orbiting a task scene into a video
    Orbit {
        #[arg(long, default_value = "ReachTarget")]
        task: String,

        #[arg(long, default_value_t = 0)]
        episode: usize,

        #[arg(long, default_value_t = 36)]
        frames: usize,

        /// Horizontal distance from the scene centre in metres
        #[arg(long, default_value_t = 0.9)]
        radius: f64,

        /// Height above the scene centre in metres
        #[arg(long, default_value_t = 0.5)]
        elevation: f64,

        #[arg(long, default_value_t = 160)]
        width: u32,

        #[arg(long, default_value_t = 120)]
        height: u32,

        /// Write a GIF regardless of the configured format
        #[arg(long)]
        gif: bool,

        #[arg(long, default_value = "orbit_videos")]
        output: PathBuf,
    },
    /// Check an episode directory and summarize its contents
    Inspect {
        /// Path to an episode_NNN directory
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode, CaptureError> {
    let config = match &args.config {
        Some(path) => {
            tracing::info!("Loading config from {:?}", path);
            CaptureConfig::from_file(path)?
        }
        None => CaptureConfig::default(),
    };

    match args.command {
        Command::Extract {
            quick,
            tasks,
            episodes,
            save_dir,
            seed,
        } => {
            let mut config = config;
            if quick {
                config.capture.mode = ExtractionMode::Quick;
            }
            if !tasks.is_empty() {
                config.capture.tasks = tasks;
            }
            if let Some(episodes) = episodes {
                config.capture.episodes_per_task = episodes;
            }
            if let Some(save_dir) = save_dir {
                config.capture.save_dir = save_dir;
            }
            if let Some(seed) = seed {
                config.scene.seed = seed;
            }
            extract(&config)
        }
        Command::Views => {
            print_views(&config)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::InitConfig { output } => {
            let content = default_config_toml();
            match output {
                Some(path) => {
                    std::fs::write(&path, content).map_err(|source| {
                        capture_core::ConfigError::Io {
                            path: path.clone(),
                            source,
                        }
                    })?;
                    println!("Wrote default configuration to {}", path.display());
                }
                None => print!("{}", content),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Orbit {
            task,
            episode,
            frames,
            radius,
            elevation,
            width,
            height,
            gif,
            output,
        } => {
            let mut settings = config.video.settings().unwrap_or_default();
            if gif {
                settings.format = VideoFormat::Gif;
            }
            let plan = MotionPlan {
                motion: CameraMotion::full_orbit(radius, elevation),
                target: [0.0, 0.0, 0.05],
                resolution: Resolution::new(width, height),
                frames,
            };
            let mut scene = SyntheticScene::new(config.scene.clone());
            let name = format!("{}_orbit_{:03}", task, episode);
            let video = record_motion(
                &mut scene,
                &task,
                episode,
                &plan,
                &VideoAssembler::new(settings),
                &output,
                &name,
            )?;
            println!(
                "Wrote {} ({} frames, {})",
                video.path.display(),
                video.frame_count,
                video.resolution
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Inspect { path } => inspect(&path),
    }
}

fn extract(config: &CaptureConfig) -> Result<ExitCode, CaptureError> {
    let scene = SyntheticScene::new(config.scene.clone());
    let mut extractor = MultiViewExtractor::from_config(scene, config)?;

    println!("Multi-view capture");
    println!("==================");
    println!("Tasks: {}", config.capture.tasks.join(", "));
    println!("Episodes per task: {}", config.capture.episodes_per_task);
    println!("Cameras: {}", extractor.camera_names().join(", "));
    println!("Output: {}", config.capture.save_dir.display());
    println!();

    let outcomes = extractor.extract_all_tasks(
        &config.capture.tasks,
        config.capture.episodes_per_task,
        &config.capture.save_dir,
    );
    extractor.shutdown();

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(manifest) => println!(
                "  {:<16} {} episodes, {} steps",
                outcome.task,
                manifest.episodes.len(),
                manifest.total_steps()
            ),
            Err(e) => {
                failed += 1;
                println!("  {:<16} FAILED: {}", outcome.task, e);
            }
        }
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_views(config: &CaptureConfig) -> Result<(), CaptureError> {
    let scene = SyntheticScene::new(config.scene.clone());
    let extractor = MultiViewExtractor::from_config(scene, config)?;

    for view in extractor.views() {
        println!("{}", view.name());
        println!(
            "  mount: {:?}  resolution: {}  fov: {:.1}  clip: [{}, {}]",
            view.mount(),
            view.resolution(),
            view.fov(),
            view.near_plane(),
            view.far_plane()
        );
        println!(
            "  position: {:?}  orientation: [{:.2}, {:.2}, {:.2}]",
            view.position(),
            view.orientation()[0],
            view.orientation()[1],
            view.orientation()[2]
        );
        print!("  intrinsics:{}", view.intrinsics());
        if view.mount() == CameraMount::World {
            print!("  extrinsics:{}", view.local_pose());
        } else {
            print!("  pose in gripper frame:{}", view.local_pose());
        }
    }
    extractor.shutdown();
    Ok(())
}

fn inspect(path: &Path) -> Result<ExitCode, CaptureError> {
    let reader = EpisodeReader::open(path)?;
    let timestamps = reader.read_timestamps()?;
    let descriptions = reader.read_descriptions()?;
    let counts = reader.frame_counts()?;

    println!("{}", path.display());
    println!("  steps: {}", timestamps.len());
    if let Some(first) = descriptions.first() {
        println!("  description: {}", first);
    }

    let mut consistent = true;
    for (camera, c) in &counts {
        let params = reader.read_camera_params(camera)?;
        let position = params.params.camera_position();
        let moving = params.extrinsics_per_step.is_some();
        println!(
            "  {:<24} rgb {:>4}  depth {:>4}  mask {:>4}  pcd {:>4}  at [{:.3}, {:.3}, {:.3}]{}",
            camera,
            c.rgb,
            c.depth,
            c.mask,
            c.point_cloud,
            position.x,
            position.y,
            position.z,
            if moving { " (moving)" } else { "" }
        );
        if c.rgb != timestamps.len() || c.depth != timestamps.len() {
            tracing::warn!(
                "Camera {} has {} rgb / {} depth frames for {} steps",
                camera,
                c.rgb,
                c.depth,
                timestamps.len()
            );
            consistent = false;
        }
        if let Some(step) = reader.frame_steps(camera, capture_types::layout::DEPTH_DIR)?.first() {
            let depth = reader.read_depth(camera, *step, DepthUnits::Normalized)?;
            if depth.resolution() != reader.read_rgb(camera, *step)?.resolution() {
                tracing::warn!("Camera {} depth and rgb sizes differ", camera);
                consistent = false;
            }
        }
    }
    for video in reader.videos()? {
        println!("  video: {}", video.display());
    }

    Ok(if consistent {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
