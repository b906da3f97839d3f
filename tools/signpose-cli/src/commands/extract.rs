//! Extract landmark series from videos.

use std::path::PathBuf;

use signpose_common::config::AppConfig;
use signpose_extract_engine::{
    extract_to_bundle, run_batch, BatchPaths, ExtractOptions, FfmpegOpener, ItemStatus,
    LandmarkDetector, ProcessDetector, BATCH_REPORT_FILE,
};
use signpose_landmark_model::{load_manifest, GroupKind};

pub struct ExtractArgs {
    pub input: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub videos_dir: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub fps: Option<f64>,
    pub max_frames: Option<usize>,
}

pub fn run(config: &AppConfig, args: ExtractArgs) -> anyhow::Result<()> {
    let options = ExtractOptions {
        target_fps: args.fps.unwrap_or(config.extraction.target_fps),
        fallback_fps: config.extraction.fallback_fps,
        max_frames: args.max_frames.or(config.extraction.max_frames),
    };
    let opener = FfmpegOpener {
        ffmpeg: config.ffmpeg_path.clone(),
        ffprobe: config.ffprobe_path.clone(),
    };

    // Load the manifest before starting the detector so a bad manifest
    // does not pay for a model load.
    let manifest = match &args.manifest {
        Some(path) => Some(
            load_manifest(path)
                .map_err(|e| anyhow::anyhow!("Failed to load manifest: {e}"))?,
        ),
        None => None,
    };

    let single_output = match &args.input {
        Some(input) => {
            let stem = input
                .file_stem()
                .ok_or_else(|| anyhow::anyhow!("Input has no file name: {}", input.display()))?;
            Some(args.out_dir.join(format!("{}.npz", stem.to_string_lossy())))
        }
        None => None,
    };

    let mut detector = ProcessDetector::spawn(&config.extraction.detector)
        .map_err(|e| anyhow::anyhow!("Failed to start landmark detector: {e}"))?;

    let outcome = match (manifest, &args.input, &single_output) {
        (Some(entries), _, _) => {
            let paths = BatchPaths {
                videos_dir: args.videos_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
                out_dir: args.out_dir.clone(),
            };
            println!(
                "Extracting {} videos from {} at {} fps",
                entries.len(),
                paths.videos_dir.display(),
                options.target_fps
            );
            run_batch(&opener, &mut detector, &entries, &paths, &options).map(|report| {
                for item in &report.items {
                    match item.status {
                        ItemStatus::Written => println!(
                            "  [OK]   {} ({} frames)",
                            item.uid,
                            item.frames.unwrap_or(0)
                        ),
                        ItemStatus::Skipped => println!(
                            "  [SKIP] {}: {}",
                            item.uid,
                            item.reason.as_deref().unwrap_or("")
                        ),
                        ItemStatus::Failed => println!(
                            "  [FAIL] {}: {}",
                            item.uid,
                            item.reason.as_deref().unwrap_or("")
                        ),
                    }
                }
                println!(
                    "\nWritten: {}  Skipped: {}  Failed: {}",
                    report.count(ItemStatus::Written),
                    report.count(ItemStatus::Skipped),
                    report.count(ItemStatus::Failed)
                );
                println!("Report: {}", args.out_dir.join(BATCH_REPORT_FILE).display());
            })
        }
        (None, Some(input), Some(output)) => {
            println!("Extracting {}", input.display());
            extract_to_bundle(&opener, &mut detector, input, output, &options).map(|summary| {
                println!("  Source rate: {:.2} fps (step {})", summary.source_fps, summary.step);
                println!(
                    "  Frames: {} kept of {} read",
                    summary.frames_kept, summary.frames_read
                );
                for kind in GroupKind::ALL {
                    println!(
                        "  {:<10} detected in {:.1}% of frames",
                        kind.to_string(),
                        summary.detection_rates[kind.index()] * 100.0
                    );
                }
                println!("Saved: {}", summary.output.display());
            })
        }
        _ => Err(signpose_common::SignposeError::invalid_argument(
            "either --input or --manifest is required",
        )),
    };

    // Release the detector on every path before reporting.
    let closed = detector.close();
    outcome.map_err(|e| anyhow::anyhow!("Extraction failed: {e}"))?;
    closed.map_err(|e| anyhow::anyhow!("Landmark detector did not shut down cleanly: {e}"))?;

    Ok(())
}
