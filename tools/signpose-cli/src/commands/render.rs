//! Render a landmark series to video.

use std::io::Write;
use std::path::PathBuf;

use signpose_common::config::AppConfig;
use signpose_render_engine::{
    render_bundle, ProgressCallback, RenderOptions, RenderProgress, SynthesisOptions,
};

pub struct RenderArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub fps: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub draw_connections: bool,
    pub skip_undetected: bool,
}

pub fn run(config: &AppConfig, args: RenderArgs) -> anyhow::Result<()> {
    let defaults = &config.rendering;
    let options = RenderOptions {
        fps: args.fps.unwrap_or(defaults.fps),
        width: args.width.unwrap_or(defaults.width),
        height: args.height.unwrap_or(defaults.height),
        synthesis: SynthesisOptions {
            draw_connections: args.draw_connections || defaults.draw_connections,
            skip_undetected: args.skip_undetected || defaults.skip_undetected,
        },
    };

    println!("Rendering {}", args.input.display());
    println!("  Output: {}", args.output.display());
    println!(
        "  Resolution: {}x{} @ {}fps",
        options.width, options.height, options.fps
    );

    let progress_cb: ProgressCallback = Box::new(|p: RenderProgress| {
        print!(
            "\r  Progress: {:.1}% ({}/{} frames, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.frames_rendered,
            p.total_frames,
            p.eta_secs,
        );
        let _ = std::io::stdout().flush();
    });

    let summary = render_bundle(
        &args.input,
        &args.output,
        &options,
        &config.ffmpeg_path,
        Some(&progress_cb),
    )
    .map_err(|e| anyhow::anyhow!("\nRender failed: {e}"))?;

    println!(
        "\nRender complete: {} ({} frames)",
        summary.output.display(),
        summary.frames
    );
    Ok(())
}
