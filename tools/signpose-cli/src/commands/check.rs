//! Check external tools and detector configuration.

use std::path::Path;

use signpose_common::config::AppConfig;
use signpose_common::process::command_exists;

/// `config_path` is the file `config` was loaded from (or would have been).
pub fn run(config: &AppConfig, config_path: &Path) -> anyhow::Result<()> {
    println!("Signpose System Check");
    println!("{}", "=".repeat(50));

    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[INFO] Config: defaults ({} not found)", config_path.display());
    }

    let mut all_ok = true;
    for (role, binary) in [
        ("Decoder/encoder", config.ffmpeg_path.as_str()),
        ("Stream probe", config.ffprobe_path.as_str()),
    ] {
        if command_exists(binary) {
            println!("[OK] {role}: {binary}");
        } else {
            println!("[MISSING] {role}: {binary} not found");
            all_ok = false;
        }
    }

    let detector = &config.extraction.detector;
    if !detector.is_configured() {
        println!("[MISSING] Landmark detector: not configured (extraction.detector.command)");
        all_ok = false;
    } else if command_exists(&detector.command) {
        println!(
            "[OK] Landmark detector: {} {}",
            detector.command,
            detector.args.join(" ")
        );
    } else {
        println!("[MISSING] Landmark detector: {} not found", detector.command);
        all_ok = false;
    }

    println!();
    if all_ok {
        println!("All tools are available. Signpose is ready.");
    } else {
        println!("Some tools are missing. Extraction needs ffmpeg, ffprobe, and a detector;");
        println!("rendering needs ffmpeg only.");
    }

    Ok(())
}
