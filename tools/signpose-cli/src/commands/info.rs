//! Show series information.

use std::path::PathBuf;

use signpose_landmark_model::{read_series, GroupKind};

pub fn run(path: PathBuf, json: bool) -> anyhow::Result<()> {
    let series = read_series(&path).map_err(|e| anyhow::anyhow!("Failed to load series: {e}"))?;

    if json {
        let groups: Vec<_> = GroupKind::ALL
            .iter()
            .map(|kind| {
                serde_json::json!({
                    "name": kind.array_name(),
                    "present": series.has_group(*kind),
                    "detection_rate": series.detection_rate(*kind),
                })
            })
            .collect();
        let report = serde_json::json!({
            "path": path,
            "frames": series.len(),
            "detection_known": series.detection_known(),
            "groups": groups,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Series: {}", path.display());
    println!("  Frames: {}", series.len());
    println!();

    println!("Groups:");
    for kind in GroupKind::ALL {
        let shape = format!(
            "({}, {}, {})",
            series.len(),
            kind.cardinality(),
            kind.channels()
        );
        if !series.has_group(kind) {
            println!("  {:<6} absent", kind.array_name());
            continue;
        }
        match series.detection_rate(kind) {
            Some(rate) => println!(
                "  {:<6} {shape:<16} detected in {:.1}% of frames",
                kind.array_name(),
                rate * 100.0
            ),
            None => println!("  {:<6} {shape}", kind.array_name()),
        }
    }

    if !series.detection_known() {
        println!();
        println!("No detection mask: all-zero points may be missing detections.");
    }

    Ok(())
}
