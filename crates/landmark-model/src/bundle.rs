//! Persisted series bundle (`.npz` layout).
//!
//! A bundle is a deflate-compressed ZIP archive whose members are `.npy`
//! arrays named after the logical groups:
//!
//! ```text
//! pose.npy      (T, 33, 4)  <f4
//! lhand.npy     (T, 21, 3)  <f4
//! rhand.npy     (T, 21, 3)  <f4
//! face.npy      (T, 468, 3) <f4
//! presence.npy  (T, 4)      |u1   optional, pose/lhand/rhand/face columns
//! ```
//!
//! Any subset of members may be present. Bundles written by plain
//! `numpy.savez_compressed` have no `presence` member and load with unknown
//! per-frame detection.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use signpose_common::error::{SignposeError, SignposeResult};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::frame::FrameRecord;
use crate::landmark::{GroupKind, GroupSet};
use crate::npy::{self, NpyData, NpyError};
use crate::series::Series;

/// Member name of the per-frame detection mask.
pub const PRESENCE_ARRAY: &str = "presence";

fn member_name(array: &str) -> String {
    format!("{array}.npy")
}

/// Write a series to `path` atomically.
///
/// The archive is built in a temporary file next to `path` and renamed into
/// place only after it is complete and synced, so readers never observe a
/// partial bundle.
pub fn write_series(series: &Series, path: &Path) -> SignposeResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| {
        SignposeError::write_failure(&dir, format!("cannot create output directory: {e}"))
    })?;

    let fail = |message: String| SignposeError::write_failure(path, message);

    let mut tmp = tempfile::Builder::new()
        .prefix(".signpose-")
        .suffix(".npz.partial")
        .tempfile_in(&dir)
        .map_err(|e| fail(format!("cannot create temporary file: {e}")))?;

    {
        let mut zip = ZipWriter::new(BufWriter::new(tmp.as_file_mut()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let frames = series.len();

        for kind in series.groups().iter() {
            zip.start_file(member_name(kind.array_name()), options)
                .map_err(|e| fail(format!("cannot start member {kind}: {e}")))?;
            npy::write_f32(
                &mut zip,
                &[frames, kind.cardinality(), kind.channels()],
                &series.group_values(kind),
            )
            .map_err(|e| fail(format!("cannot write member {kind}: {e}")))?;
        }

        if series.detection_known() {
            zip.start_file(member_name(PRESENCE_ARRAY), options)
                .map_err(|e| fail(format!("cannot start presence mask: {e}")))?;
            npy::write_u8(
                &mut zip,
                &[frames, GroupKind::ALL.len()],
                &series.presence_mask(),
            )
            .map_err(|e| fail(format!("cannot write presence mask: {e}")))?;
        }

        let mut inner = zip
            .finish()
            .map_err(|e| fail(format!("cannot finalize archive: {e}")))?;
        inner
            .flush()
            .map_err(|e| fail(format!("cannot flush archive: {e}")))?;
    }

    tmp.as_file()
        .sync_all()
        .map_err(|e| fail(format!("cannot sync archive: {e}")))?;
    tmp.persist(path)
        .map_err(|e| fail(format!("cannot move archive into place: {}", e.error)))?;

    tracing::debug!(
        path = %path.display(),
        frames = series.len(),
        groups = series.groups().len(),
        "Series bundle written"
    );
    Ok(())
}

/// Load a series bundle.
///
/// Absent logical arrays become absent groups; arrays with an unexpected
/// shape or element type are rejected.
pub fn read_series(path: &Path) -> SignposeResult<Series> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SignposeError::missing_input(path.display().to_string(), path)
        } else {
            SignposeError::source_unreadable(path, format!("cannot open bundle: {e}"))
        }
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|e| SignposeError::source_unreadable(path, format!("not a bundle archive: {e}")))?;

    for name in archive.file_names() {
        let known = name == member_name(PRESENCE_ARRAY)
            || GroupKind::ALL
                .iter()
                .any(|k| name == member_name(k.array_name()));
        if !known {
            tracing::debug!(path = %path.display(), member = name, "Ignoring unknown bundle member");
        }
    }

    let mut frame_count: Option<usize> = None;
    let mut check_frames = |name: &str, frames: usize| -> SignposeResult<()> {
        match frame_count {
            Some(expected) if expected != frames => Err(SignposeError::schema_mismatch(
                path,
                name,
                format!("has {frames} frames, other arrays have {expected}"),
            )),
            _ => {
                frame_count = Some(frames);
                Ok(())
            }
        }
    };

    let mut groups = GroupSet::EMPTY;
    let mut group_values: Vec<(GroupKind, Vec<f32>)> = Vec::new();
    for kind in GroupKind::ALL {
        let Some((shape, data)) = read_member(&mut archive, path, kind.array_name())? else {
            continue;
        };
        let NpyData::F32(values) = data else {
            return Err(SignposeError::schema_mismatch(
                path,
                kind.array_name(),
                "expected float32 elements",
            ));
        };
        match shape.as_slice() {
            [t, p, c] if *p == kind.cardinality() && *c == kind.channels() => {
                check_frames(kind.array_name(), *t)?;
            }
            _ => {
                return Err(SignposeError::schema_mismatch(
                    path,
                    kind.array_name(),
                    format!(
                        "shape {shape:?}, expected (T, {}, {})",
                        kind.cardinality(),
                        kind.channels()
                    ),
                ));
            }
        }
        groups.insert(kind);
        group_values.push((kind, values));
    }

    let presence = match read_member(&mut archive, path, PRESENCE_ARRAY)? {
        None => None,
        Some((shape, NpyData::U8(mask))) => match shape.as_slice() {
            [t, 4] => {
                check_frames(PRESENCE_ARRAY, *t)?;
                Some(mask)
            }
            _ => {
                return Err(SignposeError::schema_mismatch(
                    path,
                    PRESENCE_ARRAY,
                    format!("shape {shape:?}, expected (T, 4)"),
                ));
            }
        },
        Some(_) => {
            return Err(SignposeError::schema_mismatch(
                path,
                PRESENCE_ARRAY,
                "expected unsigned byte elements",
            ));
        }
    };

    let frames = frame_count.unwrap_or(0);
    let mut records = vec![FrameRecord::zeroed(); frames];
    for (kind, values) in &group_values {
        let stride = kind.values_per_frame();
        for (record, chunk) in records.iter_mut().zip(values.chunks_exact(stride)) {
            record.load_values(*kind, chunk);
        }
    }
    if let Some(mask) = &presence {
        for (record, row) in records.iter_mut().zip(mask.chunks_exact(4)) {
            record.detected = row
                .iter()
                .enumerate()
                .filter(|(_, flag)| **flag != 0)
                .filter_map(|(i, _)| GroupKind::from_index(i))
                .filter(|kind| groups.contains(*kind))
                .collect();
        }
    }

    tracing::debug!(
        path = %path.display(),
        frames,
        groups = groups.len(),
        presence = presence.is_some(),
        "Series bundle loaded"
    );
    Ok(Series::from_parts(records, groups, presence.is_some()))
}

type Member = (Vec<usize>, NpyData);

fn read_member(
    archive: &mut ZipArchive<BufReader<File>>,
    path: &Path,
    array: &str,
) -> SignposeResult<Option<Member>> {
    let mut entry = match archive.by_name(&member_name(array)) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(SignposeError::source_unreadable(
                path,
                format!("cannot open member {array}: {e}"),
            ))
        }
    };
    match npy::read_array(&mut entry) {
        Ok((header, data)) => Ok(Some((header.shape, data))),
        Err(NpyError::Io(e)) => Err(SignposeError::source_unreadable(
            path,
            format!("cannot read member {array}: {e}"),
        )),
        Err(e) => Err(SignposeError::schema_mismatch(path, array, e.to_string())),
    }
}
