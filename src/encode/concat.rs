use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::{Path, PathBuf};

use crate::config::OutputFormat;
use crate::encode::ffmpeg::{H264_OUTPUT_ARGS, ensure_parent_dir, run_ffmpeg};
use crate::encode::sink::EncodeSettings;
use crate::encode::y4m::read_header_line;
use crate::foundation::core::TimeRange;
use crate::foundation::error::{ReelError, ReelResult};

/// One encoded segment waiting to be joined.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentArtifact {
    /// Timeline time covered by the segment.
    pub range: TimeRange,
    /// Intermediate file.
    pub path: PathBuf,
    /// Settings the segment was encoded with.
    pub settings: EncodeSettings,
}

/// How a set of segment artifacts was joined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    /// Streams were appended without touching encoded frames.
    ContainerCopy,
    /// Segments disagreed on settings and were decoded and re-encoded.
    Reencode,
}

/// Container copy when every part shares the first part's settings, re-encode otherwise.
pub fn choose_join_mode(parts: &[SegmentArtifact]) -> JoinMode {
    match parts.split_first() {
        Some((first, rest)) if rest.iter().any(|p| p.settings != first.settings) => {
            JoinMode::Reencode
        }
        _ => JoinMode::ContainerCopy,
    }
}

/// Join `parts`, in the given order, into a single artifact at `out`.
///
/// Parts must already be in timeline order. On failure the partial output is removed.
#[tracing::instrument(skip(parts), fields(parts = parts.len(), out = %out.display()))]
pub fn join_artifacts(parts: &[SegmentArtifact], out: &Path) -> ReelResult<JoinMode> {
    let first = parts
        .first()
        .ok_or_else(|| ReelError::concat("no segment artifacts to join"))?;
    if let Some(p) = parts.iter().find(|p| p.settings.format != first.settings.format) {
        return Err(ReelError::concat(format!(
            "cannot join {} segment '{}' with {} segments",
            p.settings.format.container(),
            p.path.display(),
            first.settings.format.container()
        )));
    }
    ensure_parent_dir(out)?;

    let mode = choose_join_mode(parts);
    tracing::debug!(?mode, "joining segment artifacts");
    let res = if parts.len() == 1 {
        std::fs::copy(&first.path, out).map(|_| ()).map_err(|e| {
            ReelError::concat(format!(
                "failed to copy '{}' to '{}': {e}",
                first.path.display(),
                out.display()
            ))
        })
    } else {
        match (first.settings.format, mode) {
            (OutputFormat::Y4m, JoinMode::ContainerCopy) => join_y4m(parts, out),
            (OutputFormat::Y4m, JoinMode::Reencode) => Err(ReelError::concat(
                "y4m segments with differing settings cannot be joined",
            )),
            (OutputFormat::Mp4H264, mode) => join_mp4(parts, out, mode),
        }
    };

    if let Err(e) = res {
        let _ = std::fs::remove_file(out);
        return Err(e);
    }
    Ok(mode)
}

fn join_y4m(parts: &[SegmentArtifact], out: &Path) -> ReelResult<()> {
    let file = File::create(out)
        .map_err(|e| ReelError::concat(format!("failed to create '{}': {e}", out.display())))?;
    let mut writer = BufWriter::new(file);
    let mut expected_header: Option<Vec<u8>> = None;

    for part in parts {
        let file = File::open(&part.path).map_err(|e| {
            ReelError::concat(format!("failed to open '{}': {e}", part.path.display()))
        })?;
        let mut reader = BufReader::new(file);
        let header = read_header_line(&mut reader, &part.path)?;
        match &expected_header {
            None => {
                writer
                    .write_all(&header)
                    .map_err(|e| ReelError::concat(format!("failed to write y4m header: {e}")))?;
                expected_header = Some(header);
            }
            Some(expected) if *expected != header => {
                return Err(ReelError::concat(format!(
                    "stream header of '{}' does not match the first segment",
                    part.path.display()
                )));
            }
            Some(_) => {}
        }
        std::io::copy(&mut reader, &mut writer).map_err(|e| {
            ReelError::concat(format!("failed to append '{}': {e}", part.path.display()))
        })?;
    }

    let file = writer
        .into_inner()
        .map_err(|e| ReelError::concat(format!("failed to flush '{}': {e}", out.display())))?;
    file.sync_all()
        .map_err(|e| ReelError::concat(format!("failed to sync '{}': {e}", out.display())))
}

fn join_mp4(parts: &[SegmentArtifact], out: &Path, mode: JoinMode) -> ReelResult<()> {
    let list_path = out.with_extension("concat.txt");
    write_concat_list(parts, &list_path)?;

    let mut args: Vec<OsString> = ["-f", "concat", "-safe", "0", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(list_path.clone().into_os_string());
    match mode {
        JoinMode::ContainerCopy => {
            args.extend(["-c", "copy", "-movflags", "+faststart"].map(OsString::from));
        }
        JoinMode::Reencode => {
            let target = &parts[0].settings;
            args.extend([
                OsString::from("-vf"),
                OsString::from(format!(
                    "scale={}:{},setsar=1",
                    target.canvas.width, target.canvas.height
                )),
                OsString::from("-r"),
                OsString::from(format!("{}/{}", target.fps.num, target.fps.den)),
            ]);
            args.extend(H264_OUTPUT_ARGS.map(OsString::from));
        }
    }
    args.push(out.as_os_str().to_os_string());

    let res = run_ffmpeg(args).map_err(ReelError::concat);
    let _ = std::fs::remove_file(&list_path);
    res
}

fn write_concat_list(parts: &[SegmentArtifact], list_path: &Path) -> ReelResult<()> {
    let mut list = File::create(list_path).map_err(|e| {
        ReelError::concat(format!(
            "failed to create concat list '{}': {e}",
            list_path.display()
        ))
    })?;
    for part in parts {
        let abs = std::path::absolute(&part.path).unwrap_or_else(|_| part.path.clone());
        let escaped = abs.display().to_string().replace('\'', r"'\''");
        writeln!(list, "file '{escaped}'")
            .map_err(|e| ReelError::concat(format!("failed to write concat list: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/concat.rs"]
mod tests;
