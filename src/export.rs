use crate::render::render_document;
use crate::types::MapDescription;
use anyhow::{Context, Result};
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Label shown by the dashboard once a snapshot is written.
pub const SAVED_LABEL: &str = "Mapa Salvo!";

/// `map_{region}.html`. Bytes outside `[A-Za-z0-9-]` are written as `_XX` hex escapes,
/// so distinct region codes never share a file.
pub fn snapshot_file_name(region: &str) -> String {
    let mut stem = String::with_capacity(region.len());
    for byte in region.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(byte as char);
        } else {
            let _ = write!(stem, "_{:02X}", byte);
        }
    }
    format!("map_{}.html", stem)
}

pub fn snapshot_path(dir: &Path, region: &str) -> PathBuf {
    dir.join(snapshot_file_name(region))
}

/// Writes `map` as a standalone document for `region`, replacing any earlier snapshot
/// of the same region. Concurrent exports of one region are last-write-wins.
pub fn export(map: &MapDescription, region: &str, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create snapshot directory: {:?}", dir))?;

    let path = snapshot_path(dir, region);
    fs::write(&path, render_document(map))
        .with_context(|| format!("Failed to write snapshot: {:?}", path))?;

    info!("Saved {} markers to {:?}", map.markers.len(), path);
    Ok(path)
}
