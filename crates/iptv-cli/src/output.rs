//! Writes checked playlists back out, split by result.

use std::io;
use std::path::{Path, PathBuf};

use iptv_core::playlist::write_m3u;
use iptv_core::Report;

pub const ONLINE_FILE: &str = "online.m3u";
pub const OFFLINE_FILE: &str = "offline.m3u";
pub const DUPLICATES_FILE: &str = "duplicates.m3u";

/// Writes `online.m3u`, `offline.m3u` and `duplicates.m3u` into `dir`, creating it
/// if needed. Returns the paths written.
pub fn write_report(dir: &Path, report: &Report) -> io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let files = [
        (ONLINE_FILE, write_m3u(report.online().map(|i| &i.entry))),
        (OFFLINE_FILE, write_m3u(report.offline().map(|i| &i.entry))),
        (DUPLICATES_FILE, write_m3u(report.duplicates().map(|i| &i.entry))),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = dir.join(name);
        std::fs::write(&path, content)?;
        written.push(path);
    }
    Ok(written)
}
