//! A single directory walk plus one `statfs` call.

use slog::{debug, Logger};
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryStats {
    pub total_bytes: u64,
    pub file_count: u64,
    pub fs_total: u64,
    /// Free space available to an unprivileged process (`statfs`'s
    /// `f_bavail`) — what a non-root process can actually still write.
    pub fs_available: u64,
    /// Total free space including blocks reserved for the superuser
    /// (`statfs`'s `f_bfree`) — always `>= fs_available`.
    pub fs_free: u64,
}

#[derive(Debug)]
pub enum Error {
    Statfs(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Statfs(e) => write!(f, "statfs failed: {}", e),
        }
    }
}
impl std::error::Error for Error {}

/// Walks `path` once, summing regular-file sizes (symlinks and directories
/// are excluded from both the byte and file counts), then calls `statfs` on
/// it for the filesystem-level totals. Returns the stats plus how long the
/// walk itself took, which feeds the adaptive TTL calculation.
pub fn walk(path: &Path, log: &Logger) -> Result<(DirectoryStats, Duration), Error> {
    let start = Instant::now();

    let mut total_bytes: u64 = 0;
    let mut file_count: u64 = 0;

    for entry in WalkDir::new(path).into_iter() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(log, "Skipping inaccessible directory entry"; "error" => %e);
                continue;
            }
        };

        let file_type = entry.file_type();
        if !file_type.is_file() {
            continue;
        }

        match entry.metadata() {
            Ok(metadata) => {
                total_bytes += metadata.len();
                file_count += 1;
            }
            Err(e) => {
                debug!(log, "Skipping entry with unreadable metadata";
                    "path" => %entry.path().display(), "error" => %e);
            }
        }
    }

    let (fs_total, fs_available, fs_free) = statfs(path)?;
    let calc_time = start.elapsed();

    Ok((
        DirectoryStats {
            total_bytes,
            file_count,
            fs_total,
            fs_available,
            fs_free,
        },
        calc_time,
    ))
}

#[cfg(unix)]
fn statfs(path: &Path) -> Result<(u64, u64, u64), Error> {
    let stats = nix::sys::statfs::statfs(path).map_err(|e| Error::Statfs(e.to_string()))?;
    let block_size = stats.block_size() as u64;
    let total = stats.blocks() as u64 * block_size;
    let available = stats.blocks_available() as u64 * block_size;
    let free = stats.blocks_free() as u64 * block_size;
    Ok((total, available, free))
}

#[cfg(not(unix))]
fn statfs(_path: &Path) -> Result<(u64, u64, u64), Error> {
    Ok((0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn null_log() -> Logger {
        Logger::root(slog::Discard.fuse(), slog::o!())
    }

    #[test]
    fn counts_regular_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = fs::File::create(dir.path().join("a.txt")).unwrap();
        file.write_all(b"hello").unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();

        let (stats, _calc_time) = walk(dir.path(), &null_log()).unwrap();
        assert_eq!(stats.file_count, 1);
        assert_eq!(stats.total_bytes, 5);
    }
}
