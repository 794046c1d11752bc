//! The adaptive-TTL cache over [`crate::stats::walk`] results.

use crate::stats::{self, DirectoryStats};
use crate::ttl::{dyn_ttl, DEFAULT_MAX_TIMEOUT, DEFAULT_MIN_TIMEOUT};
use parking_lot::Mutex;
use slog::Logger;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

struct Entry {
    stats: DirectoryStats,
    recorded_at: Instant,
    ttl: Duration,
}

/// Caches [`DirectoryStats`] per path with a TTL computed from the walk that
/// produced it. A single mutex guards the map; the (potentially slow) walk
/// itself runs with the lock released, so two concurrent misses on the same
/// path may both walk — acceptable given the small, bounded set of
/// configured directories.
pub struct DirectoryStatsCache {
    entries: Mutex<HashMap<PathBuf, Entry>>,
    min_timeout: Duration,
    max_timeout: Duration,
    log: Logger,
}

impl DirectoryStatsCache {
    pub fn new(log: Logger) -> Self {
        Self::with_timeouts(log, DEFAULT_MIN_TIMEOUT, DEFAULT_MAX_TIMEOUT)
    }

    pub fn with_timeouts(log: Logger, min_timeout: Duration, max_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            min_timeout,
            max_timeout,
            log,
        }
    }

    /// Returns cached stats for `path` if the entry's TTL hasn't elapsed.
    pub fn get(&self, path: &Path) -> Option<DirectoryStats> {
        let entries = self.entries.lock();
        entries.get(path).and_then(|entry| {
            if entry.recorded_at.elapsed() < entry.ttl {
                Some(entry.stats)
            } else {
                None
            }
        })
    }

    /// Returns the cached entry for `path` if fresh, otherwise walks it,
    /// stores the result with its newly-computed TTL, and returns that.
    pub fn get_or_refresh(&self, path: &Path) -> Result<DirectoryStats, stats::Error> {
        if let Some(stats) = self.get(path) {
            return Ok(stats);
        }

        let (stats, calc_time) = stats::walk(path, &self.log)?;
        let ttl = dyn_ttl(
            stats.total_bytes,
            stats.file_count,
            calc_time,
            self.min_timeout,
            self.max_timeout,
        );

        self.entries.lock().insert(
            path.to_path_buf(),
            Entry {
                stats,
                recorded_at: Instant::now(),
                ttl,
            },
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn null_log() -> Logger {
        Logger::root(slog::Discard.fuse(), slog::o!())
    }

    #[test]
    fn miss_then_hit() {
        let cache = DirectoryStatsCache::new(null_log());
        let dir = tempfile::tempdir().unwrap();

        assert!(cache.get(dir.path()).is_none());
        let stats = cache.get_or_refresh(dir.path()).unwrap();
        assert_eq!(stats.file_count, 0);
        assert!(cache.get(dir.path()).is_some());
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let cache = DirectoryStatsCache::with_timeouts(
            null_log(),
            Duration::from_millis(1),
            Duration::from_millis(50),
        );
        let dir = tempfile::tempdir().unwrap();
        cache.get_or_refresh(dir.path()).unwrap();
        std::thread::sleep(Duration::from_millis(60));
        assert!(cache.get(dir.path()).is_none());
    }
}
