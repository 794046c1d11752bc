use crate::metrics::{
    DISK_FILE_COUNT, DISK_FS_AVAILABLE_BYTES, DISK_FS_FREE_BYTES, DISK_FS_TOTAL_BYTES,
    DISK_TOTAL_BYTES,
};
use filesystem_monitor::DirectoryStatsCache;
use metrics::set_gauge_vec;
use slog::{warn, Logger};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use task_executor::TaskExecutor;

pub struct DiskJobContext {
    pub cache: DirectoryStatsCache,
    pub directories: Vec<PathBuf>,
    pub node_name: String,
    pub interval: Duration,
    pub log: Logger,
}

pub async fn run_disk_job(ctx: Arc<DiskJobContext>, executor: TaskExecutor) {
    let mut interval = tokio::time::interval(ctx.interval);
    loop {
        tokio::select! {
            _ = executor.exit() => return,
            _ = interval.tick() => tick(&ctx),
        }
    }
}

fn tick(ctx: &DiskJobContext) {
    for directory in &ctx.directories {
        match ctx.cache.get_or_refresh(directory) {
            Ok(stats) => {
                let label = directory.to_string_lossy();
                let labels = [ctx.node_name.as_str(), label.as_ref()];
                set_gauge_vec(&DISK_TOTAL_BYTES, &labels, stats.total_bytes as i64);
                set_gauge_vec(&DISK_FILE_COUNT, &labels, stats.file_count as i64);
                set_gauge_vec(&DISK_FS_TOTAL_BYTES, &labels, stats.fs_total as i64);
                set_gauge_vec(&DISK_FS_AVAILABLE_BYTES, &labels, stats.fs_available as i64);
                set_gauge_vec(&DISK_FS_FREE_BYTES, &labels, stats.fs_free as i64);
            }
            Err(e) => warn!(ctx.log, "Failed to walk directory"; "directory" => %directory.display(), "error" => %e),
        }
    }
}
