//! Observability - tracing の初期化と MergeReport のログ出力

use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::domain::MergeReport;

/// Install a fmt subscriber filtered by `RUST_LOG`, or `default_directive`
/// when unset (e.g. `"stitch=info"`).
///
/// Calling it twice is harmless; the second install is ignored.
pub fn init_logging(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// One summary line per merge; `warn` when chunks were left out.
pub fn log_merge_report(report: &MergeReport) {
    let elapsed_ms = (report.finished_at - report.started_at).num_milliseconds();
    if report.is_complete() {
        info!(
            merge_id = %report.merge_id,
            file_name = %report.file_name,
            chunks = report.merged.len(),
            bytes = report.bytes_written,
            swept = report.swept,
            elapsed_ms,
            "chunks merged"
        );
    } else {
        warn!(
            merge_id = %report.merge_id,
            file_name = %report.file_name,
            merged = report.merged.len(),
            total_chunks = report.total_chunks,
            omitted = ?report.omitted(),
            bytes = report.bytes_written,
            swept = report.swept,
            elapsed_ms,
            "chunks merged with omissions"
        );
    }
}
