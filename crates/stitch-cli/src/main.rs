//! stitch - chunk の upload / merge / sweep をローカルで動かす CLI
//!
//! # フロー（split）
//! 1. ファイルを固定長の範囲に分割
//! 2. 順番をシャッフルして並行に upload
//! 3. merge して MergeReport を表示

mod split;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use rand::seq::SliceRandom;
use stitch_core::domain::ApiResponse;
use stitch_core::impls::PathPart;
use stitch_core::observability::init_logging;
use stitch_core::{App, AppBuilder, StitchError, StorageConfig};
use tokio::task::JoinSet;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "stitch", version, about = "Chunked upload store and merger")]
struct Cli {
    #[command(flatten)]
    storage: StorageArgs,

    #[command(subcommand)]
    command: Command,
}

/// Overrides for `STITCH_*` environment settings.
#[derive(Args, Debug)]
struct StorageArgs {
    #[arg(long, global = true)]
    temp_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    final_dir: Option<PathBuf>,

    /// Copy buffer size in bytes
    #[arg(long, global = true)]
    copy_buffer: Option<usize>,

    /// Chunks read ahead during a merge
    #[arg(long, global = true)]
    max_in_flight: Option<usize>,
}

impl StorageArgs {
    fn into_config(self) -> Result<StorageConfig, StitchError> {
        let mut config = StorageConfig::from_env()?;
        if let Some(dir) = self.temp_dir {
            config.temp_dir = dir;
        }
        if let Some(dir) = self.final_dir {
            config.final_dir = dir;
        }
        if let Some(size) = self.copy_buffer {
            config = config.with_copy_buffer_size(size);
        }
        if let Some(n) = self.max_in_flight {
            config = config.with_max_in_flight(n);
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store one chunk
    Upload {
        file: PathBuf,
        #[arg(long)]
        index: i64,
        /// Logical file name (defaults to the file's own name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Merge stored chunks into the final directory
    Merge { name: String, total: i64 },
    /// Upload a local file as shuffled chunks, then merge it
    Split {
        file: PathBuf,
        #[arg(long, default_value_t = 1024 * 1024)]
        chunk_size: u64,
        #[arg(long)]
        name: Option<String>,
    },
    /// Remove leftover chunk artifacts
    Sweep,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging("stitch=info,stitch_core=info");
    let cli = Cli::parse();

    let app = match build_app(cli.storage).await {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "startup failed");
            return print_response(&ApiResponse::failure(&e));
        }
    };

    match cli.command {
        Command::Upload { file, index, name } => {
            let name = name.unwrap_or_else(|| default_name(&file));
            let body = serde_json::json!({ "chunk_index": index }).to_string();
            let part = PathPart::new(name, file);
            let resp = app
                .handler()
                .upload_file(body.as_bytes(), Some(Box::new(part)))
                .await;
            print_response(&resp)
        }
        Command::Merge { name, total } => {
            let body = serde_json::json!({ "file_name": name, "total_chunks": total }).to_string();
            print_response(&app.handler().merge_chunks(body.as_bytes()).await)
        }
        Command::Split {
            file,
            chunk_size,
            name,
        } => {
            let name = name.unwrap_or_else(|| default_name(&file));
            match split_and_merge(&app, &file, &name, chunk_size).await {
                Ok(resp) => print_response(&resp),
                Err(e) => print_response(&ApiResponse::failure(&e)),
            }
        }
        Command::Sweep => match app.sweep_orphans().await {
            Ok(removed) => {
                println!("{}", serde_json::json!({ "error": false, "removed": removed }));
                ExitCode::SUCCESS
            }
            Err(e) => print_response(&ApiResponse::failure(&e)),
        },
    }
}

async fn build_app(args: StorageArgs) -> Result<App, StitchError> {
    let config = args.into_config()?;
    AppBuilder::new().config(config).build().await
}

fn default_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Upload every chunk of `file` concurrently in random order, then merge.
async fn split_and_merge(
    app: &App,
    file: &std::path::Path,
    name: &str,
    chunk_size: u64,
) -> Result<ApiResponse, StitchError> {
    let mut parts = split::split_into_chunks(file, name, chunk_size).map_err(|source| {
        StitchError::OpenUpload {
            file_name: name.to_owned(),
            source,
        }
    })?;
    let total = parts.len();
    parts.shuffle(&mut rand::thread_rng());
    info!(file_name = name, total, "uploading chunks");

    let mut uploads = JoinSet::new();
    for part in parts {
        let handler = app.handler();
        uploads.spawn(async move {
            let body = serde_json::json!({ "chunk_index": part.index }).to_string();
            handler.upload_file(body.as_bytes(), Some(Box::new(part))).await
        });
    }
    while let Some(joined) = uploads.join_next().await {
        let resp = joined.map_err(|e| StitchError::TaskJoin(e.to_string()))?;
        if resp.error {
            return Ok(resp);
        }
    }

    let body = serde_json::json!({ "file_name": name, "total_chunks": total }).to_string();
    let report = app.handler().merge(body.as_bytes()).await?;
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => error!(error = %e, "cannot render merge report"),
    }
    Ok(ApiResponse::merged())
}

fn print_response(resp: &ApiResponse) -> ExitCode {
    match serde_json::to_string(resp) {
        Ok(json) => println!("{json}"),
        Err(e) => error!(error = %e, "cannot render response"),
    }
    if resp.error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(root: &std::path::Path) -> StorageConfig {
        StorageConfig::new(root.join("temp"), root.join("uploads"))
    }

    #[test]
    fn cli_parses_subcommands_and_overrides() {
        let cli = Cli::parse_from([
            "stitch",
            "merge",
            "doc.txt",
            "3",
            "--temp-dir",
            "/tmp/t",
            "--max-in-flight",
            "2",
        ]);
        assert!(matches!(cli.command, Command::Merge { ref name, total: 3 } if name == "doc.txt"));
        assert_eq!(cli.storage.temp_dir, Some(PathBuf::from("/tmp/t")));
        assert_eq!(cli.storage.max_in_flight, Some(2));
    }

    #[test]
    fn default_name_is_the_base_name() {
        assert_eq!(default_name(std::path::Path::new("/a/b/report.pdf")), "report.pdf");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn split_and_merge_reassembles_the_file() {
        let root = tempfile::tempdir().unwrap();
        let src = root.path().join("source.bin");
        let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&src, &content).unwrap();

        let app = AppBuilder::new().config(config_in(root.path())).build().await.unwrap();
        let resp = split_and_merge(&app, &src, "copy.bin", 777).await.unwrap();

        assert!(!resp.error);
        assert_eq!(std::fs::read(root.path().join("uploads/copy.bin")).unwrap(), content);
        let leftovers = std::fs::read_dir(root.path().join("temp")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn split_of_an_empty_file_yields_an_empty_output() {
        let root = tempfile::tempdir().unwrap();
        let src = root.path().join("empty.bin");
        std::fs::write(&src, b"").unwrap();

        let app = AppBuilder::new().config(config_in(root.path())).build().await.unwrap();
        let resp = split_and_merge(&app, &src, "empty.bin", 16).await.unwrap();

        assert!(!resp.error);
        assert!(std::fs::read(root.path().join("uploads/empty.bin")).unwrap().is_empty());
    }
}
