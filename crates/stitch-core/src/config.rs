//! Config - ストレージ設定
//!
//! ディレクトリは明示的に渡し、リクエストごとではなく App の構築時に 1 回だけ作る。
//!
//! # 環境変数
//! - `STITCH_TEMP_DIR` / `STITCH_FINAL_DIR`
//! - `STITCH_COPY_BUFFER` / `STITCH_MAX_IN_FLIGHT`

use std::path::{Path, PathBuf};

use crate::domain::{ChunkKey, FileName};
use crate::error::StitchError;

pub const DEFAULT_TEMP_DIR: &str = "./temp";
pub const DEFAULT_FINAL_DIR: &str = "./uploads";
/// 1 MiB copy buffer for incoming chunk streams.
pub const DEFAULT_COPY_BUFFER: usize = 1024 * 1024;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

pub const ENV_TEMP_DIR: &str = "STITCH_TEMP_DIR";
pub const ENV_FINAL_DIR: &str = "STITCH_FINAL_DIR";
pub const ENV_COPY_BUFFER: &str = "STITCH_COPY_BUFFER";
pub const ENV_MAX_IN_FLIGHT: &str = "STITCH_MAX_IN_FLIGHT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Where chunk artifacts live until merged.
    pub temp_dir: PathBuf,
    /// Where merged output files are written.
    pub final_dir: PathBuf,
    /// Buffer size used when streaming a chunk to disk.
    pub copy_buffer_size: usize,
    /// Max chunk buffers held in memory during one merge.
    pub max_in_flight: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from(DEFAULT_TEMP_DIR),
            final_dir: PathBuf::from(DEFAULT_FINAL_DIR),
            copy_buffer_size: DEFAULT_COPY_BUFFER,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl StorageConfig {
    pub fn new(temp_dir: impl Into<PathBuf>, final_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            final_dir: final_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_copy_buffer_size(mut self, size: usize) -> Self {
        self.copy_buffer_size = size;
        self
    }

    pub fn with_max_in_flight(mut self, n: usize) -> Self {
        self.max_in_flight = n;
        self
    }

    /// Load from `STITCH_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, StitchError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, StitchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(dir) = lookup(ENV_TEMP_DIR) {
            config.temp_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_FINAL_DIR) {
            config.final_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_COPY_BUFFER) {
            config.copy_buffer_size = parse_usize(ENV_COPY_BUFFER, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_IN_FLIGHT) {
            config.max_in_flight = parse_usize(ENV_MAX_IN_FLIGHT, &raw)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StitchError> {
        if self.copy_buffer_size == 0 {
            return Err(StitchError::Config("copy buffer size must be non-zero".into()));
        }
        if self.max_in_flight == 0 {
            return Err(StitchError::Config("max_in_flight must be non-zero".into()));
        }
        if self.temp_dir.as_os_str().is_empty() || self.final_dir.as_os_str().is_empty() {
            return Err(StitchError::Config("storage directories must be set".into()));
        }
        Ok(())
    }

    pub fn layout(&self) -> StorageLayout {
        StorageLayout {
            temp_dir: self.temp_dir.clone(),
            final_dir: self.final_dir.clone(),
        }
    }
}

fn parse_usize(key: &str, raw: &str) -> Result<usize, StitchError> {
    raw.trim()
        .parse()
        .map_err(|e| StitchError::Config(format!("{key}={raw:?}: {e}")))
}

/// Path rules shared by the chunk store, the merge engine and the sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    temp_dir: PathBuf,
    final_dir: PathBuf,
}

impl StorageLayout {
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn final_dir(&self) -> &Path {
        &self.final_dir
    }

    /// `<temp-dir>/<file_name>.part<index>`
    pub fn chunk_path(&self, key: &ChunkKey) -> PathBuf {
        self.temp_dir.join(key.artifact_name())
    }

    /// `<final-dir>/<file_name>`
    pub fn output_path(&self, file_name: &FileName) -> PathBuf {
        self.final_dir.join(file_name.as_str())
    }

    /// `<temp-dir>/*.part*`, with the directory part escaped.
    pub fn sweep_pattern(&self) -> String {
        let dir = glob::Pattern::escape(&self.temp_dir.to_string_lossy());
        format!("{}/*.part*", dir.trim_end_matches('/'))
    }

    /// Create both directories if needed. Safe to call repeatedly.
    pub async fn ensure_dirs(&self) -> Result<(), StitchError> {
        for dir in [&self.final_dir, &self.temp_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| StitchError::CreateDir {
                    path: dir.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChunkIndex;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_legacy_layout() {
        let config = StorageConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.temp_dir, PathBuf::from("./temp"));
        assert_eq!(config.final_dir, PathBuf::from("./uploads"));
        assert_eq!(config.copy_buffer_size, 1024 * 1024);
        assert_eq!(config.max_in_flight, 8);
    }

    #[test]
    fn env_overrides() {
        let config = StorageConfig::from_lookup(lookup(&[
            (ENV_TEMP_DIR, "/var/stitch/tmp"),
            (ENV_FINAL_DIR, "/var/stitch/out"),
            (ENV_COPY_BUFFER, "4096"),
            (ENV_MAX_IN_FLIGHT, " 2 "),
        ]))
        .unwrap();
        assert_eq!(config.temp_dir, PathBuf::from("/var/stitch/tmp"));
        assert_eq!(config.final_dir, PathBuf::from("/var/stitch/out"));
        assert_eq!(config.copy_buffer_size, 4096);
        assert_eq!(config.max_in_flight, 2);
    }

    #[test]
    fn bad_numbers_are_config_errors() {
        let err = StorageConfig::from_lookup(lookup(&[(ENV_MAX_IN_FLIGHT, "many")])).unwrap_err();
        assert!(matches!(err, StitchError::Config(msg) if msg.contains(ENV_MAX_IN_FLIGHT)));

        let err = StorageConfig::from_lookup(lookup(&[(ENV_COPY_BUFFER, "0")])).unwrap_err();
        assert!(matches!(err, StitchError::Config(_)));
    }

    #[test]
    fn layout_paths() {
        let layout = StorageConfig::new("tmp", "out").layout();
        let key = ChunkKey::new(FileName::new("doc.txt").unwrap(), ChunkIndex::new(4));
        assert_eq!(layout.chunk_path(&key), PathBuf::from("tmp/doc.txt.part4"));
        assert_eq!(
            layout.output_path(key.file_name()),
            PathBuf::from("out/doc.txt")
        );
        assert_eq!(layout.sweep_pattern(), "tmp/*.part*");
    }

    #[test]
    fn sweep_pattern_escapes_directory() {
        let layout = StorageConfig::new("tmp[1]/", "out").layout();
        assert_eq!(layout.sweep_pattern(), "tmp[[]1[]]/*.part*");
    }

    #[tokio::test]
    async fn ensure_dirs_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let layout =
            StorageConfig::new(root.path().join("temp"), root.path().join("uploads")).layout();
        layout.ensure_dirs().await.unwrap();
        layout.ensure_dirs().await.unwrap();
        assert!(root.path().join("temp").is_dir());
        assert!(root.path().join("uploads").is_dir());
    }
}
