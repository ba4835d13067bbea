//! Sweeper - 一時ディレクトリの `*.part*` を掃除する
//!
//! merge の最終段階として、または単体で呼ばれる。対象は全 file_name。
//! 1 つでも削除に失敗したら呼び出し全体の失敗にする。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OwnedRwLockWriteGuard;
use tracing::{debug, info};

use crate::app::FileLocks;
use crate::config::StorageLayout;
use crate::domain::{ChunkKey, FileName};
use crate::error::StitchError;

#[derive(Clone)]
pub struct Sweeper {
    layout: Arc<StorageLayout>,
    locks: FileLocks,
}

impl Sweeper {
    pub fn new(layout: Arc<StorageLayout>, locks: FileLocks) -> Self {
        Self { layout, locks }
    }

    /// Remove every `*.part*` artifact in the temp directory.
    ///
    /// `owner` is the file name the caller already holds exclusively; its
    /// artifacts are removed without locking again. For any other file name
    /// the sweep must win `try_exclusive` and keeps it across the removal;
    /// names a store or merge is using are left alone. Returns how many
    /// files were removed.
    pub async fn sweep(&self, owner: Option<&FileName>) -> Result<usize, StitchError> {
        let temp_dir = self.layout.temp_dir();
        match tokio::fs::try_exists(temp_dir).await {
            Ok(true) => {}
            Ok(false) => return Ok(0),
            Err(e) => return Err(StitchError::ListTemp(e.to_string())),
        }

        let candidates = self.list_candidates().await?;
        let mut removed = 0;
        for path in candidates {
            // held until the file is gone, so no store can reopen it in between
            let _claim = match self.claim(&path, owner) {
                Claim::Busy => {
                    debug!(path = %path.display(), "artifact in use, skipping");
                    continue;
                }
                claim => claim,
            };
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                // raced with another sweep
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(StitchError::Sweep { path, source }),
            }
        }

        if removed > 0 {
            info!(removed, "temp artifacts swept");
        }
        Ok(removed)
    }

    async fn list_candidates(&self) -> Result<Vec<PathBuf>, StitchError> {
        let pattern = self.layout.sweep_pattern();
        tokio::task::spawn_blocking(move || {
            let paths = glob::glob(&pattern).map_err(|e| StitchError::ListTemp(e.to_string()))?;
            paths
                .map(|entry| entry.map_err(|e| StitchError::ListTemp(e.to_string())))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| StitchError::TaskJoin(e.to_string()))?
    }

    fn claim(&self, path: &Path, owner: Option<&FileName>) -> Claim {
        let Some(key) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(ChunkKey::parse_artifact_name)
        else {
            return Claim::Free;
        };
        if owner == Some(key.file_name()) {
            return Claim::Free;
        }
        match self.locks.try_exclusive(key.file_name()) {
            Some(guard) => Claim::Held { _guard: guard },
            None => Claim::Busy,
        }
    }
}

/// Lock state of one artifact's file name during a sweep.
enum Claim {
    /// Not a chunk name, or already held by the caller.
    Free,
    Held { _guard: OwnedRwLockWriteGuard<()> },
    Busy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;

    struct Fixture {
        root: tempfile::TempDir,
        locks: FileLocks,
        sweeper: Sweeper,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let layout = StorageConfig::new(root.path().join("temp"), root.path().join("uploads"))
                .layout();
            std::fs::create_dir_all(layout.temp_dir()).unwrap();
            let locks = FileLocks::new();
            let sweeper = Sweeper::new(Arc::new(layout), locks.clone());
            Self {
                root,
                locks,
                sweeper,
            }
        }

        fn touch(&self, name: &str) {
            std::fs::write(self.root.path().join("temp").join(name), b"x").unwrap();
        }

        fn remaining(&self) -> Vec<String> {
            let mut names: Vec<String> = std::fs::read_dir(self.root.path().join("temp"))
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }
    }

    #[tokio::test]
    async fn removes_every_part_file() {
        let fx = Fixture::new();
        fx.touch("a.bin.part0");
        fx.touch("other.txt.part12");
        fx.touch("notes.partial");
        fx.touch("keep.txt");

        let removed = fx.sweeper.sweep(None).await.unwrap();
        assert_eq!(removed, 3);
        assert_eq!(fx.remaining(), vec!["keep.txt".to_string()]);
    }

    #[tokio::test]
    async fn missing_temp_dir_is_a_no_op() {
        let fx = Fixture::new();
        std::fs::remove_dir_all(fx.root.path().join("temp")).unwrap();
        assert_eq!(fx.sweeper.sweep(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn busy_file_names_are_skipped() {
        let fx = Fixture::new();
        fx.touch("uploading.bin.part0");
        fx.touch("orphan.bin.part0");

        let busy = FileName::new("uploading.bin").unwrap();
        let guard = fx.locks.shared(&busy).await;
        assert_eq!(fx.sweeper.sweep(None).await.unwrap(), 1);
        assert_eq!(fx.remaining(), vec!["uploading.bin.part0".to_string()]);

        drop(guard);
        assert_eq!(fx.sweeper.sweep(None).await.unwrap(), 1);
        assert!(fx.remaining().is_empty());
    }

    #[tokio::test]
    async fn claims_are_released_after_removal() {
        let fx = Fixture::new();
        fx.touch("orphan.bin.part0");
        fx.touch("orphan.bin.part1");

        assert_eq!(fx.sweeper.sweep(None).await.unwrap(), 2);
        assert_eq!(fx.locks.tracked(), 0);
        let store = tokio::time::timeout(
            std::time::Duration::from_millis(500),
            fx.locks.shared(&FileName::new("orphan.bin").unwrap()),
        )
        .await;
        assert!(store.is_ok());
    }

    #[tokio::test]
    async fn owner_is_swept_despite_its_own_lock() {
        let fx = Fixture::new();
        fx.touch("doc.txt.part5");

        let owner = FileName::new("doc.txt").unwrap();
        let _guard = fx.locks.exclusive(&owner).await;
        assert_eq!(fx.sweeper.sweep(Some(&owner)).await.unwrap(), 1);
        assert!(fx.remaining().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn removal_failure_is_fatal() {
        use std::os::unix::fs::PermissionsExt;

        let fx = Fixture::new();
        fx.touch("a.bin.part0");
        let temp = fx.root.path().join("temp");
        std::fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o555)).unwrap();

        let result = fx.sweeper.sweep(None).await;
        std::fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o755)).unwrap();

        // root ignores directory permissions; only assert when the OS enforced them
        if fx.remaining().contains(&"a.bin.part0".to_string()) {
            assert!(matches!(result, Err(StitchError::Sweep { .. })));
        }
    }
}
