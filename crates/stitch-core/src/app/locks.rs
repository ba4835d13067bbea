//! FileLocks - file_name 単位の advisory lock
//!
//! # ルール
//! - store_chunk は shared（read）lock を取る: 同じファイルの chunk は並行に書ける
//! - merge は exclusive（write）lock を取る: 書き込み中の chunk が終わるまで待つ
//! - sweep は削除の間だけ exclusive lock を try で取る。取れなければ消さない
//!
//! エントリは Weak で持ち、誰も guard を持っていなければ次のアクセスで掃除される。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::domain::FileName;

#[derive(Clone, Default)]
pub struct FileLocks {
    inner: Arc<Mutex<HashMap<String, Weak<RwLock<()>>>>>,
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, name: &str) -> Arc<RwLock<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.retain(|_, lock| lock.strong_count() > 0);
        if let Some(lock) = map.get(name).and_then(Weak::upgrade) {
            return lock;
        }
        let lock = Arc::new(RwLock::new(()));
        map.insert(name.to_owned(), Arc::downgrade(&lock));
        lock
    }

    /// Held while a chunk of `name` is being written.
    pub async fn shared(&self, name: &FileName) -> OwnedRwLockReadGuard<()> {
        self.entry(name.as_str()).read_owned().await
    }

    /// Held for the whole merge of `name`.
    pub async fn exclusive(&self, name: &FileName) -> OwnedRwLockWriteGuard<()> {
        self.entry(name.as_str()).write_owned().await
    }

    /// Exclusive lock on `name` if nobody holds it right now.
    pub fn try_exclusive(&self, name: &FileName) -> Option<OwnedRwLockWriteGuard<()>> {
        self.entry(name.as_str()).try_write_owned().ok()
    }

    /// True if some store or merge currently holds `name`.
    pub fn is_busy(&self, name: &str) -> bool {
        let lock = {
            let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.get(name).and_then(Weak::upgrade)
        };
        lock.is_some_and(|lock| lock.try_write().is_err())
    }

    /// Names with a live entry. Test/diagnostic helper.
    pub fn tracked(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.values().filter(|lock| lock.strong_count() > 0).count()
    }
}
