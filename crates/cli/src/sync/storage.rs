// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable key/value string storage.
//!
//! The queue and the document cache persist themselves as JSON blobs under a
//! string key. [`FileStorage`] keeps one file per key in a directory;
//! [`MemoryStorage`] keeps everything in memory and can be told to fail, so
//! tests can exercise persistence errors.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use fs2::FileExt;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key cannot be mapped to a file name.
    #[error("invalid storage key '{0}'\n  hint: keys may contain letters, digits, '_', '-' and '.'")]
    InvalidKey(String),

    /// Storage refused the write (quota, injected failure).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Synchronous string storage keyed by name.
pub trait LocalStorage: Send + Sync {
    /// Returns the value stored under `key`, or `None`.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Runs `f` with exclusive access to the whole storage.
    ///
    /// No other writer, in this process or another, touches the storage
    /// until `f` returns. Fails only if exclusive access cannot be taken.
    fn transaction(&self, f: &mut dyn FnMut(&mut dyn StorageTransaction)) -> StorageResult<()>;
}

/// Key access inside [`LocalStorage::transaction`].
pub trait StorageTransaction {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> StorageResult<()>;
    fn remove_item(&mut self, key: &str) -> StorageResult<()>;
}

impl<S: LocalStorage + ?Sized> LocalStorage for std::sync::Arc<S> {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        (**self).remove_item(key)
    }

    fn transaction(&self, f: &mut dyn FnMut(&mut dyn StorageTransaction)) -> StorageResult<()> {
        (**self).transaction(f)
    }
}

const LOCK_FILE_NAME: &str = ".lock";

/// Storage backed by one file per key.
///
/// Writes go to a temp file which is fsynced and renamed over the target, so
/// readers never see a partial value. Writers and transactions from any
/// process are serialized by an exclusive lock on a `.lock` file in the
/// directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens storage in `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(FileStorage {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    fn lock(&self) -> StorageResult<File> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.dir.join(LOCK_FILE_NAME))?;
        file.lock_exclusive()?;
        Ok(file)
    }

    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn locked<T>(&self, f: impl FnOnce() -> StorageResult<T>) -> StorageResult<T> {
        let lock = self.lock()?;
        let result = f();
        FileExt::unlock(&lock)?;
        result
    }
}

impl LocalStorage for FileStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.read(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.locked(|| self.write(key, value))
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.locked(|| self.delete(key))
    }

    fn transaction(&self, f: &mut dyn FnMut(&mut dyn StorageTransaction)) -> StorageResult<()> {
        self.locked(|| {
            f(&mut FileTransaction(self));
            Ok(())
        })
    }
}

struct FileTransaction<'a>(&'a FileStorage);

impl StorageTransaction for FileTransaction<'_> {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.0.read(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.0.write(key, value)
    }

    fn remove_item(&mut self, key: &str) -> StorageResult<()> {
        self.0.delete(key)
    }
}

/// In-memory storage.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `set_item`/`remove_item` fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

impl LocalStorage for MemoryStorage {
    fn transaction(&self, f: &mut dyn FnMut(&mut dyn StorageTransaction)) -> StorageResult<()> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut MemoryTransaction {
            items: &mut *items,
            storage: self,
        });
        Ok(())
    }

    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.check_writable()?;
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.check_writable()?;
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.remove(key);
        Ok(())
    }
}

struct MemoryTransaction<'a> {
    items: &'a mut HashMap<String, String>,
    storage: &'a MemoryStorage,
}

impl StorageTransaction for MemoryTransaction<'_> {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.storage.check_writable()?;
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> StorageResult<()> {
        self.storage.check_writable()?;
        self.items.remove(key);
        Ok(())
    }
}
