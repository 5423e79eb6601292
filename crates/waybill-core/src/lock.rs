use crate::error::ErrorCode;
use crate::model::ids::ListId;
use fs2::FileExt;
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};
use tracing::warn;

/// Advisory lock errors for list and store lock files.
#[derive(Debug)]
pub enum LockError {
    Timeout { path: PathBuf, waited: Duration },
    IoError(io::Error),
}

impl From<io::Error> for LockError {
    fn from(err: io::Error) -> Self {
        Self::IoError(err)
    }
}

impl LockError {
    /// Machine-readable code associated with this lock error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::LockContention,
            Self::IoError(_) => ErrorCode::StorageFailed,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

impl std::fmt::Display for LockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout { path, waited } => {
                write!(
                    f,
                    "{}: lock timed out after {:?} at {}",
                    self.code().code(),
                    waited,
                    path.display()
                )
            }
            Self::IoError(err) => write!(f, "{}: {}", self.code().code(), err),
        }
    }
}

impl std::error::Error for LockError {}

#[derive(Debug)]
struct FileGuard {
    file: File,
    path: PathBuf,
}

impl FileGuard {
    fn acquire(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        let parent = path.parent().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "lock path has no parent")
        })?;
        fs::create_dir_all(parent)?;

        let start = Instant::now();
        loop {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(path)?;

            if file.try_lock_exclusive().is_ok() {
                return Ok(Self {
                    file,
                    path: path.to_path_buf(),
                });
            }

            if start.elapsed() >= timeout {
                let waited = start.elapsed();
                warn!(path = %path.display(), ?waited, "lock acquisition timed out");
                return Err(LockError::Timeout {
                    path: path.to_path_buf(),
                    waited,
                });
            }

            thread::sleep(Duration::from_millis(10));
        }
    }

    fn release(self) {
        let _ = self.file.unlock();
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Lock ids may come straight from request payloads; keep lock file names
/// flat and filesystem-safe.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// RAII guard serializing the load-mutate-save span of one list.
///
/// SQLite's own write lock only covers the final save; this lock covers the
/// whole read-modify-write window so two processes cannot interleave edits
/// of the same list.
#[derive(Debug)]
pub struct ListLock {
    guard: FileGuard,
}

impl ListLock {
    /// Acquire the exclusive advisory lock for `list_id` under `lock_dir`.
    ///
    /// # Errors
    ///
    /// [`LockError::Timeout`] when another holder keeps the lock past
    /// `timeout`; [`LockError::IoError`] when the lock file cannot be
    /// created or opened.
    pub fn acquire(lock_dir: &Path, list_id: &ListId, timeout: Duration) -> Result<Self, LockError> {
        let path = lock_dir.join(format!("list-{}.lock", sanitize(list_id.as_str())));
        Ok(Self {
            guard: FileGuard::acquire(&path, timeout)?,
        })
    }

    /// Explicitly release the lock. Release also happens automatically on drop.
    pub fn release(self) {
        self.guard.release();
    }

    /// Return the lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.guard.path()
    }
}

/// RAII guard for store-wide operations such as the retention sweep.
#[derive(Debug)]
pub struct StoreLock {
    guard: FileGuard,
}

impl StoreLock {
    /// Acquire the exclusive store-wide advisory lock under `lock_dir`.
    ///
    /// # Errors
    ///
    /// See [`ListLock::acquire`].
    pub fn acquire(lock_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = lock_dir.join("store.lock");
        Ok(Self {
            guard: FileGuard::acquire(&path, timeout)?,
        })
    }

    /// Explicitly release the lock. Release also happens automatically on drop.
    pub fn release(self) {
        self.guard.release();
    }

    /// Return the lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.guard.path()
    }
}
