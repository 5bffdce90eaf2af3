//! # File I/O Module
//!
//! Stores QA logbooks on disk. Plants typically keep one logbook on a shared
//! drive, so saves are atomic and edits are guarded by a lock:
//!
//! - **Atomic saves**: write `.pqa.tmp`, fsync, rename over `.pqa`
//! - **File locking**: `fs2` exclusive lock plus a `.pqa.lock` file naming the holder
//! - **Validation on load**: schema version and every aggregate specification
//!
//! ## Example
//!
//! ```rust,no_run
//! use qa_core::file_io::{save_logbook, load_logbook, FileLock};
//! use qa_core::logbook::QaLogbook;
//! use std::path::Path;
//!
//! let logbook = QaLogbook::new("North Plant", "J. Rivera");
//! let path = Path::new("north_plant.pqa");
//!
//! let lock = FileLock::acquire(path, "qa@plant.com")?;
//! save_logbook(&logbook, path)?;
//! drop(lock); // releases lock
//!
//! let reloaded = load_logbook(path)?;
//! assert_eq!(reloaded.meta.plant, "North Plant");
//! # Ok::<(), qa_core::errors::QaError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{QaError, QaResult};
use crate::logbook::{QaLogbook, SCHEMA_VERSION};

/// Lock files are ignored once they are older than this
const STALE_LOCK_HOURS: i64 = 24;

/// Metadata written into `.pqa.lock` files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier (email or username)
    pub user_id: String,
    /// Machine name where lock was acquired
    pub machine: String,
    /// Process ID that holds the lock
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }

    /// Whether the holder is gone (same machine, dead pid) or the lock has aged out
    pub fn is_stale(&self) -> bool {
        if hostname().as_deref() == Some(self.machine.as_str()) && !process_alive(self.pid) {
            return true;
        }
        (Utc::now() - self.locked_at).num_hours() > STALE_LOCK_HOURS
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    fs::metadata(format!("/proc/{}", pid)).is_ok()
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    // No cheap liveness probe; rely on lock age instead.
    true
}

/// Exclusive lock on a logbook file, released when dropped.
pub struct FileLock {
    logbook_path: PathBuf,
    lock_path: PathBuf,
    /// Keeps the OS-level lock alive
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire an exclusive lock on a logbook file.
    ///
    /// # Errors
    ///
    /// * `FileLocked` - another live process holds the lock
    /// * `FileError` - the lock file could not be written
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> QaResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        if let Some(existing) = FileLock::check(path) {
            return Err(QaError::file_locked(
                path.display().to_string(),
                format!("{} ({})", existing.user_id, existing.machine),
                existing.locked_at.to_rfc3339(),
            ));
        }

        let lock_err = |op: &str, e: std::io::Error| {
            QaError::file_error(op, lock_path.display().to_string(), e.to_string())
        };

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| lock_err("create lock", e))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| {
                QaError::file_locked(path.display().to_string(), "another process", "unknown")
            })?;

        let lock_json = serde_json::to_string_pretty(&info)
            .map_err(|e| QaError::SerializationError { reason: e.to_string() })?;
        lock_file
            .write_all(lock_json.as_bytes())
            .map_err(|e| lock_err("write lock", e))?;
        lock_file.sync_all().map_err(|e| lock_err("sync lock", e))?;

        debug!(path = %path.display(), user = %info.user_id, "acquired logbook lock");

        Ok(FileLock {
            logbook_path: path.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Return the current holder of a live lock, if any.
    pub fn check(path: &Path) -> Option<LockInfo> {
        let lock_path = lock_path_for(path);
        if !lock_path.exists() {
            return None;
        }
        read_lock_info(&lock_path).ok().filter(|info| !info.is_stale())
    }

    /// Path of the locked logbook
    pub fn logbook_path(&self) -> &Path {
        &self.logbook_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// `north.pqa` -> `north.pqa.lock`
fn lock_path_for(logbook_path: &Path) -> PathBuf {
    let mut lock_path = logbook_path.to_path_buf();
    let extension = lock_path
        .extension()
        .map(|e| format!("{}.lock", e.to_string_lossy()))
        .unwrap_or_else(|| "lock".to_string());
    lock_path.set_extension(extension);
    lock_path
}

fn read_to_string(path: &Path, operation: &str) -> QaResult<String> {
    let io_err = |e: std::io::Error| {
        QaError::file_error(operation, path.display().to_string(), e.to_string())
    };
    let mut file = File::open(path).map_err(io_err)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(io_err)?;
    Ok(contents)
}

fn read_lock_info(lock_path: &Path) -> QaResult<LockInfo> {
    let contents = read_to_string(lock_path, "read lock")?;
    serde_json::from_str(&contents)
        .map_err(|e| QaError::SerializationError { reason: e.to_string() })
}

/// Save a logbook with atomic write semantics.
///
/// Serializes to `<path>.tmp`, fsyncs, then renames over `path`, so an
/// interrupted save never leaves a truncated logbook behind.
pub fn save_logbook(logbook: &QaLogbook, path: &Path) -> QaResult<()> {
    let json = serde_json::to_string_pretty(logbook).map_err(|e| QaError::SerializationError {
        reason: e.to_string(),
    })?;

    let tmp_path = path.with_extension("pqa.tmp");
    let tmp_err = |op: &str, e: std::io::Error| {
        QaError::file_error(op, tmp_path.display().to_string(), e.to_string())
    };

    let mut tmp_file = File::create(&tmp_path).map_err(|e| tmp_err("create temp file", e))?;
    tmp_file
        .write_all(json.as_bytes())
        .map_err(|e| tmp_err("write temp file", e))?;
    tmp_file.sync_all().map_err(|e| tmp_err("sync temp file", e))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        QaError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    info!(
        path = %path.display(),
        records = logbook.records.len(),
        patterns = logbook.patterns.len(),
        "saved logbook"
    );
    Ok(())
}

/// Load a logbook from a file.
///
/// # Errors
///
/// * `FileError` - I/O failure
/// * `SerializationError` - invalid JSON
/// * `VersionMismatch` - written by an incompatible schema
/// * `InvalidSpecification` - a stored aggregate specification is malformed
pub fn load_logbook(path: &Path) -> QaResult<QaLogbook> {
    let contents = read_to_string(path, "open")?;

    let logbook: QaLogbook =
        serde_json::from_str(&contents).map_err(|e| QaError::SerializationError {
            reason: format!("Invalid JSON in {}: {}", path.display(), e),
        })?;

    validate_version(&logbook.meta.version)?;
    for spec in &logbook.catalog.specifications {
        spec.validate()?;
    }

    debug!(path = %path.display(), records = logbook.records.len(), "loaded logbook");
    Ok(logbook)
}

/// Load a logbook along with the current lock holder, if someone else has it open.
pub fn load_logbook_with_lock_check(path: &Path) -> QaResult<(QaLogbook, Option<LockInfo>)> {
    let logbook = load_logbook(path)?;
    Ok((logbook, FileLock::check(path)))
}

/// Major versions must match; in 0.x a newer minor version is also rejected.
fn validate_version(file_version: &str) -> QaResult<()> {
    let parse = |v: &str| -> Vec<u32> { v.split('.').filter_map(|p| p.parse().ok()).collect() };
    let file_parts = parse(file_version);
    let current_parts = parse(SCHEMA_VERSION);

    let mismatch = || QaError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let (Some(file_major), Some(current_major)) = (file_parts.first(), current_parts.first()) else {
        return Err(mismatch());
    };
    if file_major != current_major {
        return Err(mismatch());
    }
    if *current_major == 0 {
        if let (Some(file_minor), Some(current_minor)) = (file_parts.get(1), current_parts.get(1)) {
            if file_minor > current_minor {
                return Err(mismatch());
            }
        }
    }
    Ok(())
}
