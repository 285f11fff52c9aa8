/// Storage manager
///
/// Owns the authoritative internal storage root and the best-effort USB
/// backup. Saves are dual-destination: a failure on the internal target is
/// fatal, a failure on the USB target only degrades the save. All writes go
/// through a write-temp-then-rename so a torn write never leaves a partial
/// file at the final path.
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::StorageConfig;
use crate::error::{CoreError, Result};

/// Directory prefix used on USB sticks so rig photos never mix with
/// whatever else lives on the drive.
const USB_SUBDIR: &str = "core_photos";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Internal,
    Usb,
}

/// One save destination. USB targets are re-detected at every use; holding
/// onto one across saves would race with the operator pulling the stick.
#[derive(Debug, Clone)]
pub struct StorageTarget {
    pub root: PathBuf,
    pub kind: TargetKind,
}

/// Free-space health of a target against the configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceLevel {
    Ok,
    Low,
    Critical,
}

/// Outcome of one dual-destination save. The internal write succeeded if
/// this exists at all; the USB fields describe the backup attempt.
#[derive(Debug)]
pub struct SaveReport {
    pub internal_path: PathBuf,
    pub usb_path: Option<PathBuf>,
    pub usb_error: Option<String>,
}

impl SaveReport {
    pub fn backed_up(&self) -> bool {
        self.usb_path.is_some()
    }
}

pub struct StorageManager {
    internal_root: PathBuf,
    usb_mount_roots: Vec<PathBuf>,
    low_bytes: u64,
    critical_bytes: u64,
}

impl StorageManager {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        fs::create_dir_all(&config.internal_path)?;
        Ok(Self {
            internal_root: config.internal_path.clone(),
            usb_mount_roots: config.usb_mount_paths.clone(),
            low_bytes: config.low_space_warning_mb * 1024 * 1024,
            critical_bytes: config.critical_space_warning_mb * 1024 * 1024,
        })
    }

    /// Enumerate save destinations: the internal target always, then the
    /// first usable USB stick if one is present right now.
    pub fn list_targets(&self) -> Vec<StorageTarget> {
        let mut targets = vec![StorageTarget {
            root: self.internal_root.clone(),
            kind: TargetKind::Internal,
        }];
        if let Some(root) = self.detect_usb() {
            targets.push(StorageTarget {
                root,
                kind: TargetKind::Usb,
            });
        }
        targets
    }

    /// Find the first mounted USB drive under the configured candidate
    /// roots. The mount table is consulted first; a shallow directory scan
    /// covers development boxes where sticks are plain directories.
    fn detect_usb(&self) -> Option<PathBuf> {
        if let Ok(mounts) = fs::read_to_string("/proc/mounts") {
            for root in &self.usb_mount_roots {
                for line in mounts.lines() {
                    // fields: device mountpoint fstype options ...
                    let Some(mount_point) = line.split_whitespace().nth(1) else {
                        continue;
                    };
                    let mount_path = Path::new(mount_point);
                    if mount_path.starts_with(root) && mount_path.is_dir() {
                        return Some(mount_path.to_path_buf());
                    }
                }
            }
        }

        for root in &self.usb_mount_roots {
            if !root.is_dir() {
                continue;
            }
            let found = WalkDir::new(root)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .find(|e| e.file_type().is_dir());
            if let Some(entry) = found {
                return Some(entry.into_path());
            }
        }
        None
    }

    /// Free bytes on a target's filesystem. Fails with `StorageUnavailable`
    /// when the root vanished between detection and use.
    pub fn free_space(&self, target: &StorageTarget) -> Result<u64> {
        if !target.root.exists() {
            return Err(CoreError::StorageUnavailable(target.root.clone()));
        }
        Ok(fs2::available_space(&target.root)?)
    }

    /// Classify a target's free space against the configured thresholds.
    pub fn classify(&self, target: &StorageTarget) -> Result<SpaceLevel> {
        Ok(self.level_for(self.free_space(target)?))
    }

    fn level_for(&self, free_bytes: u64) -> SpaceLevel {
        if free_bytes <= self.critical_bytes {
            SpaceLevel::Critical
        } else if free_bytes <= self.low_bytes {
            SpaceLevel::Low
        } else {
            SpaceLevel::Ok
        }
    }

    /// Write one image to every current target.
    ///
    /// The internal write must succeed or the whole save fails; the USB
    /// write is best effort and its failure is only recorded in the report.
    /// Overwrite semantics: saving the same path twice leaves one file with
    /// the final bytes.
    pub fn save(&self, relative_path: &Path, bytes: &[u8]) -> Result<SaveReport> {
        let mut report = SaveReport {
            internal_path: self.internal_root.join(relative_path),
            usb_path: None,
            usb_error: None,
        };

        for target in self.list_targets() {
            match target.kind {
                TargetKind::Internal => {
                    // advisory only, a save is never blocked on space
                    match self.classify(&target) {
                        Ok(SpaceLevel::Ok) | Err(_) => {}
                        Ok(level) => {
                            warn!(?level, root = %target.root.display(), "internal storage is short on space");
                        }
                    }
                    let dest = target.root.join(relative_path);
                    write_atomic(&dest, bytes).map_err(|source| CoreError::SaveFailed {
                        path: dest.clone(),
                        source,
                    })?;
                    info!(path = %dest.display(), "image saved to internal storage");
                }
                TargetKind::Usb => {
                    let dest = target.root.join(USB_SUBDIR).join(relative_path);
                    match write_atomic(&dest, bytes) {
                        Ok(()) => {
                            info!(path = %dest.display(), "image backed up to USB");
                            report.usb_path = Some(dest);
                        }
                        Err(e) => {
                            warn!(path = %dest.display(), error = %e, "USB backup failed");
                            report.usb_error = Some(e.to_string());
                        }
                    }
                }
            }
        }
        Ok(report)
    }

    /// Operator-facing free-space line per target.
    pub fn status_summary(&self) -> String {
        let mut lines = Vec::new();
        for target in self.list_targets() {
            let label = match target.kind {
                TargetKind::Internal => "Internal",
                TargetKind::Usb => "USB",
            };
            match self.free_space(&target) {
                Ok(free) => {
                    let level = match self.level_for(free) {
                        SpaceLevel::Ok => "",
                        SpaceLevel::Low => " — LOW SPACE",
                        SpaceLevel::Critical => " — CRITICAL SPACE",
                    };
                    lines.push(format!("{label}: {} MB free{level}", free / (1024 * 1024)));
                }
                Err(_) => lines.push(format!("{label}: unavailable")),
            }
        }
        if lines.len() == 1 {
            lines.push("No USB drive detected".to_string());
        }
        lines.join(" | ")
    }
}

/// Write bytes to `dest` via a temp file in the same directory followed by
/// an atomic rename. A failure mid-write removes the temp file and leaves
/// nothing at the final path.
fn write_atomic(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = dest.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent")
    })?;
    fs::create_dir_all(parent)?;

    let file_name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid file name"))?;
    let tmp = parent.join(format!(".{file_name}.tmp"));

    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, dest)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
