//! Volume discovery and label resolution
//!
//! Removable media has no stable device path, so the watchdog identifies
//! its target by volume label. Enumeration goes through the [`VolumeLister`]
//! capability with one implementation per platform, both shelling out to
//! the native tool and parsing its captured output.

use crate::{Error, Result};
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, warn};

/// One currently mounted volume as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedVolume {
    pub label: String,
    pub mount_path: PathBuf,
}

/// Capability for enumerating currently mounted volumes
pub trait VolumeLister: Send + Sync {
    fn list(&self) -> Result<Vec<MountedVolume>>;
}

/// Select the lister implementation for the current platform
pub fn platform_lister() -> Box<dyn VolumeLister> {
    #[cfg(windows)]
    {
        Box::new(PowershellLister)
    }
    #[cfg(not(windows))]
    {
        Box::new(LsblkLister)
    }
}

/// Lister for Linux and other unixes, backed by `lsblk`
pub struct LsblkLister;

impl VolumeLister for LsblkLister {
    fn list(&self) -> Result<Vec<MountedVolume>> {
        let output = Command::new("lsblk")
            .args(["-P", "-n", "-o", "LABEL,MOUNTPOINT"])
            .output()
            .map_err(|e| Error::VolumeLookup {
                reason: format!("failed to execute lsblk: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::VolumeLookup {
                reason: format!("lsblk failed: {}", stderr.trim()),
            });
        }

        Ok(parse_lsblk(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse `lsblk -P -n -o LABEL,MOUNTPOINT` key-value pair output.
///
/// Entries without a label or without a mount point are not usable as
/// copy targets and are dropped.
fn parse_lsblk(output: &str) -> Vec<MountedVolume> {
    let mut volumes = Vec::new();

    for line in output.lines() {
        let label = match pair_value(line, "LABEL") {
            Some(v) if !v.is_empty() => v,
            _ => continue,
        };
        let mount = match pair_value(line, "MOUNTPOINT") {
            Some(v) if !v.is_empty() => v,
            _ => continue,
        };

        volumes.push(MountedVolume {
            label: label.to_string(),
            mount_path: PathBuf::from(mount),
        });
    }

    volumes
}

/// Extract the quoted value of `KEY="..."` from an lsblk pair line.
/// lsblk escapes embedded quotes, so scanning to the next quote is enough.
fn pair_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let pattern = format!("{}=\"", key);
    let start = line.find(&pattern)? + pattern.len();
    let rest = &line[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

/// Lister for Windows, backed by PowerShell `Get-Volume`
pub struct PowershellLister;

impl VolumeLister for PowershellLister {
    fn list(&self) -> Result<Vec<MountedVolume>> {
        let output = Command::new("powershell")
            .args([
                "-NoProfile",
                "-Command",
                "Get-Volume | Select-Object FileSystemLabel,DriveLetter | ConvertTo-Csv -NoTypeInformation",
            ])
            .output()
            .map_err(|e| Error::VolumeLookup {
                reason: format!("failed to execute powershell: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::VolumeLookup {
                reason: format!("Get-Volume failed: {}", stderr.trim()),
            });
        }

        Ok(parse_get_volume(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse `Get-Volume | ConvertTo-Csv` output into label/drive-root pairs.
fn parse_get_volume(output: &str) -> Vec<MountedVolume> {
    let mut volumes = Vec::new();

    for line in output.lines().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split("\",\"");
        let label = match fields.next() {
            Some(f) => f.trim_start_matches('"'),
            None => continue,
        };
        let letter = match fields.next() {
            Some(f) => f.trim_end_matches('"'),
            None => continue,
        };

        if label.is_empty() || letter.is_empty() {
            continue;
        }

        volumes.push(MountedVolume {
            label: label.to_string(),
            mount_path: PathBuf::from(format!("{}:\\", letter)),
        });
    }

    volumes
}

/// Maps the configured label to a mount path, one lookup per poll
pub struct VolumeResolver {
    label: String,
    lister: Box<dyn VolumeLister>,
}

impl VolumeResolver {
    pub fn new(label: impl Into<String>, lister: Box<dyn VolumeLister>) -> Self {
        Self {
            label: label.into(),
            lister,
        }
    }

    /// Return the mount path of the first volume whose label contains the
    /// configured label, case-insensitively.
    ///
    /// Listing errors are logged and reported as "not found". Results are
    /// never cached: the device can be swapped between polls.
    pub fn resolve(&self) -> Option<PathBuf> {
        let volumes = match self.lister.list() {
            Ok(volumes) => volumes,
            Err(e) => {
                warn!("volume listing failed: {}", e);
                return None;
            }
        };

        let needle = self.label.to_lowercase();
        let found = volumes
            .into_iter()
            .find(|v| v.label.to_lowercase().contains(&needle));

        match &found {
            Some(v) => debug!("volume '{}' mounted at {}", v.label, v.mount_path.display()),
            None => debug!("no mounted volume matches label '{}'", self.label),
        }

        found.map(|v| v.mount_path)
    }
}
