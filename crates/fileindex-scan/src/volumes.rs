//! Enumeration of local volume roots for "index everything" runs.

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Root strings that select every local volume.
pub const ALL_VOLUMES: &[&str] = &["*", "all"];

/// Check if a root string is the all-volumes sentinel.
pub fn is_all_volumes(root: &str) -> bool {
    ALL_VOLUMES.contains(&root)
}

/// Lists the platform's volume roots.
///
/// An empty list means there is nothing to index, not an error.
pub trait VolumeSource {
    fn volume_roots(&self) -> Vec<PathBuf>;
}

/// Volume roots of the local machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalVolumes;

impl VolumeSource for LocalVolumes {
    #[cfg(windows)]
    fn volume_roots(&self) -> Vec<PathBuf> {
        (b'A'..=b'Z')
            .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
            .filter(|root| root.exists())
            .collect()
    }

    #[cfg(target_os = "linux")]
    fn volume_roots(&self) -> Vec<PathBuf> {
        match std::fs::read_to_string("/proc/self/mounts") {
            Ok(mounts) => parse_block_mounts(&mounts),
            Err(err) => {
                tracing::warn!(error = %err, "cannot read mount table, falling back to /");
                vec![PathBuf::from("/")]
            }
        }
    }

    #[cfg(target_os = "macos")]
    fn volume_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![PathBuf::from("/")];
        if let Ok(entries) = std::fs::read_dir("/Volumes") {
            for entry in entries.flatten() {
                let path = entry.path();
                // The boot volume is usually linked back to "/".
                let is_boot = std::fs::canonicalize(&path).is_ok_and(|p| p == PathBuf::from("/"));
                if !is_boot && path.is_dir() {
                    roots.push(path);
                }
            }
        }
        roots
    }

    #[cfg(not(any(windows, target_os = "linux", target_os = "macos")))]
    fn volume_roots(&self) -> Vec<PathBuf> {
        vec![PathBuf::from("/")]
    }
}

/// Device id of a filesystem object, where the platform has one.
#[cfg(unix)]
pub(crate) fn device_id(metadata: &Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.dev())
}

#[cfg(not(unix))]
pub(crate) fn device_id(_metadata: &Metadata) -> Option<u64> {
    None
}

/// Device id of the filesystem holding `path`.
pub(crate) fn device_of(path: &Path) -> Option<u64> {
    std::fs::metadata(path).ok().as_ref().and_then(device_id)
}

/// Drop volume roots that a same-device walk from another root already covers.
///
/// A root is covered when an ancestor root (or an earlier copy of itself)
/// sits on the same device. Roots with no device id are always kept. Order
/// of the kept roots is preserved.
pub(crate) fn distinct_volume_roots(roots: Vec<PathBuf>) -> Vec<PathBuf> {
    distinct_by_device(roots, device_of)
}

fn distinct_by_device<F>(roots: Vec<PathBuf>, device: F) -> Vec<PathBuf>
where
    F: Fn(&Path) -> Option<u64>,
{
    let devices: Vec<Option<u64>> = roots.iter().map(|r| device(r)).collect();
    let covered = |i: usize| {
        let Some(dev) = devices[i] else {
            return false;
        };
        roots.iter().enumerate().any(|(j, other)| {
            j != i
                && devices[j] == Some(dev)
                && roots[i].starts_with(other)
                && (roots[i] != *other || j < i)
        })
    };

    let keep: Vec<bool> = (0..roots.len()).map(|i| !covered(i)).collect();
    roots
        .into_iter()
        .zip(keep)
        .filter_map(|(root, keep)| {
            if !keep {
                debug!(root = %root.display(), "volume root already covered by an ancestor");
            }
            keep.then_some(root)
        })
        .collect()
}

/// Mount points backed by a block device, in mount-table order.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_block_mounts(mounts: &str) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::new();
    for line in mounts.lines() {
        let mut fields = line.split_whitespace();
        let (Some(device), Some(mount_point)) = (fields.next(), fields.next()) else {
            continue;
        };
        if !device.starts_with("/dev/") || device.starts_with("/dev/loop") {
            continue;
        }
        let root = PathBuf::from(unescape_mount_point(mount_point));
        if !roots.contains(&root) {
            roots.push(root);
        }
    }
    roots
}

/// Decode the octal escapes (`\040` for space) used in the mount table.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn unescape_mount_point(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits.iter().fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(value) = u8::try_from(value) {
                    out.push(value);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
