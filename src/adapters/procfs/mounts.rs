use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::domain::{FsUsage, MountEntry, MountTable};
use crate::ports::{MountSource, UsageSource};

use super::parser::{self, MountInfo, ParseResult};
use super::ProcfsConfig;

/// Mount source implementation using /proc/self/mountinfo
pub struct ProcfsMountSource {
    config: ProcfsConfig,
}

impl ProcfsMountSource {
    pub fn new(config: ProcfsConfig) -> Self {
        Self { config }
    }

    fn read_mountinfo(&self) -> ParseResult<Vec<MountInfo>> {
        let content = fs::read_to_string(self.config.proc_path.join("self/mountinfo"))?;
        Ok(parser::parse_mountinfo(&content))
    }
}

impl MountSource for ProcfsMountSource {
    fn read_mounts(&self) -> MountTable {
        let mounts = match self.read_mountinfo() {
            Ok(mounts) => mounts,
            Err(e) => {
                warn!("Cannot read mount table: {}", e);
                return MountTable::default();
            }
        };

        let entries = mounts
            .into_iter()
            .map(|m| {
                MountEntry::new(canonical_source(&m.source), m.mount_point, m.filesystem)
                    .with_options(m.options)
                    .with_major_minor(m.major_minor)
            })
            .collect();
        MountTable::new(entries)
    }
}

/// Resolve path sources to their real path; tokens and pseudo sources stay raw
fn canonical_source(source: &str) -> String {
    if !source.starts_with('/') {
        return source.to_string();
    }
    match fs::canonicalize(source) {
        Ok(real) => real.to_string_lossy().into_owned(),
        Err(e) => {
            debug!("Keeping unresolved mount source {}: {}", source, e);
            source.to_string()
        }
    }
}

/// Usage source implementation using statvfs(2)
#[derive(Debug, Default)]
pub struct StatvfsUsage;

impl UsageSource for StatvfsUsage {
    fn usage(&self, mount_point: &str) -> Option<FsUsage> {
        let stat = match nix::sys::statvfs::statvfs(Path::new(mount_point)) {
            Ok(stat) => stat,
            Err(e) => {
                debug!("statvfs({}) failed: {}", mount_point, e);
                return None;
            }
        };
        let fragment = stat.fragment_size() as u64;
        let total_bytes = stat.blocks() as u64 * fragment;
        let available_bytes = stat.blocks_available() as u64 * fragment;
        Some(FsUsage::new(total_bytes, available_bytes))
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::symlink;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_read_mounts_canonicalizes_paths() {
        let tmp = TempDir::new().unwrap();
        let dev = tmp.path().join("dev");
        fs::create_dir_all(dev.join("mapper")).unwrap();
        fs::write(dev.join("dm-0"), "").unwrap();
        symlink(dev.join("dm-0"), dev.join("mapper/root")).unwrap();

        let proc_self = tmp.path().join("proc/self");
        fs::create_dir_all(&proc_self).unwrap();
        let mapper = dev.join("mapper/root");
        let content = format!(
            "29 1 253:0 / / rw,relatime - ext4 {} rw\n\
             30 29 8:1 / /boot rw - vfat UUID=ABCD-1234 rw\n\
             31 29 0:22 / /run rw,nosuid - tmpfs tmpfs rw\n\
             32 29 253:0 / /srv rw - ext4 {} rw\n",
            mapper.display(),
            mapper.display()
        );
        fs::write(proc_self.join("mountinfo"), content).unwrap();

        let source = ProcfsMountSource::new(ProcfsConfig::new(tmp.path().join("proc"), "/sys"));
        let table = source.read_mounts();
        let real = fs::canonicalize(dev.join("dm-0")).unwrap().to_string_lossy().into_owned();

        let entries = table.entries();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].source, real);
        assert_eq!(entries[1].source, "UUID=ABCD-1234");
        assert_eq!(entries[2].source, "tmpfs");
        assert_eq!(entries[0].options, vec!["rw", "relatime"]);

        let roots: Vec<_> = entries
            .iter()
            .filter(|m| m.source == real)
            .map(|m| m.mount_point.clone())
            .collect();
        assert_eq!(roots, vec!["/", "/srv"]);
    }

    #[test]
    fn test_missing_mount_table_is_empty() {
        let source = ProcfsMountSource::new(ProcfsConfig::new("/nonexistent/proc", "/sys"));
        assert!(source.read_mounts().entries().is_empty());
    }

    #[test]
    fn test_statvfs_on_missing_path() {
        assert_eq!(StatvfsUsage.usage("/nonexistent/mount/point"), None);
    }
}
