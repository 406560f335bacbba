use std::fs;
use std::path::Path;

use tracing::debug;

use crate::domain::{decode_hex_escapes, DeviceIdentity, SymlinkEntry};
use crate::ports::IdentitySource;

use super::ProcfsConfig;

/// Identity source implementation using /dev/disk symlinks and the udev database
pub struct UdevIdentitySource {
    config: ProcfsConfig,
}

impl UdevIdentitySource {
    pub fn new(config: ProcfsConfig) -> Self {
        Self { config }
    }

    fn links_in(&self, dir: &str) -> Vec<SymlinkEntry> {
        let dir = self.config.dev_path.join("disk").join(dir);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot list {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                let is_link = fs::symlink_metadata(&path)
                    .map(|m| m.file_type().is_symlink())
                    .unwrap_or(false);
                if !is_link {
                    return None;
                }
                let target = fs::canonicalize(&path).ok()?;
                let name = decode_hex_escapes(&entry.file_name().to_string_lossy());
                Some(SymlinkEntry::new(name, target.to_string_lossy()))
            })
            .collect()
    }
}

impl IdentitySource for UdevIdentitySource {
    fn uuid_links(&self) -> Vec<SymlinkEntry> {
        self.links_in("by-uuid")
    }

    fn label_links(&self) -> Vec<SymlinkEntry> {
        self.links_in("by-label")
    }

    fn udev_identity(&self, device: &str, major_minor: &str) -> Option<DeviceIdentity> {
        let record = self.config.udev_path.join(format!("b{}", major_minor));
        let content = read_lossy(&record)?;
        let props = super::parser::parse_udev_props(&content);

        let label = props
            .get("ID_FS_LABEL_ENC")
            .map(|l| decode_hex_escapes(l))
            .or_else(|| props.get("ID_FS_LABEL").cloned());

        Some(
            DeviceIdentity::new(device)
                .with_uuid(props.get("ID_FS_UUID").cloned())
                .with_label(label)
                .with_filesystem(props.get("ID_FS_TYPE").cloned()),
        )
    }
}

fn read_lossy(path: &Path) -> Option<String> {
    fs::read(path)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}
