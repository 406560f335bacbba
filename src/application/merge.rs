use std::collections::{HashMap, HashSet};

use crate::domain::{aggregate_usage_percent, BlockDevice, DeviceRow, FsUsage, IdentityMaps, MountEntry, MountTable};

/// Mount entries owned by `device`.
///
/// `major:minor` wins; otherwise entries whose source is the device path or a
/// `UUID=` / `LABEL=` token naming it. Table order is kept.
pub fn resolve_mounts<'a>(device: &BlockDevice, mounts: &'a MountTable, identities: &IdentityMaps) -> Vec<&'a MountEntry> {
    if let Some(mm) = device.major_minor.as_deref() {
        let found = mounts.by_major_minor(mm);
        if !found.is_empty() {
            return found;
        }
    }
    mounts
        .entries()
        .iter()
        .filter(|m| source_names(m, &device.path, identities))
        .collect()
}

fn source_names(mount: &MountEntry, path: &str, identities: &IdentityMaps) -> bool {
    if mount.source == path {
        return true;
    }
    mount
        .source_token()
        .and_then(|token| identities.resolve_token(token))
        .is_some_and(|owner| owner == path)
}

/// Shortest mount point, ties broken lexicographically
pub fn best_mount<'a>(mounts: &[&'a MountEntry]) -> Option<&'a MountEntry> {
    mounts
        .iter()
        .copied()
        .min_by(|a, b| {
            a.mount_point
                .len()
                .cmp(&b.mount_point.len())
                .then_with(|| a.mount_point.cmp(&b.mount_point))
        })
}

/// Overwrite each parent's usage with the aggregate over its mounted children.
///
/// A child mounted more than once counts once. Parents without a mounted
/// child keep whatever they had.
pub fn backfill_aggregate_usage(rows: &mut [DeviceRow]) {
    let mut children: HashMap<String, HashMap<String, FsUsage>> = HashMap::new();
    for row in rows.iter() {
        let (Some(parent), Some(usage)) = (&row.parent_path, row.fs_usage) else {
            continue;
        };
        if !row.is_mounted() {
            continue;
        }
        children
            .entry(parent.clone())
            .or_default()
            .entry(row.path.clone())
            .or_insert(usage);
    }

    for row in rows.iter_mut() {
        let Some(usages) = children.get(&row.path) else {
            continue;
        };
        if let Some(percent) = aggregate_usage_percent(usages.values()) {
            row.usage_percent = Some(percent);
        }
    }
}

/// Mounts whose source maps to none of `devices` (tmpfs, proc, overlay, ...)
pub fn pseudo_mounts<'a>(mounts: &'a MountTable, devices: &[BlockDevice], identities: &IdentityMaps) -> Vec<&'a MountEntry> {
    let numbers: HashSet<&str> = devices.iter().filter_map(|d| d.major_minor.as_deref()).collect();
    let paths: HashSet<&str> = devices.iter().map(|d| d.path.as_str()).collect();

    mounts
        .entries()
        .iter()
        .filter(|m| {
            let by_number = m.major_minor.as_deref().is_some_and(|mm| numbers.contains(mm));
            let by_path = paths.contains(m.source.as_str());
            let by_token = m
                .source_token()
                .and_then(|token| identities.resolve_token(token))
                .is_some_and(|owner| paths.contains(owner));
            !(by_number || by_path || by_token)
        })
        .collect()
}

/// Row for a mount without a backing block device, named by its source
pub fn pseudo_row(mount: &MountEntry, usage: Option<FsUsage>) -> DeviceRow {
    let mut row = DeviceRow::new(mount.source.clone(), mount.source.clone())
        .with_size(usage.map(|u| u.total_bytes).unwrap_or(0))
        .with_mount(mount.mount_point.clone(), usage);
    row.filesystem = mount.filesystem.clone();
    row.pseudo = true;
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SymlinkEntry;

    fn table() -> MountTable {
        MountTable::new(vec![
            MountEntry::new("/dev/sda2", "/", "ext4").with_major_minor("8:2"),
            MountEntry::new("/dev/sda2", "/var/lib/docker", "ext4").with_major_minor("8:2"),
            MountEntry::new("UUID=1111-AAAA", "/boot/efi", "vfat").with_major_minor("0:99"),
            MountEntry::new("/dev/sdb1", "/srv", "btrfs").with_major_minor("0:45"),
            MountEntry::new("tmpfs", "/run", "tmpfs").with_major_minor("0:22"),
        ])
    }

    fn identities() -> IdentityMaps {
        let mut maps = IdentityMaps::new();
        maps.seed_uuids(vec![SymlinkEntry::new("1111-AAAA", "/dev/sda1")]);
        maps
    }

    fn device(path: &str, mm: &str) -> BlockDevice {
        BlockDevice::new(path).with_major_minor(Some(mm.to_string()))
    }

    #[test]
    fn test_resolve_by_major_minor() {
        let table = table();
        let found = resolve_mounts(&device("/dev/sda2", "8:2"), &table, &identities());
        let points: Vec<_> = found.iter().map(|m| m.mount_point.as_str()).collect();
        assert_eq!(points, vec!["/", "/var/lib/docker"]);
    }

    #[test]
    fn test_resolve_falls_back_to_source() {
        let table = table();
        let ids = identities();
        let btrfs = resolve_mounts(&device("/dev/sdb1", "8:17"), &table, &ids);
        assert_eq!(btrfs.len(), 1);
        assert_eq!(btrfs[0].mount_point, "/srv");

        let efi = resolve_mounts(&device("/dev/sda1", "8:1"), &table, &ids);
        assert_eq!(efi.len(), 1);
        assert_eq!(efi[0].mount_point, "/boot/efi");

        assert!(resolve_mounts(&device("/dev/sdc", "8:32"), &table, &ids).is_empty());
    }

    #[test]
    fn test_best_mount_is_shortest() {
        let table = table();
        let found = resolve_mounts(&device("/dev/sda2", "8:2"), &table, &identities());
        assert_eq!(best_mount(&found).unwrap().mount_point, "/");

        let a = MountEntry::new("/dev/sdd1", "/mnt/b", "ext4");
        let b = MountEntry::new("/dev/sdd1", "/mnt/a", "ext4");
        assert_eq!(best_mount(&[&a, &b]).unwrap().mount_point, "/mnt/a");
        assert!(best_mount(&[]).is_none());
    }

    fn rounded(row: &DeviceRow) -> Option<f64> {
        row.usage_percent.map(|p| p.round())
    }

    fn mounted(path: &str, parent: &str, total: u64, avail: u64) -> DeviceRow {
        let mut row = DeviceRow::new(path.trim_start_matches("/dev/"), path)
            .with_mount(format!("/mnt{}", path), Some(FsUsage::new(total, avail)));
        row.parent_path = Some(parent.to_string());
        row
    }

    #[test]
    fn test_backfill_aggregate_usage() {
        let mut rows = vec![
            DeviceRow::new("sda", "/dev/sda"),
            mounted("/dev/sda1", "/dev/sda", 100, 50),
            mounted("/dev/sda2", "/dev/sda", 300, 50),
            DeviceRow::new("sda3", "/dev/sda3"),
            DeviceRow::new("sdb", "/dev/sdb"),
        ];
        rows[3].parent_path = Some("/dev/sda".to_string());
        backfill_aggregate_usage(&mut rows);

        // 1 - 100/400
        assert_eq!(rounded(&rows[0]), Some(75.0));
        assert_eq!(rounded(&rows[4]), None);
    }

    #[test]
    fn test_backfill_counts_child_once() {
        let mut rows = vec![
            DeviceRow::new("sda", "/dev/sda"),
            mounted("/dev/sda1", "/dev/sda", 100, 40),
            mounted("/dev/sda1", "/dev/sda", 100, 40),
        ];
        backfill_aggregate_usage(&mut rows);
        assert_eq!(rounded(&rows[0]), Some(60.0));
    }

    #[test]
    fn test_backfill_overwrites_parent_value() {
        let mut rows = vec![
            DeviceRow::new("sda", "/dev/sda").with_mount("/data", Some(FsUsage::new(100, 90))),
            mounted("/dev/sda1", "/dev/sda", 100, 40),
        ];
        backfill_aggregate_usage(&mut rows);
        assert_eq!(rounded(&rows[0]), Some(60.0));
    }

    #[test]
    fn test_pseudo_mounts() {
        let table = table();
        let devices = vec![
            device("/dev/sda1", "8:1"),
            device("/dev/sda2", "8:2"),
            device("/dev/sdb1", "8:17"),
        ];
        let pseudo = pseudo_mounts(&table, &devices, &identities());
        let points: Vec<_> = pseudo.iter().map(|m| m.mount_point.as_str()).collect();
        assert_eq!(points, vec!["/run"]);

        let row = pseudo_row(pseudo[0], Some(FsUsage::new(1000, 250)));
        assert_eq!(row.name, "tmpfs");
        assert_eq!(row.filesystem, "tmpfs");
        assert_eq!(row.size_bytes, 1000);
        assert_eq!(rounded(&row), Some(75.0));
    }
}
