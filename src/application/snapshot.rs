use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::debug;

use crate::domain::{
    BlockDevice, Column, ColumnSet, DeviceIdentity, DeviceRow, DiscardSupport, HardwareIdentity, Health, IdentityMaps,
    SamplerCache, SizeFormat,
};
use crate::ports::{BlockEnumerator, HealthProbe, IdentitySource, MountSource, TopologySource, UsageSource};

use super::filter::RowFilter;
use super::merge;

/// What one snapshot should materialize and keep
#[derive(Debug, Clone, Default)]
pub struct SnapshotOptions {
    pub columns: ColumnSet,
    pub sizes: SizeFormat,
    pub filter: RowFilter,
    pub best_only: bool,
    pub mounted_only: bool,
    pub formatted_only: bool,
    pub active_only: bool,
    pub include_pseudo: bool,
    pub show_zero_size: bool,
    pub min_size: Option<u64>,
    /// Keep throughput baselines moving even when no rate column is shown
    pub sample_throughput: bool,
}

impl SnapshotOptions {
    /// Options for the first pass of a repeat loop
    pub fn repeating(mut self) -> Self {
        self.sample_throughput = true;
        self
    }

    /// Every pass after the first only reports devices that moved
    pub fn next_pass(&mut self) {
        self.active_only = true;
    }

    /// Devices worth materializing at all
    fn is_candidate(&self, device: &BlockDevice) -> bool {
        (self.show_zero_size || device.size_bytes > 0)
            && self.min_size.map_or(true, |min| device.size_bytes >= min)
            && self.filter.keeps_device(&device.name)
    }

    fn keeps(&self, row: &DeviceRow) -> bool {
        (!self.formatted_only || row.is_formatted())
            && (!self.mounted_only || row.is_mounted())
            && (!self.active_only || row.throughput.is_active())
            && self.filter.keeps_row(row, &self.columns, &self.sizes)
    }

    fn wants_identity_links(&self, has_tokens: bool) -> bool {
        has_tokens || self.columns.contains_any(&[Column::Uuid, Column::Label])
    }

    fn wants_enumeration(&self) -> bool {
        self.formatted_only || self.columns.contains_any(&[Column::Uuid, Column::Label, Column::FsType])
    }

    fn wants_throughput(&self) -> bool {
        self.active_only
            || self.sample_throughput
            || self
                .columns
                .contains_any(&[Column::ReadThroughput, Column::WriteThroughput])
    }
}

/// Reconciliation engine: merges topology, mounts, identities, health and
/// throughput into one row set per snapshot
pub struct SnapshotService {
    topology: Arc<dyn TopologySource>,
    mounts: Arc<dyn MountSource>,
    usage: Arc<dyn UsageSource>,
    identity: Arc<dyn IdentitySource>,
    enumerator: Arc<dyn BlockEnumerator>,
    health: Arc<dyn HealthProbe>,
}

impl SnapshotService {
    pub fn new(
        topology: Arc<dyn TopologySource>,
        mounts: Arc<dyn MountSource>,
        usage: Arc<dyn UsageSource>,
        identity: Arc<dyn IdentitySource>,
        enumerator: Arc<dyn BlockEnumerator>,
        health: Arc<dyn HealthProbe>,
    ) -> Self {
        Self {
            topology,
            mounts,
            usage,
            identity,
            enumerator,
            health,
        }
    }

    /// Take one snapshot.
    ///
    /// `samplers` carries throughput baselines between snapshots of a repeat
    /// loop. Nothing in here fails: unreadable sources degrade single fields.
    pub async fn collect(&self, options: &SnapshotOptions, samplers: &mut SamplerCache) -> Vec<DeviceRow> {
        let all_devices = self.discover_devices();
        let devices: Vec<&BlockDevice> = all_devices.iter().filter(|d| options.is_candidate(d)).collect();
        let mounts = self.mounts.read_mounts();
        debug!(
            "Snapshot: {} devices, {} candidates, {} mounts",
            all_devices.len(),
            devices.len(),
            mounts.entries().len()
        );

        let (uuid_tokens, label_tokens) = mounts.has_source_tokens();
        let wants_links = options.wants_identity_links(uuid_tokens || label_tokens);
        let wants_enumeration = options.wants_enumeration();

        let (enumerated, health) = tokio::join!(
            self.enumerate_identities(wants_enumeration),
            self.probe_health(&devices, options.columns.contains(Column::Smart)),
        );
        let identities = self.build_identity_maps(
            &all_devices,
            wants_links,
            wants_links || wants_enumeration,
            &enumerated,
        );

        let now = Instant::now();
        let wants_throughput = options.wants_throughput();
        let wants_usage = options.columns.contains(Column::FsUse);
        let mut hardware: HashMap<&str, (HardwareIdentity, DiscardSupport)> = HashMap::new();
        let mut rows = Vec::new();

        for device in &devices {
            let hardware_path = device.hardware_path();
            let (identity, discard) = hardware
                .entry(hardware_path)
                .or_insert_with(|| {
                    (
                        self.topology.read_hardware_identity(hardware_path),
                        self.topology.read_discard_support(hardware_path),
                    )
                })
                .clone();

            let mut base = DeviceRow::new(device.name.clone(), device.path.clone()).with_size(device.size_bytes);
            base.parent_path = device.parent_path.clone();
            base.model = identity.model;
            base.serial = identity.serial;
            base.discard = discard;
            base.health = health.get(hardware_path).cloned().unwrap_or(Health::NotAvailable);
            base.filesystem = identities.filesystem(&device.path).unwrap_or_default().to_string();
            base.label = identities.label(&device.path).unwrap_or_default().to_string();
            base.uuid = identities.uuid(&device.path).unwrap_or_default().to_string();
            if wants_throughput {
                base.throughput = samplers.sample(
                    &device.path,
                    self.topology.read_sector_size(&device.path),
                    now,
                    self.topology.read_io_counters(&device.path),
                );
            }

            let mut owned = merge::resolve_mounts(device, &mounts, &identities);
            if options.best_only {
                owned = merge::best_mount(&owned).into_iter().collect();
            }
            if owned.is_empty() {
                rows.push(base);
                continue;
            }
            for mount in owned {
                let usage = if wants_usage {
                    self.usage.usage(&mount.mount_point)
                } else {
                    None
                };
                let mut row = base.clone().with_mount(mount.mount_point.clone(), usage);
                if !mount.filesystem.is_empty() {
                    row.filesystem = mount.filesystem.clone();
                }
                rows.push(row);
            }
        }

        samplers.retain_devices(|path| devices.iter().any(|d| d.path == path));
        merge::backfill_aggregate_usage(&mut rows);

        if options.include_pseudo {
            let wants_pseudo_usage = wants_usage || options.columns.contains(Column::Size);
            for mount in merge::pseudo_mounts(&mounts, &all_devices, &identities) {
                if !options.filter.keeps_device(&mount.source) {
                    continue;
                }
                let usage = if wants_pseudo_usage {
                    self.usage.usage(&mount.mount_point)
                } else {
                    None
                };
                rows.push(merge::pseudo_row(mount, usage));
            }
        }

        rows.retain(|row| options.keeps(row));
        rows
    }

    /// Repeat `collect` every `period` until `interrupted` resolves.
    ///
    /// The first pass uses `options` as given; later passes only report
    /// devices that moved. `interrupted` is polled for the whole loop, so an
    /// interrupt that lands while `report` runs ends the loop at the next wait.
    pub async fn watch<I, R, E>(
        &self,
        options: SnapshotOptions,
        samplers: &mut SamplerCache,
        period: Duration,
        interrupted: I,
        mut report: R,
    ) -> Result<(), E>
    where
        I: Future,
        R: FnMut(&[DeviceRow], &SnapshotOptions) -> Result<(), E>,
    {
        let mut options = options.repeating();
        tokio::pin!(interrupted);
        loop {
            let rows = tokio::select! {
                rows = self.collect(&options, samplers) => rows,
                _ = &mut interrupted => return Ok(()),
            };
            debug!("{} rows, {} samplers cached", rows.len(), samplers.len());
            report(&rows, &options)?;
            options.next_pass();

            tokio::select! {
                _ = tokio::time::sleep(period) => {}
                _ = &mut interrupted => return Ok(()),
            }
        }
    }

    /// Every block device in path order, with size, parent and `major:minor`
    fn discover_devices(&self) -> Vec<BlockDevice> {
        let mut paths = self.topology.list_block_devices();
        paths.sort();
        paths
            .into_iter()
            .map(|path| {
                let parent = if self.topology.is_partition(&path) {
                    self.topology.resolve_parent(&path)
                } else {
                    None
                };
                BlockDevice::new(path.clone())
                    .with_size(self.topology.read_size(&path).unwrap_or(0))
                    .with_parent(parent)
                    .with_major_minor(self.topology.read_major_minor(&path))
            })
            .collect()
    }

    async fn enumerate_identities(&self, wanted: bool) -> Vec<DeviceIdentity> {
        if !wanted {
            return Vec::new();
        }
        match self.enumerator.enumerate().await {
            Ok(identities) => identities,
            Err(e) => {
                debug!("Bulk enumeration unavailable: {}", e);
                Vec::new()
            }
        }
    }

    /// One probe per physical device, all in flight at once
    async fn probe_health(&self, devices: &[&BlockDevice], wanted: bool) -> HashMap<String, Health> {
        if !wanted || !self.health.is_available() {
            return HashMap::new();
        }

        let mut targets: Vec<String> = devices.iter().map(|d| d.hardware_path().to_string()).collect();
        targets.sort();
        targets.dedup();

        let probes = targets.into_iter().map(|path| async move {
            let health = self.health.probe(&path).await;
            (path, health)
        });
        join_all(probes).await.into_iter().collect()
    }

    /// Symlink seed, then udev gap filling, then the enumeration overlay
    fn build_identity_maps(
        &self,
        devices: &[BlockDevice],
        links: bool,
        udev: bool,
        enumerated: &[DeviceIdentity],
    ) -> IdentityMaps {
        let mut maps = IdentityMaps::new();
        if links {
            maps.seed_uuids(self.identity.uuid_links());
            maps.seed_labels(self.identity.label_links());
        }
        if udev {
            for device in devices {
                let Some(mm) = device.major_minor.as_deref() else {
                    continue;
                };
                if let Some(identity) = self.identity.udev_identity(&device.path, mm) {
                    maps.fill_missing(&identity);
                }
            }
        }
        maps.overlay(enumerated);
        maps
    }
}
