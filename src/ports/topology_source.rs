use crate::domain::{DiscardSupport, HardwareIdentity, IoCounters};

/// Port for reading the kernel block-device topology.
///
/// Every read degrades to a default: missing attribute files are normal for
/// hot-removed devices and permission-restricted nodes.
pub trait TopologySource: Send + Sync {
    /// List device paths in discovery order
    fn list_block_devices(&self) -> Vec<String>;

    /// Whether the device carries a partition marker
    fn is_partition(&self, device: &str) -> bool;

    /// Parent disk of a partition; `None` for whole disks and self-loops
    fn resolve_parent(&self, device: &str) -> Option<String>;

    /// Capacity in bytes (kernel sector count x 512)
    fn read_size(&self, device: &str) -> Option<u64>;

    /// Hardware sector size, then logical block size, then 512
    fn read_sector_size(&self, device: &str) -> u64;

    fn read_discard_support(&self, device: &str) -> DiscardSupport;

    /// Model and serial from the hardware node backing the device
    fn read_hardware_identity(&self, device: &str) -> HardwareIdentity;

    /// Kernel `major:minor`
    fn read_major_minor(&self, device: &str) -> Option<String>;

    /// Cumulative I/O counters
    fn read_io_counters(&self, device: &str) -> Option<IoCounters>;
}
