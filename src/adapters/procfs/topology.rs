use std::fs;
use std::path::PathBuf;

use tracing::{debug, trace};

use crate::domain::{device_name, DiscardSupport, HardwareIdentity, IoCounters};
use crate::ports::TopologySource;

use super::parser::{self, ParseResult};
use super::ProcfsConfig;

/// Fixed unit of the kernel `size` attribute
const KERNEL_SECTOR_BYTES: u64 = 512;

/// Topology source implementation using /sys/class/block
pub struct SysfsTopology {
    config: ProcfsConfig,
}

impl SysfsTopology {
    pub fn new(config: ProcfsConfig) -> Self {
        Self { config }
    }

    fn class_dir(&self) -> PathBuf {
        self.config.sys_path.join("class/block")
    }

    /// `/sys/class/block/<name>`, unresolved
    fn node(&self, device: &str) -> PathBuf {
        self.class_dir().join(device_name(device))
    }

    /// Real topology node behind the class symlink
    fn resolved_node(&self, device: &str) -> Option<PathBuf> {
        fs::canonicalize(self.node(device)).ok()
    }

    fn device_path(&self, name: &str) -> String {
        self.config.dev_path.join(name).to_string_lossy().into_owned()
    }

    fn read_stat(&self, device: &str) -> ParseResult<IoCounters> {
        let content = fs::read_to_string(self.node(device).join("stat"))?;
        parser::parse_block_stat(&content)
    }

    fn read_queue_u64(&self, device: &str, attribute: &str) -> Option<u64> {
        let queue = self.node(device).join("queue").join(attribute);
        parser::read_u64(&queue).or_else(|| {
            // Partitions have no queue of their own
            let parent = self.resolve_parent(device)?;
            parser::read_u64(&self.node(&parent).join("queue").join(attribute))
        })
    }
}

impl TopologySource for SysfsTopology {
    fn list_block_devices(&self) -> Vec<String> {
        let entries = match fs::read_dir(self.class_dir()) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot list {}: {}", self.class_dir().display(), e);
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .map(|name| self.device_path(&name))
            .collect()
    }

    fn is_partition(&self, device: &str) -> bool {
        self.resolved_node(device)
            .map(|node| node.join("partition").exists())
            .unwrap_or(false)
    }

    fn resolve_parent(&self, device: &str) -> Option<String> {
        let node = self.resolved_node(device)?;
        if !node.join("partition").exists() {
            return None;
        }
        let parent = node.parent()?.file_name()?.to_string_lossy().into_owned();
        if parent.is_empty() || parent == device_name(device) {
            trace!("Ignoring self-referential parent for {}", device);
            return None;
        }
        Some(self.device_path(&parent))
    }

    fn read_size(&self, device: &str) -> Option<u64> {
        parser::read_u64(&self.node(device).join("size")).map(|sectors| sectors * KERNEL_SECTOR_BYTES)
    }

    fn read_sector_size(&self, device: &str) -> u64 {
        self.read_queue_u64(device, "hw_sector_size")
            .or_else(|| self.read_queue_u64(device, "logical_block_size"))
            .filter(|size| *size > 0)
            .unwrap_or(KERNEL_SECTOR_BYTES)
    }

    fn read_discard_support(&self, device: &str) -> DiscardSupport {
        let path = self.node(device).join("queue/discard_max_bytes");
        DiscardSupport::from_max_bytes(parser::read_u64(&path))
    }

    fn read_hardware_identity(&self, device: &str) -> HardwareIdentity {
        let node = self.node(device);
        let Ok(hardware) = fs::canonicalize(node.join("device")) else {
            return HardwareIdentity::default();
        };

        let model = parser::read_text(&hardware.join("model")).filter(|m| !m.is_empty());
        let serial = parser::read_text(&hardware.join("serial"))
            .filter(|s| !s.is_empty())
            .or_else(|| parser::read_text(&hardware.join("wwid")))
            .or_else(|| parser::read_text(&node.join("wwid")));

        HardwareIdentity::new(model, serial)
    }

    fn read_major_minor(&self, device: &str) -> Option<String> {
        parser::read_text(&self.node(device).join("dev")).filter(|mm| mm.contains(':'))
    }

    fn read_io_counters(&self, device: &str) -> Option<IoCounters> {
        match self.read_stat(device) {
            Ok(counters) => Some(counters),
            Err(e) => {
                trace!("No I/O counters for {}: {}", device, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::os::unix::fs::symlink;
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// sda (disk, model/serial, discard) with partition sda1, plus loop0
    fn fake_sysfs() -> (TempDir, SysfsTopology) {
        let tmp = TempDir::new().unwrap();
        let sys = tmp.path().join("sys");
        let devices = sys.join("devices/pci0000:00/ata1/host0/target0:0:0/0:0:0:0");
        let sda = devices.join("block/sda");
        let sda1 = sda.join("sda1");
        let loop0 = sys.join("devices/virtual/block/loop0");

        write(&devices.join("model"), "Samsung SSD 870  \n");
        write(&devices.join("serial"), "S6PNNS0T\n");
        write(&sda.join("dev"), "8:0\n");
        write(&sda.join("size"), "976773168\n");
        write(&sda.join("queue/hw_sector_size"), "4096\n");
        write(&sda.join("queue/logical_block_size"), "512\n");
        write(&sda.join("queue/discard_max_bytes"), "2147450880\n");
        write(&sda.join("stat"), "100 0 2000 500 50 0 1000 2000 0 0 0\n");
        symlink(&devices, sda.join("device")).unwrap();

        write(&sda1.join("dev"), "8:1\n");
        write(&sda1.join("size"), "2048\n");
        write(&sda1.join("partition"), "1\n");

        write(&loop0.join("dev"), "7:0\n");
        write(&loop0.join("size"), "0\n");
        write(&loop0.join("queue/discard_max_bytes"), "0\n");

        let class = sys.join("class/block");
        fs::create_dir_all(&class).unwrap();
        symlink(&sda, class.join("sda")).unwrap();
        symlink(&sda1, class.join("sda1")).unwrap();
        symlink(&loop0, class.join("loop0")).unwrap();

        let config = ProcfsConfig::new(tmp.path().join("proc"), &sys).with_dev_path("/dev");
        (tmp, SysfsTopology::new(config))
    }

    #[test]
    fn test_list_block_devices() {
        let (_tmp, topology) = fake_sysfs();
        let mut devices = topology.list_block_devices();
        devices.sort();
        assert_eq!(devices, vec!["/dev/loop0", "/dev/sda", "/dev/sda1"]);
    }

    #[test]
    fn test_partition_and_parent() {
        let (_tmp, topology) = fake_sysfs();
        assert!(topology.is_partition("/dev/sda1"));
        assert!(!topology.is_partition("/dev/sda"));
        assert_eq!(topology.resolve_parent("/dev/sda1"), Some("/dev/sda".to_string()));
        assert_eq!(topology.resolve_parent("/dev/sda"), None);
        assert_eq!(topology.resolve_parent("/dev/missing"), None);
    }

    #[test]
    fn test_self_referential_parent_is_none() {
        let (tmp, topology) = fake_sysfs();
        // A partition marker on a node whose directory parent shares its name
        let odd = tmp.path().join("sys/devices/virtual/block/md0/md0");
        write(&odd.join("partition"), "1\n");
        symlink(&odd, tmp.path().join("sys/class/block/md0")).unwrap();
        assert!(topology.is_partition("/dev/md0"));
        assert_eq!(topology.resolve_parent("/dev/md0"), None);
    }

    #[test]
    fn test_sizes() {
        let (_tmp, topology) = fake_sysfs();
        assert_eq!(topology.read_size("/dev/sda"), Some(976773168 * 512));
        assert_eq!(topology.read_size("/dev/sda1"), Some(2048 * 512));
        assert_eq!(topology.read_size("/dev/missing"), None);
        assert_eq!(topology.read_sector_size("/dev/sda"), 4096);
        assert_eq!(topology.read_sector_size("/dev/sda1"), 4096);
        assert_eq!(topology.read_sector_size("/dev/loop0"), 512);
    }

    #[test]
    fn test_discard_support() {
        let (_tmp, topology) = fake_sysfs();
        assert_eq!(topology.read_discard_support("/dev/sda"), DiscardSupport::Yes);
        assert_eq!(topology.read_discard_support("/dev/loop0"), DiscardSupport::No);
        assert_eq!(topology.read_discard_support("/dev/sda1"), DiscardSupport::NotAvailable);
    }

    #[test]
    fn test_hardware_identity() {
        let (_tmp, topology) = fake_sysfs();
        let id = topology.read_hardware_identity("/dev/sda");
        assert_eq!(id.model, "Samsung SSD 870");
        assert_eq!(id.serial, "S6PNNS0T");
        assert_eq!(topology.read_hardware_identity("/dev/loop0"), HardwareIdentity::default());
    }

    #[test]
    fn test_serial_falls_back_to_wwid() {
        let (tmp, topology) = fake_sysfs();
        let hw = tmp.path().join("sys/devices/pci0000:00/ata1/host0/target0:0:0/0:0:0:0");
        fs::remove_file(hw.join("serial")).unwrap();
        write(&hw.join("wwid"), "naa.5002538e40a1b2c3\n");
        assert_eq!(topology.read_hardware_identity("/dev/sda").serial, "naa.5002538e40a1b2c3");
    }

    #[test]
    fn test_major_minor_and_counters() {
        let (_tmp, topology) = fake_sysfs();
        assert_eq!(topology.read_major_minor("/dev/sda1"), Some("8:1".to_string()));
        assert_eq!(
            topology.read_io_counters("/dev/sda"),
            Some(IoCounters::new(2000, 500, 1000, 2000))
        );
        assert_eq!(topology.read_io_counters("/dev/sda1"), None);
    }
}
