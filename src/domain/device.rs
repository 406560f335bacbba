use std::fmt;

use serde::{Deserialize, Serialize};

/// Block device entity (whole disk or partition)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDevice {
    pub name: String,
    pub path: String,
    pub size_bytes: u64,
    pub is_partition: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_minor: Option<String>,
}

impl BlockDevice {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: device_name(&path).to_string(),
            path,
            size_bytes: 0,
            is_partition: false,
            parent_path: None,
            major_minor: None,
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    /// A parent equal to the device itself is treated as no parent.
    pub fn with_parent(mut self, parent_path: Option<String>) -> Self {
        self.parent_path = parent_path.filter(|p| *p != self.path);
        self.is_partition = self.parent_path.is_some();
        self
    }

    pub fn with_major_minor(mut self, major_minor: Option<String>) -> Self {
        self.major_minor = major_minor;
        self
    }

    /// Path of the physical device that owns the device-level attributes
    pub fn hardware_path(&self) -> &str {
        self.parent_path.as_deref().unwrap_or(&self.path)
    }
}

/// Kernel name of a device path (`/dev/sda1` -> `sda1`)
pub fn device_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Whether a device accepts block-discard (TRIM) commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscardSupport {
    Yes,
    No,
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl DiscardSupport {
    pub fn from_max_bytes(max_bytes: Option<u64>) -> Self {
        match max_bytes {
            Some(0) => Self::No,
            Some(_) => Self::Yes,
            None => Self::NotAvailable,
        }
    }
}

impl fmt::Display for DiscardSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::NotAvailable => "N/A",
        };
        f.write_str(s)
    }
}

/// Vendor identity read from the hardware node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareIdentity {
    pub model: String,
    pub serial: String,
}

impl HardwareIdentity {
    pub fn new(model: Option<String>, serial: Option<String>) -> Self {
        Self {
            model: model.map(|m| normalize_whitespace(&m)).unwrap_or_default(),
            serial: serial.map(|s| normalize_whitespace(&s)).unwrap_or_default(),
        }
    }
}

/// Collapse whitespace runs to single spaces and trim the ends
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_parent_is_no_parent() {
        let dev = BlockDevice::new("/dev/sda").with_parent(Some("/dev/sda".to_string()));
        assert!(!dev.is_partition);
        assert_eq!(dev.parent_path, None);
        assert_eq!(dev.hardware_path(), "/dev/sda");
    }

    #[test]
    fn test_partition_hardware_path() {
        let dev = BlockDevice::new("/dev/nvme0n1p2").with_parent(Some("/dev/nvme0n1".to_string()));
        assert!(dev.is_partition);
        assert_eq!(dev.name, "nvme0n1p2");
        assert_eq!(dev.hardware_path(), "/dev/nvme0n1");
    }

    #[test]
    fn test_discard_from_max_bytes() {
        assert_eq!(DiscardSupport::from_max_bytes(Some(2147450880)), DiscardSupport::Yes);
        assert_eq!(DiscardSupport::from_max_bytes(Some(0)), DiscardSupport::No);
        assert_eq!(DiscardSupport::from_max_bytes(None), DiscardSupport::NotAvailable);
        assert_eq!(DiscardSupport::NotAvailable.to_string(), "N/A");
    }

    #[test]
    fn test_identity_normalizes_whitespace() {
        let id = HardwareIdentity::new(Some("  Samsung   SSD 870\n".to_string()), None);
        assert_eq!(id.model, "Samsung SSD 870");
        assert_eq!(id.serial, "");
    }
}
