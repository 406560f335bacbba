use async_trait::async_trait;

use crate::domain::{DeviceIdentity, SymlinkEntry};

/// Port for identity data the kernel and udev keep on disk
pub trait IdentitySource: Send + Sync {
    /// `by-uuid` symlinks in directory listing order
    fn uuid_links(&self) -> Vec<SymlinkEntry>;

    /// `by-label` symlinks in directory listing order
    fn label_links(&self) -> Vec<SymlinkEntry>;

    /// Filesystem identity recorded in the udev database
    fn udev_identity(&self, device: &str, major_minor: &str) -> Option<DeviceIdentity>;
}

/// Port for the authoritative bulk enumeration tool
#[async_trait]
pub trait BlockEnumerator: Send + Sync {
    async fn enumerate(&self) -> Result<Vec<DeviceIdentity>, Box<dyn std::error::Error + Send + Sync>>;
}
