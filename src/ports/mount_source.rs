use crate::domain::{FsUsage, MountTable};

/// Port for reading the live mount table
pub trait MountSource: Send + Sync {
    /// Mounts in table order; an unreadable table yields an empty one
    fn read_mounts(&self) -> MountTable;
}

/// Port for filesystem capacity of a mount point
pub trait UsageSource: Send + Sync {
    fn usage(&self, mount_point: &str) -> Option<FsUsage>;
}
