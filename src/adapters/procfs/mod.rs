mod identity;
mod mounts;
mod parser;
mod topology;

use std::path::PathBuf;

pub use identity::UdevIdentitySource;
pub use mounts::{ProcfsMountSource, StatvfsUsage};
pub use topology::SysfsTopology;

/// Configuration for kernel and udev paths (useful for containers and tests)
#[derive(Debug, Clone)]
pub struct ProcfsConfig {
    pub proc_path: PathBuf,
    pub sys_path: PathBuf,
    pub dev_path: PathBuf,
    pub udev_path: PathBuf,
}

impl ProcfsConfig {
    pub fn new(proc_path: impl Into<PathBuf>, sys_path: impl Into<PathBuf>) -> Self {
        Self {
            proc_path: proc_path.into(),
            sys_path: sys_path.into(),
            ..Self::host()
        }
    }

    pub fn host() -> Self {
        Self {
            proc_path: PathBuf::from("/proc"),
            sys_path: PathBuf::from("/sys"),
            dev_path: PathBuf::from("/dev"),
            udev_path: PathBuf::from("/run/udev/data"),
        }
    }

    pub fn with_dev_path(mut self, dev_path: impl Into<PathBuf>) -> Self {
        self.dev_path = dev_path.into();
        self
    }

    pub fn with_udev_path(mut self, udev_path: impl Into<PathBuf>) -> Self {
        self.udev_path = udev_path.into();
        self
    }
}

impl Default for ProcfsConfig {
    fn default() -> Self {
        Self::host()
    }
}

/// Combined adapter for the kernel-backed sources
#[derive(Debug, Clone)]
pub struct ProcfsAdapter {
    config: ProcfsConfig,
}

impl ProcfsAdapter {
    pub fn new(config: ProcfsConfig) -> Self {
        Self { config }
    }

    pub fn topology(&self) -> SysfsTopology {
        SysfsTopology::new(self.config.clone())
    }

    pub fn mount_source(&self) -> ProcfsMountSource {
        ProcfsMountSource::new(self.config.clone())
    }

    pub fn identity_source(&self) -> UdevIdentitySource {
        UdevIdentitySource::new(self.config.clone())
    }

    pub fn usage_source(&self) -> StatvfsUsage {
        StatvfsUsage
    }
}
