use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nix::unistd::{access, AccessFlags};
use tracing::{debug, trace, warn};

use crate::domain::Health;
use crate::ports::{CommandRunner, CommandSpec, HealthProbe};

/// Health probe running `smartctl -H <device>`
pub struct SmartctlProbe {
    runner: Arc<dyn CommandRunner>,
    smartctl: Option<PathBuf>,
    use_sudo: bool,
    timeout: Duration,
}

impl SmartctlProbe {
    /// Locate `smartctl` on PATH; a missing tool turns every probe into `N/A`
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        let smartctl = match which::which("smartctl") {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("smartctl not found, health checks disabled: {}", e);
                None
            }
        };
        Self {
            runner,
            smartctl,
            use_sudo: false,
            timeout,
        }
    }

    pub fn with_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    pub fn with_smartctl_path(mut self, path: Option<PathBuf>) -> Self {
        self.smartctl = path;
        self
    }

    fn command(&self, smartctl: &Path, device: &str) -> CommandSpec {
        let spec = CommandSpec::new(smartctl.to_string_lossy()).arg("-H").arg(device);
        if self.use_sudo {
            spec.with_sudo()
        } else {
            spec
        }
    }
}

#[async_trait]
impl HealthProbe for SmartctlProbe {
    fn is_available(&self) -> bool {
        self.smartctl.is_some()
    }

    async fn probe(&self, device: &str) -> Health {
        let Some(smartctl) = self.smartctl.as_deref() else {
            return Health::NotAvailable;
        };

        if !self.use_sudo && access(device, AccessFlags::R_OK).is_err() {
            trace!("{} is not readable, skipping smartctl", device);
            return Health::Denied;
        }

        let command = self.command(smartctl, device);
        let output = match Arc::clone(&self.runner).spawn(command, self.timeout).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                debug!("Health probe for {} failed: {}", device, e);
                return Health::NotAvailable;
            }
            Err(e) => {
                warn!("Health probe task for {} failed: {}", device, e);
                return Health::NotAvailable;
            }
        };
        if output.timed_out {
            return Health::NotAvailable;
        }

        // smartctl reports the verdict on stdout even with a nonzero status
        if let Some(health) = Health::from_probe_output(&output.stdout) {
            return health;
        }
        let denied = output
            .stdout
            .iter()
            .chain(output.stderr.iter())
            .any(|line| line.contains("Permission denied") || line.contains("a password is required"));
        if denied {
            Health::Denied
        } else {
            Health::NotAvailable
        }
    }
}
