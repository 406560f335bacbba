pub mod command_runner;
pub mod health_probe;
pub mod identity_source;
pub mod mount_source;
pub mod topology_source;

pub use command_runner::{CommandError, CommandOutput, CommandRunner, CommandSpec, TIMEOUT_EXIT_CODE};
pub use health_probe::HealthProbe;
pub use identity_source::{BlockEnumerator, IdentitySource};
pub use mount_source::{MountSource, UsageSource};
pub use topology_source::TopologySource;
